//! Safetensors header decoding.
//!
//! A safetensors file starts with an unsigned 64-bit little-endian header
//! length, followed by that many bytes of JSON.  The JSON object maps tensor
//! names to their dtype/shape/offsets, plus an optional `__metadata__` entry
//! holding a flat string-to-string map written by the training tool.

use serde_json::{Map, Value};
use tracing::warn;

/// Key of the free-form metadata map inside the header.
pub const METADATA_KEY: &str = "__metadata__";

/// Embedded preview image; dropped from the metadata shown to users.
pub const THUMBNAIL_KEY: &str = "modelspec.thumbnail";

/// Metadata values that kohya-style trainers store as serialized JSON.
pub const NESTED_JSON_KEYS: &[&str] = &[
    "ss_bucket_info",
    "ss_network_args",
    "ss_dataset_dirs",
    "ss_tag_frequency",
];

/// Nested values at or above this many characters are left as text.
pub const NESTED_JSON_LIMIT: usize = 10_000;

const LENGTH_PREFIX: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum SafetensorsError {
    #[error("File too short to be a valid safetensors file")]
    TooShort,

    #[error("Header length {header_len} exceeds file size ({available} bytes after the length prefix)")]
    HeaderOverflow { header_len: u64, available: u64 },

    #[error("Invalid safetensors header: {0}")]
    InvalidHeaderJson(#[from] serde_json::Error),
}

/// Byte offset at which the header ends (`8 + headerLength`), if the length
/// prefix is present.
pub fn header_extent(bytes: &[u8]) -> Option<u64> {
    read_header_len(bytes).map(|len| len.saturating_add(LENGTH_PREFIX as u64))
}

/// Decode the JSON header of a safetensors buffer.
///
/// `bytes` must start at the beginning of the file and cover at least the
/// whole header; trailing tensor data is ignored.
pub fn parse_header(bytes: &[u8]) -> Result<Map<String, Value>, SafetensorsError> {
    let header_len = read_header_len(bytes).ok_or(SafetensorsError::TooShort)?;
    let available = (bytes.len() - LENGTH_PREFIX) as u64;
    if header_len > available {
        return Err(SafetensorsError::HeaderOverflow {
            header_len,
            available,
        });
    }

    let raw = &bytes[LENGTH_PREFIX..LENGTH_PREFIX + header_len as usize];
    let text = String::from_utf8_lossy(raw);
    Ok(serde_json::from_str(&text)?)
}

/// Tensor names of a parsed header, newline-joined in header order.
pub fn tensor_keys(header: &Map<String, Value>) -> String {
    header
        .keys()
        .filter(|key| key.as_str() != METADATA_KEY)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prepare the `__metadata__` map for display.
///
/// Returns a copy without the thumbnail, with the known nested-JSON keys
/// expanded into JSON trees.  Oversized or malformed nested values stay as
/// the original strings.
pub fn prepare_metadata(header: &Map<String, Value>) -> Option<Map<String, Value>> {
    let Some(Value::Object(raw)) = header.get(METADATA_KEY) else {
        return None;
    };

    let mut meta = raw.clone();
    meta.retain(|key, _| key != THUMBNAIL_KEY);

    for &key in NESTED_JSON_KEYS {
        let Some(Value::String(text)) = meta.get(key) else {
            continue;
        };
        if text.chars().count() >= NESTED_JSON_LIMIT {
            continue;
        }
        match serde_json::from_str::<Value>(text) {
            Ok(parsed) => {
                meta.insert(key.to_string(), parsed);
            }
            Err(e) => warn!(key, "Failed to parse nested metadata JSON: {e}"),
        }
    }

    Some(meta)
}

fn read_header_len(bytes: &[u8]) -> Option<u64> {
    let prefix: [u8; LENGTH_PREFIX] = bytes.get(..LENGTH_PREFIX)?.try_into().ok()?;
    Some(u64::from_le_bytes(prefix))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn encode(header: &Value) -> Vec<u8> {
        let json = serde_json::to_vec(header).unwrap();
        let mut out = (json.len() as u64).to_le_bytes().to_vec();
        out.extend_from_slice(&json);
        out
    }

    #[test]
    fn test_too_short() {
        assert!(matches!(
            parse_header(&[1, 2, 3]),
            Err(SafetensorsError::TooShort)
        ));
        assert!(matches!(parse_header(&[]), Err(SafetensorsError::TooShort)));
    }

    #[test]
    fn test_header_overflow() {
        let mut bytes = 100u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        assert!(matches!(
            parse_header(&bytes),
            Err(SafetensorsError::HeaderOverflow {
                header_len: 100,
                available: 2
            })
        ));
    }

    #[test]
    fn test_header_overflow_does_not_wrap() {
        let bytes = u64::MAX.to_le_bytes();
        assert!(matches!(
            parse_header(&bytes),
            Err(SafetensorsError::HeaderOverflow { .. })
        ));
    }

    #[test]
    fn test_invalid_json_carries_parser_message() {
        let mut bytes = 5u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{nope");
        let err = parse_header(&bytes).unwrap_err();
        assert!(matches!(err, SafetensorsError::InvalidHeaderJson(_)));
        let msg = err.to_string();
        assert!(msg.starts_with("Invalid safetensors header: "));
        assert!(msg.len() > "Invalid safetensors header: ".len());
    }

    #[test]
    fn test_header_must_be_object() {
        let bytes = encode(&json!([1, 2, 3]));
        assert!(matches!(
            parse_header(&bytes),
            Err(SafetensorsError::InvalidHeaderJson(_))
        ));
    }

    #[test]
    fn test_round_trip_ignores_tensor_data() {
        let header = json!({
            "__metadata__": {"a": "1"},
            "t1": {"dtype": "F16", "shape": [2, 2], "data_offsets": [0, 8]}
        });
        let mut bytes = encode(&header);
        bytes.extend_from_slice(&[0u8; 8]);

        let parsed = parse_header(&bytes).unwrap();
        assert_eq!(Value::Object(parsed), header);
    }

    #[test]
    fn test_header_extent() {
        assert_eq!(header_extent(&[0; 4]), None);
        assert_eq!(header_extent(&12u64.to_le_bytes()), Some(20));
        assert_eq!(header_extent(&u64::MAX.to_le_bytes()), Some(u64::MAX));
    }

    #[test]
    fn test_tensor_keys_skip_metadata() {
        let header = json!({
            "__metadata__": {"a": "1"},
            "lora_unet_down.weight": {},
            "lora_te_text.weight": {}
        });
        let Value::Object(map) = header else {
            unreachable!()
        };
        assert_eq!(
            tensor_keys(&map),
            "lora_unet_down.weight\nlora_te_text.weight"
        );
    }

    #[test]
    fn test_prepare_metadata_expands_nested_json() {
        let header = json!({
            "__metadata__": {
                "modelspec.thumbnail": "data:image/png;base64,AAAA",
                "ss_network_args": "{\"conv_dim\": \"4\"}",
                "ss_tag_frequency": "not json",
                "ss_output_name": "{\"left\": \"alone\"}"
            }
        });
        let Value::Object(map) = header else {
            unreachable!()
        };
        let meta = prepare_metadata(&map).unwrap();

        assert!(!meta.contains_key(THUMBNAIL_KEY));
        assert_eq!(meta["ss_network_args"], json!({"conv_dim": "4"}));
        assert_eq!(meta["ss_tag_frequency"], json!("not json"));
        // only allow-listed keys are expanded
        assert_eq!(meta["ss_output_name"], json!("{\"left\": \"alone\"}"));
    }

    #[test]
    fn test_prepare_metadata_skips_oversized_values() {
        let big = format!("[{}0]", "0,".repeat(NESTED_JSON_LIMIT));
        let header = json!({ "__metadata__": { "ss_bucket_info": big.clone() } });
        let Value::Object(map) = header else {
            unreachable!()
        };
        let meta = prepare_metadata(&map).unwrap();
        assert_eq!(meta["ss_bucket_info"], Value::String(big));
    }

    #[test]
    fn test_prepare_metadata_absent() {
        let header = json!({ "t1": {} });
        let Value::Object(map) = header else {
            unreachable!()
        };
        assert!(prepare_metadata(&map).is_none());
    }
}
