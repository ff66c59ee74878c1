//! Classification of decoded image text chunks into result rows.
//!
//! Generation tools disagree on how they lay out metadata:
//!
//! * **WebUI** writes one free-form block: prompt, optional
//!   `Negative prompt: ...`, then a `Steps: ...` parameter line.
//! * **NovelAI / ComfyUI** write several keyword/text chunks, some of them
//!   (`Comment`, `workflow`) holding JSON documents.
//!
//! When no text chunk exists at all, the EXIF tag descriptions are used as a
//! last resort.

use serde_json::Value;
use tracing::warn;

use crate::exif_tags::ExifTags;
use crate::types::{
    Convention, FileInfoItem, MetadataEntry, NO_METADATA_HINT, NO_NEGATIVE_PROMPT, keys,
};

const STEPS_MARKER: &str = "Steps: ";
const NEGATIVE_MARKER: &str = "Negative prompt: ";

/// Keywords whose text is expected to be a JSON document.
pub const JSON_KEYWORDS: &[&str] = &["Comment", "workflow"];

/// Normalised generation metadata of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationInfo {
    /// `None` when nothing usable was found; `rows` is then the lone hint.
    pub convention: Option<Convention>,
    pub rows: Vec<FileInfoItem>,
    /// First JSON document found in a `Comment` / `workflow` row.
    pub embedded_json: Option<Value>,
}

impl GenerationInfo {
    fn missing() -> Self {
        Self {
            convention: None,
            rows: vec![hint_row()],
            embedded_json: None,
        }
    }
}

/// Classify `entries` and turn them into result rows.
///
/// `exif` is only consulted when `entries` is empty.
pub fn classify(entries: &[MetadataEntry], exif: Option<&ExifTags>) -> GenerationInfo {
    let (convention, parsed) = match entries {
        [] => match exif.map(ExifTags::stealth_entries) {
            Some(stealth) if !stealth.is_empty() => (Convention::StealthExif, stealth),
            _ => return GenerationInfo::missing(),
        },
        [single] => (Convention::Webui, split_webui(single)),
        _ => (Convention::Structured, entries.to_vec()),
    };

    let parsed_empty = parsed.is_empty();
    let mut embedded_json = None;
    let mut rows: Vec<FileInfoItem> = parsed
        .into_iter()
        .map(|entry| to_row(entry, &mut embedded_json))
        .collect();

    if convention == Convention::Webui
        && let [single] = entries
    {
        rows.push(FileInfoItem::text(
            keys::FULL_GENERATION_INFO,
            single.text.clone(),
        ));
    }

    if parsed_empty {
        rows.push(hint_row());
    }

    GenerationInfo {
        convention: Some(convention),
        rows,
        embedded_json,
    }
}

/// Split a WebUI parameters block into prompt, negative prompt and
/// parameters.
pub fn split_webui(entry: &MetadataEntry) -> Vec<MetadataEntry> {
    let (prompts, params) = entry
        .text
        .split_once(STEPS_MARKER)
        .map_or((entry.text.as_str(), None), |(p, rest)| (p, Some(rest)));

    // a repeated negative marker ends the negative prompt
    let mut parts = prompts.split(NEGATIVE_MARKER);
    let positive = parts.next().unwrap_or_default();
    let negative = parts.next().unwrap_or(NO_NEGATIVE_PROMPT);

    let params = params
        .map(|rest| format!("{STEPS_MARKER}{rest}"))
        .unwrap_or_default();

    vec![
        MetadataEntry::new(keys::PROMPT, positive),
        MetadataEntry::new(keys::NEGATIVE_PROMPT, negative),
        MetadataEntry::new(keys::PARAMETERS, params),
    ]
}

fn to_row(entry: MetadataEntry, embedded_json: &mut Option<Value>) -> FileInfoItem {
    if !JSON_KEYWORDS.contains(&entry.keyword.as_str()) {
        return FileInfoItem::text(entry.keyword, entry.text);
    }

    match serde_json::from_str::<Value>(&entry.text) {
        Ok(parsed) => {
            if embedded_json.is_none() {
                *embedded_json = Some(parsed.clone());
            }
            FileInfoItem::json(entry.keyword, parsed)
        }
        Err(e) => {
            warn!(keyword = %entry.keyword, "Embedded JSON parse failed: {e}");
            FileInfoItem::text(entry.keyword, entry.text)
        }
    }
}

fn hint_row() -> FileInfoItem {
    FileInfoItem::text(keys::HINT, NO_METADATA_HINT)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::exif_tags::{ExifTag, ExifValue};
    use crate::types::FileInfoValue;

    fn text_of<'a>(info: &'a GenerationInfo, key: &str) -> &'a str {
        info.rows
            .iter()
            .find(|r| r.key == key)
            .and_then(|r| r.value.as_text())
            .unwrap()
    }

    #[test]
    fn test_webui_split() {
        let text = "best quality, 1girl\nNegative prompt: bad hands\nSteps: 20, Sampler: Euler";
        let info = classify(&[MetadataEntry::new("parameters", text)], None);

        assert_eq!(info.convention, Some(Convention::Webui));
        assert_eq!(text_of(&info, keys::PROMPT), "best quality, 1girl\n");
        assert_eq!(text_of(&info, keys::NEGATIVE_PROMPT), "bad hands\n");
        assert_eq!(text_of(&info, keys::PARAMETERS), "Steps: 20, Sampler: Euler");
        assert_eq!(text_of(&info, keys::FULL_GENERATION_INFO), text);
        assert_eq!(info.rows.len(), 4);
        assert!(info.embedded_json.is_none());
    }

    #[test]
    fn test_webui_without_negative_prompt() {
        let info = classify(
            &[MetadataEntry::new("parameters", "a cat\nSteps: 30")],
            None,
        );
        assert_eq!(text_of(&info, keys::PROMPT), "a cat\n");
        assert_eq!(text_of(&info, keys::NEGATIVE_PROMPT), NO_NEGATIVE_PROMPT);
        assert_eq!(text_of(&info, keys::PARAMETERS), "Steps: 30");
    }

    #[test]
    fn test_webui_splits_on_first_steps_marker() {
        let split = split_webui(&MetadataEntry::new(
            "parameters",
            "p\nSteps: 20, Hires steps: 10, Steps: 5",
        ));
        assert_eq!(split[2].text, "Steps: 20, Hires steps: 10, Steps: 5");
    }

    #[test]
    fn test_webui_negative_prompt_stops_at_repeated_marker() {
        let split = split_webui(&MetadataEntry::new(
            "parameters",
            "pos Negative prompt: neg1 Negative prompt: neg2\nSteps: 5",
        ));
        assert_eq!(split[0].text, "pos ");
        assert_eq!(split[1].text, "neg1 ");
        assert_eq!(split[2].text, "Steps: 5");
    }

    #[test]
    fn test_webui_without_steps() {
        let split = split_webui(&MetadataEntry::new("Description", "just a prompt"));
        assert_eq!(split[0].text, "just a prompt");
        assert_eq!(split[2].text, "");
    }

    #[test]
    fn test_structured_passthrough() {
        let entries = vec![
            MetadataEntry::new("Title", "AI generated image"),
            MetadataEntry::new("Software", "NovelAI"),
            MetadataEntry::new("Comment", r#"{"steps": 28, "scale": 5}"#),
        ];
        let info = classify(&entries, None);

        assert_eq!(info.convention, Some(Convention::Structured));
        assert_eq!(info.rows.len(), 3);
        assert_eq!(info.rows[0], FileInfoItem::text("Title", "AI generated image"));
        assert_eq!(
            info.rows[2].value,
            FileInfoValue::Json(json!({"steps": 28, "scale": 5}))
        );
        assert_eq!(info.embedded_json, Some(json!({"steps": 28, "scale": 5})));
    }

    #[test]
    fn test_workflow_row_becomes_json() {
        let entries = vec![
            MetadataEntry::new("prompt", "{}"),
            MetadataEntry::new("workflow", r#"{"nodes":[]}"#),
        ];
        let info = classify(&entries, None);
        assert_eq!(info.rows[1], FileInfoItem::json("workflow", json!({"nodes": []})));
        assert_eq!(info.embedded_json, Some(json!({"nodes": []})));
        // only allow-listed keywords are parsed
        assert_eq!(info.rows[0].value, FileInfoValue::Text("{}".into()));
    }

    #[test]
    fn test_first_embedded_json_wins() {
        let entries = vec![
            MetadataEntry::new("Comment", r#"{"first": true}"#),
            MetadataEntry::new("workflow", r#"{"second": true}"#),
        ];
        let info = classify(&entries, None);
        assert_eq!(info.embedded_json, Some(json!({"first": true})));
        assert_eq!(info.rows[1].value, FileInfoValue::Json(json!({"second": true})));
    }

    #[test]
    fn test_invalid_embedded_json_stays_text() {
        let entries = vec![
            MetadataEntry::new("Comment", "{broken"),
            MetadataEntry::new("Source", "x"),
        ];
        let info = classify(&entries, None);
        assert_eq!(info.rows[0], FileInfoItem::text("Comment", "{broken"));
        assert!(info.embedded_json.is_none());
    }

    #[test]
    fn test_nothing_found() {
        let info = classify(&[], None);
        assert_eq!(info.convention, None);
        assert_eq!(info.rows, vec![FileInfoItem::text(keys::HINT, NO_METADATA_HINT)]);

        let info = classify(&[], Some(&ExifTags::default()));
        assert_eq!(info.rows.len(), 1);
        assert_eq!(info.rows[0].key, keys::HINT);
    }

    #[test]
    fn test_stealth_exif_fallback() {
        let exif = ExifTags::new(vec![ExifTag::new(
            "ImageDescription",
            ExifValue::Text("masterpiece".into()),
            "masterpiece",
        )]);
        let info = classify(&[], Some(&exif));
        assert_eq!(info.convention, Some(Convention::StealthExif));
        assert_eq!(
            info.rows,
            vec![FileInfoItem::text("ImageDescription", "masterpiece")]
        );
    }
}
