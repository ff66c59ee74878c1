//! EXIF tag dictionary and the `UserComment` parameters extractor.

use std::io::Cursor;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::MetadataEntry;

pub const USER_COMMENT: &str = "UserComment";

/// Keyword given to the parameters string pulled out of `UserComment`.
pub const PARAMETERS_KEYWORD: &str = "parameters";

/// Width of the charset marker (`ASCII\0\0\0`, `UNICODE\0`) once NULs are gone.
const CHARSET_MARKER_CHARS: usize = 7;

/// Raw value of a tag, kept only where text can be recovered from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExifValue {
    Bytes(Vec<u8>),
    Text(String),
    #[default]
    Other,
}

impl From<&exif::Value> for ExifValue {
    fn from(value: &exif::Value) -> Self {
        match value {
            exif::Value::Undefined(bytes, _) | exif::Value::Byte(bytes) => {
                Self::Bytes(bytes.clone())
            }
            exif::Value::Ascii(parts) => Self::Text(
                parts
                    .iter()
                    .map(|p| String::from_utf8_lossy(p))
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            _ => Self::Other,
        }
    }
}

/// One decoded tag: name, raw value and display description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExifTag {
    pub key: String,
    #[serde(skip)]
    pub value: ExifValue,
    #[serde(rename = "value")]
    pub description: String,
}

impl ExifTag {
    pub fn new(key: impl Into<String>, value: ExifValue, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value,
            description: description.into(),
        }
    }

    /// Raw value as text, one char per byte for binary values.
    pub fn raw_text(&self) -> String {
        match &self.value {
            ExifValue::Bytes(bytes) => bytes.iter().copied().map(char::from).collect(),
            ExifValue::Text(s) => s.clone(),
            ExifValue::Other => self.description.clone(),
        }
    }
}

/// All tags found in an image, in container order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifTags {
    tags: Vec<ExifTag>,
}

impl ExifTags {
    pub fn new(tags: Vec<ExifTag>) -> Self {
        Self { tags }
    }

    /// Read the EXIF block of any container `kamadak-exif` understands.
    ///
    /// Missing or unreadable EXIF is not an error for inspection purposes.
    pub fn load(bytes: &[u8]) -> Option<Self> {
        let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
            Ok(exif) => exif,
            Err(e) => {
                debug!("No readable EXIF data: {e}");
                return None;
            }
        };

        let tags = exif
            .fields()
            .map(|field| {
                ExifTag::new(
                    field.tag.to_string(),
                    ExifValue::from(&field.value),
                    field.display_value().to_string(),
                )
            })
            .collect();
        Some(Self { tags })
    }

    pub fn get(&self, key: &str) -> Option<&ExifTag> {
        self.tags.iter().find(|tag| tag.key == key)
    }

    pub fn into_tags(self) -> Vec<ExifTag> {
        self.tags
    }

    /// The generation parameters stored in `UserComment`, if any.
    pub fn generation_parameters(&self) -> Vec<MetadataEntry> {
        self.get(USER_COMMENT)
            .map(|tag| {
                vec![MetadataEntry::new(
                    PARAMETERS_KEYWORD,
                    decode_user_comment(&tag.raw_text()),
                )]
            })
            .unwrap_or_default()
    }

    /// Every tag as a keyword/text pair, preferring the description.
    pub fn stealth_entries(&self) -> Vec<MetadataEntry> {
        self.tags
            .iter()
            .map(|tag| {
                let text = if tag.description.is_empty() {
                    tag.raw_text()
                } else {
                    tag.description.clone()
                };
                MetadataEntry::new(tag.key.clone(), text)
            })
            .collect()
    }
}

/// Strip NULs and the leading charset marker from a `UserComment` value.
pub fn decode_user_comment(raw: &str) -> String {
    raw.chars()
        .filter(|&c| c != '\0')
        .skip(CHARSET_MARKER_CHARS)
        .collect()
}
