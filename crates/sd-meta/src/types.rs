//! Inspection data model, row keys and error types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::exif_tags::ExifTag;

/// Image extensions routed to the image pipeline.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpeg", "jpg", "webp", "bmp", "avif"];

/// Model extensions routed to the model pipeline.
pub const MODEL_EXTENSIONS: &[&str] = &["pt", "pth", "ckpt", "safetensors", "bin"];

//  Row keys

pub mod keys {
    pub const FILE_NAME: &str = "File name";
    pub const EXTENSION: &str = "Extension";
    pub const FILE_SIZE: &str = "File size";
    pub const PROMPT: &str = "Prompt";
    pub const NEGATIVE_PROMPT: &str = "Negative prompt";
    pub const PARAMETERS: &str = "Parameters";
    pub const FULL_GENERATION_INFO: &str = "Full generation info";
    pub const EMBEDDED_JSON: &str = "Embedded JSON";
    pub const MODEL_TYPE: &str = "Model type";
    pub const MODEL_USAGE: &str = "Model usage";
    pub const METADATA: &str = "Metadata";
    pub const HINT: &str = "Hint";
    pub const ERROR: &str = "Error";
}

pub const NO_METADATA_HINT: &str = "Could not read any generation metadata. The image was probably not \
     produced by Stable Diffusion tooling, or it is not the original file (it may have been recompressed).";

pub const NO_NEGATIVE_PROMPT: &str = "none";

//  Decoded payloads

/// One decoded text payload from an image container (PNG chunk or EXIF field).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub keyword: String,
    pub text: String,
}

impl MetadataEntry {
    pub fn new(keyword: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            text: text.into(),
        }
    }
}

//  Result rows

/// Value of a result row: plain text or an untyped JSON tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileInfoValue {
    Text(String),
    Json(Value),
}

impl FileInfoValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            Self::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Text(_) => None,
        }
    }
}

/// A single row of the human-facing result.  Keys are not unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfoItem {
    pub key: String,
    pub value: FileInfoValue,
}

impl FileInfoItem {
    pub fn text(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: FileInfoValue::Text(value.into()),
        }
    }

    pub fn json(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value: FileInfoValue::Json(value),
        }
    }
}

/// Find the first row with `key`.
pub fn find_row<'a>(rows: &'a [FileInfoItem], key: &str) -> Option<&'a FileInfoItem> {
    rows.iter().find(|row| row.key == key)
}

//  Results

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u64,
    pub height: u64,
}

/// Which generation-tool layout the image metadata followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Convention {
    /// A single free-form parameters block (A1111 WebUI style).
    Webui,
    /// Several keyword/text chunks (NovelAI, ComfyUI).
    Structured,
    /// No text chunks; EXIF tag descriptions were used instead.
    StealthExif,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInspectionResult {
    pub file_info: Vec<FileInfoItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_exif: Option<Vec<ExifTag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<ImageDimensions>,
    /// Human-readable file size.
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convention: Option<Convention>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_json: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInspectionResult {
    pub file_info: Vec<FileInfoItem>,
    /// Name of the matched model type, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_json: Option<Value>,
}

impl ModelInspectionResult {
    /// A result made of a single `Error` row.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            file_info: vec![FileInfoItem::text(keys::ERROR, message)],
            model_type: None,
            embedded_json: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InspectionResult {
    Image(ImageInspectionResult),
    Model(ModelInspectionResult),
}

impl InspectionResult {
    pub fn file_info(&self) -> &[FileInfoItem] {
        match self {
            Self::Image(r) => &r.file_info,
            Self::Model(r) => &r.file_info,
        }
    }

    pub fn embedded_json(&self) -> Option<&Value> {
        match self {
            Self::Image(r) => r.embedded_json.as_ref(),
            Self::Model(r) => r.embedded_json.as_ref(),
        }
    }
}

//  Error

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("Unsupported file type `{extension}`. Supported types: {supported}")]
    UnsupportedFileType { extension: String, supported: String },

    #[error("Could not determine image dimensions")]
    DimensionUnavailable,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InspectError {
    pub(crate) fn unsupported(extension: &str) -> Self {
        Self::UnsupportedFileType {
            extension: extension.to_string(),
            supported: IMAGE_EXTENSIONS
                .iter()
                .chain(MODEL_EXTENSIONS)
                .copied()
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}
