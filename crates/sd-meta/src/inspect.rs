//! File inspection entry point.
//!
//! Routing is by extension alone; content is never sniffed.  All I/O goes
//! through [`FileSource`] so the pipelines run the same against the local
//! filesystem or an in-memory source.

use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::exif_tags::ExifTags;
use crate::format::human_size;
use crate::generation;
use crate::png;
use crate::registry::SignatureRegistry;
use crate::safetensors;
use crate::signature::{
    self, ModelSignatureMatcher, SCAN_WINDOW, TOO_SMALL_MESSAGE, UNKNOWN_MODEL_MESSAGE,
};
use crate::types::*;

//  File kind

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Model,
}

impl FileKind {
    /// Classify `path` by its (case-insensitive) extension.
    pub fn from_path(path: &Path) -> Result<Self, InspectError> {
        let ext = extension_of(path);
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Ok(Self::Image)
        } else if MODEL_EXTENSIONS.contains(&ext.as_str()) {
            Ok(Self::Model)
        } else {
            Err(InspectError::unsupported(&ext))
        }
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

//  Byte source

/// Where file bytes come from.
pub trait FileSource: Send + Sync {
    /// Whole file contents.
    fn read(&self, path: &Path) -> impl Future<Output = io::Result<Vec<u8>>> + Send;

    /// At most `limit` bytes from the start of the file.
    fn read_prefix(
        &self,
        path: &Path,
        limit: u64,
    ) -> impl Future<Output = io::Result<Vec<u8>>> + Send;

    /// File length in bytes.
    fn size(&self, path: &Path) -> impl Future<Output = io::Result<u64>> + Send;
}

/// The local filesystem, via `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSource for LocalFs {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn read_prefix(&self, path: &Path, limit: u64) -> io::Result<Vec<u8>> {
        let file = tokio::fs::File::open(path).await?;
        let mut buf = Vec::with_capacity(limit.min(SCAN_WINDOW as u64) as usize);
        file.take(limit).read_to_end(&mut buf).await?;
        Ok(buf)
    }

    async fn size(&self, path: &Path) -> io::Result<u64> {
        Ok(tokio::fs::metadata(path).await?.len())
    }
}

//  Inspector

/// Routes files to the image or model pipeline and assembles the result.
#[derive(Debug, Clone)]
pub struct Inspector<S = LocalFs> {
    source: S,
    matcher: ModelSignatureMatcher,
}

impl Inspector<LocalFs> {
    pub fn new(registry: Arc<SignatureRegistry>) -> Self {
        Self::with_source(LocalFs, registry)
    }
}

impl<S: FileSource> Inspector<S> {
    pub fn with_source(source: S, registry: Arc<SignatureRegistry>) -> Self {
        Self {
            source,
            matcher: ModelSignatureMatcher::new(registry),
        }
    }

    /// Inspect `path`, choosing the pipeline from its extension.
    ///
    /// Unsupported extensions fail before any I/O happens.
    pub async fn inspect_file(&self, path: &Path) -> Result<InspectionResult, InspectError> {
        match FileKind::from_path(path)? {
            FileKind::Image => Ok(InspectionResult::Image(self.inspect_image(path).await?)),
            FileKind::Model => Ok(InspectionResult::Model(self.inspect_model(path).await?)),
        }
    }

    /// Extract generation metadata from an image file.
    pub async fn inspect_image(&self, path: &Path) -> Result<ImageInspectionResult, InspectError> {
        let bytes = self.source.read(path).await?;
        let file_size = self.source.size(path).await?;

        let dimensions = match imagesize::blob_size(&bytes) {
            Ok(size) if size.width > 0 && size.height > 0 => ImageDimensions {
                width: size.width as u64,
                height: size.height as u64,
            },
            _ => return Err(InspectError::DimensionUnavailable),
        };

        let exif = ExifTags::load(&bytes);
        let entries = match extension_of(path).as_str() {
            "png" => png::text_entries(&bytes),
            "webp" | "jpeg" | "jpg" | "avif" => exif
                .as_ref()
                .map(ExifTags::generation_parameters)
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        let info = generation::classify(&entries, exif.as_ref());
        let size = human_size(file_size);

        let file_info = if info.convention.is_some() {
            let mut rows = name_rows(path, &size);
            rows.extend(info.rows);
            if let Some(json) = &info.embedded_json {
                rows.push(FileInfoItem::json(keys::EMBEDDED_JSON, json.clone()));
            }
            rows
        } else {
            info.rows
        };

        debug!(
            path = %path.display(),
            convention = ?info.convention,
            entries = entries.len(),
            "image inspection complete"
        );

        Ok(ImageInspectionResult {
            file_info,
            raw_exif: exif.map(ExifTags::into_tags),
            dimensions: Some(dimensions),
            size,
            convention: info.convention,
            embedded_json: info.embedded_json,
        })
    }

    /// Extract training metadata and classify a model file.
    pub async fn inspect_model(&self, path: &Path) -> Result<ModelInspectionResult, InspectError> {
        let file_size = self.source.size(path).await?;
        if !signature::is_plausible_model_size(file_size) {
            return Ok(ModelInspectionResult::error(TOO_SMALL_MESSAGE));
        }

        let (metadata, content) = if extension_of(path) == "safetensors" {
            let prefix = self.source.read_prefix(path, 8).await?;
            let extent = safetensors::header_extent(&prefix).map_or(8, |n| n.min(file_size));
            let bytes = self.source.read_prefix(path, extent).await?;

            match safetensors::parse_header(&bytes) {
                Ok(header) => (
                    safetensors::prepare_metadata(&header),
                    safetensors::tensor_keys(&header),
                ),
                Err(e) => {
                    warn!(path = %path.display(), "Safetensors header decode failed: {e}");
                    return Ok(ModelInspectionResult::error(format!("Failed to parse: {e}")));
                }
            }
        } else {
            let bytes = self.source.read_prefix(path, SCAN_WINDOW as u64).await?;
            (None, signature::scan_window(&bytes).into_owned())
        };

        let model_type = self.matcher.identify(metadata.as_ref(), &content);

        let mut file_info = name_rows(path, &human_size(file_size));
        file_info.push(FileInfoItem::text(
            keys::MODEL_TYPE,
            model_type.map_or(UNKNOWN_MODEL_MESSAGE, |m| m.name.as_str()),
        ));
        if let Some(m) = model_type {
            file_info.push(FileInfoItem::text(keys::MODEL_USAGE, m.usage_note.clone()));
        }

        let embedded_json = metadata.map(Value::Object);
        if let Some(meta) = &embedded_json {
            file_info.push(FileInfoItem::json(keys::METADATA, meta.clone()));
        }

        debug!(
            path = %path.display(),
            model_type = model_type.map(|m| m.name.as_str()),
            "model inspection complete"
        );

        Ok(ModelInspectionResult {
            file_info,
            model_type: model_type.map(|m| m.name.clone()),
            embedded_json,
        })
    }
}

/// `File name` / `Extension` / `File size` rows.
fn name_rows(path: &Path, size: &str) -> Vec<FileInfoItem> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    vec![
        FileInfoItem::text(keys::FILE_NAME, stem),
        FileInfoItem::text(keys::EXTENSION, ext),
        FileInfoItem::text(keys::FILE_SIZE, size),
    ]
}
