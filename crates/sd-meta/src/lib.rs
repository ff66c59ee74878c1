//! Metadata inspection for Stable Diffusion images and model files.
//!
//! * **images** (`png`, `jpeg`, `jpg`, `webp`, `bmp`, `avif`) — prompts and
//!   generation parameters from PNG text chunks or the EXIF `UserComment`,
//!   normalised across the WebUI and NovelAI/ComfyUI layouts.
//! * **models** (`safetensors`, `ckpt`, `pt`, `pth`, `bin`) — training
//!   metadata from the safetensors header and a best-effort model-type
//!   classification against a [`SignatureRegistry`].
//!
//! [`Inspector`] is the entry point; it routes by extension only.

pub mod exif_tags;
pub mod format;
pub mod generation;
pub mod inspect;
pub mod png;
pub mod registry;
pub mod safetensors;
pub mod scan;
pub mod signature;
pub mod types;

pub use exif_tags::{ExifTag, ExifTags};
pub use format::human_size;
pub use generation::{GenerationInfo, classify};
pub use inspect::{FileKind, FileSource, Inspector, LocalFs};
pub use registry::{ModelTypeDescriptor, RegistryError, SignatureRegistry};
pub use safetensors::SafetensorsError;
pub use scan::discover;
pub use signature::ModelSignatureMatcher;
pub use types::*;
