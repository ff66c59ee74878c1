//! Model-type identification by architecture id or key signatures.

use std::borrow::Cow;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::registry::{ModelTypeDescriptor, SignatureRegistry};

/// Metadata key that names the architecture explicitly.
pub const ARCHITECTURE_KEY: &str = "modelspec.architecture";

/// Files below this size are not treated as models.
pub const MIN_MODEL_SIZE: u64 = 10 * 1024;

/// Bytes of a non-safetensors model searched for signatures.
pub const SCAN_WINDOW: usize = 50 * 1024;

pub const TOO_SMALL_MESSAGE: &str =
    "File is too small to plausibly be a model; inspection stopped.";

pub const UNKNOWN_MODEL_MESSAGE: &str = "Unknown model type, or not a model at all. \
     If you are sure this is a model file, please report it together with the file's key names.";

pub fn is_plausible_model_size(file_size: u64) -> bool {
    file_size >= MIN_MODEL_SIZE
}

/// Decode the first [`SCAN_WINDOW`] bytes of `bytes` for substring search.
///
/// Invalid UTF-8 (pickled tensors, a multibyte char cut at the window edge)
/// is replaced rather than rejected.
pub fn scan_window(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(&bytes[..bytes.len().min(SCAN_WINDOW)])
}

/// Classifies model files against a shared [`SignatureRegistry`].
#[derive(Debug, Clone)]
pub struct ModelSignatureMatcher {
    registry: Arc<SignatureRegistry>,
}

impl ModelSignatureMatcher {
    pub fn new(registry: Arc<SignatureRegistry>) -> Self {
        Self { registry }
    }

    /// Identify a model from its header metadata and scanned content.
    ///
    /// A known `modelspec.architecture` wins outright.  Otherwise the first
    /// descriptor (in registry order) with a signature contained in
    /// `content` is returned; there is no scoring.
    pub fn identify(
        &self,
        metadata: Option<&Map<String, Value>>,
        content: &str,
    ) -> Option<&ModelTypeDescriptor> {
        if let Some(arch) = metadata
            .and_then(|m| m.get(ARCHITECTURE_KEY))
            .and_then(Value::as_str)
            && let Some(descriptor) = self.registry.by_architecture(arch)
        {
            return Some(descriptor);
        }

        self.registry.descriptors().iter().find(|d| {
            d.signatures
                .iter()
                .any(|sig| content.contains(sig.as_str()))
        })
    }
}
