//! Catalogue of known model types and their key signatures.
//!
//! The registry is read once (from the built-in list or a user file) and is
//! immutable afterwards; share it behind an `Arc`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

const BUILTIN_SIGNATURES: &str = include_str!("../data/model_signatures.json");

/// One known model type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTypeDescriptor {
    pub name: String,
    /// Value of `modelspec.architecture` that names this type directly.
    #[serde(rename = "identifier")]
    pub architecture_id: String,
    #[serde(rename = "usage")]
    pub usage_note: String,
    /// Substrings searched for in tensor names / file content, in order.
    #[serde(rename = "sigs")]
    pub signatures: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    data: Vec<ModelTypeDescriptor>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid signature file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Model type `{0}` has no signatures")]
    EmptySignatures(String),

    #[error("Model type `{0}` has an empty signature")]
    EmptySignature(String),
}

#[derive(Debug, Clone)]
pub struct SignatureRegistry {
    descriptors: Vec<ModelTypeDescriptor>,
}

impl SignatureRegistry {
    /// The descriptor list compiled into the crate.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_json(BUILTIN_SIGNATURES)
    }

    /// Parse a `{"data": [...]}` descriptor document.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_str(json)?;
        Self::new(file.data)
    }

    /// Load a descriptor document from disk.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let data = std::fs::read_to_string(path)?;
        let registry = Self::from_json(&data)?;
        debug!(path = %path.display(), count = registry.len(), "Loaded signature registry");
        Ok(registry)
    }

    /// Build a registry, keeping `descriptors` in the given order.
    pub fn new(descriptors: Vec<ModelTypeDescriptor>) -> Result<Self, RegistryError> {
        for d in &descriptors {
            if d.signatures.is_empty() {
                return Err(RegistryError::EmptySignatures(d.name.clone()));
            }
            // An empty needle would match every file.
            if d.signatures.iter().any(String::is_empty) {
                return Err(RegistryError::EmptySignature(d.name.clone()));
            }
        }
        Ok(Self { descriptors })
    }

    pub fn descriptors(&self) -> &[ModelTypeDescriptor] {
        &self.descriptors
    }

    pub fn by_architecture(&self, architecture_id: &str) -> Option<&ModelTypeDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.architecture_id == architecture_id)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_loads() {
        let registry = SignatureRegistry::builtin().unwrap();
        assert!(!registry.is_empty());
        assert!(registry.by_architecture("stable-diffusion-v1").is_some());
        assert!(registry.by_architecture("no-such-arch").is_none());
    }

    #[test]
    fn test_builtin_orders_specific_before_generic() {
        let registry = SignatureRegistry::builtin().unwrap();
        let pos = |id: &str| {
            registry
                .descriptors()
                .iter()
                .position(|d| d.architecture_id == id)
                .unwrap()
        };
        // LoHa keys also carry the kohya `lora_unet_` prefix
        assert!(pos("lycoris") < pos("stable-diffusion-v1/lora"));
        // SD2 checkpoints share the UNet key names of SD1
        assert!(pos("stable-diffusion-v2-768-v") < pos("stable-diffusion-v1"));
        // checkpoints embed a full VAE
        assert!(pos("stable-diffusion-v1") < pos("vae"));
    }

    #[test]
    fn test_from_json_field_names() {
        let registry = SignatureRegistry::from_json(
            r#"{"data":[{"name":"A","identifier":"a","usage":"use a","sigs":["x","y"]}]}"#,
        )
        .unwrap();
        let d = &registry.descriptors()[0];
        assert_eq!(d.architecture_id, "a");
        assert_eq!(d.usage_note, "use a");
        assert_eq!(d.signatures, vec!["x", "y"]);
    }

    #[test]
    fn test_rejects_empty_signatures() {
        let err = SignatureRegistry::from_json(
            r#"{"data":[{"name":"A","identifier":"a","usage":"","sigs":[]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::EmptySignatures(name) if name == "A"));

        let err = SignatureRegistry::from_json(
            r#"{"data":[{"name":"B","identifier":"b","usage":"","sigs":["ok",""]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::EmptySignature(name) if name == "B"));
    }

    #[test]
    fn test_rejects_malformed_document() {
        assert!(matches!(
            SignatureRegistry::from_json("{\"data\": 3}"),
            Err(RegistryError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sigs.json");
        std::fs::write(
            &path,
            r#"{"data":[{"name":"A","identifier":"a","usage":"","sigs":["x"]}]}"#,
        )
        .unwrap();
        assert_eq!(SignatureRegistry::load(&path).unwrap().len(), 1);
        assert!(matches!(
            SignatureRegistry::load(&dir.path().join("missing.json")),
            Err(RegistryError::Io(_))
        ));
    }
}
