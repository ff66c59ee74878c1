//! Application configuration — persisted as JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Global configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Custom model signature file (built-in list when unset).
    #[serde(default)]
    pub signatures: Option<PathBuf>,
    /// Pretty-print JSON output.
    #[serde(default = "default_pretty")]
    pub pretty: bool,
    /// Concurrent inspections during `scan`.
    #[serde(default = "default_scan_jobs")]
    pub scan_jobs: usize,
}

fn default_pretty() -> bool {
    true
}
fn default_scan_jobs() -> usize {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            signatures: None,
            pretty: default_pretty(),
            scan_jobs: default_scan_jobs(),
        }
    }
}

impl AppConfig {
    /// Platform config directory: `~/.config/sd-inspect/`
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sd-inspect")
    }

    fn config_file() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Load from disk, or return defaults if the file doesn't exist.
    pub fn load_or_default() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_file())
    }

    /// Persist to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_file())
    }

    fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Self::default())
        }
    }

    fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Apply a `config set <key> <value>` update.
    pub fn set(&mut self, key: &str, value: String) -> anyhow::Result<()> {
        match key {
            "pretty" => self.pretty = value.parse()?,
            "scan_jobs" => {
                let jobs: usize = value.parse()?;
                if jobs == 0 {
                    anyhow::bail!("scan_jobs must be at least 1");
                }
                self.scan_jobs = jobs;
            }
            "signatures" => {
                self.signatures = match value.as_str() {
                    "" | "builtin" => None,
                    _ => Some(PathBuf::from(value)),
                }
            }
            _ => anyhow::bail!("Unknown config key: {key}"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let cfg: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert!(cfg.pretty);
        assert_eq!(cfg.scan_jobs, 4);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        assert_eq!(AppConfig::load_from(&path).unwrap(), AppConfig::default());

        let mut cfg = AppConfig::default();
        cfg.set("scan_jobs", "8".into()).unwrap();
        cfg.set("signatures", "/tmp/sigs.json".into()).unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.scan_jobs, 8);
        assert_eq!(loaded.signatures, Some(PathBuf::from("/tmp/sigs.json")));
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        assert!(cfg.set("scan_jobs", "0".into()).is_err());
        assert!(cfg.set("pretty", "maybe".into()).is_err());
        assert!(cfg.set("port", "8080".into()).is_err());

        cfg.set("signatures", "builtin".into()).unwrap();
        assert_eq!(cfg.signatures, None);
    }
}
