use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifier::{MIN_ENTITY_NAME_LEN, TYPE_ID_PREFIX_LEN};

/// Global identifier ceiling of the type-registration system in the reference deployment.
pub const DEFAULT_IDENTIFIER_MAX_LENGTH: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    pub data_dir: PathBuf,
    /// Maximum length of a logical type id, prefix included.
    pub identifier_max_length: usize,
    /// Root for generated binding artifacts. Defaults to `<data_dir>/artifacts`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts_dir: Option<PathBuf>,
}

impl ProvisionConfig {
    /// Loads a TOML config file. Missing keys fall back to defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.identifier_max_length < TYPE_ID_PREFIX_LEN + MIN_ENTITY_NAME_LEN {
            return Err(Error::Config(format!(
                "identifier_max_length must be at least {}",
                TYPE_ID_PREFIX_LEN + MIN_ENTITY_NAME_LEN
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("tablesmith.db")
    }

    #[must_use]
    pub fn artifacts_path(&self) -> PathBuf {
        self.artifacts_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("artifacts"))
    }
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            identifier_max_length: DEFAULT_IDENTIFIER_MAX_LENGTH,
            artifacts_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_paths() {
        let config = ProvisionConfig::with_data_dir("/srv/data");
        assert_eq!(config.db_path(), PathBuf::from("/srv/data/tablesmith.db"));
        assert_eq!(config.artifacts_path(), PathBuf::from("/srv/data/artifacts"));
        assert_eq!(config.identifier_max_length, 32);
    }

    #[test]
    fn test_from_file_partial() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tablesmith.toml");
        fs::write(
            &path,
            "data_dir = \"/var/lib/tablesmith\"\nidentifier_max_length = 48\n",
        )
        .unwrap();

        let config = ProvisionConfig::from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/tablesmith"));
        assert_eq!(config.identifier_max_length, 48);
        assert!(config.artifacts_dir.is_none());
    }

    #[test]
    fn test_rejects_ceiling_below_prefix() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tablesmith.toml");
        fs::write(&path, "identifier_max_length = 8\n").unwrap();

        assert!(matches!(
            ProvisionConfig::from_file(&path),
            Err(Error::Config(_))
        ));
    }
}
