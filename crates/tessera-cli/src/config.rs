//! tessera CLI configuration stored at `~/.tessera/config.json`.
//!
//! Every field is optional; a missing file behaves like an empty one.
//! Flags and environment variables always take precedence over values
//! read from here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const CONFIG_DIR_NAME: &str = ".tessera";
const CONFIG_FILE_NAME: &str = "config.json";

/// Persistent CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TesseraConfig {
    /// Base64 SSO public key trusted by cluster nodes, used when
    /// `SSH_SSO_PUBLIC_KEY` is unset.
    pub ssh_sso_public_key: Option<String>,
    /// Path to the `clusterctl` binary. Defaults to `clusterctl` on `PATH`.
    pub clusterctl_path: Option<String>,
}

/// Path to `~/.tessera/config.json`.
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::command_failed("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load config from `~/.tessera/config.json`, returning default if missing.
pub fn load_config() -> Result<TesseraConfig> {
    load_config_from(&config_path()?)
}

/// Load config from `path`, returning default if missing.
pub fn load_config_from(path: &Path) -> Result<TesseraConfig> {
    if !path.exists() {
        return Ok(TesseraConfig::default());
    }
    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|e| Error::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, TesseraConfig::default());
    }

    #[test]
    fn reads_known_fields_and_ignores_absent_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"ssh_sso_public_key": "c3NvLWtleQ=="}"#).unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.ssh_sso_public_key.as_deref(), Some("c3NvLWtleQ=="));
        assert!(config.clusterctl_path.is_none());
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        match load_config_from(&path) {
            Err(Error::Config { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected Config error, got {other:?}"),
        }
    }
}
