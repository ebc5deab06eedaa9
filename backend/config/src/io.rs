//! Config file read/write.

use crate::schema::HeraldConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default config file name.
const CONFIG_FILE_NAME: &str = "herald.yaml";

/// Resolve the config file path.
/// Priority: `HERALD_CONFIG` env > `./herald.yaml`
pub fn config_file_path() -> PathBuf {
    match std::env::var("HERALD_CONFIG") {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(CONFIG_FILE_NAME),
    }
}

/// Load and parse the config from disk.
///
/// Returns `Ok(Default::default())` if the file doesn't exist.
pub async fn load_config(path: &Path) -> Result<HeraldConfig> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(HeraldConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: HeraldConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Write config to disk atomically (write to temp file, rename).
pub async fn write_config(config: &HeraldConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create config directory: {}", parent.display())
        })?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    let tmp = path.with_extension("yaml.tmp");
    fs::write(&tmp, yaml)
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to move config into place: {}", path.display()))?;

    debug!(path = %path.display(), "Config written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DispatchConfig;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("herald-config-{}-{}", name, std::process::id()))
            .join("herald.yaml")
    }

    #[tokio::test]
    async fn test_missing_file_yields_default() {
        let config = load_config(&scratch("missing")).await.unwrap();
        assert_eq!(config, HeraldConfig::default());
    }

    #[tokio::test]
    async fn test_write_then_load() {
        let path = scratch("roundtrip");
        let config = HeraldConfig {
            logging: None,
            dispatch: Some(DispatchConfig {
                blocked_words: Some(vec!["spam".into()]),
                ..Default::default()
            }),
        };
        write_config(&config, &path).await.unwrap();
        let loaded = load_config(&path).await.unwrap();
        assert_eq!(loaded, config);
        let _ = fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_invalid_yaml_reports_path() {
        let path = scratch("invalid");
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(&path, "dispatch: [not, a, map]").await.unwrap();
        let err = load_config(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config YAML"));
        let _ = fs::remove_dir_all(path.parent().unwrap()).await;
    }
}
