//! Shared plumbing for the TasteSync command line tools

pub mod output;

use anyhow::{Context, Result};
use std::path::Path;
use tastesync_core::TasteSyncConfig;

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG: &str = "config.toml";

/// Initialize the logger.
///
/// Default: no logs (clean JSON output for parsing).
/// Verbose: Info level logs for debugging.
pub fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Off
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

/// Load the configuration named on the command line.
///
/// Without `--config`, `config.toml` is used when present; otherwise the
/// default filesystem store with environment overrides applies.
pub fn load_config(path: Option<&str>) -> Result<TasteSyncConfig> {
    match path {
        Some(path) => TasteSyncConfig::load(Path::new(path))
            .with_context(|| format!("Failed to load configuration from {}", path)),
        None if Path::new(DEFAULT_CONFIG).exists() => TasteSyncConfig::load(Path::new(DEFAULT_CONFIG)),
        None => {
            log::info!("No {} found, using the default filesystem store", DEFAULT_CONFIG);
            let mut config = TasteSyncConfig::default_filesystem();
            config.apply_env_overrides()?;
            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_must_exist() {
        assert!(load_config(Some("/nonexistent/tastesync.toml")).is_err());
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[storage]\nbackend = \"filesystem\"\n\n[storage.filesystem]\nbase_directory = \"/srv/library\"\n",
        )
        .unwrap();

        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.storage.filesystem.base_directory, "/srv/library");
    }
}
