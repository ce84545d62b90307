//! Parses the layered registry configuration file.

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use swathcat_core::error::{CatalogError, CatalogResult};

const CONFIG_DIR_NAME: &str = ".swathcat";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneralConfig {
    pub identity_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub is_data_dir: bool,
    #[serde(default)]
    pub transparent: bool,
}

/// The parsed configuration file. `registries` preserves file order:
/// rightmost (last-declared) wins as the active registry, per the
/// configuration file's documented ordering rule.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub general: GeneralConfig,
    pub registries: Vec<(String, RegistryConfig)>,
}

impl Config {
    pub fn parse(text: &str) -> CatalogResult<Config> {
        let value: toml::Table = toml::from_str(text).map_err(|e| CatalogError::ConfigError(e.to_string()))?;

        let general = value
            .get("general")
            .map(|v| v.clone().try_into::<GeneralConfig>())
            .transpose()
            .map_err(|e| CatalogError::ConfigError(e.to_string()))?
            .unwrap_or_default();

        let mut registries = Vec::new();
        if let Some(toml::Value::Table(registry_table)) = value.get("registry") {
            for (name, raw) in registry_table.iter() {
                let cfg: RegistryConfig =
                    raw.clone().try_into().map_err(|e| CatalogError::ConfigError(e.to_string()))?;
                registries.push((name.clone(), cfg));
            }
        }

        Ok(Config { general, registries })
    }

    /// The registry config that should become the active registry: the
    /// last one declared in the file, unless `SWATHCAT_ON_THE_FLY`
    /// overrides it with a temporary directory at a higher layer.
    pub fn active_registry(&self) -> Option<&(String, RegistryConfig)> {
        self.registries.last()
    }

    /// Loads the configuration, searching upward from `start` for
    /// `.swathcat/config.toml`, falling back to the OS user config
    /// directory, and finally to an empty configuration if neither
    /// exists.
    pub fn load(start: &Path) -> CatalogResult<Config> {
        if let Some(path) = find_upward(start) {
            let text = std::fs::read_to_string(&path)?;
            return Config::parse(&text);
        }
        if let Some(dirs) = directories::ProjectDirs::from("", "", "swathcat") {
            let path = dirs.config_dir().join(CONFIG_FILE_NAME);
            if path.exists() {
                let text = std::fs::read_to_string(&path)?;
                return Config::parse(&text);
            }
        }
        Ok(Config::default())
    }

    /// Convenience wrapper over [`Config::load`] starting from the current
    /// working directory.
    pub fn load_default() -> CatalogResult<Config> {
        let cwd = env::current_dir()?;
        Config::load(&cwd)
    }
}

fn find_upward(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(d) = dir {
        let candidate = d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = d.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
        [general]
        identity_file = "/home/user/.swathcat/identity"

        [registry.reference]
        path = "/data/reference"
        is_data_dir = true
        transparent = false

        [registry.local]
        path = "/data/local"
        is_data_dir = true
        transparent = true
    "#;

    #[test]
    fn parses_registries_in_file_order() {
        let config = Config::parse(EXAMPLE).unwrap();
        assert_eq!(config.registries.len(), 2);
        assert_eq!(config.registries[0].0, "reference");
        assert_eq!(config.registries[1].0, "local");
    }

    #[test]
    fn active_registry_is_the_last_declared() {
        let config = Config::parse(EXAMPLE).unwrap();
        let (name, _) = config.active_registry().unwrap();
        assert_eq!(name, "local");
    }

    #[test]
    fn find_upward_locates_config_in_an_ancestor_directory() {
        let root = tempfile::tempdir().unwrap();
        let config_dir = root.path().join(CONFIG_DIR_NAME);
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join(CONFIG_FILE_NAME), EXAMPLE).unwrap();

        let nested = root.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_upward(&nested).unwrap();
        assert_eq!(found, config_dir.join(CONFIG_FILE_NAME));
    }
}
