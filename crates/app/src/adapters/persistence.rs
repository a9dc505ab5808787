use anyhow::{Context, Result};
use directories::ProjectDirs;
use gitkeel_core::ports::ConfigStore;
use gitkeel_core::ports::EngineConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// TOML-file configuration store that implements ConfigStore
pub struct TomlConfigStore {
    config_path: PathBuf,
}

impl TomlConfigStore {
    pub fn new() -> Result<Self> {
        let config_path = Self::get_default_config_path()?;
        Ok(Self { config_path })
    }

    pub fn with_path<P: AsRef<Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    fn get_default_config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "gitkeel") {
            return Ok(proj_dirs.config_dir().join("gitkeel.toml"));
        }
        // Platforms without a convention fall back to ~/.config
        let home = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(home.join(".config").join("gitkeel").join("gitkeel.toml"))
    }

    /// Create default config if it doesn't exist
    fn ensure_config_exists(&self, default_config: &EngineConfig) -> Result<()> {
        if !self.config_path.exists() {
            // Create directory if it doesn't exist
            if let Some(parent) = self.config_path.parent() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
            self.save(default_config)?;
        }
        Ok(())
    }
}

impl ConfigStore for TomlConfigStore {
    fn load(&self) -> Result<EngineConfig> {
        self.ensure_config_exists(&EngineConfig::default())?;

        let contents = fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;

        let config: EngineConfig = toml::from_str(&contents).with_context(|| {
            format!("Failed to parse config file: {}", self.config_path.display())
        })?;

        Ok(config)
    }

    fn save(&self, config: &EngineConfig) -> Result<()> {
        let contents = toml::to_string_pretty(config).context("Failed to serialize config to TOML")?;

        fs::write(&self.config_path, contents).with_context(|| {
            format!("Failed to write config file: {}", self.config_path.display())
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitkeel_core::ports::ScanOptions;
    use tempfile::TempDir;

    #[test]
    fn load_nonexistent_creates_default() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nonexistent.toml");

        let store = TomlConfigStore::with_path(&config_path);
        let config = store.load()?;

        // Default config: version 1 and no implicit scan roots
        assert_eq!(config.version, 1);
        assert!(config.scan_roots.is_empty());
        assert_eq!(config.scan, ScanOptions::default());

        // The file was created on first load
        assert!(config_path.exists());

        Ok(())
    }

    #[test]
    fn save_and_load_round_trips() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("test.toml");

        let store = TomlConfigStore::with_path(&config_path);

        let config = EngineConfig {
            version: 1,
            scan_roots: vec![PathBuf::from("/custom/path"), PathBuf::from("/another")],
            scan: ScanOptions {
                max_depth: 3,
                entry_limit: Some(500),
            },
        };

        store.save(&config)?;
        let loaded = store.load()?;

        assert_eq!(config, loaded);

        Ok(())
    }

    #[test]
    fn partial_files_fill_in_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(&config_path, "version = 1\n")?;

        let store = TomlConfigStore::with_path(&config_path);
        let config = store.load()?;

        assert!(config.scan_roots.is_empty());
        assert_eq!(config.scan.max_depth, ScanOptions::default().max_depth);

        Ok(())
    }

    #[test]
    fn default_config_path_uses_the_app_name() -> Result<()> {
        let path = TomlConfigStore::get_default_config_path()?;
        assert!(path.ends_with("gitkeel.toml"));
        Ok(())
    }
}
