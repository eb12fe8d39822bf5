//! Configuration file parsing for snek.toml.

use serde::Deserialize;
use snek_vm::GcConfig;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Heap and collector settings
    #[serde(default)]
    pub gc: GcSettings,
}

/// Heap and collector settings.
#[derive(Debug, Deserialize)]
pub struct GcSettings {
    /// Registry slots reserved at startup
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,

    /// Cap on live objects
    pub max_objects: Option<usize>,

    /// Live object count at which a collection is due
    #[serde(default = "default_threshold")]
    pub threshold: usize,
}

impl Default for GcSettings {
    fn default() -> Self {
        Self {
            initial_capacity: default_initial_capacity(),
            max_objects: None,
            threshold: default_threshold(),
        }
    }
}

impl GcSettings {
    /// Build the VM config, letting command line flags win over the file
    pub fn to_gc_config(&self, max_objects: Option<usize>, threshold: Option<usize>) -> GcConfig {
        GcConfig {
            initial_capacity: self.initial_capacity,
            max_objects: max_objects.or(self.max_objects),
            gc_threshold: threshold.unwrap_or(self.threshold),
        }
    }
}

fn default_initial_capacity() -> usize {
    GcConfig::default().initial_capacity
}

fn default_threshold() -> usize {
    GcConfig::default().gc_threshold
}

/// Load configuration from a file or search for default config files.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config_path = path.map(PathBuf::from).or_else(find_config_file);

    match config_path {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            tracing::debug!(path = %path.display(), "loaded config");
            Ok(config)
        }
        Some(path) => anyhow::bail!("Config file {} does not exist", path.display()),
        None => Ok(Config::default()),
    }
}

/// Search for configuration file in the current directory and parent directories.
fn find_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;

    const CONFIG_NAMES: &[&str] = &["snek.toml", ".snekrc.toml"];

    let mut dir = Some(cwd.as_path());
    while let Some(current) = dir {
        for name in CONFIG_NAMES {
            let path = current.join(name);
            if path.exists() {
                return Some(path);
            }
        }
        dir = current.parent();
    }

    None
}
