//! Configuration loader with tier-based merging.
//!
//! Collects caller overrides from the project and user tiers (or a single
//! explicit file) and folds them into one override tree.

use super::merger::merge;
use super::tree::ConfigTree;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name looked up in the project directory.
pub const PROJECT_FILE: &str = "jax-startup.yaml";
/// File name looked up in the user directory.
pub const USER_FILE: &str = "config.yaml";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Project-level config (`$CWD/jax-startup.yaml`)
    Project = 1,
    /// User-level config (`<config dir>/jax-startup/config.yaml`)
    User = 2,
    /// Explicit file (replaces discovery)
    Explicit = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Explicit => write!(f, "explicit"),
        }
    }
}

/// Paths for each configuration tier.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
    /// Explicit config file; when set, the other tiers are ignored
    pub explicit_file: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        // User dir: JAX_STARTUP_USER_DIR or <config dir>/jax-startup
        let user_dir = std::env::var("JAX_STARTUP_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|d| d.join("jax-startup")));

        // Project dir: JAX_STARTUP_PROJECT_DIR or $CWD
        let project_dir = std::env::var("JAX_STARTUP_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from(".")));

        let explicit_file = std::env::var("JAX_STARTUP_CONFIG_PATH").ok().map(PathBuf::from);

        Self {
            project_dir,
            user_dir,
            explicit_file,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
            explicit_file: None,
        }
    }

    /// Use a single explicit file instead of tier discovery.
    pub fn with_explicit_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }
}

/// One loaded override layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub tier: ConfigTier,
    pub path: PathBuf,
    pub tree: ConfigTree,
}

/// Loads caller overrides from the configured tiers.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Paths for each tier
    pub paths: ConfigPaths,
    layers: Vec<ConfigLayer>,
}

impl ConfigLoader {
    /// Load overrides from discovered tiers.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load overrides with explicit paths.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();

        if let Some(ref explicit) = paths.explicit_file {
            // An explicit file must exist
            let tree = read_config_file(explicit)?;
            info!(path = %explicit.display(), "Loaded explicit configuration");
            layers.push(ConfigLayer {
                tier: ConfigTier::Explicit,
                path: explicit.clone(),
                tree,
            });
            return Ok(Self { paths, layers });
        }

        let candidates = [
            (ConfigTier::Project, paths.project_dir.as_ref().map(|d| d.join(PROJECT_FILE))),
            (ConfigTier::User, paths.user_dir.as_ref().map(|d| d.join(USER_FILE))),
        ];
        for (tier, file) in candidates {
            let Some(file) = file else { continue };
            if !file.exists() {
                debug!(tier = %tier, path = %file.display(), "No configuration file");
                continue;
            }
            let tree = read_config_file(&file)?;
            info!(tier = %tier, path = %file.display(), "Loaded configuration tier");
            layers.push(ConfigLayer {
                tier,
                path: file,
                tree,
            });
        }

        Ok(Self { paths, layers })
    }

    /// Loaded layers, lowest priority first.
    pub fn layers(&self) -> &[ConfigLayer] {
        &self.layers
    }

    /// Collapse all layers into a single caller override tree.
    pub fn override_tree(&self) -> Result<ConfigTree, ConfigError> {
        self.layers
            .iter()
            .try_fold(ConfigTree::new(), |acc, layer| merge(&acc, &layer.tree))
    }
}

/// Read a configuration file; `.json` files are parsed as JSON, everything
/// else as YAML.
pub fn read_config_file(path: &Path) -> Result<ConfigTree, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let origin = path.display().to_string();
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => ConfigTree::from_json_str(&origin, &content),
        _ => ConfigTree::from_yaml_str(&origin, &content),
    }
}
