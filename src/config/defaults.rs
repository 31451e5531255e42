//! Built-in engine defaults, embedded at build time from `config/default.yaml`.

use super::tree::ConfigTree;
use crate::error::ConfigError;

const DEFAULT_CONFIG_YAML: &str = include_str!("../../config/default.yaml");

/// Holds the engine's default configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Defaults {
    tree: ConfigTree,
}

impl Defaults {
    /// The embedded engine defaults.
    pub fn builtin() -> Result<Self, ConfigError> {
        ConfigTree::from_yaml_str("embedded defaults", DEFAULT_CONFIG_YAML).map(Self::from_tree)
    }

    pub fn from_tree(tree: ConfigTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    pub fn into_tree(self) -> ConfigTree {
        self.tree
    }
}
