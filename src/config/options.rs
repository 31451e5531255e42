//! Typed view over the resolved configuration tree.

use super::tree::ConfigTree;
use crate::error::ConfigError;
use crate::modules::ModuleKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Condition that startup waits for before typesetting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeferralCondition {
    /// Proceed without waiting (default).
    #[default]
    None,
    /// Wait for the page-loaded signal from the host.
    OnLoad,
    /// Wait for the host to declare configuration complete.
    Configured,
}

/// Module declared by configuration rather than the builtin registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredModule {
    pub kind: ModuleKind,
    /// Source path relative to `root`.
    pub path: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// The startup-relevant options of a resolved configuration.
///
/// Keys keep the casing they are authored with. Everything else in the tree
/// is handed to loaded modules untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupOptions {
    /// Base location that module source paths are relative to.
    #[serde(default = "default_root")]
    pub root: String,

    /// Config bundles applied while the configuration loads.
    #[serde(default)]
    pub config: Vec<String>,

    #[serde(default)]
    pub style_sheets: Vec<String>,

    #[serde(default)]
    pub styles: ConfigTree,

    #[serde(default)]
    pub jax: Vec<String>,

    #[serde(default)]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub delay_startup_until: DeferralCondition,

    #[serde(default)]
    pub skip_startup_typeset: bool,

    /// Elements for the initial typeset pass; empty means the whole document.
    #[serde(default)]
    pub elements: Vec<String>,

    #[serde(default)]
    pub modules: BTreeMap<String, ConfiguredModule>,
}

fn default_root() -> String {
    "[MathJax]".to_string()
}

impl StartupOptions {
    pub fn from_tree(tree: &ConfigTree) -> Result<Self, ConfigError> {
        serde_json::from_value(tree.to_json())
            .map_err(|e| ConfigError::parse("resolved configuration", e))
    }

    /// Modules requested for the session: jax first, then extensions.
    pub fn requested_modules(&self) -> Vec<String> {
        self.jax.iter().chain(self.extensions.iter()).cloned().collect()
    }
}
