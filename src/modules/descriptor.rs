//! Loadable module descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role a module plays in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    /// Input jax: parses a math notation.
    #[serde(rename = "input")]
    InputJax,
    /// Output jax: renders parsed math.
    #[serde(rename = "output")]
    OutputJax,
    /// Optional feature module (menu, preprocessor, ...).
    Extension,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKind::InputJax => write!(f, "input"),
            ModuleKind::OutputJax => write!(f, "output"),
            ModuleKind::Extension => write!(f, "extension"),
        }
    }
}

/// A loadable unit: its name, load-time dependencies and source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,
    pub kind: ModuleKind,
    /// Modules that must be loaded before this one, in declaration order.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Source path relative to the configured root.
    pub source: String,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>, kind: ModuleKind, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            dependencies: Vec::new(),
            source: source.into(),
        }
    }

    /// Descriptor for a jax named `input/<X>` or `output/<X>`, loaded from
    /// `jax/<name>/config.js`. Returns `None` for names without either prefix.
    pub fn jax(name: &str) -> Option<Self> {
        let kind = if name.starts_with("input/") {
            ModuleKind::InputJax
        } else if name.starts_with("output/") {
            ModuleKind::OutputJax
        } else {
            return None;
        };
        Some(Self::new(name, kind, format!("jax/{}/config.js", name)))
    }

    /// Descriptor for an extension loaded from `extensions/<name>`.
    pub fn extension(name: &str) -> Self {
        Self::new(name, ModuleKind::Extension, format!("extensions/{}", name))
    }

    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(dependencies.into_iter().map(Into::into));
        self
    }

    /// Source location resolved against `root`.
    pub fn source_location(&self, root: &str) -> String {
        if root.is_empty() {
            self.source.clone()
        } else {
            format!("{}/{}", root.trim_end_matches('/'), self.source)
        }
    }
}
