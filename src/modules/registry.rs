//! Registry of known modules.

use super::descriptor::{ModuleDescriptor, ModuleKind};
use crate::config::ConfiguredModule;
use crate::error::ResolveError;
use std::collections::{BTreeMap, HashMap};

const INPUT_JAX: &[&str] = &["input/TeX", "input/MathML"];
const OUTPUT_JAX: &[&str] = &["output/HTML-CSS", "output/NativeMML"];
const EXTENSIONS: &[&str] = &[
    "tex2jax.js",
    "mml2jax.js",
    "jsMath2jax.js",
    "MathMenu.js",
    "MathZoom.js",
];
const TEX_EXTENSIONS: &[&str] = &[
    "TeX/AMSmath.js",
    "TeX/AMSsymbols.js",
    "TeX/boldsymbol.js",
    "TeX/newcommand.js",
    "TeX/noErrors.js",
    "TeX/noUndefined.js",
    "TeX/verb.js",
];

/// Mapping from module name to descriptor.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, ModuleDescriptor>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the engine's builtin jax and extensions.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for name in INPUT_JAX.iter().chain(OUTPUT_JAX) {
            if let Some(jax) = ModuleDescriptor::jax(name) {
                registry.upsert(jax);
            }
        }
        for name in EXTENSIONS {
            registry.upsert(ModuleDescriptor::extension(name));
        }
        for name in TEX_EXTENSIONS {
            registry.upsert(ModuleDescriptor::extension(name).with_dependency("input/TeX"));
        }
        registry
    }

    /// Register a new module; fails if the name is taken.
    pub fn register(&mut self, descriptor: ModuleDescriptor) -> Result<(), ResolveError> {
        if self.modules.contains_key(&descriptor.name) {
            return Err(ResolveError::DuplicateModule {
                name: descriptor.name,
            });
        }
        self.modules.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Insert or replace a module.
    pub fn upsert(&mut self, descriptor: ModuleDescriptor) -> Option<ModuleDescriptor> {
        self.modules.insert(descriptor.name.clone(), descriptor)
    }

    /// Apply modules declared in configuration, replacing same-named entries.
    pub fn with_configured(mut self, configured: &BTreeMap<String, ConfiguredModule>) -> Self {
        for (name, module) in configured {
            let descriptor = ModuleDescriptor::new(name.as_str(), module.kind, module.path.as_str())
                .with_dependencies(module.dependencies.iter().cloned());
            self.upsert(descriptor);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Registered names of one kind, sorted.
    pub fn names_of_kind(&self, kind: ModuleKind) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .modules
            .values()
            .filter(|m| m.kind == kind)
            .map(|m| m.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

impl FromIterator<ModuleDescriptor> for ModuleRegistry {
    fn from_iter<I: IntoIterator<Item = ModuleDescriptor>>(iter: I) -> Self {
        let mut registry = Self::new();
        for descriptor in iter {
            registry.upsert(descriptor);
        }
        registry
    }
}
