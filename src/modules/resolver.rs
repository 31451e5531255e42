//! Dependency-ordered load planning and cycle detection.

use super::descriptor::ModuleDescriptor;
use super::registry::ModuleRegistry;
use crate::error::ResolveError;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Ordered, duplicate-free modules with every dependency placed before its
/// dependents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LoadPlan {
    modules: Vec<ModuleDescriptor>,
}

impl LoadPlan {
    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.modules.iter().position(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ModuleDescriptor> {
        self.modules.iter()
    }
}

impl<'a> IntoIterator for &'a LoadPlan {
    type Item = &'a ModuleDescriptor;
    type IntoIter = std::slice::Iter<'a, ModuleDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.modules.iter()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current depth-first path.
    Visiting,
    /// Already placed in the plan.
    Placed,
}

/// Resolve requested module names into a load plan.
///
/// Dependencies are pulled in depth-first, in declaration order, ahead of
/// the module that needs them. Modules without an ordering constraint keep
/// the request order; a module requested or pulled in more than once
/// appears once, at its first placement.
pub fn resolve<S: AsRef<str>>(
    names: &[S],
    registry: &ModuleRegistry,
) -> Result<LoadPlan, ResolveError> {
    let mut resolver = Resolver {
        registry,
        marks: HashMap::new(),
        path: Vec::new(),
        plan: Vec::new(),
    };
    for name in names {
        resolver.visit(name.as_ref(), None)?;
    }
    debug!(modules = ?resolver.plan.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(), "Resolved load plan");
    Ok(LoadPlan {
        modules: resolver.plan,
    })
}

struct Resolver<'r> {
    registry: &'r ModuleRegistry,
    marks: HashMap<&'r str, Mark>,
    path: Vec<&'r str>,
    plan: Vec<ModuleDescriptor>,
}

impl<'r> Resolver<'r> {
    fn visit(&mut self, name: &str, required_by: Option<&str>) -> Result<(), ResolveError> {
        let registry = self.registry;
        let descriptor = registry
            .get(name)
            .ok_or_else(|| ResolveError::UnknownModule {
                name: name.to_string(),
                required_by: required_by.map(str::to_string),
            })?;
        let name = descriptor.name.as_str();

        match self.marks.get(name) {
            Some(Mark::Placed) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = self.path.iter().position(|n| *n == name).unwrap_or(0);
                let mut cycle: Vec<String> =
                    self.path[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(name.to_string());
                return Err(ResolveError::CyclicDependency { cycle });
            }
            None => {}
        }

        self.marks.insert(name, Mark::Visiting);
        self.path.push(name);
        for dependency in &descriptor.dependencies {
            self.visit(dependency, Some(name))?;
        }
        self.path.pop();
        self.marks.insert(name, Mark::Placed);
        self.plan.push(descriptor.clone());
        Ok(())
    }
}
