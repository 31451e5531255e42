//! Shared recording host for startup tests.

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use jax_startup::config::ConfigTree;
use jax_startup::modules::ModuleDescriptor;
use jax_startup::startup::{StartupHost, TypesetRequest};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Host that records every call and fails on request.
#[derive(Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    bundles: HashMap<String, ConfigTree>,
    stylesheet_gate: Option<Arc<Notify>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `tree` when the config bundle `name` is requested.
    pub fn with_bundle(mut self, name: &str, tree: ConfigTree) -> Self {
        self.bundles.insert(name.to_string(), tree);
        self
    }

    /// Hold every stylesheet load until `gate` is notified.
    pub fn with_stylesheet_gate(mut self, gate: Arc<Notify>) -> Self {
        self.stylesheet_gate = Some(gate);
        self
    }

    /// Make the call recorded as `call` fail until cleared.
    pub fn fail_on(&self, call: &str) {
        self.failing.lock().unwrap().insert(call.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Names of modules loaded, in order.
    pub fn loaded_modules(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("module:").map(String::from))
            .collect()
    }

    fn record(&self, call: String) -> Result<()> {
        if self.failing.lock().unwrap().contains(&call) {
            return Err(anyhow!("{} failed", call));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl StartupHost for RecordingHost {
    async fn load_config(&self, name: &str) -> Result<ConfigTree> {
        self.record(format!("config:{}", name))?;
        self.bundles
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("config bundle {} not found", name))
    }

    async fn load_stylesheet(&self, location: &str) -> Result<()> {
        if let Some(ref gate) = self.stylesheet_gate {
            gate.notified().await;
        }
        self.record(format!("stylesheet:{}", location))
    }

    async fn apply_styles(&self, _styles: &ConfigTree) -> Result<()> {
        self.record("styles".to_string())
    }

    async fn load_module(
        &self,
        module: &ModuleDescriptor,
        _location: &str,
        _config: &ConfigTree,
    ) -> Result<()> {
        tokio::task::yield_now().await;
        self.record(format!("module:{}", module.name))
    }

    async fn typeset(&self, request: &TypesetRequest, _config: &ConfigTree) -> Result<()> {
        self.record(format!("typeset:{}", request.elements.join(",")))
    }
}

pub fn tree(value: serde_json::Value) -> ConfigTree {
    serde_json::from_value(value).expect("valid configuration tree")
}
