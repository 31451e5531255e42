//! The seam between the sequencer and the external engine.

use crate::config::ConfigTree;
use crate::modules::ModuleDescriptor;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// A typesetting pass request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypesetRequest {
    /// Element ids to typeset; empty means the whole document.
    pub elements: Vec<String>,
}

/// External loader and renderer that the sequencer drives.
///
/// Every call completes when the external operation has finished; the
/// sequencer does not start the next stage before then.
#[async_trait]
pub trait StartupHost: Send + Sync {
    /// Fetch a config bundle that is not built in.
    async fn load_config(&self, name: &str) -> Result<ConfigTree> {
        Err(anyhow!("no loader available for config bundle '{}'", name))
    }

    /// Fetch and attach one stylesheet.
    async fn load_stylesheet(&self, location: &str) -> Result<()>;

    /// Instantiate the configured style rules.
    async fn apply_styles(&self, styles: &ConfigTree) -> Result<()>;

    /// Fetch and initialize one module.
    async fn load_module(
        &self,
        module: &ModuleDescriptor,
        location: &str,
        config: &ConfigTree,
    ) -> Result<()>;

    /// Run a typesetting pass.
    async fn typeset(&self, request: &TypesetRequest, config: &ConfigTree) -> Result<()>;
}

/// Host that performs no work and reports each call through tracing.
#[derive(Debug, Clone, Default)]
pub struct TracingHost;

#[async_trait]
impl StartupHost for TracingHost {
    async fn load_stylesheet(&self, location: &str) -> Result<()> {
        info!(location, "Load stylesheet");
        Ok(())
    }

    async fn apply_styles(&self, styles: &ConfigTree) -> Result<()> {
        info!(rules = styles.len(), "Apply styles");
        Ok(())
    }

    async fn load_module(
        &self,
        module: &ModuleDescriptor,
        location: &str,
        _config: &ConfigTree,
    ) -> Result<()> {
        info!(module = %module.name, kind = %module.kind, location, "Load module");
        Ok(())
    }

    async fn typeset(&self, request: &TypesetRequest, _config: &ConfigTree) -> Result<()> {
        if request.elements.is_empty() {
            info!("Typeset document");
        } else {
            info!(elements = ?request.elements, "Typeset elements");
        }
        Ok(())
    }
}
