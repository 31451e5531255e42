//! Configuration resolution.
//!
//! The resolved configuration is built in layers:
//! 1. **Defaults** - Embedded at build time from `./config/default.yaml`
//! 2. **Caller override** - Project and user files, or one explicit file
//! 3. **Config bundles** - Layers contributed by the names in `config: [...]`
//!
//! ## Merge Strategy
//! Trees merge key by key; lists and scalars are replaced wholesale. An
//! override whose shape conflicts with the default fails with
//! [`ConfigError::InvalidConfig`](crate::error::ConfigError::InvalidConfig).
//!
//! ## Environment Variables
//! - `JAX_STARTUP_CONFIG_PATH` - Explicit config file (overrides discovery)
//! - `JAX_STARTUP_PROJECT_DIR` - Project config dir (default: `.`)
//! - `JAX_STARTUP_USER_DIR` - User config dir (default: `<config dir>/jax-startup`)

pub mod bundles;
mod defaults;
mod loader;
mod merger;
mod options;
mod tree;

pub use defaults::Defaults;
pub use loader::{ConfigLayer, ConfigLoader, ConfigPaths, ConfigTier, read_config_file};
pub use merger::{is_compatible, merge, merge_all};
pub use options::{ConfiguredModule, DeferralCondition, StartupOptions};
pub use tree::{ConfigTree, ConfigValue, Shape};
