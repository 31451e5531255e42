//! Config bundles named in the `config` list.
//!
//! A bundle inspects the configuration resolved so far and contributes a
//! further override layer.

use super::tree::{ConfigTree, ConfigValue};
use crate::environment::{EnvironmentIdentity, RendererPreference};
use tracing::debug;

/// Output jax used for native MathML rendering.
pub const NATIVE_MML_JAX: &str = "output/NativeMML";
/// Output jax used for HTML-CSS rendering.
pub const HTML_CSS_JAX: &str = "output/HTML-CSS";

/// Name of the builtin renderer-selection bundle.
pub const MML_OR_HTML: &str = "MMLorHTML.js";

/// Whether `name` is handled without consulting the host.
pub fn is_builtin(name: &str) -> bool {
    name == MML_OR_HTML
}

/// Apply a builtin bundle, returning its override layer.
pub fn apply_builtin(
    name: &str,
    resolved: &ConfigTree,
    env: &EnvironmentIdentity,
) -> Option<ConfigTree> {
    match name {
        MML_OR_HTML => Some(mml_or_html(resolved, env)),
        _ => None,
    }
}

/// Preference for the environment from `MMLorHTML.prefer`, falling back to
/// the `other` entry and then to HTML.
pub fn renderer_preference(resolved: &ConfigTree, env: &EnvironmentIdentity) -> RendererPreference {
    let prefer = resolved.get_path("MMLorHTML.prefer").and_then(ConfigValue::as_tree);
    prefer
        .and_then(|table| {
            table
                .get(env.browser.key())
                .or_else(|| table.get("other"))
        })
        .and_then(ConfigValue::as_str)
        .and_then(RendererPreference::parse)
        .unwrap_or(RendererPreference::Html)
}

/// Pick one output jax for the environment.
///
/// Non-output jax keep their order; other output jax are dropped and the
/// chosen one takes the place of the first output jax (or is appended).
fn mml_or_html(resolved: &ConfigTree, env: &EnvironmentIdentity) -> ConfigTree {
    let chosen = match renderer_preference(resolved, env) {
        RendererPreference::Mml if env.native_mathml => NATIVE_MML_JAX,
        _ => HTML_CSS_JAX,
    };
    debug!(browser = %env.browser, output = chosen, "MMLorHTML selected output jax");

    let current = resolved.get("jax").map(ConfigValue::string_items).unwrap_or_default();
    let mut jax: Vec<&str> = Vec::with_capacity(current.len() + 1);
    let mut placed = false;
    for name in current {
        if name.starts_with("output/") {
            if !placed {
                jax.push(chosen);
                placed = true;
            }
        } else {
            jax.push(name);
        }
    }
    if !placed {
        jax.push(chosen);
    }

    ConfigTree::new().with("jax", jax)
}
