//! Deep merge of configuration trees.
//!
//! Trees are merged key by key; lists and scalars in the override replace the
//! default wholesale. Shape conflicts abort the merge.

use super::tree::{ConfigTree, ConfigValue};
use crate::error::ConfigError;

/// Deep merge `overlay` over `defaults`, with `overlay` taking precedence.
///
/// - Trees are merged recursively: keys in overlay override keys in defaults
/// - Lists and scalars are replaced entirely
/// - A null overlay value preserves the default (null means "not specified")
/// - A null default accepts an overlay value of any shape
/// - Keys unknown to the defaults are added as-is
///
/// # Example
/// ```
/// use serde_json::json;
/// use jax_startup::config::{merge, ConfigTree};
///
/// let defaults: ConfigTree = serde_json::from_value(json!({
///     "HTML-CSS": { "scale": 100, "webFont": "TeX" },
///     "jax": ["input/MathML", "output/HTML-CSS"]
/// })).unwrap();
/// let overlay: ConfigTree = serde_json::from_value(json!({
///     "HTML-CSS": { "scale": 120 },
///     "jax": ["input/TeX"]
/// })).unwrap();
/// let merged = merge(&defaults, &overlay).unwrap();
/// assert_eq!(
///     merged.to_json(),
///     json!({
///         "HTML-CSS": { "scale": 120, "webFont": "TeX" },
///         "jax": ["input/TeX"]
///     })
/// );
/// ```
pub fn merge(defaults: &ConfigTree, overlay: &ConfigTree) -> Result<ConfigTree, ConfigError> {
    merge_tree(defaults.clone(), overlay, "")
}

/// Merge several override layers in order, later layers taking precedence.
///
/// Equivalent to folding [`merge`] over the layers.
pub fn merge_all<'a>(
    defaults: &ConfigTree,
    layers: impl IntoIterator<Item = &'a ConfigTree>,
) -> Result<ConfigTree, ConfigError> {
    layers
        .into_iter()
        .try_fold(defaults.clone(), |acc, layer| merge_tree(acc, layer, ""))
}

fn merge_tree(
    mut base: ConfigTree,
    overlay: &ConfigTree,
    prefix: &str,
) -> Result<ConfigTree, ConfigError> {
    for (key, overlay_value) in overlay.iter() {
        let path = join_path(prefix, key);
        let merged = match base.remove(key) {
            Some(base_value) => merge_value(base_value, overlay_value, &path)?,
            None => overlay_value.clone(),
        };
        base.insert(key, merged);
    }
    Ok(base)
}

fn merge_value(
    base: ConfigValue,
    overlay: &ConfigValue,
    path: &str,
) -> Result<ConfigValue, ConfigError> {
    match (base, overlay) {
        (base, ConfigValue::Null) => Ok(base),
        (ConfigValue::Null, overlay) => Ok(overlay.clone()),
        (ConfigValue::Tree(base_tree), ConfigValue::Tree(overlay_tree)) => {
            merge_tree(base_tree, overlay_tree, path).map(ConfigValue::Tree)
        }
        (base, overlay) if base.shape() == overlay.shape() => Ok(overlay.clone()),
        (base, overlay) => Err(ConfigError::invalid(path, base.shape(), overlay.shape())),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Whether `overlay` could be merged over `defaults` without a shape error.
pub fn is_compatible(defaults: &ConfigTree, overlay: &ConfigTree) -> bool {
    merge(defaults, overlay).is_ok()
}
