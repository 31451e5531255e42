//! Output formatting for resolved configuration and load plans.

use crate::config::ConfigTree;
use crate::modules::LoadPlan;
use anyhow::Result;
use serde::Serialize;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
    Markdown,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "yaml" | "yml" => Some(OutputFormat::Yaml),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

fn serialize<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        _ => serde_yaml::to_string(value)?,
    })
}

/// Format a resolved configuration tree.
pub fn format_config(tree: &ConfigTree, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Markdown => {
            let mut md = String::from("## Resolved configuration\n\n```yaml\n");
            md.push_str(&serde_yaml::to_string(tree)?);
            md.push_str("```\n");
            Ok(md)
        }
        _ => serialize(tree, format),
    }
}

#[derive(Serialize)]
struct PlanEntry<'a> {
    name: &'a str,
    kind: String,
    location: String,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    dependencies: &'a [String],
}

/// Format a load plan with sources resolved against `root`.
pub fn format_plan(plan: &LoadPlan, root: &str, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Markdown {
        return Ok(format_plan_markdown(plan, root));
    }
    let entries: Vec<PlanEntry<'_>> = plan
        .iter()
        .map(|m| PlanEntry {
            name: &m.name,
            kind: m.kind.to_string(),
            location: m.source_location(root),
            dependencies: &m.dependencies,
        })
        .collect();
    serialize(&entries, format)
}

/// Format a load plan as a numbered markdown list.
pub fn format_plan_markdown(plan: &LoadPlan, root: &str) -> String {
    let mut md = String::from("## Load plan\n");
    if plan.is_empty() {
        md.push_str("\n_No modules requested._\n");
        return md;
    }
    md.push('\n');
    for (idx, module) in plan.iter().enumerate() {
        md.push_str(&format!(
            "{}. **{}** ({}) `{}`",
            idx + 1,
            module.name,
            module.kind,
            module.source_location(root)
        ));
        if !module.dependencies.is_empty() {
            let deps: Vec<String> = module.dependencies.iter().map(|d| format!("`{}`", d)).collect();
            md.push_str(&format!(" after {}", deps.join(", ")));
        }
        md.push('\n');
    }
    md
}
