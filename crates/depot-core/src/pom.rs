//! # POM Summary
//!
//! Stores need three facts from a project descriptor to synthesize
//! metadata: the packaging (plugins and archetypes are listed specially),
//! the display name, and a configured goal prefix.

use crate::error::StoreError;
use crate::xml::{self, Element};

const PLUGIN_PLUGIN: &str = "maven-plugin-plugin";

/// The parts of a POM that drive metadata synthesis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomSummary {
    /// Defaults to `jar` when the POM does not declare one.
    pub packaging: String,
    /// `<name>`
    pub name: Option<String>,
    /// `<description>`
    pub description: Option<String>,
    /// `goalPrefix` from the plugin-plugin configuration, if set.
    pub goal_prefix: Option<String>,
}

impl PomSummary {
    /// Read the summary from POM text.
    pub fn parse(input: &str) -> Result<Self, StoreError> {
        let root = xml::parse("pom", input)?;
        if root.name != "project" {
            return Err(StoreError::invalid_document(
                "pom",
                format!("unexpected root element <{}>", root.name),
            ));
        }
        let goal_prefix = root
            .descend(&["build", "plugins"])
            .and_then(find_goal_prefix)
            .or_else(|| {
                root.descend(&["build", "pluginManagement", "plugins"])
                    .and_then(find_goal_prefix)
            });
        Ok(Self {
            packaging: root
                .child_text("packaging")
                .unwrap_or_else(|| "jar".to_string()),
            name: root.child_text("name"),
            description: root.child_text("description"),
            goal_prefix,
        })
    }

    /// `maven-plugin` packaging.
    pub fn is_maven_plugin(&self) -> bool {
        self.packaging == "maven-plugin"
    }

    /// `maven-archetype` packaging.
    pub fn is_archetype(&self) -> bool {
        self.packaging == "maven-archetype"
    }

    /// Goal prefix for a plugin: configured value, else derived from the
    /// artifactId (`maven-X-plugin` and `X-maven-plugin` both give `X`).
    pub fn plugin_prefix(&self, artifact_id: &str) -> String {
        if let Some(prefix) = &self.goal_prefix {
            return prefix.clone();
        }
        if let Some(inner) = artifact_id
            .strip_prefix("maven-")
            .and_then(|s| s.strip_suffix("-plugin"))
        {
            return inner.to_string();
        }
        if let Some(inner) = artifact_id.strip_suffix("-maven-plugin") {
            return inner.to_string();
        }
        artifact_id.to_string()
    }
}

fn find_goal_prefix(plugins: &Element) -> Option<String> {
    plugins
        .children_named("plugin")
        .filter(|p| p.child_text("artifactId").as_deref() == Some(PLUGIN_PLUGIN))
        .find_map(|p| p.descend(&["configuration", "goalPrefix"]))
        .map(|e| e.text.trim().to_string())
        .filter(|s| !s.is_empty())
}
