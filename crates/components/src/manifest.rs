//! TOML component manifests
//!
//! ```toml
//! [[repository]]
//! url = "https://example.com/repo"
//!
//! [[component]]
//! name = "app"
//! version = "1.2"
//! uncompressed_size = 1000
//! default = true
//!
//! [[component.operation]]
//! name = "CreateLink"
//! arguments = ["/opt/app/bin/app", "/opt/app/current/app"]
//!
//! [[component.children]]
//! name = "app.docs"
//! version = "1.2"
//! ```

use crate::component::{Component, DefaultValue};
use crate::graph::ComponentGraph;
use rivet_errors::{ComponentError, Error};
use rivet_types::{parse_lenient, InstallerMode, OperationSpec, Repository};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parsed manifest document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "repository")]
    pub repositories: Vec<Repository>,
    #[serde(default, rename = "component")]
    pub components: Vec<ComponentDefinition>,
}

/// One component entry, possibly with nested children
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDefinition {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub uncompressed_size: u64,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub auto_dependencies: Vec<String>,
    #[serde(default)]
    pub forced_installation: bool,
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
    #[serde(default = "default_checkable")]
    pub checkable: bool,
    #[serde(default)]
    pub default: DefaultValue,
    #[serde(default)]
    pub installed: bool,
    #[serde(default, rename = "operation")]
    pub operations: Vec<OperationSpec>,
    #[serde(default)]
    pub children: Vec<ComponentDefinition>,
}

fn default_checkable() -> bool {
    true
}

/// Graph built from a manifest plus the definitions that were rejected
#[derive(Debug)]
pub struct LoadedGraph {
    pub graph: ComponentGraph,
    pub repositories: Vec<Repository>,
    /// Later duplicates, dropped together with their children
    pub rejected: Vec<ComponentError>,
}

impl Manifest {
    /// Parse a manifest from TOML text
    ///
    /// # Errors
    ///
    /// Returns a config parse error for malformed TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self, Error> {
        Ok(toml::from_str(contents)?)
    }

    /// Read and parse a manifest file
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read or a parse error for
    /// malformed TOML.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
        Self::from_toml_str(&contents)
    }

    /// Build a component graph
    ///
    /// Duplicate names keep the first definition; later ones are collected
    /// in `rejected`.
    ///
    /// # Errors
    ///
    /// Returns an error for unparsable versions or for children in updater
    /// mode.
    pub fn build_graph(&self, mode: InstallerMode) -> Result<LoadedGraph, Error> {
        let mut graph = ComponentGraph::new(mode);
        let mut rejected = Vec::new();

        let mut pending: Vec<(Option<crate::ComponentId>, &ComponentDefinition)> =
            self.components.iter().rev().map(|def| (None, def)).collect();

        while let Some((parent, definition)) = pending.pop() {
            let component = definition.to_component()?;
            let appended = match parent {
                None => graph.append_root(component),
                Some(parent) => graph.append_child(parent, component),
            };
            match appended {
                Ok(id) => {
                    pending.extend(definition.children.iter().rev().map(|c| (Some(id), c)));
                }
                Err(err @ ComponentError::Duplicate { .. }) => {
                    tracing::warn!(error = %err, "rejecting duplicate component definition");
                    rejected.push(err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        graph.apply_default_selection();
        Ok(LoadedGraph {
            graph,
            repositories: self.repositories.clone(),
            rejected,
        })
    }
}

impl ComponentDefinition {
    fn to_component(&self) -> Result<Component, Error> {
        let mut component = Component::new(self.name.clone(), parse_lenient(&self.version)?);
        component.uncompressed_size = self.uncompressed_size;
        component.dependencies.clone_from(&self.dependencies);
        component.auto_dependencies.clone_from(&self.auto_dependencies);
        component.forced_installation = self.forced_installation;
        component.is_virtual = self.is_virtual;
        component.checkable = self.checkable;
        component.default_value = self.default;
        component.operations.clone_from(&self.operations);
        component.installed = self.installed;
        Ok(component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
[[repository]]
url = "https://example.com/repo"
is_default = true

[[component]]
name = "root"
version = "1.0"
uncompressed_size = 1000

[[component.children]]
name = "root.child1"
version = "1.0"
uncompressed_size = 1500
default = true

[[component.children.operation]]
name = "CreateLink"
arguments = ["/opt/app/link", "/opt/app/target"]

[[component.children]]
name = "root.child2"
version = "1.0"
uncompressed_size = 250
default = "script"

[[component]]
name = "root"
version = "2.0"
"#;

    #[test]
    fn test_build_graph_from_manifest() {
        let manifest = Manifest::from_toml_str(MANIFEST).unwrap();
        assert_eq!(manifest.repositories.len(), 1);
        assert!(manifest.repositories[0].enabled);

        let loaded = manifest.build_graph(InstallerMode::Installer).unwrap();
        assert_eq!(loaded.graph.len(), 3);
        assert_eq!(loaded.rejected.len(), 1);

        let child1 = loaded.graph.component("root.child1").unwrap();
        assert!(child1.is_selected());
        assert_eq!(child1.operations[0].name, "CreateLink");

        let child2 = loaded.graph.component("root.child2").unwrap();
        assert_eq!(child2.default_value, DefaultValue::Script);
        assert!(!child2.is_selected());

        let root = loaded.graph.id_of("root").unwrap();
        assert_eq!(loaded.graph.get(root).child_count(), 2);
        assert_eq!(loaded.graph.get(root).version.to_string(), "1.0.0");
    }

    #[test]
    fn test_updater_mode_rejects_nested_manifest() {
        let manifest = Manifest::from_toml_str(MANIFEST).unwrap();
        assert!(manifest.build_graph(InstallerMode::Updater).is_err());
    }

    #[test]
    fn test_invalid_default_value() {
        let result = Manifest::from_toml_str(
            r#"
[[component]]
name = "a"
version = "1"
default = "sometimes"
"#,
        );
        assert!(result.is_err());
    }
}
