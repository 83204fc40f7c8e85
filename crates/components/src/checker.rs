//! Static sanity checks on component definitions
//!
//! The checker never mutates the graph. Each finding is a human-readable
//! warning; the installer keeps running.

use crate::component::{Component, DefaultValue};
use crate::graph::{ComponentGraph, ComponentType};
use rivet_types::InstallerMode;

/// Check one component, by exact name
///
/// Unknown names yield no warnings.
#[must_use]
pub fn check_component(graph: &ComponentGraph, name: &str) -> Vec<String> {
    match graph.component(name) {
        Some(component) => check(graph, component),
        None => Vec::new(),
    }
}

/// Check every component in declaration order
#[must_use]
pub fn check_all(graph: &ComponentGraph) -> Vec<(String, Vec<String>)> {
    graph
        .components(ComponentType::All)
        .into_iter()
        .map(|component| (component.name.clone(), check(graph, component)))
        .filter(|(_, warnings)| !warnings.is_empty())
        .collect()
}

fn check(graph: &ComponentGraph, component: &Component) -> Vec<String> {
    let mut warnings = Vec::new();
    let name = &component.name;
    let scripted_default = component.default_value == DefaultValue::Script;
    let default_true = component.default_value == DefaultValue::True;
    let has_dependees = !graph.dependees(name).is_empty();

    if !component.auto_dependencies.is_empty() {
        if component.forced_installation {
            warnings.push(format!(
                "Component {name} specifies \"ForcedInstallation\" property together with \
                 \"AutoDependOn\" list. This combination of states may not work properly."
            ));
        }
        if scripted_default {
            warnings.push(format!(
                "Component {name} specifies script value for \"Default\" property together \
                 with \"AutoDependOn\" list. This combination of states may not work properly."
            ));
        }
        if default_true {
            warnings.push(format!(
                "Component {name} specifies \"Default\" property together with \"AutoDependOn\" \
                 list. This combination of states may not work properly."
            ));
        }
        if has_dependees {
            warnings.push(format!(
                "Other components depend on auto dependent component {name}. This may not \
                 work properly."
            ));
        }
        for dependency in &component.dependencies {
            let Some(target) = graph.component_by_name(dependency) else {
                continue;
            };
            if component.auto_dependencies.contains(&target.name) {
                warnings.push(format!(
                    "Component {name} specifies both dependency and auto dependency on \
                     component {}. The dependency might be superfluous.",
                    target.name
                ));
            }
        }
    }

    if graph.mode() != InstallerMode::Installer {
        return warnings;
    }

    if component.is_tristate() {
        if scripted_default {
            warnings.push(format!(
                "Component {name} specifies script value for \"Default\" property while not \
                 being a leaf node. The \"Default\" property will get a \"false\" value."
            ));
        }
        if default_true {
            warnings.push(format!(
                "Component {name} specifies \"Default\" property while not being a leaf node. \
                 The \"Default\" property will get a \"false\" value."
            ));
        }
    }

    if !component.checkable {
        if scripted_default {
            warnings.push(format!(
                "Component {name} specifies script value for \"Default\" property while being \
                 not checkable. The \"Default\" property will get a \"false\" value."
            ));
        }
        if default_true {
            warnings.push(format!(
                "Component {name} specifies \"Default\" property while being not checkable. \
                 The \"Default\" property will get a \"false\" value."
            ));
        }
    }

    if component.child_count() > 0 {
        if !component.auto_dependencies.is_empty() {
            warnings.push(format!(
                "Component {name} auto depends on other components while having children \
                 components. This will not work properly."
            ));
        }
        if !component.dependencies.is_empty() {
            warnings.push(format!(
                "Component {name} depends on other components while having children \
                 components. This will not work properly."
            ));
        }
        if has_dependees {
            warnings.push(format!(
                "Other components depend on component {name} which has children components. \
                 This will not work properly."
            ));
        }
    }

    for auto_dependency in &component.auto_dependencies {
        let Some(target) = graph.component_by_name(auto_dependency) else {
            continue;
        };
        if target.child_count() > 0 {
            warnings.push(format!(
                "Component {name} auto depends on component {} which has children components. \
                 This will not work properly.",
                target.name
            ));
        }
    }

    warnings
}
