//! Component tree and dependency lookups
//!
//! Components live in an arena; the parent/child tree is expressed with
//! indices and the dependency graph by name. Declaration order is the
//! pre-order walk of the tree, which is the tie-break order used by the
//! resolver.

use crate::component::{CheckState, Component, ComponentId};
use rivet_errors::ComponentError;
use rivet_types::{DependencyRef, InstallerMode};
use std::collections::HashMap;

/// Which components to list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    Root,
    All,
}

#[derive(Debug, Clone)]
pub struct ComponentGraph {
    mode: InstallerMode,
    components: Vec<Component>,
    roots: Vec<ComponentId>,
    by_name: HashMap<String, ComponentId>,
    revision: u64,
}

impl ComponentGraph {
    #[must_use]
    pub fn new(mode: InstallerMode) -> Self {
        Self {
            mode,
            components: Vec::new(),
            roots: Vec::new(),
            by_name: HashMap::new(),
            revision: 0,
        }
    }

    #[must_use]
    pub fn mode(&self) -> InstallerMode {
        self.mode
    }

    /// Bumped on every mutation that can change a resolution
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Add a top-level component
    ///
    /// # Errors
    ///
    /// Returns `ComponentError::Duplicate` if the name is already taken; the
    /// existing definition is kept.
    pub fn append_root(&mut self, component: Component) -> Result<ComponentId, ComponentError> {
        let id = self.insert(component, None)?;
        self.roots.push(id);
        Ok(id)
    }

    /// Add a component below `parent`
    ///
    /// # Errors
    ///
    /// Returns `ComponentError::ChildrenInUpdaterMode` in updater mode and
    /// `ComponentError::Duplicate` if the name is already taken.
    pub fn append_child(
        &mut self,
        parent: ComponentId,
        component: Component,
    ) -> Result<ComponentId, ComponentError> {
        if self.mode == InstallerMode::Updater {
            return Err(ComponentError::ChildrenInUpdaterMode {
                parent: self.components[parent.0].name.clone(),
            });
        }
        let id = self.insert(component, Some(parent))?;
        self.components[parent.0].children.push(id);
        Ok(id)
    }

    fn insert(
        &mut self,
        mut component: Component,
        parent: Option<ComponentId>,
    ) -> Result<ComponentId, ComponentError> {
        if self.by_name.contains_key(&component.name) {
            return Err(ComponentError::Duplicate {
                name: component.name,
            });
        }
        let id = ComponentId(self.components.len());
        component.parent = parent;
        component.children.clear();
        self.by_name.insert(component.name.clone(), id);
        self.components.push(component);
        self.revision += 1;
        Ok(id)
    }

    /// Component by arena id
    ///
    /// # Panics
    ///
    /// Panics if `id` was handed out by a different graph with fewer
    /// components. Ids are only valid for the graph that created them.
    #[must_use]
    pub fn get(&self, id: ComponentId) -> &Component {
        &self.components[id.0]
    }

    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<ComponentId> {
        self.by_name.get(name).copied()
    }

    /// Look up a component by exact name
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.id_of(name).map(|id| self.get(id))
    }

    /// Resolve a possibly version-qualified reference to an id
    ///
    /// An exact name match wins. Otherwise the reference is split into name
    /// and constraint and the component is returned only if its version
    /// satisfies the constraint.
    #[must_use]
    pub fn resolve(&self, query: &str) -> Option<ComponentId> {
        if let Some(id) = self.id_of(query) {
            return Some(id);
        }
        let reference: DependencyRef = query.parse().ok()?;
        let id = self.id_of(&reference.name)?;
        reference.accepts(&self.get(id).version).then_some(id)
    }

    /// Look up a component by `name`, `name-1.0.1` or `name->2.0.0`
    #[must_use]
    pub fn component_by_name(&self, query: &str) -> Option<&Component> {
        self.resolve(query).map(|id| self.get(id))
    }

    /// Component ids in declaration (pre-order) order
    #[must_use]
    pub fn component_ids(&self, kind: ComponentType) -> Vec<ComponentId> {
        match kind {
            ComponentType::Root => self.roots.clone(),
            ComponentType::All => {
                let mut order = Vec::with_capacity(self.components.len());
                let mut stack: Vec<ComponentId> = self.roots.iter().rev().copied().collect();
                while let Some(id) = stack.pop() {
                    order.push(id);
                    stack.extend(self.get(id).children.iter().rev().copied());
                }
                order
            }
        }
    }

    /// Components in declaration (pre-order) order
    #[must_use]
    pub fn components(&self, kind: ComponentType) -> Vec<&Component> {
        self.component_ids(kind)
            .into_iter()
            .map(|id| self.get(id))
            .collect()
    }

    /// Pre-order position of every component, indexed by arena id
    #[must_use]
    pub fn declaration_indices(&self) -> Vec<usize> {
        let mut indices = vec![0; self.components.len()];
        for (position, id) in self.component_ids(ComponentType::All).into_iter().enumerate() {
            indices[id.0] = position;
        }
        indices
    }

    /// Component a dependency string points at, ignoring its version
    ///
    /// As with `resolve`, an exact name wins, so `python-3` names the
    /// component `python-3` when there is one.
    #[must_use]
    pub fn dependency_target(&self, dependency: &str) -> Option<ComponentId> {
        self.id_of(dependency).or_else(|| {
            dependency
                .parse::<DependencyRef>()
                .ok()
                .and_then(|reference| self.id_of(&reference.name))
        })
    }

    /// Components declaring an explicit dependency on `name`
    #[must_use]
    pub fn dependees(&self, name: &str) -> Vec<&Component> {
        let Some(target) = self.id_of(name) else {
            return Vec::new();
        };
        self.components(ComponentType::All)
            .into_iter()
            .filter(|component| {
                component
                    .dependencies
                    .iter()
                    .any(|dep| self.dependency_target(dep) == Some(target))
            })
            .collect()
    }

    /// Ancestors from the direct parent up to the root
    #[must_use]
    pub fn ancestors(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut ancestors = Vec::new();
        let mut current = self.get(id).parent;
        while let Some(parent) = current {
            ancestors.push(parent);
            current = self.get(parent).parent;
        }
        ancestors
    }

    /// Check state, derived from the children for tristate components
    #[must_use]
    pub fn check_state(&self, id: ComponentId) -> CheckState {
        let component = self.get(id);
        if !component.is_tristate() {
            return if component.selected {
                CheckState::Checked
            } else {
                CheckState::Unchecked
            };
        }

        let states: Vec<CheckState> = component
            .children
            .iter()
            .map(|child| self.check_state(*child))
            .collect();
        if states.iter().all(|s| *s == CheckState::Checked) {
            CheckState::Checked
        } else if states.iter().all(|s| *s == CheckState::Unchecked) {
            CheckState::Unchecked
        } else {
            CheckState::PartiallyChecked
        }
    }

    /// Mark a component as installed or not
    ///
    /// # Errors
    ///
    /// Returns `ComponentError::NotFound` for unknown names.
    pub fn set_installed(&mut self, name: &str, installed: bool) -> Result<(), ComponentError> {
        let id = self.require(name)?;
        self.components[id.0].installed = installed;
        self.revision += 1;
        Ok(())
    }

    /// Mark a component as not installed
    ///
    /// # Errors
    ///
    /// Returns `ComponentError::NotFound` for unknown names.
    pub fn set_uninstalled(&mut self, name: &str) -> Result<(), ComponentError> {
        self.set_installed(name, false)
    }

    /// Check or uncheck a component
    ///
    /// Checking a parent checks all of its non-virtual descendants;
    /// unchecking unchecks them.
    ///
    /// # Errors
    ///
    /// Returns `ComponentError::NotFound` for unknown names and
    /// `ComponentError::NotSelectable` when checking a virtual component.
    pub fn set_selected(&mut self, name: &str, selected: bool) -> Result<(), ComponentError> {
        let id = self.require(name)?;
        if selected && self.get(id).is_virtual {
            return Err(ComponentError::NotSelectable {
                name: name.to_string(),
            });
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let component = &mut self.components[current.0];
            if current != id && selected && component.is_virtual {
                continue;
            }
            component.selected = selected;
            stack.extend(component.children.iter().copied());
        }
        self.revision += 1;
        Ok(())
    }

    /// Reset the selection to what the installer starts with
    ///
    /// Package-manager runs start from the installed set; fresh installs
    /// start from leaf components whose default is true. Forced components
    /// are always selected.
    pub fn apply_default_selection(&mut self) {
        let mode = self.mode;
        for component in &mut self.components {
            let leaf_default = component.default_value.is_true()
                && component.checkable
                && component.children.is_empty();
            component.selected = component.forced_installation
                || match mode {
                    InstallerMode::PackageManager => component.installed,
                    InstallerMode::Installer | InstallerMode::Updater => leaf_default,
                };
        }
        self.revision += 1;
    }

    fn require(&self, name: &str) -> Result<ComponentId, ComponentError> {
        self.id_of(name).ok_or_else(|| ComponentError::NotFound {
            name: name.to_string(),
        })
    }
}
