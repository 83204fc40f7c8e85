//! Main dependency resolver implementation

use crate::graph::OrderGraph;
use rivet_components::{ComponentGraph, ComponentId, ComponentType};
use rivet_errors::{Error, ResolverError};
use rivet_events::{AppEvent, EventEmitter, EventSender, FailureContext, ResolverEvent};
use rivet_types::{
    DependencyRef, Direction, InstallerMode, PlanAction, PlannedOperation, TransactionPlan,
};
use std::collections::BTreeSet;
use std::time::Instant;

/// Ordered outcome of resolving the current selection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub action: PlanAction,
    /// Component names in execution order
    pub components: Vec<String>,
    /// Bytes required by components changing to installed
    pub required_space: u64,
}

#[derive(Clone, Debug)]
struct CachedResolution {
    revision: u64,
    resolution: Resolution,
}

/// Dependency resolver
///
/// Results are cached per action and recomputed from scratch whenever the
/// graph revision changes.
#[derive(Clone, Debug, Default)]
pub struct Resolver {
    event_sender: Option<EventSender>,
    install_cache: Option<CachedResolution>,
    uninstall_cache: Option<CachedResolution>,
}

impl EventEmitter for Resolver {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl Resolver {
    /// Create new resolver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    /// Drop any cached resolution
    pub fn invalidate(&mut self) {
        self.install_cache = None;
        self.uninstall_cache = None;
    }

    /// Resolve the set of components to install and its order
    ///
    /// # Errors
    ///
    /// Returns a resolver error for cycles, missing dependency targets and
    /// version conflicts.
    pub fn resolve_install(&mut self, graph: &ComponentGraph) -> Result<Resolution, Error> {
        self.resolve(graph, PlanAction::Install)
    }

    /// Resolve the set of components to uninstall and its order
    ///
    /// Only meaningful in package-manager mode; other modes yield an empty
    /// resolution.
    ///
    /// # Errors
    ///
    /// Returns a resolver error for cycles among the removed components.
    pub fn resolve_uninstall(&mut self, graph: &ComponentGraph) -> Result<Resolution, Error> {
        self.resolve(graph, PlanAction::Uninstall)
    }

    /// Bytes needed by the components about to be installed
    ///
    /// # Errors
    ///
    /// Propagates resolution errors.
    pub fn required_space(&mut self, graph: &ComponentGraph) -> Result<u64, Error> {
        Ok(self.resolve_install(graph)?.required_space)
    }

    /// Build the ordered operation plan for an action
    ///
    /// Installs contribute each component's operations in declaration order
    /// as `Perform` steps. Uninstalls replay them in reverse as `Revert`
    /// steps.
    ///
    /// # Errors
    ///
    /// Propagates resolution errors.
    pub fn plan(
        &mut self,
        graph: &ComponentGraph,
        action: PlanAction,
    ) -> Result<TransactionPlan, Error> {
        let resolution = self.resolve(graph, action)?;
        let mut plan = TransactionPlan::empty(action);
        plan.required_space = resolution.required_space;

        for name in &resolution.components {
            let Some(component) = graph.component(name) else {
                continue;
            };
            match action {
                PlanAction::Install => {
                    plan.operations
                        .extend(component.operations.iter().map(|spec| PlannedOperation {
                            component: name.clone(),
                            spec: spec.clone(),
                            direction: Direction::Perform,
                        }));
                }
                PlanAction::Uninstall => {
                    plan.operations.extend(component.operations.iter().rev().map(
                        |spec| PlannedOperation {
                            component: name.clone(),
                            spec: spec.clone(),
                            direction: Direction::Revert,
                        },
                    ));
                }
            }
        }
        plan.components = resolution.components;
        Ok(plan)
    }

    fn resolve(&mut self, graph: &ComponentGraph, action: PlanAction) -> Result<Resolution, Error> {
        let cache = match action {
            PlanAction::Install => &self.install_cache,
            PlanAction::Uninstall => &self.uninstall_cache,
        };
        if let Some(cached) = cache {
            if cached.revision == graph.revision() {
                self.emit(AppEvent::Resolver(ResolverEvent::ResolutionReused {
                    components: cached.resolution.components.len(),
                }));
                return Ok(cached.resolution.clone());
            }
        }

        let started = Instant::now();
        let selected = graph
            .components(ComponentType::All)
            .iter()
            .filter(|c| c.is_selected())
            .count();
        self.emit(AppEvent::Resolver(ResolverEvent::ResolutionStarted {
            mode: graph.mode().to_string(),
            action: action.to_string(),
            selected,
        }));

        let result = match action {
            PlanAction::Install => compute_install(graph),
            PlanAction::Uninstall => compute_uninstall(graph),
        };

        let resolution = match result {
            Ok(resolution) => resolution,
            Err(err) => {
                if let ResolverError::ConfigurationCycle { path } = &err {
                    self.emit(AppEvent::Resolver(ResolverEvent::CycleDetected {
                        path: path.clone(),
                    }));
                }
                self.emit(AppEvent::Resolver(ResolverEvent::ResolutionFailed {
                    failure: FailureContext::from_error(&err),
                }));
                return Err(err.into());
            }
        };

        self.emit(AppEvent::Resolver(ResolverEvent::ResolutionCompleted {
            components: resolution.components.clone(),
            operations: resolution
                .components
                .iter()
                .filter_map(|name| graph.component(name))
                .map(|c| c.operations.len())
                .sum(),
            required_space: resolution.required_space,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }));

        let cached = Some(CachedResolution {
            revision: graph.revision(),
            resolution: resolution.clone(),
        });
        match action {
            PlanAction::Install => self.install_cache = cached,
            PlanAction::Uninstall => self.uninstall_cache = cached,
        }
        Ok(resolution)
    }
}

/// Resolve a dependency string of `owner` to a component id
///
/// An exact name match wins before the string is split into name and
/// version constraint.
fn resolve_dependency(
    graph: &ComponentGraph,
    owner: &str,
    dependency: &str,
) -> Result<ComponentId, ResolverError> {
    if let Some(id) = graph.id_of(dependency) {
        return Ok(id);
    }
    let reference: DependencyRef =
        dependency
            .parse()
            .map_err(|e: rivet_errors::VersionError| ResolverError::InvalidDependency {
                component: owner.to_string(),
                dependency: dependency.to_string(),
                message: e.to_string(),
            })?;

    let id = graph
        .id_of(&reference.name)
        .ok_or_else(|| ResolverError::MissingDependency {
            component: owner.to_string(),
            dependency: reference.name.clone(),
        })?;

    let target = graph.get(id);
    if !reference.accepts(&target.version) {
        return Err(ResolverError::VersionConflict {
            component: owner.to_string(),
            requirement: reference.to_string(),
            found: target.to_string(),
        });
    }
    Ok(id)
}

/// Auto-dependency triggers that exist in the graph; unknown names never fire
fn auto_dependency_ids(graph: &ComponentGraph, id: ComponentId) -> Option<Vec<ComponentId>> {
    let component = graph.get(id);
    if component.auto_dependencies.is_empty() {
        return None;
    }
    component
        .auto_dependencies
        .iter()
        .map(|name| graph.resolve(name))
        .collect()
}

fn compute_install(graph: &ComponentGraph) -> Result<Resolution, ResolverError> {
    let all = graph.component_ids(ComponentType::All);
    let mut set: BTreeSet<ComponentId> = all
        .iter()
        .copied()
        .filter(|&id| {
            let c = graph.get(id);
            !c.is_installed() && (c.is_selected() || c.forced_installation)
        })
        .collect();

    // Closure over dependencies and implied ancestors, then auto-dependencies,
    // repeated until nothing new is pulled in.
    loop {
        let mut queue: Vec<ComponentId> = set.iter().copied().collect();
        while let Some(id) = queue.pop() {
            let component = graph.get(id);
            for dependency in &component.dependencies {
                let target = resolve_dependency(graph, &component.name, dependency)?;
                if !graph.get(target).is_installed() && set.insert(target) {
                    queue.push(target);
                }
            }
            for ancestor in graph.ancestors(id) {
                if !graph.get(ancestor).is_installed() && set.insert(ancestor) {
                    queue.push(ancestor);
                }
            }
        }

        let activated: Vec<ComponentId> = all
            .iter()
            .copied()
            .filter(|id| !set.contains(id) && !graph.get(*id).is_installed())
            .filter(|&id| {
                auto_dependency_ids(graph, id).is_some_and(|triggers| {
                    triggers
                        .iter()
                        .all(|t| set.contains(t) || graph.get(*t).is_installed())
                })
            })
            .collect();
        if activated.is_empty() {
            break;
        }
        tracing::debug!(count = activated.len(), "auto dependencies activated");
        set.extend(activated);
    }

    let ranks = graph.declaration_indices();
    ensure_acyclic(graph, &set, &ranks)?;
    let mut order = OrderGraph::new();
    for &id in &set {
        order.add_node(&graph.get(id).name, ranks[id.index()]);
    }
    for &id in &set {
        let component = graph.get(id);
        for dependency in &component.dependencies {
            let target = resolve_dependency(graph, &component.name, dependency)?;
            order.add_edge(&graph.get(target).name, &component.name);
        }
        // Auto-dependent components run after their triggers.
        for trigger in auto_dependency_ids(graph, id).unwrap_or_default() {
            order.add_edge(&graph.get(trigger).name, &component.name);
        }
    }

    let components = order.topological_sort()?;
    let required_space = set.iter().map(|&id| graph.get(id).uncompressed_size).sum();
    Ok(Resolution {
        action: PlanAction::Install,
        components,
        required_space,
    })
}

/// Reject dependency cycles reachable from `set`
///
/// Installed targets never enter the ordering graph, so a cycle running
/// through one would otherwise go unnoticed.
fn ensure_acyclic(
    graph: &ComponentGraph,
    set: &BTreeSet<ComponentId>,
    ranks: &[usize],
) -> Result<(), ResolverError> {
    let mut reachable = OrderGraph::new();
    let mut seen = set.clone();
    for &id in set {
        reachable.add_node(&graph.get(id).name, ranks[id.index()]);
    }
    let mut queue: Vec<ComponentId> = set.iter().copied().collect();
    while let Some(id) = queue.pop() {
        let component = graph.get(id);
        for dependency in &component.dependencies {
            let Some(target) = graph.dependency_target(dependency) else {
                continue;
            };
            if seen.insert(target) {
                reachable.add_node(&graph.get(target).name, ranks[target.index()]);
                queue.push(target);
            }
            reachable.add_edge(&graph.get(target).name, &component.name);
        }
    }
    match reachable.find_cycle() {
        Some(path) => Err(ResolverError::ConfigurationCycle { path }),
        None => Ok(()),
    }
}

fn compute_uninstall(graph: &ComponentGraph) -> Result<Resolution, ResolverError> {
    if graph.mode() != InstallerMode::PackageManager {
        return Ok(Resolution {
            action: PlanAction::Uninstall,
            components: Vec::new(),
            required_space: 0,
        });
    }

    let all = graph.component_ids(ComponentType::All);
    let mut set: BTreeSet<ComponentId> = all
        .iter()
        .copied()
        .filter(|&id| {
            let c = graph.get(id);
            c.to_uninstall() && !c.forced_installation
        })
        .collect();

    // Installed dependents and auto-dependents of removed components go too.
    loop {
        let pulled: Vec<ComponentId> = all
            .iter()
            .copied()
            .filter(|id| !set.contains(id))
            .filter(|&id| {
                let c = graph.get(id);
                if !c.is_installed() || c.forced_installation {
                    return false;
                }
                let depends_on_removed = c.dependencies.iter().any(|dep| {
                    graph
                        .dependency_target(dep)
                        .is_some_and(|target| set.contains(&target))
                });
                let trigger_removed = auto_dependency_ids(graph, id)
                    .is_some_and(|triggers| triggers.iter().any(|t| set.contains(t)));
                let parent_removed = c.parent().is_some_and(|p| set.contains(&p));
                depends_on_removed || trigger_removed || parent_removed
            })
            .collect();
        if pulled.is_empty() {
            break;
        }
        set.extend(pulled);
    }

    let ranks = graph.declaration_indices();
    let mut order = OrderGraph::new();
    for &id in &set {
        order.add_node(&graph.get(id).name, ranks[id.index()]);
    }
    // Dependents are removed before what they depend on
    for &id in &set {
        let component = graph.get(id);
        for dependency in &component.dependencies {
            if let Some(target) = graph.dependency_target(dependency) {
                order.add_edge(&component.name, &graph.get(target).name);
            }
        }
        for trigger in auto_dependency_ids(graph, id).unwrap_or_default() {
            order.add_edge(&component.name, &graph.get(trigger).name);
        }
    }

    Ok(Resolution {
        action: PlanAction::Uninstall,
        components: order.topological_sort()?,
        required_space: 0,
    })
}
