//! Integration tests for resolver crate

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rivet_components::{Component, ComponentGraph};
    use rivet_errors::{Error, ResolverError};
    use rivet_events::{AppEvent, ResolverEvent};
    use rivet_resolver::*;
    use rivet_types::{
        parse_lenient, Direction, InstallerMode, OperationSpec, PlanAction,
    };

    fn component(name: &str) -> Component {
        Component::new(name, parse_lenient("1.0").unwrap())
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    /// root (1000) with children of 1500 and 250 bytes, all checked
    fn sized_tree(root_installed: bool, child1_installed: bool, child2_installed: bool) -> ComponentGraph {
        let mut graph = ComponentGraph::new(InstallerMode::Installer);
        let root = graph.append_root(component("root").with_size(1000)).unwrap();
        graph
            .append_child(root, component("root.child1").with_size(1500))
            .unwrap();
        graph
            .append_child(root, component("root.child2").with_size(250))
            .unwrap();
        graph.set_selected("root", true).unwrap();
        graph.set_installed("root", root_installed).unwrap();
        graph.set_installed("root.child1", child1_installed).unwrap();
        graph.set_installed("root.child2", child2_installed).unwrap();
        graph
    }

    #[test]
    fn test_required_space_counts_only_new_components() {
        let mut resolver = Resolver::new();

        let graph = sized_tree(false, false, true);
        assert_eq!(resolver.required_space(&graph).unwrap(), 2500);

        let graph = sized_tree(true, true, false);
        assert_eq!(resolver.required_space(&graph).unwrap(), 250);
    }

    #[test]
    fn test_selected_child_implies_parent() {
        let mut graph = ComponentGraph::new(InstallerMode::Installer);
        let root = graph.append_root(component("root").with_size(1000)).unwrap();
        graph
            .append_child(root, component("root.child1").with_size(1500))
            .unwrap();
        graph
            .append_child(root, component("root.child2").with_size(250))
            .unwrap();
        graph.set_selected("root.child2", true).unwrap();

        let resolution = Resolver::new().resolve_install(&graph).unwrap();
        assert_eq!(resolution.components, vec!["root", "root.child2"]);
        assert_eq!(resolution.required_space, 1250);
    }

    #[test]
    fn test_dependencies_before_dependents() {
        let mut graph = ComponentGraph::new(InstallerMode::Installer);
        graph
            .append_root(component("app").with_dependencies(["lib->=1.0"]))
            .unwrap();
        graph
            .append_root(component("lib").with_dependencies(["core"]))
            .unwrap();
        graph.append_root(component("core")).unwrap();
        graph.append_root(component("unrelated")).unwrap();
        graph.set_selected("app", true).unwrap();
        graph.set_selected("unrelated", true).unwrap();

        let resolution = Resolver::new().resolve_install(&graph).unwrap();
        assert_eq!(resolution.components, vec!["core", "lib", "app", "unrelated"]);
    }

    #[test]
    fn test_forced_components_always_included() {
        let mut graph = ComponentGraph::new(InstallerMode::Installer);
        graph.append_root(component("base").forced()).unwrap();
        graph.append_root(component("extra")).unwrap();

        let resolution = Resolver::new().resolve_install(&graph).unwrap();
        assert_eq!(resolution.components, vec!["base"]);
    }

    #[test]
    fn test_auto_dependencies_are_transitive() {
        let mut graph = ComponentGraph::new(InstallerMode::Installer);
        graph.append_root(component("a")).unwrap();
        graph
            .append_root(component("b").with_auto_dependencies(["a"]))
            .unwrap();
        graph
            .append_root(component("c").with_auto_dependencies(["a", "b"]))
            .unwrap();
        graph
            .append_root(component("d").with_auto_dependencies(["a", "missing"]))
            .unwrap();
        graph.set_selected("a", true).unwrap();

        let resolution = Resolver::new().resolve_install(&graph).unwrap();
        assert_eq!(resolution.components, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cycle_aborts_resolution() {
        let mut graph = ComponentGraph::new(InstallerMode::Installer);
        graph
            .append_root(component("a").with_dependencies(["b"]))
            .unwrap();
        graph
            .append_root(component("b").with_dependencies(["a"]))
            .unwrap();
        graph.set_selected("a", true).unwrap();

        let (tx, mut rx) = rivet_events::channel();
        let mut resolver = Resolver::new().with_event_sender(tx);
        let err = resolver.plan(&graph, PlanAction::Install).unwrap_err();
        match err {
            Error::Resolver(ResolverError::ConfigurationCycle { path }) => {
                assert_eq!(path.first(), path.last());
                assert!(path.contains(&"a".to_string()));
                assert!(path.contains(&"b".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }

        let mut saw_cycle = false;
        while let Ok(message) = rx.try_recv() {
            if matches!(
                message.event,
                AppEvent::Resolver(ResolverEvent::CycleDetected { .. })
            ) {
                saw_cycle = true;
            }
        }
        assert!(saw_cycle);
    }

    #[test]
    fn test_cycle_through_installed_component() {
        let mut graph = ComponentGraph::new(InstallerMode::Installer);
        graph
            .append_root(component("a").with_dependencies(["b"]))
            .unwrap();
        graph
            .append_root(component("b").with_dependencies(["a"]))
            .unwrap();
        graph.set_installed("b", true).unwrap();
        graph.set_selected("a", true).unwrap();

        let err = Resolver::new().resolve_install(&graph).unwrap_err();
        match err {
            Error::Resolver(ResolverError::ConfigurationCycle { path }) => {
                assert_eq!(path, vec!["a", "b", "a"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_dependency_on_name_ending_in_version_like_suffix() {
        let mut graph = ComponentGraph::new(InstallerMode::PackageManager);
        graph
            .append_root(Component::new("python-3", parse_lenient("3.11").unwrap()))
            .unwrap();
        graph
            .append_root(component("app").with_dependencies(["python-3"]))
            .unwrap();
        graph.set_selected("app", true).unwrap();

        let resolution = Resolver::new().resolve_install(&graph).unwrap();
        assert_eq!(resolution.components, vec!["python-3", "app"]);

        graph.set_installed("python-3", true).unwrap();
        graph.set_installed("app", true).unwrap();
        graph.apply_default_selection();
        graph.set_selected("python-3", false).unwrap();
        let resolution = Resolver::new().resolve_uninstall(&graph).unwrap();
        assert_eq!(resolution.components, vec!["app", "python-3"]);
    }

    #[test]
    fn test_missing_dependency_and_version_conflict() {
        let mut graph = ComponentGraph::new(InstallerMode::Installer);
        graph
            .append_root(component("app").with_dependencies(["ghost"]))
            .unwrap();
        graph.set_selected("app", true).unwrap();
        let err = Resolver::new().resolve_install(&graph).unwrap_err();
        assert!(matches!(
            err,
            Error::Resolver(ResolverError::MissingDependency { ref dependency, .. }) if dependency == "ghost"
        ));

        let mut graph = ComponentGraph::new(InstallerMode::Installer);
        graph
            .append_root(component("app").with_dependencies(["lib->=2.0"]))
            .unwrap();
        graph.append_root(component("lib")).unwrap();
        graph.set_selected("app", true).unwrap();
        let err = Resolver::new().resolve_install(&graph).unwrap_err();
        assert!(matches!(
            err,
            Error::Resolver(ResolverError::VersionConflict { .. })
        ));
    }

    #[test]
    fn test_cache_invalidated_by_selection_change() {
        let mut graph = ComponentGraph::new(InstallerMode::Installer);
        graph.append_root(component("a").with_size(10)).unwrap();
        graph.append_root(component("b").with_size(20)).unwrap();
        graph.set_selected("a", true).unwrap();

        let mut resolver = Resolver::new();
        assert_eq!(resolver.required_space(&graph).unwrap(), 10);
        assert_eq!(resolver.required_space(&graph).unwrap(), 10);

        graph.set_selected("b", true).unwrap();
        assert_eq!(resolver.required_space(&graph).unwrap(), 30);
    }

    #[test]
    fn test_uninstall_removes_dependents_first() {
        let mut graph = ComponentGraph::new(InstallerMode::PackageManager);
        graph
            .append_root(
                component("core").with_operation(OperationSpec::new("CreateLink", ["l1", "t1"])),
            )
            .unwrap();
        graph
            .append_root(
                component("app")
                    .with_dependencies(["core"])
                    .with_operation(OperationSpec::new("CreateLink", ["l2", "t2"]))
                    .with_operation(OperationSpec::new("SimpleMoveFile", ["a", "b"])),
            )
            .unwrap();
        graph
            .append_root(component("plugin").with_auto_dependencies(["app"]))
            .unwrap();
        graph.append_root(component("keep")).unwrap();
        for name in ["core", "app", "plugin", "keep"] {
            graph.set_installed(name, true).unwrap();
        }
        graph.apply_default_selection();
        graph.set_selected("core", false).unwrap();

        let plan = Resolver::new().plan(&graph, PlanAction::Uninstall).unwrap();
        assert_eq!(plan.components, vec!["plugin", "app", "core"]);
        let names: Vec<_> = plan.operations.iter().map(|op| op.spec.name.as_str()).collect();
        assert_eq!(names, vec!["SimpleMoveFile", "CreateLink", "CreateLink"]);
        assert!(plan
            .operations
            .iter()
            .all(|op| op.direction == Direction::Revert));
        assert_eq!(plan.operations[2].component, "core");
    }

    #[test]
    fn test_install_plan_keeps_operation_order() {
        let mut graph = ComponentGraph::new(InstallerMode::Installer);
        graph
            .append_root(
                component("app")
                    .with_operation(OperationSpec::new("CreateLink", ["l", "t"]))
                    .with_operation(OperationSpec::new("GlobalConfig", ["f", "k", "v"])),
            )
            .unwrap();
        graph.set_selected("app", true).unwrap();

        let plan = Resolver::new().plan(&graph, PlanAction::Install).unwrap();
        let names: Vec<_> = plan.operations.iter().map(|op| op.spec.name.as_str()).collect();
        assert_eq!(names, vec!["CreateLink", "GlobalConfig"]);
        assert!(plan
            .operations
            .iter()
            .all(|op| op.direction == Direction::Perform));
    }

    proptest! {
        /// Random DAGs: every dependency precedes its dependent and the
        /// result is identical across runs.
        #[test]
        fn prop_order_respects_dependencies(
            edges in proptest::collection::vec((0usize..12, 0usize..12), 0..40),
            selected in proptest::collection::vec(0usize..12, 1..6),
        ) {
            let mut graph = ComponentGraph::new(InstallerMode::Installer);
            for i in 0..12usize {
                // Only point at lower indices so the graph stays acyclic
                let deps: Vec<String> = edges
                    .iter()
                    .filter(|(from, to)| *from == i && *to < i)
                    .map(|(_, to)| format!("c{to}"))
                    .collect();
                graph
                    .append_root(component(&format!("c{i}")).with_dependencies(deps))
                    .unwrap();
            }
            for i in &selected {
                graph.set_selected(&format!("c{i}"), true).unwrap();
            }

            let first = Resolver::new().resolve_install(&graph).unwrap();
            let second = Resolver::new().resolve_install(&graph).unwrap();
            prop_assert_eq!(&first.components, &second.components);

            for name in &first.components {
                let component = graph.component(name).unwrap();
                for dep in &component.dependencies {
                    prop_assert!(position(&first.components, dep) < position(&first.components, name));
                }
            }
            for i in &selected {
                let name = format!("c{i}");
                prop_assert!(first.components.contains(&name));
            }
        }
    }
}
