//! Integration tests for component manifests, graph and checker

#[cfg(test)]
mod tests {
    use rivet_components::*;
    use rivet_types::InstallerMode;
    use tempfile::TempDir;

    const SUITE: &str = r#"
[[repository]]
url = "https://example.com/suite"
is_default = true

[[component]]
name = "suite"
version = "3.1"
virtual = true

[[component.children]]
name = "suite.editor"
version = "3.1"
uncompressed_size = 2048
default = true
installed = true

[[component.children]]
name = "suite.plugins"
version = "3.1"
dependencies = ["suite.editor->=3.0"]

[[component]]
name = "runtime"
version = "1.4.2"
forced_installation = true
"#;

    async fn write_manifest(contents: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("components.toml");
        tokio::fs::write(&path, contents).await.unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_load_manifest_from_file() {
        let (_dir, path) = write_manifest(SUITE).await;
        let manifest = Manifest::load_from_file(&path).await.unwrap();
        assert_eq!(manifest.repositories.len(), 1);
        assert!(manifest.repositories[0].is_default);

        let loaded = manifest.build_graph(InstallerMode::Installer).unwrap();
        let names: Vec<&str> = loaded
            .graph
            .components(ComponentType::All)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["suite", "suite.editor", "suite.plugins", "runtime"]
        );
        let roots: Vec<&str> = loaded
            .graph
            .components(ComponentType::Root)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(roots, vec!["suite", "runtime"]);
    }

    #[tokio::test]
    async fn test_missing_manifest_file() {
        let dir = TempDir::new().unwrap();
        assert!(Manifest::load_from_file(&dir.path().join("absent.toml"))
            .await
            .is_err());
    }

    #[test]
    fn test_default_selection_per_mode() {
        let manifest = Manifest::from_toml_str(SUITE).unwrap();

        let installer = manifest.build_graph(InstallerMode::Installer).unwrap().graph;
        assert!(installer.component("suite.editor").unwrap().is_selected());
        assert!(!installer.component("suite.plugins").unwrap().is_selected());
        assert!(installer.component("runtime").unwrap().is_selected());

        let manager = manifest
            .build_graph(InstallerMode::PackageManager)
            .unwrap()
            .graph;
        assert!(manager.component("suite.editor").unwrap().is_selected());
        assert!(!manager.component("suite.editor").unwrap().to_install());
        assert!(manager.component("runtime").unwrap().to_install());
    }

    #[test]
    fn test_tristate_parent_follows_children() {
        let manifest = Manifest::from_toml_str(SUITE).unwrap();
        let mut graph = manifest.build_graph(InstallerMode::Installer).unwrap().graph;
        let suite = graph.id_of("suite").unwrap();
        assert_eq!(graph.check_state(suite), CheckState::PartiallyChecked);

        graph.set_selected("suite.plugins", true).unwrap();
        assert_eq!(graph.check_state(suite), CheckState::Checked);

        graph.set_selected("suite.editor", false).unwrap();
        graph.set_selected("suite.plugins", false).unwrap();
        assert_eq!(graph.check_state(suite), CheckState::Unchecked);
    }

    #[test]
    fn test_dependees_and_qualified_lookup() {
        let manifest = Manifest::from_toml_str(SUITE).unwrap();
        let graph = manifest.build_graph(InstallerMode::Installer).unwrap().graph;

        let dependees: Vec<&str> = graph
            .dependees("suite.editor")
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(dependees, vec!["suite.plugins"]);

        assert!(graph.component_by_name("runtime-1.4.2").is_some());
        assert!(graph.component_by_name("runtime->=1.5").is_none());
        assert!(graph.component_by_name("runtime-<2").is_some());
    }

    #[test]
    fn test_dependees_of_name_with_version_like_suffix() {
        let manifest = Manifest::from_toml_str(
            r#"
[[component]]
name = "python-3"
version = "3.11"
auto_dependencies = ["runtime"]

[[component]]
name = "runtime"
version = "1.0"

[[component]]
name = "app"
version = "1.0"
dependencies = ["python-3"]
"#,
        )
        .unwrap();
        let graph = manifest.build_graph(InstallerMode::Installer).unwrap().graph;

        let dependees: Vec<&str> = graph
            .dependees("python-3")
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(dependees, vec!["app"]);
        assert_eq!(graph.dependency_target("python-3"), graph.id_of("python-3"));
        assert!(graph.dependees("python").is_empty());

        // app depends on an auto-dependent component
        let warnings = check_component(&graph, "python-3");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("auto dependent component python-3"));
    }

    #[test]
    fn test_duplicate_definition_is_reported_not_fatal() {
        let manifest = Manifest::from_toml_str(
            r#"
[[component]]
name = "tools"
version = "1.0"
uncompressed_size = 10

[[component]]
name = "tools"
version = "2.0"
uncompressed_size = 20
"#,
        )
        .unwrap();
        let loaded = manifest.build_graph(InstallerMode::Installer).unwrap();
        assert_eq!(loaded.graph.len(), 1);
        assert_eq!(loaded.graph.component("tools").unwrap().uncompressed_size, 10);
        assert_eq!(loaded.rejected.len(), 1);
        assert!(loaded.rejected[0].to_string().contains("tools"));
    }

    #[test]
    fn test_checker_over_manifest() {
        let manifest = Manifest::from_toml_str(
            r#"
[[component]]
name = "base"
version = "1.0"

[[component]]
name = "bridge"
version = "1.0"
auto_dependencies = ["base"]
dependencies = ["base"]

[[component]]
name = "consumer"
version = "1.0"
dependencies = ["bridge"]
"#,
        )
        .unwrap();
        let graph = manifest.build_graph(InstallerMode::Installer).unwrap().graph;

        let findings = check_all(&graph);
        assert_eq!(findings.len(), 1);
        let (name, warnings) = &findings[0];
        assert_eq!(name, "bridge");
        // superfluous explicit + auto dependency, plus a dependee on an auto-dependent component
        assert_eq!(warnings.len(), 2);

        assert!(check_component(&graph, "base").is_empty());
        assert!(check_component(&graph, "unknown").is_empty());
    }
}
