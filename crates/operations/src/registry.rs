//! Operation kinds by name

use crate::kinds::{AddKitsToSpeedDial, CreateLink, GlobalConfig, SimpleMoveFile};
use crate::operation::{Operation, OperationState};
use rivet_config::Config;
use rivet_errors::RegistryError;
use rivet_types::OperationSpec;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Builds an operation of one kind from its initial state
pub type OperationFactory = Arc<dyn Fn(OperationState) -> Box<dyn Operation> + Send + Sync>;

/// Locations the built-in kinds write to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationEnvironment {
    pub user_settings_root: PathBuf,
    pub system_settings_root: PathBuf,
    pub speed_dial_dir: PathBuf,
    pub kit_extension: String,
}

impl OperationEnvironment {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            user_settings_root: config.user_settings_root(),
            system_settings_root: config.system_settings_root(),
            speed_dial_dir: config.speed_dial_dir(),
            kit_extension: config.paths.kit_extension.clone(),
        }
    }
}

/// Name to factory table shared by the executor and the remote server
#[derive(Clone, Default)]
pub struct OperationRegistry {
    factories: BTreeMap<String, OperationFactory>,
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("kinds", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl OperationRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `CreateLink`, `SimpleMoveFile`, `GlobalConfig` and
    /// `AddKitsToSpeedDial`
    #[must_use]
    pub fn with_builtin_kinds(env: &OperationEnvironment) -> Self {
        let env = Arc::new(env.clone());
        let mut factories: BTreeMap<String, OperationFactory> = BTreeMap::new();

        factories.insert(
            CreateLink::NAME.to_string(),
            Arc::new(|state| Box::new(CreateLink::new(state))),
        );
        factories.insert(
            SimpleMoveFile::NAME.to_string(),
            Arc::new(|state| Box::new(SimpleMoveFile::new(state))),
        );
        let settings_env = Arc::clone(&env);
        factories.insert(
            GlobalConfig::NAME.to_string(),
            Arc::new(move |state| Box::new(GlobalConfig::new(state, Arc::clone(&settings_env)))),
        );
        factories.insert(
            AddKitsToSpeedDial::NAME.to_string(),
            Arc::new(move |state| Box::new(AddKitsToSpeedDial::new(state, Arc::clone(&env)))),
        );

        Self { factories }
    }

    /// Add a kind
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::AlreadyRegistered` if the name is taken.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(OperationState) -> Box<dyn Operation> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered { name });
        }
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered kind names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Instantiate a kind with arguments
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownKind` for unregistered names.
    pub fn create(
        &self,
        name: &str,
        arguments: Vec<String>,
    ) -> Result<Box<dyn Operation>, RegistryError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::UnknownKind {
                name: name.to_string(),
            })?;
        Ok(factory(OperationState::new(name, arguments)))
    }

    /// Instantiate from a spec, restoring its recorded value store
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownKind` for unregistered names.
    pub fn create_from_spec(
        &self,
        spec: &OperationSpec,
    ) -> Result<Box<dyn Operation>, RegistryError> {
        let mut operation = self.create(&spec.name, spec.arguments.clone())?;
        operation.state_mut().set_values(spec.values.clone());
        Ok(operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> OperationEnvironment {
        OperationEnvironment {
            user_settings_root: PathBuf::from("/tmp/user"),
            system_settings_root: PathBuf::from("/tmp/system"),
            speed_dial_dir: PathBuf::from("/tmp/speed"),
            kit_extension: "kit".into(),
        }
    }

    #[test]
    fn test_builtin_kinds() {
        let registry = OperationRegistry::with_builtin_kinds(&env());
        assert_eq!(
            registry.names(),
            vec![
                "AddKitsToSpeedDial",
                "CreateLink",
                "GlobalConfig",
                "SimpleMoveFile"
            ]
        );
        let op = registry
            .create("CreateLink", vec!["a".into(), "b".into()])
            .unwrap();
        assert_eq!(op.name(), "CreateLink");
        assert_eq!(op.arguments(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_unknown_kind() {
        let registry = OperationRegistry::with_builtin_kinds(&env());
        let err = registry.create("Execute", vec![]).unwrap_err();
        assert_eq!(err.to_string(), "unknown operation kind: Execute");
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = OperationRegistry::with_builtin_kinds(&env());
        let result = registry.register("CreateLink", |state| Box::new(CreateLink::new(state)));
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered { .. })));
    }

    #[test]
    fn test_create_from_spec_restores_values() {
        let registry = OperationRegistry::with_builtin_kinds(&env());
        let mut values = BTreeMap::new();
        values.insert("oldvalue".to_string(), "1".to_string());
        let spec = OperationSpec::new("GlobalConfig", ["f", "k", "v"]).with_values(values);
        let op = registry.create_from_spec(&spec).unwrap();
        assert_eq!(op.state().value("oldvalue"), Some("1"));
    }
}
