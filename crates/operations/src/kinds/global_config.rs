use crate::fs;
use crate::operation::{Arity, Lifecycle, Operation, OperationState};
use crate::registry::OperationEnvironment;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use toml::{Table, Value};
use tracing::debug;

const OLD_VALUE: &str = "oldvalue";
const SYSTEM_SCOPE: &str = "SystemScope";
const STORED_KEY: &str = "value";

/// Which settings file a `GlobalConfig` call addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsLocation {
    File(PathBuf),
    Application {
        system: bool,
        company: String,
        application: String,
    },
}

impl SettingsLocation {
    #[must_use]
    pub fn path(&self, env: &OperationEnvironment) -> PathBuf {
        match self {
            Self::File(path) if path.is_absolute() => path.clone(),
            Self::File(path) => env.user_settings_root.join(path),
            Self::Application {
                system,
                company,
                application,
            } => {
                let root = if *system {
                    &env.system_settings_root
                } else {
                    &env.user_settings_root
                };
                root.join(company).join(format!("{application}.toml"))
            }
        }
    }
}

/// `GlobalConfig [<scope>] [<company> <application> | <file>] <key> <value>`
///
/// Three arguments address a settings file directly, four a
/// company/application pair in user scope, five prefix the pair with
/// `SystemScope` or `UserScope`.
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    state: OperationState,
    env: Arc<OperationEnvironment>,
}

struct Setup {
    path: PathBuf,
    key: String,
    value: String,
}

impl GlobalConfig {
    pub const NAME: &'static str = "GlobalConfig";

    #[must_use]
    pub fn new(state: OperationState, env: Arc<OperationEnvironment>) -> Self {
        Self { state, env }
    }

    /// Parse the arguments into a location plus key and value
    #[must_use]
    pub fn location(arguments: &[String]) -> Option<(SettingsLocation, &str, &str)> {
        match arguments {
            [scope, company, application, key, value] => Some((
                SettingsLocation::Application {
                    system: scope == SYSTEM_SCOPE,
                    company: company.clone(),
                    application: application.clone(),
                },
                key.as_str(),
                value.as_str(),
            )),
            [company, application, key, value] => Some((
                SettingsLocation::Application {
                    system: false,
                    company: company.clone(),
                    application: application.clone(),
                },
                key.as_str(),
                value.as_str(),
            )),
            [file, key, value] => Some((
                SettingsLocation::File(PathBuf::from(file)),
                key.as_str(),
                value.as_str(),
            )),
            _ => None,
        }
    }

    fn setup(&mut self) -> Option<Setup> {
        if !self.validate_arguments() {
            return None;
        }
        let (location, key, value) = Self::location(self.state.arguments())?;
        Some(Setup {
            path: location.path(&self.env),
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

async fn read_settings(path: &std::path::Path) -> Option<Table> {
    match fs::read_optional(path).await {
        Ok(Some(contents)) => toml::from_str::<Table>(&contents).ok(),
        Ok(None) => Some(Table::new()),
        Err(_) => None,
    }
}

async fn write_settings(path: &std::path::Path, settings: &Table) -> bool {
    let Ok(contents) = toml::to_string(settings) else {
        return false;
    };
    fs::write_atomic(path, contents.as_bytes()).await.is_ok()
}

/// Prior values are kept as a one-entry TOML document so that their type
/// survives the value store
fn encode_value(value: &Value) -> Option<String> {
    let mut wrapper = Table::new();
    wrapper.insert(STORED_KEY.to_string(), value.clone());
    toml::to_string(&wrapper).ok()
}

fn decode_value(stored: &str) -> Option<Value> {
    toml::from_str::<Table>(stored).ok()?.remove(STORED_KEY)
}

#[async_trait]
impl Operation for GlobalConfig {
    fn state(&self) -> &OperationState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut OperationState {
        &mut self.state
    }

    fn arity(&self) -> Arity {
        Arity::OneOf(&[3, 4, 5])
    }

    async fn backup(&mut self) {
        self.state.set_lifecycle(Lifecycle::BackedUp);
    }

    async fn perform_operation(&mut self) -> bool {
        let Some(Setup { path, key, value }) = self.setup() else {
            return false;
        };

        let Some(mut settings) = read_settings(&path).await else {
            self.state.fail("Settings are not writable");
            return false;
        };

        let old_value = match settings.get(&key).map(encode_value) {
            Some(Some(encoded)) => Some(encoded),
            Some(None) => {
                self.state.fail("Cannot record the previous settings value");
                return false;
            }
            None => None,
        };
        settings.insert(key.clone(), Value::String(value));
        if !write_settings(&path, &settings).await {
            self.state.fail("Failed to write settings");
            return false;
        }

        match old_value {
            Some(old) => self.state.set_value(OLD_VALUE, old),
            None => {
                self.state.remove_value(OLD_VALUE);
            }
        }
        debug!(path = %path.display(), key = %key, "settings value written");
        self.state.set_lifecycle(Lifecycle::Performed);
        true
    }

    async fn undo_operation(&mut self) -> bool {
        let Some(Setup { path, key, value }) = self.setup() else {
            return false;
        };
        let Some(mut settings) = read_settings(&path).await else {
            self.state.fail("Settings are not writable");
            return false;
        };

        // somebody else changed it since, leave their value alone
        if settings.get(&key) == Some(&Value::String(value)) {
            match self.state.value(OLD_VALUE).map(decode_value) {
                Some(Some(old)) => {
                    settings.insert(key, old);
                }
                Some(None) => {
                    self.state.fail("Recorded previous settings value is unreadable");
                    return false;
                }
                None => {
                    settings.remove(&key);
                }
            }
            if !write_settings(&path, &settings).await {
                self.state.fail("Failed to write settings");
                return false;
            }
        }
        self.state.set_lifecycle(Lifecycle::Undone);
        true
    }

    fn clone_fresh(&self) -> Box<dyn Operation> {
        Box::new(Self::new(self.state.fresh(), Arc::clone(&self.env)))
    }
}
