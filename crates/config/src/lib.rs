#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for rivet
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/rivet/config.toml)
//! - Environment variables
//! - CLI flags

pub mod constants;

use rivet_errors::{ConfigError, Error};
use rivet_types::{ColorChoice, InstallerMode, OutputFormat, RemoteMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub transaction: TransactionConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
    #[serde(default)]
    pub mode: InstallerMode,
}

/// Remote execution channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: RemoteMode,
    /// Absolute path, or a name placed under the temp directory
    #[serde(default)]
    pub socket_name: Option<String>,
    #[serde(default)]
    pub authorization_key: Option<String>,
    /// Operation kinds forwarded to the elevated peer
    #[serde(default = "default_elevated_operations")]
    pub elevated_operations: Vec<String>,
}

/// Transaction configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TransactionConfig {
    pub target_dir: Option<PathBuf>,
    /// Remove the target directory after rollback when it is left empty
    #[serde(default)]
    pub remove_target_dir: bool,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    pub user_settings_root: Option<PathBuf>,
    pub system_settings_root: Option<PathBuf>,
    pub speed_dial_dir: Option<PathBuf>,
    #[serde(default = "default_kit_extension")]
    pub kit_extension: String,
}

// Default implementations

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
            mode: InstallerMode::Installer,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: RemoteMode::Production,
            socket_name: None,
            authorization_key: None,
            elevated_operations: default_elevated_operations(),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            user_settings_root: None,
            system_settings_root: None,
            speed_dial_dir: None,
            kit_extension: default_kit_extension(),
        }
    }
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_elevated_operations() -> Vec<String> {
    vec!["GlobalConfig".to_string()]
}

fn default_kit_extension() -> String {
    constants::KIT_EXTENSION.to_string()
}

fn parse_bool(field: &str, value: String) -> Result<bool, Error> {
    match value.as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()),
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("rivet").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // RIVET_OUTPUT
        if let Ok(output) = std::env::var("RIVET_OUTPUT") {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "RIVET_OUTPUT".to_string(),
                        value: output,
                    }
                    .into())
                }
            };
        }

        // RIVET_COLOR
        if let Ok(color) = std::env::var("RIVET_COLOR") {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "RIVET_COLOR".to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        // RIVET_REMOTE
        if let Ok(enabled) = std::env::var("RIVET_REMOTE") {
            self.remote.enabled = parse_bool("RIVET_REMOTE", enabled)?;
        }

        // RIVET_REMOTE_MODE
        if let Ok(mode) = std::env::var("RIVET_REMOTE_MODE") {
            self.remote.mode = match mode.as_str() {
                "debug" => RemoteMode::Debug,
                "production" => RemoteMode::Production,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "RIVET_REMOTE_MODE".to_string(),
                        value: mode,
                    }
                    .into())
                }
            };
        }

        // RIVET_SOCKET
        if let Ok(socket) = std::env::var("RIVET_SOCKET") {
            self.remote.socket_name = Some(socket);
        }

        // RIVET_AUTH_KEY
        if let Ok(key) = std::env::var("RIVET_AUTH_KEY") {
            self.remote.authorization_key = Some(key);
        }

        // RIVET_TARGET_DIR
        if let Ok(dir) = std::env::var("RIVET_TARGET_DIR") {
            self.transaction.target_dir = Some(PathBuf::from(dir));
        }

        // RIVET_REMOVE_TARGET_DIR
        if let Ok(remove) = std::env::var("RIVET_REMOVE_TARGET_DIR") {
            self.transaction.remove_target_dir = parse_bool("RIVET_REMOVE_TARGET_DIR", remove)?;
        }

        Ok(())
    }

    /// Root for user-scope settings files (with default)
    #[must_use]
    pub fn user_settings_root(&self) -> PathBuf {
        self.paths.user_settings_root.clone().unwrap_or_else(|| {
            dirs::config_dir().unwrap_or_else(|| std::env::temp_dir().join("rivet-settings"))
        })
    }

    /// Root for system-scope settings files (with default)
    #[must_use]
    pub fn system_settings_root(&self) -> PathBuf {
        self.paths
            .system_settings_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(constants::SYSTEM_SETTINGS_DIR))
    }

    /// Directory holding the speed-dial kit list (with default)
    #[must_use]
    pub fn speed_dial_dir(&self) -> PathBuf {
        self.paths
            .speed_dial_dir
            .clone()
            .unwrap_or_else(|| self.user_settings_root().join("rivet"))
    }
}

impl RemoteConfig {
    /// Resolve the socket path
    ///
    /// Absolute names are used as-is, anything else is placed under the
    /// temp directory. Debug mode falls back to the default socket name.
    ///
    /// # Errors
    ///
    /// Returns an error in production mode when no socket name is set.
    pub fn socket_path(&self) -> Result<PathBuf, Error> {
        let name = match (&self.socket_name, self.mode) {
            (Some(name), _) if !name.is_empty() => name.as_str(),
            (_, RemoteMode::Debug) => constants::DEFAULT_SOCKET,
            (_, RemoteMode::Production) => {
                return Err(ConfigError::MissingField {
                    field: "remote.socket_name".to_string(),
                }
                .into())
            }
        };
        Ok(socket_path_for(name))
    }

    /// Resolve the key presented or expected during the handshake
    ///
    /// # Errors
    ///
    /// Returns an error in production mode when no non-empty key is set.
    pub fn authorization_key(&self) -> Result<String, Error> {
        match (&self.authorization_key, self.mode) {
            (Some(key), _) if !key.is_empty() => Ok(key.clone()),
            (_, RemoteMode::Debug) => Ok(constants::DEFAULT_AUTHORIZATION_KEY.to_string()),
            (_, RemoteMode::Production) => Err(ConfigError::MissingField {
                field: "remote.authorization_key".to_string(),
            }
            .into()),
        }
    }

    /// Whether an operation kind is forwarded to the elevated peer
    #[must_use]
    pub fn is_elevated(&self, kind: &str) -> bool {
        self.elevated_operations.iter().any(|k| k == kind)
    }
}

/// Map a socket name to a filesystem path
#[must_use]
pub fn socket_path_for(name: &str) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::temp_dir().join(name)
    }
}
