//! Repository descriptors carried by component manifests

use serde::{Deserialize, Serialize};

/// A remote component source
///
/// The core never mutates repositories; they are passed through from the
/// manifest to whatever fetches component archives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Shipped with the installer rather than added by the user
    #[serde(default)]
    pub is_default: bool,
}

fn default_enabled() -> bool {
    true
}

impl Repository {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            enabled: true,
            is_default: false,
        }
    }

    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.username.is_some()
    }
}
