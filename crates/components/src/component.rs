//! Component model

use rivet_types::{OperationSpec, Version};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a component inside its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) usize);

impl ComponentId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Initial selection declared by a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultValue {
    True,
    #[default]
    False,
    /// Decided by an installer script; treated as unselected by the core
    Script,
}

impl DefaultValue {
    #[must_use]
    pub fn is_true(self) -> bool {
        matches!(self, Self::True)
    }
}

impl Serialize for DefaultValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::True => serializer.serialize_bool(true),
            Self::False => serializer.serialize_bool(false),
            Self::Script => serializer.serialize_str("script"),
        }
    }
}

impl<'de> Deserialize<'de> for DefaultValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bool(true) => Ok(Self::True),
            Raw::Bool(false) => Ok(Self::False),
            Raw::Text(text) => match text.to_ascii_lowercase().as_str() {
                "true" => Ok(Self::True),
                "false" => Ok(Self::False),
                "script" => Ok(Self::Script),
                other => Err(serde::de::Error::custom(format!(
                    "invalid default value: {other}"
                ))),
            },
        }
    }
}

/// Check state of a component as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Checked,
    Unchecked,
    PartiallyChecked,
}

/// A selectable unit of installation
#[derive(Debug, Clone)]
pub struct Component {
    pub name: String,
    pub version: Version,
    pub uncompressed_size: u64,
    /// Names, optionally version-qualified (`core->=1.2`)
    pub dependencies: Vec<String>,
    /// Components whose joint presence pulls this one in
    pub auto_dependencies: Vec<String>,
    pub forced_installation: bool,
    pub is_virtual: bool,
    pub checkable: bool,
    pub default_value: DefaultValue,
    pub operations: Vec<OperationSpec>,
    pub(crate) installed: bool,
    pub(crate) selected: bool,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) children: Vec<ComponentId>,
}

impl Component {
    #[must_use]
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            uncompressed_size: 0,
            dependencies: Vec::new(),
            auto_dependencies: Vec::new(),
            forced_installation: false,
            is_virtual: false,
            checkable: true,
            default_value: DefaultValue::False,
            operations: Vec::new(),
            installed: false,
            selected: false,
            parent: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_size(mut self, bytes: u64) -> Self {
        self.uncompressed_size = bytes;
        self
    }

    #[must_use]
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_auto_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auto_dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_operation(mut self, spec: OperationSpec) -> Self {
        self.operations.push(spec);
        self
    }

    #[must_use]
    pub fn with_default(mut self, value: DefaultValue) -> Self {
        self.default_value = value;
        self
    }

    #[must_use]
    pub fn forced(mut self) -> Self {
        self.forced_installation = true;
        self
    }

    #[must_use]
    pub fn virtual_component(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    #[must_use]
    pub fn not_checkable(mut self) -> Self {
        self.checkable = false;
        self
    }

    #[must_use]
    pub fn installed(mut self) -> Self {
        self.installed = true;
        self
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installed
    }

    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Selected but not yet installed
    #[must_use]
    pub fn to_install(&self) -> bool {
        self.selected && !self.installed
    }

    /// Installed but deselected
    #[must_use]
    pub fn to_uninstall(&self) -> bool {
        self.installed && !self.selected
    }

    #[must_use]
    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// A component with children derives its check state from them
    #[must_use]
    pub fn is_tristate(&self) -> bool {
        !self.children.is_empty()
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}
