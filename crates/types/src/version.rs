//! Component versions and dependency constraints
//!
//! Component versions are parsed leniently: `1`, `1.2` and `1.2.3` are all
//! accepted and padded to three numeric parts. Dependencies may be
//! version-qualified by appending `-` plus an optional comparator:
//! - `core-1.0.1` - Exact version
//! - `core-=1.0.1` - Exact version
//! - `core->=1.2` - Minimum version
//! - `core-<=2.0` - Maximum version
//! - `core->1.0` / `core-<2.0` - Strict bounds

use rivet_errors::VersionError;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parse a component version, padding missing minor/patch parts with zeros
///
/// # Errors
///
/// Returns `VersionError::InvalidVersion` when the input is not a dotted
/// numeric version.
pub fn parse_lenient(input: &str) -> Result<Version, VersionError> {
    let trimmed = input.trim();
    let (core, suffix) = match trimmed.find(['-', '+']) {
        Some(idx) => trimmed.split_at(idx),
        None => (trimmed, ""),
    };

    let parts = core.split('.').count();
    let padded = match parts {
        1 => format!("{core}.0.0{suffix}"),
        2 => format!("{core}.0{suffix}"),
        _ => trimmed.to_string(),
    };

    Version::parse(&padded).map_err(|_| VersionError::InvalidVersion {
        input: input.to_string(),
    })
}

/// A single version constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionConstraint {
    Exact(Version),
    GreaterEqual(Version),
    LessEqual(Version),
    Greater(Version),
    Less(Version),
}

impl VersionConstraint {
    /// Check if a version satisfies this constraint
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Exact(v) => version == v,
            Self::GreaterEqual(v) => version >= v,
            Self::LessEqual(v) => version <= v,
            Self::Greater(v) => version > v,
            Self::Less(v) => version < v,
        }
    }
}

impl FromStr for VersionConstraint {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let constraint = if let Some(rest) = s.strip_prefix(">=") {
            Self::GreaterEqual(parse_lenient(rest)?)
        } else if let Some(rest) = s.strip_prefix("<=") {
            Self::LessEqual(parse_lenient(rest)?)
        } else if let Some(rest) = s.strip_prefix('>') {
            Self::Greater(parse_lenient(rest)?)
        } else if let Some(rest) = s.strip_prefix('<') {
            Self::Less(parse_lenient(rest)?)
        } else if let Some(rest) = s.strip_prefix('=') {
            Self::Exact(parse_lenient(rest)?)
        } else if s.starts_with(|c: char| c.is_ascii_digit()) {
            Self::Exact(parse_lenient(s)?)
        } else {
            return Err(VersionError::InvalidConstraint {
                input: s.to_string(),
            });
        };
        Ok(constraint)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "={v}"),
            Self::GreaterEqual(v) => write!(f, ">={v}"),
            Self::LessEqual(v) => write!(f, "<={v}"),
            Self::Greater(v) => write!(f, ">{v}"),
            Self::Less(v) => write!(f, "<{v}"),
        }
    }
}

/// A dependency reference: component name plus optional version constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRef {
    pub name: String,
    pub constraint: Option<VersionConstraint>,
}

impl DependencyRef {
    /// Unqualified reference to a component name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: None,
        }
    }

    /// Check whether a component version satisfies this reference
    #[must_use]
    pub fn accepts(&self, version: &Version) -> bool {
        self.constraint.as_ref().is_none_or(|c| c.matches(version))
    }
}

impl FromStr for DependencyRef {
    type Err = VersionError;

    /// Splits at the first `-` followed by a comparator or digit whose
    /// remainder parses as a constraint. Names with other dashes stay intact.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionError::InvalidConstraint {
                input: s.to_string(),
            });
        }

        for (idx, _) in s.match_indices('-') {
            let rest = &s[idx + 1..];
            let qualifies = rest
                .chars()
                .next()
                .is_some_and(|c| matches!(c, '<' | '>' | '=') || c.is_ascii_digit());
            if idx == 0 || !qualifies {
                continue;
            }
            if let Ok(constraint) = rest.parse::<VersionConstraint>() {
                return Ok(Self {
                    name: s[..idx].to_string(),
                    constraint: Some(constraint),
                });
            }
        }

        Ok(Self::named(s))
    }
}

impl fmt::Display for DependencyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some(VersionConstraint::Exact(v)) => write!(f, "{}-{v}", self.name),
            Some(c) => write!(f, "{}-{c}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
