//! Module descriptor definitions.
//!
//! Descriptors are immutable once loaded. They describe which interfaces a
//! module provides and the routing entries through which requests reach it.
//!
//! # Level encoding
//! Levels are fixed-width, zero-padded decimal strings (`LEVEL_WIDTH` digits).
//! They are compared as strings, so the shared width is part of the wire
//! contract: `"05" < "30" < "45"` holds lexicographically only because every
//! descriptor pads to the same width.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of digits every routing-entry level is padded to.
pub const LEVEL_WIDTH: usize = 2;

/// Module identifier: `<name>-<semver>`, e.g. `mod-users-1.2.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// How many enabled modules may provide an interface at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceType {
    #[default]
    Proxy,
    System,
    Multiple,
}

/// Coarse ordering role of a filter entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Auth,
    Pre,
    Post,
}

impl Phase {
    /// Level used when a filter entry does not declare one.
    pub fn default_level(self) -> &'static str {
        match self {
            Phase::Auth => "10",
            Phase::Pre => "40",
            Phase::Post => "60",
        }
    }
}

/// Level used by handler entries that do not declare one.
pub const DEFAULT_HANDLER_LEVEL: &str = "50";

/// Forwarding strategy a routing entry asks for.
///
/// Unknown strings survive deserialization as `Other` so that the executor
/// can reject them explicitly instead of dropping the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum RoutingType {
    #[default]
    RequestResponse,
    RequestOnly,
    Headers,
    Redirect,
    Other(String),
}

impl RoutingType {
    pub fn as_str(&self) -> &str {
        match self {
            RoutingType::RequestResponse => "request-response",
            RoutingType::RequestOnly => "request-only",
            RoutingType::Headers => "headers",
            RoutingType::Redirect => "redirect",
            RoutingType::Other(other) => other,
        }
    }
}

impl From<String> for RoutingType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "request-response" => RoutingType::RequestResponse,
            "request-only" => RoutingType::RequestOnly,
            "headers" => RoutingType::Headers,
            "redirect" => RoutingType::Redirect,
            _ => RoutingType::Other(value),
        }
    }
}

impl From<RoutingType> for String {
    fn from(value: RoutingType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RoutingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single routing rule declared by a module.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RoutingEntry {
    /// Accepted methods; `"*"` accepts every method.
    pub methods: Vec<String>,

    /// Path prefix to match.
    #[serde(default)]
    pub path: Option<String>,

    /// Whole-path pattern; `{name}` matches one segment, `*` matches anything.
    #[serde(default)]
    pub path_pattern: Option<String>,

    /// Filter phase; absent for ordinary handlers.
    #[serde(default)]
    pub phase: Option<Phase>,

    /// Sort key, see [`LEVEL_WIDTH`].
    #[serde(default)]
    pub level: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: RoutingType,

    /// Target path for `redirect` entries.
    #[serde(default)]
    pub redirect_path: Option<String>,
}

impl RoutingEntry {
    /// Level used for ordering, falling back to the phase convention.
    pub fn effective_level(&self) -> &str {
        match (&self.level, self.phase) {
            (Some(level), _) => level,
            (None, Some(phase)) => phase.default_level(),
            (None, None) => DEFAULT_HANDLER_LEVEL,
        }
    }

    /// Pattern text used for diagnostics.
    pub fn display_path(&self) -> &str {
        self.path_pattern
            .as_deref()
            .or(self.path.as_deref())
            .unwrap_or("")
    }

    pub fn is_handler(&self) -> bool {
        self.phase.is_none()
    }
}

/// An interface provided by a module.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InterfaceDescriptor {
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub interface_type: InterfaceType,
    #[serde(default)]
    pub handlers: Vec<RoutingEntry>,
}

/// Immutable description of a module.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModuleDescriptor {
    pub id: ModuleId,
    #[serde(default)]
    pub provides: Vec<InterfaceDescriptor>,
    #[serde(default)]
    pub filters: Vec<RoutingEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_level() {
        let mut entry: RoutingEntry = toml::from_str(
            r#"
            methods = ["GET"]
            path = "/foo"
            "#,
        )
        .unwrap();
        assert_eq!(entry.effective_level(), "50");

        entry.phase = Some(Phase::Auth);
        assert_eq!(entry.effective_level(), "10");

        entry.level = Some("05".into());
        assert_eq!(entry.effective_level(), "05");
    }

    #[test]
    fn test_unknown_routing_type_is_preserved() {
        let entry: RoutingEntry = toml::from_str(
            r#"
            methods = ["*"]
            path = "/foo"
            type = "system-magic"
            "#,
        )
        .unwrap();
        assert_eq!(entry.kind, RoutingType::Other("system-magic".into()));
        assert_eq!(entry.kind.to_string(), "system-magic");
    }

    #[test]
    fn test_descriptor_from_toml() {
        let descriptor: ModuleDescriptor = toml::from_str(
            r#"
            id = "mod-a-1.0.0"

            [[provides]]
            id = "a"
            version = "1.0"
            interface_type = "multiple"

            [[provides.handlers]]
            methods = ["GET"]
            path = "/a"
            type = "request-only"

            [[filters]]
            methods = ["*"]
            path = "/"
            phase = "pre"
            type = "headers"
            "#,
        )
        .unwrap();

        assert_eq!(descriptor.provides[0].interface_type, InterfaceType::Multiple);
        assert_eq!(descriptor.provides[0].handlers[0].kind, RoutingType::RequestOnly);
        assert_eq!(descriptor.filters[0].phase, Some(Phase::Pre));
        assert_eq!(descriptor.filters[0].effective_level(), "40");
    }
}
