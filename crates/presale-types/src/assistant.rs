//! Static assistant descriptors.
//!
//! Each logical assistant role maps to one explicit descriptor: display
//! name, version tag, sampling temperature, model, and the instruction
//! text resolved once at startup. The cache in presale-core consumes these
//! as plain data and resolves them to external assistant identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Logical assistant role within a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantRole {
    /// Drives the conversation with the blogger.
    Manager,
    /// Extracts structured deal fields from the blogger's messages.
    Parser,
}

impl AssistantRole {
    pub const ALL: [AssistantRole; 2] = [AssistantRole::Manager, AssistantRole::Parser];
}

impl fmt::Display for AssistantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssistantRole::Manager => write!(f, "manager"),
            AssistantRole::Parser => write!(f, "parser"),
        }
    }
}

impl FromStr for AssistantRole {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manager" => Ok(AssistantRole::Manager),
            "parser" => Ok(AssistantRole::Parser),
            other => Err(ConfigError::UnknownAssistant(other.to_string())),
        }
    }
}

/// Descriptor for one external assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantSpec {
    pub role: AssistantRole,
    /// Display name, also the `type` metadata tag on the external side.
    pub display_name: String,
    /// Version tag, matched against `version` metadata on the external side.
    pub version: String,
    pub temperature: f64,
    pub model: String,
    pub instructions: String,
}

impl AssistantSpec {
    /// The name under which the external assistant is registered.
    pub fn external_name(&self) -> String {
        format!("{} v{}", self.display_name, self.version)
    }
}

/// The statically enumerated set of assistant descriptors.
///
/// Built once at startup; the instruction sources are already resolved to
/// text by the time a catalog exists.
#[derive(Debug, Clone)]
pub struct AssistantCatalog {
    specs: Vec<AssistantSpec>,
}

impl AssistantCatalog {
    /// Build a catalog from descriptors. Fails if any role is missing.
    pub fn new(specs: Vec<AssistantSpec>) -> Result<Self, ConfigError> {
        for role in AssistantRole::ALL {
            if !specs.iter().any(|s| s.role == role) {
                return Err(ConfigError::UnknownAssistant(role.to_string()));
            }
        }
        Ok(Self { specs })
    }

    /// Descriptor for a logical role.
    pub fn spec(&self, role: AssistantRole) -> Result<&AssistantSpec, ConfigError> {
        self.specs
            .iter()
            .find(|s| s.role == role)
            .ok_or_else(|| ConfigError::UnknownAssistant(role.to_string()))
    }
}
