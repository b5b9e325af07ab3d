//! Party identity and role types.
//!
//! A party is an authenticated WebSocket client. Roles split into the
//! counterparty being negotiated with (`blogger`) and internal observers
//! (`marketer`) who receive deal-update broadcasts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role of an authenticated party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    /// The negotiation counterparty. Connecting triggers the welcome flow.
    Blogger,
    /// Internal observer. Receives `deal_update` broadcasts.
    Marketer,
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartyRole::Blogger => write!(f, "blogger"),
            PartyRole::Marketer => write!(f, "marketer"),
        }
    }
}

impl FromStr for PartyRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blogger" => Ok(PartyRole::Blogger),
            "marketer" => Ok(PartyRole::Marketer),
            other => Err(format!("invalid party role: '{other}'")),
        }
    }
}

/// Result of a successful token verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedParty {
    pub party_id: Uuid,
    pub role: PartyRole,
}
