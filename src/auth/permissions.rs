//! Permission levels for API operations

use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission levels for API operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum PermissionLevel {
    /// No authentication - health and version probes
    #[default]
    Public = 0,
    /// Authenticated agent - roster reads, policy creation
    Authenticated = 1,
    /// Admin - commission reports, roster mutation, diagnostics
    Admin = 2,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::Public => write!(f, "PUBLIC"),
            PermissionLevel::Authenticated => write!(f, "AUTHENTICATED"),
            PermissionLevel::Admin => write!(f, "ADMIN"),
        }
    }
}
