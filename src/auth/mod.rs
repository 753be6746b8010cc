//! Authentication and authorization for Bindery
//!
//! Static API keys with two permission levels: authenticated (roster and
//! policy endpoints) and admin (reports, roster mutation). Dev mode
//! disables the gate entirely.

mod api_key;
mod permissions;

pub use api_key::{extract_api_key, ApiKeyValidator};
pub use permissions::PermissionLevel;
