//! API key validation
//!
//! Keys come from configuration (one per permission level) and arrive on
//! requests as `Authorization: Bearer <key>` or `X-Api-Key`. In dev mode
//! every request is treated as admin.

use hyper::header::AUTHORIZATION;
use hyper::Request;

use crate::auth::PermissionLevel;
use crate::config::Args;

/// Pull the API key out of a request, if present
///
/// `Authorization: Bearer <key>` wins over `X-Api-Key`.
pub fn extract_api_key<B>(req: &Request<B>) -> Option<String> {
    if let Some(value) = req.headers().get(AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    req.headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
}

/// Maps API keys to permission levels
#[derive(Debug, Clone)]
pub struct ApiKeyValidator {
    authenticated_key: Option<String>,
    admin_key: Option<String>,
    dev_mode: bool,
}

impl ApiKeyValidator {
    pub fn from_args(args: &Args) -> Self {
        Self {
            authenticated_key: args.api_key_authenticated.clone(),
            admin_key: args.api_key_admin.clone(),
            dev_mode: args.dev_mode,
        }
    }

    /// Permission level granted to a request key
    ///
    /// The admin key implies authenticated access. Unknown or absent keys
    /// are public.
    pub fn level_for(&self, key: Option<&str>) -> PermissionLevel {
        if self.dev_mode {
            return PermissionLevel::Admin;
        }

        let Some(key) = key else {
            return PermissionLevel::Public;
        };

        if self.admin_key.as_deref() == Some(key) {
            return PermissionLevel::Admin;
        }
        if self.authenticated_key.as_deref() == Some(key) {
            return PermissionLevel::Authenticated;
        }

        PermissionLevel::Public
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn validator(dev_mode: bool) -> ApiKeyValidator {
        let mut args = Args::parse_from(["bindery"]);
        args.dev_mode = dev_mode;
        args.api_key_authenticated = Some("agent-key".to_string());
        args.api_key_admin = Some("admin-key".to_string());
        ApiKeyValidator::from_args(&args)
    }

    #[test]
    fn test_key_levels() {
        let v = validator(false);
        assert_eq!(v.level_for(Some("admin-key")), PermissionLevel::Admin);
        assert_eq!(v.level_for(Some("agent-key")), PermissionLevel::Authenticated);
        assert_eq!(v.level_for(Some("wrong")), PermissionLevel::Public);
        assert_eq!(v.level_for(None), PermissionLevel::Public);
    }

    #[test]
    fn test_dev_mode_grants_admin() {
        let v = validator(true);
        assert_eq!(v.level_for(None), PermissionLevel::Admin);
    }

    #[test]
    fn test_extract_bearer_and_header_keys() {
        let req = Request::builder()
            .header("Authorization", "Bearer secret-1")
            .body(())
            .unwrap();
        assert_eq!(extract_api_key(&req), Some("secret-1".to_string()));

        let req = Request::builder()
            .header("X-Api-Key", "secret-2")
            .body(())
            .unwrap();
        assert_eq!(extract_api_key(&req), Some("secret-2".to_string()));

        let req = Request::builder().body(()).unwrap();
        assert_eq!(extract_api_key(&req), None);
    }
}
