//! Request owner identification.
//!
//! Credentials are verified upstream (e.g. by an authenticating gateway);
//! resolvers here only read the verified identity it forwards.

use axum::http::{HeaderMap, HeaderName};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::OwnerId;

pub const DEFAULT_IDENTITY_HEADER: &str = "x-verified-user";

/// Maps request headers to an owner, or `None` for anonymous requests.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<OwnerId>;
}

/// Trusts a header set by the upstream gateway.
#[derive(Debug, Clone)]
pub struct HeaderIdentity {
    header: HeaderName,
}

impl HeaderIdentity {
    pub fn new(header: HeaderName) -> Self {
        Self { header }
    }
}

impl Default for HeaderIdentity {
    fn default() -> Self {
        Self::new(HeaderName::from_static(DEFAULT_IDENTITY_HEADER))
    }
}

impl IdentityResolver for HeaderIdentity {
    fn resolve(&self, headers: &HeaderMap) -> Option<OwnerId> {
        headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .and_then(OwnerId::new)
    }
}

/// Every request is anonymous; history is never written.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

impl IdentityResolver for AnonymousIdentity {
    fn resolve(&self, _headers: &HeaderMap) -> Option<OwnerId> {
        None
    }
}

/// Identity settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Header carrying the verified owner id. Empty disables identity.
    #[serde(default = "default_header")]
    pub header: String,
}

fn default_header() -> String {
    DEFAULT_IDENTITY_HEADER.to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            header: default_header(),
        }
    }
}

impl IdentityConfig {
    /// Apply `IDENTITY_HEADER`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("IDENTITY_HEADER") {
            self.header = val.trim().to_string();
        }
        self
    }

    /// Build the resolver. An empty or invalid header name means anonymous.
    pub fn build(&self) -> Box<dyn IdentityResolver> {
        let header = self.header.trim().to_lowercase();
        if header.is_empty() {
            return Box::new(AnonymousIdentity);
        }
        match HeaderName::from_bytes(header.as_bytes()) {
            Ok(name) => Box::new(HeaderIdentity::new(name)),
            Err(_) => {
                warn!("Invalid identity header {:?}; running anonymously", self.header);
                Box::new(AnonymousIdentity)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_identity() {
        let mut headers = HeaderMap::new();
        let resolver = HeaderIdentity::default();
        assert!(resolver.resolve(&headers).is_none());

        headers.insert("x-verified-user", HeaderValue::from_static("uid-42"));
        assert_eq!(resolver.resolve(&headers).unwrap().as_str(), "uid-42");

        headers.insert("x-verified-user", HeaderValue::from_static("  "));
        assert!(resolver.resolve(&headers).is_none());
    }

    #[test]
    fn test_config_build() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user", HeaderValue::from_static("bob"));

        let config = IdentityConfig {
            header: "X-User".into(),
        };
        assert_eq!(config.build().resolve(&headers).unwrap().as_str(), "bob");

        let config = IdentityConfig { header: "".into() };
        assert!(config.build().resolve(&headers).is_none());

        let config = IdentityConfig {
            header: "bad header".into(),
        };
        assert!(config.build().resolve(&headers).is_none());
    }

    #[test]
    fn test_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert("x-verified-user", HeaderValue::from_static("uid"));
        assert!(AnonymousIdentity.resolve(&headers).is_none());
    }
}
