//! Remote API authentication
//!
//! Handles:
//! - Signing short-lived tokens from an API key and secret
//! - Passing through a pre-issued bearer token

mod token;

pub use token::{TokenClaims, sign_token};

use std::fmt;
use std::time::Duration;

use crate::config::{ApiConfig, present};
use crate::error::AppError;

/// How the bearer credential is obtained
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Sign a token from key and secret
    Signed {
        api_key: String,
        api_secret: String,
        ttl: Duration,
    },
    /// Use a token issued elsewhere
    PreIssued(String),
}

impl AuthMode {
    /// Resolve the auth mode from API configuration
    ///
    /// # Errors
    /// Returns `Credential` when both or neither modes are configured
    pub fn from_config(config: &ApiConfig) -> Result<Self, AppError> {
        let key = present(&config.api_key);
        let secret = present(&config.api_secret);
        let token = present(&config.token);

        match (key, secret, token) {
            (None, None, Some(token)) => Ok(AuthMode::PreIssued(token.to_string())),
            (Some(key), Some(secret), None) => Ok(AuthMode::Signed {
                api_key: key.to_string(),
                api_secret: secret.to_string(),
                ttl: Duration::from_secs(config.token_ttl_seconds),
            }),
            _ => Err(AppError::Credential(
                "exactly one of api.token or api.api_key/api.api_secret must be configured"
                    .to_string(),
            )),
        }
    }

    /// Produce the bearer credential for this run
    pub fn credential(&self) -> Result<Credential, AppError> {
        match self {
            AuthMode::PreIssued(token) => Ok(Credential::new(token.clone())),
            AuthMode::Signed {
                api_key,
                api_secret,
                ttl,
            } => {
                let ttl = chrono::Duration::from_std(*ttl)
                    .map_err(|e| AppError::Credential(e.to_string()))?;
                let token = sign_token(api_key, api_secret, chrono::Utc::now() + ttl)?;
                tracing::debug!("Signed API token");
                Ok(Credential::new(token))
            }
        }
    }
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Signed { api_key, ttl, .. } => f
                .debug_struct("Signed")
                .field("api_key", api_key)
                .field("ttl", ttl)
                .finish_non_exhaustive(),
            AuthMode::PreIssued(_) => f.write_str("PreIssued(..)"),
        }
    }
}

/// Opaque bearer credential for the remote API
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::valid_config;

    #[test]
    fn pre_issued_token_is_used_verbatim() {
        let config = valid_config();
        let mode = AuthMode::from_config(&config.api).unwrap();

        assert_eq!(mode, AuthMode::PreIssued("pre-issued-token".to_string()));
        assert_eq!(mode.credential().unwrap().expose(), "pre-issued-token");
    }

    #[test]
    fn key_and_secret_produce_signed_token() {
        let mut config = valid_config();
        config.api.token = None;
        config.api.api_key = Some("key".to_string());
        config.api.api_secret = Some("secret".to_string());

        let mode = AuthMode::from_config(&config.api).unwrap();
        assert!(matches!(mode, AuthMode::Signed { .. }));

        let credential = mode.credential().unwrap();
        assert_eq!(credential.expose().split('.').count(), 3);
    }

    #[test]
    fn both_modes_are_rejected() {
        let mut config = valid_config();
        config.api.api_key = Some("key".to_string());
        config.api.api_secret = Some("secret".to_string());

        let error = AuthMode::from_config(&config.api).unwrap_err();
        assert!(matches!(error, AppError::Credential(_)));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let credential = Credential::new("top-secret");
        assert!(!format!("{:?}", credential).contains("top-secret"));

        let mode = AuthMode::Signed {
            api_key: "key".to_string(),
            api_secret: "top-secret".to_string(),
            ttl: Duration::from_secs(60),
        };
        assert!(!format!("{:?}", mode).contains("top-secret"));
    }
}
