use std::collections::HashMap;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use crate::types::Token;

#[cfg(feature = "tracing")]
fn warn_unexpected_credential(token: &Token) {
    tracing::warn!(token = %token, "unexpected Authorization header for webhook without a secret");
}

#[cfg(not(feature = "tracing"))]
fn warn_unexpected_credential(_token: &Token) {}

/// Shared secrets keyed by token.
///
/// Registering a token without a credential clears any previously stored
/// one, so "registered without a secret" and "never registered" are the
/// same observable state. Secret material never leaves the store in
/// cleartext; comparison happens in [`CallbackAuthenticator`].
#[derive(Default)]
pub struct AuthTokenStore {
    secrets: RwLock<HashMap<Token, SecretString>>,
}

impl AuthTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a secret to a token, or clear it when `secret` is `None`.
    pub async fn put(&self, token: Token, secret: Option<SecretString>) {
        let mut guard = self.secrets.write().await;
        match secret {
            Some(secret) => {
                guard.insert(token, secret);
            }
            None => {
                guard.remove(&token);
            }
        }
    }

    /// Copy of the stored secret, still wrapped. `None` for unknown tokens
    /// and for tokens registered without a credential.
    pub async fn get(&self, token: &Token) -> Option<SecretString> {
        self.secrets
            .read()
            .await
            .get(token)
            .map(|secret| SecretString::from(secret.expose_secret().to_owned()))
    }

    pub async fn remove(&self, token: &Token) {
        self.secrets.write().await.remove(token);
    }

    pub async fn has_secret(&self, token: &Token) -> bool {
        self.secrets.read().await.contains_key(token)
    }
}

/// Decision for one inbound callback's credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// Credential matches the stored secret, or the token requires none.
    Allowed,

    /// A secret is stored for the token and the credential does not match.
    Denied,

    /// No secret is stored but a credential was presented anyway. The
    /// callback proceeds; the mismatch is only logged.
    Unchecked,
}

/// Validates an inbound callback's credential against [`AuthTokenStore`]
/// before the broker is consulted.
#[derive(Clone)]
pub struct CallbackAuthenticator {
    store: Arc<AuthTokenStore>,
}

impl CallbackAuthenticator {
    pub fn new(store: Arc<AuthTokenStore>) -> Self {
        Self { store }
    }

    /// Check `credential` (the raw Authorization header value, if any)
    /// against the secret stored for `token`.
    pub async fn authenticate(&self, token: &Token, credential: Option<&str>) -> AuthDecision {
        match (self.store.get(token).await, credential) {
            (Some(secret), Some(provided)) if secret_matches(&secret, provided) => {
                AuthDecision::Allowed
            }
            (Some(_), _) => AuthDecision::Denied,
            (None, Some(_)) => {
                warn_unexpected_credential(token);
                AuthDecision::Unchecked
            }
            (None, None) => AuthDecision::Allowed,
        }
    }
}

/// Exact byte equality in constant time.
fn secret_matches(stored: &SecretString, provided: &str) -> bool {
    stored
        .expose_secret()
        .as_bytes()
        .ct_eq(provided.as_bytes())
        .into()
}
