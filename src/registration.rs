use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use secrecy::SecretString;
use url::Url;

use crate::auth::AuthTokenStore;
use crate::error::RegisterError;
use crate::types::Token;

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

/// Path segment under which callbacks are mounted, shared by the callback
/// URL builder and the HTTP router.
pub const CALLBACK_MOUNT: &str = "webhook";

/// Characters that survive token encoding unchanged (RFC 3986 unreserved).
/// A caller-supplied token must be a fixed point of this encoding.
const TOKEN_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Parameters for one registration.
///
/// Both fields are optional: an absent token is generated, an absent secret
/// leaves the callback endpoint open for that token.
#[derive(Debug, Default)]
pub struct RegistrationRequest {
    token: Option<String>,
    secret: Option<SecretString>,
}

impl RegistrationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a caller-chosen token instead of a generated one. An empty
    /// string is treated as absent.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Require this shared secret in the Authorization header of the
    /// callback POST.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(SecretString::from(secret.into()));
        self
    }
}

/// Result of a successful registration: the token and the externally
/// visible URL the callback must be POSTed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRegistration {
    pub token: Token,
    pub url: String,
}

/// Issues tokens and builds callback URLs, storing the secret before the
/// URL is handed back so a callback arriving right after registration is
/// always authenticated against the correct secret.
pub struct Registrar {
    store: Arc<AuthTokenStore>,
    base_url: Option<String>,
}

impl Registrar {
    /// `base_url` is the externally visible root of the host service. It
    /// is a required precondition for registration, but only checked when
    /// `register` is called.
    pub fn new(store: Arc<AuthTokenStore>, base_url: Option<String>) -> Self {
        Self { store, base_url }
    }

    pub async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<WebhookRegistration, RegisterError> {
        let token = match request.token.filter(|raw| !raw.is_empty()) {
            Some(raw) => validate_token(raw)?,
            None => Token::random(),
        };
        let url = self.callback_url(&token)?;

        self.store.put(token.clone(), request.secret).await;
        metric_inc("webhook.token.registered");

        Ok(WebhookRegistration { token, url })
    }

    fn callback_url(&self, token: &Token) -> Result<String, RegisterError> {
        let base = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|base| !base.is_empty())
            .ok_or(RegisterError::MissingBaseUrl)?;

        // Resolve against the directory form of the base so its last path
        // segment is kept.
        let mut base_dir = base.to_string();
        if !base_dir.ends_with('/') {
            base_dir.push('/');
        }

        let invalid = || RegisterError::InvalidBaseUrl {
            base_url: base.to_string(),
        };
        let parsed = Url::parse(&base_dir).map_err(|_| invalid())?;
        let joined = parsed
            .join(&format!("{CALLBACK_MOUNT}/{token}"))
            .map_err(|_| invalid())?;
        Ok(joined.to_string())
    }
}

/// A caller-supplied token must already be in canonical URL-path-safe
/// form. One that would change under encoding is rejected, with the
/// encoded form as the corrective suggestion.
fn validate_token(raw: String) -> Result<Token, RegisterError> {
    let encoded = utf8_percent_encode(&raw, TOKEN_ENCODE_SET).to_string();
    if encoded != raw {
        return Err(RegisterError::InvalidToken {
            token: raw,
            suggestion: encoded,
        });
    }
    Ok(Token(raw))
}
