use std::fmt;

/// Errors returned when registering a webhook fails *before* any state is
/// stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// Caller-supplied token is not URL-path-safe.
    /// `suggestion` carries the properly encoded form.
    InvalidToken {
        token: String,
        suggestion: String,
    },

    /// No base URL was configured, so no callback URL can be built.
    MissingBaseUrl,

    /// The configured base URL could not be parsed as an absolute URL.
    InvalidBaseUrl {
        base_url: String,
    },
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::InvalidToken { token, suggestion } =>
                write!(f, "bad token [{token}], pass it urlencoded as [{suggestion}]"),
            RegisterError::MissingBaseUrl =>
                write!(f, "no base URL configured for callback URLs"),
            RegisterError::InvalidBaseUrl { base_url } =>
                write!(f, "base URL is not a valid absolute URL: {base_url}"),
        }
    }
}

impl std::error::Error for RegisterError {}

/// Outcome of handing an inbound callback to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// A waiter was parked for the token and has been notified.
    Triggered,

    /// No waiter was listening yet; the envelope is retained until one
    /// registers.
    Parked,
}

/// Outcome of registering a waiter with the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitStatus {
    /// The waiter is parked and will be notified by a future callback.
    Waiting,

    /// The callback had already arrived; the waiter was notified with the
    /// retained envelope and nothing remains parked.
    AlreadyDelivered,
}
