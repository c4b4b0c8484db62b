//! In-process rendezvous between a waiting caller and one inbound webhook
//! POST, correlated by an opaque token.
//!
//! This crate provides the **correlation broker** for hosts that suspend
//! work until an external system calls back: a waiter registers interest in
//! a token, a callback is POSTed against that token, and the broker matches
//! the two exactly once no matter which side arrives first.
//!
//! ## Guarantees
//! - At-most-once notification per token
//! - No lost callback for any arrival order
//! - Per-token shared-secret check before a callback is accepted
//! - Safe re-registration after a host restart
//!
//! ## Non-Guarantees
//! - Durability across restarts
//! - Fan-out to multiple waiters
//! - Queueing beyond the single retained callback (a re-post overwrites)
//!
//! This crate is intentionally **not a message bus**. It exposes the *real*
//! race of webhook rendezvous, the callback landing between "check pending"
//! and "park myself as waiter", inside a single process.

mod auth;
mod broker;
mod error;
mod registration;
mod rendezvous;
mod types;

#[cfg(feature = "http")]
mod endpoint;

pub use auth::{AuthDecision, AuthTokenStore, CallbackAuthenticator};
pub use broker::CorrelationBroker;
pub use error::{DeliveryOutcome, RegisterError, WaitStatus};
pub use registration::{
    RegistrationRequest, Registrar, WebhookRegistration, CALLBACK_MOUNT,
};
pub use rendezvous::{Rendezvous, RendezvousConfig};
pub use types::{
    CallbackEnvelope, HeaderBag, OneshotWaiter, Token, WaitEvent, WaitHandle, WaitReply,
};

#[cfg(feature = "http")]
pub use endpoint::{
    callback_router, CallbackState, RESULT_HEADER, RESULT_TRIGGERED, RESULT_UNAUTHORIZED,
};
