use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

/// Opaque identifier correlating one registration with one eventual callback.
///
/// This is a strongly-typed wrapper to avoid accidental mixing
/// of webhook tokens with other string identifiers.
///
/// Tokens are case-sensitive and must be URL-path-safe; callers that do not
/// supply their own token get a randomly generated one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token(pub String);

impl Token {
    /// Generate a fresh random token (UUID v4, 128 bits of entropy).
    pub fn random() -> Self {
        Token(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Insertion-ordered header map with a single value per name.
///
/// Header names compare case-insensitively. Inserting a name that is already
/// present replaces its value in place, keeping the original position
/// (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderBag {
    entries: Vec<(String, String)>,
}

impl HeaderBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header. Replaces the value of an existing name without
    /// changing its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for HeaderBag {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut bag = HeaderBag::new();
        for (name, value) in iter {
            bag.insert(name, value);
        }
        bag
    }
}

/// Immutable capture of one inbound callback: raw body plus headers.
///
/// The body is opaque bytes. The documented use case is JSON, but nothing
/// here validates or parses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackEnvelope {
    /// Raw request body.
    pub body: Vec<u8>,

    /// Request headers as received, in insertion order.
    pub headers: HeaderBag,
}

impl CallbackEnvelope {
    pub fn new(body: impl Into<Vec<u8>>, headers: HeaderBag) -> Self {
        Self {
            body: body.into(),
            headers,
        }
    }

    /// Envelope with a body and no headers.
    pub fn from_body(body: impl Into<Vec<u8>>) -> Self {
        Self::new(body, HeaderBag::new())
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn body_as_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// What a waiter receives when its callback arrives.
///
/// Shaped by the `with_headers` flag passed at wait registration: most
/// consumers only want the body, some need the full envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitReply {
    /// Body only.
    Body(Vec<u8>),
    /// Full envelope including headers.
    Envelope(CallbackEnvelope),
}

impl WaitReply {
    pub fn body(&self) -> &[u8] {
        match self {
            WaitReply::Body(body) => body,
            WaitReply::Envelope(envelope) => &envelope.body,
        }
    }
}

/// A parked consumer awaiting the callback for one token.
///
/// `notify` must be cheap and non-blocking. It is invoked on the delivering
/// task, outside the broker's critical section. `fail` is never invoked by
/// the broker itself; it exists for the host layer to resolve a wait it
/// knows has become unsatisfiable, for example after a restart.
///
/// A handle is normally resolved at most once, but implementations must
/// tolerate a second invocation under re-registration races.
pub trait WaitHandle: Send + Sync {
    fn notify(&self, reply: WaitReply);

    fn fail(&self, cause: Box<dyn std::error::Error + Send + Sync>);
}

/// Terminal event observed by an [`OneshotWaiter`]'s receiver.
#[derive(Debug)]
pub enum WaitEvent {
    Notified(WaitReply),
    Failed(Box<dyn std::error::Error + Send + Sync>),
}

/// Ready-made [`WaitHandle`] backed by a oneshot channel, for hosts that
/// want to `.await` the callback instead of implementing the trait.
///
/// The first of `notify` or `fail` resolves the channel; later invocations
/// are dropped.
pub struct OneshotWaiter {
    slot: Mutex<Option<oneshot::Sender<WaitEvent>>>,
}

impl OneshotWaiter {
    /// Create a waiter and the receiver that resolves with its outcome.
    pub fn channel() -> (Arc<Self>, oneshot::Receiver<WaitEvent>) {
        let (tx, rx) = oneshot::channel();
        let waiter = Arc::new(Self {
            slot: Mutex::new(Some(tx)),
        });
        (waiter, rx)
    }
}

impl WaitHandle for OneshotWaiter {
    fn notify(&self, reply: WaitReply) {
        if let Some(tx) = self.slot.lock().take() {
            let _ = tx.send(WaitEvent::Notified(reply));
        }
    }

    fn fail(&self, cause: Box<dyn std::error::Error + Send + Sync>) {
        if let Some(tx) = self.slot.lock().take() {
            let _ = tx.send(WaitEvent::Failed(cause));
        }
    }
}
