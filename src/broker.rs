use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::auth::AuthTokenStore;
use crate::error::{DeliveryOutcome, WaitStatus};
use crate::types::{CallbackEnvelope, Token, WaitHandle, WaitReply};

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

#[cfg(feature = "tracing")]
fn trace_token(message: &'static str, token: &Token) {
    tracing::debug!(token = %token, message);
}

#[cfg(not(feature = "tracing"))]
fn trace_token(_message: &'static str, _token: &Token) {}

struct Waiter {
    handle: Arc<dyn WaitHandle>,
    with_headers: bool,
}

impl Waiter {
    fn reply_for(&self, envelope: CallbackEnvelope) -> WaitReply {
        shape_reply(envelope, self.with_headers)
    }
}

fn shape_reply(envelope: CallbackEnvelope, with_headers: bool) -> WaitReply {
    if with_headers {
        WaitReply::Envelope(envelope)
    } else {
        WaitReply::Body(envelope.body)
    }
}

/// Both correlation tables. A single lock guards them: the check-then-act
/// sequences in `register_wait` and `deliver` must be atomic relative to
/// each other, or a callback landing between "check parked" and "store
/// waiter" is lost.
#[derive(Default)]
struct Tables {
    waiters: HashMap<Token, Waiter>,
    parked: HashMap<Token, CallbackEnvelope>,
}

/// Reconciles waiter registration and callback delivery per token,
/// whichever side arrives first.
///
/// Invariant: a token never holds both a parked waiter and a parked
/// envelope. The moment both would coexist they collapse into a delivery
/// and both entries are cleared.
///
/// All state is process-lifetime and volatile. After a restart the host
/// layer re-issues `register_wait` for every execution it resumes; parked
/// envelopes accepted before the restart are lost.
pub struct CorrelationBroker {
    tables: Mutex<Tables>,
    auth: Arc<AuthTokenStore>,
}

impl CorrelationBroker {
    pub fn new(auth: Arc<AuthTokenStore>) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            auth,
        }
    }

    /// Park `handle` as the waiter for `token`, or notify it immediately
    /// when the callback already arrived.
    ///
    /// When an envelope is already parked for the token it is removed and
    /// handed to `handle.notify` (shaped per `with_headers`), and the
    /// returned status is [`WaitStatus::AlreadyDelivered`]. Otherwise the
    /// handle is stored and the status is [`WaitStatus::Waiting`].
    ///
    /// Registering again for the same token replaces the previous waiter;
    /// the replaced handle is dropped without notification. Hosts resuming
    /// after a restart rely on this being safe to call again.
    pub async fn register_wait(
        &self,
        token: &Token,
        handle: Arc<dyn WaitHandle>,
        with_headers: bool,
    ) -> WaitStatus {
        trace_token("registering webhook waiter", token);
        let parked = {
            let mut tables = self.tables.lock().await;
            match tables.parked.remove(token) {
                Some(envelope) => Some(envelope),
                None => {
                    tables.waiters.insert(
                        token.clone(),
                        Waiter {
                            handle: handle.clone(),
                            with_headers,
                        },
                    );
                    None
                }
            }
        };

        match parked {
            Some(envelope) => {
                handle.notify(shape_reply(envelope, with_headers));
                metric_inc("webhook.wait.already_delivered");
                WaitStatus::AlreadyDelivered
            }
            None => {
                metric_inc("webhook.wait.registered");
                WaitStatus::Waiting
            }
        }
    }

    /// Hand an inbound callback to whoever is waiting on `token`, or retain
    /// it until someone does.
    ///
    /// Unknown tokens are accepted: a callback posted before anyone asked
    /// is parked like any other. A second delivery for a token that still
    /// has a parked envelope overwrites it (last write wins).
    ///
    /// The waiter's `notify` runs after the critical section so a slow
    /// handle cannot stall unrelated tokens.
    pub async fn deliver(&self, token: &Token, envelope: CallbackEnvelope) -> DeliveryOutcome {
        trace_token("webhook callback received", token);
        let waiter = {
            let mut tables = self.tables.lock().await;
            match tables.waiters.remove(token) {
                Some(waiter) => waiter,
                None => {
                    tables.parked.insert(token.clone(), envelope);
                    metric_inc("webhook.callback.parked");
                    return DeliveryOutcome::Parked;
                }
            }
        };

        waiter.handle.notify(waiter.reply_for(envelope));
        metric_inc("webhook.callback.triggered");
        DeliveryOutcome::Triggered
    }

    /// Remove the waiter for `token` if and only if it is `handle`.
    ///
    /// The identity check keeps a stale handle (for example one superseded
    /// by re-registration) from cancelling the live waiter. A parked
    /// envelope is left in place.
    pub async fn cancel_wait(&self, token: &Token, handle: &Arc<dyn WaitHandle>) {
        let mut tables = self.tables.lock().await;
        let matches = tables
            .waiters
            .get(token)
            .map(|waiter| same_handle(&waiter.handle, handle))
            .unwrap_or(false);
        if matches {
            tables.waiters.remove(token);
            metric_inc("webhook.wait.cancelled");
        }
    }

    /// Final teardown for `token`: waiter, parked envelope, and secret are
    /// all removed.
    pub async fn deregister(&self, token: &Token) {
        trace_token("deregistering webhook", token);
        {
            let mut tables = self.tables.lock().await;
            tables.waiters.remove(token);
            tables.parked.remove(token);
        }
        self.auth.remove(token).await;
    }

    /// True when a waiter is currently parked for `token`.
    pub async fn is_waiting(&self, token: &Token) -> bool {
        self.tables.lock().await.waiters.contains_key(token)
    }

    /// True when an undelivered envelope is retained for `token`.
    pub async fn has_pending_response(&self, token: &Token) -> bool {
        self.tables.lock().await.parked.contains_key(token)
    }
}

/// Pointer identity for trait-object handles. Compares data pointers only;
/// vtable pointers are not stable across codegen units.
fn same_handle(a: &Arc<dyn WaitHandle>, b: &Arc<dyn WaitHandle>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a).cast::<()>(),
        Arc::as_ptr(b).cast::<()>(),
    )
}
