use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;

use crate::auth::{AuthDecision, CallbackAuthenticator};
use crate::broker::CorrelationBroker;
use crate::error::DeliveryOutcome;
use crate::registration::CALLBACK_MOUNT;
use crate::types::{CallbackEnvelope, HeaderBag, Token};

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

/// Response header carrying the delivery outcome marker.
pub const RESULT_HEADER: &str = "Result";

/// Marker for a callback that notified an active waiter.
pub const RESULT_TRIGGERED: &str = "WebhookTriggered";

/// Marker for a callback rejected by the secret check.
pub const RESULT_UNAUTHORIZED: &str = "Unauthorized";

/// Shared state behind the callback routes.
#[derive(Clone)]
pub struct CallbackState {
    broker: Arc<CorrelationBroker>,
    authenticator: CallbackAuthenticator,
    max_body_bytes: usize,
}

impl CallbackState {
    pub fn new(broker: Arc<CorrelationBroker>, authenticator: CallbackAuthenticator) -> Self {
        Self {
            broker,
            authenticator,
            max_body_bytes: usize::MAX,
        }
    }

    /// Cap the accepted body size. Unbounded when left unset; hosts
    /// exposing the router on a public surface should set a cap.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Routes for the callback surface, mounted under `/{CALLBACK_MOUNT}`.
///
/// `POST /{CALLBACK_MOUNT}/{token}` with an arbitrary body and an optional
/// `Authorization` header carrying the token's shared secret in plaintext.
/// Responses: 200 with `Result: WebhookTriggered` when a waiter was
/// notified, 202 when the callback was parked, 403 when the secret check
/// fails, 400 when the token is missing or the body cannot be read.
pub fn callback_router(state: CallbackState) -> Router {
    Router::new()
        .route(&format!("/{CALLBACK_MOUNT}"), post(reject_missing_token))
        .route(
            &format!("/{CALLBACK_MOUNT}/:token"),
            post(receive_callback),
        )
        .with_state(state)
}

async fn reject_missing_token() -> StatusCode {
    StatusCode::BAD_REQUEST
}

/// One response per request, no retries. Each POST is an independent
/// delivery event.
async fn receive_callback(
    State(state): State<CallbackState>,
    Path(token): Path<String>,
    request: Request,
) -> Response {
    let token = Token(token);
    let (parts, body) = request.into_parts();

    // Capture the envelope before anything is acted on; a failed body read
    // must leave no partial state anywhere.
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => {
            metric_inc("webhook.callback.unreadable");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let mut headers = HeaderBag::new();
    for (name, value) in parts.headers.iter() {
        headers.insert(
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }

    let credential = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    // A denied callback never reaches the broker: no side effect, no
    // consumption of a parked envelope.
    match state.authenticator.authenticate(&token, credential).await {
        AuthDecision::Denied => {
            metric_inc("webhook.callback.denied");
            return (
                StatusCode::FORBIDDEN,
                [(RESULT_HEADER, RESULT_UNAUTHORIZED)],
            )
                .into_response();
        }
        AuthDecision::Allowed | AuthDecision::Unchecked => {}
    }

    let envelope = CallbackEnvelope::new(body.to_vec(), headers);
    match state.broker.deliver(&token, envelope).await {
        DeliveryOutcome::Triggered => (
            StatusCode::OK,
            [(RESULT_HEADER, RESULT_TRIGGERED)],
        )
            .into_response(),
        DeliveryOutcome::Parked => StatusCode::ACCEPTED.into_response(),
    }
}
