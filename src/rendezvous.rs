use std::sync::Arc;

use crate::auth::AuthTokenStore;
use crate::broker::CorrelationBroker;
use crate::registration::Registrar;

#[derive(Debug, Clone)]
pub struct RendezvousConfig {
    /// Externally visible root of the host service, used to build callback
    /// URLs. Registration fails without it.
    pub base_url: Option<String>,

    /// Cap on accepted callback body size. Unbounded by default; the host
    /// transport is expected to impose its own limit.
    pub max_body_bytes: usize,
}

impl Default for RendezvousConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            max_body_bytes: usize::MAX,
        }
    }
}

/// One wired instance of the whole rendezvous: auth store, broker, and
/// registrar sharing the same tables.
///
/// Construct one per process and hand it to the pieces that need it.
/// Independent instances share nothing, so tests can run many side by
/// side.
pub struct Rendezvous {
    auth: Arc<AuthTokenStore>,
    broker: Arc<CorrelationBroker>,
    registrar: Registrar,
    #[cfg_attr(not(feature = "http"), allow(dead_code))]
    config: RendezvousConfig,
}

impl Rendezvous {
    pub fn new(config: RendezvousConfig) -> Self {
        let auth = Arc::new(AuthTokenStore::new());
        let broker = Arc::new(CorrelationBroker::new(auth.clone()));
        let registrar = Registrar::new(auth.clone(), config.base_url.clone());
        Self {
            auth,
            broker,
            registrar,
            config,
        }
    }

    pub fn broker(&self) -> &Arc<CorrelationBroker> {
        &self.broker
    }

    pub fn registrar(&self) -> &Registrar {
        &self.registrar
    }

    pub fn auth_store(&self) -> &Arc<AuthTokenStore> {
        &self.auth
    }

    /// The callback routes wired to this instance's broker and auth store.
    #[cfg(feature = "http")]
    pub fn callback_router(&self) -> axum::Router {
        let state = crate::endpoint::CallbackState::new(
            self.broker.clone(),
            crate::auth::CallbackAuthenticator::new(self.auth.clone()),
        )
        .with_max_body_bytes(self.config.max_body_bytes);
        crate::endpoint::callback_router(state)
    }
}
