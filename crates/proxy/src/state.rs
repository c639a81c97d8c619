//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::FirebaseVerifier;
use crate::config::ProxyConfig;
use crate::supabase::SupabaseClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configuration and upstream clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ProxyConfig,
    supabase: SupabaseClient,
    verifier: FirebaseVerifier,
}

impl AppState {
    /// Create a new application state from configuration.
    #[must_use]
    pub fn new(config: ProxyConfig) -> Self {
        let supabase = SupabaseClient::new(&config);
        let verifier = FirebaseVerifier::new(config.firebase_api_key.clone());
        Self::with_clients(config, supabase, verifier)
    }

    /// Create a state with explicit clients (tests).
    #[must_use]
    pub fn with_clients(
        config: ProxyConfig,
        supabase: SupabaseClient,
        verifier: FirebaseVerifier,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                supabase,
                verifier,
            }),
        }
    }

    /// Get a reference to the proxy configuration.
    #[must_use]
    pub fn config(&self) -> &ProxyConfig {
        &self.inner.config
    }

    /// Get a reference to the Supabase REST client.
    #[must_use]
    pub fn supabase(&self) -> &SupabaseClient {
        &self.inner.supabase
    }

    /// Get a reference to the token verifier.
    #[must_use]
    pub fn verifier(&self) -> &FirebaseVerifier {
        &self.inner.verifier
    }
}
