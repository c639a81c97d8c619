//! Integration test harness for the Mirabel storefront core.
//!
//! The cart synchronizer and session observer take their collaborators by
//! injection, so the scenarios in `tests/` run against the in-process stubs
//! here: a manually-driven identity provider and an in-memory remote cart
//! store with failure injection and resolution gating (for staleness tests).

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc, oneshot};

use mirabel_core::{Cart, Email, Identity, UserUid};
use mirabel_storefront::gateway::{CartGateway, GatewayError};
use mirabel_storefront::session::provider::{IdentityProvider, ProviderError};

/// Build a test identity whose `user_key` is its email.
#[must_use]
pub fn identity(uid: &str, email: &str) -> Identity {
    Identity::new(uid, Some(Email::parse(email).expect("valid test email")))
}

/// An identity provider the test drives by hand.
///
/// `emit` plays the role of the provider's auth-state callback; `sign_in`
/// succeeds for accounts registered up front and announces the identity,
/// `sign_out` announces `None`.
#[derive(Default)]
pub struct StubProvider {
    subscribers: StdMutex<Vec<mpsc::UnboundedSender<Option<Identity>>>>,
    accounts: StdMutex<HashMap<String, (String, Identity)>>,
}

impl StubProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account `sign_in` will accept.
    pub fn register(&self, email: &str, password: &str, uid: &str) {
        self.accounts.lock().expect("accounts lock").insert(
            email.to_owned(),
            (password.to_owned(), identity(uid, email)),
        );
    }

    /// Announce an auth-state change to every subscriber.
    pub fn emit(&self, state: Option<Identity>) {
        self.subscribers
            .lock()
            .expect("subscribers lock")
            .retain(|tx| tx.send(state.clone()).is_ok());
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<Option<Identity>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(None);
        self.subscribers.lock().expect("subscribers lock").push(tx);
        rx
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let identity = {
            let accounts = self.accounts.lock().expect("accounts lock");
            match accounts.get(email) {
                Some((expected, identity)) if expected == password => identity.clone(),
                _ => return Err(ProviderError::InvalidCredentials),
            }
        };
        self.emit(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.emit(None);
        Ok(())
    }
}

/// In-memory remote cart store with failure injection and per-operation
/// gating.
///
/// `hold_next_*` returns a [`oneshot::Sender`]; the next matching call blocks
/// until the sender fires (or is dropped), letting tests interleave a second
/// identity transition while a remote resolution is still in flight.
#[derive(Default)]
pub struct StubGateway {
    remote: StdMutex<HashMap<String, Cart>>,
    fail_fetch: AtomicBool,
    fail_upsert: AtomicBool,
    fail_delete: AtomicBool,
    fetch_gate: Mutex<Option<oneshot::Receiver<()>>>,
    upsert_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl StubGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the remote record for `uid`.
    pub fn set_remote(&self, uid: &str, cart: Cart) {
        self.remote
            .lock()
            .expect("remote lock")
            .insert(uid.to_owned(), cart);
    }

    /// The remote record for `uid`, if any.
    #[must_use]
    pub fn remote_cart(&self, uid: &str) -> Option<Cart> {
        self.remote.lock().expect("remote lock").get(uid).cloned()
    }

    /// Make subsequent fetches fail with a transient error.
    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent upserts fail with a transient error.
    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upsert.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent deletes fail with a transient error.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Gate the next fetch until the returned sender fires.
    pub async fn hold_next_fetch(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.fetch_gate.lock().await = Some(rx);
        tx
    }

    /// Gate the next upsert until the returned sender fires.
    pub async fn hold_next_upsert(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.upsert_gate.lock().await = Some(rx);
        tx
    }
}

#[async_trait]
impl CartGateway for StubGateway {
    async fn fetch_cart(&self, user_id: &UserUid) -> Result<Option<Cart>, GatewayError> {
        if let Some(gate) = self.fetch_gate.lock().await.take() {
            let _ = gate.await;
        }
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(GatewayError::Transient("stub fetch failure".to_owned()));
        }
        Ok(self.remote_cart(user_id.as_str()))
    }

    async fn upsert_cart(&self, user_id: &UserUid, cart: &Cart) -> Result<(), GatewayError> {
        if let Some(gate) = self.upsert_gate.lock().await.take() {
            let _ = gate.await;
        }
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(GatewayError::Transient("stub upsert failure".to_owned()));
        }
        self.set_remote(user_id.as_str(), cart.clone());
        Ok(())
    }

    async fn delete_cart(&self, user_id: &UserUid) -> Result<(), GatewayError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(GatewayError::Transient("stub delete failure".to_owned()));
        }
        self.remote
            .lock()
            .expect("remote lock")
            .remove(user_id.as_str());
        Ok(())
    }
}
