//! Cart synchronization across identity transitions.
//!
//! The state machine at the heart of the storefront:
//!
//! ```text
//! Anonymous --(identity appears)--> SyncingIn --(fetch resolves)--> Authenticated
//! Authenticated --(identity disappears)--> SyncingOut --(persist/delete resolves)--> Anonymous
//! ```
//!
//! On sign-in the remote cart record is fetched; a non-empty remote cart
//! replaces the working cart outright. On sign-out the working cart is
//! persisted (or the remote record deleted when empty) and the working cart
//! is cleared.
//!
//! Remote failures never block an identity transition: the local per-user
//! snapshot is written before the remote persist is attempted, and a failed
//! call is logged and abandoned.
//!
//! Every observed transition bumps a monotonic generation counter. An async
//! resolution (fetch or persist) checks the counter before touching the
//! working cart, so a resolution that raced with a newer transition is
//! discarded instead of clobbering newer state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::instrument;

use mirabel_core::Identity;

use crate::cart::CartStore;
use crate::gateway::CartGateway;
use crate::session::provider::IdentityProvider;
use crate::session::{IdentityTransition, SessionObserver};

/// Where the synchronizer currently is in the login/logout cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPhase {
    /// No identity; the working cart is a guest cart.
    Anonymous,
    /// Login observed; the remote fetch is in flight.
    SyncingIn(Identity),
    /// Signed in; the working cart belongs to this identity.
    Authenticated(Identity),
    /// Logout observed; the remote persist/delete is in flight.
    SyncingOut(Identity),
}

/// Reconciles the working cart with the per-user remote cart record.
pub struct CartSynchronizer<G> {
    cart: Arc<CartStore>,
    gateway: Arc<G>,
    phase: Mutex<SyncPhase>,
    generation: AtomicU64,
}

impl<G: CartGateway> CartSynchronizer<G> {
    /// Create a synchronizer over the given working cart and gateway.
    #[must_use]
    pub fn new(cart: Arc<CartStore>, gateway: Arc<G>) -> Self {
        Self {
            cart,
            gateway,
            phase: Mutex::new(SyncPhase::Anonymous),
            generation: AtomicU64::new(0),
        }
    }

    /// The working cart store this synchronizer drives.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    /// The current phase of the state machine.
    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        self.lock_phase().clone()
    }

    /// React to an identity transition. Runs the corresponding remote call to
    /// completion (no cancellation); the transition itself always completes
    /// even when the call fails.
    pub async fn apply(&self, transition: IdentityTransition) {
        match transition {
            IdentityTransition::SignedIn(identity) => self.sync_in(identity).await,
            IdentityTransition::SignedOut(identity) => self.sync_out(identity).await,
        }
    }

    /// Login: fetch the identity's remote cart and reconcile.
    #[instrument(skip(self, identity), fields(user = %identity.uid))]
    async fn sync_in(&self, identity: Identity) {
        let generation = self.begin(SyncPhase::SyncingIn(identity.clone()));

        let fetched = self.gateway.fetch_cart(&identity.uid).await;

        if !self.is_current(generation) {
            tracing::debug!("discarding stale login sync result");
            return;
        }

        match fetched {
            Ok(Some(remote)) if !remote.is_empty() => {
                // The remote copy wins outright: any guest lines added before
                // login are discarded, not merged. This matches the shipped
                // behavior; changing it to a merge is a product decision.
                tracing::info!(lines = remote.len(), "restored remote cart");
                self.cart.replace(remote);
            }
            Ok(_) => {
                // No remote record (or an empty one): keep the working cart;
                // it gets pushed on the next logout or checkout.
                tracing::debug!("no remote cart; keeping working cart");
            }
            Err(error) => {
                tracing::warn!(%error, "cart restore failed; keeping local cart");
            }
        }

        self.settle(generation, SyncPhase::Authenticated(identity));
    }

    /// Logout: persist or delete the outgoing identity's cart, then clear the
    /// working cart.
    #[instrument(skip(self, identity), fields(user = %identity.uid))]
    async fn sync_out(&self, identity: Identity) {
        let generation = self.begin(SyncPhase::SyncingOut(identity.clone()));
        let working = self.cart.snapshot();

        if working.is_empty() {
            // Nothing to keep: the snapshot key is removed, not written as
            // an empty list, and the remote record is deleted.
            self.cart.remove_snapshot_for(identity.user_key());
            if let Err(error) = self.gateway.delete_cart(&identity.uid).await {
                tracing::warn!(%error, "remote cart delete failed");
            }
        } else {
            // Local snapshot first: it is the fallback of record if the
            // remote persist fails.
            self.cart.snapshot_for(identity.user_key());
            if let Err(error) = self.gateway.upsert_cart(&identity.uid, &working).await {
                tracing::warn!(%error, "remote cart persist failed");
            }
        }

        // Clear the working cart regardless of the persist outcome - but only
        // if no newer transition superseded this one while the call was in
        // flight.
        if self.settle(generation, SyncPhase::Anonymous) {
            self.cart.clear();
        } else {
            tracing::debug!("discarding stale logout sync result");
        }
    }

    /// Checkout completed: the remote record is deleted (decoupled from the
    /// login lifecycle) and the working cart is emptied.
    #[instrument(skip(self, identity), fields(user = %identity.uid))]
    pub async fn checkout_completed(&self, identity: &Identity) {
        if let Err(error) = self.gateway.delete_cart(&identity.uid).await {
            tracing::warn!(%error, "remote cart delete after checkout failed");
        }
        self.cart.clear();
    }

    /// Best-effort teardown hook for process shutdown: persist a signed-in
    /// user's working cart locally and remotely. Delivery is not guaranteed
    /// (the process may die first); the anonymous key is already durable from
    /// persist-on-mutation.
    pub async fn shutdown(&self) {
        let phase = self.phase();
        let (SyncPhase::Authenticated(identity) | SyncPhase::SyncingIn(identity)) = phase else {
            return;
        };
        let working = self.cart.snapshot();
        if working.is_empty() {
            return;
        }
        self.cart.snapshot_for(identity.user_key());
        if let Err(error) = self.gateway.upsert_cart(&identity.uid, &working).await {
            tracing::warn!(user = %identity.uid, %error, "shutdown cart persist failed");
        }
    }

    /// Record a new transition: bump the generation and enter `phase`.
    fn begin(&self, phase: SyncPhase) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.lock_phase() = phase;
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Enter `phase` if `generation` is still current. Returns whether the
    /// resolution won.
    fn settle(&self, generation: u64, phase: SyncPhase) -> bool {
        let mut guard = self.lock_phase();
        if self.generation.load(Ordering::SeqCst) == generation {
            *guard = phase;
            true
        } else {
            false
        }
    }

    fn lock_phase(&self) -> std::sync::MutexGuard<'_, SyncPhase> {
        self.phase
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Consume identity transitions from `observer` and apply each to `sync`, in
/// provider order, until the provider's event stream closes.
pub async fn drive<P, G>(observer: &SessionObserver<P>, sync: &CartSynchronizer<G>)
where
    P: IdentityProvider,
    G: CartGateway,
{
    while let Some(transition) = observer.next_transition().await {
        sync.apply(transition).await;
    }
}
