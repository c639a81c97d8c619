//! Session observation: current identity, loading flag, admin capability.
//!
//! Wraps an [`IdentityProvider`]'s auth-state subscription into a single
//! current-identity value the rest of the app reads, plus an ordered stream
//! of [`IdentityTransition`]s the cart synchronizer consumes. At most one
//! identity is current at a time; transitions are delivered in provider
//! order.

pub mod provider;

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch};

use mirabel_core::{Email, Identity};

use provider::{IdentityProvider, ProviderError};

/// The observed auth state: loading until the provider's first callback,
/// then the current identity or its absence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    /// True until the first provider event arrives.
    pub loading: bool,
    /// The current identity; `None` when signed out.
    pub identity: Option<Identity>,
}

impl AuthState {
    const fn initial() -> Self {
        Self {
            loading: true,
            identity: None,
        }
    }
}

/// A login or logout observed from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityTransition {
    /// none -> present: `identity` just signed in.
    SignedIn(Identity),
    /// present -> none: `identity` just signed out.
    SignedOut(Identity),
}

/// Observes the identity provider and exposes the current session.
pub struct SessionObserver<P> {
    provider: Arc<P>,
    state: watch::Sender<AuthState>,
    events: Mutex<mpsc::UnboundedReceiver<Option<Identity>>>,
    admin_emails: Vec<Email>,
}

impl<P: IdentityProvider> SessionObserver<P> {
    /// Create an observer subscribed to `provider`, with the admin allow-list
    /// injected from configuration (an external policy input, not derived
    /// data).
    #[must_use]
    pub fn new(provider: Arc<P>, admin_emails: Vec<Email>) -> Self {
        let events = provider.subscribe();
        let (state, _) = watch::channel(AuthState::initial());
        Self {
            provider,
            state,
            events: Mutex::new(events),
            admin_emails,
        }
    }

    /// Sign in. On failure the current identity is unchanged and the error is
    /// returned for user-visible display.
    ///
    /// # Errors
    ///
    /// Propagates [`ProviderError`] from the provider.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        self.provider.sign_in(email, password).await
    }

    /// Request sign-out. The transition to "no identity" is observed
    /// asynchronously through [`Self::next_transition`], not returned here.
    ///
    /// # Errors
    ///
    /// Propagates [`ProviderError`] from the provider.
    pub async fn logout(&self) -> Result<(), ProviderError> {
        self.provider.sign_out().await
    }

    /// Watch the auth state (loading flag + current identity) for UI
    /// reactivity.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// The current identity, if signed in.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    /// True until the first provider event has been observed.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Whether the current identity's email is on the admin allow-list.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.state.borrow().identity.as_ref().is_some_and(|id| {
            id.email.as_ref().is_some_and(|email| {
                self.admin_emails
                    .iter()
                    .any(|admin| admin.eq_ignore_case(email.as_str()))
            })
        })
    }

    /// Await the next identity transition, updating the observed state as
    /// provider events arrive. Events that do not change the signed-in/out
    /// status (e.g. a repeated "signed out") update the loading flag but do
    /// not produce a transition. Returns `None` when the provider's event
    /// stream closes.
    pub async fn next_transition(&self) -> Option<IdentityTransition> {
        let mut events = self.events.lock().await;
        loop {
            let next = events.recv().await?;
            let previous = self.state.borrow().identity.clone();
            self.state.send_replace(AuthState {
                loading: false,
                identity: next.clone(),
            });

            match (previous, next) {
                (None, Some(identity)) => return Some(IdentityTransition::SignedIn(identity)),
                (Some(previous), None) => return Some(IdentityTransition::SignedOut(previous)),
                // Account switch without an intervening sign-out: surface it
                // as a sign-in for the new identity.
                (Some(previous), Some(identity)) if previous != identity => {
                    return Some(IdentityTransition::SignedIn(identity));
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    /// Minimal in-process provider driven directly by the test.
    struct ManualProvider {
        subscribers: StdMutex<Vec<mpsc::UnboundedSender<Option<Identity>>>>,
    }

    impl ManualProvider {
        fn new() -> Self {
            Self {
                subscribers: StdMutex::new(Vec::new()),
            }
        }

        fn emit(&self, identity: Option<Identity>) {
            self.subscribers
                .lock()
                .expect("subscribers lock")
                .retain(|tx| tx.send(identity.clone()).is_ok());
        }
    }

    #[async_trait]
    impl IdentityProvider for ManualProvider {
        fn subscribe(&self) -> mpsc::UnboundedReceiver<Option<Identity>> {
            let (tx, rx) = mpsc::unbounded_channel();
            let _ = tx.send(None);
            self.subscribers.lock().expect("subscribers lock").push(tx);
            rx
        }

        async fn sign_in(&self, _email: &str, _password: &str) -> Result<Identity, ProviderError> {
            Err(ProviderError::InvalidCredentials)
        }

        async fn sign_out(&self) -> Result<(), ProviderError> {
            self.emit(None);
            Ok(())
        }
    }

    fn identity(uid: &str, email: &str) -> Identity {
        Identity::new(uid, Some(Email::parse(email).expect("valid email")))
    }

    #[tokio::test]
    async fn loading_clears_on_first_event_without_transition() {
        let provider = Arc::new(ManualProvider::new());
        let observer = SessionObserver::new(Arc::clone(&provider), vec![]);
        assert!(observer.is_loading());

        // The provider's initial "signed out" event is not a transition; the
        // first transition returned is the sign-in that follows it. Loading
        // clears as soon as the initial event is consumed.
        let user = identity("u1", "user@example.com");
        provider.emit(Some(user.clone()));
        assert_eq!(
            observer.next_transition().await,
            Some(IdentityTransition::SignedIn(user))
        );
        assert!(!observer.is_loading());
    }

    #[tokio::test]
    async fn sign_in_then_out_produces_ordered_transitions() {
        let provider = Arc::new(ManualProvider::new());
        let observer = SessionObserver::new(Arc::clone(&provider), vec![]);

        let user = identity("u1", "user@example.com");
        provider.emit(Some(user.clone()));
        provider.emit(None);

        assert_eq!(
            observer.next_transition().await,
            Some(IdentityTransition::SignedIn(user.clone()))
        );
        assert_eq!(observer.identity(), Some(user.clone()));

        assert_eq!(
            observer.next_transition().await,
            Some(IdentityTransition::SignedOut(user))
        );
        assert_eq!(observer.identity(), None);
    }

    #[tokio::test]
    async fn duplicate_events_do_not_produce_transitions() {
        let provider = Arc::new(ManualProvider::new());
        let observer = SessionObserver::new(Arc::clone(&provider), vec![]);

        let user = identity("u1", "user@example.com");
        provider.emit(Some(user.clone()));
        provider.emit(Some(user.clone()));
        provider.emit(None);

        assert_eq!(
            observer.next_transition().await,
            Some(IdentityTransition::SignedIn(user.clone()))
        );
        // The duplicate Some is skipped; next transition is the sign-out.
        assert_eq!(
            observer.next_transition().await,
            Some(IdentityTransition::SignedOut(user))
        );
    }

    #[tokio::test]
    async fn account_switch_surfaces_as_sign_in() {
        let provider = Arc::new(ManualProvider::new());
        let observer = SessionObserver::new(Arc::clone(&provider), vec![]);

        let first = identity("u1", "one@example.com");
        let second = identity("u2", "two@example.com");
        provider.emit(Some(first));
        provider.emit(Some(second.clone()));

        let _ = observer.next_transition().await;
        assert_eq!(
            observer.next_transition().await,
            Some(IdentityTransition::SignedIn(second))
        );
    }

    #[tokio::test]
    async fn is_admin_checks_allow_list_case_insensitively() {
        let provider = Arc::new(ManualProvider::new());
        let admins = vec![Email::parse("owner@mirabelwine.shop").expect("valid")];
        let observer = SessionObserver::new(Arc::clone(&provider), admins);

        assert!(!observer.is_admin());

        provider.emit(Some(identity("u1", "Owner@MirabelWine.shop")));
        let _ = observer.next_transition().await;
        assert!(observer.is_admin());

        provider.emit(None);
        let _ = observer.next_transition().await;
        assert!(!observer.is_admin());
    }

    #[tokio::test]
    async fn failed_login_leaves_identity_unchanged() {
        let provider = Arc::new(ManualProvider::new());
        let observer = SessionObserver::new(Arc::clone(&provider), vec![]);

        let result = observer.login("user@example.com", "wrong").await;
        assert!(matches!(result, Err(ProviderError::InvalidCredentials)));
        assert_eq!(observer.identity(), None);
    }
}
