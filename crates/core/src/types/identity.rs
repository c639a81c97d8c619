//! Signed-in identity as reported by the identity provider.

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::UserUid;

/// The current signed-in identity: an opaque UID plus an optional email.
///
/// Absent entirely when signed out (`Option<Identity>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque UID issued by the identity provider.
    pub uid: UserUid,
    /// Verified email, when the provider reports one.
    pub email: Option<Email>,
}

impl Identity {
    /// Create an identity from a UID and optional email.
    #[must_use]
    pub fn new(uid: impl Into<UserUid>, email: Option<Email>) -> Self {
        Self {
            uid: uid.into(),
            email,
        }
    }

    /// The key used to namespace per-user durable storage: the email when
    /// present, otherwise the UID.
    #[must_use]
    pub fn user_key(&self) -> &str {
        self.email
            .as_ref()
            .map_or_else(|| self.uid.as_str(), Email::as_str)
    }
}
