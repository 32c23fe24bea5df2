//! Authenticated user identity.
//!
//! Authentication itself happens elsewhere; the sync layer only needs the
//! provider-issued uid to key remote calls and local storage.

use serde::{Deserialize, Serialize};

use super::email::Email;
use crate::define_opaque_id;

define_opaque_id!(Uid);

/// A signed-in user as reported by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Provider-issued user ID.
    pub uid: Uid,
    /// User's email address.
    pub email: Email,
    /// Display name, if the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Avatar URL, if the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl User {
    /// Create a user with only the required fields.
    #[must_use]
    pub const fn new(uid: Uid, email: Email) -> Self {
        Self {
            uid,
            email,
            display_name: None,
            photo_url: None,
        }
    }
}
