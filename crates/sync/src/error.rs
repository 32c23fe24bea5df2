//! Unified error handling with Sentry integration.
//!
//! Cart mutations never return these errors; they degrade to the local
//! fallback and record what happened through [`report_fallback`]. Errors
//! surface only from explicit, user-initiated operations such as wishlist
//! management.

use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;
use shopsync_core::WishlistNameError;

/// Error type for the sync layer's fallible operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Backend call failed.
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input rejected before reaching the backend.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation needs a signed-in user.
    #[error("Not authenticated")]
    NotAuthenticated,
}

impl From<WishlistNameError> for SyncError {
    fn from(err: WishlistNameError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type alias for `SyncError`.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Record a backend failure that was absorbed by the local fallback.
///
/// Transient failures become breadcrumbs; anything else is captured as a
/// Sentry event since retrying will not fix it.
pub fn report_fallback(operation: &str, error: &ApiError) {
    tracing::warn!(
        operation,
        error = %error,
        transient = error.is_transient(),
        "Remote cart persistence failed, applied locally"
    );

    if error.is_transient() {
        let detail = error.to_string();
        add_breadcrumb(
            "cart",
            &format!("{operation} fell back to local state"),
            &[("error", detail.as_str())],
        );
    } else {
        sentry::capture_error(error);
    }
}

/// Set the Sentry user context from a user ID.
///
/// Call this after the sync layer observes a login.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::Validation("quantity must be at least 1".to_string());
        assert_eq!(err.to_string(), "Validation error: quantity must be at least 1");

        let err = SyncError::from(ApiError::NotFound("/wishlist/9".to_string()));
        assert_eq!(err.to_string(), "Backend error: Not found: /wishlist/9");
    }

    #[test]
    fn test_wishlist_name_error_is_validation() {
        let err = SyncError::from(WishlistNameError::Empty);
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[test]
    fn test_report_fallback_without_sentry_client() {
        // No Sentry client is bound in tests; reporting must be a no-op.
        report_fallback(
            "add_item",
            &ApiError::HttpStatus {
                status: 503,
                message: String::new(),
            },
        );
        report_fallback("add_item", &ApiError::Validation("bad".to_string()));
    }
}
