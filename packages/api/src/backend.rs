//! The backend client contract.

use async_trait::async_trait;

use crate::auth::{SessionCallback, Subscription};
use crate::error::{AuthError, NetworkError, StorageError, StoreError};
use crate::models::{Profile, ProfileSummary, ProfileUpsert, Session, SessionUser};

/// Options for [`Backend::upload_object`].
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOptions {
    pub content_type: String,
    /// Replace an existing object at the same path.
    pub overwrite: bool,
    /// `Cache-Control` max-age in seconds.
    pub cache_control: u32,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            content_type: "application/octet-stream".to_string(),
            overwrite: false,
            cache_control: 3600,
        }
    }
}

/// Result of a sign-up.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// The account is usable right away and a session was started.
    SignedIn(Session),
    /// The account must be confirmed by email before signing in.
    ConfirmationSent(SessionUser),
}

/// Everything the portal needs from the hosted backend.
///
/// Futures are not `Send`: in the browser the whole client runs on one thread.
#[async_trait(?Send)]
pub trait Backend {
    /// The current session, if any.
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;

    /// Register a listener for future session changes.
    fn on_session_change(&self, callback: SessionCallback) -> Subscription;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    async fn upsert_profile(&self, record: &ProfileUpsert) -> Result<(), StoreError>;

    /// Fails with [`StoreError::NotFound`] when the user has no row.
    async fn select_profile(&self, id: &str) -> Result<Profile, StoreError>;

    async fn list_profiles(&self) -> Result<Vec<ProfileSummary>, StoreError>;

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<(), StorageError>;

    /// Stable unauthenticated URL of an object. Does not check that it exists.
    fn public_url(&self, bucket: &str, path: &str) -> String;

    async fn create_signed_url(&self, bucket: &str, path: &str, ttl_secs: u64) -> Result<String, StorageError>;

    /// Fetch `url` bypassing caches and report the HTTP status.
    async fn probe(&self, url: &str) -> Result<u16, NetworkError>;
}
