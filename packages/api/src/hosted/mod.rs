//! # Hosted backend over HTTP
//!
//! [`HostedBackend`] implements [`Backend`] against the hosted project's REST
//! surface with a single `reqwest::Client`:
//!
//! | Concern | Endpoint |
//! |---------|----------|
//! | Password sign-in / refresh | `POST /auth/v1/token?grant_type=password\|refresh_token` |
//! | Sign-up | `POST /auth/v1/signup` |
//! | Sign-out | `POST /auth/v1/logout` |
//! | Profile upsert | `POST /rest/v1/<table>` with `Prefer: resolution=merge-duplicates` |
//! | Profile select / list | `GET /rest/v1/<table>?select=...` |
//! | Upload | `POST /storage/v1/object/<bucket>/<path>` |
//! | Signed URL | `POST /storage/v1/object/sign/<bucket>/<path>` |
//! | Public URL | `/storage/v1/object/public/<bucket>/<path>` (built locally) |
//!
//! Every request carries the `apikey` header. Table and storage calls are
//! authorized with the session's access token, or the anon key when signed out.
//! The session itself lives in a `RefCell`, is persisted through
//! [`persist::SessionPersistence`], and every change is broadcast to the
//! [`AuthListeners`].

mod persist;

use std::cell::RefCell;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::auth::{AuthEvent, AuthListeners, SessionCallback, Subscription};
use crate::backend::{Backend, SignUpOutcome, UploadOptions};
use crate::config::BackendConfig;
use crate::error::{error_message, AuthError, NetworkError, StorageError, StoreError};
use crate::models::{Profile, ProfileSummary, ProfileUpsert, Session, SessionUser};

use persist::SessionPersistence;

const PROFILE_COLUMNS: &str = "username,full_name,bio,avatar_url,updated_at";
const SUMMARY_COLUMNS: &str = "id,email";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: SessionUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| Utc::now().timestamp() + secs));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Sign-up answers with a full token response when accounts are auto-confirmed,
/// and with the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(SessionUser),
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

/// [`Backend`] implementation for the hosted project.
pub struct HostedBackend {
    http: reqwest::Client,
    config: BackendConfig,
    session: RefCell<Option<Session>>,
    listeners: AuthListeners,
    persisted: SessionPersistence,
}

impl HostedBackend {
    pub fn new(config: BackendConfig) -> Self {
        let persisted = SessionPersistence::for_project(&config.url);
        let session = persisted.load();
        if let Some(s) = &session {
            tracing::debug!(user_id = %s.user_id(), "restored stored session");
        }
        Self {
            http: reqwest::Client::new(),
            config,
            session: RefCell::new(session),
            listeners: AuthListeners::new(),
            persisted,
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.url, path)
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.config.url, self.config.profiles_table)
    }

    fn object_url(&self, kind: &str, bucket: &str, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if kind.is_empty() {
            format!("{}/storage/v1/object/{}/{}", self.config.url, bucket, path)
        } else {
            format!("{}/storage/v1/object/{}/{}/{}", self.config.url, kind, bucket, path)
        }
    }

    /// Token for table and storage calls: the session's access token, refreshed
    /// first when it has expired, or the anon key when signed out.
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self
            .current_session()
            .await?
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.config.anon_key.clone()))
    }

    fn replace_session(&self, session: Option<Session>, event: AuthEvent) {
        *self.session.borrow_mut() = session.clone();
        self.persisted.save(session.as_ref());
        self.listeners.emit(event, session.as_ref());
    }

    async fn token_grant(&self, grant_type: &str, body: serde_json::Value) -> Result<Session, AuthError> {
        let response = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.config.anon_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, message) = rejection(response).await;
            return Err(AuthError::Rejected { status, message });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        Ok(token.into_session())
    }
}

async fn rejection(response: reqwest::Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    (status, error_message(&body))
}

#[async_trait(?Send)]
impl Backend for HostedBackend {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let held = self.session.borrow().clone();
        let Some(session) = held else {
            return Ok(None);
        };
        if !session.is_expired_at(Utc::now()) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.clone() else {
            tracing::info!(user_id = %session.user_id(), "stored session expired");
            self.replace_session(None, AuthEvent::SignedOut);
            return Ok(None);
        };

        match self
            .token_grant("refresh_token", serde_json::json!({ "refresh_token": refresh_token }))
            .await
        {
            Ok(refreshed) => {
                tracing::debug!(user_id = %refreshed.user_id(), "session refreshed");
                self.replace_session(Some(refreshed.clone()), AuthEvent::TokenRefreshed);
                Ok(Some(refreshed))
            }
            Err(e) => {
                tracing::warn!("Session refresh failed: {}", e);
                self.replace_session(None, AuthEvent::SignedOut);
                Err(e)
            }
        }
    }

    fn on_session_change(&self, callback: SessionCallback) -> Subscription {
        self.listeners.subscribe(callback)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self
            .token_grant(
                "password",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;
        tracing::info!(user_id = %session.user_id(), "signed in");
        self.replace_session(Some(session.clone()), AuthEvent::SignedIn);
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let response = self
            .http
            .post(self.auth_url("signup"))
            .header("apikey", &self.config.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, message) = rejection(response).await;
            return Err(AuthError::Rejected { status, message });
        }

        let body: SignUpResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        match body {
            SignUpResponse::Session(token) => {
                let session = token.into_session();
                self.replace_session(Some(session.clone()), AuthEvent::SignedIn);
                Ok(SignUpOutcome::SignedIn(session))
            }
            SignUpResponse::User(user) => Ok(SignUpOutcome::ConfirmationSent(user)),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let token = self.session.borrow().as_ref().map(|s| s.access_token.clone());
        let Some(token) = token else {
            self.replace_session(None, AuthEvent::SignedOut);
            return Ok(());
        };

        let response = self
            .http
            .post(self.auth_url("logout"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        // A token the server no longer knows is as good as signed out.
        if status.is_success() || matches!(status.as_u16(), 401 | 403 | 404) {
            tracing::info!("signed out");
            self.replace_session(None, AuthEvent::SignedOut);
            return Ok(());
        }

        let (status, message) = rejection(response).await;
        Err(AuthError::Rejected { status, message })
    }

    async fn upsert_profile(&self, record: &ProfileUpsert) -> Result<(), StoreError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(self.table_url())
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[record])
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, message) = rejection(response).await;
            return Err(StoreError::Rejected { status, message });
        }
        tracing::debug!(id = %record.id, "profile upserted");
        Ok(())
    }

    async fn select_profile(&self, id: &str) -> Result<Profile, StoreError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(self.table_url())
            .query(&[("select", PROFILE_COLUMNS.to_string()), ("id", format!("eq.{id}"))])
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, message) = rejection(response).await;
            return Err(StoreError::Rejected { status, message });
        }

        let rows: Vec<Profile> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        rows.into_iter().next().ok_or(StoreError::NotFound)
    }

    async fn list_profiles(&self) -> Result<Vec<ProfileSummary>, StoreError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(self.table_url())
            .query(&[("select", SUMMARY_COLUMNS)])
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, message) = rejection(response).await;
            return Err(StoreError::Rejected { status, message });
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<(), StorageError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(self.object_url("", bucket, path))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
            .header("Content-Type", &options.content_type)
            .header("Cache-Control", format!("max-age={}", options.cache_control))
            .header("x-upsert", options.overwrite.to_string())
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, message) = rejection(response).await;
            return Err(StorageError::Rejected { status, message });
        }
        tracing::debug!(bucket, path, "object uploaded");
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.object_url("public", bucket, path)
    }

    async fn create_signed_url(&self, bucket: &str, path: &str, ttl_secs: u64) -> Result<String, StorageError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(self.object_url("sign", bucket, path))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
            .json(&serde_json::json!({ "expiresIn": ttl_secs }))
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 404 {
            return Err(StorageError::NotFound(path.to_string()));
        }
        if !response.status().is_success() {
            let (status, message) = rejection(response).await;
            return Err(StorageError::Rejected { status, message });
        }

        let body: SignedUrlResponse = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;
        Ok(format!("{}/storage/v1{}", self.config.url, body.signed_url))
    }

    async fn probe(&self, url: &str) -> Result<u16, NetworkError> {
        let response = self
            .http
            .get(url)
            .header("Cache-Control", "no-store")
            .header("Pragma", "no-cache")
            .send()
            .await?;
        Ok(response.status().as_u16())
    }
}
