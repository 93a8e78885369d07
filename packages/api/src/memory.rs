use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};

use crate::auth::{AuthEvent, AuthListeners, SessionCallback, Subscription};
use crate::backend::{Backend, SignUpOutcome, UploadOptions};
use crate::error::{AuthError, NetworkError, StorageError, StoreError};
use crate::models::{Profile, ProfileSummary, ProfileUpsert, Session, SessionUser};

const BASE_URL: &str = "https://memory.backend.test";

/// One recorded backend call, in the order it was made.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CurrentSession,
    SignIn { email: String },
    SignUp { email: String },
    SignOut,
    UpsertProfile(ProfileUpsert),
    SelectProfile(String),
    ListProfiles,
    Upload {
        bucket: String,
        path: String,
        content_type: String,
        overwrite: bool,
    },
    PublicUrl { bucket: String, path: String },
    SignedUrl { bucket: String, path: String, ttl_secs: u64 },
    Probe(String),
}

impl BackendCall {
    /// Calls that would leave the browser against the hosted backend.
    pub fn is_network(&self) -> bool {
        !matches!(self, BackendCall::PublicUrl { .. })
    }
}

#[derive(Debug, Clone)]
struct Account {
    id: String,
    password: String,
}

#[derive(Debug, Clone, Default)]
struct Row {
    email: Option<String>,
    profile: Profile,
}

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

#[derive(Debug, Default)]
struct Failures {
    upsert: Option<String>,
    select: Option<String>,
    list: Option<String>,
    upload: Option<String>,
    signed_url: Option<String>,
    sign_out: Option<String>,
}

#[derive(Default)]
struct State {
    accounts: BTreeMap<String, Account>,
    session: Option<Session>,
    rows: BTreeMap<String, Row>,
    objects: BTreeMap<(String, String), StoredObject>,
    probes: HashMap<String, Result<u16, String>>,
    failures: Failures,
    require_confirmation: bool,
    calls: Vec<BackendCall>,
    issued_tokens: u64,
    upsert_hold: Option<Shared<oneshot::Receiver<()>>>,
}

/// In-process [`Backend`] for tests and for running the app without a project.
///
/// Accounts, profile rows and storage objects live in memory. Every call is
/// recorded and can be inspected with [`MemoryBackend::calls`]; failures and
/// probe answers can be scripted per operation.
#[derive(Default)]
pub struct MemoryBackend {
    state: RefCell<State>,
    listeners: AuthListeners,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account without signing in. Returns its user id.
    pub fn with_account(&self, email: &str, password: &str) -> String {
        let mut state = self.state.borrow_mut();
        let id = format!("user-{}", state.accounts.len() + 1);
        state.accounts.insert(
            email.to_string(),
            Account {
                id: id.clone(),
                password: password.to_string(),
            },
        );
        id
    }

    /// Sign-ups answer with [`SignUpOutcome::ConfirmationSent`] instead of a session.
    pub fn require_confirmation(&self, required: bool) {
        self.state.borrow_mut().require_confirmation = required;
    }

    pub fn insert_profile(&self, id: &str, email: Option<&str>, profile: Profile) {
        self.state.borrow_mut().rows.insert(
            id.to_string(),
            Row {
                email: email.map(str::to_string),
                profile,
            },
        );
    }

    pub fn profile(&self, id: &str) -> Option<Profile> {
        self.state.borrow().rows.get(id).map(|row| row.profile.clone())
    }

    pub fn put_object(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) {
        self.state.borrow_mut().objects.insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
    }

    /// Bytes and content type of a stored object.
    pub fn object(&self, bucket: &str, path: &str) -> Option<(Vec<u8>, String)> {
        self.state
            .borrow()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|o| (o.bytes.clone(), o.content_type.clone()))
    }

    /// Answer probes of `url` (query string ignored) with `status`.
    pub fn set_probe_status(&self, url: &str, status: u16) {
        self.state
            .borrow_mut()
            .probes
            .insert(strip_query(url).to_string(), Ok(status));
    }

    /// Make probes of `url` fail at the transport level.
    pub fn fail_probe(&self, url: &str, message: &str) {
        self.state
            .borrow_mut()
            .probes
            .insert(strip_query(url).to_string(), Err(message.to_string()));
    }

    pub fn fail_upserts(&self, message: &str) {
        self.state.borrow_mut().failures.upsert = Some(message.to_string());
    }

    /// Stall every profile upsert after it is recorded until the returned
    /// sender fires or is dropped.
    pub fn hold_upserts(&self) -> oneshot::Sender<()> {
        let (release, hold) = oneshot::channel();
        self.state.borrow_mut().upsert_hold = Some(hold.shared());
        release
    }

    pub fn fail_selects(&self, message: &str) {
        self.state.borrow_mut().failures.select = Some(message.to_string());
    }

    pub fn fail_lists(&self, message: &str) {
        self.state.borrow_mut().failures.list = Some(message.to_string());
    }

    pub fn fail_uploads(&self, message: &str) {
        self.state.borrow_mut().failures.upload = Some(message.to_string());
    }

    pub fn fail_signed_urls(&self, message: &str) {
        self.state.borrow_mut().failures.signed_url = Some(message.to_string());
    }

    pub fn fail_sign_out(&self, message: &str) {
        self.state.borrow_mut().failures.sign_out = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Recorded profile upserts, in order.
    pub fn upserts(&self) -> Vec<ProfileUpsert> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::UpsertProfile(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn record(&self, call: BackendCall) {
        self.state.borrow_mut().calls.push(call);
    }

    fn start_session(&self, id: &str, email: &str) -> Session {
        let session = {
            let mut state = self.state.borrow_mut();
            state.issued_tokens += 1;
            let session = Session {
                access_token: format!("memory-token-{}", state.issued_tokens),
                refresh_token: None,
                expires_at: None,
                user: SessionUser {
                    id: id.to_string(),
                    email: Some(email.to_string()),
                },
            };
            state.session = Some(session.clone());
            session
        };
        self.listeners.emit(AuthEvent::SignedIn, Some(&session));
        session
    }

    fn public_prefix(bucket: &str) -> String {
        format!("{BASE_URL}/storage/v1/object/public/{bucket}/")
    }
}

fn strip_query(url: &str) -> &str {
    url.split_once('?').map(|(base, _)| base).unwrap_or(url)
}

#[async_trait(?Send)]
impl Backend for MemoryBackend {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        self.record(BackendCall::CurrentSession);
        Ok(self.state.borrow().session.clone())
    }

    fn on_session_change(&self, callback: SessionCallback) -> Subscription {
        self.listeners.subscribe(callback)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.record(BackendCall::SignIn {
            email: email.to_string(),
        });
        let account = self.state.borrow().accounts.get(email).cloned();
        match account {
            Some(account) if account.password == password => Ok(self.start_session(&account.id, email)),
            _ => Err(AuthError::Rejected {
                status: 400,
                message: "Invalid login credentials".to_string(),
            }),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        self.record(BackendCall::SignUp {
            email: email.to_string(),
        });
        if self.state.borrow().accounts.contains_key(email) {
            return Err(AuthError::Rejected {
                status: 422,
                message: "User already registered".to_string(),
            });
        }
        let id = self.with_account(email, password);
        if self.state.borrow().require_confirmation {
            return Ok(SignUpOutcome::ConfirmationSent(SessionUser {
                id,
                email: Some(email.to_string()),
            }));
        }
        Ok(SignUpOutcome::SignedIn(self.start_session(&id, email)))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.record(BackendCall::SignOut);
        if let Some(message) = self.state.borrow().failures.sign_out.clone() {
            return Err(AuthError::Rejected { status: 500, message });
        }
        self.state.borrow_mut().session = None;
        self.listeners.emit(AuthEvent::SignedOut, None);
        Ok(())
    }

    async fn upsert_profile(&self, record: &ProfileUpsert) -> Result<(), StoreError> {
        self.record(BackendCall::UpsertProfile(record.clone()));
        let hold = self.state.borrow().upsert_hold.clone();
        if let Some(hold) = hold {
            let _ = hold.await;
        }
        let mut state = self.state.borrow_mut();
        if let Some(message) = state.failures.upsert.clone() {
            return Err(StoreError::Rejected { status: 400, message });
        }
        let row = state.rows.entry(record.id.clone()).or_default();
        if let Some(email) = &record.email {
            row.email = email.clone();
        }
        record.apply_to(&mut row.profile);
        Ok(())
    }

    async fn select_profile(&self, id: &str) -> Result<Profile, StoreError> {
        self.record(BackendCall::SelectProfile(id.to_string()));
        let state = self.state.borrow();
        if let Some(message) = state.failures.select.clone() {
            return Err(StoreError::Rejected { status: 500, message });
        }
        state
            .rows
            .get(id)
            .map(|row| row.profile.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn list_profiles(&self) -> Result<Vec<ProfileSummary>, StoreError> {
        self.record(BackendCall::ListProfiles);
        let state = self.state.borrow();
        if let Some(message) = state.failures.list.clone() {
            return Err(StoreError::Rejected { status: 500, message });
        }
        Ok(state
            .rows
            .iter()
            .map(|(id, row)| ProfileSummary {
                id: id.clone(),
                email: row.email.clone(),
            })
            .collect())
    }

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<(), StorageError> {
        self.record(BackendCall::Upload {
            bucket: bucket.to_string(),
            path: path.to_string(),
            content_type: options.content_type.clone(),
            overwrite: options.overwrite,
        });
        let mut state = self.state.borrow_mut();
        if let Some(message) = state.failures.upload.clone() {
            return Err(StorageError::Rejected { status: 400, message });
        }
        let key = (bucket.to_string(), path.to_string());
        if state.objects.contains_key(&key) && !options.overwrite {
            return Err(StorageError::Rejected {
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }
        state.objects.insert(
            key,
            StoredObject {
                bytes,
                content_type: options.content_type.clone(),
            },
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.record(BackendCall::PublicUrl {
            bucket: bucket.to_string(),
            path: path.to_string(),
        });
        format!("{}{}", Self::public_prefix(bucket), path.trim_start_matches('/'))
    }

    async fn create_signed_url(&self, bucket: &str, path: &str, ttl_secs: u64) -> Result<String, StorageError> {
        self.record(BackendCall::SignedUrl {
            bucket: bucket.to_string(),
            path: path.to_string(),
            ttl_secs,
        });
        let state = self.state.borrow();
        if let Some(message) = state.failures.signed_url.clone() {
            return Err(StorageError::Rejected { status: 400, message });
        }
        if !state.objects.contains_key(&(bucket.to_string(), path.to_string())) {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(format!(
            "{BASE_URL}/storage/v1/object/sign/{bucket}/{path}?token=memory-{ttl_secs}"
        ))
    }

    async fn probe(&self, url: &str) -> Result<u16, NetworkError> {
        self.record(BackendCall::Probe(url.to_string()));
        let state = self.state.borrow();
        let base = strip_query(url);
        if let Some(scripted) = state.probes.get(base) {
            return scripted.clone().map_err(NetworkError::Unreachable);
        }
        let exists = state.objects.keys().any(|(bucket, path)| {
            base.strip_prefix(&Self::public_prefix(bucket)) == Some(path.as_str())
        });
        Ok(if exists { 200 } else { 404 })
    }
}
