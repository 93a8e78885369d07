//! # Session gate
//!
//! Turns the backend's session notifications into the tri-state
//! [`SessionState`] the application shell switches on.
//!
//! ## Pieces
//!
//! | Item | Role |
//! |------|------|
//! | [`SessionState`] | `Loading` until the first answer, then `Anonymous` or `Authenticated`. |
//! | [`SessionGate`] | Pure state machine: holds the last session and decides, per notification, what to publish and whether a profile stub must be written. |
//! | [`SessionGateTask`] | Reads the current session once, subscribes to changes, and feeds both through the gate in arrival order. |
//!
//! The profile stub (`id`, `email`, `updated_at`) is written whenever the held
//! session changes to a present one, so every user who ever signed in has a row.
//! The write runs alongside the gate: states are published as notifications
//! arrive, even while a stub is still in flight. Failures of that write are
//! logged and never block sign-in.

use std::rc::Rc;

use api::{AuthError, Backend, ProfileUpsert, Session, SessionUser, Subscription};
use chrono::{DateTime, Utc};
use futures::channel::mpsc::{self, UnboundedReceiver};
use futures::future::{self, Either, LocalBoxFuture};
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};

use crate::shell::Page;

/// Authentication state as seen by the shell.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    /// No answer from the backend yet.
    #[default]
    Loading,
    Anonymous,
    Authenticated(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }
}

impl From<Option<Session>> for SessionState {
    fn from(session: Option<Session>) -> Self {
        match session {
            Some(session) => SessionState::Authenticated(session),
            None => SessionState::Anonymous,
        }
    }
}

/// Outcome of feeding one notification through the gate.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Never `Loading`.
    pub published: SessionState,
    pub profile_stub: Option<ProfileUpsert>,
}

#[derive(Debug, Default)]
pub struct SessionGate {
    held: SessionState,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn held(&self) -> &SessionState {
        &self.held
    }

    /// Replace the held session with `next`.
    pub fn apply(&mut self, next: Option<Session>, now: DateTime<Utc>) -> Transition {
        let next = SessionState::from(next);
        let profile_stub = match &next {
            SessionState::Authenticated(session) if self.held != next => {
                Some(ProfileUpsert::stub(&session.user, now))
            }
            _ => None,
        };
        self.held = next.clone();
        Transition {
            published: next,
            profile_stub,
        }
    }
}

/// Write the profile stub, logging failures.
pub async fn ensure_profile_row(backend: &dyn Backend, stub: &ProfileUpsert) {
    match backend.upsert_profile(stub).await {
        Ok(()) => tracing::debug!(user_id = %stub.id, "profile row ensured"),
        Err(e) => tracing::error!("Failed to create profile for {}: {}", stub.id, e),
    }
}

/// The gate bound to a backend subscription.
///
/// Dropping the task releases the subscription.
pub struct SessionGateTask {
    backend: Rc<dyn Backend>,
    gate: SessionGate,
    changes: UnboundedReceiver<Option<Session>>,
    subscription: Subscription,
    pending: FuturesUnordered<LocalBoxFuture<'static, ()>>,
}

impl SessionGateTask {
    /// Fetch the current session once, then subscribe to future changes.
    pub async fn start(backend: Rc<dyn Backend>) -> Self {
        let initial = match backend.current_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Failed to read current session: {}", e);
                None
            }
        };

        let (tx, changes) = mpsc::unbounded();
        let _ = tx.unbounded_send(initial);
        let subscription = backend.on_session_change(Box::new(move |event, session| {
            tracing::debug!(?event, "session change received");
            let _ = tx.unbounded_send(session);
        }));

        Self {
            backend,
            gate: SessionGate::new(),
            changes,
            subscription,
            pending: FuturesUnordered::new(),
        }
    }

    pub fn held(&self) -> &SessionState {
        self.gate.held()
    }

    /// Wait for the next notification and return the state to publish.
    /// Profile stubs in flight make progress while waiting but are never
    /// waited for. Returns `None` once the subscription is gone.
    pub async fn next(&mut self) -> Option<SessionState> {
        loop {
            if self.pending.is_empty() {
                let next = self.changes.next().await?;
                return Some(self.accept(next));
            }

            let changed = match future::select(self.pending.next(), self.changes.next()).await {
                Either::Left(_) => None,
                Either::Right((next, _)) => Some(next),
            };
            match changed {
                None => continue,
                Some(Some(next)) => return Some(self.accept(next)),
                Some(None) => {
                    self.flush().await;
                    return None;
                }
            }
        }
    }

    /// Wait for every profile stub in flight to settle.
    pub async fn flush(&mut self) {
        while self.pending.next().await.is_some() {}
    }

    fn accept(&mut self, next: Option<Session>) -> SessionState {
        let transition = self.gate.apply(next, Utc::now());
        if let Some(stub) = transition.profile_stub {
            let backend = self.backend.clone();
            self.pending
                .push(async move { ensure_profile_row(backend.as_ref(), &stub).await }.boxed_local());
        }
        transition.published
    }

    /// Publish every state until the subscription ends.
    pub async fn run(mut self, mut publish: impl FnMut(SessionState)) {
        while let Some(state) = self.next().await {
            publish(state);
        }
    }

    /// Unsubscribe from the backend.
    pub fn stop(self) {
        self.subscription.unsubscribe();
    }
}

/// Sign out and report where to go next.
pub async fn sign_out(backend: &dyn Backend) -> Result<Page, AuthError> {
    match backend.sign_out().await {
        Ok(()) => Ok(Page::Login),
        Err(e) => {
            tracing::error!("Sign-out failed: {}", e);
            Err(e)
        }
    }
}

/// The signed-in user according to the backend, if any.
pub async fn current_user(backend: &dyn Backend) -> Option<SessionUser> {
    match backend.current_session().await {
        Ok(Some(session)) => Some(session.user),
        Ok(None) => {
            tracing::warn!("No session found");
            None
        }
        Err(e) => {
            tracing::error!("Failed to read session: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api::{BackendCall, MemoryBackend};

    fn session(id: &str, token: &str) -> Session {
        Session {
            access_token: token.into(),
            refresh_token: None,
            expires_at: None,
            user: SessionUser {
                id: id.into(),
                email: Some(format!("{id}@example.com")),
            },
        }
    }

    #[test]
    fn test_gate_upserts_once_per_transition_to_present() {
        let mut gate = SessionGate::new();
        let now = Utc::now();
        assert!(gate.held().is_loading());

        let t = gate.apply(None, now);
        assert_eq!(t.published, SessionState::Anonymous);
        assert!(t.profile_stub.is_none());

        let t = gate.apply(Some(session("u1", "a")), now);
        assert_eq!(t.published, SessionState::Authenticated(session("u1", "a")));
        let stub = t.profile_stub.unwrap();
        assert_eq!(stub.id, "u1");
        assert_eq!(stub.email, Some(Some("u1@example.com".to_string())));
        assert_eq!(stub.updated_at, now);

        // Same session again: published, but no second stub.
        let t = gate.apply(Some(session("u1", "a")), now);
        assert!(t.profile_stub.is_none());

        let t = gate.apply(None, now);
        assert_eq!(t.published, SessionState::Anonymous);
        assert!(t.profile_stub.is_none());

        let t = gate.apply(Some(session("u2", "b")), now);
        assert_eq!(t.profile_stub.unwrap().id, "u2");
    }

    #[test]
    fn test_gate_never_publishes_loading() {
        let mut gate = SessionGate::new();
        for next in [None, Some(session("u1", "a")), None] {
            assert!(!gate.apply(next, Utc::now()).published.is_loading());
        }
    }

    #[tokio::test]
    async fn test_task_reads_initial_session_then_follows_changes() {
        let backend = Rc::new(MemoryBackend::new());
        backend.with_account("neo@example.com", "secret");

        let mut task = SessionGateTask::start(backend.clone()).await;
        assert_eq!(backend.listener_count(), 1);
        assert_eq!(task.next().await, Some(SessionState::Anonymous));
        assert!(backend.upserts().is_empty());

        let signed_in = backend.sign_in_with_password("neo@example.com", "secret").await.unwrap();
        assert_eq!(
            task.next().await,
            Some(SessionState::Authenticated(signed_in.clone()))
        );
        task.flush().await;
        let upserts = backend.upserts();
        assert_eq!(upserts.len(), 1);
        assert_eq!(upserts[0].id, signed_in.user_id());

        task.stop();
        assert_eq!(backend.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_stub_failure_does_not_block_sign_in() {
        let backend = Rc::new(MemoryBackend::new());
        backend.with_account("neo@example.com", "secret");
        backend.fail_upserts("permission denied");

        let mut task = SessionGateTask::start(backend.clone()).await;
        task.next().await;
        backend.sign_in_with_password("neo@example.com", "secret").await.unwrap();

        let state = task.next().await.unwrap();
        assert!(state.session().is_some());
        task.flush().await;
        assert_eq!(backend.upserts().len(), 1);
    }

    #[tokio::test]
    async fn test_stalled_stub_does_not_delay_publishing() {
        let backend = Rc::new(MemoryBackend::new());
        let id = backend.with_account("neo@example.com", "secret");
        let release = backend.hold_upserts();

        let mut task = SessionGateTask::start(backend.clone()).await;
        assert_eq!(task.next().await, Some(SessionState::Anonymous));

        backend.sign_in_with_password("neo@example.com", "secret").await.unwrap();
        assert!(task.next().await.unwrap().session().is_some());

        backend.sign_out().await.unwrap();
        assert_eq!(task.next().await, Some(SessionState::Anonymous));
        assert_eq!(backend.upserts().len(), 1);
        assert!(backend.profile(&id).is_none());

        release.send(()).unwrap();
        task.flush().await;
        assert!(backend.profile(&id).is_some());
    }

    #[tokio::test]
    async fn test_dropping_task_releases_subscription() {
        let backend = Rc::new(MemoryBackend::new());
        let task = SessionGateTask::start(backend.clone()).await;
        drop(task);
        assert_eq!(backend.listener_count(), 0);
        assert!(backend
            .calls()
            .iter()
            .all(|call| matches!(call, BackendCall::CurrentSession)));
    }

    #[tokio::test]
    async fn test_sign_out_failure_is_reported() {
        let backend = MemoryBackend::new();
        backend.fail_sign_out("network down");
        assert!(sign_out(&backend).await.is_err());

        let ok = MemoryBackend::new();
        assert_eq!(sign_out(&ok).await.unwrap(), Page::Login);
    }
}
