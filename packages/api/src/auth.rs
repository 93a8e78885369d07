//! Auth-state change notifications.
//!
//! Backends keep an [`AuthListeners`] table and call [`AuthListeners::emit`]
//! after every sign-in, sign-out and token refresh. Subscribers get a
//! [`Subscription`] back; dropping it or calling [`Subscription::unsubscribe`]
//! removes the listener.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::models::Session;

/// What caused a session change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Listener invoked with the event and the session after it (None when signed out).
pub type SessionCallback = Box<dyn Fn(AuthEvent, Option<Session>)>;

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    entries: Vec<(u64, Rc<dyn Fn(AuthEvent, Option<Session>)>)>,
}

/// Registry of session-change listeners, shared by a backend and the
/// subscriptions it handed out.
#[derive(Clone, Default)]
pub struct AuthListeners {
    table: Rc<RefCell<ListenerTable>>,
}

impl AuthListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: SessionCallback) -> Subscription {
        let id = {
            let mut table = self.table.borrow_mut();
            let id = table.next_id;
            table.next_id += 1;
            table.entries.push((id, Rc::from(callback)));
            id
        };
        let table: Weak<RefCell<ListenerTable>> = Rc::downgrade(&self.table);
        Subscription::new(move || {
            if let Some(table) = table.upgrade() {
                table.borrow_mut().entries.retain(|(entry, _)| *entry != id);
            }
        })
    }

    /// Notify every listener, in subscription order.
    ///
    /// The table is not borrowed while callbacks run, so a callback may
    /// subscribe or unsubscribe.
    pub fn emit(&self, event: AuthEvent, session: Option<&Session>) {
        let callbacks: Vec<_> = self
            .table
            .borrow()
            .entries
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        tracing::debug!(?event, listeners = callbacks.len(), "auth state change");
        for callback in callbacks {
            callback(event, session.cloned());
        }
    }

    pub fn len(&self) -> usize {
        self.table.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle for a registered session listener.
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Stop receiving notifications.
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionUser;
    use std::cell::Cell;

    fn session() -> Session {
        Session {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: None,
            user: SessionUser {
                id: "u1".into(),
                email: None,
            },
        }
    }

    #[test]
    fn test_emit_reaches_subscribers_until_unsubscribed() {
        let listeners = AuthListeners::new();
        let hits = Rc::new(Cell::new(0));

        let counter = hits.clone();
        let sub = listeners.subscribe(Box::new(move |event, s| {
            assert_eq!(event, AuthEvent::SignedIn);
            assert_eq!(s.unwrap().user_id(), "u1");
            counter.set(counter.get() + 1);
        }));

        listeners.emit(AuthEvent::SignedIn, Some(&session()));
        assert_eq!(hits.get(), 1);

        sub.unsubscribe();
        assert!(listeners.is_empty());
        listeners.emit(AuthEvent::SignedIn, Some(&session()));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_drop_releases_listener() {
        let listeners = AuthListeners::new();
        {
            let _sub = listeners.subscribe(Box::new(|_, _| {}));
            let _other = listeners.subscribe(Box::new(|_, _| {}));
            assert_eq!(listeners.len(), 2);
        }
        assert!(listeners.is_empty());
    }

    #[test]
    fn test_subscription_outliving_registry_is_harmless() {
        let listeners = AuthListeners::new();
        let sub = listeners.subscribe(Box::new(|_, _| {}));
        drop(listeners);
        sub.unsubscribe();
    }
}
