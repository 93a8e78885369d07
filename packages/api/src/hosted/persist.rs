//! Session persistence across page reloads.
//!
//! In the browser the session is stored as JSON in `localStorage`, keyed by the
//! project URL. Native builds keep sessions in memory only.

use crate::models::Session;

pub(crate) struct SessionPersistence {
    key: String,
}

impl SessionPersistence {
    pub(crate) fn for_project(url: &str) -> Self {
        Self {
            key: format!("portal-session:{url}"),
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub(crate) fn load(&self) -> Option<Session> {
        let storage = web_sys::window()?.local_storage().ok()??;
        let raw = storage.get_item(&self.key).ok()??;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("Discarding unreadable stored session: {}", e);
                let _ = storage.remove_item(&self.key);
                None
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub(crate) fn save(&self, session: Option<&Session>) {
        let Some(storage) = web_sys::window().and_then(|w| w.local_storage().ok().flatten()) else {
            return;
        };
        let result = match session {
            Some(session) => match serde_json::to_string(session) {
                Ok(raw) => storage.set_item(&self.key, &raw),
                Err(e) => {
                    tracing::warn!("Failed to encode session: {}", e);
                    return;
                }
            },
            None => storage.remove_item(&self.key),
        };
        if result.is_err() {
            tracing::warn!("Failed to write session to local storage");
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub(crate) fn load(&self) -> Option<Session> {
        tracing::trace!(key = %self.key, "no session persistence on this platform");
        None
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub(crate) fn save(&self, _session: Option<&Session>) {}
}
