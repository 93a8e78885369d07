//! Shared backend constructor and context access.
//!
//! Returns a [`BackendHandle`] wrapping the appropriate [`api::Backend`]:
//! - **Configured** (`BACKEND_URL` + `BACKEND_ANON_KEY`): [`api::HostedBackend`]
//! - **Unconfigured**: [`api::MemoryBackend`], so the app still runs locally

use std::ops::Deref;
use std::rc::Rc;

use api::{Backend, BackendConfig, HostedBackend, MemoryBackend, AVATAR_BUCKET};
use dioxus::prelude::*;

/// Cheaply cloneable backend plus the bucket avatars live in.
#[derive(Clone)]
pub struct BackendHandle {
    backend: Rc<dyn Backend>,
    avatar_bucket: Rc<str>,
}

impl BackendHandle {
    pub fn new(backend: Rc<dyn Backend>, avatar_bucket: &str) -> Self {
        Self {
            backend,
            avatar_bucket: avatar_bucket.into(),
        }
    }

    pub fn avatar_bucket(&self) -> &str {
        &self.avatar_bucket
    }

    /// The shared backend, for tasks that outlive a borrow.
    pub fn shared(&self) -> Rc<dyn Backend> {
        self.backend.clone()
    }
}

impl PartialEq for BackendHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.backend, &other.backend) && self.avatar_bucket == other.avatar_bucket
    }
}

impl Deref for BackendHandle {
    type Target = dyn Backend;

    fn deref(&self) -> &Self::Target {
        self.backend.as_ref()
    }
}

/// Create the backend for this build from the environment.
pub fn make_backend() -> BackendHandle {
    match BackendConfig::from_env() {
        Ok(config) => {
            tracing::info!(url = %config.url, "using hosted backend");
            let bucket = config.avatar_bucket.clone();
            BackendHandle::new(Rc::new(HostedBackend::new(config)), &bucket)
        }
        Err(e) => {
            tracing::warn!("Backend not configured ({}), using in-memory backend", e);
            BackendHandle::new(Rc::new(MemoryBackend::new()), AVATAR_BUCKET)
        }
    }
}

/// The backend provided by the application root.
pub fn use_backend() -> BackendHandle {
    use_context::<BackendHandle>()
}
