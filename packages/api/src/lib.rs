//! # API crate: the hosted backend client contract
//!
//! Every persistence and authentication operation of the portal goes through the
//! [`Backend`] trait defined here. The web frontend never talks HTTP directly; it
//! holds an `Rc<dyn Backend>` and calls these methods.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`backend`] | The [`Backend`] trait, upload options and sign-up outcome |
//! | [`auth`] | Auth-state events, listener table and the [`Subscription`] handle |
//! | [`config`] | [`BackendConfig`] loaded from the environment |
//! | [`error`] | `thiserror` taxonomy: auth, store, storage, network, config |
//! | [`hosted`] | [`HostedBackend`], the `reqwest` implementation of the hosted REST surface |
//! | [`memory`] | [`MemoryBackend`], an in-process implementation that records every call |
//! | [`models`] | Session, profile rows, profile upsert patches |
//!
//! ## Implementations
//!
//! - **Hosted**: auth under `/auth/v1`, the `profiles` table under `/rest/v1`, object
//!   storage under `/storage/v1`.
//! - **Memory**: used by tests and as the fallback when no backend is configured.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod hosted;
pub mod memory;
pub mod models;

pub use auth::{AuthEvent, SessionCallback, Subscription};
pub use backend::{Backend, SignUpOutcome, UploadOptions};
pub use config::BackendConfig;
pub use error::{AuthError, ConfigError, NetworkError, StorageError, StoreError};
pub use hosted::HostedBackend;
pub use memory::{BackendCall, MemoryBackend};
pub use models::{Profile, ProfileSummary, ProfileUpsert, Session, SessionUser};

/// Bucket that holds user avatars.
pub const AVATAR_BUCKET: &str = "avatars";

/// Table that holds one profile row per user.
pub const PROFILES_TABLE: &str = "profiles";
