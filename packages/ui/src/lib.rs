//! This crate contains all shared UI for the workspace.
//!
//! The non-rendering logic (session gate, shell mounting, avatar resolution,
//! profile editing) lives in plain modules and is tested against
//! [`api::MemoryBackend`]; the components wrap it in Dioxus hooks.

// Re-export icon library
pub use dioxus_free_icons::Icon;
pub mod icons {
    pub use dioxus_free_icons::icons::fa_solid_icons::*;
}

pub mod avatar;
pub mod notify;
pub mod profile;
pub mod session;
pub mod shell;

mod backend;
pub use backend::{make_backend, use_backend, BackendHandle};

mod auth;
pub use auth::{use_session, SessionProvider, SignOutButton};

mod navbar;
pub use navbar::{Navbar, PORTAL_CSS};

mod profile_avatar;
pub use profile_avatar::ProfileAvatar;

pub use session::SessionState;
pub use shell::{Mount, Page};
