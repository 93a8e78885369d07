//! Data models exchanged with the hosted backend.

mod profile;
mod session;

pub use profile::{Profile, ProfileSummary, ProfileUpsert};
pub use session::{Session, SessionUser};
