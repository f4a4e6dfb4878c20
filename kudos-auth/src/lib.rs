// Session types persisted between runs
pub mod common;

// Client-side session handling (public API for kudos)
mod client;
mod error;

pub use client::{
    ensure_session, load_settings, login, login_interactive, persist_refresh_cookie,
    restore_session, FileTokenStore, PortalClient, Settings,
};
pub use common::StoredSession;
pub use error::AuthError;
