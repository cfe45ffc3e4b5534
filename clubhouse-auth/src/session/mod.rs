//! Session data model — identities, tokens, roles, and the live state tuple

pub mod state;
pub mod types;

pub use state::SessionState;
pub use types::{AuthEventKind, AuthUser, Role, Session, SessionToken, UserId};
