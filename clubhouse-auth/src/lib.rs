//! # Clubhouse Auth
//!
//! Session and role synchronization for the Clubhouse membership app.
//! Reconciles the locally held "who is signed in, with what role" state
//! against an external Auth Provider (asynchronous session-change events)
//! and a remote Profile Directory (slow, failing, or silent role lookups).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               AuthSynchronizer              │
//! │   (SyncActor owns {user,session,role,       │
//! │    loading}; SessionView reads it)          │
//! ├──────────────┬──────────────┬───────────────┤
//! │ RoleResolver │ SignOut-     │ Cancellation- │
//! │ (soft-fail,  │ Coordinator  │ Guard         │
//! │  10s bound)  │ (fallback)   │ (liveness)    │
//! ├──────────────┴──────────────┴───────────────┤
//! │      TimeoutRace (5s probe, 8s watchdog)    │
//! ├─────────────────────────────────────────────┤
//! │  AuthProvider · ProfileDirectory · Cleanup  │
//! │        (traits; PostgREST adapter)          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - `loading` always becomes `false` within bounded time, whatever the
//!   provider and directory do.
//! - Lookup failures of any kind degrade to "no role"; they never sign the
//!   user out.
//! - After teardown, late results are dropped without touching state.
//! - `sign_out()` always settles, falling back to the provider's own
//!   sign-out when the comprehensive cleanup fails.

pub mod config;
pub mod error;
pub mod guard;
pub mod provider;
pub mod race;
pub mod resolver;
pub mod session;
pub mod signout;
pub mod sync;

#[cfg(feature = "postgrest")]
pub mod postgrest;

// Re-exports for convenience
pub use config::AuthSyncConfig;
pub use error::{AuthSyncError, LookupError, Result};
pub use guard::{CancellationGuard, LivenessToken};
pub use provider::{
    AuthProvider, CleanupService, ProfileDirectory, ProfileRole, SessionChangeHandler,
    Subscription,
};
pub use race::{race, race_ok, race_settled, Settled};
pub use resolver::RoleResolver;
pub use session::{AuthEventKind, AuthUser, Role, Session, SessionState, SessionToken, UserId};
pub use signout::{SignOutCoordinator, SignOutOutcome};
pub use sync::{AuthSynchronizer, SessionView};

#[cfg(feature = "postgrest")]
pub use postgrest::PostgrestDirectory;
