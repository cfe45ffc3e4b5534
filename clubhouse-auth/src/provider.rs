//! External collaborators — Auth Provider, Profile Directory, Cleanup Service
//!
//! The core consumes these only through the traits below. Adapters decide
//! how backend failures map onto [`LookupError`] / [`AuthSyncError`].

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{LookupError, Result};
use crate::session::{AuthEventKind, Session, SessionToken, UserId};

/// Callback registered with the provider for session-change notifications
pub type SessionChangeHandler = Arc<dyn Fn(AuthEventKind, Option<Session>) + Send + Sync>;

/// Authentication provider: owns tokens, refresh, and the real sign-out
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The session the provider currently holds, if any
    async fn current_session(&self) -> Result<Option<Session>>;

    /// Register for change events. The handler may be called from any task.
    fn on_session_change(&self, handler: SessionChangeHandler) -> Subscription;

    /// Primitive provider-level sign-out
    async fn sign_out(&self) -> Result<()>;
}

/// Profile row as far as role resolution cares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRole {
    pub role: Option<String>,
}

impl ProfileRole {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
        }
    }
}

/// Remote profile store holding each user's role
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// Fetch the role of `user_id`, authenticating as the session that
    /// carried it. `None` means the caller has no session token.
    async fn fetch_role(
        &self,
        user_id: &UserId,
        access_token: Option<&SessionToken>,
    ) -> std::result::Result<ProfileRole, LookupError>;
}

/// Best-effort eviction of every locally cached auth-derived datum
#[async_trait]
pub trait CleanupService: Send + Sync {
    async fn reset_auth(&self) -> Result<()>;
}

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Handle for a registered change handler
///
/// `release()` runs the provider's unregister hook at most once, no matter
/// how often it is called. Dropping an unreleased subscription releases it.
pub struct Subscription {
    id: Uuid,
    release: Mutex<Option<ReleaseFn>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id: Uuid::new_v4(),
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    /// A subscription with nothing to unregister
    pub fn detached() -> Self {
        Self::new(|| {})
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Unregister the handler. Returns `true` only for the releasing call.
    pub fn release(&self) -> bool {
        let hook = match self.release.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match hook {
            Some(hook) => {
                hook();
                debug!(subscription = %self.id, "Subscription released");
                true
            }
            None => false,
        }
    }

    pub fn is_released(&self) -> bool {
        match self.release.lock() {
            Ok(slot) => slot.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("released", &self.is_released())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
