//! RoleResolver — Profile Directory lookup with soft-fail and a bounded wait
//!
//! Every outcome is a role or `None`. A missing profile, a failed lookup,
//! an unreadable role tag and a lookup slower than [`ROLE_LOOKUP_TIMEOUT`]
//! all resolve to `None`; none of them signs the user out.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::LookupError;
use crate::provider::{ProfileDirectory, ProfileRole};
use crate::race::{race_settled, Settled, ROLE_LOOKUP_TIMEOUT};
use crate::session::{Role, SessionToken, UserId};

/// Resolves a user's role from the Profile Directory
#[derive(Clone)]
pub struct RoleResolver {
    directory: Arc<dyn ProfileDirectory>,
}

impl RoleResolver {
    pub fn new(directory: Arc<dyn ProfileDirectory>) -> Self {
        Self { directory }
    }

    /// Look up the role for `user_id`, giving up after [`ROLE_LOOKUP_TIMEOUT`]
    pub async fn resolve(
        &self,
        user_id: &UserId,
        access_token: Option<&SessionToken>,
    ) -> Option<Role> {
        match race_settled(self.lookup(user_id, access_token), ROLE_LOOKUP_TIMEOUT, None).await {
            Settled::Completed(role) => role,
            Settled::TimedOut(fallback) => {
                warn!(
                    user_id = %user_id,
                    timeout_secs = ROLE_LOOKUP_TIMEOUT.as_secs(),
                    "Role lookup timed out, continuing without role"
                );
                fallback
            }
        }
    }

    async fn lookup(&self, user_id: &UserId, access_token: Option<&SessionToken>) -> Option<Role> {
        info!(user_id = %user_id, "Fetching role");
        match self.directory.fetch_role(user_id, access_token).await {
            Ok(ProfileRole { role: Some(tag) }) => match Role::parse(&tag) {
                Some(role) => {
                    info!(user_id = %user_id, role = %role, "Role fetched");
                    Some(role)
                }
                None => {
                    let err = LookupError::Malformed(format!("unrecognised role tag {tag:?}"));
                    warn!(user_id = %user_id, error = %err, "Role fetch failed, continuing without role");
                    None
                }
            },
            Ok(ProfileRole { role: None }) => {
                warn!(user_id = %user_id, "Profile has no role, continuing without role");
                None
            }
            Err(LookupError::NotFound) => {
                warn!(user_id = %user_id, "Profile not found");
                None
            }
            Err(e) => {
                error!(user_id = %user_id, kind = e.kind(), error = %e, "Error fetching role");
                None
            }
        }
    }
}

impl std::fmt::Debug for RoleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleResolver").finish_non_exhaustive()
    }
}
