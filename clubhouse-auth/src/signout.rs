//! SignOutCoordinator — comprehensive cleanup with a guaranteed fallback
//!
//! Never mutates session state. The provider's own `SIGNED_OUT` event flows
//! back through the synchronizer and clears `user`/`role` there.

use std::sync::Arc;

use tracing::{error, info};

use crate::provider::{AuthProvider, CleanupService};

/// How a sign-out attempt went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutOutcome {
    /// The cleanup service evicted everything (including the provider session)
    Cleaned,
    /// Cleanup failed; the provider's primitive sign-out succeeded instead
    FellBack,
    /// Both steps failed. The provider session may still be alive.
    Failed,
}

#[derive(Clone)]
pub struct SignOutCoordinator {
    provider: Arc<dyn AuthProvider>,
    cleanup: Arc<dyn CleanupService>,
}

impl SignOutCoordinator {
    pub fn new(provider: Arc<dyn AuthProvider>, cleanup: Arc<dyn CleanupService>) -> Self {
        Self { provider, cleanup }
    }

    /// Always settles. Failures are logged and reported in the outcome only.
    pub async fn sign_out(&self) -> SignOutOutcome {
        info!("Starting sign out");
        let err = match self.cleanup.reset_auth().await {
            Ok(()) => {
                info!("Sign out completed");
                return SignOutOutcome::Cleaned;
            }
            Err(err) => err,
        };

        error!(error = %err, "Auth cleanup failed, falling back to provider sign out");
        match self.provider.sign_out().await {
            Ok(()) => {
                info!("Provider sign out completed");
                SignOutOutcome::FellBack
            }
            Err(e) => {
                error!(error = %e, "Provider sign out failed");
                SignOutOutcome::Failed
            }
        }
    }
}

impl std::fmt::Debug for SignOutCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignOutCoordinator").finish_non_exhaustive()
    }
}
