//! AuthSynchronizer — keeps `{user, session, role, loading}` in step with
//! the Auth Provider and the Profile Directory
//!
//! ```text
//!  provider events ─┐
//!  session probe ───┼──► mpsc ──► SyncActor ──► watch ──► SessionView (readers)
//!  8s watchdog ─────┘                │  ▲
//!                                    ▼  │
//!                              RoleResolver tasks
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clubhouse_auth::{AuthProvider, AuthSynchronizer, CleanupService, ProfileDirectory};
//!
//! async fn app(
//!     provider: Arc<dyn AuthProvider>,
//!     profiles: Arc<dyn ProfileDirectory>,
//!     cleanup: Arc<dyn CleanupService>,
//! ) {
//!     let auth = AuthSynchronizer::start(provider, profiles, cleanup);
//!
//!     // Hand the read-only view to the UI layer
//!     let mut view = auth.view();
//!     let ready = view.wait_ready().await;
//!     println!("signed in: {}, role: {:?}", ready.is_authenticated(), ready.role);
//!
//!     auth.sign_out().await;
//!     auth.teardown();
//! }
//! ```

mod actor;

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{AuthSyncError, Result};
use crate::guard::{CancellationGuard, LivenessToken};
use crate::provider::{
    AuthProvider, CleanupService, ProfileDirectory, SessionChangeHandler, Subscription,
};
use crate::race::{race_settled, Settled, LOADING_WATCHDOG, SESSION_PROBE_TIMEOUT};
use crate::resolver::RoleResolver;
use crate::session::{AuthUser, Role, Session, SessionState};
use crate::signout::{SignOutCoordinator, SignOutOutcome};

use actor::{Origin, SyncActor, SyncMsg};

/// Owner of the process-wide session state
///
/// Create one at startup with [`AuthSynchronizer::start`], pass
/// [`SessionView`]s to whoever needs to read it, and call
/// [`AuthSynchronizer::teardown`] (or drop it) on shutdown.
pub struct AuthSynchronizer {
    guard: CancellationGuard,
    subscription: Subscription,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    view: SessionView,
    signout: SignOutCoordinator,
}

impl AuthSynchronizer {
    /// Start synchronizing. Must be called from within a tokio runtime.
    ///
    /// Kicks off, concurrently: the initial session probe (bounded by
    /// [`SESSION_PROBE_TIMEOUT`]), the provider change subscription, and the
    /// [`LOADING_WATCHDOG`].
    pub fn start(
        provider: Arc<dyn AuthProvider>,
        directory: Arc<dyn ProfileDirectory>,
        cleanup: Arc<dyn CleanupService>,
    ) -> Self {
        let guard = CancellationGuard::new();
        let (state_tx, state_rx) = watch::channel(SessionState::initial());
        let (tx, rx) = mpsc::unbounded_channel();

        let actor = SyncActor::new(state_tx, rx, guard.token(), RoleResolver::new(directory));
        let actor_task = tokio::spawn(actor.run());

        info!("Setting up auth state listener");
        let subscription = provider.on_session_change(change_handler(guard.token(), tx.clone()));

        info!("Checking for existing session");
        let probe_task = tokio::spawn(probe_session(Arc::clone(&provider), guard.token(), tx.clone()));
        let watchdog_task = tokio::spawn(watchdog(guard.token(), tx));

        Self {
            guard,
            subscription,
            tasks: Mutex::new(vec![probe_task, watchdog_task, actor_task]),
            view: SessionView { rx: state_rx },
            signout: SignOutCoordinator::new(provider, cleanup),
        }
    }

    /// Read-only handle on the live state
    pub fn view(&self) -> SessionView {
        self.view.clone()
    }

    /// Snapshot of the live state
    pub fn state(&self) -> SessionState {
        self.view.current()
    }

    pub fn is_live(&self) -> bool {
        self.guard.is_live()
    }

    /// Sign the user out. Always settles; never touches state directly.
    pub async fn sign_out(&self) -> SignOutOutcome {
        self.signout.sign_out().await
    }

    /// Stop synchronizing. Idempotent.
    ///
    /// Invalidates the liveness guard first, then releases the provider
    /// subscription and cancels the probe, the watchdog and the actor (which
    /// takes its in-flight role lookups with it). Results that still arrive
    /// afterwards are dropped.
    pub fn teardown(&self) {
        if !self.guard.invalidate() {
            return;
        }
        info!("Cleaning up auth listener");
        self.subscription.release();

        let tasks = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for task in tasks {
            task.abort();
        }
    }
}

impl Drop for AuthSynchronizer {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for AuthSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSynchronizer")
            .field("live", &self.guard.is_live())
            .field("subscription", &self.subscription)
            .field("state", &self.view.current())
            .finish()
    }
}

// ─── Producers ───

fn change_handler(
    token: LivenessToken,
    tx: mpsc::UnboundedSender<SyncMsg>,
) -> SessionChangeHandler {
    Arc::new(move |kind, session| {
        if !token.is_live() {
            debug!(event = %kind, "Synchronizer torn down, skipping session handling");
            return;
        }
        let _ = tx.send(SyncMsg::Session {
            origin: Origin::Event(kind),
            session,
        });
    })
}

async fn probe_session(
    provider: Arc<dyn AuthProvider>,
    token: LivenessToken,
    tx: mpsc::UnboundedSender<SyncMsg>,
) {
    let msg = match race_settled(provider.current_session(), SESSION_PROBE_TIMEOUT, Ok(None)).await {
        Settled::Completed(Ok(session)) => SyncMsg::Session {
            origin: Origin::Probe,
            session,
        },
        Settled::Completed(Err(e)) => SyncMsg::ProbeFailed {
            error: e.to_string(),
        },
        Settled::TimedOut(_) => {
            warn!(
                timeout_secs = SESSION_PROBE_TIMEOUT.as_secs(),
                "Session check timeout, proceeding without session"
            );
            SyncMsg::Session {
                origin: Origin::Probe,
                session: None,
            }
        }
    };

    if token.is_live() {
        let _ = tx.send(msg);
    } else {
        debug!("Synchronizer torn down, dropping session probe result");
    }
}

async fn watchdog(token: LivenessToken, tx: mpsc::UnboundedSender<SyncMsg>) {
    tokio::time::sleep(LOADING_WATCHDOG).await;
    if token.is_live() {
        let _ = tx.send(SyncMsg::Watchdog);
    }
}

// ─── Read-only view ───

/// Cloneable, read-only view of the live [`SessionState`]
#[derive(Debug, Clone)]
pub struct SessionView {
    rx: watch::Receiver<SessionState>,
}

impl SessionView {
    /// Snapshot of the current state
    pub fn current(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.rx.borrow().user.clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.rx.borrow().session.clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.rx.borrow().role
    }

    pub fn loading(&self) -> bool {
        self.rx.borrow().loading
    }

    /// Wait for the next visible change
    pub async fn changed(&mut self) -> Result<SessionState> {
        self.rx
            .changed()
            .await
            .map_err(|_| AuthSyncError::ActorUnavailable("AuthSynchronizer stopped".into()))?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Wait until `predicate` holds, checking the current value first
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&SessionState) -> bool,
    ) -> Result<SessionState> {
        let state = self
            .rx
            .wait_for(predicate)
            .await
            .map_err(|_| AuthSyncError::ActorUnavailable("AuthSynchronizer stopped".into()))?;
        Ok(state.clone())
    }

    /// Wait until `loading == false`. After teardown, returns the last state.
    pub async fn wait_ready(&mut self) -> SessionState {
        match self.wait_for(|state| !state.loading).await {
            Ok(state) => state,
            Err(_) => self.current(),
        }
    }
}
