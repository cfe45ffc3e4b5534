//! SyncActor — the only writer of [`SessionState`]
//!
//! Probe results, provider events and the watchdog arrive as messages on an
//! unbounded mpsc queue; role lookups run as tasks in a `JoinSet` owned by
//! the actor. Each message or finished lookup is applied in one step, so
//! writes never interleave. Whatever settles last wins.

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::guard::LivenessToken;
use crate::resolver::RoleResolver;
use crate::session::{AuthEventKind, Role, Session, SessionState, SessionToken, UserId};

// ─── Actor Messages ───

/// Where a session value came from
#[derive(Debug, Clone)]
pub(crate) enum Origin {
    Probe,
    Event(AuthEventKind),
}

pub(crate) enum SyncMsg {
    Session {
        origin: Origin,
        session: Option<Session>,
    },
    ProbeFailed {
        error: String,
    },
    Watchdog,
}

// ─── Actor ───

pub(crate) struct SyncActor {
    state: watch::Sender<SessionState>,
    rx: mpsc::UnboundedReceiver<SyncMsg>,
    token: LivenessToken,
    resolver: RoleResolver,
    lookups: JoinSet<(UserId, Option<Role>)>,
}

impl SyncActor {
    pub(crate) fn new(
        state: watch::Sender<SessionState>,
        rx: mpsc::UnboundedReceiver<SyncMsg>,
        token: LivenessToken,
        resolver: RoleResolver,
    ) -> Self {
        Self {
            state,
            rx,
            token,
            resolver,
            lookups: JoinSet::new(),
        }
    }

    /// Main event loop. Ends once every producer is gone and no lookup is
    /// pending, or when the task is aborted at teardown.
    pub(crate) async fn run(mut self) {
        let mut inbox_open = true;
        loop {
            tokio::select! {
                msg = self.rx.recv(), if inbox_open => match msg {
                    Some(msg) => self.handle(msg),
                    None => inbox_open = false,
                },
                Some(joined) = self.lookups.join_next(), if !self.lookups.is_empty() => {
                    self.handle_lookup(joined);
                }
                else => break,
            }
        }
        debug!("SyncActor stopped");
    }

    fn handle(&mut self, msg: SyncMsg) {
        if !self.token.is_live() {
            debug!("Synchronizer torn down, skipping message");
            return;
        }
        match msg {
            SyncMsg::Session { origin, session } => self.handle_session(origin, session),
            SyncMsg::ProbeFailed { error } => {
                error!(error = %error, "Error getting session");
                self.publish(|state| state.loading = false);
            }
            SyncMsg::Watchdog => {
                if self.state.borrow().loading {
                    warn!("Loading timeout reached, forcing completion");
                    self.publish(|state| state.loading = false);
                }
            }
        }
    }

    // ─── Handler Implementations ───

    fn handle_session(&mut self, origin: Origin, session: Option<Session>) {
        let user = session.as_ref().and_then(|s| s.user.clone());
        match &origin {
            Origin::Probe => info!(
                has_session = session.is_some(),
                user_id = ?user.as_ref().map(|u| u.id.as_str()),
                "Initial session check"
            ),
            Origin::Event(kind) => info!(
                event = %kind,
                user_id = ?user.as_ref().map(|u| u.id.as_str()),
                "Auth state change event"
            ),
        }

        let user_id = user.as_ref().map(|u| u.id.clone());
        let access_token = session.as_ref().map(|s| s.access_token.clone());
        self.publish(|state| {
            state.session = session;
            state.user = user;
            if state.user.is_none() {
                state.role = None;
                state.loading = false;
            }
        });

        match user_id {
            Some(user_id) => self.spawn_lookup(user_id, access_token),
            None => info!("Role cleared (no user)"),
        }
    }

    fn spawn_lookup(&mut self, user_id: UserId, access_token: Option<SessionToken>) {
        let resolver = self.resolver.clone();
        self.lookups.spawn(async move {
            let role = resolver.resolve(&user_id, access_token.as_ref()).await;
            (user_id, role)
        });
    }

    fn handle_lookup(&mut self, joined: std::result::Result<(UserId, Option<Role>), JoinError>) {
        if !self.token.is_live() {
            debug!("Synchronizer torn down, dropping role result");
            return;
        }

        let role = match joined {
            Ok((user_id, role)) => {
                let current = self.state.borrow().user_id().cloned();
                if current.is_none() {
                    debug!(resolved_for = %user_id, "Role resolved after sign-out, discarding role");
                } else if current.as_ref() != Some(&user_id) {
                    warn!(
                        resolved_for = %user_id,
                        current = ?current.as_ref().map(|u| u.as_str()),
                        "Role resolved for a user that is no longer current"
                    );
                }
                match role {
                    Some(role) => info!(user_id = %user_id, role = %role, "Role resolved"),
                    None => warn!(user_id = %user_id, "No role found for user, continuing without role"),
                }
                role
            }
            Err(e) => {
                error!(error = %e, "Role lookup task failed, continuing without role");
                None
            }
        };

        self.publish(|state| {
            // Role only exists alongside a user
            if state.user.is_some() {
                state.role = role;
            }
            state.loading = false;
        });
        info!("Auth state updated, loading complete");
    }

    // ─── Helpers ───

    /// Apply `update` atomically; readers are woken only if a visible field changed
    fn publish(&self, update: impl FnOnce(&mut SessionState)) {
        self.state.send_if_modified(|state| {
            let before = state.clone();
            update(state);
            before.fingerprint() != state.fingerprint()
        });
    }
}
