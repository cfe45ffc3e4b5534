//! Scripted collaborator doubles shared by the integration suites
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use clubhouse_auth::{
    AuthEventKind, AuthProvider, AuthSyncError, AuthUser, CleanupService, LookupError,
    ProfileDirectory, ProfileRole, Session, SessionChangeHandler, SessionToken, Subscription,
    UserId,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn session_for(user_id: &str) -> Session {
    Session::new(
        format!("token-{user_id}"),
        Some(AuthUser::new(user_id).with_email(format!("{user_id}@club.org"))),
    )
}

// ─── Auth Provider ───

/// What `current_session()` does
pub enum Probe {
    Ready(Option<Session>),
    Never,
    Fail(&'static str),
}

type HandlerList = Arc<Mutex<Vec<(usize, SessionChangeHandler)>>>;

pub struct ScriptedProvider {
    probe: Probe,
    handlers: HandlerList,
    every_handler: Mutex<Vec<SessionChangeHandler>>,
    next_id: AtomicUsize,
    releases: Arc<AtomicUsize>,
    sign_outs: AtomicUsize,
    sign_out_fails: bool,
}

impl ScriptedProvider {
    pub fn new(probe: Probe) -> Arc<Self> {
        Arc::new(Self::build(probe, false))
    }

    pub fn failing_sign_out(probe: Probe) -> Arc<Self> {
        Arc::new(Self::build(probe, true))
    }

    fn build(probe: Probe, sign_out_fails: bool) -> Self {
        Self {
            probe,
            handlers: Arc::new(Mutex::new(Vec::new())),
            every_handler: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
            releases: Arc::new(AtomicUsize::new(0)),
            sign_outs: AtomicUsize::new(0),
            sign_out_fails,
        }
    }

    /// Deliver an event to every currently registered handler
    pub fn emit(&self, kind: AuthEventKind, session: Option<Session>) {
        let handlers: Vec<SessionChangeHandler> = self
            .handlers
            .lock()
            .unwrap()
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in handlers {
            handler(kind.clone(), session.clone());
        }
    }

    /// Deliver an event even to handlers whose subscription was released,
    /// like a provider that races its own unsubscribe
    pub fn emit_to_stale(&self, kind: AuthEventKind, session: Option<Session>) {
        let handlers: Vec<SessionChangeHandler> =
            self.every_handler.lock().unwrap().iter().cloned().collect();
        for handler in handlers {
            handler(kind.clone(), session.clone());
        }
    }

    pub fn listeners(&self) -> usize {
        self.handlers.lock().unwrap().len()
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn sign_outs(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProvider for ScriptedProvider {
    async fn current_session(&self) -> clubhouse_auth::Result<Option<Session>> {
        match &self.probe {
            Probe::Ready(session) => Ok(session.clone()),
            Probe::Never => std::future::pending().await,
            Probe::Fail(msg) => Err(AuthSyncError::Provider(msg.to_string())),
        }
    }

    fn on_session_change(&self, handler: SessionChangeHandler) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.handlers.lock().unwrap().push((id, Arc::clone(&handler)));
        self.every_handler.lock().unwrap().push(handler);

        let handlers = Arc::clone(&self.handlers);
        let releases = Arc::clone(&self.releases);
        Subscription::new(move || {
            handlers.lock().unwrap().retain(|(h, _)| *h != id);
            releases.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn sign_out(&self) -> clubhouse_auth::Result<()> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        if self.sign_out_fails {
            return Err(AuthSyncError::Provider("network unreachable".into()));
        }
        self.emit(AuthEventKind::SignedOut, None);
        Ok(())
    }
}

// ─── Profile Directory ───

#[derive(Clone)]
pub enum Lookup {
    Role { role: &'static str, after: Duration },
    Missing,
    Fail(LookupError),
    Never,
    Gated { gate: Arc<Notify>, role: &'static str },
}

impl Lookup {
    pub fn role(role: &'static str) -> Self {
        Self::Role {
            role,
            after: Duration::ZERO,
        }
    }

    pub fn role_after(role: &'static str, after: Duration) -> Self {
        Self::Role { role, after }
    }
}

#[derive(Default)]
pub struct ScriptedDirectory {
    script: Mutex<HashMap<UserId, Lookup>>,
    calls: AtomicUsize,
    tokens: Mutex<Vec<(UserId, Option<String>)>>,
}

impl ScriptedDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with(self: Arc<Self>, user_id: &str, lookup: Lookup) -> Arc<Self> {
        self.script.lock().unwrap().insert(UserId::new(user_id), lookup);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Access token each lookup authenticated with, in call order
    pub fn tokens(&self) -> Vec<(UserId, Option<String>)> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProfileDirectory for ScriptedDirectory {
    async fn fetch_role(
        &self,
        user_id: &UserId,
        access_token: Option<&SessionToken>,
    ) -> Result<ProfileRole, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens
            .lock()
            .unwrap()
            .push((user_id.clone(), access_token.map(|t| t.expose().to_string())));
        let lookup = self
            .script
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or(Lookup::Missing);

        match lookup {
            Lookup::Role { role, after } => {
                if !after.is_zero() {
                    tokio::time::sleep(after).await;
                }
                Ok(ProfileRole::new(role))
            }
            Lookup::Missing => Err(LookupError::NotFound),
            Lookup::Fail(err) => Err(err),
            Lookup::Never => std::future::pending().await,
            Lookup::Gated { gate, role } => {
                gate.notified().await;
                Ok(ProfileRole::new(role))
            }
        }
    }
}

// ─── Cleanup Service ───

pub struct ScriptedCleanup {
    fails: bool,
    provider: Option<Arc<ScriptedProvider>>,
    calls: AtomicUsize,
}

impl ScriptedCleanup {
    /// Cleanup that succeeds and signs the provider out as part of it
    pub fn working(provider: Arc<ScriptedProvider>) -> Arc<Self> {
        Arc::new(Self {
            fails: false,
            provider: Some(provider),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fails: true,
            provider: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CleanupService for ScriptedCleanup {
    async fn reset_auth(&self) -> clubhouse_auth::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fails {
            return Err(AuthSyncError::Cleanup("local storage locked".into()));
        }
        if let Some(provider) = &self.provider {
            provider.sign_out().await?;
        }
        Ok(())
    }
}
