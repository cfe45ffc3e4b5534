//! SessionState — the `{user, session, role, loading}` tuple

use super::types::{AuthUser, Role, Session, SessionToken, UserId};

/// Authoritative view of who is signed in and with what role
///
/// `loading == false` means the first resolution attempt has settled, by
/// success or by timeout fallback. It never means the role was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<AuthUser>,
    pub session: Option<Session>,
    pub role: Option<Role>,
    pub loading: bool,
}

impl SessionState {
    /// Start-of-application state: loading, nobody signed in
    pub fn initial() -> Self {
        Self {
            user: None,
            session: None,
            role: None,
            loading: true,
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user.as_ref().map(|u| &u.id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Role, but only while a user is present
    pub fn effective_role(&self) -> Option<Role> {
        self.user.as_ref().and(self.role)
    }

    pub fn is_admin(&self) -> bool {
        self.effective_role() == Some(Role::Admin)
    }

    /// Check if the signed-in user has at least `required`
    pub fn has_role(&self, required: Role) -> bool {
        self.effective_role()
            .map(|r| r.has_permission(required))
            .unwrap_or(false)
    }

    /// `Ready` with nobody signed in
    pub fn is_signed_out(&self) -> bool {
        !self.loading && self.user.is_none()
    }

    /// Fields readers actually observe. Two states with equal fingerprints
    /// render identically, so no change notification is needed between them.
    pub(crate) fn fingerprint(&self) -> Fingerprint<'_> {
        Fingerprint {
            user_id: self.user.as_ref().map(|u| &u.id),
            email: self.user.as_ref().and_then(|u| u.email.as_deref()),
            token: self.session.as_ref().map(|s| &s.access_token),
            role: self.role,
            loading: self.loading,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::initial()
    }
}

#[derive(PartialEq, Eq)]
pub(crate) struct Fingerprint<'a> {
    user_id: Option<&'a UserId>,
    email: Option<&'a str>,
    token: Option<&'a SessionToken>,
    role: Option<Role>,
    loading: bool,
}
