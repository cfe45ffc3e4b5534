//! PostgREST-backed Profile Directory
//!
//! Reads the role column of the caller's profile row with a single-object
//! request (`Accept: application/vnd.pgrst.object+json`), authenticated with
//! the session's access token so row-level security sees the signed-in user,
//! and classifies every failure into a [`LookupError`] so the core never sees
//! raw codes.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::AuthSyncConfig;
use crate::error::{LookupError, Result};
use crate::provider::{ProfileDirectory, ProfileRole};
use crate::session::{SessionToken, UserId};

/// PostgREST: "JSON object requested, multiple (or no) rows returned"
pub const CODE_NO_SINGLE_ROW: &str = "PGRST116";

/// Postgres `insufficient_privilege`
pub const CODE_INSUFFICIENT_PRIVILEGE: &str = "42501";

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Error body returned by PostgREST
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

pub struct PostgrestDirectory {
    client: Client,
    config: AuthSyncConfig,
}

impl PostgrestDirectory {
    pub fn new(config: AuthSyncConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self { client, config })
    }

    /// Bearer credential: the session's access token, else the anon key
    fn bearer<'a>(&'a self, access_token: Option<&'a SessionToken>) -> &'a str {
        access_token
            .map(SessionToken::expose)
            .unwrap_or(self.config.api_key.as_str())
    }

    /// Query parameters selecting one profile's role
    pub fn query_params(&self, user_id: &UserId) -> Vec<(String, String)> {
        vec![
            ("select".to_string(), self.config.role_column.clone()),
            (self.config.id_column.clone(), format!("eq.{user_id}")),
        ]
    }
}

#[async_trait]
impl ProfileDirectory for PostgrestDirectory {
    async fn fetch_role(
        &self,
        user_id: &UserId,
        access_token: Option<&SessionToken>,
    ) -> std::result::Result<ProfileRole, LookupError> {
        let url = self
            .config
            .profiles_url()
            .map_err(|e| LookupError::Unknown(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .query(&self.query_params(user_id))
            .header("apikey", &self.config.api_key)
            .header(ACCEPT, SINGLE_OBJECT)
            .bearer_auth(self.bearer(access_token))
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| classify_transport(&e))?;
        debug!(
            user_id = %user_id,
            status = status.as_u16(),
            as_user = access_token.is_some(),
            "Profile lookup response"
        );

        if status.is_success() {
            parse_profile(&body, &self.config.role_column)
        } else {
            Err(classify_failure(status, &body))
        }
    }
}

/// Read the role column out of a single-object response body
pub fn parse_profile(body: &str, role_column: &str) -> std::result::Result<ProfileRole, LookupError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| LookupError::Malformed(e.to_string()))?;
    let row = value
        .as_object()
        .ok_or_else(|| LookupError::Malformed("expected a JSON object".into()))?;

    match row.get(role_column) {
        Some(Value::String(role)) => Ok(ProfileRole::new(role.as_str())),
        Some(Value::Null) => Ok(ProfileRole { role: None }),
        Some(other) => Err(LookupError::Malformed(format!(
            "column {role_column} is not a string: {other}"
        ))),
        None => Err(LookupError::Malformed(format!("column {role_column} missing"))),
    }
}

/// Map a non-2xx PostgREST response onto the closed lookup taxonomy
pub fn classify_failure(status: StatusCode, body: &str) -> LookupError {
    let err: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
    let code = err.code.as_deref().unwrap_or("");

    if code == CODE_NO_SINGLE_ROW {
        // The same code also covers "more than one row"; only zero rows is NotFound.
        return match err.details.as_deref() {
            None => LookupError::NotFound,
            Some(details) if result_row_count(details) == Some(0) => LookupError::NotFound,
            Some(_) => LookupError::Malformed(message),
        };
    }

    if code == CODE_INSUFFICIENT_PRIVILEGE
        || message.contains("row-level security")
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        return LookupError::PermissionDenied(message);
    }

    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        return LookupError::Transient(format!("HTTP {}: {message}", status.as_u16()));
    }

    LookupError::Unknown(format!("HTTP {} {code}: {message}", status.as_u16()))
}

/// Row count from PostgREST's "The result contains N rows" detail
/// (newer servers say "Results contain N rows, ...")
fn result_row_count(details: &str) -> Option<u64> {
    let mut words = details.split_whitespace();
    words.find(|w| matches!(*w, "contains" | "contain"))?;
    words.next()?.parse().ok()
}

fn classify_transport(err: &reqwest::Error) -> LookupError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        LookupError::Transient(err.to_string())
    } else if err.is_decode() {
        LookupError::Malformed(err.to_string())
    } else {
        LookupError::Unknown(err.to_string())
    }
}
