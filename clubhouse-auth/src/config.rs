//! Configuration for Clubhouse auth synchronization
//!
//! Only the collaborator adapters read this. The session probe, watchdog and
//! role lookup deadlines are fixed constants in [`crate::race`].

use std::time::Duration;

use url::Url;

use crate::error::{AuthSyncError, Result};

/// Connection settings for the Auth+Database service
#[derive(Debug, Clone)]
pub struct AuthSyncConfig {
    /// Base URL of the hosted project (e.g. `https://xyz.supabase.co`)
    pub project_url: Url,

    /// Public anon key, sent as the `apikey` header
    pub api_key: String,

    /// Table holding one profile row per user
    pub profiles_table: String,

    /// Column of `profiles_table` carrying the role tag
    pub role_column: String,

    /// Primary key column of `profiles_table` (the auth user id)
    pub id_column: String,

    /// Transport timeout for adapter HTTP calls
    pub http_timeout: Duration,
}

impl AuthSyncConfig {
    /// Create config with sensible defaults
    ///
    /// # Arguments
    /// * `project_url` - base URL of the project; must parse as an absolute URL.
    /// * `api_key` - the public anon key.
    pub fn new(project_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let project_url = Url::parse(project_url)?;
        if project_url.cannot_be_a_base() {
            return Err(AuthSyncError::Config(format!(
                "project URL cannot be a base: {project_url}"
            )));
        }

        Ok(Self {
            project_url,
            api_key: api_key.into(),
            profiles_table: "profiles".to_string(),
            role_column: "role".to_string(),
            id_column: "id".to_string(),
            http_timeout: Duration::from_secs(15),
        })
    }

    /// Build from `CLUBHOUSE_PROJECT_URL`, `CLUBHOUSE_ANON_KEY` and the
    /// optional `CLUBHOUSE_PROFILES_TABLE`
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("CLUBHOUSE_PROJECT_URL")
            .map_err(|_| AuthSyncError::Config("CLUBHOUSE_PROJECT_URL is not set".into()))?;
        let key = std::env::var("CLUBHOUSE_ANON_KEY")
            .map_err(|_| AuthSyncError::Config("CLUBHOUSE_ANON_KEY is not set".into()))?;

        let mut config = Self::new(&url, key)?;
        if let Ok(table) = std::env::var("CLUBHOUSE_PROFILES_TABLE") {
            config = config.with_profiles_table(table);
        }
        Ok(config)
    }

    /// Override the profiles table name
    pub fn with_profiles_table(mut self, table: impl Into<String>) -> Self {
        self.profiles_table = table.into();
        self
    }

    /// Override the role column name
    pub fn with_role_column(mut self, column: impl Into<String>) -> Self {
        self.role_column = column.into();
        self
    }

    /// Override the profile id column name
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    /// Override the adapter transport timeout
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// PostgREST root: `{project_url}/rest/v1/`
    pub fn rest_url(&self) -> Result<Url> {
        let mut base = self.project_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join("rest/v1/")?)
    }

    /// URL of the profiles table endpoint
    pub fn profiles_url(&self) -> Result<Url> {
        Ok(self.rest_url()?.join(&self.profiles_table)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = AuthSyncConfig::new("https://demo.supabase.co", "anon").unwrap();
        assert_eq!(cfg.profiles_table, "profiles");
        assert_eq!(cfg.role_column, "role");
        assert_eq!(cfg.http_timeout, Duration::from_secs(15));
        assert_eq!(
            cfg.profiles_url().unwrap().as_str(),
            "https://demo.supabase.co/rest/v1/profiles"
        );
    }

    #[test]
    fn test_builder_pattern() {
        let cfg = AuthSyncConfig::new("https://demo.supabase.co/base", "anon")
            .unwrap()
            .with_profiles_table("members")
            .with_role_column("member_role")
            .with_http_timeout(Duration::from_secs(3));

        assert_eq!(cfg.role_column, "member_role");
        assert_eq!(cfg.http_timeout, Duration::from_secs(3));
        assert_eq!(
            cfg.profiles_url().unwrap().as_str(),
            "https://demo.supabase.co/base/rest/v1/members"
        );
    }

    // Sole owner of the CLUBHOUSE_* variables in this test binary
    #[test]
    fn test_from_env() {
        const VARS: [&str; 3] = [
            "CLUBHOUSE_PROJECT_URL",
            "CLUBHOUSE_ANON_KEY",
            "CLUBHOUSE_PROFILES_TABLE",
        ];
        for var in VARS {
            std::env::remove_var(var);
        }

        std::env::set_var("CLUBHOUSE_ANON_KEY", "anon-from-env");
        match AuthSyncConfig::from_env() {
            Err(AuthSyncError::Config(msg)) => assert!(msg.contains("CLUBHOUSE_PROJECT_URL")),
            other => panic!("expected missing URL error, got {other:?}"),
        }

        std::env::remove_var("CLUBHOUSE_ANON_KEY");
        std::env::set_var("CLUBHOUSE_PROJECT_URL", "https://env.supabase.co");
        match AuthSyncConfig::from_env() {
            Err(AuthSyncError::Config(msg)) => assert!(msg.contains("CLUBHOUSE_ANON_KEY")),
            other => panic!("expected missing key error, got {other:?}"),
        }

        std::env::set_var("CLUBHOUSE_ANON_KEY", "anon-from-env");
        let cfg = AuthSyncConfig::from_env().unwrap();
        assert_eq!(cfg.api_key, "anon-from-env");
        assert_eq!(cfg.profiles_table, "profiles");

        std::env::set_var("CLUBHOUSE_PROFILES_TABLE", "members");
        let cfg = AuthSyncConfig::from_env().unwrap();
        assert_eq!(
            cfg.profiles_url().unwrap().as_str(),
            "https://env.supabase.co/rest/v1/members"
        );

        std::env::set_var("CLUBHOUSE_PROJECT_URL", "not a url");
        assert!(matches!(AuthSyncConfig::from_env(), Err(AuthSyncError::Config(_))));

        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_rejects_relative_url() {
        assert!(matches!(
            AuthSyncConfig::new("not a url", "anon"),
            Err(AuthSyncError::Config(_))
        ));
        assert!(matches!(
            AuthSyncConfig::new("mailto:ops@example.com", "anon"),
            Err(AuthSyncError::Config(_))
        ));
    }
}
