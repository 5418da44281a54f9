//! Runtime configuration read from the environment (after `.env` is loaded).

use chrono::Duration;
use std::path::PathBuf;

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// First non-empty value among `keys`.
fn env_first(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| std::env::var(k).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// Connection settings for the hosted row store.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub url: String,
    pub anon_key: String,
    pub timeout_secs: u64,
}

impl RemoteConfig {
    /// `None` when the URL or key is missing; database features are then
    /// disabled rather than failing startup.
    pub fn from_env() -> Option<Self> {
        let url = env_first(&["SUPABASE_URL", "VITE_SUPABASE_URL"])?;
        let anon_key = env_first(&["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"])?;
        Some(Self {
            url,
            anon_key,
            timeout_secs: env_parse("REMOTE_TIMEOUT_SECS").unwrap_or(10),
        })
    }
}

/// Session lifetime and lockout policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPolicy {
    pub session_duration: Duration,
    pub lockout_duration: Duration,
    pub max_attempts: u32,
    pub check_interval: std::time::Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            session_duration: Duration::minutes(30),
            lockout_duration: Duration::minutes(15),
            max_attempts: 3,
            check_interval: std::time::Duration::from_secs(60),
        }
    }
}

impl SessionPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            session_duration: env_parse::<i64>("SESSION_DURATION_MINUTES")
                .filter(|m| *m > 0)
                .map(Duration::minutes)
                .unwrap_or(defaults.session_duration),
            lockout_duration: env_parse::<i64>("LOCKOUT_DURATION_MINUTES")
                .filter(|m| *m > 0)
                .map(Duration::minutes)
                .unwrap_or(defaults.lockout_duration),
            max_attempts: env_parse::<u32>("MAX_LOGIN_ATTEMPTS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_attempts),
            check_interval: env_parse::<u64>("SESSION_CHECK_INTERVAL_SECS")
                .filter(|s| *s > 0)
                .map(std::time::Duration::from_secs)
                .unwrap_or(defaults.check_interval),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub remote: Option<RemoteConfig>,
    /// Base URL of the generic REST API used by `ApiClient`.
    pub api_url: String,
    pub session_file: PathBuf,
    pub session: SessionPolicy,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env_parse("PORT").unwrap_or(3001),
            remote: RemoteConfig::from_env(),
            api_url: env_first(&["API_URL", "VITE_API_URL"])
                .unwrap_or_else(|| "http://localhost:3001".to_string()),
            session_file: std::env::var("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/admin_session.json")),
            session: SessionPolicy::from_env(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
