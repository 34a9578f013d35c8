//! Client configuration loaded from environment variables.
//!
//! All settings have defaults that point at a local development server, so
//! the client starts with nothing set except the credential and user id.

use std::time::Duration;

use uuid::Uuid;

use parley_net::{ApiConfig, TransportConfig};
use parley_shared::constants::{
    CHANNEL_BUFFER, DEFAULT_API_URL, DEFAULT_SOCKET_URL, RECONNECT_ATTEMPTS, RECONNECT_DELAY_MS,
    REQUEST_TIMEOUT_SECS, TYPING_IDLE_MS,
};
use parley_shared::model::User;
use parley_shared::types::UserId;
use parley_store::StatusPolicy;

use crate::engine::EngineOptions;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST base URL.
    /// Env: `PARLEY_API_URL`
    pub api_url: String,

    /// Real-time endpoint.
    /// Env: `PARLEY_SOCKET_URL`
    pub socket_url: String,

    /// Bearer credential for both REST and the socket.
    /// Env: `PARLEY_TOKEN`
    pub token: String,

    /// Env: `PARLEY_USER_ID`, `PARLEY_USER_NAME`
    pub user_id: Option<UserId>,
    pub user_name: String,

    /// Env: `PARLEY_RECONNECT_DELAY_MS`
    pub reconnect_delay: Duration,

    /// Env: `PARLEY_RECONNECT_ATTEMPTS`
    pub reconnect_attempts: u32,

    /// Quiet interval before the local typing signal stops.
    /// Env: `PARLEY_TYPING_IDLE_MS`
    pub typing_idle: Duration,

    /// Env: `PARLEY_STATUS_POLICY` (`monotonic` | `last-write-wins`)
    pub status_policy: StatusPolicy,

    /// Env: `PARLEY_REQUEST_TIMEOUT_SECS`
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            token: String::new(),
            user_id: None,
            user_name: "me".to_string(),
            reconnect_delay: Duration::from_millis(RECONNECT_DELAY_MS),
            reconnect_attempts: RECONNECT_ATTEMPTS,
            typing_idle: Duration::from_millis(TYPING_IDLE_MS),
            status_policy: StatusPolicy::default(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = var("PARLEY_API_URL") {
            config.api_url = url;
        }
        if let Some(url) = var("PARLEY_SOCKET_URL") {
            config.socket_url = url;
        }
        if let Some(token) = var("PARLEY_TOKEN") {
            config.token = token;
        }

        if let Some(id) = var("PARLEY_USER_ID") {
            match Uuid::parse_str(id.trim()) {
                Ok(uuid) => config.user_id = Some(UserId(uuid)),
                Err(e) => tracing::warn!(value = %id, error = %e, "Invalid PARLEY_USER_ID, ignoring"),
            }
        }
        if let Some(name) = var("PARLEY_USER_NAME") {
            if !name.trim().is_empty() {
                config.user_name = name;
            }
        }

        if let Some(val) = var("PARLEY_RECONNECT_DELAY_MS") {
            match val.parse::<u64>() {
                Ok(ms) => config.reconnect_delay = Duration::from_millis(ms),
                Err(_) => tracing::warn!(value = %val, "Invalid PARLEY_RECONNECT_DELAY_MS, using default"),
            }
        }

        if let Some(val) = var("PARLEY_RECONNECT_ATTEMPTS") {
            match val.parse::<u32>() {
                Ok(n) => config.reconnect_attempts = n,
                Err(_) => tracing::warn!(value = %val, "Invalid PARLEY_RECONNECT_ATTEMPTS, using default"),
            }
        }

        if let Some(val) = var("PARLEY_TYPING_IDLE_MS") {
            match val.parse::<u64>() {
                Ok(ms) if ms > 0 => config.typing_idle = Duration::from_millis(ms),
                _ => tracing::warn!(value = %val, "Invalid PARLEY_TYPING_IDLE_MS, using default"),
            }
        }

        if let Some(val) = var("PARLEY_STATUS_POLICY") {
            match val.trim().to_ascii_lowercase().as_str() {
                "monotonic" => config.status_policy = StatusPolicy::Monotonic,
                "last-write-wins" => config.status_policy = StatusPolicy::LastWriteWins,
                _ => tracing::warn!(value = %val, "Invalid PARLEY_STATUS_POLICY, using default"),
            }
        }

        if let Some(val) = var("PARLEY_REQUEST_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid PARLEY_REQUEST_TIMEOUT_SECS, using default"),
            }
        }

        // RUST_LOG is read by tracing-subscriber's EnvFilter directly.

        config
    }

    /// The signed-in user, when an id was configured.
    pub fn identity(&self) -> Option<User> {
        self.user_id
            .clone()
            .map(|id| User::new(id, self.user_name.clone()))
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_url.clone(),
            token: self.token.clone(),
            timeout: self.request_timeout,
        }
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            url: self.socket_url.clone(),
            reconnect_delay: self.reconnect_delay,
            reconnect_attempts: self.reconnect_attempts,
            buffer: CHANNEL_BUFFER,
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            status_policy: self.status_policy,
            typing_idle: self.typing_idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let config = load(&[]);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.reconnect_attempts, RECONNECT_ATTEMPTS);
        assert_eq!(config.typing_idle, Duration::from_millis(TYPING_IDLE_MS));
        assert_eq!(config.status_policy, StatusPolicy::Monotonic);
        assert!(config.identity().is_none());
    }

    #[test]
    fn reads_overrides() {
        let id = Uuid::new_v4();
        let config = load(&[
            ("PARLEY_API_URL", "https://chat.example/api"),
            ("PARLEY_TOKEN", "abc"),
            ("PARLEY_USER_ID", &id.to_string()),
            ("PARLEY_USER_NAME", "Ada"),
            ("PARLEY_RECONNECT_DELAY_MS", "250"),
            ("PARLEY_STATUS_POLICY", "last-write-wins"),
        ]);
        assert_eq!(config.api_config().base_url, "https://chat.example/api");
        assert_eq!(config.api_config().token, "abc");
        assert_eq!(config.transport_config().reconnect_delay, Duration::from_millis(250));
        assert_eq!(config.engine_options().status_policy, StatusPolicy::LastWriteWins);
        let me = config.identity().unwrap();
        assert_eq!(me.id, UserId(id));
        assert_eq!(me.name, "Ada");
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = load(&[
            ("PARLEY_RECONNECT_ATTEMPTS", "many"),
            ("PARLEY_TYPING_IDLE_MS", "0"),
            ("PARLEY_STATUS_POLICY", "sometimes"),
            ("PARLEY_USER_ID", "not-a-uuid"),
        ]);
        assert_eq!(config.reconnect_attempts, RECONNECT_ATTEMPTS);
        assert_eq!(config.typing_idle, Duration::from_millis(TYPING_IDLE_MS));
        assert_eq!(config.status_policy, StatusPolicy::Monotonic);
        assert!(config.user_id.is_none());
    }
}
