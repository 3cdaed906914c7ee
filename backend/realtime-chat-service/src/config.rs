use crate::error::AppError;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Kafka bootstrap servers; push falls back to logging when unset
    pub kafka_brokers: Option<String>,
    pub topic: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub jwt_secret: String,
    /// Maximum message age for edits; 0 disables the window
    pub edit_window_minutes: i64,
    pub ws_heartbeat_secs: u64,
    pub ws_client_timeout_secs: u64,
    pub deliver_pending_on_connect: bool,
    pub seed_users_path: Option<String>,
    pub cors_allowed_origin: Option<String>,
    pub push: PushConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests never touch the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::Config("JWT_SECRET missing".into()))?;

        let edit_window_minutes: i64 = parse_or(&lookup, "EDIT_WINDOW_MINUTES", 15)?;
        if edit_window_minutes < 0 {
            return Err(AppError::Config(
                "EDIT_WINDOW_MINUTES must not be negative".into(),
            ));
        }

        let ws_heartbeat_secs: u64 = parse_or(&lookup, "WS_HEARTBEAT_SECS", 5)?;
        let ws_client_timeout_secs: u64 = parse_or(&lookup, "WS_CLIENT_TIMEOUT_SECS", 30)?;
        if ws_heartbeat_secs == 0 || ws_client_timeout_secs <= ws_heartbeat_secs {
            return Err(AppError::Config(
                "WS_CLIENT_TIMEOUT_SECS must exceed a non-zero WS_HEARTBEAT_SECS".into(),
            ));
        }

        let deliver_pending_on_connect = match lookup("DELIVER_PENDING_ON_CONNECT") {
            Some(v) => parse_bool("DELIVER_PENDING_ON_CONNECT", &v)?,
            None => true,
        };

        Ok(Self {
            port: parse_or(&lookup, "PORT", 3000)?,
            jwt_secret,
            edit_window_minutes,
            ws_heartbeat_secs,
            ws_client_timeout_secs,
            deliver_pending_on_connect,
            seed_users_path: lookup("SEED_USERS_PATH").filter(|s| !s.is_empty()),
            cors_allowed_origin: lookup("CORS_ALLOWED_ORIGIN").filter(|s| !s.is_empty()),
            push: PushConfig {
                kafka_brokers: lookup("KAFKA_BROKERS").filter(|s| !s.is_empty()),
                topic: lookup("PUSH_TOPIC").unwrap_or_else(|| "notifications".to_string()),
            },
        })
    }

    /// Defaults with a fixed secret, for tests.
    pub fn test_defaults() -> Self {
        Self {
            port: 0,
            jwt_secret: "test-secret".to_string(),
            edit_window_minutes: 15,
            ws_heartbeat_secs: 5,
            ws_client_timeout_secs: 30,
            deliver_pending_on_connect: true,
            seed_users_path: None,
            cors_allowed_origin: None,
            push: PushConfig {
                kafka_brokers: None,
                topic: "notifications".to_string(),
            },
        }
    }

    pub fn edit_window(&self) -> Option<chrono::Duration> {
        (self.edit_window_minutes > 0).then(|| chrono::Duration::minutes(self.edit_window_minutes))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.ws_heartbeat_secs)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.ws_client_timeout_secs)
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} is malformed: {raw:?}"))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(AppError::Config(format!("{key} is malformed: {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret")])).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.edit_window_minutes, 15);
        assert!(config.deliver_pending_on_connect);
        assert_eq!(config.push.topic, "notifications");
        assert_eq!(config.edit_window(), Some(chrono::Duration::minutes(15)));
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_malformed_values_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("PORT")));

        let err = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("DELIVER_PENDING_ON_CONNECT", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_zero_edit_window_disables_check() {
        let config = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("EDIT_WINDOW_MINUTES", "0"),
            ("DELIVER_PENDING_ON_CONNECT", "false"),
        ]))
        .unwrap();

        assert_eq!(config.edit_window(), None);
        assert!(!config.deliver_pending_on_connect);
    }
}
