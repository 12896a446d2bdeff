//! Configuration types.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::pipeline::dedupe::DEFAULT_DEDUPE_TTL;
use crate::pipeline::forward::DEFAULT_FORWARD_TIMEOUT;

/// Default downstream webhook.
pub const DEFAULT_FORWARDING_URL: &str =
    "https://prompthub.app.n8n.cloud/webhook/Receber-mensagem";

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Router configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Destination for routed events.
    pub forwarding_url: String,
    /// Log every inbound payload.
    pub log_enabled: bool,
    /// How long a message id is remembered.
    pub dedupe_ttl: Duration,
    /// Deadline for the outbound call.
    pub forward_timeout: Duration,
    /// Only forward events that carry a text body.
    pub require_text: bool,
    pub bind_addr: SocketAddr,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            forwarding_url: DEFAULT_FORWARDING_URL.to_string(),
            log_enabled: true,
            dedupe_ttl: DEFAULT_DEDUPE_TTL,
            forward_timeout: DEFAULT_FORWARD_TIMEOUT,
            require_text: false,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
        }
    }
}

impl RelayConfig {
    /// Build config from `ROUTER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Unset keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let forwarding_url = lookup("ROUTER_FORWARDING_URL")
            .map(|s| s.trim().to_string())
            .unwrap_or(defaults.forwarding_url);
        if forwarding_url.is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "ROUTER_FORWARDING_URL".into(),
                hint: "Set it to the n8n webhook URL".into(),
            });
        }

        let log_enabled = match lookup("ROUTER_LOG_ENABLED") {
            Some(raw) => parse_bool("ROUTER_LOG_ENABLED", &raw)?,
            None => defaults.log_enabled,
        };

        let require_text = match lookup("ROUTER_REQUIRE_TEXT") {
            Some(raw) => parse_bool("ROUTER_REQUIRE_TEXT", &raw)?,
            None => defaults.require_text,
        };

        let dedupe_ttl = match lookup("ROUTER_DEDUPE_TTL_SECS") {
            Some(raw) => Duration::from_secs(parse("ROUTER_DEDUPE_TTL_SECS", &raw)?),
            None => defaults.dedupe_ttl,
        };

        let forward_timeout = match lookup("ROUTER_FORWARD_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse("ROUTER_FORWARD_TIMEOUT_SECS", &raw)?),
            None => defaults.forward_timeout,
        };

        let bind_addr = match lookup("ROUTER_BIND_ADDR") {
            Some(raw) => parse("ROUTER_BIND_ADDR", &raw)?,
            None => defaults.bind_addr,
        };

        Ok(Self {
            forwarding_url,
            log_enabled,
            dedupe_ttl,
            forward_timeout,
            require_text,
            bind_addr,
        })
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.into(),
        message: format!("{raw:?}: {e}"),
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.into(),
            message: format!("{raw:?} is not a boolean"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = RelayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.forwarding_url, DEFAULT_FORWARDING_URL);
        assert!(config.log_enabled);
        assert!(!config.require_text);
        assert_eq!(config.dedupe_ttl, Duration::from_secs(60));
        assert_eq!(config.forward_timeout, Duration::from_secs(15));
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
    }

    #[test]
    fn reads_overrides() {
        let config = RelayConfig::from_lookup(lookup(&[
            ("ROUTER_FORWARDING_URL", "http://n8n.local/webhook/in"),
            ("ROUTER_LOG_ENABLED", "false"),
            ("ROUTER_REQUIRE_TEXT", "yes"),
            ("ROUTER_DEDUPE_TTL_SECS", "120"),
            ("ROUTER_FORWARD_TIMEOUT_SECS", "5"),
            ("ROUTER_BIND_ADDR", "127.0.0.1:9000"),
        ]))
        .unwrap();

        assert_eq!(config.forwarding_url, "http://n8n.local/webhook/in");
        assert!(!config.log_enabled);
        assert!(config.require_text);
        assert_eq!(config.dedupe_ttl, Duration::from_secs(120));
        assert_eq!(config.forward_timeout, Duration::from_secs(5));
        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = RelayConfig::from_lookup(lookup(&[("ROUTER_DEDUPE_TTL_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "ROUTER_DEDUPE_TTL_SECS"));
    }

    #[test]
    fn rejects_bad_booleans() {
        let err =
            RelayConfig::from_lookup(lookup(&[("ROUTER_LOG_ENABLED", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn rejects_empty_url() {
        let err =
            RelayConfig::from_lookup(lookup(&[("ROUTER_FORWARDING_URL", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { .. }));
    }
}
