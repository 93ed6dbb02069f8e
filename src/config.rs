use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    time::Duration,
};

use dotenvy::dotenv;
use thiserror::Error;

use crate::theme::Theme;

const ADDR_VAR: &str = "SUPPORTTWP_ADDR";
const THEME_VAR: &str = "SUPPORTTWP_THEME";
const SIGNUP_BURST_VAR: &str = "SUPPORTTWP_SIGNUP_BURST";
const SIGNUP_WINDOW_VAR: &str = "SUPPORTTWP_SIGNUP_WINDOW_SECS";
const TRUSTED_PROXIES_VAR: &str = "SUPPORTTWP_TRUSTED_PROXIES";

const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SIGNUP_BURST: u32 = 20;
const DEFAULT_SIGNUP_WINDOW_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub burst: NonZeroU32,
    pub window: Duration,
    /// Peers allowed to name the client through `X-Forwarded-For` / `X-Real-IP`.
    pub trusted_proxies: Vec<IpAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub initial_theme: Theme,
    pub signup_rate_limit: RateLimitConfig,
}

impl AppConfig {
    /// Reads the process environment, after loading `.env` when one exists.
    #[tracing::instrument(name = "load_config")]
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        tracing::info!(
            bind_addr = %config.bind_addr,
            theme = %config.initial_theme,
            signup_burst = config.signup_rate_limit.burst.get(),
            signup_window_secs = config.signup_rate_limit.window.as_secs(),
            trusted_proxies = config.signup_rate_limit.trusted_proxies.len(),
            "Configuration loaded"
        );

        Ok(config)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = parse_var(&lookup, ADDR_VAR, DEFAULT_ADDR.to_string(), |raw| {
            raw.parse::<SocketAddr>().map_err(|err| err.to_string())
        })?;

        let initial_theme = parse_var(&lookup, THEME_VAR, "light".to_string(), |raw| {
            raw.parse::<Theme>().map_err(|err| err.to_string())
        })?;

        let burst = parse_var(
            &lookup,
            SIGNUP_BURST_VAR,
            DEFAULT_SIGNUP_BURST.to_string(),
            |raw| {
                raw.parse::<NonZeroU32>()
                    .map_err(|err| format!("expected a positive integer ({err})"))
            },
        )?;

        let window_secs = parse_var(
            &lookup,
            SIGNUP_WINDOW_VAR,
            DEFAULT_SIGNUP_WINDOW_SECS.to_string(),
            |raw| match raw.parse::<u64>() {
                Ok(0) => Err("window must be at least one second".to_string()),
                Ok(secs) => Ok(secs),
                Err(err) => Err(format!("expected a positive integer ({err})")),
            },
        )?;

        let trusted_proxies = parse_var(&lookup, TRUSTED_PROXIES_VAR, String::new(), |raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(|entry| {
                    entry
                        .parse::<IpAddr>()
                        .map_err(|err| format!("'{entry}' is not an IP address ({err})"))
                })
                .collect::<Result<Vec<_>, _>>()
        })?;

        Ok(Self {
            bind_addr,
            initial_theme,
            signup_rate_limit: RateLimitConfig {
                burst,
                window: Duration::from_secs(window_secs),
                trusted_proxies,
            },
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            initial_theme: Theme::Light,
            signup_rate_limit: RateLimitConfig {
                burst: NonZeroU32::MIN.saturating_add(DEFAULT_SIGNUP_BURST - 1),
                window: Duration::from_secs(DEFAULT_SIGNUP_WINDOW_SECS),
                trusted_proxies: Vec::new(),
            },
        }
    }
}

fn parse_var<F, T, P>(
    lookup: &F,
    key: &'static str,
    default: String,
    parse: P,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Result<T, String>,
{
    let value = lookup(key).unwrap_or(default);
    parse(value.trim()).map_err(|reason| ConfigError::Invalid { key, value, reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.signup_rate_limit.burst.get(), 20);
        assert!(config.signup_rate_limit.trusted_proxies.is_empty());
    }

    #[test]
    fn test_reads_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (ADDR_VAR, "127.0.0.1:8080"),
            (THEME_VAR, "dark"),
            (SIGNUP_BURST_VAR, "3"),
            (SIGNUP_WINDOW_VAR, "300"),
            (TRUSTED_PROXIES_VAR, "10.0.0.2, ::1"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 8080)));
        assert_eq!(config.initial_theme, Theme::Dark);
        assert_eq!(config.signup_rate_limit.burst.get(), 3);
        assert_eq!(config.signup_rate_limit.window, Duration::from_secs(300));
        assert_eq!(
            config.signup_rate_limit.trusted_proxies,
            vec![
                "10.0.0.2".parse::<IpAddr>().unwrap(),
                "::1".parse::<IpAddr>().unwrap()
            ]
        );
    }

    #[test]
    fn test_bad_trusted_proxy_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[(TRUSTED_PROXIES_VAR, "10.0.0.2,proxy")]))
            .unwrap_err();
        let ConfigError::Invalid { key, reason, .. } = err;
        assert_eq!(key, TRUSTED_PROXIES_VAR);
        assert!(reason.contains("'proxy'"));
    }

    #[test]
    fn test_zero_burst_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[(SIGNUP_BURST_VAR, "0")])).unwrap_err();
        assert!(err.to_string().contains(SIGNUP_BURST_VAR));
    }

    #[test]
    fn test_zero_window_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[(SIGNUP_WINDOW_VAR, "0")])).unwrap_err();
        assert!(err.to_string().contains("at least one second"));
    }

    #[test]
    fn test_bad_address_names_variable() {
        let err = AppConfig::from_lookup(lookup_from(&[(ADDR_VAR, "not-an-addr")])).unwrap_err();
        let ConfigError::Invalid { key, value, .. } = err;
        assert_eq!(key, ADDR_VAR);
        assert_eq!(value, "not-an-addr");
    }
}
