//! Configuration module for environment variable parsing.
//!
//! Only the binary reads the environment; the library takes everything it
//! needs as arguments.

use std::env;
use tracing::warn;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Secret expected in `hub.verify_token` during the subscription handshake
    pub verify_token: Option<String>,

    /// Path the webhook endpoint is mounted at
    pub webhook_path: String,

    /// Buffered updates before a POST waits for the consumer (0 = rendezvous)
    pub update_channel_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_var("PORT", 8080),

            verify_token: env::var("VERIFY_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),

            webhook_path: parse_path("WEBHOOK_PATH", "/webhook"),

            update_channel_capacity: parse_var("UPDATE_CHANNEL_CAPACITY", 0),
        }
    }
}

/// Parse a variable, falling back to `default` when unset or invalid.
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Parse a route path; it must start with `/`.
fn parse_path(name: &str, default: &str) -> String {
    let raw = match env::var(name) {
        Ok(v) => v.trim().to_string(),
        Err(_) => return default.to_string(),
    };

    if !raw.starts_with('/') {
        warn!(env_var = name, value = %raw, "Invalid path, using default");
        return default.to_string();
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_valid() {
        env::set_var("TEST_CAPACITY", " 16 ");
        assert_eq!(parse_var::<usize>("TEST_CAPACITY", 0), 16);
        env::remove_var("TEST_CAPACITY");
    }

    #[test]
    fn test_parse_var_invalid() {
        env::set_var("TEST_PORT", "not-a-port");
        assert_eq!(parse_var::<u16>("TEST_PORT", 8080), 8080);
        env::remove_var("TEST_PORT");
    }

    #[test]
    fn test_parse_var_default() {
        assert_eq!(parse_var::<u16>("NONEXISTENT_VAR", 10), 10);
    }

    #[test]
    fn test_parse_path() {
        env::set_var("TEST_PATH", "/hooks/messenger");
        assert_eq!(parse_path("TEST_PATH", "/webhook"), "/hooks/messenger");

        env::set_var("TEST_PATH", "hooks");
        assert_eq!(parse_path("TEST_PATH", "/webhook"), "/webhook");
        env::remove_var("TEST_PATH");
    }
}
