//! Server configuration
//!
//! All tunables come from the environment with workable defaults; the
//! only genuinely deployment-specific value is the automation project
//! root, which holds the playbooks, roles and the operator vars file.

use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: String,

    /// Root of the automation content (playbooks, roles/, vars/).
    pub project_root: PathBuf,

    /// Sleep between WebSocket poll iterations.
    pub ws_poll_interval: Duration,

    /// How long a successful CLI auth probe stays fresh.
    pub auth_status_ttl: Duration,

    /// How long a successful hub connection probe stays fresh. Longer
    /// than the auth TTL since connection tests are slower.
    pub hub_status_ttl: Duration,
}

impl Config {
    /// Creates configuration from environment variables.
    ///
    /// - `GANTRY_BIND_ADDR` (default: 0.0.0.0:8000)
    /// - `GANTRY_PROJECT_ROOT` (default: current directory)
    /// - `GANTRY_WS_POLL_INTERVAL` (seconds, default: 2)
    /// - `GANTRY_AUTH_STATUS_TTL` (seconds, default: 30)
    /// - `GANTRY_HUB_STATUS_TTL` (seconds, default: 60)
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("GANTRY_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());

        let project_root = std::env::var("GANTRY_PROJECT_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        Self {
            bind_addr,
            project_root,
            ws_poll_interval: env_secs("GANTRY_WS_POLL_INTERVAL", 2),
            auth_status_ttl: env_secs("GANTRY_AUTH_STATUS_TTL", 30),
            hub_status_ttl: env_secs("GANTRY_HUB_STATUS_TTL", 60),
        }
    }

    /// Path of the operator vars file under the project root.
    pub fn vars_path(&self) -> PathBuf {
        self.project_root.join("vars").join("user_vars.yml")
    }

    /// Validates the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.ws_poll_interval.is_zero() {
            anyhow::bail!("ws_poll_interval must be greater than 0");
        }

        if self.auth_status_ttl.is_zero() || self.hub_status_ttl.is_zero() {
            anyhow::bail!("status cache TTLs must be greater than 0");
        }

        Ok(())
    }
}

fn env_secs(var: &str, default: u64) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(default))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            project_root: PathBuf::from("."),
            ws_poll_interval: Duration::from_secs(2),
            auth_status_ttl: Duration::from_secs(30),
            hub_status_ttl: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ws_poll_interval, Duration::from_secs(2));
        assert_eq!(config.auth_status_ttl, Duration::from_secs(30));
        assert_eq!(config.hub_status_ttl, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_vars_path() {
        let config = Config {
            project_root: PathBuf::from("/opt/automation"),
            ..Config::default()
        };
        assert_eq!(
            config.vars_path(),
            PathBuf::from("/opt/automation/vars/user_vars.yml")
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.bind_addr = String::new();
        assert!(config.validate().is_err());

        config.bind_addr = "0.0.0.0:8000".to_string();
        config.ws_poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        config.ws_poll_interval = Duration::from_secs(2);
        config.auth_status_ttl = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
