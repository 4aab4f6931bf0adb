//! Immutable gateway configuration loaded once from the environment.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tl_xapi::{IpFamily, SessionOptions, Timeouts};

/// Configuration limits and defaults.
pub mod consts {
    use std::time::Duration;

    pub const DEFAULT_PORT: u16 = 8080;
    pub const DEFAULT_VERSION: &str = "710";
    /// Client host used in request headers when the environment names none.
    pub const DEFAULT_CLIENT_HOST: &str = "XAPICLNT";

    pub const MAX_HOSTNAME: usize = 128;
    pub const MAX_TAPEPLEX: usize = 8;
    pub const MAX_SUBSYSTEM: usize = 4;
    pub const MAX_VERSION: usize = 4;
    pub const MAX_USER: usize = 8;
    pub const MAX_GROUP: usize = 8;

    /// In-flight request slots.
    pub const MAX_REQUESTS: usize = 64;
    pub const MAX_DRIVE_TYPES: usize = 64;
    pub const MAX_MEDIA_TYPES: usize = 64;
    pub const MAX_SCRATCH_POOLS: usize = 256;
    /// Age after which the scratch pool table is rebuilt.
    pub const SCRATCH_MAX_AGE: Duration = Duration::from_secs(3600);
}

/// Environment variable names.
pub mod vars {
    pub const HOSTNAME: &str = "XAPI_HOSTNAME";
    pub const PORT: &str = "XAPI_PORT";
    pub const TAPEPLEX: &str = "XAPI_TAPEPLEX";
    pub const SUBSYSTEM: &str = "XAPI_SUBSYSTEM";
    pub const VERSION: &str = "XAPI_VERSION";
    pub const USER: &str = "XAPI_USER";
    pub const GROUP: &str = "XAPI_GROUP";
    pub const DRIVE_LIST: &str = "XAPI_DRIVE_LIST";
    pub const IP_FAMILY: &str = "XAPI_IP_FAMILY";
    pub const CLIENT_HOST: &str = "XAPI_CLIENT_HOST";
    /// Fallback for the client host name.
    pub const SYSTEM_HOSTNAME: &str = "HOSTNAME";
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{var} longer than {max} characters")]
    TooLong { var: &'static str, max: usize },
    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Connection and identity settings shared by every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XapiConfig {
    pub hostname: String,
    pub port: u16,
    pub tapeplex: String,
    pub subsystem: String,
    /// XAPI version floor sent as `els_version`.
    pub version: String,
    pub user: Option<String>,
    pub group: Option<String>,
    pub drive_list: Option<PathBuf>,
    #[serde(skip)]
    pub family: IpFamily,
    /// Name of this host as reported in request headers.
    pub client_host: String,
    #[serde(skip)]
    pub timeouts: Timeouts,
    #[serde(skip)]
    pub tick: Duration,
}

fn bounded(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    max: usize,
) -> Result<Option<String>, ConfigError> {
    match lookup(var).map(|value| value.trim().to_string()) {
        Some(value) if value.is_empty() => Ok(None),
        Some(value) if value.chars().count() > max => Err(ConfigError::TooLong { var, max }),
        other => Ok(other),
    }
}

impl XapiConfig {
    /// Minimal configuration for `hostname:port` with every optional field defaulted.
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            tapeplex: String::new(),
            subsystem: String::new(),
            version: consts::DEFAULT_VERSION.to_string(),
            user: None,
            group: None,
            drive_list: None,
            family: IpFamily::Any,
            client_host: consts::DEFAULT_CLIENT_HOST.to_string(),
            timeouts: Timeouts::default(),
            tick: tl_xapi::session::consts::TICK,
        }
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let hostname = bounded(&lookup, vars::HOSTNAME, consts::MAX_HOSTNAME)?
            .ok_or(ConfigError::Missing(vars::HOSTNAME))?;
        let port = match bounded(&lookup, vars::PORT, 5)? {
            Some(value) => value.parse::<u16>().ok().filter(|port| *port != 0).ok_or(
                ConfigError::Invalid {
                    var: vars::PORT,
                    value,
                },
            )?,
            None => consts::DEFAULT_PORT,
        };
        let tapeplex = bounded(&lookup, vars::TAPEPLEX, consts::MAX_TAPEPLEX)?
            .unwrap_or_default()
            .to_ascii_uppercase();
        let subsystem = match bounded(&lookup, vars::SUBSYSTEM, consts::MAX_SUBSYSTEM)? {
            Some(subsystem) => subsystem.to_ascii_uppercase(),
            None => tapeplex.chars().take(consts::MAX_SUBSYSTEM).collect(),
        };
        let version = bounded(&lookup, vars::VERSION, consts::MAX_VERSION)?
            .unwrap_or_else(|| consts::DEFAULT_VERSION.to_string());
        if !version.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::Invalid {
                var: vars::VERSION,
                value: version,
            });
        }
        let family = match lookup(vars::IP_FAMILY) {
            Some(value) => IpFamily::from_name(&value).ok_or(ConfigError::Invalid {
                var: vars::IP_FAMILY,
                value,
            })?,
            None => IpFamily::Any,
        };
        let client_host = bounded(&lookup, vars::CLIENT_HOST, consts::MAX_HOSTNAME)?
            .or_else(|| lookup(vars::SYSTEM_HOSTNAME).filter(|host| !host.trim().is_empty()))
            .map(|host| host.trim().to_string())
            .unwrap_or_else(|| consts::DEFAULT_CLIENT_HOST.to_string());

        Ok(Self {
            hostname,
            port,
            tapeplex,
            subsystem,
            version,
            user: bounded(&lookup, vars::USER, consts::MAX_USER)?,
            group: bounded(&lookup, vars::GROUP, consts::MAX_GROUP)?,
            drive_list: lookup(vars::DRIVE_LIST)
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
            family,
            client_host,
            timeouts: Timeouts::default(),
            tick: tl_xapi::session::consts::TICK,
        })
    }

    pub fn with_tapeplex(mut self, tapeplex: &str) -> Self {
        self.tapeplex = tapeplex.to_ascii_uppercase();
        if self.subsystem.is_empty() {
            self.subsystem = self.tapeplex.chars().take(consts::MAX_SUBSYSTEM).collect();
        }
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Numeric release, e.g. `"710"` -> 710. Servers reporting an older
    /// `els_version` are refused.
    pub fn release(&self) -> u32 {
        self.version.parse().unwrap_or(0)
    }

    /// Session settings for one exchange with the configured server.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::new(self.hostname.clone(), self.port)
            .with_family(self.family)
            .with_timeouts(self.timeouts)
            .with_tick(self.tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = XapiConfig::from_lookup(env(&[
            ("XAPI_HOSTNAME", "mvs1.example.com"),
            ("XAPI_TAPEPLEX", "hscq"),
        ]))
        .expect("config");
        assert_eq!(config.port, 8080);
        assert_eq!(config.tapeplex, "HSCQ");
        assert_eq!(config.subsystem, "HSCQ");
        assert_eq!(config.version, "710");
        assert_eq!(config.release(), 710);
        assert_eq!(config.family, IpFamily::Any);
        assert_eq!(config.client_host, "XAPICLNT");
        assert!(config.user.is_none());
    }

    #[test]
    fn subsystem_defaults_to_tapeplex_prefix() {
        let config = XapiConfig::from_lookup(env(&[
            ("XAPI_HOSTNAME", "h"),
            ("XAPI_TAPEPLEX", "TPLEX01"),
            ("HOSTNAME", "client-box"),
        ]))
        .expect("config");
        assert_eq!(config.subsystem, "TPLE");
        assert_eq!(config.client_host, "client-box");
    }

    #[test]
    fn missing_and_invalid_values_are_rejected() {
        assert_eq!(
            XapiConfig::from_lookup(env(&[])),
            Err(ConfigError::Missing("XAPI_HOSTNAME"))
        );
        assert!(matches!(
            XapiConfig::from_lookup(env(&[("XAPI_HOSTNAME", "h"), ("XAPI_PORT", "http")])),
            Err(ConfigError::Invalid { var: "XAPI_PORT", .. })
        ));
        assert_eq!(
            XapiConfig::from_lookup(env(&[("XAPI_HOSTNAME", "h"), ("XAPI_USER", "TOOLONGUSER")])),
            Err(ConfigError::TooLong {
                var: "XAPI_USER",
                max: 8
            })
        );
        assert!(matches!(
            XapiConfig::from_lookup(env(&[("XAPI_HOSTNAME", "h"), ("XAPI_IP_FAMILY", "ipx")])),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn session_options_carry_family_and_port() {
        let config = XapiConfig::from_lookup(env(&[
            ("XAPI_HOSTNAME", "h"),
            ("XAPI_PORT", "9000"),
            ("XAPI_IP_FAMILY", "ipv4"),
        ]))
        .expect("config");
        let options = config.session_options();
        assert_eq!(options.port, 9000);
        assert_eq!(options.family, IpFamily::V4);
    }

    #[test]
    fn serializes_without_transport_details() {
        let config = XapiConfig::new("h", 1);
        let json = serde_json::to_value(&config).expect("json");
        assert_eq!(json["hostname"], "h");
        assert!(json.get("family").is_none());
    }
}
