use crate::error::ConfigError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Service settings, read from `TIMETABLE_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Solver budget for requests that do not set `timeout`.
    pub default_timeout: Duration,
    pub solver_threads: u32,
    pub solver_log: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            default_timeout: Duration::from_secs(30),
            solver_threads: 1,
            solver_log: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let timeout_secs: u64 = parse(&lookup, "TIMETABLE_DEFAULT_TIMEOUT_SECS")?
            .unwrap_or(defaults.default_timeout.as_secs());
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "TIMETABLE_DEFAULT_TIMEOUT_SECS",
                value: timeout_secs.to_string(),
                reason: "must be at least one second".to_string(),
            });
        }

        Ok(Self {
            bind_addr: parse(&lookup, "TIMETABLE_BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            default_timeout: Duration::from_secs(timeout_secs),
            solver_threads: parse(&lookup, "TIMETABLE_SOLVER_THREADS")?
                .unwrap_or(defaults.solver_threads),
            solver_log: parse(&lookup, "TIMETABLE_SOLVER_LOG")?.unwrap_or(defaults.solver_log),
        })
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
    }
}
