//! Minimal runtime configuration helpers.
//! Defaults match the refresh cadence of the evohome web app.

use crate::model::SystemSelector;
use std::time::Duration;
use std::{fs, path::Path};

pub const DEFAULT_TEMPERATURE_SECS: u64 = 2;
pub const DEFAULT_SCHEDULE_SECS: u64 = 5;
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 60;
pub const DEFAULT_REPORT_SECS: u64 = 30;

/// Cadence of the background refresh threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub temperature_interval: Duration,
    pub schedule_interval: Duration,
    /// Upper bound for the wait after repeated failed ticks.
    pub max_backoff: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            temperature_interval: Duration::from_secs(DEFAULT_TEMPERATURE_SECS),
            schedule_interval: Duration::from_secs(DEFAULT_SCHEDULE_SECS),
            max_backoff: Duration::from_secs(DEFAULT_MAX_BACKOFF_SECS),
        }
    }
}

impl SyncConfig {
    /// The shortest refresh interval; no single request should outlive it.
    pub fn shortest_interval(&self) -> Duration {
        self.temperature_interval.min(self.schedule_interval)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub sync: SyncConfig,
    /// Deadline for each HTTP request.
    pub request_timeout: Duration,
    pub selector: SystemSelector,
    /// How often the binary logs a zone summary.
    pub report_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let username = match std::env::var("EVOHOME_USERNAME") {
            Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
            _ => return Err("Missing username: set EVOHOME_USERNAME".to_string()),
        };
        // Prefer env var; fallback to password.txt in working directory
        let password = match std::env::var("EVOHOME_PASSWORD") {
            Ok(v) if !v.is_empty() => v,
            _ => match fs::read_to_string(Path::new("password.txt")) {
                Ok(s) if !s.trim().is_empty() => s.trim().to_string(),
                _ => {
                    return Err(
                        "Missing password: set EVOHOME_PASSWORD or provide password.txt in working directory"
                            .to_string(),
                    );
                }
            },
        };

        let sync = SyncConfig {
            temperature_interval: secs_var("EVOHOME_TEMPERATURE_INTERVAL_SECS", DEFAULT_TEMPERATURE_SECS)?,
            schedule_interval: secs_var("EVOHOME_SCHEDULE_INTERVAL_SECS", DEFAULT_SCHEDULE_SECS)?,
            max_backoff: secs_var("EVOHOME_MAX_BACKOFF_SECS", DEFAULT_MAX_BACKOFF_SECS)?,
        };
        let request_timeout = secs_var("EVOHOME_REQUEST_TIMEOUT_SECS", sync.shortest_interval().as_secs())?;
        if request_timeout > sync.shortest_interval() {
            return Err(format!(
                "EVOHOME_REQUEST_TIMEOUT_SECS ({}) must not exceed the shortest refresh interval ({}s)",
                request_timeout.as_secs(),
                sync.shortest_interval().as_secs()
            ));
        }

        let selector = SystemSelector::new(
            index_var("EVOHOME_INSTALLATION")?,
            index_var("EVOHOME_GATEWAY")?,
            index_var("EVOHOME_SYSTEM")?,
        );

        Ok(Config {
            username,
            password,
            sync,
            request_timeout,
            selector,
            report_interval: secs_var("EVOHOME_REPORT_INTERVAL_SECS", DEFAULT_REPORT_SECS)?,
        })
    }
}

fn secs_var(name: &str, default: u64) -> Result<Duration, String> {
    let secs = match std::env::var(name) {
        Ok(s) if !s.trim().is_empty() => s
            .trim()
            .parse::<u64>()
            .map_err(|_| format!("{name} must be a whole number of seconds"))?,
        _ => default,
    };
    if secs == 0 {
        return Err(format!("{name} must be at least 1 second"));
    }
    Ok(Duration::from_secs(secs))
}

fn index_var(name: &str) -> Result<usize, String> {
    match std::env::var(name) {
        Ok(s) if !s.trim().is_empty() => s
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("{name} must be a non-negative index")),
        _ => Ok(0),
    }
}
