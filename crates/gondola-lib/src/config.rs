//! Runtime configuration for route planning and dispatch.
//!
//! # Environment Variables
//!
//! - `GONDOLA_SPEED_KMH`: cruising speed used for travel-time estimates
//! - `GONDOLA_MAX_EXPANSIONS`: expansion budget per search (unbounded when unset)
//! - `GONDOLA_COMMIT_ATTEMPTS`: dispatch evaluate/commit rounds before giving up
//! - `GONDOLA_PERSIST_ATTEMPTS`: repository write attempts before rolling back
//! - `GONDOLA_DATABASE`: fleet database location

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::network::SearchOptions;

const DATABASE_FILENAME: &str = "gondola.db";
const DATABASE_ENV: &str = "GONDOLA_DATABASE";

/// Tunables shared by route planning and dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Gondola cruising speed in km/h.
    pub gondola_speed_kmh: f64,
    /// Expansion budget for every search; `None` means unbounded.
    pub max_expansions: Option<usize>,
    /// Evaluate/commit rounds a dispatch may lose to concurrent requests.
    pub commit_attempts: u32,
    /// Repository write attempts before an in-memory commit is rolled back.
    pub persist_attempts: u32,
    /// Delay before the first repository retry; doubled on each retry.
    pub persist_backoff_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            gondola_speed_kmh: 50.0,
            max_expansions: None,
            commit_attempts: 3,
            persist_attempts: 3,
            persist_backoff_ms: 50,
        }
    }
}

impl DispatchConfig {
    /// Defaults overridden by any `GONDOLA_*` variables that parse.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(speed) = env_value::<f64>("GONDOLA_SPEED_KMH") {
            if speed > 0.0 {
                config.gondola_speed_kmh = speed;
            } else {
                warn!(speed, "ignoring non-positive GONDOLA_SPEED_KMH");
            }
        }
        if let Some(limit) = env_value::<usize>("GONDOLA_MAX_EXPANSIONS") {
            config.max_expansions = Some(limit);
        }
        if let Some(attempts) = env_value::<u32>("GONDOLA_COMMIT_ATTEMPTS") {
            config.commit_attempts = attempts.max(1);
        }
        if let Some(attempts) = env_value::<u32>("GONDOLA_PERSIST_ATTEMPTS") {
            config.persist_attempts = attempts.max(1);
        }
        config
    }

    /// Minutes needed to travel one meter at cruising speed.
    pub fn minutes_per_meter(&self) -> f64 {
        60.0 / (self.gondola_speed_kmh * 1000.0)
    }

    /// Travel time in minutes for a path of `meters`.
    pub fn travel_minutes(&self, meters: f64) -> f64 {
        meters * self.minutes_per_meter()
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            max_expansions: self.max_expansions,
        }
    }

    pub(crate) fn persist_backoff(&self, retry: u32) -> Duration {
        Duration::from_millis(self.persist_backoff_ms.saturating_mul(1 << retry.min(10)))
    }
}

fn env_value<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

/// Resolve the fleet database path: explicit override, then
/// `GONDOLA_DATABASE`, then the platform data directory.
pub fn resolve_database_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(DATABASE_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    default_database_path()
}

/// Default database location inside the platform data directory.
pub fn default_database_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("org", "gondola", "gondola").ok_or(Error::ProjectDirsUnavailable)?;
    Ok(dirs.data_dir().join(DATABASE_FILENAME))
}
