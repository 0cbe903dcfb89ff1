use std::env;
use std::path::PathBuf;
use std::time::Duration;

use compute::{ClusterConfig, DEFAULT_ROOM_RADIUS_M};
use runtime::PositionOptions;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub state_dir: PathBuf,
    pub topology_path: PathBuf,
    pub members_path: PathBuf,
    pub room_radius_m: f64,
    pub locate_timeout: Duration,
    pub position_max_age: Duration,
    pub cluster: ClusterConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unset or unparsable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str, default: &str| PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()));
        let secs = |key: &str, default: u64| {
            Duration::from_secs(lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default))
        };
        Self {
            state_dir: path("WATAKOKO_STATE_DIR", ".watakoko"),
            topology_path: path("WATAKOKO_TOPOLOGY", "building_info.json"),
            members_path: path("WATAKOKO_MEMBERS", "members_loc.json"),
            room_radius_m: lookup("WATAKOKO_ROOM_RADIUS_M")
                .and_then(|v| parse_radius(&v).ok())
                .unwrap_or(DEFAULT_ROOM_RADIUS_M),
            locate_timeout: secs("WATAKOKO_LOCATE_TIMEOUT_S", 10),
            position_max_age: secs("WATAKOKO_POSITION_MAX_AGE_S", 300),
            cluster: ClusterConfig::default(),
        }
    }

    pub fn position_options(&self) -> PositionOptions {
        PositionOptions {
            timeout: self.locate_timeout,
            maximum_age: self.position_max_age,
            high_accuracy: true,
        }
    }
}

/// Room search radius in meters: finite and non-negative.
pub fn parse_radius(raw: &str) -> Result<f64, String> {
    let r: f64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("invalid radius {raw:?}: {e}"))?;
    if r.is_finite() && r >= 0.0 {
        Ok(r)
    } else {
        Err(format!("radius must be a finite, non-negative number of meters, got {raw:?}"))
    }
}
