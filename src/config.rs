use std::{env, path::PathBuf, sync::Arc, time::Duration};

use crate::error::SimResult;
use crate::vehicle::profile::VehicleProfile;
use crate::world::WorldSettings;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9001";
pub const DEFAULT_TICK_HZ: u32 = 60;
pub const DEFAULT_SNAPSHOT_EVERY: u64 = 3;
pub const DEFAULT_RIVALS: usize = 1;
pub const DEFAULT_POLICE: usize = 2;
const MAX_TICK_HZ: u32 = 1_000;

/// Server configuration read from `SOULVAN_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub bind_addr: String,
    pub tick_hz: u32,
    pub snapshot_every: u64,
    pub rivals: usize,
    pub police: usize,
    pub seed: Option<u64>,
    pub profile_path: Option<PathBuf>,
    pub time_limit: Option<f32>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            tick_hz: DEFAULT_TICK_HZ,
            snapshot_every: DEFAULT_SNAPSHOT_EVERY,
            rivals: DEFAULT_RIVALS,
            police: DEFAULT_POLICE,
            seed: None,
            profile_path: None,
            time_limit: None,
        }
    }
}

impl SimConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as `from_env` with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut tick_hz = read_u32(&lookup, "SOULVAN_TICK_HZ", DEFAULT_TICK_HZ);
        if tick_hz > MAX_TICK_HZ {
            tracing::warn!(
                "SOULVAN_TICK_HZ ({}) is above {}. Falling back to {}.",
                tick_hz,
                MAX_TICK_HZ,
                DEFAULT_TICK_HZ
            );
            tick_hz = DEFAULT_TICK_HZ;
        }

        Self {
            bind_addr: lookup("SOULVAN_BIND_ADDR")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            tick_hz,
            snapshot_every: read_u64(&lookup, "SOULVAN_SNAPSHOT_EVERY", DEFAULT_SNAPSHOT_EVERY),
            rivals: read_usize_allow_zero(&lookup, "SOULVAN_RIVALS", DEFAULT_RIVALS),
            police: read_usize_allow_zero(&lookup, "SOULVAN_POLICE", DEFAULT_POLICE),
            seed: read_optional(&lookup, "SOULVAN_SEED", |v| v.parse::<u64>().ok()),
            profile_path: lookup("SOULVAN_PROFILE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            time_limit: read_optional(&lookup, "SOULVAN_TIME_LIMIT", |v| {
                v.parse::<f32>().ok().filter(|t| t.is_finite() && *t > 0.0)
            }),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }

    pub fn dt(&self) -> f32 {
        1.0 / self.tick_hz.max(1) as f32
    }

    pub fn world_settings(&self) -> WorldSettings {
        WorldSettings {
            time_limit: self.time_limit,
            seed: self.seed,
            snapshot_every: self.snapshot_every,
            ..WorldSettings::default()
        }
    }

    /// Player car profile: the JSON file when configured, else the street racer.
    pub fn player_profile(&self) -> SimResult<Arc<VehicleProfile>> {
        match &self.profile_path {
            Some(path) => Ok(Arc::new(VehicleProfile::from_json_file(path)?)),
            None => Ok(Arc::new(VehicleProfile::street_racer())),
        }
    }
}

fn read_parsed<T, F>(lookup: &F, name: &str, default: T, parse: impl Fn(&str) -> Option<T>) -> T
where
    T: std::fmt::Display + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => default,
        Some(raw) => match parse(raw.trim()) {
            Some(value) => value,
            None => {
                tracing::warn!("{} ({:?}) is invalid. Falling back to {}.", name, raw, default);
                default
            }
        },
    }
}

fn read_u32(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: u32) -> u32 {
    read_parsed(lookup, name, default, |v| v.parse::<u32>().ok().filter(|v| *v > 0))
}

fn read_u64(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: u64) -> u64 {
    read_parsed(lookup, name, default, |v| v.parse::<u64>().ok().filter(|v| *v > 0))
}

fn read_usize_allow_zero(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: usize) -> usize {
    read_parsed(lookup, name, default, |v| v.parse::<usize>().ok())
}

fn read_optional<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = lookup(name)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        tracing::warn!("{} ({:?}) is invalid. Ignoring it.", name, raw);
    }
    parsed
}
