use std::fs;
use std::io;
use std::path::PathBuf;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const CONFIG_PATH_ENV: &str = "ZOMBIE_FARM_CONFIG_PATH";

/// Rules of the progression engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RulesConfig {
    pub initial_time_secs: u32,
    pub max_lives: u32,
    /// Victory bonus is `floor(time_left / time_bonus_divisor)`.
    pub time_bonus_divisor: u32,
    /// Remaining-time marks (seconds) that raise a warning notification.
    pub warning_thresholds_secs: Vec<u32>,
    /// Wall-clock period between `tick()` calls for the shells.
    pub tick_interval_ms: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            initial_time_secs: 45 * 60,
            max_lives: 3,
            time_bonus_divisor: 10,
            warning_thresholds_secs: vec![300, 60],
            tick_interval_ms: 1_000,
        }
    }
}

/// Geometry of the farm as far as movement and interaction are concerned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    pub player_speed: f32,
    pub interaction_distance: f32,
    /// Player x/z are clamped to `-half_extent..=half_extent`.
    pub half_extent: f32,
    pub player_spawn: Vec3,
    /// Camera position relative to the player (x is ignored, the camera tracks x exactly).
    pub camera_offset: Vec3,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            player_speed: 0.1,
            interaction_distance: 3.0,
            half_extent: 40.0,
            player_spawn: Vec3::new(0.0, 0.75, 10.0),
            camera_offset: Vec3::new(0.0, 5.0, 10.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub world: WorldConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            rules: RulesConfig::default(),
            world: WorldConfig::default(),
        }
    }
}

impl RulesConfig {
    pub fn sanitized(mut self) -> Self {
        let defaults = RulesConfig::default();
        self.max_lives = self.max_lives.clamp(1, defaults.max_lives);
        self.initial_time_secs = self.initial_time_secs.max(1);
        self.time_bonus_divisor = self.time_bonus_divisor.max(1);
        self.tick_interval_ms = self.tick_interval_ms.max(1);
        self.warning_thresholds_secs.sort_unstable_by(|a, b| b.cmp(a));
        self.warning_thresholds_secs.dedup();
        self
    }
}

/// Largest accepted `half_extent`; the farm layout itself fits inside the default 40.
pub const MAX_HALF_EXTENT: f32 = 200.0;

impl WorldConfig {
    pub fn sanitized(mut self) -> Self {
        let defaults = WorldConfig::default();
        if !(self.player_speed.is_finite() && self.player_speed > 0.0) {
            self.player_speed = defaults.player_speed;
        }
        if !(self.interaction_distance.is_finite() && self.interaction_distance > 0.0) {
            self.interaction_distance = defaults.interaction_distance;
        }
        if !(self.half_extent.is_finite() && self.half_extent > 0.0) {
            self.half_extent = defaults.half_extent;
        }
        self.half_extent = self.half_extent.min(MAX_HALF_EXTENT);
        if !self.player_spawn.is_finite() {
            self.player_spawn = defaults.player_spawn;
        }
        if !self.camera_offset.is_finite() {
            self.camera_offset = defaults.camera_offset;
        }
        self
    }
}

impl GameConfig {
    pub fn sanitized(self) -> Self {
        Self {
            version: default_version(),
            rules: self.rules.sanitized(),
            world: self.world.sanitized(),
        }
    }
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        Self::resolve(|k| std::env::var_os(k).map(|v| v.to_string_lossy().into_owned()))
    }

    /// Picks the config path from `ZOMBIE_FARM_CONFIG_PATH`, then `$XDG_CONFIG_HOME`, then
    /// `$HOME/.config`, falling back to the working directory.
    pub fn resolve<F>(mut get_env: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(explicit) = get_env(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return Self::new(explicit);
        }

        let base = get_env("XDG_CONFIG_HOME")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                get_env("HOME").map(|home| {
                    let mut p = PathBuf::from(home);
                    p.push(".config");
                    p
                })
            })
            .unwrap_or_else(|| PathBuf::from("."));

        let mut path = base;
        path.push("zombie-farm");
        path.push("config.json");
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Missing file means defaults; an unreadable or malformed file is logged and ignored.
    pub fn load(&self) -> GameConfig {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return GameConfig::default(),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "could not read config, using defaults");
                return GameConfig::default();
            }
        };

        match serde_json::from_slice::<GameConfig>(&bytes) {
            Ok(config) => config.sanitized(),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "invalid config, using defaults");
                GameConfig::default()
            }
        }
    }

    pub fn save(&self, config: &GameConfig) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(config)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, text)
    }
}
