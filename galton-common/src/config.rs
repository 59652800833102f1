use crate::error::{ConfigError, Result};
use crate::params::ParameterSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// World extent. The board is centred horizontally at width / 2.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    /// Vertical gravity scale handed to the physics world.
    pub gravity_y: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig { width: 1600.0, height: 1600.0, gravity_y: 1.0 }
    }
}

// Peg lattice geometry.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BoardConfig {
    pub peg_radius: f32,
    pub column_spacing: f32,
    pub row_spacing: f32,
    pub row_count: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig { peg_radius: 10.0, column_spacing: 80.0, row_spacing: 40.0, row_count: 9 }
    }
}

// Radius and material of the falling particles.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ParticleConfig {
    pub radius: f32,
    pub density: f32,
    pub restitution: f32,
    pub friction: f32,
    pub air_friction: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        ParticleConfig {
            radius: 10.0,
            density: 0.1,
            restitution: 0.5,
            friction: 0.01,
            air_friction: 0.01,
        }
    }
}

// Spawn rate and the two independent jitter toggles.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SpawnConfig {
    /// Particles per second.
    pub rate: f32,
    /// Perturb the spawn x by a uniform offset in [-1, 1].
    pub random_offset: bool,
    /// Give each particle an initial horizontal velocity in [-1, 1].
    pub random_velocity: bool,
    /// Seed for the jitter RNG. `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Start spawning as soon as the run begins.
    pub autostart: bool,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        SpawnConfig {
            rate: 2.0,
            random_offset: true,
            random_velocity: true,
            seed: None,
            autostart: true,
        }
    }
}

// Stepping and recording cadence, in simulation time.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub physics_dt_ms: f32,
    pub total_time_s: f32,
    pub record_interval_ms: f32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig { physics_dt_ms: 1000.0 / 60.0, total_time_s: 150.0, record_interval_ms: 1000.0 }
    }
}

// Output settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_stats: bool,
    pub save_histogram: bool,
    pub save_positions: bool,
    pub save_positions_in_snapshot: bool,
    /// Snapshot format: "json", "bincode" or "messagepack".
    pub format: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: "galton".to_string(),
            save_stats: true,
            save_histogram: true,
            save_positions: false,
            save_positions_in_snapshot: false,
            format: None,
        }
    }
}

/// Run configuration, loaded from config.toml.
///
/// Every section and field is optional; whatever is missing takes the stock
/// bean machine defaults.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SimulationConfig {
    pub world: WorldConfig,
    pub board: BoardConfig,
    pub particle: ParticleConfig,
    pub spawn: SpawnConfig,
    pub timing: TimingConfig,
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads and validates the configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&config_str, &path_ref.display().to_string())
    }

    /// Parses and validates a configuration held in memory. `origin` only
    /// labels parse errors.
    pub fn from_toml_str(input: &str, origin: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(input).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the board parameters together with the run settings.
    pub fn validate(&self) -> Result<()> {
        self.parameter_set().validate()?;

        if !(self.world.width > 0.0 && self.world.height > 0.0) {
            return Err(ConfigError::InvalidSetting(format!(
                "world must have a positive size (got {}x{})",
                self.world.width, self.world.height
            )));
        }
        let dt = Duration::try_from_secs_f64(f64::from(self.timing.physics_dt_ms) / 1000.0);
        if !(self.timing.physics_dt_ms > 0.0 && dt.is_ok_and(|dt| !dt.is_zero())) {
            return Err(ConfigError::InvalidSetting(format!(
                "physics_dt_ms must be positive (got {})",
                self.timing.physics_dt_ms
            )));
        }
        if !(self.timing.total_time_s >= 0.0 && self.timing.total_time_s.is_finite()) {
            return Err(ConfigError::InvalidSetting(format!(
                "total_time_s must not be negative (got {})",
                self.timing.total_time_s
            )));
        }
        if !self.timing.record_interval_ms.is_finite() {
            return Err(ConfigError::InvalidSetting("record_interval_ms must be finite".to_string()));
        }
        Ok(())
    }

    /// Collects the board, particle and world fields into a [`ParameterSet`].
    pub fn parameter_set(&self) -> ParameterSet {
        ParameterSet {
            peg_radius: self.board.peg_radius,
            column_spacing: self.board.column_spacing,
            row_spacing: self.board.row_spacing,
            particle_radius: self.particle.radius,
            density: self.particle.density,
            restitution: self.particle.restitution,
            friction: self.particle.friction,
            air_friction: self.particle.air_friction,
            row_count: self.board.row_count,
            gravity_y: self.world.gravity_y,
            spawn_rate: self.spawn.rate,
        }
    }

    /// Physics step length as a [`Duration`]; zero unless validated.
    pub fn physics_dt(&self) -> Duration {
        Duration::try_from_secs_f64(f64::from(self.timing.physics_dt_ms) / 1000.0).unwrap_or_default()
    }

    /// Horizontal centre of the board.
    pub fn center_x(&self) -> f32 {
        self.world.width / 2.0
    }
}
