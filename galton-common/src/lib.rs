pub mod config;
pub mod error;
pub mod params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{BoardConfig, OutputConfig, ParticleConfig, SimulationConfig, SpawnConfig, TimingConfig, WorldConfig};
pub use error::{ConfigError, StatisticError};
pub use params::{FormValues, ParameterSet, FIXED_FORM_ROW_COUNT};
pub use snapshot::Snapshot;
pub use vecmath::{clamp, Vec2};
