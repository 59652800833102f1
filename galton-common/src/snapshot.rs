use serde::{Deserialize, Serialize};

/// Histogram and deviation at one point in simulation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Simulation time in seconds.
    pub time: f32,
    /// Particles created by the spawn scheduler since the last rebuild.
    pub spawned: u32,
    /// Per-bin counts; `counts[i]` is partition `i + 1`.
    pub counts: Vec<u32>,
    /// Sum of `counts`.
    pub collected: u32,
    /// Countable particles still above the bin floor.
    pub pending: u32,
    /// Particles below the bin floor but outside every bin.
    pub excluded: u32,
    /// Deviation from the reference normal shape, rounded to 2 decimals.
    pub deviation: f64,
    #[serde(skip_serializing_if = "Option::is_none")] // Don't write "positions": null
    pub positions: Option<Vec<(f32, f32)>>,
}
