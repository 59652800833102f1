use crate::binning::{BinningEngine, Histogram};
use crate::deviation::{deviation, Deviation};
use crate::layout::BoardLayout;
use crate::physics::{BodySpec, Material, PhysicsWorld, PositionSource, REFERENCE_FRAME_S};
use crate::scheduler::{SchedulerState, SpawnJitter, SpawnRequest, SpawnScheduler};
use anyhow::Result;
use galton_common::{ConfigError, FormValues, ParameterSet, SimulationConfig, Snapshot, Vec2};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

/// Histogram plus its deviation score for one moment of the run.
#[derive(Debug, Clone, PartialEq)]
pub struct BinReport {
    pub histogram: Histogram,
    pub deviation: Deviation,
}

impl BinReport {
    /// Counts the particles `source` reports against `layout` and scores the
    /// result.
    pub fn compute<S>(layout: &BoardLayout, source: &S, particle_radius: f32) -> Self
    where
        S: PositionSource + ?Sized,
    {
        let histogram = BinningEngine::new(layout).histogram_from_source(source, particle_radius);
        // A built layout always has at least one bin.
        let deviation = deviation(histogram.counts()).unwrap_or_default();
        BinReport { histogram, deviation }
    }
}

/// One bean machine run: the active board, its spawn scheduler and the
/// physics world the particles live in.
///
/// All board changes go through [`SimulationState::rebuild`], which swaps in
/// a complete new layout and stops spawning before anything can observe it.
pub struct SimulationState<W: PhysicsWorld> {
    config: SimulationConfig,
    params: ParameterSet,
    layout: BoardLayout,
    scheduler: SpawnScheduler,
    world: W,
    /// Simulation time since the state was created.
    clock: Duration,
    recorded_snapshots: Vec<Snapshot>,
}

impl<W: PhysicsWorld> SimulationState<W> {
    /// Builds the board described by `config` inside `world`.
    pub fn new(config: SimulationConfig, mut world: W) -> Result<Self> {
        let params = config.parameter_set();
        let layout = BoardLayout::build(&params, config.center_x())?;

        let rng = match config.spawn.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let jitter = SpawnJitter {
            random_offset: config.spawn.random_offset,
            random_velocity: config.spawn.random_velocity,
        };
        let scheduler = SpawnScheduler::new(params.spawn_interval(), spawn_point(&layout), jitter, rng);

        populate_world(&mut world, &layout, &params);
        info!(
            "Board ready: {} rows, {} bins between x={:.1} and x={:.1}.",
            layout.row_count(),
            layout.bin_count(),
            layout.bin_boundaries()[0],
            layout.bin_boundaries()[layout.bin_count()]
        );

        Ok(SimulationState {
            config,
            params,
            layout,
            scheduler,
            world,
            clock: Duration::ZERO,
            recorded_snapshots: Vec::new(),
        })
    }

    /// Replaces the board with one built from `params`.
    ///
    /// On error nothing changes: the old board, particles and spawn counter
    /// stay as they were. On success spawning is stopped, the counter is
    /// zeroed, every body is removed and the new board is registered. Spawning
    /// stays stopped until [`SimulationState::start_spawning`].
    pub fn rebuild(&mut self, params: ParameterSet) -> Result<(), ConfigError> {
        let layout = BoardLayout::build(&params, self.config.center_x())?;

        self.scheduler.reconfigure(params.spawn_interval(), spawn_point(&layout));
        self.world.clear();
        populate_world(&mut self.world, &layout, &params);

        info!(
            "Rebuilt board: {} -> {} rows, spawn interval {} ms.",
            self.layout.row_count(),
            layout.row_count(),
            params.spawn_interval().as_millis()
        );
        debug!("New parameters: {:#?}", params);
        self.layout = layout;
        self.params = params;
        Ok(())
    }

    /// Form update path: row count is pinned, everything else is taken as
    /// entered.
    pub fn apply_form(&mut self, form: &FormValues) -> Result<(), ConfigError> {
        if form.row_count != galton_common::FIXED_FORM_ROW_COUNT {
            warn!(
                "Ignoring row_count {} from form; rows are fixed at {}.",
                form.row_count,
                galton_common::FIXED_FORM_ROW_COUNT
            );
        }
        self.rebuild(ParameterSet::from_form(form)?)
    }

    /// Restores the stock parameters and rebuilds.
    pub fn reset_parameters(&mut self) -> Result<(), ConfigError> {
        self.rebuild(ParameterSet::default())
    }

    pub fn start_spawning(&mut self) -> bool {
        self.scheduler.start(self.clock)
    }

    pub fn stop_spawning(&mut self) -> bool {
        self.scheduler.stop()
    }

    pub fn toggle_spawning(&mut self) -> SchedulerState {
        self.scheduler.toggle(self.clock)
    }

    /// Advances the run by `dt`: hands due spawn requests to the world, steps
    /// the world, and bins the particles once the step has settled.
    pub fn step(&mut self, dt: Duration) -> BinReport {
        self.clock += dt;

        for request in self.scheduler.poll(self.clock) {
            let spec = particle_spec(&request, &self.params);
            self.world.add_body(spec);
        }

        let layout = &self.layout;
        let particle_radius = self.params.particle_radius;
        let mut report = None;
        self.world.step(dt, |world| {
            report = Some(BinReport::compute(layout, world, particle_radius));
        });
        report.unwrap_or_else(|| self.report())
    }

    /// Bins the world as it is right now.
    pub fn report(&self) -> BinReport {
        BinReport::compute(&self.layout, &self.world, self.params.particle_radius)
    }

    /// Records the current histogram as a [`Snapshot`].
    pub fn record_snapshot(&mut self) -> &Snapshot {
        let report = self.report();
        let positions = self.config.output.save_positions_in_snapshot.then(|| self.particle_positions());

        let snapshot = Snapshot {
            time: self.clock.as_secs_f32(),
            spawned: self.scheduler.spawned(),
            counts: report.histogram.counts().to_vec(),
            collected: report.histogram.total(),
            pending: report.histogram.pending(),
            excluded: report.histogram.excluded(),
            deviation: report.deviation.value(),
            positions,
        };
        debug!(
            "Snapshot at {:.2}s: {} collected, {} pending, deviation {}.",
            snapshot.time, snapshot.collected, snapshot.pending, report.deviation
        );
        self.recorded_snapshots.push(snapshot);
        &self.recorded_snapshots[self.recorded_snapshots.len() - 1]
    }

    /// Positions of every countable particle.
    pub fn particle_positions(&self) -> Vec<(f32, f32)> {
        let radius = self.params.particle_radius;
        self.world
            .bodies()
            .into_iter()
            .filter(|b| b.is_countable(radius))
            .map(|b| (b.position.x, b.position.y))
            .collect()
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &SpawnScheduler {
        &self.scheduler
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn elapsed(&self) -> Duration {
        self.clock
    }

    pub fn spawned(&self) -> u32 {
        self.scheduler.spawned()
    }

    pub fn recorded_snapshots(&self) -> &[Snapshot] {
        &self.recorded_snapshots
    }
}

/// Particles drop in at the top edge, centred over the board.
fn spawn_point(layout: &BoardLayout) -> Vec2 {
    Vec2::new(layout.center_x(), 0.0)
}

fn populate_world<W: PhysicsWorld>(world: &mut W, layout: &BoardLayout, params: &ParameterSet) {
    world.set_gravity(params.gravity_y);
    for spec in layout.static_bodies(params) {
        world.add_body(spec);
    }
}

fn particle_spec(request: &SpawnRequest, params: &ParameterSet) -> BodySpec {
    let material = Material {
        density: params.density,
        restitution: params.restitution,
        friction: params.friction,
        air_friction: params.air_friction,
    };
    // Spawn velocity is per frame; the world integrates in units per second.
    let velocity = Vec2::new(request.velocity_x / REFERENCE_FRAME_S, 0.0);
    BodySpec::dynamic_circle(request.position, velocity, params.particle_radius, material)
}
