use galton_common::Vec2;
use rand::rngs::StdRng;
use rand::Rng;
use std::time::Duration;

/// Most particles a scheduler creates between two resets.
pub const SPAWN_CAP: u32 = 200;
/// Spawn offset and initial horizontal velocity are drawn from `[-JITTER, JITTER]`.
pub const JITTER: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

/// Independently toggleable randomisation of each spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpawnJitter {
    pub random_offset: bool,
    pub random_velocity: bool,
}

/// One particle the physics world should create.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRequest {
    /// 1-based index of this spawn since the last reset.
    pub sequence: u32,
    pub position: Vec2,
    pub velocity_x: f32,
}

/// Armed periodic timer. Dropping it cancels every tick it would still fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    next_due: Duration,
}

impl TimerHandle {
    /// Simulation time of the next tick.
    pub fn next_due(&self) -> Duration {
        self.next_due
    }
}

/// Issues spawn requests at a fixed rate until stopped or capped.
///
/// Time is supplied by the caller: [`SpawnScheduler::poll`] fires every tick
/// that fell due up to the given simulation time. The scheduler is
/// [`SchedulerState::Running`] exactly while it holds a [`TimerHandle`].
#[derive(Debug, Clone)]
pub struct SpawnScheduler {
    interval: Duration,
    spawn_point: Vec2,
    jitter: SpawnJitter,
    cap: u32,
    spawned: u32,
    timer: Option<TimerHandle>,
    rng: StdRng,
}

impl SpawnScheduler {
    /// Creates a stopped scheduler. `interval` must be non-zero.
    pub fn new(interval: Duration, spawn_point: Vec2, jitter: SpawnJitter, rng: StdRng) -> Self {
        SpawnScheduler {
            interval,
            spawn_point,
            jitter,
            cap: SPAWN_CAP,
            spawned: 0,
            timer: None,
            rng,
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.timer.is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Particles requested since the last reset.
    pub fn spawned(&self) -> u32 {
        self.spawned
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    /// Arms the timer; the first tick fires one interval after `now`.
    /// Does nothing if already running. Returns whether the state changed.
    pub fn start(&mut self, now: Duration) -> bool {
        if self.timer.is_some() {
            return false;
        }
        self.timer = Some(TimerHandle { next_due: now + self.interval });
        log::info!(
            "Spawning started ({} of {} spawned, every {} ms).",
            self.spawned,
            self.cap,
            self.interval.as_millis()
        );
        true
    }

    /// Cancels the timer. Does nothing if already stopped. Returns whether
    /// the state changed.
    pub fn stop(&mut self) -> bool {
        if self.timer.take().is_none() {
            return false;
        }
        log::info!("Spawning stopped after {} particles.", self.spawned);
        true
    }

    /// Start/stop button: flips between the two states.
    pub fn toggle(&mut self, now: Duration) -> SchedulerState {
        if self.is_running() {
            self.stop();
        } else {
            self.start(now);
        }
        self.state()
    }

    /// Stops and zeroes the spawn counter. Never restarts on its own.
    pub fn reset(&mut self) {
        self.stop();
        self.spawned = 0;
    }

    /// Resets, then adopts a new tick interval and spawn point.
    pub fn reconfigure(&mut self, interval: Duration, spawn_point: Vec2) {
        self.reset();
        self.interval = interval;
        self.spawn_point = spawn_point;
    }

    /// Fires every tick due at or before `now`, in order.
    ///
    /// A tick that finds the cap reached stops the scheduler instead of
    /// spawning, and nothing after it fires.
    pub fn poll(&mut self, now: Duration) -> Vec<SpawnRequest> {
        let mut requests = Vec::new();
        while let Some(timer) = self.timer {
            if timer.next_due > now {
                break;
            }
            self.timer = Some(TimerHandle { next_due: timer.next_due + self.interval });
            match self.tick() {
                Some(request) => requests.push(request),
                None => break,
            }
        }
        requests
    }

    fn tick(&mut self) -> Option<SpawnRequest> {
        if self.spawned >= self.cap {
            log::info!("Spawn cap of {} reached.", self.cap);
            self.stop();
            return None;
        }

        let offset_x = if self.jitter.random_offset { self.rng.random_range(-JITTER..=JITTER) } else { 0.0 };
        let velocity_x = if self.jitter.random_velocity { self.rng.random_range(-JITTER..=JITTER) } else { 0.0 };

        self.spawned += 1;
        let request = SpawnRequest {
            sequence: self.spawned,
            position: Vec2::new(self.spawn_point.x + offset_x, self.spawn_point.y),
            velocity_x,
        };
        log::trace!(
            "Spawn #{} at x={:.3} with vx={:.3}.",
            request.sequence,
            request.position.x,
            request.velocity_x
        );
        Some(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const HALF_SECOND: Duration = Duration::from_millis(500);

    fn scheduler(jitter: SpawnJitter) -> SpawnScheduler {
        SpawnScheduler::new(HALF_SECOND, Vec2::new(800.0, 0.0), jitter, StdRng::seed_from_u64(42))
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn starts_stopped() {
        let s = scheduler(SpawnJitter::default());
        assert_eq!(s.state(), SchedulerState::Stopped);
        assert_eq!(s.spawned(), 0);
        assert!(s.timer().is_none());
    }

    #[test]
    fn ticks_every_interval_after_start() {
        let mut s = scheduler(SpawnJitter::default());
        assert!(s.start(Duration::ZERO));
        assert!(s.poll(secs(0.49)).is_empty());

        let first = s.poll(secs(0.5));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].sequence, 1);
        assert_eq!(first[0].position, Vec2::new(800.0, 0.0));
        assert_eq!(first[0].velocity_x, 0.0);

        // Catching up fires every missed tick.
        assert_eq!(s.poll(secs(2.0)).len(), 3);
        assert_eq!(s.spawned(), 4);
        assert_eq!(s.timer().map(|t| t.next_due()), Some(secs(2.5)));
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut s = scheduler(SpawnJitter::default());
        assert!(s.start(Duration::ZERO));
        assert!(!s.start(secs(0.3)));
        // Second start did not re-arm the timer.
        assert_eq!(s.timer().map(|t| t.next_due()), Some(HALF_SECOND));

        assert!(s.stop());
        assert!(!s.stop());
        assert_eq!(s.state(), SchedulerState::Stopped);
    }

    #[test]
    fn stop_cancels_pending_ticks() {
        let mut s = scheduler(SpawnJitter::default());
        s.start(Duration::ZERO);
        s.poll(secs(1.0));
        assert_eq!(s.spawned(), 2);

        s.stop();
        assert!(s.poll(secs(100.0)).is_empty());
        assert_eq!(s.spawned(), 2);
    }

    #[test]
    fn auto_stops_at_cap() {
        let mut s = scheduler(SpawnJitter::default());
        s.start(Duration::ZERO);

        let requests = s.poll(secs(200.0 * 0.5));
        assert_eq!(requests.len(), SPAWN_CAP as usize);
        assert_eq!(s.spawned(), SPAWN_CAP);
        assert!(s.is_running());

        // The next tick finds the cap and stops without spawning.
        assert!(s.poll(secs(100.5)).is_empty());
        assert_eq!(s.state(), SchedulerState::Stopped);
        assert!(s.poll(secs(1000.0)).is_empty());
        assert_eq!(s.spawned(), SPAWN_CAP);
    }

    #[test]
    fn restart_after_cap_stops_again_without_spawning() {
        let mut s = scheduler(SpawnJitter::default());
        s.start(Duration::ZERO);
        s.poll(secs(101.0));
        assert!(!s.is_running());

        s.start(secs(101.0));
        assert!(s.poll(secs(102.0)).is_empty());
        assert!(!s.is_running());
    }

    #[test]
    fn reset_stops_and_zeroes() {
        let mut s = scheduler(SpawnJitter::default());
        s.start(Duration::ZERO);
        s.poll(secs(3.0));
        s.reset();
        assert_eq!(s.spawned(), 0);
        assert_eq!(s.state(), SchedulerState::Stopped);
        assert!(s.poll(secs(10.0)).is_empty());
    }

    #[test]
    fn reconfigure_applies_new_interval() {
        let mut s = scheduler(SpawnJitter::default());
        s.start(Duration::ZERO);
        s.poll(secs(1.0));
        s.reconfigure(Duration::from_millis(250), Vec2::new(100.0, 0.0));
        assert!(!s.is_running());
        assert_eq!(s.spawned(), 0);

        s.start(secs(1.0));
        let requests = s.poll(secs(2.0));
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[0].position.x, 100.0);
    }

    #[test]
    fn toggle_flips_state() {
        let mut s = scheduler(SpawnJitter::default());
        assert_eq!(s.toggle(Duration::ZERO), SchedulerState::Running);
        assert_eq!(s.toggle(secs(0.1)), SchedulerState::Stopped);
    }

    #[test]
    fn jitter_stays_in_range() {
        let mut s = scheduler(SpawnJitter { random_offset: true, random_velocity: true });
        s.start(Duration::ZERO);
        let requests = s.poll(secs(50.0));
        assert_eq!(requests.len(), 100);
        assert!(requests.iter().all(|r| (r.position.x - 800.0).abs() <= JITTER + 1e-4));
        assert!(requests.iter().all(|r| r.velocity_x.abs() <= JITTER));
        assert!(requests.iter().any(|r| r.velocity_x != 0.0));
        assert!(requests.iter().all(|r| r.position.y == 0.0));
    }

    #[test]
    fn jitter_toggles_are_independent() {
        let mut s = scheduler(SpawnJitter { random_offset: false, random_velocity: true });
        s.start(Duration::ZERO);
        let requests = s.poll(secs(5.0));
        assert!(requests.iter().all(|r| r.position.x == 800.0));
        assert!(requests.iter().any(|r| r.velocity_x != 0.0));
    }

    #[test]
    fn same_seed_same_requests() {
        let jitter = SpawnJitter { random_offset: true, random_velocity: true };
        let mut a = scheduler(jitter);
        let mut b = scheduler(jitter);
        a.start(Duration::ZERO);
        b.start(Duration::ZERO);
        assert_eq!(a.poll(secs(10.0)), b.poll(secs(10.0)));
    }
}
