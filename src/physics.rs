use galton_common::{clamp, Vec2};
use rayon::prelude::*;
use std::time::Duration;

/// Identifier handed out by a [`PhysicsWorld`] when a body is registered.
pub type BodyId = usize;

/// Acceleration (units/s^2) produced by a gravity scale of 1.0.
pub const GRAVITY_SCALE: f32 = 1000.0;
/// Speed cap for dynamic bodies (units/s). Containment is sized for this.
pub const MAX_SPEED: f32 = 2000.0;
/// Upper bound on integration substeps per [`PhysicsWorld::step`].
pub const MAX_SUBSTEPS: u32 = 16;
/// Reference frame length. `air_friction` is a per-frame loss and spawn
/// velocities are given in units per frame.
pub const REFERENCE_FRAME_S: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    /// Axis-aligned rectangle centred on the body position.
    Rect { width: f32, height: f32 },
}

/// Material properties, passed through untouched from the parameter set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub density: f32,
    pub restitution: f32,
    pub friction: f32,
    pub air_friction: f32,
}

impl Default for Material {
    fn default() -> Self {
        Material { density: 0.001, restitution: 0.0, friction: 0.1, air_friction: 0.01 }
    }
}

/// Everything a world needs to register one body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySpec {
    pub position: Vec2,
    pub velocity: Vec2,
    pub shape: Shape,
    pub material: Material,
    pub is_static: bool,
}

impl BodySpec {
    pub fn static_circle(position: Vec2, radius: f32, material: Material) -> Self {
        BodySpec { position, velocity: Vec2::zero(), shape: Shape::Circle { radius }, material, is_static: true }
    }

    pub fn static_rect(position: Vec2, width: f32, height: f32) -> Self {
        BodySpec {
            position,
            velocity: Vec2::zero(),
            shape: Shape::Rect { width, height },
            material: Material::default(),
            is_static: true,
        }
    }

    pub fn dynamic_circle(position: Vec2, velocity: Vec2, radius: f32, material: Material) -> Self {
        BodySpec { position, velocity, shape: Shape::Circle { radius }, material, is_static: false }
    }
}

/// Read-only view of one body, as reported by [`PositionSource::bodies`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyView {
    pub id: BodyId,
    pub position: Vec2,
    pub velocity: Vec2,
    /// `Some` for circles, `None` for every other shape.
    pub circle_radius: Option<f32>,
    pub is_static: bool,
}

impl BodyView {
    /// A falling particle: a dynamic circle with exactly the particle radius.
    /// Pegs and containment never qualify.
    pub fn is_countable(&self, particle_radius: f32) -> bool {
        !self.is_static
            && self
                .circle_radius
                .is_some_and(|r| (r - particle_radius).abs() <= f32::EPSILON * particle_radius.max(1.0))
    }
}

/// Anything that can list the bodies currently in a world.
pub trait PositionSource {
    fn bodies(&self) -> Vec<BodyView>;
}

impl PositionSource for [BodyView] {
    fn bodies(&self) -> Vec<BodyView> {
        self.to_vec()
    }
}

impl PositionSource for Vec<BodyView> {
    fn bodies(&self) -> Vec<BodyView> {
        self.clone()
    }
}

/// The rigid-body collaborator the board runs on.
pub trait PhysicsWorld: PositionSource {
    /// Registers a body and returns its id.
    fn add_body(&mut self, spec: BodySpec) -> BodyId;

    /// Removes every body.
    fn clear(&mut self);

    fn set_gravity(&mut self, gravity_y: f32);

    /// Advances the world by `dt`, then calls `after_update` with the settled
    /// world.
    fn step<F>(&mut self, dt: Duration, after_update: F)
    where
        F: FnOnce(&Self);
}

#[derive(Debug, Clone)]
struct StaticBody {
    id: BodyId,
    position: Vec2,
    shape: Shape,
    material: Material,
}

#[derive(Debug, Clone)]
struct DynamicBody {
    id: BodyId,
    position: Vec2,
    velocity: Vec2,
    radius: f32,
    material: Material,
}

/// Minimal stand-in world: gravity, air drag and contact against static
/// circles and rectangles. Dynamic bodies do not collide with each other.
///
/// Good enough to drive the board end to end; not a faithful rigid-body
/// solver.
#[derive(Debug, Clone, Default)]
pub struct SimpleWorld {
    gravity_y: f32,
    statics: Vec<StaticBody>,
    dynamics: Vec<DynamicBody>,
    next_id: BodyId,
    elapsed: Duration,
}

impl SimpleWorld {
    pub fn new(gravity_y: f32) -> Self {
        SimpleWorld { gravity_y, ..Default::default() }
    }

    /// Simulated time since creation (not reset by [`PhysicsWorld::clear`]).
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn dynamic_count(&self) -> usize {
        self.dynamics.len()
    }

    pub fn static_count(&self) -> usize {
        self.statics.len()
    }

    /// Picks enough substeps that no body moves more than half its radius per
    /// substep.
    fn substeps_for(&self, dt_s: f32) -> u32 {
        let min_radius = self
            .dynamics
            .iter()
            .map(|b| b.radius)
            .fold(f32::INFINITY, f32::min);
        if !min_radius.is_finite() || min_radius <= 0.0 {
            return 1;
        }
        let travel = MAX_SPEED * dt_s;
        ((travel / (0.5 * min_radius)).ceil() as u32).clamp(1, MAX_SUBSTEPS)
    }
}

impl PositionSource for SimpleWorld {
    fn bodies(&self) -> Vec<BodyView> {
        let mut views: Vec<BodyView> = self
            .statics
            .iter()
            .map(|b| BodyView {
                id: b.id,
                position: b.position,
                velocity: Vec2::zero(),
                circle_radius: match b.shape {
                    Shape::Circle { radius } => Some(radius),
                    Shape::Rect { .. } => None,
                },
                is_static: true,
            })
            .chain(self.dynamics.iter().map(|b| BodyView {
                id: b.id,
                position: b.position,
                velocity: b.velocity,
                circle_radius: Some(b.radius),
                is_static: false,
            }))
            .collect();
        views.sort_by_key(|v| v.id);
        views
    }
}

impl PhysicsWorld for SimpleWorld {
    fn add_body(&mut self, spec: BodySpec) -> BodyId {
        let id = self.next_id;
        self.next_id += 1;

        if spec.is_static {
            self.statics.push(StaticBody { id, position: spec.position, shape: spec.shape, material: spec.material });
        } else {
            let radius = match spec.shape {
                Shape::Circle { radius } => radius,
                // Dynamic rectangles are approximated by their inscribed circle.
                Shape::Rect { width, height } => 0.5 * width.min(height),
            };
            self.dynamics.push(DynamicBody {
                id,
                position: spec.position,
                velocity: spec.velocity,
                radius,
                material: spec.material,
            });
        }
        id
    }

    fn clear(&mut self) {
        log::debug!(
            "Clearing world ({} static, {} dynamic bodies).",
            self.statics.len(),
            self.dynamics.len()
        );
        self.statics.clear();
        self.dynamics.clear();
    }

    fn set_gravity(&mut self, gravity_y: f32) {
        self.gravity_y = gravity_y;
    }

    fn step<F>(&mut self, dt: Duration, after_update: F)
    where
        F: FnOnce(&Self),
    {
        let dt_s = dt.as_secs_f32();
        if dt_s > 0.0 {
            let substeps = self.substeps_for(dt_s);
            let h = dt_s / substeps as f32;
            let accel_y = self.gravity_y * GRAVITY_SCALE;
            let statics = &self.statics;

            // Bodies only interact with static geometry, so each one integrates independently.
            self.dynamics.par_iter_mut().for_each(|body| {
                for _ in 0..substeps {
                    integrate(body, accel_y, h);
                    for obstacle in statics {
                        resolve_contact(body, obstacle);
                    }
                }
            });
            self.elapsed += dt;
            log::trace!("World advanced {:.2} ms in {} substeps.", dt_s * 1000.0, substeps);
        }
        after_update(self);
    }
}

fn integrate(body: &mut DynamicBody, accel_y: f32, h: f32) {
    body.velocity.y += accel_y * h;
    let drag = (1.0 - body.material.air_friction).max(0.0).powf(h / REFERENCE_FRAME_S);
    body.velocity = body.velocity.scale(drag);

    let speed = body.velocity.length();
    if speed > MAX_SPEED {
        body.velocity = body.velocity.scale(MAX_SPEED / speed);
    }
    body.position = body.position + body.velocity * h;
}

fn resolve_contact(body: &mut DynamicBody, obstacle: &StaticBody) {
    let (normal, penetration) = match obstacle.shape {
        Shape::Circle { radius } => {
            let offset = body.position - obstacle.position;
            let reach = radius + body.radius;
            let dist_sq = offset.length_squared();
            if dist_sq >= reach * reach {
                return;
            }
            let dist = dist_sq.sqrt();
            // Exactly centred on the peg: push straight up.
            let normal = match offset.normalize_or_zero() {
                n if n == Vec2::zero() => Vec2::new(0.0, -1.0),
                n => n,
            };
            (normal, reach - dist)
        }
        Shape::Rect { width, height } => {
            let half = Vec2::new(0.5 * width, 0.5 * height);
            let min = obstacle.position - half;
            let max = obstacle.position + half;
            let closest = body.position.clamp(min, max);
            let offset = body.position - closest;
            let dist_sq = offset.length_squared();

            if dist_sq > 1e-12 {
                if dist_sq >= body.radius * body.radius {
                    return;
                }
                let dist = dist_sq.sqrt();
                (offset.normalize_or_zero(), body.radius - dist)
            } else {
                // Centre inside the rectangle: leave through the nearest face.
                let exits = [
                    (body.position.x - min.x, Vec2::new(-1.0, 0.0)),
                    (max.x - body.position.x, Vec2::new(1.0, 0.0)),
                    (body.position.y - min.y, Vec2::new(0.0, -1.0)),
                    (max.y - body.position.y, Vec2::new(0.0, 1.0)),
                ];
                let (depth, normal) = exits
                    .into_iter()
                    .fold((f32::INFINITY, Vec2::zero()), |best, exit| if exit.0 < best.0 { exit } else { best });
                (normal, depth + body.radius)
            }
        }
    };

    body.position = body.position + normal.scale(penetration);

    let normal_speed = body.velocity.dot(normal);
    if normal_speed < 0.0 {
        let restitution = body.material.restitution.max(obstacle.material.restitution);
        let friction = clamp(body.material.friction.min(obstacle.material.friction), 0.0, 1.0);
        let normal_velocity = normal.scale(normal_speed);
        let tangent_velocity = body.velocity - normal_velocity;
        body.velocity = tangent_velocity.scale(1.0 - friction) - normal_velocity.scale(restitution);
    }
}
