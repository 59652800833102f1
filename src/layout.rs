use crate::physics::{BodySpec, Material};
use galton_common::{ConfigError, ParameterSet, Vec2};

/// y of the top peg row, leaving clearance for the spawn point at y = 0.
pub const START_Y: f32 = 60.0;
/// Depth of the bin region below the bin floor line.
pub const BIN_DEPTH: f32 = 500.0;
/// Outer walls and floor are this thick so fast particles cannot tunnel out.
pub const WALL_THICKNESS: f32 = 100.0;
pub const DIVIDER_THICKNESS: f32 = 4.0;
/// How far the floor is raised into the bin region.
pub const FLOOR_INSET: f32 = 20.0;

/// Pegs carry their own material, independent of the particle parameters.
pub const PEG_MATERIAL: Material = Material { density: 0.001, restitution: 0.6, friction: 0.01, air_friction: 0.0 };

/// Axis-aligned rectangle given by its centre and size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub center: Vec2,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(center: Vec2, width: f32, height: f32) -> Self {
        Rect { center, width, height }
    }

    pub fn min_x(&self) -> f32 {
        self.center.x - self.width / 2.0
    }

    pub fn max_x(&self) -> f32 {
        self.center.x + self.width / 2.0
    }

    pub fn min_y(&self) -> f32 {
        self.center.y - self.height / 2.0
    }

    pub fn max_y(&self) -> f32 {
        self.center.y + self.height / 2.0
    }
}

/// Static geometry that keeps particles on the board.
#[derive(Debug, Clone, PartialEq)]
pub struct Containment {
    pub floor: Rect,
    pub left_wall: Rect,
    pub right_wall: Rect,
    /// One per interior bin boundary, left to right.
    pub dividers: Vec<Rect>,
}

impl Containment {
    pub fn rects(&self) -> impl Iterator<Item = &Rect> {
        [&self.floor, &self.left_wall, &self.right_wall]
            .into_iter()
            .chain(self.dividers.iter())
    }
}

/// Peg lattice, bins and containment derived from one [`ParameterSet`].
///
/// Built in one go by [`BoardLayout::build`] and never modified afterwards; a
/// parameter change means building a new layout.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardLayout {
    pegs: Vec<Vec2>,
    row_count: usize,
    center_x: f32,
    bottom_row_x: Vec<f32>,
    bin_boundaries: Vec<f32>,
    bin_floor_y: f32,
    containment: Containment,
}

impl BoardLayout {
    /// Derives the board for `params`, centred horizontally on `center_x`.
    ///
    /// Row `r` holds `r + 1` pegs at `y = START_Y + r * row_spacing`, the
    /// leftmost at `center_x - r * column_spacing / 2`.
    pub fn build(params: &ParameterSet, center_x: f32) -> Result<Self, ConfigError> {
        params.validate()?;
        if !center_x.is_finite() {
            return Err(ConfigError::NonFinite { field: "center_x", value: center_x });
        }

        let row_count = params.row_count as usize;
        let half_spacing = params.column_spacing / 2.0;

        let mut pegs = Vec::with_capacity(row_count * (row_count + 1) / 2);
        for row in 0..row_count {
            let left_x = center_x - row as f32 * half_spacing;
            let y = START_Y + row as f32 * params.row_spacing;
            for i in 0..=row {
                pegs.push(Vec2::new(left_x + i as f32 * params.column_spacing, y));
            }
        }

        let bottom_start = (row_count - 1) * row_count / 2;
        let bottom_row_x: Vec<f32> = pegs[bottom_start..].iter().map(|p| p.x).collect();

        let mut bin_boundaries = Vec::with_capacity(row_count + 1);
        bin_boundaries.push(bottom_row_x[0] - half_spacing);
        bin_boundaries.extend(bottom_row_x.windows(2).map(|pair| (pair[0] + pair[1]) / 2.0));
        bin_boundaries.push(bottom_row_x[row_count - 1] + half_spacing);

        if let Some(pair) = bin_boundaries.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(ConfigError::DegenerateLayout(format!(
                "bin boundaries {} and {} are not strictly ascending",
                pair[0], pair[1]
            )));
        }

        let bin_floor_y = START_Y + (row_count - 1) as f32 * params.row_spacing + params.row_spacing;
        let containment = build_containment(&bin_boundaries, bin_floor_y);

        log::debug!(
            "Built layout: {} rows, {} pegs, bins [{:.1}, {:.1}), floor at y={:.1}.",
            row_count,
            pegs.len(),
            bin_boundaries[0],
            bin_boundaries[row_count],
            bin_floor_y
        );

        Ok(BoardLayout {
            pegs,
            row_count,
            center_x,
            bottom_row_x,
            bin_boundaries,
            bin_floor_y,
            containment,
        })
    }

    /// All pegs, row by row, left to right.
    pub fn pegs(&self) -> &[Vec2] {
        &self.pegs
    }

    /// Pegs grouped by row; row `r` has `r + 1` entries.
    pub fn rows(&self) -> impl Iterator<Item = &[Vec2]> + '_ {
        (0..self.row_count).map(move |row| {
            let start = row * (row + 1) / 2;
            &self.pegs[start..start + row + 1]
        })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn bin_count(&self) -> usize {
        self.row_count
    }

    pub fn center_x(&self) -> f32 {
        self.center_x
    }

    pub fn bottom_row_x(&self) -> &[f32] {
        &self.bottom_row_x
    }

    /// `bin_count() + 1` ascending x-coordinates.
    pub fn bin_boundaries(&self) -> &[f32] {
        &self.bin_boundaries
    }

    /// Half-open x-interval `[left, right)` owned by bin `index`.
    pub fn bin_interval(&self, index: usize) -> Option<(f32, f32)> {
        (index < self.row_count).then(|| (self.bin_boundaries[index], self.bin_boundaries[index + 1]))
    }

    /// Total width covered by the bins.
    pub fn bin_width(&self) -> f32 {
        self.bin_boundaries[self.row_count] - self.bin_boundaries[0]
    }

    /// Particles at or below this y have entered the bins.
    pub fn bin_floor_y(&self) -> f32 {
        self.bin_floor_y
    }

    pub fn containment(&self) -> &Containment {
        &self.containment
    }

    /// Bodies to register with the physics world: pegs first, then floor,
    /// walls and dividers.
    pub fn static_bodies(&self, params: &ParameterSet) -> Vec<BodySpec> {
        self.pegs
            .iter()
            .map(|&peg| BodySpec::static_circle(peg, params.peg_radius, PEG_MATERIAL))
            .chain(
                self.containment
                    .rects()
                    .map(|rect| BodySpec::static_rect(rect.center, rect.width, rect.height)),
            )
            .collect()
    }
}

fn build_containment(bin_boundaries: &[f32], bin_floor_y: f32) -> Containment {
    let left = bin_boundaries[0];
    let right = bin_boundaries[bin_boundaries.len() - 1];
    let wall_height = bin_floor_y + BIN_DEPTH;

    let floor = Rect::new(
        Vec2::new((left + right) / 2.0, bin_floor_y + BIN_DEPTH + WALL_THICKNESS / 2.0 - FLOOR_INSET),
        (right - left) + WALL_THICKNESS * 2.0,
        WALL_THICKNESS,
    );
    // Walls sit outside the bins so their inner faces line up with the outer boundaries.
    let left_wall = Rect::new(Vec2::new(left - WALL_THICKNESS / 2.0, wall_height / 2.0), WALL_THICKNESS, wall_height);
    let right_wall = Rect::new(Vec2::new(right + WALL_THICKNESS / 2.0, wall_height / 2.0), WALL_THICKNESS, wall_height);

    let interior = &bin_boundaries[1..bin_boundaries.len() - 1];
    let dividers = interior
        .iter()
        .map(|&x| Rect::new(Vec2::new(x, bin_floor_y + BIN_DEPTH / 2.0), DIVIDER_THICKNESS, BIN_DEPTH))
        .collect();

    Containment { floor, left_wall, right_wall, dividers }
}
