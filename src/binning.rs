use crate::layout::BoardLayout;
use crate::physics::PositionSource;
use galton_common::Vec2;

/// Per-bin particle counts for one query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Histogram {
    counts: Vec<u32>,
    /// Collected (below the bin floor) but outside every bin.
    excluded: u32,
    /// Still above the bin floor.
    pending: u32,
}

impl Histogram {
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Number of particles sitting in a bin.
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn excluded(&self) -> u32 {
        self.excluded
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }

    pub fn bin_count(&self) -> usize {
        self.counts.len()
    }
}

/// Sorts particle positions into the bins of a [`BoardLayout`].
///
/// Holds no state of its own; every call recounts from scratch because
/// particles keep moving between queries.
#[derive(Debug, Clone, Copy)]
pub struct BinningEngine<'a> {
    layout: &'a BoardLayout,
}

impl<'a> BinningEngine<'a> {
    pub fn new(layout: &'a BoardLayout) -> Self {
        BinningEngine { layout }
    }

    /// Index of the bin whose `[left, right)` interval contains `x`, if any.
    pub fn classify(&self, x: f32) -> Option<usize> {
        let boundaries = self.layout.bin_boundaries();
        let first = boundaries[0];
        let last = boundaries[boundaries.len() - 1];
        // NaN fails both comparisons and falls out here too.
        if !(x >= first && x < last) {
            return None;
        }
        let upper = boundaries.partition_point(|&b| b <= x);
        Some(upper - 1)
    }

    /// Counts every position that has reached the bin floor.
    pub fn histogram<I>(&self, positions: I) -> Histogram
    where
        I: IntoIterator<Item = Vec2>,
    {
        let floor_y = self.layout.bin_floor_y();
        let mut histogram = Histogram {
            counts: vec![0; self.layout.bin_count()],
            excluded: 0,
            pending: 0,
        };

        for pos in positions {
            if !(pos.y >= floor_y) {
                histogram.pending += 1;
                continue;
            }
            match self.classify(pos.x) {
                Some(bin) => histogram.counts[bin] += 1,
                None => {
                    histogram.excluded += 1;
                    log::trace!("Particle at ({:.1}, {:.1}) is outside every bin; skipping.", pos.x, pos.y);
                }
            }
        }
        histogram
    }

    /// Counts the particles a world reports, ignoring pegs, walls and any
    /// body that is not a particle of `particle_radius`.
    pub fn histogram_from_source<S>(&self, source: &S, particle_radius: f32) -> Histogram
    where
        S: PositionSource + ?Sized,
    {
        self.histogram(
            source
                .bodies()
                .into_iter()
                .filter(|body| body.is_countable(particle_radius))
                .map(|body| body.position),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::BodyView;
    use galton_common::ParameterSet;

    fn three_bin_layout() -> BoardLayout {
        let params = ParameterSet { row_count: 3, ..ParameterSet::default() };
        BoardLayout::build(&params, 0.0).unwrap()
    }

    fn collected(layout: &BoardLayout, x: f32) -> Vec2 {
        Vec2::new(x, layout.bin_floor_y() + 50.0)
    }

    #[test]
    fn classify_uses_half_open_intervals() {
        let layout = three_bin_layout();
        let engine = BinningEngine::new(&layout);
        assert_eq!(engine.classify(-120.0), Some(0));
        assert_eq!(engine.classify(-40.0001), Some(0));
        assert_eq!(engine.classify(-40.0), Some(1));
        assert_eq!(engine.classify(39.99), Some(1));
        assert_eq!(engine.classify(40.0), Some(2));
        assert_eq!(engine.classify(119.9), Some(2));
        assert_eq!(engine.classify(120.0), None);
        assert_eq!(engine.classify(-120.5), None);
        assert_eq!(engine.classify(f32::NAN), None);
    }

    #[test]
    fn counts_only_collected_particles() {
        let layout = three_bin_layout();
        let engine = BinningEngine::new(&layout);
        let floor = layout.bin_floor_y();
        let positions = vec![
            Vec2::new(0.0, floor),        // exactly on the floor line counts
            Vec2::new(0.0, floor - 0.5),  // still falling
            Vec2::new(-100.0, floor + 10.0),
            Vec2::new(100.0, floor + 10.0),
            Vec2::new(100.0, 0.0),
        ];
        let histogram = engine.histogram(positions);
        assert_eq!(histogram.counts(), &[1, 1, 1]);
        assert_eq!(histogram.pending(), 2);
        assert_eq!(histogram.excluded(), 0);
    }

    #[test]
    fn out_of_range_positions_are_excluded() {
        let layout = three_bin_layout();
        let engine = BinningEngine::new(&layout);
        let positions = vec![
            collected(&layout, -500.0),
            collected(&layout, 120.0),
            collected(&layout, 10.0),
        ];
        let histogram = engine.histogram(positions);
        assert_eq!(histogram.counts(), &[0, 1, 0]);
        assert_eq!(histogram.excluded(), 2);
    }

    #[test]
    fn total_never_exceeds_particle_count() {
        let layout = three_bin_layout();
        let engine = BinningEngine::new(&layout);

        let in_range: Vec<Vec2> = (0..240).map(|i| collected(&layout, -120.0 + i as f32)).collect();
        let histogram = engine.histogram(in_range.iter().copied());
        assert_eq!(histogram.total() as usize, in_range.len());

        let mut mixed = in_range.clone();
        mixed.push(collected(&layout, 121.0));
        let histogram = engine.histogram(mixed.iter().copied());
        assert!((histogram.total() as usize) < mixed.len());
    }

    #[test]
    fn empty_input_gives_zero_histogram() {
        let layout = three_bin_layout();
        let histogram = BinningEngine::new(&layout).histogram(Vec::new());
        assert_eq!(histogram.counts(), &[0, 0, 0]);
        assert_eq!(histogram.total(), 0);
        assert_eq!(histogram.bin_count(), 3);
    }

    #[test]
    fn source_filter_skips_static_and_foreign_bodies() {
        let layout = three_bin_layout();
        let engine = BinningEngine::new(&layout);
        let y = layout.bin_floor_y() + 20.0;
        let body = |id, x, radius: Option<f32>, is_static| BodyView {
            id,
            position: Vec2::new(x, y),
            velocity: Vec2::zero(),
            circle_radius: radius,
            is_static,
        };
        let bodies = vec![
            body(0, 0.0, Some(10.0), true),  // peg
            body(1, 0.0, None, true),        // divider
            body(2, 0.0, Some(10.0), false), // particle
            body(3, 80.0, Some(10.0), false),
            body(4, 80.0, Some(4.0), false), // some other dynamic circle
        ];
        let histogram = engine.histogram_from_source(bodies.as_slice(), 10.0);
        assert_eq!(histogram.counts(), &[0, 1, 1]);
    }
}
