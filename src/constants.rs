/*!
constants.rs - crossbar fabric geometry, range masks, and runtime Geometry.

Overview
========
Defines the fixed powers-of-two that describe the memristive crossbar
fabric (§3 of the design): how many independent crossbar tiles exist, how
tall and wide each one is, and how many horizontal partitions ("warps")
subdivide a row. These are `const`s because the reference hardware model
treats them as build-time constants; `Geometry` is an additional runtime
view over the same numbers so tests and example programs can exercise the
allocator and vector layer against a much smaller fabric without touching
the public constants real callers rely on.
*/

/// Log2 of the number of independent crossbar tiles in the fabric.
pub const LOG_NUM_CROSSBARS: usize = 16;
/// Number of independent crossbar tiles in the fabric.
pub const NUM_CROSSBARS: usize = 1 << LOG_NUM_CROSSBARS;

/// Log2 of the number of rows per crossbar tile.
pub const LOG_CROSSBAR_HEIGHT: usize = 10;
/// Number of rows per crossbar tile; a row is the unit of element storage.
pub const CROSSBAR_HEIGHT: usize = 1 << LOG_CROSSBAR_HEIGHT;

/// Log2 of the number of bit-columns per row.
pub const LOG_CROSSBAR_WIDTH: usize = 10;
/// Number of bit-columns per row.
pub const CROSSBAR_WIDTH: usize = 1 << LOG_CROSSBAR_WIDTH;

/// Log2 of the warp size (horizontal partitions per crossbar).
pub const LOG_CROSSBAR_N: usize = 5;
/// Warp size: the number of lanes that can exchange data via intra-tile move.
pub const CROSSBAR_N: usize = 1 << LOG_CROSSBAR_N;

/// Number of register indices per row (`CROSSBAR_WIDTH / CROSSBAR_N`).
pub const CROSSBAR_R: usize = CROSSBAR_WIDTH / CROSSBAR_N;

/// An inclusive arithmetic sequence `{start, start + step, ..., stop}` of
/// row or tile indices, used to predicate which cells a gate touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeMask {
    pub start: usize,
    pub stop: usize,
    pub step: usize,
}

impl RangeMask {
    pub const fn new(start: usize, stop: usize, step: usize) -> Self {
        Self { start, stop, step }
    }

    /// Iterates the inclusive sequence this mask denotes.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        let mut next = Some(self.start);
        let stop = self.stop;
        let step = self.step;
        std::iter::from_fn(move || {
            let current = next?;
            if current > stop {
                next = None;
                return None;
            }
            next = current.checked_add(step).filter(|v| *v <= stop);
            Some(current)
        })
    }
}

/// A mask selecting every row of a crossbar.
pub const ALL_ROWS: RangeMask = RangeMask::new(0, CROSSBAR_HEIGHT - 1, 1);
/// A mask selecting every crossbar tile in the fabric.
pub const ALL_CROSSBARS: RangeMask = RangeMask::new(0, NUM_CROSSBARS - 1, 1);

/// Runtime view of the fabric geometry, for tests and example programs that
/// want a smaller fabric than the build-time default. Callers that want the
/// real hardware geometry keep using the bare constants above; `Geometry`
/// exists only where the allocator/driver need to be parameterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub num_crossbars: usize,
    pub crossbar_height: usize,
    pub crossbar_n: usize,
    pub crossbar_r: usize,
}

impl Geometry {
    /// A custom fabric geometry. `crossbar_r` is derived from
    /// `crossbar_width / crossbar_n`, matching the reference relationship.
    pub const fn new(num_crossbars: usize, crossbar_height: usize, crossbar_width: usize, crossbar_n: usize) -> Self {
        Self {
            num_crossbars,
            crossbar_height,
            crossbar_n,
            crossbar_r: crossbar_width / crossbar_n,
        }
    }

    pub fn all_rows(&self) -> RangeMask {
        RangeMask::new(0, self.crossbar_height - 1, 1)
    }

    pub fn all_crossbars(&self) -> RangeMask {
        RangeMask::new(0, self.num_crossbars - 1, 1)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            num_crossbars: NUM_CROSSBARS,
            crossbar_height: CROSSBAR_HEIGHT,
            crossbar_n: CROSSBAR_N,
            crossbar_r: CROSSBAR_R,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_constants_match_reference_defaults() {
        assert_eq!(NUM_CROSSBARS, 1 << 16);
        assert_eq!(CROSSBAR_HEIGHT, 1 << 10);
        assert_eq!(CROSSBAR_N, 32);
        assert_eq!(CROSSBAR_R, 32);
    }

    #[test]
    fn range_mask_iterates_inclusive_sequence() {
        let mask = RangeMask::new(2, 8, 3);
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![2, 5, 8]);
    }

    #[test]
    fn all_rows_and_all_crossbars_cover_full_range() {
        assert_eq!(ALL_ROWS.start, 0);
        assert_eq!(ALL_ROWS.stop, CROSSBAR_HEIGHT - 1);
        assert_eq!(ALL_CROSSBARS.stop, NUM_CROSSBARS - 1);
    }

    #[test]
    fn geometry_default_matches_constants() {
        let g = Geometry::default();
        assert_eq!(g.num_crossbars, NUM_CROSSBARS);
        assert_eq!(g.crossbar_r, CROSSBAR_R);
    }
}
