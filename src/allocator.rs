/*!
allocator.rs - best-fit rotating register allocator over a
(register-index x crossbar-tile) grid.

Overview
========
Maintains a two-dimensional boolean grid `used[reg][tile]`, initially all
free, plus a rotating cursor `last_crossbar` used as the starting point of
the next search so allocations spread across the fabric instead of always
re-scanning from tile 0.

Algorithm
=========
To allocate `num_tiles` contiguous tiles: starting at `last_crossbar` and
advancing modulo `num_crossbars`, try each candidate start `s`. For a
candidate to work, some register index `r` must be free across every tile
in `[s, s + num_tiles)`. Accept the first such `r` (single-register form)
or collect `m` of them (multi-register form), mark the cells used, set
`last_crossbar = s`, and return.

The scan must terminate after one full revolution even when
`last_crossbar == 0`; this uses an explicit `tried` counter rather than
the reference's `startCrossbar != (lastCrossbar - 1) % NUM_CROSSBARS`
comparison, which is off-by-one under wrap-around (see SPEC_FULL.md).
*/

use crate::address::Address;
use crate::constants::Geometry;
use crate::error::{PimError, Result};

pub struct Allocator {
    geometry: Geometry,
    /// `used[reg * num_crossbars + tile]`
    used: Vec<bool>,
    last_crossbar: usize,
}

impl Allocator {
    pub fn new() -> Self {
        Self::with_geometry(Geometry::default())
    }

    pub fn with_geometry(geometry: Geometry) -> Self {
        let used = vec![false; geometry.crossbar_r * geometry.num_crossbars];
        Self { geometry, used, last_crossbar: 0 }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Number of tiles currently marked used, summed across all register
    /// indices. Exposed for the bitmap-accounting property test (design's
    /// testable-properties §1).
    pub fn used_tile_count(&self) -> usize {
        self.used.iter().filter(|b| **b).count()
    }

    #[inline]
    fn cell(&self, reg: usize, tile: usize) -> bool {
        self.used[reg * self.geometry.num_crossbars + tile]
    }

    #[inline]
    fn set_cell(&mut self, reg: usize, tile: usize, value: bool) {
        self.used[reg * self.geometry.num_crossbars + tile] = value;
    }

    fn num_tiles_for(&self, n: usize) -> usize {
        n.div_ceil(self.geometry.crossbar_height)
    }

    /// Whether register `reg` is free across every tile in
    /// `[start, start + num_tiles)`. A run is never allowed to wrap past
    /// the end of the fabric: an `Address` is a plain `[start, end)` range,
    /// so a candidate start with no room before the fabric boundary is
    /// simply not a candidate.
    fn register_free_across(&self, reg: usize, start: usize, num_tiles: usize) -> bool {
        if start + num_tiles > self.geometry.num_crossbars {
            return false;
        }
        (start..start + num_tiles).all(|tile| !self.cell(reg, tile))
    }

    fn mark_used(&mut self, reg: usize, start: usize, num_tiles: usize, value: bool) {
        for tile in start..start + num_tiles {
            self.set_cell(reg, tile, value);
        }
    }

    /// Reserves one register index across `ceil(n / CROSSBAR_HEIGHT)`
    /// contiguous tiles.
    pub fn allocate(&mut self, n: usize) -> Result<Address> {
        let num_tiles = self.num_tiles_for(n);
        let num_crossbars = self.geometry.num_crossbars;

        let mut start = self.last_crossbar;
        for _ in 0..num_crossbars {
            if let Some(reg) = (0..self.geometry.crossbar_r).find(|&r| self.register_free_across(r, start, num_tiles)) {
                self.mark_used(reg, start, num_tiles, true);
                self.last_crossbar = start;
                log::trace!("allocated register {reg} from {start} spanning {num_tiles} tiles");
                return Ok(Address::new(start, start + num_tiles, reg));
            }
            start = (start + 1) % num_crossbars;
        }

        Err(PimError::OutOfMemory(num_tiles))
    }

    /// Reserves `m` distinct register indices, all covering the same
    /// contiguous tile range, for operations that need several co-located
    /// scratch registers.
    pub fn allocate_multi(&mut self, n: usize, m: usize) -> Result<Vec<Address>> {
        let num_tiles = self.num_tiles_for(n);
        let num_crossbars = self.geometry.num_crossbars;

        let mut start = self.last_crossbar;
        for _ in 0..num_crossbars {
            let regs: Vec<usize> = (0..self.geometry.crossbar_r)
                .filter(|&r| self.register_free_across(r, start, num_tiles))
                .take(m)
                .collect();

            if regs.len() == m {
                for &reg in &regs {
                    self.mark_used(reg, start, num_tiles, true);
                }
                self.last_crossbar = start;
                log::trace!("allocated {m} registers {regs:?} from {start} spanning {num_tiles} tiles");
                return Ok(regs.into_iter().map(|reg| Address::new(start, start + num_tiles, reg)).collect());
            }
            start = (start + 1) % num_crossbars;
        }

        Err(PimError::OutOfMemory(num_tiles))
    }

    /// Releases an address. A no-op for a null address (`reg == -1`).
    pub fn free(&mut self, addr: Address) {
        if let Some(reg) = addr.reg() {
            let num_tiles = addr.num_tiles();
            self.mark_used(reg, addr.start_array, num_tiles, false);
            log::trace!("freed register {reg} from {}", addr.start_array);
        }
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> Allocator {
        Allocator::with_geometry(Geometry::new(4, 8, 32, 32))
    }

    #[test]
    fn allocate_returns_contiguous_run_at_register_zero() {
        let _ = env_logger::try_init();
        let mut a = tiny();
        let addr = a.allocate(8).unwrap();
        assert_eq!(addr.start_array, 0);
        assert_eq!(addr.end_array, 1);
        assert_eq!(addr.reg(), Some(0));
    }

    #[test]
    fn allocate_spans_multiple_tiles_for_large_n() {
        let mut a = tiny();
        let addr = a.allocate(20).unwrap(); // ceil(20/8) = 3 tiles
        assert_eq!(addr.num_tiles(), 3);
    }

    #[test]
    fn free_then_reallocate_reuses_space() {
        let mut a = tiny();
        let addr = a.allocate(8).unwrap();
        assert_eq!(a.used_tile_count(), 1);
        a.free(addr);
        assert_eq!(a.used_tile_count(), 0);
        let addr2 = a.allocate(8).unwrap();
        assert_eq!(addr2.num_tiles(), 1);
    }

    #[test]
    fn free_of_null_address_is_noop() {
        let mut a = tiny();
        a.free(Address::NULL);
        assert_eq!(a.used_tile_count(), 0);
    }

    #[test]
    fn out_of_memory_when_fabric_exhausted() {
        let mut a = Allocator::with_geometry(Geometry::new(1, 8, 1, 1));
        let _first = a.allocate(8).unwrap();
        let err = a.allocate(8).unwrap_err();
        assert_eq!(err, PimError::OutOfMemory(1));
    }

    #[test]
    fn allocate_multi_returns_distinct_registers_same_range() {
        let mut a = tiny();
        let addrs = a.allocate_multi(8, 3).unwrap();
        assert_eq!(addrs.len(), 3);
        let regs: std::collections::HashSet<_> = addrs.iter().map(|a| a.reg()).collect();
        assert_eq!(regs.len(), 3);
        for addr in &addrs {
            assert_eq!((addr.start_array, addr.end_array), (addrs[0].start_array, addrs[0].end_array));
        }
    }

    #[test]
    fn rotating_cursor_does_not_miss_reclaimed_space_across_full_revolution() {
        // Regression for the wrap-around termination bug: allocate, free, and
        // reallocate num_crossbars single-tile vectors in a tight loop. Every
        // allocation must succeed.
        let num_crossbars = 6;
        let mut a = Allocator::with_geometry(Geometry::new(num_crossbars, 8, 32, 32));
        for _ in 0..3 {
            let mut addrs = Vec::new();
            for _ in 0..num_crossbars {
                addrs.push(a.allocate(8).unwrap());
            }
            assert!(a.allocate(8).is_err(), "fabric should be fully exhausted");
            for addr in addrs {
                a.free(addr);
            }
            assert_eq!(a.used_tile_count(), 0);
        }
    }

    #[test]
    fn no_two_live_addresses_overlap() {
        let mut a = tiny();
        let first = a.allocate(8).unwrap();
        let second = a.allocate(8).unwrap();
        let same_reg = first.reg() == second.reg();
        let disjoint_tiles = first.end_array <= second.start_array || second.end_array <= first.start_array;
        assert!(!same_reg || disjoint_tiles);
    }

    use proptest::prelude::*;

    proptest! {
        /// Testable property #1: after any sequence of allocate/free calls,
        /// the bitmap's used-cell count equals the sum of tile spans of the
        /// addresses still live, never more and never less.
        #[test]
        fn bitmap_count_tracks_live_allocations(sizes in prop::collection::vec(1usize..9, 1..16)) {
            let mut a = Allocator::with_geometry(Geometry::new(8, 8, 32, 32));
            let mut live = Vec::new();
            let mut expected_tiles = 0usize;
            for size in sizes {
                match a.allocate(size) {
                    Ok(addr) => {
                        expected_tiles += addr.num_tiles();
                        live.push(addr);
                    }
                    Err(PimError::OutOfMemory(_)) => {}
                    Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
                }
                prop_assert_eq!(a.used_tile_count(), expected_tiles);
            }
            for addr in live.drain(..) {
                expected_tiles -= addr.num_tiles();
                a.free(addr);
                prop_assert_eq!(a.used_tile_count(), expected_tiles);
            }
            prop_assert_eq!(a.used_tile_count(), 0);
        }
    }
}
