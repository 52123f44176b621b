/*!
sim_driver.rs - in-process `Driver` implementation backed by flat `Vec<u32>`
storage.

Overview
========
The design treats the gate-level circuit simulator and physical memristor
model as out-of-scope external collaborators; this is not that. It's the
minimal real backing store needed to exercise the allocator, vector, and
algorithm layers in tests and examples, playing the same role the
teacher's `bus::ram::Ram` plays behind the CPU's `Bus`: a flat array, real
reads and writes, no timing model.

Layout
======
Storage is one flat `Vec<u32>` of length `crossbar_r * num_crossbars *
crossbar_height`, indexed `((reg * num_crossbars) + tile) * crossbar_height
+ row`. Arithmetic/bitwise gates iterate the Cartesian product of the tile
and row masks and apply the operation cell by cell; this is adequate for a
reference/test implementation (real hardware does it in one shot across
every selected cell in parallel).
*/

use crate::constants::{Geometry, RangeMask};
use crate::driver::{DType, Driver};

pub struct SimDriver {
    geometry: Geometry,
    cells: Vec<u32>,
}

impl SimDriver {
    pub fn new() -> Self {
        Self::with_geometry(Geometry::default())
    }

    pub fn with_geometry(geometry: Geometry) -> Self {
        let len = geometry.crossbar_r * geometry.num_crossbars * geometry.crossbar_height;
        Self { geometry, cells: vec![0u32; len] }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    #[inline]
    fn index(&self, tile: usize, reg: usize, row: usize) -> usize {
        debug_assert!(tile < self.geometry.num_crossbars, "tile out of range");
        debug_assert!(reg < self.geometry.crossbar_r, "reg out of range");
        debug_assert!(row < self.geometry.crossbar_height, "row out of range");
        (reg * self.geometry.num_crossbars + tile) * self.geometry.crossbar_height + row
    }

    fn binary_gate(
        &mut self,
        dtype: DType,
        reg_x: usize,
        reg_y: usize,
        reg_z: usize,
        tiles: RangeMask,
        rows: RangeMask,
        float_op: impl Fn(f32, f32) -> f32,
        int_op: impl Fn(i32, i32) -> i32,
    ) {
        for tile in tiles.iter() {
            for row in rows.iter() {
                let x = self.cells[self.index(tile, reg_x, row)];
                let y = self.cells[self.index(tile, reg_y, row)];
                let result = match dtype {
                    DType::F32 => float_op(f32::from_bits(x), f32::from_bits(y)).to_bits(),
                    DType::I32 => int_op(x as i32, y as i32) as u32,
                };
                let out = self.index(tile, reg_z, row);
                self.cells[out] = result;
            }
        }
    }

    fn unary_gate(
        &mut self,
        dtype: DType,
        reg_x: usize,
        reg_z: usize,
        tiles: RangeMask,
        rows: RangeMask,
        float_op: impl Fn(f32) -> f32,
        int_op: impl Fn(i32) -> i32,
    ) {
        for tile in tiles.iter() {
            for row in rows.iter() {
                let x = self.cells[self.index(tile, reg_x, row)];
                let result = match dtype {
                    DType::F32 => float_op(f32::from_bits(x)).to_bits(),
                    DType::I32 => int_op(x as i32) as u32,
                };
                let out = self.index(tile, reg_z, row);
                self.cells[out] = result;
            }
        }
    }

    fn raw_binary(&mut self, reg_x: usize, reg_y: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask, f: impl Fn(u32, u32) -> u32) {
        for tile in tiles.iter() {
            for row in rows.iter() {
                let x = self.cells[self.index(tile, reg_x, row)];
                let y = self.cells[self.index(tile, reg_y, row)];
                let out = self.index(tile, reg_z, row);
                self.cells[out] = f(x, y);
            }
        }
    }
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for SimDriver {
    fn read(&self, tile: usize, reg: usize, row: usize) -> u32 {
        self.cells[self.index(tile, reg, row)]
    }

    fn write(&mut self, tile: usize, reg: usize, row: usize, word: u32) {
        let idx = self.index(tile, reg, row);
        self.cells[idx] = word;
    }

    fn write_masked(&mut self, tiles: RangeMask, reg: usize, rows: RangeMask, word: u32) {
        log::trace!("write_masked reg={reg} tiles={tiles:?} rows={rows:?}");
        for tile in tiles.iter() {
            for row in rows.iter() {
                let idx = self.index(tile, reg, row);
                self.cells[idx] = word;
            }
        }
    }

    fn add(&mut self, dtype: DType, reg_x: usize, reg_y: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask) {
        self.binary_gate(dtype, reg_x, reg_y, reg_z, tiles, rows, |a, b| a + b, i32::wrapping_add)
    }

    fn subtract(&mut self, dtype: DType, reg_x: usize, reg_y: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask) {
        self.binary_gate(dtype, reg_x, reg_y, reg_z, tiles, rows, |a, b| a - b, i32::wrapping_sub)
    }

    fn multiply(&mut self, dtype: DType, reg_x: usize, reg_y: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask) {
        self.binary_gate(dtype, reg_x, reg_y, reg_z, tiles, rows, |a, b| a * b, i32::wrapping_mul)
    }

    fn divide(&mut self, dtype: DType, reg_x: usize, reg_y: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask) {
        self.binary_gate(dtype, reg_x, reg_y, reg_z, tiles, rows, |a, b| a / b, i32::wrapping_div)
    }

    fn modulo(&mut self, dtype: DType, reg_x: usize, reg_y: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask) {
        self.binary_gate(dtype, reg_x, reg_y, reg_z, tiles, rows, |a, b| a % b, i32::wrapping_rem)
    }

    fn negate(&mut self, dtype: DType, reg_x: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask) {
        self.unary_gate(dtype, reg_x, reg_z, tiles, rows, |a| -a, i32::wrapping_neg)
    }

    fn absolute(&mut self, dtype: DType, reg_x: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask) {
        self.unary_gate(dtype, reg_x, reg_z, tiles, rows, f32::abs, i32::wrapping_abs)
    }

    fn sign(&mut self, dtype: DType, reg_x: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask) {
        for tile in tiles.iter() {
            for row in rows.iter() {
                let x = self.cells[self.index(tile, reg_x, row)];
                let s: i32 = match dtype {
                    DType::F32 => {
                        let v = f32::from_bits(x);
                        if v > 0.0 {
                            1
                        } else if v < 0.0 {
                            -1
                        } else {
                            0
                        }
                    }
                    DType::I32 => (x as i32).signum(),
                };
                let out = self.index(tile, reg_z, row);
                self.cells[out] = s as u32;
            }
        }
    }

    fn zero(&mut self, dtype: DType, reg_x: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask) {
        for tile in tiles.iter() {
            for row in rows.iter() {
                let x = self.cells[self.index(tile, reg_x, row)];
                let is_zero = match dtype {
                    DType::F32 => f32::from_bits(x) == 0.0,
                    DType::I32 => x == 0,
                };
                let out = self.index(tile, reg_z, row);
                self.cells[out] = is_zero as u32;
            }
        }
    }

    fn bitwise_not(&mut self, reg_x: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask) {
        for tile in tiles.iter() {
            for row in rows.iter() {
                let v = !self.cells[self.index(tile, reg_x, row)];
                let out = self.index(tile, reg_z, row);
                self.cells[out] = v;
            }
        }
    }

    fn bitwise_and(&mut self, reg_x: usize, reg_y: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask) {
        self.raw_binary(reg_x, reg_y, reg_z, tiles, rows, |x, y| x & y)
    }

    fn bitwise_or(&mut self, reg_x: usize, reg_y: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask) {
        self.raw_binary(reg_x, reg_y, reg_z, tiles, rows, |x, y| x | y)
    }

    fn bitwise_xor(&mut self, reg_x: usize, reg_y: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask) {
        self.raw_binary(reg_x, reg_y, reg_z, tiles, rows, |x, y| x ^ y)
    }

    fn copy(&mut self, reg_x: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask) {
        for tile in tiles.iter() {
            for row in rows.iter() {
                let v = self.cells[self.index(tile, reg_x, row)];
                let out = self.index(tile, reg_z, row);
                self.cells[out] = v;
            }
        }
    }

    fn warp_move(&mut self, input_row: usize, output_row: usize, reg: usize, tiles: RangeMask) {
        for tile in tiles.iter() {
            let v = self.cells[self.index(tile, reg, input_row)];
            let dst = self.index(tile, reg, output_row);
            self.cells[dst] = !v;
        }
    }

    fn warp_size(&self) -> usize {
        self.geometry.crossbar_n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_driver() -> SimDriver {
        SimDriver::with_geometry(Geometry::new(4, 8, 32, 32))
    }

    const SMALL_ROW: RangeMask = RangeMask::new(0, 0, 1);
    const SMALL_TILE: RangeMask = RangeMask::new(0, 0, 1);
    const ALL_ROWS_SMALL: RangeMask = RangeMask::new(0, 7, 1);

    #[test]
    fn write_then_read_roundtrips() {
        let mut d = tiny_driver();
        d.write(0, 0, 3, 42);
        assert_eq!(d.read(0, 0, 3), 42);
    }

    #[test]
    fn write_masked_covers_full_cartesian_product() {
        let mut d = tiny_driver();
        d.write_masked(RangeMask::new(0, 1, 1), 0, ALL_ROWS_SMALL, 7);
        for tile in 0..=1 {
            for row in 0..8 {
                assert_eq!(d.read(tile, 0, row), 7);
            }
        }
        assert_eq!(d.read(2, 0, 0), 0);
    }

    #[test]
    fn add_i32_gate() {
        let mut d = tiny_driver();
        d.write(0, 0, 0, 10u32);
        d.write(0, 1, 0, 5u32);
        d.add(DType::I32, 0, 1, 2, SMALL_TILE, SMALL_ROW);
        assert_eq!(d.read(0, 2, 0) as i32, 15);
    }

    #[test]
    fn add_f32_gate() {
        let mut d = tiny_driver();
        d.write(0, 0, 0, 8.0f32.to_bits());
        d.write(0, 1, 0, 0.5f32.to_bits());
        d.add(DType::F32, 0, 1, 2, SMALL_TILE, SMALL_ROW);
        assert_eq!(f32::from_bits(d.read(0, 2, 0)), 8.5);
    }

    #[test]
    fn bitwise_not_is_untyped() {
        let mut d = tiny_driver();
        d.write(0, 0, 0, 0b1010);
        d.bitwise_not(0, 1, SMALL_TILE, SMALL_ROW);
        assert_eq!(d.read(0, 1, 0), !0b1010u32);
    }

    #[test]
    fn warp_move_negates_value_between_rows() {
        let mut d = tiny_driver();
        d.write(0, 0, 3, 99);
        d.warp_move(3, 5, 0, SMALL_TILE);
        assert_eq!(d.read(0, 0, 5), !99u32);
    }

    #[test]
    fn sign_reports_negative_zero_positive() {
        let mut d = tiny_driver();
        d.write(0, 0, 0, (-5i32) as u32);
        d.write(0, 0, 1, 0i32 as u32);
        d.write(0, 0, 2, 5i32 as u32);
        d.sign(DType::I32, 0, 1, SMALL_TILE, RangeMask::new(0, 2, 1));
        assert_eq!(d.read(0, 1, 0) as i32, -1);
        assert_eq!(d.read(0, 1, 1) as i32, 0);
        assert_eq!(d.read(0, 1, 2) as i32, 1);
    }

    #[test]
    fn warp_size_reports_geometry_n() {
        let d = tiny_driver();
        assert_eq!(d.warp_size(), 32);
    }
}
