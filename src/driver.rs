/*!
driver.rs - the hardware ABI: the macro-instructions the core issues to the
crossbar fabric, as a Rust trait.

Overview
========
This is the seam the teacher's `bus::interfaces::PpuBus` and `mapper::Mapper`
traits play for the CPU core: a small set of methods a concrete backing
store implements once, so the layers above (`allocator`, `vector`,
`algorithms`) never know whether they're talking to real hardware or an
in-process stub (`sim_driver::SimDriver`).

The reference ABI templates its typed gates over an element type `T`
(`template <class T> void add(...)`). A Rust trait method can't be both
generic and object-safe, and the fabric singleton (`fabric.rs`) needs a
`Box<dyn Driver>` so a production host program can install a real hardware
backend at startup without this crate knowing its concrete type. So the
typed gates take a runtime `DType` tag instead of a type parameter; the
vector layer picks the tag from `T: PimElement` and the driver dispatches
on it. Bitwise gates were already untyped in the reference and stay that
way here.
*/

use crate::constants::RangeMask;

/// Which element type a typed gate should interpret its operand bits as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    I32,
    F32,
}

/// A 32-bit, trivially bit-castable element type a `Vector<T>` can hold.
/// Implemented for `i32` and `f32`, the two element types the design is
/// tested against.
pub trait PimElement: Copy + PartialEq + std::fmt::Debug + 'static {
    const DTYPE: DType;

    /// Bit-cast this value to the 32-bit word the driver stores.
    fn to_bits(self) -> u32;
    /// Bit-cast a 32-bit word back into this element type.
    fn from_bits(bits: u32) -> Self;
    /// The additive identity, used as the default fill for `Vector::new`.
    fn zero_value() -> Self;
}

impl PimElement for i32 {
    const DTYPE: DType = DType::I32;

    fn to_bits(self) -> u32 {
        self as u32
    }
    fn from_bits(bits: u32) -> Self {
        bits as i32
    }
    fn zero_value() -> Self {
        0
    }
}

impl PimElement for f32 {
    const DTYPE: DType = DType::F32;

    fn to_bits(self) -> u32 {
        f32::to_bits(self)
    }
    fn from_bits(bits: u32) -> Self {
        f32::from_bits(bits)
    }
    fn zero_value() -> Self {
        0.0
    }
}

/// The hardware ABI: scalar read/write, masked write, typed arithmetic and
/// unary gates, untyped bitwise gates, intra-warp move, and a warp-size
/// query. All operations are synchronous from the core's viewpoint; there
/// is no suspension, blocking, or reordering of driver calls by the core.
///
/// Object-safe by construction (no generic methods) so it can back a
/// `Box<dyn Driver>` in the process-wide fabric singleton.
pub trait Driver {
    /// Fetches a single 32-bit word.
    fn read(&self, tile: usize, reg: usize, row: usize) -> u32;

    /// Stores a word to a single (tile, reg, row) cell.
    fn write(&mut self, tile: usize, reg: usize, row: usize, word: u32);

    /// Stores a word to every cell selected by the Cartesian product of
    /// `tiles` and `rows`.
    fn write_masked(&mut self, tiles: RangeMask, reg: usize, rows: RangeMask, word: u32);

    /// `regZ[tile,row] = regX[tile,row] + regY[tile,row]` for every
    /// selected `(tile, row)`, interpreting operand bits per `dtype`.
    fn add(&mut self, dtype: DType, reg_x: usize, reg_y: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask);
    fn subtract(&mut self, dtype: DType, reg_x: usize, reg_y: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask);
    fn multiply(&mut self, dtype: DType, reg_x: usize, reg_y: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask);
    fn divide(&mut self, dtype: DType, reg_x: usize, reg_y: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask);
    fn modulo(&mut self, dtype: DType, reg_x: usize, reg_y: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask);

    fn negate(&mut self, dtype: DType, reg_x: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask);
    fn absolute(&mut self, dtype: DType, reg_x: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask);
    /// Writes -1/0/1 by sign of the element.
    fn sign(&mut self, dtype: DType, reg_x: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask);
    /// Writes 1 where the element is zero, 0 otherwise.
    fn zero(&mut self, dtype: DType, reg_x: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask);

    fn bitwise_not(&mut self, reg_x: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask);
    fn bitwise_and(&mut self, reg_x: usize, reg_y: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask);
    fn bitwise_or(&mut self, reg_x: usize, reg_y: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask);
    fn bitwise_xor(&mut self, reg_x: usize, reg_y: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask);
    fn copy(&mut self, reg_x: usize, reg_z: usize, tiles: RangeMask, rows: RangeMask);

    /// Intra-warp warp-parallel NOT move within each selected tile:
    /// `reg[tile, output_row] = !reg[tile, input_row]`. The complement is
    /// not incidental: `algorithms.rs`'s reductions allocate scratch with
    /// `bitwise_not` and rely on the move's own negation to cancel it
    /// (double-NOT recovers the original value), matching the reference
    /// gate of the same name.
    fn warp_move(&mut self, input_row: usize, output_row: usize, reg: usize, tiles: RangeMask);

    /// The number of lanes in a warp (`CROSSBAR_N`).
    fn warp_size(&self) -> usize;
}
