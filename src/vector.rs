/*!
vector.rs - a value-semantic typed vector backed by a crossbar register.

Overview
========
`Vector<T>` owns a contiguous run of crossbar tiles at one register index
(an `Address`), obtained from the thread's [`Fabric`](crate::fabric::Fabric)
on construction and released back to it on drop. Every element-wise
operation lowers to one or more `Driver` gate dispatches over the vector's
current mask (`curr_mask`, by default every row of every owned tile).

Fallible vs. panicking API
===========================
Every operation has a `Result`-returning named method (`add`, `sub`,
`get`, ...) that reports shape mismatches, out-of-range indices, and
moved-from use as `PimError` rather than panicking. `std::ops` trait
methods can't return `Result`, so the arithmetic/bitwise/negation
operators are implemented for `&Vector<T>` by calling the named method and
`.expect`-ing success, the same trade the reference's C++ operator
overloads make implicitly (a shape mismatch there is undefined behavior;
here it's a panic, strictly better but still not something a caller
should route around with `catch_unwind`). Code that needs to handle a
shape mismatch without panicking should call the named method directly.

Comparison methods (`lt`, `le`, `gt`, `ge`, `eq_vec`) stay named-method
only: they return `Vector<i32>`, not `bool`, so `PartialOrd`/`PartialEq`
(whose methods must return `bool`/`Ordering`) aren't the right fit.
*/

use std::marker::PhantomData;

use crate::address::Address;
use crate::constants::RangeMask;
use crate::driver::{Driver, PimElement};
use crate::error::{PimError, Result};
use crate::fabric::with_fabric;

/// A fixed-length vector of `n` elements of type `T`, stored across one
/// register index of a contiguous run of crossbar tiles.
pub struct Vector<T: PimElement> {
    n: usize,
    addr: Address,
    curr_mask: RangeMask,
    _marker: PhantomData<T>,
}

impl<T: PimElement> Vector<T> {
    /// Allocates a new length-`n` vector, every element set to `fill`.
    pub fn new(n: usize, fill: T) -> Result<Self> {
        let (addr, default_mask) = with_fabric(|fabric| -> Result<(Address, RangeMask)> {
            let addr = fabric.allocator.allocate(n)?;
            Ok((addr, fabric.allocator.geometry().all_rows()))
        })?;
        let vector = Self { n, addr, curr_mask: default_mask, _marker: PhantomData };
        let word = fill.to_bits();
        with_fabric(|fabric| {
            fabric.driver.write_masked(vector.tile_range(), vector.reg(), vector.row_mask(), word);
        });
        Ok(vector)
    }

    /// Allocates a new vector and fills it element-by-element from a host
    /// slice, analogous to the reference's `std::vector` constructor.
    pub fn from_host_slice(values: &[T]) -> Result<Self> {
        let mut vector = Self::new(values.len(), T::zero_value())?;
        for (i, value) in values.iter().enumerate() {
            vector.set(i, *value)?;
        }
        Ok(vector)
    }

    /// Allocates a fresh copy of `self`, independent of the source (a
    /// `copy` gate dispatch across every owned cell). Not `Clone`, since
    /// allocation can fail and `Clone::clone` has no way to report that.
    pub fn try_clone(&self) -> Result<Self> {
        self.check_live()?;
        let out = Self::new(self.n, T::zero_value())?;
        with_fabric(|fabric| {
            fabric.driver.copy(self.reg(), out.reg(), self.tile_range(), self.row_mask());
        });
        Ok(out)
    }

    fn tile_range(&self) -> RangeMask {
        RangeMask::new(self.addr.start_array, self.addr.end_array.saturating_sub(1).max(self.addr.start_array), 1)
    }

    fn row_mask(&self) -> RangeMask {
        self.curr_mask
    }

    fn reg(&self) -> usize {
        self.addr.reg().expect("use after move: vector has no live address")
    }

    fn check_live(&self) -> Result<()> {
        if self.addr.is_null() {
            Err(PimError::InvalidMove)
        } else {
            Ok(())
        }
    }

    fn check_bounds(&self, i: usize) -> Result<()> {
        self.check_live()?;
        if i >= self.n {
            Err(PimError::OutOfRange { index: i, len: self.n })
        } else {
            Ok(())
        }
    }

    fn check_same_shape(&self, other: &Self) -> Result<()> {
        self.check_live()?;
        other.check_live()?;
        if self.n != other.n {
            Err(PimError::ShapeMismatch { expected: self.n, actual: other.n })
        } else {
            Ok(())
        }
    }

    /// Number of elements.
    pub fn size(&self) -> usize {
        self.n
    }

    /// Address owning this vector's storage. Exposed so [`crate::algorithms`]
    /// can address sibling tiles (e.g. warp-shift's neighboring-lane reads)
    /// without this module growing algorithm-specific methods.
    pub fn address(&self) -> Address {
        self.addr
    }

    /// Restricts subsequent operations to the rows selected by `mask`,
    /// mirroring the reference's `setMask`. Does not move or copy data.
    pub fn set_mask(&mut self, mask: RangeMask) {
        self.curr_mask = mask;
    }

    /// Reads element `i` from the host's point of view (one scalar driver
    /// read at the tile/row the flat index `i` maps to).
    pub fn get(&self, i: usize) -> Result<T> {
        self.check_bounds(i)?;
        let (tile, row) = self.locate(i);
        let word = with_fabric(|fabric| fabric.driver.read(tile, self.reg(), row));
        Ok(T::from_bits(word))
    }

    /// Writes element `i`.
    pub fn set(&mut self, i: usize, value: T) -> Result<()> {
        self.check_bounds(i)?;
        let (tile, row) = self.locate(i);
        let reg = self.reg();
        with_fabric(|fabric| fabric.driver.write(tile, reg, row, value.to_bits()));
        Ok(())
    }

    /// Logical index `i` lives at tile `start_array + i / warp_size()`, row
    /// `i % warp_size()`. This stride is `warp_size()`, not the
    /// `crossbar_height` the allocator sizes tiles by — an intentional,
    /// preserved discrepancy (SPEC_FULL.md open questions), not a bug:
    /// allocation reserves `ceil(n / crossbar_height)` tiles but element
    /// access densely addresses only `ceil(n / warp_size())` of them.
    fn locate(&self, i: usize) -> (usize, usize) {
        let warp_size = with_fabric(|fabric| fabric.driver.warp_size());
        let tile = self.addr.start_array + i / warp_size;
        let row = i % warp_size;
        (tile, row)
    }

    /// Intra-warp data movement: each lane's `output_thread`-th row takes
    /// the value currently at its `input_thread`-th row, for every tile
    /// this vector owns.
    pub fn warp_move(&mut self, input_thread: usize, output_thread: usize) -> Result<()> {
        self.check_live()?;
        let reg = self.reg();
        let tiles = self.tile_range();
        with_fabric(|fabric| fabric.driver.warp_move(input_thread, output_thread, reg, tiles));
        Ok(())
    }

    fn binary_op(&self, other: &Self, gate: impl FnOnce(&mut dyn Driver, usize, usize, usize, RangeMask, RangeMask)) -> Result<Self> {
        self.check_same_shape(other)?;
        let out = Self::new(self.n, T::zero_value())?;
        with_fabric(|fabric| gate(&mut *fabric.driver, self.reg(), other.reg(), out.reg(), self.tile_range(), self.row_mask()));
        Ok(out)
    }

    fn unary_op(&self, gate: impl FnOnce(&mut dyn Driver, usize, usize, RangeMask, RangeMask)) -> Result<Self> {
        self.check_live()?;
        let out = Self::new(self.n, T::zero_value())?;
        with_fabric(|fabric| gate(&mut *fabric.driver, self.reg(), out.reg(), self.tile_range(), self.row_mask()));
        Ok(out)
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        let dtype = T::DTYPE;
        self.binary_op(other, |d, x, y, z, tiles, rows| d.add(dtype, x, y, z, tiles, rows))
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        let dtype = T::DTYPE;
        self.binary_op(other, |d, x, y, z, tiles, rows| d.subtract(dtype, x, y, z, tiles, rows))
    }

    pub fn mul(&self, other: &Self) -> Result<Self> {
        let dtype = T::DTYPE;
        self.binary_op(other, |d, x, y, z, tiles, rows| d.multiply(dtype, x, y, z, tiles, rows))
    }

    pub fn div(&self, other: &Self) -> Result<Self> {
        let dtype = T::DTYPE;
        self.binary_op(other, |d, x, y, z, tiles, rows| d.divide(dtype, x, y, z, tiles, rows))
    }

    pub fn rem(&self, other: &Self) -> Result<Self> {
        let dtype = T::DTYPE;
        self.binary_op(other, |d, x, y, z, tiles, rows| d.modulo(dtype, x, y, z, tiles, rows))
    }

    pub fn neg(&self) -> Result<Self> {
        let dtype = T::DTYPE;
        self.unary_op(|d, x, z, tiles, rows| d.negate(dtype, x, z, tiles, rows))
    }

    pub fn abs(&self) -> Result<Self> {
        let dtype = T::DTYPE;
        self.unary_op(|d, x, z, tiles, rows| d.absolute(dtype, x, z, tiles, rows))
    }

    pub fn bitwise_not(&self) -> Result<Self> {
        self.unary_op(|d, x, z, tiles, rows| d.bitwise_not(x, z, tiles, rows))
    }

    pub fn bitwise_and(&self, other: &Self) -> Result<Self> {
        self.binary_op(other, |d, x, y, z, tiles, rows| d.bitwise_and(x, y, z, tiles, rows))
    }

    pub fn bitwise_or(&self, other: &Self) -> Result<Self> {
        self.binary_op(other, |d, x, y, z, tiles, rows| d.bitwise_or(x, y, z, tiles, rows))
    }

    pub fn bitwise_xor(&self, other: &Self) -> Result<Self> {
        self.binary_op(other, |d, x, y, z, tiles, rows| d.bitwise_xor(x, y, z, tiles, rows))
    }

    /// Per-element sign: -1/0/1, as a fresh `i32` vector.
    pub fn sign(&self) -> Result<Vector<i32>> {
        self.check_live()?;
        let dtype = T::DTYPE;
        let out = Vector::<i32>::new(self.n, 0)?;
        with_fabric(|fabric| fabric.driver.sign(dtype, self.reg(), out.reg(), self.tile_range(), self.row_mask()));
        Ok(out)
    }

    /// Per-element zero test: 1 where the element is zero, else 0.
    pub fn zero(&self) -> Result<Vector<i32>> {
        self.check_live()?;
        let dtype = T::DTYPE;
        let out = Vector::<i32>::new(self.n, 0)?;
        with_fabric(|fabric| fabric.driver.zero(dtype, self.reg(), out.reg(), self.tile_range(), self.row_mask()));
        Ok(out)
    }

    /// `self < other`, elementwise, as 0/1 in an `i32` vector: whether the
    /// sign of `self - other` is -1.
    pub fn lt(&self, other: &Self) -> Result<Vector<i32>> {
        let diff = self.sub(other)?;
        let sign = diff.sign()?;
        sign.eq_scalar(-1)
    }

    pub fn le(&self, other: &Self) -> Result<Vector<i32>> {
        let gt = self.gt(other)?;
        gt.eq_scalar(0)
    }

    pub fn gt(&self, other: &Self) -> Result<Vector<i32>> {
        let diff = self.sub(other)?;
        let sign = diff.sign()?;
        sign.eq_scalar(1)
    }

    pub fn ge(&self, other: &Self) -> Result<Vector<i32>> {
        let lt = self.lt(other)?;
        lt.eq_scalar(0)
    }

    /// `self == other`, elementwise, as 0/1: the zero-test of `self - other`.
    pub fn eq_vec(&self, other: &Self) -> Result<Vector<i32>> {
        let diff = self.sub(other)?;
        diff.zero()
    }
}

impl Vector<i32> {
    /// 1 where this `i32` vector's element equals `value`, else 0. Used to
    /// build `lt`/`le`/`gt`/`ge` out of `sign`/`sub` without a dedicated
    /// driver gate for "equals a host constant".
    fn eq_scalar(&self, value: i32) -> Result<Vector<i32>> {
        self.check_live()?;
        let constant = Vector::<i32>::new(self.n, value)?;
        self.eq_vec(&constant)
    }
}

impl<T: PimElement> Drop for Vector<T> {
    fn drop(&mut self) {
        if !self.addr.is_null() {
            with_fabric(|fabric| fabric.allocator.free(self.addr));
            self.addr = Address::NULL;
        }
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $named:ident) => {
        impl<T: PimElement> std::ops::$trait for &Vector<T> {
            type Output = Vector<T>;
            fn $method(self, rhs: &Vector<T>) -> Vector<T> {
                self.$named(rhs).expect(concat!("Vector::", stringify!($named), " failed"))
            }
        }
    };
}

macro_rules! impl_unary_op {
    ($trait:ident, $method:ident, $named:ident) => {
        impl<T: PimElement> std::ops::$trait for &Vector<T> {
            type Output = Vector<T>;
            fn $method(self) -> Vector<T> {
                self.$named().expect(concat!("Vector::", stringify!($named), " failed"))
            }
        }
    };
}

impl_binary_op!(Add, add, add);
impl_binary_op!(Sub, sub, sub);
impl_binary_op!(Mul, mul, mul);
impl_binary_op!(Div, div, div);
impl_binary_op!(Rem, rem, rem);
impl_binary_op!(BitAnd, bitand, bitwise_and);
impl_binary_op!(BitOr, bitor, bitwise_or);
impl_binary_op!(BitXor, bitxor, bitwise_xor);
impl_unary_op!(Neg, neg, neg);
impl_unary_op!(Not, not, bitwise_not);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::Geometry;
    use crate::fabric::reset_fabric_with_geometry;

    fn small_geometry() {
        // crossbar_height must be >= crossbar_n here: element access strides
        // by warp_size() (== crossbar_n), not crossbar_height, so a smaller
        // height would address rows past what SimDriver allocated per tile.
        reset_fabric_with_geometry(Geometry::new(64, 32, 512, 32));
    }

    #[test]
    fn construction_fills_every_element() {
        small_geometry();
        let v = Vector::<i32>::new(5, 7).unwrap();
        for i in 0..5 {
            assert_eq!(v.get(i).unwrap(), 7);
        }
    }

    #[test]
    fn round_trip_from_host_slice() {
        small_geometry();
        let values = [1, 2, 3, 4, 5];
        let v = Vector::<i32>::from_host_slice(&values).unwrap();
        for (i, expected) in values.iter().enumerate() {
            assert_eq!(v.get(i).unwrap(), *expected);
        }
    }

    #[test]
    fn copy_is_independent_of_source() {
        small_geometry();
        let mut a = Vector::<i32>::from_host_slice(&[1, 2, 3]).unwrap();
        let b = a.try_clone().unwrap();
        a.set(0, 99).unwrap();
        assert_eq!(b.get(0).unwrap(), 1);
    }

    #[test]
    fn out_of_range_access_is_rejected() {
        small_geometry();
        let v = Vector::<i32>::new(3, 0).unwrap();
        assert_eq!(v.get(3), Err(PimError::OutOfRange { index: 3, len: 3 }));
    }

    #[test]
    fn shape_mismatch_rejected_for_binary_op() {
        small_geometry();
        let a = Vector::<i32>::new(3, 1).unwrap();
        let b = Vector::<i32>::new(4, 1).unwrap();
        assert_eq!(a.add(&b), Err(PimError::ShapeMismatch { expected: 3, actual: 4 }));
    }

    #[test]
    fn elementwise_add_matches_scalar_semantics() {
        small_geometry();
        let a = Vector::<i32>::from_host_slice(&[1, 2, 3]).unwrap();
        let b = Vector::<i32>::from_host_slice(&[10, 20, 30]).unwrap();
        let c = &a + &b;
        assert_eq!(c.get(0).unwrap(), 11);
        assert_eq!(c.get(1).unwrap(), 22);
        assert_eq!(c.get(2).unwrap(), 33);
    }

    #[test]
    fn operator_chain_matches_reference_usage_example() {
        small_geometry();
        let x = Vector::<f32>::from_host_slice(&[2.0, 3.0]).unwrap();
        let y = Vector::<f32>::from_host_slice(&[4.0, 5.0]).unwrap();
        let z = &(&x * &y) + &x;
        assert_eq!(z.get(0).unwrap(), 10.0);
        assert_eq!(z.get(1).unwrap(), 18.0);
    }

    #[test]
    fn bitwise_not_matches_scalar_semantics() {
        small_geometry();
        let a = Vector::<i32>::from_host_slice(&[0, -1]).unwrap();
        let b = !&a;
        assert_eq!(b.get(0).unwrap(), !0);
        assert_eq!(b.get(1).unwrap(), !(-1));
    }

    #[test]
    fn comparison_lt_reports_sign_semantics() {
        small_geometry();
        let a = Vector::<i32>::from_host_slice(&[1, 5, 3]).unwrap();
        let b = Vector::<i32>::from_host_slice(&[2, 5, 1]).unwrap();
        let result = a.lt(&b).unwrap();
        assert_eq!(result.get(0).unwrap(), 1);
        assert_eq!(result.get(1).unwrap(), 0);
        assert_eq!(result.get(2).unwrap(), 0);
    }

    #[test]
    fn equality_reports_one_iff_equal() {
        small_geometry();
        let a = Vector::<i32>::from_host_slice(&[1, 5, 3]).unwrap();
        let b = Vector::<i32>::from_host_slice(&[1, 6, 3]).unwrap();
        let result = a.eq_vec(&b).unwrap();
        assert_eq!(result.get(0).unwrap(), 1);
        assert_eq!(result.get(1).unwrap(), 0);
        assert_eq!(result.get(2).unwrap(), 1);
    }

    #[test]
    fn moved_from_vector_rejects_further_use() {
        small_geometry();
        let mut v = Vector::<i32>::new(3, 0).unwrap();
        v.addr = Address::NULL;
        assert_eq!(v.get(0), Err(PimError::InvalidMove));
    }

    #[test]
    fn release_frees_allocator_space() {
        small_geometry();
        let before = with_fabric(|fabric| fabric.allocator.used_tile_count());
        {
            let _v = Vector::<i32>::new(8, 0).unwrap();
            let during = with_fabric(|fabric| fabric.allocator.used_tile_count());
            assert!(during > before);
        }
        let after = with_fabric(|fabric| fabric.allocator.used_tile_count());
        assert_eq!(after, before);
    }
}
