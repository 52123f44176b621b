/*!
algorithms.rs - warp-parallel reduction primitives built on `Vector<T>` and
`Driver::warp_move`.

Overview
========
Ported from the reference's `sum`/`warpBroadcast`/`warpShift`, which all
follow the same shape: allocate scratch storage via the bitwise-not gate
(cheaper on real hardware than a dedicated "allocate uninitialized"
primitive, and every lane the loop doesn't overwrite is intentionally
left holding that complement garbage, since the caller never reads it),
then rearrange lanes with `warp_move` in a pattern that halves the active
range each step.

`warp_shift`'s distance loop is rewritten over `isize` rather than the
reference's unsigned `size_t`, which underflows to a very large index
instead of terminating when counting down to zero on the positive-shift
branch; see SPEC_FULL.md.
*/

use crate::driver::PimElement;
use crate::error::Result;
use crate::fabric::with_fabric;
use crate::vector::Vector;

/// Reduction sum over all `x.size()` elements: an intra-warp tree
/// reduction halving the active lane range each step, followed by a
/// host-side fold across warps.
pub fn sum<T>(x: &Vector<T>) -> Result<T>
where
    T: PimElement + std::ops::Add<Output = T>,
{
    let warp_size = with_fabric(|fabric| fabric.driver.warp_size());
    let mut z = x.try_clone()?;

    let mut j = 0;
    while (1usize << j) < warp_size {
        let mut y = z.bitwise_not()?;
        let half = warp_size >> (j + 1);
        for i in 0..half {
            y.warp_move(i + half, i)?;
        }
        z = z.add(&y)?;
        j += 1;
    }

    let mut output = z.get(0)?;
    let mut i = warp_size;
    while i < z.size() {
        output = output + z.get(i)?;
        i += warp_size;
    }
    Ok(output)
}

/// Broadcasts lane 0 of every warp to every other lane in that warp.
pub fn warp_broadcast<T: PimElement>(x: &Vector<T>) -> Result<Vector<T>> {
    let warp_size = with_fabric(|fabric| fabric.driver.warp_size());
    let mut output = x.bitwise_not()?;
    for i in 1..warp_size {
        output.warp_move(0, i)?;
    }
    Ok(output)
}

/// Shifts every lane's value `distance` positions within its warp.
/// Lanes that would read past the warp boundary are left holding
/// whatever the bitwise-not scratch happened to contain. `distance == 0`
/// returns an independent copy of `x`.
pub fn warp_shift<T: PimElement>(x: &Vector<T>, distance: isize) -> Result<Vector<T>> {
    if distance == 0 {
        return x.try_clone();
    }

    let warp_size = with_fabric(|fabric| fabric.driver.warp_size()) as isize;
    let mut output = x.bitwise_not()?;

    if distance > 0 {
        let mut i = warp_size - distance;
        while i >= 0 {
            output.warp_move(i as usize, (i + distance) as usize)?;
            i -= 1;
        }
    } else {
        let mut i = -distance;
        while i < warp_size {
            output.warp_move(i as usize, (i + distance) as usize)?;
            i += 1;
        }
    }

    Ok(output)
}
