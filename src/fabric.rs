/*!
fabric.rs - the process's view of the crossbar hardware: a driver and the
allocator that partitions its registers, reachable without threading
either through every call site.

Overview
========
`Vector<T>` wants ergonomic operator overloads (`x * y + x`), but
`std::ops::Add::add(self, rhs)` has a fixed signature with no room for a
`&mut Driver` or `&mut Allocator` argument. So the driver and allocator
move out of the call signature and into a single collaborator, `Fabric`,
reached from inside `Vector<T>`'s methods.

The reference treats this collaborator as process-global state installed
once at startup. A `thread_local!` is used here instead of a
`static` behind a `Mutex` or `OnceLock`: Rust's default test harness runs
every `#[test]` on its own OS thread, so a thread-local gives each test an
independently initialized, automatically torn-down fabric with no shared
lock and no explicit reset race between tests running concurrently. A
single-threaded production binary sees exactly one thread-local instance,
which behaves like the reference's singleton.
*/

use std::cell::RefCell;

use crate::allocator::Allocator;
use crate::constants::Geometry;
use crate::driver::Driver;
use crate::sim_driver::SimDriver;

pub struct Fabric {
    pub driver: Box<dyn Driver>,
    pub allocator: Allocator,
}

impl Fabric {
    fn new_default() -> Self {
        Self::with_geometry(Geometry::default())
    }

    fn with_geometry(geometry: Geometry) -> Self {
        Self { driver: Box::new(SimDriver::with_geometry(geometry)), allocator: Allocator::with_geometry(geometry) }
    }
}

thread_local! {
    static FABRIC: RefCell<Fabric> = RefCell::new(Fabric::new_default());
}

/// Runs `f` with exclusive access to this thread's fabric.
pub fn with_fabric<R>(f: impl FnOnce(&mut Fabric) -> R) -> R {
    FABRIC.with(|cell| f(&mut cell.borrow_mut()))
}

/// Replaces this thread's fabric with one backed by `driver`, with a fresh
/// allocator sized to `geometry`. Intended for host programs that want to
/// install a real hardware driver in place of the in-process simulator, and
/// for tests that want a small fabric instead of the build-time default.
pub fn install_driver(driver: Box<dyn Driver>, geometry: Geometry) {
    FABRIC.with(|cell| {
        *cell.borrow_mut() = Fabric { driver, allocator: Allocator::with_geometry(geometry) };
    });
}

/// Resets this thread's fabric to a fresh `SimDriver` at the build-time
/// default geometry, discarding all outstanding allocations. Meant for test
/// harnesses that want a clean slate between cases without relying on
/// `Vector` drop order.
pub fn reset_fabric() {
    FABRIC.with(|cell| {
        *cell.borrow_mut() = Fabric::new_default();
    });
}

/// Like [`reset_fabric`], but at a caller-chosen geometry instead of the
/// build-time default. Tests that want a small fabric to exercise
/// allocator exhaustion use this rather than the real 64Ki-tile default.
pub fn reset_fabric_with_geometry(geometry: Geometry) {
    FABRIC.with(|cell| {
        *cell.borrow_mut() = Fabric::with_geometry(geometry);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fabric_uses_build_time_geometry() {
        with_fabric(|fabric| {
            assert_eq!(fabric.allocator.geometry(), Geometry::default());
        });
    }

    #[test]
    fn reset_fabric_with_geometry_replaces_allocator_and_driver() {
        let small = Geometry::new(4, 8, 32, 32);
        reset_fabric_with_geometry(small);
        with_fabric(|fabric| {
            assert_eq!(fabric.allocator.geometry(), small);
            assert_eq!(fabric.driver.warp_size(), 32);
        });
        reset_fabric();
    }

    #[test]
    fn install_driver_swaps_backing_store() {
        let geometry = Geometry::new(2, 8, 32, 32);
        install_driver(Box::new(SimDriver::with_geometry(geometry)), geometry);
        with_fabric(|fabric| {
            fabric.driver.write(0, 0, 0, 77);
            assert_eq!(fabric.driver.read(0, 0, 0), 77);
        });
        reset_fabric();
    }
}
