#![doc = r#"
Host-side programming model for a memristive crossbar processing-in-memory
accelerator.

Modules:
- constants: fabric geometry (crossbar count, tile height/width, warp size) and `RangeMask`
- error: the crate's `PimError` enum and `Result` alias
- address: hardware addresses, a contiguous run of tiles at one register index
- driver: the `Driver` hardware ABI trait and the `PimElement` element-type trait
- sim_driver: an in-process `Driver` backed by flat `Vec<u32>` storage, for tests and examples
- allocator: the rotating-cursor register allocator
- fabric: the thread-local driver+allocator singleton `Vector<T>` reaches into
- vector: `Vector<T>`, the typed value-semantic vector and its operators
- algorithms: warp-parallel `sum`, `warp_broadcast`, `warp_shift`
"#]

pub mod address;
pub mod algorithms;
pub mod allocator;
pub mod constants;
pub mod driver;
pub mod error;
pub mod fabric;
pub mod sim_driver;
pub mod vector;

pub use address::Address;
pub use algorithms::{sum, warp_broadcast, warp_shift};
pub use allocator::Allocator;
pub use constants::{Geometry, RangeMask, ALL_CROSSBARS, ALL_ROWS};
pub use driver::{DType, Driver, PimElement};
pub use error::{PimError, Result};
pub use fabric::{install_driver, reset_fabric, reset_fabric_with_geometry, with_fabric, Fabric};
pub use sim_driver::SimDriver;
pub use vector::Vector;
