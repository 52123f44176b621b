/*!
address.rs - hardware address: a horizontally contiguous run of crossbar
tiles, all holding the same register index.
*/

/// Names a horizontally contiguous run of tiles `[start_array, end_array)`
/// all holding register index `reg`. `reg == -1` is the sentinel for "no
/// allocation", used to mark a moved-from vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    pub start_array: usize,
    pub end_array: usize,
    pub reg: isize,
}

impl Address {
    pub const NULL: Address = Address { start_array: 0, end_array: 0, reg: -1 };

    pub const fn new(start_array: usize, end_array: usize, reg: usize) -> Self {
        Self { start_array, end_array, reg: reg as isize }
    }

    /// Whether this address owns no allocation (`reg == -1`).
    pub const fn is_null(&self) -> bool {
        self.reg < 0
    }

    /// Number of contiguous tiles this address spans.
    pub const fn num_tiles(&self) -> usize {
        self.end_array - self.start_array
    }

    /// The register index, if this address is not null.
    pub fn reg(&self) -> Option<usize> {
        (!self.is_null()).then_some(self.reg as usize)
    }
}

impl Default for Address {
    fn default() -> Self {
        Self::NULL
    }
}
