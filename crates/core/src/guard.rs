//! Bounds Guard
//!
//! Overflow and underflow predicates over cell offsets from the base of a
//! stack's storage array. Every cursor move and every cell access goes
//! through one of these checks first.
//!
//! ## Stack Layout
//!
//! ```text
//! ┌────────┬──────────┬──────┬──────┬──────┬──────────┬─────┐
//! │ header │ capacity │  v0  │  v1  │  v2  │   free   │ ... │
//! └────────┴──────────┴──────┴──────┴──────┴──────────┴─────┘
//!  0        1          ↑ HEADER_CELLS       ↑ cursor         ↑ capacity
//! ```
//!
//! - The cursor is the offset of the next free slot
//! - Live cells occupy `[HEADER_CELLS, cursor)`
//! - Empty: `cursor == HEADER_CELLS`; full: `cursor == capacity`
//! - Reading slot `s` underflows when `s < HEADER_CELLS`
//! - Writing slot `s` overflows when `s >= capacity`

use crate::error::{StackFault, StackResult};
use crate::stack::StackKind;

/// Header words at the front of every storage array: type header + capacity.
/// This is also the minimum legal stack extent.
pub const HEADER_CELLS: usize = 2;

/// Smallest storage capacity that can hold at least one cell
pub const MIN_CAPACITY: usize = HEADER_CELLS + 1;

/// True when `slot` lies in the header
#[inline(always)]
pub const fn underflows(slot: usize) -> bool {
    slot < HEADER_CELLS
}

/// True when `slot` lies at or past the end of storage
#[inline(always)]
pub const fn overflows(slot: usize, capacity: usize) -> bool {
    slot >= capacity
}

/// Check that `slot` may be read: it must hold a live cell below `cursor`.
///
/// `slot` is computed by the caller as `cursor - depth - 1`; a depth that
/// reaches past the bottom arrives here as `None`.
#[inline]
pub fn check_read(stack: StackKind, slot: Option<usize>) -> StackResult<usize> {
    match slot {
        Some(s) if !underflows(s) => Ok(s),
        _ => Err(StackFault::Underflow { stack }),
    }
}

/// Check that `slot` may be written without leaving storage
#[inline]
pub fn check_write(stack: StackKind, slot: usize, capacity: usize) -> StackResult<usize> {
    if overflows(slot, capacity) {
        Err(StackFault::Overflow { stack })
    } else {
        Ok(slot)
    }
}

/// Check that a cursor value satisfies `HEADER_CELLS <= cursor <= capacity`
#[inline]
pub fn check_cursor(stack: StackKind, cursor: usize, capacity: usize) -> StackResult<usize> {
    if cursor < HEADER_CELLS {
        Err(StackFault::Underflow { stack })
    } else if cursor > capacity {
        Err(StackFault::Overflow { stack })
    } else {
        Ok(cursor)
    }
}
