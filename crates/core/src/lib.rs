//! cellvm Core: the data stack and call stack of a tagged-cell virtual machine
//!
//! Key design principles:
//! - Cell: one 8-byte tagged word (fixnum, boolean, or heap reference)
//! - Stack: a heap array of cells plus a cursor, bounds-checked on every move
//! - Context: one heap and one pair of stacks, passed explicitly to every primitive
//!
//! # Modules
//!
//! - `tagged`: Cell encoding and the decoded `Tagged` view
//! - `heap`: Arena of arrays and vectors addressed by `Handle`
//! - `guard`: Overflow/underflow predicates and the header size
//! - `stack`: Stack storage, cursor, and `ValidatedCursor`
//! - `primitives`: Shuffle words (`dup`, `swap`, `rot`, `>r`, ...) and the `Primitive` table
//! - `bridge`: Stack ⇄ vector copying for snapshots
//! - `accessors`: `datastack` / `callstack` and their `set-` counterparts
//! - `context`: Per-computation state, fault recovery, save/restore
//! - `config`: Stack capacities from environment or TOML
//! - `error`: `StackFault` and the thread-local last-fault slot
//! - `ffi`: C ABI wrappers

pub mod accessors;
pub mod bridge;
pub mod config;
pub mod context;
pub mod error;
pub mod ffi;
pub mod guard;
pub mod heap;
pub mod primitives;
pub mod stack;
pub mod tagged;

// Re-export key types and functions
pub use bridge::{stack_to_vector, vector_to_stack};
pub use config::{ConfigError, StackConfig};
pub use context::{Context, Snapshot};
pub use error::{
    StackFault, StackResult, clear_last_fault, has_last_fault, set_last_fault, take_last_fault,
};
pub use guard::HEADER_CELLS;
pub use heap::{Handle, Heap, HeapId, Object};
pub use primitives::{Primitive, UnknownPrimitive};
pub use stack::{Stack, StackKind, StackStorage, ValidatedCursor};
pub use tagged::{Cell, Tagged};
