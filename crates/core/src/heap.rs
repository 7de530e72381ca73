//! Object Heap
//!
//! A simple arena of heap objects addressed by `Handle`. The stacks only
//! need two object kinds: fixed-capacity arrays (stack storage) and vectors
//! (stack snapshots). Objects are never reclaimed; collection is a concern
//! of the layer above.
//!
//! ## Array Layout
//!
//! ```text
//! Array object: HEADER_CELLS header words followed by data slots
//! ┌──────────┬──────────┬──────────┬──────────┬─────────┐
//! │  header  │ capacity │  slot 2  │  slot 3  │  ...    │
//! └──────────┴──────────┴──────────┴──────────┴─────────┘
//!  0          1          ↑ first stack cell
//! ```
//!
//! `object_size` reports the total number of cells, header included, which is
//! the bound the overflow check compares against.
//!
//! Every heap carries a process-unique [`HeapId`]. Stacks and validated
//! cursors remember the id of the heap their storage lives in, so a handle
//! is never resolved against a heap it did not come from.

use crate::error::{StackFault, StackResult};
use crate::guard::HEADER_CELLS;
use crate::tagged::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

/// Type code written into an array's header word
pub const ARRAY_TYPE: u64 = 8;

static NEXT_HEAP_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one heap, unique within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapId(u64);

/// Opaque reference to a heap object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

impl Handle {
    #[inline(always)]
    pub const fn new(index: u32) -> Self {
        Handle(index)
    }

    /// Rebuild a handle from an object cell's payload.
    ///
    /// Payloads wider than a handle name no object and yield `None`.
    #[inline]
    pub fn from_payload(payload: u64) -> Option<Self> {
        u32::try_from(payload).ok().map(Handle)
    }

    #[inline(always)]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// A heap-allocated object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    /// Fixed-capacity array; the first `HEADER_CELLS` slots are header words
    Array(Vec<Cell>),
    /// Growable sequence of cells
    Vector(Vec<Cell>),
}

impl Object {
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Array(_) => "array",
            Object::Vector(_) => "vector",
        }
    }
}

/// Arena of heap objects
#[derive(Debug)]
pub struct Heap {
    id: HeapId,
    objects: Vec<Object>,
}

impl Default for Heap {
    fn default() -> Self {
        Heap {
            id: HeapId(NEXT_HEAP_ID.fetch_add(1, Ordering::Relaxed)),
            objects: Vec::new(),
        }
    }
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> HeapId {
        self.id
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn insert(&mut self, object: Object) -> Handle {
        let index = self.objects.len();
        self.objects.push(object);
        Handle(index as u32)
    }

    /// Allocate an array of `capacity` cells, header included.
    ///
    /// Data slots are initialized to `f`.
    ///
    /// # Panics
    /// If `capacity` cannot hold the header; configuration validation keeps
    /// this from happening at runtime.
    pub fn alloc_array(&mut self, capacity: usize) -> Handle {
        assert!(
            capacity >= HEADER_CELLS,
            "alloc_array: capacity {} is smaller than the header",
            capacity
        );
        let mut cells = vec![Cell::f(); capacity];
        cells[0] = Cell::header(ARRAY_TYPE);
        cells[1] = Cell::fixnum(capacity as i64);
        self.insert(Object::Array(cells))
    }

    /// Allocate a vector holding `cells`
    pub fn alloc_vector(&mut self, cells: Vec<Cell>) -> Handle {
        self.insert(Object::Vector(cells))
    }

    pub fn get(&self, handle: Handle) -> StackResult<&Object> {
        self.objects
            .get(handle.0 as usize)
            .ok_or(StackFault::BadHandle(handle))
    }

    pub fn get_mut(&mut self, handle: Handle) -> StackResult<&mut Object> {
        self.objects
            .get_mut(handle.0 as usize)
            .ok_or(StackFault::BadHandle(handle))
    }

    /// Size of an object in cells (header included for arrays)
    pub fn object_size(&self, handle: Handle) -> StackResult<usize> {
        Ok(match self.get(handle)? {
            Object::Array(cells) | Object::Vector(cells) => cells.len(),
        })
    }

    pub fn array(&self, handle: Handle) -> StackResult<&[Cell]> {
        match self.get(handle)? {
            Object::Array(cells) => Ok(cells),
            other => Err(StackFault::TypeMismatch {
                expected: "array",
                found: other.type_name(),
            }),
        }
    }

    pub fn array_mut(&mut self, handle: Handle) -> StackResult<&mut [Cell]> {
        match self.get_mut(handle)? {
            Object::Array(cells) => Ok(cells),
            other => Err(StackFault::TypeMismatch {
                expected: "array",
                found: other.type_name(),
            }),
        }
    }

    pub fn vector(&self, handle: Handle) -> StackResult<&[Cell]> {
        match self.get(handle)? {
            Object::Vector(cells) => Ok(cells),
            other => Err(StackFault::TypeMismatch {
                expected: "vector",
                found: other.type_name(),
            }),
        }
    }
}
