//! Stack Storage and Cursor
//!
//! A `Stack` pairs a heap array (its storage) with a cursor: the offset of
//! the next free slot. Push stores at the cursor and advances it; pop
//! retreats it and reads. Every access is checked by the bounds guard
//! before anything is written, so a faulting operation leaves the stack as
//! it found it.
//!
//! The one unchecked entry point is [`Stack::install`], which accepts only a
//! [`ValidatedCursor`]. Those are minted by the bridge after it has checked
//! the range it wrote, and by [`Stack::position`] for the current state.
//!
//! Storage remembers the [`HeapId`] of the heap it was allocated in. Every
//! access resolves the storage handle only after checking that id, and
//! `install` refuses a cursor whose storage lives in another heap, so a
//! cursor or stack carried over from a different context faults instead of
//! indexing someone else's array.

use crate::error::{StackFault, StackResult};
use crate::guard::{self, HEADER_CELLS};
use crate::heap::{Handle, Heap, HeapId};
use crate::tagged::Cell;

/// Which of the two per-context stacks an operation concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackKind {
    Data,
    Call,
}

impl std::fmt::Display for StackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackKind::Data => write!(f, "data"),
            StackKind::Call => write!(f, "call"),
        }
    }
}

/// The heap array backing one stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackStorage {
    heap: HeapId,
    handle: Handle,
    capacity: usize,
}

impl StackStorage {
    /// Allocate a fresh storage array of `capacity` cells (header included).
    ///
    /// `capacity` must already be validated against `MIN_CAPACITY`.
    pub(crate) fn alloc(heap: &mut Heap, capacity: usize) -> Self {
        let handle = heap.alloc_array(capacity);
        StackStorage {
            heap: heap.id(),
            handle,
            capacity,
        }
    }

    /// Wrap an existing array, deriving capacity from its size
    pub fn from_array(heap: &Heap, handle: Handle) -> StackResult<Self> {
        let capacity = heap.array(handle)?.len();
        Ok(StackStorage {
            heap: heap.id(),
            handle,
            capacity,
        })
    }

    /// The heap this storage lives in
    pub fn heap(&self) -> HeapId {
        self.heap
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Total cells, header included
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A cursor position that has already passed the bounds guard for a
/// particular storage array.
///
/// Only this crate can construct one, and its storage records the heap it
/// was validated in. Together these make the unchecked [`Stack::install`]
/// sound: it only has to compare heap ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedCursor {
    storage: StackStorage,
    cursor: usize,
}

impl ValidatedCursor {
    pub(crate) fn new(storage: StackStorage, cursor: usize) -> Self {
        debug_assert!(guard::check_cursor(StackKind::Data, cursor, storage.capacity).is_ok());
        ValidatedCursor { storage, cursor }
    }

    pub fn storage(&self) -> StackStorage {
        self.storage
    }

    /// The cursor offset (next free slot)
    pub fn offset(&self) -> usize {
        self.cursor
    }
}

/// One stack: storage plus cursor
#[derive(Debug, Clone)]
pub struct Stack {
    kind: StackKind,
    storage: StackStorage,
    cursor: usize,
}

impl Stack {
    /// Allocate storage of `capacity` cells and start empty
    pub(crate) fn new(kind: StackKind, heap: &mut Heap, capacity: usize) -> Self {
        let storage = StackStorage::alloc(heap, capacity);
        Stack {
            kind,
            storage,
            cursor: HEADER_CELLS,
        }
    }

    /// Discard all cells without reallocating storage.
    ///
    /// The empty position is in bounds by construction, so this skips the guard.
    pub fn reset(&mut self) {
        self.cursor = HEADER_CELLS;
    }

    pub fn kind(&self) -> StackKind {
        self.kind
    }

    pub fn storage(&self) -> StackStorage {
        self.storage
    }

    /// Offset of the first stack cell
    #[inline(always)]
    pub fn bottom(&self) -> usize {
        HEADER_CELLS
    }

    /// Offset of the next free slot
    #[inline(always)]
    pub fn top(&self) -> usize {
        self.cursor
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.storage.capacity
    }

    /// Number of live cells
    #[inline(always)]
    pub fn depth(&self) -> usize {
        self.cursor - HEADER_CELLS
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.cursor == HEADER_CELLS
    }

    /// Free slots remaining
    #[inline(always)]
    pub fn available(&self) -> usize {
        self.storage.capacity - self.cursor
    }

    /// The current cursor, as a value that may be installed later
    pub fn position(&self) -> ValidatedCursor {
        ValidatedCursor::new(self.storage, self.cursor)
    }

    /// Fail with underflow unless at least `n` cells are live
    #[inline]
    pub fn require(&self, n: usize) -> StackResult<()> {
        if self.depth() < n {
            Err(StackFault::Underflow { stack: self.kind })
        } else {
            Ok(())
        }
    }

    /// Fail with overflow unless at least `n` free slots remain
    #[inline]
    pub fn reserve(&self, n: usize) -> StackResult<()> {
        if n == 0 {
            return Ok(());
        }
        guard::check_write(self.kind, self.cursor + n - 1, self.storage.capacity).map(|_| ())
    }

    /// Slot offset of the cell `depth` below the top (0 = top)
    #[inline]
    fn slot(&self, depth: usize) -> StackResult<usize> {
        guard::check_read(self.kind, self.cursor.checked_sub(depth + 1))
    }

    /// Fail unless this stack's storage lives in `heap`
    #[inline]
    pub(crate) fn check_heap(&self, heap: &Heap) -> StackResult<()> {
        if self.storage.heap == heap.id() {
            Ok(())
        } else {
            Err(StackFault::ForeignHeap { stack: self.kind })
        }
    }

    /// The storage array, once `heap` is known to be the one it lives in
    #[inline]
    fn array<'h>(&self, heap: &'h Heap) -> StackResult<&'h [Cell]> {
        self.check_heap(heap)?;
        heap.array(self.storage.handle)
    }

    #[inline]
    fn array_mut<'h>(&self, heap: &'h mut Heap) -> StackResult<&'h mut [Cell]> {
        self.check_heap(heap)?;
        heap.array_mut(self.storage.handle)
    }

    /// Push a cell
    #[inline]
    pub fn push(&mut self, heap: &mut Heap, cell: Cell) -> StackResult<()> {
        let slot = guard::check_write(self.kind, self.cursor, self.storage.capacity)?;
        self.array_mut(heap)?[slot] = cell;
        self.cursor = slot + 1;
        Ok(())
    }

    /// Pop the top cell
    #[inline]
    pub fn pop(&mut self, heap: &Heap) -> StackResult<Cell> {
        let slot = self.slot(0)?;
        let cell = self.array(heap)?[slot];
        self.cursor = slot;
        Ok(cell)
    }

    /// Read the cell `depth` below the top without moving the cursor
    #[inline]
    pub fn peek(&self, heap: &Heap, depth: usize) -> StackResult<Cell> {
        let slot = self.slot(depth)?;
        Ok(self.array(heap)?[slot])
    }

    /// Overwrite the cell `depth` below the top
    #[inline]
    pub fn replace(&mut self, heap: &mut Heap, depth: usize, cell: Cell) -> StackResult<()> {
        let slot = self.slot(depth)?;
        self.array_mut(heap)?[slot] = cell;
        Ok(())
    }

    /// Live cells, bottom to top
    pub fn cells<'h>(&self, heap: &'h Heap) -> StackResult<&'h [Cell]> {
        Ok(&self.array(heap)?[HEADER_CELLS..self.cursor])
    }

    /// Copy `[bottom, top)` of the storage, for the bridge
    pub(crate) fn region(&self, heap: &Heap, bottom: usize, top: usize) -> StackResult<Vec<Cell>> {
        Ok(self.array(heap)?[bottom..top].to_vec())
    }

    /// Write `cells` into the storage starting at `bottom`, for the bridge
    pub(crate) fn write_region(
        &self,
        heap: &mut Heap,
        bottom: usize,
        cells: &[Cell],
    ) -> StackResult<()> {
        self.array_mut(heap)?[bottom..bottom + cells.len()].copy_from_slice(cells);
        Ok(())
    }

    /// Install a cursor (and its storage) without re-running the guard.
    ///
    /// This is the trusted half of continuation restore. The cursor was
    /// checked against its storage when it was minted, and storage never
    /// shrinks, so it is still in bounds. The only thing left to check is
    /// that the cursor's storage lives in the same heap as this stack's.
    pub fn install(&mut self, cursor: ValidatedCursor) -> StackResult<()> {
        if cursor.storage.heap != self.storage.heap {
            return Err(StackFault::ForeignHeap { stack: self.kind });
        }
        self.storage = cursor.storage;
        self.cursor = cursor.cursor;
        Ok(())
    }

    /// Install a cursor after re-checking it against the heap's view of its
    /// storage.
    pub fn install_checked(&mut self, heap: &Heap, cursor: ValidatedCursor) -> StackResult<()> {
        self.check_heap(heap)?;
        if cursor.storage.heap != heap.id() {
            return Err(StackFault::ForeignHeap { stack: self.kind });
        }
        let storage = StackStorage::from_array(heap, cursor.storage.handle)?;
        let offset = guard::check_cursor(self.kind, cursor.cursor, storage.capacity)?;
        self.install(ValidatedCursor::new(storage, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(capacity: usize) -> (Heap, Stack) {
        let mut heap = Heap::new();
        let stack = Stack::new(StackKind::Data, &mut heap, capacity);
        (heap, stack)
    }

    #[test]
    fn test_stack_basic_operations() {
        let (mut heap, mut stack) = stack(16);

        assert!(stack.is_empty());
        assert_eq!(stack.depth(), 0);

        stack.push(&mut heap, Cell::fixnum(10)).unwrap();
        stack.push(&mut heap, Cell::fixnum(20)).unwrap();
        stack.push(&mut heap, Cell::fixnum(30)).unwrap();

        assert!(!stack.is_empty());
        assert_eq!(stack.depth(), 3);

        assert_eq!(stack.pop(&heap).unwrap(), Cell::fixnum(30));
        assert_eq!(stack.pop(&heap).unwrap(), Cell::fixnum(20));
        assert_eq!(stack.pop(&heap).unwrap(), Cell::fixnum(10));

        assert!(stack.is_empty());
    }

    #[test]
    fn test_stack_peek() {
        let (mut heap, mut stack) = stack(16);
        stack.push(&mut heap, Cell::fixnum(1)).unwrap();
        stack.push(&mut heap, Cell::fixnum(42)).unwrap();

        assert_eq!(stack.peek(&heap, 0).unwrap(), Cell::fixnum(42));
        assert_eq!(stack.peek(&heap, 1).unwrap(), Cell::fixnum(1));
        assert_eq!(stack.depth(), 2);
        assert!(stack.peek(&heap, 2).is_err());
    }

    #[test]
    fn test_overflow_leaves_stack_unchanged() {
        let (mut heap, mut stack) = stack(HEADER_CELLS + 2);
        stack.push(&mut heap, Cell::fixnum(1)).unwrap();
        stack.push(&mut heap, Cell::fixnum(2)).unwrap();
        assert_eq!(stack.available(), 0);

        let before = stack.cells(&heap).unwrap().to_vec();
        let err = stack.push(&mut heap, Cell::fixnum(3)).unwrap_err();
        assert_eq!(
            err,
            StackFault::Overflow {
                stack: StackKind::Data
            }
        );
        assert_eq!(stack.top(), stack.capacity());
        assert_eq!(stack.cells(&heap).unwrap(), before.as_slice());
    }

    #[test]
    fn test_underflow_leaves_cursor_unchanged() {
        let (heap, mut stack) = stack(8);
        let err = stack.pop(&heap).unwrap_err();
        assert_eq!(
            err,
            StackFault::Underflow {
                stack: StackKind::Data
            }
        );
        assert_eq!(stack.top(), HEADER_CELLS);
    }

    #[test]
    fn test_require_and_reserve() {
        let (mut heap, mut stack) = stack(HEADER_CELLS + 3);
        assert!(stack.require(0).is_ok());
        assert!(stack.require(1).is_err());
        stack.push(&mut heap, Cell::f()).unwrap();
        assert!(stack.require(1).is_ok());
        assert!(stack.reserve(2).is_ok());
        assert!(stack.reserve(3).is_err());
        assert!(stack.reserve(0).is_ok());
    }

    #[test]
    fn test_reset_keeps_storage() {
        let (mut heap, mut stack) = stack(8);
        let storage = stack.storage();
        stack.push(&mut heap, Cell::fixnum(5)).unwrap();
        stack.reset();
        assert!(stack.is_empty());
        assert_eq!(stack.storage(), storage);
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn test_replace() {
        let (mut heap, mut stack) = stack(8);
        stack.push(&mut heap, Cell::fixnum(1)).unwrap();
        stack.push(&mut heap, Cell::fixnum(2)).unwrap();
        stack.replace(&mut heap, 1, Cell::fixnum(9)).unwrap();
        assert_eq!(
            stack.cells(&heap).unwrap(),
            &[Cell::fixnum(9), Cell::fixnum(2)]
        );
    }

    #[test]
    fn test_install_position_roundtrip() {
        let (mut heap, mut stack) = stack(8);
        stack.push(&mut heap, Cell::fixnum(1)).unwrap();
        let saved = stack.position();
        stack.push(&mut heap, Cell::fixnum(2)).unwrap();
        stack.install(saved).unwrap();
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.peek(&heap, 0).unwrap(), Cell::fixnum(1));
    }

    #[test]
    fn test_install_checked_swaps_storage() {
        let mut heap = Heap::new();
        let mut a = Stack::new(StackKind::Call, &mut heap, 8);
        let mut b = Stack::new(StackKind::Call, &mut heap, 4);
        b.push(&mut heap, Cell::fixnum(7)).unwrap();

        a.install_checked(&heap, b.position()).unwrap();
        assert_eq!(a.storage(), b.storage());
        assert_eq!(a.capacity(), 4);
        assert_eq!(a.pop(&heap).unwrap(), Cell::fixnum(7));
    }

    #[test]
    fn test_install_rejects_cursor_from_another_heap() {
        let mut heap_a = Heap::new();
        let mut a = Stack::new(StackKind::Data, &mut heap_a, 64);
        for i in 0..20 {
            a.push(&mut heap_a, Cell::fixnum(i)).unwrap();
        }
        let (heap_b, mut b) = stack(8);
        let foreign = a.position();

        let expected = Err(StackFault::ForeignHeap {
            stack: StackKind::Data,
        });
        assert_eq!(b.install(foreign), expected);
        assert_eq!(b.install_checked(&heap_b, foreign), expected);
        assert_eq!(b.install_checked(&heap_a, foreign), expected);

        // Still the same empty stack over its own storage
        assert!(b.is_empty());
        assert_eq!(b.capacity(), 8);
        assert_eq!(
            b.pop(&heap_b),
            Err(StackFault::Underflow {
                stack: StackKind::Data
            })
        );
    }

    #[test]
    fn test_access_with_wrong_heap_faults() {
        let (mut heap, mut stack) = stack(8);
        stack.push(&mut heap, Cell::fixnum(1)).unwrap();
        let mut other = Heap::new();
        other.alloc_array(64);

        let expected = StackFault::ForeignHeap {
            stack: StackKind::Data,
        };
        assert_eq!(stack.push(&mut other, Cell::fixnum(2)), Err(expected.clone()));
        assert_eq!(stack.peek(&other, 0), Err(expected.clone()));
        assert_eq!(stack.pop(&other), Err(expected));
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.cells(&heap).unwrap(), &[Cell::fixnum(1)]);
    }
}
