//! Stack ⇄ Vector Bridge
//!
//! Copies a region of a stack into a fresh heap vector, and writes a vector
//! back onto a stack's storage. Cells are copied as raw words; nothing is
//! re-tagged on the way through. A vector is a snapshot, not a view: once
//! created it has no tie to the stack it came from.
//!
//! `vector_to_stack` is the only producer of [`ValidatedCursor`] values for
//! a rebuilt stack, which is what lets [`Stack::install`] skip the guard.

use crate::error::{StackFault, StackResult};
use crate::guard::HEADER_CELLS;
use crate::heap::{Handle, Heap};
use crate::stack::{Stack, ValidatedCursor};

/// Copy the cells in `[bottom, top)` of `stack`'s storage into a new vector.
///
/// Offsets are cell offsets from the storage base, as returned by
/// [`Stack::bottom`] and [`Stack::top`]. The source stack is not modified.
pub fn stack_to_vector(
    heap: &mut Heap,
    stack: &Stack,
    bottom: usize,
    top: usize,
) -> StackResult<Handle> {
    if bottom < HEADER_CELLS || bottom > top || top > stack.capacity() {
        return Err(StackFault::InvalidRange {
            stack: stack.kind(),
            bottom,
            top,
        });
    }
    let cells = stack.region(heap, bottom, top)?;
    Ok(heap.alloc_vector(cells))
}

/// Check that `vector` fits in `stack`'s storage starting at `bottom`
pub fn check_fits(heap: &Heap, vector: Handle, stack: &Stack, bottom: usize) -> StackResult<usize> {
    stack.check_heap(heap)?;
    let len = heap.vector(vector)?.len();
    if bottom < HEADER_CELLS {
        return Err(StackFault::Underflow {
            stack: stack.kind(),
        });
    }
    match bottom.checked_add(len) {
        Some(top) if top <= stack.capacity() => Ok(top),
        _ => Err(StackFault::Overflow {
            stack: stack.kind(),
        }),
    }
}

/// Write `vector`'s cells into `stack`'s storage starting at `bottom`.
///
/// Returns the new top of stack, validated against the storage. Nothing is
/// written unless the whole vector fits. The stack's own cursor is left
/// alone; install the returned cursor to make the new contents live.
pub fn vector_to_stack(
    heap: &mut Heap,
    vector: Handle,
    stack: &Stack,
    bottom: usize,
) -> StackResult<ValidatedCursor> {
    let top = check_fits(heap, vector, stack, bottom)?;
    let cells = heap.vector(vector)?.to_vec();
    stack.write_region(heap, bottom, &cells)?;
    Ok(ValidatedCursor::new(stack.storage(), top))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::StackKind;
    use crate::tagged::Cell;

    fn filled(values: &[Cell], capacity: usize) -> (Heap, Stack) {
        let mut heap = Heap::new();
        let mut stack = Stack::new(StackKind::Data, &mut heap, capacity);
        for v in values {
            stack.push(&mut heap, *v).unwrap();
        }
        (heap, stack)
    }

    #[test]
    fn test_stack_to_vector_preserves_order() {
        let values = [Cell::fixnum(1), Cell::fixnum(2), Cell::fixnum(3)];
        let (mut heap, stack) = filled(&values, 8);
        let v = stack_to_vector(&mut heap, &stack, stack.bottom(), stack.top()).unwrap();
        assert_eq!(heap.vector(v).unwrap(), &values);
        // Source untouched
        assert_eq!(stack.depth(), 3);
        assert_eq!(stack.cells(&heap).unwrap(), &values);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let (mut heap, mut stack) = filled(&[Cell::fixnum(1)], 8);
        let v = stack_to_vector(&mut heap, &stack, stack.bottom(), stack.top()).unwrap();
        stack.replace(&mut heap, 0, Cell::fixnum(99)).unwrap();
        assert_eq!(heap.vector(v).unwrap(), &[Cell::fixnum(1)]);
    }

    #[test]
    fn test_stack_to_vector_rejects_bad_ranges() {
        let (mut heap, stack) = filled(&[Cell::fixnum(1)], 8);
        for (bottom, top) in [(0, 3), (4, 3), (2, 9)] {
            assert_eq!(
                stack_to_vector(&mut heap, &stack, bottom, top),
                Err(StackFault::InvalidRange {
                    stack: StackKind::Data,
                    bottom,
                    top
                })
            );
        }
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn test_empty_range() {
        let (mut heap, stack) = filled(&[], 8);
        let v = stack_to_vector(&mut heap, &stack, stack.bottom(), stack.top()).unwrap();
        assert!(heap.vector(v).unwrap().is_empty());
        let cursor = vector_to_stack(&mut heap, v, &stack, stack.bottom()).unwrap();
        assert_eq!(cursor.offset(), HEADER_CELLS);
    }

    #[test]
    fn test_roundtrip_law() {
        let values = [
            Cell::fixnum(-7),
            Cell::from_bits(0xffff_ffff_ffff_fffe),
            Cell::boolean(true),
            Cell::f(),
        ];
        let (mut heap, stack) = filled(&values, 16);
        let (bottom, top) = (stack.bottom() + 1, stack.top());
        let v = stack_to_vector(&mut heap, &stack, bottom, top).unwrap();
        let cursor = vector_to_stack(&mut heap, v, &stack, bottom).unwrap();
        assert_eq!(cursor.offset(), top);
        let bits: Vec<u64> = stack.cells(&heap).unwrap().iter().map(|c| c.bits()).collect();
        let expected: Vec<u64> = values.iter().map(|c| c.bits()).collect();
        assert_eq!(bits, expected);
    }

    #[test]
    fn test_vector_to_stack_overflow_writes_nothing() {
        let (mut heap, stack) = filled(&[Cell::fixnum(5)], HEADER_CELLS + 2);
        let v = heap.alloc_vector(vec![Cell::fixnum(1), Cell::fixnum(2), Cell::fixnum(3)]);
        assert_eq!(
            vector_to_stack(&mut heap, v, &stack, stack.bottom()),
            Err(StackFault::Overflow {
                stack: StackKind::Data
            })
        );
        assert_eq!(stack.cells(&heap).unwrap(), &[Cell::fixnum(5)]);
    }

    #[test]
    fn test_vector_to_stack_rejects_header_bottom() {
        let (mut heap, stack) = filled(&[], 8);
        let v = heap.alloc_vector(vec![Cell::fixnum(1)]);
        assert_eq!(
            vector_to_stack(&mut heap, v, &stack, 1),
            Err(StackFault::Underflow {
                stack: StackKind::Data
            })
        );
    }

    #[test]
    fn test_vector_to_stack_requires_vector() {
        let (mut heap, stack) = filled(&[], 8);
        let arr = stack.storage().handle();
        assert!(matches!(
            vector_to_stack(&mut heap, arr, &stack, stack.bottom()),
            Err(StackFault::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_install_rebuilt_stack() {
        let (mut heap, mut stack) = filled(&[Cell::fixnum(1), Cell::fixnum(2)], 8);
        let v = heap.alloc_vector(vec![Cell::fixnum(7), Cell::fixnum(8), Cell::fixnum(9)]);
        let cursor = vector_to_stack(&mut heap, v, &stack, stack.bottom()).unwrap();
        stack.install(cursor).unwrap();
        assert_eq!(
            stack.cells(&heap).unwrap(),
            &[Cell::fixnum(7), Cell::fixnum(8), Cell::fixnum(9)]
        );
    }

    #[test]
    fn test_bridge_rejects_foreign_stack() {
        let (heap, stack) = filled(&[Cell::fixnum(1)], 8);
        let mut other = Heap::new();
        let v = other.alloc_vector(vec![Cell::fixnum(2)]);
        let foreign = StackFault::ForeignHeap {
            stack: StackKind::Data,
        };
        assert_eq!(
            stack_to_vector(&mut other, &stack, stack.bottom(), stack.top()),
            Err(foreign.clone())
        );
        assert_eq!(
            vector_to_stack(&mut other, v, &stack, stack.bottom()),
            Err(foreign)
        );
        assert_eq!(stack.cells(&heap).unwrap(), &[Cell::fixnum(1)]);
    }
}
