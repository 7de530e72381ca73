//! Stack Faults
//!
//! `StackFault` is the only abnormal exit from a stack operation. Faults are
//! detected before any cell is written, so the stack a fault leaves behind is
//! exactly the stack the operation started from.
//!
//! The C ABI cannot carry a `Result`, so it reports faults through a
//! thread-local last-fault slot instead. The slot keeps the fault itself;
//! hosts read its numeric code or its message:
//! ```ignore
//! if !cellvm_drop(ctx) {
//!     let msg = cellvm_take_error();
//!     // Handle error...
//! }
//! ```

use crate::heap::Handle;
use crate::stack::StackKind;
use std::cell::RefCell;
use std::ffi::CString;
use std::ptr;

/// A fault raised by the bounds guard or the accessor layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackFault {
    /// The cursor would move past the storage capacity
    Overflow { stack: StackKind },
    /// The cursor would retreat below the header
    Underflow { stack: StackKind },
    /// A cell or object had the wrong type for the operation
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// A handle that names no heap object
    BadHandle(Handle),
    /// A bridge range outside the stack's storage
    InvalidRange {
        stack: StackKind,
        bottom: usize,
        top: usize,
    },
    /// A stack or cursor used with a heap other than the one holding its storage
    ForeignHeap { stack: StackKind },
}

pub type StackResult<T> = Result<T, StackFault>;

impl StackFault {
    /// The stack a fault concerns, if it concerns exactly one
    pub fn stack(&self) -> Option<StackKind> {
        match self {
            StackFault::Overflow { stack }
            | StackFault::Underflow { stack }
            | StackFault::InvalidRange { stack, .. }
            | StackFault::ForeignHeap { stack } => Some(*stack),
            StackFault::TypeMismatch { .. } | StackFault::BadHandle(_) => None,
        }
    }

    /// Stable numeric code for C hosts; 0 is reserved for "no fault"
    pub fn code(&self) -> i32 {
        match self {
            StackFault::Overflow { .. } => 1,
            StackFault::Underflow { .. } => 2,
            StackFault::TypeMismatch { .. } => 3,
            StackFault::BadHandle(_) => 4,
            StackFault::InvalidRange { .. } => 5,
            StackFault::ForeignHeap { .. } => 6,
        }
    }
}

impl std::fmt::Display for StackFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackFault::Overflow { stack } => write!(f, "{} stack overflow", stack),
            StackFault::Underflow { stack } => write!(f, "{} stack underflow", stack),
            StackFault::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            StackFault::BadHandle(h) => write!(f, "no heap object at handle {}", h.index()),
            StackFault::InvalidRange { stack, bottom, top } => write!(
                f,
                "invalid {} stack range [{}, {})",
                stack, bottom, top
            ),
            StackFault::ForeignHeap { stack } => {
                write!(f, "{} stack used with a foreign heap", stack)
            }
        }
    }
}

impl std::error::Error for StackFault {}

// =============================================================================
// Thread-local last fault (C ABI)
// =============================================================================

thread_local! {
    /// Last fault reported across the C ABI
    static LAST_FAULT: RefCell<Option<StackFault>> = const { RefCell::new(None) };

    /// Message of the last taken fault, backing the `cellvm_take_error` pointer
    static FAULT_MESSAGE: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Record `fault` as the pending fault for this thread
pub fn set_last_fault(fault: StackFault) {
    LAST_FAULT.with(|slot| *slot.borrow_mut() = Some(fault));
}

/// Take (and clear) the pending fault
pub fn take_last_fault() -> Option<StackFault> {
    LAST_FAULT.with(|slot| slot.borrow_mut().take())
}

pub fn has_last_fault() -> bool {
    LAST_FAULT.with(|slot| slot.borrow().is_some())
}

pub fn clear_last_fault() {
    LAST_FAULT.with(|slot| *slot.borrow_mut() = None);
    FAULT_MESSAGE.with(|msg| *msg.borrow_mut() = None);
}

/// Check if there's a pending fault (FFI-safe)
#[unsafe(no_mangle)]
pub extern "C" fn cellvm_has_error() -> bool {
    has_last_fault()
}

/// Code of the pending fault without clearing it, or 0 if none (FFI-safe)
#[unsafe(no_mangle)]
pub extern "C" fn cellvm_error_code() -> i32 {
    LAST_FAULT.with(|slot| slot.borrow().as_ref().map_or(0, StackFault::code))
}

/// Take (and clear) the pending fault as a C string (FFI-safe)
///
/// Returns null if no fault is pending.
///
/// # WARNING: Pointer Lifetime
/// The returned pointer is only valid until the next call to
/// `cellvm_take_error` or `cellvm_clear_error`.
#[unsafe(no_mangle)]
pub extern "C" fn cellvm_take_error() -> *const std::ffi::c_char {
    let Some(fault) = take_last_fault() else {
        return ptr::null();
    };
    match CString::new(fault.to_string()) {
        Ok(message) => FAULT_MESSAGE.with(|slot| slot.borrow_mut().insert(message).as_ptr()),
        Err(_) => ptr::null(),
    }
}

/// Clear any pending fault (FFI-safe)
#[unsafe(no_mangle)]
pub extern "C" fn cellvm_clear_error() {
    clear_last_fault();
}
