//! Tagged Cells
//!
//! Every stack slot holds one 8-byte `Cell`. The low three bits select a
//! type tag; the remaining 61 bits carry either an immediate payload or an
//! arena handle for a heap object.
//!
//! ## Encoding Scheme
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┬───────┐
//! │                 payload (61 bits)                        │  tag  │
//! └──────────────────────────────────────────────────────────┴───────┘
//!  63                                                       3 2     0
//! ```
//!
//! ## Type Tags
//!
//! - 0: Fixnum (61-bit signed integer, arithmetic shift on untag)
//! - 1: Object (payload is a heap `Handle`; wider payloads decode as `Other`)
//! - 2: Bool (0 or 1)
//! - 3: F (the canonical false/empty value, payload 0)
//! - 4: Header (object header word, payload is the object type code)
//! - 5..=7: reserved immediates
//!
//! Tag extraction is a mask, so every `u64` decodes to exactly one tag.

use crate::heap::Handle;

// =============================================================================
// Constants
// =============================================================================

/// Number of low bits reserved for the tag
pub const TAG_BITS: u32 = 3;

/// Mask selecting the tag bits
pub const TAG_MASK: u64 = (1 << TAG_BITS) - 1;

pub const FIXNUM_TAG: u8 = 0;
pub const OBJECT_TAG: u8 = 1;
pub const BOOL_TAG: u8 = 2;
pub const F_TAG: u8 = 3;
pub const HEADER_TAG: u8 = 4;

/// Largest fixnum: 2^60 - 1
pub const MAX_FIXNUM: i64 = (1i64 << 60) - 1;

/// Smallest fixnum: -2^60
pub const MIN_FIXNUM: i64 = -(1i64 << 60);

// =============================================================================
// Cell
// =============================================================================

/// A single tagged machine word.
///
/// Equality is bitwise: two cells are equal exactly when their words are.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cell(u64);

/// Decoded view of a cell's contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tagged {
    Fixnum(i64),
    Object(Handle),
    Bool(bool),
    F,
    Header(u64),
    Other { tag: u8, payload: u64 },
}

impl Cell {
    /// Reinterpret a raw word as a cell
    #[inline(always)]
    pub const fn from_bits(bits: u64) -> Self {
        Cell(bits)
    }

    /// The raw word, tag included
    #[inline(always)]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline(always)]
    const fn pack(tag: u8, payload: u64) -> Self {
        Cell((payload << TAG_BITS) | tag as u64)
    }

    /// Encode a fixnum, truncating to 61 bits.
    ///
    /// Use [`Cell::try_fixnum`] when the input may fall outside
    /// `MIN_FIXNUM..=MAX_FIXNUM`.
    #[inline(always)]
    pub const fn fixnum(n: i64) -> Self {
        Cell::pack(FIXNUM_TAG, n as u64)
    }

    /// Encode a fixnum, rejecting values that would not round-trip
    pub fn try_fixnum(n: i64) -> Option<Self> {
        (MIN_FIXNUM..=MAX_FIXNUM)
            .contains(&n)
            .then(|| Cell::fixnum(n))
    }

    #[inline(always)]
    pub const fn object(handle: Handle) -> Self {
        Cell::pack(OBJECT_TAG, handle.index() as u64)
    }

    #[inline(always)]
    pub const fn boolean(b: bool) -> Self {
        Cell::pack(BOOL_TAG, b as u64)
    }

    /// The canonical false value
    #[inline(always)]
    pub const fn f() -> Self {
        Cell::pack(F_TAG, 0)
    }

    #[inline(always)]
    pub const fn header(type_code: u64) -> Self {
        Cell::pack(HEADER_TAG, type_code)
    }

    // =========================================================================
    // Type Checking
    // =========================================================================

    /// The tag in the low three bits
    #[inline(always)]
    pub const fn tag(self) -> u8 {
        (self.0 & TAG_MASK) as u8
    }

    /// The payload with the tag stripped (logical shift)
    #[inline(always)]
    pub const fn untag(self) -> u64 {
        self.0 >> TAG_BITS
    }

    #[inline(always)]
    pub const fn is_fixnum(self) -> bool {
        self.tag() == FIXNUM_TAG
    }

    /// The referenced handle, if this is an object reference
    #[inline]
    pub fn as_object(self) -> Option<Handle> {
        match self.decode() {
            Tagged::Object(h) => Some(h),
            _ => None,
        }
    }

    /// The fixnum value, if this is a fixnum
    #[inline]
    pub fn as_fixnum(self) -> Option<i64> {
        match self.decode() {
            Tagged::Fixnum(n) => Some(n),
            _ => None,
        }
    }

    /// Decode into a typed view
    pub fn decode(self) -> Tagged {
        match self.tag() {
            FIXNUM_TAG => Tagged::Fixnum((self.0 as i64) >> TAG_BITS),
            OBJECT_TAG => match Handle::from_payload(self.untag()) {
                Some(h) => Tagged::Object(h),
                None => Tagged::Other {
                    tag: OBJECT_TAG,
                    payload: self.untag(),
                },
            },
            BOOL_TAG => Tagged::Bool(self.untag() != 0),
            F_TAG => Tagged::F,
            HEADER_TAG => Tagged::Header(self.untag()),
            tag => Tagged::Other {
                tag,
                payload: self.untag(),
            },
        }
    }

    /// Short name of the tag, used in fault messages
    pub const fn type_name(self) -> &'static str {
        match self.tag() {
            FIXNUM_TAG => "fixnum",
            OBJECT_TAG if self.untag() > u32::MAX as u64 => "bad reference",
            OBJECT_TAG => "object",
            BOOL_TAG => "bool",
            F_TAG => "f",
            HEADER_TAG => "header",
            _ => "reserved",
        }
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::fixnum(n)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::boolean(b)
    }
}

impl From<Handle> for Cell {
    fn from(h: Handle) -> Self {
        Cell::object(h)
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.decode() {
            Tagged::Fixnum(n) => write!(f, "Fixnum({})", n),
            Tagged::Object(h) => write!(f, "Object({})", h.index()),
            Tagged::Bool(b) => write!(f, "Bool({})", b),
            Tagged::F => write!(f, "F"),
            Tagged::Header(code) => write!(f, "Header({})", code),
            Tagged::Other { tag, payload } => {
                write!(f, "Cell {{ tag: {}, payload: 0x{:x} }}", tag, payload)
            }
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.decode() {
            Tagged::Fixnum(n) => write!(f, "{}", n),
            Tagged::Object(h) => write!(f, "#<object {}>", h.index()),
            Tagged::Bool(true) => write!(f, "t"),
            Tagged::Bool(false) | Tagged::F => write!(f, "f"),
            Tagged::Header(code) => write!(f, "#<header {}>", code),
            Tagged::Other { tag, payload } => write!(f, "#<tag{} 0x{:x}>", tag, payload),
        }
    }
}

const _: () = assert!(std::mem::size_of::<Cell>() == 8, "Cell must be 8 bytes");
