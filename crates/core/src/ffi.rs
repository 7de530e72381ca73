//! C ABI entry points
//!
//! Lets generated code or a foreign host drive a [`Context`] through plain
//! C calls. Every primitive wrapper returns `true` on success. On a fault it
//! records the fault in the thread-local last-fault slot (see
//! [`crate::error`]), recovers the context, and returns `false`.

use crate::context::Context;
use crate::error::{StackResult, set_last_fault};
use crate::primitives::Primitive;
use crate::tagged::Cell;

/// Allocate a new context with capacities from the environment
///
/// The caller owns the returned pointer and must release it with
/// `cellvm_context_free`.
#[unsafe(no_mangle)]
pub extern "C" fn cellvm_context_new() -> *mut Context {
    let ctx = Box::new(Context::init_stacks(crate::config::StackConfig::from_env()));
    Box::into_raw(ctx)
}

/// Free a context
///
/// # Safety
/// The pointer must have been returned by `cellvm_context_new` and not
/// freed before.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cellvm_context_free(ctx: *mut Context) {
    if !ctx.is_null() {
        unsafe {
            drop(Box::from_raw(ctx));
        }
    }
}

/// Record a fault and recover; returns the success flag for the caller
fn report(ctx: &mut Context, result: StackResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(fault) => {
            ctx.recover(&fault);
            set_last_fault(fault);
            false
        }
    }
}

/// # Safety
/// `ctx` must be a valid pointer returned by `cellvm_context_new`.
unsafe fn context<'a>(ctx: *mut Context, name: &str) -> &'a mut Context {
    assert!(!ctx.is_null(), "{}: null context", name);
    unsafe { &mut *ctx }
}

/// Push a fixnum onto the data stack
///
/// # Safety
/// `ctx` must be a valid pointer returned by `cellvm_context_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cellvm_push_fixnum(ctx: *mut Context, n: i64) -> bool {
    let ctx = unsafe { context(ctx, "cellvm_push_fixnum") };
    let result = ctx.push_fixnum(n);
    report(ctx, result)
}

/// Pop a fixnum from the data stack into `out`
///
/// # Safety
/// `ctx` must be a valid context pointer and `out` a valid, writable `i64`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cellvm_pop_fixnum(ctx: *mut Context, out: *mut i64) -> bool {
    let ctx = unsafe { context(ctx, "cellvm_pop_fixnum") };
    assert!(!out.is_null(), "cellvm_pop_fixnum: null out pointer");
    let result = ctx.pop_fixnum().map(|n| unsafe { *out = n });
    report(ctx, result)
}

/// Push a raw cell word onto the data stack
///
/// # Safety
/// `ctx` must be a valid pointer returned by `cellvm_context_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cellvm_push_cell(ctx: *mut Context, bits: u64) -> bool {
    let ctx = unsafe { context(ctx, "cellvm_push_cell") };
    let result = ctx.push(Cell::from_bits(bits));
    report(ctx, result)
}

/// Data stack depth in cells
///
/// # Safety
/// `ctx` must be a valid pointer returned by `cellvm_context_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cellvm_depth(ctx: *mut Context) -> usize {
    unsafe { context(ctx, "cellvm_depth") }.data.depth()
}

/// Call stack depth in cells
///
/// # Safety
/// `ctx` must be a valid pointer returned by `cellvm_context_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cellvm_callstack_depth(ctx: *mut Context) -> usize {
    unsafe { context(ctx, "cellvm_callstack_depth") }.call.depth()
}

/// # Safety
/// `ctx` must be a valid pointer returned by `cellvm_context_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cellvm_reset_datastack(ctx: *mut Context) {
    unsafe { context(ctx, "cellvm_reset_datastack") }.reset_datastack();
}

/// # Safety
/// `ctx` must be a valid pointer returned by `cellvm_context_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cellvm_reset_callstack(ctx: *mut Context) {
    unsafe { context(ctx, "cellvm_reset_callstack") }.reset_callstack();
}

macro_rules! primitive_exports {
    ($($fn_name:ident => $prim:expr),* $(,)?) => {
        $(
            /// Run one primitive against the context
            ///
            /// # Safety
            /// `ctx` must be a valid pointer returned by `cellvm_context_new`.
            #[unsafe(no_mangle)]
            pub unsafe extern "C" fn $fn_name(ctx: *mut Context) -> bool {
                let ctx = unsafe { context(ctx, stringify!($fn_name)) };
                let result = $prim.execute(ctx);
                report(ctx, result)
            }
        )*
    };
}

primitive_exports! {
    cellvm_drop => Primitive::Drop,
    cellvm_dup => Primitive::Dup,
    cellvm_swap => Primitive::Swap,
    cellvm_over => Primitive::Over,
    cellvm_pick => Primitive::Pick,
    cellvm_nip => Primitive::Nip,
    cellvm_tuck => Primitive::Tuck,
    cellvm_rot => Primitive::Rot,
    cellvm_to_r => Primitive::ToR,
    cellvm_from_r => Primitive::FromR,
    cellvm_datastack => Primitive::Datastack,
    cellvm_callstack => Primitive::Callstack,
    cellvm_set_datastack => Primitive::SetDatastack,
    cellvm_set_callstack => Primitive::SetCallstack,
}
