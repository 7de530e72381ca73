//! Stack Accessors
//!
//! Reify a whole stack as a first-class value and install one back. These
//! are the hooks the continuation layer uses to capture and resume.
//!
//! - `datastack`     ( -- v )  push a vector copy of the data stack
//! - `callstack`     ( -- v )  push a vector copy of the call stack
//! - `set-datastack` ( v -- ... )  replace the data stack with `v`'s cells
//! - `set-callstack` ( v -- )  replace the call stack with `v`'s cells
//!
//! ## Trust boundary
//!
//! The final step of a set is [`Stack::install`], which performs no bounds
//! check beyond comparing heap ids. The cursor it installs comes from
//! [`vector_to_stack`], which has already checked that the vector fits;
//! nothing else can produce one.
//! `set-*` therefore never leaves a stack out of bounds, and a vector that
//! does not fit is reported as a fault with both stacks untouched.

use crate::bridge::{stack_to_vector, vector_to_stack};
use crate::context::Context;
use crate::error::{StackFault, StackResult};
use crate::heap::Handle;
use crate::stack::StackKind;
#[cfg(doc)]
use crate::stack::Stack;
use tracing::debug;

/// Snapshot `kind` and push the vector reference on the data stack
fn push_snapshot(ctx: &mut Context, kind: StackKind) -> StackResult<()> {
    ctx.data.reserve(1)?;
    let source = ctx.stack(kind).clone();
    let vector = stack_to_vector(&mut ctx.heap, &source, source.bottom(), source.top())?;
    ctx.data.push(&mut ctx.heap, vector.into())
}

/// Read the vector reference on top of the data stack without popping it
fn peek_vector(ctx: &Context) -> StackResult<Handle> {
    let cell = ctx.data.peek(&ctx.heap, 0)?;
    let handle = cell.as_object().ok_or(StackFault::TypeMismatch {
        expected: "vector",
        found: cell.type_name(),
    })?;
    ctx.heap.vector(handle)?;
    Ok(handle)
}

/// Push a copy of the data stack as a vector: ( -- v )
///
/// The vector holds the stack as it was before the push.
pub fn datastack(ctx: &mut Context) -> StackResult<()> {
    push_snapshot(ctx, StackKind::Data)
}

/// Push a copy of the call stack as a vector: ( -- v )
pub fn callstack(ctx: &mut Context) -> StackResult<()> {
    push_snapshot(ctx, StackKind::Call)
}

/// Pop a vector and make its cells the whole data stack: ( v -- ... )
pub fn set_datastack(ctx: &mut Context) -> StackResult<()> {
    let vector = peek_vector(ctx)?;
    let cursor = vector_to_stack(&mut ctx.heap, vector, &ctx.data, ctx.data.bottom())?;
    ctx.data.install(cursor)?;
    debug!(depth = ctx.data.depth(), "data stack installed");
    Ok(())
}

/// Pop a vector and make its cells the whole call stack: ( v -- )
pub fn set_callstack(ctx: &mut Context) -> StackResult<()> {
    let vector = peek_vector(ctx)?;
    let cursor = vector_to_stack(&mut ctx.heap, vector, &ctx.call, ctx.call.bottom())?;
    ctx.call.install(cursor)?;
    ctx.data.pop(&ctx.heap)?;
    debug!(depth = ctx.call.depth(), "call stack installed");
    Ok(())
}

/// Like [`set_datastack`], but re-checks the cursor against the heap's
/// view of the storage before installing it.
pub fn set_datastack_checked(ctx: &mut Context) -> StackResult<()> {
    let vector = peek_vector(ctx)?;
    let cursor = vector_to_stack(&mut ctx.heap, vector, &ctx.data, ctx.data.bottom())?;
    ctx.data.install_checked(&ctx.heap, cursor)
}
