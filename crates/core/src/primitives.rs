//! Stack Primitives
//!
//! The shuffle words every instruction stream is built from. Each one works
//! on the data stack of a [`Context`] (plus the call stack for `>r` / `r>`),
//! checks every bound it needs before its first write, and returns a
//! `StackFault` without touching the stack when a check fails.
//!
//! Stack effects are written bottom to top: `( a b -- b a )` means `b` was
//! on top before and `a` is on top after.

use crate::accessors;
use crate::context::Context;
use crate::error::StackResult;
use std::str::FromStr;

/// Remove the top value: ( a -- )
pub fn drop(ctx: &mut Context) -> StackResult<()> {
    ctx.data.pop(&ctx.heap).map(|_| ())
}

/// Duplicate the top value: ( a -- a a )
pub fn dup(ctx: &mut Context) -> StackResult<()> {
    let a = ctx.data.peek(&ctx.heap, 0)?;
    ctx.data.push(&mut ctx.heap, a)
}

/// Swap the top two values: ( a b -- b a )
pub fn swap(ctx: &mut Context) -> StackResult<()> {
    ctx.data.require(2)?;
    let a = ctx.data.peek(&ctx.heap, 1)?;
    let b = ctx.data.peek(&ctx.heap, 0)?;
    ctx.data.replace(&mut ctx.heap, 1, b)?;
    ctx.data.replace(&mut ctx.heap, 0, a)
}

/// Copy the second value to the top: ( a b -- a b a )
pub fn over(ctx: &mut Context) -> StackResult<()> {
    let a = ctx.data.peek(&ctx.heap, 1)?;
    ctx.data.push(&mut ctx.heap, a)
}

/// Copy the third value to the top: ( a b c -- a b c a )
pub fn pick(ctx: &mut Context) -> StackResult<()> {
    let a = ctx.data.peek(&ctx.heap, 2)?;
    ctx.data.push(&mut ctx.heap, a)
}

/// Remove the second value: ( a b -- b )
pub fn nip(ctx: &mut Context) -> StackResult<()> {
    ctx.data.require(2)?;
    let b = ctx.data.pop(&ctx.heap)?;
    ctx.data.replace(&mut ctx.heap, 0, b)
}

/// Copy the top value below the second: ( a b -- b a b )
pub fn tuck(ctx: &mut Context) -> StackResult<()> {
    ctx.data.require(2)?;
    ctx.data.reserve(1)?;
    let a = ctx.data.peek(&ctx.heap, 1)?;
    let b = ctx.data.peek(&ctx.heap, 0)?;
    ctx.data.replace(&mut ctx.heap, 1, b)?;
    ctx.data.replace(&mut ctx.heap, 0, a)?;
    ctx.data.push(&mut ctx.heap, b)
}

/// Rotate the top three values: ( a b c -- b c a )
pub fn rot(ctx: &mut Context) -> StackResult<()> {
    ctx.data.require(3)?;
    let a = ctx.data.peek(&ctx.heap, 2)?;
    let b = ctx.data.peek(&ctx.heap, 1)?;
    let c = ctx.data.peek(&ctx.heap, 0)?;
    ctx.data.replace(&mut ctx.heap, 2, b)?;
    ctx.data.replace(&mut ctx.heap, 1, c)?;
    ctx.data.replace(&mut ctx.heap, 0, a)
}

/// Move the top of the data stack to the call stack.
/// Data: ( a -- ) Call: ( -- a )
pub fn to_r(ctx: &mut Context) -> StackResult<()> {
    ctx.data.require(1)?;
    ctx.call.reserve(1)?;
    let a = ctx.data.pop(&ctx.heap)?;
    ctx.call.push(&mut ctx.heap, a)
}

/// Move the top of the call stack to the data stack.
/// Call: ( a -- ) Data: ( -- a )
pub fn from_r(ctx: &mut Context) -> StackResult<()> {
    ctx.call.require(1)?;
    ctx.data.reserve(1)?;
    let a = ctx.call.pop(&ctx.heap)?;
    ctx.data.push(&mut ctx.heap, a)
}

// ============================================================================
// Primitive table
// ============================================================================

/// A zero-argument VM instruction operating on a context's stacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Drop,
    Dup,
    Swap,
    Over,
    Pick,
    Nip,
    Tuck,
    Rot,
    ToR,
    FromR,
    Datastack,
    Callstack,
    SetDatastack,
    SetCallstack,
}

impl Primitive {
    pub const ALL: [Primitive; 14] = [
        Primitive::Drop,
        Primitive::Dup,
        Primitive::Swap,
        Primitive::Over,
        Primitive::Pick,
        Primitive::Nip,
        Primitive::Tuck,
        Primitive::Rot,
        Primitive::ToR,
        Primitive::FromR,
        Primitive::Datastack,
        Primitive::Callstack,
        Primitive::SetDatastack,
        Primitive::SetCallstack,
    ];

    /// The word that names this primitive in source text
    pub const fn name(self) -> &'static str {
        match self {
            Primitive::Drop => "drop",
            Primitive::Dup => "dup",
            Primitive::Swap => "swap",
            Primitive::Over => "over",
            Primitive::Pick => "pick",
            Primitive::Nip => "nip",
            Primitive::Tuck => "tuck",
            Primitive::Rot => "rot",
            Primitive::ToR => ">r",
            Primitive::FromR => "r>",
            Primitive::Datastack => "datastack",
            Primitive::Callstack => "callstack",
            Primitive::SetDatastack => "set-datastack",
            Primitive::SetCallstack => "set-callstack",
        }
    }

    /// Run this primitive against `ctx`.
    ///
    /// On error the stacks are as they were before the call; the caller
    /// decides whether to [`Context::recover`].
    pub fn execute(self, ctx: &mut Context) -> StackResult<()> {
        match self {
            Primitive::Drop => drop(ctx),
            Primitive::Dup => dup(ctx),
            Primitive::Swap => swap(ctx),
            Primitive::Over => over(ctx),
            Primitive::Pick => pick(ctx),
            Primitive::Nip => nip(ctx),
            Primitive::Tuck => tuck(ctx),
            Primitive::Rot => rot(ctx),
            Primitive::ToR => to_r(ctx),
            Primitive::FromR => from_r(ctx),
            Primitive::Datastack => accessors::datastack(ctx),
            Primitive::Callstack => accessors::callstack(ctx),
            Primitive::SetDatastack => accessors::set_datastack(ctx),
            Primitive::SetCallstack => accessors::set_callstack(ctx),
        }
    }
}

impl std::fmt::Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A word that names no primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPrimitive(pub String);

impl std::fmt::Display for UnknownPrimitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown primitive '{}'", self.0)
    }
}

impl std::error::Error for UnknownPrimitive {}

impl FromStr for Primitive {
    type Err = UnknownPrimitive;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Primitive::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| UnknownPrimitive(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackConfig;
    use crate::error::StackFault;
    use crate::guard::HEADER_CELLS;
    use crate::stack::StackKind;
    use crate::tagged::Cell;

    fn ctx_with(values: &[i64]) -> Context {
        let mut ctx = Context::init_stacks(StackConfig::new(16, 16).unwrap());
        for v in values {
            ctx.push_fixnum(*v).unwrap();
        }
        ctx
    }

    /// Data stack, bottom to top
    fn data(ctx: &Context) -> Vec<i64> {
        ctx.datastack_cells()
            .unwrap()
            .iter()
            .map(|c| c.as_fixnum().unwrap())
            .collect()
    }

    fn call(ctx: &Context) -> Vec<i64> {
        ctx.callstack_cells()
            .unwrap()
            .iter()
            .map(|c| c.as_fixnum().unwrap())
            .collect()
    }

    const UNDERFLOW: StackFault = StackFault::Underflow {
        stack: StackKind::Data,
    };

    #[test]
    fn test_drop() {
        let mut ctx = ctx_with(&[1, 2]);
        drop(&mut ctx).unwrap();
        assert_eq!(data(&ctx), vec![1]);
    }

    #[test]
    fn test_dup() {
        let mut ctx = ctx_with(&[1, 2]);
        dup(&mut ctx).unwrap();
        assert_eq!(data(&ctx), vec![1, 2, 2]);
    }

    #[test]
    fn test_swap() {
        let mut ctx = ctx_with(&[1, 2, 3]);
        swap(&mut ctx).unwrap();
        assert_eq!(data(&ctx), vec![1, 3, 2]);
    }

    #[test]
    fn test_over() {
        let mut ctx = ctx_with(&[1, 2]);
        over(&mut ctx).unwrap();
        assert_eq!(data(&ctx), vec![1, 2, 1]);
    }

    #[test]
    fn test_pick() {
        let mut ctx = ctx_with(&[1, 2, 3]);
        pick(&mut ctx).unwrap();
        assert_eq!(data(&ctx), vec![1, 2, 3, 1]);
    }

    #[test]
    fn test_nip() {
        let mut ctx = ctx_with(&[1, 2, 3]);
        nip(&mut ctx).unwrap();
        assert_eq!(data(&ctx), vec![1, 3]);
    }

    #[test]
    fn test_tuck() {
        let mut ctx = ctx_with(&[1, 2]);
        tuck(&mut ctx).unwrap();
        assert_eq!(data(&ctx), vec![2, 1, 2]);
    }

    #[test]
    fn test_rot() {
        let mut ctx = ctx_with(&[1, 2, 3]);
        rot(&mut ctx).unwrap();
        assert_eq!(data(&ctx), vec![2, 3, 1]);
    }

    #[test]
    fn test_to_r_from_r() {
        let mut ctx = ctx_with(&[1, 2]);
        to_r(&mut ctx).unwrap();
        assert_eq!(data(&ctx), vec![1]);
        assert_eq!(call(&ctx), vec![2]);
        from_r(&mut ctx).unwrap();
        assert_eq!(data(&ctx), vec![1, 2]);
        assert!(ctx.call.is_empty());
    }

    #[test]
    fn test_underflow_on_short_stacks() {
        let cases: [(Primitive, usize); 8] = [
            (Primitive::Drop, 0),
            (Primitive::Dup, 0),
            (Primitive::Swap, 1),
            (Primitive::Over, 1),
            (Primitive::Pick, 2),
            (Primitive::Nip, 1),
            (Primitive::Tuck, 1),
            (Primitive::Rot, 2),
        ];
        for (prim, depth) in cases {
            let values: Vec<i64> = (0..depth as i64).collect();
            let mut ctx = ctx_with(&values);
            assert_eq!(prim.execute(&mut ctx), Err(UNDERFLOW), "{}", prim);
            assert_eq!(data(&ctx), values, "{} changed the stack", prim);
        }
    }

    #[test]
    fn test_overflow_on_full_stack() {
        for prim in [
            Primitive::Dup,
            Primitive::Over,
            Primitive::Pick,
            Primitive::Tuck,
        ] {
            let values: Vec<i64> = (0..(16 - HEADER_CELLS) as i64).collect();
            let mut ctx = ctx_with(&values);
            assert_eq!(
                prim.execute(&mut ctx),
                Err(StackFault::Overflow {
                    stack: StackKind::Data
                }),
                "{}",
                prim
            );
            assert_eq!(data(&ctx), values, "{} changed the stack", prim);
        }
    }

    #[test]
    fn test_to_r_call_overflow_keeps_data() {
        let mut ctx = Context::init_stacks(StackConfig::new(16, HEADER_CELLS + 1).unwrap());
        ctx.push_fixnum(1).unwrap();
        ctx.push_fixnum(2).unwrap();
        to_r(&mut ctx).unwrap();
        assert_eq!(
            to_r(&mut ctx),
            Err(StackFault::Overflow {
                stack: StackKind::Call
            })
        );
        assert_eq!(data(&ctx), vec![1]);
        assert_eq!(call(&ctx), vec![2]);
    }

    #[test]
    fn test_from_r_underflow_names_call_stack() {
        let mut ctx = ctx_with(&[1]);
        assert_eq!(
            from_r(&mut ctx),
            Err(StackFault::Underflow {
                stack: StackKind::Call
            })
        );
        assert_eq!(data(&ctx), vec![1]);
    }

    #[test]
    fn test_from_r_data_overflow_keeps_call() {
        let values: Vec<i64> = (0..(16 - HEADER_CELLS) as i64).collect();
        let mut ctx = ctx_with(&values);
        ctx.call.push(&mut ctx.heap, Cell::fixnum(99)).unwrap();
        assert_eq!(
            from_r(&mut ctx),
            Err(StackFault::Overflow {
                stack: StackKind::Data
            })
        );
        assert_eq!(call(&ctx), vec![99]);
    }

    #[test]
    fn test_primitives_preserve_bits() {
        let mut ctx = ctx_with(&[]);
        let odd = Cell::from_bits(0xdead_beef_0000_0005);
        ctx.push(odd).unwrap();
        ctx.push(Cell::f()).unwrap();
        swap(&mut ctx).unwrap();
        assert_eq!(ctx.data.peek(&ctx.heap, 0).unwrap().bits(), odd.bits());
    }

    #[test]
    fn test_name_roundtrip() {
        for prim in Primitive::ALL {
            assert_eq!(prim.name().parse::<Primitive>(), Ok(prim));
        }
        assert_eq!(
            "frob".parse::<Primitive>(),
            Err(UnknownPrimitive("frob".to_string()))
        );
    }
}
