//! Execution Context
//!
//! A `Context` owns one heap, one data stack and one call stack. Every
//! primitive takes the context explicitly; there is no process-wide stack
//! state, so independent contexts can coexist on one thread.
//!
//! Switching between computations is sequential hand-off: [`Context::save`]
//! captures both stacks as heap vectors, [`Context::restore`] rebuilds them.

use crate::bridge::{self, stack_to_vector, vector_to_stack};
use crate::config::StackConfig;
use crate::error::{StackFault, StackResult};
use crate::heap::{Handle, Heap};
use crate::primitives::Primitive;
use crate::stack::{Stack, StackKind};
use crate::tagged::Cell;
use tracing::{debug, warn};

/// Both stacks captured as vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub data: Handle,
    pub call: Handle,
}

/// Per-computation VM state
#[derive(Debug)]
pub struct Context {
    pub heap: Heap,
    pub data: Stack,
    pub call: Stack,
    config: StackConfig,
    faults: u64,
}

impl Default for Context {
    fn default() -> Self {
        Self::init_stacks(StackConfig::default())
    }
}

impl Context {
    /// Create a context with default capacities
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate both stack storages and start with both stacks empty
    pub fn init_stacks(config: StackConfig) -> Self {
        let mut heap = Heap::new();
        let data = Stack::new(StackKind::Data, &mut heap, config.data_capacity());
        let call = Stack::new(StackKind::Call, &mut heap, config.call_capacity());
        debug!(
            data_capacity = config.data_capacity(),
            call_capacity = config.call_capacity(),
            "stacks initialized"
        );
        Context {
            heap,
            data,
            call,
            config,
            faults: 0,
        }
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// Number of faults handled by [`Context::recover`]
    pub fn fault_count(&self) -> u64 {
        self.faults
    }

    /// Empty the data stack, keeping its storage
    pub fn reset_datastack(&mut self) {
        debug!(depth = self.data.depth(), "reset data stack");
        self.data.reset();
    }

    /// Empty the call stack, keeping its storage
    pub fn reset_callstack(&mut self) {
        debug!(depth = self.call.depth(), "reset call stack");
        self.call.reset();
    }

    pub fn stack(&self, kind: StackKind) -> &Stack {
        match kind {
            StackKind::Data => &self.data,
            StackKind::Call => &self.call,
        }
    }

    // =========================================================================
    // Host helpers
    // =========================================================================

    pub fn push(&mut self, cell: Cell) -> StackResult<()> {
        self.data.push(&mut self.heap, cell)
    }

    pub fn pop(&mut self) -> StackResult<Cell> {
        self.data.pop(&self.heap)
    }

    /// Push an integer, rejecting values outside the fixnum range
    pub fn push_fixnum(&mut self, n: i64) -> StackResult<()> {
        let cell = Cell::try_fixnum(n).ok_or(StackFault::TypeMismatch {
            expected: "fixnum",
            found: "integer out of range",
        })?;
        self.push(cell)
    }

    /// Pop a fixnum; the cell stays on the stack if it is not one
    pub fn pop_fixnum(&mut self) -> StackResult<i64> {
        let cell = self.data.peek(&self.heap, 0)?;
        let n = cell.as_fixnum().ok_or(StackFault::TypeMismatch {
            expected: "fixnum",
            found: cell.type_name(),
        })?;
        self.data.pop(&self.heap)?;
        Ok(n)
    }

    /// Live data stack cells, bottom to top
    pub fn datastack_cells(&self) -> StackResult<&[Cell]> {
        self.data.cells(&self.heap)
    }

    /// Live call stack cells, bottom to top
    pub fn callstack_cells(&self) -> StackResult<&[Cell]> {
        self.call.cells(&self.heap)
    }

    // =========================================================================
    // Fault handling
    // =========================================================================

    /// Handle a fault: log it and reset the stack it concerns.
    ///
    /// Faults that name no single stack (type mismatches from the accessor
    /// layer) reset both.
    pub fn recover(&mut self, fault: &StackFault) {
        self.faults += 1;
        warn!(%fault, faults = self.faults, "stack fault");
        match fault.stack() {
            Some(StackKind::Data) => self.reset_datastack(),
            Some(StackKind::Call) => self.reset_callstack(),
            None => {
                self.reset_datastack();
                self.reset_callstack();
            }
        }
    }

    /// Execute primitives in order.
    ///
    /// Stops at the first fault, recovers, and returns the fault.
    pub fn run(&mut self, program: &[Primitive]) -> StackResult<()> {
        for prim in program {
            if let Err(fault) = prim.execute(self) {
                self.recover(&fault);
                return Err(fault);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Context switching
    // =========================================================================

    /// Capture both stacks as vectors
    pub fn save(&mut self) -> StackResult<Snapshot> {
        let data = stack_to_vector(&mut self.heap, &self.data, self.data.bottom(), self.data.top())?;
        let call = stack_to_vector(&mut self.heap, &self.call, self.call.bottom(), self.call.top())?;
        debug!(
            data_depth = self.data.depth(),
            call_depth = self.call.depth(),
            "context saved"
        );
        Ok(Snapshot { data, call })
    }

    /// Rebuild both stacks from a snapshot.
    ///
    /// Both vectors are checked against their destinations before either
    /// stack is written.
    pub fn restore(&mut self, snapshot: Snapshot) -> StackResult<()> {
        bridge::check_fits(&self.heap, snapshot.data, &self.data, self.data.bottom())?;
        bridge::check_fits(&self.heap, snapshot.call, &self.call, self.call.bottom())?;
        let data = vector_to_stack(&mut self.heap, snapshot.data, &self.data, self.data.bottom())?;
        let call = vector_to_stack(&mut self.heap, snapshot.call, &self.call, self.call.bottom())?;
        self.data.install(data)?;
        self.call.install(call)?;
        debug!(
            data_depth = self.data.depth(),
            call_depth = self.call.depth(),
            "context restored"
        );
        Ok(())
    }
}
