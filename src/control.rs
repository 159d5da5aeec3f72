//! Structured control flow
//!
//! Each construct takes its body as a closure and emits the closing opcode
//! when the closure returns, so blocks always nest. Conditions are scalar
//! `int` or `uint` values; any nonzero lane value counts as true.

use crate::error::{CompileError, CompileResult};
use crate::expr::{IntoExpr, Node};
use crate::kernel::Kernel;
use crate::operand::{Instruction, Operand};
use crate::source::BlockKind;
use crate::types::{Condition, Int, ValueType};
use crate::variable::Variable;

fn condition(k: &mut Kernel, cond: Node) -> CompileResult<Operand> {
    let ty = cond.ty();
    if ty != ValueType::INT && ty != ValueType::UINT {
        return Err(CompileError::type_error(format!(
            "condition must be a scalar int or uint, not {}",
            ty
        )));
    }
    Ok(k.emit_node(cond)?.first_lane())
}

fn require_loop(k: &Kernel, what: &str) -> CompileResult<()> {
    if k.source().in_loop() {
        Ok(())
    } else {
        Err(CompileError::structure(format!("{} outside a loop", what)))
    }
}

impl Kernel {
    /// `if_logicalnz` block with an optional `else` half
    pub fn if_node<F, G>(&mut self, cond: Node, then: F, otherwise: Option<G>) -> CompileResult<()>
    where
        F: FnOnce(&mut Kernel) -> CompileResult<()>,
        G: FnOnce(&mut Kernel) -> CompileResult<()>,
    {
        self.open_if(cond)?;
        then(self)?;
        let has_else = otherwise.is_some();
        if let Some(otherwise) = otherwise {
            self.open_else()?;
            otherwise(self)?;
        }
        self.close_if(has_else)
    }

    pub(crate) fn open_if(&mut self, cond: Node) -> CompileResult<()> {
        let cond = condition(self, cond)?;
        self.source_mut()
            .open_block(BlockKind::If, Instruction::new("if_logicalnz").arg(cond));
        Ok(())
    }

    pub(crate) fn open_else(&mut self) -> CompileResult<()> {
        self.source_mut().switch_to_else()
    }

    pub(crate) fn close_if(&mut self, has_else: bool) -> CompileResult<()> {
        let kind = if has_else { BlockKind::Else } else { BlockKind::If };
        self.source_mut().close_block(kind, Instruction::new("endif"))
    }

    pub fn if_then<C, F>(&mut self, cond: C, then: F) -> CompileResult<()>
    where
        C: IntoExpr,
        C::Ty: Condition,
        F: FnOnce(&mut Kernel) -> CompileResult<()>,
    {
        self.if_node(cond.into_node(), then, None::<F>)
    }

    pub fn if_else<C, F, G>(&mut self, cond: C, then: F, otherwise: G) -> CompileResult<()>
    where
        C: IntoExpr,
        C::Ty: Condition,
        F: FnOnce(&mut Kernel) -> CompileResult<()>,
        G: FnOnce(&mut Kernel) -> CompileResult<()>,
    {
        self.if_node(cond.into_node(), then, Some(otherwise))
    }

    /// `whileloop` whose condition is evaluated at the top of every
    /// iteration; the loop exits through `break_logicalz` when it is zero
    pub fn while_node<F>(&mut self, cond: Node, body: F) -> CompileResult<()>
    where
        F: FnOnce(&mut Kernel) -> CompileResult<()>,
    {
        self.open_while(cond)?;
        body(self)?;
        self.close_while()
    }

    pub(crate) fn open_while(&mut self, cond: Node) -> CompileResult<()> {
        self.source_mut()
            .open_block(BlockKind::Loop, Instruction::new("whileloop"));
        let cond = condition(self, cond)?;
        self.source_mut()
            .emit(Instruction::new("break_logicalz").arg(cond));
        Ok(())
    }

    pub(crate) fn close_while(&mut self) -> CompileResult<()> {
        self.source_mut()
            .close_block(BlockKind::Loop, Instruction::new("endloop"))
    }

    pub fn while_loop<C, F>(&mut self, cond: C, body: F) -> CompileResult<()>
    where
        C: IntoExpr,
        C::Ty: Condition,
        F: FnOnce(&mut Kernel) -> CompileResult<()>,
    {
        self.while_node(cond.into_node(), body)
    }

    /// Loop `count` times; the body sees the iteration index, running
    /// from zero
    ///
    /// The counter already holds the next index when the body starts, so
    /// `continue_if` in the body still advances the loop.
    pub fn repeat<C, F>(&mut self, count: C, body: F) -> CompileResult<()>
    where
        C: IntoExpr<Ty = Int>,
        F: FnOnce(&mut Kernel, Variable<Int>) -> CompileResult<()>,
    {
        let counter = self.var_init(0i32)?;
        let index = self.var::<Int>()?;
        self.while_loop(counter.cmp_lt(count), |k| {
            k.assign(index, counter)?;
            k.assign(counter, counter + 1i32)?;
            body(k, index)
        })
    }

    /// Leave the innermost loop
    pub fn break_loop(&mut self) -> CompileResult<()> {
        require_loop(self, "break")?;
        self.source_mut().emit(Instruction::new("break"));
        Ok(())
    }

    pub fn break_if_node(&mut self, cond: Node) -> CompileResult<()> {
        require_loop(self, "break")?;
        let cond = condition(self, cond)?;
        self.source_mut()
            .emit(Instruction::new("break_logicalnz").arg(cond));
        Ok(())
    }

    /// Leave the innermost loop when `cond` is nonzero
    pub fn break_if<C>(&mut self, cond: C) -> CompileResult<()>
    where
        C: IntoExpr,
        C::Ty: Condition,
    {
        self.break_if_node(cond.into_node())
    }

    /// Start the next iteration of the innermost loop
    pub fn continue_loop(&mut self) -> CompileResult<()> {
        require_loop(self, "continue")?;
        self.source_mut().emit(Instruction::new("continue"));
        Ok(())
    }

    pub fn continue_if_node(&mut self, cond: Node) -> CompileResult<()> {
        require_loop(self, "continue")?;
        let cond = condition(self, cond)?;
        self.source_mut()
            .emit(Instruction::new("continue_logicalnz").arg(cond));
        Ok(())
    }

    /// Start the next iteration when `cond` is nonzero
    pub fn continue_if<C>(&mut self, cond: C) -> CompileResult<()>
    where
        C: IntoExpr,
        C::Ty: Condition,
    {
        self.continue_if_node(cond.into_node())
    }

    /// Work-group barrier on the local data store; elided when the whole
    /// group runs in one wavefront
    pub fn barrier(&mut self) {
        if self.config().needs_barrier() {
            self.source_mut().emit(Instruction::new("fence_threads_lds"));
        } else {
            log::debug!(
                "barrier elided: {} threads fit in a wavefront of {}",
                self.config().threads_per_group,
                self.config().wavefront_size
            );
        }
    }

    /// Unconditional local data store fence
    pub fn fence(&mut self) {
        self.source_mut().emit(Instruction::new("fence_threads_lds"));
    }
}
