//! Memory views
//!
//! A [`View`] describes one of the addressing models of the target: sampled
//! or loaded input resources, the flat global buffer, indexed register
//! arrays, the work-group local data store and unordered-access views.
//! Loads build an expression node and emit when that node is emitted;
//! stores and atomics emit immediately.

mod atomic;
mod global;
mod input;
mod lds;
mod uav;

pub use atomic::{AtomicOp, AtomicView};
pub use global::{Global, IndexedRegister};
pub use input::{Input1d, Input2d};
pub use lds::Lds;
pub use uav::Uav;

use crate::error::{CompileError, CompileResult};
use crate::expr::Node;
use crate::kernel::Kernel;
use crate::operand::{Operand, Reg};
use crate::program::{CacheMode, ResourceDim, UavKind};
use crate::source::Source;
use crate::types::ValueType;

/// Addressing model and identity of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Input { slot: u32, dim: ResourceDim },
    Global,
    Indexed { id: u32 },
    Lds { id: u32 },
    Uav { id: u32, kind: UavKind, cache: CacheMode },
}

/// A declared memory view and its element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct View {
    pub kind: ViewKind,
    pub element: ValueType,
}

impl View {
    pub fn new(kind: ViewKind, element: ValueType) -> Self {
        Self { kind, element }
    }

    pub(crate) fn check_index(&self, index: ValueType) -> CompileResult<()> {
        let ok = match self.kind {
            ViewKind::Input { dim, .. } => {
                index.count == dim.rank() && !index.is_double()
            }
            _ => index == ValueType::INT || index == ValueType::UINT,
        };
        if ok {
            Ok(())
        } else {
            Err(CompileError::type_error(format!(
                "{} cannot index {:?}",
                index, self.kind
            )))
        }
    }

    fn check_value(&self, value: ValueType) -> CompileResult<()> {
        if value == self.element {
            Ok(())
        } else {
            Err(CompileError::mismatch(self.element, value))
        }
    }

    /// Read element `index`
    pub fn load(&self, index: Node) -> CompileResult<Node> {
        self.check_index(index.ty())?;
        Ok(Node::load_unchecked(*self, index))
    }

    pub(crate) fn emit_load(&self, source: &mut Source, index: Node) -> CompileResult<Operand> {
        match self.kind {
            ViewKind::Input { slot, .. } => input::emit_load(source, slot, self.element, index),
            ViewKind::Global => global::emit_load(source, "g", self.element, index),
            ViewKind::Indexed { id } => global::emit_load(source, &format!("x{}", id), self.element, index),
            ViewKind::Lds { id } => lds::emit_load(source, id, self.element, index),
            ViewKind::Uav { id, kind, cache } => uav::emit_load(source, id, kind, cache, self.element, index),
        }
    }

    /// Write `value` to element `index`
    pub fn store(&self, source: &mut Source, index: Node, value: Node) -> CompileResult<()> {
        self.check_index(index.ty())?;
        self.check_value(value.ty())?;
        match self.kind {
            ViewKind::Input { slot, .. } => Err(CompileError::not_assignable(format!(
                "input resource {} is read-only",
                slot
            ))),
            ViewKind::Global => global::emit_store(source, "g", self.element, index, value),
            ViewKind::Indexed { id } => global::emit_store(source, &format!("x{}", id), self.element, index, value),
            ViewKind::Lds { id } => lds::emit_store(source, id, self.element, index, value),
            ViewKind::Uav { id, kind, .. } => uav::emit_store(source, id, kind, self.element, index, value),
        }
    }

    /// Atomic read-modify-write of element `index`; with `fetch` the
    /// previous value is returned in a fresh register
    pub fn atomic(
        &self,
        source: &mut Source,
        op: AtomicOp,
        index: Node,
        operands: Vec<Node>,
        fetch: bool,
    ) -> CompileResult<Option<Reg>> {
        self.check_index(index.ty())?;
        if !matches!(self.element, ValueType::INT | ValueType::UINT) {
            return Err(CompileError::type_error(format!("no atomics on {} elements", self.element)));
        }
        if operands.len() != op.operand_count() {
            return Err(CompileError::codegen(format!(
                "atomic {} takes {} operands, got {}",
                op,
                op.operand_count(),
                operands.len()
            )));
        }
        for operand in &operands {
            self.check_value(operand.ty())?;
        }
        atomic::emit_atomic(source, self, op, index, operands, fetch)
    }
}

impl Kernel {
    /// Record the declaration `view` needs in the program header; `len`
    /// is the element count of local data stores and indexed arrays
    pub fn declare_view(&mut self, view: &View, len: u32) -> CompileResult<()> {
        let declarations = self.source_mut().declarations_mut();
        match view.kind {
            ViewKind::Input { slot, dim } => declarations.declare_resource(slot, dim, view.element),
            ViewKind::Global => Ok(()),
            ViewKind::Indexed { id } => declarations.declare_indexed(id, view.element, len),
            ViewKind::Lds { id } => declarations.declare_lds(id, view.element, len),
            ViewKind::Uav { id, kind, .. } => declarations.declare_uav(id, kind, view.element),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;

    #[test]
    fn test_index_types() {
        let lds = View::new(ViewKind::Lds { id: 0 }, ValueType::FLOAT4);
        assert!(lds.load(Node::literal(ValueType::INT, [0; 4])).is_ok());
        assert!(lds.load(Node::literal(ValueType::FLOAT, [0; 4])).is_err());

        let input = View::new(
            ViewKind::Input {
                slot: 0,
                dim: ResourceDim::TwoD,
            },
            ValueType::FLOAT4,
        );
        assert!(input.load(Node::literal(ValueType::FLOAT2, [0; 4])).is_ok());
        assert!(input.load(Node::literal(ValueType::INT2, [0; 4])).is_ok());
        assert!(input.load(Node::literal(ValueType::FLOAT, [0; 4])).is_err());
    }

    #[test]
    fn test_inputs_are_read_only() {
        let mut source = Source::new(KernelConfig::default());
        let input = View::new(
            ViewKind::Input {
                slot: 0,
                dim: ResourceDim::OneD,
            },
            ValueType::FLOAT,
        );
        let err = input
            .store(
                &mut source,
                Node::literal(ValueType::INT, [0; 4]),
                Node::literal(ValueType::FLOAT, [0; 4]),
            )
            .unwrap_err();
        assert!(matches!(err, CompileError::NotAssignable { .. }));
    }

    #[test]
    fn test_atomic_element_types() {
        let mut source = Source::new(KernelConfig::default());
        let lds = View::new(ViewKind::Lds { id: 0 }, ValueType::FLOAT);
        let result = lds.atomic(
            &mut source,
            AtomicOp::Add,
            Node::literal(ValueType::INT, [0; 4]),
            vec![Node::literal(ValueType::FLOAT, [0; 4])],
            false,
        );
        assert!(result.is_err());
    }
}
