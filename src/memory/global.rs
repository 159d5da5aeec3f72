//! The global buffer `g[]` and indexed temporary arrays `xN[]`
//!
//! Both are plain indexed register references, so a load emits no
//! instruction of its own: the reference is used directly as an operand.

use std::marker::PhantomData;

use crate::error::CompileResult;
use crate::expr::{Expr, IntoExpr, Node};
use crate::kernel::Kernel;
use crate::operand::{Dest, Instruction, Operand};
use crate::source::Source;
use crate::swizzle::Lanes;
use crate::types::{IlType, IndexType, ValueType};

use super::{View, ViewKind};

/// `base[index]`, with an immediate index for literals
fn indexed_name(source: &mut Source, base: &str, index: Node) -> CompileResult<String> {
    if let Some(bits) = index.literal_bits() {
        return Ok(format!("{}[{}]", base, bits[0]));
    }
    let index = index.emit(source)?;
    Ok(format!("{}[{}]", base, index.first_lane()))
}

pub(super) fn emit_load(source: &mut Source, base: &str, element: ValueType, index: Node) -> CompileResult<Operand> {
    let name = indexed_name(source, base, index)?;
    Ok(Operand::named(name, Lanes::identity(element.lanes())))
}

pub(super) fn emit_store(
    source: &mut Source,
    base: &str,
    element: ValueType,
    index: Node,
    value: Node,
) -> CompileResult<()> {
    let name = indexed_name(source, base, index)?;
    let value = value.emit(source)?;
    let dest = Dest::with_lanes(name, &Lanes::identity(element.lanes()));
    source.emit(Instruction::new("mov").arg(dest).arg(value));
    Ok(())
}

/// The flat global buffer
#[derive(Debug, Clone, Copy)]
pub struct Global<T: IlType> {
    view: View,
    _ty: PhantomData<T>,
}

impl<T: IlType> Global<T> {
    pub fn load<I>(&self, index: I) -> Expr<T>
    where
        I: IntoExpr,
        I::Ty: IndexType,
    {
        Expr::from_node(Node::load_unchecked(self.view, index.into_node()))
    }

    pub fn store<I>(&self, k: &mut Kernel, index: I, value: impl IntoExpr<Ty = T>) -> CompileResult<()>
    where
        I: IntoExpr,
        I::Ty: IndexType,
    {
        self.view.store(k.source_mut(), index.into_node(), value.into_node())
    }

    pub fn view(&self) -> View {
        self.view
    }
}

/// An indexed temporary register array `xN[len]`
#[derive(Debug, Clone, Copy)]
pub struct IndexedRegister<T: IlType> {
    view: View,
    len: u32,
    _ty: PhantomData<T>,
}

impl<T: IlType> IndexedRegister<T> {
    pub fn load<I>(&self, index: I) -> Expr<T>
    where
        I: IntoExpr,
        I::Ty: IndexType,
    {
        Expr::from_node(Node::load_unchecked(self.view, index.into_node()))
    }

    pub fn store<I>(&self, k: &mut Kernel, index: I, value: impl IntoExpr<Ty = T>) -> CompileResult<()>
    where
        I: IntoExpr,
        I::Ty: IndexType,
    {
        self.view.store(k.source_mut(), index.into_node(), value.into_node())
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn view(&self) -> View {
        self.view
    }
}

impl Kernel {
    /// View of the global buffer with elements of type `T`
    pub fn global<T: IlType>(&mut self) -> Global<T> {
        Global {
            view: View::new(ViewKind::Global, T::TYPE),
            _ty: PhantomData,
        }
    }

    /// Declare indexed register array `id` holding `len` elements
    pub fn indexed_register<T: IlType>(&mut self, id: u32, len: u32) -> CompileResult<IndexedRegister<T>> {
        let view = View::new(ViewKind::Indexed { id }, T::TYPE);
        self.declare_view(&view, len)?;
        Ok(IndexedRegister {
            view,
            len,
            _ty: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::operand::Reg;

    #[test]
    fn test_global_reference() {
        let mut source = Source::new(KernelConfig::default());
        let op = emit_load(&mut source, "g", ValueType::FLOAT2, Node::register(Reg(3), ValueType::UINT)).unwrap();
        assert_eq!(op.to_string(), "g[r3.x].xy");
        let op = emit_load(&mut source, "x1", ValueType::FLOAT4, Node::literal(ValueType::INT, [5; 4])).unwrap();
        assert_eq!(op.to_string(), "x1[5]");
        assert_eq!(source.registers_used(), 0);
    }

    #[test]
    fn test_global_store() {
        let mut source = Source::new(KernelConfig::default());
        emit_store(
            &mut source,
            "g",
            ValueType::INT,
            Node::register(Reg(1), ValueType::INT),
            Node::register(Reg(2), ValueType::INT),
        )
        .unwrap();
        let program = source.finish().unwrap();
        assert!(program.lines.contains(&"mov g[r1.x].x, r2.x".to_string()));
    }
}
