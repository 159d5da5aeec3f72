//! Work-group local data store

use std::marker::PhantomData;

use crate::error::CompileResult;
use crate::expr::{Expr, IntoExpr, Node};
use crate::kernel::Kernel;
use crate::operand::{Dest, Instruction, Operand};
use crate::source::Source;
use crate::types::{AtomicElement, IlType, IndexType, ValueType};

use super::{AtomicView, View, ViewKind};

pub(super) fn emit_load(source: &mut Source, id: u32, element: ValueType, index: Node) -> CompileResult<Operand> {
    let index = index.emit(source)?;
    let dst = source.alloc_reg()?;
    source.emit(
        Instruction::new(format!("lds_load_id({})", id))
            .arg(Dest::register(dst, element))
            .arg(index.first_lane()),
    );
    Ok(Operand::register(dst, element))
}

pub(super) fn emit_store(
    source: &mut Source,
    id: u32,
    element: ValueType,
    index: Node,
    value: Node,
) -> CompileResult<()> {
    let index = index.emit(source)?;
    let value = value.emit(source)?;
    source.emit(
        Instruction::new(format!("lds_store_id({})", id))
            .arg(Dest::memory(element))
            .arg(index.first_lane())
            .arg(value),
    );
    Ok(())
}

/// A structured local data store region of `count` elements
#[derive(Debug, Clone, Copy)]
pub struct Lds<T: IlType> {
    view: View,
    count: u32,
    _ty: PhantomData<T>,
}

impl<T: IlType> Lds<T> {
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

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn view(&self) -> View {
        self.view
    }
}

impl<T: AtomicElement> AtomicView for Lds<T> {
    type Elem = T;

    fn atomic_view(&self) -> View {
        self.view
    }
}

impl Kernel {
    /// Declare local data store `id` with `count` elements of type `T`
    pub fn lds<T: IlType>(&mut self, id: u32, count: u32) -> CompileResult<Lds<T>> {
        let view = View::new(ViewKind::Lds { id }, T::TYPE);
        self.declare_view(&view, count)?;
        Ok(Lds {
            view,
            count,
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
    fn test_masked_load_and_store() {
        let mut source = Source::new(KernelConfig::default());
        let loaded = emit_load(&mut source, 0, ValueType::FLOAT2, Node::register(Reg(9), ValueType::INT)).unwrap();
        assert_eq!(loaded.to_string(), "r0.xy");
        emit_store(
            &mut source,
            0,
            ValueType::FLOAT2,
            Node::register(Reg(9), ValueType::INT),
            Node::register(Reg(0), ValueType::FLOAT2),
        )
        .unwrap();
        let program = source.finish().unwrap();
        let body: Vec<&str> = program.lines.iter().skip(2).map(String::as_str).collect();
        assert_eq!(
            body,
            vec!["lds_load_id(0) r0.xy, r9.x", "lds_store_id(0) mem.xy__, r9.x, r0.xy", "end"]
        );
    }
}
