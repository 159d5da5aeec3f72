//! Unordered-access views
//!
//! Raw views are byte addressed: the element index is shifted into a byte
//! address. Structured views take an (element, byte offset) pair. Typed
//! views take the element index. The cache mode only changes the suffix of
//! load opcodes.

use std::marker::PhantomData;

use crate::error::CompileResult;
use crate::expr::{Expr, IntoExpr, Node};
use crate::kernel::Kernel;
use crate::operand::{Dest, Instruction, Operand};
use crate::program::{CacheMode, UavKind};
use crate::source::Source;
use crate::types::{AtomicElement, IlType, IndexType, ValueType};

use super::{AtomicView, View, ViewKind};

fn splat(value: u32) -> [u32; 4] {
    [value; 4]
}

/// Address operand of element `index`
pub(super) fn address(source: &mut Source, kind: UavKind, element: ValueType, index: Node) -> CompileResult<Operand> {
    match kind {
        UavKind::Raw => {
            let stride = element.byte_size();
            if let Some(bits) = index.literal_bits() {
                return source.literal(splat(bits[0].wrapping_mul(stride)), ValueType::UINT);
            }
            let index = index.emit(source)?;
            let shift = source.literal(splat(stride.trailing_zeros()), ValueType::UINT)?;
            let addr = source.alloc_reg()?;
            source.emit(
                Instruction::new("ishl")
                    .arg(Dest::register(addr, ValueType::UINT))
                    .arg(index.first_lane())
                    .arg(shift),
            );
            Ok(Operand::register(addr, ValueType::UINT))
        }
        UavKind::Structured => {
            let index = index.emit(source)?;
            let zero = source.literal(splat(0), ValueType::UINT)?;
            let addr = source.alloc_reg()?;
            source.emit(
                Instruction::new("mov")
                    .arg(Dest::component(addr, ValueType::UINT2, 0))
                    .arg(index.first_lane()),
            );
            source.emit(
                Instruction::new("mov")
                    .arg(Dest::component(addr, ValueType::UINT2, 1))
                    .arg(zero),
            );
            Ok(Operand::register(addr, ValueType::UINT2))
        }
        UavKind::Typed => Ok(index.emit(source)?.first_lane()),
    }
}

fn opcode(kind: UavKind, action: &str, id: u32) -> String {
    match kind {
        UavKind::Raw => format!("uav_raw_{}_id({})", action, id),
        UavKind::Structured => format!("uav_struct_{}_id({})", action, id),
        UavKind::Typed => format!("uav_{}_id({})", action, id),
    }
}

pub(super) fn emit_load(
    source: &mut Source,
    id: u32,
    kind: UavKind,
    cache: CacheMode,
    element: ValueType,
    index: Node,
) -> CompileResult<Operand> {
    let addr = address(source, kind, element, index)?;
    let dst = source.alloc_reg()?;
    let opcode = format!("{}{}", opcode(kind, "load", id), cache.suffix());
    source.emit(Instruction::new(opcode).arg(Dest::register(dst, element)).arg(addr));
    Ok(Operand::register(dst, element))
}

pub(super) fn emit_store(
    source: &mut Source,
    id: u32,
    kind: UavKind,
    element: ValueType,
    index: Node,
    value: Node,
) -> CompileResult<()> {
    let addr = address(source, kind, element, index)?;
    let value = value.emit(source)?;
    let inst = match kind {
        UavKind::Typed => Instruction::new(opcode(kind, "store", id)).arg(addr).arg(value),
        _ => Instruction::new(opcode(kind, "store", id))
            .arg(Dest::memory(element))
            .arg(addr)
            .arg(value),
    };
    source.emit(inst);
    Ok(())
}

/// An unordered-access view with elements of type `T`
#[derive(Debug, Clone, Copy)]
pub struct Uav<T: IlType> {
    view: View,
    _ty: PhantomData<T>,
}

impl<T: IlType> Uav<T> {
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

impl<T: AtomicElement> AtomicView for Uav<T> {
    type Elem = T;

    fn atomic_view(&self) -> View {
        self.view
    }
}

impl Kernel {
    /// Declare UAV `id` with the given addressing flavor and cache mode
    pub fn uav<T: IlType>(&mut self, id: u32, kind: UavKind, cache: CacheMode) -> CompileResult<Uav<T>> {
        let view = View::new(ViewKind::Uav { id, kind, cache }, T::TYPE);
        self.declare_view(&view, 0)?;
        Ok(Uav {
            view,
            _ty: PhantomData,
        })
    }

    pub fn uav_raw<T: IlType>(&mut self, id: u32, cache: CacheMode) -> CompileResult<Uav<T>> {
        self.uav(id, UavKind::Raw, cache)
    }

    pub fn uav_struct<T: IlType>(&mut self, id: u32, cache: CacheMode) -> CompileResult<Uav<T>> {
        self.uav(id, UavKind::Structured, cache)
    }

    pub fn uav_typed<T: IlType>(&mut self, id: u32, cache: CacheMode) -> CompileResult<Uav<T>> {
        self.uav(id, UavKind::Typed, cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::operand::Reg;

    fn body(source: Source) -> Vec<String> {
        source
            .finish()
            .unwrap()
            .lines
            .into_iter()
            .filter(|l| !l.starts_with("il_") && !l.starts_with("dcl_") && l != "end")
            .collect()
    }

    #[test]
    fn test_raw_load_shifts_index() {
        let mut source = Source::new(KernelConfig::default());
        let index = Node::register(Reg(20), ValueType::UINT);
        emit_load(&mut source, 1, UavKind::Raw, CacheMode::Cached, ValueType::FLOAT4, index).unwrap();
        assert_eq!(
            body(source),
            vec!["ishl r0.x, r20.x, l0.x", "uav_raw_load_id(1)_cached r1, r0.x"]
        );
    }

    #[test]
    fn test_raw_literal_index_folds() {
        let mut source = Source::new(KernelConfig::default());
        let index = Node::literal(ValueType::INT, [3; 4]);
        emit_load(&mut source, 0, UavKind::Raw, CacheMode::Auto, ValueType::FLOAT, index).unwrap();
        assert_eq!(body(source), vec!["uav_raw_load_id(0) r0.x, l0.x"]);
    }

    #[test]
    fn test_structured_store_address() {
        let mut source = Source::new(KernelConfig::default());
        emit_store(
            &mut source,
            2,
            UavKind::Structured,
            ValueType::FLOAT2,
            Node::register(Reg(20), ValueType::INT),
            Node::register(Reg(21), ValueType::FLOAT2),
        )
        .unwrap();
        assert_eq!(
            body(source),
            vec![
                "mov r0.x, r20.x",
                "mov r0._y__, l0.x",
                "uav_struct_store_id(2) mem.xy__, r0.xy, r21.xy",
            ]
        );
    }

    #[test]
    fn test_cache_mode_only_on_loads() {
        let mut source = Source::new(KernelConfig::default());
        let index = Node::register(Reg(20), ValueType::UINT);
        emit_load(&mut source, 3, UavKind::Typed, CacheMode::Uncached, ValueType::UINT, index).unwrap();
        emit_store(
            &mut source,
            3,
            UavKind::Typed,
            ValueType::UINT,
            Node::register(Reg(20), ValueType::UINT),
            Node::register(Reg(0), ValueType::UINT),
        )
        .unwrap();
        assert_eq!(
            body(source),
            vec!["uav_load_id(3)_uncached r0.x, r20.x", "uav_store_id(3) r20.x, r0.x"]
        );
    }
}
