//! Sampled and loaded input resources
//!
//! Float coordinates sample through the resource's sampler, integer
//! coordinates load texels directly. When the coordinate is
//! `base ± literal` and the literal fits the immediate-offset encoding, the
//! offset moves into an `_aoffimmi` suffix and the add disappears.

use std::marker::PhantomData;

use crate::error::CompileResult;
use crate::expr::{Expr, IntoExpr, Node, NodeKind};
use crate::functor::OpKind;
use crate::kernel::Kernel;
use crate::operand::{Dest, Instruction, Operand};
use crate::program::ResourceDim;
use crate::source::Source;
use crate::types::{Float, Float2, InputElement, Int, Int2, ValueType};

use super::{View, ViewKind};

/// Immediate texel offset, at most three components
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ImmediateOffset([f32; 3]);

impl ImmediateOffset {
    fn suffix(&self) -> String {
        let [u, v, w] = self.0;
        format!("_aoffimmi({:?},{:?},{:?})", u, v, w)
    }
}

/// Offsets the encoding can carry: halves in [-8, 7.5] for sampled
/// coordinates, integers in [-8, 7] for loads
fn fits(value: f32, sampled: bool) -> bool {
    if sampled {
        (-8.0..=7.5).contains(&value) && (value * 2.0).fract() == 0.0
    } else {
        (-8.0..=7.0).contains(&value)
    }
}

/// Position of a foldable literal operand in `index` and its offset
fn foldable(index: &Node, sampled: bool) -> Option<(usize, ImmediateOffset)> {
    let NodeKind::Op { op, args } = &index.kind else {
        return None;
    };
    let position = match op {
        OpKind::Add | OpKind::Sub if args[1].literal_bits().is_some() => 1,
        OpKind::Add if args[0].literal_bits().is_some() => 0,
        _ => return None,
    };
    let bits = args[position].literal_bits()?;
    let sign = if *op == OpKind::Sub { -1.0 } else { 1.0 };
    let mut offset = [0.0f32; 3];
    for lane in 0..index.ty.count as usize {
        let raw = if sampled {
            f32::from_bits(bits[lane])
        } else {
            bits[lane] as i32 as f32
        };
        let value = raw * sign + 0.0;
        if !fits(value, sampled) {
            return None;
        }
        offset[lane] = value;
    }
    Some((position, ImmediateOffset(offset)))
}

/// Split `index` into the base coordinate and a folded immediate offset
pub(crate) fn fold_offset(index: Node, sampled: bool) -> (Node, Option<ImmediateOffset>) {
    let Some((position, offset)) = foldable(&index, sampled) else {
        return (index, None);
    };
    let ty = index.ty;
    match index.kind {
        NodeKind::Op { mut args, .. } => (args.swap_remove(1 - position), Some(offset)),
        kind => (Node { ty, kind }, None),
    }
}

pub(super) fn emit_load(source: &mut Source, slot: u32, element: ValueType, index: Node) -> CompileResult<Operand> {
    let sampled = index.ty().is_float();
    let (base, offset) = fold_offset(index, sampled);
    let coords = base.emit(source)?;
    let dst = source.alloc_reg()?;
    let mut opcode = if sampled {
        format!("sample_resource({})_sampler({})", slot, slot)
    } else {
        format!("load_resource({})", slot)
    };
    if let Some(offset) = offset {
        opcode.push_str(&offset.suffix());
    }
    source.emit(Instruction::new(opcode).arg(Dest::register(dst, element)).arg(coords));
    Ok(Operand::register(dst, element))
}

/// One-dimensional input resource
#[derive(Debug, Clone, Copy)]
pub struct Input1d<T: InputElement> {
    view: View,
    _ty: PhantomData<T>,
}

impl<T: InputElement> Input1d<T> {
    /// Filtered read at a float coordinate
    pub fn sample(&self, coord: impl IntoExpr<Ty = Float>) -> Expr<T> {
        Expr::from_node(Node::load_unchecked(self.view, coord.into_node()))
    }

    /// Texel read at an integer coordinate
    pub fn load(&self, coord: impl IntoExpr<Ty = Int>) -> Expr<T> {
        Expr::from_node(Node::load_unchecked(self.view, coord.into_node()))
    }

    pub fn view(&self) -> View {
        self.view
    }
}

/// Two-dimensional input resource
#[derive(Debug, Clone, Copy)]
pub struct Input2d<T: InputElement> {
    view: View,
    _ty: PhantomData<T>,
}

impl<T: InputElement> Input2d<T> {
    pub fn sample(&self, coord: impl IntoExpr<Ty = Float2>) -> Expr<T> {
        Expr::from_node(Node::load_unchecked(self.view, coord.into_node()))
    }

    pub fn load(&self, coord: impl IntoExpr<Ty = Int2>) -> Expr<T> {
        Expr::from_node(Node::load_unchecked(self.view, coord.into_node()))
    }

    pub fn view(&self) -> View {
        self.view
    }
}

impl Kernel {
    /// Declare a one-dimensional input resource in `slot`
    pub fn input1d<T: InputElement>(&mut self, slot: u32) -> CompileResult<Input1d<T>> {
        let view = View::new(
            ViewKind::Input {
                slot,
                dim: ResourceDim::OneD,
            },
            T::TYPE,
        );
        self.declare_view(&view, 0)?;
        Ok(Input1d {
            view,
            _ty: PhantomData,
        })
    }

    /// Declare a two-dimensional input resource in `slot`
    pub fn input2d<T: InputElement>(&mut self, slot: u32) -> CompileResult<Input2d<T>> {
        let view = View::new(
            ViewKind::Input {
                slot,
                dim: ResourceDim::TwoD,
            },
            T::TYPE,
        );
        self.declare_view(&view, 0)?;
        Ok(Input2d {
            view,
            _ty: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::operand::Reg;
    use crate::types::IlType;

    fn coords(ty: ValueType) -> Node {
        Node::register(Reg(40), ty)
    }

    fn offset_by(op: OpKind, ty: ValueType, bits: [u32; 4]) -> Node {
        Node::op(op, vec![coords(ty), Node::literal(ty, bits)]).unwrap()
    }

    fn lines_for(index: Node) -> Vec<String> {
        let mut source = Source::new(KernelConfig::default());
        emit_load(&mut source, 0, ValueType::FLOAT4, index).unwrap();
        let program = source.finish().unwrap();
        program
            .lines
            .into_iter()
            .filter(|l| !l.starts_with("il_") && !l.starts_with("dcl_") && l != "end")
            .collect()
    }

    #[test]
    fn test_half_offsets_fold() {
        let index = offset_by(OpKind::Add, ValueType::FLOAT2, Float2::literal_bits([1.0, -0.5]));
        assert_eq!(
            lines_for(index),
            vec!["sample_resource(0)_sampler(0)_aoffimmi(1.0,-0.5,0.0) r0, r40.xy"]
        );
    }

    #[test]
    fn test_subtracted_integer_offset_folds() {
        let index = offset_by(OpKind::Sub, ValueType::INT2, Int2::literal_bits([2, 0]));
        assert_eq!(lines_for(index), vec!["load_resource(0)_aoffimmi(-2.0,0.0,0.0) r0, r40.xy"]);
    }

    #[test]
    fn test_out_of_range_offset_keeps_add() {
        let index = offset_by(OpKind::Add, ValueType::FLOAT2, Float2::literal_bits([8.0, 0.0]));
        assert_eq!(
            lines_for(index),
            vec!["add r0.xy, r40.xy, l0.xy", "sample_resource(0)_sampler(0) r1, r0.xy"]
        );
        let index = offset_by(OpKind::Add, ValueType::FLOAT2, Float2::literal_bits([0.25, 0.0]));
        assert_eq!(lines_for(index).len(), 2);
    }

    #[test]
    fn test_literal_first_addition() {
        let index = Node::op(
            OpKind::Add,
            vec![Node::literal(ValueType::INT, Int::literal_bits(-8)), coords(ValueType::INT)],
        )
        .unwrap();
        assert_eq!(lines_for(index), vec!["load_resource(0)_aoffimmi(-8.0,0.0,0.0) r0, r40.x"]);
    }
}
