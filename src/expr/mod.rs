//! Expression trees
//!
//! [`Node`] is the untyped tree: a value type plus the operation that
//! produces it. Building a tree emits nothing. Emission walks the tree once,
//! children first; each operation node then reserves its scratch registers
//! and its own result register and appends its instructions. Nodes are
//! consumed by emission, so a subtree can never be emitted twice; values
//! that are needed more than once go through a [`Variable`](crate::Variable).
//!
//! [`Expr<T>`] is the typed façade used by kernels written in Rust. The
//! operand types of every operator and function are checked by the type
//! system, and the functor table is consulted again at emission time.

mod swizzles;

use std::fmt;
use std::marker::PhantomData;

use crate::error::{CompileError, CompileResult};
use crate::functor::{self, EmitContext, OpKind};
use crate::memory::View;
use crate::operand::{Operand, Reg};
use crate::program::ArgLayout;
use crate::source::Source;
use crate::swizzle::{Lane, Lanes, Swizzle};
use crate::types::*;
use crate::variable::{NamedVariable, VarLanes, Variable};

/// Untyped expression node
#[derive(Debug, PartialEq)]
pub struct Node {
    pub(crate) ty: ValueType,
    pub(crate) kind: NodeKind,
}

#[derive(Debug, PartialEq)]
pub(crate) enum NodeKind {
    /// Literal pool constant
    Literal([u32; 4]),
    /// Lanes of a temporary register
    Register { reg: Reg, lanes: Lanes },
    /// Lanes of a named register such as `cb0[1]` or `vAbsTid`
    Named { base: String, lanes: Lanes },
    /// Functor application
    Op { op: OpKind, args: Vec<Node> },
    Swizzle { arg: Box<Node>, swizzle: Swizzle },
    /// Read through a memory view
    Load { view: View, index: Box<Node> },
}

impl Node {
    /// Literal of type `ty` with the given lane bits
    pub fn literal(ty: ValueType, bits: [u32; 4]) -> Node {
        Node {
            ty,
            kind: NodeKind::Literal(bits),
        }
    }

    /// All lanes of a temporary register holding a value of type `ty`
    pub fn register(reg: Reg, ty: ValueType) -> Node {
        Node::register_lanes(reg, Lanes::identity(ty.lanes()), ty)
    }

    pub fn register_lanes(reg: Reg, lanes: Lanes, ty: ValueType) -> Node {
        Node {
            ty,
            kind: NodeKind::Register { reg, lanes },
        }
    }

    /// Named register lanes
    pub fn named(base: impl Into<String>, lanes: Lanes, ty: ValueType) -> Node {
        Node {
            ty,
            kind: NodeKind::Named {
                base: base.into(),
                lanes,
            },
        }
    }

    /// The constant-buffer slot of a kernel argument
    pub fn argument(layout: &ArgLayout) -> Node {
        let first = layout.component;
        let lanes: Vec<u8> = (first..first + layout.ty.lanes()).collect();
        Node::named(
            format!("cb{}[{}]", layout.cb, layout.index),
            Lanes::from_slice(&lanes),
            layout.ty,
        )
    }

    /// Apply `op`, looking up the result type; fails when no
    /// specialization exists for the operand types
    pub fn op(op: OpKind, args: Vec<Node>) -> CompileResult<Node> {
        let types: Vec<ValueType> = args.iter().map(Node::ty).collect();
        if types.len() != op.arity() {
            return Err(CompileError::codegen(format!(
                "{} takes {} operands, got {}",
                op,
                op.arity(),
                types.len()
            )));
        }
        let ty = functor::result_type(op, &types)?;
        Ok(Node::op_unchecked(op, ty, args))
    }

    /// Functor application whose result type is already known
    pub(crate) fn op_unchecked(op: OpKind, ty: ValueType, args: Vec<Node>) -> Node {
        Node {
            ty,
            kind: NodeKind::Op { op, args },
        }
    }

    /// Swizzle, checked against this node's type
    pub fn swizzle(self, swizzle: Swizzle) -> CompileResult<Node> {
        let ty = swizzle.result_type(self.ty)?;
        Ok(Node::swizzle_unchecked(self, swizzle, ty))
    }

    pub(crate) fn swizzle_unchecked(self, swizzle: Swizzle, ty: ValueType) -> Node {
        Node {
            ty,
            kind: NodeKind::Swizzle {
                arg: Box::new(self),
                swizzle,
            },
        }
    }

    pub(crate) fn load_unchecked(view: View, index: Node) -> Node {
        Node {
            ty: view.element,
            kind: NodeKind::Load {
                view,
                index: Box::new(index),
            },
        }
    }

    pub fn ty(&self) -> ValueType {
        self.ty
    }

    /// Lane bits when this node is a literal
    pub fn literal_bits(&self) -> Option<[u32; 4]> {
        match self.kind {
            NodeKind::Literal(bits) => Some(bits),
            _ => None,
        }
    }

    /// Emit the tree and return the operand holding its value
    pub fn emit(self, source: &mut Source) -> CompileResult<Operand> {
        let ty = self.ty;
        match self.kind {
            NodeKind::Literal(bits) => source.literal(bits, ty),
            NodeKind::Register { reg, lanes } => Ok(Operand::named(reg.to_string(), lanes)),
            NodeKind::Named { base, lanes } => Ok(Operand::named(base, lanes)),
            NodeKind::Swizzle { arg, swizzle } => {
                let arg_ty = arg.ty;
                let operand = arg.emit(source)?;
                Ok(operand.swizzled(arg_ty, &swizzle))
            }
            NodeKind::Op { op, args } => emit_op(source, op, ty, args),
            NodeKind::Load { view, index } => view.emit_load(source, *index),
        }
    }
}

fn emit_op(source: &mut Source, op: OpKind, ty: ValueType, args: Vec<Node>) -> CompileResult<Operand> {
    let types: Vec<ValueType> = args.iter().map(Node::ty).collect();
    let entry = functor::lookup(op, &types)?;
    if entry.result != ty {
        return Err(CompileError::mismatch(entry.result, ty));
    }
    let mut operands = Vec::with_capacity(args.len());
    for arg in args {
        operands.push(arg.emit(source)?);
    }
    let scratch = source.alloc_regs(entry.temp_regs)?;
    let dst = source.alloc_reg()?;
    let mut ctx = EmitContext::new(dst, ty, &operands, &types, scratch, source.literals_mut());
    entry.template.emit(&mut ctx)?;
    let instructions = ctx.finish();
    source.emit_all(instructions);
    Ok(Operand::register(dst, ty))
}

/// Typed expression
#[must_use = "an expression emits nothing until it is assigned or stored"]
pub struct Expr<T: IlType> {
    node: Node,
    _ty: PhantomData<T>,
}

impl<T: IlType> fmt::Debug for Expr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expr").field(&self.node).finish()
    }
}

impl<T: IlType> Expr<T> {
    pub(crate) fn from_node(node: Node) -> Self {
        debug_assert_eq!(node.ty, T::TYPE);
        Self {
            node,
            _ty: PhantomData,
        }
    }

    /// Literal constant
    pub fn value(value: T::Host) -> Self {
        Self::from_node(Node::literal(T::TYPE, T::literal_bits(value)))
    }

    pub fn ty(&self) -> ValueType {
        T::TYPE
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    pub(crate) fn apply<U: IlType>(op: OpKind, args: Vec<Node>) -> Expr<U> {
        Expr::from_node(Node::op_unchecked(op, U::TYPE, args))
    }

    fn swizzle_lanes<U: IlType>(self, selectors: &[Lane]) -> Expr<U> {
        let swizzle = Swizzle::from_lanes(selectors);
        Expr::from_node(self.node.swizzle_unchecked(swizzle, U::TYPE))
    }

    /// Numeric conversion
    pub fn cast<U: IlType>(self) -> Expr<U>
    where
        T: CastTo<U>,
    {
        Expr::<T>::apply(OpKind::Cast(U::TYPE), vec![self.node])
    }

    /// Bit reinterpretation
    pub fn bitcast<U: IlType>(self) -> Expr<U>
    where
        T: BitcastTo<U>,
    {
        Expr::<T>::apply(OpKind::Bitcast(U::TYPE), vec![self.node])
    }
}

/// Values usable as operands: expressions, variables, named registers and
/// host literals
pub trait IntoExpr {
    type Ty: IlType;

    fn into_expr(self) -> Expr<Self::Ty>;

    fn into_node(self) -> Node
    where
        Self: Sized,
    {
        self.into_expr().node
    }
}

impl<T: IlType> IntoExpr for Expr<T> {
    type Ty = T;

    fn into_expr(self) -> Expr<T> {
        self
    }
}

macro_rules! host_literal {
    ($($host:ty => $ty:ident),+ $(,)?) => {
        $(
            impl IntoExpr for $host {
                type Ty = $ty;

                fn into_expr(self) -> Expr<$ty> {
                    Expr::value(self)
                }
            }

            impl From<$host> for Expr<$ty> {
                fn from(value: $host) -> Self {
                    Expr::value(value)
                }
            }
        )+
    };
}

host_literal!(
    i32 => Int, [i32; 2] => Int2, [i32; 4] => Int4,
    u32 => Uint, [u32; 2] => Uint2, [u32; 4] => Uint4,
    f32 => Float, [f32; 2] => Float2, [f32; 4] => Float4,
    f64 => Double, [f64; 2] => Double2,
);

macro_rules! binary_operator {
    ($lhs:ident: $($trait:ident::$method:ident => $op:ident where $bound:ident),+ $(,)?) => {
        $(
            impl<T: $bound, R: IntoExpr<Ty = T>> std::ops::$trait<R> for $lhs<T> {
                type Output = Expr<T>;

                fn $method(self, rhs: R) -> Expr<T> {
                    Expr::<T>::apply(OpKind::$op, vec![self.into_node(), rhs.into_node()])
                }
            }
        )+
    };
}

macro_rules! unary_operator {
    ($lhs:ident: $($trait:ident::$method:ident => $op:ident where $bound:ident),+ $(,)?) => {
        $(
            impl<T: $bound> std::ops::$trait for $lhs<T> {
                type Output = Expr<T>;

                fn $method(self) -> Expr<T> {
                    Expr::<T>::apply(OpKind::$op, vec![self.into_node()])
                }
            }
        )+
    };
}

macro_rules! comparisons {
    ($lhs:ident: $($method:ident => $op:ident),+ $(,)?) => {
        impl<T: IlType> $lhs<T> {
            $(
                pub fn $method(self, rhs: impl IntoExpr<Ty = T>) -> Expr<T::Mask> {
                    Expr::<T>::apply(OpKind::$op, vec![self.into_node(), rhs.into_node()])
                }
            )+
        }
    };
}

/// Operators and comparisons for every operand handle
macro_rules! value_operators {
    ($($lhs:ident),+) => {
        $(
            binary_operator!($lhs:
                Add::add => Add where IlType,
                Sub::sub => Sub where IlType,
                Mul::mul => Mul where IlType,
                Div::div => Div where IlType,
                Rem::rem => Mod where HasMod,
                BitAnd::bitand => And where Bitwise,
                BitOr::bitor => Or where Bitwise,
                BitXor::bitxor => Xor where Bitwise,
                Shl::shl => Shl where Bitwise,
                Shr::shr => Shr where Bitwise,
            );
            unary_operator!($lhs:
                Neg::neg => Neg where IlType,
                Not::not => Not where Bitwise,
            );
            comparisons!($lhs:
                cmp_eq => Eq,
                cmp_ne => Ne,
                cmp_lt => Lt,
                cmp_le => Le,
                cmp_gt => Gt,
                cmp_ge => Ge,
            );
        )+
    };
}

value_operators!(Expr, Variable, VarLanes, NamedVariable);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;

    fn emit_lines(node: Node) -> (Operand, Vec<String>) {
        let mut source = Source::new(KernelConfig::default());
        let operand = node.emit(&mut source).unwrap();
        let program = source.finish().unwrap();
        let body = program
            .lines
            .into_iter()
            .filter(|l| !l.starts_with("il_") && !l.starts_with("dcl_") && l != "end")
            .collect();
        (operand, body)
    }

    #[test]
    fn test_children_emit_first() {
        let a = Expr::<Int>::from_node(Node::register(Reg(100), ValueType::INT));
        let expr = (a + 2) * 3;
        let (operand, lines) = emit_lines(expr.into_node());
        assert_eq!(lines, vec!["iadd r0.x, r100.x, l0.x", "imul r1.x, r0.x, l1.x"]);
        assert_eq!(operand.to_string(), "r1.x");
    }

    #[test]
    fn test_scratch_before_result() {
        let a = Expr::<Int>::from_node(Node::register(Reg(50), ValueType::INT));
        let (operand, lines) = emit_lines((a - 1).into_node());
        assert_eq!(lines, vec!["inegate r0.x, l0.x", "iadd r1.x, r50.x, r0.x"]);
        assert_eq!(operand.to_string(), "r1.x");
    }

    #[test]
    fn test_literal_operands_are_pooled() {
        let a = Expr::<Float4>::from_node(Node::register(Reg(9), ValueType::FLOAT4));
        let expr = a * [2.0f32; 4] + [2.0f32; 4];
        let (_, lines) = emit_lines(expr.into_node());
        assert_eq!(lines, vec!["mul r0, r9, l0", "add r1, r0, l0"]);
    }

    #[test]
    fn test_swizzle_is_free() {
        let a = Expr::<Float4>::from_node(Node::register(Reg(3), ValueType::FLOAT4));
        let (operand, lines) = emit_lines(a.wzy().into_node());
        assert!(lines.is_empty());
        assert_eq!(operand.to_string(), "r3.wzyy");
    }

    #[test]
    fn test_untyped_op_checks_types() {
        let lhs = Node::register(Reg(0), ValueType::FLOAT4);
        let rhs = Node::register(Reg(1), ValueType::INT4);
        let err = Node::op(OpKind::Add, vec![lhs, rhs]).unwrap_err();
        assert!(matches!(err, CompileError::NoSpecialization { .. }));

        let cond = Node::op(
            OpKind::Lt,
            vec![Node::register(Reg(0), ValueType::DOUBLE), Node::register(Reg(1), ValueType::DOUBLE)],
        )
        .unwrap();
        assert_eq!(cond.ty(), ValueType::UINT);
    }

    #[test]
    fn test_comparison_mask_type() {
        let a = Expr::<Float2>::from_node(Node::register(Reg(7), ValueType::FLOAT2));
        let mask: Expr<Uint2> = a.cmp_gt([1.0f32, 2.0]);
        let (_, lines) = emit_lines(mask.into_node());
        assert_eq!(lines, vec!["lt r0.xy, l0.xy, r7.xy"]);
    }
}
