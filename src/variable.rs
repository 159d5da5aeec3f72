//! Variables, named registers and assignment targets

use std::fmt;
use std::marker::PhantomData;

use crate::expr::{Expr, IntoExpr, Node};
use crate::operand::Reg;
use crate::program::ArgLayout;
use crate::swizzle::{Lane, Lanes, Swizzle};
use crate::types::{HasLane2, HasLane4, IlType, Uint, Uint4, ValueType};

/// Handle to a temporary register that keeps its value across statements
///
/// Unlike an [`Expr`], a variable can be read any number of times; every
/// read is a plain register reference.
#[derive(Debug)]
pub struct Variable<T: IlType> {
    reg: Reg,
    _ty: PhantomData<T>,
}

impl<T: IlType> Clone for Variable<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: IlType> Copy for Variable<T> {}

impl<T: IlType> PartialEq for Variable<T> {
    fn eq(&self, other: &Self) -> bool {
        self.reg == other.reg
    }
}

impl<T: IlType> Variable<T> {
    pub(crate) fn from_reg(reg: Reg) -> Self {
        Self {
            reg,
            _ty: PhantomData,
        }
    }

    pub fn reg(&self) -> Reg {
        self.reg
    }

    /// Read the whole variable
    pub fn get(self) -> Expr<T> {
        self.into_expr()
    }

    fn lanes<U: IlType>(self, selectors: &[Lane]) -> VarLanes<U> {
        let swizzle = Swizzle::from_lanes(selectors);
        VarLanes {
            reg: self.reg,
            lanes: swizzle.apply(T::TYPE, &Lanes::identity(T::TYPE.lanes())),
            _ty: PhantomData,
        }
    }
}

impl<T: IlType> Variable<T> {
    pub fn x(self) -> VarLanes<T::Scalar> {
        self.lanes(&[Lane::X])
    }
}

impl<T: HasLane2> Variable<T> {
    pub fn y(self) -> VarLanes<T::Scalar> {
        self.lanes(&[Lane::Y])
    }

    pub fn xy(self) -> VarLanes<T::Vec2> {
        self.lanes(&[Lane::X, Lane::Y])
    }
}

impl<T: HasLane4> Variable<T> {
    pub fn z(self) -> VarLanes<T::Scalar> {
        self.lanes(&[Lane::Z])
    }

    pub fn w(self) -> VarLanes<T::Scalar> {
        self.lanes(&[Lane::W])
    }

    pub fn xz(self) -> VarLanes<T::Vec2> {
        self.lanes(&[Lane::X, Lane::Z])
    }

    pub fn xw(self) -> VarLanes<T::Vec2> {
        self.lanes(&[Lane::X, Lane::W])
    }

    pub fn yz(self) -> VarLanes<T::Vec2> {
        self.lanes(&[Lane::Y, Lane::Z])
    }

    pub fn yw(self) -> VarLanes<T::Vec2> {
        self.lanes(&[Lane::Y, Lane::W])
    }

    pub fn zw(self) -> VarLanes<T::Vec2> {
        self.lanes(&[Lane::Z, Lane::W])
    }
}

impl<T: IlType> IntoExpr for Variable<T> {
    type Ty = T;

    fn into_expr(self) -> Expr<T> {
        Expr::from_node(Node::register(self.reg, T::TYPE))
    }
}

impl<T: IlType> From<Variable<T>> for Expr<T> {
    fn from(var: Variable<T>) -> Self {
        var.into_expr()
    }
}

/// Distinct, increasing lanes of a variable; readable and assignable
#[derive(Debug)]
pub struct VarLanes<T: IlType> {
    reg: Reg,
    lanes: Lanes,
    _ty: PhantomData<T>,
}

impl<T: IlType> Clone for VarLanes<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: IlType> Copy for VarLanes<T> {}

impl<T: IlType> VarLanes<T> {
    pub fn get(self) -> Expr<T> {
        self.into_expr()
    }
}

impl<T: IlType> IntoExpr for VarLanes<T> {
    type Ty = T;

    fn into_expr(self) -> Expr<T> {
        Expr::from_node(Node::register_lanes(self.reg, self.lanes, T::TYPE))
    }
}

/// Register lanes an assignment writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub reg: Reg,
    pub lanes: Lanes,
    pub ty: ValueType,
}

impl Target {
    /// Every lane of a register holding a value of type `ty`
    pub fn whole(reg: Reg, ty: ValueType) -> Self {
        Self {
            reg,
            lanes: Lanes::identity(ty.lanes()),
            ty,
        }
    }
}

/// Something that can appear on the left of an assignment
///
/// Only variables and their lane views are places; an rvalue expression,
/// including a swizzle of one, is not:
///
/// ```compile_fail
/// use expr_to_il::*;
/// let mut k = Kernel::begin(KernelConfig::default());
/// let v = k.var::<Float4>().unwrap();
/// k.assign(v.get().x(), 1.0f32).unwrap();
/// ```
pub trait Place {
    type Ty: IlType;

    fn target(&self) -> Target;
}

impl<T: IlType> Place for Variable<T> {
    type Ty = T;

    fn target(&self) -> Target {
        Target::whole(self.reg, T::TYPE)
    }
}

impl<T: IlType> Place for VarLanes<T> {
    type Ty = T;

    fn target(&self) -> Target {
        Target {
            reg: self.reg,
            lanes: self.lanes,
            ty: T::TYPE,
        }
    }
}

/// A hardware-named register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedRegister {
    /// Register `index` of constant buffer `cb`
    ConstBuffer { cb: u32, index: u32 },
    /// A system value such as `vAbsTid`
    Builtin(&'static str),
}

impl fmt::Display for NamedRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamedRegister::ConstBuffer { cb, index } => write!(f, "cb{}[{}]", cb, index),
            NamedRegister::Builtin(name) => f.write_str(name),
        }
    }
}

/// Read-only value living in a named register
#[derive(Debug)]
pub struct NamedVariable<T: IlType> {
    register: NamedRegister,
    lanes: Lanes,
    _ty: PhantomData<T>,
}

impl<T: IlType> Clone for NamedVariable<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: IlType> Copy for NamedVariable<T> {}

impl<T: IlType> NamedVariable<T> {
    pub(crate) fn new(register: NamedRegister, lanes: Lanes) -> Self {
        Self {
            register,
            lanes,
            _ty: PhantomData,
        }
    }

    /// Kernel argument placed by the constant-buffer layout
    pub(crate) fn argument(layout: &ArgLayout) -> Self {
        let first = layout.component;
        let lanes: Vec<u8> = (first..first + T::TYPE.lanes()).collect();
        Self::new(
            NamedRegister::ConstBuffer {
                cb: layout.cb,
                index: layout.index,
            },
            Lanes::from_slice(&lanes),
        )
    }

    fn builtin(name: &'static str) -> Self {
        Self::new(NamedRegister::Builtin(name), Lanes::identity(T::TYPE.lanes()))
    }

    pub fn register(&self) -> NamedRegister {
        self.register
    }

    pub fn get(self) -> Expr<T> {
        self.into_expr()
    }
}

impl<T: IlType> IntoExpr for NamedVariable<T> {
    type Ty = T;

    fn into_expr(self) -> Expr<T> {
        Expr::from_node(Node::named(self.register.to_string(), self.lanes, T::TYPE))
    }
}

impl<T: IlType> fmt::Display for NamedVariable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.register)?;
        if !self.lanes.is_full_identity() {
            write!(f, ".{}", self.lanes)?;
        }
        Ok(())
    }
}

/// Absolute thread id within the dispatch
pub fn abs_thread_id() -> NamedVariable<Uint4> {
    NamedVariable::builtin("vAbsTid")
}

pub fn abs_thread_id_flat() -> NamedVariable<Uint> {
    NamedVariable::builtin("vAbsTidFlat")
}

/// Thread id within the work-group
pub fn local_thread_id() -> NamedVariable<Uint4> {
    NamedVariable::builtin("vTidInGrp")
}

pub fn local_thread_id_flat() -> NamedVariable<Uint> {
    NamedVariable::builtin("vTidInGrpFlat")
}

/// Work-group id
pub fn group_id() -> NamedVariable<Uint4> {
    NamedVariable::builtin("vThreadGrpId")
}

pub fn group_id_flat() -> NamedVariable<Uint> {
    NamedVariable::builtin("vThreadGrpIdFlat")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Double2, Float4};

    #[test]
    fn test_lane_targets() {
        let v = Variable::<Float4>::from_reg(Reg(2));
        assert_eq!(v.yw().target().lanes.suffix(), "yw");
        assert_eq!(v.target(), Target::whole(Reg(2), ValueType::FLOAT4));
        let d = Variable::<Double2>::from_reg(Reg(3));
        assert_eq!(d.y().target().lanes.suffix(), "zw");
    }

    #[test]
    fn test_named_rendering() {
        assert_eq!(abs_thread_id_flat().to_string(), "vAbsTidFlat.x");
        assert_eq!(group_id().to_string(), "vThreadGrpId");
        let layout = ArgLayout {
            name: "scale".into(),
            ty: ValueType::FLOAT,
            cb: 0,
            index: 1,
            component: 2,
            byte_offset: 24,
            size: 4,
        };
        let arg = NamedVariable::<crate::types::Float>::argument(&layout);
        assert_eq!(arg.to_string(), "cb0[1].z");
    }
}
