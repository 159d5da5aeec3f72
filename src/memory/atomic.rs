//! Atomic read-modify-write on LDS and UAV elements
//!
//! Every operation exists in two forms with distinct opcodes: the plain
//! form returns nothing, the fetch form (`*_read_*`) writes the value the
//! element held before the operation into a fresh register.

use std::fmt;

use crate::error::{CompileError, CompileResult};
use crate::expr::{IntoExpr, Node};
use crate::kernel::Kernel;
use crate::operand::{Dest, Instruction, Reg};
use crate::source::Source;
use crate::types::{AtomicElement, IlType, IndexType, ScalarKind, ValueType};
use crate::variable::Variable;

use super::{uav, View, ViewKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicOp {
    Add,
    Sub,
    Min,
    Max,
    And,
    Or,
    Xor,
    CompareExchange,
}

impl AtomicOp {
    /// Opcode fragment for elements of type `element`; min and max have
    /// unsigned variants
    pub fn mnemonic(self, element: ValueType) -> &'static str {
        let unsigned = element.scalar == ScalarKind::Uint;
        match self {
            AtomicOp::Add => "add",
            AtomicOp::Sub => "sub",
            AtomicOp::Min if unsigned => "umin",
            AtomicOp::Min => "min",
            AtomicOp::Max if unsigned => "umax",
            AtomicOp::Max => "max",
            AtomicOp::And => "and",
            AtomicOp::Or => "or",
            AtomicOp::Xor => "xor",
            AtomicOp::CompareExchange => "cmp_xchg",
        }
    }

    /// Value operands after the index: the comparand and the new value
    /// for compare-exchange, one value otherwise
    pub fn operand_count(self) -> usize {
        match self {
            AtomicOp::CompareExchange => 2,
            _ => 1,
        }
    }

    pub fn parse(name: &str) -> Option<AtomicOp> {
        Some(match name {
            "add" => AtomicOp::Add,
            "sub" => AtomicOp::Sub,
            "min" => AtomicOp::Min,
            "max" => AtomicOp::Max,
            "and" => AtomicOp::And,
            "or" => AtomicOp::Or,
            "xor" => AtomicOp::Xor,
            "cmpxchg" | "compare_exchange" => AtomicOp::CompareExchange,
            _ => return None,
        })
    }
}

impl fmt::Display for AtomicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AtomicOp::Add => "add",
            AtomicOp::Sub => "sub",
            AtomicOp::Min => "min",
            AtomicOp::Max => "max",
            AtomicOp::And => "and",
            AtomicOp::Or => "or",
            AtomicOp::Xor => "xor",
            AtomicOp::CompareExchange => "cmpxchg",
        };
        f.write_str(name)
    }
}

pub(super) fn emit_atomic(
    source: &mut Source,
    view: &View,
    op: AtomicOp,
    index: Node,
    operands: Vec<Node>,
    fetch: bool,
) -> CompileResult<Option<Reg>> {
    let element = view.element;
    let mnemonic = op.mnemonic(element);
    let read = if fetch { "read_" } else { "" };
    let (opcode, address) = match view.kind {
        ViewKind::Lds { id } => {
            let index = index.emit(source)?;
            (format!("lds_{}{}_id({})", read, mnemonic, id), index.first_lane())
        }
        ViewKind::Uav { id, kind, .. } => {
            let address = uav::address(source, kind, element, index)?;
            (format!("uav_{}{}_id({})", read, mnemonic, id), address)
        }
        _ => {
            return Err(CompileError::type_error(format!(
                "atomics need an LDS or UAV view, not {:?}",
                view.kind
            )))
        }
    };
    let mut values = Vec::with_capacity(operands.len());
    for operand in operands {
        values.push(operand.emit(source)?);
    }

    let mut inst = Instruction::new(opcode);
    let result = if fetch {
        let dst = source.alloc_reg()?;
        inst = inst.arg(Dest::register(dst, element));
        Some(dst)
    } else {
        None
    };
    source.emit(inst.arg(address).args(values));
    Ok(result)
}

macro_rules! atomic_methods {
    ($($plain:ident, $fetch:ident => $op:ident);+ $(;)?) => {
        $(
            fn $plain<I>(&self, k: &mut Kernel, index: I, value: impl IntoExpr<Ty = Self::Elem>) -> CompileResult<()>
            where
                I: IntoExpr,
                I::Ty: IndexType,
            {
                self.atomic_view()
                    .atomic(k.source_mut(), AtomicOp::$op, index.into_node(), vec![value.into_node()], false)
                    .map(|_| ())
            }

            fn $fetch<I>(
                &self,
                k: &mut Kernel,
                index: I,
                value: impl IntoExpr<Ty = Self::Elem>,
            ) -> CompileResult<Variable<Self::Elem>>
            where
                I: IntoExpr,
                I::Ty: IndexType,
            {
                let reg = self
                    .atomic_view()
                    .atomic(k.source_mut(), AtomicOp::$op, index.into_node(), vec![value.into_node()], true)?;
                fetched(reg)
            }
        )+
    };
}

fn fetched<T: IlType>(reg: Option<Reg>) -> CompileResult<Variable<T>> {
    reg.map(Variable::from_reg)
        .ok_or_else(|| CompileError::codegen("fetching atomic produced no register"))
}

/// Views whose elements support atomics
pub trait AtomicView {
    type Elem: AtomicElement;

    fn atomic_view(&self) -> View;

    atomic_methods!(
        atomic_add, fetch_add => Add;
        atomic_sub, fetch_sub => Sub;
        atomic_min, fetch_min => Min;
        atomic_max, fetch_max => Max;
        atomic_and, fetch_and => And;
        atomic_or, fetch_or => Or;
        atomic_xor, fetch_xor => Xor;
    );

    /// Store `value` where the element equals `compare`
    fn atomic_compare_exchange<I>(
        &self,
        k: &mut Kernel,
        index: I,
        compare: impl IntoExpr<Ty = Self::Elem>,
        value: impl IntoExpr<Ty = Self::Elem>,
    ) -> CompileResult<()>
    where
        I: IntoExpr,
        I::Ty: IndexType,
    {
        let operands = vec![compare.into_node(), value.into_node()];
        self.atomic_view()
            .atomic(k.source_mut(), AtomicOp::CompareExchange, index.into_node(), operands, false)
            .map(|_| ())
    }

    fn fetch_compare_exchange<I>(
        &self,
        k: &mut Kernel,
        index: I,
        compare: impl IntoExpr<Ty = Self::Elem>,
        value: impl IntoExpr<Ty = Self::Elem>,
    ) -> CompileResult<Variable<Self::Elem>>
    where
        I: IntoExpr,
        I::Ty: IndexType,
    {
        let operands = vec![compare.into_node(), value.into_node()];
        let reg = self
            .atomic_view()
            .atomic(k.source_mut(), AtomicOp::CompareExchange, index.into_node(), operands, true)?;
        fetched(reg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::program::{CacheMode, UavKind};

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
    fn test_plain_and_fetch_opcodes_differ() {
        let mut source = Source::new(KernelConfig::default());
        let lds = View::new(ViewKind::Lds { id: 0 }, ValueType::UINT);
        let none = lds
            .atomic(
                &mut source,
                AtomicOp::Add,
                Node::register(Reg(10), ValueType::UINT),
                vec![Node::register(Reg(11), ValueType::UINT)],
                false,
            )
            .unwrap();
        assert_eq!(none, None);
        let fetched = lds
            .atomic(
                &mut source,
                AtomicOp::Max,
                Node::register(Reg(10), ValueType::UINT),
                vec![Node::register(Reg(11), ValueType::UINT)],
                true,
            )
            .unwrap();
        assert_eq!(fetched, Some(Reg(0)));
        assert_eq!(
            body(source),
            vec!["lds_add_id(0) r10.x, r11.x", "lds_read_umax_id(0) r0.x, r10.x, r11.x"]
        );
    }

    #[test]
    fn test_uav_compare_exchange() {
        let mut source = Source::new(KernelConfig::default());
        let uav = View::new(
            ViewKind::Uav {
                id: 2,
                kind: UavKind::Typed,
                cache: CacheMode::Cached,
            },
            ValueType::INT,
        );
        uav.atomic(
            &mut source,
            AtomicOp::CompareExchange,
            Node::register(Reg(10), ValueType::INT),
            vec![Node::register(Reg(11), ValueType::INT), Node::register(Reg(12), ValueType::INT)],
            false,
        )
        .unwrap();
        assert_eq!(body(source), vec!["uav_cmp_xchg_id(2) r10.x, r11.x, r12.x"]);
    }

    #[test]
    fn test_operand_count_checked() {
        let mut source = Source::new(KernelConfig::default());
        let lds = View::new(ViewKind::Lds { id: 0 }, ValueType::INT);
        let err = lds
            .atomic(
                &mut source,
                AtomicOp::CompareExchange,
                Node::register(Reg(10), ValueType::INT),
                vec![Node::register(Reg(11), ValueType::INT)],
                false,
            )
            .unwrap_err();
        assert!(matches!(err, CompileError::CodeGenError { .. }));
    }

    #[test]
    fn test_names_round_trip() {
        for op in [AtomicOp::Add, AtomicOp::Xor, AtomicOp::CompareExchange] {
            assert_eq!(AtomicOp::parse(&op.to_string()), Some(op));
        }
    }
}
