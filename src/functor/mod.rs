//! Operator and function tables
//!
//! Every legal `(operation, operand types)` combination maps to a
//! [`FunctorEntry`]: the result type, the number of scratch registers the
//! instruction template needs, and the template itself. The table is built
//! once from the per-category registration functions and then checked
//! against [`expected_result`], an independent statement of which
//! combinations are legal. A table that fails the check makes every lookup
//! fail with the discrepancy list instead of emitting bad code.

mod arith;
mod bitwise;
mod cast;
mod compare;
mod transcendental;

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::error::{CompileError, CompileResult};
use crate::operand::{Dest, Instruction, Operand, Reg};
use crate::source::LiteralPool;
use crate::types::{ScalarKind, ValueType};

/// Operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Neg,
    Not,
    Abs,
    Log,
    Log2,
    Exp,
    Exp2,
    Sqrt,
    Rsqrt,
    Rcp,
    Floor,
    Round,
    Frac,
    /// Numeric conversion to the given type
    Cast(ValueType),
    /// Bit reinterpretation as the given type
    Bitcast(ValueType),
    Mad,
    Select,
}

impl OpKind {
    const FIXED: [OpKind; 33] = [
        OpKind::Add,
        OpKind::Sub,
        OpKind::Mul,
        OpKind::Div,
        OpKind::Mod,
        OpKind::Min,
        OpKind::Max,
        OpKind::And,
        OpKind::Or,
        OpKind::Xor,
        OpKind::Shl,
        OpKind::Shr,
        OpKind::Eq,
        OpKind::Ne,
        OpKind::Lt,
        OpKind::Le,
        OpKind::Gt,
        OpKind::Ge,
        OpKind::Neg,
        OpKind::Not,
        OpKind::Abs,
        OpKind::Log,
        OpKind::Log2,
        OpKind::Exp,
        OpKind::Exp2,
        OpKind::Sqrt,
        OpKind::Rsqrt,
        OpKind::Rcp,
        OpKind::Floor,
        OpKind::Round,
        OpKind::Frac,
        OpKind::Mad,
        OpKind::Select,
    ];

    /// Every operation, with casts to every target type
    pub fn all() -> Vec<OpKind> {
        let mut ops = OpKind::FIXED.to_vec();
        for ty in ValueType::ALL {
            ops.push(OpKind::Cast(ty));
            ops.push(OpKind::Bitcast(ty));
        }
        ops
    }

    pub fn arity(self) -> usize {
        use OpKind::*;
        match self {
            Neg | Not | Abs | Log | Log2 | Exp | Exp2 | Sqrt | Rsqrt | Rcp | Floor | Round
            | Frac | Cast(_) | Bitcast(_) => 1,
            Mad | Select => 3,
            _ => 2,
        }
    }

    /// Look up an operation by its function name
    pub fn from_function(name: &str) -> Option<OpKind> {
        use OpKind::*;
        let op = match name {
            "min" => Min,
            "max" => Max,
            "abs" => Abs,
            "log" => Log,
            "log2" => Log2,
            "exp" => Exp,
            "exp2" => Exp2,
            "sqrt" => Sqrt,
            "rsqrt" => Rsqrt,
            "rcp" => Rcp,
            "floor" => Floor,
            "round" => Round,
            "frac" => Frac,
            "mad" => Mad,
            "select" => Select,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Cast(ty) => write!(f, "cast<{}>", ty),
            OpKind::Bitcast(ty) => write!(f, "bitcast<{}>", ty),
            other => write!(f, "{}", format!("{:?}", other).to_lowercase()),
        }
    }
}

/// Instruction template of a table entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Template {
    /// `op dst, src0[, src1[, src2]]`
    Direct(&'static str),
    /// Binary op with its two sources swapped
    Swapped(&'static str),
    /// `mov dst, src_neg(..)`
    Negate,
    /// `inegate` into scratch, then `iadd`
    IntSub,
    /// `dadd` with a negated second source
    DoubleSub,
    /// `inegate` into scratch, then `imax`
    IntAbs,
    /// `dmax` of the source and its negation
    DoubleAbs,
    /// A scalar-only opcode applied one component at a time
    Unrolled(&'static str),
    /// A scalar opcode combined with a literal scale factor
    Scaled {
        opcode: &'static str,
        factor: f32,
        scale_first: bool,
    },
    /// Double comparison gathered lane by lane through scratch registers
    DoubleCompare { opcode: &'static str, swap: bool },
    /// `mov dst, src`
    Move,
}

/// A table entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctorEntry {
    pub result: ValueType,
    pub temp_regs: u32,
    pub template: Template,
}

/// State handed to a template while it emits one node
pub struct EmitContext<'a> {
    pub dst: Reg,
    pub result: ValueType,
    pub srcs: &'a [Operand],
    pub src_types: &'a [ValueType],
    scratch: Reg,
    literals: &'a mut LiteralPool,
    out: Vec<Instruction>,
}

impl<'a> EmitContext<'a> {
    pub fn new(
        dst: Reg,
        result: ValueType,
        srcs: &'a [Operand],
        src_types: &'a [ValueType],
        scratch: Reg,
        literals: &'a mut LiteralPool,
    ) -> Self {
        Self {
            dst,
            result,
            srcs,
            src_types,
            scratch,
            literals,
            out: Vec::new(),
        }
    }

    /// Scratch register `i` of this node
    pub fn scratch(&self, i: u32) -> Reg {
        self.scratch.offset(i)
    }

    /// Full destination of the result
    pub fn dest(&self) -> Dest {
        Dest::register(self.dst, self.result)
    }

    pub fn emit(&mut self, inst: Instruction) {
        self.out.push(inst);
    }

    /// Literal holding `value` in every lane, read as type `ty`
    pub fn float_literal(&mut self, value: f32, ty: ValueType) -> CompileResult<Operand> {
        let index = self.literals.intern([value.to_bits(); 4])?;
        Ok(Operand::literal(index, ty))
    }

    pub fn finish(self) -> Vec<Instruction> {
        self.out
    }
}

impl Template {
    pub fn emit(&self, ctx: &mut EmitContext<'_>) -> CompileResult<()> {
        match *self {
            Template::Direct(opcode) => {
                let inst = Instruction::new(opcode).arg(ctx.dest()).args(ctx.srcs.iter());
                ctx.emit(inst);
            }
            Template::Swapped(opcode) => {
                let inst = Instruction::new(opcode)
                    .arg(ctx.dest())
                    .arg(&ctx.srcs[1])
                    .arg(&ctx.srcs[0]);
                ctx.emit(inst);
            }
            Template::Move => {
                let inst = Instruction::new("mov").arg(ctx.dest()).arg(&ctx.srcs[0]);
                ctx.emit(inst);
            }
            Template::Negate => arith::emit_negate(ctx),
            Template::IntSub => arith::emit_int_sub(ctx),
            Template::DoubleSub => arith::emit_double_sub(ctx),
            Template::IntAbs => arith::emit_int_abs(ctx),
            Template::DoubleAbs => arith::emit_double_abs(ctx),
            Template::Unrolled(opcode) => transcendental::emit_unrolled(ctx, opcode),
            Template::Scaled {
                opcode,
                factor,
                scale_first,
            } => transcendental::emit_scaled(ctx, opcode, factor, scale_first)?,
            Template::DoubleCompare { opcode, swap } => compare::emit_double_compare(ctx, opcode, swap),
        }
        Ok(())
    }
}

/// Key of a table entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FunctorKey {
    op: OpKind,
    operands: Vec<ValueType>,
}

/// The operation table
#[derive(Debug, Default)]
pub struct FunctorTable {
    entries: HashMap<FunctorKey, FunctorEntry>,
}

impl FunctorTable {
    /// Build the table from every category
    pub fn build() -> Self {
        let mut table = FunctorTable::default();
        arith::register(&mut table);
        bitwise::register(&mut table);
        compare::register(&mut table);
        transcendental::register(&mut table);
        cast::register(&mut table);
        table
    }

    pub(crate) fn insert(&mut self, op: OpKind, operands: &[ValueType], result: ValueType, temp_regs: u32, template: Template) {
        let key = FunctorKey {
            op,
            operands: operands.to_vec(),
        };
        self.entries.insert(
            key,
            FunctorEntry {
                result,
                temp_regs,
                template,
            },
        );
    }

    pub fn get(&self, op: OpKind, operands: &[ValueType]) -> Option<&FunctorEntry> {
        self.entries.get(&FunctorKey {
            op,
            operands: operands.to_vec(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compare the table against the legality rules for every operation
    /// over every operand combination
    pub fn verify(&self) -> CompileResult<()> {
        let mut problems = Vec::new();
        for op in OpKind::all() {
            for operands in operand_tuples(op.arity()) {
                let expected = expected_result(op, &operands);
                let actual = self.get(op, &operands).map(|entry| entry.result);
                if expected != actual {
                    problems.push(format!(
                        "{}({}): expected {:?}, table has {:?}",
                        op,
                        type_list(&operands),
                        expected.map(|t| t.to_string()),
                        actual.map(|t| t.to_string())
                    ));
                }
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(CompileError::codegen(format!(
                "incomplete operation table: {}",
                problems.join("; ")
            )))
        }
    }
}

fn operand_tuples(arity: usize) -> Vec<Vec<ValueType>> {
    let mut tuples = vec![Vec::new()];
    for _ in 0..arity {
        tuples = tuples
            .into_iter()
            .flat_map(|prefix| {
                ValueType::ALL.iter().map(move |ty| {
                    let mut next = prefix.clone();
                    next.push(*ty);
                    next
                })
            })
            .collect();
    }
    tuples
}

/// Comma-separated operand type names
pub fn type_list(types: &[ValueType]) -> String {
    types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}

/// Result type of a legal combination; `None` when there is no
/// specialization. No operand is ever promoted.
pub fn expected_result(op: OpKind, operands: &[ValueType]) -> Option<ValueType> {
    use OpKind::*;
    match (op, operands) {
        (Add | Sub | Mul | Div | Min | Max, [a, b]) if a == b => Some(*a),
        (Mod, [a, b]) if a == b && !a.is_double() => Some(*a),
        (And | Or | Xor | Shl | Shr, [a, b]) if a == b && a.is_integral() => Some(*a),
        (Eq | Ne | Lt | Le | Gt | Ge, [a, b]) if a == b => Some(a.mask_type()),
        (Neg, [a]) => Some(*a),
        (Not, [a]) if a.is_integral() => Some(*a),
        (Abs, [a]) if a.scalar != ScalarKind::Uint => Some(*a),
        (Log | Log2 | Exp | Exp2 | Floor | Round, [a]) if a.is_float() => Some(*a),
        (Sqrt | Rsqrt | Rcp | Frac, [a]) if !a.is_integral() => Some(*a),
        (Cast(to), [a]) if to.count == a.count => Some(to),
        (Bitcast(to), [a]) if to.lanes() == a.lanes() => Some(to),
        (Mad, [a, b, c]) if a == b && b == c => Some(*a),
        (Select, [m, a, b]) if a == b && !a.is_double() && *m == a.mask_type() => Some(*a),
        _ => None,
    }
}

static TABLE: Lazy<(FunctorTable, CompileResult<()>)> = Lazy::new(|| {
    let table = FunctorTable::build();
    let verified = table.verify();
    if let Err(err) = &verified {
        log::error!("{}", err);
    }
    (table, verified)
});

/// Look up the entry for `op` applied to `operands`
pub fn lookup(op: OpKind, operands: &[ValueType]) -> CompileResult<&'static FunctorEntry> {
    let (table, verified) = &*TABLE;
    verified.clone()?;
    table
        .get(op, operands)
        .ok_or_else(|| CompileError::no_specialization(op, type_list(operands)))
}

/// Result type of `op` applied to `operands`
pub fn result_type(op: OpKind, operands: &[ValueType]) -> CompileResult<ValueType> {
    lookup(op, operands).map(|entry| entry.result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_complete() {
        let table = FunctorTable::build();
        assert!(!table.is_empty());
        table.verify().unwrap();
    }

    #[test]
    fn test_no_implicit_promotion() {
        assert!(lookup(OpKind::Add, &[ValueType::FLOAT4, ValueType::INT4]).is_err());
        assert!(lookup(OpKind::Mul, &[ValueType::FLOAT, ValueType::FLOAT4]).is_err());
        let err = lookup(OpKind::And, &[ValueType::FLOAT, ValueType::FLOAT]).unwrap_err();
        assert!(matches!(err, CompileError::NoSpecialization { .. }));
    }

    #[test]
    fn test_scratch_counts() {
        let int_sub = lookup(OpKind::Sub, &[ValueType::INT, ValueType::INT]).unwrap();
        assert_eq!(int_sub.temp_regs, 1);
        assert_eq!(int_sub.template, Template::IntSub);
        let float_sub = lookup(OpKind::Sub, &[ValueType::FLOAT, ValueType::FLOAT]).unwrap();
        assert_eq!(float_sub.temp_regs, 0);
        let dlt = lookup(OpKind::Lt, &[ValueType::DOUBLE, ValueType::DOUBLE]).unwrap();
        assert_eq!(dlt.temp_regs, 1);
        let dlt2 = lookup(OpKind::Lt, &[ValueType::DOUBLE2, ValueType::DOUBLE2]).unwrap();
        assert_eq!(dlt2.temp_regs, 2);
        assert_eq!(dlt2.result, ValueType::UINT2);
    }

    #[test]
    fn test_op_names() {
        assert_eq!(OpKind::Add.to_string(), "add");
        assert_eq!(OpKind::Cast(ValueType::FLOAT4).to_string(), "cast<float4>");
        assert_eq!(OpKind::from_function("mad"), Some(OpKind::Mad));
        assert_eq!(OpKind::Mad.arity(), 3);
    }
}
