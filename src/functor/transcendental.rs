//! Transcendentals, roots and rounding
//!
//! The transcendental opcodes are scalar only. Vector operands are
//! unrolled: one instruction per component into a scratch register, then
//! a single move into the destination. Natural `log` and `exp` are built
//! from the base-2 opcodes and a literal scale factor.

use super::{EmitContext, FunctorTable, OpKind, Template};
use crate::error::CompileResult;
use crate::operand::{Dest, Instruction, Operand};
use crate::types::{ScalarKind, ValueType};

/// Scratch registers an unrolled template needs for a value of `ty`
fn unroll_regs(ty: ValueType) -> u32 {
    u32::from(ty.component_count() > 1)
}

pub(super) fn register(table: &mut FunctorTable) {
    for ty in ValueType::ALL {
        match ty.scalar {
            ScalarKind::Float => {
                let unrolled = [
                    (OpKind::Log2, "log"),
                    (OpKind::Exp2, "exp"),
                    (OpKind::Sqrt, "sqrt"),
                    (OpKind::Rsqrt, "rsq"),
                    (OpKind::Rcp, "rcp"),
                ];
                for (op, opcode) in unrolled {
                    table.insert(op, &[ty], ty, unroll_regs(ty), Template::Unrolled(opcode));
                }
                let log = Template::Scaled {
                    opcode: "log",
                    factor: std::f32::consts::LN_2,
                    scale_first: false,
                };
                let exp = Template::Scaled {
                    opcode: "exp",
                    factor: std::f32::consts::LOG2_E,
                    scale_first: true,
                };
                table.insert(OpKind::Log, &[ty], ty, 1, log);
                table.insert(OpKind::Exp, &[ty], ty, 1, exp);
                table.insert(OpKind::Floor, &[ty], ty, 0, Template::Direct("flr"));
                table.insert(OpKind::Round, &[ty], ty, 0, Template::Direct("round_nearest"));
                table.insert(OpKind::Frac, &[ty], ty, 0, Template::Direct("frc"));
            }
            ScalarKind::Double => {
                let unrolled = [
                    (OpKind::Sqrt, "dsqrt"),
                    (OpKind::Rsqrt, "drsq"),
                    (OpKind::Rcp, "drcp"),
                    (OpKind::Frac, "dfrac"),
                ];
                for (op, opcode) in unrolled {
                    table.insert(op, &[ty], ty, unroll_regs(ty), Template::Unrolled(opcode));
                }
            }
            ScalarKind::Int | ScalarKind::Uint => {}
        }
    }
}

/// One `opcode` per component of the source, written into the components of
/// the result type
pub(super) fn emit_unrolled(ctx: &mut EmitContext<'_>, opcode: &str) {
    let from = ctx.src_types[0];
    let to = ctx.result;
    if from.component_count() == 1 {
        let inst = Instruction::new(opcode).arg(ctx.dest()).arg(&ctx.srcs[0]);
        ctx.emit(inst);
        return;
    }
    let scratch = ctx.scratch(0);
    for k in 0..from.component_count() {
        let inst = Instruction::new(opcode)
            .arg(Dest::component(scratch, to, k))
            .arg(ctx.srcs[0].component(from, k));
        ctx.emit(inst);
    }
    let inst = Instruction::new("mov")
        .arg(ctx.dest())
        .arg(Operand::register(scratch, to));
    ctx.emit(inst);
}

pub(super) fn emit_scaled(
    ctx: &mut EmitContext<'_>,
    opcode: &str,
    factor: f32,
    scale_first: bool,
) -> CompileResult<()> {
    let ty = ctx.result;
    let scale = ctx.float_literal(factor, ty)?;
    let scratch = ctx.scratch(0);
    let scratch_value = Operand::register(scratch, ty);

    if scale_first {
        let inst = Instruction::new("mul")
            .arg(Dest::register(scratch, ty))
            .arg(&ctx.srcs[0])
            .arg(&scale);
        ctx.emit(inst);
        for k in 0..ty.component_count() {
            let inst = Instruction::new(opcode)
                .arg(Dest::component(ctx.dst, ty, k))
                .arg(scratch_value.component(ty, k));
            ctx.emit(inst);
        }
    } else {
        for k in 0..ty.component_count() {
            let inst = Instruction::new(opcode)
                .arg(Dest::component(scratch, ty, k))
                .arg(ctx.srcs[0].component(ty, k));
            ctx.emit(inst);
        }
        let inst = Instruction::new("mul")
            .arg(ctx.dest())
            .arg(scratch_value)
            .arg(&scale);
        ctx.emit(inst);
    }
    Ok(())
}
