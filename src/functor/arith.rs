//! Arithmetic: add, sub, mul, div, mod, min, max, mad, negate, abs, select

use super::{EmitContext, FunctorTable, OpKind, Template};
use crate::operand::{Dest, Instruction, Operand};
use crate::types::{ScalarKind, ValueType};

/// Opcode per scalar kind: int, uint, float, double
fn by_kind(ty: ValueType, names: [&'static str; 4]) -> &'static str {
    match ty.scalar {
        ScalarKind::Int => names[0],
        ScalarKind::Uint => names[1],
        ScalarKind::Float => names[2],
        ScalarKind::Double => names[3],
    }
}

pub(super) fn register(table: &mut FunctorTable) {
    for ty in ValueType::ALL {
        let pair = [ty, ty];
        table.insert(OpKind::Add, &pair, ty, 0, Template::Direct(by_kind(ty, ["iadd", "iadd", "add", "dadd"])));
        table.insert(OpKind::Mul, &pair, ty, 0, Template::Direct(by_kind(ty, ["imul", "umul", "mul", "dmul"])));
        table.insert(
            OpKind::Div,
            &pair,
            ty,
            0,
            Template::Direct(by_kind(ty, ["idiv", "udiv", "div_zeroop(infinity)", "ddiv"])),
        );
        table.insert(OpKind::Min, &pair, ty, 0, Template::Direct(by_kind(ty, ["imin", "umin", "min", "dmin"])));
        table.insert(OpKind::Max, &pair, ty, 0, Template::Direct(by_kind(ty, ["imax", "umax", "max", "dmax"])));
        table.insert(
            OpKind::Mad,
            &[ty, ty, ty],
            ty,
            0,
            Template::Direct(by_kind(ty, ["imad", "umad", "mad", "dmad"])),
        );

        match ty.scalar {
            ScalarKind::Int | ScalarKind::Uint => {
                table.insert(OpKind::Sub, &pair, ty, 1, Template::IntSub);
                table.insert(OpKind::Neg, &[ty], ty, 0, Template::Direct("inegate"));
            }
            ScalarKind::Float => {
                table.insert(OpKind::Sub, &pair, ty, 0, Template::Direct("sub"));
                table.insert(OpKind::Neg, &[ty], ty, 0, Template::Negate);
            }
            ScalarKind::Double => {
                table.insert(OpKind::Sub, &pair, ty, 0, Template::DoubleSub);
                table.insert(OpKind::Neg, &[ty], ty, 0, Template::Negate);
            }
        }

        match ty.scalar {
            ScalarKind::Int => table.insert(OpKind::Abs, &[ty], ty, 1, Template::IntAbs),
            ScalarKind::Float => table.insert(OpKind::Abs, &[ty], ty, 0, Template::Direct("abs")),
            ScalarKind::Double => table.insert(OpKind::Abs, &[ty], ty, 0, Template::DoubleAbs),
            ScalarKind::Uint => {}
        }

        if !ty.is_double() {
            table.insert(OpKind::Mod, &pair, ty, 0, Template::Direct(by_kind(ty, ["imod", "umod", "mod", ""])));
            table.insert(
                OpKind::Select,
                &[ty.mask_type(), ty, ty],
                ty,
                0,
                Template::Direct("cmov_logical"),
            );
        }
    }
}

pub(super) fn emit_negate(ctx: &mut EmitContext<'_>) {
    let src = ctx.srcs[0].negated(ctx.src_types[0]);
    let inst = Instruction::new("mov").arg(ctx.dest()).arg(src);
    ctx.emit(inst);
}

/// `a - b` as `a + (-b)`; there is no integer subtract opcode
pub(super) fn emit_int_sub(ctx: &mut EmitContext<'_>) {
    let ty = ctx.result;
    let negated = ctx.scratch(0);
    let inst = Instruction::new("inegate")
        .arg(Dest::register(negated, ty))
        .arg(&ctx.srcs[1]);
    ctx.emit(inst);
    let inst = Instruction::new("iadd")
        .arg(ctx.dest())
        .arg(&ctx.srcs[0])
        .arg(Operand::register(negated, ty));
    ctx.emit(inst);
}

pub(super) fn emit_double_sub(ctx: &mut EmitContext<'_>) {
    let rhs = ctx.srcs[1].negated(ctx.src_types[1]);
    let inst = Instruction::new("dadd").arg(ctx.dest()).arg(&ctx.srcs[0]).arg(rhs);
    ctx.emit(inst);
}

/// `max(x, -x)`
pub(super) fn emit_int_abs(ctx: &mut EmitContext<'_>) {
    let ty = ctx.result;
    let negated = ctx.scratch(0);
    let inst = Instruction::new("inegate")
        .arg(Dest::register(negated, ty))
        .arg(&ctx.srcs[0]);
    ctx.emit(inst);
    let inst = Instruction::new("imax")
        .arg(ctx.dest())
        .arg(&ctx.srcs[0])
        .arg(Operand::register(negated, ty));
    ctx.emit(inst);
}

pub(super) fn emit_double_abs(ctx: &mut EmitContext<'_>) {
    let negated = ctx.srcs[0].negated(ctx.src_types[0]);
    let inst = Instruction::new("dmax").arg(ctx.dest()).arg(&ctx.srcs[0]).arg(negated);
    ctx.emit(inst);
}

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::operand::Reg;
    use crate::source::LiteralPool;

    fn render(op: OpKind, types: &[ValueType]) -> Vec<String> {
        let entry = lookup(op, types).unwrap();
        let srcs: Vec<Operand> = types
            .iter()
            .enumerate()
            .map(|(i, ty)| Operand::register(Reg(i as u32), *ty))
            .collect();
        let mut pool = LiteralPool::new(16);
        let mut ctx = EmitContext::new(Reg(9), entry.result, &srcs, types, Reg(5), &mut pool);
        entry.template.emit(&mut ctx).unwrap();
        ctx.finish().iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_integer_subtract_uses_negate() {
        let lines = render(OpKind::Sub, &[ValueType::INT, ValueType::INT]);
        assert_eq!(lines, vec!["inegate r5.x, r1.x", "iadd r9.x, r0.x, r5.x"]);
    }

    #[test]
    fn test_double_subtract() {
        let lines = render(OpKind::Sub, &[ValueType::DOUBLE2, ValueType::DOUBLE2]);
        assert_eq!(lines, vec!["dadd r9, r0, r1_neg(yw)"]);
    }

    #[test]
    fn test_mad_and_select() {
        let lines = render(OpKind::Mad, &[ValueType::FLOAT4; 3]);
        assert_eq!(lines, vec!["mad r9, r0, r1, r2"]);
        let lines = render(OpKind::Select, &[ValueType::UINT2, ValueType::FLOAT2, ValueType::FLOAT2]);
        assert_eq!(lines, vec!["cmov_logical r9.xy, r0.xy, r1.xy, r2.xy"]);
    }

    #[test]
    fn test_abs_and_negate() {
        let lines = render(OpKind::Abs, &[ValueType::INT2]);
        assert_eq!(lines, vec!["inegate r5.xy, r0.xy", "imax r9.xy, r0.xy, r5.xy"]);
        let lines = render(OpKind::Neg, &[ValueType::FLOAT]);
        assert_eq!(lines, vec!["mov r9.x, r0.x_neg(x)"]);
        let lines = render(OpKind::Abs, &[ValueType::DOUBLE]);
        assert_eq!(lines, vec!["dmax r9.xy, r0.xy, r0.xy_neg(y)"]);
        assert!(lookup(OpKind::Abs, &[ValueType::UINT]).is_err());
    }
}
