//! Comparisons
//!
//! Results are all-ones/all-zeros masks of the unsigned type with the
//! operand's component count. `gt` and `le` are `lt` and `ge` with swapped
//! operands. Doubles compare one component at a time through scratch
//! registers, since the double compare opcodes write a single lane.

use super::{EmitContext, FunctorTable, OpKind, Template};
use crate::operand::{Dest, Instruction, Operand};
use crate::types::{ScalarKind, ValueType};

pub(super) fn register(table: &mut FunctorTable) {
    for ty in ValueType::ALL {
        let [eq, ne, lt, ge] = match ty.scalar {
            ScalarKind::Int => ["ieq", "ine", "ilt", "ige"],
            ScalarKind::Uint => ["ieq", "ine", "ult", "uge"],
            ScalarKind::Float => ["eq", "ne", "lt", "ge"],
            ScalarKind::Double => ["deq", "dne", "dlt", "dge"],
        };
        let cases = [
            (OpKind::Eq, eq, false),
            (OpKind::Ne, ne, false),
            (OpKind::Lt, lt, false),
            (OpKind::Ge, ge, false),
            (OpKind::Gt, lt, true),
            (OpKind::Le, ge, true),
        ];
        let mask = ty.mask_type();
        for (op, opcode, swap) in cases {
            if ty.is_double() {
                let template = Template::DoubleCompare { opcode, swap };
                table.insert(op, &[ty, ty], mask, ty.component_count() as u32, template);
            } else if swap {
                table.insert(op, &[ty, ty], mask, 0, Template::Swapped(opcode));
            } else {
                table.insert(op, &[ty, ty], mask, 0, Template::Direct(opcode));
            }
        }
    }
}

pub(super) fn emit_double_compare(ctx: &mut EmitContext<'_>, opcode: &str, swap: bool) {
    let ty = ctx.src_types[0];
    for k in 0..ty.component_count() {
        let scratch = ctx.scratch(k as u32);
        let mut lhs = ctx.srcs[0].component(ty, k);
        let mut rhs = ctx.srcs[1].component(ty, k);
        if swap {
            std::mem::swap(&mut lhs, &mut rhs);
        }
        let inst = Instruction::new(opcode)
            .arg(Dest::register(scratch, ValueType::UINT))
            .arg(lhs)
            .arg(rhs);
        ctx.emit(inst);
        let inst = Instruction::new("mov")
            .arg(Dest::component(ctx.dst, ctx.result, k))
            .arg(Operand::register(scratch, ValueType::UINT));
        ctx.emit(inst);
    }
}

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::source::LiteralPool;

    fn render(op: OpKind, ty: ValueType) -> Vec<String> {
        let types = [ty, ty];
        let entry = lookup(op, &types).unwrap();
        let srcs = [Operand::register(Reg(0), ty), Operand::register(Reg(1), ty)];
        let mut pool = LiteralPool::new(4);
        let mut ctx = EmitContext::new(Reg(7), entry.result, &srcs, &types, Reg(2), &mut pool);
        entry.template.emit(&mut ctx).unwrap();
        ctx.finish().iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_swapped_comparisons() {
        assert_eq!(render(OpKind::Gt, ValueType::FLOAT4), vec!["lt r7, r1, r0"]);
        assert_eq!(render(OpKind::Le, ValueType::UINT), vec!["uge r7.x, r1.x, r0.x"]);
        assert_eq!(render(OpKind::Lt, ValueType::INT2), vec!["ilt r7.xy, r0.xy, r1.xy"]);
    }

    #[test]
    fn test_double_compare_per_component() {
        let lines = render(OpKind::Lt, ValueType::DOUBLE2);
        assert_eq!(
            lines,
            vec![
                "dlt r2.x, r0.xy, r1.xy",
                "mov r7.x, r2.x",
                "dlt r3.x, r0.zw, r1.zw",
                "mov r7._y__, r3.x",
            ]
        );
        let lines = render(OpKind::Gt, ValueType::DOUBLE);
        assert_eq!(lines, vec!["dlt r2.x, r1.xy, r0.xy", "mov r7.x, r2.x"]);
    }

    #[test]
    fn test_mask_result_types() {
        for ty in ValueType::ALL {
            let entry = lookup(OpKind::Eq, &[ty, ty]).unwrap();
            assert_eq!(entry.result, ty.mask_type());
        }
    }
}
