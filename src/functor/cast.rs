//! Numeric conversions and bit reinterpretation

use super::{FunctorTable, OpKind, Template};
use crate::types::{ScalarKind, ValueType};

/// Conversion opcode between two kinds with the same component count
fn conversion(from: ScalarKind, to: ScalarKind) -> Template {
    use ScalarKind::*;
    match (from, to) {
        (a, b) if a == b => Template::Move,
        (Int, Uint) | (Uint, Int) => Template::Move,
        (Int, Float) => Template::Direct("itof"),
        (Uint, Float) => Template::Direct("utof"),
        (Float, Int) => Template::Direct("ftoi"),
        (Float, Uint) => Template::Direct("ftou"),
        (Float, Double) => Template::Unrolled("f2d"),
        (Double, Float) => Template::Unrolled("d2f"),
        (Int, Double) => Template::Unrolled("i2d"),
        (Uint, Double) => Template::Unrolled("u2d"),
        (Double, Int) => Template::Unrolled("d2i"),
        (Double, Uint) => Template::Unrolled("d2u"),
        _ => Template::Move,
    }
}

pub(super) fn register(table: &mut FunctorTable) {
    for from in ValueType::ALL {
        for to in ValueType::ALL {
            if from.count == to.count {
                let template = conversion(from.scalar, to.scalar);
                let regs = match template {
                    Template::Unrolled(_) => u32::from(from.count > 1),
                    _ => 0,
                };
                table.insert(OpKind::Cast(to), &[from], to, regs, template);
            }
            if from.lanes() == to.lanes() {
                table.insert(OpKind::Bitcast(to), &[from], to, 0, Template::Move);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::source::LiteralPool;

    fn render(op: OpKind, from: ValueType) -> Vec<String> {
        let types = [from];
        let entry = lookup(op, &types).unwrap();
        let srcs = [Operand::register(Reg(0), from)];
        let mut pool = LiteralPool::new(4);
        let mut ctx = EmitContext::new(Reg(3), entry.result, &srcs, &types, Reg(1), &mut pool);
        entry.template.emit(&mut ctx).unwrap();
        ctx.finish().iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_numeric_casts() {
        assert_eq!(render(OpKind::Cast(ValueType::FLOAT4), ValueType::INT4), vec!["itof r3, r0"]);
        assert_eq!(render(OpKind::Cast(ValueType::UINT), ValueType::INT), vec!["mov r3.x, r0.x"]);
        assert_eq!(
            render(OpKind::Cast(ValueType::DOUBLE2), ValueType::FLOAT2),
            vec!["f2d r1.xy, r0.x", "f2d r1.__zw, r0.y", "mov r3, r1"]
        );
    }

    #[test]
    fn test_bitcast_is_a_move() {
        assert_eq!(render(OpKind::Bitcast(ValueType::DOUBLE), ValueType::UINT2), vec!["mov r3.xy, r0.xy"]);
        assert!(lookup(OpKind::Bitcast(ValueType::DOUBLE), &[ValueType::FLOAT]).is_err());
        assert!(lookup(OpKind::Cast(ValueType::FLOAT4), &[ValueType::FLOAT2]).is_err());
    }
}
