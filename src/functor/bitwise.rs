//! Bitwise logic and shifts on integer types

use super::{FunctorTable, OpKind, Template};
use crate::types::{ScalarKind, ValueType};

pub(super) fn register(table: &mut FunctorTable) {
    for ty in ValueType::ALL.into_iter().filter(|ty| ty.is_integral()) {
        let pair = [ty, ty];
        table.insert(OpKind::And, &pair, ty, 0, Template::Direct("iand"));
        table.insert(OpKind::Or, &pair, ty, 0, Template::Direct("ior"));
        table.insert(OpKind::Xor, &pair, ty, 0, Template::Direct("ixor"));
        table.insert(OpKind::Shl, &pair, ty, 0, Template::Direct("ishl"));
        let shr = if ty.scalar == ScalarKind::Int { "ishr" } else { "ushr" };
        table.insert(OpKind::Shr, &pair, ty, 0, Template::Direct(shr));
        table.insert(OpKind::Not, &[ty], ty, 0, Template::Direct("inot"));
    }
}

#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_shift_right_signedness() {
        let int = lookup(OpKind::Shr, &[ValueType::INT2, ValueType::INT2]).unwrap();
        assert_eq!(int.template, Template::Direct("ishr"));
        let uint = lookup(OpKind::Shr, &[ValueType::UINT, ValueType::UINT]).unwrap();
        assert_eq!(uint.template, Template::Direct("ushr"));
    }

    #[test]
    fn test_no_bitwise_on_floats() {
        assert!(lookup(OpKind::Xor, &[ValueType::FLOAT4, ValueType::FLOAT4]).is_err());
        assert!(lookup(OpKind::Not, &[ValueType::DOUBLE]).is_err());
    }
}
