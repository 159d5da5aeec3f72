//! Intrinsic functions over typed expressions
//!
//! Every operand must have the same type as the first; there is no implicit
//! promotion, so `min(float, int)` does not compile.

use crate::expr::{Expr, IntoExpr};
use crate::functor::OpKind;
use crate::types::{BitcastTo, CastTo, HasAbs, IlType, Root, Selectable, Transcendental};

/// `a * b + c`
pub fn mad<A, B, C>(a: A, b: B, c: C) -> Expr<A::Ty>
where
    A: IntoExpr,
    B: IntoExpr<Ty = A::Ty>,
    C: IntoExpr<Ty = A::Ty>,
{
    Expr::<A::Ty>::apply(OpKind::Mad, vec![a.into_node(), b.into_node(), c.into_node()])
}

pub fn min<A, B>(a: A, b: B) -> Expr<A::Ty>
where
    A: IntoExpr,
    B: IntoExpr<Ty = A::Ty>,
{
    Expr::<A::Ty>::apply(OpKind::Min, vec![a.into_node(), b.into_node()])
}

pub fn max<A, B>(a: A, b: B) -> Expr<A::Ty>
where
    A: IntoExpr,
    B: IntoExpr<Ty = A::Ty>,
{
    Expr::<A::Ty>::apply(OpKind::Max, vec![a.into_node(), b.into_node()])
}

/// Lane-wise `mask ? a : b`, with the mask produced by a comparison
pub fn select<M, A, B>(mask: M, a: A, b: B) -> Expr<A::Ty>
where
    A: IntoExpr,
    A::Ty: Selectable,
    M: IntoExpr<Ty = <A::Ty as IlType>::Mask>,
    B: IntoExpr<Ty = A::Ty>,
{
    Expr::<A::Ty>::apply(OpKind::Select, vec![mask.into_node(), a.into_node(), b.into_node()])
}

macro_rules! unary_functions {
    ($($(#[$meta:meta])* $name:ident => $op:ident where $bound:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name<A>(a: A) -> Expr<A::Ty>
            where
                A: IntoExpr,
                A::Ty: $bound,
            {
                Expr::<A::Ty>::apply(OpKind::$op, vec![a.into_node()])
            }
        )+
    };
}

unary_functions!(
    sqrt => Sqrt where Root,
    /// Reciprocal square root
    rsqrt => Rsqrt where Root,
    rcp => Rcp where Root,
    frac => Frac where Root,
    /// Natural logarithm
    log => Log where Transcendental,
    log2 => Log2 where Transcendental,
    /// Natural exponential
    exp => Exp where Transcendental,
    exp2 => Exp2 where Transcendental,
    floor => Floor where Transcendental,
    /// Round to nearest
    round => Round where Transcendental,
    abs => Abs where HasAbs,
);

/// Numeric conversion of `a` to `U`
pub fn cast<U, A>(a: A) -> Expr<U>
where
    U: IlType,
    A: IntoExpr,
    A::Ty: CastTo<U>,
{
    a.into_expr().cast::<U>()
}

/// Reinterpret the bits of `a` as `U`
pub fn bitcast<U, A>(a: A) -> Expr<U>
where
    U: IlType,
    A: IntoExpr,
    A::Ty: BitcastTo<U>,
{
    a.into_expr().bitcast::<U>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::kernel::Kernel;
    use crate::types::{Double, Float, Float2, Int, Uint};
    use pretty_assertions::assert_eq;

    fn body(k: Kernel) -> Vec<String> {
        k.end()
            .unwrap()
            .lines
            .into_iter()
            .filter(|l| !l.starts_with("il_") && !l.starts_with("dcl_") && l != "end")
            .collect()
    }

    #[test]
    fn test_mad_and_select() {
        let mut k = Kernel::begin(KernelConfig::default());
        let a = k.var::<Float2>().unwrap();
        let out = k.var::<Float2>().unwrap();
        k.assign(out, select(a.cmp_lt([0.0f32; 2]), -a, mad(a, a, a))).unwrap();
        assert_eq!(
            body(k),
            vec![
                "lt r2.xy, r0.xy, l0.xy",
                "mov r3.xy, r0.xy_neg(xy)",
                "mad r4.xy, r0.xy, r0.xy, r0.xy",
                "cmov_logical r5.xy, r2.xy, r3.xy, r4.xy",
                "mov r1.xy, r5.xy",
            ]
        );
    }

    #[test]
    fn test_casts() {
        let mut k = Kernel::begin(KernelConfig::default());
        let i = k.var::<Int>().unwrap();
        let f = k.var::<Float>().unwrap();
        k.assign(f, cast::<Float, _>(i)).unwrap();
        let u = k.var::<Uint>().unwrap();
        k.assign(u, bitcast::<Uint, _>(f)).unwrap();
        let d = k.var::<Double>().unwrap();
        k.assign(d, cast::<Double, _>(f)).unwrap();
        let lines = body(k);
        assert_eq!(lines[0], "itof r2.x, r0.x");
        assert_eq!(lines[1], "mov r1.x, r2.x");
        assert_eq!(lines[2], "mov r4.x, r1.x");
        assert!(lines.iter().any(|l| l.starts_with("f2d ")));
    }

    #[test]
    fn test_log_is_scaled() {
        let mut k = Kernel::begin(KernelConfig::default());
        let x = k.var::<Float>().unwrap();
        k.assign(x, log(x)).unwrap();
        let lines = body(k);
        assert!(lines[0].starts_with("log "));
        assert!(lines[1].starts_with("mul "));
    }
}
