//! Typed swizzle methods
//!
//! One method per selector string. A method exists only on types wide
//! enough for every lane it names, and three- and four-selector swizzles
//! only on types with a 4-wide counterpart, so `.z()` on a 2-wide value or
//! `.xyzw()` on a double does not compile.

use super::Expr;
use crate::swizzle::Lane;
use crate::types::{HasLane2, HasLane4, HasVec4, IlType};

macro_rules! swizzles {
    ([$($bound:tt)+] => $out:ty { $($name:ident = [$($lane:ident),+];)+ }) => {
        impl<T: $($bound)+> Expr<T> {
            $(
                pub fn $name(self) -> Expr<$out> {
                    self.swizzle_lanes(&[$(Lane::$lane),+])
                }
            )+
        }
    };
}

swizzles!([IlType] => T::Scalar {
    x = [X];
});

swizzles!([IlType] => T::Vec2 {
    xx = [X, X];
});

swizzles!([HasVec4] => <T as HasVec4>::Vec4 {
    xxx = [X, X, X];
    xxxx = [X, X, X, X];
});

swizzles!([HasLane2] => T::Scalar {
    y = [Y];
});

swizzles!([HasLane2] => T::Vec2 {
    xy = [X, Y];
    yx = [Y, X];
    yy = [Y, Y];
});

swizzles!([HasLane2 + HasVec4] => <T as HasVec4>::Vec4 {
    xxy = [X, X, Y];
    xyx = [X, Y, X];
    xyy = [X, Y, Y];
    yxx = [Y, X, X];
    yxy = [Y, X, Y];
    yyx = [Y, Y, X];
    yyy = [Y, Y, Y];
    xxxy = [X, X, X, Y];
    xxyx = [X, X, Y, X];
    xxyy = [X, X, Y, Y];
    xyxx = [X, Y, X, X];
    xyxy = [X, Y, X, Y];
    xyyx = [X, Y, Y, X];
    xyyy = [X, Y, Y, Y];
    yxxx = [Y, X, X, X];
    yxxy = [Y, X, X, Y];
    yxyx = [Y, X, Y, X];
    yxyy = [Y, X, Y, Y];
    yyxx = [Y, Y, X, X];
    yyxy = [Y, Y, X, Y];
    yyyx = [Y, Y, Y, X];
    yyyy = [Y, Y, Y, Y];
});

swizzles!([HasLane4] => T::Scalar {
    z = [Z];
    w = [W];
});

swizzles!([HasLane4] => T::Vec2 {
    xz = [X, Z];
    xw = [X, W];
    yz = [Y, Z];
    yw = [Y, W];
    zx = [Z, X];
    zy = [Z, Y];
    zz = [Z, Z];
    zw = [Z, W];
    wx = [W, X];
    wy = [W, Y];
    wz = [W, Z];
    ww = [W, W];
});

swizzles!([HasLane4 + HasVec4] => <T as HasVec4>::Vec4 {
    xxz = [X, X, Z];
    xxw = [X, X, W];
    xyz = [X, Y, Z];
    xyw = [X, Y, W];
    xzx = [X, Z, X];
    xzy = [X, Z, Y];
    xzz = [X, Z, Z];
    xzw = [X, Z, W];
    xwx = [X, W, X];
    xwy = [X, W, Y];
    xwz = [X, W, Z];
    xww = [X, W, W];
    yxz = [Y, X, Z];
    yxw = [Y, X, W];
    yyz = [Y, Y, Z];
    yyw = [Y, Y, W];
    yzx = [Y, Z, X];
    yzy = [Y, Z, Y];
    yzz = [Y, Z, Z];
    yzw = [Y, Z, W];
    ywx = [Y, W, X];
    ywy = [Y, W, Y];
    ywz = [Y, W, Z];
    yww = [Y, W, W];
    zxx = [Z, X, X];
    zxy = [Z, X, Y];
    zxz = [Z, X, Z];
    zxw = [Z, X, W];
    zyx = [Z, Y, X];
    zyy = [Z, Y, Y];
    zyz = [Z, Y, Z];
    zyw = [Z, Y, W];
    zzx = [Z, Z, X];
    zzy = [Z, Z, Y];
    zzz = [Z, Z, Z];
    zzw = [Z, Z, W];
    zwx = [Z, W, X];
    zwy = [Z, W, Y];
    zwz = [Z, W, Z];
    zww = [Z, W, W];
    wxx = [W, X, X];
    wxy = [W, X, Y];
    wxz = [W, X, Z];
    wxw = [W, X, W];
    wyx = [W, Y, X];
    wyy = [W, Y, Y];
    wyz = [W, Y, Z];
    wyw = [W, Y, W];
    wzx = [W, Z, X];
    wzy = [W, Z, Y];
    wzz = [W, Z, Z];
    wzw = [W, Z, W];
    wwx = [W, W, X];
    wwy = [W, W, Y];
    wwz = [W, W, Z];
    www = [W, W, W];
    xxxz = [X, X, X, Z];
    xxxw = [X, X, X, W];
    xxyz = [X, X, Y, Z];
    xxyw = [X, X, Y, W];
    xxzx = [X, X, Z, X];
    xxzy = [X, X, Z, Y];
    xxzz = [X, X, Z, Z];
    xxzw = [X, X, Z, W];
    xxwx = [X, X, W, X];
    xxwy = [X, X, W, Y];
    xxwz = [X, X, W, Z];
    xxww = [X, X, W, W];
    xyxz = [X, Y, X, Z];
    xyxw = [X, Y, X, W];
    xyyz = [X, Y, Y, Z];
    xyyw = [X, Y, Y, W];
    xyzx = [X, Y, Z, X];
    xyzy = [X, Y, Z, Y];
    xyzz = [X, Y, Z, Z];
    xyzw = [X, Y, Z, W];
    xywx = [X, Y, W, X];
    xywy = [X, Y, W, Y];
    xywz = [X, Y, W, Z];
    xyww = [X, Y, W, W];
    xzxx = [X, Z, X, X];
    xzxy = [X, Z, X, Y];
    xzxz = [X, Z, X, Z];
    xzxw = [X, Z, X, W];
    xzyx = [X, Z, Y, X];
    xzyy = [X, Z, Y, Y];
    xzyz = [X, Z, Y, Z];
    xzyw = [X, Z, Y, W];
    xzzx = [X, Z, Z, X];
    xzzy = [X, Z, Z, Y];
    xzzz = [X, Z, Z, Z];
    xzzw = [X, Z, Z, W];
    xzwx = [X, Z, W, X];
    xzwy = [X, Z, W, Y];
    xzwz = [X, Z, W, Z];
    xzww = [X, Z, W, W];
    xwxx = [X, W, X, X];
    xwxy = [X, W, X, Y];
    xwxz = [X, W, X, Z];
    xwxw = [X, W, X, W];
    xwyx = [X, W, Y, X];
    xwyy = [X, W, Y, Y];
    xwyz = [X, W, Y, Z];
    xwyw = [X, W, Y, W];
    xwzx = [X, W, Z, X];
    xwzy = [X, W, Z, Y];
    xwzz = [X, W, Z, Z];
    xwzw = [X, W, Z, W];
    xwwx = [X, W, W, X];
    xwwy = [X, W, W, Y];
    xwwz = [X, W, W, Z];
    xwww = [X, W, W, W];
    yxxz = [Y, X, X, Z];
    yxxw = [Y, X, X, W];
    yxyz = [Y, X, Y, Z];
    yxyw = [Y, X, Y, W];
    yxzx = [Y, X, Z, X];
    yxzy = [Y, X, Z, Y];
    yxzz = [Y, X, Z, Z];
    yxzw = [Y, X, Z, W];
    yxwx = [Y, X, W, X];
    yxwy = [Y, X, W, Y];
    yxwz = [Y, X, W, Z];
    yxww = [Y, X, W, W];
    yyxz = [Y, Y, X, Z];
    yyxw = [Y, Y, X, W];
    yyyz = [Y, Y, Y, Z];
    yyyw = [Y, Y, Y, W];
    yyzx = [Y, Y, Z, X];
    yyzy = [Y, Y, Z, Y];
    yyzz = [Y, Y, Z, Z];
    yyzw = [Y, Y, Z, W];
    yywx = [Y, Y, W, X];
    yywy = [Y, Y, W, Y];
    yywz = [Y, Y, W, Z];
    yyww = [Y, Y, W, W];
    yzxx = [Y, Z, X, X];
    yzxy = [Y, Z, X, Y];
    yzxz = [Y, Z, X, Z];
    yzxw = [Y, Z, X, W];
    yzyx = [Y, Z, Y, X];
    yzyy = [Y, Z, Y, Y];
    yzyz = [Y, Z, Y, Z];
    yzyw = [Y, Z, Y, W];
    yzzx = [Y, Z, Z, X];
    yzzy = [Y, Z, Z, Y];
    yzzz = [Y, Z, Z, Z];
    yzzw = [Y, Z, Z, W];
    yzwx = [Y, Z, W, X];
    yzwy = [Y, Z, W, Y];
    yzwz = [Y, Z, W, Z];
    yzww = [Y, Z, W, W];
    ywxx = [Y, W, X, X];
    ywxy = [Y, W, X, Y];
    ywxz = [Y, W, X, Z];
    ywxw = [Y, W, X, W];
    ywyx = [Y, W, Y, X];
    ywyy = [Y, W, Y, Y];
    ywyz = [Y, W, Y, Z];
    ywyw = [Y, W, Y, W];
    ywzx = [Y, W, Z, X];
    ywzy = [Y, W, Z, Y];
    ywzz = [Y, W, Z, Z];
    ywzw = [Y, W, Z, W];
    ywwx = [Y, W, W, X];
    ywwy = [Y, W, W, Y];
    ywwz = [Y, W, W, Z];
    ywww = [Y, W, W, W];
    zxxx = [Z, X, X, X];
    zxxy = [Z, X, X, Y];
    zxxz = [Z, X, X, Z];
    zxxw = [Z, X, X, W];
    zxyx = [Z, X, Y, X];
    zxyy = [Z, X, Y, Y];
    zxyz = [Z, X, Y, Z];
    zxyw = [Z, X, Y, W];
    zxzx = [Z, X, Z, X];
    zxzy = [Z, X, Z, Y];
    zxzz = [Z, X, Z, Z];
    zxzw = [Z, X, Z, W];
    zxwx = [Z, X, W, X];
    zxwy = [Z, X, W, Y];
    zxwz = [Z, X, W, Z];
    zxww = [Z, X, W, W];
    zyxx = [Z, Y, X, X];
    zyxy = [Z, Y, X, Y];
    zyxz = [Z, Y, X, Z];
    zyxw = [Z, Y, X, W];
    zyyx = [Z, Y, Y, X];
    zyyy = [Z, Y, Y, Y];
    zyyz = [Z, Y, Y, Z];
    zyyw = [Z, Y, Y, W];
    zyzx = [Z, Y, Z, X];
    zyzy = [Z, Y, Z, Y];
    zyzz = [Z, Y, Z, Z];
    zyzw = [Z, Y, Z, W];
    zywx = [Z, Y, W, X];
    zywy = [Z, Y, W, Y];
    zywz = [Z, Y, W, Z];
    zyww = [Z, Y, W, W];
    zzxx = [Z, Z, X, X];
    zzxy = [Z, Z, X, Y];
    zzxz = [Z, Z, X, Z];
    zzxw = [Z, Z, X, W];
    zzyx = [Z, Z, Y, X];
    zzyy = [Z, Z, Y, Y];
    zzyz = [Z, Z, Y, Z];
    zzyw = [Z, Z, Y, W];
    zzzx = [Z, Z, Z, X];
    zzzy = [Z, Z, Z, Y];
    zzzz = [Z, Z, Z, Z];
    zzzw = [Z, Z, Z, W];
    zzwx = [Z, Z, W, X];
    zzwy = [Z, Z, W, Y];
    zzwz = [Z, Z, W, Z];
    zzww = [Z, Z, W, W];
    zwxx = [Z, W, X, X];
    zwxy = [Z, W, X, Y];
    zwxz = [Z, W, X, Z];
    zwxw = [Z, W, X, W];
    zwyx = [Z, W, Y, X];
    zwyy = [Z, W, Y, Y];
    zwyz = [Z, W, Y, Z];
    zwyw = [Z, W, Y, W];
    zwzx = [Z, W, Z, X];
    zwzy = [Z, W, Z, Y];
    zwzz = [Z, W, Z, Z];
    zwzw = [Z, W, Z, W];
    zwwx = [Z, W, W, X];
    zwwy = [Z, W, W, Y];
    zwwz = [Z, W, W, Z];
    zwww = [Z, W, W, W];
    wxxx = [W, X, X, X];
    wxxy = [W, X, X, Y];
    wxxz = [W, X, X, Z];
    wxxw = [W, X, X, W];
    wxyx = [W, X, Y, X];
    wxyy = [W, X, Y, Y];
    wxyz = [W, X, Y, Z];
    wxyw = [W, X, Y, W];
    wxzx = [W, X, Z, X];
    wxzy = [W, X, Z, Y];
    wxzz = [W, X, Z, Z];
    wxzw = [W, X, Z, W];
    wxwx = [W, X, W, X];
    wxwy = [W, X, W, Y];
    wxwz = [W, X, W, Z];
    wxww = [W, X, W, W];
    wyxx = [W, Y, X, X];
    wyxy = [W, Y, X, Y];
    wyxz = [W, Y, X, Z];
    wyxw = [W, Y, X, W];
    wyyx = [W, Y, Y, X];
    wyyy = [W, Y, Y, Y];
    wyyz = [W, Y, Y, Z];
    wyyw = [W, Y, Y, W];
    wyzx = [W, Y, Z, X];
    wyzy = [W, Y, Z, Y];
    wyzz = [W, Y, Z, Z];
    wyzw = [W, Y, Z, W];
    wywx = [W, Y, W, X];
    wywy = [W, Y, W, Y];
    wywz = [W, Y, W, Z];
    wyww = [W, Y, W, W];
    wzxx = [W, Z, X, X];
    wzxy = [W, Z, X, Y];
    wzxz = [W, Z, X, Z];
    wzxw = [W, Z, X, W];
    wzyx = [W, Z, Y, X];
    wzyy = [W, Z, Y, Y];
    wzyz = [W, Z, Y, Z];
    wzyw = [W, Z, Y, W];
    wzzx = [W, Z, Z, X];
    wzzy = [W, Z, Z, Y];
    wzzz = [W, Z, Z, Z];
    wzzw = [W, Z, Z, W];
    wzwx = [W, Z, W, X];
    wzwy = [W, Z, W, Y];
    wzwz = [W, Z, W, Z];
    wzww = [W, Z, W, W];
    wwxx = [W, W, X, X];
    wwxy = [W, W, X, Y];
    wwxz = [W, W, X, Z];
    wwxw = [W, W, X, W];
    wwyx = [W, W, Y, X];
    wwyy = [W, W, Y, Y];
    wwyz = [W, W, Y, Z];
    wwyw = [W, W, Y, W];
    wwzx = [W, W, Z, X];
    wwzy = [W, W, Z, Y];
    wwzz = [W, W, Z, Z];
    wwzw = [W, W, Z, W];
    wwwx = [W, W, W, X];
    wwwy = [W, W, W, Y];
    wwwz = [W, W, W, Z];
    wwww = [W, W, W, W];
});
