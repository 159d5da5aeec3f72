//! Type tags for the closed set of IL value types
//!
//! Every value handled by the compiler has one of eleven types: signed and
//! unsigned 32-bit integers, floats (each 1, 2 or 4 wide) and doubles
//! (1 or 2 wide). The runtime descriptor is [`ValueType`]; the typed
//! expression layer uses the zero-sized markers ([`Float4`], [`Int`], ...)
//! implementing [`IlType`] so that operand mismatches are Rust type errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar component kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Int,
    Uint,
    Float,
    Double,
}

impl ScalarKind {
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Int => "int",
            ScalarKind::Uint => "uint",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
        }
    }

    /// Number of 32-bit lanes one component occupies
    pub fn lane_width(self) -> u8 {
        match self {
            ScalarKind::Double => 2,
            _ => 1,
        }
    }

    /// Format name used in resource declarations
    pub fn format_name(self) -> &'static str {
        match self {
            ScalarKind::Int => "sint",
            ScalarKind::Uint => "uint",
            ScalarKind::Float | ScalarKind::Double => "float",
        }
    }
}

/// ISA lane-count class used for swizzle mask sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeSize {
    One = 1,
    Two = 2,
    Four = 4,
}

impl TypeSize {
    pub fn lanes(self) -> u8 {
        self as u8
    }
}

/// Runtime descriptor of a value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueType {
    pub scalar: ScalarKind,
    pub count: u8,
}

impl ValueType {
    pub const INT: ValueType = ValueType::new(ScalarKind::Int, 1);
    pub const INT2: ValueType = ValueType::new(ScalarKind::Int, 2);
    pub const INT4: ValueType = ValueType::new(ScalarKind::Int, 4);
    pub const UINT: ValueType = ValueType::new(ScalarKind::Uint, 1);
    pub const UINT2: ValueType = ValueType::new(ScalarKind::Uint, 2);
    pub const UINT4: ValueType = ValueType::new(ScalarKind::Uint, 4);
    pub const FLOAT: ValueType = ValueType::new(ScalarKind::Float, 1);
    pub const FLOAT2: ValueType = ValueType::new(ScalarKind::Float, 2);
    pub const FLOAT4: ValueType = ValueType::new(ScalarKind::Float, 4);
    pub const DOUBLE: ValueType = ValueType::new(ScalarKind::Double, 1);
    pub const DOUBLE2: ValueType = ValueType::new(ScalarKind::Double, 2);

    /// Every legal value type
    pub const ALL: [ValueType; 11] = [
        ValueType::INT,
        ValueType::INT2,
        ValueType::INT4,
        ValueType::UINT,
        ValueType::UINT2,
        ValueType::UINT4,
        ValueType::FLOAT,
        ValueType::FLOAT2,
        ValueType::FLOAT4,
        ValueType::DOUBLE,
        ValueType::DOUBLE2,
    ];

    const fn new(scalar: ScalarKind, count: u8) -> Self {
        Self { scalar, count }
    }

    /// Same component kind with another width, if that type exists
    pub fn with_count(self, count: u8) -> Option<ValueType> {
        let ty = ValueType::new(self.scalar, count);
        ValueType::ALL.contains(&ty).then_some(ty)
    }

    /// The single-component type of this type
    pub fn component(self) -> ValueType {
        ValueType::new(self.scalar, 1)
    }

    pub fn component_count(self) -> u8 {
        self.count
    }

    /// Number of 32-bit lanes the value occupies in a register
    pub fn lanes(self) -> u8 {
        self.count * self.scalar.lane_width()
    }

    pub fn type_size(self) -> TypeSize {
        match self.lanes() {
            1 => TypeSize::One,
            2 => TypeSize::Two,
            _ => TypeSize::Four,
        }
    }

    pub fn byte_size(self) -> u32 {
        self.lanes() as u32 * 4
    }

    pub fn is_integral(self) -> bool {
        matches!(self.scalar, ScalarKind::Int | ScalarKind::Uint)
    }

    pub fn is_float(self) -> bool {
        self.scalar == ScalarKind::Float
    }

    pub fn is_double(self) -> bool {
        self.scalar == ScalarKind::Double
    }

    /// Type produced by comparisons on this type
    pub fn mask_type(self) -> ValueType {
        ValueType::new(ScalarKind::Uint, self.count)
    }

    /// Parse a type name such as `float4` or `uint`
    pub fn parse(name: &str) -> Option<ValueType> {
        ValueType::ALL.iter().copied().find(|ty| ty.to_string() == name)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 1 {
            write!(f, "{}", self.scalar.name())
        } else {
            write!(f, "{}{}", self.scalar.name(), self.count)
        }
    }
}

/// Spread literal words over the four lanes of a literal register
fn pack(words: &[u32]) -> [u32; 4] {
    [0, 1, 2, 3].map(|i| words[i % words.len()])
}

/// Low and high words of a double
fn split_f64(value: f64) -> [u32; 2] {
    let bits = value.to_bits();
    [bits as u32, (bits >> 32) as u32]
}

/// Lane bits of a literal of type `ty`; `values` holds one value per
/// component, or a single value to splat
pub(crate) fn literal_words(ty: ValueType, values: &[f64]) -> [u32; 4] {
    let words: Vec<u32> = (0..ty.count as usize)
        .flat_map(|i| {
            let value = values[i % values.len()];
            match ty.scalar {
                ScalarKind::Int => vec![value as i32 as u32],
                ScalarKind::Uint => vec![value as u32],
                ScalarKind::Float => vec![(value as f32).to_bits()],
                ScalarKind::Double => split_f64(value).to_vec(),
            }
        })
        .collect();
    pack(&words)
}

/// Compile-time type tag
pub trait IlType: Copy + Default + fmt::Debug + 'static {
    const TYPE: ValueType;
    /// Result of a single-selector swizzle
    type Scalar: IlType;
    /// Result of a two-selector swizzle
    type Vec2: IlType;
    /// Result of a comparison
    type Mask: IlType;
    /// Host representation of a literal
    type Host: Copy;

    fn literal_bits(value: Self::Host) -> [u32; 4];
}

macro_rules! il_type {
    ($(#[$meta:meta])* $name:ident = $ty:expr,
     scalar = $s:ty, vec2 = $v2:ty, mask = $m:ty, host = $host:ty,
     |$v:ident| $words:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name;

        impl IlType for $name {
            const TYPE: ValueType = $ty;
            type Scalar = $s;
            type Vec2 = $v2;
            type Mask = $m;
            type Host = $host;

            fn literal_bits($v: $host) -> [u32; 4] {
                pack(&$words)
            }
        }
    };
}

il_type!(/// 32-bit signed integer
    Int = ValueType::INT, scalar = Int, vec2 = Int2, mask = Uint, host = i32, |v| [v as u32]);
il_type!(Int2 = ValueType::INT2, scalar = Int, vec2 = Int2, mask = Uint2, host = [i32; 2],
    |v| v.map(|x| x as u32));
il_type!(Int4 = ValueType::INT4, scalar = Int, vec2 = Int2, mask = Uint4, host = [i32; 4],
    |v| v.map(|x| x as u32));
il_type!(/// 32-bit unsigned integer
    Uint = ValueType::UINT, scalar = Uint, vec2 = Uint2, mask = Uint, host = u32, |v| [v]);
il_type!(Uint2 = ValueType::UINT2, scalar = Uint, vec2 = Uint2, mask = Uint2, host = [u32; 2], |v| v);
il_type!(Uint4 = ValueType::UINT4, scalar = Uint, vec2 = Uint2, mask = Uint4, host = [u32; 4], |v| v);
il_type!(/// 32-bit float
    Float = ValueType::FLOAT, scalar = Float, vec2 = Float2, mask = Uint, host = f32,
    |v| [v.to_bits()]);
il_type!(Float2 = ValueType::FLOAT2, scalar = Float, vec2 = Float2, mask = Uint2, host = [f32; 2],
    |v| v.map(f32::to_bits));
il_type!(Float4 = ValueType::FLOAT4, scalar = Float, vec2 = Float2, mask = Uint4, host = [f32; 4],
    |v| v.map(f32::to_bits));
il_type!(/// 64-bit float, two 32-bit lanes wide
    Double = ValueType::DOUBLE, scalar = Double, vec2 = Double2, mask = Uint, host = f64,
    |v| split_f64(v));
il_type!(Double2 = ValueType::DOUBLE2, scalar = Double, vec2 = Double2, mask = Uint2,
    host = [f64; 2], |v| {
        let [a, b] = v.map(split_f64);
        [a[0], a[1], b[0], b[1]]
    });

macro_rules! marker {
    ($(#[$meta:meta])* $trait:ident: $($ty:ident),+) => {
        $(#[$meta])*
        pub trait $trait: IlType {}
        $(impl $trait for $ty {})+
    };
}

marker!(/// Types with a second lane (`.y`)
    HasLane2: Int2, Int4, Uint2, Uint4, Float2, Float4, Double2);
marker!(/// Types with third and fourth lanes (`.z`, `.w`)
    HasLane4: Int4, Uint4, Float4);
marker!(/// Bitwise and shift operations
    Bitwise: Int, Int2, Int4, Uint, Uint2, Uint4);
marker!(/// Remainder
    HasMod: Int, Int2, Int4, Uint, Uint2, Uint4, Float, Float2, Float4);
marker!(/// Absolute value
    HasAbs: Int, Int2, Int4, Float, Float2, Float4, Double, Double2);
marker!(/// Logarithms, exponentials and rounding
    Transcendental: Float, Float2, Float4);
marker!(/// Square root, reciprocal and fraction
    Root: Float, Float2, Float4, Double, Double2);
marker!(/// Lane-wise select
    Selectable: Int, Int2, Int4, Uint, Uint2, Uint4, Float, Float2, Float4);
marker!(/// Index operands of memory views
    IndexType: Int, Uint);
marker!(/// Branch and loop conditions
    Condition: Int, Uint);
marker!(/// Atomic memory operations
    AtomicElement: Int, Uint);
marker!(/// Elements of sampled/loaded input resources
    InputElement: Int, Int2, Int4, Uint, Uint2, Uint4, Float, Float2, Float4);

/// Types whose four-selector swizzles exist
pub trait HasVec4: IlType {
    type Vec4: IlType;
}

macro_rules! vec4 {
    ($($ty:ident => $v4:ident),+) => {
        $(impl HasVec4 for $ty { type Vec4 = $v4; })+
    };
}

vec4!(Int => Int4, Int2 => Int4, Int4 => Int4,
      Uint => Uint4, Uint2 => Uint4, Uint4 => Uint4,
      Float => Float4, Float2 => Float4, Float4 => Float4);

/// Numeric conversion into `U`
pub trait CastTo<U: IlType>: IlType {}

/// Bit reinterpretation into `U`
pub trait BitcastTo<U: IlType>: IlType {}

macro_rules! convertible {
    ($trait:ident: $($from:ident => [$($to:ident),+]);+ $(;)?) => {
        $($(impl $trait<$to> for $from {})+)+
    };
}

convertible!(CastTo:
    Int => [Int, Uint, Float, Double];
    Uint => [Int, Uint, Float, Double];
    Float => [Int, Uint, Float, Double];
    Double => [Int, Uint, Float, Double];
    Int2 => [Int2, Uint2, Float2, Double2];
    Uint2 => [Int2, Uint2, Float2, Double2];
    Float2 => [Int2, Uint2, Float2, Double2];
    Double2 => [Int2, Uint2, Float2, Double2];
    Int4 => [Int4, Uint4, Float4];
    Uint4 => [Int4, Uint4, Float4];
    Float4 => [Int4, Uint4, Float4];
);

convertible!(BitcastTo:
    Int => [Int, Uint, Float];
    Uint => [Int, Uint, Float];
    Float => [Int, Uint, Float];
    Int2 => [Int2, Uint2, Float2, Double];
    Uint2 => [Int2, Uint2, Float2, Double];
    Float2 => [Int2, Uint2, Float2, Double];
    Double => [Int2, Uint2, Float2, Double];
    Int4 => [Int4, Uint4, Float4, Double2];
    Uint4 => [Int4, Uint4, Float4, Double2];
    Float4 => [Int4, Uint4, Float4, Double2];
    Double2 => [Int4, Uint4, Float4, Double2];
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_sizes() {
        assert_eq!(ValueType::FLOAT.type_size(), TypeSize::One);
        assert_eq!(ValueType::INT2.type_size(), TypeSize::Two);
        assert_eq!(ValueType::DOUBLE.type_size(), TypeSize::Two);
        assert_eq!(ValueType::DOUBLE2.type_size(), TypeSize::Four);
        assert_eq!(ValueType::DOUBLE2.component_count(), 2);
        assert_eq!(ValueType::UINT4.byte_size(), 16);
    }

    #[test]
    fn test_parse_and_display() {
        for ty in ValueType::ALL {
            assert_eq!(ValueType::parse(&ty.to_string()), Some(ty));
        }
        assert_eq!(ValueType::parse("double4"), None);
        assert_eq!(ValueType::FLOAT.with_count(4), Some(ValueType::FLOAT4));
        assert_eq!(ValueType::DOUBLE.with_count(4), None);
    }

    #[test]
    fn test_literal_bits() {
        assert_eq!(Float::literal_bits(1.0), [0x3F80_0000; 4]);
        assert_eq!(Int2::literal_bits([1, -1]), [1, u32::MAX, 1, u32::MAX]);
        assert_eq!(Double::literal_bits(1.0), [0, 0x3FF0_0000, 0, 0x3FF0_0000]);
        assert_eq!(Double2::literal_bits([1.0, 2.0]), [0, 0x3FF0_0000, 0, 0x4000_0000]);
    }

    #[test]
    fn test_literal_words_match_host_literals() {
        assert_eq!(literal_words(ValueType::FLOAT4, &[0.5]), Float4::literal_bits([0.5; 4]));
        assert_eq!(literal_words(ValueType::INT2, &[1.0, -1.0]), Int2::literal_bits([1, -1]));
        assert_eq!(literal_words(ValueType::DOUBLE, &[1.0]), Double::literal_bits(1.0));
        assert_eq!(literal_words(ValueType::UINT, &[7.0]), [7; 4]);
    }
}
