//! Abstract syntax tree of kernel scripts

use crate::config::{KernelConfig, Profile};
use crate::functor::OpKind;
use crate::memory::{AtomicOp, View};
use crate::swizzle::Swizzle;
use crate::types::ValueType;

/// A complete script: header settings, declarations and statements in
/// source order
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// A statement of the script
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `threads N;`
    Threads(u32),
    /// `profile compute;`
    Profile(String),
    /// `arg T name;`
    Arg { ty: String, name: String },
    /// `input1d T name slot;` / `input2d T name slot;`
    Input {
        rank: u8,
        ty: String,
        name: String,
        slot: u32,
    },
    /// `uav raw|struct|typed T name id [cached|uncached];`
    Uav {
        kind: String,
        ty: String,
        name: String,
        id: u32,
        cache: Option<String>,
    },
    /// `lds T name id count;`
    Lds {
        ty: String,
        name: String,
        id: u32,
        count: u32,
    },
    /// `global T name;`
    Global { ty: String, name: String },
    /// `indexed T name len;`
    Indexed { ty: String, name: String, len: u32 },
    /// `var T name [= expr];`
    Var {
        ty: String,
        name: String,
        init: Option<Expr>,
    },
    /// `name[.lanes] = expr;`
    Assign {
        name: String,
        lanes: Option<String>,
        value: Expr,
    },
    /// `view[index] = expr;`
    Store { view: String, index: Expr, value: Expr },
    If {
        cond: Expr,
        then: Vec<Statement>,
        otherwise: Option<Vec<Statement>>,
    },
    While { cond: Expr, body: Vec<Statement> },
    Break,
    Continue,
    Barrier,
    Fence,
    /// `atomic_op(view, index, operands...);`
    Atomic {
        op: String,
        view: String,
        index: Expr,
        operands: Vec<Expr>,
    },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
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
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Expression types
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Uint(u32),
    Float(f64),
    Double(f64),

    /// Variable, argument, view or builtin reference
    Ident(String),

    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Function call, type constructor or cast: `mad(a, b, c)`, `float4(0.0)`
    Call { name: String, args: Vec<Expr> },

    /// Lane selection: `acc.xy`
    Swizzle { base: Box<Expr>, lanes: String },

    /// Memory read: `points[coord]`
    Index { view: String, index: Box<Expr> },
}

impl Expr {
    /// Literal value, if this is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Int(_) | Expr::Uint(_) | Expr::Float(_) | Expr::Double(_))
    }
}

/// Script after name resolution and type inference
#[derive(Debug, Clone, PartialEq)]
pub struct TypedProgram {
    pub threads: Option<u32>,
    pub profile: Option<Profile>,
    pub statements: Vec<TypedStatement>,
}

impl TypedProgram {
    /// `config` with the script's header settings applied
    pub fn apply_header(&self, mut config: KernelConfig) -> KernelConfig {
        if let Some(threads) = self.threads {
            config.threads_per_group = threads;
        }
        if let Some(profile) = self.profile {
            config.profile = profile;
        }
        config
    }
}

/// A resolved declaration
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Arg { name: String, ty: ValueType },
    /// A memory view; `len` is the element count of local data stores and
    /// indexed register arrays
    View { name: String, view: View, len: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedStatement {
    Declare(Declaration),
    Var {
        name: String,
        ty: ValueType,
        init: Option<TypedValue>,
    },
    Assign {
        name: String,
        var_ty: ValueType,
        lanes: Option<Swizzle>,
        value: TypedValue,
    },
    Store {
        view: String,
        index: TypedExpr,
        value: TypedExpr,
    },
    If {
        cond: TypedExpr,
        then: Vec<TypedStatement>,
        otherwise: Option<Vec<TypedStatement>>,
    },
    While {
        cond: TypedExpr,
        body: Vec<TypedStatement>,
    },
    Break,
    Continue,
    Barrier,
    Fence,
    Atomic(TypedAtomic),
}

/// An atomic read-modify-write
#[derive(Debug, Clone, PartialEq)]
pub struct TypedAtomic {
    pub view: String,
    pub element: ValueType,
    pub op: AtomicOp,
    pub index: TypedExpr,
    pub operands: Vec<TypedExpr>,
}

/// Right-hand side of an assignment or initializer
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Expr(TypedExpr),
    /// Previous value returned by an atomic, `fetch_add(view, i, x)`
    Fetch(TypedAtomic),
}

/// Typed expression
#[derive(Debug, Clone, PartialEq)]
pub struct TypedExpr {
    pub kind: TypedExprKind,
    pub ty: ValueType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedExprKind {
    Literal([u32; 4]),
    Variable(String),
    Argument(String),
    /// System value register such as `vAbsTidFlat`
    Builtin(&'static str),
    Op { op: OpKind, args: Vec<TypedExpr> },
    Swizzle { base: Box<TypedExpr>, swizzle: Swizzle },
    Load { view: String, index: Box<TypedExpr> },
}
