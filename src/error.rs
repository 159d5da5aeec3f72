//! Error types for the IL expression compiler

use thiserror::Error;

/// Result type for compilation operations
pub type CompileResult<T> = Result<T, CompileError>;

/// Compilation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("Lexer error at position {position}: {message}")]
    LexerError { position: usize, message: String },

    #[error("Parser error: {message}")]
    ParseError { message: String },

    #[error("Type error: {message}")]
    TypeError { message: String },

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("No `{op}` specialization for ({operands})")]
    NoSpecialization { op: String, operands: String },

    #[error("Invalid swizzle .{swizzle} on {ty}")]
    InvalidSwizzle { swizzle: String, ty: String },

    #[error("Not assignable: {message}")]
    NotAssignable { message: String },

    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Duplicate declaration: {name}")]
    DuplicateDeclaration { name: String },

    #[error("Register limit of {limit} exceeded")]
    RegisterOverflow { limit: u32 },

    #[error("Literal pool limit of {limit} exceeded")]
    LiteralOverflow { limit: u32 },

    #[error("Structural error: {message}")]
    Structure { message: String },

    #[error("Argument binding error: {message}")]
    Binding { message: String },

    #[error("Code generation error: {message}")]
    CodeGenError { message: String },
}

impl CompileError {
    pub fn parse_error(msg: impl Into<String>) -> Self {
        CompileError::ParseError { message: msg.into() }
    }

    pub fn type_error(msg: impl Into<String>) -> Self {
        CompileError::TypeError { message: msg.into() }
    }

    pub fn mismatch(expected: impl ToString, got: impl ToString) -> Self {
        CompileError::TypeMismatch {
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }

    pub fn no_specialization(op: impl ToString, operands: impl Into<String>) -> Self {
        CompileError::NoSpecialization {
            op: op.to_string(),
            operands: operands.into(),
        }
    }

    pub fn invalid_swizzle(swizzle: impl Into<String>, ty: impl ToString) -> Self {
        CompileError::InvalidSwizzle {
            swizzle: swizzle.into(),
            ty: ty.to_string(),
        }
    }

    pub fn not_assignable(msg: impl Into<String>) -> Self {
        CompileError::NotAssignable { message: msg.into() }
    }

    pub fn undefined(name: impl Into<String>) -> Self {
        CompileError::UndefinedVariable { name: name.into() }
    }

    pub fn duplicate(name: impl Into<String>) -> Self {
        CompileError::DuplicateDeclaration { name: name.into() }
    }

    pub fn structure(msg: impl Into<String>) -> Self {
        CompileError::Structure { message: msg.into() }
    }

    pub fn binding(msg: impl Into<String>) -> Self {
        CompileError::Binding { message: msg.into() }
    }

    pub fn codegen(msg: impl Into<String>) -> Self {
        CompileError::CodeGenError { message: msg.into() }
    }
}
