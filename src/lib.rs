//! Expression-template compiler for AMD-style GPU intermediate language
//!
//! Kernels are built by ordinary Rust code: typed variables, arithmetic on
//! expression values, memory views and closure-bodied control flow. Every
//! statement emits IL text immediately into a kernel session, and
//! [`Kernel::end`] assembles the declarations, main body and function
//! bodies into an [`IlProgram`].
//!
//! # Example
//!
//! ```rust
//! use expr_to_il::*;
//!
//! let mut k = Kernel::begin(KernelConfig::new(64));
//! let scale = k.arg::<Float>("scale")?;
//! let out = k.uav_raw::<Float>(0, CacheMode::Auto)?;
//! let acc = k.var_init(0.0f32)?;
//! k.repeat(4i32, |k, _| k.assign(acc, mad(acc, scale, 1.0f32)))?;
//! out.store(&mut k, abs_thread_id_flat(), acc)?;
//! let program = k.end()?;
//! assert_eq!(program.count_opcode("mad"), 1);
//! # Ok::<(), CompileError>(())
//! ```
//!
//! Kernels can also be written as text scripts and compiled with
//! [`compile`]:
//!
//! ```rust
//! use expr_to_il::{compile, KernelConfig};
//!
//! let program = compile(
//!     "arg float scale; uav raw float out 0; out[tid_flat] = scale * 2.0;",
//!     &KernelConfig::default(),
//! )?;
//! assert_eq!(program.count_opcode("uav_raw_store_id(0)"), 1);
//! # Ok::<(), expr_to_il::CompileError>(())
//! ```
//!
//! Mixing operand types is rejected when the kernel is built:
//!
//! ```compile_fail
//! use expr_to_il::*;
//!
//! let mut k = Kernel::begin(KernelConfig::default());
//! let a = k.var::<Float4>().unwrap();
//! let b = k.var::<Int4>().unwrap();
//! k.assign(a, a + b).unwrap();
//! ```
//!
//! as is assigning through a swizzle of a computed value:
//!
//! ```compile_fail
//! use expr_to_il::*;
//!
//! let mut k = Kernel::begin(KernelConfig::default());
//! let a = k.var::<Float4>().unwrap();
//! k.assign(a.get().xy().x(), 1.0f32).unwrap();
//! ```
//!
//! and so is indexing a view with a value that is not an integer:
//!
//! ```compile_fail
//! use expr_to_il::*;
//!
//! let mut k = Kernel::begin(KernelConfig::default());
//! let data = k.lds::<Float>(0, 64).unwrap();
//! let x = data.load(1.5f32);
//! ```

pub mod error;
pub mod types;
pub mod swizzle;
pub mod operand;
pub mod functor;
pub mod config;
pub mod program;
pub mod source;
pub mod expr;
pub mod variable;
pub mod memory;
pub mod kernel;
pub mod control;
pub mod call;
pub mod functions;
pub mod args;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod analyzer;
pub mod codegen;

pub use types::*;
pub use swizzle::Swizzle;
pub use expr::{Expr, IntoExpr, Node};
pub use variable::{
    abs_thread_id, abs_thread_id_flat, group_id, group_id_flat, local_thread_id,
    local_thread_id_flat, NamedVariable, VarLanes, Variable,
};
pub use memory::{AtomicOp, AtomicView, Global, IndexedRegister, Input1d, Input2d, Lds, Uav, View};
pub use kernel::Kernel;
pub use call::Param;
pub use functions::*;
pub use args::ArgumentBuffer;
pub use config::{KernelConfig, Profile};
pub use program::{CacheMode, IlProgram, UavKind};
pub use parser::Parser;
pub use analyzer::Analyzer;
pub use codegen::CodeGenerator;
pub use ast::TypedProgram;
pub use error::{CompileError, CompileResult};

/// Parse and type-check a kernel script
pub fn analyze(source: &str) -> CompileResult<TypedProgram> {
    let mut parser = Parser::new(source);
    let program = parser.parse_program()?;

    let mut analyzer = Analyzer::new();
    analyzer.analyze(program)
}

/// Main compilation function: kernel script in, IL program out
///
/// Header settings in the script (`threads`, `profile`) override `config`.
pub fn compile(source: &str, config: &KernelConfig) -> CompileResult<IlProgram> {
    let typed = analyze(source)?;
    let config = typed.apply_header(config.clone());

    let mut codegen = CodeGenerator::new(config);
    codegen.generate(typed)
}
