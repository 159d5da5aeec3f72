//! Code generator for kernel scripts
//!
//! Lowers a typed program onto a [`Kernel`] session through the untyped
//! node API, so scripts and Rust-built kernels share one emission path.

use std::collections::HashMap;

use crate::ast::{Declaration, TypedAtomic, TypedExpr, TypedExprKind, TypedProgram, TypedStatement, TypedValue};
use crate::config::KernelConfig;
use crate::error::{CompileError, CompileResult};
use crate::expr::Node;
use crate::kernel::Kernel;
use crate::memory::View;
use crate::operand::Reg;
use crate::program::{ArgLayout, IlProgram};
use crate::swizzle::Lanes;
use crate::types::ValueType;
use crate::variable::Target;

/// Where a script name lives after declaration
#[derive(Debug, Clone)]
enum Binding {
    Var(Reg, ValueType),
    Arg(ArgLayout),
    View(View),
}

/// Code generator for IL programs
pub struct CodeGenerator {
    config: KernelConfig,
    bindings: HashMap<String, Binding>,
}

impl CodeGenerator {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            config,
            bindings: HashMap::new(),
        }
    }

    /// Generate the IL program of a typed script
    pub fn generate(&mut self, program: TypedProgram) -> CompileResult<IlProgram> {
        let mut kernel = Kernel::begin(self.config.clone());
        self.lower_block(&mut kernel, program.statements)?;
        kernel.end()
    }

    fn binding(&self, name: &str) -> CompileResult<&Binding> {
        self.bindings.get(name).ok_or_else(|| CompileError::undefined(name))
    }

    fn view(&self, name: &str) -> CompileResult<View> {
        match self.binding(name)? {
            Binding::View(view) => Ok(*view),
            _ => Err(CompileError::codegen(format!("`{}` is not a memory view", name))),
        }
    }

    fn lower_block(&mut self, kernel: &mut Kernel, block: Vec<TypedStatement>) -> CompileResult<()> {
        for stmt in block {
            self.lower_statement(kernel, stmt)?;
        }
        Ok(())
    }

    fn lower_statement(&mut self, kernel: &mut Kernel, stmt: TypedStatement) -> CompileResult<()> {
        match stmt {
            TypedStatement::Declare(Declaration::Arg { name, ty }) => {
                let layout = kernel.declare_arg(&name, ty)?;
                self.bindings.insert(name, Binding::Arg(layout));
                Ok(())
            }
            TypedStatement::Declare(Declaration::View { name, view, len }) => {
                kernel.declare_view(&view, len)?;
                self.bindings.insert(name, Binding::View(view));
                Ok(())
            }
            TypedStatement::Var { name, ty, init } => {
                let reg = kernel.declare(ty)?;
                self.bindings.insert(name, Binding::Var(reg, ty));
                match init {
                    Some(value) => self.lower_assign(kernel, Target::whole(reg, ty), value),
                    None => Ok(()),
                }
            }
            TypedStatement::Assign {
                name,
                var_ty,
                lanes,
                value,
            } => {
                let reg = match self.binding(&name)? {
                    Binding::Var(reg, _) => *reg,
                    _ => return Err(CompileError::not_assignable(name)),
                };
                let target = match lanes {
                    Some(swizzle) => Target {
                        reg,
                        lanes: swizzle.apply(var_ty, &Lanes::identity(var_ty.lanes())),
                        ty: swizzle.result_type(var_ty)?,
                    },
                    None => Target::whole(reg, var_ty),
                };
                self.lower_assign(kernel, target, value)
            }
            TypedStatement::Store { view, index, value } => {
                let view = self.view(&view)?;
                let index = self.lower_expr(index)?;
                let value = self.lower_expr(value)?;
                kernel.store(&view, index, value)
            }
            TypedStatement::If { cond, then, otherwise } => {
                let cond = self.lower_expr(cond)?;
                kernel.open_if(cond)?;
                self.lower_block(kernel, then)?;
                let has_else = otherwise.is_some();
                if let Some(otherwise) = otherwise {
                    kernel.open_else()?;
                    self.lower_block(kernel, otherwise)?;
                }
                kernel.close_if(has_else)
            }
            TypedStatement::While { cond, body } => {
                let cond = self.lower_expr(cond)?;
                kernel.open_while(cond)?;
                self.lower_block(kernel, body)?;
                kernel.close_while()
            }
            TypedStatement::Break => kernel.break_loop(),
            TypedStatement::Continue => kernel.continue_loop(),
            TypedStatement::Barrier => {
                kernel.barrier();
                Ok(())
            }
            TypedStatement::Fence => {
                kernel.fence();
                Ok(())
            }
            TypedStatement::Atomic(atomic) => self.lower_atomic(kernel, atomic, false).map(|_| ()),
        }
    }

    fn lower_assign(&mut self, kernel: &mut Kernel, target: Target, value: TypedValue) -> CompileResult<()> {
        let node = match value {
            TypedValue::Expr(expr) => self.lower_expr(expr)?,
            TypedValue::Fetch(atomic) => {
                let element = atomic.element;
                let reg = self
                    .lower_atomic(kernel, atomic, true)?
                    .ok_or_else(|| CompileError::codegen("atomic fetch returned no register"))?;
                Node::register(reg, element)
            }
        };
        kernel.assign_node(target, node)
    }

    fn lower_atomic(&mut self, kernel: &mut Kernel, atomic: TypedAtomic, fetch: bool) -> CompileResult<Option<Reg>> {
        let view = self.view(&atomic.view)?;
        let index = self.lower_expr(atomic.index)?;
        let operands = atomic
            .operands
            .into_iter()
            .map(|operand| self.lower_expr(operand))
            .collect::<CompileResult<Vec<_>>>()?;
        kernel.atomic(&view, atomic.op, index, operands, fetch)
    }

    /// Build the untyped node of an expression; nothing is emitted yet
    fn lower_expr(&self, expr: TypedExpr) -> CompileResult<Node> {
        let ty = expr.ty;
        match expr.kind {
            TypedExprKind::Literal(bits) => Ok(Node::literal(ty, bits)),
            TypedExprKind::Variable(name) => match self.binding(&name)? {
                Binding::Var(reg, var_ty) => Ok(Node::register(*reg, *var_ty)),
                _ => Err(CompileError::codegen(format!("`{}` is not a variable", name))),
            },
            TypedExprKind::Argument(name) => match self.binding(&name)? {
                Binding::Arg(layout) => Ok(Node::argument(layout)),
                _ => Err(CompileError::codegen(format!("`{}` is not an argument", name))),
            },
            TypedExprKind::Builtin(register) => Ok(Node::named(register, Lanes::identity(ty.lanes()), ty)),
            TypedExprKind::Op { op, args } => {
                let args = args
                    .into_iter()
                    .map(|arg| self.lower_expr(arg))
                    .collect::<CompileResult<Vec<_>>>()?;
                Node::op(op, args)
            }
            TypedExprKind::Swizzle { base, swizzle } => self.lower_expr(*base)?.swizzle(swizzle),
            TypedExprKind::Load { view, index } => {
                let view = self.view(&view)?;
                view.load(self.lower_expr(*index)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn compile(source: &str, config: KernelConfig) -> IlProgram {
        let program = Parser::new(source).parse_program().unwrap();
        let typed = Analyzer::new().analyze(program).unwrap();
        let config = typed.apply_header(config);
        CodeGenerator::new(config).generate(typed).unwrap()
    }

    fn body(program: &IlProgram) -> Vec<&str> {
        program
            .lines
            .iter()
            .map(String::as_str)
            .filter(|l| !l.starts_with("il_") && !l.starts_with("dcl_") && *l != "end")
            .collect()
    }

    #[test]
    fn test_loop_lowering() {
        let program = compile(
            "var int i = 0; while (i < 4) { i = i + 1; }",
            KernelConfig::default(),
        );
        assert_eq!(
            body(&program),
            vec![
                "mov r0.x, l0.x",
                "whileloop",
                "ilt r1.x, r0.x, l1.x",
                "break_logicalz r1.x",
                "iadd r2.x, r0.x, l2.x",
                "mov r0.x, r2.x",
                "endloop",
            ]
        );
    }

    #[test]
    fn test_store_and_arguments() {
        let program = compile(
            "arg float4 centroid; arg float scale; uav raw float out 0;\n\
             out[tid_flat] = centroid.x * scale;",
            KernelConfig::default(),
        );
        assert!(program.lines.contains(&"dcl_cb cb0[2]".to_string()));
        let lines = body(&program);
        assert!(lines[0].starts_with("ishl r0.x, vAbsTidFlat.x, "));
        assert_eq!(lines[1], "mul r1.x, cb0[0].x, cb0[1].x");
        assert!(lines[2].starts_with("uav_raw_store_id(0) mem.x___, r0.x, r1.x"));
    }

    #[test]
    fn test_if_else_and_lanes() {
        let program = compile(
            "var float4 v = float4(0.0); var uint n = 3u;\n\
             if (n == 3u) { v.yw = float2(1.0, 2.0); } else { v.x = 5.0; }",
            KernelConfig::default(),
        );
        let lines = body(&program);
        assert!(lines.contains(&"if_logicalnz r2.x"));
        assert!(lines.contains(&"mov r0._y_w, l2.xxxy"));
        assert!(lines.contains(&"else"));
        assert!(lines.contains(&"mov r0.x, l3.x"));
        assert_eq!(lines.last(), Some(&"endif"));
    }

    #[test]
    fn test_header_sets_barrier_policy() {
        let source = "lds float data 0 128; data[lid_flat] = 1.0; barrier;";
        let small = compile(source, KernelConfig::default());
        assert_eq!(small.count_opcode("fence_threads_lds"), 0);
        let large = compile(&format!("threads 128; {}", source), KernelConfig::default());
        assert_eq!(large.count_opcode("fence_threads_lds"), 1);
        assert!(large.lines.contains(&"dcl_num_thread_per_group 128".to_string()));
    }

    #[test]
    fn test_atomic_fetch() {
        let program = compile(
            "lds uint counter 0 1; var uint old = fetch_add(counter, 0u, 1u); atomic_or(counter, 0u, old);",
            KernelConfig::default(),
        );
        assert_eq!(program.count_opcode("lds_read_add_id(0)"), 1);
        assert_eq!(program.count_opcode("lds_or_id(0)"), 1);
    }
}
