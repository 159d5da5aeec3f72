//! Type analyzer for kernel scripts
//!
//! Resolves names against a flat symbol table and infers the type of every
//! expression through the functor table. Operand types must match exactly;
//! nothing is promoted, so `float4 + int4` is rejected here with the same
//! error the code generator would report.

use std::collections::HashMap;

use crate::ast::*;
use crate::config::Profile;
use crate::error::{CompileError, CompileResult};
use crate::functor::{self, OpKind};
use crate::memory::{AtomicOp, View, ViewKind};
use crate::program::{CacheMode, ResourceDim, UavKind};
use crate::swizzle::Swizzle;
use crate::types::{literal_words, ScalarKind, ValueType};

/// What a name refers to
#[derive(Debug, Clone, Copy, PartialEq)]
enum Symbol {
    Var(ValueType),
    Arg(ValueType),
    View(View),
}

/// System value registers by script name
const BUILTINS: [(&str, &str, ValueType); 6] = [
    ("tid", "vAbsTid", ValueType::UINT4),
    ("tid_flat", "vAbsTidFlat", ValueType::UINT),
    ("lid", "vTidInGrp", ValueType::UINT4),
    ("lid_flat", "vTidInGrpFlat", ValueType::UINT),
    ("gid", "vThreadGrpId", ValueType::UINT4),
    ("gid_flat", "vThreadGrpIdFlat", ValueType::UINT),
];

fn builtin(name: &str) -> Option<(&'static str, ValueType)> {
    BUILTINS
        .iter()
        .find(|(script, _, _)| *script == name)
        .map(|(_, register, ty)| (*register, *ty))
}

fn parse_type(name: &str) -> CompileResult<ValueType> {
    ValueType::parse(name).ok_or_else(|| CompileError::type_error(format!("unknown type `{}`", name)))
}

fn binary_op(op: BinaryOp) -> OpKind {
    match op {
        BinaryOp::Add => OpKind::Add,
        BinaryOp::Sub => OpKind::Sub,
        BinaryOp::Mul => OpKind::Mul,
        BinaryOp::Div => OpKind::Div,
        BinaryOp::Mod => OpKind::Mod,
        BinaryOp::And => OpKind::And,
        BinaryOp::Or => OpKind::Or,
        BinaryOp::Xor => OpKind::Xor,
        BinaryOp::Shl => OpKind::Shl,
        BinaryOp::Shr => OpKind::Shr,
        BinaryOp::Eq => OpKind::Eq,
        BinaryOp::Ne => OpKind::Ne,
        BinaryOp::Lt => OpKind::Lt,
        BinaryOp::Le => OpKind::Le,
        BinaryOp::Gt => OpKind::Gt,
        BinaryOp::Ge => OpKind::Ge,
    }
}

fn literal(ty: ValueType, values: &[f64]) -> TypedExpr {
    TypedExpr {
        kind: TypedExprKind::Literal(literal_words(ty, values)),
        ty,
    }
}

/// Analyzer for name resolution and type inference
pub struct Analyzer {
    symbols: HashMap<String, Symbol>,
    next_indexed: u32,
    loop_depth: u32,
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            next_indexed: 0,
            loop_depth: 0,
        }
    }

    /// Analyze a program and produce the typed program
    pub fn analyze(&mut self, program: Program) -> CompileResult<TypedProgram> {
        let mut typed = TypedProgram {
            threads: None,
            profile: None,
            statements: Vec::new(),
        };
        for stmt in program.statements {
            match stmt {
                Statement::Threads(0) => return Err(CompileError::type_error("threads must be positive")),
                Statement::Threads(n) => typed.threads = Some(n),
                Statement::Profile(name) => {
                    let profile = Profile::parse(&name)
                        .ok_or_else(|| CompileError::parse_error(format!("unknown profile `{}`", name)))?;
                    typed.profile = Some(profile);
                }
                other => typed.statements.push(self.analyze_statement(other)?),
            }
        }
        Ok(typed)
    }

    fn define(&mut self, name: &str, symbol: Symbol) -> CompileResult<()> {
        if self.symbols.contains_key(name) || builtin(name).is_some() {
            return Err(CompileError::duplicate(name));
        }
        self.symbols.insert(name.to_string(), symbol);
        Ok(())
    }

    fn lookup(&self, name: &str) -> CompileResult<Symbol> {
        self.symbols
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::undefined(name))
    }

    fn view(&self, name: &str) -> CompileResult<View> {
        match self.lookup(name)? {
            Symbol::View(view) => Ok(view),
            _ => Err(CompileError::type_error(format!("`{}` is not a memory view", name))),
        }
    }

    fn declare_view(&mut self, name: String, view: View, len: u32) -> CompileResult<TypedStatement> {
        self.define(&name, Symbol::View(view))?;
        Ok(TypedStatement::Declare(Declaration::View { name, view, len }))
    }

    fn analyze_block(&mut self, block: Vec<Statement>) -> CompileResult<Vec<TypedStatement>> {
        block
            .into_iter()
            .map(|stmt| self.analyze_statement(stmt))
            .collect()
    }

    fn analyze_condition(&mut self, cond: &Expr) -> CompileResult<TypedExpr> {
        let cond = self.analyze_expr(cond)?;
        if cond.ty != ValueType::INT && cond.ty != ValueType::UINT {
            return Err(CompileError::type_error(format!(
                "condition must be a scalar int or uint, not {}",
                cond.ty
            )));
        }
        Ok(cond)
    }

    /// Analyze a statement
    fn analyze_statement(&mut self, stmt: Statement) -> CompileResult<TypedStatement> {
        match stmt {
            Statement::Threads(_) | Statement::Profile(_) => Err(CompileError::parse_error(
                "header statements belong at the top level",
            )),
            Statement::Arg { ty, name } => {
                let ty = parse_type(&ty)?;
                self.define(&name, Symbol::Arg(ty))?;
                Ok(TypedStatement::Declare(Declaration::Arg { name, ty }))
            }
            Statement::Input { rank, ty, name, slot } => {
                let element = parse_type(&ty)?;
                if element.is_double() {
                    return Err(CompileError::type_error(format!(
                        "input resources cannot hold {}",
                        element
                    )));
                }
                let dim = if rank == 1 { ResourceDim::OneD } else { ResourceDim::TwoD };
                self.declare_view(name, View::new(ViewKind::Input { slot, dim }, element), 0)
            }
            Statement::Uav {
                kind,
                ty,
                name,
                id,
                cache,
            } => {
                let element = parse_type(&ty)?;
                let kind = UavKind::parse(&kind)
                    .ok_or_else(|| CompileError::parse_error(format!("unknown UAV kind `{}`", kind)))?;
                let cache = match cache {
                    Some(mode) => CacheMode::parse(&mode)
                        .ok_or_else(|| CompileError::parse_error(format!("unknown cache mode `{}`", mode)))?,
                    None => CacheMode::default(),
                };
                self.declare_view(name, View::new(ViewKind::Uav { id, kind, cache }, element), 0)
            }
            Statement::Lds { ty, name, id, count } => {
                let element = parse_type(&ty)?;
                self.declare_view(name, View::new(ViewKind::Lds { id }, element), count)
            }
            Statement::Global { ty, name } => {
                let element = parse_type(&ty)?;
                self.declare_view(name, View::new(ViewKind::Global, element), 0)
            }
            Statement::Indexed { ty, name, len } => {
                let element = parse_type(&ty)?;
                let id = self.next_indexed;
                self.next_indexed += 1;
                self.declare_view(name, View::new(ViewKind::Indexed { id }, element), len)
            }
            Statement::Var { ty, name, init } => {
                let ty = parse_type(&ty)?;
                let init = match init {
                    Some(value) => {
                        let (value, value_ty) = self.analyze_value(&value)?;
                        if value_ty != ty {
                            return Err(CompileError::mismatch(ty, value_ty));
                        }
                        Some(value)
                    }
                    None => None,
                };
                self.define(&name, Symbol::Var(ty))?;
                Ok(TypedStatement::Var { name, ty, init })
            }
            Statement::Assign { name, lanes, value } => {
                let var_ty = match self.symbols.get(&name) {
                    Some(Symbol::Var(ty)) => *ty,
                    Some(Symbol::Arg(_)) => {
                        return Err(CompileError::not_assignable(format!("argument `{}` is read-only", name)))
                    }
                    Some(Symbol::View(_)) => {
                        return Err(CompileError::not_assignable(format!(
                            "view `{}` is written through `{}[index]`",
                            name, name
                        )))
                    }
                    None if builtin(&name).is_some() => {
                        return Err(CompileError::not_assignable(format!("`{}` is read-only", name)))
                    }
                    None => return Err(CompileError::undefined(name)),
                };
                let (lanes, target_ty) = match lanes {
                    Some(text) => {
                        let swizzle = Swizzle::parse(&text)?;
                        let ty = Self::lane_target(&swizzle, var_ty)?;
                        (Some(swizzle), ty)
                    }
                    None => (None, var_ty),
                };
                let (value, value_ty) = self.analyze_value(&value)?;
                if value_ty != target_ty {
                    return Err(CompileError::mismatch(target_ty, value_ty));
                }
                Ok(TypedStatement::Assign {
                    name,
                    var_ty,
                    lanes,
                    value,
                })
            }
            Statement::Store { view, index, value } => {
                let resolved = self.view(&view)?;
                if matches!(resolved.kind, ViewKind::Input { .. }) {
                    return Err(CompileError::not_assignable(format!(
                        "input resource `{}` is read-only",
                        view
                    )));
                }
                let index = self.analyze_index(&resolved, &index)?;
                let value = self.analyze_expr(&value)?;
                if value.ty != resolved.element {
                    return Err(CompileError::mismatch(resolved.element, value.ty));
                }
                Ok(TypedStatement::Store { view, index, value })
            }
            Statement::If { cond, then, otherwise } => {
                let cond = self.analyze_condition(&cond)?;
                let then = self.analyze_block(then)?;
                let otherwise = otherwise.map(|block| self.analyze_block(block)).transpose()?;
                Ok(TypedStatement::If { cond, then, otherwise })
            }
            Statement::While { cond, body } => {
                let cond = self.analyze_condition(&cond)?;
                self.loop_depth += 1;
                let body = self.analyze_block(body);
                self.loop_depth -= 1;
                Ok(TypedStatement::While { cond, body: body? })
            }
            Statement::Break if self.loop_depth == 0 => Err(CompileError::structure("break outside a loop")),
            Statement::Continue if self.loop_depth == 0 => {
                Err(CompileError::structure("continue outside a loop"))
            }
            Statement::Break => Ok(TypedStatement::Break),
            Statement::Continue => Ok(TypedStatement::Continue),
            Statement::Barrier => Ok(TypedStatement::Barrier),
            Statement::Fence => Ok(TypedStatement::Fence),
            Statement::Atomic {
                op,
                view,
                index,
                operands,
            } => Ok(TypedStatement::Atomic(self.analyze_atomic(&op, &view, &index, &operands)?)),
        }
    }

    /// Type written by a lane assignment; selectors must name distinct
    /// lanes in increasing order
    fn lane_target(swizzle: &Swizzle, var_ty: ValueType) -> CompileResult<ValueType> {
        let selectors = swizzle.selectors();
        let increasing = selectors.windows(2).all(|pair| pair[0].index() < pair[1].index());
        if !increasing || selectors.len() == 3 {
            return Err(CompileError::not_assignable(format!(
                "cannot assign to lanes .{} of {}",
                swizzle, var_ty
            )));
        }
        swizzle.result_type(var_ty)
    }

    fn analyze_atomic(&mut self, op: &str, view: &str, index: &Expr, operands: &[Expr]) -> CompileResult<TypedAtomic> {
        let op = AtomicOp::parse(op)
            .ok_or_else(|| CompileError::parse_error(format!("unknown atomic operation `{}`", op)))?;
        let resolved = self.view(view)?;
        if !matches!(resolved.kind, ViewKind::Lds { .. } | ViewKind::Uav { .. })
            || !matches!(resolved.element, ValueType::INT | ValueType::UINT)
        {
            return Err(CompileError::type_error(format!(
                "no atomics on `{}` ({} elements)",
                view, resolved.element
            )));
        }
        if operands.len() != op.operand_count() {
            return Err(CompileError::type_error(format!(
                "atomic {} takes {} operands, got {}",
                op,
                op.operand_count(),
                operands.len()
            )));
        }
        let index = self.analyze_index(&resolved, index)?;
        let mut typed = Vec::with_capacity(operands.len());
        for operand in operands {
            let operand = self.analyze_expr(operand)?;
            if operand.ty != resolved.element {
                return Err(CompileError::mismatch(resolved.element, operand.ty));
            }
            typed.push(operand);
        }
        Ok(TypedAtomic {
            view: view.to_string(),
            element: resolved.element,
            op,
            index,
            operands: typed,
        })
    }

    /// Right-hand side of an assignment: an expression, or an atomic whose
    /// previous value is kept
    fn analyze_value(&mut self, value: &Expr) -> CompileResult<(TypedValue, ValueType)> {
        if let Expr::Call { name, args } = value {
            if let Some(op) = name.strip_prefix("fetch_") {
                let (view, index, operands) = match args.as_slice() {
                    [Expr::Ident(view), index, operands @ ..] => (view, index, operands),
                    _ => {
                        return Err(CompileError::parse_error(format!(
                            "{} takes a view, an index and its operands",
                            name
                        )))
                    }
                };
                let atomic = self.analyze_atomic(op, view, index, operands)?;
                let ty = atomic.element;
                return Ok((TypedValue::Fetch(atomic), ty));
            }
        }
        let expr = self.analyze_expr(value)?;
        let ty = expr.ty;
        Ok((TypedValue::Expr(expr), ty))
    }

    fn analyze_index(&mut self, view: &View, index: &Expr) -> CompileResult<TypedExpr> {
        let index = self.analyze_expr(index)?;
        view.check_index(index.ty)?;
        Ok(index)
    }

    /// Analyze an expression and infer its type
    fn analyze_expr(&mut self, expr: &Expr) -> CompileResult<TypedExpr> {
        match expr {
            Expr::Int(n) => {
                if i32::try_from(*n).is_err() {
                    return Err(CompileError::type_error(format!("{} does not fit an int", n)));
                }
                Ok(literal(ValueType::INT, &[*n as f64]))
            }
            Expr::Uint(n) => Ok(literal(ValueType::UINT, &[*n as f64])),
            Expr::Float(n) => Ok(literal(ValueType::FLOAT, &[*n])),
            Expr::Double(n) => Ok(literal(ValueType::DOUBLE, &[*n])),

            Expr::Ident(name) => {
                if let Some((register, ty)) = builtin(name) {
                    return Ok(TypedExpr {
                        kind: TypedExprKind::Builtin(register),
                        ty,
                    });
                }
                match self.lookup(name)? {
                    Symbol::Var(ty) => Ok(TypedExpr {
                        kind: TypedExprKind::Variable(name.clone()),
                        ty,
                    }),
                    Symbol::Arg(ty) => Ok(TypedExpr {
                        kind: TypedExprKind::Argument(name.clone()),
                        ty,
                    }),
                    Symbol::View(_) => Err(CompileError::type_error(format!(
                        "view `{}` is read through `{}[index]`",
                        name, name
                    ))),
                }
            }

            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.analyze_expr(lhs)?;
                let rhs = self.analyze_expr(rhs)?;
                self.apply(binary_op(*op), vec![lhs, rhs])
            }

            Expr::Unary { op, operand } => {
                let operand = self.analyze_expr(operand)?;
                let op = match op {
                    UnaryOp::Neg => OpKind::Neg,
                    UnaryOp::Not => OpKind::Not,
                };
                self.apply(op, vec![operand])
            }

            Expr::Swizzle { base, lanes } => {
                let base = self.analyze_expr(base)?;
                let swizzle = Swizzle::parse(lanes)?;
                let ty = swizzle.result_type(base.ty)?;
                Ok(TypedExpr {
                    kind: TypedExprKind::Swizzle {
                        base: Box::new(base),
                        swizzle,
                    },
                    ty,
                })
            }

            Expr::Index { view, index } => {
                let resolved = self.view(view)?;
                let index = self.analyze_index(&resolved, index)?;
                Ok(TypedExpr {
                    kind: TypedExprKind::Load {
                        view: view.clone(),
                        index: Box::new(index),
                    },
                    ty: resolved.element,
                })
            }

            Expr::Call { name, args } => self.analyze_call(name, args),
        }
    }

    fn apply(&mut self, op: OpKind, args: Vec<TypedExpr>) -> CompileResult<TypedExpr> {
        if args.len() != op.arity() {
            return Err(CompileError::type_error(format!(
                "{} takes {} operands, got {}",
                op,
                op.arity(),
                args.len()
            )));
        }
        let types: Vec<ValueType> = args.iter().map(|arg| arg.ty).collect();
        let ty = functor::result_type(op, &types)?;
        Ok(TypedExpr {
            kind: TypedExprKind::Op { op, args },
            ty,
        })
    }

    /// Function calls, type constructors, casts and bit casts
    fn analyze_call(&mut self, name: &str, args: &[Expr]) -> CompileResult<TypedExpr> {
        if let Some(ty) = ValueType::parse(name) {
            if !args.is_empty() && args.iter().all(Expr::is_literal) {
                return Self::construct(ty, args);
            }
            let typed = self.analyze_args(args)?;
            return self.apply(OpKind::Cast(ty), typed);
        }
        if let Some(ty) = name.strip_prefix("as_").and_then(ValueType::parse) {
            let typed = self.analyze_args(args)?;
            return self.apply(OpKind::Bitcast(ty), typed);
        }
        if name.starts_with("fetch_") {
            return Err(CompileError::type_error(format!(
                "{} must be the whole right-hand side of an assignment",
                name
            )));
        }
        match OpKind::from_function(name) {
            Some(op) => {
                let typed = self.analyze_args(args)?;
                self.apply(op, typed)
            }
            None => Err(CompileError::type_error(format!("unknown function `{}`", name))),
        }
    }

    fn analyze_args(&mut self, args: &[Expr]) -> CompileResult<Vec<TypedExpr>> {
        args.iter().map(|arg| self.analyze_expr(arg)).collect()
    }

    /// Literal constructor: one value splatted over every component, or
    /// one value per component
    fn construct(ty: ValueType, args: &[Expr]) -> CompileResult<TypedExpr> {
        if args.len() != 1 && args.len() != ty.count as usize {
            return Err(CompileError::type_error(format!(
                "{} takes 1 or {} values, got {}",
                ty,
                ty.count,
                args.len()
            )));
        }
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let value = match (ty.scalar, arg) {
                (ScalarKind::Float | ScalarKind::Double, Expr::Float(v) | Expr::Double(v)) => *v,
                (_, Expr::Int(v)) => *v as f64,
                (_, Expr::Uint(v)) => *v as f64,
                _ => return Err(CompileError::type_error(format!("{:?} is not a valid {} value", arg, ty))),
            };
            let fits = match ty.scalar {
                ScalarKind::Int => (i32::MIN as f64..=i32::MAX as f64).contains(&value),
                ScalarKind::Uint => (0.0..=u32::MAX as f64).contains(&value),
                _ => true,
            };
            if !fits {
                return Err(CompileError::type_error(format!("{} does not fit {}", value, ty)));
            }
            values.push(value);
        }
        Ok(literal(ty, &values))
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn analyze(source: &str) -> CompileResult<TypedProgram> {
        let program = Parser::new(source).parse_program()?;
        Analyzer::new().analyze(program)
    }

    #[test]
    fn test_header_and_declarations() {
        let typed = analyze("threads 128; profile pixel; arg float4 c; indexed int a 4; indexed int b 4;").unwrap();
        assert_eq!(typed.threads, Some(128));
        assert_eq!(typed.profile, Some(Profile::Pixel));
        assert_eq!(
            typed.statements[2],
            TypedStatement::Declare(Declaration::View {
                name: "b".into(),
                view: View::new(ViewKind::Indexed { id: 1 }, ValueType::INT),
                len: 4,
            })
        );
    }

    #[test]
    fn test_expression_types() {
        let typed = analyze("var float4 acc = float4(0.0); var uint m = acc.x < acc.y; var float2 p = acc.wz;").unwrap();
        let TypedStatement::Var { init: Some(TypedValue::Expr(init)), .. } = &typed.statements[0] else {
            panic!("expected initialized var");
        };
        assert_eq!(init.kind, TypedExprKind::Literal([0; 4]));
        let TypedStatement::Var { init: Some(TypedValue::Expr(mask)), .. } = &typed.statements[1] else {
            panic!("expected initialized var");
        };
        assert_eq!(mask.ty, ValueType::UINT);
    }

    #[test]
    fn test_no_implicit_promotion() {
        let err = analyze("var float4 a; var int4 b; a = a + b;").unwrap_err();
        assert!(matches!(err, CompileError::NoSpecialization { .. }));
        let err = analyze("var float x = 1;").unwrap_err();
        assert!(matches!(err, CompileError::TypeMismatch { .. }));
        assert!(analyze("var float x = float(1);").is_ok());
    }

    #[test]
    fn test_casts_and_constructors() {
        let typed = analyze("var int i = 3; var float f = float(i); var uint u = as_uint(f); var int2 v = int2(1, -2);")
            .unwrap();
        let TypedStatement::Var { init: Some(TypedValue::Expr(cast)), .. } = &typed.statements[1] else {
            panic!("expected cast");
        };
        assert!(matches!(cast.kind, TypedExprKind::Op { op: OpKind::Cast(ValueType::FLOAT), .. }));
        assert!(analyze("var int2 v = int2(1.5);").is_err());
        assert!(analyze("var uint u = uint(-1);").is_err());
        assert!(analyze("var float4 v = float4(1.0, 2.0);").is_err());
    }

    #[test]
    fn test_name_errors() {
        assert!(matches!(analyze("x = 1;"), Err(CompileError::UndefinedVariable { .. })));
        assert!(matches!(
            analyze("var int x; var float x;"),
            Err(CompileError::DuplicateDeclaration { .. })
        ));
        assert!(matches!(analyze("var int tid;"), Err(CompileError::DuplicateDeclaration { .. })));
        assert!(matches!(analyze("arg int n; n = 1;"), Err(CompileError::NotAssignable { .. })));
        assert!(matches!(analyze("tid_flat = 1u;"), Err(CompileError::NotAssignable { .. })));
    }

    #[test]
    fn test_lane_assignment_rules() {
        assert!(analyze("var float4 v; v.yw = float2(1.0);").is_ok());
        assert!(matches!(
            analyze("var float4 v; v.wy = float2(1.0);"),
            Err(CompileError::NotAssignable { .. })
        ));
        assert!(matches!(
            analyze("var float2 v; v.z = 1.0;"),
            Err(CompileError::InvalidSwizzle { .. })
        ));
    }

    #[test]
    fn test_memory_and_atomics() {
        let source = "input2d float4 img 0; uav raw uint out 1; lds int counts 0 64;\n\
                      var float4 p = img[float2(0.5)]; out[tid_flat] = 1u;\n\
                      atomic_add(counts, 0, 1); var int old = fetch_max(counts, lid_flat, 5);";
        let typed = analyze(source).unwrap();
        assert!(matches!(
            typed.statements.last(),
            Some(TypedStatement::Var { init: Some(TypedValue::Fetch(TypedAtomic { op: AtomicOp::Max, .. })), .. })
        ));
        assert!(analyze("input1d float a 0; a[0] = 1.0;").is_err());
        assert!(analyze("uav raw float f 0; atomic_add(f, 0, 1.0);").is_err());
        assert!(analyze("lds uint c 0 4; atomic_cmpxchg(c, 0, 1u);").is_err());
        assert!(analyze("lds uint c 0 4; var uint x = c[1.0];").is_err());
    }

    #[test]
    fn test_structure_errors() {
        assert!(matches!(analyze("break;"), Err(CompileError::Structure { .. })));
        assert!(analyze("var int i = 0; while (i < 4) { if (i == 2) { break; } i = i + 1; }").is_ok());
        assert!(matches!(
            analyze("var float f = 1.0; if (f) { }"),
            Err(CompileError::TypeError { .. })
        ));
    }
}
