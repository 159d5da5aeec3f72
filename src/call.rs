//! Subroutines
//!
//! A function is identified by the source location of its call site (plus
//! an ordinal for call sites that are reached with different bodies). The
//! first call emits the body once into its own `func N` section and records
//! a [`CallingConvention`]: one parameter register per argument with its
//! direction. Every call, including the first, copies `in`/`inout`
//! arguments into the parameter registers, emits `call N` and copies
//! `out`/`inout` parameters back. A body that calls back into its own
//! call site is rejected.

use std::panic::Location;

use crate::error::{CompileError, CompileResult};
use crate::kernel::Kernel;
use crate::operand::{Dest, Instruction, Operand, Reg};
use crate::types::{IlType, ValueType};
use crate::variable::Variable;

/// How an argument crosses the call boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
    InOut,
}

impl Direction {
    fn copies_in(self) -> bool {
        matches!(self, Direction::In | Direction::InOut)
    }

    fn copies_out(self) -> bool {
        matches!(self, Direction::Out | Direction::InOut)
    }
}

/// A caller variable bound to a parameter
#[derive(Debug, Clone, Copy)]
pub struct Param<T: IlType> {
    var: Variable<T>,
    dir: Direction,
}

impl<T: IlType> Param<T> {
    pub fn input(var: Variable<T>) -> Self {
        Self { var, dir: Direction::In }
    }

    pub fn output(var: Variable<T>) -> Self {
        Self { var, dir: Direction::Out }
    }

    pub fn inout(var: Variable<T>) -> Self {
        Self {
            var,
            dir: Direction::InOut,
        }
    }

    fn slot(&self) -> ParamSlot {
        ParamSlot {
            ty: T::TYPE,
            dir: self.dir,
            reg: self.var.reg(),
        }
    }
}

/// One parameter: its type, direction and register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSlot {
    pub ty: ValueType,
    pub dir: Direction,
    pub reg: Reg,
}

/// Parameter registers of a defined function, reused by every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallingConvention {
    pub function: u32,
    pub params: Vec<ParamSlot>,
}

/// Identity of a call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSite {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
    pub ordinal: u32,
}

impl CallSite {
    pub fn new(location: &'static Location<'static>, ordinal: u32) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
            ordinal,
        }
    }
}

/// Argument tuples accepted by [`Kernel::call`]
pub trait ParamList {
    /// Variables the body sees, bound to the parameter registers
    type Vars;

    /// Caller-side slots in declaration order
    fn slots(&self) -> Vec<ParamSlot>;

    fn vars(regs: &[Reg]) -> Self::Vars;
}

impl ParamList for () {
    type Vars = ();

    fn slots(&self) -> Vec<ParamSlot> {
        Vec::new()
    }

    fn vars(_regs: &[Reg]) -> Self::Vars {}
}

macro_rules! param_tuple {
    ($($name:ident: $idx:tt),+) => {
        impl<$($name: IlType),+> ParamList for ($(Param<$name>,)+) {
            type Vars = ($(Variable<$name>,)+);

            fn slots(&self) -> Vec<ParamSlot> {
                vec![$(self.$idx.slot()),+]
            }

            fn vars(regs: &[Reg]) -> Self::Vars {
                ($(Variable::from_reg(regs[$idx]),)+)
            }
        }
    };
}

param_tuple!(A: 0);
param_tuple!(A: 0, B: 1);
param_tuple!(A: 0, B: 1, C: 2);
param_tuple!(A: 0, B: 1, C: 2, D: 3);

impl Kernel {
    /// Call the function defined by `body`; the body is emitted only on
    /// the first call from this location
    #[track_caller]
    pub fn call<P, F>(&mut self, params: P, body: F) -> CompileResult<()>
    where
        P: ParamList,
        F: FnOnce(&mut Kernel, P::Vars) -> CompileResult<()>,
    {
        let site = CallSite::new(Location::caller(), 0);
        self.call_at(site, params, body)
    }

    /// As [`call`](Self::call), distinguishing several functions reached
    /// from the same location
    #[track_caller]
    pub fn call_ordinal<P, F>(&mut self, ordinal: u32, params: P, body: F) -> CompileResult<()>
    where
        P: ParamList,
        F: FnOnce(&mut Kernel, P::Vars) -> CompileResult<()>,
    {
        let site = CallSite::new(Location::caller(), ordinal);
        self.call_at(site, params, body)
    }

    pub fn call_at<P, F>(&mut self, site: CallSite, params: P, body: F) -> CompileResult<()>
    where
        P: ParamList,
        F: FnOnce(&mut Kernel, P::Vars) -> CompileResult<()>,
    {
        let args = params.slots();
        if self.defining.contains(&site) {
            return Err(CompileError::structure(format!(
                "function at {}:{}:{} calls itself",
                site.file, site.line, site.column
            )));
        }
        let existing = self.functions.get(&site).cloned();
        let convention = match existing {
            Some(convention) => convention,
            None => self.define_function::<P, F>(site, &args, body)?,
        };

        if convention.params.len() != args.len() {
            return Err(CompileError::codegen(format!(
                "function {} takes {} parameters, got {}",
                convention.function,
                convention.params.len(),
                args.len()
            )));
        }
        for (param, arg) in convention.params.iter().zip(&args) {
            if param.ty != arg.ty || param.dir != arg.dir {
                return Err(CompileError::mismatch(
                    format!("{:?} {}", param.dir, param.ty),
                    format!("{:?} {}", arg.dir, arg.ty),
                ));
            }
        }

        let source = self.source_mut();
        for (param, arg) in convention.params.iter().zip(&args) {
            if arg.dir.copies_in() {
                source.emit(
                    Instruction::new("mov")
                        .arg(Dest::register(param.reg, param.ty))
                        .arg(Operand::register(arg.reg, arg.ty)),
                );
            }
        }
        source.emit(Instruction::new("call").arg(convention.function));
        for (param, arg) in convention.params.iter().zip(&args) {
            if arg.dir.copies_out() {
                source.emit(
                    Instruction::new("mov")
                        .arg(Dest::register(arg.reg, arg.ty))
                        .arg(Operand::register(param.reg, param.ty)),
                );
            }
        }
        Ok(())
    }

    fn define_function<P, F>(&mut self, site: CallSite, args: &[ParamSlot], body: F) -> CompileResult<CallingConvention>
    where
        P: ParamList,
        F: FnOnce(&mut Kernel, P::Vars) -> CompileResult<()>,
    {
        let function = self.next_function;
        self.next_function += 1;
        let mut params = Vec::with_capacity(args.len());
        for arg in args {
            let reg = self.declare(arg.ty)?;
            params.push(ParamSlot { reg, ..*arg });
        }
        let regs: Vec<Reg> = params.iter().map(|p| p.reg).collect();
        log::debug!(
            "defining function {} for {}:{}:{} (#{}) with {} parameters",
            function,
            site.file,
            site.line,
            site.column,
            site.ordinal,
            params.len()
        );

        self.defining.insert(site);
        self.source_mut().begin_function(function);
        let emitted = body(self, P::vars(&regs));
        self.defining.remove(&site);
        emitted?;
        self.source_mut().end_function()?;

        let convention = CallingConvention { function, params };
        self.functions.insert(site, convention.clone());
        Ok(convention)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::types::Float;
    use pretty_assertions::assert_eq;

    fn square(k: &mut Kernel, x: Variable<Float>, y: Variable<Float>) -> CompileResult<()> {
        k.call((Param::input(x), Param::output(y)), |k, (a, b)| k.assign(b, a * a))
    }

    #[test]
    fn test_body_defined_once() {
        let mut k = Kernel::begin(KernelConfig::default());
        let x = k.var_init(3.0f32).unwrap();
        let y = k.var::<Float>().unwrap();
        square(&mut k, x, y).unwrap();
        square(&mut k, y, x).unwrap();
        let program = k.end().unwrap();
        let lines: Vec<&str> = program.lines.iter().skip(2).map(String::as_str).collect();
        assert_eq!(
            lines,
            vec![
                "dcl_literal l0, 0x40400000, 0x40400000, 0x40400000, 0x40400000",
                "mov r0.x, l0.x",
                "mov r2.x, r0.x",
                "call 1",
                "mov r1.x, r3.x",
                "mov r2.x, r1.x",
                "call 1",
                "mov r0.x, r3.x",
                "endmain",
                "func 1",
                "mul r4.x, r2.x, r2.x",
                "mov r3.x, r4.x",
                "ret_dyn",
                "endfunc",
                "end",
            ]
        );
        assert_eq!(program.stats.functions, 1);
    }

    #[test]
    fn test_ordinals_define_distinct_functions() {
        let mut k = Kernel::begin(KernelConfig::default());
        let x = k.var_init(1.0f32).unwrap();
        for ordinal in 0..2 {
            k.call_ordinal(ordinal, (Param::inout(x),), |k, (v,)| k.assign(v, v + v))
                .unwrap();
        }
        let program = k.end().unwrap();
        assert_eq!(program.stats.functions, 2);
        assert_eq!(program.count_opcode("call"), 2);
        assert_eq!(program.count_opcode("func"), 2);
    }

    #[test]
    fn test_mismatched_signature() {
        let mut k = Kernel::begin(KernelConfig::default());
        let x = k.var::<Float>().unwrap();
        let site = CallSite::new(Location::caller(), 7);
        k.call_at(site, (Param::input(x),), |_, _| Ok(())).unwrap();
        let err = k.call_at(site, (Param::output(x),), |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, CompileError::TypeMismatch { .. }));
    }

    #[test]
    fn test_recursive_call_is_rejected() {
        let mut k = Kernel::begin(KernelConfig::default());
        let x = k.var::<Float>().unwrap();
        let site = CallSite::new(Location::caller(), 3);
        let err = k
            .call_at(site, (Param::input(x),), |k, (a,)| {
                k.call_at(site, (Param::input(a),), |_, _| Ok(()))
            })
            .unwrap_err();
        assert!(matches!(err, CompileError::Structure { .. }));
        assert!(k.functions.is_empty());
    }
}
