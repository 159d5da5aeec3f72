//! Kernel compilation sessions
//!
//! A [`Kernel`] owns everything one compilation touches: the instruction
//! sections, the literal pool, the register counter, the declarations and
//! the registry of defined functions. Nothing is global, so independent
//! kernels can be built side by side.

use std::collections::{HashMap, HashSet};

use crate::call::{CallSite, CallingConvention};
use crate::config::KernelConfig;
use crate::error::{CompileError, CompileResult};
use crate::expr::{IntoExpr, Node};
use crate::memory::{AtomicOp, View};
use crate::operand::{Dest, Instruction, Operand, Reg};
use crate::program::{ArgLayout, IlProgram};
use crate::source::Source;
use crate::types::{IlType, ValueType};
use crate::variable::{NamedVariable, Place, Target, Variable};

/// One kernel compilation session
#[derive(Debug)]
pub struct Kernel {
    source: Source,
    pub(crate) functions: HashMap<CallSite, CallingConvention>,
    pub(crate) next_function: u32,
    /// Call sites whose bodies are being emitted right now
    pub(crate) defining: HashSet<CallSite>,
}

impl Kernel {
    /// Start compiling a kernel
    pub fn begin(config: KernelConfig) -> Self {
        log::debug!(
            "kernel session begins: profile {}, {} threads per group, wavefront {}",
            config.profile,
            config.threads_per_group,
            config.wavefront_size
        );
        Self {
            source: Source::new(config),
            functions: HashMap::new(),
            next_function: 1,
            defining: HashSet::new(),
        }
    }

    /// Finish the session and assemble the program text
    pub fn end(self) -> CompileResult<IlProgram> {
        let program = self.source.finish()?;
        log::debug!("kernel session ends: {}", program.summary());
        Ok(program)
    }

    pub fn config(&self) -> &KernelConfig {
        self.source.config()
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub(crate) fn source_mut(&mut self) -> &mut Source {
        &mut self.source
    }

    /// Emit an untyped tree and return the operand holding its value
    pub fn emit_node(&mut self, node: Node) -> CompileResult<Operand> {
        node.emit(&mut self.source)
    }

    /// Reserve the register of a new variable of type `ty`
    pub fn declare(&mut self, ty: ValueType) -> CompileResult<Reg> {
        let reg = self.source.alloc_reg()?;
        log::trace!("variable {} of type {}", reg, ty);
        Ok(reg)
    }

    /// New variable; its lanes are undefined until assigned
    pub fn var<T: IlType>(&mut self) -> CompileResult<Variable<T>> {
        self.declare(T::TYPE).map(Variable::from_reg)
    }

    /// New variable holding `value`
    pub fn var_init<T: IlType>(&mut self, value: impl IntoExpr<Ty = T>) -> CompileResult<Variable<T>> {
        let var = self.var::<T>()?;
        self.assign(var, value)?;
        Ok(var)
    }

    /// Emit `value` and move it into `place`
    pub fn assign<P: Place>(&mut self, place: P, value: impl IntoExpr<Ty = P::Ty>) -> CompileResult<()> {
        self.assign_node(place.target(), value.into_node())
    }

    pub fn assign_node(&mut self, target: Target, value: Node) -> CompileResult<()> {
        if value.ty() != target.ty {
            return Err(CompileError::mismatch(target.ty, value.ty()));
        }
        let operand = value.emit(&mut self.source)?;
        let dest = Dest::with_lanes(target.reg.to_string(), &target.lanes);
        let src = operand.aligned_to(&dest);
        self.source.emit(Instruction::new("mov").arg(dest).arg(src));
        Ok(())
    }

    /// Declare kernel argument `name` in the constant buffer
    pub fn arg<T: IlType>(&mut self, name: &str) -> CompileResult<NamedVariable<T>> {
        let layout = self.declare_arg(name, T::TYPE)?;
        Ok(NamedVariable::argument(&layout))
    }

    /// Untyped argument declaration; the layout locates its `cb0` slot
    pub fn declare_arg(&mut self, name: &str, ty: ValueType) -> CompileResult<ArgLayout> {
        let layout = self.source.declarations_mut().declare_arg(name, ty)?;
        log::debug!(
            "argument {} placed at cb{}[{}] (byte offset {})",
            name,
            layout.cb,
            layout.index,
            layout.byte_offset
        );
        Ok(layout)
    }

    /// Untyped store through `view`
    pub fn store(&mut self, view: &View, index: Node, value: Node) -> CompileResult<()> {
        view.store(&mut self.source, index, value)
    }

    /// Untyped atomic through `view`; with `fetch` the previous value is
    /// returned in a fresh register
    pub fn atomic(
        &mut self,
        view: &View,
        op: AtomicOp,
        index: Node,
        operands: Vec<Node>,
        fetch: bool,
    ) -> CompileResult<Option<Reg>> {
        view.atomic(&mut self.source, op, index, operands, fetch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Float, Float4, Int, Uint};
    use crate::variable::abs_thread_id_flat;

    fn body(program: &IlProgram) -> Vec<&str> {
        program
            .lines
            .iter()
            .map(String::as_str)
            .filter(|l| !l.starts_with("il_") && !l.starts_with("dcl_") && *l != "end")
            .collect()
    }

    #[test]
    fn test_variable_reads_do_not_reemit() {
        let mut k = Kernel::begin(KernelConfig::default());
        let a = k.var_init(2.0f32).unwrap();
        let b = k.var::<Float>().unwrap();
        k.assign(b, a * a + a).unwrap();
        let program = k.end().unwrap();
        assert_eq!(
            body(&program),
            vec!["mov r0.x, l0.x", "mul r2.x, r0.x, r0.x", "add r3.x, r2.x, r0.x", "mov r1.x, r3.x"]
        );
    }

    #[test]
    fn test_lane_assignment() {
        let mut k = Kernel::begin(KernelConfig::default());
        let v = k.var::<Float4>().unwrap();
        k.assign(v.yw(), [1.0f32, 2.0]).unwrap();
        k.assign(v.z(), 3.0f32).unwrap();
        let program = k.end().unwrap();
        assert_eq!(body(&program), vec!["mov r0._y_w, l0.xxxy", "mov r0.__z_, l1.xxxx"]);
    }

    #[test]
    fn test_untyped_assignment_checks_type() {
        let mut k = Kernel::begin(KernelConfig::default());
        let reg = k.declare(ValueType::INT).unwrap();
        let err = k
            .assign_node(Target::whole(reg, ValueType::INT), Node::literal(ValueType::FLOAT, [0; 4]))
            .unwrap_err();
        assert!(matches!(err, CompileError::TypeMismatch { .. }));
    }

    #[test]
    fn test_argument_and_builtin_operands() {
        let mut k = Kernel::begin(KernelConfig::new(64));
        let _pad = k.arg::<Float4>("centroid").unwrap();
        let scale = k.arg::<Uint>("count").unwrap();
        assert_eq!(scale.to_string(), "cb0[1].x");
        let idx = k.var::<Uint>().unwrap();
        k.assign(idx, abs_thread_id_flat() + scale).unwrap();
        let program = k.end().unwrap();
        assert!(program.lines.contains(&"dcl_cb cb0[2]".to_string()));
        assert_eq!(body(&program), vec!["iadd r1.x, vAbsTidFlat.x, cb0[1].x", "mov r0.x, r1.x"]);
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut first = Kernel::begin(KernelConfig::default());
        let mut second = Kernel::begin(KernelConfig::default());
        first.var_init(7i32).unwrap();
        let v = second.var::<Int>().unwrap();
        assert_eq!(v.reg(), Reg(0));
        assert_eq!(first.end().unwrap().stats.literals, 1);
        assert_eq!(second.end().unwrap().stats.literals, 0);
    }
}
