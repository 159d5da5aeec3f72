//! Source buffer of one compilation session
//!
//! Collects the instruction text of the main body and of every function,
//! hands out temporary registers from a single monotonic counter, keeps
//! the deduplicated literal pool and tracks the stack of open blocks so
//! that every construct is closed by its own kind.

use std::collections::HashMap;

use crate::config::KernelConfig;
use crate::error::{CompileError, CompileResult};
use crate::operand::{Instruction, Operand, Reg};
use crate::program::{Declarations, IlProgram, ProgramStats};
use crate::types::ValueType;

/// Deduplicated table of 4-lane literal constants (`lN`)
#[derive(Debug, Clone)]
pub struct LiteralPool {
    values: Vec<[u32; 4]>,
    index: HashMap<[u32; 4], u32>,
    limit: u32,
}

impl LiteralPool {
    pub fn new(limit: u32) -> Self {
        Self {
            values: Vec::new(),
            index: HashMap::new(),
            limit,
        }
    }

    /// Index of the entry holding `bits`, adding it if it is new
    pub fn intern(&mut self, bits: [u32; 4]) -> CompileResult<u32> {
        if let Some(&index) = self.index.get(&bits) {
            return Ok(index);
        }
        let index = self.values.len() as u32;
        if index >= self.limit {
            return Err(CompileError::LiteralOverflow { limit: self.limit });
        }
        self.values.push(bits);
        self.index.insert(bits, index);
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `dcl_literal` lines in index order
    pub fn declarations(&self) -> Vec<String> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                format!(
                    "dcl_literal l{}, 0x{:08X}, 0x{:08X}, 0x{:08X}, 0x{:08X}",
                    i, v[0], v[1], v[2], v[3]
                )
            })
            .collect()
    }
}

/// Kind of an open block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    If,
    Else,
    Loop,
}

#[derive(Debug)]
struct Section {
    function: Option<u32>,
    lines: Vec<String>,
    blocks: Vec<BlockKind>,
}

impl Section {
    fn new(function: Option<u32>) -> Self {
        Self {
            function,
            lines: Vec::new(),
            blocks: Vec::new(),
        }
    }
}

/// The instruction buffer
#[derive(Debug)]
pub struct Source {
    config: KernelConfig,
    /// Main body first, then functions currently being defined
    sections: Vec<Section>,
    functions: Vec<Section>,
    literals: LiteralPool,
    declarations: Declarations,
    next_reg: u32,
    instructions: usize,
}

impl Source {
    pub fn new(config: KernelConfig) -> Self {
        let literals = LiteralPool::new(config.max_literals);
        Self {
            config,
            sections: vec![Section::new(None)],
            functions: Vec::new(),
            literals,
            declarations: Declarations::default(),
            next_reg: 0,
            instructions: 0,
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn declarations(&self) -> &Declarations {
        &self.declarations
    }

    pub fn declarations_mut(&mut self) -> &mut Declarations {
        &mut self.declarations
    }

    pub fn literals_mut(&mut self) -> &mut LiteralPool {
        &mut self.literals
    }

    /// Reserve `count` consecutive registers and return the first
    pub fn alloc_regs(&mut self, count: u32) -> CompileResult<Reg> {
        let base = Reg(self.next_reg);
        let limit = self.config.max_registers;
        match self.next_reg.checked_add(count) {
            Some(next) if next <= limit => {
                self.next_reg = next;
                Ok(base)
            }
            _ => Err(CompileError::RegisterOverflow { limit }),
        }
    }

    pub fn alloc_reg(&mut self) -> CompileResult<Reg> {
        self.alloc_regs(1)
    }

    /// Registers handed out so far
    pub fn registers_used(&self) -> u32 {
        self.next_reg
    }

    /// Literal operand of type `ty` holding `bits`
    pub fn literal(&mut self, bits: [u32; 4], ty: ValueType) -> CompileResult<Operand> {
        let index = self.literals.intern(bits)?;
        Ok(Operand::literal(index, ty))
    }

    fn current(&mut self) -> &mut Section {
        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }

    pub fn emit(&mut self, inst: Instruction) {
        log::trace!("{}", inst);
        self.instructions += 1;
        self.current().lines.push(inst.to_string());
    }

    pub fn emit_all(&mut self, insts: impl IntoIterator<Item = Instruction>) {
        for inst in insts {
            self.emit(inst);
        }
    }

    /// Emit the opening instruction of a block and push it
    pub fn open_block(&mut self, kind: BlockKind, inst: Instruction) {
        self.emit(inst);
        self.current().blocks.push(kind);
    }

    /// Pop the innermost block, which must be of kind `kind`, and emit the
    /// closing instruction
    pub fn close_block(&mut self, kind: BlockKind, inst: Instruction) -> CompileResult<()> {
        match self.current().blocks.pop() {
            Some(open) if open == kind => {
                self.emit(inst);
                Ok(())
            }
            Some(open) => Err(CompileError::structure(format!(
                "closing {:?} while {:?} is open",
                kind, open
            ))),
            None => Err(CompileError::structure(format!("closing {:?} with no open block", kind))),
        }
    }

    /// Turn the innermost `if` into its `else` half
    pub fn switch_to_else(&mut self) -> CompileResult<()> {
        let blocks = &mut self.current().blocks;
        if blocks.last() != Some(&BlockKind::If) {
            return Err(CompileError::structure("else without an open if"));
        }
        blocks.pop();
        blocks.push(BlockKind::Else);
        self.emit(Instruction::new("else"));
        Ok(())
    }

    /// Whether the current section is inside a loop
    pub fn in_loop(&self) -> bool {
        self.sections
            .last()
            .map(|s| s.blocks.contains(&BlockKind::Loop))
            .unwrap_or(false)
    }

    /// Start emitting the body of function `id` into its own section
    pub fn begin_function(&mut self, id: u32) {
        let mut section = Section::new(Some(id));
        section.lines.push(format!("func {}", id));
        self.sections.push(section);
    }

    pub fn end_function(&mut self) -> CompileResult<()> {
        if self.sections.len() < 2 {
            return Err(CompileError::structure("no function is being defined"));
        }
        let mut section = match self.sections.pop() {
            Some(section) => section,
            None => return Err(CompileError::structure("no function is being defined")),
        };
        if let Some(open) = section.blocks.last() {
            return Err(CompileError::structure(format!("function ends inside {:?}", open)));
        }
        section.lines.push("ret_dyn".to_string());
        section.lines.push("endfunc".to_string());
        self.instructions += 2;
        self.functions.push(section);
        Ok(())
    }

    /// Assemble the finished program
    pub fn finish(self) -> CompileResult<IlProgram> {
        if self.sections.len() != 1 {
            return Err(CompileError::structure("kernel ended inside a function body"));
        }
        let main = &self.sections[0];
        if let Some(open) = main.blocks.last() {
            return Err(CompileError::structure(format!("kernel ended inside {:?}", open)));
        }

        let mut lines = self.declarations.header(&self.config);
        lines.extend(self.literals.declarations());
        lines.extend(main.lines.iter().cloned());
        let mut functions = self.functions;
        functions.sort_by_key(|f| f.function);
        if !functions.is_empty() {
            lines.push("endmain".to_string());
            for function in &functions {
                lines.extend(function.lines.iter().cloned());
            }
        }
        lines.push("end".to_string());

        let stats = ProgramStats {
            instructions: self.instructions,
            registers: self.next_reg,
            literals: self.literals.len(),
            functions: functions.len(),
        };
        log::debug!(
            "kernel finished: {} instructions, {} registers, {} literals",
            stats.instructions,
            stats.registers,
            stats.literals
        );
        Ok(IlProgram {
            config: self.config,
            lines,
            declarations: self.declarations,
            stats,
        })
    }
}
