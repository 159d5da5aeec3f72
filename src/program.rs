//! Compiled program and its declaration registry
//!
//! The registry records every resource a kernel touched while it was being
//! built: sampled inputs, unordered-access views, local data store,
//! indexed register arrays and the constant-buffer layout of kernel
//! arguments. The header lines of the IL text are generated from it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{KernelConfig, Profile};
use crate::error::{CompileError, CompileResult};
use crate::types::ValueType;

/// Bytes in one constant-buffer register
pub const CB_REGISTER_BYTES: u32 = 16;

/// Dimensionality of a sampled input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceDim {
    OneD,
    TwoD,
}

impl ResourceDim {
    pub fn name(self) -> &'static str {
        match self {
            ResourceDim::OneD => "1d",
            ResourceDim::TwoD => "2d",
        }
    }

    /// Number of index components
    pub fn rank(self) -> u8 {
        match self {
            ResourceDim::OneD => 1,
            ResourceDim::TwoD => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDecl {
    pub slot: u32,
    pub dim: ResourceDim,
    pub element: ValueType,
}

/// Addressing flavor of an unordered-access view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UavKind {
    /// Byte addressed
    Raw,
    /// Element index plus byte offset within the element
    Structured,
    /// Element index into a formatted buffer
    Typed,
}

impl UavKind {
    pub fn parse(name: &str) -> Option<UavKind> {
        match name {
            "raw" => Some(UavKind::Raw),
            "struct" | "structured" => Some(UavKind::Structured),
            "typed" => Some(UavKind::Typed),
            _ => None,
        }
    }
}

/// Load cache hint of an unordered-access view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheMode {
    #[default]
    Auto,
    Cached,
    Uncached,
}

impl CacheMode {
    /// Opcode suffix
    pub fn suffix(self) -> &'static str {
        match self {
            CacheMode::Auto => "",
            CacheMode::Cached => "_cached",
            CacheMode::Uncached => "_uncached",
        }
    }

    pub fn parse(name: &str) -> Option<CacheMode> {
        match name {
            "auto" => Some(CacheMode::Auto),
            "cached" => Some(CacheMode::Cached),
            "uncached" => Some(CacheMode::Uncached),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UavDecl {
    pub id: u32,
    pub kind: UavKind,
    pub element: ValueType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LdsDecl {
    pub id: u32,
    pub element: ValueType,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDecl {
    pub id: u32,
    pub element: ValueType,
    pub len: u32,
}

/// Placement of one kernel argument in the constant buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgLayout {
    pub name: String,
    pub ty: ValueType,
    /// Constant buffer number
    pub cb: u32,
    /// Register within the buffer
    pub index: u32,
    /// First 32-bit component within the register
    pub component: u8,
    pub byte_offset: u32,
    pub size: u32,
}

/// Everything a kernel declared
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Declarations {
    pub resources: Vec<ResourceDecl>,
    pub uavs: Vec<UavDecl>,
    pub lds: Vec<LdsDecl>,
    pub indexed: Vec<IndexedDecl>,
    pub args: Vec<ArgLayout>,
    /// Bytes of constant buffer used by arguments
    pub cb_size: u32,
}

impl Declarations {
    pub fn declare_resource(&mut self, slot: u32, dim: ResourceDim, element: ValueType) -> CompileResult<()> {
        if self.resources.iter().any(|r| r.slot == slot) {
            return Err(CompileError::duplicate(format!("resource {}", slot)));
        }
        self.resources.push(ResourceDecl { slot, dim, element });
        Ok(())
    }

    pub fn declare_uav(&mut self, id: u32, kind: UavKind, element: ValueType) -> CompileResult<()> {
        if self.uavs.iter().any(|u| u.id == id) {
            return Err(CompileError::duplicate(format!("uav {}", id)));
        }
        self.uavs.push(UavDecl { id, kind, element });
        Ok(())
    }

    pub fn declare_lds(&mut self, id: u32, element: ValueType, count: u32) -> CompileResult<()> {
        if self.lds.iter().any(|l| l.id == id) {
            return Err(CompileError::duplicate(format!("lds {}", id)));
        }
        self.lds.push(LdsDecl { id, element, count });
        Ok(())
    }

    pub fn declare_indexed(&mut self, id: u32, element: ValueType, len: u32) -> CompileResult<()> {
        if self.indexed.iter().any(|x| x.id == id) {
            return Err(CompileError::duplicate(format!("x{}", id)));
        }
        self.indexed.push(IndexedDecl { id, element, len });
        Ok(())
    }

    /// Lay out an argument after the previous ones, aligned to its own size
    pub fn declare_arg(&mut self, name: &str, ty: ValueType) -> CompileResult<ArgLayout> {
        if self.arg(name).is_some() {
            return Err(CompileError::duplicate(name));
        }
        let size = ty.byte_size();
        let byte_offset = self.cb_size.div_ceil(size) * size;
        let layout = ArgLayout {
            name: name.to_string(),
            ty,
            cb: 0,
            index: byte_offset / CB_REGISTER_BYTES,
            component: ((byte_offset % CB_REGISTER_BYTES) / 4) as u8,
            byte_offset,
            size,
        };
        self.cb_size = byte_offset + size;
        self.args.push(layout.clone());
        Ok(layout)
    }

    pub fn arg(&self, name: &str) -> Option<&ArgLayout> {
        self.args.iter().find(|a| a.name == name)
    }

    /// Constant-buffer registers covering every argument
    pub fn cb_registers(&self) -> u32 {
        self.cb_size.div_ceil(CB_REGISTER_BYTES)
    }

    /// Header lines in declaration order, before literals
    pub fn header(&self, config: &KernelConfig) -> Vec<String> {
        let mut lines = vec![config.profile.header().to_string()];
        if !self.args.is_empty() {
            lines.push(format!("dcl_cb cb0[{}]", self.cb_registers()));
        }
        if config.profile == Profile::Compute {
            lines.push(format!("dcl_num_thread_per_group {}", config.threads_per_group));
        }
        for lds in &self.lds {
            lines.push(format!(
                "dcl_struct_lds_id({}) {},{}",
                lds.id,
                lds.element.byte_size(),
                lds.count
            ));
        }
        for array in &self.indexed {
            lines.push(format!("dcl_indexed_temp_array x{}[{}]", array.id, array.len));
        }
        for res in &self.resources {
            let fmt = res.element.scalar.format_name();
            lines.push(format!(
                "dcl_resource_id({})_type({},unnorm)_fmtx({})_fmty({})_fmtz({})_fmtw({})",
                res.slot,
                res.dim.name(),
                fmt,
                fmt,
                fmt,
                fmt
            ));
        }
        for uav in &self.uavs {
            lines.push(match uav.kind {
                UavKind::Raw => format!("dcl_raw_uav_id({})", uav.id),
                UavKind::Structured => format!("dcl_struct_uav_id({}) {}", uav.id, uav.element.byte_size()),
                UavKind::Typed => format!(
                    "dcl_typed_uav_id({})_type(buffer)_fmtx({})",
                    uav.id,
                    uav.element.scalar.format_name()
                ),
            });
        }
        lines
    }
}

/// Size of a compiled program
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramStats {
    pub instructions: usize,
    pub registers: u32,
    pub literals: usize,
    pub functions: usize,
}

/// A complete IL program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IlProgram {
    pub config: KernelConfig,
    /// Every line of the program text, header to `end`
    pub lines: Vec<String>,
    pub declarations: Declarations,
    pub stats: ProgramStats,
}

impl IlProgram {
    /// Number of lines whose opcode is exactly `opcode`
    pub fn count_opcode(&self, opcode: &str) -> usize {
        self.lines
            .iter()
            .filter(|line| line.split_whitespace().next() == Some(opcode))
            .count()
    }

    /// Export to JSON format
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "IL Program Summary:\n\
             ===================\n\
             Profile: {} ({} threads per group, wavefront {})\n\
             Instructions: {}\n\
             Registers: {}\n\
             Literals: {}\n\
             Functions: {}\n\
             Arguments: {} ({} cb registers)\n\
             Resources: {} inputs, {} uavs, {} lds, {} indexed arrays\n",
            self.config.profile,
            self.config.threads_per_group,
            self.config.wavefront_size,
            self.stats.instructions,
            self.stats.registers,
            self.stats.literals,
            self.stats.functions,
            self.declarations.args.len(),
            self.declarations.cb_registers(),
            self.declarations.resources.len(),
            self.declarations.uavs.len(),
            self.declarations.lds.len(),
            self.declarations.indexed.len(),
        )
    }
}

impl fmt::Display for IlProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_layout() {
        let mut decls = Declarations::default();
        let a = decls.declare_arg("a", ValueType::FLOAT4).unwrap();
        let b = decls.declare_arg("b", ValueType::FLOAT).unwrap();
        let c = decls.declare_arg("c", ValueType::DOUBLE).unwrap();
        assert_eq!((a.index, a.component, a.byte_offset), (0, 0, 0));
        assert_eq!((b.index, b.component, b.byte_offset, b.size), (1, 0, 16, 4));
        assert_eq!((c.index, c.component, c.byte_offset), (1, 2, 24));
        assert_eq!(decls.cb_registers(), 2);
        assert!(decls.declare_arg("a", ValueType::INT).is_err());
    }

    #[test]
    fn test_header_order() {
        let mut decls = Declarations::default();
        decls.declare_arg("k", ValueType::UINT).unwrap();
        decls.declare_lds(0, ValueType::FLOAT4, 128).unwrap();
        decls.declare_uav(1, UavKind::Structured, ValueType::FLOAT2).unwrap();
        let header = decls.header(&KernelConfig::new(128));
        assert_eq!(
            header,
            vec![
                "il_cs_2_0",
                "dcl_cb cb0[1]",
                "dcl_num_thread_per_group 128",
                "dcl_struct_lds_id(0) 16,128",
                "dcl_struct_uav_id(1) 8",
            ]
        );
        assert!(decls.declare_lds(0, ValueType::INT, 4).is_err());
    }

    #[test]
    fn test_cache_suffix() {
        assert_eq!(CacheMode::Auto.suffix(), "");
        assert_eq!(CacheMode::parse("uncached").unwrap().suffix(), "_uncached");
    }
}
