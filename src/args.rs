//! Host image of the argument constant buffer
//!
//! Arguments are written into a byte image laid out exactly as the kernel
//! declared them. Only arguments whose bytes actually changed are copied
//! into the mapped buffer on the next [`ArgumentBuffer::prepare`].

use std::ops::Range;

use bytemuck::Pod;

use crate::error::{CompileError, CompileResult};
use crate::program::{ArgLayout, Declarations, IlProgram, CB_REGISTER_BYTES};

#[derive(Debug, Clone)]
pub struct ArgumentBuffer {
    layouts: Vec<ArgLayout>,
    image: Vec<u8>,
    dirty: Vec<bool>,
    uploaded: bool,
}

impl ArgumentBuffer {
    pub fn new(program: &IlProgram) -> Self {
        Self::from_declarations(&program.declarations)
    }

    pub fn from_declarations(declarations: &Declarations) -> Self {
        let size = (declarations.cb_registers() * CB_REGISTER_BYTES) as usize;
        Self {
            layouts: declarations.args.clone(),
            image: vec![0; size],
            dirty: vec![false; declarations.args.len()],
            uploaded: false,
        }
    }

    fn range(layout: &ArgLayout) -> Range<usize> {
        let start = layout.byte_offset as usize;
        start..start + layout.size as usize
    }

    /// Write argument `name`; returns whether its bytes changed
    pub fn set<V: Pod>(&mut self, name: &str, value: V) -> CompileResult<bool> {
        let index = self
            .layouts
            .iter()
            .position(|l| l.name == name)
            .ok_or_else(|| CompileError::binding(format!("unknown argument `{}`", name)))?;
        let layout = &self.layouts[index];
        let bytes = bytemuck::bytes_of(&value);
        if bytes.len() != layout.size as usize {
            return Err(CompileError::binding(format!(
                "argument `{}` of type {} takes {} bytes, got {}",
                name,
                layout.ty,
                layout.size,
                bytes.len()
            )));
        }
        let range = Self::range(layout);
        if self.image[range.clone()] == *bytes {
            return Ok(false);
        }
        self.image[range].copy_from_slice(bytes);
        self.dirty[index] = true;
        Ok(true)
    }

    /// Current bytes of argument `name`
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.layouts
            .iter()
            .find(|l| l.name == name)
            .map(|l| &self.image[Self::range(l)])
    }

    pub fn bytes(&self) -> &[u8] {
        &self.image
    }

    /// Whether the next `prepare` copies anything
    pub fn is_dirty(&self) -> bool {
        !self.uploaded || self.dirty.iter().any(|&d| d)
    }

    /// Copy pending changes into `mapped` and return the byte ranges
    /// written. The first call copies the whole image.
    pub fn prepare(&mut self, mapped: &mut [u8]) -> CompileResult<Vec<Range<usize>>> {
        if mapped.len() < self.image.len() {
            return Err(CompileError::binding(format!(
                "mapped constant buffer holds {} bytes, arguments need {}",
                mapped.len(),
                self.image.len()
            )));
        }
        let mut copied = Vec::new();
        if !self.uploaded {
            mapped[..self.image.len()].copy_from_slice(&self.image);
            copied.push(0..self.image.len());
            self.uploaded = true;
        } else {
            for (layout, dirty) in self.layouts.iter().zip(&self.dirty) {
                if *dirty {
                    let range = Self::range(layout);
                    mapped[range.clone()].copy_from_slice(&self.image[range.clone()]);
                    copied.push(range);
                }
            }
        }
        self.dirty.iter_mut().for_each(|d| *d = false);
        log::trace!("argument upload copied {:?}", copied);
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueType;
    use bytemuck::{Pod, Zeroable};

    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Centroid {
        position: [f32; 4],
    }

    fn declarations() -> Declarations {
        let mut decls = Declarations::default();
        decls.declare_arg("centroid", ValueType::FLOAT4).unwrap();
        decls.declare_arg("count", ValueType::UINT).unwrap();
        decls.declare_arg("scale", ValueType::DOUBLE).unwrap();
        decls
    }

    #[test]
    fn test_only_changed_bytes_are_copied() {
        let mut args = ArgumentBuffer::from_declarations(&declarations());
        let mut mapped = vec![0xffu8; 32];
        assert_eq!(args.prepare(&mut mapped).unwrap(), vec![0..32]);
        assert!(!args.is_dirty());

        assert!(args.set("count", 5u32).unwrap());
        assert_eq!(args.prepare(&mut mapped).unwrap(), vec![16..20]);
        assert_eq!(&mapped[16..20], &5u32.to_ne_bytes());

        assert!(!args.set("count", 5u32).unwrap());
        assert!(args.prepare(&mut mapped).unwrap().is_empty());
    }

    #[test]
    fn test_pod_structs_and_alignment() {
        let mut args = ArgumentBuffer::from_declarations(&declarations());
        let centroid = Centroid {
            position: [1.0, 2.0, 3.0, 4.0],
        };
        args.set("centroid", centroid).unwrap();
        args.set("scale", 0.5f64).unwrap();
        assert_eq!(args.get("scale").unwrap(), &0.5f64.to_ne_bytes());
        assert_eq!(bytemuck::pod_read_unaligned::<Centroid>(&args.bytes()[..16]), centroid);
    }

    #[test]
    fn test_binding_errors() {
        let mut args = ArgumentBuffer::from_declarations(&declarations());
        assert!(matches!(args.set("missing", 1u32), Err(CompileError::Binding { .. })));
        assert!(matches!(args.set("count", 1u64), Err(CompileError::Binding { .. })));
        let mut small = vec![0u8; 8];
        assert!(args.prepare(&mut small).is_err());
    }
}
