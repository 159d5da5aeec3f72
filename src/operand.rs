//! Operand strings, destination masks and instruction lines

use crate::swizzle::{Lanes, Swizzle};
use crate::types::ValueType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A virtual temporary register `rN`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reg(pub u32);

impl Reg {
    /// The register `n` slots after this one
    pub fn offset(self, n: u32) -> Reg {
        Reg(self.0 + n)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Textual source operand: a base name, the 32-bit lanes it selects and an
/// optional source modifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    base: String,
    lanes: Lanes,
    modifier: Option<String>,
}

impl Operand {
    pub fn register(reg: Reg, ty: ValueType) -> Self {
        Self::named(reg.to_string(), Lanes::identity(ty.lanes()))
    }

    pub fn literal(index: u32, ty: ValueType) -> Self {
        Self::named(format!("l{}", index), Lanes::identity(ty.lanes()))
    }

    pub fn named(base: impl Into<String>, lanes: Lanes) -> Self {
        Self {
            base: base.into(),
            lanes,
            modifier: None,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn lanes(&self) -> &Lanes {
        &self.lanes
    }

    /// Operand after a logical swizzle of a value of type `ty`
    pub fn swizzled(&self, ty: ValueType, swizzle: &Swizzle) -> Operand {
        Operand {
            base: self.base.clone(),
            lanes: swizzle.apply(ty, &self.lanes),
            modifier: self.modifier.clone(),
        }
    }

    /// Logical component `k` of a value of type `ty`
    pub fn component(&self, ty: ValueType, k: u8) -> Operand {
        let width = ty.scalar.lane_width();
        let positions: Vec<u8> = (0..width).map(|part| k * width + part).collect();
        Operand {
            base: self.base.clone(),
            lanes: self.lanes.select(&positions),
            modifier: self.modifier.clone(),
        }
    }

    /// The first selected lane only, as used for scalar indices
    pub fn first_lane(&self) -> Operand {
        Operand {
            base: self.base.clone(),
            lanes: self.lanes.select(&[0]),
            modifier: self.modifier.clone(),
        }
    }

    /// Negated through the `_neg` source modifier
    ///
    /// Doubles keep their sign in the high word, so only the odd lanes of
    /// each double are negated.
    pub fn negated(&self, ty: ValueType) -> Operand {
        let letters = if ty.is_double() {
            ["y", "yw"][ty.component_count() as usize - 1].to_string()
        } else {
            Lanes::identity(self.lanes.len() as u8).suffix()
        };
        Operand {
            base: self.base.clone(),
            lanes: self.lanes,
            modifier: Some(format!("_neg({})", letters)),
        }
    }

    /// Rearranged so that lane `i` lands in the i-th written lane of `dest`
    pub fn aligned_to(&self, dest: &Dest) -> Operand {
        let positions = dest.positions();
        if positions.iter().enumerate().all(|(i, &p)| i as u8 == p) {
            return self.clone();
        }
        let mut items = [self.lanes.as_slice()[0]; 4];
        for (i, &p) in positions.iter().enumerate() {
            items[p as usize] = self.lanes.as_slice()[i.min(self.lanes.len() - 1)];
        }
        Operand {
            base: self.base.clone(),
            lanes: Lanes::from_slice(&items),
            modifier: self.modifier.clone(),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        if !self.lanes.is_full_identity() {
            write!(f, ".{}", self.lanes)?;
        }
        if let Some(modifier) = &self.modifier {
            write!(f, "{}", modifier)?;
        }
        Ok(())
    }
}

/// Destination operand with a write mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dest {
    base: String,
    mask: [bool; 4],
    positional: bool,
}

impl Dest {
    /// All lanes a value of type `ty` occupies
    pub fn register(reg: Reg, ty: ValueType) -> Self {
        Self::with_lanes(reg.to_string(), &Lanes::identity(ty.lanes()))
    }

    /// The lanes of logical component `k` of a value of type `ty`
    pub fn component(reg: Reg, ty: ValueType, k: u8) -> Self {
        let width = ty.scalar.lane_width();
        let lanes: Vec<u8> = (0..width).map(|part| k * width + part).collect();
        Self::with_lanes(reg.to_string(), &Lanes::from_slice(&lanes))
    }

    /// Explicit lane positions of `base`
    pub fn with_lanes(base: impl Into<String>, lanes: &Lanes) -> Self {
        let mut mask = [false; 4];
        for &lane in lanes.as_slice() {
            mask[lane as usize] = true;
        }
        Self {
            base: base.into(),
            mask,
            positional: false,
        }
    }

    /// The `mem` destination of memory stores, always written positionally
    pub fn memory(ty: ValueType) -> Self {
        Self {
            positional: true,
            ..Self::with_lanes("mem", &Lanes::identity(ty.lanes()))
        }
    }

    /// Written lane positions in ascending order
    pub fn positions(&self) -> Vec<u8> {
        (0..4u8).filter(|&i| self.mask[i as usize]).collect()
    }
}

impl fmt::Display for Dest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        let positions = self.positions();
        if self.mask == [true; 4] && !self.positional {
            return Ok(());
        }
        let prefix = positions.iter().enumerate().all(|(i, &p)| i as u8 == p);
        if prefix && !self.positional {
            let letters: String = positions.iter().map(|&p| ['x', 'y', 'z', 'w'][p as usize]).collect();
            write!(f, ".{}", letters)
        } else {
            let letters: String = (0..4)
                .map(|i| if self.mask[i] { ['x', 'y', 'z', 'w'][i] } else { '_' })
                .collect();
            write!(f, ".{}", letters)
        }
    }
}

/// One line of IL: an opcode with its operands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: String,
    pub operands: Vec<String>,
}

impl Instruction {
    pub fn new(opcode: impl Into<String>) -> Self {
        Self {
            opcode: opcode.into(),
            operands: Vec::new(),
        }
    }

    /// Append an operand (destination first, then sources)
    pub fn arg(mut self, operand: impl fmt::Display) -> Self {
        self.operands.push(operand.to_string());
        self
    }

    pub fn args<I, D>(mut self, operands: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: fmt::Display,
    {
        self.operands.extend(operands.into_iter().map(|o| o.to_string()));
        self
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        if !self.operands.is_empty() {
            write!(f, " {}", self.operands.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_rendering() {
        assert_eq!(Operand::register(Reg(3), ValueType::FLOAT4).to_string(), "r3");
        assert_eq!(Operand::register(Reg(3), ValueType::FLOAT).to_string(), "r3.x");
        assert_eq!(Operand::literal(0, ValueType::DOUBLE).to_string(), "l0.xy");
        let swz = Swizzle::parse("wzyx").unwrap();
        let op = Operand::register(Reg(1), ValueType::INT4).swizzled(ValueType::INT4, &swz);
        assert_eq!(op.to_string(), "r1.wzyx");
    }

    #[test]
    fn test_components() {
        let op = Operand::register(Reg(2), ValueType::DOUBLE2);
        assert_eq!(op.component(ValueType::DOUBLE2, 1).to_string(), "r2.zw");
        let op = Operand::register(Reg(2), ValueType::FLOAT4);
        assert_eq!(op.component(ValueType::FLOAT4, 2).to_string(), "r2.z");
    }

    #[test]
    fn test_negation_modifier() {
        let op = Operand::register(Reg(4), ValueType::DOUBLE2);
        assert_eq!(op.negated(ValueType::DOUBLE2).to_string(), "r4_neg(yw)");
        let op = Operand::register(Reg(4), ValueType::FLOAT2);
        assert_eq!(op.negated(ValueType::FLOAT2).to_string(), "r4.xy_neg(xy)");
    }

    #[test]
    fn test_dest_masks() {
        assert_eq!(Dest::register(Reg(5), ValueType::FLOAT4).to_string(), "r5");
        assert_eq!(Dest::register(Reg(5), ValueType::FLOAT2).to_string(), "r5.xy");
        assert_eq!(Dest::component(Reg(5), ValueType::FLOAT4, 1).to_string(), "r5._y__");
        assert_eq!(Dest::component(Reg(5), ValueType::DOUBLE2, 1).to_string(), "r5.__zw");
        assert_eq!(Dest::memory(ValueType::FLOAT).to_string(), "mem.x___");
        assert_eq!(Dest::memory(ValueType::FLOAT4).to_string(), "mem.xyzw");
    }

    #[test]
    fn test_alignment_to_sparse_mask() {
        let dest = Dest::with_lanes("r1", &Lanes::from_slice(&[1, 3]));
        let src = Operand::register(Reg(5), ValueType::FLOAT2);
        assert_eq!(src.aligned_to(&dest).to_string(), "r5.xxxy");
        let dest = Dest::register(Reg(1), ValueType::FLOAT2);
        assert_eq!(src.aligned_to(&dest).to_string(), "r5.xy");
    }

    #[test]
    fn test_instruction_display() {
        let inst = Instruction::new("iadd").arg("r2.x").args(["r0.x", "l0.x"]);
        assert_eq!(inst.to_string(), "iadd r2.x, r0.x, l0.x");
        assert_eq!(Instruction::new("endloop").to_string(), "endloop");
    }
}
