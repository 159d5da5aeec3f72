//! Swizzle engine
//!
//! A [`Swizzle`] is a list of one to four logical lane selectors over a value
//! type. Resolving it against a source type yields the narrowed or widened
//! result type; applying it to the 32-bit [`Lanes`] an operand currently
//! selects yields the operand's new lane selection. Doubles occupy two
//! 32-bit lanes each, so logical lane `k` of a double vector maps to the
//! register lanes `2k` and `2k + 1`.

use crate::error::{CompileError, CompileResult};
use crate::types::ValueType;
use std::fmt;

/// A logical lane selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    X,
    Y,
    Z,
    W,
}

impl Lane {
    pub const ALL: [Lane; 4] = [Lane::X, Lane::Y, Lane::Z, Lane::W];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn letter(self) -> char {
        ['x', 'y', 'z', 'w'][self as usize]
    }

    pub fn from_index(index: u8) -> Option<Lane> {
        Lane::ALL.get(index as usize).copied()
    }

    pub fn from_char(c: char) -> Option<Lane> {
        match c {
            'x' => Some(Lane::X),
            'y' => Some(Lane::Y),
            'z' => Some(Lane::Z),
            'w' => Some(Lane::W),
            _ => None,
        }
    }
}

/// A selection of one to four 32-bit register lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lanes {
    items: [u8; 4],
    len: u8,
}

impl Lanes {
    /// The first `count` lanes in order
    pub fn identity(count: u8) -> Self {
        Self {
            items: [0, 1, 2, 3],
            len: count.clamp(1, 4),
        }
    }

    pub(crate) fn from_slice(lanes: &[u8]) -> Self {
        debug_assert!((1..=4).contains(&lanes.len()));
        let mut items = [0u8; 4];
        for (slot, lane) in items.iter_mut().zip(lanes) {
            *slot = *lane;
        }
        Self {
            items,
            len: lanes.len() as u8,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.items[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True for `xyzw` in order, which needs no suffix
    pub fn is_full_identity(&self) -> bool {
        self.as_slice() == [0, 1, 2, 3]
    }

    /// Pick positions of this selection
    pub fn select(&self, positions: &[u8]) -> Lanes {
        let picked: Vec<u8> = positions.iter().map(|&p| self.items[p as usize]).collect();
        Lanes::from_slice(&picked)
    }

    /// Swizzle suffix letters, e.g. `xy`
    pub fn suffix(&self) -> String {
        self.as_slice()
            .iter()
            .map(|&lane| ['x', 'y', 'z', 'w'][lane as usize])
            .collect()
    }
}

impl fmt::Display for Lanes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.suffix())
    }
}

/// Ordered logical lane selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Swizzle {
    selectors: [Lane; 4],
    len: u8,
}

impl Swizzle {
    pub fn new(selectors: &[Lane]) -> CompileResult<Self> {
        if selectors.is_empty() || selectors.len() > 4 {
            let text: String = selectors.iter().map(|l| l.letter()).collect();
            return Err(CompileError::invalid_swizzle(text, "any type"));
        }
        let mut items = [Lane::X; 4];
        items[..selectors.len()].copy_from_slice(selectors);
        Ok(Self {
            selectors: items,
            len: selectors.len() as u8,
        })
    }

    /// Selectors already known to be one to four long
    pub(crate) fn from_lanes(selectors: &[Lane]) -> Self {
        debug_assert!((1..=4).contains(&selectors.len()));
        let len = selectors.len().min(4);
        let mut items = [Lane::X; 4];
        items[..len].copy_from_slice(&selectors[..len]);
        Self {
            selectors: items,
            len: len as u8,
        }
    }

    /// Parse selector letters such as `xy` or `wzyx`
    pub fn parse(text: &str) -> CompileResult<Self> {
        let lanes: Option<Vec<Lane>> = text.chars().map(Lane::from_char).collect();
        match lanes {
            Some(lanes) => Swizzle::new(&lanes),
            None => Err(CompileError::invalid_swizzle(text, "any type")),
        }
    }

    pub fn selectors(&self) -> &[Lane] {
        &self.selectors[..self.len as usize]
    }

    /// Result type of applying this swizzle to `source`
    ///
    /// One selector gives the component type, two a 2-wide type, three or
    /// four a 4-wide type (the fourth lane of a 3-selector swizzle repeats
    /// the third).
    pub fn result_type(&self, source: ValueType) -> CompileResult<ValueType> {
        let out_of_range = self
            .selectors()
            .iter()
            .any(|lane| lane.index() >= source.component_count());
        let count = match self.len {
            1 => 1,
            2 => 2,
            _ => 4,
        };
        match source.with_count(count) {
            Some(ty) if !out_of_range => Ok(ty),
            _ => Err(CompileError::invalid_swizzle(self.to_string(), source)),
        }
    }

    /// Selectors padded to the width of the result type
    fn padded(&self) -> Vec<Lane> {
        let mut lanes = self.selectors().to_vec();
        if lanes.len() == 3 {
            lanes.push(lanes[2]);
        }
        lanes
    }

    /// New 32-bit lane selection after applying this swizzle to an operand
    /// of type `source` that currently selects `lanes`
    pub fn apply(&self, source: ValueType, lanes: &Lanes) -> Lanes {
        let width = source.scalar.lane_width();
        let positions: Vec<u8> = self
            .padded()
            .iter()
            .flat_map(|lane| (0..width).map(move |part| lane.index() * width + part))
            .collect();
        lanes.select(&positions)
    }

    /// Resolve against `source`: result type and suffix text
    pub fn resolve(&self, source: ValueType) -> CompileResult<(ValueType, String)> {
        let ty = self.result_type(source)?;
        let lanes = self.apply(source, &Lanes::identity(source.lanes()));
        Ok((ty, lanes.suffix()))
    }
}

impl fmt::Display for Swizzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for lane in self.selectors() {
            write!(f, "{}", lane.letter())?;
        }
        Ok(())
    }
}
