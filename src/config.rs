//! Kernel compilation settings

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CompileError, CompileResult};

/// Shader profile of the generated program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// `il_cs_2_0`
    Compute,
    /// `il_ps_2_0`
    Pixel,
}

impl Profile {
    pub fn header(self) -> &'static str {
        match self {
            Profile::Compute => "il_cs_2_0",
            Profile::Pixel => "il_ps_2_0",
        }
    }

    pub fn parse(name: &str) -> Option<Profile> {
        match name {
            "compute" | "cs" => Some(Profile::Compute),
            "pixel" | "ps" => Some(Profile::Pixel),
            _ => None,
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Compute => write!(f, "compute"),
            Profile::Pixel => write!(f, "pixel"),
        }
    }
}

/// Configuration of one compilation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Target shader profile
    pub profile: Profile,
    /// Threads per work-group, declared in the header
    pub threads_per_group: u32,
    /// Hardware SIMD width; barriers inside a single wavefront are elided
    pub wavefront_size: u32,
    /// Upper bound on allocated temporary registers
    pub max_registers: u32,
    /// Upper bound on literal pool entries
    pub max_literals: u32,
}

impl KernelConfig {
    pub fn new(threads_per_group: u32) -> Self {
        Self {
            threads_per_group,
            ..Self::default()
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_wavefront(mut self, wavefront_size: u32) -> Self {
        self.wavefront_size = wavefront_size;
        self
    }

    /// Whether a work-group spans more than one wavefront, so that
    /// group-wide synchronization needs a real barrier
    pub fn needs_barrier(&self) -> bool {
        self.threads_per_group > self.wavefront_size
    }

    /// Load from JSON; missing fields take their defaults
    pub fn from_json(text: &str) -> CompileResult<Self> {
        serde_json::from_str(text).map_err(|e| CompileError::codegen(format!("invalid config: {}", e)))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Compute,
            threads_per_group: 64,
            wavefront_size: 64,
            max_registers: 4096,
            max_literals: 1024,
        }
    }
}
