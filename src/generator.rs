//! Per-mode temperature synthesis
//!
//! The generator is a pure function of the current mode and a pre-drawn
//! jitter value. The jitter is drawn by the driver thread *before* the
//! device lock is taken, so resolving a tick's temperature inside the
//! critical section is plain arithmetic, with no RNG and no allocation.
//!
//! Modes:
//! - **Normal**: base value plus small symmetric jitter
//! - **Noisy**: same base, jitter amplitude multiplied 5×
//! - **Ramp**: a persistent value that climbs by a fixed step each tick and
//!   wraps from the ceiling back to the floor, plus half-amplitude jitter

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::error::SimTempError;

/// Baseline temperature for the jittered modes, in milli-degrees Celsius
pub const NORMAL_BASE_MC: i32 = 25_000;
/// Symmetric jitter amplitude, in milli-degrees Celsius
pub const JITTER_AMPLITUDE_MC: i32 = 500;
/// Jitter multiplier applied in noisy mode
pub const NOISY_MULTIPLIER: i32 = 5;
/// Ramp wraps back to this floor after exceeding the ceiling
pub const RAMP_FLOOR_MC: i32 = 20_000;
/// Upper bound of the ramp before wraparound
pub const RAMP_CEILING_MC: i32 = 80_000;
/// Ramp increment per tick
pub const RAMP_STEP_MC: i32 = 1_000;

/// Generator mode; `Ramp` carries its own persistent state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    Normal,
    Noisy,
    Ramp {
        /// Current ramp position in milli-degrees Celsius; advances every
        /// tick and wraps at `RAMP_CEILING_MC`
        value_mc: i32,
    },
}

impl SampleMode {
    /// Attribute-interface name of this mode
    pub fn name(&self) -> &'static str {
        match self {
            SampleMode::Normal => "normal",
            SampleMode::Noisy => "noisy",
            SampleMode::Ramp { .. } => "ramp",
        }
    }
}

impl fmt::Display for SampleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleMode {
    type Err = SimTempError;

    /// Parse an attribute-interface mode name; a fresh `ramp` starts at the
    /// floor value
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "normal" => Ok(SampleMode::Normal),
            "noisy" => Ok(SampleMode::Noisy),
            "ramp" => Ok(SampleMode::Ramp {
                value_mc: RAMP_FLOOR_MC,
            }),
            other => Err(SimTempError::InvalidArgument(format!(
                "unknown mode '{other}'"
            ))),
        }
    }
}

/// Draw one tick's raw jitter, uniform in `[-JITTER_AMPLITUDE_MC, +JITTER_AMPLITUDE_MC]`
pub fn draw_jitter_mc<R: Rng>(rng: &mut R) -> i32 {
    rng.gen_range(-JITTER_AMPLITUDE_MC..=JITTER_AMPLITUDE_MC)
}

/// Resolve one tick's temperature for the given mode and pre-drawn jitter
///
/// Mutates the ramp position in `Ramp` mode; the other modes leave the mode
/// untouched. Deterministic given `jitter_mc`.
pub fn next_temp_mc(mode: &mut SampleMode, jitter_mc: i32) -> i32 {
    match mode {
        SampleMode::Normal => NORMAL_BASE_MC + jitter_mc,
        SampleMode::Noisy => NORMAL_BASE_MC + jitter_mc * NOISY_MULTIPLIER,
        SampleMode::Ramp { value_mc } => {
            *value_mc += RAMP_STEP_MC;
            if *value_mc > RAMP_CEILING_MC {
                *value_mc = RAMP_FLOOR_MC;
            }
            *value_mc + jitter_mc / 2
        }
    }
}
