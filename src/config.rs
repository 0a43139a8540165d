//! Sampling configuration: period bounds, defaults, and the packed control
//! struct accepted by the device node's configuration operation
//!
//! The control operation takes both fields in one request so that the period
//! and the threshold are always updated together; see
//! [`SimTempDevice::set_config`](crate::device::SimTempDevice::set_config).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimTempError};

/// Smallest accepted sampling period, in milliseconds
pub const MIN_SAMPLING_MS: u32 = 10;
/// Largest accepted sampling period, in milliseconds
pub const MAX_SAMPLING_MS: u32 = 10_000;

/// Default sampling period
pub const DEFAULT_SAMPLING_MS: u32 = 100;
/// Default alert threshold in milli-degrees Celsius
pub const DEFAULT_THRESHOLD_MC: i32 = 45_000;

/// Size of the packed control struct on the wire: `u32` period + `i32` threshold
pub const CONFIG_WIRE_SIZE: usize = 8;

/// Sampling period and alert threshold, updated together
///
/// The threshold is deliberately unbounded: any `i32` milli-degree value is
/// accepted. Only the period is range-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimTempConfig {
    /// Sampling period in milliseconds, must lie in
    /// `[MIN_SAMPLING_MS, MAX_SAMPLING_MS]`
    pub sampling_ms: u32,
    /// Alert threshold in milli-degrees Celsius
    pub threshold_mc: i32,
}

impl SimTempConfig {
    /// Validate the period bounds; the threshold is never rejected
    pub fn validate(&self) -> Result<()> {
        if self.sampling_ms < MIN_SAMPLING_MS || self.sampling_ms > MAX_SAMPLING_MS {
            return Err(SimTempError::InvalidArgument(format!(
                "sampling_ms {} out of range [{}, {}]",
                self.sampling_ms, MIN_SAMPLING_MS, MAX_SAMPLING_MS
            )));
        }
        Ok(())
    }

    /// Sampling period as a `Duration`
    pub fn period(&self) -> Duration {
        Duration::from_millis(u64::from(self.sampling_ms))
    }

    /// Encode as the packed little-endian control struct
    pub fn to_bytes(&self) -> [u8; CONFIG_WIRE_SIZE] {
        let mut buf = [0u8; CONFIG_WIRE_SIZE];
        buf[0..4].copy_from_slice(&self.sampling_ms.to_le_bytes());
        buf[4..8].copy_from_slice(&self.threshold_mc.to_le_bytes());
        buf
    }

    /// Decode the packed little-endian control struct
    pub fn from_bytes(buf: &[u8; CONFIG_WIRE_SIZE]) -> Self {
        SimTempConfig {
            sampling_ms: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            threshold_mc: i32::from_le_bytes(buf[4..8].try_into().unwrap()),
        }
    }
}

impl Default for SimTempConfig {
    fn default() -> Self {
        SimTempConfig {
            sampling_ms: DEFAULT_SAMPLING_MS,
            threshold_mc: DEFAULT_THRESHOLD_MC,
        }
    }
}
