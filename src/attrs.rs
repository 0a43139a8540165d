//! Textual attribute interface
//!
//! A sysfs-style surface: individually read- and writable named attributes.
//! Each `show`/`store` call is guarded on its own, but two sequential stores
//! (say, `mode` then `threshold_mC`) are *not* jointly atomic by design.
//! Callers that need the period and threshold updated together must use the
//! device node's control operation instead.
//!
//! Attributes:
//! - `sampling_ms`  (rw) sampling period in milliseconds, bounds-checked
//! - `threshold_mC` (rw) alert threshold in milli-degrees Celsius, unbounded
//! - `mode`         (rw) `normal` | `noisy` | `ramp`
//! - `stats`        (ro) `updates=<u64> alerts=<u64> last_error=<int>`

use crate::device::SimTempDevice;
use crate::error::{Result, SimTempError};
use crate::generator::SampleMode;

pub const ATTR_SAMPLING_MS: &str = "sampling_ms";
pub const ATTR_THRESHOLD_MC: &str = "threshold_mC";
pub const ATTR_MODE: &str = "mode";
pub const ATTR_STATS: &str = "stats";

/// Read a named attribute
pub fn show(device: &SimTempDevice, attr: &str) -> Result<String> {
    match attr {
        ATTR_SAMPLING_MS => Ok(device.config().sampling_ms.to_string()),
        ATTR_THRESHOLD_MC => Ok(device.config().threshold_mc.to_string()),
        ATTR_MODE => Ok(device.mode().to_string()),
        ATTR_STATS => Ok(device.stats().to_string()),
        other => Err(SimTempError::Unsupported(format!(
            "unknown attribute '{other}'"
        ))),
    }
}

/// Write a named attribute
///
/// Parse failures and out-of-bounds values fail `InvalidArgument` with the
/// previous value left in effect; writing a read-only attribute fails
/// `Unsupported`.
pub fn store(device: &SimTempDevice, attr: &str, value: &str) -> Result<()> {
    match attr {
        ATTR_SAMPLING_MS => {
            let sampling_ms: u32 = value.trim().parse().map_err(|_| {
                SimTempError::InvalidArgument(format!("'{value}' is not a valid period"))
            })?;
            device.set_sampling_ms(sampling_ms)
        }
        ATTR_THRESHOLD_MC => {
            let threshold_mc: i32 = value.trim().parse().map_err(|_| {
                SimTempError::InvalidArgument(format!("'{value}' is not a valid threshold"))
            })?;
            device.set_threshold_mc(threshold_mc);
            Ok(())
        }
        ATTR_MODE => {
            let mode: SampleMode = value.parse()?;
            device.set_mode(mode);
            Ok(())
        }
        ATTR_STATS => Err(SimTempError::Unsupported(
            "attribute 'stats' is read-only".into(),
        )),
        other => Err(SimTempError::Unsupported(format!(
            "unknown attribute '{other}'"
        ))),
    }
}
