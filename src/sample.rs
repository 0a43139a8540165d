//! Sample record type and its packed wire encoding
//!
//! A `Sample` is an immutable value created once per tick by the generator,
//! copied into the queue, and copied out to the consumer. On the device-node
//! boundary it travels as a 16-byte packed little-endian record:
//!
//! ```text
//! offset 0  u64 timestamp_ns   monotonic, nanosecond resolution
//! offset 8  i32 temp_mC        milli-degrees Celsius
//! offset 12 u32 flags          bit0 NEW_SAMPLE (always set), bit1 THRESHOLD_CROSSED
//! ```

use serde::Serialize;

/// Always set for a freshly produced record
pub const FLAG_NEW_SAMPLE: u32 = 1 << 0;
/// Set when the sample's temperature reached the configured threshold
pub const FLAG_THRESHOLD_CROSSED: u32 = 1 << 1;

/// Size of one record on the device-node boundary, in bytes
pub const SAMPLE_RECORD_SIZE: usize = 16;

/// One timestamped temperature reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sample {
    /// Monotonic timestamp in nanoseconds since device bring-up
    pub timestamp_ns: u64,
    /// Temperature in milli-degrees Celsius
    pub temp_mc: i32,
    /// Record flags (`FLAG_NEW_SAMPLE`, `FLAG_THRESHOLD_CROSSED`)
    pub flags: u32,
}

impl Sample {
    /// Create a new sample; `FLAG_NEW_SAMPLE` is always set
    pub fn new(timestamp_ns: u64, temp_mc: i32, threshold_crossed: bool) -> Self {
        let mut flags = FLAG_NEW_SAMPLE;
        if threshold_crossed {
            flags |= FLAG_THRESHOLD_CROSSED;
        }
        Sample {
            timestamp_ns,
            temp_mc,
            flags,
        }
    }

    /// Whether this sample crossed the alert threshold when it was produced
    pub fn threshold_crossed(&self) -> bool {
        self.flags & FLAG_THRESHOLD_CROSSED != 0
    }

    /// Temperature in degrees Celsius, for display
    pub fn temp_celsius(&self) -> f64 {
        f64::from(self.temp_mc) / 1000.0
    }

    /// Encode into the packed 16-byte little-endian wire record
    pub fn to_bytes(&self) -> [u8; SAMPLE_RECORD_SIZE] {
        let mut buf = [0u8; SAMPLE_RECORD_SIZE];
        buf[0..8].copy_from_slice(&self.timestamp_ns.to_le_bytes());
        buf[8..12].copy_from_slice(&self.temp_mc.to_le_bytes());
        buf[12..16].copy_from_slice(&self.flags.to_le_bytes());
        buf
    }

    /// Decode a packed 16-byte little-endian wire record
    pub fn from_bytes(buf: &[u8; SAMPLE_RECORD_SIZE]) -> Self {
        Sample {
            timestamp_ns: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            temp_mc: i32::from_le_bytes(buf[8..12].try_into().unwrap()),
            flags: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sample_flag_always_set() {
        let sample = Sample::new(1_000, 25_000, false);
        assert_eq!(sample.flags, FLAG_NEW_SAMPLE);
        assert!(!sample.threshold_crossed());
    }

    #[test]
    fn test_threshold_flag() {
        let sample = Sample::new(1_000, 51_000, true);
        assert_eq!(sample.flags, FLAG_NEW_SAMPLE | FLAG_THRESHOLD_CROSSED);
        assert!(sample.threshold_crossed());
    }

    #[test]
    fn test_wire_layout() {
        let sample = Sample::new(0x0102_0304_0506_0708, -2_000, true);
        let bytes = sample.to_bytes();

        // Little-endian field placement, packed, no padding
        assert_eq!(&bytes[0..8], &0x0102_0304_0506_0708u64.to_le_bytes());
        assert_eq!(&bytes[8..12], &(-2_000i32).to_le_bytes());
        assert_eq!(&bytes[12..16], &3u32.to_le_bytes());
    }

    #[test]
    fn test_wire_roundtrip() {
        let sample = Sample::new(42, -40_000, false);
        assert_eq!(Sample::from_bytes(&sample.to_bytes()), sample);
    }

    #[test]
    fn test_temp_celsius() {
        let sample = Sample::new(0, 25_500, false);
        assert!((sample.temp_celsius() - 25.5).abs() < 1e-9);
    }
}
