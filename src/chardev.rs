//! Device-node boundary: byte-stream reads, readiness queries, and the
//! binary control operation
//!
//! A `DeviceNode` is one open handle on the device. Reads deliver exactly one
//! packed 16-byte record per call, as an indivisible unit; a caller never
//! sees a partial record. Delivery goes through a caller-supplied writer (the
//! userspace-buffer analog); if the write fails after the sample was already
//! dequeued, the record is lost, the fault is recorded in `last_error`, and
//! the sample is *not* requeued. That data loss is the documented trade-off.

use std::io::Write;
use std::sync::Arc;

use crate::config::{SimTempConfig, CONFIG_WIRE_SIZE};
use crate::device::{Readiness, SimTempDevice};
use crate::error::{Result, SimTempError};
use crate::sample::SAMPLE_RECORD_SIZE;

/// Control operation: atomically update sampling period and threshold.
/// Takes the packed `{sampling_ms: u32, threshold_mc: i32}` struct.
pub const IOCTL_SET_CONFIG: u32 = 1;

/// One open handle on the device node
pub struct DeviceNode {
    device: Arc<SimTempDevice>,
}

impl DeviceNode {
    /// Open the device
    pub fn open(device: Arc<SimTempDevice>) -> DeviceNode {
        device.open();
        DeviceNode { device }
    }

    /// Read exactly one record into `buf`
    ///
    /// The buffer must hold at least one full record; shorter buffers are
    /// rejected with `InvalidArgument` before anything is dequeued. Returns
    /// the number of bytes written (always one record size on success).
    pub fn read_into(&self, buf: &mut [u8], blocking: bool) -> Result<usize> {
        if buf.len() < SAMPLE_RECORD_SIZE {
            return Err(SimTempError::InvalidArgument(format!(
                "read buffer holds {} bytes, one record needs {}",
                buf.len(),
                SAMPLE_RECORD_SIZE
            )));
        }
        let sample = self.device.read_sample(blocking)?;
        buf[..SAMPLE_RECORD_SIZE].copy_from_slice(&sample.to_bytes());
        Ok(SAMPLE_RECORD_SIZE)
    }

    /// Read exactly one record into a caller-supplied writer
    ///
    /// A failed write after the dequeue loses the record: the fault code is
    /// recorded in `last_error` and `TransferFault` is returned.
    pub fn read_record<W: Write>(&self, out: &mut W, blocking: bool) -> Result<usize> {
        let sample = self.device.read_sample(blocking)?;
        if let Err(err) = out.write_all(&sample.to_bytes()) {
            let fault = SimTempError::TransferFault(err);
            self.device.note_delivery_fault(fault.errno());
            return Err(fault);
        }
        Ok(SAMPLE_RECORD_SIZE)
    }

    /// Poll-style readiness query; see [`SimTempDevice::poll`]
    pub fn poll(
        &self,
        interest: Readiness,
        timeout: Option<std::time::Duration>,
    ) -> Result<Readiness> {
        self.device.poll(interest, timeout)
    }

    /// Dispatch a control operation
    ///
    /// `IOCTL_SET_CONFIG` takes the packed 8-byte config struct and applies
    /// both fields under one guard acquisition. Unknown commands fail
    /// `Unsupported`; a short argument fails `InvalidArgument` with the
    /// configuration untouched.
    pub fn ioctl(&self, command: u32, arg: &[u8]) -> Result<()> {
        match command {
            IOCTL_SET_CONFIG => {
                let bytes: &[u8; CONFIG_WIRE_SIZE] = arg.try_into().map_err(|_| {
                    SimTempError::InvalidArgument(format!(
                        "config struct is {} bytes, got {}",
                        CONFIG_WIRE_SIZE,
                        arg.len()
                    ))
                })?;
                self.device.set_config(SimTempConfig::from_bytes(bytes))
            }
            other => Err(SimTempError::Unsupported(format!(
                "unknown ioctl command {other}"
            ))),
        }
    }

    /// Shared access to the underlying device
    pub fn device(&self) -> &Arc<SimTempDevice> {
        &self.device
    }
}

impl Drop for DeviceNode {
    fn drop(&mut self) {
        self.device.release();
    }
}
