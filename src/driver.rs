//! Periodic driver: the timer thread that produces samples
//!
//! One dedicated thread stands in for the hardware timer. It waits on a
//! control channel with a deadline, so a single `recv_timeout` serves as
//! both the timer and the reprogram/stop signal:
//!
//! - **timeout**: the deadline fired; produce one sample, then schedule the
//!   next firing as `deadline + period` (measured from the planned fire
//!   time, not from "now", so latency never compounds into drift);
//! - **`Reprogram`**: a configuration update landed; rearm one full new
//!   period from now, so the update takes effect on the next firing without
//!   replaying firings the old schedule would have missed;
//! - **`Stop`**: cancel the pending firing and exit; no further ticks occur
//!   after `stop()` returns.
//!
//! The period used for every reschedule is the one returned by the tick
//! itself, read under the device guard, so a reschedule can never be
//! computed from a stale value racing a concurrent update.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam::channel::{unbounded, RecvTimeoutError, Sender};
use rand::rngs::ThreadRng;
use tracing::{debug, info};

use crate::device::SimTempDevice;
use crate::generator;

/// Control messages accepted by the timer thread
pub(crate) enum DriverCommand {
    /// The sampling period changed; recompute the next deadline
    Reprogram,
    /// Cancel the pending firing and exit
    Stop,
}

/// Handle to the running timer thread
///
/// Constructing it starts the driver; `stop()` (or drop) transitions it back
/// to stopped. Only after a successful stop is it safe to tear down the rest
/// of the device.
pub struct SamplerDriver {
    control: Sender<DriverCommand>,
    handle: Option<JoinHandle<()>>,
}

impl SamplerDriver {
    /// Start sampling on a dedicated thread
    pub fn start(device: Arc<SimTempDevice>) -> SamplerDriver {
        let (control, commands) = unbounded();
        device.attach_driver(control.clone());

        let handle = thread::spawn(move || {
            let mut rng = rand::thread_rng();
            run(&device, &commands, &mut rng);
        });
        info!("sampler driver started");

        SamplerDriver {
            control,
            handle: Some(handle),
        }
    }

    /// Stop the driver and wait for the thread to exit
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.control.send(DriverCommand::Stop);
            let _ = handle.join();
            info!("sampler driver stopped");
        }
    }
}

impl Drop for SamplerDriver {
    fn drop(&mut self) {
        self.halt();
    }
}

fn run(
    device: &SimTempDevice,
    commands: &crossbeam::channel::Receiver<DriverCommand>,
    rng: &mut ThreadRng,
) {
    let mut last_fire = Instant::now();
    let mut period = device.sampling_period();

    loop {
        let deadline = last_fire + period;
        let wait = deadline.saturating_duration_since(Instant::now());

        match commands.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {
                let jitter_mc = generator::draw_jitter_mc(rng);
                period = device.tick(jitter_mc);
                // Drift-free: the next firing is measured from this one's
                // planned time, not from whenever the tick finished.
                last_fire = deadline;
            }
            Ok(DriverCommand::Reprogram) => {
                // Rearm relative to now, like mod_timer: the new period takes
                // effect on the next firing without replaying missed ones.
                period = device.sampling_period();
                last_fire = Instant::now();
                debug!(period_ms = period.as_millis() as u64, "timer reprogrammed");
            }
            Ok(DriverCommand::Stop) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
