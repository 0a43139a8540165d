//! Device state and the concurrent sampling core
//!
//! One `SimTempDevice` instance owns everything the producer and the
//! consumers share: the sample queue, the event flags, the counters, and the
//! sampling configuration. A single mutex guards all of it; the sole locking
//! discipline in the crate is "acquire the guard, mutate, release", with O(1)
//! work inside the critical section. Nothing that can block (I/O, waiting,
//! RNG with potential reseeding) runs while the guard is held: the timer
//! thread draws jitter before locking, and all logging happens after unlock.
//!
//! Blocking consumers park on one condvar. The producer tick wakes every
//! waiter (`notify_all`) because both readiness classes, "queue non-empty"
//! and "alert pending", may change on any tick, and `poll` supports an
//! arbitrary number of concurrent waiters that each recompute their own
//! ready set.

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crossbeam::channel::Sender;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::SimTempConfig;
use crate::driver::DriverCommand;
use crate::error::{Result, SimTempError};
use crate::generator::{self, SampleMode};
use crate::queue::{SampleQueue, DEFAULT_QUEUE_CAPACITY};
use crate::sample::{Sample, FLAG_THRESHOLD_CROSSED};

/// Readiness conditions reported by [`SimTempDevice::poll`]
///
/// Used both as the interest mask and as the result set, mirroring the
/// events/revents split of a poll-style interface.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    /// The queue holds at least one sample
    pub readable: bool,
    /// A threshold alert is pending (set by the producer, cleared only by a
    /// successful read)
    pub priority: bool,
}

impl Readiness {
    /// Interest in normal data availability only
    pub const READABLE: Readiness = Readiness {
        readable: true,
        priority: false,
    };
    /// Interest in pending alerts only
    pub const PRIORITY: Readiness = Readiness {
        readable: false,
        priority: true,
    };
    /// Interest in both conditions
    pub const ALL: Readiness = Readiness {
        readable: true,
        priority: true,
    };

    /// True if any condition is set
    pub fn any(self) -> bool {
        self.readable || self.priority
    }

    /// Conditions present in both sets
    pub fn intersect(self, other: Readiness) -> Readiness {
        Readiness {
            readable: self.readable && other.readable,
            priority: self.priority && other.priority,
        }
    }
}

/// Monotonic counters and the most recent delivery fault code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceStats {
    /// Ticks produced since bring-up
    pub updates: u64,
    /// Samples that crossed the threshold
    pub alerts: u64,
    /// Samples refused by a full queue
    pub dropped: u64,
    /// errno-style code of the most recent failed delivery, 0 if none
    pub last_error: i32,
}

impl fmt::Display for DeviceStats {
    /// The textual `stats` attribute format
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "updates={} alerts={} last_error={}",
            self.updates, self.alerts, self.last_error
        )
    }
}

/// Everything the guard protects
struct DeviceState {
    config: SimTempConfig,
    mode: SampleMode,
    queue: SampleQueue,
    event_flags: u32,
    update_count: u64,
    alert_count: u64,
    drop_count: u64,
    last_error: i32,
    open_count: u32,
    shutdown: bool,
    /// Control endpoint of the running timer thread, if any. Sending on it
    /// never blocks (unbounded channel), so it is safe to reprogram the
    /// schedule while the guard is held.
    driver: Option<Sender<DriverCommand>>,
}

/// The single long-lived sensor instance
///
/// Constructed once at bring-up with validated defaults, shared by reference
/// (typically `Arc`) between the timer thread and any number of consumers,
/// and torn down by stopping the driver first and then calling
/// [`shutdown`](Self::shutdown).
pub struct SimTempDevice {
    state: Mutex<DeviceState>,
    waiters: Condvar,
    epoch: Instant,
}

impl SimTempDevice {
    /// Create a device with the default queue capacity
    pub fn new(config: SimTempConfig) -> Result<Self> {
        Self::with_capacity(config, DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a device with an explicit queue capacity
    ///
    /// The capacity is fixed for the life of the instance. The initial
    /// configuration is validated exactly like a runtime update.
    pub fn with_capacity(config: SimTempConfig, capacity: usize) -> Result<Self> {
        config.validate()?;
        Ok(SimTempDevice {
            state: Mutex::new(DeviceState {
                config,
                mode: SampleMode::Normal,
                queue: SampleQueue::with_capacity(capacity),
                event_flags: 0,
                update_count: 0,
                alert_count: 0,
                drop_count: 0,
                last_error: 0,
                open_count: 0,
                shutdown: false,
                driver: None,
            }),
            waiters: Condvar::new(),
            epoch: Instant::now(),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, DeviceState> {
        // A poisoned guard means a panic inside an O(1) critical section,
        // which is a bug; there is no consistent state to salvage.
        self.state.lock().expect("device state lock poisoned")
    }

    /// Monotonic nanoseconds since device bring-up
    pub fn now_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Register the timer thread's control endpoint
    pub(crate) fn attach_driver(&self, control: Sender<DriverCommand>) {
        self.lock_state().driver = Some(control);
    }

    /// Produce one sample: the body of a timer tick
    ///
    /// Resolves the temperature against the current mode, evaluates the
    /// threshold, enqueues, bumps counters, and wakes every waiter. The
    /// jitter is pre-drawn by the caller so the critical section is pure
    /// arithmetic plus one record copy. Returns the period in effect for
    /// this tick, read under the same guard acquisition, so the caller's
    /// reschedule can never use a stale value.
    pub fn tick(&self, jitter_mc: i32) -> Duration {
        let (sample, dropped, period) = {
            let mut st = self.lock_state();
            let temp_mc = generator::next_temp_mc(&mut st.mode, jitter_mc);
            let crossed = temp_mc >= st.config.threshold_mc;
            let sample = Sample::new(self.now_ns(), temp_mc, crossed);

            st.update_count += 1;
            if crossed {
                st.event_flags |= FLAG_THRESHOLD_CROSSED;
                st.alert_count += 1;
            }
            let dropped = !st.queue.push(sample);
            if dropped {
                st.drop_count += 1;
            }
            (sample, dropped, st.config.period())
        };

        // Wake both readiness classes; waiters recheck their own conditions.
        self.waiters.notify_all();

        trace!(
            temp_mc = sample.temp_mc,
            crossed = sample.threshold_crossed(),
            "tick"
        );
        if sample.threshold_crossed() {
            debug!(temp_mc = sample.temp_mc, "threshold crossed");
        }
        if dropped {
            warn!("sample queue full, newest sample dropped");
        }
        period
    }

    /// Dequeue exactly one sample
    ///
    /// Non-empty queue: pops and returns immediately, clearing the pending
    /// event flags in the same guarded step. Empty queue: fails `WouldBlock`
    /// when `blocking` is false, otherwise parks until a tick signals data
    /// (looping, because wakeups may be spurious and another waiter may win
    /// the race to the sample). Teardown of the device interrupts the wait.
    pub fn read_sample(&self, blocking: bool) -> Result<Sample> {
        let mut st = self.lock_state();
        loop {
            if st.shutdown {
                return Err(SimTempError::Interrupted);
            }
            if let Some(sample) = st.queue.pop() {
                st.event_flags = 0;
                return Ok(sample);
            }
            if !blocking {
                return Err(SimTempError::WouldBlock);
            }
            st = self
                .waiters
                .wait(st)
                .expect("device state lock poisoned");
        }
    }

    /// Wait until at least one requested readiness condition holds
    ///
    /// Recomputes the ready set on every wakeup: readable iff the queue is
    /// non-empty, priority iff an alert is pending. Never consumes data and
    /// never clears the event flags; only a successful read does. With a
    /// timeout, an empty set is returned once the deadline passes. Any
    /// number of waiters may block here concurrently.
    pub fn poll(&self, interest: Readiness, timeout: Option<Duration>) -> Result<Readiness> {
        if !interest.any() {
            return Ok(Readiness::default());
        }
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut st = self.lock_state();
        loop {
            if st.shutdown {
                return Err(SimTempError::Interrupted);
            }
            let ready = Readiness {
                readable: !st.queue.is_empty(),
                priority: st.event_flags & FLAG_THRESHOLD_CROSSED != 0,
            }
            .intersect(interest);
            if ready.any() {
                return Ok(ready);
            }
            st = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(Readiness::default());
                    }
                    self.waiters
                        .wait_timeout(st, deadline - now)
                        .expect("device state lock poisoned")
                        .0
                }
                None => self
                    .waiters
                    .wait(st)
                    .expect("device state lock poisoned"),
            };
        }
    }

    /// Update period and threshold together, atomically
    ///
    /// Validation happens before the guard is taken; a rejected update
    /// leaves the previous configuration fully in effect. On success both
    /// fields are written and the timer is reprogrammed under one guard
    /// acquisition, so no tick and no reader can ever observe a half-old,
    /// half-new configuration.
    pub fn set_config(&self, config: SimTempConfig) -> Result<()> {
        config.validate()?;
        {
            let mut st = self.lock_state();
            st.config = config;
            if let Some(control) = &st.driver {
                let _ = control.send(DriverCommand::Reprogram);
            }
        }
        debug!(
            sampling_ms = config.sampling_ms,
            threshold_mc = config.threshold_mc,
            "configuration updated"
        );
        Ok(())
    }

    /// Update only the sampling period (textual attribute path)
    pub fn set_sampling_ms(&self, sampling_ms: u32) -> Result<()> {
        let mut st = self.lock_state();
        let candidate = SimTempConfig {
            sampling_ms,
            threshold_mc: st.config.threshold_mc,
        };
        candidate.validate()?;
        st.config = candidate;
        if let Some(control) = &st.driver {
            let _ = control.send(DriverCommand::Reprogram);
        }
        Ok(())
    }

    /// Update only the alert threshold (textual attribute path)
    ///
    /// The threshold is unbounded by design; no value is rejected.
    pub fn set_threshold_mc(&self, threshold_mc: i32) {
        self.lock_state().config.threshold_mc = threshold_mc;
    }

    /// Switch the generator mode; a fresh ramp starts at the floor value
    pub fn set_mode(&self, mode: SampleMode) {
        self.lock_state().mode = mode;
    }

    pub fn mode(&self) -> SampleMode {
        self.lock_state().mode
    }

    /// Snapshot of the current configuration, taken under one guard
    /// acquisition, so it is never torn
    pub fn config(&self) -> SimTempConfig {
        self.lock_state().config
    }

    /// Current period, for the timer's reschedule path
    pub(crate) fn sampling_period(&self) -> Duration {
        self.lock_state().config.period()
    }

    /// Snapshot of the counters and the last delivery fault
    pub fn stats(&self) -> DeviceStats {
        let st = self.lock_state();
        DeviceStats {
            updates: st.update_count,
            alerts: st.alert_count,
            dropped: st.drop_count,
            last_error: st.last_error,
        }
    }

    /// Record a failed delivery to a consumer buffer
    pub(crate) fn note_delivery_fault(&self, errno: i32) {
        self.lock_state().last_error = errno;
    }

    /// Track an open of the device node
    pub fn open(&self) {
        let mut st = self.lock_state();
        st.open_count += 1;
        let opens = st.open_count;
        drop(st);
        debug!(opens, "device opened");
    }

    /// Track a release of the device node
    pub fn release(&self) {
        let mut st = self.lock_state();
        st.open_count = st.open_count.saturating_sub(1);
        let opens = st.open_count;
        drop(st);
        debug!(opens, "device released");
    }

    /// Cancel every blocked wait and refuse further ones
    ///
    /// Called at teardown after the timer is stopped. Blocked `read`/`poll`
    /// callers fail `Interrupted`; queue contents and counters are left
    /// exactly as they were.
    pub fn shutdown(&self) {
        self.lock_state().shutdown = true;
        self.waiters.notify_all();
        debug!("device shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> SimTempDevice {
        SimTempDevice::new(SimTempConfig::default()).unwrap()
    }

    #[test]
    fn test_tick_then_read() {
        let dev = device();
        dev.tick(0);
        let sample = dev.read_sample(false).unwrap();
        assert_eq!(sample.temp_mc, generator::NORMAL_BASE_MC);
        assert!(!sample.threshold_crossed());
    }

    #[test]
    fn test_nonblocking_read_on_empty_queue() {
        let dev = device();
        assert!(matches!(
            dev.read_sample(false),
            Err(SimTempError::WouldBlock)
        ));
    }

    #[test]
    fn test_alert_sets_event_flag_until_read() {
        let dev = device();
        dev.set_config(SimTempConfig {
            sampling_ms: 100,
            threshold_mc: 0,
        })
        .unwrap();
        dev.tick(0);

        // Poll sees the alert without clearing it
        let ready = dev.poll(Readiness::ALL, None).unwrap();
        assert!(ready.readable);
        assert!(ready.priority);
        let again = dev.poll(Readiness::PRIORITY, None).unwrap();
        assert!(again.priority);

        // A successful read clears it
        let sample = dev.read_sample(false).unwrap();
        assert!(sample.threshold_crossed());
        let after = dev
            .poll(Readiness::PRIORITY, Some(Duration::from_millis(1)))
            .unwrap();
        assert!(!after.priority);
    }

    #[test]
    fn test_poll_timeout_returns_empty_set() {
        let dev = device();
        let ready = dev
            .poll(Readiness::ALL, Some(Duration::from_millis(5)))
            .unwrap();
        assert_eq!(ready, Readiness::default());
    }

    #[test]
    fn test_poll_empty_interest_returns_immediately() {
        let dev = device();
        let ready = dev.poll(Readiness::default(), None).unwrap();
        assert_eq!(ready, Readiness::default());
    }

    #[test]
    fn test_invalid_config_leaves_state_untouched() {
        let dev = device();
        let before = dev.config();
        let err = dev.set_config(SimTempConfig {
            sampling_ms: 5,
            threshold_mc: 0,
        });
        assert!(matches!(err, Err(SimTempError::InvalidArgument(_))));
        assert_eq!(dev.config(), before);
    }

    #[test]
    fn test_invalid_construction_rejected() {
        let result = SimTempDevice::new(SimTempConfig {
            sampling_ms: 0,
            threshold_mc: 0,
        });
        assert!(matches!(result, Err(SimTempError::InvalidArgument(_))));
    }

    #[test]
    fn test_overflow_counts_drops_and_keeps_oldest() {
        let dev =
            SimTempDevice::with_capacity(SimTempConfig::default(), 2).unwrap();
        dev.tick(1);
        dev.tick(2);
        dev.tick(3); // refused, drop-newest

        let stats = dev.stats();
        assert_eq!(stats.updates, 3);
        assert_eq!(stats.dropped, 1);
        assert_eq!(
            dev.read_sample(false).unwrap().temp_mc,
            generator::NORMAL_BASE_MC + 1
        );
        assert_eq!(
            dev.read_sample(false).unwrap().temp_mc,
            generator::NORMAL_BASE_MC + 2
        );
        assert!(dev.read_sample(false).is_err());
    }

    #[test]
    fn test_shutdown_interrupts_blocked_read() {
        use std::sync::Arc;

        let dev = Arc::new(device());
        let reader = {
            let dev = Arc::clone(&dev);
            std::thread::spawn(move || dev.read_sample(true))
        };
        // Let the reader park, then cancel it
        std::thread::sleep(Duration::from_millis(50));
        dev.shutdown();
        assert!(matches!(
            reader.join().unwrap(),
            Err(SimTempError::Interrupted)
        ));
    }

    #[test]
    fn test_stats_display_format() {
        let dev = device();
        dev.tick(0);
        assert_eq!(dev.stats().to_string(), "updates=1 alerts=0 last_error=0");
    }

    #[test]
    fn test_timestamps_monotonic() {
        let dev = device();
        dev.tick(0);
        dev.tick(0);
        let first = dev.read_sample(false).unwrap();
        let second = dev.read_sample(false).unwrap();
        assert!(second.timestamp_ns >= first.timestamp_ns);
    }
}
