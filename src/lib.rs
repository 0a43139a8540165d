//! simtemp - Userspace emulation of a periodic temperature sensor device
//!
//! This library models a hardware sensor as a concurrent sampling core: a
//! timer-driven producer generates timestamped readings at a configurable
//! cadence, a bounded FIFO decouples the producer from consumers that may be
//! slower or faster, and a threshold alert is raised as a distinguishable
//! high-priority readiness condition. One mutex guards all shared state;
//! blocking reads and poll-style readiness waits park on a single condvar.

pub mod attrs;
pub mod chardev;
pub mod cli;
pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod generator;
pub mod queue;
pub mod sample;
