//! Integration tests for the periodic driver
//!
//! These run against the real timer thread, so they assert loose rates
//! rather than exact tick counts and are serialized to keep scheduling
//! noise down.
//!
//! # Test Coverage
//!
//! - A running driver produces ticks at roughly the configured cadence
//! - A blocking read is satisfied by a driver tick
//! - `stop()` cancels the pending firing; no further ticks occur
//! - Reprogramming the period takes effect on the next firing

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serial_test::serial;
use simtemp::config::SimTempConfig;
use simtemp::device::SimTempDevice;
use simtemp::driver::SamplerDriver;

fn device(sampling_ms: u32, threshold_mc: i32) -> Arc<SimTempDevice> {
    Arc::new(
        SimTempDevice::new(SimTempConfig {
            sampling_ms,
            threshold_mc,
        })
        .unwrap(),
    )
}

#[test]
#[serial]
fn test_driver_produces_ticks_at_cadence() {
    let dev = device(20, i32::MAX);
    let driver = SamplerDriver::start(Arc::clone(&dev));

    thread::sleep(Duration::from_millis(300));
    driver.stop();

    let updates = dev.stats().updates;
    // ~15 expected; allow wide scheduling slack in both directions
    assert!(updates >= 5, "only {updates} ticks in 300ms at 20ms period");
    assert!(updates <= 30, "{updates} ticks in 300ms at 20ms period");
}

#[test]
#[serial]
fn test_blocking_read_satisfied_by_driver() {
    let dev = device(20, i32::MAX);
    let driver = SamplerDriver::start(Arc::clone(&dev));

    let sample = dev.read_sample(true).unwrap();
    assert!(sample.timestamp_ns > 0);

    driver.stop();
    dev.shutdown();
}

#[test]
#[serial]
fn test_stop_halts_ticking() {
    let dev = device(20, i32::MAX);
    let driver = SamplerDriver::start(Arc::clone(&dev));
    thread::sleep(Duration::from_millis(100));
    driver.stop();

    let frozen = dev.stats().updates;
    thread::sleep(Duration::from_millis(150));
    assert_eq!(dev.stats().updates, frozen);
}

#[test]
#[serial]
fn test_reprogram_takes_effect_without_waiting_out_old_period() {
    // Start slow, immediately reprogram fast; the new cadence must apply
    // on the next firing rather than after the old 2s period elapses.
    let dev = device(2_000, i32::MAX);
    let driver = SamplerDriver::start(Arc::clone(&dev));

    dev.set_config(SimTempConfig {
        sampling_ms: 20,
        threshold_mc: i32::MAX,
    })
    .unwrap();

    thread::sleep(Duration::from_millis(300));
    driver.stop();

    let updates = dev.stats().updates;
    assert!(
        updates >= 5,
        "reprogram did not take effect: {updates} ticks in 300ms"
    );
}

#[test]
#[serial]
fn test_driver_drop_also_stops_thread() {
    let dev = device(20, i32::MAX);
    {
        let _driver = SamplerDriver::start(Arc::clone(&dev));
        thread::sleep(Duration::from_millis(60));
    }
    let frozen = dev.stats().updates;
    thread::sleep(Duration::from_millis(100));
    assert_eq!(dev.stats().updates, frozen);
}
