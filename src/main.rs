use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use simtemp::attrs;
use simtemp::chardev::{DeviceNode, IOCTL_SET_CONFIG};
use simtemp::cli::{Cli, Command, OutputFormat};
use simtemp::config::SimTempConfig;
use simtemp::device::{Readiness, SimTempDevice};
use simtemp::driver::SamplerDriver;
use simtemp::sample::{Sample, SAMPLE_RECORD_SIZE};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Command::Monitor {
            format,
            count,
            sampling_ms,
            threshold_mc,
            mode,
        } => run_monitor(format, count, sampling_ms, threshold_mc, mode),
        Command::Selftest => run_selftest(),
        Command::SetConfig {
            sampling_ms,
            threshold_mc,
        } => run_set_config(sampling_ms, threshold_mc),
        Command::Get { attr } => {
            let device = bring_up()?;
            println!("{}", attrs::show(&device, &attr)?);
            Ok(())
        }
        Command::Set { attr, value } => {
            let device = bring_up()?;
            attrs::store(&device, &attr, &value)?;
            println!("{}={}", attr, attrs::show(&device, &attr)?);
            Ok(())
        }
    }
}

fn bring_up() -> Result<Arc<SimTempDevice>> {
    let device = SimTempDevice::new(SimTempConfig::default())
        .context("failed to bring up the simulated device")?;
    Ok(Arc::new(device))
}

fn print_sample(sample: &Sample, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let seconds = sample.timestamp_ns as f64 / 1e9;
            let alert = if sample.threshold_crossed() {
                " | *** ALERT ***"
            } else {
                ""
            };
            println!(
                "[{seconds:>10.3}s] Temp: {:7.3}\u{b0}C{alert}",
                sample.temp_celsius()
            );
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(sample)?),
    }
    Ok(())
}

/// Stream samples until `count` is reached or the process is interrupted
fn run_monitor(
    format: OutputFormat,
    count: Option<u64>,
    sampling_ms: Option<u32>,
    threshold_mc: Option<i32>,
    mode: Option<String>,
) -> Result<()> {
    let device = bring_up()?;
    if let Some(ms) = sampling_ms {
        attrs::store(&device, attrs::ATTR_SAMPLING_MS, &ms.to_string())?;
    }
    if let Some(mc) = threshold_mc {
        attrs::store(&device, attrs::ATTR_THRESHOLD_MC, &mc.to_string())?;
    }
    if let Some(mode) = mode {
        attrs::store(&device, attrs::ATTR_MODE, &mode)?;
    }

    let driver = SamplerDriver::start(Arc::clone(&device));
    let node = DeviceNode::open(Arc::clone(&device));

    let mut delivered = 0u64;
    while count.map_or(true, |limit| delivered < limit) {
        node.poll(Readiness::ALL, None)?;
        let mut buf = [0u8; SAMPLE_RECORD_SIZE];
        node.read_into(&mut buf, true)?;
        print_sample(&Sample::from_bytes(&buf), format)?;
        delivered += 1;
    }

    driver.stop();
    device.shutdown();
    Ok(())
}

/// Configure a ramp that must cross a low threshold, then verify the alert
/// arrives and the counters moved
fn run_selftest() -> Result<()> {
    println!("--- simtemp self-test ---");
    let device = bring_up()?;
    attrs::store(&device, attrs::ATTR_SAMPLING_MS, "50")?;
    attrs::store(&device, attrs::ATTR_THRESHOLD_MC, "30000")?;
    attrs::store(&device, attrs::ATTR_MODE, "ramp")?;
    println!("configured: period=50ms threshold=30.0\u{b0}C mode=ramp");

    let driver = SamplerDriver::start(Arc::clone(&device));
    let node = DeviceNode::open(Arc::clone(&device));

    // The ramp climbs 1degC per tick from 20degC, so the 30degC threshold
    // must be crossed within a couple dozen ticks.
    let mut alerted = false;
    for _ in 0..64 {
        let ready = node.poll(Readiness::ALL, Some(Duration::from_secs(2)))?;
        if !ready.any() {
            break;
        }
        let mut buf = [0u8; SAMPLE_RECORD_SIZE];
        node.read_into(&mut buf, true)?;
        let sample = Sample::from_bytes(&buf);
        print_sample(&sample, OutputFormat::Text)?;
        if sample.threshold_crossed() {
            alerted = true;
            break;
        }
    }

    driver.stop();
    let stats = device.stats();
    device.shutdown();
    println!("{stats}");

    if !alerted {
        bail!("self-test FAILED: no threshold alert within the ramp window");
    }
    if stats.updates == 0 || stats.alerts == 0 {
        bail!("self-test FAILED: counters did not advance ({stats})");
    }
    println!("self-test PASSED");
    Ok(())
}

/// Exercise the binary control operation end to end
fn run_set_config(sampling_ms: u32, threshold_mc: i32) -> Result<()> {
    let device = bring_up()?;
    let node = DeviceNode::open(Arc::clone(&device));

    let config = SimTempConfig {
        sampling_ms,
        threshold_mc,
    };
    node.ioctl(IOCTL_SET_CONFIG, &config.to_bytes())?;

    let applied = device.config();
    println!(
        "sampling_ms={} threshold_mC={}",
        applied.sampling_ms, applied.threshold_mc
    );
    Ok(())
}
