//! CLI argument parsing for the simtemp simulator

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for streamed samples
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "simtemp")]
#[command(version)]
#[command(about = "Simulated periodic temperature sensor", long_about = None)]
pub struct Cli {
    /// Enable debug logging to stderr
    #[arg(short = 'd', long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream samples as the driver produces them
    Monitor {
        /// Output format (text or json)
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,

        /// Stop after this many samples (default: run until interrupted)
        #[arg(short = 'n', long = "count")]
        count: Option<u64>,

        /// Sampling period in milliseconds
        #[arg(long = "sampling-ms")]
        sampling_ms: Option<u32>,

        /// Alert threshold in milli-degrees Celsius
        #[arg(long = "threshold-mc")]
        threshold_mc: Option<i32>,

        /// Generator mode: normal, noisy, or ramp
        #[arg(long = "mode")]
        mode: Option<String>,
    },

    /// Configure a ramp against a low threshold and verify the alert fires
    Selftest,

    /// Update period and threshold together through the control operation
    SetConfig {
        /// Sampling period in milliseconds
        sampling_ms: u32,
        /// Alert threshold in milli-degrees Celsius
        threshold_mc: i32,
    },

    /// Read a device attribute (sampling_ms, threshold_mC, mode, stats)
    Get {
        /// Attribute name
        attr: String,
    },

    /// Write a device attribute
    Set {
        /// Attribute name
        attr: String,
        /// New value
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_monitor_defaults() {
        let cli = Cli::parse_from(["simtemp", "monitor"]);
        match cli.command {
            Command::Monitor {
                count,
                sampling_ms,
                mode,
                ..
            } => {
                assert!(count.is_none());
                assert!(sampling_ms.is_none());
                assert!(mode.is_none());
            }
            other => panic!("expected monitor, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_monitor_overrides() {
        let cli = Cli::parse_from([
            "simtemp",
            "monitor",
            "-n",
            "3",
            "--sampling-ms",
            "50",
            "--threshold-mc",
            "30000",
            "--mode",
            "ramp",
            "--format",
            "json",
        ]);
        match cli.command {
            Command::Monitor {
                count,
                sampling_ms,
                threshold_mc,
                mode,
                ..
            } => {
                assert_eq!(count, Some(3));
                assert_eq!(sampling_ms, Some(50));
                assert_eq!(threshold_mc, Some(30_000));
                assert_eq!(mode.as_deref(), Some("ramp"));
            }
            other => panic!("expected monitor, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_set_config() {
        let cli = Cli::parse_from(["simtemp", "set-config", "200", "30000"]);
        match cli.command {
            Command::SetConfig {
                sampling_ms,
                threshold_mc,
            } => {
                assert_eq!(sampling_ms, 200);
                assert_eq!(threshold_mc, 30_000);
            }
            other => panic!("expected set-config, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_debug_flag_default_false() {
        let cli = Cli::parse_from(["simtemp", "selftest"]);
        assert!(!cli.debug);
        let cli = Cli::parse_from(["simtemp", "-d", "selftest"]);
        assert!(cli.debug);
    }
}
