//! Bench tool for checking a device over its UART.
//!
//! ```text
//! cargo run --example uart_console -- /dev/ttyACM0 --send
//! cargo run --example uart_console -- /dev/ttyACM0 --egram --duration 30
//! cargo run --example uart_console -- --list
//! ```
//!
//! Set `RUST_LOG=pacelink=trace` to see every frame.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use pacelink::transport::{SerialConfig, SerialTransport};
use pacelink::{Link, LinkConfig, PacingMode, ParameterField, ParameterSet};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "uart_console", about = "Exercise the pacemaker UART link")]
struct Args {
    /// Serial port connected to the device
    port: Option<String>,

    /// UART baud rate
    #[arg(long, default_value_t = pacelink::DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Send the test parameter block
    #[arg(long)]
    send: bool,

    /// Request the electrogram stream
    #[arg(long)]
    egram: bool,

    /// Pacing mode for the test block
    #[arg(long, default_value = "VVI")]
    mode: PacingMode,

    /// Seconds to listen before disconnecting
    #[arg(long, default_value_t = 10)]
    duration: u64,

    /// List serial ports and exit
    #[arg(long)]
    list: bool,
}

/// Parameter block used for bring-up testing
fn test_params(mode: PacingMode) -> ParameterSet {
    ParameterSet::new()
        .with_mode(mode)
        .with(ParameterField::Arp, 250)
        .with(ParameterField::Vrp, 320)
        .with(ParameterField::AtrialAmplitude, ParameterSet::amplitude_tenths(3.0))
        .with(ParameterField::VentricularAmplitude, ParameterSet::amplitude_tenths(3.5))
        .with(ParameterField::AtrialPulseWidth, 5)
        .with(ParameterField::VentricularPulseWidth, 6)
        .with(ParameterField::AtrialRefPwm, 1200)
        .with(ParameterField::VentricularRefPwm, 1300)
        .with(ParameterField::ReactionTime, 20)
        .with(ParameterField::RecoveryTime, 10)
        .with(ParameterField::Pvarp, 200)
        .with(ParameterField::AvDelay, 150)
        .with(ParameterField::ResponseFactor, 8)
        .with(ParameterField::ActivityThreshold, 3)
        .with(ParameterField::LowerRateLimit, 60)
        .with(ParameterField::UpperRateLimit, 150)
        .with(ParameterField::MaxSensorRate, 160)
        .with(ParameterField::RateSmoothing, 5)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pacelink=info")),
        )
        .init();

    let args = Args::parse();

    if args.list {
        for port in SerialTransport::available_ports().context("failed to list serial ports")? {
            println!("{port}");
        }
        return Ok(());
    }

    let Some(port) = args.port else {
        bail!("no serial port given (use --list to see what is available)");
    };

    let config = SerialConfig {
        baud_rate: args.baud,
        ..SerialConfig::default()
    };
    println!("opening {port} @ {} baud", config.baud_rate);
    let transport = SerialTransport::open(&port, &config)
        .with_context(|| format!("failed to open {port}"))?;

    let mut link = Link::new(LinkConfig::default());
    link.on_ack(|| println!("[device] ACK"));
    link.on_egram_sample(|channel, value| println!("[device] EGRAM ch={channel} value={value}"));
    link.connect(transport)?;

    if args.send {
        println!("sending test parameters ({})", args.mode.describe());
        link.send_parameters(&test_params(args.mode))?;
    }

    if args.egram {
        println!("requesting electrogram stream");
        link.send_request_egram()?;
    }

    println!("listening for {}s", args.duration);
    std::thread::sleep(Duration::from_secs(args.duration));
    link.disconnect();

    let stats = link.stats();
    println!(
        "sent {} frames, received {} ({} acks, {} egram samples), dropped {} frames and {} noise bytes",
        stats.frames_sent,
        stats.frames_received,
        stats.acks_received,
        stats.egram_samples,
        stats.rejected(),
        stats.noise_bytes,
    );
    Ok(())
}
