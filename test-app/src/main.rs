// p2k test application -- CLI tool for driving a Protocol 2000 switch or
// matrix over TCP.
//
// Usage:
//   p2k-test-app --host 192.168.1.39 status
//   p2k-test-app --host 192.168.1.39 --machine-id 1 select 3
//   p2k-test-app --host 192.168.1.39 --topology output --output 2 select 4
//   p2k-test-app --host 192.168.1.39 --topology matrix --outputs 4 route 2 3
//   p2k-test-app --host 192.168.1.39 lock
//
// Set RUST_LOG=p2k=trace to see every frame on the wire.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use p2k::{Engine, MediaMatrix, MediaSwitch, P2kBuilder, Topology};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// p2k test application -- drives a Protocol 2000 device from the command line.
#[derive(Parser)]
#[command(name = "p2k-test-app", version, about)]
struct Cli {
    /// Device host name or IP address.
    #[arg(long)]
    host: String,

    /// TCP port (default 5000).
    #[arg(long)]
    port: Option<u16>,

    /// Machine id, decimal or hex (e.g. 1 or 0x01). Broadcast when omitted.
    #[arg(long, value_parser = parse_machine_id)]
    machine_id: Option<u8>,

    /// How to model the device.
    #[arg(long, value_enum, default_value_t = TopologyKind::Switch)]
    topology: TopologyKind,

    /// Output number (1-based) for `--topology output`.
    #[arg(long, default_value_t = 1)]
    output: u8,

    /// Fixed routing table size for `--topology matrix` (1-127).
    /// Follows the device-reported output count when omitted.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=127))]
    outputs: Option<u8>,

    /// Response timeout in milliseconds.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TopologyKind {
    /// Single-output switch (video only).
    Switch,
    /// One output of a multi-output device (video and audio).
    Output,
    /// Routing matrix.
    Matrix,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh and print the device state.
    Status,

    /// Select the source for a switch or output.
    Select { input: i64 },

    /// Route an input to a matrix output (0-based).
    Route { input: i64, output: i64 },

    /// Lock the front panel.
    Lock,

    /// Unlock the front panel.
    Unlock,
}

/// Parse a machine id like "0x41" or "65".
fn parse_machine_id(s: &str) -> std::result::Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    match parsed {
        Ok(id) if id < 0x80 => Ok(id),
        Ok(id) => Err(format!("machine id {id} does not fit in 7 bits")),
        Err(e) => Err(format!("invalid machine id: {e}")),
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

async fn set_lock<T: Topology>(engine: &mut Engine<T>, command: &Command) -> Result<bool> {
    match command {
        Command::Lock => engine.lock().await.context("lock failed")?,
        Command::Unlock => engine.unlock().await.context("unlock failed")?,
        _ => return Ok(false),
    }
    Ok(true)
}

async fn run_switch(mut switch: MediaSwitch, command: &Command) -> Result<()> {
    if !set_lock(&mut switch, command).await? {
        match command {
            Command::Select { input } => switch
                .select_source(*input)
                .await
                .with_context(|| format!("failed to select input {input}"))?,
            Command::Route { .. } => bail!("`route` requires --topology matrix"),
            _ => {}
        }
    }
    print_switch(&switch);
    Ok(())
}

async fn run_matrix(mut matrix: MediaMatrix, command: &Command) -> Result<()> {
    if !set_lock(&mut matrix, command).await? {
        match command {
            Command::Route { input, output } => matrix
                .set_route(*input, *output)
                .await
                .with_context(|| format!("failed to route input {input} to output {output}"))?,
            Command::Select { .. } => bail!("`select` is not available on a matrix; use `route`"),
            _ => {}
        }
    }
    print_matrix(&matrix);
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_panel<T: Topology>(engine: &Engine<T>) {
    println!("Machine id:      0x{:02x}", engine.machine_id());
    println!("Inputs:          {}", engine.input_count());
    println!("Outputs:         {}", engine.output_count());
    println!(
        "Panel:           {}",
        if engine.is_locked() { "locked" } else { "unlocked" }
    );
}

fn print_switch(switch: &MediaSwitch) {
    print_panel(switch);
    println!("Output:          {}", switch.output_number());
    println!("Video source:    {}", switch.selected_source());
    if let Some(audio) = switch.selected_audio_source() {
        println!("Audio source:    {audio}");
    }
}

fn print_matrix(matrix: &MediaMatrix) {
    print_panel(matrix);
    println!();
    println!("Output  Input");
    for (output, input) in matrix.routing_table().iter().enumerate() {
        println!("{:>6}  {:>5}", output, input);
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(true).init();

    let mut builder = P2kBuilder::new()
        .host(&cli.host)
        .command_timeout(Duration::from_millis(cli.timeout_ms));
    if let Some(port) = cli.port {
        builder = builder.port(port);
    }
    if let Some(id) = cli.machine_id {
        builder = builder.machine_id(id);
    }

    let device = builder
        .connect()
        .await
        .with_context(|| format!("failed to connect to {}", cli.host))?;
    debug!(host = %cli.host, port = ?cli.port, "connected");

    let result = match cli.topology {
        TopologyKind::Switch => {
            let switch = builder
                .build_switch(device.clone())
                .await
                .context("initial refresh failed")?;
            run_switch(switch, &cli.command).await
        }
        TopologyKind::Output => {
            let switch = builder
                .build_output_switch(device.clone(), cli.output)
                .await
                .context("initial refresh failed")?;
            run_switch(switch, &cli.command).await
        }
        TopologyKind::Matrix => {
            let matrix = builder
                .build_matrix(device.clone(), cli.outputs)
                .await
                .context("initial refresh failed")?;
            run_matrix(matrix, &cli.command).await
        }
    };

    device.lock().await.close().await.ok();
    result
}
