//! i2c-bridge Server Binary
//!
//! Opens the bus once and serves it over TCP.

use std::process;
use std::sync::Arc;

use clap::Parser;
use i2c_bridge::bus::SimulatedBus;
use i2c_bridge::config::{parse_address, DEFAULT_PORT};
use i2c_bridge::network::Server;
use i2c_bridge::{ServerConfig, SharedBus};
use tracing_subscriber::{fmt, EnvFilter};

/// i2c-bridge Server
#[derive(Parser, Debug)]
#[command(name = "i2c-bridge-server")]
#[command(about = "Serve an I2C bus to remote clients over TCP")]
#[command(version)]
struct Args {
    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Listen port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// I2C bus number
    #[arg(short, long, default_value_t = 1)]
    bus: u32,

    /// Worker threads serving client connections
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Idle client timeout in milliseconds
    #[arg(long, default_value_t = 60_000)]
    read_timeout_ms: u64,

    /// Address of a simulated device to attach (repeatable, e.g. -d 0x50)
    #[arg(short = 'd', long = "device", value_parser = parse_address)]
    devices: Vec<u8>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize tracing/logging
    let default_filter = if args.verbose {
        "debug,i2c_bridge=debug"
    } else {
        "info,i2c_bridge=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    tracing::info!("i2c-bridge server v{}", i2c_bridge::VERSION);

    let config = ServerConfig::builder()
        .listen_addr(format!("{}:{}", args.host, args.port))
        .bus_number(args.bus)
        .workers(args.workers)
        .read_timeout_ms(args.read_timeout_ms)
        .build();

    if args.devices.is_empty() {
        tracing::warn!("No simulated devices attached; scans will find nothing");
    }
    let simulated = args
        .devices
        .iter()
        .fold(SimulatedBus::new(), |bus, &address| bus.with_device(address));

    // Open the bus exactly once
    let bus = match SharedBus::open(simulated, config.bus_number, config.bus_lock_timeout()) {
        Ok(bus) => Arc::new(bus),
        Err(e) => {
            tracing::error!("Failed to initialize I2C bus {}: {}", config.bus_number, e);
            process::exit(1);
        }
    };

    let server = match Server::bind(config, Arc::clone(&bus)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            bus.close();
            process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.shutdown();
    }) {
        tracing::warn!("Cannot install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        process::exit(1);
    }

    tracing::info!("Server stopped");
}
