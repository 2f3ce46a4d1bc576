//! i2c-bridge CLI Client
//!
//! Command-line interface for a remote I2C bus.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use i2c_bridge::config::{parse_address, parse_byte, parse_word, DEFAULT_PORT};
use i2c_bridge::{Client, ClientConfig, I2cBus, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// i2c-bridge CLI
#[derive(Parser, Debug)]
#[command(name = "i2c-bridge-cli")]
#[command(about = "CLI for a remote I2C bus")]
struct Args {
    /// Server host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Socket timeout in milliseconds
    #[arg(short, long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan for I2C devices
    Scan,

    /// Check that the server and its bus are reachable
    Test,

    /// Read a byte (no register)
    ReadByte {
        #[arg(value_parser = parse_address)]
        address: u8,
    },

    /// Write a byte (no register)
    WriteByte {
        #[arg(value_parser = parse_address)]
        address: u8,
        #[arg(value_parser = parse_byte)]
        value: u8,
    },

    /// Read a byte from a register
    ReadByteData {
        #[arg(value_parser = parse_address)]
        address: u8,
        #[arg(value_parser = parse_byte)]
        register: u8,
    },

    /// Write a byte to a register
    WriteByteData {
        #[arg(value_parser = parse_address)]
        address: u8,
        #[arg(value_parser = parse_byte)]
        register: u8,
        #[arg(value_parser = parse_byte)]
        value: u8,
    },

    /// Read a word from a register
    ReadWordData {
        #[arg(value_parser = parse_address)]
        address: u8,
        #[arg(value_parser = parse_byte)]
        register: u8,
    },

    /// Write a word to a register
    WriteWordData {
        #[arg(value_parser = parse_address)]
        address: u8,
        #[arg(value_parser = parse_byte)]
        register: u8,
        #[arg(value_parser = parse_word)]
        value: u16,
    },

    /// Read a block starting at a register
    ReadBlock {
        #[arg(value_parser = parse_address)]
        address: u8,
        #[arg(value_parser = parse_byte)]
        register: u8,
        #[arg(value_parser = parse_byte)]
        length: u8,
    },

    /// Write a block starting at a register
    WriteBlock {
        #[arg(value_parser = parse_address)]
        address: u8,
        #[arg(value_parser = parse_byte)]
        register: u8,
        #[arg(value_parser = parse_byte, required = true)]
        data: Vec<u8>,
    },

    /// Reset the server's I2C interface
    Reset,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_env_filter(filter).with_target(false).init();

    let config = ClientConfig::builder()
        .host(&args.host)
        .port(args.port)
        .timeout_ms(args.timeout_ms)
        .build();
    let mut client = Client::new(config);

    let outcome = run(&mut client, &args.command);
    client.close();

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(client: &mut Client, command: &Commands) -> Result<()> {
    match *command {
        Commands::Scan => {
            println!("Scanning for I2C devices...");
            let devices = client.scan()?;
            if devices.is_empty() {
                println!("No I2C devices found");
            } else {
                println!("Found devices at addresses: {}", hex_list(&devices));
            }
        }
        Commands::Test => {
            println!("Testing I2C connectivity...");
            let devices = client.scan()?;
            println!("✓ Connected to server at {}", client.config().server_addr());
            println!("✓ I2C bus accessible, found {} devices", devices.len());
        }
        Commands::ReadByte { address } => {
            let value = client.read_byte(address)?;
            println!("0x{:02x}", value);
        }
        Commands::WriteByte { address, value } => {
            client.write_byte(address, value)?;
            println!("OK");
        }
        Commands::ReadByteData { address, register } => {
            let value = client.read_byte_data(address, register)?;
            println!("0x{:02x}", value);
        }
        Commands::WriteByteData { address, register, value } => {
            client.write_byte_data(address, register, value)?;
            println!("OK");
        }
        Commands::ReadWordData { address, register } => {
            let value = client.read_word_data(address, register)?;
            println!("0x{:04x}", value);
        }
        Commands::WriteWordData { address, register, value } => {
            client.write_word_data(address, register, value)?;
            println!("OK");
        }
        Commands::ReadBlock { address, register, length } => {
            let data = client.read_i2c_block_data(address, register, length)?;
            println!("{}", hex_list(&data));
        }
        Commands::WriteBlock { address, register, ref data } => {
            client.write_i2c_block_data(address, register, data)?;
            println!("OK");
        }
        Commands::Reset => {
            let message = client.reset_interface()?;
            println!("{}", message);
        }
    }
    Ok(())
}

fn hex_list(bytes: &[u8]) -> String {
    let items: Vec<String> = bytes.iter().map(|b| format!("0x{:02x}", b)).collect();
    format!("[{}]", items.join(", "))
}
