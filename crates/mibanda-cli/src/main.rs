//! Command line tool for Xiaomi Mi Band trackers
//!
//! Scans for bands, reads their status, sends control commands, and decodes
//! btsnoop captures of band traffic.

use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use mibanda::trace::{classify, CapturedPacket, Flow};
use mibanda::{
    AddressType, AttSocket, BandSession, BdAddr, BtsnoopReader, DiscoveryConfig, HandleRegistry,
    SessionConfig, UserProfile,
};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "mibanda")]
#[command(about = "Talk to Xiaomi Mi Band fitness trackers over Bluetooth LE")]
struct Cli {
    /// HCI adapter index (0 for hci0)
    #[arg(short, long, global = true, default_value_t = 0)]
    adapter: u16,

    /// The band uses a random address
    #[arg(long, global = true)]
    random: bool,

    /// Seconds to wait for a response (or to scan)
    #[arg(short, long, global = true)]
    timeout: Option<u64>,

    /// Increase logging verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Gender {
    Male,
    Female,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for nearby bands
    Scan,
    /// Show name, battery, firmware, steps and connection parameters
    Info {
        /// Band address (XX:XX:XX:XX:XX:XX)
        address: BdAddr,
    },
    /// Write the user profile
    SetUser {
        address: BdAddr,
        #[arg(long)]
        uid: u32,
        #[arg(long, value_enum)]
        gender: Gender,
        #[arg(long)]
        age: u8,
        /// Height in cm
        #[arg(long)]
        height: u8,
        /// Weight in kg
        #[arg(long)]
        weight: u8,
        #[arg(long = "type", default_value_t = 0)]
        kind: u8,
        /// Exactly ten characters
        #[arg(long)]
        alias: String,
    },
    /// Flash the LEDs; each level from 1 (dim) to 6 (bright)
    Flash {
        address: BdAddr,
        r: u8,
        g: u8,
        b: u8,
    },
    /// Make the band vibrate
    Locate { address: BdAddr },
    /// Start the band's self test
    SelfTest { address: BdAddr },
    /// Trigger pairing
    Pair { address: BdAddr },
    /// Decode a btsnoop capture of band traffic
    Trace {
        /// Capture file
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = SessionConfig {
        adapter: cli.adapter,
        ..Default::default()
    };
    if cli.random {
        config.address_type = AddressType::Random;
    }
    if let Some(seconds) = cli.timeout {
        config.timeout = Duration::from_secs(seconds);
    }

    match cli.command {
        Commands::Scan => {
            let mut discovery = DiscoveryConfig {
                adapter: cli.adapter,
                ..Default::default()
            };
            if let Some(seconds) = cli.timeout {
                discovery.timeout = Duration::from_secs(seconds);
            }
            scan(&discovery)?;
        }
        Commands::Info { address } => {
            let mut band = connect(address, &config)?;
            show_info(&mut band)?;
        }
        Commands::SetUser {
            address,
            uid,
            gender,
            age,
            height,
            weight,
            kind,
            alias,
        } => {
            let profile = UserProfile::new(
                uid,
                matches!(gender, Gender::Male),
                age,
                height,
                weight,
                kind,
                alias.as_bytes(),
            )?;
            connect(address, &config)?.write_user_profile(&profile)?;
            println!("User profile written");
        }
        Commands::Flash { address, r, g, b } => {
            connect(address, &config)?.flash_leds(r, g, b)?;
        }
        Commands::Locate { address } => {
            connect(address, &config)?.locate()?;
        }
        Commands::SelfTest { address } => {
            connect(address, &config)?.self_test()?;
        }
        Commands::Pair { address } => {
            connect(address, &config)?.pair()?;
        }
        Commands::Trace { file } => {
            trace(&file)?;
        }
    }

    Ok(())
}

fn connect(
    address: BdAddr,
    config: &SessionConfig,
) -> Result<BandSession<AttSocket>, Box<dyn std::error::Error>> {
    info!("Connecting to {}", address);
    Ok(BandSession::connect(address, "", config)?)
}

fn scan(config: &DiscoveryConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Scanning for {} seconds...", config.timeout.as_secs());

    let devices = mibanda::discover(config)?;
    println!("\nFound {} devices:", devices.len());
    for (address, name) in devices {
        println!("  {}  {}", address, name);
    }

    Ok(())
}

fn show_info(band: &mut BandSession<AttSocket>) -> Result<(), Box<dyn std::error::Error>> {
    let name = band.read_name(true)?;
    println!("Address:   {}", band.address());
    println!("Name:      {}", name);

    let device = band.read_device_info()?;
    println!("Firmware:  {}", device.firmware_version);

    let battery = band.read_battery()?;
    println!(
        "Battery:   {}% ({}), charged {} times, last {}",
        battery.level, battery.status, battery.charge_counter, battery.last_charged
    );

    println!("Steps:     {}", band.read_steps()?);

    let params = band.read_le_params()?;
    println!(
        "LE params: interval {}-{} (current {}), latency {}, timeout {}, advertising {}",
        params.minimum_connection_interval,
        params.maximum_connection_interval,
        params.connection_interval,
        params.latency,
        params.timeout,
        params.advertisement_interval
    );

    Ok(())
}

fn trace(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let reader = BtsnoopReader::new(BufReader::new(File::open(path)?))?;
    let datalink = reader.datalink();
    let registry = HandleRegistry::default();

    for (index, record) in reader.enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("Stopping at record {}: {}", index, e);
                break;
            }
        };

        let packet = CapturedPacket::from_record(&record, datalink);
        let (event, flow) = classify(&packet, &registry);
        if let Some(event) = event {
            println!("{:4} {}", index, event);
        }
        if flow == Flow::Stop {
            break;
        }
    }

    Ok(())
}
