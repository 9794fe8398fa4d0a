//! CLI application for controlling Yeelight Sunflower lights.
//!
//! This example demonstrates a full-featured command-line interface on top of
//! the driver: discovery, per-light control, presets and configuration.
//!
//! Run with: cargo run --example sunflower_cli -- --help

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;
use sunflower_lights_rs::{
    ConfigStore, Driver, DriverOptions, Hub, HubOptions, HueSaturation, Kelvin, Selection,
    discover_hub,
};

#[derive(Parser)]
#[command(name = "sunflower-cli")]
#[command(about = "Control Yeelight Sunflower lights from the command line", long_about = None)]
struct Cli {
    /// IP address of the hub (skips discovery)
    #[arg(short, long, global = true)]
    ip: Option<Ipv4Addr>,

    /// Configuration file holding known lights and presets
    #[arg(short, long, global = true, default_value = "sunflower.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the hub on the network
    Discover {
        /// Discovery timeout in seconds (default: 3)
        #[arg(short, long, default_value = "3")]
        timeout: u64,
    },

    /// Scan the hub for new lights
    Scan,

    /// List known lights
    Status,

    /// Check that the hub answers
    Check,

    /// Turn a light on
    On { id: String },

    /// Turn a light off
    Off { id: String },

    /// Toggle a light on/off
    Toggle { id: String },

    /// Turn every light off
    AllOff,

    /// Set brightness in percent (0-100)
    Brightness {
        id: String,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
    },

    /// Set hue (0-360 degrees) and saturation (0-100)
    Hue {
        id: String,
        #[arg(value_parser = clap::value_parser!(u16).range(0..=360))]
        hue: u16,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        saturation: u8,
    },

    /// Set color temperature in Kelvin (2000-6500)
    Temperature {
        id: String,
        #[arg(value_parser = clap::value_parser!(u16).range(2000..=6500))]
        kelvin: u16,
    },

    /// Give a light a display name (empty restores the default)
    Rename { id: String, name: String },

    /// List saved presets
    Presets,

    /// Save the current state of some lights as a preset
    SavePreset {
        name: String,
        /// "all" or a comma-separated list of light ids
        #[arg(default_value = "all")]
        lights: Selection,
    },

    /// Activate a preset
    Preset { name: String },

    /// Delete a preset
    DeletePreset {
        name: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Forget the hub and all lights, then scan again
    Reset {
        /// Also delete all presets
        #[arg(long)]
        drop_presets: bool,
    },

    /// Show the hub command history
    Diagnostics,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Discover { timeout } = cli.command {
        println!("Discovering the hub (timeout: {}s)...", timeout);
        match discover_hub(HubOptions::default().discovery_port, Duration::from_secs(timeout)).await
        {
            Ok(ip) => println!("Found hub at {}", ip),
            Err(e) => eprintln!("Error during discovery: {}", e),
        }
        return Ok(());
    }

    let driver = Driver::with_store(
        Hub::new(HubOptions::default()),
        DriverOptions::default(),
        ConfigStore::new(&cli.config),
    )?;

    match cli.ip {
        Some(ip) => {
            driver.set_ip(ip).await?;
        }
        None => {
            if let Err(e) = driver.start().await {
                eprintln!("{}; pass --ip to use a known hub address", e);
                return Ok(());
            }
        }
    }

    match cli.command {
        Commands::Discover { .. } => unreachable!(),

        Commands::Scan => {
            let added = driver.scan().await?;
            if added.is_empty() {
                println!("No new lights.");
            } else {
                println!("Added {} light(s): {}", added.len(), added.join(", "));
            }
        }

        Commands::Status => {
            let on = driver.on_lights().await.unwrap_or_default();
            let lights = driver.lights().await;
            if lights.is_empty() {
                println!("No lights known.");
            }
            for light in lights {
                let marker = if on.iter().any(|id| id == light.id()) {
                    "ON"
                } else {
                    "OFF"
                };
                println!("  {:6}  {:20}  {}", light.id(), light.name(), marker);
            }
        }

        Commands::Check => match driver.check_hub().await {
            Ok(()) => println!("✓ Hub is answering"),
            Err(e) => eprintln!("✗ {}", e),
        },

        Commands::On { id } => {
            driver.set_on_off(&id, true).await?;
            println!("✓ {} on", id);
        }

        Commands::Off { id } => {
            driver.set_on_off(&id, false).await?;
            println!("✓ {} off", id);
        }

        Commands::Toggle { id } => {
            let light = driver.toggle(&id).await?;
            println!("✓ {} toggled ({})", id, if light.state().on { "on" } else { "off" });
        }

        Commands::AllOff => {
            driver.all_off().await?;
            println!("✓ All lights off");
        }

        Commands::Brightness { id, percent } => {
            let light = driver
                .set_brightness(&id, f64::from(percent) / 100.0)
                .await?;
            println!("✓ {} brightness {}", id, light.state().brightness.level());
        }

        Commands::Hue {
            id,
            hue,
            saturation,
        } => {
            let color = HueSaturation::create(f64::from(hue) / 360.0, f64::from(saturation) / 100.0)
                .ok_or("invalid hue or saturation")?;
            driver.set_color(&id, color).await?;
            println!("✓ {} color set", id);
        }

        Commands::Temperature { id, kelvin } => {
            let kelvin = Kelvin::create(kelvin).ok_or("invalid temperature")?;
            driver.set_color(&id, kelvin).await?;
            println!("✓ {} temperature set to {}K", id, kelvin.kelvin());
        }

        Commands::Rename { id, name } => {
            let changed = driver.rename(&HashMap::from([(id.clone(), name)])).await?;
            if changed == 0 {
                println!("Nothing renamed.");
            } else if let Ok(light) = driver.light(&id).await {
                println!("✓ {} is now {:?}", id, light.name());
            }
        }

        Commands::Presets => {
            let names = driver.preset_names().await;
            if names.is_empty() {
                println!("No presets saved.");
            }
            for name in names {
                let preset = driver.preset(&name).await?;
                println!("  {:20}  {} light(s)", name, preset.snapshots.len());
            }
        }

        Commands::SavePreset { name, lights } => {
            let preset = driver.save_preset(&name, &lights).await?;
            println!(
                "✓ Saved {:?} with {} light(s)",
                preset.name,
                preset.snapshots.len()
            );
        }

        Commands::Preset { name } => match driver.activate_preset(&name).await {
            Ok(()) => println!("✓ Activated {:?}", name),
            Err(e) => eprintln!("✗ {}", e),
        },

        Commands::DeletePreset { name, yes } => {
            let confirmation = driver.request_delete_preset(&name).await?;
            if !yes {
                println!("Really delete {:?}? [y/N]", confirmation.name);
                let mut answer = String::new();
                std::io::stdin().read_line(&mut answer)?;
                if !answer.trim().eq_ignore_ascii_case("y") {
                    println!("Kept.");
                    return Ok(());
                }
            }
            driver.confirm_delete_preset(confirmation).await?;
            println!("✓ Deleted {:?}", name);
        }

        Commands::Reset { drop_presets } => {
            let added = driver.reset(!drop_presets).await?;
            println!("✓ Reset; {} light(s) found", added.len());
        }

        Commands::Diagnostics => {
            let summary = driver.transport().history_summary().await;
            println!("Hub command history:");
            println!("  Sent: {}", summary.send_count);
            println!("  Received: {}", summary.receive_count);
            if let Some(error) = summary.last_error {
                println!("  Last error: {}", error);
            }
            for entry in driver.transport().history().await.entries() {
                println!(
                    "  {:8.3}s  {:?}  {}",
                    entry.timestamp,
                    entry.msg_type,
                    entry.line.trim_end()
                );
            }
        }
    }

    Ok(())
}
