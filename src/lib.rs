//! # sunflower_lights_rs
//!
//! An async Rust library for controlling Yeelight Sunflower bulbs through their
//! LAN hub.
//!
//! The hub is found with a UDP broadcast and then driven over a small TCP line
//! protocol. On top of that this crate keeps a durable registry of the bulbs
//! the hub has shown, couples on/off with brightness in one place, and saves
//! and replays multi-light presets.
//!
//! ## Quick Start
//!
//! ```ignore
//! use sunflower_lights_rs::{ConfigStore, Driver, DriverOptions, Hub, HubOptions, Kelvin};
//!
//! async fn evening() -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = Driver::with_store(
//!         Hub::new(HubOptions::default()),
//!         DriverOptions::default(),
//!         ConfigStore::new("sunflower.json"),
//!     )?;
//!
//!     // Finds the hub on first run, then remembers it
//!     driver.start().await?;
//!
//!     for light in driver.lights().await {
//!         driver.set_brightness(light.id(), 0.4).await?;
//!         let warm = Kelvin::create(2700).ok_or("bad temperature")?;
//!         driver.set_color(light.id(), warm).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Runtime Agnostic**: Works with tokio, async-std, or smol async runtimes
//! - **Discovery**: Find the hub on your network with [`discover_hub`]
//! - **Registry**: Lights are added as they are discovered and never forgotten
//!   while offline, see [`HubConfig`]
//! - **State Coupling**: One pure [`transition`] decides how on/off, brightness
//!   and color interact
//! - **Color**: Hue/saturation with [`HueSaturation`] or white temperature with
//!   [`Kelvin`], converted by [`hsv_to_rgb`] and [`temperature_to_rgb`]
//! - **Presets**: Capture and replay scenes with [`PresetStore`]
//! - **Persistence**: The whole configuration is one JSON document, see
//!   [`ConfigStore`]
//!
//! ## Communication
//!
//! Discovery broadcasts on UDP port 1990. Commands go to the hub on TCP port
//! 10003, one connection per command, and are queued so only one is in flight
//! at a time.
//!
//! ## Runtime Selection
//!
//! This library is runtime-agnostic. Select your preferred runtime using feature flags:
//!
//! ### Using tokio (default)
//!
//! ```toml
//! [dependencies]
//! sunflower-lights-rs = "0.1"
//! tokio = { version = "1", features = ["rt-multi-thread", "macros"] }
//! ```
//!
//! ### Using async-std
//!
//! ```toml
//! [dependencies]
//! sunflower-lights-rs = { version = "0.1", default-features = false, features = ["runtime-async-std"] }
//! async-std = { version = "1.12", features = ["attributes"] }
//! ```
//!
//! ### Using smol
//!
//! ```toml
//! [dependencies]
//! sunflower-lights-rs = { version = "0.1", default-features = false, features = ["runtime-smol"] }
//! smol = "2"
//! ```
//!
//! ## Feature Flags
//!
//! - `runtime-tokio` (default): Use the tokio async runtime
//! - `runtime-async-std`: Use the async-std runtime
//! - `runtime-smol`: Use the smol runtime

mod convert;
mod discovery;
mod driver;
mod errors;
mod history;
mod hub;
mod light;
mod presets;
mod protocol;
mod registry;
pub mod runtime;
mod state;
mod store;
mod transport;
mod types;

#[cfg(test)]
mod testing;

// Re-export public API
pub use convert::{hsv_to_rgb, temperature_to_rgb};
pub use discovery::{DISCOVERY_PORT, discover_hub};
pub use driver::{DeleteConfirmation, Driver, DriverOptions};
pub use errors::{Error, LightFailure};
pub use history::{HistoryEntry, HistorySummary, MessageHistory, MessageType};
pub use hub::{Hub, HubOptions};
pub use light::{
    BrightnessControllable, Capability, ColorControllable, Light, OnOffControllable, default_name,
};
pub use presets::{Preset, PresetStore, Selection, Snapshot, capture};
pub use protocol::{ALL_LIGHTS, Command, Control, LightReport, parse_light_list};
pub use registry::HubConfig;
pub use state::{HubStep, LightState, OFF_THRESHOLD, StateRequest, Transition, apply, transition};
pub use store::{ConfigStore, DriverConfig};
pub use transport::HubTransport;
pub use types::{Brightness, Color, ColorIntent, HueSaturation, Kelvin};
