//! The operations the rest of the crate needs from a hub.

use std::future::Future;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::errors::Error;
use crate::protocol::{ALL_LIGHTS, Control, LightReport};
use crate::types::{Brightness, Color};

type Result<T> = std::result::Result<T, Error>;

/// Hub command surface.
///
/// Every call is one independent round-trip bounded by a timeout. Nothing is
/// retried here; callers decide whether a failure is worth another attempt.
/// [`crate::Hub`] is the network implementation.
pub trait HubTransport: Send + Sync {
    /// Locate a hub on the local network and return its address.
    fn discover(&self, timeout: Duration) -> impl Future<Output = Result<Ipv4Addr>> + Send;

    /// Succeeds only if the hub acknowledges within `timeout`.
    fn heartbeat(&self, ip: Ipv4Addr, timeout: Duration)
    -> impl Future<Output = Result<()>> + Send;

    /// Current state of every light the hub knows about. Not cached.
    fn get_lights(&self, ip: Ipv4Addr) -> impl Future<Output = Result<Vec<LightReport>>> + Send;

    /// Send one control command.
    fn control(&self, ip: Ipv4Addr, control: Control) -> impl Future<Output = Result<()>> + Send;

    /// Combined color and level for one light.
    fn set_light(
        &self,
        ip: Ipv4Addr,
        id: &str,
        color: Color,
        level: u8,
    ) -> impl Future<Output = Result<()>> + Send {
        let mut control = Control::new(id);
        control.color(&color).level(level);
        self.control(ip, control)
    }

    fn set_on_off(
        &self,
        ip: Ipv4Addr,
        id: &str,
        on: bool,
    ) -> impl Future<Output = Result<()>> + Send {
        let mut control = Control::new(id);
        control.brightness(if on { &Brightness::FULL } else { &Brightness::OFF });
        self.control(ip, control)
    }

    fn set_brightness(
        &self,
        ip: Ipv4Addr,
        id: &str,
        brightness: Brightness,
    ) -> impl Future<Output = Result<()>> + Send {
        let mut control = Control::new(id);
        control.brightness(&brightness);
        self.control(ip, control)
    }

    fn set_color(
        &self,
        ip: Ipv4Addr,
        id: &str,
        color: Color,
    ) -> impl Future<Output = Result<()>> + Send {
        let mut control = Control::new(id);
        control.color(&color);
        self.control(ip, control)
    }

    /// Switch every light off with a single command.
    fn all_off(&self, ip: Ipv4Addr) -> impl Future<Output = Result<()>> + Send {
        let mut control = Control::new(ALL_LIGHTS);
        control.brightness(&Brightness::OFF);
        self.control(ip, control)
    }
}
