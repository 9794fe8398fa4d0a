//! In-memory hub used by the unit tests.

use std::collections::HashSet;
use std::io;
use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::time::Duration;

use crate::errors::Error;
use crate::protocol::{ALL_LIGHTS, Control, LightReport};
use crate::runtime;
use crate::transport::HubTransport;
use crate::types::Color;

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Default)]
struct Inner {
    address: Option<Ipv4Addr>,
    lights: Vec<LightReport>,
    sent: Vec<Control>,
    failing: HashSet<String>,
    fail_after: Option<usize>,
    malformed: bool,
    dead: bool,
    delay: Option<Duration>,
}

/// Answers from a light table and records every accepted control command.
#[derive(Debug, Default)]
pub struct FakeHub {
    inner: Mutex<Inner>,
}

impl FakeHub {
    pub const ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 20);

    /// A discoverable hub with the given lights, all off and white.
    pub fn with_lights(ids: &[&str]) -> Self {
        let hub = FakeHub::default();
        {
            let mut inner = hub.inner.lock().unwrap();
            inner.address = Some(Self::ADDRESS);
            inner.lights = ids
                .iter()
                .map(|id| LightReport {
                    id: id.to_string(),
                    online: true,
                    color: Color::rgb(255, 255, 255),
                    level: 0,
                })
                .collect();
        }
        hub
    }

    pub fn set_lights(&self, lights: Vec<LightReport>) {
        self.inner.lock().unwrap().lights = lights;
    }

    pub fn set_report(&self, id: &str, color: Color, level: u8) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(light) = inner.lights.iter_mut().find(|l| l.id == id) {
            light.color = color;
            light.level = level;
        }
    }

    pub fn fail_light(&self, id: &str) {
        self.inner.lock().unwrap().failing.insert(id.to_string());
    }

    /// Accept `n` more control commands, then fail all of them.
    pub fn fail_after(&self, n: usize) {
        self.inner.lock().unwrap().fail_after = Some(n);
    }

    /// Make the light list unparseable.
    pub fn send_garbage(&self) {
        self.inner.lock().unwrap().malformed = true;
    }

    /// Make every control command take `delay` before it is answered.
    pub fn slow_down(&self, delay: Duration) {
        self.inner.lock().unwrap().delay = Some(delay);
    }

    /// Stop answering heartbeats and discovery.
    pub fn kill(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.dead = true;
    }

    pub fn sent(&self) -> Vec<Control> {
        self.inner.lock().unwrap().sent.clone()
    }

    pub fn sent_lines(&self) -> Vec<String> {
        self.sent().iter().map(Control::encode).collect()
    }

    pub fn clear_sent(&self) {
        self.inner.lock().unwrap().sent.clear();
    }
}

fn refused(action: &str) -> Error {
    Error::socket(action, io::Error::from(io::ErrorKind::ConnectionRefused))
}

impl HubTransport for FakeHub {
    async fn discover(&self, timeout: Duration) -> Result<Ipv4Addr> {
        let inner = self.inner.lock().unwrap();
        match inner.address {
            Some(ip) if !inner.dead => Ok(ip),
            _ => Err(Error::Discovery { timeout }),
        }
    }

    async fn heartbeat(&self, ip: Ipv4Addr, _timeout: Duration) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        if inner.dead || inner.address != Some(ip) {
            return Err(Error::unreachable(&ip, "no acknowledgment"));
        }
        Ok(())
    }

    async fn get_lights(&self, ip: Ipv4Addr) -> Result<Vec<LightReport>> {
        let inner = self.inner.lock().unwrap();
        if inner.dead || inner.address != Some(ip) {
            return Err(refused("connect"));
        }
        if inner.malformed {
            return Err(Error::Protocol("garbage".into()));
        }
        Ok(inner.lights.clone())
    }

    async fn control(&self, ip: Ipv4Addr, control: Control) -> Result<()> {
        let delay = self.inner.lock().unwrap().delay;
        if let Some(delay) = delay {
            runtime::sleep(delay).await;
        }

        let mut inner = self.inner.lock().unwrap();
        if inner.dead || inner.address != Some(ip) || inner.failing.contains(&control.id) {
            return Err(refused("connect"));
        }
        if let Some(left) = inner.fail_after {
            if left == 0 {
                return Err(refused("connect"));
            }
            inner.fail_after = Some(left - 1);
        }

        for light in inner
            .lights
            .iter_mut()
            .filter(|l| control.id == ALL_LIGHTS || l.id == control.id)
        {
            if let Some(color) = control.color {
                light.color = color;
            }
            if let Some(level) = control.level {
                light.level = level;
            }
        }
        inner.sent.push(control);
        Ok(())
    }
}
