//! Hub command framing.
//!
//! The hub speaks a line protocol over TCP: one command per connection, one
//! reply line back. Only the shapes below are used; everything else the hub
//! may send is ignored.

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::types::{Brightness, Color};

type Result<T> = std::result::Result<T, Error>;

/// Light id the hub interprets as "every light".
pub const ALL_LIGHTS: &str = "0000";

const LINE_END: &str = "\r\n";
const HEARTBEAT_ACK: &str = "HACK";
const CONTROL_ACK: &str = "CACK";
const LIGHT_LIST_PREFIX: &str = "GLB";

/// A control command for a single light (or all of them).
///
/// Unset attributes are sent as empty fields, which the hub leaves untouched.
///
/// # Examples
///
/// ```
/// use sunflower_lights_rs::{Brightness, Color, Control};
///
/// let mut control = Control::new("7B17");
/// control.color(&Color::rgb(255, 0, 0));
/// control.brightness(&Brightness::FULL);
/// assert_eq!(control.encode(), "C 7B17,255,0,0,100,\r\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub(crate) id: String,
    pub(crate) color: Option<Color>,
    pub(crate) level: Option<u8>,
}

impl Control {
    pub fn new(id: &str) -> Self {
        Control {
            id: id.to_string(),
            color: None,
            level: None,
        }
    }

    /// Set the RGB color.
    pub fn color(&mut self, color: &Color) -> &mut Self {
        self.color = Some(*color);
        self
    }

    /// Set the brightness, translated to the hub's 0-100 level.
    pub fn brightness(&mut self, brightness: &Brightness) -> &mut Self {
        self.level = Some(brightness.level());
        self
    }

    /// Set the raw hub level (0-100).
    pub fn level(&mut self, level: u8) -> &mut Self {
        self.level = Some(level.min(100));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Check if this command changes anything at all.
    pub fn is_valid(&self) -> bool {
        self.color.is_some() || self.level.is_some()
    }

    pub fn encode(&self) -> String {
        let (r, g, b) = match &self.color {
            Some(c) => (
                c.red.to_string(),
                c.green.to_string(),
                c.blue.to_string(),
            ),
            None => Default::default(),
        };
        let level = self.level.map(|l| l.to_string()).unwrap_or_default();
        format!("C {},{r},{g},{b},{level},{LINE_END}", self.id)
    }
}

/// Every command the hub client issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Liveness probe.
    Heartbeat,
    /// Query all lights known to the hub.
    GetLights,
    /// Set color and/or level of one light.
    Control(Control),
}

impl Command {
    pub fn encode(&self) -> String {
        match self {
            Command::Heartbeat => format!("HB{LINE_END}"),
            Command::GetLights => format!("GL{LINE_END}"),
            Command::Control(control) => control.encode(),
        }
    }

    /// Short name for logs and history.
    pub fn method(&self) -> &'static str {
        match self {
            Command::Heartbeat => "heartbeat",
            Command::GetLights => "getLights",
            Command::Control(_) => "control",
        }
    }

    /// Checks a reply for the acknowledgment this command expects.
    ///
    /// `GetLights` replies carry data and are parsed with [`parse_light_list`].
    pub(crate) fn check_ack(&self, reply: &str) -> Result<()> {
        let expected = match self {
            Command::Heartbeat => HEARTBEAT_ACK,
            Command::Control(_) => CONTROL_ACK,
            Command::GetLights => return Ok(()),
        };
        if reply.trim().starts_with(expected) {
            Ok(())
        } else {
            Err(Error::Protocol(format!(
                "expected {expected} for {}, got {reply:?}",
                self.method()
            )))
        }
    }
}

impl From<Control> for Command {
    fn from(control: Control) -> Self {
        Command::Control(control)
    }
}

/// Point-in-time state of one light, as reported by the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightReport {
    pub id: String,
    pub online: bool,
    #[serde(flatten)]
    pub color: Color,
    pub level: u8,
}

impl LightReport {
    pub fn is_on(&self) -> bool {
        self.level > 0
    }
}

/// Parse a light-list reply: `GLB id,type,online,r,g,b,level,...;id,...;`.
///
/// Any malformed entry makes the whole reply malformed.
///
/// # Examples
///
/// ```
/// use sunflower_lights_rs::parse_light_list;
///
/// let lights = parse_light_list("GLB 7B17,1,1,255,0,0,80,0;91AC,1,0,0,0,255,0,0;\r\n").unwrap();
/// assert_eq!(lights.len(), 2);
/// assert_eq!(lights[0].id, "7B17");
/// assert_eq!(lights[0].level, 80);
/// assert!(!lights[1].online);
/// ```
pub fn parse_light_list(reply: &str) -> Result<Vec<LightReport>> {
    let body = reply
        .trim()
        .strip_prefix(LIGHT_LIST_PREFIX)
        .ok_or_else(|| Error::Protocol(format!("not a light list: {reply:?}")))?;

    body.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_entry)
        .collect()
}

fn parse_entry(entry: &str) -> Result<LightReport> {
    let fields: Vec<&str> = entry.split(',').map(str::trim).collect();
    let [id, _kind, online, r, g, b, level, ..] = fields.as_slice() else {
        return Err(Error::Protocol(format!("short light entry {entry:?}")));
    };
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::Protocol(format!("bad light id in {entry:?}")));
    }

    let number = |field: &str| {
        field
            .parse::<u8>()
            .map_err(|e| Error::Protocol(format!("bad field {field:?} in {entry:?}: {e}")))
    };

    Ok(LightReport {
        id: id.to_uppercase(),
        online: number(*online)? != 0,
        color: Color::rgb(number(*r)?, number(*g)?, number(*b)?),
        level: number(*level)?.min(100),
    })
}
