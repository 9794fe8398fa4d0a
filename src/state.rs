//! Applying state requests to a light.
//!
//! [`transition`] is the single place where on/off, brightness and color are
//! coupled. It is pure: it returns the next state plus the hub commands that
//! realize it. [`apply`] then sends those commands in order.

use std::net::Ipv4Addr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::light::Light;
use crate::transport::HubTransport;
use crate::types::{Brightness, Color, ColorIntent};

type Result<T> = std::result::Result<T, Error>;

/// Brightness below this turns the light off.
pub const OFF_THRESHOLD: f64 = 0.08;

/// Runtime state of one light.
///
/// `brightness == 0` exactly when `on == false` for every state produced by
/// [`transition`].
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LightState {
    pub on: bool,
    pub brightness: Brightness,
    pub color: Option<ColorIntent>,
}

impl LightState {
    /// On means "emitting light", which is decided by brightness alone.
    pub fn is_on(&self) -> bool {
        !self.brightness.is_off()
    }

    /// A request that would reproduce this state.
    pub fn as_request(&self) -> StateRequest {
        StateRequest {
            on: Some(self.on),
            brightness: Some(self.brightness.value()),
            color: self.color,
        }
    }

    /// This state with on/off and brightness taken from a hub level.
    pub(crate) fn with_level(self, level: u8) -> Self {
        let (on, brightness) = couple(Brightness::from_level(level));
        LightState {
            on,
            brightness,
            ..self
        }
    }
}

/// A batched change to any of a light's channels.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StateRequest {
    pub on: Option<bool>,
    /// 0.0-1.0; out-of-range values are clamped.
    pub brightness: Option<f64>,
    pub color: Option<ColorIntent>,
}

impl StateRequest {
    pub fn on_off(on: bool) -> Self {
        StateRequest {
            on: Some(on),
            ..Default::default()
        }
    }

    pub fn brightness(brightness: f64) -> Self {
        StateRequest {
            brightness: Some(brightness),
            ..Default::default()
        }
    }

    pub fn color(color: impl Into<ColorIntent>) -> Self {
        StateRequest {
            color: Some(color.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.on.is_none() && self.brightness.is_none() && self.color.is_none()
    }
}

/// One hub command produced by a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HubStep {
    OnOff(bool),
    Brightness(Brightness),
    Color(Color),
}

impl HubStep {
    async fn send<T: HubTransport>(&self, transport: &T, ip: Ipv4Addr, id: &str) -> Result<()> {
        match *self {
            HubStep::OnOff(on) => transport.set_on_off(ip, id, on).await,
            HubStep::Brightness(b) => transport.set_brightness(ip, id, b).await,
            HubStep::Color(c) => transport.set_color(ip, id, c).await,
        }
    }
}

/// Result of [`transition`]: where the light ends up and how to get it there.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: LightState,
    pub steps: Vec<HubStep>,
}

/// Compute the next state for `request`.
///
/// Fields are handled in a fixed order so later ones win:
///
/// 1. `on` is sent as-is. Without an explicit brightness, brightness follows
///    it (full when on, zero when off).
/// 2. `brightness` is clamped to 0-1; anything under [`OFF_THRESHOLD`] becomes
///    zero and switches the light off, anything else switches it on. The
///    coupled value is what gets sent.
/// 3. `color` is resolved to RGB at full value; brightness stays its own
///    channel.
///
/// # Examples
///
/// ```
/// use sunflower_lights_rs::{transition, LightState, StateRequest};
///
/// let next = transition(&LightState::default(), &StateRequest::brightness(0.05));
/// assert!(!next.state.on);
/// assert_eq!(next.state.brightness.value(), 0.0);
/// ```
pub fn transition(current: &LightState, request: &StateRequest) -> Transition {
    let mut next = *current;
    let mut steps = Vec::new();

    if let Some(on) = request.on {
        steps.push(HubStep::OnOff(on));
        next.on = on;
        if request.brightness.is_none() {
            next.brightness = if on { Brightness::FULL } else { Brightness::OFF };
        }
    }

    if let Some(requested) = request.brightness {
        let (on, brightness) = couple(Brightness::clamped(requested));
        steps.push(HubStep::Brightness(brightness));
        next.on = on;
        next.brightness = brightness;
    }

    if let Some(intent) = request.color {
        steps.push(HubStep::Color(intent.to_color()));
        next.color = Some(intent);
    }

    Transition { state: next, steps }
}

/// Apply `request` to `light` through `transport`.
///
/// The light's cached state moves to the requested state before any command
/// is sent and is flagged pending until every command succeeded. On the first
/// failing command the remaining ones are skipped and the error is returned;
/// the light stays pending so a later reconcile can correct it.
pub async fn apply<T: HubTransport>(
    transport: &T,
    ip: Ipv4Addr,
    light: &mut Light,
    request: &StateRequest,
) -> Result<Light> {
    if request.is_empty() {
        return Err(Error::EmptyRequest);
    }

    let Transition { state, steps } = transition(light.state(), request);
    debug!("light {}: {:?} -> {:?}", light.id(), light.state(), state);
    light.set_state(state);
    light.mark_pending(true);

    for step in &steps {
        if let Err(e) = step.send(transport, ip, light.id()).await {
            warn!("light {}: {:?} failed: {}", light.id(), step, e);
            return Err(e);
        }
    }

    light.mark_pending(false);
    Ok(light.clone())
}

fn couple(brightness: Brightness) -> (bool, Brightness) {
    if brightness.value() < OFF_THRESHOLD {
        (false, Brightness::OFF)
    } else {
        (true, brightness)
    }
}
