//! The light aggregate and the channels it exposes.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::protocol::LightReport;
use crate::state::{LightState, StateRequest};
use crate::types::{Brightness, ColorIntent};

/// A channel a light exposes to the host.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    OnOff,
    Brightness,
    Color,
}

/// Lights that can be switched.
pub trait OnOffControllable {
    fn is_on(&self) -> bool;

    /// Request that flips the current on/off state.
    fn toggled(&self) -> StateRequest {
        StateRequest::on_off(!self.is_on())
    }
}

/// Lights whose output can be dimmed.
pub trait BrightnessControllable {
    fn brightness(&self) -> Brightness;

    /// Request that moves brightness by `delta`, staying within 0-1.
    fn stepped(&self, delta: f64) -> StateRequest {
        StateRequest::brightness(Brightness::clamped(self.brightness().value() + delta).value())
    }
}

/// Lights that can change color.
pub trait ColorControllable {
    fn color(&self) -> Option<ColorIntent>;
}

/// One bulb behind the hub.
///
/// The id is assigned by the hub and never changes; the name is free for the
/// user to edit. The runtime state is a cache of what was last requested or
/// observed; it is not persisted.
///
/// # Example
///
/// ```
/// use sunflower_lights_rs::{Light, OnOffControllable};
///
/// let light = Light::new("7B17", None);
/// assert_eq!(light.name(), "Yee7B17");
/// assert!(!light.is_on());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    id: String,
    name: String,
    #[serde(flatten)]
    state: LightState,
    /// Set while the cached state may differ from the bulb (a command failed).
    #[serde(skip)]
    pending: bool,
}

impl Light {
    pub fn new(id: &str, name: Option<&str>) -> Self {
        Light {
            id: id.to_string(),
            name: name.map_or_else(|| default_name(id), String::from),
            state: LightState::default(),
            pending: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &LightState {
        &self.state
    }

    /// Whether the cached state still needs confirming against the hub.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// All channels; every bulb on this hub supports each of them.
    pub fn capabilities(&self) -> impl Iterator<Item = Capability> {
        Capability::iter()
    }

    pub(crate) fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub(crate) fn set_state(&mut self, state: LightState) {
        self.state = state;
    }

    pub(crate) fn mark_pending(&mut self, pending: bool) {
        self.pending = pending;
    }

    /// Take on/off and brightness from a live hub report.
    ///
    /// The hub reports RGB, not the hue or temperature that produced it, so
    /// the cached color intent is left alone.
    pub(crate) fn reconcile(&mut self, report: &LightReport) {
        self.state = self.state.with_level(report.level);
        self.pending = false;
    }
}

impl OnOffControllable for Light {
    fn is_on(&self) -> bool {
        self.state.is_on()
    }
}

impl BrightnessControllable for Light {
    fn brightness(&self) -> Brightness {
        self.state.brightness
    }
}

impl ColorControllable for Light {
    fn color(&self) -> Option<ColorIntent> {
        self.state.color
    }
}

/// Display name given to a light the first time it is seen.
pub fn default_name(id: &str) -> String {
    format!("Yee{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Color;
    use std::str::FromStr;

    fn report(level: u8) -> LightReport {
        LightReport {
            id: "7B17".into(),
            online: true,
            color: Color::rgb(255, 255, 255),
            level,
        }
    }

    #[test]
    fn test_capabilities() {
        let light = Light::new("7B17", Some("Desk"));
        let caps: Vec<_> = light.capabilities().collect();
        assert_eq!(
            caps,
            vec![Capability::OnOff, Capability::Brightness, Capability::Color]
        );
        assert_eq!(Capability::OnOff.to_string(), "on-off");
        assert_eq!(Capability::from_str("color").unwrap(), Capability::Color);
    }

    #[test]
    fn test_toggle_request() {
        let mut light = Light::new("7B17", None);
        assert_eq!(light.toggled(), StateRequest::on_off(true));
        light.reconcile(&report(60));
        assert_eq!(light.toggled(), StateRequest::on_off(false));
    }

    #[test]
    fn test_step_is_clamped() {
        let mut light = Light::new("7B17", None);
        light.reconcile(&report(95));
        assert_eq!(light.stepped(0.2), StateRequest::brightness(1.0));
        assert_eq!(light.stepped(-2.0), StateRequest::brightness(0.0));
    }

    #[test]
    fn test_reconcile_clears_pending() {
        let mut light = Light::new("7B17", None);
        light.mark_pending(true);
        light.reconcile(&report(50));
        assert!(!light.is_pending());
        assert!(light.is_on());
        assert_eq!(light.brightness().value(), 0.5);
    }

    #[test]
    fn test_reconcile_applies_coupling() {
        let mut light = Light::new("7B17", None);
        light.reconcile(&report(5));
        assert!(!light.is_on());
        assert_eq!(light.brightness(), Brightness::OFF);
    }
}
