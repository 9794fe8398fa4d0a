//! Color temperature control.

use serde::{Deserialize, Serialize};

use super::Color;
use crate::convert::temperature_to_rgb;

/// Color temperature in Kelvin.
///
/// Lower values produce warmer (more yellow/orange) light, while higher
/// values produce cooler (more blue) light. The conversion to RGB is valid
/// from 1000K to 40000K; the hosts' sliders only offer 2000K to 6500K.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(transparent)]
pub struct Kelvin {
    pub(crate) kelvin: u16,
}

impl Default for Kelvin {
    fn default() -> Self {
        Kelvin {
            kelvin: Self::UI_MAX,
        }
    }
}

impl Kelvin {
    pub const MIN: u16 = 1000;
    pub const MAX: u16 = 40000;
    pub const UI_MIN: u16 = 2000;
    pub const UI_MAX: u16 = 6500;

    /// Get the kelvin value.
    pub fn kelvin(&self) -> u16 {
        self.kelvin
    }

    /// Create a new Kelvin with the given value.
    ///
    /// Returns `None` if value is outside the convertible range (1000-40000).
    ///
    /// # Examples
    ///
    /// ```
    /// use sunflower_lights_rs::Kelvin;
    ///
    /// assert!(Kelvin::create(999).is_none());
    /// assert!(Kelvin::create(2700).is_some());
    /// assert!(Kelvin::create(40001).is_none());
    /// ```
    pub fn create(kelvin: u16) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&kelvin) {
            Some(Kelvin { kelvin })
        } else {
            None
        }
    }

    /// Whether the value lies in the range hosts expose to users.
    pub fn in_ui_range(&self) -> bool {
        (Self::UI_MIN..=Self::UI_MAX).contains(&self.kelvin)
    }

    /// Convert to an RGB approximation of the black-body color.
    pub fn to_color(&self) -> Color {
        temperature_to_rgb(f64::from(self.kelvin))
    }
}
