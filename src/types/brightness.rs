//! Brightness on the host's 0-1 scale.

use serde::{Deserialize, Serialize};

/// Brightness as a fraction from 0.0 (off) to 1.0 (full).
///
/// The hub works in whole percent; [`Brightness::level`] does the translation.
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, PartialOrd)]
#[serde(transparent)]
pub struct Brightness {
    pub(crate) value: f64,
}

impl Brightness {
    const MIN: f64 = 0.0;
    const MAX: f64 = 1.0;

    /// Full brightness.
    pub const FULL: Brightness = Brightness { value: Self::MAX };

    /// Zero brightness; the light is off.
    pub const OFF: Brightness = Brightness { value: Self::MIN };

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Returns None if value is outside valid range (0.0-1.0) or not a number.
    ///
    /// # Examples
    ///
    /// ```
    /// use sunflower_lights_rs::Brightness;
    ///
    /// assert!(Brightness::create(0.5).is_some());
    /// assert!(Brightness::create(1.01).is_none());
    /// assert!(Brightness::create(f64::NAN).is_none());
    /// ```
    pub fn create(value: f64) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Some(Brightness { value })
        } else {
            None
        }
    }

    /// Clamps the value into range; NaN becomes zero.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self::OFF;
        }
        Brightness {
            value: value.clamp(Self::MIN, Self::MAX),
        }
    }

    /// Converts a hub level (0-100 percent) back to the 0-1 scale.
    pub fn from_level(level: u8) -> Self {
        Self::clamped(f64::from(level) / 100.0)
    }

    /// The hub's native level, 0-100 percent.
    ///
    /// ```
    /// use sunflower_lights_rs::Brightness;
    ///
    /// assert_eq!(Brightness::FULL.level(), 100);
    /// assert_eq!(Brightness::clamped(0.504).level(), 50);
    /// assert_eq!(Brightness::OFF.level(), 0);
    /// ```
    pub fn level(&self) -> u8 {
        (self.value * 100.0).round() as u8
    }

    pub fn is_off(&self) -> bool {
        self.value <= 0.0
    }
}
