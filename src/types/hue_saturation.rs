//! Hue and Saturation color representation.

use serde::{Deserialize, Serialize};

use super::Color;
use crate::convert::hsv_to_rgb;

/// Hue and Saturation, both as fractions from 0.0 to 1.0.
///
/// This is the form hosts hand over from their color wheel. Value is not part
/// of it; brightness is a separate channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HueSaturation {
    hue: f64,
    saturation: f64,
}

impl HueSaturation {
    /// Create a new HueSaturation with the given values.
    ///
    /// Returns `None` if either value is outside 0.0-1.0.
    ///
    /// # Examples
    ///
    /// ```
    /// use sunflower_lights_rs::HueSaturation;
    ///
    /// assert!(HueSaturation::create(0.0, 1.0).is_some());
    /// assert!(HueSaturation::create(1.5, 0.5).is_none());
    /// assert!(HueSaturation::create(0.5, -0.1).is_none());
    /// ```
    pub fn create(hue: f64, saturation: f64) -> Option<Self> {
        let unit = 0.0..=1.0;
        if unit.contains(&hue) && unit.contains(&saturation) {
            Some(HueSaturation { hue, saturation })
        } else {
            None
        }
    }

    /// Get the hue value.
    pub fn hue(&self) -> f64 {
        self.hue
    }

    /// Get the saturation value.
    pub fn saturation(&self) -> f64 {
        self.saturation
    }

    /// Convert to RGB Color with Value fixed at 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use sunflower_lights_rs::HueSaturation;
    ///
    /// let hs = HueSaturation::create(0.0, 1.0).unwrap();
    /// let color = hs.to_color();
    /// assert_eq!(color.red(), 255);
    /// assert_eq!(color.green(), 0);
    /// assert_eq!(color.blue(), 0);
    /// ```
    pub fn to_color(&self) -> Color {
        hsv_to_rgb(self.hue, self.saturation, 1.0)
    }
}

impl From<&HueSaturation> for Color {
    fn from(hs: &HueSaturation) -> Self {
        hs.to_color()
    }
}
