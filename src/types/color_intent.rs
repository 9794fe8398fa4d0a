//! The two ways a host can ask for a color.

use serde::{Deserialize, Serialize};

use super::{Color, HueSaturation, Kelvin};

/// A requested color: either a point on the color wheel or a white temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ColorIntent {
    Hue(HueSaturation),
    Temperature { kelvin: Kelvin },
}

impl ColorIntent {
    /// Resolve to the RGB triple the hub understands.
    ///
    /// ```
    /// use sunflower_lights_rs::{Color, ColorIntent, HueSaturation, Kelvin};
    ///
    /// let red = ColorIntent::Hue(HueSaturation::create(0.0, 1.0).unwrap());
    /// assert_eq!(red.to_color(), Color::rgb(255, 0, 0));
    ///
    /// let warm = ColorIntent::Temperature { kelvin: Kelvin::create(2000).unwrap() };
    /// assert_eq!(warm.to_color().red(), 255);
    /// ```
    pub fn to_color(&self) -> Color {
        match self {
            ColorIntent::Hue(hs) => hs.to_color(),
            ColorIntent::Temperature { kelvin } => kelvin.to_color(),
        }
    }
}

impl From<HueSaturation> for ColorIntent {
    fn from(hs: HueSaturation) -> Self {
        ColorIntent::Hue(hs)
    }
}

impl From<Kelvin> for ColorIntent {
    fn from(kelvin: Kelvin) -> Self {
        ColorIntent::Temperature { kelvin }
    }
}
