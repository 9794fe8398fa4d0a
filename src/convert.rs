//! Color conversions feeding the hub's RGB-only color command.

use crate::types::Color;

/// Convert a color temperature in Kelvin to an approximate RGB color.
///
/// Uses Tanner Helland's piecewise fit of the black-body curve, valid over
/// 1000K-40000K. Each channel is clamped to 0-255 and truncated; inputs outside
/// the valid range saturate rather than fail.
///
/// # Examples
///
/// ```
/// use sunflower_lights_rs::{temperature_to_rgb, Color};
///
/// assert_eq!(temperature_to_rgb(1000.0), Color::rgb(255, 67, 0));
/// assert_eq!(temperature_to_rgb(40000.0).blue(), 255);
/// ```
pub fn temperature_to_rgb(kelvin: f64) -> Color {
    let temp = kelvin / 100.0;

    let (red, green, blue) = if temp <= 66.0 {
        let green = 99.470_802_586_1 * temp.ln() - 161.119_568_166_1;
        let blue = if temp <= 19.0 {
            0.0
        } else {
            138.517_731_223_1 * (temp - 10.0).ln() - 305.044_792_730_7
        };
        (255.0, green, blue)
    } else {
        let red = 329.698_727_446 * (temp - 60.0).powf(-0.133_204_759_2);
        let green = 288.122_169_528_3 * (temp - 60.0).powf(-0.075_514_849_2);
        (red, green, 255.0)
    };

    Color::rgb(truncate(red), truncate(green), truncate(blue))
}

/// Convert an HSV triple (each component 0.0-1.0) to RGB.
///
/// # Examples
///
/// ```
/// use sunflower_lights_rs::{hsv_to_rgb, Color};
///
/// assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), Color::rgb(255, 0, 0));
/// assert_eq!(hsv_to_rgb(0.75, 0.0, 1.0), Color::rgb(255, 255, 255));
/// ```
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Color {
    let i = (h * 6.0).floor();
    let f = h * 6.0 - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);

    let (r, g, b) = match (i as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    Color::rgb(scale(r), scale(g), scale(b))
}

/// Clamp to 0-255 and drop the fraction. NaN ends up as 0.
fn truncate(x: f64) -> u8 {
    x.clamp(0.0, 255.0) as u8
}

fn scale(x: f64) -> u8 {
    (x * 255.0).round().clamp(0.0, 255.0) as u8
}
