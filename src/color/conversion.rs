//! Color space conversion utilities
//!
//! Provides conversions between the color spaces used by the analysis:
//! - sRGB to Lab/LCh (D65) and back with gamut clamping
//! - sRGB transfer function (gamma encoded <-> linear)
//! - HSL for hue/saturation statistics
//! - Hex color representation
//! - ΔE76 (Euclidean distance in Lab)
//!
//! All functions are stateless. Out-of-range inputs are clamped, never
//! rejected.

use palette::{FromColor, Hsl, IntoColor, Lab, Lch, LinSrgb, Srgb};

use crate::constants::pixels::{LUMA_B, LUMA_G, LUMA_R};
use crate::{AnalysisError, Result};

/// HSL triple with hue in degrees [0, 360) and saturation/lightness in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HslColor {
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
}

fn clamp_srgb(rgb: Srgb) -> Srgb {
    Srgb::new(
        clamp_unit(rgb.red),
        clamp_unit(rgb.green),
        clamp_unit(rgb.blue),
    )
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Convert gamma-encoded sRGB (components in [0, 1]) to Lab under D65
///
/// # Arguments
///
/// * `rgb` - sRGB color; components outside [0, 1] are clamped
///
/// # Returns
///
/// Lab color in D65 illuminant
pub fn rgb_to_lab(rgb: Srgb) -> Lab {
    Lab::from_color(clamp_srgb(rgb))
}

/// Convert 8-bit sRGB to Lab under D65
pub fn rgb8_to_lab(r: u8, g: u8, b: u8) -> Lab {
    rgb_to_lab(Srgb::new(r, g, b).into_format())
}

/// Convert Lab to sRGB with gamut clamping
///
/// # Arguments
///
/// * `lab` - Lab color
///
/// # Returns
///
/// sRGB color, clamped to valid gamut
pub fn lab_to_rgb(lab: Lab) -> Srgb {
    let srgb: Srgb = lab.into_color();
    clamp_srgb(srgb)
}

/// Convert Lab to LCh (cylindrical representation)
pub fn lab_to_lch(lab: Lab) -> Lch {
    Lch::from_color(lab)
}

/// Chroma of a Lab color, `sqrt(a² + b²)`
pub fn chroma(lab: Lab) -> f32 {
    (lab.a * lab.a + lab.b * lab.b).sqrt()
}

/// Hue angle of the (a, b) vector in degrees, [0, 360)
pub fn hue_degrees(a: f32, b: f32) -> f32 {
    let deg = b.atan2(a).to_degrees();
    if deg < 0.0 {
        deg + 360.0
    } else {
        deg
    }
}

/// Decode gamma-encoded sRGB to linear light
pub fn srgb_to_linear(rgb: Srgb) -> LinSrgb {
    clamp_srgb(rgb).into_linear()
}

/// Encode linear light to gamma-encoded sRGB
pub fn linear_to_srgb(linear: LinSrgb) -> Srgb {
    clamp_srgb(Srgb::from_linear(linear))
}

/// Convert sRGB to HSL
pub fn rgb_to_hsl(rgb: Srgb) -> HslColor {
    let hsl = Hsl::from_color(clamp_srgb(rgb));
    let hue = hsl.hue.into_positive_degrees();
    HslColor {
        hue: if hue >= 360.0 { 0.0 } else { hue },
        saturation: clamp_unit(hsl.saturation),
        lightness: clamp_unit(hsl.lightness),
    }
}

/// Perceptual luminance `0.299R + 0.587G + 0.114B` of gamma-encoded sRGB
pub fn perceptual_luminance(rgb: Srgb) -> f32 {
    clamp_unit(LUMA_R * rgb.red + LUMA_G * rgb.green + LUMA_B * rgb.blue)
}

/// Convert sRGB to hexadecimal color string
///
/// # Arguments
///
/// * `srgb` - sRGB color
///
/// # Returns
///
/// Hex color string (e.g., "#FF0000")
pub fn srgb_to_hex(srgb: Srgb) -> String {
    let rgb = clamp_srgb(srgb);
    let r = (rgb.red * 255.0).round() as u8;
    let g = (rgb.green * 255.0).round() as u8;
    let b = (rgb.blue * 255.0).round() as u8;
    format!("#{:02X}{:02X}{:02X}", r, g, b)
}

/// Parse hexadecimal color string to sRGB
///
/// # Arguments
///
/// * `hex` - Hex color string (e.g., "#FF0000" or "FF0000")
///
/// # Errors
///
/// Returns error if hex string is invalid
pub fn hex_to_srgb(hex: &str) -> Result<Srgb> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(AnalysisError::ColorConversionError {
            message: format!("Invalid hex color: expected 6 characters, got {}", hex.len()),
        });
    }

    let channel = |range: std::ops::Range<usize>, name: &str| {
        u8::from_str_radix(&hex[range], 16).map_err(|e| AnalysisError::ColorConversionError {
            message: format!("Invalid {} value: {}", name, e),
        })
    };

    let r = channel(0..2, "red")?;
    let g = channel(2..4, "green")?;
    let b = channel(4..6, "blue")?;

    Ok(Srgb::new(r, g, b).into_format())
}

/// Compute Delta E (color difference) between two Lab colors
///
/// Uses simple Euclidean distance (ΔE76), not CIEDE2000.
pub fn delta_e(lab1: Lab, lab2: Lab) -> f32 {
    let dl = lab1.l - lab2.l;
    let da = lab1.a - lab2.a;
    let db = lab1.b - lab2.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// Lab as a plain 3-vector, the representation used by the clustering engine
pub fn lab_to_array(lab: Lab) -> [f32; 3] {
    [lab.l, lab.a, lab.b]
}

/// Inverse of [`lab_to_array`]
pub fn array_to_lab(v: [f32; 3]) -> Lab {
    Lab::new(v[0], v[1], v[2])
}
