//! Color samples and the rules that decide whether a span counts as blue
//!
//! A span's fill color is reduced to an 8-bit RGB triple before classification,
//! whatever device space it was painted in.

/// An RGB color with 8-bit components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorSample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorSample {
    pub const BLACK: ColorSample = ColorSample::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from PDF-style components in 0.0..=1.0 (scaled by 255, truncated)
    pub fn from_unit_rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(unit_to_byte(r), unit_to_byte(g), unit_to_byte(b))
    }

    /// Build from a packed sRGB integer `0xRRGGBB`
    pub fn from_srgb(packed: u32) -> Self {
        Self::new(
            ((packed >> 16) & 0xFF) as u8,
            ((packed >> 8) & 0xFF) as u8,
            (packed & 0xFF) as u8,
        )
    }

    /// DeviceGray level in 0.0..=1.0
    pub fn from_gray(level: f32) -> Self {
        Self::from_unit_rgb(level, level, level)
    }

    /// DeviceCMYK to RGB: R = 1 - min(1, C*(1-K) + K), same for G and B
    pub fn from_cmyk(c: f32, m: f32, y: f32, k: f32) -> Self {
        let r = 1.0 - (c * (1.0 - k) + k).min(1.0);
        let g = 1.0 - (m * (1.0 - k) + k).min(1.0);
        let b = 1.0 - (y * (1.0 - k) + k).min(1.0);
        Self::from_unit_rgb(r, g, b)
    }

    /// Components as PDF operands in 0.0..=1.0
    pub fn to_unit_rgb(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

fn unit_to_byte(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

/// Default floor for the blue channel
pub const DEFAULT_MIN_BLUE: u8 = 80;

/// Blue dominates both other channels and reaches [`DEFAULT_MIN_BLUE`]
pub fn is_blue(color: ColorSample) -> bool {
    BlueDominance::default().matches(color)
}

/// A replaceable predicate deciding which span colors are kept
///
/// Any `Fn(ColorSample) -> bool` closure is a rule, so callers can swap the
/// threshold or match named colors without touching extraction code.
pub trait ColorRule {
    /// Whether a known color is kept
    fn matches(&self, color: ColorSample) -> bool;

    /// Whether a span with possibly unknown color is kept; unknown is never kept
    fn accepts(&self, color: Option<ColorSample>) -> bool {
        color.is_some_and(|c| self.matches(c))
    }
}

impl<F> ColorRule for F
where
    F: Fn(ColorSample) -> bool,
{
    fn matches(&self, color: ColorSample) -> bool {
        self(color)
    }
}

/// Blue strictly above red and green, and at least `min_blue`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlueDominance {
    pub min_blue: u8,
}

impl Default for BlueDominance {
    fn default() -> Self {
        Self {
            min_blue: DEFAULT_MIN_BLUE,
        }
    }
}

impl ColorRule for BlueDominance {
    fn matches(&self, c: ColorSample) -> bool {
        c.b > c.r && c.b > c.g && c.b >= self.min_blue
    }
}
