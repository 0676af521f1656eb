use std::fmt;

/// An opaque sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Dark neutral used both as the fallback sample and as the gradient's second stop.
pub const NEUTRAL: Rgb = Rgb::new(0x18, 0x18, 0x1b);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Two-stop linear gradient from `color` to [`NEUTRAL`].
pub fn gradient_from_color(color: Rgb) -> String {
    format!("linear-gradient(135deg, {color} 0%, {NEUTRAL} 100%)")
}

/// Gradient published when nothing could be sampled.
pub fn fallback_gradient() -> String {
    gradient_from_color(NEUTRAL)
}
