//! Colour scheme identifiers.
//!
//! Jobs name their colour scheme with a string. Parsing is total: any name
//! that is not recognised selects [`ColorScheme::Grayscale`]. The mapping
//! functions themselves live in the render crate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of colour schemes the renderer knows how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColorScheme {
    /// Full-saturation hue sweep.
    Hsv1,
    /// Hue sweep with a value ramp.
    Hsv2,
    /// Same as [`ColorScheme::Hsv2`] with red and blue swapped.
    Hsv3,
    /// Grayscale ramp with a black interior.
    Grayscale,
    /// Grayscale ramp with a shaded interior.
    Grayscale2,
}

impl ColorScheme {
    /// Scheme used when a job does not name one.
    pub const DEFAULT: Self = Self::Hsv1;

    /// Scheme used when a job names one that does not exist.
    pub const FALLBACK: Self = Self::Grayscale;

    pub const ALL: [Self; 5] = [
        Self::Hsv1,
        Self::Hsv2,
        Self::Hsv3,
        Self::Grayscale,
        Self::Grayscale2,
    ];

    /// Parse a scheme name.
    ///
    /// Accepts the wire names (`pickColorHSV1`, ...) and the short snake
    /// names (`hsv1`, ...), case-insensitively.
    pub fn from_name(name: &str) -> Self {
        let lowered = name.trim().to_ascii_lowercase();
        let short = lowered.strip_prefix("pickcolor").unwrap_or(&lowered);
        match short {
            "hsv1" => Self::Hsv1,
            "hsv2" => Self::Hsv2,
            "hsv3" => Self::Hsv3,
            "grayscale2" => Self::Grayscale2,
            _ => Self::FALLBACK,
        }
    }

    /// Wire name used in job payloads.
    pub fn name(self) -> &'static str {
        match self {
            Self::Hsv1 => "pickColorHSV1",
            Self::Hsv2 => "pickColorHSV2",
            Self::Hsv3 => "pickColorHSV3",
            Self::Grayscale => "pickColorGrayscale",
            Self::Grayscale2 => "pickColorGrayscale2",
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<String> for ColorScheme {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<ColorScheme> for String {
    fn from(scheme: ColorScheme) -> Self {
        scheme.name().to_string()
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
