//! Colour mapping from escape results to RGBA.

use burst_core::color_scheme::ColorScheme;

use crate::escape::EscapeResult;

/// Colour of points that never escape.
pub const INTERIOR_COLOR: [f64; 4] = [0.0, 0.0, 0.0, 255.0];

/// Continuous iteration count, used to avoid banding.
///
/// `v = 5 + n - log2(0.5) - log2(ln(|Z|^2))`
pub fn smooth_iteration(result: &EscapeResult) -> f64 {
    let log_base = 1.0 / std::f64::consts::LN_2;
    let log_half_base = 0.5_f64.ln() * log_base;
    5.0 + f64::from(result.n) - log_half_base - result.magnitude_sq().ln().ln() * log_base
}

/// HSV to RGB in `0..=255`. `h` in degrees, `s` and `v` in `0..=1`
/// (`v` is capped at 1). Hues outside `[0, 360)` fall in no sector and come
/// out as `v - v*s` on every channel, which is black at full saturation.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [f64; 3] {
    let v = v.min(1.0);
    let hp = h / 60.0;
    let c = v * s;
    let x = c * (1.0 - ((hp % 2.0) - 1.0).abs());

    let (r, g, b) = if (0.0..1.0).contains(&hp) {
        (c, x, 0.0)
    } else if (1.0..2.0).contains(&hp) {
        (x, c, 0.0)
    } else if (2.0..3.0).contains(&hp) {
        (0.0, c, x)
    } else if (3.0..4.0).contains(&hp) {
        (0.0, x, c)
    } else if (4.0..5.0).contains(&hp) {
        (x, 0.0, c)
    } else if (5.0..6.0).contains(&hp) {
        (c, 0.0, x)
    } else {
        (0.0, 0.0, 0.0)
    };

    let m = v - c;
    [(r + m) * 255.0, (g + m) * 255.0, (b + m) * 255.0]
}

/// RGBA for one escape result under `scheme`, every channel in `0..=255`.
pub fn pick_color(scheme: ColorScheme, steps: u32, result: &EscapeResult) -> [f64; 4] {
    raw_color(scheme, steps, result).map(clamp_channel)
}

fn raw_color(scheme: ColorScheme, steps: u32, result: &EscapeResult) -> [f64; 4] {
    match scheme {
        ColorScheme::Hsv1 => hsv(steps, result, |_| 1.0, false),
        ColorScheme::Hsv2 => hsv(steps, result, |v| 10.0 * v / f64::from(steps), false),
        ColorScheme::Hsv3 => hsv(steps, result, |v| 10.0 * v / f64::from(steps), true),
        ColorScheme::Grayscale => grayscale(steps, result),
        ColorScheme::Grayscale2 => {
            if result.converged(steps) {
                let shade = 255.0 - ((255.0 * result.magnitude_sq().sqrt()).floor() % 255.0);
                let c = shade.clamp(0.0, 255.0);
                [c, c, c, 255.0]
            } else {
                grayscale(steps, result)
            }
        }
    }
}

fn hsv(
    steps: u32,
    result: &EscapeResult,
    value: impl Fn(f64) -> f64,
    swap_red_blue: bool,
) -> [f64; 4] {
    if result.converged(steps) {
        return INTERIOR_COLOR;
    }
    let v = smooth_iteration(result);
    let [r, g, b] = hsv_to_rgb(360.0 * v / f64::from(steps), 1.0, value(v));
    if swap_red_blue {
        [b, g, r, 255.0]
    } else {
        [r, g, b, 255.0]
    }
}

fn grayscale(steps: u32, result: &EscapeResult) -> [f64; 4] {
    if result.converged(steps) {
        return INTERIOR_COLOR;
    }
    let v = (512.0 * smooth_iteration(result) / f64::from(steps))
        .floor()
        .min(255.0);
    [v, v, v, 255.0]
}

/// Clamp a channel into `0..=255`. NaN maps to 0.
pub fn clamp_channel(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 255.0)
    }
}

/// Round and clamp one channel into a byte.
pub fn to_channel(value: f64) -> u8 {
    clamp_channel(value).round() as u8
}

/// Pack an RGBA colour into bytes.
pub fn pack(color: [f64; 4]) -> [u8; 4] {
    color.map(to_channel)
}
