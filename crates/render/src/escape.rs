//! Escape-time iteration for the Mandelbrot set.

/// Iterations run past the bailout to shrink the error of the smoothed
/// iteration count.
const REFINEMENT_ITERATIONS: usize = 4;

/// Result of iterating one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EscapeResult {
    /// Iterations taken before bailing out, or the cap if the point
    /// never escaped.
    pub n: u32,
    /// `Re(Z)^2` after refinement.
    pub tr: f64,
    /// `Im(Z)^2` after refinement.
    pub ti: f64,
}

impl EscapeResult {
    /// `|Z|^2`.
    pub fn magnitude_sq(&self) -> f64 {
        self.tr + self.ti
    }

    pub fn converged(&self, steps: u32) -> bool {
        self.n == steps
    }
}

/// Iterate `Z_{n+1} = Z_n^2 + C` from `Z_0 = 0`.
///
/// Stops at `steps` iterations or once `|Z|^2 > escape_radius_sq`, then
/// runs [`REFINEMENT_ITERATIONS`] more regardless.
pub fn iterate(cr: f64, ci: f64, escape_radius_sq: f64, steps: u32) -> EscapeResult {
    let mut zr = 0.0_f64;
    let mut zi = 0.0_f64;
    let mut tr = 0.0_f64;
    let mut ti = 0.0_f64;
    let mut n = 0u32;

    while n < steps && tr + ti <= escape_radius_sq {
        zi = 2.0 * zr * zi + ci;
        zr = tr - ti + cr;
        tr = zr * zr;
        ti = zi * zi;
        n += 1;
    }

    for _ in 0..REFINEMENT_ITERATIONS {
        zi = 2.0 * zr * zi + ci;
        zr = tr - ti + cr;
        tr = zr * zr;
        ti = zi * zi;
    }

    EscapeResult { n, tr, ti }
}
