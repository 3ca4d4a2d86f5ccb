//! Complex-plane viewing window.

use burst_core::params::JobParameters;

/// Constant in the automatic iteration-cap formula.
const AUTO_ITERATIONS_SCALE: f64 = 223.0;

/// The region of the complex plane mapped onto the full image, plus the
/// per-pixel step sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneWindow {
    pub x_range: [f64; 2],
    pub y_range: [f64; 2],
    pub x_step: f64,
    pub y_step: f64,
}

impl PlaneWindow {
    /// Build the window for `params`.
    ///
    /// Starts from `look_at` with `zoom` as the full extents, then widens
    /// whichever axis is under-represented relative to the image aspect
    /// ratio. Widening is about the window centre, so `look_at` stays the
    /// centre; scaling the range endpoints about zero instead would shift
    /// the view for any off-origin `look_at`.
    pub fn new(params: &JobParameters) -> Self {
        let [cx, cy] = params.look_at;
        let mut half_x = params.zoom[0] / 2.0;
        let mut half_y = params.zoom[1] / 2.0;

        let ratio = (2.0 * half_x).abs() / (2.0 * half_y).abs();
        let sratio = f64::from(params.image_width) / f64::from(params.image_height);
        if sratio > ratio {
            half_x *= sratio / ratio;
        } else {
            half_y *= ratio / sratio;
        }

        let x_range = [cx - half_x, cx + half_x];
        let y_range = [cy - half_y, cy + half_y];
        let x_step = (x_range[1] - x_range[0]) / (f64::from(params.image_width) - 1.0 + 0.5);
        let y_step = (y_range[1] - y_range[0]) / (f64::from(params.image_height) - 1.0 + 0.5);

        Self {
            x_range,
            y_range,
            x_step,
            y_step,
        }
    }

    pub fn x_span(&self) -> f64 {
        (self.x_range[1] - self.x_range[0]).abs()
    }

    pub fn y_span(&self) -> f64 {
        (self.y_range[1] - self.y_range[0]).abs()
    }

    /// Plane coordinate of full-image pixel `(px, py)`.
    pub fn point(&self, px: u32, py: u32) -> (f64, f64) {
        (
            self.x_range[0] + self.x_step * f64::from(px),
            self.y_range[0] + self.y_step * f64::from(py),
        )
    }
}

/// Iteration cap for `params` over `window`.
pub fn iteration_cap(params: &JobParameters, window: &PlaneWindow) -> u32 {
    if !params.auto_iterations {
        return params.iterations;
    }
    let f = (0.001 + 2.0 * window.x_span().min(window.y_span())).sqrt();
    (AUTO_ITERATIONS_SCALE / f).floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(width: u32, height: u32) -> JobParameters {
        JobParameters::with_geometry(width, height, width, height)
    }

    #[test]
    fn window_matches_image_aspect() {
        let p = params(1600, 800);
        let w = PlaneWindow::new(&p);
        let aspect = w.x_span() / w.y_span();
        assert!((aspect - 2.0).abs() < 1e-12, "aspect was {aspect}");
    }

    #[test]
    fn tall_image_widens_y() {
        let mut p = params(100, 400);
        p.zoom = [2.0, 2.0];
        p.look_at = [0.0, 0.0];
        let w = PlaneWindow::new(&p);
        assert!((w.x_span() - 2.0).abs() < 1e-12);
        assert!((w.y_span() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn widening_keeps_centre() {
        let mut p = params(400, 100);
        p.zoom = [1.0, 1.0];
        p.look_at = [-0.75, 0.25];
        let w = PlaneWindow::new(&p);
        let cx = (w.x_range[0] + w.x_range[1]) / 2.0;
        let cy = (w.y_range[0] + w.y_range[1]) / 2.0;
        assert!((cx + 0.75).abs() < 1e-12);
        assert!((cy - 0.25).abs() < 1e-12);
    }

    #[test]
    fn step_divides_span_over_width_minus_half() {
        let mut p = params(11, 11);
        p.zoom = [2.0, 2.0];
        p.look_at = [0.0, 0.0];
        let w = PlaneWindow::new(&p);
        assert!((w.x_step - 2.0 / 10.5).abs() < 1e-12);
        assert_eq!(w.point(0, 0), (-1.0, -1.0));
    }

    #[test]
    fn auto_iterations_formula() {
        let mut p = params(200, 200);
        p.zoom = [2.0, 2.0];
        p.look_at = [0.0, 0.0];
        let w = PlaneWindow::new(&p);
        let expected = (223.0 / (0.001f64 + 4.0).sqrt()).floor() as u32;
        assert_eq!(iteration_cap(&p, &w), expected);
    }

    #[test]
    fn fixed_iterations_when_auto_disabled() {
        let mut p = params(200, 200);
        p.auto_iterations = false;
        p.iterations = 321;
        let w = PlaneWindow::new(&p);
        assert_eq!(iteration_cap(&p, &w), 321);
    }
}
