//! Conversion between world space and screen space.

use crate::config::ProjectionConfig;
use crate::math::Point2d;
use cgmath::{EuclideanSpace, Matrix2, Point2, SquareMatrix, Vector2};
use serde::{Deserialize, Serialize};

/// A point on screen, in pixels.
pub type ScreenPoint = Point2<f64>;

/// The size of the drawing surface in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn centre(&self) -> Vector2<f64> {
        Vector2::new(0.5 * self.width, 0.5 * self.height)
    }
}

/// The projection style.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    /// Rotated, vertically compressed pseudo-3D view.
    #[default]
    Isometric,
    /// Plain top-down view.
    Planar,
}

/// Maps world coordinates to screen coordinates and back.
///
/// A projection is a value: it is rebuilt with [Projection::fit] whenever the
/// environment extents, the viewport or the mode change, and never carries a
/// scale over from a different configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    mode: ProjectionMode,
    /// Pixels per metre before the isometric scale is applied.
    scale: f64,
    /// The world point shown at the centre of the viewport.
    centre: Point2d,
    viewport: Viewport,
    /// Maps recentred world coordinates to pixel offsets from the viewport centre.
    basis: Matrix2<f64>,
    /// Inverse of `basis`.
    inverse: Matrix2<f64>,
    /// Pixels of upward screen displacement per metre of elevation.
    lift: f64,
    /// Pixels per metre of a horizontal world length.
    length_scale: f64,
}

impl Projection {
    /// Builds a projection which fits an environment of the given size into the viewport.
    pub fn fit(
        mode: ProjectionMode,
        extents: (f64, f64),
        viewport: Viewport,
        config: &ProjectionConfig,
    ) -> Self {
        let (width, height) = extents;
        let [mx, my] = match mode {
            ProjectionMode::Isometric => config.iso_margin,
            ProjectionMode::Planar => config.planar_margin,
        };
        let scale = f64::min(viewport.width / (width * mx), viewport.height / (height * my));
        let scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            log::warn!(
                "cannot fit {}x{} m into {}x{} px; using unit scale",
                width,
                height,
                viewport.width,
                viewport.height
            );
            1.0
        };
        Self::with_scale(mode, scale, extents, viewport, config)
    }

    /// Builds a projection with an explicit scale.
    pub fn with_scale(
        mode: ProjectionMode,
        scale: f64,
        extents: (f64, f64),
        viewport: Viewport,
        config: &ProjectionConfig,
    ) -> Self {
        let (basis, lift, length_scale) = match mode {
            ProjectionMode::Planar => (Matrix2::from_value(scale), 0.0, scale),
            ProjectionMode::Isometric => {
                let angle = config.angle_deg.to_radians();
                let (sin, cos) = angle.sin_cos();
                let sx = scale * config.iso_scale;
                let sy = sx * config.vertical_compression;
                // Column-major: first column is the image of the world x axis.
                let basis = Matrix2::new(cos * sx, sin * sy, -cos * sx, sin * sy);
                (basis, sy, sx)
            }
        };
        let inverse = basis.invert().unwrap_or_else(|| {
            log::warn!("degenerate projection basis; picking disabled");
            Matrix2::from_value(0.0)
        });
        Self {
            mode,
            scale,
            centre: Point2d::new(0.5 * extents.0, 0.5 * extents.1),
            viewport,
            basis,
            inverse,
            lift,
            length_scale,
        }
    }

    pub fn mode(&self) -> ProjectionMode {
        self.mode
    }

    /// Pixels per metre, before any isometric scaling.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Projects a world point at elevation `z` (in metres) to the screen.
    pub fn project(&self, p: Point2d, z: f64) -> ScreenPoint {
        match self.mode {
            ProjectionMode::Planar => ScreenPoint::new(p.x * self.scale, p.y * self.scale),
            ProjectionMode::Isometric => {
                let offset = self.basis * (p - self.centre);
                ScreenPoint::new(0.0, -z * self.lift) + offset + self.viewport.centre()
            }
        }
    }

    /// Projects a point on the ground.
    pub fn ground(&self, p: Point2d) -> ScreenPoint {
        self.project(p, 0.0)
    }

    /// Maps a screen point back to the ground point rendered there.
    pub fn unproject(&self, screen: ScreenPoint) -> Point2d {
        self.unproject_at(screen, 0.0)
    }

    /// Maps a screen point back to the world point which, raised to elevation
    /// `z`, is rendered there.
    pub fn unproject_at(&self, screen: ScreenPoint, z: f64) -> Point2d {
        match self.mode {
            ProjectionMode::Planar => Point2d::new(screen.x / self.scale, screen.y / self.scale),
            ProjectionMode::Isometric => {
                let offset =
                    screen.to_vec() - self.viewport.centre() + Vector2::new(0.0, z * self.lift);
                self.centre + self.inverse * offset
            }
        }
    }

    /// Converts a horizontal world length to pixels.
    pub fn pixels(&self, metres: f64) -> f64 {
        metres * self.length_scale
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn iso() -> Projection {
        Projection::fit(
            ProjectionMode::Isometric,
            (80.0, 80.0),
            Viewport::new(1200.0, 800.0),
            &ProjectionConfig::default(),
        )
    }

    #[test]
    fn isometric_matches_reference_formula() {
        let proj = iso();
        let scale = f64::min(1200.0 / (80.0 * 1.8), 800.0 / (80.0 * 1.2));
        assert_approx_eq!(proj.scale(), scale);

        let (x, y, z) = (12.0, 57.0, 1.5);
        let (dx, dy) = (x - 40.0, y - 40.0);
        let iso_x = (dx - dy) * (std::f64::consts::PI / 6.0).cos();
        let iso_y = (dx + dy) * (std::f64::consts::PI / 6.0).sin() - z;
        let p = proj.project(Point2d::new(x, y), z);
        assert_approx_eq!(p.x, 600.0 + iso_x * scale * 0.86);
        assert_approx_eq!(p.y, 400.0 + iso_y * scale * 0.86 * 0.7);
    }

    #[test]
    fn centre_maps_to_viewport_centre() {
        let p = iso().ground(Point2d::new(40.0, 40.0));
        assert_approx_eq!(p.x, 600.0);
        assert_approx_eq!(p.y, 400.0);
    }

    #[test]
    fn round_trip_at_ground_level() {
        let config = ProjectionConfig::default();
        for mode in [ProjectionMode::Isometric, ProjectionMode::Planar] {
            for scale in [0.5, 7.0, 23.25] {
                let proj = Projection::with_scale(
                    mode,
                    scale,
                    (50.0, 30.0),
                    Viewport::new(640.0, 480.0),
                    &config,
                );
                for &(x, y) in &[(0.0, 0.0), (49.9, 0.1), (13.37, 29.0), (-5.0, 72.5)] {
                    let p = Point2d::new(x, y);
                    let back = proj.unproject(proj.ground(p));
                    assert_approx_eq!(back.x, x, 1e-9);
                    assert_approx_eq!(back.y, y, 1e-9);
                }
            }
        }
    }

    #[test]
    fn round_trip_with_elevation() {
        let proj = iso();
        let p = Point2d::new(22.0, 61.0);
        let screen = proj.project(p, 4.5);
        let back = proj.unproject_at(screen, 4.5);
        assert_approx_eq!(back.x, 22.0, 1e-9);
        assert_approx_eq!(back.y, 61.0, 1e-9);

        // Clicking the raised point without the elevation term lands elsewhere.
        let naive = proj.unproject(screen);
        assert!((naive.x - 22.0).abs() > 1.0);
    }

    #[test]
    fn planar_fit_uses_tighter_margin() {
        let config = ProjectionConfig::default();
        let viewport = Viewport::new(800.0, 800.0);
        let planar = Projection::fit(ProjectionMode::Planar, (50.0, 50.0), viewport, &config);
        let iso = Projection::fit(ProjectionMode::Isometric, (50.0, 50.0), viewport, &config);
        assert_approx_eq!(planar.scale(), 16.0);
        assert!(iso.scale() < planar.scale());
        assert_approx_eq!(planar.pixels(2.0), 32.0);
    }

    #[test]
    fn degenerate_extents_fall_back_to_unit_scale() {
        let proj = Projection::fit(
            ProjectionMode::Planar,
            (0.0, 0.0),
            Viewport::new(100.0, 100.0),
            &ProjectionConfig::default(),
        );
        assert_eq!(proj.scale(), 1.0);
    }
}
