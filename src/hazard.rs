//! Animated overlays for active hazards.

use crate::draw::{Canvas, Color, Fill, GradientStop, Layer, Shape, Stroke};
use crate::math::{Point2d, Vector2d};
use crate::projection::Projection;
use serde::{Deserialize, Serialize};
use smallvec::smallvec;
use std::f64::consts::FRAC_PI_4;

/// The kind of a hazard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardKind {
    Fire,
    Shooting,
    /// Any other kind; drawn like a shooting.
    #[serde(other)]
    Other,
}

/// An active hazard, as reported by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    #[serde(rename = "type")]
    pub kind: HazardKind,
    #[serde(with = "crate::math::point")]
    pub position: Point2d,
    /// Radius of influence, in m.
    pub radius: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
}

/// Number of smoke rings in a fire.
const SMOKE_RINGS: usize = 5;
/// Number of flame rings in a fire.
const FLAME_RINGS: usize = 8;

/// One animated ring of a fire, at a given tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ring {
    /// Radius as a multiple of the hazard radius.
    pub scale: f64,
    pub alpha: f64,
    /// Elevation in m.
    pub z: f64,
}

/// The smoke rings at animation tick `tick` (tenths of a wall-clock second).
pub fn smoke_rings(tick: f64) -> impl Iterator<Item = Ring> {
    (0..SMOKE_RINGS).map(move |i| {
        let st = (tick + 3.0 * i as f64).rem_euclid(15.0);
        Ring {
            scale: 0.4 + st * 0.08,
            alpha: f64::max(0.0, 0.4 - st / 15.0),
            z: st * 0.5,
        }
    })
}

/// The flame rings at animation tick `tick`.
pub fn flame_rings(tick: f64) -> impl Iterator<Item = Ring> {
    (0..FLAME_RINGS).map(move |i| {
        let offset = (tick + 1.5 * i as f64).rem_euclid(10.0);
        Ring {
            scale: 0.4 + offset * 0.06,
            alpha: f64::max(0.0, 1.0 - offset / 10.0),
            z: offset * 0.3,
        }
    })
}

/// Draws a hazard overlay at wall-clock time `wall_secs`.
pub fn draw(hazard: &Hazard, wall_secs: f64, projection: &Projection, canvas: &mut impl Canvas) {
    match hazard.kind {
        HazardKind::Fire => draw_fire(hazard, wall_secs * 10.0, projection, canvas),
        HazardKind::Shooting | HazardKind::Other => draw_warning(hazard, projection, canvas),
    }
}

fn draw_fire(hazard: &Hazard, tick: f64, projection: &Projection, canvas: &mut impl Canvas) {
    let centre = projection.ground(hazard.position);
    let r = projection.pixels(hazard.radius);

    canvas.draw(
        Layer::Hazards,
        Shape::Ellipse {
            centre,
            radii: [r * 1.2, r * 0.7],
            rotation: FRAC_PI_4,
            fill: Some(Color::rgba(255, 87, 34, 0.3).into()),
            stroke: None,
        },
    );

    for ring in smoke_rings(tick) {
        canvas.draw(
            Layer::Hazards,
            Shape::circle(
                projection.project(hazard.position, ring.z),
                r * ring.scale,
                Color::rgba(80, 80, 80, ring.alpha),
            ),
        );
    }

    for ring in flame_rings(tick) {
        let a = ring.alpha;
        let stop = |offset, red, green, blue, alpha| GradientStop {
            offset,
            color: Color::rgba(red, green, blue, alpha),
        };
        let fill = Fill::Radial {
            stops: smallvec![
                stop(0.0, 255, 255, 200, a),
                stop(0.3, 255, 215, 0, a * 0.9),
                stop(0.5, 255, 140, 0, a * 0.7),
                stop(0.7, 255, 69, 0, a * 0.5),
                stop(0.9, 200, 0, 0, a * 0.3),
                stop(1.0, 255, 0, 0, 0.0),
            ],
        };
        canvas.draw(
            Layer::Hazards,
            Shape::circle(projection.project(hazard.position, ring.z), r * ring.scale, fill),
        );
    }

    let glow = Fill::Radial {
        stops: smallvec![
            GradientStop {
                offset: 0.0,
                color: Color::rgba(255, 200, 0, 0.8)
            },
            GradientStop {
                offset: 0.5,
                color: Color::rgba(255, 100, 0, 0.6)
            },
            GradientStop {
                offset: 1.0,
                color: Color::rgba(255, 0, 0, 0.0)
            },
        ],
    };
    canvas.draw(Layer::Hazards, Shape::circle(centre, r * 0.8, glow));

    let icon = projection.project(hazard.position, 2.0);
    canvas.draw(
        Layer::Hazards,
        Shape::text(icon, "🔥", 32.0, Color::rgb(0xff, 0x45, 0x00)),
    );
    canvas.draw(
        Layer::Hazards,
        Shape::text(
            icon + Vector2d::new(0.0, 25.0),
            "FIRE!",
            14.0,
            Color::rgb(0xff, 0x00, 0x00),
        ),
    );
}

fn draw_warning(hazard: &Hazard, projection: &Projection, canvas: &mut impl Canvas) {
    let r = projection.pixels(hazard.radius);
    canvas.draw(
        Layer::Hazards,
        Shape::Ellipse {
            centre: projection.ground(hazard.position),
            radii: [r, r * 0.6],
            rotation: FRAC_PI_4,
            fill: Some(Color::rgba(245, 158, 11, 0.25).into()),
            stroke: Some(Stroke::dashed(Color::rgb(0xd9, 0x77, 0x06), 3.0, 10.0, 5.0)),
        },
    );
    canvas.draw(
        Layer::Hazards,
        Shape::text(
            projection.project(hazard.position, 0.5),
            "⚠️",
            28.0,
            Color::rgb(0xf5, 0x7c, 0x00),
        ),
    );
}
