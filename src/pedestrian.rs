//! Per-frame visual classification of pedestrians.

use crate::config::ClassifierConfig;
use crate::draw::{Canvas, Color, Fill, GradientStop, Layer, Shape, Stroke};
use crate::environment::{Crossing, Environment};
use crate::light::{LightState, PhaseTable};
use crate::math::{Point2d, Vector2d};
use crate::projection::{Projection, ScreenPoint};
use cgmath::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::smallvec;

fn default_radius() -> f64 {
    0.3
}

/// A pedestrian as reported in a simulation update. Read-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pedestrian {
    pub id: u64,
    #[serde(with = "crate::math::point")]
    pub position: Point2d,
    /// Velocity in m/s.
    #[serde(with = "crate::math::point::vector", default = "crate::math::zero_vector")]
    pub velocity: Vector2d,
    /// Personal space radius in m.
    #[serde(default = "default_radius")]
    pub radius: f64,
    /// Panic in `[0, 1]`.
    #[serde(default)]
    pub panic_level: f64,
}

impl Pedestrian {
    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }
}

/// How a pedestrian is shown this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualState {
    Stopped,
    WaitingAtLight,
    Crowded,
    PanickedHigh,
    PanickedMedium,
    Calm,
}

/// The colours of a pedestrian figure.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Style {
    pub body: Color,
    pub head: Color,
    pub border: Color,
}

impl VisualState {
    pub fn style(self) -> Style {
        let (body, head, border) = match self {
            VisualState::Stopped => (0xff1744, 0xd50000, 0xffffff),
            VisualState::WaitingAtLight => (0xff9800, 0xf57c00, 0xe65100),
            VisualState::Crowded => (0x9e9e9e, 0x757575, 0x424242),
            VisualState::PanickedHigh => (0xef5350, 0xf44336, 0xc62828),
            VisualState::PanickedMedium => (0xffa726, 0xff9800, 0xf57c00),
            VisualState::Calm => (0x66bb6a, 0x4caf50, 0x388e3c),
        };
        let hex = |v: u32| Color::rgb((v >> 16) as u8, (v >> 8 & 0xff) as u8, (v & 0xff) as u8);
        Style {
            body: hex(body),
            head: hex(head),
            border: hex(border),
        }
    }
}

/// A marker drawn above a pedestrian's head.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Glyph {
    /// Too crowded to move.
    Paused,
    /// Panicking.
    Alarm,
}

impl Glyph {
    pub fn text(self) -> &'static str {
        match self {
            Glyph::Paused => "⏸",
            Glyph::Alarm => "!",
        }
    }
}

/// The classifier's verdict for one pedestrian.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub state: VisualState,
    /// Whether more than the allowed number of others are close by. This can
    /// hold even when another state took precedence.
    pub crowded: bool,
    /// Where the direction arrow points to, if one is shown.
    pub arrow_tip: Option<Point2d>,
    pub glyph: Option<Glyph>,
}

/// Classifies pedestrians against the current environment and light phases.
pub struct Classifier<'a> {
    env: &'a Environment,
    phases: &'a PhaseTable,
    config: &'a ClassifierConfig,
}

impl<'a> Classifier<'a> {
    pub fn new(env: &'a Environment, phases: &'a PhaseTable, config: &'a ClassifierConfig) -> Self {
        Self {
            env,
            phases,
            config,
        }
    }

    /// Classifies every pedestrian of a snapshot, in order.
    pub fn classify_all(&self, pedestrians: &[Pedestrian]) -> Vec<Classification> {
        (0..pedestrians.len())
            .filter_map(|idx| self.classify(pedestrians, idx))
            .collect()
    }

    /// Classifies the pedestrian at `idx` among `pedestrians`, or `None` if
    /// there is no such pedestrian.
    pub fn classify(&self, pedestrians: &[Pedestrian], idx: usize) -> Option<Classification> {
        let ped = pedestrians.get(idx)?;
        let speed = ped.speed();
        let crowded = self.neighbour_count(pedestrians, idx) > self.config.crowd_count;
        let panic = ped.panic_level;

        let state = if speed < self.config.stop_speed && !crowded {
            VisualState::Stopped
        } else if self.is_waiting(ped.position) {
            VisualState::WaitingAtLight
        } else if crowded {
            VisualState::Crowded
        } else if panic > self.config.panic_high {
            VisualState::PanickedHigh
        } else if panic > self.config.panic_medium {
            VisualState::PanickedMedium
        } else {
            VisualState::Calm
        };

        let arrow_tip = if !crowded && speed > self.config.arrow_speed {
            Some(ped.position + ped.velocity * self.config.arrow_lookahead)
        } else {
            None
        };

        let glyph = if crowded {
            Some(Glyph::Paused)
        } else if panic > self.config.panic_glyph {
            Some(Glyph::Alarm)
        } else {
            None
        };

        Some(Classification {
            state,
            crowded,
            arrow_tip,
            glyph,
        })
    }

    /// Counts the other pedestrians strictly within the crowd radius.
    fn neighbour_count(&self, pedestrians: &[Pedestrian], idx: usize) -> usize {
        let ped = &pedestrians[idx];
        let range = ped.radius * self.config.crowd_radius_factor;
        pedestrians
            .iter()
            .enumerate()
            .filter(|&(other, p)| other != idx && p.position.distance(ped.position) < range)
            .count()
    }

    /// The first crossing whose zone contains the point.
    fn crossing_at(&self, p: Point2d) -> Option<&'a Crossing> {
        self.env
            .crossing_lanes
            .iter()
            .find(|crossing| crossing.zone(self.config.default_crossing_width).contains(p))
    }

    /// Whether the point is on a crossing whose light forbids crossing.
    fn is_waiting(&self, p: Point2d) -> bool {
        let crossing = match self.crossing_at(p) {
            Some(crossing) => crossing,
            None => return false,
        };
        match crossing
            .traffic_light_id
            .as_deref()
            .and_then(|id| self.env.light(id))
        {
            Some(light) => self.phases.state(&light.id) != LightState::Green,
            None => false,
        }
    }
}

/// Draws a pedestrian as a small standing figure.
pub fn draw(
    ped: &Pedestrian,
    class: &Classification,
    projection: &Projection,
    canvas: &mut impl Canvas,
) {
    let style = class.state.style();
    let size = projection.pixels(ped.radius).max(4.0);
    let at = |z: f64| projection.project(ped.position, z);

    let ground = at(0.0);
    canvas.draw(
        Layer::Pedestrians,
        Shape::Ellipse {
            centre: ground,
            radii: [size * 0.8, size * 0.4],
            rotation: std::f64::consts::FRAC_PI_4,
            fill: Some(Color::rgba(0, 0, 0, 0.3).into()),
            stroke: None,
        },
    );

    let head = at(1.8);
    let head_radius = size * 0.5;
    canvas.draw(
        Layer::Pedestrians,
        Shape::Ellipse {
            centre: head,
            radii: [head_radius, head_radius],
            rotation: 0.0,
            fill: Some(Fill::Radial {
                stops: smallvec![
                    GradientStop {
                        offset: 0.0,
                        color: style.head
                    },
                    GradientStop {
                        offset: 1.0,
                        color: style.border
                    },
                ],
            }),
            stroke: Some(Stroke::solid(style.border, 1.5)),
        },
    );

    let body_width = size * 0.9;
    canvas.draw(
        Layer::Pedestrians,
        Shape::line(at(0.6), at(1.5), Stroke::solid(style.body, body_width).rounded()),
    );

    let (hip, foot) = (at(0.6), at(0.5));
    for side in [-1.0, 1.0] {
        let from = hip + Vector2d::new(side * body_width * 0.2, 0.0);
        let to = foot + Vector2d::new(side * body_width * 0.3, body_width * 0.3);
        canvas.draw(
            Layer::Pedestrians,
            Shape::line(from, to, Stroke::solid(style.body, body_width * 0.4).rounded()),
        );
    }

    if let Some(tip) = class.arrow_tip {
        draw_arrow(at(0.5), projection.project(tip, 0.5), canvas);
    }

    if let Some(glyph) = class.glyph {
        let (color, size) = match glyph {
            Glyph::Paused => (Color::rgb(0xff, 0x98, 0x00), 14.0),
            Glyph::Alarm => (Color::rgb(0xff, 0x17, 0x44), 12.0),
        };
        let anchor = head - Vector2d::new(0.0, head_radius + 10.0);
        canvas.draw(Layer::Pedestrians, Shape::text(anchor, glyph.text(), size, color));
    }
}

fn draw_arrow(from: ScreenPoint, to: ScreenPoint, canvas: &mut impl Canvas) {
    let white = Color::rgba(255, 255, 255, 0.9);
    canvas.draw(Layer::Pedestrians, Shape::line(from, to, Stroke::solid(white, 2.0)));

    let angle = (to.y - from.y).atan2(to.x - from.x);
    let barb = |a: f64| to - Vector2d::new(a.cos(), a.sin()) * 6.0;
    canvas.draw(
        Layer::Pedestrians,
        Shape::polygon([to, barb(angle - 0.5), barb(angle + 0.5)], white, None),
    );
}
