//! The static scene geometry.

use crate::config::Direction;
use crate::light::TrafficLight;
use crate::math::{is_finite, Point2d};
use crate::util::Rect;
use crate::vehicle::Vehicle;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub mod edit;

/// A wall segment.
///
/// Walls arrive either as `[[x, y], [x, y]]` or as `{start, end}` and are
/// always written back as `{start, end}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "WallRepr")]
pub struct Wall {
    #[serde(with = "crate::math::point")]
    pub start: Point2d,
    #[serde(with = "crate::math::point")]
    pub end: Point2d,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WallRepr {
    Pair([[f64; 2]; 2]),
    Object { start: [f64; 2], end: [f64; 2] },
}

impl From<WallRepr> for Wall {
    fn from(repr: WallRepr) -> Self {
        let ([sx, sy], [ex, ey]) = match repr {
            WallRepr::Pair([start, end]) => (start, end),
            WallRepr::Object { start, end } => (start, end),
        };
        Wall {
            start: Point2d::new(sx, sy),
            end: Point2d::new(ex, ey),
        }
    }
}

impl Wall {
    pub fn midpoint(&self) -> Point2d {
        crate::math::midpoint(self.start, self.end)
    }
}

fn default_true() -> bool {
    true
}

fn default_entrance_radius() -> f64 {
    1.0
}

fn default_flow_rate() -> f64 {
    2.0
}

fn default_exit_radius() -> f64 {
    1.5
}

/// A spawn zone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entrance {
    #[serde(with = "crate::math::point")]
    pub position: Point2d,
    #[serde(default = "default_entrance_radius")]
    pub radius: f64,
    /// Pedestrians per second.
    #[serde(default = "default_flow_rate")]
    pub flow_rate: f64,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// An exit zone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Exit {
    #[serde(with = "crate::math::point")]
    pub position: Point2d,
    #[serde(default = "default_exit_radius")]
    pub radius: f64,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// A road surface drawn under everything else.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Road {
    #[serde(with = "crate::math::point::vec")]
    pub points: Vec<Point2d>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub color: Option<crate::draw::Color>,
}

/// A car or pedestrian lane, as a polyline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lane {
    /// Identifies car lanes; vehicles refer to their lane by this ID.
    #[serde(default)]
    pub lane_id: Option<i64>,
    #[serde(with = "crate::math::point::vec")]
    pub points: Vec<Point2d>,
    #[serde(default)]
    pub width: Option<f64>,
    /// Direction of travel of a car lane.
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub color: Option<crate::draw::Color>,
}

/// A zebra crossing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crossing {
    #[serde(with = "crate::math::point")]
    pub start: Point2d,
    #[serde(with = "crate::math::point")]
    pub end: Point2d,
    #[serde(default)]
    pub width: Option<f64>,
    /// The light pedestrians on this crossing obey.
    #[serde(default)]
    pub traffic_light_id: Option<String>,
}

impl Crossing {
    /// The area in which pedestrians count as being on the crossing.
    pub fn zone(&self, default_width: f64) -> Rect {
        Rect::from_corners(self.start, self.end).inflate(self.width.unwrap_or(default_width))
    }
}

fn default_pond_radius() -> f64 {
    3.0
}

fn default_building_size() -> f64 {
    5.0
}

/// Scenery without any effect on the simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Decoration {
    Tree {
        #[serde(with = "crate::math::point")]
        position: Point2d,
    },
    Pond {
        #[serde(with = "crate::math::point")]
        position: Point2d,
        #[serde(default = "default_pond_radius")]
        radius: f64,
    },
    Building {
        #[serde(with = "crate::math::point")]
        position: Point2d,
        #[serde(default = "default_building_size")]
        width: f64,
        #[serde(default = "default_building_size")]
        height: f64,
    },
    /// A kind this client does not know how to draw.
    #[serde(other)]
    Other,
}

impl Decoration {
    pub fn is_building(&self) -> bool {
        matches!(self, Decoration::Building { .. })
    }
}

/// The scene geometry.
///
/// An environment is replaced wholesale whenever the server sends a new one. It
/// is edited locally only before being handed to the server; after that it is
/// locked and any further edit is refused until a fresh one arrives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub walls: Vec<Wall>,
    #[serde(default)]
    pub entrances: Vec<Entrance>,
    #[serde(default)]
    pub exits: Vec<Exit>,
    #[serde(default)]
    pub traffic_lights: Vec<TrafficLight>,
    #[serde(default)]
    pub crossing_lanes: Vec<Crossing>,
    #[serde(default)]
    pub roads: Vec<Road>,
    #[serde(default)]
    pub car_lanes: Vec<Lane>,
    #[serde(default)]
    pub pedestrian_lanes: Vec<Lane>,
    #[serde(default)]
    pub decorations: Vec<Decoration>,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
    #[serde(skip)]
    locked: bool,
}

/// A structural problem with an environment payload.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnvironmentError {
    #[error("environment extents {0} x {1} are not positive")]
    BadExtents(f64, f64),
    #[error("non-finite coordinate in {0}")]
    NonFinite(&'static str),
    #[error("negative radius in {0}")]
    NegativeRadius(&'static str),
    #[error("duplicate traffic light id {0:?}")]
    DuplicateLight(String),
}

/// Fails with [EnvironmentError::NonFinite] if any point is not finite.
fn finite(
    points: impl IntoIterator<Item = Point2d>,
    what: &'static str,
) -> Result<(), EnvironmentError> {
    if points.into_iter().all(is_finite) {
        Ok(())
    } else {
        Err(EnvironmentError::NonFinite(what))
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(50.0, 50.0)
    }
}

impl Environment {
    /// Creates an empty, editable environment.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            walls: vec![],
            entrances: vec![],
            exits: vec![],
            traffic_lights: vec![],
            crossing_lanes: vec![],
            roads: vec![],
            car_lanes: vec![],
            pedestrian_lanes: vec![],
            decorations: vec![],
            vehicles: vec![],
            locked: false,
        }
    }

    /// The environment's area in square metres.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Finds a traffic light by ID.
    pub fn light(&self, id: &str) -> Option<&TrafficLight> {
        self.traffic_lights.iter().find(|light| light.id == id)
    }

    /// Finds a car lane by its lane ID.
    pub fn car_lane(&self, lane_id: i64) -> Option<&Lane> {
        self.car_lanes
            .iter()
            .find(|lane| lane.lane_id == Some(lane_id))
    }

    /// Whether the environment has been handed to the server.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Marks the environment as handed to the server.
    pub(crate) fn lock(&mut self) {
        self.locked = true;
    }

    /// Checks the invariants an environment from the server must satisfy.
    pub fn validate(&self) -> Result<(), EnvironmentError> {
        if !(self.width > 0.0 && self.height > 0.0 && self.area().is_finite()) {
            return Err(EnvironmentError::BadExtents(self.width, self.height));
        }
        finite(self.walls.iter().flat_map(|w| [w.start, w.end]), "walls")?;
        finite(self.entrances.iter().map(|e| e.position), "entrances")?;
        finite(self.exits.iter().map(|e| e.position), "exits")?;
        finite(self.traffic_lights.iter().map(|l| l.position), "traffic lights")?;
        finite(
            self.crossing_lanes.iter().flat_map(|c| [c.start, c.end]),
            "crossing lanes",
        )?;
        finite(self.roads.iter().flat_map(|r| r.points.iter().copied()), "roads")?;
        finite(
            self.car_lanes.iter().flat_map(|l| l.points.iter().copied()),
            "car lanes",
        )?;
        finite(
            self.pedestrian_lanes
                .iter()
                .flat_map(|l| l.points.iter().copied()),
            "pedestrian lanes",
        )?;
        finite(self.vehicles.iter().map(|v| v.position), "vehicles")?;

        if self.entrances.iter().any(|e| !(e.radius >= 0.0)) {
            return Err(EnvironmentError::NegativeRadius("entrances"));
        }
        if self.exits.iter().any(|e| !(e.radius >= 0.0)) {
            return Err(EnvironmentError::NegativeRadius("exits"));
        }

        let mut ids = HashSet::new();
        for light in &self.traffic_lights {
            if !ids.insert(light.id.as_str()) {
                return Err(EnvironmentError::DuplicateLight(light.id.clone()));
            }
        }
        Ok(())
    }
}
