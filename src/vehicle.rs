use self::gating::is_held;
use crate::config::VehicleConfig;
use crate::draw::{Canvas, Color, Layer, Shape, Stroke};
use crate::environment::Environment;
use crate::light::PhaseTable;
use crate::math::{wrap_toroidal, Point2d, Vector2d};
use crate::projection::Projection;
use crate::{VehicleId, VehicleSet};
use serde::{Deserialize, Serialize};

mod gating;

/// Car body width, in m.
const CAR_WIDTH: f64 = 2.0;
/// Car body length, in m.
const CAR_LENGTH: f64 = 4.5;
/// Car body height, in m.
const CAR_HEIGHT: f64 = 1.5;

/// Body colours picked by lane when a vehicle has no colour of its own.
const LANE_PALETTE: [Color; 5] = [
    Color::rgb(0xff, 0x33, 0x33),
    Color::rgb(0x33, 0x33, 0xff),
    Color::rgb(0xff, 0xff, 0x33),
    Color::rgb(0x33, 0xff, 0x33),
    Color::rgb(0xff, 0x99, 0x33),
];

/// A decorative vehicle.
///
/// Vehicles are purely cosmetic: they are advanced locally every render tick
/// and never interact with pedestrians or each other.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    /// Centre of the vehicle, in m.
    #[serde(with = "crate::math::point")]
    pub position: Point2d,
    /// Displacement per tick before scaling; a missing velocity is zero.
    #[serde(with = "crate::math::point::vector", default = "crate::math::zero_vector")]
    pub velocity: Vector2d,
    /// The car lane the vehicle drives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lane_id: Option<i64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl Vehicle {
    /// The body colour: the vehicle's own, else one picked by lane.
    pub fn body_color(&self) -> Color {
        self.color.unwrap_or_else(|| match self.lane_id {
            Some(lane) => LANE_PALETTE[lane.rem_euclid(LANE_PALETTE.len() as i64) as usize],
            None => LANE_PALETTE[0],
        })
    }

    /// Moves the vehicle by one tick, wrapping around the travel bounds.
    fn advance(&mut self, config: &VehicleConfig) {
        let next = self.position + self.velocity * config.speed;
        self.position = Point2d::new(
            wrap_toroidal(next.x, config.travel_bound),
            wrap_toroidal(next.y, config.travel_bound),
        );
    }

    /// Draws the vehicle as a shaded box with a windshield.
    pub fn draw(&self, projection: &Projection, canvas: &mut impl Canvas) {
        let Point2d { x, y } = self.position;
        let (hw, hl) = (0.5 * CAR_WIDTH, 0.5 * CAR_LENGTH);
        let corner = |dx: f64, dy: f64, z: f64| projection.project(Point2d::new(x + dx, y + dy), z);

        let front_left = corner(-hw, -hl, 0.0);
        let front_right = corner(hw, -hl, 0.0);
        let back_left = corner(-hw, hl, 0.0);
        let back_right = corner(hw, hl, 0.0);
        let front_left_top = corner(-hw, -hl, CAR_HEIGHT);
        let front_right_top = corner(hw, -hl, CAR_HEIGHT);
        let back_left_top = corner(-hw, hl, CAR_HEIGHT);
        let back_right_top = corner(hw, hl, CAR_HEIGHT);

        let body = self.body_color();
        let edge = Some(Stroke::solid(Color::BLACK, 1.0));

        let faces = [
            (
                [front_left, front_right, back_right, back_left],
                Color::rgba(0, 0, 0, 0.3),
                None,
            ),
            (
                [front_left, front_left_top, back_left_top, back_left],
                body.shade(-20.0),
                edge.clone(),
            ),
            (
                [front_right, front_right_top, back_right_top, back_right],
                body.shade(-40.0),
                edge.clone(),
            ),
            (
                [front_left_top, front_right_top, back_right_top, back_left_top],
                body,
                edge,
            ),
        ];
        for (points, fill, stroke) in faces {
            canvas.draw(Layer::Vehicles, Shape::polygon(points, fill, stroke));
        }

        let windshield = [
            front_left_top,
            front_right_top,
            corner(CAR_WIDTH / 3.0, -CAR_LENGTH / 4.0, CAR_HEIGHT * 0.7),
            corner(-CAR_WIDTH / 3.0, -CAR_LENGTH / 4.0, CAR_HEIGHT * 0.7),
        ];
        canvas.draw(
            Layer::Vehicles,
            Shape::polygon(windshield, Color::rgba(100, 150, 200, 0.6), None),
        );
    }
}

/// The runtime vehicles of the current environment.
#[derive(Clone, Debug, Default)]
pub struct Traffic {
    vehicles: VehicleSet,
}

impl Traffic {
    pub fn new() -> Self {
        Default::default()
    }

    /// Replaces all vehicles with those of a freshly received environment.
    pub fn reset(&mut self, env: &Environment) {
        self.vehicles.clear();
        for vehicle in &env.vehicles {
            self.vehicles.insert(vehicle.clone());
        }
    }

    /// Advances every vehicle whose lane is not held by a red light.
    ///
    /// Returns the number of vehicles held.
    pub fn step(&mut self, env: &Environment, phases: &PhaseTable, config: &VehicleConfig) -> usize {
        let mut held = 0;
        for (_, vehicle) in &mut self.vehicles {
            if is_held(vehicle, env, phases, &config.gates) {
                held += 1;
            } else {
                vehicle.advance(config);
            }
        }
        log::trace!("vehicles: {} moved, {} held", self.vehicles.len() - held, held);
        held
    }

    /// Draws every vehicle.
    pub fn draw(&self, projection: &Projection, canvas: &mut impl Canvas) {
        for (_, vehicle) in &self.vehicles {
            vehicle.draw(projection, canvas);
        }
    }

    pub fn get(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VehicleId, &Vehicle)> {
        self.vehicles.iter()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}
