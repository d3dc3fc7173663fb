//! Stop lines which hold vehicles at red lights.

use super::Vehicle;
use crate::config::{Approach, Direction, GateRule};
use crate::environment::Environment;
use crate::light::{LightState, PhaseTable};

/// Whether a rule's stop line lies ahead of a vehicle at this position.
fn approaching(rule: &GateRule, vehicle: &Vehicle) -> bool {
    let coord = match rule.direction {
        Direction::East | Direction::West => vehicle.position.x,
        Direction::North | Direction::South => vehicle.position.y,
    };
    match rule.approach {
        Approach::Below => coord < rule.trigger,
        Approach::Above => coord > rule.trigger,
    }
}

/// Determines whether a vehicle must wait this tick.
///
/// A vehicle is held only when its lane has a direction, a gate rule for that
/// direction applies at its position, the rule's light exists in the
/// environment, and that light is red. Vehicles with no lane, or a lane the
/// environment does not know, are never held.
pub(super) fn is_held(
    vehicle: &Vehicle,
    env: &Environment,
    phases: &PhaseTable,
    gates: &[GateRule],
) -> bool {
    let direction = match vehicle
        .lane_id
        .and_then(|id| env.car_lane(id))
        .and_then(|lane| lane.direction)
    {
        Some(direction) => direction,
        None => return false,
    };
    gates
        .iter()
        .filter(|rule| rule.direction == direction)
        .find(|rule| approaching(rule, vehicle))
        .and_then(|rule| env.light(&rule.light_id))
        .map_or(false, |light| phases.state(&light.id) == LightState::Red)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{PhaseConfig, VehicleConfig};
    use crate::environment::Lane;
    use crate::light::{Axis, TrafficLight};
    use crate::math::{Point2d, Vector2d};

    fn env_with_lane(direction: Direction, light_id: &str, controls: Axis) -> Environment {
        let mut env = Environment::new(80.0, 80.0);
        env.car_lanes.push(Lane {
            lane_id: Some(1),
            points: vec![Point2d::new(0.0, 40.0), Point2d::new(80.0, 40.0)],
            width: None,
            direction: Some(direction),
            color: None,
        });
        env.traffic_lights.push(TrafficLight {
            id: light_id.to_string(),
            position: Point2d::new(35.0, 38.0),
            controls,
            orientation: None,
            state: None,
        });
        env
    }

    fn car(x: f64, y: f64, lane_id: Option<i64>) -> Vehicle {
        Vehicle {
            position: Point2d::new(x, y),
            velocity: Vector2d::new(1.0, 0.0),
            lane_id,
            kind: None,
            color: None,
        }
    }

    fn phases_at(env: &Environment, t: f64) -> PhaseTable {
        let mut phases = PhaseTable::new();
        phases.update(t, &env.traffic_lights, &PhaseConfig::default());
        phases
    }

    #[test]
    fn red_light_holds_approaching_vehicle() {
        let gates = VehicleConfig::default().gates;
        let env = env_with_lane(Direction::East, "tl_west", Axis::NorthSouth);
        let red = phases_at(&env, 0.0);
        let green = phases_at(&env, 20.0);
        assert!(is_held(&car(30.0, 40.0, Some(1)), &env, &red, &gates));
        assert!(!is_held(&car(30.0, 40.0, Some(1)), &env, &green, &gates));
    }

    #[test]
    fn vehicle_past_the_stop_line_is_not_held() {
        let gates = VehicleConfig::default().gates;
        let env = env_with_lane(Direction::East, "tl_west", Axis::NorthSouth);
        let red = phases_at(&env, 0.0);
        assert!(!is_held(&car(35.0, 40.0, Some(1)), &env, &red, &gates));
        assert!(!is_held(&car(50.0, 40.0, Some(1)), &env, &red, &gates));
    }

    #[test]
    fn opposite_directions_use_their_own_trigger() {
        let gates = VehicleConfig::default().gates;
        let env = env_with_lane(Direction::North, "tl_south", Axis::EastWest);
        let red = phases_at(&env, 20.0);
        assert!(is_held(&car(40.0, 46.0, Some(1)), &env, &red, &gates));
        assert!(!is_held(&car(40.0, 44.0, Some(1)), &env, &red, &gates));
    }

    #[test]
    fn missing_lane_or_light_never_holds() {
        let gates = VehicleConfig::default().gates;
        let env = env_with_lane(Direction::East, "tl_elsewhere", Axis::NorthSouth);
        let red = phases_at(&env, 0.0);
        assert!(!is_held(&car(30.0, 40.0, Some(1)), &env, &red, &gates));

        let env = env_with_lane(Direction::East, "tl_west", Axis::NorthSouth);
        let red = phases_at(&env, 0.0);
        assert!(!is_held(&car(30.0, 40.0, None), &env, &red, &gates));
        assert!(!is_held(&car(30.0, 40.0, Some(9)), &env, &red, &gates));
    }
}
