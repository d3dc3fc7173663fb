use crate::config::PhaseConfig;
use crate::math::Point2d;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The traffic axis a light controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    #[serde(rename = "north-south")]
    NorthSouth,
    #[serde(rename = "east-west")]
    EastWest,
    /// Anything else the server sent; such a light is always shown red.
    #[serde(other)]
    Unknown,
}

/// The state of a traffic light.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightState {
    #[default]
    Red,
    Green,
}

/// A traffic light in the environment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficLight {
    /// Unique within an environment.
    pub id: String,
    #[serde(with = "crate::math::point")]
    pub position: Point2d,
    pub controls: Axis,
    /// Housing orientation; purely cosmetic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    /// Initial state supplied by a scenario.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<LightState>,
}

/// The phase of one light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Phase {
    /// The current state.
    pub state: LightState,
    /// The simulation time at which the current state was entered.
    pub last_change_time: f64,
}

/// Computes the state of an axis at simulation time `t`.
///
/// North-south is red for the first `split` seconds of every cycle and green
/// for the rest; east-west is always the opposite.
pub fn axis_state(axis: Axis, t: f64, config: &PhaseConfig) -> LightState {
    let cycle_pos = t.rem_euclid(config.cycle);
    let north_south = if cycle_pos < config.split {
        LightState::Red
    } else {
        LightState::Green
    };
    match (axis, north_south) {
        (Axis::NorthSouth, state) => state,
        (Axis::EastWest, LightState::Red) => LightState::Green,
        (Axis::EastWest, LightState::Green) => LightState::Red,
        (Axis::Unknown, _) => LightState::Red,
    }
}

/// The phase side table of every traffic light in the environment.
///
/// Phases are never transmitted; they are recomputed from the simulation time
/// whenever a new time is observed. The table only remembers when each light
/// last changed, for display, and which lights have already been reported
/// as misconfigured.
#[derive(Clone, Debug, Default)]
pub struct PhaseTable {
    /// The phase of each light, by ID.
    phases: HashMap<String, Phase>,
    /// Lights whose configuration error has been reported.
    reported: HashSet<String>,
    /// The last simulation time observed.
    time: Option<f64>,
}

impl PhaseTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// Resets the table for a freshly loaded set of lights, using each light's
    /// initial state until the first update. Lights on an unknown axis start
    /// red regardless.
    pub fn seed(&mut self, lights: &[TrafficLight]) {
        self.reported.clear();
        for light in lights.iter().filter(|l| l.controls == Axis::Unknown) {
            self.report_unknown(light);
        }
        self.phases = lights
            .iter()
            .map(|light| {
                let state = match light.controls {
                    Axis::Unknown => LightState::Red,
                    _ => light.state.unwrap_or_default(),
                };
                let phase = Phase {
                    state,
                    last_change_time: 0.0,
                };
                (light.id.clone(), phase)
            })
            .collect();
        self.time = None;
    }

    /// Warns once per light about an axis it cannot be phased on.
    fn report_unknown(&mut self, light: &TrafficLight) {
        if self.reported.insert(light.id.clone()) {
            log::warn!(
                "traffic light {:?} controls an unknown axis; holding it red",
                light.id
            );
        }
    }

    /// Recomputes the phase of every light at simulation time `t`.
    pub fn update(&mut self, t: f64, lights: &[TrafficLight], config: &PhaseConfig) {
        if lights.is_empty() {
            return;
        }
        if !t.is_finite() {
            log::warn!("ignoring non-finite simulation time {}", t);
            return;
        }
        for light in lights {
            if light.controls == Axis::Unknown {
                self.report_unknown(light);
            }
            let state = axis_state(light.controls, t, config);
            match self.phases.get_mut(&light.id) {
                Some(phase) if phase.state != state => {
                    phase.state = state;
                    phase.last_change_time = t;
                }
                Some(_) => {}
                None => {
                    self.phases.insert(
                        light.id.clone(),
                        Phase {
                            state,
                            last_change_time: t,
                        },
                    );
                }
            }
        }
        self.time = Some(t);
    }

    /// Gets the state of a light; lights without a phase are red.
    pub fn state(&self, id: &str) -> LightState {
        self.phases
            .get(id)
            .map(|phase| phase.state)
            .unwrap_or_default()
    }

    /// Gets the phase of a light.
    pub fn get(&self, id: &str) -> Option<&Phase> {
        self.phases.get(id)
    }

    /// The simulation time of the last update.
    pub fn time(&self) -> Option<f64> {
        self.time
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn light(id: &str, controls: Axis) -> TrafficLight {
        TrafficLight {
            id: id.to_string(),
            position: Point2d::new(0.0, 0.0),
            controls,
            orientation: None,
            state: None,
        }
    }

    fn sample_times() -> impl Iterator<Item = f64> {
        (-120..=240).map(|i| i as f64 * 0.25 + 0.01)
    }

    #[test]
    fn axes_are_complementary() {
        let config = PhaseConfig::default();
        for t in sample_times() {
            let ns = axis_state(Axis::NorthSouth, t, &config);
            let ew = axis_state(Axis::EastWest, t, &config);
            assert_ne!(ns, ew, "t = {}", t);
        }
    }

    #[test]
    fn phase_is_periodic() {
        let config = PhaseConfig::default();
        for t in sample_times() {
            for axis in [Axis::NorthSouth, Axis::EastWest] {
                assert_eq!(
                    axis_state(axis, t, &config),
                    axis_state(axis, t + 30.0, &config)
                );
            }
        }
    }

    #[test]
    fn phase_boundaries() {
        let config = PhaseConfig::default();
        assert_eq!(axis_state(Axis::NorthSouth, 0.0, &config), LightState::Red);
        assert_eq!(axis_state(Axis::NorthSouth, 14.99, &config), LightState::Red);
        assert_eq!(axis_state(Axis::NorthSouth, 15.0, &config), LightState::Green);
        assert_eq!(axis_state(Axis::EastWest, 0.0, &config), LightState::Green);
        assert_eq!(axis_state(Axis::EastWest, 29.99, &config), LightState::Red);
        assert_eq!(axis_state(Axis::Unknown, 20.0, &config), LightState::Red);
    }

    #[test]
    fn lights_sharing_an_axis_agree() {
        let config = PhaseConfig::default();
        let lights = vec![
            light("a", Axis::NorthSouth),
            light("b", Axis::EastWest),
            light("c", Axis::NorthSouth),
            light("d", Axis::EastWest),
        ];
        let mut table = PhaseTable::new();
        for t in sample_times() {
            table.update(t, &lights, &config);
            assert_eq!(table.state("a"), table.state("c"));
            assert_eq!(table.state("b"), table.state("d"));
            assert_ne!(table.state("a"), table.state("b"));
        }
    }

    #[test]
    fn last_change_is_edge_triggered() {
        let config = PhaseConfig::default();
        let lights = vec![light("ns", Axis::NorthSouth)];
        let mut table = PhaseTable::new();
        table.seed(&lights);
        table.update(1.0, &lights, &config);
        assert_eq!(table.get("ns").unwrap().last_change_time, 0.0);
        table.update(16.0, &lights, &config);
        table.update(17.0, &lights, &config);
        table.update(17.0, &lights, &config);
        let phase = table.get("ns").unwrap();
        assert_eq!(phase.state, LightState::Green);
        assert_eq!(phase.last_change_time, 16.0);
    }

    #[test]
    fn initial_state_holds_until_first_update() {
        let config = PhaseConfig::default();
        let mut ns = light("ns", Axis::NorthSouth);
        ns.state = Some(LightState::Green);
        let lights = vec![ns];
        let mut table = PhaseTable::new();
        table.seed(&lights);
        assert_eq!(table.state("ns"), LightState::Green);
        table.update(3.0, &lights, &config);
        assert_eq!(table.state("ns"), LightState::Red);
    }

    #[test]
    fn time_jumps_self_correct() {
        let config = PhaseConfig::default();
        let lights = vec![light("ew", Axis::EastWest)];
        let mut table = PhaseTable::new();
        table.update(20.0, &lights, &config);
        assert_eq!(table.state("ew"), LightState::Red);
        table.update(0.0, &lights, &config);
        assert_eq!(table.state("ew"), LightState::Green);
        table.update(f64::NAN, &lights, &config);
        assert_eq!(table.state("ew"), LightState::Green);
        assert_eq!(table.time(), Some(0.0));
    }

    #[test]
    fn empty_light_list_is_a_no_op() {
        let mut table = PhaseTable::new();
        table.update(5.0, &[], &PhaseConfig::default());
        assert!(table.is_empty());
        assert_eq!(table.time(), None);
    }

    #[test]
    fn unknown_axis_parses_and_stays_red() {
        let light: TrafficLight = serde_json::from_str(
            r#"{"id": "x", "position": [1, 2], "controls": "diagonal"}"#,
        )
        .unwrap();
        assert_eq!(light.controls, Axis::Unknown);
        let mut table = PhaseTable::new();
        for t in [0.0, 16.0] {
            table.update(t, std::slice::from_ref(&light), &PhaseConfig::default());
            assert_eq!(table.state("x"), LightState::Red);
        }
    }

    #[test]
    fn unknown_axis_seeds_red_whatever_its_initial_state() {
        let light: TrafficLight = serde_json::from_str(
            r#"{"id": "x", "position": [1, 2], "controls": "diagonal", "state": "green"}"#,
        )
        .unwrap();
        let mut table = PhaseTable::new();
        table.seed(std::slice::from_ref(&light));
        assert_eq!(table.state("x"), LightState::Red);
        assert!(table.reported.contains("x"));
    }
}
