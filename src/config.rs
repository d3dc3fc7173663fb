//! Tunable constants of the scene.
//!
//! Every threshold defaults to the value observed in the live client. Any
//! subset of fields can be overridden from JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration of all scene components.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub projection: ProjectionConfig,
    pub phase: PhaseConfig,
    pub vehicles: VehicleConfig,
    pub classifier: ClassifierConfig,
    pub congestion: CongestionConfig,
    pub editing: EditConfig,
}

/// Constants of the isometric projection and scale fitting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// The axonometric rotation in degrees.
    pub angle_deg: f64,
    /// Uniform scale applied to isometric coordinates.
    pub iso_scale: f64,
    /// Vertical foreshortening factor.
    pub vertical_compression: f64,
    /// Horizontal and vertical headroom factors used when fitting an isometric view.
    pub iso_margin: [f64; 2],
    /// Headroom factors used when fitting a planar view.
    pub planar_margin: [f64; 2],
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            angle_deg: 30.0,
            iso_scale: 0.86,
            vertical_compression: 0.7,
            iso_margin: [1.8, 1.2],
            planar_margin: [1.0, 1.0],
        }
    }
}

/// Timing of the shared traffic light cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Full cycle length in simulation seconds.
    pub cycle: f64,
    /// Time into the cycle at which north-south turns green.
    pub split: f64,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            cycle: 30.0,
            split: 15.0,
        }
    }
}

/// A lane direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

/// Which side of the trigger line holds a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Approach {
    /// Gated while the coordinate is below the trigger line.
    Below,
    /// Gated while the coordinate is above the trigger line.
    Above,
}

/// A stop line for one lane direction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateRule {
    /// The lane direction this rule applies to.
    pub direction: Direction,
    /// The light which holds the traffic.
    pub light_id: String,
    /// The trigger line coordinate, measured on the axis of travel.
    pub trigger: f64,
    pub approach: Approach,
}

/// Constants of the cosmetic vehicle motion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Distance per unit velocity per render tick, in m.
    pub speed: f64,
    /// Travel bound for the toroidal wrap, in m.
    pub travel_bound: f64,
    pub gates: Vec<GateRule>,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        let gate = |direction, light_id: &str, trigger, approach| GateRule {
            direction,
            light_id: light_id.to_string(),
            trigger,
            approach,
        };
        Self {
            speed: 0.15,
            travel_bound: 80.0,
            gates: vec![
                gate(Direction::East, "tl_west", 35.0, Approach::Below),
                gate(Direction::West, "tl_east", 45.0, Approach::Above),
                gate(Direction::South, "tl_north", 35.0, Approach::Below),
                gate(Direction::North, "tl_south", 45.0, Approach::Above),
            ],
        }
    }
}

/// Thresholds of the pedestrian classifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Speeds below this are considered stopped, in m/s.
    pub stop_speed: f64,
    /// Speeds above this get a direction arrow, in m/s.
    pub arrow_speed: f64,
    /// Seconds of velocity drawn by the direction arrow.
    pub arrow_lookahead: f64,
    /// Neighbourhood radius as a multiple of the pedestrian radius.
    pub crowd_radius_factor: f64,
    /// More neighbours than this marks a pedestrian as crowded.
    pub crowd_count: usize,
    pub panic_high: f64,
    pub panic_medium: f64,
    /// Panic above this shows the `!` glyph.
    pub panic_glyph: f64,
    /// Crossing margin used when a crossing has no width.
    pub default_crossing_width: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            stop_speed: 0.05,
            arrow_speed: 0.1,
            arrow_lookahead: 0.8,
            crowd_radius_factor: 3.0,
            crowd_count: 5,
            panic_high: 0.7,
            panic_medium: 0.3,
            panic_glyph: 0.5,
            default_crossing_width: 4.0,
        }
    }
}

/// Constants of the congestion detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CongestionConfig {
    /// Edge length of a density cell, in m.
    pub cell_size: f64,
    /// Occupancy at which a cell is flagged.
    pub cell_threshold: u32,
    /// Scene-wide pedestrians per square metre above which the jam warning shows.
    pub density_threshold: f64,
}

impl Default for CongestionConfig {
    fn default() -> Self {
        Self {
            cell_size: 5.0,
            cell_threshold: 8,
            density_threshold: 0.015,
        }
    }
}

/// Defaults of the interactive editor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditConfig {
    /// Maximum distance of an element removed by the clear tool, in m.
    pub clear_radius: f64,
    pub entrance_radius: f64,
    pub entrance_flow: f64,
    pub exit_radius: f64,
    /// Default radius of a placed hazard, in m.
    pub hazard_radius: f64,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            clear_radius: 2.0,
            entrance_radius: 1.0,
            entrance_flow: 2.0,
            exit_radius: 1.5,
            hazard_radius: 10.0,
        }
    }
}

impl SceneConfig {
    /// Reads a configuration from a JSON file; missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }
}

/// Failure to load a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
