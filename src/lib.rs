//! Local reconstruction and rendering of a live pedestrian simulation.
//!
//! The server streams the scene geometry and pedestrian snapshots. Everything
//! else shown on screen is derived here: traffic light phases, the motion of
//! the decorative vehicles, the visual state of each pedestrian, congestion
//! hotspots and hazard overlays. A [Scene] owns all of it and draws one frame
//! per [Scene::tick] to any [Canvas].

pub use cgmath;
pub use config::SceneConfig;
pub use draw::{Canvas, Color, DisplayList, Layer, Shape};
pub use environment::edit::{EditError, EditOutcome, Tool};
pub use environment::Environment;
pub use hazard::{Hazard, HazardKind};
pub use light::{Axis, LightState, PhaseTable, TrafficLight};
pub use pedestrian::{Classification, Classifier, Pedestrian, VisualState};
pub use playback::{PlaybackError, PlaybackFile, PlaybackState, Recorder};
pub use projection::{Projection, ProjectionMode, ScreenPoint, Viewport};
pub use protocol::{Inbound, Outbound, ProtocolError};
pub use scene::{Hud, Notice, RunStatus, Scene};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use util::{Interval, Rect};
pub use vehicle::{Traffic, Vehicle};

pub mod config;
pub mod congestion;
pub mod draw;
pub mod environment;
pub mod hazard;
pub mod light;
pub mod math;
pub mod pedestrian;
pub mod playback;
pub mod projection;
pub mod protocol;
mod scene;
mod util;
pub mod vehicle;

new_key_type! {
    /// Unique ID of a runtime [Vehicle].
    pub struct VehicleId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
