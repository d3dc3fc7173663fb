//! Recording of classified frames for the offline playback tool.

use crate::environment::Environment;
use crate::math::{Point2d, Vector2d};
use crate::pedestrian::{Classification, Pedestrian, VisualState};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Failure to write or read a playback file.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("playback file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("playback file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Extents and timing of a recording.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub width: f64,
    pub height: f64,
    /// Time of the last frame, in s.
    pub total_time: f64,
    /// Interval between the first two frames, in s.
    pub dt: f64,
}

/// A wall as a polyline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    #[serde(with = "crate::math::point::vec")]
    pub vertices: Vec<Point2d>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaybackExit {
    #[serde(with = "crate::math::point")]
    pub position: Point2d,
    /// Diameter of the exit zone, in m.
    pub width: f64,
}

/// A pedestrian's state in the playback tool's vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Normal,
    Panic,
    /// Not recorded by this crate, but accepted when loading.
    Evacuating,
    Stopped,
}

impl From<VisualState> for PlaybackState {
    fn from(state: VisualState) -> Self {
        match state {
            VisualState::Stopped => PlaybackState::Stopped,
            VisualState::PanickedHigh | VisualState::PanickedMedium => PlaybackState::Panic,
            VisualState::WaitingAtLight | VisualState::Crowded | VisualState::Calm => {
                PlaybackState::Normal
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FramePedestrian {
    pub id: u64,
    #[serde(with = "crate::math::point")]
    pub position: Point2d,
    #[serde(with = "crate::math::point::vector", default = "crate::math::zero_vector")]
    pub velocity: Vector2d,
    pub state: PlaybackState,
    pub panic_level: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub time: f64,
    pub pedestrians: Vec<FramePedestrian>,
}

/// The playback file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaybackFile {
    pub metadata: Metadata,
    pub obstacles: Vec<Obstacle>,
    pub exits: Vec<PlaybackExit>,
    pub frames: Vec<Frame>,
}

impl PlaybackFile {
    /// Writes the file as pretty-printed JSON.
    pub fn write_to(&self, writer: impl Write) -> Result<(), PlaybackError> {
        let mut writer = BufWriter::new(writer);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PlaybackError> {
        self.write_to(File::create(path)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlaybackError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Accumulates frames against a fixed environment.
#[derive(Clone, Debug)]
pub struct Recorder {
    width: f64,
    height: f64,
    obstacles: Vec<Obstacle>,
    exits: Vec<PlaybackExit>,
    frames: Vec<Frame>,
}

impl Recorder {
    /// Starts a recording of the given environment.
    pub fn new(env: &Environment) -> Self {
        Self {
            width: env.width,
            height: env.height,
            obstacles: env
                .walls
                .iter()
                .map(|wall| Obstacle {
                    vertices: vec![wall.start, wall.end],
                })
                .collect(),
            exits: env
                .exits
                .iter()
                .map(|exit| PlaybackExit {
                    position: exit.position,
                    width: 2.0 * exit.radius,
                })
                .collect(),
            frames: vec![],
        }
    }

    /// Appends a classified snapshot. Frames must arrive in increasing time
    /// order; a frame that does not is dropped.
    pub fn record(&mut self, time: f64, pedestrians: &[Pedestrian], classes: &[Classification]) {
        if let Some(last) = self.frames.last() {
            if !(time > last.time) {
                log::debug!("dropping out-of-order frame at t={} after t={}", time, last.time);
                return;
            }
        }
        let pedestrians = pedestrians
            .iter()
            .zip(classes)
            .map(|(ped, class)| FramePedestrian {
                id: ped.id,
                position: ped.position,
                velocity: ped.velocity,
                state: class.state.into(),
                panic_level: ped.panic_level,
            })
            .collect();
        self.frames.push(Frame { time, pedestrians });
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Completes the recording.
    pub fn finish(self) -> PlaybackFile {
        let total_time = self.frames.last().map_or(0.0, |f| f.time);
        let dt = match self.frames.as_slice() {
            [first, second, ..] => second.time - first.time,
            _ => 0.0,
        };
        PlaybackFile {
            metadata: Metadata {
                width: self.width,
                height: self.height,
                total_time,
                dt,
            },
            obstacles: self.obstacles,
            exits: self.exits,
            frames: self.frames,
        }
    }
}
