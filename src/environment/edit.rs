//! Pointer-driven editing of an environment before it is handed to the server.

use super::{Entrance, Environment, Exit, Wall};
use crate::config::EditConfig;
use crate::draw::{Canvas, Color, Layer, Shape, Stroke};
use crate::math::{is_finite, Point2d};
use crate::projection::{Projection, ProjectionMode};
use cgmath::MetricSpace;

/// An edit which was refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("the environment has been submitted and can no longer be edited")]
    Locked,
    #[error("wall endpoints coincide")]
    DegenerateWall,
    #[error("non-finite coordinate")]
    NonFinite,
    #[error("radius {0} is not positive")]
    BadRadius(f64),
    #[error("flow rate {0} is negative")]
    NegativeFlow(f64),
}

/// An element taken out of the environment by [Environment::remove_nearest].
#[derive(Clone, Debug, PartialEq)]
pub enum Removed {
    Wall(Wall),
    Entrance(Entrance),
    Exit(Exit),
}

impl Environment {
    /// Fails if the environment has been submitted.
    pub fn check_editable(&self) -> Result<(), EditError> {
        if self.locked {
            Err(EditError::Locked)
        } else {
            Ok(())
        }
    }

    /// Adds a wall between two points.
    pub fn add_wall(&mut self, start: Point2d, end: Point2d) -> Result<(), EditError> {
        self.check_editable()?;
        if !is_finite(start) || !is_finite(end) {
            return Err(EditError::NonFinite);
        }
        if start == end {
            return Err(EditError::DegenerateWall);
        }
        self.walls.push(Wall { start, end });
        Ok(())
    }

    /// Adds an active entrance.
    pub fn add_entrance(
        &mut self,
        position: Point2d,
        radius: f64,
        flow_rate: f64,
    ) -> Result<(), EditError> {
        self.check_editable()?;
        if !is_finite(position) {
            return Err(EditError::NonFinite);
        }
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(EditError::BadRadius(radius));
        }
        if !(flow_rate >= 0.0) || !flow_rate.is_finite() {
            return Err(EditError::NegativeFlow(flow_rate));
        }
        self.entrances.push(Entrance {
            position,
            radius,
            flow_rate,
            active: true,
        });
        Ok(())
    }

    /// Adds an active exit.
    pub fn add_exit(&mut self, position: Point2d, radius: f64) -> Result<(), EditError> {
        self.check_editable()?;
        if !is_finite(position) {
            return Err(EditError::NonFinite);
        }
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(EditError::BadRadius(radius));
        }
        self.exits.push(Exit {
            position,
            radius,
            active: true,
        });
        Ok(())
    }

    /// Removes the element closest to `p`, if it lies strictly within
    /// `max_distance`.
    ///
    /// Walls are measured by their midpoint. Candidates are visited walls
    /// first, then entrances, then exits, and only a strictly closer candidate
    /// replaces the current best, so on a tie the first visited wins.
    pub fn remove_nearest(
        &mut self,
        p: Point2d,
        max_distance: f64,
    ) -> Result<Option<Removed>, EditError> {
        self.check_editable()?;

        #[derive(Clone, Copy)]
        enum Kind {
            Wall,
            Entrance,
            Exit,
        }

        let candidates = self
            .walls
            .iter()
            .map(|w| (Kind::Wall, w.midpoint()))
            .chain(self.entrances.iter().map(|e| (Kind::Entrance, e.position)))
            .chain(self.exits.iter().map(|e| (Kind::Exit, e.position)));

        let mut best: Option<(Kind, usize, f64)> = None;
        let mut counts = [0usize; 3];
        for (kind, position) in candidates {
            let slot = kind as usize;
            let idx = counts[slot];
            counts[slot] += 1;
            let dist = position.distance(p);
            if best.map_or(true, |(_, _, d)| dist < d) {
                best = Some((kind, idx, dist));
            }
        }

        let removed = match best {
            Some((kind, idx, dist)) if dist < max_distance => match kind {
                Kind::Wall => Removed::Wall(self.walls.remove(idx)),
                Kind::Entrance => Removed::Entrance(self.entrances.remove(idx)),
                Kind::Exit => Removed::Exit(self.exits.remove(idx)),
            },
            _ => return Ok(None),
        };
        log::debug!("removed {:?} near ({:.1}, {:.1})", removed, p.x, p.y);
        Ok(Some(removed))
    }
}

/// An editing tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    /// Two clicks place a wall.
    Wall,
    Entrance,
    Exit,
    /// Removes the nearest element.
    Clear,
    /// Selects the position of a hazard event.
    Hazard,
}

/// What a click did.
#[derive(Clone, Debug, PartialEq)]
pub enum EditOutcome {
    /// The first end of a wall was placed.
    WallStarted,
    WallAdded,
    EntranceAdded,
    ExitAdded,
    Removed(Removed),
    /// A clear click with nothing close enough.
    NothingRemoved,
    HazardSelected(Point2d),
}

/// The pointer state of the environment editor.
#[derive(Clone, Debug)]
pub struct Editor {
    tool: Tool,
    config: EditConfig,
    /// First end of a wall being placed.
    wall_start: Option<Point2d>,
    /// Last pointer position.
    hover: Option<Point2d>,
    /// Chosen hazard position.
    hazard: Option<Point2d>,
}

impl Editor {
    pub fn new(config: &EditConfig) -> Self {
        Self {
            tool: Tool::Wall,
            config: config.clone(),
            wall_start: None,
            hover: None,
            hazard: None,
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switches tool, abandoning a half-placed wall.
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
        self.wall_start = None;
    }

    /// Sets the radius and flow rate given to new entrances.
    pub fn set_entrance_params(&mut self, radius: f64, flow_rate: f64) {
        self.config.entrance_radius = radius;
        self.config.entrance_flow = flow_rate;
    }

    /// Sets the radius of the hazard preview.
    pub fn set_hazard_radius(&mut self, radius: f64) {
        self.config.hazard_radius = radius;
    }

    pub fn hazard_radius(&self) -> f64 {
        self.config.hazard_radius
    }

    /// The selected hazard position, if any.
    pub fn hazard_position(&self) -> Option<Point2d> {
        self.hazard
    }

    /// Records the pointer position, for previews.
    pub fn hover(&mut self, p: Point2d) {
        self.hover = Some(p);
    }

    /// Applies a click at world position `p` with the current tool.
    ///
    /// A refused edit leaves the environment untouched. A refused second wall
    /// click also abandons the wall.
    pub fn click(&mut self, env: &mut Environment, p: Point2d) -> Result<EditOutcome, EditError> {
        match self.tool {
            Tool::Wall => match self.wall_start.take() {
                None => {
                    env.check_editable()?;
                    if !is_finite(p) {
                        return Err(EditError::NonFinite);
                    }
                    self.wall_start = Some(p);
                    Ok(EditOutcome::WallStarted)
                }
                Some(start) => {
                    env.add_wall(start, p)?;
                    Ok(EditOutcome::WallAdded)
                }
            },
            Tool::Entrance => {
                env.add_entrance(p, self.config.entrance_radius, self.config.entrance_flow)?;
                Ok(EditOutcome::EntranceAdded)
            }
            Tool::Exit => {
                env.add_exit(p, self.config.exit_radius)?;
                Ok(EditOutcome::ExitAdded)
            }
            Tool::Clear => Ok(env
                .remove_nearest(p, self.config.clear_radius)?
                .map_or(EditOutcome::NothingRemoved, EditOutcome::Removed)),
            Tool::Hazard => {
                if !is_finite(p) {
                    return Err(EditError::NonFinite);
                }
                self.hazard = Some(p);
                Ok(EditOutcome::HazardSelected(p))
            }
        }
    }

    /// Draws the rubber-band wall and hazard previews.
    pub fn draw(&self, projection: &Projection, canvas: &mut impl Canvas) {
        if let (Some(start), Some(hover)) = (self.wall_start, self.hover) {
            let stroke = Stroke::dashed(Color::rgb(0x66, 0x7e, 0xea), 3.0, 5.0, 5.0);
            canvas.draw(
                Layer::Overlay,
                Shape::line(projection.ground(start), projection.ground(hover), stroke),
            );
        }
        if self.tool == Tool::Hazard {
            for p in self.hazard.iter().chain(self.hover.iter()) {
                self.draw_hazard_preview(*p, projection, canvas);
            }
        }
    }

    fn draw_hazard_preview(&self, p: Point2d, projection: &Projection, canvas: &mut impl Canvas) {
        let orange = Color::rgba(255, 165, 0, 0.8);
        let centre = projection.ground(p);
        let r = projection.pixels(self.config.hazard_radius);
        let flatten = match projection.mode() {
            ProjectionMode::Isometric => 0.5,
            ProjectionMode::Planar => 1.0,
        };
        canvas.draw(
            Layer::Overlay,
            Shape::Ellipse {
                centre,
                radii: [r, r * flatten],
                rotation: 0.0,
                fill: None,
                stroke: Some(Stroke::dashed(orange, 2.0, 5.0, 5.0)),
            },
        );
        canvas.draw(Layer::Overlay, Shape::circle(centre, 3.0, orange));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pt(x: f64, y: f64) -> Point2d {
        Point2d::new(x, y)
    }

    #[test]
    fn nearest_entrance_beats_wall_midpoint() {
        let mut env = Environment::new(50.0, 50.0);
        env.add_wall(pt(9.0, 9.0), pt(11.0, 11.0)).unwrap();
        env.add_entrance(pt(10.5, 10.5), 1.0, 2.0).unwrap();
        let removed = env.remove_nearest(pt(10.4, 10.4), 2.0).unwrap();
        assert!(matches!(removed, Some(Removed::Entrance(_))));
        assert_eq!(env.walls.len(), 1);
        assert!(env.entrances.is_empty());
    }

    #[test]
    fn ties_go_to_the_first_visited() {
        let mut env = Environment::new(50.0, 50.0);
        env.add_wall(pt(0.0, 5.0), pt(10.0, 5.0)).unwrap();
        env.add_exit(pt(5.0, 5.0), 1.5).unwrap();
        let removed = env.remove_nearest(pt(5.0, 6.0), 2.0).unwrap();
        assert!(matches!(removed, Some(Removed::Wall(_))));
    }

    #[test]
    fn nothing_within_range_is_kept() {
        let mut env = Environment::new(50.0, 50.0);
        env.add_exit(pt(5.0, 5.0), 1.5).unwrap();
        assert_eq!(env.remove_nearest(pt(7.0, 5.0), 2.0).unwrap(), None);
        assert_eq!(env.exits.len(), 1);
    }

    #[test]
    fn invalid_edits_are_refused() {
        let mut env = Environment::new(50.0, 50.0);
        assert_eq!(
            env.add_wall(pt(1.0, 1.0), pt(1.0, 1.0)),
            Err(EditError::DegenerateWall)
        );
        assert_eq!(
            env.add_wall(pt(f64::NAN, 1.0), pt(1.0, 1.0)),
            Err(EditError::NonFinite)
        );
        assert_eq!(
            env.add_entrance(pt(1.0, 1.0), 0.0, 1.0),
            Err(EditError::BadRadius(0.0))
        );
        assert_eq!(
            env.add_entrance(pt(1.0, 1.0), 1.0, -1.0),
            Err(EditError::NegativeFlow(-1.0))
        );
        assert!(env.walls.is_empty() && env.entrances.is_empty());
    }

    #[test]
    fn locked_environment_refuses_edits() {
        let mut env = Environment::new(50.0, 50.0);
        env.lock();
        assert_eq!(env.add_exit(pt(1.0, 1.0), 1.5), Err(EditError::Locked));
        assert_eq!(env.remove_nearest(pt(1.0, 1.0), 2.0), Err(EditError::Locked));
    }

    #[test]
    fn wall_tool_takes_two_clicks() {
        let mut env = Environment::new(50.0, 50.0);
        let mut editor = Editor::new(&EditConfig::default());
        assert_eq!(
            editor.click(&mut env, pt(1.0, 1.0)),
            Ok(EditOutcome::WallStarted)
        );
        assert!(env.walls.is_empty());
        assert_eq!(editor.click(&mut env, pt(4.0, 1.0)), Ok(EditOutcome::WallAdded));
        assert_eq!(env.walls.len(), 1);

        // A degenerate second click abandons the wall.
        editor.click(&mut env, pt(2.0, 2.0)).unwrap();
        assert_eq!(
            editor.click(&mut env, pt(2.0, 2.0)),
            Err(EditError::DegenerateWall)
        );
        assert_eq!(editor.click(&mut env, pt(3.0, 3.0)), Ok(EditOutcome::WallStarted));
    }

    #[test]
    fn placement_tools_use_configured_defaults() {
        let mut env = Environment::new(50.0, 50.0);
        let mut editor = Editor::new(&EditConfig::default());
        editor.set_tool(Tool::Exit);
        editor.click(&mut env, pt(3.0, 3.0)).unwrap();
        assert_eq!(env.exits[0].radius, 1.5);

        editor.set_tool(Tool::Entrance);
        editor.set_entrance_params(1.5, 1.0);
        editor.click(&mut env, pt(6.0, 3.0)).unwrap();
        assert_eq!(env.entrances[0].radius, 1.5);
        assert_eq!(env.entrances[0].flow_rate, 1.0);

        editor.set_tool(Tool::Clear);
        let outcome = editor.click(&mut env, pt(3.2, 3.1)).unwrap();
        assert!(matches!(outcome, EditOutcome::Removed(Removed::Exit(_))));
    }
}
