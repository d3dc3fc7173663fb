//! The local reconstruction of a running simulation and its per-frame
//! drawing.

use crate::config::SceneConfig;
use crate::congestion::{draw_alerts, is_jammed, scene_density, DensityGrid};
use crate::draw::Canvas;
use crate::environment::edit::{EditError, EditOutcome, Editor, Tool};
use crate::environment::{Decoration, Environment};
use crate::hazard::{self, HazardKind};
use crate::light::PhaseTable;
use crate::pedestrian::{self, Classifier};
use crate::playback::{PlaybackFile, Recorder};
use crate::projection::{Projection, ProjectionMode, ScreenPoint, Viewport};
use crate::protocol::{
    ErrorSource, EventRequest, Inbound, Outbound, ProtocolError, ScenarioMeta, SimulationStats,
    SimulationUpdate,
};
use crate::vehicle::Traffic;
use serde_json::Value;
use std::collections::VecDeque;

mod scenery;
mod terrain;

/// Whether a simulation run is in progress, as last reported by the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Stopped,
}

/// A user-facing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

/// Figures shown alongside the scene.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Hud {
    /// Simulation time of the latest snapshot, in s.
    pub time: f64,
    pub stats: SimulationStats,
    /// Pedestrians in the latest snapshot.
    pub pedestrians: usize,
    /// Pedestrians per square metre.
    pub density: f64,
    /// Whether the density warrants the jam warning.
    pub jammed: bool,
    pub connected: bool,
    /// Vehicles held at a red light in the last tick.
    pub held_vehicles: usize,
}

/// The local reconstruction of a running simulation.
///
/// Inbound messages are queued with [Scene::enqueue] and applied, in arrival
/// order, at the start of the next [Scene::tick]. A tick then advances the
/// vehicles and draws one complete frame; since it borrows the scene mutably,
/// a tick can never start while another is in progress.
pub struct Scene {
    config: SceneConfig,
    environment: Environment,
    phases: PhaseTable,
    traffic: Traffic,
    /// The latest snapshot received for the current environment.
    snapshot: Option<SimulationUpdate>,
    mode: ProjectionMode,
    viewport: Viewport,
    projection: Projection,
    inbox: VecDeque<Inbound>,
    hud: Hud,
    notices: Vec<Notice>,
    status: RunStatus,
    scenario: Option<ScenarioMeta>,
    editor: Editor,
    recorder: Option<Recorder>,
}

impl Scene {
    /// Creates a scene holding an empty, editable environment.
    pub fn new(config: SceneConfig, viewport: Viewport) -> Self {
        let environment = Environment::default();
        let mode = ProjectionMode::default();
        let projection = Projection::fit(
            mode,
            (environment.width, environment.height),
            viewport,
            &config.projection,
        );
        Self {
            editor: Editor::new(&config.editing),
            config,
            environment,
            phases: PhaseTable::new(),
            traffic: Traffic::new(),
            snapshot: None,
            mode,
            viewport,
            projection,
            inbox: VecDeque::new(),
            hud: Hud::default(),
            notices: vec![],
            status: RunStatus::Idle,
            scenario: None,
            recorder: None,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn phases(&self) -> &PhaseTable {
        &self.phases
    }

    pub fn traffic(&self) -> &Traffic {
        &self.traffic
    }

    pub fn snapshot(&self) -> Option<&SimulationUpdate> {
        self.snapshot.as_ref()
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn hud(&self) -> &Hud {
        &self.hud
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// The metadata of the last loaded scenario.
    pub fn scenario(&self) -> Option<&ScenarioMeta> {
        self.scenario.as_ref()
    }

    /// Takes the notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Queues a decoded message for the next tick.
    pub fn enqueue(&mut self, message: Inbound) {
        self.inbox.push_back(message);
    }

    /// Decodes and queues a raw message. A message that fails to decode is
    /// dropped and reported; the scene is left as it was.
    pub fn enqueue_raw(&mut self, event: &str, data: Value) -> Result<(), ProtocolError> {
        match Inbound::decode(event, data) {
            Ok(message) => {
                self.enqueue(message);
                Ok(())
            }
            Err(err) => {
                log::error!("rejected {} message: {}", event, err);
                self.notices.push(Notice::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Applies every queued message, then advances and draws one frame.
    ///
    /// `wall_secs` is the wall-clock time, which drives the animations.
    pub fn tick(&mut self, wall_secs: f64, canvas: &mut impl Canvas) {
        let applied = self.inbox.len();
        while let Some(message) = self.inbox.pop_front() {
            self.apply(message);
        }

        self.hud.held_vehicles =
            self.traffic
                .step(&self.environment, &self.phases, &self.config.vehicles);

        canvas.begin_frame();
        self.draw(wall_secs, canvas);
        log::debug!(
            "tick at {:.2}s: {} messages, {} pedestrians, {} vehicles ({} held)",
            wall_secs,
            applied,
            self.hud.pedestrians,
            self.traffic.len(),
            self.hud.held_vehicles
        );
    }

    fn apply(&mut self, message: Inbound) {
        match message {
            Inbound::Connected => {
                log::info!("connected to server");
                self.hud.connected = true;
            }
            Inbound::Disconnected => {
                log::warn!("disconnected from server; keeping the last environment");
                self.hud.connected = false;
            }
            Inbound::EnvironmentCreated(environment) => {
                self.replace_environment(environment);
                self.info("Environment created".to_string());
            }
            Inbound::ScenarioLoaded {
                environment,
                scenario,
            } => {
                self.replace_environment(environment);
                log::info!("loaded scenario {:?}", scenario.display_name());
                self.info(format!("Loaded scenario: {}", scenario.display_name()));
                self.scenario = Some(scenario);
            }
            Inbound::SimulationUpdate(update) => self.apply_update(update),
            Inbound::SimulationStarted => {
                log::info!("simulation started");
                self.status = RunStatus::Running;
                self.info("Simulation started".to_string());
            }
            Inbound::SimulationStopped { reason, stats } => {
                log::info!("simulation stopped: {}", reason);
                self.status = RunStatus::Stopped;
                let text = match stats {
                    Some(stats) => format!(
                        "Simulation stopped: {}. Total spawned: {}, exited: {}",
                        reason, stats.spawned, stats.exited
                    ),
                    None => format!("Simulation stopped: {}", reason),
                };
                self.info(text);
            }
            Inbound::SimulationReset => {
                log::info!("simulation reset");
                self.status = RunStatus::Idle;
                self.reset_run();
                self.info("Simulation reset".to_string());
            }
            Inbound::EventAdded { kind, trigger_time } => {
                log::info!("event {} scheduled at t={:.1}", kind, trigger_time);
                self.info(format!(
                    "Event \"{}\" scheduled for {:.1}s",
                    kind, trigger_time
                ));
            }
            Inbound::ExportComplete { filepath } => {
                log::info!("export written to {}", filepath);
                self.info(format!("Export saved to {}", filepath));
            }
            Inbound::ServerError { source, message } => {
                log::error!("server reported {:?} error: {}", source, message);
                if source == ErrorSource::Simulation {
                    self.status = RunStatus::Stopped;
                }
                let what = match source {
                    ErrorSource::Simulation => "Simulation",
                    ErrorSource::Scenario => "Scenario",
                    ErrorSource::Event => "Event",
                    ErrorSource::Export => "Export",
                };
                self.notices
                    .push(Notice::Error(format!("{} error: {}", what, message)));
            }
        }
    }

    fn info(&mut self, text: String) {
        self.notices.push(Notice::Info(text));
    }

    /// Replaces the environment and everything derived from it.
    fn replace_environment(&mut self, environment: Environment) {
        log::info!(
            "new environment {}x{} m: {} walls, {} entrances, {} exits, {} lights, {} vehicles",
            environment.width,
            environment.height,
            environment.walls.len(),
            environment.entrances.len(),
            environment.exits.len(),
            environment.traffic_lights.len(),
            environment.vehicles.len()
        );
        self.environment = environment;
        self.reset_run();
        self.refit();
        if self.recorder.is_some() {
            self.recorder = Some(Recorder::new(&self.environment));
        }
    }

    /// Forgets the run on the current environment.
    fn reset_run(&mut self) {
        self.phases.seed(&self.environment.traffic_lights);
        self.traffic.reset(&self.environment);
        self.snapshot = None;
        self.hud = Hud {
            connected: self.hud.connected,
            ..Hud::default()
        };
    }

    fn apply_update(&mut self, update: SimulationUpdate) {
        self.phases.update(
            update.time,
            &self.environment.traffic_lights,
            &self.config.phase,
        );

        let extents = (self.environment.width, self.environment.height);
        let density = scene_density(update.pedestrians.len(), extents);
        let jammed = is_jammed(density, &self.config.congestion);
        if jammed && !self.hud.jammed {
            log::warn!("pedestrian density {:.4}/m² exceeds the jam threshold", density);
        }
        self.hud = Hud {
            time: update.time,
            stats: update.stats,
            pedestrians: update.pedestrians.len(),
            density,
            jammed,
            ..self.hud.clone()
        };

        if let Some(recorder) = &mut self.recorder {
            let classifier =
                Classifier::new(&self.environment, &self.phases, &self.config.classifier);
            let classes = classifier.classify_all(&update.pedestrians);
            recorder.record(update.time, &update.pedestrians, &classes);
        }
        self.snapshot = Some(update);
    }

    /// Draws the frame back to front.
    fn draw(&self, wall_secs: f64, canvas: &mut impl Canvas) {
        let env = &self.environment;
        let proj = &self.projection;

        terrain::draw_background(env, proj, canvas);
        for road in &env.roads {
            terrain::draw_road(road, proj, canvas);
        }
        for decoration in env.decorations.iter().filter(|d| !d.is_building()) {
            scenery::draw_decoration(decoration, proj, canvas);
        }
        for wall in &env.walls {
            terrain::draw_wall(wall, proj, canvas);
        }
        for lane in &env.car_lanes {
            terrain::draw_car_lane(lane, proj, canvas);
        }
        for lane in &env.pedestrian_lanes {
            terrain::draw_pedestrian_lane(lane, proj, canvas);
        }
        for crossing in &env.crossing_lanes {
            terrain::draw_crossing(crossing, proj, canvas);
        }
        for entrance in &env.entrances {
            terrain::draw_entrance(entrance, proj, canvas);
        }
        for exit in &env.exits {
            terrain::draw_exit(exit, proj, canvas);
        }
        self.traffic.draw(proj, canvas);

        if let Some(snapshot) = &self.snapshot {
            for hazard in &snapshot.hazards {
                hazard::draw(hazard, wall_secs, proj, canvas);
            }
            let classifier = Classifier::new(env, &self.phases, &self.config.classifier);
            for (ped, class) in snapshot
                .pedestrians
                .iter()
                .zip(classifier.classify_all(&snapshot.pedestrians))
            {
                pedestrian::draw(ped, &class, proj, canvas);
            }
            let grid = DensityGrid::build(
                (env.width, env.height),
                &snapshot.pedestrians,
                &self.config.congestion,
            );
            draw_alerts(&grid, &self.config.congestion, wall_secs, proj, canvas);
        }

        for decoration in &env.decorations {
            if let Decoration::Building {
                position,
                width,
                height,
            } = *decoration
            {
                scenery::draw_building(position, width, height, proj, canvas);
            }
        }
        for light in &env.traffic_lights {
            scenery::draw_traffic_light(light, self.phases.state(&light.id), proj, canvas);
        }

        self.editor.draw(proj, canvas);
    }

    /// Resizes the drawing surface and refits the scale.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.refit();
    }

    pub fn mode(&self) -> ProjectionMode {
        self.mode
    }

    /// Switches between isometric and planar projection, refitting the scale.
    pub fn set_mode(&mut self, mode: ProjectionMode) {
        self.mode = mode;
        self.refit();
    }

    pub fn toggle_mode(&mut self) {
        self.set_mode(match self.mode {
            ProjectionMode::Isometric => ProjectionMode::Planar,
            ProjectionMode::Planar => ProjectionMode::Isometric,
        });
    }

    fn refit(&mut self) {
        self.projection = Projection::fit(
            self.mode,
            (self.environment.width, self.environment.height),
            self.viewport,
            &self.config.projection,
        );
        log::debug!(
            "projection refit: {:?} at {:.3} px/m",
            self.mode,
            self.projection.scale()
        );
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn select_tool(&mut self, tool: Tool) {
        self.editor.set_tool(tool);
    }

    /// Sets the radius and flow rate of entrances placed from now on.
    pub fn set_entrance_params(&mut self, radius: f64, flow_rate: f64) {
        self.editor.set_entrance_params(radius, flow_rate);
    }

    pub fn set_hazard_radius(&mut self, radius: f64) {
        self.editor.set_hazard_radius(radius);
    }

    /// Tracks the pointer for the editor previews.
    pub fn pointer_moved(&mut self, screen: ScreenPoint) {
        self.editor.hover(self.projection.unproject(screen));
    }

    /// Applies a click with the current tool at a screen position.
    pub fn click(&mut self, screen: ScreenPoint) -> Result<EditOutcome, EditError> {
        let p = self.projection.unproject(screen);
        let outcome = self.editor.click(&mut self.environment, p);
        match &outcome {
            Ok(outcome) => log::debug!("edit at ({:.1}, {:.1}): {:?}", p.x, p.y, outcome),
            Err(err) => log::warn!("edit at ({:.1}, {:.1}) refused: {}", p.x, p.y, err),
        }
        outcome
    }

    /// Hands the edited environment to the server. The environment is locked
    /// against further edits until a new one arrives.
    pub fn submit(&mut self) -> Result<Outbound, EditError> {
        self.environment.check_editable()?;
        self.environment.lock();
        log::info!("submitting environment");
        Ok(Outbound::CreateEnvironment(self.environment.clone()))
    }

    /// Builds the request for a hazard at the position chosen with the hazard
    /// tool. Returns `None` until a position has been chosen.
    pub fn hazard_request(&self, kind: HazardKind, trigger_time: Option<f64>) -> Option<Outbound> {
        let position = self.editor.hazard_position()?;
        let radius = self.editor.hazard_radius();
        let event = match kind {
            HazardKind::Fire => EventRequest::Fire { position, radius },
            HazardKind::Shooting | HazardKind::Other => EventRequest::Shooting { position, radius },
        };
        Some(Outbound::AddEvent {
            event,
            trigger_time,
        })
    }

    /// Starts recording snapshots for the playback file.
    pub fn start_recording(&mut self) {
        self.recorder = Some(Recorder::new(&self.environment));
    }

    /// Stops recording and returns what was recorded.
    pub fn finish_recording(&mut self) -> Option<PlaybackFile> {
        self.recorder.take().map(Recorder::finish)
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::draw::{DisplayList, Layer};
    use crate::light::LightState;
    use crate::math::Point2d;
    use serde_json::json;

    fn scene() -> Scene {
        Scene::new(SceneConfig::default(), Viewport::new(1200.0, 800.0))
    }

    fn crossroads() -> Value {
        json!({
            "status": "success",
            "environment": {
                "width": 80, "height": 80,
                "walls": [[[0, 0], [80, 0]]],
                "entrances": [{"position": [2, 40]}],
                "exits": [{"position": [78, 40]}],
                "trafficLights": [
                    {"id": "tl_west", "position": [34, 40], "controls": "east-west"},
                    {"id": "tl_north", "position": [40, 34], "controls": "north-south"}
                ],
                "carLanes": [{"laneId": 1, "points": [[0, 38], [80, 38]], "direction": "east"}],
                "vehicles": [{"position": [10, 38], "velocity": [1, 0], "laneId": 1}],
                "decorations": [
                    {"type": "tree", "position": [5, 5]},
                    {"type": "building", "position": [70, 70]}
                ]
            }
        })
    }

    fn update(time: f64, pedestrians: Value) -> Value {
        json!({ "time": time, "pedestrians": pedestrians, "stats": {"active": 1} })
    }

    #[test]
    fn messages_apply_on_the_next_tick() {
        let mut scene = scene();
        scene.enqueue_raw("environment_created", crossroads()).unwrap();
        assert!(scene.environment().walls.is_empty());

        let mut list = DisplayList::new();
        scene.tick(0.0, &mut list);
        assert_eq!(scene.environment().walls.len(), 1);
        assert_eq!(scene.traffic().len(), 1);
        assert_eq!(scene.phases().len(), 2);
        assert_eq!(
            scene.take_notices(),
            vec![Notice::Info("Environment created".into())]
        );
    }

    #[test]
    fn rejected_message_keeps_the_environment() {
        let mut scene = scene();
        scene.enqueue_raw("environment_created", crossroads()).unwrap();
        scene.tick(0.0, &mut DisplayList::new());
        scene.take_notices();

        let bad = json!({"status": "success", "environment": {"width": "wide"}});
        assert!(scene.enqueue_raw("environment_created", bad).is_err());
        assert!(scene.enqueue_raw("teleport", json!({})).is_err());
        scene.tick(0.1, &mut DisplayList::new());
        assert_eq!(scene.environment().width, 80.0);
        let notices = scene.take_notices();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| matches!(n, Notice::Error(_))));
    }

    #[test]
    fn vehicles_wait_at_red_then_go() {
        let mut scene = scene();
        scene.enqueue_raw("environment_created", crossroads()).unwrap();
        // East-west is red between 15 s and 30 s.
        scene
            .enqueue_raw("simulation_update", update(20.0, json!([])))
            .unwrap();
        let mut list = DisplayList::new();
        scene.tick(0.0, &mut list);
        assert_eq!(scene.phases().state("tl_west"), LightState::Red);
        assert_eq!(scene.hud().held_vehicles, 1);
        let (_, car) = scene.traffic().iter().next().unwrap();
        assert_eq!(car.position, Point2d::new(10.0, 38.0));

        scene
            .enqueue_raw("simulation_update", update(31.0, json!([])))
            .unwrap();
        scene.tick(0.1, &mut list);
        assert_eq!(scene.hud().held_vehicles, 0);
        let (_, car) = scene.traffic().iter().next().unwrap();
        assert!(car.position.x > 10.0);
    }

    #[test]
    fn frame_is_drawn_in_layer_order() {
        let mut scene = scene();
        scene.enqueue_raw("environment_created", crossroads()).unwrap();
        let peds = json!([{"id": 1, "position": [20, 20], "velocity": [0.5, 0]}]);
        let mut data = update(3.0, peds);
        data["environment"] = json!({
            "hazards": [{"type": "fire", "position": [60, 60], "radius": 4}]
        });
        scene.enqueue_raw("simulation_update", data).unwrap();
        let mut list = DisplayList::new();
        scene.tick(1.0, &mut list);

        let order = list.layer_order();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
        for layer in [
            Layer::Background,
            Layer::GroundGrid,
            Layer::Decorations,
            Layer::Walls,
            Layer::CarLanes,
            Layer::Entrances,
            Layer::Exits,
            Layer::Vehicles,
            Layer::Hazards,
            Layer::Pedestrians,
            Layer::Buildings,
            Layer::TrafficLights,
        ] {
            assert!(order.contains(&layer), "missing {:?}", layer);
        }
    }

    #[test]
    fn disconnect_freezes_phases() {
        let mut scene = scene();
        scene.enqueue(Inbound::Connected);
        scene.enqueue_raw("environment_created", crossroads()).unwrap();
        scene
            .enqueue_raw("simulation_update", update(16.0, json!([])))
            .unwrap();
        scene.enqueue(Inbound::Disconnected);
        scene.tick(0.0, &mut DisplayList::new());
        assert!(!scene.hud().connected);
        assert_eq!(scene.environment().traffic_lights.len(), 2);
        assert_eq!(scene.phases().state("tl_north"), LightState::Green);
        assert_eq!(scene.phases().time(), Some(16.0));
    }

    #[test]
    fn jam_warning_follows_density() {
        let mut scene = scene();
        scene.enqueue_raw("environment_created", crossroads()).unwrap();
        // 0.015/m² over 6400 m² is 96 pedestrians.
        let crowd: Vec<_> = (0..97)
            .map(|i| json!({"id": i, "position": [i as f64 * 0.5, 50]}))
            .collect();
        scene
            .enqueue_raw("simulation_update", update(1.0, json!(crowd)))
            .unwrap();
        scene.tick(0.0, &mut DisplayList::new());
        assert!(scene.hud().jammed);
        assert_eq!(scene.hud().pedestrians, 97);
    }

    #[test]
    fn submitted_environment_is_locked() {
        let mut scene = scene();
        scene.select_tool(Tool::Exit);
        let centre = scene.projection().ground(Point2d::new(25.0, 25.0));
        assert_eq!(scene.click(centre).unwrap(), EditOutcome::ExitAdded);

        match scene.submit().unwrap() {
            Outbound::CreateEnvironment(env) => assert_eq!(env.exits.len(), 1),
            other => panic!("unexpected request {:?}", other),
        }
        assert_eq!(scene.click(centre), Err(EditError::Locked));
        assert_eq!(scene.submit(), Err(EditError::Locked));

        scene.enqueue_raw("environment_created", crossroads()).unwrap();
        scene.tick(0.0, &mut DisplayList::new());
        assert_eq!(scene.click(centre).unwrap(), EditOutcome::ExitAdded);
    }

    #[test]
    fn hazard_request_uses_the_chosen_spot() {
        let mut scene = scene();
        assert_eq!(scene.hazard_request(HazardKind::Fire, None), None);
        scene.select_tool(Tool::Hazard);
        scene.set_hazard_radius(6.0);
        let spot = scene.projection().ground(Point2d::new(10.0, 20.0));
        scene.click(spot).unwrap();
        match scene.hazard_request(HazardKind::Fire, Some(5.0)) {
            Some(Outbound::AddEvent {
                event: EventRequest::Fire { position, radius },
                trigger_time: Some(t),
            }) => {
                assert!((position.x - 10.0).abs() < 1e-9 && (position.y - 20.0).abs() < 1e-9);
                assert_eq!((radius, t), (6.0, 5.0));
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn recording_follows_updates() {
        let mut scene = scene();
        scene.enqueue_raw("environment_created", crossroads()).unwrap();
        scene.tick(0.0, &mut DisplayList::new());
        scene.start_recording();
        for t in [0.1, 0.2, 0.3] {
            let peds = json!([{"id": 7, "position": [20, 20]}]);
            scene.enqueue_raw("simulation_update", update(t, peds)).unwrap();
        }
        scene.tick(0.5, &mut DisplayList::new());
        let file = scene.finish_recording().unwrap();
        assert_eq!(file.frames.len(), 3);
        assert_eq!(file.obstacles.len(), 1);
        assert!(!scene.is_recording());
    }

    #[test]
    fn mode_toggle_refits() {
        let mut scene = scene();
        let iso = scene.projection().scale();
        scene.toggle_mode();
        assert_eq!(scene.mode(), ProjectionMode::Planar);
        assert!(scene.projection().scale() > iso);
        scene.set_viewport(Viewport::new(600.0, 400.0));
        assert_eq!(scene.projection().viewport(), Viewport::new(600.0, 400.0));
    }
}
