//! Tests that drive a scene through a loaded scenario.

use assert_approx_eq::assert_approx_eq;
use ped_scene::draw::{DisplayList, Layer};
use ped_scene::{
    Classifier, LightState, Notice, PlaybackState, Scene, SceneConfig, Viewport, VisualState,
};
use serde_json::{json, Value};

fn campus() -> Value {
    json!({
        "status": "success",
        "scenario": {
            "name": "캠퍼스",
            "name_en": "Campus",
            "description": "Two buildings and a crossing",
            "recommended_pedestrians": 150
        },
        "environment": {
            "width": 80,
            "height": 80,
            "walls": [
                [[0, 0], [80, 0]],
                {"start": [0, 80], "end": [80, 80]},
                [[0, 0], [0, 80]]
            ],
            "entrances": [{"position": [5, 40], "radius": 1.5, "flow_rate": 1.0}],
            "exits": [{"position": [75, 40]}],
            "trafficLights": [
                {"id": "tl_north", "position": [40, 34], "controls": "north-south", "orientation": "vertical"},
                {"id": "tl_west", "position": [34, 40], "controls": "east-west", "orientation": "horizontal"}
            ],
            "crossingLanes": [
                {"start": [30, 40], "end": [50, 40], "width": 4, "trafficLightId": "tl_west"}
            ],
            "roads": [{"points": [[0, 38], [80, 38]], "width": 8}],
            "carLanes": [{"laneId": 0, "points": [[0, 37], [80, 37]], "direction": "east"}],
            "pedestrianLanes": [{"points": [[0, 45], [80, 45]]}],
            "vehicles": [{"position": [20, 37], "velocity": [1, 0], "laneId": 0, "type": "car"}],
            "decorations": [
                {"type": "tree", "position": [10, 10]},
                {"type": "pond", "position": [60, 15], "radius": 4},
                {"type": "building", "position": [65, 65], "width": 10, "height": 8},
                {"type": "fountain", "position": [20, 60]}
            ]
        }
    })
}

fn scene_with_campus() -> Scene {
    let mut scene = Scene::new(SceneConfig::default(), Viewport::new(1200.0, 800.0));
    scene.enqueue_raw("scenario_loaded", campus()).unwrap();
    scene
}

/// Loading a scenario replaces the environment and seeds one phase per light.
#[test]
fn scenario_load_end_to_end() {
    let mut scene = scene_with_campus();
    scene
        .enqueue_raw("simulation_update", json!({"time": 0.0, "pedestrians": []}))
        .unwrap();
    scene.tick(0.0, &mut DisplayList::new());

    let env = scene.environment();
    assert_eq!(env.walls.len(), 3);
    assert_eq!(env.entrances.len(), 1);
    assert_eq!(env.entrances[0].radius, 1.5);
    assert_eq!(env.entrances[0].flow_rate, 1.0);
    assert_eq!(env.exits.len(), 1);
    assert_eq!(env.exits[0].radius, 1.5);
    assert_eq!(env.traffic_lights.len(), 2);

    assert_eq!(scene.phases().len(), 2);
    assert_eq!(scene.phases().state("tl_north"), LightState::Red);
    assert_eq!(scene.phases().state("tl_west"), LightState::Green);
    assert_eq!(scene.scenario().unwrap().display_name(), "Campus");
    assert!(scene
        .take_notices()
        .contains(&Notice::Info("Loaded scenario: Campus".into())));
}

/// Every frame paints its layers back to front, with traffic lights on top.
#[test]
fn frame_layers_are_ordered() {
    let mut scene = scene_with_campus();
    scene
        .enqueue_raw(
            "simulation_update",
            json!({
                "time": 2.0,
                "pedestrians": [
                    {"id": 1, "position": [12, 20], "velocity": [1.2, 0.0], "panic_level": 0.1},
                    {"id": 2, "position": [40, 40], "velocity": [0.5, 0.0]}
                ],
                "environment": {"hazards": [
                    {"type": "shooting", "position": [50, 60], "radius": 6}
                ]}
            }),
        )
        .unwrap();
    let mut list = DisplayList::new();
    scene.tick(0.25, &mut list);

    let order = list.layer_order();
    assert_eq!(order.first(), Some(&Layer::Background));
    assert_eq!(order.last(), Some(&Layer::TrafficLights));
    assert!(order.windows(2).all(|w| w[0] < w[1]), "{:?}", order);
    assert!(order.contains(&Layer::Crossings));
    assert!(order.contains(&Layer::Roads));
    assert!(order.contains(&Layer::PedestrianLanes));
    assert!(list.contains_text("⚠️"));
    assert!(list.contains_text("1.0/s"));
}

/// The scene classifies against the light phases of the latest snapshot.
#[test]
fn pedestrians_wait_while_their_crossing_is_red() {
    let mut scene = scene_with_campus();
    let classify = |scene: &Scene| {
        let snapshot = scene.snapshot().unwrap();
        Classifier::new(scene.environment(), scene.phases(), &scene.config().classifier)
            .classify_all(&snapshot.pedestrians)[0]
            .state
    };
    // East-west turns red 15 s into the cycle.
    scene
        .enqueue_raw(
            "simulation_update",
            json!({
                "time": 16.0,
                "pedestrians": [{"id": 3, "position": [40, 41], "velocity": [0.3, 0.0]}]
            }),
        )
        .unwrap();
    scene.start_recording();
    scene.tick(0.0, &mut DisplayList::new());
    assert_eq!(classify(&scene), VisualState::WaitingAtLight);

    scene
        .enqueue_raw(
            "simulation_update",
            json!({
                "time": 31.0,
                "pedestrians": [
                    {"id": 3, "position": [40, 41], "velocity": [0.3, 0.0], "panic_level": 0.8}
                ]
            }),
        )
        .unwrap();
    scene.tick(0.1, &mut DisplayList::new());
    assert_eq!(classify(&scene), VisualState::PanickedHigh);

    let file = scene.finish_recording().unwrap();
    let states: Vec<_> = file
        .frames
        .iter()
        .map(|frame| frame.pedestrians[0].state)
        .collect();
    assert_eq!(states, vec![PlaybackState::Normal, PlaybackState::Panic]);
    assert_approx_eq!(file.metadata.dt, 15.0);
    assert_eq!(file.exits[0].width, 3.0);
}

/// A reset forgets the run but keeps the environment.
#[test]
fn reset_clears_the_run() {
    let mut scene = scene_with_campus();
    scene.enqueue_raw("simulation_started", json!({})).unwrap();
    scene
        .enqueue_raw(
            "simulation_update",
            json!({
                "time": 5.0,
                "pedestrians": [{"id": 1, "position": [10, 10]}],
                "stats": {"active": 1, "spawned": 4, "exited": 3, "total_panic": 0.4}
            }),
        )
        .unwrap();
    scene.tick(0.0, &mut DisplayList::new());
    assert_eq!(scene.hud().stats.spawned, 4);
    assert_approx_eq!(scene.hud().stats.average_panic(), 0.4);

    scene.enqueue_raw("simulation_reset", json!({})).unwrap();
    scene.tick(0.1, &mut DisplayList::new());
    assert!(scene.snapshot().is_none());
    assert_eq!(scene.hud().stats.spawned, 0);
    assert_eq!(scene.environment().walls.len(), 3);
    assert_eq!(scene.status(), ped_scene::RunStatus::Idle);
}

/// A server-side failure is surfaced without touching the scene.
#[test]
fn failed_scenario_load_is_reported() {
    let mut scene = scene_with_campus();
    scene.tick(0.0, &mut DisplayList::new());
    scene.take_notices();

    let failure = json!({"status": "error", "message": "no such scenario"});
    assert!(scene.enqueue_raw("scenario_loaded", failure).is_err());
    scene
        .enqueue_raw("scenario_error", json!({"message": "boom"}))
        .unwrap();
    scene.tick(0.1, &mut DisplayList::new());

    assert_eq!(scene.environment().walls.len(), 3);
    let notices = scene.take_notices();
    assert_eq!(notices.len(), 2);
    assert_eq!(notices[1], Notice::Error("Scenario error: boom".into()));
}
