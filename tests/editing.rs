//! Tests for building an environment with pointer clicks.

use assert_approx_eq::assert_approx_eq;
use ped_scene::cgmath::Point2;
use ped_scene::environment::edit::Removed;
use ped_scene::{
    DisplayList, EditError, EditOutcome, Environment, HazardKind, Layer, Outbound, ProjectionMode,
    Scene, SceneConfig, Tool, Viewport,
};
use serde_json::json;

fn scene() -> Scene {
    Scene::new(SceneConfig::default(), Viewport::new(1000.0, 700.0))
}

/// Clicks at the screen position of a ground point.
fn click_at(scene: &mut Scene, x: f64, y: f64) -> Result<EditOutcome, EditError> {
    let screen = scene.projection().ground(Point2::new(x, y));
    scene.click(screen)
}

#[test]
fn nearest_entrance_beats_wall_midpoint() {
    let mut env = Environment::new(20.0, 20.0);
    env.add_wall(Point2::new(9.0, 10.0), Point2::new(11.0, 10.0))
        .unwrap();
    env.add_entrance(Point2::new(10.5, 10.5), 1.0, 2.0).unwrap();

    let removed = env.remove_nearest(Point2::new(10.4, 10.4), 2.0).unwrap();
    assert!(matches!(removed, Some(Removed::Entrance(_))));
    assert_eq!(env.walls.len(), 1);
    assert!(env.entrances.is_empty());
}

#[test]
fn walls_take_two_clicks_in_either_projection() {
    for mode in [ProjectionMode::Isometric, ProjectionMode::Planar] {
        let mut scene = scene();
        scene.set_mode(mode);
        scene.select_tool(Tool::Wall);

        assert_eq!(click_at(&mut scene, 5.0, 5.0), Ok(EditOutcome::WallStarted));
        assert!(scene.environment().walls.is_empty());
        assert_eq!(click_at(&mut scene, 25.0, 5.0), Ok(EditOutcome::WallAdded));

        let wall = scene.environment().walls[0];
        assert_approx_eq!(wall.start.x, 5.0, 1e-6);
        assert_approx_eq!(wall.start.y, 5.0, 1e-6);
        assert_approx_eq!(wall.end.x, 25.0, 1e-6);
        assert_approx_eq!(wall.end.y, 5.0, 1e-6);
    }
}

#[test]
fn rubber_band_follows_the_pointer() {
    let mut scene = scene();
    scene.select_tool(Tool::Wall);
    click_at(&mut scene, 5.0, 5.0).unwrap();
    let pointer = scene.projection().ground(Point2::new(15.0, 20.0));
    scene.pointer_moved(pointer);

    let mut list = DisplayList::new();
    scene.tick(0.0, &mut list);
    assert_eq!(list.layer(Layer::Overlay).count(), 1);
    assert_eq!(list.layer_order().last(), Some(&Layer::Overlay));

    // Switching tools abandons the half-placed wall.
    scene.select_tool(Tool::Exit);
    scene.tick(0.1, &mut list);
    assert_eq!(list.layer(Layer::Overlay).count(), 0);
}

#[test]
fn placement_and_clearing() {
    let mut scene = scene();
    scene.set_entrance_params(2.5, 0.5);
    scene.select_tool(Tool::Entrance);
    assert_eq!(click_at(&mut scene, 10.0, 10.0), Ok(EditOutcome::EntranceAdded));
    scene.select_tool(Tool::Exit);
    assert_eq!(click_at(&mut scene, 40.0, 40.0), Ok(EditOutcome::ExitAdded));

    let env = scene.environment();
    assert_eq!(env.entrances[0].radius, 2.5);
    assert_eq!(env.entrances[0].flow_rate, 0.5);
    assert_eq!(env.exits[0].radius, 1.5);

    scene.select_tool(Tool::Clear);
    assert_eq!(click_at(&mut scene, 25.0, 25.0), Ok(EditOutcome::NothingRemoved));
    assert!(matches!(
        click_at(&mut scene, 39.0, 40.5),
        Ok(EditOutcome::Removed(Removed::Exit(_)))
    ));
    assert!(scene.environment().exits.is_empty());
    assert_eq!(scene.environment().entrances.len(), 1);
}

#[test]
fn submitted_environment_is_locked_until_replaced() {
    let mut scene = scene();
    scene.select_tool(Tool::Exit);
    click_at(&mut scene, 40.0, 40.0).unwrap();

    let request = scene.submit().unwrap();
    let (name, data) = request.encode().unwrap();
    assert_eq!(name, "create_environment");
    assert_eq!(data["exits"][0]["radius"], json!(1.5));
    assert!(scene.environment().is_locked());

    assert_eq!(click_at(&mut scene, 10.0, 10.0), Err(EditError::Locked));
    scene.select_tool(Tool::Clear);
    assert_eq!(click_at(&mut scene, 40.0, 40.0), Err(EditError::Locked));
    assert_eq!(scene.submit(), Err(EditError::Locked));
    assert_eq!(scene.environment().exits.len(), 1);

    scene
        .enqueue_raw(
            "environment_created",
            json!({"status": "success", "environment": data}),
        )
        .unwrap();
    scene.tick(0.0, &mut DisplayList::new());
    assert!(!scene.environment().is_locked());
    assert!(matches!(
        click_at(&mut scene, 40.0, 40.0),
        Ok(EditOutcome::Removed(Removed::Exit(_)))
    ));
}

#[test]
fn hazard_tool_builds_event_requests() {
    let mut scene = scene();
    assert!(scene.hazard_request(HazardKind::Fire, None).is_none());

    scene.select_tool(Tool::Hazard);
    scene.set_hazard_radius(6.0);
    click_at(&mut scene, 20.0, 30.0).unwrap();

    let request = scene
        .hazard_request(HazardKind::Shooting, Some(12.0))
        .unwrap();
    assert!(matches!(request, Outbound::AddEvent { .. }));
    let (_, data) = request.encode().unwrap();
    assert_eq!(data["type"], "shooting");
    assert_eq!(data["radius"], json!(6.0));
    assert_eq!(data["trigger_time"], json!(12.0));
    assert_approx_eq!(data["position"][0].as_f64().unwrap(), 20.0, 1e-6);
    assert_approx_eq!(data["position"][1].as_f64().unwrap(), 30.0, 1e-6);
}
