//! Ground-level geometry: background, roads, lanes, crossings, walls and
//! the entrance and exit zones.

use crate::draw::{Canvas, Color, Fill, Layer, Shape, Stroke};
use crate::environment::{Crossing, Entrance, Environment, Exit, Lane, Road, Wall};
use crate::math::{segment_normal, Point2d, Vector2d};
use crate::projection::{Projection, ProjectionMode, ScreenPoint};
use cgmath::prelude::*;
use itertools::Itertools;
use std::f64::consts::PI;

const SKY: Color = Color::rgb(0x87, 0xce, 0xeb);
const GRASS: Color = Color::rgb(0xa8, 0xd5, 0xa3);

/// Spacing of the isometric ground grid, in m.
const GRID_SPACING: f64 = 5.0;

const ROAD_WIDTH: f64 = 4.0;
const ROAD_COLOR: Color = Color::rgb(0x66, 0x66, 0x66);
const CAR_LANE_WIDTH: f64 = 3.5;
const PEDESTRIAN_LANE_WIDTH: f64 = 2.5;
const PEDESTRIAN_LANE_COLOR: Color = Color::rgb(0xcc, 0xcc, 0xcc);
const CROSSING_WIDTH: f64 = 4.0;
const CROSSING_STRIPES: usize = 8;

/// Wall height, in m.
const WALL_HEIGHT: f64 = 2.0;
/// Spacing of the brick joints drawn on a wall face, in m.
const BRICK_SPACING: f64 = 2.0;

/// Clears the frame and, in isometric mode, draws the ground grid.
pub fn draw_background(env: &Environment, projection: &Projection, canvas: &mut impl Canvas) {
    match projection.mode() {
        ProjectionMode::Planar => {
            canvas.draw(Layer::Background, Shape::Clear { color: GRASS });
        }
        ProjectionMode::Isometric => {
            canvas.draw(Layer::Background, Shape::Clear { color: SKY });
            let stroke = Stroke::solid(Color::rgba(255, 255, 255, 0.15), 1.0);
            let steps = |len: f64| {
                (0..)
                    .map(|i| i as f64 * GRID_SPACING)
                    .take_while(move |v| *v <= len)
            };
            for x in steps(env.width) {
                canvas.draw(
                    Layer::GroundGrid,
                    Shape::line(
                        projection.ground(Point2d::new(x, 0.0)),
                        projection.ground(Point2d::new(x, env.height)),
                        stroke.clone(),
                    ),
                );
            }
            for y in steps(env.height) {
                canvas.draw(
                    Layer::GroundGrid,
                    Shape::line(
                        projection.ground(Point2d::new(0.0, y)),
                        projection.ground(Point2d::new(env.width, y)),
                        stroke.clone(),
                    ),
                );
            }
        }
    }
}

/// One segment of a polyline widened on screen.
struct Band {
    start: ScreenPoint,
    end: ScreenPoint,
    quad: [ScreenPoint; 4],
}

/// Widens each segment of a ground polyline to `width` metres. The widening is
/// perpendicular on screen; zero-length segments are skipped.
fn bands<'a>(
    points: &'a [Point2d],
    width: f64,
    projection: &'a Projection,
) -> impl Iterator<Item = Band> + 'a {
    let half = projection.pixels(width) / 2.0;
    points.iter().tuple_windows().filter_map(move |(a, b)| {
        let (start, end) = (projection.ground(*a), projection.ground(*b));
        let offset = segment_normal(start, end)? * half;
        Some(Band {
            start,
            end,
            quad: [start + offset, end + offset, end - offset, start - offset],
        })
    })
}

pub fn draw_road(road: &Road, projection: &Projection, canvas: &mut impl Canvas) {
    let color = road.color.unwrap_or(ROAD_COLOR);
    let edge = Stroke::solid(Color::rgb(0x55, 0x55, 0x55), 2.0);
    for band in bands(&road.points, road.width.unwrap_or(ROAD_WIDTH), projection) {
        canvas.draw(
            Layer::Roads,
            Shape::polygon(band.quad, color, Some(edge.clone())),
        );
    }
}

pub fn draw_car_lane(lane: &Lane, projection: &Projection, canvas: &mut impl Canvas) {
    let marking = Stroke::dashed(Color::WHITE, 2.0, 10.0, 10.0);
    for band in bands(&lane.points, lane.width.unwrap_or(CAR_LANE_WIDTH), projection) {
        canvas.draw(
            Layer::CarLanes,
            Shape::polygon(band.quad, Color::rgb(0x44, 0x44, 0x44), None),
        );
        canvas.draw(
            Layer::CarLanes,
            Shape::line(band.start, band.end, marking.clone()),
        );
    }
}

pub fn draw_pedestrian_lane(lane: &Lane, projection: &Projection, canvas: &mut impl Canvas) {
    let color = lane.color.unwrap_or(PEDESTRIAN_LANE_COLOR);
    let border = Stroke::solid(Color::rgb(0x99, 0x99, 0x99), 2.0);
    let width = lane.width.unwrap_or(PEDESTRIAN_LANE_WIDTH);
    for band in bands(&lane.points, width, projection) {
        canvas.draw(
            Layer::PedestrianLanes,
            Shape::polygon(band.quad, color, Some(border.clone())),
        );
    }
}

/// Draws a zebra crossing as stripes slightly raised above the road.
pub fn draw_crossing(crossing: &Crossing, projection: &Projection, canvas: &mut impl Canvas) {
    let half_width = crossing.width.unwrap_or(CROSSING_WIDTH) / 2.0;
    let normal = match segment_normal(crossing.start, crossing.end) {
        Some(normal) => normal * half_width,
        None => return,
    };
    let along = crossing.end - crossing.start;
    let step = 1.0 / CROSSING_STRIPES as f64;
    let shadow_offset = Vector2d::new(2.0, 2.0);

    for i in 0..CROSSING_STRIPES {
        let t1 = i as f64 * step;
        let t2 = t1 + step * 0.6;
        let (a, b) = (crossing.start + along * t1, crossing.start + along * t2);
        let stripe =
            [a + normal, b + normal, b - normal, a - normal].map(|p| projection.project(p, 0.1));
        canvas.draw(
            Layer::Crossings,
            Shape::polygon(
                stripe.map(|p| p + shadow_offset),
                Color::rgba(0, 0, 0, 0.1),
                None,
            ),
        );
        canvas.draw(
            Layer::Crossings,
            Shape::polygon(
                stripe,
                Color::WHITE,
                Some(Stroke::solid(Color::rgb(0xf0, 0xf0, 0xf0), 2.0)),
            ),
        );
    }
}

/// Draws a wall as a vertical face with brick joints and a lit top edge.
pub fn draw_wall(wall: &Wall, projection: &Projection, canvas: &mut impl Canvas) {
    let base = [projection.ground(wall.start), projection.ground(wall.end)];
    let top = [
        projection.project(wall.start, WALL_HEIGHT),
        projection.project(wall.end, WALL_HEIGHT),
    ];
    let face = Fill::linear(
        base[0],
        top[0],
        [
            (0.0, Color::rgb(0x8b, 0x6f, 0x47)),
            (0.5, Color::rgb(0xa0, 0x82, 0x6d)),
            (1.0, Color::rgb(0x6b, 0x57, 0x44)),
        ],
    );
    canvas.draw(
        Layer::Walls,
        Shape::polygon([base[0], base[1], top[1], top[0]], face, None),
    );

    let joint = Stroke::solid(Color::rgba(0, 0, 0, 0.2), 1.0);
    let steps = wall.start.distance(wall.end) / BRICK_SPACING;
    for i in 0..steps.ceil() as usize {
        let p = wall.start + (wall.end - wall.start) * (i as f64 / steps);
        canvas.draw(
            Layer::Walls,
            Shape::line(
                projection.project(p, WALL_HEIGHT * 0.5),
                projection.ground(p),
                joint.clone(),
            ),
        );
    }

    canvas.draw(
        Layer::Walls,
        Shape::line(
            top[0],
            top[1],
            Stroke::solid(Color::rgb(0xb8, 0xa8, 0x94), 2.0),
        ),
    );
}

/// Colours of a zone platform.
struct ZoneStyle {
    gradient: [Color; 3],
    border: Color,
    glyph: &'static str,
    layer: Layer,
}

const ENTRANCE_STYLE: ZoneStyle = ZoneStyle {
    gradient: [
        Color::rgb(0x66, 0xbb, 0x6a),
        Color::rgb(0x43, 0xa0, 0x47),
        Color::rgb(0x2e, 0x7d, 0x32),
    ],
    border: Color::rgb(0x1b, 0x5e, 0x20),
    glyph: "↓",
    layer: Layer::Entrances,
};

const EXIT_STYLE: ZoneStyle = ZoneStyle {
    gradient: [
        Color::rgb(0xef, 0x53, 0x50),
        Color::rgb(0xe5, 0x39, 0x35),
        Color::rgb(0xc6, 0x28, 0x28),
    ],
    border: Color::rgb(0xb7, 0x1c, 0x1c),
    glyph: "↑",
    layer: Layer::Exits,
};

/// Draws a round platform of `radius` metres; returns its screen centre and
/// radius in pixels.
fn draw_zone(
    position: Point2d,
    radius: f64,
    style: &ZoneStyle,
    projection: &Projection,
    canvas: &mut impl Canvas,
) -> (ScreenPoint, f64) {
    let centre = projection.ground(position);
    let r = projection.pixels(radius);

    let outline = (0..16).map(|i| {
        let angle = i as f64 * PI / 8.0;
        projection.ground(position + Vector2d::new(angle.cos(), angle.sin()) * radius)
    });
    canvas.draw(
        style.layer,
        Shape::polygon(outline, Color::rgba(0, 0, 0, 0.2), None),
    );

    let [inner, middle, outer] = style.gradient;
    canvas.draw(
        style.layer,
        Shape::circle(
            centre,
            r,
            Fill::radial([(0.0, inner), (0.7, middle), (1.0, outer)]),
        )
        .with_stroke(Stroke::solid(style.border, 2.0)),
    );
    canvas.draw(
        style.layer,
        Shape::text(centre, style.glyph, r * 0.8, Color::WHITE),
    );
    (centre, r)
}

/// Draws an entrance platform labelled with its flow rate.
pub fn draw_entrance(entrance: &Entrance, projection: &Projection, canvas: &mut impl Canvas) {
    let (centre, r) = draw_zone(
        entrance.position,
        entrance.radius,
        &ENTRANCE_STYLE,
        projection,
        canvas,
    );
    if entrance.flow_rate != 0.0 {
        canvas.draw(
            Layer::Entrances,
            Shape::text(
                centre + Vector2d::new(0.0, r + 10.0),
                format!("{:.1}/s", entrance.flow_rate),
                r * 0.4,
                ENTRANCE_STYLE.border,
            ),
        );
    }
}

pub fn draw_exit(exit: &Exit, projection: &Projection, canvas: &mut impl Canvas) {
    draw_zone(exit.position, exit.radius, &EXIT_STYLE, projection, canvas);
}
