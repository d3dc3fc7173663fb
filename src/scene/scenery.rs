//! Raised scenery: trees, ponds, buildings and traffic lights.

use crate::draw::{Canvas, Color, Fill, Layer, Shape, Stroke};
use crate::light::{LightState, TrafficLight};
use crate::math::{Point2d, Vector2d};
use crate::projection::{Projection, ScreenPoint};

/// Draws a decoration that is not a building. Unknown kinds draw nothing.
pub fn draw_decoration(
    decoration: &crate::environment::Decoration,
    projection: &Projection,
    canvas: &mut impl Canvas,
) {
    use crate::environment::Decoration;
    match *decoration {
        Decoration::Tree { position } => draw_tree(position, projection, canvas),
        Decoration::Pond { position, radius } => draw_pond(position, radius, projection, canvas),
        Decoration::Building { .. } | Decoration::Other => {}
    }
}

/// Foliage tiers as (elevation in m, radius in m, colour), bottom first.
const FOLIAGE: [(f64, f64, Color); 3] = [
    (1.5, 1.2, Color::rgb(0x2d, 0x50, 0x16)),
    (2.0, 1.0, Color::rgb(0x3a, 0x6e, 0x1f)),
    (2.5, 0.8, Color::rgb(0x4a, 0x8c, 0x2a)),
];

fn draw_tree(position: Point2d, projection: &Projection, canvas: &mut impl Canvas) {
    let base = projection.pixels(0.5);
    let bark = Color::rgb(0x8b, 0x45, 0x13);
    canvas.draw(
        Layer::Decorations,
        Shape::circle(projection.ground(position), base * 0.4, bark)
            .with_stroke(Stroke::solid(Color::rgb(0x65, 0x43, 0x21), 1.0)),
    );
    canvas.draw(
        Layer::Decorations,
        Shape::circle(projection.project(position, 0.8), base * 0.35, bark),
    );

    for (z, radius, color) in FOLIAGE {
        let centre = projection.project(position, z);
        let r = projection.pixels(radius);
        canvas.draw(
            Layer::Decorations,
            Shape::ellipse(centre, [r, r * 0.5], color),
        );
        canvas.draw(
            Layer::Decorations,
            Shape::ellipse(
                centre - Vector2d::new(r * 0.2, r * 0.2),
                [r * 0.4, r * 0.2],
                Color::rgba(144, 238, 144, 0.3),
            ),
        );
    }
}

fn draw_pond(position: Point2d, radius: f64, projection: &Projection, canvas: &mut impl Canvas) {
    let centre = projection.ground(position);
    let r = projection.pixels(radius);
    let water = Fill::radial([
        (0.0, Color::rgb(0x6e, 0xb5, 0xff)),
        (0.5, Color::rgb(0x4a, 0x9f, 0xd8)),
        (1.0, Color::rgb(0x2b, 0x7a, 0xb8)),
    ]);
    canvas.draw(
        Layer::Decorations,
        Shape::ellipse(centre, [r, r * 0.5], water)
            .with_stroke(Stroke::solid(Color::rgb(0x1a, 0x5f, 0x8a), 2.0)),
    );
    for i in 0..3 {
        let ripple = r * (0.3 + i as f64 * 0.2);
        canvas.draw(
            Layer::Decorations,
            Shape::Ellipse {
                centre,
                radii: [ripple, ripple * 0.5],
                rotation: 0.0,
                fill: None,
                stroke: Some(Stroke::solid(Color::rgba(255, 255, 255, 0.3), 1.0)),
            },
        );
    }
    canvas.draw(
        Layer::Decorations,
        Shape::ellipse(
            centre - Vector2d::new(r * 0.3, r * 0.15),
            [r * 0.3, r * 0.15],
            Color::rgba(255, 255, 255, 0.4),
        ),
    );
}

const WINDOW_FRAME: Color = Color::rgb(0x2c, 0x3e, 0x50);

/// Draws a block building with a footprint of `width` by `depth` metres.
///
/// The building is extruded straight up on screen, by 1.2 times its larger
/// footprint side.
pub fn draw_building(
    position: Point2d,
    width: f64,
    depth: f64,
    projection: &Projection,
    canvas: &mut impl Canvas,
) {
    let rise = Vector2d::new(0.0, width.max(depth) * projection.scale() * 1.2);
    let (hw, hd) = (width / 2.0, depth / 2.0);
    let corners = [(-hw, -hd), (hw, -hd), (hw, hd), (-hw, hd)]
        .map(|(dx, dy)| projection.ground(position + Vector2d::new(dx, dy)));
    let raised = corners.map(|p| p - rise);
    let edge = Stroke::solid(Color::rgb(0x7a, 0x8c, 0x9e), 1.0);

    canvas.draw(
        Layer::Buildings,
        Shape::polygon(
            corners.map(|p| p + Vector2d::new(10.0, 5.0)),
            Color::rgba(0, 0, 0, 0.15),
            None,
        ),
    );
    let front = Fill::linear(
        corners[3],
        raised[3],
        [
            (0.0, Color::rgb(0xb8, 0xc6, 0xdb)),
            (1.0, Color::rgb(0xf5, 0xf7, 0xfa)),
        ],
    );
    canvas.draw(
        Layer::Buildings,
        Shape::polygon(
            [corners[2], corners[3], raised[3], raised[2]],
            front,
            Some(edge.clone()),
        ),
    );
    let right = Fill::linear(
        corners[2],
        raised[2],
        [
            (0.0, Color::rgb(0x8f, 0xa3, 0xb8)),
            (1.0, Color::rgb(0xc5, 0xd3, 0xe0)),
        ],
    );
    canvas.draw(
        Layer::Buildings,
        Shape::polygon(
            [corners[1], corners[2], raised[2], raised[1]],
            right,
            Some(edge.clone()),
        ),
    );
    let roof = Fill::linear(
        raised[0],
        raised[2],
        [
            (0.0, Color::rgb(0xd4, 0xdc, 0xe6)),
            (1.0, Color::rgb(0xe8, 0xef, 0xf5)),
        ],
    );
    canvas.draw(Layer::Buildings, Shape::polygon(raised, roof, Some(edge)));

    draw_windows(corners, rise.y, canvas);
}

/// Five rows of windows: three across the front face, two across the right.
fn draw_windows(corners: [ScreenPoint; 4], height: f64, canvas: &mut impl Canvas) {
    let row_spacing = height / 6.0;

    let front = corners[3] - corners[2];
    if let Some(normal) = crate::math::segment_normal(corners[2], corners[3]) {
        let skew = normal * 4.0;
        let up = Vector2d::new(0.0, 6.0);
        let col_spacing = front.x / 4.0;
        for (row, col) in itertools::iproduct!(1..=5, 1..=3) {
            let centre = ScreenPoint::new(
                corners[2].x + col_spacing * col as f64,
                corners[2].y - height + row_spacing * row as f64,
            );
            let frame = [
                centre - skew - up,
                centre + skew - up,
                centre + skew + up,
                centre - skew + up,
            ];
            canvas.draw(Layer::Buildings, Shape::polygon(frame, WINDOW_FRAME, None));
            let inset = Vector2d::new(1.0, 1.0);
            let glass = [
                frame[0] + inset,
                frame[1] + Vector2d::new(-1.0, 1.0),
                frame[2] - inset,
                frame[3] + Vector2d::new(1.0, -1.0),
            ];
            canvas.draw(
                Layer::Buildings,
                Shape::polygon(glass, Color::rgb(0x6d, 0xb3, 0xd4), None),
            );
        }
    }

    for (row, col) in itertools::iproduct!(1..=5, 1..=2) {
        let t = col as f64 / 3.0;
        let centre = corners[1] + (corners[2] - corners[1]) * t
            - Vector2d::new(0.0, height - row_spacing * row as f64);
        canvas.draw(
            Layer::Buildings,
            Shape::polygon(rect(centre, 6.0, 10.0), WINDOW_FRAME, None),
        );
        canvas.draw(
            Layer::Buildings,
            Shape::polygon(rect(centre, 4.0, 8.0), Color::rgb(0x3d, 0x5a, 0x6b), None),
        );
    }
}

fn rect(centre: ScreenPoint, width: f64, height: f64) -> [ScreenPoint; 4] {
    let (hw, hh) = (width / 2.0, height / 2.0);
    [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)].map(|(dx, dy)| centre + Vector2d::new(dx, dy))
}

/// Height of a traffic light pole, in m.
const POLE_HEIGHT: f64 = 4.5;
/// Housing extents along x, y and z, in m.
const HOUSING: [f64; 3] = [1.2, 1.0, 3.5];

/// A signal lamp.
struct Lamp {
    /// Elevation of the lamp centre, in m.
    z: f64,
    /// Lit colour and its outline, or `None` for the amber lamp, which is
    /// never lit.
    lit: Option<(Color, Color)>,
    dark: Color,
    dark_border: Color,
}

/// Draws a traffic light showing `state`.
pub fn draw_traffic_light(
    light: &TrafficLight,
    state: LightState,
    projection: &Projection,
    canvas: &mut impl Canvas,
) {
    let p = light.position;
    let base = projection.ground(p);
    let top = projection.project(p, POLE_HEIGHT);

    canvas.draw(
        Layer::TrafficLights,
        Shape::circle(base, 8.0, Color::rgba(0, 0, 0, 0.3)),
    );
    canvas.draw(
        Layer::TrafficLights,
        Shape::line(
            base,
            top,
            Stroke::solid(Color::rgb(0x2c, 0x2c, 0x2c), 8.0).rounded(),
        ),
    );
    let shift = Vector2d::new(2.0, 2.0);
    canvas.draw(
        Layer::TrafficLights,
        Shape::line(
            base - shift,
            top - shift,
            Stroke::solid(Color::rgb(0x55, 0x55, 0x55), 3.0),
        ),
    );

    let [w, d, h] = HOUSING;
    let corner = |sx: f64, sy: f64, z: f64| {
        projection.project(p + Vector2d::new(sx * w / 2.0, sy * d / 2.0), z)
    };
    let (z0, z1) = (POLE_HEIGHT, POLE_HEIGHT + h);
    let bottom = [
        corner(-1.0, -1.0, z0),
        corner(1.0, -1.0, z0),
        corner(1.0, 1.0, z0),
        corner(-1.0, 1.0, z0),
    ];
    let upper = [
        corner(-1.0, -1.0, z1),
        corner(1.0, -1.0, z1),
        corner(1.0, 1.0, z1),
        corner(-1.0, 1.0, z1),
    ];
    let outline = Some(Stroke::solid(Color::BLACK, 1.0));
    canvas.draw(
        Layer::TrafficLights,
        Shape::polygon(bottom, Color::rgb(0x0a, 0x0a, 0x0a), None),
    );
    canvas.draw(
        Layer::TrafficLights,
        Shape::polygon(
            [bottom[0], upper[0], upper[3], bottom[3]],
            Color::rgb(0x1a, 0x1a, 0x1a),
            outline.clone(),
        ),
    );
    canvas.draw(
        Layer::TrafficLights,
        Shape::polygon(
            [bottom[1], upper[1], upper[2], bottom[2]],
            Color::rgb(0x2d, 0x2d, 0x2d),
            outline.clone(),
        ),
    );
    canvas.draw(
        Layer::TrafficLights,
        Shape::polygon(upper, Color::rgb(0x1f, 0x1f, 0x1f), outline),
    );

    let red = Lamp {
        z: z1 - 0.8,
        lit: (state == LightState::Red)
            .then(|| (Color::rgb(0xff, 0x00, 0x00), Color::rgb(0xcc, 0x00, 0x00))),
        dark: Color::rgb(0x33, 0x00, 0x00),
        dark_border: Color::rgb(0x1a, 0x00, 0x00),
    };
    let amber = Lamp {
        z: z0 + h / 2.0,
        lit: None,
        dark: Color::rgb(0x33, 0x22, 0x00),
        dark_border: Color::rgb(0x1a, 0x11, 0x00),
    };
    let green = Lamp {
        z: z0 + 0.8,
        lit: (state == LightState::Green)
            .then(|| (Color::rgb(0x00, 0xff, 0x00), Color::rgb(0x00, 0xcc, 0x00))),
        dark: Color::rgb(0x00, 0x33, 0x00),
        dark_border: Color::rgb(0x00, 0x1a, 0x00),
    };
    for lamp in [red, amber, green] {
        draw_lamp(projection.project(p, lamp.z), &lamp, canvas);
    }

    let label = match state {
        LightState::Red => Color::rgb(0xff, 0x33, 0x33),
        LightState::Green => Color::rgb(0x33, 0xff, 0x33),
    };
    canvas.draw(
        Layer::TrafficLights,
        Shape::outlined_text(
            projection.project(p, z1 + 0.5),
            "🚦",
            14.0,
            label,
            Stroke::solid(Color::BLACK, 3.0),
        ),
    );
}

fn draw_lamp(centre: ScreenPoint, lamp: &Lamp, canvas: &mut impl Canvas) {
    match lamp.lit {
        Some((color, border)) => {
            let glow = Fill::radial([
                (0.0, color.shade(20.0)),
                (0.4, color.with_alpha(0.8)),
                (1.0, color.with_alpha(0.0)),
            ]);
            canvas.draw(Layer::TrafficLights, Shape::circle(centre, 25.0, glow));
            canvas.draw(
                Layer::TrafficLights,
                Shape::circle(centre, 10.0, color).with_stroke(Stroke::solid(border, 2.0)),
            );
        }
        None => {
            canvas.draw(
                Layer::TrafficLights,
                Shape::circle(centre, 8.0, lamp.dark)
                    .with_stroke(Stroke::solid(lamp.dark_border, 1.0)),
            );
        }
    }
}
