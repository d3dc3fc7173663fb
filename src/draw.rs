//! Drawing primitives and the canvas they are issued to.
//!
//! The scene never rasterises anything itself. Every component describes what
//! it wants drawn as [Shape]s in screen space, tagged with the [Layer] they
//! belong to, and hands them to a [Canvas]. [DisplayList] is the canvas used by
//! the replay tool and the tests; it records everything in order and can be
//! serialised as JSON.

use crate::projection::ScreenPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// An RGBA colour; alpha is in `[0, 1]`.
///
/// Colours are written as CSS strings and read from `#rrggbb` or `#rgb`.
#[derive(Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0.0);

    /// An opaque colour.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// The same colour with a different alpha, clamped to `[0, 1]`.
    pub fn with_alpha(self, a: f64) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Lightens (positive) or darkens (negative) the colour by a percentage
    /// of full scale, saturating each channel.
    pub fn shade(self, percent: f64) -> Self {
        let amount = (2.55 * percent).round() as i32;
        let channel = |c: u8| (c as i32 + amount).clamp(0, 255) as u8;
        Self {
            r: channel(self.r),
            g: channel(self.g),
            b: channel(self.b),
            a: self.a,
        }
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a >= 1.0 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {:.2})", self.r, self.g, self.b, self.a)
        }
    }
}

/// Error returned when parsing a `#rrggbb` colour fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid colour {0:?}")]
pub struct ParseColorError(pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        let err = || ParseColorError(s.to_string());
        let value = match hex.len() {
            6 => u32::from_str_radix(hex, 16).map_err(|_| err())?,
            3 => {
                let short = u32::from_str_radix(hex, 16).map_err(|_| err())?;
                let (r, g, b) = ((short >> 8) & 0xf, (short >> 4) & 0xf, short & 0xf);
                (r * 0x11) << 16 | (g * 0x11) << 8 | (b * 0x11)
            }
            _ => return Err(err()),
        };
        Ok(Color::rgb(
            (value >> 16) as u8,
            (value >> 8 & 0xff) as u8,
            (value & 0xff) as u8,
        ))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{:?}", self))
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A stroke style.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    /// Dash pattern as alternating on/off lengths; empty for a solid line.
    #[serde(skip_serializing_if = "SmallVec::is_empty")]
    pub dash: SmallVec<[f64; 2]>,
    /// Whether line ends are rounded.
    pub round_cap: bool,
}

impl Stroke {
    pub fn solid(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            dash: SmallVec::new(),
            round_cap: false,
        }
    }

    pub fn dashed(color: Color, width: f64, on: f64, off: f64) -> Self {
        Self {
            dash: SmallVec::from_buf([on, off]),
            ..Self::solid(color, width)
        }
    }

    pub fn rounded(self) -> Self {
        Self {
            round_cap: true,
            ..self
        }
    }
}

/// A colour stop of a radial gradient, with `offset` in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Color,
}

/// Fill of a closed shape.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fill {
    Solid { color: Color },
    /// A radial gradient centred on the shape's centre.
    Radial { stops: SmallVec<[GradientStop; 4]> },
    /// A linear gradient between two screen points.
    Linear {
        #[serde(serialize_with = "crate::math::point::serialize")]
        from: ScreenPoint,
        #[serde(serialize_with = "crate::math::point::serialize")]
        to: ScreenPoint,
        stops: SmallVec<[GradientStop; 4]>,
    },
}

impl Fill {
    /// A gradient from `stops`, given as `(offset, colour)` pairs.
    pub fn radial(stops: impl IntoIterator<Item = (f64, Color)>) -> Self {
        Fill::Radial {
            stops: gradient(stops),
        }
    }

    pub fn linear(
        from: ScreenPoint,
        to: ScreenPoint,
        stops: impl IntoIterator<Item = (f64, Color)>,
    ) -> Self {
        Fill::Linear {
            from,
            to,
            stops: gradient(stops),
        }
    }
}

fn gradient(stops: impl IntoIterator<Item = (f64, Color)>) -> SmallVec<[GradientStop; 4]> {
    stops
        .into_iter()
        .map(|(offset, color)| GradientStop { offset, color })
        .collect()
}

impl From<Color> for Fill {
    fn from(color: Color) -> Self {
        Fill::Solid { color }
    }
}

/// A polygon point list; most polygons drawn are quads.
pub type Points = SmallVec<[ScreenPoint; 4]>;

fn serialize_points<S: Serializer>(points: &Points, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(points.iter().map(|p| [p.x, p.y]))
}

/// A primitive drawn in screen space (pixels).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    /// Fills the whole viewport.
    Clear { color: Color },
    Line {
        #[serde(serialize_with = "crate::math::point::serialize")]
        from: ScreenPoint,
        #[serde(serialize_with = "crate::math::point::serialize")]
        to: ScreenPoint,
        stroke: Stroke,
    },
    Polygon {
        #[serde(serialize_with = "serialize_points")]
        points: Points,
        fill: Option<Fill>,
        stroke: Option<Stroke>,
    },
    Ellipse {
        #[serde(serialize_with = "crate::math::point::serialize")]
        centre: ScreenPoint,
        radii: [f64; 2],
        /// Rotation of the x radius in radians.
        rotation: f64,
        fill: Option<Fill>,
        stroke: Option<Stroke>,
    },
    Text {
        #[serde(serialize_with = "crate::math::point::serialize")]
        anchor: ScreenPoint,
        text: String,
        size: f64,
        color: Color,
        /// Outline drawn behind the glyphs.
        outline: Option<Stroke>,
    },
}

impl Shape {
    /// A filled circle.
    pub fn circle(centre: ScreenPoint, radius: f64, fill: impl Into<Fill>) -> Self {
        Shape::Ellipse {
            centre,
            radii: [radius, radius],
            rotation: 0.0,
            fill: Some(fill.into()),
            stroke: None,
        }
    }

    /// A filled, axis-aligned ellipse.
    pub fn ellipse(centre: ScreenPoint, radii: [f64; 2], fill: impl Into<Fill>) -> Self {
        Shape::Ellipse {
            centre,
            radii,
            rotation: 0.0,
            fill: Some(fill.into()),
            stroke: None,
        }
    }

    /// Adds an outline to a polygon or ellipse; other shapes are unchanged.
    pub fn with_stroke(self, outline: Stroke) -> Self {
        match self {
            Shape::Polygon { points, fill, .. } => Shape::Polygon {
                points,
                fill,
                stroke: Some(outline),
            },
            Shape::Ellipse {
                centre,
                radii,
                rotation,
                fill,
                ..
            } => Shape::Ellipse {
                centre,
                radii,
                rotation,
                fill,
                stroke: Some(outline),
            },
            other => other,
        }
    }

    /// An unfilled circle.
    pub fn ring(centre: ScreenPoint, radius: f64, stroke: Stroke) -> Self {
        Shape::Ellipse {
            centre,
            radii: [radius, radius],
            rotation: 0.0,
            fill: None,
            stroke: Some(stroke),
        }
    }

    pub fn line(from: ScreenPoint, to: ScreenPoint, stroke: Stroke) -> Self {
        Shape::Line { from, to, stroke }
    }

    /// A filled polygon with an optional outline.
    pub fn polygon(
        points: impl IntoIterator<Item = ScreenPoint>,
        fill: impl Into<Fill>,
        stroke: Option<Stroke>,
    ) -> Self {
        Shape::Polygon {
            points: points.into_iter().collect(),
            fill: Some(fill.into()),
            stroke,
        }
    }

    /// Centred text.
    pub fn text(anchor: ScreenPoint, text: impl Into<String>, size: f64, color: Color) -> Self {
        Shape::Text {
            anchor,
            text: text.into(),
            size,
            color,
            outline: None,
        }
    }

    /// Centred text with an outline.
    pub fn outlined_text(
        anchor: ScreenPoint,
        text: impl Into<String>,
        size: f64,
        color: Color,
        outline: Stroke,
    ) -> Self {
        Shape::Text {
            anchor,
            text: text.into(),
            size,
            color,
            outline: Some(outline),
        }
    }
}

/// Draw layers, in the order they are painted.
///
/// Farther and lower elements come first so that nothing taller is overpainted
/// by something behind it. Traffic lights are last and are never hidden.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Background,
    GroundGrid,
    Roads,
    Decorations,
    Walls,
    CarLanes,
    PedestrianLanes,
    Crossings,
    Entrances,
    Exits,
    Vehicles,
    Hazards,
    Pedestrians,
    CongestionAlerts,
    Buildings,
    TrafficLights,
    /// Editor previews drawn over the finished frame.
    Overlay,
}

/// A sink for drawing commands.
pub trait Canvas {
    /// Marks the start of a new frame.
    fn begin_frame(&mut self) {}

    /// Draws a shape as part of the given layer.
    fn draw(&mut self, layer: Layer, shape: Shape);
}

/// A single recorded drawing command.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DrawItem {
    pub layer: Layer,
    #[serde(flatten)]
    pub shape: Shape,
}

/// A canvas which records one frame of drawing commands.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DisplayList {
    items: Vec<DrawItem>,
}

impl DisplayList {
    pub fn new() -> Self {
        Default::default()
    }

    /// The recorded commands, in paint order.
    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    /// The shapes recorded for one layer.
    pub fn layer(&self, layer: Layer) -> impl Iterator<Item = &Shape> {
        self.items
            .iter()
            .filter(move |item| item.layer == layer)
            .map(|item| &item.shape)
    }

    /// The sequence of layers in paint order, without repeats.
    pub fn layer_order(&self) -> Vec<Layer> {
        let mut order: Vec<Layer> = self.items.iter().map(|item| item.layer).collect();
        order.dedup();
        order
    }

    /// Whether a text item reading exactly `text` was recorded.
    pub fn contains_text(&self, text: &str) -> bool {
        self.items
            .iter()
            .any(|item| matches!(&item.shape, Shape::Text { text: t, .. } if t == text))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!(self.items)
    }
}

impl Canvas for DisplayList {
    fn begin_frame(&mut self) {
        self.items.clear();
    }

    fn draw(&mut self, layer: Layer, shape: Shape) {
        self.items.push(DrawItem { layer, shape });
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_hex_colours() {
        assert_eq!("#ff9800".parse::<Color>().unwrap(), Color::rgb(255, 152, 0));
        assert_eq!("#ccc".parse::<Color>().unwrap(), Color::rgb(204, 204, 204));
        assert!("#12345".parse::<Color>().is_err());
        assert!("purple".parse::<Color>().is_err());
    }

    #[test]
    fn colours_round_trip_through_strings() {
        let json = serde_json::to_value(Color::rgb(0x66, 0xbb, 0x6a)).unwrap();
        assert_eq!(json, "#66bb6a");
        let back: Color = serde_json::from_value(json).unwrap();
        assert_eq!(back, Color::rgb(0x66, 0xbb, 0x6a));
        let faded = serde_json::to_value(Color::rgba(255, 0, 0, 0.5)).unwrap();
        assert_eq!(faded, "rgba(255, 0, 0, 0.50)");
    }

    #[test]
    fn shade_saturates() {
        let red = Color::rgb(255, 51, 51);
        assert_eq!(red.shade(-20.0), Color::rgb(204, 0, 0));
        assert_eq!(red.shade(40.0), Color::rgb(255, 153, 153));
    }

    #[test]
    fn display_list_records_in_order() {
        let mut list = DisplayList::new();
        list.draw(Layer::Background, Shape::Clear { color: Color::WHITE });
        list.draw(Layer::Roads, Shape::text(ScreenPoint::new(0.0, 0.0), "a", 10.0, Color::BLACK));
        list.draw(Layer::Roads, Shape::text(ScreenPoint::new(1.0, 0.0), "b", 10.0, Color::BLACK));
        assert_eq!(list.layer_order(), vec![Layer::Background, Layer::Roads]);
        assert_eq!(list.layer(Layer::Roads).count(), 2);
        assert!(list.contains_text("b"));

        list.begin_frame();
        assert!(list.items().is_empty());
    }

    #[test]
    fn display_list_serialises_with_layer_tags() {
        let mut list = DisplayList::new();
        list.draw(
            Layer::Walls,
            Shape::line(
                ScreenPoint::new(0.0, 1.0),
                ScreenPoint::new(2.0, 3.0),
                Stroke::solid(Color::BLACK, 1.0),
            ),
        );
        let json = list.to_json();
        assert_eq!(json[0]["layer"], "walls");
        assert_eq!(json[0]["type"], "line");
        assert_eq!(json[0]["from"], serde_json::json!([0.0, 1.0]));
    }
}
