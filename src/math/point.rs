//! Serde adapters that read and write points as `[x, y]` arrays.

use super::Point2d;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S: Serializer>(point: &Point2d, serializer: S) -> Result<S::Ok, S::Error> {
    [point.x, point.y].serialize(serializer)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Point2d, D::Error> {
    let [x, y] = <[f64; 2]>::deserialize(deserializer)?;
    Ok(Point2d::new(x, y))
}

/// The same adapter for a list of points.
pub mod vec {
    use super::Point2d;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(points: &[Point2d], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(points.iter().map(|p| [p.x, p.y]))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Point2d>, D::Error> {
        let raw = Vec::<[f64; 2]>::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|[x, y]| Point2d::new(x, y)).collect())
    }
}

/// Reads and writes a vector as a `[dx, dy]` array; a missing value is zero.
pub mod vector {
    use crate::math::Vector2d;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(vec: &Vector2d, serializer: S) -> Result<S::Ok, S::Error> {
        [vec.x, vec.y].serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vector2d, D::Error> {
        let raw = Option::<[f64; 2]>::deserialize(deserializer)?;
        let [x, y] = raw.unwrap_or([0.0, 0.0]);
        Ok(Vector2d::new(x, y))
    }
}
