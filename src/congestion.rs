//! Grid-based crowd density detection.

use crate::config::CongestionConfig;
use crate::draw::{Canvas, Color, Fill, GradientStop, Layer, Shape, Stroke};
use crate::math::{Point2d, Vector2d};
use crate::pedestrian::Pedestrian;
use crate::projection::Projection;
use itertools::iproduct;
use smallvec::smallvec;

/// Pedestrian counts over a grid of square cells covering the environment.
///
/// The grid is rebuilt from scratch for every snapshot and carries no state
/// from one frame to the next.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityGrid {
    cell_size: f64,
    rows: usize,
    cols: usize,
    /// Row-major counts.
    counts: Vec<u32>,
}

/// A cell whose occupancy reached the jam threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hotspot {
    pub row: usize,
    pub col: usize,
    /// Centre of the cell, in m.
    pub centre: Point2d,
    pub count: u32,
}

impl DensityGrid {
    /// Counts pedestrians per cell in one pass. Pedestrians outside the
    /// environment are ignored.
    pub fn build(
        extents: (f64, f64),
        pedestrians: &[Pedestrian],
        config: &CongestionConfig,
    ) -> Self {
        let cell_size = config.cell_size;
        let cells = |len: f64| {
            let n = (len / cell_size).ceil();
            if n.is_finite() && n > 0.0 {
                n as usize
            } else {
                0
            }
        };
        let (cols, rows) = (cells(extents.0), cells(extents.1));
        let mut counts = vec![0; rows * cols];
        for ped in pedestrians {
            let col = (ped.position.x / cell_size).floor();
            let row = (ped.position.y / cell_size).floor();
            if col >= 0.0 && row >= 0.0 && (col as usize) < cols && (row as usize) < rows {
                counts[row as usize * cols + col as usize] += 1;
            }
        }
        Self {
            cell_size,
            rows,
            cols,
            counts,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The count of one cell; zero outside the grid.
    pub fn count(&self, row: usize, col: usize) -> u32 {
        if row < self.rows && col < self.cols {
            self.counts[row * self.cols + col]
        } else {
            0
        }
    }

    /// The cells holding at least `threshold` pedestrians, row by row.
    pub fn hotspots(&self, threshold: u32) -> impl Iterator<Item = Hotspot> + '_ {
        iproduct!(0..self.rows, 0..self.cols).filter_map(move |(row, col)| {
            let count = self.count(row, col);
            (count >= threshold).then(|| Hotspot {
                row,
                col,
                centre: Point2d::new(
                    (col as f64 + 0.5) * self.cell_size,
                    (row as f64 + 0.5) * self.cell_size,
                ),
                count,
            })
        })
    }
}

/// Pedestrians per square metre over the whole environment.
pub fn scene_density(count: usize, extents: (f64, f64)) -> f64 {
    let area = extents.0 * extents.1;
    if area > 0.0 {
        count as f64 / area
    } else {
        0.0
    }
}

/// Whether the scene-wide density warrants the jam warning.
pub fn is_jammed(density: f64, config: &CongestionConfig) -> bool {
    density > config.density_threshold
}

/// The alert pulsation factor at a wall-clock time in seconds.
pub fn pulse(wall_secs: f64) -> f64 {
    (wall_secs * 3.0).sin() * 0.3 + 1.0
}

/// Draws a pulsating alert over every hotspot.
pub fn draw_alerts(
    grid: &DensityGrid,
    config: &CongestionConfig,
    wall_secs: f64,
    projection: &Projection,
    canvas: &mut impl Canvas,
) {
    let pulse = pulse(wall_secs);
    let amber = |a: f64| Color::rgba(255, 152, 0, a);
    let deep_amber = Color::rgb(0xff, 0x6f, 0x00);

    for spot in grid.hotspots(config.cell_threshold) {
        let centre = projection.ground(spot.centre);
        let radius = projection.pixels(config.cell_size * 0.8 * pulse);
        canvas.draw(
            Layer::CongestionAlerts,
            Shape::Ellipse {
                centre,
                radii: [radius, radius],
                rotation: 0.0,
                fill: Some(Fill::Radial {
                    stops: smallvec![
                        GradientStop {
                            offset: 0.0,
                            color: amber(0.4)
                        },
                        GradientStop {
                            offset: 0.7,
                            color: amber(0.2)
                        },
                        GradientStop {
                            offset: 1.0,
                            color: amber(0.0)
                        },
                    ],
                }),
                stroke: Some(Stroke::dashed(amber(0.6 * pulse), 3.0, 10.0, 5.0)),
            },
        );

        let icon = projection.project(spot.centre, 3.0);
        canvas.draw(
            Layer::CongestionAlerts,
            Shape::polygon(
                [
                    icon - Vector2d::new(0.0, 20.0),
                    icon - Vector2d::new(15.0, 0.0),
                    icon + Vector2d::new(15.0, 0.0),
                ],
                amber(0.9),
                Some(Stroke::solid(deep_amber, 2.0)),
            ),
        );
        canvas.draw(
            Layer::CongestionAlerts,
            Shape::text(icon - Vector2d::new(0.0, 10.0), "!", 16.0, Color::BLACK),
        );
        canvas.draw(
            Layer::CongestionAlerts,
            Shape::outlined_text(
                icon + Vector2d::new(0.0, 18.0),
                "TRAFFIC JAM",
                14.0,
                Color::WHITE,
                Stroke::solid(deep_amber, 3.0),
            ),
        );
        canvas.draw(
            Layer::CongestionAlerts,
            Shape::outlined_text(
                icon + Vector2d::new(0.0, 35.0),
                format!("{} people", spot.count),
                12.0,
                Color::WHITE,
                Stroke::solid(deep_amber, 2.0),
            ),
        );
    }
}
