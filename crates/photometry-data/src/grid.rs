use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::PhotometricDistribution;
use crate::interpolate::intensity;
use crate::layout::{LayoutSpec, LuminairePosition, positions};
use crate::room::RoomSpec;

/// Smallest luminaire-to-workplane separation used in the calculation (meters).
const MIN_VERTICAL_SEPARATION: f64 = 0.1;

/// Workplane illuminance sampled on a square grid.
///
/// `values[row][col]` is lux at the center of that cell, rounded to two
/// decimals. Row 0 is at the smallest y, column 0 at the smallest x.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IlluminanceGrid {
    pub values: Vec<Vec<f64>>,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    /// min / average, 0 when the average is 0.
    pub uniformity: f64,
}

impl IlluminanceGrid {
    pub fn resolution(&self) -> usize {
        self.values.len()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Direct illuminance (lux) at a workplane `point` from every luminaire.
///
/// `dz` is the vertical drop from the luminaire plane to the workplane.
/// Each luminaire contributes `I(θh, θv) · cos θv / d²`, with θv measured
/// from nadir. A luminaire at zero distance is skipped.
pub fn point_illuminance(
    point: DVec2,
    dz: f64,
    luminaires: &[LuminairePosition],
    dist: &PhotometricDistribution,
) -> f64 {
    let mut lux = 0.0;
    for luminaire in luminaires {
        let delta = point - *luminaire;
        let horizontal = delta.length();
        let distance = (horizontal * horizontal + dz * dz).sqrt();
        if distance == 0.0 {
            continue;
        }

        let vertical_deg = horizontal.atan2(dz).to_degrees();
        let horizontal_deg = delta.y.atan2(delta.x).to_degrees().rem_euclid(360.0);

        let candela = intensity(dist, horizontal_deg, vertical_deg);
        let cos_theta = dz / distance;
        lux += candela * cos_theta / (distance * distance);
    }
    lux
}

/// Illuminance over a `grid_resolution` × `grid_resolution` grid covering the room.
///
/// Each cell is the mean of a `samples_per_point` × `samples_per_point`
/// sub-grid spread evenly over the cell and clamped to the room. Values are
/// rounded per cell after averaging; statistics use the rounded values.
pub fn compute_grid(
    room: &RoomSpec,
    layout: &LayoutSpec,
    dist: &PhotometricDistribution,
    grid_resolution: usize,
    samples_per_point: usize,
) -> IlluminanceGrid {
    let luminaires = positions(room, layout);
    let dz = (room.mounting_height - room.workplane_height).max(MIN_VERTICAL_SEPARATION);
    let res = grid_resolution.max(1);
    let sub = samples_per_point.max(1);

    let cell = DVec2::new(room.length / res as f64, room.width / res as f64);
    let bounds = DVec2::new(room.length, room.width);
    let sub_offsets: Vec<DVec2> = (0..sub)
        .flat_map(|sy| {
            (0..sub).map(move |sx| {
                let frac = DVec2::new(
                    (sx as f64 + 0.5) / sub as f64 - 0.5,
                    (sy as f64 + 0.5) / sub as f64 - 0.5,
                );
                frac * cell
            })
        })
        .collect();

    let mut values = Vec::with_capacity(res);
    let mut min = f64::INFINITY;
    let mut max = 0.0_f64;
    let mut total = 0.0;

    for row in 0..res {
        let mut row_values = Vec::with_capacity(res);
        let y = (row as f64 + 0.5) / res as f64 * room.width;

        for col in 0..res {
            let x = (col as f64 + 0.5) / res as f64 * room.length;
            let center = DVec2::new(x, y);

            let sum: f64 = sub_offsets
                .iter()
                .map(|offset| {
                    let point = (center + *offset).clamp(DVec2::ZERO, bounds);
                    point_illuminance(point, dz, &luminaires, dist)
                })
                .sum();

            let value = round2(sum / sub_offsets.len() as f64);
            min = min.min(value);
            max = max.max(value);
            total += value;
            row_values.push(value);
        }

        values.push(row_values);
    }

    let average = total / (res * res) as f64;
    let uniformity = if average > 0.0 { min / average } else { 0.0 };

    tracing::debug!(
        resolution = res,
        samples = sub,
        luminaires = luminaires.len(),
        average,
        "computed illuminance grid"
    );

    IlluminanceGrid {
        values,
        average,
        min,
        max,
        uniformity,
    }
}
