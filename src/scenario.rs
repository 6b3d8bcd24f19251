use std::path::Path;

use anyhow::Context;
use photometry_data::{LayoutSpec, ReflectancePreset, RoomSpec};
use serde::{Deserialize, Serialize};

/// Grid resolution range offered to users.
pub const RESOLUTION_RANGE: (usize, usize) = (8, 80);
/// Sub-samples per cell axis offered to users.
pub const SAMPLES_RANGE: (usize, usize) = (1, 4);

/// Target spacing-to-mounting-height ratio for suggested layouts.
const SPACING_CRITERION: f64 = 1.3;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 2 × 3 array with spacing dividing the room evenly and offsets centering it.
pub fn default_layout(room: &RoomSpec) -> LayoutSpec {
    let rows = 2;
    let columns = 3;
    let row_spacing = round2(room.width / (rows + 1) as f64);
    let column_spacing = round2(room.length / (columns + 1) as f64);
    let mut layout = LayoutSpec::centered(rows, columns, row_spacing, column_spacing);
    (layout.offset_x, layout.offset_y) = centered_offsets(room, &layout);
    layout
}

/// Offsets that center `layout` in `room`, rounded to centimeters.
pub fn centered_offsets(room: &RoomSpec, layout: &LayoutSpec) -> (f64, f64) {
    let origin = layout.centered_origin(room);
    (round2(origin.x), round2(origin.y))
}

/// (row spacing, column spacing) from the spacing criterion, capped so the
/// array still fits the room.
pub fn suggested_spacing(room: &RoomSpec, rows: u32, columns: u32) -> (f64, f64) {
    let mounting = (room.mounting_height - room.workplane_height).max(1.0);
    let spacing = round2(mounting * SPACING_CRITERION);
    (
        round2(spacing.min(room.width / rows.max(1) as f64)),
        round2(spacing.min(room.length / columns.max(1) as f64)),
    )
}

// --- Scenario file ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub rows: u32,
    pub columns: u32,
    pub row_spacing: Option<f64>,
    pub column_spacing: Option<f64>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
    /// Recompute offsets so the array sits in the middle of the room.
    pub center: bool,
    /// Use the spacing-criterion suggestion instead of explicit spacing.
    pub suggested_spacing: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            rows: 2,
            columns: 3,
            row_spacing: None,
            column_spacing: None,
            offset_x: None,
            offset_y: None,
            center: true,
            suggested_spacing: false,
        }
    }
}

impl LayoutConfig {
    pub fn resolve(&self, room: &RoomSpec) -> LayoutSpec {
        let (row_spacing, column_spacing) = if self.suggested_spacing {
            suggested_spacing(room, self.rows, self.columns)
        } else {
            (
                self.row_spacing
                    .unwrap_or_else(|| round2(room.width / (self.rows + 1) as f64)),
                self.column_spacing
                    .unwrap_or_else(|| round2(room.length / (self.columns + 1) as f64)),
            )
        };

        let mut layout = LayoutSpec::centered(self.rows, self.columns, row_spacing, column_spacing);
        if self.center {
            (layout.offset_x, layout.offset_y) = centered_offsets(room, &layout);
        } else {
            layout.offset_x = self.offset_x.unwrap_or(f64::NAN);
            layout.offset_y = self.offset_y.unwrap_or(f64::NAN);
        }
        layout
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub resolution: usize,
    pub samples: usize,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            resolution: 28,
            samples: 1,
        }
    }
}

impl GridSettings {
    /// Settings pulled into the supported ranges.
    pub fn clamped(self) -> Self {
        let resolution = self.resolution.clamp(RESOLUTION_RANGE.0, RESOLUTION_RANGE.1);
        let samples = self.samples.clamp(SAMPLES_RANGE.0, SAMPLES_RANGE.1);
        if resolution != self.resolution || samples != self.samples {
            tracing::warn!(
                requested_resolution = self.resolution,
                requested_samples = self.samples,
                resolution,
                samples,
                "grid settings clamped to supported range"
            );
        }
        Self {
            resolution,
            samples,
        }
    }
}

/// Everything needed for one calculation, as read from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub room: RoomSpec,
    /// Overrides `room.reflectances` when set.
    pub reflectance: Option<ReflectancePreset>,
    pub layout: LayoutConfig,
    pub grid: GridSettings,
    /// Library id or path to an IES file; the first library entry when unset.
    pub luminaire: Option<String>,
}

impl Scenario {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let mut scenario: Scenario = toml::from_str(text)?;
        if let Some(preset) = scenario.reflectance {
            scenario.room.reflectances = preset.reflectances();
        }
        Ok(scenario)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub fn layout_spec(&self) -> LayoutSpec {
        self.layout.resolve(&self.room)
    }
}
