use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::room::RoomSpec;

/// Luminaire location in the ceiling plane: x along the room length, y along its width.
pub type LuminairePosition = DVec2;

/// Regular rows × columns array of identical luminaires.
///
/// Rows step along y by `row_spacing`, columns along x by `column_spacing`.
/// A non-finite offset centers the array on that axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub rows: u32,
    pub columns: u32,
    pub row_spacing: f64,
    pub column_spacing: f64,
    #[serde(default = "auto_offset")]
    pub offset_x: f64,
    #[serde(default = "auto_offset")]
    pub offset_y: f64,
}

fn auto_offset() -> f64 {
    f64::NAN
}

impl LayoutSpec {
    /// Array with both offsets left to centering.
    pub fn centered(rows: u32, columns: u32, row_spacing: f64, column_spacing: f64) -> Self {
        Self {
            rows,
            columns,
            row_spacing,
            column_spacing,
            offset_x: auto_offset(),
            offset_y: auto_offset(),
        }
    }

    pub fn count(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    /// Offsets that center the array in `room`.
    pub fn centered_origin(&self, room: &RoomSpec) -> DVec2 {
        let span_x = self.columns.saturating_sub(1) as f64 * self.column_spacing;
        let span_y = self.rows.saturating_sub(1) as f64 * self.row_spacing;
        DVec2::new((room.length - span_x) / 2.0, (room.width - span_y) / 2.0)
    }

    /// The first luminaire's position, substituting centered offsets for non-finite ones.
    pub fn origin(&self, room: &RoomSpec) -> DVec2 {
        let center = self.centered_origin(room);
        DVec2::new(
            if self.offset_x.is_finite() {
                self.offset_x
            } else {
                center.x
            },
            if self.offset_y.is_finite() {
                self.offset_y
            } else {
                center.y
            },
        )
    }
}

/// Every luminaire position, row by row, columns innermost.
pub fn positions(room: &RoomSpec, layout: &LayoutSpec) -> Vec<LuminairePosition> {
    let origin = layout.origin(room);
    let step = DVec2::new(layout.column_spacing, layout.row_spacing);

    let mut out = Vec::with_capacity(layout.count());
    for r in 0..layout.rows {
        for c in 0..layout.columns {
            out.push(origin + DVec2::new(c as f64, r as f64) * step);
        }
    }
    out
}
