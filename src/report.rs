use std::fmt::Write;

use photometry_data::{
    IesFile, IlluminanceGrid, LayoutSpec, Luminaire, LuminairePosition, RoomSpec,
    room_cavity_ratio,
};
use serde::Serialize;

use crate::scenario::GridSettings;

#[derive(Debug, Clone, Serialize)]
pub struct LuminaireSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub lumens: f64,
    pub max_candela: f64,
    pub vertical_angles: usize,
    pub horizontal_planes: usize,
}

impl From<&Luminaire> for LuminaireSummary {
    fn from(l: &Luminaire) -> Self {
        Self {
            id: l.id.clone(),
            name: l.name.clone(),
            description: l.description.clone(),
            lumens: l.lumens,
            max_candela: l.photometry.max_candela(),
            vertical_angles: l.photometry.vertical_angles.len(),
            horizontal_planes: l.photometry.horizontal_angles.len(),
        }
    }
}

/// Result of one calculation in the shape written to JSON.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub luminaire: LuminaireSummary,
    pub room: RoomSpec,
    pub room_cavity_ratio: f64,
    pub layout: LayoutSpec,
    pub positions: Vec<[f64; 2]>,
    pub settings: GridSettings,
    /// Cell size along x and y in meters.
    pub cell_size: [f64; 2],
    pub grid: IlluminanceGrid,
}

impl Report {
    pub fn new(
        luminaire: &Luminaire,
        room: RoomSpec,
        layout: LayoutSpec,
        settings: GridSettings,
        positions: &[LuminairePosition],
        grid: IlluminanceGrid,
    ) -> Self {
        let res = grid.resolution().max(1) as f64;
        Self {
            luminaire: luminaire.into(),
            room_cavity_ratio: room_cavity_ratio(&room),
            cell_size: [room.length / res, room.width / res],
            positions: positions.iter().map(|p| p.to_array()).collect(),
            room,
            layout,
            settings,
            grid,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = self.write_summary(&mut out);
        out
    }

    fn write_summary(&self, out: &mut String) -> std::fmt::Result {
        let room = &self.room;
        let grid = &self.grid;
        writeln!(out, "Luminaire   {} ({})", self.luminaire.name, self.luminaire.id)?;
        writeln!(
            out,
            "            {:.0} lm, peak {:.0} cd",
            self.luminaire.lumens, self.luminaire.max_candela
        )?;
        writeln!(
            out,
            "Room        {} x {} x {} m, mounting {} m, workplane {} m",
            room.length, room.width, room.height, room.mounting_height, room.workplane_height
        )?;
        writeln!(
            out,
            "Surfaces    ceiling {} / walls {} / floor {}, RCR {:.2}",
            room.reflectances.ceiling,
            room.reflectances.walls,
            room.reflectances.floor,
            self.room_cavity_ratio
        )?;
        writeln!(
            out,
            "Layout      {} x {} ({} luminaires)",
            self.layout.rows,
            self.layout.columns,
            self.positions.len()
        )?;
        writeln!(
            out,
            "Grid        {0} x {0}, {1} sample(s) per axis",
            grid.resolution(),
            self.settings.samples
        )?;
        writeln!(out, "Average     {:.1} lux", grid.average)?;
        writeln!(out, "Min / Max   {:.1} / {:.1} lux", grid.min, grid.max)?;
        writeln!(out, "Uniformity  {:.2}", grid.uniformity)?;
        Ok(())
    }
}

/// Grid as fixed-width text with the far wall (largest y) on top.
pub fn render_grid(grid: &IlluminanceGrid) -> String {
    let width = grid
        .values
        .iter()
        .flatten()
        .map(|v| format!("{v:.0}").len())
        .max()
        .unwrap_or(1);

    let mut out = String::new();
    for row in grid.values.iter().rev() {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:>width$.0}")).collect();
        out.push_str(&cells.join(" "));
        out.push('\n');
    }
    out
}

/// Human-readable description of a parsed IES file.
pub fn describe_ies(file: &IesFile) -> String {
    let mut out = String::new();
    let _ = write_ies(file, &mut out);
    out
}

fn write_ies(file: &IesFile, out: &mut String) -> std::fmt::Result {
    let header = &file.header;
    let photometry = &file.photometry;

    for (key, value) in &photometry.metadata {
        writeln!(out, "{key:<18}{value}")?;
    }
    writeln!(out, "{:<18}{}", "tilt", header.tilt)?;
    if let Some(tilt) = &file.tilt {
        writeln!(out, "{:<18}{} angle(s)", "tilt table", tilt.angles.len())?;
    }
    writeln!(
        out,
        "{:<18}{} x {:.0} lm",
        "lamps", header.lamp_count, header.lumens_per_lamp
    )?;
    writeln!(out, "{:<18}{:.0}", "total lumens", file.total_lumens)?;
    writeln!(out, "{:<18}{:.1}", "max candela", file.max_candela)?;
    writeln!(out, "{:<18}{}", "multiplier", header.candela_multiplier)?;
    if let Some(ballast) = &header.ballast {
        writeln!(
            out,
            "{:<18}factor {} / lamp factor {} / {} W",
            "ballast", ballast.ballast_factor, ballast.ballast_lamp_factor, ballast.input_watts
        )?;
    }
    writeln!(
        out,
        "{:<18}{} ({:?} .. {:?})",
        "vertical angles",
        photometry.vertical_angles.len(),
        photometry.vertical_angles.first().copied().unwrap_or_default(),
        photometry.vertical_angles.last().copied().unwrap_or_default(),
    )?;
    writeln!(
        out,
        "{:<18}{} ({:?} .. {:?})",
        "horizontal planes",
        photometry.horizontal_angles.len(),
        photometry.horizontal_angles.first().copied().unwrap_or_default(),
        photometry.horizontal_angles.last().copied().unwrap_or_default(),
    )?;
    Ok(())
}
