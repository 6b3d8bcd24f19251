use serde::{Deserialize, Serialize};

/// Surface reflectances (0–1). Carried with the room for reporting; the
/// direct-light calculation does not use them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reflectances {
    pub ceiling: f64,
    pub walls: f64,
    pub floor: f64,
}

impl Default for Reflectances {
    fn default() -> Self {
        ReflectancePreset::Light.reflectances()
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReflectancePreset {
    #[default]
    Light,
    Medium,
    Dark,
}

impl ReflectancePreset {
    pub fn reflectances(self) -> Reflectances {
        let (ceiling, walls, floor) = match self {
            ReflectancePreset::Light => (0.8, 0.5, 0.2),
            ReflectancePreset::Medium => (0.7, 0.5, 0.3),
            ReflectancePreset::Dark => (0.5, 0.3, 0.1),
        };
        Reflectances {
            ceiling,
            walls,
            floor,
        }
    }
}

/// Rectangular room, all dimensions in meters.
///
/// `length` runs along x and `width` along y. Heights are measured from the floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomSpec {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub mounting_height: f64,
    pub workplane_height: f64,
    pub reflectances: Reflectances,
}

impl Default for RoomSpec {
    fn default() -> Self {
        Self {
            length: 6.0,
            width: 4.0,
            height: 3.0,
            mounting_height: 2.7,
            workplane_height: 0.8,
            reflectances: Reflectances::default(),
        }
    }
}

/// Room Cavity Ratio of the space between workplane and ceiling, rounded to
/// two decimals. Informational only.
pub fn room_cavity_ratio(room: &RoomSpec) -> f64 {
    let cavity_height = room.height - room.workplane_height;
    if cavity_height <= 0.0 {
        return 0.0;
    }
    let rcr = 5.0 * cavity_height * (room.length + room.width) / (room.length * room.width);
    (rcr * 100.0).round() / 100.0
}
