pub mod catalog;
pub mod grid;
pub mod ies;
pub mod interpolate;
pub mod layout;
pub mod room;
pub mod tokenize;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use catalog::{CatalogEntry, CatalogError, Luminaire, load_catalog, load_catalog_from_file};
pub use grid::{IlluminanceGrid, compute_grid, point_illuminance};
pub use ies::{
    BallastBlock, IesFile, ParseError, PhotometricHeader, PhotometricType, TiltMode, UnitsType,
    load_ies_from_file, parse_ies,
};
pub use interpolate::intensity;
pub use layout::{LayoutSpec, LuminairePosition, positions};
pub use room::{ReflectancePreset, Reflectances, RoomSpec, room_cavity_ratio};

// --- Public types ---

/// Angular luminous-intensity distribution of a single luminaire.
///
/// `candela` is indexed `[horizontal plane][vertical angle]`: one row per
/// entry of `horizontal_angles`, each holding one value per entry of
/// `vertical_angles`. Values are final candela, with the file's multiplier
/// and any tilt correction already applied.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PhotometricDistribution {
    pub vertical_angles: Vec<f64>,
    pub horizontal_angles: Vec<f64>,
    pub candela: Vec<Vec<f64>>,
    /// Free-text descriptors. Never consulted by the numeric code.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Lamp count × lumens per lamp; `None` for absolute photometry.
    #[serde(default)]
    pub total_lumens: Option<f64>,
}

impl PhotometricDistribution {
    pub fn new(vertical_angles: Vec<f64>, horizontal_angles: Vec<f64>, candela: Vec<Vec<f64>>) -> Self {
        Self {
            vertical_angles,
            horizontal_angles,
            candela,
            metadata: BTreeMap::new(),
            total_lumens: None,
        }
    }

    /// Peak intensity over the whole table, 0 for an empty table.
    pub fn max_candela(&self) -> f64 {
        self.candela
            .iter()
            .flatten()
            .copied()
            .fold(0.0, f64::max)
    }

    /// Bilinearly interpolated intensity toward (`horizontal_deg`, `vertical_deg`).
    pub fn intensity(&self, horizontal_deg: f64, vertical_deg: f64) -> f64 {
        interpolate::intensity(self, horizontal_deg, vertical_deg)
    }
}
