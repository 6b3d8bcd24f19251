use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::PhotometricDistribution;
use crate::ies::{IesFile, ParseError, parse_ies};

/// A named luminaire ready for calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Luminaire {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Rated lumens, or peak candela for absolute photometry.
    pub lumens: f64,
    pub photometry: PhotometricDistribution,
}

impl Luminaire {
    pub fn from_ies(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>, file: IesFile) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            lumens: file.total_lumens,
            photometry: file.photometry,
        }
    }
}

// --- TOML deserialization ---

/// One `[[luminaire]]` table of a catalog. `file` is relative to the catalog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub file: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CatalogData {
    #[serde(default)]
    luminaire: Vec<CatalogEntry>,
}

#[derive(Debug)]
pub enum CatalogError {
    Io { path: PathBuf, err: std::io::Error },
    Toml(toml::de::Error),
    Ies { id: String, err: ParseError },
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io { path, err } => write!(f, "{}: {err}", path.display()),
            CatalogError::Toml(err) => write!(f, "invalid catalog: {err}"),
            CatalogError::Ies { id, err } => write!(f, "luminaire '{id}': {err}"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io { err, .. } => Some(err),
            CatalogError::Toml(err) => Some(err),
            CatalogError::Ies { err, .. } => Some(err),
        }
    }
}

/// Parse catalog entries from a TOML string, in file order.
pub fn load_catalog(toml_str: &str) -> Result<Vec<CatalogEntry>, toml::de::Error> {
    let data: CatalogData = toml::from_str(toml_str)?;
    Ok(data.luminaire)
}

fn read(path: &Path) -> Result<String, CatalogError> {
    std::fs::read_to_string(path).map_err(|err| CatalogError::Io {
        path: path.to_path_buf(),
        err,
    })
}

/// Load a catalog from disk and parse every IES file it references.
pub fn load_catalog_from_file(path: &Path) -> Result<Vec<Luminaire>, CatalogError> {
    let entries = load_catalog(&read(path)?).map_err(CatalogError::Toml)?;
    let base = path.parent().unwrap_or(Path::new(""));

    entries
        .into_iter()
        .map(|entry| {
            let text = read(&base.join(&entry.file))?;
            let file = parse_ies(&text).map_err(|err| CatalogError::Ies {
                id: entry.id.clone(),
                err,
            })?;
            Ok(Luminaire::from_ies(entry.id, entry.name, entry.description, file))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_keeps_file_order() {
        let toml = r#"
[[luminaire]]
id = "wide-batwing"
name = "Wide Batwing"
description = "Soft batwing distribution."
file = "demo/wide-batwing.ies"

[[luminaire]]
id = "narrow-beam"
name = "Narrow Beam"
file = "demo/narrow-beam.ies"
"#;
        let entries = load_catalog(toml).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "wide-batwing");
        assert_eq!(entries[1].id, "narrow-beam");
        assert_eq!(entries[1].description, "");
        assert_eq!(entries[1].file, PathBuf::from("demo/narrow-beam.ies"));
    }

    #[test]
    fn empty_catalog_is_allowed() {
        assert!(load_catalog("").unwrap().is_empty());
    }

    #[test]
    fn entry_without_file_is_rejected() {
        let toml = "[[luminaire]]\nid = \"x\"\nname = \"X\"\n";
        assert!(load_catalog(toml).is_err());
    }

    #[test]
    fn luminaire_takes_summary_lumens() {
        let file = parse_ies("TILT=NONE\n1 -1 1 2 1 1 1 0 0 0\n0 90\n0\n300 100").unwrap();
        let lum = Luminaire::from_ies("abs", "Absolute", "", file);
        assert_eq!(lum.lumens, 300.0);
        assert_eq!(lum.photometry.total_lumens, None);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_catalog_from_file(Path::new("/nonexistent/catalog.toml")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
        assert!(err.to_string().contains("catalog.toml"));
    }
}
