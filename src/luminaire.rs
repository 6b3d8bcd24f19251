use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use photometry_data::{Luminaire, ParseError, parse_ies};

const UPLOAD_DESCRIPTION: &str = "Uploaded IES file";

/// Display name for a user file: the file name minus a trailing `.ies`, any case.
fn display_name(file_name: &str) -> &str {
    let cut = file_name.len().wrapping_sub(4);
    if file_name.len() >= 4
        && file_name.is_char_boundary(cut)
        && file_name[cut..].eq_ignore_ascii_case(".ies")
    {
        &file_name[..cut]
    } else {
        file_name
    }
}

/// The luminaires available for calculation, most recently loaded first.
pub struct Library {
    entries: Vec<Arc<Luminaire>>,
    uploads: u32,
    /// Id each file path was loaded under by `resolve`.
    by_path: HashMap<PathBuf, String>,
}

impl Library {
    /// The built-in demo luminaires, baked in at compile time.
    pub fn demo() -> Self {
        let demo: Vec<Luminaire> =
            photometry_data_macro::luminaire_table!("data/luminaires.toml").to_vec();
        Self::from_luminaires(demo)
    }

    pub fn from_luminaires(luminaires: Vec<Luminaire>) -> Self {
        Self {
            entries: luminaires.into_iter().map(Arc::new).collect(),
            uploads: 0,
            by_path: HashMap::new(),
        }
    }

    /// Load a catalog from disk in place of the demo set.
    pub fn from_catalog(path: &Path) -> anyhow::Result<Self> {
        let luminaires = photometry_data::load_catalog_from_file(path)
            .with_context(|| format!("loading catalog {}", path.display()))?;
        tracing::info!(path = %path.display(), count = luminaires.len(), "catalog loaded");
        Ok(Self::from_luminaires(luminaires))
    }

    pub fn entries(&self) -> &[Arc<Luminaire>] {
        &self.entries
    }

    pub fn first(&self) -> Option<Arc<Luminaire>> {
        self.entries.first().cloned()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Luminaire>> {
        self.entries.iter().find(|l| l.id == id).cloned()
    }

    /// Entries ordered by name, with digit runs compared numerically.
    pub fn sorted_by_name(&self) -> Vec<Arc<Luminaire>> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| natord::compare_ignore_case(&a.name, &b.name));
        sorted
    }

    /// Parse IES text and put the result at the front of the library.
    ///
    /// On a parse error the library is left as it was.
    pub fn add_ies_text(
        &mut self,
        file_name: &str,
        text: &str,
    ) -> Result<Arc<Luminaire>, ParseError> {
        let file = parse_ies(text)?;
        self.uploads += 1;
        let luminaire = Arc::new(Luminaire::from_ies(
            format!("upload-{}", self.uploads),
            display_name(file_name),
            UPLOAD_DESCRIPTION,
            file,
        ));
        self.entries.insert(0, luminaire.clone());
        tracing::info!(id = %luminaire.id, name = %luminaire.name, "luminaire added");
        Ok(luminaire)
    }

    pub fn load_file(&mut self, path: &Path) -> anyhow::Result<Arc<Luminaire>> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.add_ies_text(&file_name, &text)
            .with_context(|| format!("parsing {}", path.display()))
    }

    /// Look `reference` up as a library id, falling back to loading it as a
    /// path. A path is only loaded once; later lookups return the same entry.
    pub fn resolve(&mut self, reference: &str) -> anyhow::Result<Arc<Luminaire>> {
        if let Some(found) = self.get(reference) {
            return Ok(found);
        }
        let path = PathBuf::from(reference);
        if let Some(found) = self.by_path.get(&path).and_then(|id| self.get(id)) {
            return Ok(found);
        }
        if path.exists() {
            let luminaire = self.load_file(&path)?;
            self.by_path.insert(path, luminaire.id.clone());
            return Ok(luminaire);
        }
        anyhow::bail!("no luminaire with id '{reference}' and no such file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_IES: &str = "IESNA:LM-63-2002\nTILT=NONE\n1 1000 1 2 1 1 1 0 0 0\n0 90\n0\n100 50\n";

    #[test]
    fn demo_library_has_the_baked_catalog() {
        let lib = Library::demo();
        let ids: Vec<&str> = lib.entries().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["wide-batwing", "narrow-beam", "symmetric-soft"]);
        for l in lib.entries() {
            assert!(l.lumens > 0.0, "{}", l.id);
            assert!(l.photometry.max_candela() > 0.0, "{}", l.id);
        }
    }

    #[test]
    fn uploads_are_prepended_with_stripped_names() {
        let mut lib = Library::demo();
        let added = lib.add_ies_text("Office Panel.IES", SMALL_IES).unwrap();
        assert_eq!(added.id, "upload-1");
        assert_eq!(added.name, "Office Panel");
        assert_eq!(added.description, "Uploaded IES file");
        assert_eq!(added.lumens, 1000.0);
        assert_eq!(lib.entries()[0].id, "upload-1");
        assert_eq!(lib.entries().len(), 4);

        let second = lib.add_ies_text("panel.txt", SMALL_IES).unwrap();
        assert_eq!(second.id, "upload-2");
        assert_eq!(second.name, "panel.txt");
    }

    #[test]
    fn failed_upload_leaves_library_untouched() {
        let mut lib = Library::demo();
        let err = lib.add_ies_text("broken.ies", "no tilt here").unwrap_err();
        assert_eq!(err, ParseError::MissingTilt);
        assert_eq!(lib.entries().len(), 3);
        assert_eq!(lib.entries()[0].id, "wide-batwing");

        // The counter only advances on success.
        assert_eq!(lib.add_ies_text("ok.ies", SMALL_IES).unwrap().id, "upload-1");
    }

    #[test]
    fn names_sort_naturally() {
        let mut lib = Library::from_luminaires(Vec::new());
        for name in ["Panel 10.ies", "panel 9.ies", "Downlight.ies"] {
            lib.add_ies_text(name, SMALL_IES).unwrap();
        }
        let names: Vec<String> = lib.sorted_by_name().iter().map(|l| l.name.clone()).collect();
        assert_eq!(names, ["Downlight", "panel 9", "Panel 10"]);
    }

    #[test]
    fn resolve_prefers_ids() {
        let mut lib = Library::demo();
        assert_eq!(lib.resolve("narrow-beam").unwrap().id, "narrow-beam");
        assert!(lib.resolve("does-not-exist").is_err());
    }

    #[test]
    fn resolving_a_path_twice_reuses_the_upload() {
        let dir = std::env::temp_dir().join(format!("luxlab-resolve-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("Corridor.ies");
        std::fs::write(&path, SMALL_IES).unwrap();
        let reference = path.to_string_lossy().into_owned();

        let mut lib = Library::demo();
        let first = lib.resolve(&reference).unwrap();
        let again = lib.resolve(&reference).unwrap();
        assert_eq!(first.id, "upload-1");
        assert_eq!(again.id, "upload-1");
        assert_eq!(first.name, "Corridor");
        assert_eq!(lib.entries().len(), 4);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn short_names_are_kept() {
        assert_eq!(display_name("ies"), "ies");
        assert_eq!(display_name(".ies"), "");
        assert_eq!(display_name("lámpara.ies"), "lámpara");
    }
}
