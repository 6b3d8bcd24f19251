use std::path::PathBuf;

use proc_macro::TokenStream;
use syn::{LitStr, parse_macro_input};

use photometry_data::{Luminaire, PhotometricDistribution};

fn format_f64(v: f64) -> String {
    if v.is_nan() {
        "f64::NAN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "f64::INFINITY" } else { "f64::NEG_INFINITY" }.to_string()
    } else {
        format!("{v:?}_f64")
    }
}

fn format_values(values: &[f64]) -> String {
    let inner: Vec<String> = values.iter().map(|v| format_f64(*v)).collect();
    format!("vec![{}]", inner.join(", "))
}

fn format_distribution(d: &PhotometricDistribution) -> String {
    let rows: Vec<String> = d.candela.iter().map(|row| format_values(row)).collect();
    let metadata: Vec<String> = d
        .metadata
        .iter()
        .map(|(k, v)| format!("(String::from({k:?}), String::from({v:?}))"))
        .collect();
    let total_lumens = match d.total_lumens {
        Some(v) => format!("Some({})", format_f64(v)),
        None => "None".to_string(),
    };

    format!(
        r#"photometry_data::PhotometricDistribution {{
            vertical_angles: {vertical},
            horizontal_angles: {horizontal},
            candela: vec![{rows}],
            metadata: std::collections::BTreeMap::from([{metadata}]),
            total_lumens: {total_lumens},
        }}"#,
        vertical = format_values(&d.vertical_angles),
        horizontal = format_values(&d.horizontal_angles),
        rows = rows.join(", "),
        metadata = metadata.join(", "),
    )
}

fn format_luminaire(l: &Luminaire) -> String {
    format!(
        r#"photometry_data::Luminaire {{
        id: String::from({id:?}),
        name: String::from({name:?}),
        description: String::from({description:?}),
        lumens: {lumens},
        photometry: {photometry},
    }}"#,
        id = l.id,
        name = l.name,
        description = l.description,
        lumens = format_f64(l.lumens),
        photometry = format_distribution(&l.photometry),
    )
}

/// Reads a luminaire catalog TOML file, parses every IES file it lists, and
/// expands to an array literal of `photometry_data::Luminaire` values.
///
/// A malformed IES file is a compile error. The catalog path is resolved
/// relative to the calling crate's `CARGO_MANIFEST_DIR`; IES paths inside it
/// are relative to the catalog.
///
/// The calling crate must depend on `photometry-data` for the types.
///
/// ```ignore
/// let demo: Vec<photometry_data::Luminaire> =
///     photometry_data_macro::luminaire_table!("data/luminaires.toml").to_vec();
/// ```
#[proc_macro]
pub fn luminaire_table(input: TokenStream) -> TokenStream {
    let lit = parse_macro_input!(input as LitStr);
    let path = resolve_path(&lit.value());

    let luminaires = photometry_data::load_catalog_from_file(&path)
        .unwrap_or_else(|e| panic!("Failed to load {}: {e}", path.display()));

    let entries: Vec<String> = luminaires.iter().map(format_luminaire).collect();
    let body = entries.join(",\n    ");
    let code = format!("[\n    {body}\n]");

    code.parse()
        .expect("failed to parse generated luminaire array")
}

fn resolve_path(relative: &str) -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    let path = PathBuf::from(manifest_dir).join(relative);
    assert!(
        path.exists(),
        "Luminaire catalog not found at {}",
        path.display()
    );
    path
}
