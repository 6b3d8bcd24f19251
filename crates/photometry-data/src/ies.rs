//! Tolerant reader for IES LM-63 photometric files.
//!
//! Layout of the part after the keyword block:
//!
//! ```text
//! TILT=NONE | TILT=INCLUDE
//! [if INCLUDE] count, count tilt angles, count multipliers
//! lamps lumens/lamp multiplier Nv Nh photometric-type units width length height
//! [optional] ballast-factor ballast-lamp-factor input-watts
//! Nv vertical angles
//! Nh horizontal angles
//! Nh x Nv candela values, one horizontal plane after another
//! ```
//!
//! Numbers may be wrapped or packed arbitrarily, so everything after the TILT
//! line is flattened into one token stream and consumed positionally.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::PhotometricDistribution;
use crate::tokenize::tokenize_numbers;

/// Slack allowed when checking that angle tables never decrease.
const MONOTONIC_EPSILON: f64 = 1e-6;

/// Number of values in the optional ballast block.
const BALLAST_BLOCK_LEN: usize = 3;

// --- Header types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TiltMode {
    None,
    Include,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum PhotometricType {
    #[strum(serialize = "Type C")]
    C,
    #[strum(serialize = "Type B")]
    B,
    #[strum(serialize = "Type A")]
    A,
    #[strum(serialize = "Unknown")]
    Unknown,
}

impl PhotometricType {
    fn from_code(code: f64) -> Self {
        match code.round() as i64 {
            1 => PhotometricType::C,
            2 => PhotometricType::B,
            3 => PhotometricType::A,
            _ => PhotometricType::Unknown,
        }
    }
}

/// Unit of the luminous-opening dimensions. Geometry elsewhere is always meters;
/// this is recorded for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum UnitsType {
    Feet,
    Meters,
}

impl UnitsType {
    fn from_code(code: f64) -> Self {
        if code == 1.0 {
            UnitsType::Meters
        } else {
            UnitsType::Feet
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallastBlock {
    pub ballast_factor: f64,
    pub ballast_lamp_factor: f64,
    pub input_watts: f64,
}

/// The fixed numeric header that precedes the angle tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotometricHeader {
    pub tilt: TiltMode,
    pub lamp_count: f64,
    pub lumens_per_lamp: f64,
    pub candela_multiplier: f64,
    pub vertical_count: usize,
    pub horizontal_count: usize,
    pub photometric_type: PhotometricType,
    pub units: UnitsType,
    pub width: f64,
    pub length: f64,
    pub height: f64,
    pub ballast: Option<BallastBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiltTable {
    pub angles: Vec<f64>,
    pub multipliers: Vec<f64>,
}

/// Everything recovered from one LM-63 file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IesFile {
    pub photometry: PhotometricDistribution,
    pub header: PhotometricHeader,
    pub tilt: Option<TiltTable>,
    /// Rated lumens, or the peak candela when the file uses absolute photometry.
    pub total_lumens: f64,
    pub max_candela: f64,
}

// --- Errors ---

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Empty,
    MissingTilt,
    UnsupportedTilt(String),
    InsufficientValues {
        label: &'static str,
        expected: usize,
        found: usize,
    },
    InvalidCount {
        label: &'static str,
        value: f64,
    },
    NonMonotonicAngles,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Empty => write!(f, "Empty file"),
            ParseError::MissingTilt => write!(f, "Missing TILT specification"),
            ParseError::UnsupportedTilt(value) => write!(f, "Unsupported TILT type: {value}"),
            ParseError::InsufficientValues {
                label,
                expected,
                found,
            } => write!(f, "Expected {expected} values for {label} but found {found}"),
            ParseError::InvalidCount { label, value } => write!(f, "Invalid {label}: {value}"),
            ParseError::NonMonotonicAngles => write!(f, "Angles must be monotonic increasing"),
        }
    }
}

impl std::error::Error for ParseError {}

// --- Token cursor ---

/// Forward-only reader over the flattened numeric tokens.
struct TokenCursor<'a> {
    tokens: &'a [f64],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    fn new(tokens: &'a [f64]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.tokens.len() - self.pos
    }

    fn take(&mut self, count: usize, label: &'static str) -> Result<&'a [f64], ParseError> {
        let found = self.remaining();
        if count > found {
            return Err(ParseError::InsufficientValues {
                label,
                expected: count,
                found,
            });
        }
        let slice = &self.tokens[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self, label: &'static str) -> Result<[f64; N], ParseError> {
        let mut out = [0.0; N];
        out.copy_from_slice(self.take(N, label)?);
        Ok(out)
    }

    fn take_count(&mut self, label: &'static str) -> Result<usize, ParseError> {
        let [value] = self.take_array(label)?;
        to_count(value, label)
    }
}

fn to_count(value: f64, label: &'static str) -> Result<usize, ParseError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ParseError::InvalidCount { label, value });
    }
    Ok(value.round() as usize)
}

// --- Parsing ---

fn is_tilt_line(line: &str) -> bool {
    line.get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("TILT="))
}

fn parse_tilt_mode(line: &str) -> Result<TiltMode, ParseError> {
    let spec: String = line
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let value = spec.split('=').nth(1).unwrap_or_default();
    if value.is_empty() {
        return Ok(TiltMode::None);
    }
    value
        .parse()
        .map_err(|_| ParseError::UnsupportedTilt(value.to_string()))
}

/// Collect `[KEY] value` keyword lines into a map. Later keys overwrite earlier ones.
fn collect_keywords(lines: &[&str]) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    for line in lines {
        if line.starts_with('[')
            && let Some(close) = line.find(']')
        {
            let key = line[1..close].trim();
            let value = line[close + 1..].trim();
            metadata.insert(key.to_string(), value.to_string());
        }
    }
    metadata
}

/// Scale a horizontal plane by tilt multipliers.
///
/// When the plane has exactly one sample per multiplier they are applied
/// element-wise; otherwise only the first multiplier is applied to the whole row.
fn apply_tilt(row: &mut [f64], multipliers: &[f64]) {
    let Some(&first) = multipliers.first() else {
        return;
    };
    if row.len() == multipliers.len() {
        for (value, m) in row.iter_mut().zip(multipliers) {
            *value *= m;
        }
    } else {
        for value in row.iter_mut() {
            *value *= first;
        }
    }
}

fn is_monotonic(values: &[f64]) -> bool {
    values
        .windows(2)
        .all(|pair| pair[1] + MONOTONIC_EPSILON >= pair[0])
}

/// Parse the text of an LM-63 file.
///
/// Fails on the first structural problem, in the order fields are consumed.
pub fn parse_ies(text: &str) -> Result<IesFile, ParseError> {
    let normalized = text.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.split('\n').map(str::trim).collect();
    if lines.iter().all(|line| line.is_empty()) {
        return Err(ParseError::Empty);
    }

    let tilt_index = lines
        .iter()
        .position(|line| is_tilt_line(line))
        .ok_or(ParseError::MissingTilt)?;
    let mut metadata = collect_keywords(&lines[..tilt_index]);
    let tilt_mode = parse_tilt_mode(lines[tilt_index])?;

    let tokens = tokenize_numbers(&lines[tilt_index + 1..]);
    let mut cursor = TokenCursor::new(&tokens);

    let tilt = match tilt_mode {
        TiltMode::None => None,
        TiltMode::Include => {
            let count = cursor.take_count("tilt angle count")?;
            let angles = cursor.take(count, "tilt angles")?.to_vec();
            let multipliers = cursor.take(count, "tilt multipliers")?.to_vec();
            Some(TiltTable {
                angles,
                multipliers,
            })
        }
    };

    let [
        lamp_count,
        lumens_per_lamp,
        candela_multiplier,
        vertical_raw,
        horizontal_raw,
        photometric_code,
        units_code,
        width,
        length,
        height,
    ] = cursor.take_array("header")?;
    let nv = to_count(vertical_raw, "vertical angle count")?;
    let nh = to_count(horizontal_raw, "horizontal angle count")?;
    let table_len = nv.saturating_mul(nh);

    // The ballast block has no marker; it is present only when there are
    // enough values left over for it after the angle and candela tables.
    let expected_core = nv.saturating_add(nh).saturating_add(table_len);
    let ballast = if cursor.remaining() >= expected_core.saturating_add(BALLAST_BLOCK_LEN) {
        let [ballast_factor, ballast_lamp_factor, input_watts] =
            cursor.take_array("ballast block")?;
        Some(BallastBlock {
            ballast_factor,
            ballast_lamp_factor,
            input_watts,
        })
    } else {
        None
    };

    let vertical_angles = cursor.take(nv, "vertical angles")?.to_vec();
    let horizontal_angles = cursor.take(nh, "horizontal angles")?.to_vec();
    let raw = cursor.take(table_len, "candela values")?;

    let multipliers = tilt.as_ref().map_or(&[][..], |t| &t.multipliers[..]);
    let candela: Vec<Vec<f64>> = (0..nh)
        .map(|h| {
            let mut row: Vec<f64> = raw[h * nv..(h + 1) * nv]
                .iter()
                .map(|v| v * candela_multiplier)
                .collect();
            apply_tilt(&mut row, multipliers);
            for value in &mut row {
                *value = value.max(0.0);
            }
            row
        })
        .collect();

    if !is_monotonic(&vertical_angles) || !is_monotonic(&horizontal_angles) {
        return Err(ParseError::NonMonotonicAngles);
    }

    let photometric_type = PhotometricType::from_code(photometric_code);
    let units = UnitsType::from_code(units_code);
    metadata.insert("photometric_type".into(), photometric_code.to_string());
    metadata.insert("units".into(), units.to_string());
    metadata.insert("dimensions".into(), format!("{width}x{length}x{height}"));

    let rated_lumens = (lumens_per_lamp > 0.0).then(|| lamp_count * lumens_per_lamp);
    let photometry = PhotometricDistribution {
        vertical_angles,
        horizontal_angles,
        candela,
        metadata,
        total_lumens: rated_lumens,
    };
    let max_candela = photometry.max_candela();

    tracing::debug!(
        vertical = nv,
        horizontal = nh,
        %tilt_mode,
        ballast = ballast.is_some(),
        max_candela,
        "parsed LM-63 photometry"
    );

    Ok(IesFile {
        header: PhotometricHeader {
            tilt: tilt_mode,
            lamp_count,
            lumens_per_lamp,
            candela_multiplier,
            vertical_count: nv,
            horizontal_count: nh,
            photometric_type,
            units,
            width,
            length,
            height,
            ballast,
        },
        tilt,
        total_lumens: rated_lumens.unwrap_or(max_candela),
        max_candela,
        photometry,
    })
}

/// Read and parse an LM-63 file from disk.
pub fn load_ies_from_file(path: &Path) -> Result<IesFile, Box<dyn std::error::Error + Send + Sync>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(parse_ies(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
IESNA:LM-63-2002
[TEST] Sample
[MANUFAC] Acme Lighting
TILT=NONE
1 3000 1 3 2 1 1 0.3 0.8 0.2
0 45 90
0 90
100 50 10
120 60 15";

    const TILT_SAMPLE: &str = "\
IESNA:LM-63-2002
[TEST] Tilt include
TILT=INCLUDE
3
0 45 90
1 0.9 0.8
1 2000 1 3 1 1 1 0.3 1.2 0.1
0 45 90
0
500 400 300";

    #[test]
    fn parses_counts_and_lumens() {
        let file = parse_ies(SAMPLE).unwrap();
        assert_eq!(file.total_lumens, 3000.0);
        assert_eq!(file.photometry.total_lumens, Some(3000.0));
        assert_eq!(file.photometry.vertical_angles, vec![0.0, 45.0, 90.0]);
        assert_eq!(file.photometry.horizontal_angles, vec![0.0, 90.0]);
        assert_eq!(file.photometry.candela.len(), 2);
        assert!(file.photometry.candela.iter().all(|row| row.len() == 3));
        assert_eq!(file.photometry.candela[0][0], 100.0);
        assert_eq!(file.photometry.candela[1][2], 15.0);
        assert_eq!(file.max_candela, 120.0);
    }

    #[test]
    fn keywords_and_header_land_in_metadata() {
        let file = parse_ies(SAMPLE).unwrap();
        let meta = &file.photometry.metadata;
        assert_eq!(meta["TEST"], "Sample");
        assert_eq!(meta["MANUFAC"], "Acme Lighting");
        assert_eq!(meta["units"], "meters");
        assert_eq!(meta["photometric_type"], "1");
        assert_eq!(meta["dimensions"], "0.3x0.8x0.2");
        assert_eq!(file.header.photometric_type, PhotometricType::C);
        assert_eq!(file.header.units, UnitsType::Meters);
        assert_eq!(file.header.tilt, TiltMode::None);
        assert!(file.tilt.is_none());
    }

    #[test]
    fn units_code_other_than_one_is_feet() {
        let text = SAMPLE.replace("1 3000 1 3 2 1 1 ", "1 3000 1 3 2 1 2 ");
        let file = parse_ies(&text).unwrap();
        assert_eq!(file.header.units, UnitsType::Feet);
        assert_eq!(file.photometry.metadata["units"], "feet");
    }

    #[test]
    fn tilt_include_applies_multipliers_by_index() {
        let file = parse_ies(TILT_SAMPLE).unwrap();
        assert_eq!(file.total_lumens, 2000.0);
        assert_eq!(file.photometry.vertical_angles, vec![0.0, 45.0, 90.0]);
        assert_eq!(file.photometry.horizontal_angles, vec![0.0]);
        let row = &file.photometry.candela[0];
        assert!((row[0] - 500.0).abs() < 1e-9);
        assert!((row[1] - 360.0).abs() < 1e-9);
        assert!((row[2] - 240.0).abs() < 1e-9);
        let tilt = file.tilt.unwrap();
        assert_eq!(tilt.angles, vec![0.0, 45.0, 90.0]);
        assert_eq!(tilt.multipliers, vec![1.0, 0.9, 0.8]);
    }

    #[test]
    fn tilt_include_with_mismatched_row_uses_first_multiplier() {
        let text = "\
TILT=INCLUDE
2
0 90
0.5 0.25
1 1000 2 3 1 1 1 0 0 0
0 45 90
0
100 80 60";
        let file = parse_ies(text).unwrap();
        assert_eq!(file.photometry.candela[0], vec![100.0, 80.0, 60.0]);
    }

    #[test]
    fn tilt_include_with_zero_count_leaves_values_alone() {
        let text = "TILT=INCLUDE\n0\n1 1000 1 2 1 1 1 0 0 0\n0 90\n0\n40 20";
        let file = parse_ies(text).unwrap();
        assert_eq!(file.photometry.candela[0], vec![40.0, 20.0]);
    }

    #[test]
    fn candela_multiplier_scales_values() {
        let text = SAMPLE.replace("1 3000 1 3 2", "1 3000 2.5 3 2");
        let file = parse_ies(&text).unwrap();
        assert_eq!(file.photometry.candela[0][0], 250.0);
        assert_eq!(file.photometry.candela[1][2], 37.5);
    }

    #[test]
    fn ballast_block_is_detected_by_leftover_count() {
        let text = SAMPLE.replace("0.2\n0 45 90", "0.2\n1.0 1.0 42\n0 45 90");
        let file = parse_ies(&text).unwrap();
        let ballast = file.header.ballast.unwrap();
        assert_eq!(ballast.ballast_factor, 1.0);
        assert_eq!(ballast.input_watts, 42.0);
        assert_eq!(file.photometry.vertical_angles, vec![0.0, 45.0, 90.0]);
        assert_eq!(file.photometry.candela[1][2], 15.0);
    }

    #[test]
    fn ballast_block_absent_when_tables_fill_the_rest() {
        let file = parse_ies(SAMPLE).unwrap();
        assert!(file.header.ballast.is_none());
    }

    #[test]
    fn values_may_wrap_and_pack_across_lines() {
        let text = "TILT=NONE\n1 3000\n1 3 2 1 1 0.3 0.8 0.2 0\n45 90 0 90 100 50\n10 120\n60\n15";
        let file = parse_ies(text).unwrap();
        assert_eq!(file.photometry.candela, vec![vec![100.0, 50.0, 10.0], vec![120.0, 60.0, 15.0]]);
    }

    #[test]
    fn crlf_and_lowercase_tilt_are_accepted() {
        let text = SAMPLE.replace("TILT=NONE", "tilt=none").replace('\n', "\r\n");
        let file = parse_ies(&text).unwrap();
        assert_eq!(file.photometry.candela[1][2], 15.0);
    }

    #[test]
    fn blank_tilt_value_means_none() {
        let text = SAMPLE.replace("TILT=NONE", "TILT=");
        assert!(parse_ies(&text).is_ok());
    }

    #[test]
    fn absolute_photometry_reports_peak_candela() {
        let text = SAMPLE.replace("1 3000 1 3 2", "1 -1 1 3 2");
        let file = parse_ies(&text).unwrap();
        assert_eq!(file.photometry.total_lumens, None);
        assert_eq!(file.total_lumens, 120.0);
    }

    #[test]
    fn negative_candela_is_floored_at_zero() {
        let text = SAMPLE.replace("100 50 10", "100 -50 10");
        let file = parse_ies(&text).unwrap();
        assert_eq!(file.photometry.candela[0][1], 0.0);
    }

    #[test]
    fn empty_text_is_rejected() {
        assert_eq!(parse_ies(""), Err(ParseError::Empty));
        assert_eq!(parse_ies(" \n \r\n"), Err(ParseError::Empty));
        assert_eq!(ParseError::Empty.to_string(), "Empty file");
    }

    #[test]
    fn missing_tilt_is_rejected() {
        let text = SAMPLE.replace("TILT=NONE\n", "");
        let err = parse_ies(&text).unwrap_err();
        assert_eq!(err, ParseError::MissingTilt);
        assert_eq!(err.to_string(), "Missing TILT specification");
    }

    #[test]
    fn unsupported_tilt_is_rejected() {
        let text = SAMPLE.replace("TILT=NONE", "TILT=BOGUS");
        let err = parse_ies(&text).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported TILT type: BOGUS");
    }

    #[test]
    fn short_header_names_the_field() {
        let err = parse_ies("TILT=NONE\n1 3000 1 3").unwrap_err();
        assert_eq!(err.to_string(), "Expected 10 values for header but found 4");
    }

    #[test]
    fn short_candela_table_names_the_field() {
        let text = SAMPLE.replace("120 60 15", "120 60");
        let err = parse_ies(&text).unwrap_err();
        assert_eq!(
            err,
            ParseError::InsufficientValues {
                label: "candela values",
                expected: 6,
                found: 5,
            }
        );
    }

    #[test]
    fn short_tilt_block_names_the_field() {
        let err = parse_ies("TILT=INCLUDE\n3\n0 45 90\n1 0.9").unwrap_err();
        assert_eq!(err.to_string(), "Expected 3 values for tilt multipliers but found 2");
    }

    #[test]
    fn negative_count_is_rejected() {
        let text = SAMPLE.replace("1 3000 1 3 2", "1 3000 1 -3 2");
        let err = parse_ies(&text).unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidCount {
                label: "vertical angle count",
                ..
            }
        ));
    }

    #[test]
    fn decreasing_vertical_angles_are_rejected() {
        let text = SAMPLE.replace("0 45 90\n0 90", "0 90 45\n0 90");
        let err = parse_ies(&text).unwrap_err();
        assert_eq!(err, ParseError::NonMonotonicAngles);
        assert_eq!(err.to_string(), "Angles must be monotonic increasing");
    }

    #[test]
    fn decreasing_horizontal_angles_are_rejected() {
        let text = SAMPLE.replace("0 45 90\n0 90", "0 45 90\n90 0");
        assert_eq!(parse_ies(&text), Err(ParseError::NonMonotonicAngles));
    }

    #[test]
    fn repeated_angles_are_allowed() {
        let text = SAMPLE.replace("0 45 90\n0 90", "0 45 45\n0 90");
        assert!(parse_ies(&text).is_ok());
    }
}
