//! Chart projection
//!
//! Maps discovered metric keys to per-series drawing instructions. Colors are
//! assigned by a key's position in the ordered key list, never by its name,
//! so the same ordered set always draws the same way.

use serde::{Serialize, Serializer};

use super::normalizer::NormalizedSeries;

/// An sRGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesColor(pub u8, pub u8, pub u8);

impl SeriesColor {
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl Serialize for SeriesColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

/// Series palette, cycled by key index
pub const PALETTE: [SeriesColor; 8] = [
    SeriesColor(0x88, 0x84, 0xd8), // violet
    SeriesColor(0x82, 0xca, 0x9d), // green
    SeriesColor(0xff, 0xc6, 0x58), // amber
    SeriesColor(0xff, 0x73, 0x00), // orange
    SeriesColor(0x00, 0x88, 0xfe), // blue
    SeriesColor(0x00, 0xc4, 0x9f), // teal
    SeriesColor(0xff, 0xbb, 0x28), // yellow
    SeriesColor(0xff, 0x80, 0x42), // coral
];

/// Series drawn when the analysis declares no metric keys
// TODO: confirm with product whether pre-`available_metrics` payloads still exist; drop this if not.
pub const LEGACY_SERIES: [(&str, &str); 2] = [
    ("blood_sugar", "Blood Sugar"),
    ("blood_pressure", "Blood Pressure"),
];

const STROKE_WIDTH: u32 = 2;

/// Drawing instructions for one metric line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSpec {
    pub key: String,
    pub display_name: String,
    pub color: SeriesColor,
    pub gradient_id: String,
    pub stroke_width: u32,
    /// Bridge missing readings instead of breaking the line
    pub connect_nulls: bool,
}

impl SeriesSpec {
    fn at(index: usize, key: &str, display_name: &str) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            color: color_for_index(index),
            gradient_id: format!("color-{}", index),
            stroke_width: STROKE_WIDTH,
            connect_nulls: true,
        }
    }
}

pub fn color_for_index(index: usize) -> SeriesColor {
    PALETTE[index % PALETTE.len()]
}

/// Project metric keys into series specs.
///
/// The series itself does not influence the projection; it is accepted so the
/// call site reads as "project this series with these keys".
pub fn project<S: AsRef<str>>(_series: &NormalizedSeries, keys: &[S]) -> Vec<SeriesSpec> {
    if keys.is_empty() {
        return LEGACY_SERIES
            .iter()
            .enumerate()
            .map(|(i, (key, name))| SeriesSpec::at(i, key, name))
            .collect();
    }

    keys.iter()
        .enumerate()
        .map(|(i, key)| SeriesSpec::at(i, key.as_ref(), key.as_ref()))
        .collect()
}

/// Drawable runs of `(row index, value)` points for one series.
///
/// Rows without a reading contribute no point. With `connect_nulls` every
/// point lands in a single run; otherwise a missing reading ends the run.
pub fn segments(series: &NormalizedSeries, spec: &SeriesSpec) -> Vec<Vec<(usize, f64)>> {
    let mut runs: Vec<Vec<(usize, f64)>> = Vec::new();
    let mut current: Vec<(usize, f64)> = Vec::new();

    for (i, record) in series.records().iter().enumerate() {
        match record.value(&spec.key) {
            Some(v) => current.push((i, v)),
            None if !spec.connect_nulls && !current.is_empty() => {
                runs.push(std::mem::take(&mut current));
            }
            None => {}
        }
    }

    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Padded y-axis range over every projected series
pub fn value_range(series: &NormalizedSeries, specs: &[SeriesSpec]) -> Option<(f64, f64)> {
    let values = series
        .records()
        .iter()
        .flat_map(|r| specs.iter().filter_map(move |s| r.value(&s.key)));

    let (min, max) = values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        None => Some((v, v)),
    })?;

    let pad = if max > min { (max - min) * 0.1 } else { min.abs().max(1.0) * 0.1 };
    Some((min - pad, max + pad))
}
