//! Series normalization
//!
//! Turns the raw, unsorted metric rows of an analysis into a chart-ready
//! series without knowing the metric names in advance.

use serde::Serialize;

use crate::models::{AnalysisResult, MetricRecord};

/// Metric rows that carry at least one active reading, in ascending date order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedSeries(Vec<MetricRecord>);

impl NormalizedSeries {
    pub fn records(&self) -> &[MetricRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First and last dates of the series
    pub fn date_range(&self) -> Option<(&str, &str)> {
        Some((self.0.first()?.date.as_str(), self.0.last()?.date.as_str()))
    }
}

/// Normalize an analysis' metric series.
///
/// With backend-declared keys, rows lacking a reading for every key are
/// dropped. Without them nothing can be judged uninformative and every row is
/// kept. Rows are then stable-sorted by calendar date; rows with unparseable
/// dates go last in their original order. Values pass through untouched.
pub fn normalize(raw: &AnalysisResult) -> NormalizedSeries {
    let keys = raw.active_metric_keys();

    let mut records: Vec<MetricRecord> = raw
        .metrics
        .iter()
        .filter(|record| keys.map_or(true, |k| record.has_any_value(k)))
        .cloned()
        .collect();

    // sort_by_key is stable, so same-day rows keep their relative order
    records.sort_by_key(|record| match record.parsed_date() {
        Some(date) => (false, Some(date)),
        None => (true, None),
    });

    NormalizedSeries(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(keys: Option<&[&str]>, metrics: Vec<MetricRecord>) -> AnalysisResult {
        AnalysisResult {
            available_metrics: keys.map(|k| k.iter().map(|s| s.to_string()).collect()),
            metrics,
            ..Default::default()
        }
    }

    fn dates(series: &NormalizedSeries) -> Vec<&str> {
        series.records().iter().map(|r| r.date.as_str()).collect()
    }

    #[test]
    fn test_drops_null_only_rows_and_sorts() {
        let raw = analysis(
            Some(&["hr"]),
            vec![
                MetricRecord::new("2024-02-01").with("hr", Some(70.0)),
                MetricRecord::new("2024-01-01").with("hr", None),
                MetricRecord::new("2024-01-01").with("hr", Some(72.0)),
            ],
        );

        let series = normalize(&raw);
        assert_eq!(series.len(), 2);
        assert_eq!(series.records()[0], MetricRecord::new("2024-01-01").with("hr", Some(72.0)));
        assert_eq!(series.records()[1], MetricRecord::new("2024-02-01").with("hr", Some(70.0)));
    }

    #[test]
    fn test_ties_keep_original_order() {
        let raw = analysis(
            Some(&["a", "b"]),
            vec![
                MetricRecord::new("2024-03-01").with("a", Some(1.0)),
                MetricRecord::new("2024-01-01").with("b", Some(2.0)),
                MetricRecord::new("2024-01-01").with("a", Some(3.0)),
                MetricRecord::new("2024-01-01").with("b", Some(4.0)),
            ],
        );

        let series = normalize(&raw);
        let values: Vec<Option<f64>> = series
            .records()
            .iter()
            .map(|r| r.value("a").or(r.value("b")))
            .collect();
        assert_eq!(values, vec![Some(2.0), Some(3.0), Some(4.0), Some(1.0)]);
    }

    #[test]
    fn test_extra_fields_do_not_qualify_but_are_preserved() {
        let raw = analysis(
            Some(&["hr"]),
            vec![
                MetricRecord::new("2024-01-02").with("hr", None).with("weight", Some(80.0)),
                MetricRecord::new("2024-01-01").with("hr", Some(60.0)).with("weight", Some(81.0)),
            ],
        );

        let series = normalize(&raw);
        assert_eq!(series.len(), 1);
        assert_eq!(series.records()[0].value("weight"), Some(81.0));
    }

    #[test]
    fn test_zero_is_a_reading() {
        let raw = analysis(
            Some(&["steps"]),
            vec![MetricRecord::new("2024-01-01").with("steps", Some(0.0))],
        );
        assert_eq!(normalize(&raw).len(), 1);
    }

    #[test]
    fn test_legacy_mode_keeps_every_row() {
        let raw = analysis(
            None,
            vec![
                MetricRecord::new("2024-05-01"),
                MetricRecord::new("2024-04-01").with("blood_sugar", None),
            ],
        );

        let series = normalize(&raw);
        assert_eq!(dates(&series), vec!["2024-04-01", "2024-05-01"]);

        let declared_empty = analysis(Some(&[]), vec![MetricRecord::new("2024-05-01")]);
        assert_eq!(normalize(&declared_empty).len(), 1);
    }

    #[test]
    fn test_empty_metrics() {
        let raw = analysis(Some(&["hr"]), Vec::new());
        assert!(normalize(&raw).is_empty());
    }

    #[test]
    fn test_unparseable_dates_sort_last() {
        let raw = analysis(
            None,
            vec![
                MetricRecord::new("Unknown Date"),
                MetricRecord::new("2024-02-01"),
                MetricRecord::new("sometime"),
                MetricRecord::new("2024-01-15T08:00:00Z"),
            ],
        );

        let series = normalize(&raw);
        assert_eq!(
            dates(&series),
            vec!["2024-01-15T08:00:00Z", "2024-02-01", "Unknown Date", "sometime"]
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = analysis(
            Some(&["sys", "dia"]),
            vec![
                MetricRecord::new("2024-03-01").with("sys", Some(130.0)),
                MetricRecord::new("2024-01-01").with("dia", Some(80.0)),
                MetricRecord::new("2024-02-01").with("sys", None).with("dia", None),
                MetricRecord::new("2024-01-01").with("sys", Some(120.0)),
            ],
        );

        let once = normalize(&raw);
        let renormalized = AnalysisResult {
            metrics: once.records().to_vec(),
            ..raw.clone()
        };
        let twice = normalize(&renormalized);
        assert_eq!(once, twice);
        assert_eq!(once.date_range(), Some(("2024-01-01", "2024-03-01")));
    }
}
