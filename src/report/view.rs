//! Insights view
//!
//! Screen routing for a session snapshot, and the rendered report surface
//! that the exporter captures.

use std::sync::Arc;

use chrono::NaiveDate;
use plotters::prelude::*;
use serde::Serialize;

use super::exporter::{Canvas, ReportSurface};
use crate::error::{InsightsError, InsightsResult};
use crate::insights::{project, segments, value_range, NormalizedSeries, SeriesSpec, SessionSnapshot, SessionState};
use crate::models::{AnalysisResult, HealthProfile, PatientId};

pub const MISSING_FIELD: &str = "—";
pub const NO_ALLERGIES: &str = "None reported";

/// Which screen a snapshot routes to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen {
    /// Prompt to run the analysis; carries the failure of a first attempt
    CallToAction { error: Option<String> },
    Loading,
    Report,
    EmptyState,
    /// A reload failed after data had been shown
    Failed { message: String },
}

pub fn screen(snapshot: &SessionSnapshot) -> Screen {
    match &snapshot.state {
        SessionState::Idle => Screen::CallToAction { error: None },
        SessionState::Loading => Screen::Loading,
        SessionState::Ready { .. } => Screen::Report,
        SessionState::Empty { .. } => Screen::EmptyState,
        SessionState::Error { message } if !snapshot.has_loaded_once => Screen::CallToAction {
            error: Some(message.clone()),
        },
        SessionState::Error { message } => Screen::Failed {
            message: message.clone(),
        },
    }
}

/// Display rows of the profile grid, placeholders filled in
pub fn profile_fields(profile: Option<&HealthProfile>) -> Vec<(&'static str, String)> {
    let text = |value: Option<&String>| {
        value
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| MISSING_FIELD.to_string())
    };

    let allergies = profile
        .and_then(|p| p.allergies.as_ref())
        .map(|list| {
            list.iter()
                .map(|a| a.trim())
                .filter(|a| !a.is_empty())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|joined| !joined.is_empty())
        .unwrap_or_else(|| NO_ALLERGIES.to_string());

    vec![
        ("Weight", text(profile.and_then(|p| p.weight.as_ref()))),
        ("Height", text(profile.and_then(|p| p.height.as_ref()))),
        ("Age", text(profile.and_then(|p| p.age.as_ref()))),
        ("Blood Group", text(profile.and_then(|p| p.blood_group.as_ref()))),
        ("Allergies", allergies),
    ]
}

/// Greedy word wrap. Words longer than a line are split; blank lines in the
/// input are kept as paragraph breaks.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.trim().lines() {
        let mut current = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let mut chars: Vec<char> = word.chars().collect();

            while chars.len() > max_chars {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = chars.split_off(max_chars);
                lines.push(chars.into_iter().collect());
                chars = rest;
            }

            let needed = if current_len == 0 { chars.len() } else { current_len + 1 + chars.len() };
            if needed > max_chars {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(chars.iter());
            current_len += chars.len();
        }

        if current_len > 0 || paragraph.trim().is_empty() {
            lines.push(current);
        }
    }

    lines
}

// Layout, in logical pixels
const WIDTH: i32 = 800;
const MARGIN: i32 = 32;
const CONTENT_WIDTH: i32 = WIDTH - 2 * MARGIN;
const HEADER_HEIGHT: i32 = 72;
const SECTION_GAP: i32 = 24;
const SECTION_TITLE_HEIGHT: i32 = 30;
const LINE_HEIGHT: i32 = 20;
const TIP_GAP: i32 = 6;
const PROFILE_ROW_HEIGHT: i32 = 56;
const CHART_HEIGHT: i32 = 320;
const NOTICE_HEIGHT: i32 = 40;
const SUMMARY_CHARS: usize = 96;
const TIP_CHARS: usize = 90;
const ALLERGY_CHARS: usize = 56;

const TEXT: RGBColor = RGBColor(241, 245, 249);
const MUTED: RGBColor = RGBColor(148, 163, 184);
const ACCENT: RGBColor = RGBColor(129, 140, 248);
const PANEL: RGBColor = RGBColor(30, 41, 59);
const GRID: RGBColor = RGBColor(51, 65, 85);

/// Vertical offsets of each section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    summary_y: i32,
    profile_y: i32,
    chart_y: i32,
    tips_y: i32,
    height: i32,
}

/// The loaded analysis laid out as a report
#[derive(Debug, Clone)]
pub struct InsightsView {
    data: Arc<AnalysisResult>,
    series: NormalizedSeries,
    specs: Vec<SeriesSpec>,
    patient_id: Option<PatientId>,
    generated_on: NaiveDate,
    summary_lines: Vec<String>,
    tip_lines: Vec<Vec<String>>,
}

impl InsightsView {
    /// View of the analysis held by the snapshot; fails when nothing has loaded
    pub fn from_snapshot(snapshot: &SessionSnapshot, generated_on: NaiveDate) -> InsightsResult<Self> {
        let (data, series) = match &snapshot.state {
            SessionState::Ready { data, series } => (data.clone(), series.clone()),
            SessionState::Empty { data } => (data.clone(), NormalizedSeries::default()),
            other => {
                return Err(InsightsError::export(format!(
                    "no insights loaded to export (session is {})",
                    other.label()
                )))
            }
        };

        let keys = data.active_metric_keys().unwrap_or(&[]);
        let specs = project(&series, keys);

        let summary_lines = if data.summary.trim().is_empty() {
            vec!["No summary available.".to_string()]
        } else {
            wrap_text(&data.summary, SUMMARY_CHARS)
        };

        let tip_lines = if data.tips.is_empty() {
            vec![vec!["No recommendations.".to_string()]]
        } else {
            data.tips
                .iter()
                .enumerate()
                .map(|(i, tip)| wrap_text(&format!("{}. {}", i + 1, tip.trim()), TIP_CHARS))
                .collect()
        };

        Ok(Self {
            data,
            series,
            specs,
            patient_id: snapshot.patient_id.clone(),
            generated_on,
            summary_lines,
            tip_lines,
        })
    }

    pub fn specs(&self) -> &[SeriesSpec] {
        &self.specs
    }

    pub fn has_chart(&self) -> bool {
        !self.series.is_empty()
    }

    fn layout(&self) -> Layout {
        let mut y = MARGIN + HEADER_HEIGHT;

        let summary_y = y;
        y += SECTION_TITLE_HEIGHT + self.summary_lines.len() as i32 * LINE_HEIGHT + SECTION_GAP;

        let profile_y = y;
        y += SECTION_TITLE_HEIGHT + 2 * PROFILE_ROW_HEIGHT + SECTION_GAP;

        let chart_y = y;
        y += SECTION_TITLE_HEIGHT + if self.has_chart() { CHART_HEIGHT } else { NOTICE_HEIGHT } + SECTION_GAP;

        let tips_y = y;
        y += SECTION_TITLE_HEIGHT;
        for lines in &self.tip_lines {
            y += lines.len() as i32 * LINE_HEIGHT + TIP_GAP;
        }

        Layout {
            summary_y,
            profile_y,
            chart_y,
            tips_y,
            height: y + MARGIN,
        }
    }

    fn draw_header(&self, root: &Canvas<'_>, scale: u32) -> Result<(), String> {
        text(root, "Health Insights Report", (MARGIN, MARGIN), 26.0, FontStyle::Bold, &TEXT, scale)?;

        let mut subtitle = format!("Generated {}", self.generated_on.format("%B %-d, %Y"));
        if let Some(patient_id) = &self.patient_id {
            subtitle.push_str(&format!("  ·  Patient {}", patient_id));
        }
        text(root, &subtitle, (MARGIN, MARGIN + 36), 13.0, FontStyle::Normal, &MUTED, scale)
    }

    fn draw_summary(&self, root: &Canvas<'_>, y: i32, scale: u32) -> Result<(), String> {
        section_title(root, "Summary", y, scale)?;
        for (i, line) in self.summary_lines.iter().enumerate() {
            let line_y = y + SECTION_TITLE_HEIGHT + i as i32 * LINE_HEIGHT;
            text(root, line, (MARGIN, line_y), 14.0, FontStyle::Normal, &TEXT, scale)?;
        }
        Ok(())
    }

    fn draw_profile(&self, root: &Canvas<'_>, y: i32, scale: u32) -> Result<(), String> {
        section_title(root, "Profile", y, scale)?;

        let column_width = CONTENT_WIDTH / 3;
        let top = y + SECTION_TITLE_HEIGHT;
        for (i, (label, value)) in profile_fields(self.data.profile.as_ref()).into_iter().enumerate() {
            let (row, column) = (i as i32 / 3, i as i32 % 3);
            // Allergies take the rest of the second row
            let span = if label == "Allergies" { 3 - column } else { 1 };

            let x = MARGIN + column * column_width;
            let cell_y = top + row * PROFILE_ROW_HEIGHT;
            rect(
                root,
                (x, cell_y),
                (x + span * column_width - 8, cell_y + PROFILE_ROW_HEIGHT - 8),
                &PANEL,
                scale,
            )?;
            text(root, label, (x + 12, cell_y + 8), 12.0, FontStyle::Normal, &MUTED, scale)?;
            text(
                root,
                &truncate(&value, ALLERGY_CHARS),
                (x + 12, cell_y + 26),
                15.0,
                FontStyle::Bold,
                &TEXT,
                scale,
            )?;
        }
        Ok(())
    }

    fn draw_chart(&self, root: &Canvas<'_>, y: i32, scale: u32) -> Result<(), String> {
        section_title(root, "Trends", y, scale)?;
        let top = y + SECTION_TITLE_HEIGHT;

        if !self.has_chart() {
            return text(
                root,
                "No trend data available yet.",
                (MARGIN, top + 8),
                14.0,
                FontStyle::Normal,
                &MUTED,
                scale,
            );
        }

        let s = scale as i32;
        let area = root
            .clone()
            .shrink((MARGIN * s, top * s), (CONTENT_WIDTH * s, CHART_HEIGHT * s));
        area.fill(&PANEL).map_err(|e| e.to_string())?;

        let records = self.series.records();
        let (y_min, y_max) = value_range(&self.series, &self.specs).unwrap_or((0.0, 1.0));
        let x_range = -0.5..(records.len() as f64 - 0.5);
        let label_font = FontDesc::new(FontFamily::SansSerif, 12.0 * scale as f64, FontStyle::Normal);

        let mut chart = ChartBuilder::on(&area)
            .margin(12 * scale)
            .x_label_area_size(28 * scale)
            .y_label_area_size(48 * scale)
            .build_cartesian_2d(x_range, y_min..y_max)
            .map_err(|e| e.to_string())?;

        let x_label = |x: &f64| {
            let index = x.round();
            if (x - index).abs() > 1e-6 || index < 0.0 {
                return String::new();
            }
            records
                .get(index as usize)
                .map(|r| match r.parsed_date() {
                    Some(date) => date.format("%b %d").to_string(),
                    None => r.date.clone(),
                })
                .unwrap_or_default()
        };

        chart
            .configure_mesh()
            .light_line_style(&TRANSPARENT)
            .bold_line_style(ShapeStyle::from(&GRID).stroke_width(scale))
            .axis_style(ShapeStyle::from(&MUTED).stroke_width(scale))
            .x_labels(records.len().min(8))
            .x_label_formatter(&x_label)
            .y_label_formatter(&|v| format!("{:.0}", v))
            .label_style(label_font.clone().color(&MUTED))
            .draw()
            .map_err(|e| e.to_string())?;

        let legend_width = (20 * scale) as i32;
        let mut labelled = false;
        for spec in &self.specs {
            let color = RGBColor(spec.color.0, spec.color.1, spec.color.2);
            let stroke = color.stroke_width(spec.stroke_width * scale);

            for (run_index, run) in segments(&self.series, spec).into_iter().enumerate() {
                let points: Vec<(f64, f64)> = run.iter().map(|(i, v)| (*i as f64, *v)).collect();

                chart
                    .draw_series(AreaSeries::new(points.clone(), y_min, color.mix(0.15)))
                    .map_err(|e| e.to_string())?;

                let line = chart
                    .draw_series(LineSeries::new(points.clone(), stroke))
                    .map_err(|e| e.to_string())?;
                if run_index == 0 {
                    line.label(spec.display_name.clone())
                        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + legend_width, y)], stroke));
                    labelled = true;
                }

                chart
                    .draw_series(points.iter().map(|p| Circle::new(*p, 3 * scale, color.filled())))
                    .map_err(|e| e.to_string())?;
            }
        }

        if labelled {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(PANEL.mix(0.9))
                .border_style(GRID)
                .label_font(label_font.color(&TEXT))
                .draw()
                .map_err(|e| e.to_string())?;
        }

        Ok(())
    }

    fn draw_tips(&self, root: &Canvas<'_>, y: i32, scale: u32) -> Result<(), String> {
        section_title(root, "Recommendations", y, scale)?;

        let mut line_y = y + SECTION_TITLE_HEIGHT;
        for lines in &self.tip_lines {
            for line in lines {
                text(root, line, (MARGIN, line_y), 14.0, FontStyle::Normal, &TEXT, scale)?;
                line_y += LINE_HEIGHT;
            }
            line_y += TIP_GAP;
        }
        Ok(())
    }
}

impl ReportSurface for InsightsView {
    fn size(&self) -> (u32, u32) {
        (WIDTH as u32, self.layout().height as u32)
    }

    fn draw(&self, root: &Canvas<'_>, scale: u32) -> Result<(), String> {
        let layout = self.layout();
        self.draw_header(root, scale)?;
        self.draw_summary(root, layout.summary_y, scale)?;
        self.draw_profile(root, layout.profile_y, scale)?;
        self.draw_chart(root, layout.chart_y, scale)?;
        self.draw_tips(root, layout.tips_y, scale)
    }
}

fn text(
    root: &Canvas<'_>,
    content: &str,
    (x, y): (i32, i32),
    size: f64,
    style: FontStyle,
    color: &RGBColor,
    scale: u32,
) -> Result<(), String> {
    let s = scale as i32;
    let font = FontDesc::new(FontFamily::SansSerif, size * scale as f64, style).color(color);
    root.draw(&Text::new(content.to_string(), (x * s, y * s), font))
        .map_err(|e| e.to_string())
}

fn section_title(root: &Canvas<'_>, title: &str, y: i32, scale: u32) -> Result<(), String> {
    text(root, title, (MARGIN, y), 17.0, FontStyle::Bold, &ACCENT, scale)
}

fn rect(
    root: &Canvas<'_>,
    (x1, y1): (i32, i32),
    (x2, y2): (i32, i32),
    color: &RGBColor,
    scale: u32,
) -> Result<(), String> {
    let s = scale as i32;
    root.draw(&Rectangle::new([(x1 * s, y1 * s), (x2 * s, y2 * s)], color.filled()))
        .map_err(|e| e.to_string())
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut cut: String = value.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
