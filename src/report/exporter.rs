//! Report exporter
//!
//! Captures a rendered report surface as a 2× raster on the export background
//! and embeds it in a single-page PDF. The page is A4 width with a height
//! proportional to the capture, so long reports produce tall pages rather
//! than being split.

use std::cell::Cell;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::prelude::*;
use printpdf::image_crate::{DynamicImage, RgbImage};
use printpdf::{Image, ImageTransform, Mm, PdfDocument};
use tracing::{info, warn};

use super::backend::TextSafeBackend;
use crate::error::{InsightsError, InsightsResult};

pub const CAPTURE_SCALE: u32 = 2;

/// Dark slate background every capture is painted on
pub const EXPORT_BACKGROUND: RGBColor = RGBColor(15, 23, 42);

pub const A4_WIDTH_MM: f32 = 210.0;
const MM_PER_INCH: f32 = 25.4;

pub type Canvas<'a> = DrawingArea<TextSafeBackend<BitMapBackend<'a>>, Shift>;

/// A rendered region that can be captured into a report
pub trait ReportSurface {
    /// Logical size in pixels
    fn size(&self) -> (u32, u32);

    /// Paint onto a canvas already filled with the export background. Every
    /// logical coordinate is multiplied by `scale`.
    fn draw(&self, root: &Canvas<'_>, scale: u32) -> Result<(), String>;
}

/// An assembled report ready to be handed to the user
#[derive(Debug, Clone)]
pub struct ExportedReport {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
    pub page_height_mm: f32,
}

pub fn report_file_name(date: NaiveDate) -> String {
    format!("Health_Insights_Report_{}.pdf", date.format("%Y-%m-%d"))
}

/// Raster the surface at `CAPTURE_SCALE`
pub fn capture(surface: &dyn ReportSurface) -> InsightsResult<RgbImage> {
    let (width, height) = surface.size();
    if width == 0 || height == 0 {
        return Err(InsightsError::export("report region has no size"));
    }

    let width = width
        .checked_mul(CAPTURE_SCALE)
        .ok_or_else(|| InsightsError::export("report region is too wide"))?;
    let height = height
        .checked_mul(CAPTURE_SCALE)
        .ok_or_else(|| InsightsError::export("report region is too tall"))?;

    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    let skipped = Rc::new(Cell::new(0));

    {
        let backend = BitMapBackend::with_buffer(&mut buffer, (width, height));
        let root = TextSafeBackend::new(backend, skipped.clone()).into_drawing_area();
        root.fill(&EXPORT_BACKGROUND)
            .map_err(|e| InsightsError::export(e.to_string()))?;
        surface.draw(&root, CAPTURE_SCALE).map_err(InsightsError::export)?;
        root.present()
            .map_err(|e| InsightsError::export(e.to_string()))?;
    }

    if skipped.get() > 0 {
        warn!(skipped = skipped.get(), "No usable font; report text left out of the capture");
    }

    RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| InsightsError::export("Failed to create image from buffer"))
}

/// Page height for an image laid across the full A4 width
pub fn page_height_mm(width_px: u32, height_px: u32) -> f32 {
    A4_WIDTH_MM * height_px as f32 / width_px as f32
}

/// Single-page PDF with the image filling the page
pub fn assemble_pdf(image: RgbImage, title: &str) -> InsightsResult<Vec<u8>> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(InsightsError::export("captured image is empty"));
    }

    let page_height = page_height_mm(width, height);
    let (doc, page, layer) = PdfDocument::new(title, Mm(A4_WIDTH_MM), Mm(page_height), "Report");
    let layer = doc.get_page(page).get_layer(layer);

    let pdf_image = Image::from_dynamic_image(&DynamicImage::ImageRgb8(image));
    // Pixels per inch that stretch the capture exactly across the page
    let dpi = width as f32 * MM_PER_INCH / A4_WIDTH_MM;
    let transform = ImageTransform {
        translate_x: Some(Mm(0.0)),
        translate_y: Some(Mm(0.0)),
        dpi: Some(dpi),
        ..Default::default()
    };
    pdf_image.add_to_layer(layer, transform);

    let mut bytes = Vec::new();
    {
        let mut writer = BufWriter::new(&mut bytes);
        doc.save(&mut writer)
            .map_err(|e| InsightsError::export(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| InsightsError::export(e.to_string()))?;
    }

    Ok(bytes)
}

/// Capture the surface and assemble the dated report
pub fn export_report(surface: &dyn ReportSurface, date: NaiveDate) -> InsightsResult<ExportedReport> {
    let image = capture(surface)?;
    let (width_px, height_px) = image.dimensions();
    let bytes = assemble_pdf(image, "Health Insights Report")?;

    let report = ExportedReport {
        file_name: report_file_name(date),
        bytes,
        width_px,
        height_px,
        page_height_mm: page_height_mm(width_px, height_px),
    };

    info!(
        file_name = %report.file_name,
        width_px,
        height_px,
        size = report.bytes.len(),
        "Report exported"
    );
    Ok(report)
}

/// Write the report into `dir`, creating it if needed
pub fn save_report(report: &ExportedReport, dir: &Path) -> InsightsResult<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| {
        InsightsError::export(format!("Cannot create {}: {}", dir.display(), e))
    })?;

    let path = dir.join(&report.file_name);
    let file = File::create(&path)
        .map_err(|e| InsightsError::export(format!("Cannot create {}: {}", path.display(), e)))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(&report.bytes)
        .and_then(|_| writer.flush())
        .map_err(|e| InsightsError::export(format!("Cannot write {}: {}", path.display(), e)))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Red square in the top-left corner
    struct SquareSurface {
        width: u32,
        height: u32,
    }

    impl ReportSurface for SquareSurface {
        fn size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn draw(&self, root: &Canvas<'_>, scale: u32) -> Result<(), String> {
            let side = (10 * scale) as i32;
            root.draw(&Rectangle::new([(0, 0), (side, side)], RGBColor(255, 0, 0).filled()))
                .map_err(|e| e.to_string())
        }
    }

    struct FailingSurface;

    impl ReportSurface for FailingSurface {
        fn size(&self) -> (u32, u32) {
            (10, 10)
        }

        fn draw(&self, _root: &Canvas<'_>, _scale: u32) -> Result<(), String> {
            Err("chart unavailable".to_string())
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn test_file_name_uses_iso_date() {
        assert_eq!(report_file_name(date()), "Health_Insights_Report_2024-05-17.pdf");
    }

    #[test]
    fn test_capture_is_double_scale_on_dark_background() {
        let image = capture(&SquareSurface { width: 40, height: 30 }).unwrap();
        assert_eq!(image.dimensions(), (80, 60));
        assert_eq!(image.get_pixel(5, 5).0, [255, 0, 0]);
        assert_eq!(image.get_pixel(79, 59).0, [15, 23, 42]);
    }

    #[test]
    fn test_zero_size_region_fails() {
        let err = export_report(&SquareSurface { width: 0, height: 100 }, date()).unwrap_err();
        assert_eq!(err.kind(), "export");
    }

    #[test]
    fn test_draw_failure_is_export_failure() {
        let err = capture(&FailingSurface).unwrap_err();
        assert!(err.to_string().contains("chart unavailable"));
    }

    #[test]
    fn test_page_is_a4_width_and_proportional() {
        assert!((page_height_mm(800, 1600) - 420.0).abs() < 1e-3);
        assert!((page_height_mm(1000, 500) - 105.0).abs() < 1e-3);
    }

    #[test]
    fn test_export_produces_pdf() {
        let report = export_report(&SquareSurface { width: 100, height: 200 }, date()).unwrap();
        assert!(report.bytes.starts_with(b"%PDF"));
        assert_eq!((report.width_px, report.height_px), (200, 400));
        assert!((report.page_height_mm - 420.0).abs() < 1e-3);
    }

    #[test]
    fn test_save_report_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("reports");
        let report = ExportedReport {
            file_name: report_file_name(date()),
            bytes: b"%PDF-1.3 test".to_vec(),
            width_px: 1,
            height_px: 1,
            page_height_mm: A4_WIDTH_MM,
        };

        let path = save_report(&report, &target).unwrap();
        assert_eq!(path, target.join("Health_Insights_Report_2024-05-17.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), report.bytes);
    }
}
