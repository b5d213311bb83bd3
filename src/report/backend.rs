//! Drawing backend that keeps a capture going when text cannot be rendered
//!
//! Text goes through the system font stack. On hosts without a usable font
//! the label is skipped and counted instead of failing the whole report.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use plotters_backend::{
    BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingBackend, DrawingErrorKind,
};

/// Average glyph width relative to the font size, for size estimates
const ESTIMATED_GLYPH_WIDTH: f64 = 0.6;

pub struct TextSafeBackend<DB> {
    inner: DB,
    skipped: Rc<Cell<usize>>,
}

impl<DB> TextSafeBackend<DB> {
    /// Wrap `inner`; every label that could not be drawn bumps `skipped`
    pub fn new(inner: DB, skipped: Rc<Cell<usize>>) -> Self {
        Self { inner, skipped }
    }
}

fn estimated_text_size(text: &str, font_size: f64) -> (u32, u32) {
    let width = text.chars().count() as f64 * font_size * ESTIMATED_GLYPH_WIDTH;
    (width.ceil() as u32, font_size.ceil() as u32)
}

impl<DB: DrawingBackend> DrawingBackend for TextSafeBackend<DB> {
    type ErrorType = DB::ErrorType;

    fn get_size(&self) -> (u32, u32) {
        self.inner.get_size()
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.ensure_prepared()
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.present()
    }

    fn draw_pixel(&mut self, point: BackendCoord, color: BackendColor) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_pixel(point, color)
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_line(from, to, style)
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_rect(upper_left, bottom_right, style, fill)
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_path(path, style)
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_circle(center, radius, style, fill)
    }

    fn fill_polygon<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.fill_polygon(vert, style)
    }

    fn blit_bitmap(
        &mut self,
        pos: BackendCoord,
        (iw, ih): (u32, u32),
        src: &[u8],
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.blit_bitmap(pos, (iw, ih), src)
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        // Font lookup can panic inside the font stack as well as fail
        match panic::catch_unwind(AssertUnwindSafe(|| self.inner.draw_text(text, style, pos))) {
            Ok(Err(DrawingErrorKind::FontError(_))) | Err(_) => {
                self.skipped.set(self.skipped.get() + 1);
                Ok(())
            }
            Ok(result) => result,
        }
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<Self::ErrorType>> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.inner.estimate_text_size(text, style))) {
            Ok(Err(DrawingErrorKind::FontError(_))) | Err(_) => Ok(estimated_text_size(text, style.size())),
            Ok(result) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotters::prelude::BitMapBackend;
    use plotters_backend::FontFamily;

    /// A font that never resolves
    struct MissingFont;

    impl BackendTextStyle for MissingFont {
        type FontError = std::fmt::Error;

        fn size(&self) -> f64 {
            10.0
        }

        fn family(&self) -> FontFamily<'_> {
            FontFamily::Name("no-such-font")
        }

        fn layout_box(&self, _text: &str) -> Result<((i32, i32), (i32, i32)), Self::FontError> {
            Err(std::fmt::Error)
        }

        fn draw<E, DrawFunc: FnMut(i32, i32, BackendColor) -> Result<(), E>>(
            &self,
            _text: &str,
            _pos: BackendCoord,
            _draw: DrawFunc,
        ) -> Result<Result<(), E>, Self::FontError> {
            Err(std::fmt::Error)
        }
    }

    #[test]
    fn test_unrenderable_text_is_skipped_and_counted() {
        let mut buffer = vec![0u8; 20 * 20 * 3];
        let skipped = Rc::new(Cell::new(0));
        let mut backend = TextSafeBackend::new(BitMapBackend::with_buffer(&mut buffer, (20, 20)), skipped.clone());

        assert!(backend.draw_text("Trends", &MissingFont, (0, 0)).is_ok());
        assert!(backend.draw_text("Tips", &MissingFont, (0, 10)).is_ok());
        assert_eq!(skipped.get(), 2);

        assert_eq!(backend.estimate_text_size("abcde", &MissingFont).unwrap(), (30, 10));
    }

    #[test]
    fn test_shapes_pass_through() {
        let mut buffer = vec![0u8; 4 * 4 * 3];
        {
            let skipped = Rc::new(Cell::new(0));
            let mut backend = TextSafeBackend::new(BitMapBackend::with_buffer(&mut buffer, (4, 4)), skipped);
            let white = BackendColor { alpha: 1.0, rgb: (255, 255, 255) };
            backend.draw_pixel((1, 1), white).unwrap();
            backend.present().unwrap();
        }
        let offset = (4 + 1) * 3;
        assert_eq!(&buffer[offset..offset + 3], &[255, 255, 255]);
    }
}
