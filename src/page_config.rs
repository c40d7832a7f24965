use crate::types::{MM_PER_INCH, PageSize, to_pixels};

/// Per-run layout parameters, fixed for the whole batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageConfiguration {
    pub page_size: PageSize,
    pub output_dpi: f64,
    /// Vertical gap between images and above the first image, in inches.
    pub spacing_in: f64,
    pub fixed_height: bool,
}

impl PageConfiguration {
    pub fn new(page_size: PageSize, output_dpi: f64, spacing_in: f64, fixed_height: bool) -> Self {
        Self {
            page_size,
            output_dpi,
            spacing_in,
            fixed_height,
        }
    }

    pub fn with_spacing_mm(mut self, spacing_mm: f64) -> Self {
        self.spacing_in = spacing_mm / MM_PER_INCH;
        self
    }

    pub fn page_width_px(&self) -> u32 {
        to_pixels(self.page_size.width_in, self.output_dpi)
    }

    pub fn page_height_px(&self) -> u32 {
        to_pixels(self.page_size.height_in, self.output_dpi)
    }

    pub fn spacing_px(&self) -> u32 {
        to_pixels(self.spacing_in, self.output_dpi)
    }
}

impl Default for PageConfiguration {
    fn default() -> Self {
        Self {
            page_size: PageSize::a4(),
            output_dpi: 300.0,
            spacing_in: 5.0 / MM_PER_INCH,
            fixed_height: false,
        }
    }
}
