use crate::error::PageStackError;
use crate::packer::{PageItem, Slot};
use image::RgbImage;
use image::imageops::{self, FilterType};
use tiny_skia::{IntSize, Pixmap, PixmapPaint, Transform};

/// A sealed page: a white canvas with its images pasted in.
pub struct Page {
    pub index: usize,
    pub canvas: Pixmap,
    pub items: Vec<PageItem>,
}

impl Page {
    pub fn width_px(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height_px(&self) -> u32 {
        self.canvas.height()
    }

    /// Packed 8-bit RGB rows. Canvases are always opaque, so dropping the
    /// (premultiplied) alpha channel is lossless.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let data = self.canvas.data();
        let mut rgb = Vec::with_capacity(data.len() / 4 * 3);
        for px in data.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
        }
        rgb
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("index", &self.index)
            .field("width_px", &self.width_px())
            .field("height_px", &self.height_px())
            .field("items", &self.items)
            .finish()
    }
}

/// Owns the page being filled. A canvas is allocated on the first paste so a
/// page that never receives an image never exists.
pub struct PageComposer {
    width_px: u32,
    height_px: u32,
    current: Option<Page>,
    pages: Vec<Page>,
}

impl PageComposer {
    pub fn new(width_px: u32, height_px: u32) -> Result<Self, PageStackError> {
        if IntSize::from_wh(width_px, height_px).is_none() {
            return Err(PageStackError::Raster(format!(
                "invalid page canvas size {}x{}",
                width_px, height_px
            )));
        }
        Ok(Self {
            width_px,
            height_px,
            current: None,
            pages: Vec::new(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pastes `image` at the slot's offset onto the current page. The image
    /// must already be resampled, and the page item records its drawn size.
    pub fn paste(&mut self, image: &RgbImage, slot: &Slot, source_index: usize) -> Result<(), PageStackError> {
        if slot.starts_new_page {
            self.seal();
        }
        let page = self.current_page()?;
        page.items.push(PageItem {
            source_index,
            x: slot.x,
            y: slot.y,
            width_px: image.width(),
            height_px: image.height(),
        });
        // Zero-area images only occupy their slot.
        let Some(src) = rgb_to_pixmap(image) else {
            return Ok(());
        };
        let (Ok(x), Ok(y)) = (i32::try_from(slot.x), i32::try_from(slot.y)) else {
            return Ok(());
        };
        page.canvas.draw_pixmap(
            x,
            y,
            src.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        Ok(())
    }

    /// Closes the current page, if any.
    pub fn seal(&mut self) {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
    }

    pub fn finish(mut self) -> Vec<Page> {
        self.seal();
        self.pages
    }

    fn current_page(&mut self) -> Result<&mut Page, PageStackError> {
        if self.current.is_none() {
            let mut canvas = Pixmap::new(self.width_px, self.height_px).ok_or_else(|| {
                PageStackError::Raster(format!(
                    "cannot allocate page canvas {}x{}",
                    self.width_px, self.height_px
                ))
            })?;
            canvas.fill(tiny_skia::Color::WHITE);
            self.current = Some(Page {
                index: self.pages.len(),
                canvas,
                items: Vec::new(),
            });
        }
        self.current
            .as_mut()
            .ok_or_else(|| PageStackError::Raster("page canvas missing".to_string()))
    }
}

/// Decodes `bytes` and drops any alpha channel.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, String> {
    let decoded = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    Ok(decoded.to_rgb8())
}

/// Resamples `rgb` to `width_px` x `height_px`, keeping only the top
/// `visible_rows`. Rows that would land below the page edge are cut from the
/// source before resampling, so a tall image never costs a full-height pass.
pub fn resample(rgb: RgbImage, width_px: u32, height_px: u32, visible_rows: u32) -> RgbImage {
    let rows = height_px.min(visible_rows);
    if width_px == 0 || rows == 0 {
        return RgbImage::new(width_px, rows);
    }
    let (src_width, src_height) = rgb.dimensions();
    if (src_width, src_height) == (width_px, height_px) {
        if rows == height_px {
            return rgb;
        }
        return imageops::crop_imm(&rgb, 0, 0, width_px, rows).to_image();
    }
    if src_width == 0 || src_height == 0 {
        return RgbImage::new(width_px, rows);
    }

    // Smallest source band covering `rows`, resized at the full scale factor.
    let src_rows = (rows as u64 * src_height as u64)
        .div_ceil(height_px as u64)
        .clamp(1, src_height as u64) as u32;
    let scaled_rows = ((src_rows as u64 * height_px as u64) / src_height as u64)
        .clamp(rows as u64, height_px as u64) as u32;
    let band = if src_rows == src_height {
        rgb
    } else {
        imageops::crop_imm(&rgb, 0, 0, src_width, src_rows).to_image()
    };
    let scaled = imageops::resize(&band, width_px, scaled_rows, FilterType::Lanczos3);
    if scaled_rows == rows {
        scaled
    } else {
        imageops::crop_imm(&scaled, 0, 0, width_px, rows).to_image()
    }
}

fn rgb_to_pixmap(image: &RgbImage) -> Option<Pixmap> {
    let size = IntSize::from_wh(image.width(), image.height())?;
    let mut rgba = Vec::with_capacity(image.as_raw().len() / 3 * 4);
    for px in image.as_raw().chunks_exact(3) {
        rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
    }
    Pixmap::from_vec(rgba, size)
}
