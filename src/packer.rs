use crate::page_config::PageConfiguration;
use crate::scale::PlacedImage;

/// Where the packer put one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub page_index: usize,
    pub x: u32,
    pub y: u32,
    /// The previous page was sealed to make room for this image.
    pub starts_new_page: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageItem {
    pub source_index: usize,
    pub x: u32,
    pub y: u32,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLayout {
    pub items: Vec<PageItem>,
    /// Cursor position when the page was sealed.
    pub vertical_offset: u32,
}

impl PageLayout {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Top-to-bottom page filler. Pages are sealed lazily: only when the next
/// image would cross the bottom edge, or when the batch ends.
pub struct PagePacker {
    page_height_px: u32,
    spacing_px: u32,
    vertical_offset: u32,
    current: PageLayout,
    sealed: Vec<PageLayout>,
}

impl PagePacker {
    pub fn new(config: &PageConfiguration) -> Self {
        Self::with_dimensions(config.page_height_px(), config.spacing_px())
    }

    pub fn with_dimensions(page_height_px: u32, spacing_px: u32) -> Self {
        Self {
            page_height_px,
            spacing_px,
            vertical_offset: spacing_px,
            current: PageLayout::default(),
            sealed: Vec::new(),
        }
    }

    pub fn vertical_offset(&self) -> u32 {
        self.vertical_offset
    }

    pub fn current_page_index(&self) -> usize {
        self.sealed.len()
    }

    pub fn sealed_pages(&self) -> &[PageLayout] {
        &self.sealed
    }

    pub fn place(&mut self, image: &PlacedImage) -> Slot {
        let overflows =
            self.vertical_offset.saturating_add(image.height_px) > self.page_height_px;
        // An empty page takes the image anyway, even one taller than the page.
        let starts_new_page = overflows && !self.current.is_empty();
        if starts_new_page {
            self.seal_current();
        }

        let slot = Slot {
            page_index: self.sealed.len(),
            x: image.x_offset_px,
            y: self.vertical_offset,
            starts_new_page,
        };
        self.current.items.push(PageItem {
            source_index: image.source_index,
            x: slot.x,
            y: slot.y,
            width_px: image.width_px,
            height_px: image.height_px,
        });
        self.vertical_offset = self
            .vertical_offset
            .saturating_add(image.height_px)
            .saturating_add(self.spacing_px);
        slot
    }

    /// Seals the last page if it holds anything and returns every page in order.
    pub fn finish(mut self) -> Vec<PageLayout> {
        if !self.current.is_empty() {
            self.seal_current();
        }
        self.sealed
    }

    fn seal_current(&mut self) {
        let mut page = std::mem::take(&mut self.current);
        page.vertical_offset = self.vertical_offset;
        self.sealed.push(page);
        self.vertical_offset = self.spacing_px;
    }
}

/// Runs the packer over a whole sequence without touching pixels.
pub fn pack_layout(images: &[PlacedImage], page_height_px: u32, spacing_px: u32) -> Vec<PageLayout> {
    let mut packer = PagePacker::with_dimensions(page_height_px, spacing_px);
    for image in images {
        packer.place(image);
    }
    packer.finish()
}
