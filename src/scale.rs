use crate::page_config::PageConfiguration;
use crate::types::{PhysicalSize, to_pixels};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalePolicy {
    /// Shrink images wider than the page to the page width; center them.
    FitToWidth,
    /// Force every image to `reference_height_in`; left-align.
    FixedHeight { reference_height_in: f64 },
}

/// Final geometry of one source image, computed before it is packed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedImage {
    pub source_index: usize,
    pub final_size: PhysicalSize,
    pub width_px: u32,
    pub height_px: u32,
    pub x_offset_px: u32,
}

pub fn normalize(
    source_index: usize,
    physical: PhysicalSize,
    config: &PageConfiguration,
    policy: ScalePolicy,
) -> PlacedImage {
    let page_width = config.page_size.width_in;
    let dpi = config.output_dpi;
    match policy {
        ScalePolicy::FitToWidth => {
            let final_size = if physical.width > page_width {
                let ratio = page_width / physical.width;
                PhysicalSize::new(page_width, physical.height * ratio)
            } else {
                physical
            };
            let width_px = to_pixels(final_size.width, dpi);
            let height_px = to_pixels(final_size.height, dpi);
            let slack = config.page_width_px() as i64 - width_px as i64;
            PlacedImage {
                source_index,
                final_size,
                width_px,
                height_px,
                x_offset_px: slack.div_euclid(2).max(0) as u32,
            }
        }
        ScalePolicy::FixedHeight {
            reference_height_in,
        } => {
            // Float noise on a clipped reference can land a hair past the page edge.
            let width = (reference_height_in * physical.aspect_ratio()).min(page_width);
            let final_size = PhysicalSize::new(width, reference_height_in);
            PlacedImage {
                source_index,
                final_size,
                width_px: to_pixels(final_size.width, dpi),
                height_px: to_pixels(final_size.height, dpi),
                x_offset_px: 0,
            }
        }
    }
}
