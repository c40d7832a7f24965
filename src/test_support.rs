// Synthetic fixtures shared by the unit tests.

use crate::source::SourceImage;

/// Encodes a solid RGB PNG, optionally with a `pHYs` chunk in pixels per meter.
pub(crate) fn png_with_phys(width: u32, height: u32, ppm: Option<u32>) -> Vec<u8> {
    solid_png(width, height, ppm, [200, 200, 200])
}

pub(crate) fn solid_png(width: u32, height: u32, ppm: Option<u32>, rgb: [u8; 3]) -> Vec<u8> {
    let mut bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut bytes, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        if let Some(ppm) = ppm {
            encoder.set_pixel_dims(Some(png::PixelDimensions {
                xppu: ppm,
                yppu: ppm,
                unit: png::Unit::Meter,
            }));
        }
        let mut writer = encoder.write_header().expect("png header");
        let data: Vec<u8> = (0..(width as usize * height as usize))
            .flat_map(|_| rgb)
            .collect();
        writer.write_image_data(&data).expect("png data");
    }
    bytes
}

/// A PNG whose pixel size at `dpi` equals the requested inches. `dpi` must be
/// a resolution the pHYs chunk can carry exactly enough (e.g. 10 or 20 dpi
/// give whole pixel-per-meter values after rounding).
pub(crate) fn png_inches(name: &str, width_in: f64, height_in: f64, dpi: f64) -> SourceImage {
    let width = (width_in * dpi).round() as u32;
    let height = (height_in * dpi).round() as u32;
    let ppm = (dpi / 0.0254).round() as u32;
    SourceImage::new(name, solid_png(width, height, Some(ppm), [90, 120, 150]))
}

/// A PNG with no density metadata (probes at 72 dpi).
pub(crate) fn png_pixels(name: &str, width: u32, height: u32) -> SourceImage {
    SourceImage::new(name, solid_png(width, height, None, [30, 60, 90]))
}
