use crate::types::PhysicalSize;
use exif::{In, Tag, Value};
use std::io::Cursor;

/// Resolution assumed when an image carries no usable density metadata.
pub const DEFAULT_SOURCE_DPI: f64 = 72.0;

const INCHES_PER_METER: f64 = 0.0254;
const CM_PER_INCH: f64 = 2.54;

/// Metadata read from an image header without decoding its pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageProbe {
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub source_dpi: f64,
    pub dpi_from_metadata: bool,
}

impl ImageProbe {
    pub fn physical_size(&self) -> PhysicalSize {
        physical_size(self.pixel_width, self.pixel_height, self.source_dpi)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeError {
    pub message: String,
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "image probe failed: {}", self.message)
    }
}

impl std::error::Error for ProbeError {}

pub fn probe_image(bytes: &[u8]) -> Result<ImageProbe, ProbeError> {
    let (pixel_width, pixel_height) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| ProbeError {
            message: err.to_string(),
        })?
        .into_dimensions()
        .map_err(|err| ProbeError {
            message: err.to_string(),
        })?;
    let embedded = embedded_dpi(bytes);
    Ok(ImageProbe {
        pixel_width,
        pixel_height,
        source_dpi: resolve_source_dpi(embedded),
        dpi_from_metadata: embedded.is_some(),
    })
}

/// Falls back to [`DEFAULT_SOURCE_DPI`] unless `embedded` is finite and positive.
pub fn resolve_source_dpi(embedded: Option<f64>) -> f64 {
    match embedded {
        Some(dpi) if dpi.is_finite() && dpi > 0.0 => dpi,
        _ => DEFAULT_SOURCE_DPI,
    }
}

pub fn physical_size(pixel_width: u32, pixel_height: u32, source_dpi: f64) -> PhysicalSize {
    let dpi = resolve_source_dpi(Some(source_dpi));
    PhysicalSize::new(pixel_width as f64 / dpi, pixel_height as f64 / dpi)
}

/// Horizontal density recorded in the file, in dots per inch.
///
/// JPEG density comes from the JFIF header first. When that is missing or
/// carries no unit, the EXIF `XResolution` / `ResolutionUnit` pair is used.
pub fn embedded_dpi(bytes: &[u8]) -> Option<f64> {
    match image::guess_format(bytes).ok()? {
        image::ImageFormat::Png => well_formed(png_dpi(bytes)),
        image::ImageFormat::Jpeg => {
            well_formed(jfif_dpi(bytes)).or_else(|| well_formed(exif_dpi(bytes)))
        }
        _ => None,
    }
}

fn well_formed(dpi: Option<f64>) -> Option<f64> {
    dpi.filter(|dpi| dpi.is_finite() && *dpi > 0.0)
}

fn png_dpi(bytes: &[u8]) -> Option<f64> {
    let reader = png::Decoder::new(Cursor::new(bytes)).read_info().ok()?;
    let dims = reader.info().pixel_dims?;
    match dims.unit {
        png::Unit::Meter => Some(dims.xppu as f64 * INCHES_PER_METER),
        // Unspecified unit only records the pixel aspect ratio.
        png::Unit::Unspecified => None,
    }
}

fn jfif_dpi(bytes: &[u8]) -> Option<f64> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return None;
    }
    let mut pos = 2usize;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // Start of scan: headers are over.
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }
        if (0xD0..=0xD7).contains(&marker) || marker == 0x01 {
            pos += 2;
            continue;
        }
        let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        if len < 2 {
            return None;
        }
        let seg_start = pos + 4;
        let seg_end = (pos + 2 + len).min(bytes.len());
        if marker == 0xE0 {
            let seg = &bytes[seg_start..seg_end];
            if seg.len() >= 12 && &seg[..5] == b"JFIF\0" {
                let unit = seg[7];
                let density = u16::from_be_bytes([seg[8], seg[9]]) as f64;
                return match unit {
                    1 => Some(density),
                    2 => Some(density * CM_PER_INCH),
                    _ => None,
                };
            }
        }
        pos += 2 + len;
    }
    None
}

fn exif_dpi(bytes: &[u8]) -> Option<f64> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let x_resolution = match &exif.get_field(Tag::XResolution, In::PRIMARY)?.value {
        Value::Rational(values) => values.first()?.to_f64(),
        _ => return None,
    };
    let unit = exif
        .get_field(Tag::ResolutionUnit, In::PRIMARY)?
        .value
        .get_uint(0)?;
    match unit {
        2 => Some(x_resolution),
        3 => Some(x_resolution * CM_PER_INCH),
        _ => None,
    }
}
