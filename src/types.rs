use fixed::types::I32F32;

pub const MM_PER_INCH: f64 = 25.4;
pub const PT_PER_INCH: f64 = 72.0;

/// PDF user-space length, quantized to thousandths of a point so the same
/// layout always serializes to the same numbers.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Pt(I32F32);

impl Pt {
    pub const ZERO: Pt = Pt(I32F32::from_bits(0));

    pub fn from_f64(value: f64) -> Pt {
        if !value.is_finite() {
            return Pt::ZERO;
        }
        let milli = (value * 1000.0).round();
        let milli = milli.clamp(i64::MIN as f64, i64::MAX as f64) as i64;
        Pt::from_milli_i64(milli)
    }

    /// Length of `pixels` device pixels at `dpi` dots per inch.
    pub fn from_pixels(pixels: u32, dpi: f64) -> Pt {
        if dpi <= 0.0 || !dpi.is_finite() {
            return Pt::ZERO;
        }
        Pt::from_f64(pixels as f64 * PT_PER_INCH / dpi)
    }

    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    pub fn from_milli_i64(milli: i64) -> Pt {
        let milli = milli as i128;
        let denom = 1i128 << 32;
        let adj = if milli >= 0 { 500 } else { -500 };
        let bits = (milli * denom + adj) / 1000;
        let bits = bits.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        Pt(I32F32::from_bits(bits))
    }
}

/// Physical extent in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalSize {
    pub width: f64,
    pub height: f64,
}

impl PhysicalSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Width over height; a zero height yields 0 rather than infinity.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0.0 {
            0.0
        } else {
            self.width / self.height
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_in: f64,
    pub height_in: f64,
}

impl PageSize {
    pub fn a4() -> Self {
        Self {
            width_in: 8.27,
            height_in: 11.69,
        }
    }

    pub fn letter() -> Self {
        Self {
            width_in: 8.5,
            height_in: 11.0,
        }
    }

    pub fn from_inches(width_in: f64, height_in: f64) -> Self {
        Self {
            width_in,
            height_in,
        }
    }

    pub fn from_mm(width_mm: f64, height_mm: f64) -> Self {
        Self {
            width_in: width_mm / MM_PER_INCH,
            height_in: height_mm / MM_PER_INCH,
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::a4()
    }
}

/// Converts a physical length to device pixels, truncating toward zero.
/// Negative and non-finite inputs map to 0.
pub fn to_pixels(length_in: f64, dpi: f64) -> u32 {
    let px = length_in * dpi;
    if !px.is_finite() || px <= 0.0 {
        return 0;
    }
    px.trunc().min(u32::MAX as f64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_pixels_truncates_toward_zero() {
        assert_eq!(to_pixels(8.27, 300.0), 2481);
        assert_eq!(to_pixels(11.69, 300.0), 3507);
        assert_eq!(to_pixels(0.999, 1.0), 0);
        assert_eq!(to_pixels(-1.0, 300.0), 0);
        assert_eq!(to_pixels(f64::NAN, 300.0), 0);
    }

    #[test]
    fn pt_from_pixels_declares_resolution() {
        assert_eq!(Pt::from_pixels(300, 300.0).to_f32(), 72.0);
        assert_eq!(Pt::from_pixels(150, 300.0).to_f32(), 36.0);
        assert_eq!(Pt::from_pixels(233, 20.0), Pt::from_f64(838.8));
        assert_eq!(Pt::from_pixels(10, 0.0), Pt::ZERO);
    }

    #[test]
    fn aspect_ratio_of_zero_height_is_zero() {
        assert_eq!(PhysicalSize::new(3.0, 0.0).aspect_ratio(), 0.0);
        assert_eq!(PhysicalSize::new(3.0, 1.5).aspect_ratio(), 2.0);
    }

    #[test]
    fn page_size_from_mm_matches_inches() {
        let size = PageSize::from_mm(254.0, 25.4);
        assert!((size.width_in - 10.0).abs() < 1e-9);
        assert!((size.height_in - 1.0).abs() < 1e-9);
    }
}
