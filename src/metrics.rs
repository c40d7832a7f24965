#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetrics {
    pub page_number: usize,
    pub image_count: usize,
    /// Packer cursor when the page was sealed, trailing spacing included.
    pub used_height_px: u32,
    pub compose_ms: f64,
    pub stream_bytes: usize,
}

impl PageMetrics {
    pub fn fill_ratio(&self, page_height_px: u32) -> f64 {
        if page_height_px == 0 {
            return 0.0;
        }
        (self.used_height_px as f64 / page_height_px as f64).min(1.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackMetrics {
    pub pages: Vec<PageMetrics>,
    pub images_placed: usize,
    pub images_skipped: usize,
    pub probe_ms: f64,
    pub compose_ms: f64,
    pub encode_ms: f64,
    pub total_bytes: usize,
}

impl PackMetrics {
    pub fn total_ms(&self) -> f64 {
        self.probe_ms + self.compose_ms + self.encode_ms
    }
}
