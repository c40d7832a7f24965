mod compose;
mod debug;
mod encoder;
mod error;
mod inspect;
mod metrics;
mod natural_sort;
mod packer;
mod page_config;
mod perf;
mod progress;
mod reference;
mod report;
mod resolution;
mod scale;
mod source;
#[cfg(test)]
mod test_support;
mod types;

pub use compose::{Page, PageComposer, decode_rgb, resample};
use debug::{DebugLogger, JsonValue};
pub use encoder::{EncodedPdf, PdfOptions, PdfVersion, encode_pages};
pub use error::PageStackError;
pub use inspect::{
    PageInspect, PdfInspectError, PdfInspectErrorCode, PdfInspectReport, inspect_pdf_bytes,
    inspect_pdf_path,
};
pub use metrics::{PackMetrics, PageMetrics};
pub use natural_sort::{natural_cmp, sort_naturally};
pub use packer::{PageItem, PageLayout, PagePacker, Slot, pack_layout};
pub use page_config::PageConfiguration;
use perf::PerfLogger;
pub use progress::Progress;
pub use reference::{ReferenceError, ReferenceHeight, compute_reference_height};
pub use report::{LayoutPlan, PackOutcome, PackWarning, PackedDocument, Placement};
pub use resolution::{
    DEFAULT_SOURCE_DPI, ImageProbe, ProbeError, embedded_dpi, physical_size, probe_image,
    resolve_source_dpi,
};
pub use scale::{PlacedImage, ScalePolicy, normalize};
use sha2::{Digest, Sha256};
pub use source::{ImageBatch, SourceImage};
use std::path::{Path, PathBuf};
use std::time::Instant;
pub use types::{MM_PER_INCH, PT_PER_INCH, PageSize, PhysicalSize, Pt, to_pixels};

const MIN_OUTPUT_DPI: f64 = 1.0;
const MAX_OUTPUT_DPI: f64 = 2400.0;

/// Lays a batch of images out top-to-bottom on fixed-size pages and encodes
/// the result as one PDF.
pub struct PageStack {
    config: PageConfiguration,
    pdf_options: PdfOptions,
    debug: Option<DebugLogger>,
    perf: Option<PerfLogger>,
    timing: bool,
}

#[derive(Clone)]
pub struct PageStackBuilder {
    page_size: PageSize,
    output_dpi: f64,
    spacing_in: f64,
    fixed_height: bool,
    pdf_options: PdfOptions,
    debug_path: Option<PathBuf>,
    perf_path: Option<PathBuf>,
}

struct Prepared {
    sources: Vec<SourceImage>,
    probes: Vec<Result<ImageProbe, ProbeError>>,
    policy: ScalePolicy,
    reference: Option<ReferenceHeight>,
    warnings: Vec<PackWarning>,
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

impl PageStack {
    pub fn builder() -> PageStackBuilder {
        PageStackBuilder::new()
    }

    pub fn config(&self) -> &PageConfiguration {
        &self.config
    }

    /// Computes where every image would go without decoding pixels. Images
    /// whose headers cannot be read are left out with a warning.
    pub fn plan(&self, batch: ImageBatch) -> LayoutPlan {
        let Prepared {
            sources,
            probes,
            policy,
            reference,
            mut warnings,
        } = self.prepare(batch);

        let mut packer = PagePacker::new(&self.config);
        let mut placements = Vec::new();
        for (index, (source, probe)) in sources.iter().zip(&probes).enumerate() {
            let probe = match probe {
                Ok(probe) => probe,
                Err(err) => {
                    self.warn(
                        &mut warnings,
                        PackWarning::SkippedImage {
                            name: source.name.clone(),
                            message: err.to_string(),
                        },
                    );
                    continue;
                }
            };
            let placed = normalize(index, probe.physical_size(), &self.config, policy);
            let slot = packer.place(&placed);
            placements.push(Placement {
                name: source.name.clone(),
                page_index: slot.page_index,
                x_px: slot.x,
                y_px: slot.y,
                image: placed,
            });
        }
        let page_count = packer.finish().len();
        self.emit_debug_summary("plan");
        LayoutPlan {
            placements,
            page_count,
            reference,
            warnings,
        }
    }

    /// Runs the whole pipeline. `progress` is called once per input image,
    /// in natural order, whether or not the image was placed.
    pub fn pack(
        &self,
        batch: ImageBatch,
        mut progress: Option<&mut dyn FnMut(Progress)>,
    ) -> Result<PackOutcome, PageStackError> {
        let t_total = Instant::now();
        let t_probe = Instant::now();
        let Prepared {
            sources,
            probes,
            policy,
            reference: _,
            mut warnings,
        } = self.prepare(batch);
        let probe_ms = elapsed_ms(t_probe);
        if let Some(perf) = self.perf.as_ref() {
            perf.log_span_ms("pack.probe", None, probe_ms);
        }

        let total = sources.len();
        if total == 0 {
            self.emit_debug_summary("pack");
            return Ok(PackOutcome::NothingProduced { warnings });
        }

        let mut packer = PagePacker::new(&self.config);
        let page_height_px = self.config.page_height_px();
        let mut composer = PageComposer::new(self.config.page_width_px(), page_height_px)?;
        let mut placements = Vec::with_capacity(total);
        let mut page_compose_ms: Vec<f64> = Vec::new();
        let mut skipped = 0usize;

        let t_compose = Instant::now();
        for (index, (source, probe)) in sources.iter().zip(&probes).enumerate() {
            let t_image = Instant::now();
            let decoded = probe
                .as_ref()
                .map_err(|err| err.to_string())
                .and_then(|probe| decode_rgb(&source.data).map(|rgb| (probe, rgb)));
            match decoded {
                Ok((probe, rgb)) => {
                    let placed = normalize(index, probe.physical_size(), &self.config, policy);
                    let slot = packer.place(&placed);
                    if slot.starts_new_page {
                        self.log_page_break(&packer, &slot, &source.name);
                    }
                    let visible_rows = page_height_px.saturating_sub(slot.y);
                    let pixels = resample(rgb, placed.width_px, placed.height_px, visible_rows);
                    composer.paste(&pixels, &slot, index)?;
                    if page_compose_ms.len() <= slot.page_index {
                        page_compose_ms.resize(slot.page_index + 1, 0.0);
                    }
                    if let Some(ms) = page_compose_ms.get_mut(slot.page_index) {
                        *ms += elapsed_ms(t_image);
                    }
                    placements.push(Placement {
                        name: source.name.clone(),
                        page_index: slot.page_index,
                        x_px: slot.x,
                        y_px: slot.y,
                        image: placed,
                    });
                }
                Err(message) => {
                    skipped += 1;
                    self.warn(
                        &mut warnings,
                        PackWarning::SkippedImage {
                            name: source.name.clone(),
                            message,
                        },
                    );
                }
            }
            if let Some(observer) = progress.as_deref_mut() {
                observer(Progress::new(index + 1, total));
            }
        }
        let compose_ms = elapsed_ms(t_compose);

        let layouts = packer.finish();
        if let Some(last) = layouts.last() {
            self.log_page_sealed(layouts.len() - 1, last);
        }
        let pages = composer.finish();
        if pages.is_empty() {
            self.emit_debug_summary("pack");
            return Ok(PackOutcome::NothingProduced { warnings });
        }
        if let Some(perf) = self.perf.as_ref() {
            for (page_index, ms) in page_compose_ms.iter().enumerate() {
                perf.log_span_ms("pack.compose", Some(page_index + 1), *ms);
            }
        }

        let t_encode = Instant::now();
        let encoded = encode_pages(&pages, self.config.output_dpi, &self.pdf_options)?;
        let encode_ms = elapsed_ms(t_encode);

        let page_metrics: Vec<PageMetrics> = layouts
            .iter()
            .enumerate()
            .map(|(page_index, layout)| PageMetrics {
                page_number: page_index + 1,
                image_count: layout.items.len(),
                used_height_px: layout.vertical_offset,
                compose_ms: page_compose_ms.get(page_index).copied().unwrap_or(0.0),
                stream_bytes: encoded.page_stream_bytes.get(page_index).copied().unwrap_or(0),
            })
            .collect();
        let metrics = PackMetrics {
            pages: page_metrics,
            images_placed: placements.len(),
            images_skipped: skipped,
            probe_ms,
            compose_ms,
            encode_ms,
            total_bytes: encoded.bytes.len(),
        };

        if let Some(perf) = self.perf.as_ref() {
            perf.log_span_ms("pack.encode", None, encode_ms);
            perf.log_span_ms("pack.total", None, elapsed_ms(t_total));
            perf.log_counts(
                "pack",
                &[
                    ("images", total as u64),
                    ("placed", placements.len() as u64),
                    ("skipped", skipped as u64),
                    ("pages", pages.len() as u64),
                    ("bytes", encoded.bytes.len() as u64),
                ],
            );
        }
        if let Some(logger) = self.debug.as_ref() {
            logger.increment("images.placed", placements.len() as u64);
            logger.increment("images.skipped", skipped as u64);
            logger.increment("pages", pages.len() as u64);
        }
        if self.timing {
            eprintln!(
                "[pagestack] timing: probe={:.2}ms compose={:.2}ms encode={:.2}ms pages={}",
                probe_ms,
                compose_ms,
                encode_ms,
                pages.len()
            );
        }
        self.emit_debug_summary("pack");

        let sha256 = sha256_hex(&encoded.bytes);
        Ok(PackOutcome::Produced(PackedDocument {
            page_count: pages.len(),
            bytes: encoded.bytes,
            placements,
            warnings,
            metrics,
            sha256,
        }))
    }

    /// Packs and writes the PDF to `path`. Nothing is written when no page
    /// was produced.
    pub fn pack_to_path(
        &self,
        batch: ImageBatch,
        path: impl AsRef<Path>,
    ) -> Result<PackOutcome, PageStackError> {
        let outcome = self.pack(batch, None)?;
        if let PackOutcome::Produced(doc) = &outcome {
            std::fs::write(path, &doc.bytes)?;
        }
        Ok(outcome)
    }

    /// Packs every `.png` directly inside `dir` into `output`.
    pub fn pack_dir(
        &self,
        dir: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<PackOutcome, PageStackError> {
        let batch = ImageBatch::from_dir(dir, &[])?;
        self.pack_to_path(batch, output)
    }

    fn prepare(&self, batch: ImageBatch) -> Prepared {
        let sources = batch.into_sorted();
        let probes: Vec<Result<ImageProbe, ProbeError>> = sources
            .iter()
            .enumerate()
            .map(|(index, source)| {
                let probe = probe_image(&source.data);
                self.log_probe(index, source, &probe);
                probe
            })
            .collect();

        let mut warnings = Vec::new();
        let mut policy = ScalePolicy::FitToWidth;
        let mut reference = None;
        // A lone image has nothing to be uniform with.
        if self.config.fixed_height && sources.len() > 1 {
            match compute_reference_height(&probes, self.config.page_size.width_in) {
                Ok(found) => {
                    self.log_reference(&found);
                    policy = ScalePolicy::FixedHeight {
                        reference_height_in: found.height_in,
                    };
                    reference = Some(found);
                }
                Err(err) => {
                    let name = match &err {
                        ReferenceError::Probe { index, .. } => sources
                            .get(*index)
                            .map(|source| source.name.clone())
                            .unwrap_or_default(),
                        ReferenceError::TooFewImages(_) => String::new(),
                    };
                    self.warn(
                        &mut warnings,
                        PackWarning::FixedHeightFallback {
                            name,
                            message: format!("{err}; falling back to fit-to-width"),
                        },
                    );
                }
            }
        }
        Prepared {
            sources,
            probes,
            policy,
            reference,
            warnings,
        }
    }

    fn warn(&self, warnings: &mut Vec<PackWarning>, warning: PackWarning) {
        eprintln!("[pagestack] {}", warning);
        if let Some(logger) = self.debug.as_ref() {
            logger.event(
                "pack.warning",
                &[
                    ("code", JsonValue::Str(warning.code())),
                    ("name", JsonValue::Str(warning.name())),
                    ("message", JsonValue::Str(warning.message())),
                ],
            );
        }
        warnings.push(warning);
    }

    fn log_probe(&self, index: usize, source: &SourceImage, probe: &Result<ImageProbe, ProbeError>) {
        let Some(logger) = self.debug.as_ref() else {
            return;
        };
        let origin = source.origin.as_deref().map_or(JsonValue::Null, JsonValue::Str);
        match probe {
            Ok(probe) => logger.event(
                "pack.probe",
                &[
                    ("index", JsonValue::Int(index as u64)),
                    ("name", JsonValue::Str(&source.name)),
                    ("origin", origin),
                    ("width_px", JsonValue::Int(probe.pixel_width as u64)),
                    ("height_px", JsonValue::Int(probe.pixel_height as u64)),
                    ("dpi", JsonValue::Num(probe.source_dpi)),
                    ("dpi_from_metadata", JsonValue::Bool(probe.dpi_from_metadata)),
                ],
            ),
            Err(err) => logger.event(
                "pack.probe",
                &[
                    ("index", JsonValue::Int(index as u64)),
                    ("name", JsonValue::Str(&source.name)),
                    ("origin", origin),
                    ("error", JsonValue::Str(&err.message)),
                ],
            ),
        }
    }

    fn log_reference(&self, reference: &ReferenceHeight) {
        if let Some(logger) = self.debug.as_ref() {
            logger.event(
                "pack.reference",
                &[
                    ("candidate_in", JsonValue::Num(reference.candidate_in)),
                    ("max_aspect_ratio", JsonValue::Num(reference.max_aspect_ratio)),
                    ("height_in", JsonValue::Num(reference.height_in)),
                    ("clipped", JsonValue::Bool(reference.clipped)),
                ],
            );
        }
    }

    fn log_page_break(&self, packer: &PagePacker, slot: &Slot, name: &str) {
        let Some(logger) = self.debug.as_ref() else {
            return;
        };
        if let Some(sealed) = packer.sealed_pages().last() {
            self.log_page_sealed(packer.sealed_pages().len() - 1, sealed);
        }
        logger.event(
            "pack.page_break",
            &[
                ("page", JsonValue::Int(slot.page_index as u64 + 1)),
                ("name", JsonValue::Str(name)),
            ],
        );
    }

    fn log_page_sealed(&self, page_index: usize, layout: &PageLayout) {
        if let Some(logger) = self.debug.as_ref() {
            logger.event(
                "pack.page_sealed",
                &[
                    ("page", JsonValue::Int(page_index as u64 + 1)),
                    ("images", JsonValue::Int(layout.items.len() as u64)),
                    ("used_height_px", JsonValue::Int(layout.vertical_offset as u64)),
                    ("page_height_px", JsonValue::Int(self.config.page_height_px() as u64)),
                ],
            );
        }
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_ref() {
            logger.emit_summary(context);
            logger.flush();
        }
        if let Some(perf) = self.perf.as_ref() {
            perf.flush();
        }
    }
}

impl PageStackBuilder {
    pub fn new() -> Self {
        let defaults = PageConfiguration::default();
        Self {
            page_size: defaults.page_size,
            output_dpi: defaults.output_dpi,
            spacing_in: defaults.spacing_in,
            fixed_height: defaults.fixed_height,
            pdf_options: PdfOptions::default(),
            debug_path: None,
            perf_path: None,
        }
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.page_size = size;
        self
    }

    pub fn output_dpi(mut self, dpi: f64) -> Self {
        self.output_dpi = dpi;
        self
    }

    pub fn spacing_inches(mut self, spacing_in: f64) -> Self {
        self.spacing_in = spacing_in;
        self
    }

    pub fn spacing_mm(mut self, spacing_mm: f64) -> Self {
        self.spacing_in = spacing_mm / MM_PER_INCH;
        self
    }

    pub fn fixed_height(mut self, enabled: bool) -> Self {
        self.fixed_height = enabled;
        self
    }

    pub fn pdf_version(mut self, version: PdfVersion) -> Self {
        self.pdf_options.pdf_version = version;
        self
    }

    pub fn document_title(mut self, title: impl Into<String>) -> Self {
        self.pdf_options.document_title = Some(title.into());
        self
    }

    pub fn parallel_encode(mut self, enabled: bool) -> Self {
        self.pdf_options.parallel_compress = enabled;
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn perf_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.perf_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<PageStack, PageStackError> {
        if !self.output_dpi.is_finite()
            || self.output_dpi < MIN_OUTPUT_DPI
            || self.output_dpi > MAX_OUTPUT_DPI
        {
            return Err(PageStackError::InvalidConfiguration(format!(
                "output_dpi must be within {}..={}, got {}",
                MIN_OUTPUT_DPI, MAX_OUTPUT_DPI, self.output_dpi
            )));
        }
        if !self.spacing_in.is_finite() || self.spacing_in < 0.0 {
            return Err(PageStackError::InvalidConfiguration(format!(
                "spacing must be finite and >= 0, got {} in",
                self.spacing_in
            )));
        }
        let size = self.page_size;
        if !size.width_in.is_finite()
            || !size.height_in.is_finite()
            || size.width_in <= 0.0
            || size.height_in <= 0.0
        {
            return Err(PageStackError::InvalidConfiguration(format!(
                "page size must be positive, got {}x{} in",
                size.width_in, size.height_in
            )));
        }
        let config = PageConfiguration::new(size, self.output_dpi, self.spacing_in, self.fixed_height);
        if config.page_width_px() == 0 || config.page_height_px() == 0 {
            return Err(PageStackError::InvalidConfiguration(format!(
                "page is smaller than one pixel at {} dpi",
                self.output_dpi
            )));
        }

        let debug_path = self
            .debug_path
            .or_else(|| std::env::var_os("PAGESTACK_DEBUG_LOG").map(PathBuf::from));
        let debug = match debug_path {
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };
        let perf_path = self
            .perf_path
            .or_else(|| std::env::var_os("PAGESTACK_PERF_LOG").map(PathBuf::from));
        let perf = match perf_path {
            Some(path) => Some(PerfLogger::new(path)?),
            None => None,
        };
        let timing = std::env::var("PAGESTACK_TIMING")
            .map(|v| v == "1")
            .unwrap_or(false);

        Ok(PageStack {
            config,
            pdf_options: self.pdf_options,
            debug,
            perf,
            timing,
        })
    }
}

impl Default for PageStackBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{png_inches, png_pixels};
    use base64::Engine;

    fn small_stack() -> PageStack {
        PageStack::builder().output_dpi(20.0).build().unwrap()
    }

    fn expect_document(outcome: PackOutcome) -> PackedDocument {
        match outcome {
            PackOutcome::Produced(doc) => doc,
            PackOutcome::NothingProduced { warnings } => {
                panic!("expected a document, got warnings {warnings:?}")
            }
        }
    }

    #[test]
    fn three_images_overflow_onto_second_page() {
        // 8x4, 8x3 and 8x5 in on A4 at 300 dpi with no spacing: 4+3 fit,
        // adding 5 would reach 12 in on an 11.69 in page.
        let stack = PageStack::builder()
            .output_dpi(300.0)
            .spacing_inches(0.0)
            .build()
            .unwrap();
        let batch = ImageBatch::new()
            .with(png_inches("3.png", 8.0, 5.0, 20.0))
            .with(png_inches("1.png", 8.0, 4.0, 20.0))
            .with(png_inches("2.png", 8.0, 3.0, 20.0));
        let plan = stack.plan(batch);
        assert_eq!(plan.page_count, 2);
        assert_eq!(plan.pages(), vec![vec!["1.png", "2.png"], vec!["3.png"]]);
        assert_eq!(plan.placements[0].y_px, 0);
        assert_eq!(plan.placements[2].y_px, 0);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn high_resolution_sources_keep_their_physical_size() {
        let stack = PageStack::builder()
            .output_dpi(300.0)
            .spacing_inches(0.0)
            .build()
            .unwrap();
        let batch = ImageBatch::new()
            .with(png_inches("3.png", 8.0, 5.0, 300.0))
            .with(png_inches("1.png", 8.0, 4.0, 300.0))
            .with(png_inches("2.png", 8.0, 3.0, 300.0));
        let plan = stack.plan(batch);
        assert_eq!(plan.pages(), vec![vec!["1.png", "2.png"], vec!["3.png"]]);
        let heights: Vec<u32> = plan.placements.iter().map(|p| p.image.height_px).collect();
        assert_eq!(heights, vec![1200, 900, 1500]);
        assert!(plan.placements.iter().all(|p| p.image.width_px == 2400));
        let ys: Vec<u32> = plan.placements.iter().map(|p| p.y_px).collect();
        assert_eq!(ys, vec![0, 1200, 0]);
    }

    #[test]
    fn output_follows_natural_order() {
        let batch = ImageBatch::new()
            .with(png_pixels("img10.png", 30, 30))
            .with(png_pixels("img2.png", 30, 30))
            .with(png_pixels("img1.png", 30, 30));
        let doc = expect_document(small_stack().pack(batch, None).unwrap());
        assert_eq!(doc.pages(), vec![vec!["img1.png", "img2.png", "img10.png"]]);
        let ys: Vec<u32> = doc.placements.iter().map(|p| p.y_px).collect();
        assert!(ys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn fit_to_width_scales_only_oversized_images() {
        let stack = PageStack::builder().build().unwrap();
        let batch = ImageBatch::new()
            // 1200 px at 72 dpi is 16.67 in, twice the page.
            .with(png_pixels("a.png", 1200, 100))
            .with(png_pixels("b.png", 144, 72));
        let plan = stack.plan(batch);
        let wide = &plan.placements[0].image;
        assert_eq!(wide.final_size.width, 8.27);
        assert_eq!(wide.width_px, stack.config().page_width_px());
        assert_eq!(plan.placements[0].x_px, 0);
        let narrow = &plan.placements[1].image;
        assert_eq!(narrow.final_size, PhysicalSize::new(2.0, 1.0));
        assert_eq!((narrow.width_px, narrow.height_px), (600, 300));
        assert_eq!(plan.placements[1].x_px, (2481 - 600) / 2);
    }

    #[test]
    fn fixed_height_uses_second_image_when_it_fits() {
        let stack = PageStack::builder().fixed_height(true).build().unwrap();
        let batch = ImageBatch::new()
            // 4x1 in (aspect 4) then 1x2 in: 2 in * 4 = 8 in fits 8.27.
            .with(png_pixels("a.png", 288, 72))
            .with(png_pixels("b.png", 72, 144));
        let plan = stack.plan(batch);
        let reference = plan.reference.unwrap();
        assert!(!reference.clipped);
        assert_eq!(reference.height_in, 2.0);
        for placement in &plan.placements {
            assert_eq!(placement.image.height_px, 600);
            assert_eq!(placement.x_px, 0);
        }
        assert_eq!(plan.placements[0].image.width_px, 2400);
    }

    #[test]
    fn fixed_height_is_clipped_by_widest_image() {
        let stack = PageStack::builder().fixed_height(true).build().unwrap();
        let batch = ImageBatch::new()
            .with(png_pixels("a.png", 720, 72))
            .with(png_pixels("b.png", 72, 144))
            .with(png_pixels("c.png", 72, 72));
        let plan = stack.plan(batch);
        let reference = plan.reference.unwrap();
        assert!(reference.clipped);
        assert!((reference.height_in - 0.827).abs() < 1e-9);
        let page_width_px = stack.config().page_width_px();
        let clipped_height_px = to_pixels(8.27 / 10.0, 300.0);
        assert_eq!(clipped_height_px, 248);
        for placement in &plan.placements {
            assert_eq!(placement.image.height_px, clipped_height_px);
            assert!(placement.image.width_px <= page_width_px);
            assert!(placement.image.final_size.width <= 8.27);
        }
    }

    #[test]
    fn fixed_height_with_one_image_is_fit_to_width() {
        let stack = PageStack::builder().fixed_height(true).build().unwrap();
        let plan = stack.plan(ImageBatch::new().with(png_pixels("a.png", 144, 72)));
        assert!(plan.reference.is_none());
        assert!(plan.warnings.is_empty());
        assert_eq!(plan.placements[0].image.width_px, 600);
    }

    #[test]
    fn unreadable_image_falls_back_and_is_skipped() {
        let stack = PageStack::builder().fixed_height(true).build().unwrap();
        let batch = ImageBatch::new()
            .with(png_pixels("a.png", 144, 72))
            .with(SourceImage::new("b.png", b"garbage".to_vec()))
            .with(png_pixels("c.png", 72, 72));
        let plan = stack.plan(batch);
        assert!(plan.reference.is_none());
        let codes: Vec<&str> = plan.warnings.iter().map(|w| w.code()).collect();
        assert_eq!(codes, vec!["FIXED_HEIGHT_FALLBACK", "IMAGE_SKIPPED"]);
        assert_eq!(plan.warnings[0].name(), "b.png");
        assert_eq!(plan.pages(), vec![vec!["a.png", "c.png"]]);
        // Fit-to-width keeps the 2x1 in image at its physical size.
        assert_eq!(plan.placements[0].image.width_px, 600);
    }

    #[test]
    fn empty_batch_produces_nothing() {
        let outcome = small_stack().pack(ImageBatch::new(), None).unwrap();
        assert!(matches!(outcome, PackOutcome::NothingProduced { ref warnings } if warnings.is_empty()));
    }

    #[test]
    fn batch_of_only_broken_images_produces_nothing() {
        let batch = ImageBatch::new().with(SourceImage::new("x.png", b"nope".to_vec()));
        let outcome = small_stack().pack(batch, None).unwrap();
        assert!(outcome.document().is_none());
        assert_eq!(outcome.warnings()[0].code(), "IMAGE_SKIPPED");
    }

    #[test]
    fn builder_rejects_invalid_settings() {
        for builder in [
            PageStack::builder().output_dpi(0.0),
            PageStack::builder().output_dpi(2401.0),
            PageStack::builder().output_dpi(f64::NAN),
            PageStack::builder().spacing_mm(-1.0),
            PageStack::builder().spacing_inches(f64::INFINITY),
            PageStack::builder().page_size(PageSize::from_inches(0.0, 11.0)),
        ] {
            assert!(matches!(
                builder.build(),
                Err(PageStackError::InvalidConfiguration(_))
            ));
        }
        assert!(PageStack::builder().output_dpi(2400.0).build().is_ok());
    }

    #[test]
    fn pdf_pages_declare_output_resolution() {
        let batch = ImageBatch::new().with(png_pixels("a.png", 60, 40));
        let stack = PageStack::builder()
            .output_dpi(20.0)
            .document_title("scan")
            .build()
            .unwrap();
        let doc = expect_document(stack.pack(batch, None).unwrap());
        let report = inspect_pdf_bytes(&doc.bytes).unwrap();
        assert_eq!(report.page_count, doc.page_count);
        let page = &report.pages[0];
        // A4 at 20 dpi is 165x233 px.
        assert_eq!(page.images, vec![(165, 233)]);
        assert!((page.media_box[2] - 594.0).abs() < 0.01);
        assert!((page.media_box[3] - 838.8).abs() < 0.01);
        assert!((page.effective_dpi().unwrap() - 20.0).abs() < 0.01);
        assert_eq!(doc.metrics.pages.len(), 1);
        assert_eq!(doc.metrics.images_placed, 1);
        assert_eq!(doc.metrics.total_bytes, doc.bytes.len());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let make = || {
            ImageBatch::new()
                .with(png_pixels("a.png", 90, 200))
                .with(png_pixels("b.png", 50, 80))
        };
        let stack = small_stack();
        let first = expect_document(stack.pack(make(), None).unwrap());
        let second = expect_document(stack.pack(make(), None).unwrap());
        assert_eq!(first.placements, second.placements);
        assert_eq!(first.sha256, second.sha256);
        assert_eq!(first.sha256.len(), 64);
        assert_eq!(first.sha256, sha256_hex(&second.bytes));
    }

    #[test]
    fn progress_reports_every_image() {
        let batch = ImageBatch::new()
            .with(png_pixels("a.png", 20, 20))
            .with(SourceImage::new("b.png", b"bad".to_vec()))
            .with(png_pixels("c.png", 20, 20));
        let mut seen = Vec::new();
        let mut observer = |progress: Progress| seen.push(progress);
        let doc = expect_document(small_stack().pack(batch, Some(&mut observer)).unwrap());
        assert_eq!(
            seen,
            vec![Progress::new(1, 3), Progress::new(2, 3), Progress::new(3, 3)]
        );
        assert_eq!(doc.metrics.images_skipped, 1);
        assert_eq!(doc.warnings.len(), 1);
    }

    #[test]
    fn pack_dir_writes_pdf_for_png_files() {
        let dir = tempfile::tempdir().unwrap();
        for (name, height) in [("p2.png", 60), ("p10.png", 40), ("p1.png", 50)] {
            let source = png_pixels(name, 40, height);
            std::fs::write(dir.path().join(name), &source.data).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), b"skip me").unwrap();
        let output = dir.path().join("out").with_extension("pdf");
        let outcome = small_stack().pack_dir(dir.path(), &output).unwrap();
        let doc = outcome.document().unwrap();
        assert_eq!(doc.pages(), vec![vec!["p1.png", "p2.png", "p10.png"]]);
        let report = inspect_pdf_path(&output).unwrap();
        assert_eq!(report.page_count, 1);
        assert_eq!(report.file_size_bytes, doc.bytes.len());
    }

    #[test]
    fn debug_and_perf_logs_record_page_breaks() {
        let dir = tempfile::tempdir().unwrap();
        let debug_path = dir.path().join("debug.jsonl");
        let perf_path = dir.path().join("perf.jsonl");
        {
            // 20 dpi A4 is 233 px tall; each 1.5 in image is 30 px.
            let stack = PageStack::builder()
                .output_dpi(20.0)
                .spacing_inches(0.0)
                .debug_log(&debug_path)
                .perf_log(&perf_path)
                .build()
                .unwrap();
            let payload = base64::engine::general_purpose::STANDARD
                .encode(png_pixels("img10.png", 108, 108).data);
            let inline =
                SourceImage::from_data_uri("img10.png", &format!("data:image/png;base64,{payload}"))
                    .unwrap();
            let batch: ImageBatch = (0..10)
                .map(|i| png_pixels(&format!("img{i}.png"), 108, 108))
                .chain(std::iter::once(inline))
                .collect();
            let doc = expect_document(stack.pack(batch, None).unwrap());
            assert_eq!(doc.page_count, 2);
            assert_eq!(doc.pages()[0].len(), 7);
        }
        let debug = std::fs::read_to_string(&debug_path).unwrap();
        assert_eq!(debug.matches("\"type\":\"pack.probe\"").count(), 11);
        assert_eq!(debug.matches("\"origin\":null").count(), 10);
        assert!(debug.contains("\"origin\":\"data-uri\""));
        assert_eq!(debug.matches("\"type\":\"pack.page_break\"").count(), 1);
        assert_eq!(debug.matches("\"type\":\"pack.page_sealed\"").count(), 2);
        let summary = debug.lines().last().unwrap();
        assert!(summary.contains("\"type\":\"debug.summary\""));
        assert!(summary.contains("\"images.placed\":11"));
        assert!(summary.contains("\"pages\":2"));
        let perf = std::fs::read_to_string(&perf_path).unwrap();
        assert!(perf.contains("\"name\":\"pack.encode\""));
        assert!(dir.path().join("perf_hot.log").exists());
    }
}
