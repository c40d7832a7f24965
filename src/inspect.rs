use lopdf::{Dictionary as LoDictionary, Document as LoDocument, Object as LoObject};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfInspectErrorCode {
    PdfParseFailed,
    PdfEmptyOrNoPages,
    PdfMalformedPage,
    PdfIoError,
}

impl PdfInspectErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfInspectErrorCode::PdfParseFailed => "PDF_PARSE_FAILED",
            PdfInspectErrorCode::PdfEmptyOrNoPages => "PDF_EMPTY_OR_NO_PAGES",
            PdfInspectErrorCode::PdfMalformedPage => "PDF_MALFORMED_PAGE",
            PdfInspectErrorCode::PdfIoError => "PDF_IO_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInspectError {
    pub code: PdfInspectErrorCode,
    pub message: String,
}

impl PdfInspectError {
    fn new(code: PdfInspectErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PdfInspectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for PdfInspectError {}

#[derive(Debug, Clone, PartialEq)]
pub struct PageInspect {
    /// `[llx, lly, urx, ury]` in points.
    pub media_box: [f32; 4],
    /// Pixel size of every image XObject on the page.
    pub images: Vec<(u32, u32)>,
}

impl PageInspect {
    /// Resolution implied by the first image filling the MediaBox width.
    pub fn effective_dpi(&self) -> Option<f64> {
        let (width_px, _) = *self.images.first()?;
        let width_pt = (self.media_box[2] - self.media_box[0]) as f64;
        if width_pt <= 0.0 {
            return None;
        }
        Some(width_px as f64 * 72.0 / width_pt)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfInspectReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub file_size_bytes: usize,
    pub pages: Vec<PageInspect>,
}

pub fn inspect_pdf_bytes(bytes: &[u8]) -> Result<PdfInspectReport, PdfInspectError> {
    let pdf = LoDocument::load_mem(bytes)
        .map_err(|err| PdfInspectError::new(PdfInspectErrorCode::PdfParseFailed, err.to_string()))?;

    let page_ids = pdf.get_pages();
    if page_ids.is_empty() {
        return Err(PdfInspectError::new(
            PdfInspectErrorCode::PdfEmptyOrNoPages,
            "pdf has no pages",
        ));
    }
    let mut pages = Vec::with_capacity(page_ids.len());
    for (number, page_id) in page_ids {
        let malformed = |what: &str| {
            PdfInspectError::new(
                PdfInspectErrorCode::PdfMalformedPage,
                format!("page {}: {}", number, what),
            )
        };
        let page = pdf
            .get_dictionary(page_id)
            .map_err(|_| malformed("page object is not a dictionary"))?;
        let media_box = read_media_box(&pdf, page).ok_or_else(|| malformed("missing MediaBox"))?;
        let images = page_images(&pdf, page);
        pages.push(PageInspect { media_box, images });
    }

    Ok(PdfInspectReport {
        pdf_version: pdf.version.clone(),
        page_count: pages.len(),
        file_size_bytes: bytes.len(),
        pages,
    })
}

pub fn inspect_pdf_path(path: &Path) -> Result<PdfInspectReport, PdfInspectError> {
    let data = std::fs::read(path)
        .map_err(|err| PdfInspectError::new(PdfInspectErrorCode::PdfIoError, err.to_string()))?;
    inspect_pdf_bytes(&data)
}

fn resolve<'a>(pdf: &'a LoDocument, obj: &'a LoObject) -> Option<&'a LoObject> {
    match obj {
        LoObject::Reference(id) => pdf.get_object(*id).ok(),
        other => Some(other),
    }
}

fn read_media_box(pdf: &LoDocument, page: &LoDictionary) -> Option<[f32; 4]> {
    let array = resolve(pdf, page.get(b"MediaBox").ok()?)?.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let mut out = [0.0f32; 4];
    for (slot, value) in out.iter_mut().zip(array) {
        *slot = resolve(pdf, value)?.as_float().ok()?;
    }
    Some(out)
}

fn page_images(pdf: &LoDocument, page: &LoDictionary) -> Vec<(u32, u32)> {
    let Some(resources) = page
        .get(b"Resources")
        .ok()
        .and_then(|obj| resolve(pdf, obj))
        .and_then(|obj| obj.as_dict().ok())
    else {
        return Vec::new();
    };
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(pdf, obj))
        .and_then(|obj| obj.as_dict().ok())
    else {
        return Vec::new();
    };
    let mut images = Vec::new();
    for (_, value) in xobjects.iter() {
        let Some(stream) = resolve(pdf, value).and_then(|obj| obj.as_stream().ok()) else {
            continue;
        };
        let is_image = stream
            .dict
            .get(b"Subtype")
            .and_then(|obj| obj.as_name())
            .map(|name| name == b"Image")
            .unwrap_or(false);
        if !is_image {
            continue;
        }
        let width = stream.dict.get(b"Width").and_then(|obj| obj.as_i64());
        let height = stream.dict.get(b"Height").and_then(|obj| obj.as_i64());
        if let (Ok(width), Ok(height)) = (width, height) {
            images.push((width.max(0) as u32, height.max(0) as u32));
        }
    }
    images
}
