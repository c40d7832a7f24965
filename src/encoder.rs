use crate::compose::Page;
use crate::error::PageStackError;
use crate::types::Pt;
use lopdf::content::{Content, Operation};
use lopdf::{Document as LoDocument, Object as LoObject, Stream as LoStream, dictionary};
use rayon::prelude::*;

const PAGE_IMAGE_NAME: &str = "Im0";

#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub pdf_version: PdfVersion,
    pub document_title: Option<String>,
    // Compress page image streams on the rayon pool. Output bytes are identical
    // either way; only wall time changes.
    pub parallel_compress: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            pdf_version: PdfVersion::Pdf17,
            document_title: None,
            parallel_compress: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfVersion {
    Pdf17,
    Pdf20,
}

impl PdfVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfVersion::Pdf17 => "1.7",
            PdfVersion::Pdf20 => "2.0",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EncodedPdf {
    pub bytes: Vec<u8>,
    /// Compressed image stream size per page, in page order.
    pub page_stream_bytes: Vec<usize>,
}

fn lopdf_err(err: lopdf::Error) -> PageStackError {
    PageStackError::Encode(err.to_string())
}

fn page_image_stream(page: &Page) -> LoStream {
    let mut stream = LoStream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => page.width_px() as i64,
            "Height" => page.height_px() as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        page.to_rgb8(),
    );
    // In-memory deflate; on failure the stream stays uncompressed and valid.
    let _ = stream.compress();
    stream
}

/// Serializes sealed pages into one PDF. Page `n` of the output is `pages[n]`;
/// each is a single full-bleed image whose MediaBox is its pixel size at
/// `output_dpi`, so the document declares that resolution throughout.
pub fn encode_pages(
    pages: &[Page],
    output_dpi: f64,
    options: &PdfOptions,
) -> Result<EncodedPdf, PageStackError> {
    if pages.is_empty() {
        return Err(PageStackError::NoPagesToEncode);
    }
    if !output_dpi.is_finite() || output_dpi <= 0.0 {
        return Err(PageStackError::InvalidConfiguration(
            "output dpi must be > 0".to_string(),
        ));
    }

    let streams: Vec<LoStream> = if options.parallel_compress {
        pages.par_iter().map(page_image_stream).collect()
    } else {
        pages.iter().map(page_image_stream).collect()
    };

    let mut doc = LoDocument::with_version(options.pdf_version.as_str());
    let pages_id = doc.new_object_id();
    let mut kids: Vec<LoObject> = Vec::with_capacity(pages.len());
    let mut page_stream_bytes = Vec::with_capacity(pages.len());

    for (page, stream) in pages.iter().zip(streams) {
        page_stream_bytes.push(stream.content.len());
        let image_id = doc.add_object(stream);

        let width = Pt::from_pixels(page.width_px(), output_dpi).to_f32();
        let height = Pt::from_pixels(page.height_px(), output_dpi).to_f32();
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width.into(),
                        0.into(),
                        0.into(),
                        height.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![LoObject::Name(PAGE_IMAGE_NAME.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(LoStream::new(
            dictionary! {},
            content.encode().map_err(lopdf_err)?,
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    PAGE_IMAGE_NAME => image_id,
                },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut info = dictionary! {
        "Producer" => LoObject::string_literal("pagestack"),
    };
    if let Some(title) = options.document_title.as_deref() {
        info.set("Title", LoObject::string_literal(title));
    }
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|err| PageStackError::Encode(err.to_string()))?;
    Ok(EncodedPdf {
        bytes,
        page_stream_bytes,
    })
}
