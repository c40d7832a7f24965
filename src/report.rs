use crate::metrics::PackMetrics;
use crate::reference::ReferenceHeight;
use crate::scale::PlacedImage;

/// Non-fatal conditions collected during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackWarning {
    /// The reference height could not be computed; the batch was laid out
    /// fit-to-width instead.
    FixedHeightFallback { name: String, message: String },
    SkippedImage { name: String, message: String },
}

impl PackWarning {
    pub fn code(&self) -> &'static str {
        match self {
            PackWarning::FixedHeightFallback { .. } => "FIXED_HEIGHT_FALLBACK",
            PackWarning::SkippedImage { .. } => "IMAGE_SKIPPED",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PackWarning::FixedHeightFallback { name, .. } | PackWarning::SkippedImage { name, .. } => name,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PackWarning::FixedHeightFallback { message, .. }
            | PackWarning::SkippedImage { message, .. } => message,
        }
    }
}

impl std::fmt::Display for PackWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.code(), self.name(), self.message())
    }
}

/// One source image as it ended up in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub name: String,
    /// 0-based page index.
    pub page_index: usize,
    pub x_px: u32,
    pub y_px: u32,
    pub image: PlacedImage,
}

#[derive(Debug, Clone)]
pub struct PackedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// In natural order; skipped images are absent.
    pub placements: Vec<Placement>,
    pub warnings: Vec<PackWarning>,
    pub metrics: PackMetrics,
    /// Lowercase hex SHA-256 of `bytes`.
    pub sha256: String,
}

impl PackedDocument {
    /// Source names grouped by page.
    pub fn pages(&self) -> Vec<Vec<&str>> {
        names_by_page(&self.placements, self.page_count)
    }
}

/// Geometry of a run computed from image headers alone; nothing is decoded
/// or rendered.
#[derive(Debug, Clone)]
pub struct LayoutPlan {
    pub placements: Vec<Placement>,
    pub page_count: usize,
    /// Set when fixed-height mode was requested and could be honored.
    pub reference: Option<ReferenceHeight>,
    pub warnings: Vec<PackWarning>,
}

impl LayoutPlan {
    pub fn pages(&self) -> Vec<Vec<&str>> {
        names_by_page(&self.placements, self.page_count)
    }
}

fn names_by_page(placements: &[Placement], page_count: usize) -> Vec<Vec<&str>> {
    let mut pages: Vec<Vec<&str>> = vec![Vec::new(); page_count];
    for placement in placements {
        if let Some(page) = pages.get_mut(placement.page_index) {
            page.push(&placement.name);
        }
    }
    pages
}

#[derive(Debug, Clone)]
pub enum PackOutcome {
    Produced(PackedDocument),
    /// The batch was empty or no image could be placed.
    NothingProduced { warnings: Vec<PackWarning> },
}

impl PackOutcome {
    pub fn document(&self) -> Option<&PackedDocument> {
        match self {
            PackOutcome::Produced(doc) => Some(doc),
            PackOutcome::NothingProduced { .. } => None,
        }
    }

    pub fn into_document(self) -> Option<PackedDocument> {
        match self {
            PackOutcome::Produced(doc) => Some(doc),
            PackOutcome::NothingProduced { .. } => None,
        }
    }

    pub fn warnings(&self) -> &[PackWarning] {
        match self {
            PackOutcome::Produced(doc) => &doc.warnings,
            PackOutcome::NothingProduced { warnings } => warnings,
        }
    }
}
