use crate::resolution::{ImageProbe, ProbeError};

/// Outcome of the batch-wide scan that picks the uniform height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceHeight {
    /// Physical height of the image at sorted index 1.
    pub candidate_in: f64,
    pub max_aspect_ratio: f64,
    /// Height every image is scaled to.
    pub height_in: f64,
    pub clipped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceError {
    /// Fewer than two images; fixed-height mode does not apply.
    TooFewImages(usize),
    Probe { index: usize, error: ProbeError },
}

impl std::fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceError::TooFewImages(count) => {
                write!(f, "fixed-height mode needs at least 2 images, got {}", count)
            }
            ReferenceError::Probe { index, error } => {
                write!(f, "image #{} could not be read: {}", index + 1, error)
            }
        }
    }
}

impl std::error::Error for ReferenceError {}

/// Computes the safe uniform height for fixed-height mode.
///
/// The candidate comes from the *second* image in sorted order, not the
/// first. Every image's aspect ratio is scanned; if the widest one scaled to
/// the candidate height would overflow `page_width_in`, the height is
/// clipped to `page_width_in / max_aspect_ratio`. Any unreadable image fails
/// the whole computation.
pub fn compute_reference_height(
    probes: &[Result<ImageProbe, ProbeError>],
    page_width_in: f64,
) -> Result<ReferenceHeight, ReferenceError> {
    if probes.len() < 2 {
        return Err(ReferenceError::TooFewImages(probes.len()));
    }
    let mut max_aspect_ratio = 0.0f64;
    let mut candidate_in = 0.0f64;
    for (index, probe) in probes.iter().enumerate() {
        let probe = probe.as_ref().map_err(|error| ReferenceError::Probe {
            index,
            error: error.clone(),
        })?;
        let physical = probe.physical_size();
        if index == 1 {
            candidate_in = physical.height;
        }
        max_aspect_ratio = max_aspect_ratio.max(physical.aspect_ratio());
    }

    let potential_max_width = candidate_in * max_aspect_ratio;
    let (height_in, clipped) = if potential_max_width > page_width_in {
        (page_width_in / max_aspect_ratio, true)
    } else {
        (candidate_in, false)
    };
    Ok(ReferenceHeight {
        candidate_in,
        max_aspect_ratio,
        height_in,
        clipped,
    })
}
