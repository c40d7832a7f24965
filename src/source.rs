use crate::error::PageStackError;
use crate::natural_sort::sort_naturally;
use base64::Engine;
use std::path::Path;

/// A named, fully buffered input image. The bytes stay owned for the whole
/// run so the probe pass and the placement pass can both read them.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub name: String,
    pub data: Vec<u8>,
    pub origin: Option<String>,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
            origin: None,
        }
    }

    /// Reads a file; the name is its file name so ordering follows it.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PageStackError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| path.display().to_string());
        let data = std::fs::read(path).map_err(|err| PageStackError::Source {
            name: name.clone(),
            message: err.to_string(),
        })?;
        Ok(Self {
            name,
            data,
            origin: Some(path.display().to_string()),
        })
    }

    pub fn from_data_uri(name: impl Into<String>, uri: &str) -> Result<Self, PageStackError> {
        let name = name.into();
        let Some((_mime, data)) = parse_data_uri(uri) else {
            return Err(PageStackError::Source {
                name,
                message: "malformed data URI".to_string(),
            });
        };
        Ok(Self {
            name,
            data,
            origin: Some("data-uri".to_string()),
        })
    }

    pub fn bytes_len(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageBatch {
    images: Vec<SourceImage>,
}

impl ImageBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, image: SourceImage) {
        self.images.push(image);
    }

    pub fn with(mut self, image: SourceImage) -> Self {
        self.images.push(image);
        self
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Non-recursive scan of `dir` for files whose extension matches one of
    /// `extensions` (case-insensitive). An empty list means `png` only.
    pub fn from_dir(dir: impl AsRef<Path>, extensions: &[&str]) -> Result<Self, PageStackError> {
        let dir = dir.as_ref();
        let wanted: Vec<String> = if extensions.is_empty() {
            vec!["png".to_string()]
        } else {
            extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect()
        };
        let mut batch = ImageBatch::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(ext) = path.extension().and_then(|v| v.to_str()) else {
                continue;
            };
            if !wanted.iter().any(|w| w.eq_ignore_ascii_case(ext)) {
                continue;
            }
            batch.add(SourceImage::from_path(&path)?);
        }
        Ok(batch)
    }

    /// Consumes the batch in natural name order. Equal keys keep insertion order.
    pub fn into_sorted(self) -> Vec<SourceImage> {
        let mut images = self.images;
        sort_naturally(&mut images, |image| image.name.as_str());
        images
    }
}

impl FromIterator<SourceImage> for ImageBatch {
    fn from_iter<I: IntoIterator<Item = SourceImage>>(iter: I) -> Self {
        Self {
            images: iter.into_iter().collect(),
        }
    }
}

fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    if !uri.starts_with("data:") {
        return None;
    }
    let (header, payload) = uri.split_once(',')?;
    let mime = header
        .trim_start_matches("data:")
        .split(';')
        .next()
        .filter(|v| !v.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .ok()?
    } else {
        payload.as_bytes().to_vec()
    };
    Some((mime, data))
}
