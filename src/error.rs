use std::fmt;

#[derive(Debug)]
pub enum PageStackError {
    NoPagesToEncode,
    InvalidConfiguration(String),
    Source { name: String, message: String },
    Encode(String),
    Raster(String),
    Io(std::io::Error),
}

impl fmt::Display for PageStackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageStackError::NoPagesToEncode => write!(f, "no pages to encode"),
            PageStackError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            PageStackError::Source { name, message } => {
                write!(f, "image source '{}' unreadable: {}", name, message)
            }
            PageStackError::Encode(message) => write!(f, "pdf encode error: {}", message),
            PageStackError::Raster(message) => write!(f, "raster error: {}", message),
            PageStackError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for PageStackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PageStackError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PageStackError {
    fn from(value: std::io::Error) -> Self {
        PageStackError::Io(value)
    }
}
