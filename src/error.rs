use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
    #[error("Dataset error: {message}")]
    Dataset { message: String },
    #[error("Invalid year range: {text:?}")]
    Range { text: String },
}

pub type Result<T> = std::result::Result<T, ResolverError>;

// Helper conversions
impl From<serde_json::Error> for ResolverError {
    fn from(e: serde_json::Error) -> Self {
        Self::Dataset { message: e.to_string() }
    }
}
impl From<config::ConfigError> for ResolverError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
impl From<std::io::Error> for ResolverError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { path: String::new(), message: e.to_string() }
    }
}

impl ResolverError {
    pub fn io(path: &std::path::Path, e: std::io::Error) -> Self {
        Self::Io { path: path.display().to_string(), message: e.to_string() }
    }
}
