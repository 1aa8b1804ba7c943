use std::path::{Path, PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures of a conversion run.
///
/// `Write`, `Storage` and `Io` all originate on the output side and leave any
/// levels that were already stored on disk.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("input file does not exist: {}", .0.display())]
    NotFound(PathBuf),
    #[error("cannot decode {} as an image stack: {message}", path.display())]
    Format { path: PathBuf, message: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("write failed: {0}")]
    Write(String),
    #[error(transparent)]
    Storage(Box<dyn std::error::Error>),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn format(path: &Path, message: impl ToString) -> Self {
        Self::Format {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::Write(message.into())
    }

    pub fn wrap(error: impl std::error::Error + 'static) -> Self {
        Self::Storage(Box::new(error))
    }

    /// True for every variant raised while writing the output dataset.
    pub fn is_write_error(&self) -> bool {
        matches!(self, Self::Write(_) | Self::Storage(_) | Self::Io(_))
    }
}
