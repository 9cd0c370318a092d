use std::ffi::NulError;

use thiserror::Error;

use super::*;

#[derive(Error, Debug)]
pub enum Error {
    #[error("file cloning not supported by filesystem")]
    UnsupportedFilesystem,
    #[error("source and destination are on different filesystems")]
    CrossDevice,
    #[error("destination already exists")]
    DestinationExists,
    #[error("invalid clone flags {0:#x}")]
    InvalidFlags(u32),
    #[error("path contains nul byte: {0}")]
    InvalidPath(#[from] NulError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// The filesystem (or pair of filesystems) can't share blocks between these files. Nothing
    /// was wrong with the request itself.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::UnsupportedFilesystem | Error::CrossDevice)
    }

    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Error::Io(err) => Some(err.kind()),
            Error::DestinationExists => Some(io::ErrorKind::AlreadyExists),
            _ => None,
        }
    }
}
