//! Copy-on-write file cloning: `clonefile`, `clonefileat` and `fclonefileat`, with a harness that
//! verifies clones read back byte for byte.
//!
//! Apple targets call the native syscalls. Linux emulates them with the `FICLONE`
//! ioctl. Other unix targets build, but every clone reports [`Error::UnsupportedFilesystem`].

#[cfg(not(unix))]
compile_error!("clonefile only supports unix targets");

use std::fs::File;
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::path::{Path, PathBuf};

use tracing::debug;

#[macro_use]
mod macros;

mod clonefile;
mod cpathbuf;
pub mod dir;
pub mod env;
mod error;
pub mod flags;
pub mod harness;
mod sys;
pub mod testing;

pub use crate::clonefile::{clonefile, clonefileat, fclonefile, fclonefileat};
pub use dir::{Dir, DirContext};
pub use error::Error;
pub use flags::CloneFlags;

use cpathbuf::CPathBuf;

pub type PubResult<T> = Result<T, Error>;

#[cfg(test)]
use test_log::test;
