//! Raw clone syscalls, or their emulation where the platform names them differently.
//!
//! Each platform module provides `clonefile`, `clonefileat` and `fclonefileat` taking
//! already-converted paths, and returns crate errors.

use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};

use cfg_if::cfg_if;
use libc::{c_int, EEXIST, ENOTSUP, EOPNOTSUPP, EXDEV};
use nix::errno::Errno;

// Not a glob of the crate root: the platform modules export names that collide with the public
// wrappers.
use crate::{CPathBuf, CloneFlags, DirContext, Error, PubResult};

cfg_if! {
    if #[cfg(target_vendor = "apple")] {
        mod apple;
        pub(crate) use apple::*;
    } else if #[cfg(target_os = "linux")] {
        mod linux;
        pub(crate) use linux::*;
    } else {
        mod other;
        pub(crate) use other::*;
    }
}

// Here and not in crate::Error because ENOTSUP and EXDEV have special meaning for cloning.
pub(crate) fn last_errno() -> Error {
    errno_error(Errno::last() as c_int)
}

pub(crate) fn errno_error(errno: c_int) -> Error {
    // On Linux EOPNOTSUPP and ENOTSUP are the same value, on Darwin they differ.
    if errno == ENOTSUP || errno == EOPNOTSUPP {
        Error::UnsupportedFilesystem
    } else if errno == EXDEV {
        Error::CrossDevice
    } else if errno == EEXIST {
        Error::DestinationExists
    } else {
        io::Error::from_raw_os_error(errno).into()
    }
}
