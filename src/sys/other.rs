use tracing::warn;

use super::*;

// TODO: On Solaris we want to use reflink(3), and FreeBSD may grow a clone ioctl.

fn unsupported() -> PubResult<()> {
    warn!("file cloning is not implemented for this platform");
    Err(Error::UnsupportedFilesystem)
}

pub(crate) fn clonefile(_src: &CPathBuf, _dst: &CPathBuf, _flags: CloneFlags) -> PubResult<()> {
    unsupported()
}

pub(crate) fn clonefileat(
    _src_dir: DirContext,
    _src: &CPathBuf,
    _dst_dir: DirContext,
    _dst: &CPathBuf,
    _flags: CloneFlags,
) -> PubResult<()> {
    unsupported()
}

pub(crate) fn fclonefileat(
    _src: BorrowedFd,
    _dst_dir: DirContext,
    _dst: &CPathBuf,
    _flags: CloneFlags,
) -> PubResult<()> {
    unsupported()
}
