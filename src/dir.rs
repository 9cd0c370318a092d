//! Directory handles for resolving relative names without touching the process working directory.

use super::*;
use std::borrow::Borrow;
use std::fs::OpenOptions;
use std::os::fd::OwnedFd;
use std::os::unix::fs::OpenOptionsExt;

/// Where relative names in a clone call are resolved from.
#[derive(Clone, Copy, Debug)]
pub enum DirContext<'fd> {
    /// The current working directory (`AT_FDCWD`). Absolute names ignore it.
    Cwd,
    Fd(BorrowedFd<'fd>),
}

impl DirContext<'_> {
    pub(crate) fn raw_fd(self) -> RawFd {
        match self {
            DirContext::Cwd => libc::AT_FDCWD,
            DirContext::Fd(fd) => fd.as_raw_fd(),
        }
    }
}

impl<'fd> From<BorrowedFd<'fd>> for DirContext<'fd> {
    fn from(fd: BorrowedFd<'fd>) -> Self {
        DirContext::Fd(fd)
    }
}

impl<'fd> From<&'fd Dir> for DirContext<'fd> {
    fn from(dir: &'fd Dir) -> Self {
        dir.context()
    }
}

/// An open directory. The descriptor is closed on drop.
#[derive(Debug)]
pub struct Dir {
    fd: OwnedFd,
    path_buf: PathBuf,
}

impl AsRef<Path> for Dir {
    fn as_ref(&self) -> &Path {
        &self.path_buf
    }
}

impl Borrow<Path> for Dir {
    fn borrow(&self) -> &Path {
        &self.path_buf
    }
}

impl AsFd for Dir {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl Dir {
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path_buf = path.into();
        let file = open_dir_as_file(&path_buf)?;
        debug!(path = ?path_buf, fd = file.as_raw_fd(), "opened directory");
        Ok(Self {
            fd: file.into(),
            path_buf,
        })
    }

    /// The path the directory was opened from. It may no longer name the same directory.
    pub fn path(&self) -> &Path {
        &self.path_buf
    }

    pub fn context(&self) -> DirContext<'_> {
        DirContext::Fd(self.fd.as_fd())
    }
}

fn open_dir_as_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_DIRECTORY)
        .open(path)
}
