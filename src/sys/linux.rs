//! Linux has no clonefile family. Emulate it: open the source, create the destination exclusively
//! (clonefile never replaces), share the extents with the FICLONE ioctl, and unlink the
//! destination if anything after its creation fails.

use std::ffi::OsString;
use std::fs::File;
use std::os::fd::{AsFd, FromRawFd, RawFd};
use std::os::unix::ffi::OsStringExt;

use libc::{EINVAL, ELOOP, ENAMETOOLONG, ENOTTY};
use tracing::{debug, warn};

use super::*;

fn nix_error(errno: Errno) -> Error {
    errno_error(errno as c_int)
}

// FICLONE reports filesystems without reflink support in more ways than clonefile does. Sources
// that aren't regular files are refused before FICLONE sees them, so here EINVAL is the filesystem.
fn ficlone_errno_error(errno: c_int) -> Error {
    if errno == EINVAL || errno == ENOTTY {
        Error::UnsupportedFilesystem
    } else {
        errno_error(errno)
    }
}

/// The destination is always owned by the caller, so NOOWNERCOPY holds trivially. ACLs and
/// path-wide symlink refusal can't be provided.
fn check_flags(flags: CloneFlags) -> PubResult<()> {
    let unsupported = flags.difference(CloneFlags::NOFOLLOW | CloneFlags::NOOWNERCOPY);
    if !unsupported.is_empty() {
        return Err(Error::InvalidFlags(unsupported.bits()));
    }
    Ok(())
}

pub(crate) fn clonefile(src: &CPathBuf, dst: &CPathBuf, flags: CloneFlags) -> PubResult<()> {
    clonefileat(DirContext::Cwd, src, DirContext::Cwd, dst, flags)
}

pub(crate) fn clonefileat(
    src_dir: DirContext,
    src: &CPathBuf,
    dst_dir: DirContext,
    dst: &CPathBuf,
    flags: CloneFlags,
) -> PubResult<()> {
    check_flags(flags)?;
    let nofollow = flags.contains(CloneFlags::NOFOLLOW);
    // Opening a FIFO without O_NONBLOCK waits for a writer.
    let mut oflag = libc::O_RDONLY | libc::O_CLOEXEC | libc::O_NONBLOCK;
    if nofollow {
        oflag |= libc::O_NOFOLLOW;
    }
    let fd = unsafe { libc::openat(src_dir.raw_fd(), src.as_ptr(), oflag) };
    if fd == -1 {
        let errno = Errno::last() as c_int;
        if nofollow && errno == ELOOP {
            return clone_symlink(src_dir, src, dst_dir, dst);
        }
        return Err(errno_error(errno));
    }
    let src_file = unsafe { File::from_raw_fd(fd) };
    fclonefileat(src_file.as_fd(), dst_dir, dst, flags)
}

pub(crate) fn fclonefileat(
    src: BorrowedFd,
    dst_dir: DirContext,
    dst: &CPathBuf,
    flags: CloneFlags,
) -> PubResult<()> {
    check_flags(flags)?;
    let stat = nix::sys::stat::fstat(src.as_raw_fd()).map_err(nix_error)?;
    match stat.st_mode & libc::S_IFMT {
        libc::S_IFREG => {}
        libc::S_IFDIR => return Err(io::Error::from_raw_os_error(libc::EISDIR).into()),
        // FIFOs, sockets and devices have no extents to share.
        _ => return Err(io::Error::from_raw_os_error(EINVAL).into()),
    }
    let dst_file = PendingDestination::create(dst_dir, dst)?;
    // The request type differs between libc flavours.
    let rv = unsafe { libc::ioctl(dst_file.as_raw_fd(), libc::FICLONE as _, src.as_raw_fd()) };
    if rv == -1 {
        return Err(ficlone_errno_error(Errno::last() as c_int));
    }
    let mode = stat.st_mode & 0o7777;
    Errno::result(unsafe { libc::fchmod(dst_file.as_raw_fd(), mode) }).map_err(nix_error)?;
    dst_file.persist();
    Ok(())
}

/// Cloning a symlink without following it reproduces the link.
fn clone_symlink(
    src_dir: DirContext,
    src: &CPathBuf,
    dst_dir: DirContext,
    dst: &CPathBuf,
) -> PubResult<()> {
    let target = read_link_at(src_dir, src, libc::PATH_MAX as usize)?;
    debug!(?target, dst = ?dst.as_c_str(), "cloning symlink");
    nix::unistd::symlinkat(target.as_os_str(), Some(dst_dir.raw_fd()), dst.as_c_str())
        .map_err(nix_error)
}

/// readlinkat doesn't terminate or report truncation, so a target that fills the buffer is
/// refused.
fn read_link_at(dir: DirContext, path: &CPathBuf, capacity: usize) -> PubResult<OsString> {
    let mut buf = vec![0u8; capacity];
    let len = unsafe {
        libc::readlinkat(
            dir.raw_fd(),
            path.as_ptr(),
            buf.as_mut_ptr().cast(),
            buf.len(),
        )
    };
    if len == -1 {
        return Err(last_errno());
    }
    let len = len as usize;
    if len == buf.len() {
        return Err(io::Error::from_raw_os_error(ENAMETOOLONG).into());
    }
    buf.truncate(len);
    Ok(OsString::from_vec(buf))
}

/// A destination file created for a clone. Unlinked on drop unless persisted.
struct PendingDestination<'a> {
    file: File,
    dir: DirContext<'a>,
    name: &'a CPathBuf,
    persisted: bool,
}

impl<'a> PendingDestination<'a> {
    fn create(dir: DirContext<'a>, name: &'a CPathBuf) -> PubResult<Self> {
        let oflag = libc::O_CREAT | libc::O_EXCL | libc::O_WRONLY | libc::O_CLOEXEC;
        let fd = unsafe { libc::openat(dir.raw_fd(), name.as_ptr(), oflag, 0o600 as libc::c_uint) };
        if fd == -1 {
            return Err(last_errno());
        }
        Ok(Self {
            file: unsafe { File::from_raw_fd(fd) },
            dir,
            name,
            persisted: false,
        })
    }

    fn persist(mut self) {
        self.persisted = true;
    }
}

impl AsRawFd for PendingDestination<'_> {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl Drop for PendingDestination<'_> {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        let rv = unsafe { libc::unlinkat(self.dir.raw_fd(), self.name.as_ptr(), 0) };
        if rv == -1 {
            warn!(
                name = ?self.name.as_c_str(),
                err = %io::Error::last_os_error(),
                "removing failed clone destination"
            );
        }
    }
}
