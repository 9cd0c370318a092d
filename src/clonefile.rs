//! Copy-on-write clone operations. Each is a single call into the platform: nothing is retried,
//! and the destination must not already exist.

use super::*;

/// Clones `src_path` to a new file at `dst_path`.
pub fn clonefile(src_path: &Path, dst_path: &Path, flags: CloneFlags) -> PubResult<()> {
    let src = CPathBuf::try_from(src_path)?;
    let dst = CPathBuf::try_from(dst_path)?;
    debug!(?src_path, ?dst_path, ?flags, "clonefile");
    log_time!("clonefile", sys::clonefile(&src, &dst, flags))
}

/// Clones `src_name` resolved against `src_dir` to `dst_name` resolved against `dst_dir`. Absolute
/// names ignore their directory, and [`DirContext::Cwd`] on both sides is equivalent to
/// [`clonefile`].
pub fn clonefileat(
    src_dir: DirContext,
    src_name: &Path,
    dst_dir: DirContext,
    dst_name: &Path,
    flags: CloneFlags,
) -> PubResult<()> {
    let src = CPathBuf::try_from(src_name)?;
    let dst = CPathBuf::try_from(dst_name)?;
    debug!(?src_dir, ?src_name, ?dst_dir, ?dst_name, ?flags, "clonefileat");
    log_time!(
        "clonefileat",
        sys::clonefileat(src_dir, &src, dst_dir, &dst, flags)
    )
}

/// Clones the already open `src` to `dst_name` resolved against `dst_dir`.
pub fn fclonefileat(
    src: impl AsFd,
    dst_dir: DirContext,
    dst_name: &Path,
    flags: CloneFlags,
) -> PubResult<()> {
    let dst = CPathBuf::try_from(dst_name)?;
    let src = src.as_fd();
    debug!(src_fd = src.as_raw_fd(), ?dst_dir, ?dst_name, ?flags, "fclonefileat");
    log_time!(
        { src_fd = src.as_raw_fd() },
        "fclonefileat",
        sys::fclonefileat(src, dst_dir, &dst, flags)
    )
}

// fclonefileat but the dst is probably supposed to be an absolute path.
pub fn fclonefile(src: impl AsFd, dst_path: &Path, flags: CloneFlags) -> PubResult<()> {
    fclonefileat(src, DirContext::Cwd, dst_path, flags)
}
