use super::*;

pub(crate) fn clonefile(src: &CPathBuf, dst: &CPathBuf, flags: CloneFlags) -> PubResult<()> {
    let val = unsafe { libc::clonefile(src.as_ptr(), dst.as_ptr(), flags.bits()) };
    if val != 0 {
        return Err(last_errno());
    }
    Ok(())
}

pub(crate) fn clonefileat(
    src_dir: DirContext,
    src: &CPathBuf,
    dst_dir: DirContext,
    dst: &CPathBuf,
    flags: CloneFlags,
) -> PubResult<()> {
    let val = unsafe {
        libc::clonefileat(
            src_dir.raw_fd(),
            src.as_ptr(),
            dst_dir.raw_fd(),
            dst.as_ptr(),
            flags.bits(),
        )
    };
    if val != 0 {
        return Err(last_errno());
    }
    Ok(())
}

pub(crate) fn fclonefileat(
    src: BorrowedFd,
    dst_dir: DirContext,
    dst: &CPathBuf,
    flags: CloneFlags,
) -> PubResult<()> {
    let val = unsafe {
        libc::fclonefileat(
            src.as_raw_fd(),
            dst_dir.raw_fd(),
            dst.as_ptr(),
            flags.bits(),
        )
    };
    if val != 0 {
        return Err(last_errno());
    }
    Ok(())
}
