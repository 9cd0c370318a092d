use super::*;
use std::convert::TryFrom;
use std::ffi::{c_char, CStr, CString, NulError};
use std::os::unix::ffi::OsStrExt;

/// A PathBuf like implementation for use with C APIs that expect a nul-terminated C string. Should
/// convert easily from common Rust path types, and have methods that pass to C.
#[derive(Debug, Clone)]
pub(crate) struct CPathBuf(CString);

impl TryFrom<&Path> for CPathBuf {
    type Error = NulError;

    fn try_from(value: &Path) -> Result<Self, Self::Error> {
        // Unix paths are arbitrary bytes, so an interior nul is possible and has to be rejected
        // here rather than silently truncating the path at the C boundary.
        Ok(Self(CString::new(value.as_os_str().as_bytes())?))
    }
}

impl CPathBuf {
    pub(crate) fn as_ptr(&self) -> *const c_char {
        self.0.as_ptr()
    }

    pub(crate) fn as_c_str(&self) -> &CStr {
        self.0.as_c_str()
    }
}
