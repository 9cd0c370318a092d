use super::*;
use once_cell::sync::OnceCell;

/// Names the directory the verification harness creates its temporary files under. Cloning only
/// works on some filesystems (APFS, btrfs, XFS with reflink), so point this at one of those to
/// exercise successful clones.
pub const TEST_DIR_VAR: &str = "CLONEFILE_TEST_DIR";

/// Base directory for harness temporary files. Read once per process.
pub fn test_dir() -> &'static Path {
    static CELL: OnceCell<PathBuf> = OnceCell::new();
    CELL.get_or_init(|| match std::env::var_os(TEST_DIR_VAR) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir(),
    })
}
