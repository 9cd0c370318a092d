use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clonefile::harness::{compare_contents, TEST_CONTENT};
use clonefile::*;
use log::warn;
use tempfile::{Builder, TempDir};
use test_log::test;

fn clone_tempdir() -> Result<TempDir> {
    Builder::new()
        .prefix("clone_tests")
        .tempdir_in(env::test_dir())
        .context("creating test dir")
}

fn write_source(dir: &Path, name: &str, content: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut file = File::create(&path)?;
    file.write_all(content)?;
    Ok(path)
}

/// Ok(false) when the filesystem can't clone and the rest of the test should be skipped.
fn cloned(result: PubResult<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(err) if err.is_unsupported() => {
            warn!("skipping, filesystem can't clone: {}", err);
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}

#[test]
fn clonefile_round_trip() -> Result<()> {
    let tempdir = clone_tempdir()?;
    let src = write_source(tempdir.path(), "TestCloneFile", TEST_CONTENT)?;
    let dst = tempdir.path().join("TestCloneFile-cloned");
    if !cloned(clonefile(&src, &dst, CloneFlags::empty()))? {
        assert!(!dst.exists());
        return Ok(());
    }
    assert_eq!(fs::read(&dst)?, b"This is a test");
    // The source is untouched and independent of the clone.
    fs::write(&dst, b"changed")?;
    assert_eq!(fs::read(&src)?, TEST_CONTENT);
    Ok(())
}

#[test]
fn clonefileat_dirs_matches_clonefile() -> Result<()> {
    let src_tempdir = clone_tempdir()?;
    let dst_tempdir = clone_tempdir()?;
    let src = write_source(src_tempdir.path(), "source", TEST_CONTENT)?;
    let by_path = dst_tempdir.path().join("by-path");
    if !cloned(clonefile(&src, &by_path, CloneFlags::empty()))? {
        return Ok(());
    }
    let src_dir = Dir::open(src_tempdir.path())?;
    let dst_dir = Dir::open(dst_tempdir.path())?;
    assert!(cloned(clonefileat(
        src_dir.context(),
        Path::new("source"),
        dst_dir.context(),
        Path::new("by-dirs"),
        CloneFlags::empty(),
    ))?);
    let by_dirs = fs::read(dst_tempdir.path().join("by-dirs"))?;
    assert_eq!(compare_contents(&fs::read(&by_path)?, &by_dirs), None);
    assert_eq!(by_dirs, TEST_CONTENT);
    Ok(())
}

#[test]
fn clonefileat_cwd_with_absolute_paths() -> Result<()> {
    let tempdir = clone_tempdir()?;
    let src = write_source(tempdir.path(), "TestCloneFileat", TEST_CONTENT)?;
    let dst = tempdir.path().join("TestCloneFileat-cloned");
    if !cloned(clonefileat(
        DirContext::Cwd,
        &src,
        DirContext::Cwd,
        &dst,
        CloneFlags::empty(),
    ))? {
        return Ok(());
    }
    assert_eq!(fs::read(&dst)?, TEST_CONTENT);
    Ok(())
}

#[test]
fn fclonefileat_after_write_and_close() -> Result<()> {
    let tempdir = clone_tempdir()?;
    let src_path = write_source(tempdir.path(), "TestCloneFile", TEST_CONTENT)?;
    let src = File::open(&src_path)?;
    let dst_dir = Dir::open(tempdir.path())?;
    if !cloned(fclonefileat(
        &src,
        dst_dir.context(),
        Path::new("TestFcloneFileat"),
        CloneFlags::empty(),
    ))? {
        return Ok(());
    }
    assert_eq!(fs::read(tempdir.path().join("TestFcloneFileat"))?, TEST_CONTENT);
    Ok(())
}

#[test]
fn fclonefileat_existing_destination_untouched() -> Result<()> {
    let tempdir = clone_tempdir()?;
    let src_path = write_source(tempdir.path(), "source", TEST_CONTENT)?;
    let dst = write_source(tempdir.path(), "existing", b"keep me")?;
    let src = File::open(&src_path)?;
    match fclonefile(&src, &dst, CloneFlags::empty()) {
        Err(Error::DestinationExists) => {}
        Err(err) if err.is_unsupported() => return Ok(()),
        other => panic!("expected destination exists, got {:?}", other),
    }
    assert_eq!(fs::read(&dst)?, b"keep me");
    Ok(())
}

#[test]
fn clonefile_missing_source_leaves_no_destination() -> Result<()> {
    let tempdir = clone_tempdir()?;
    let dst = tempdir.path().join("cloned");
    let err = clonefile(&tempdir.path().join("missing"), &dst, CloneFlags::empty())
        .expect_err("source doesn't exist");
    assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
    assert!(dst.symlink_metadata().is_err());
    Ok(())
}

#[test]
fn clone_into_missing_directory() -> Result<()> {
    let tempdir = clone_tempdir()?;
    let src = write_source(tempdir.path(), "source", TEST_CONTENT)?;
    let dst = tempdir.path().join("nodir").join("cloned");
    match clonefile(&src, &dst, CloneFlags::empty()) {
        Err(err) if err.is_unsupported() => {}
        Err(err) => assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound)),
        Ok(()) => panic!("cloned into a directory that doesn't exist"),
    }
    Ok(())
}

#[test]
fn nofollow_clones_symlink() -> Result<()> {
    let tempdir = clone_tempdir()?;
    let target = write_source(tempdir.path(), "target", TEST_CONTENT)?;
    let link = tempdir.path().join("link");
    std::os::unix::fs::symlink(&target, &link)?;
    let dst = tempdir.path().join("link-cloned");
    if !cloned(clonefile(&link, &dst, CloneFlags::NOFOLLOW))? {
        return Ok(());
    }
    assert!(dst.symlink_metadata()?.file_type().is_symlink());
    assert_eq!(fs::read_link(&dst)?, target);
    Ok(())
}

#[test]
fn follows_symlink_by_default() -> Result<()> {
    let tempdir = clone_tempdir()?;
    let target = write_source(tempdir.path(), "target", TEST_CONTENT)?;
    let link = tempdir.path().join("link");
    std::os::unix::fs::symlink(&target, &link)?;
    let dst = tempdir.path().join("link-cloned");
    if !cloned(clonefile(&link, &dst, CloneFlags::empty()))? {
        return Ok(());
    }
    assert!(dst.symlink_metadata()?.file_type().is_file());
    assert_eq!(fs::read(&dst)?, TEST_CONTENT);
    Ok(())
}
