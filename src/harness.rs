//! Clone verification: write known content to a source file, clone it with one of the clone
//! operations, read the destination back and compare bytes.
//!
//! Each verification is a step with its own source and destination directories under the base
//! directory. Everything a step creates or opens is released when the step returns, whether it
//! passed or not.

use std::cmp::min;
use std::fmt;
use std::fs;
use std::time::{Duration, Instant};

use tempfile::{Builder, TempDir};
use thiserror::Error;
use tracing::info;

use super::*;

/// Content used when the caller has nothing in particular to clone.
pub const TEST_CONTENT: &[u8] = b"This is a test";

const SOURCE_NAME: &str = "source";
const CLONED_NAME: &str = "source-cloned";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CloneOp {
    /// [`clonefile`] with absolute paths.
    Path,
    /// [`clonefileat`] with both sides resolved from the current directory.
    AtCwd,
    /// [`clonefileat`] with relative names under separate source and destination directory
    /// handles.
    AtDirs,
    /// [`fclonefileat`] from a source opened after it was written and closed.
    FromHandle,
}

impl CloneOp {
    pub const ALL: [CloneOp; 4] = [
        CloneOp::Path,
        CloneOp::AtCwd,
        CloneOp::AtDirs,
        CloneOp::FromHandle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CloneOp::Path => "clonefile",
            CloneOp::AtCwd => "clonefileat(cwd)",
            CloneOp::AtDirs => "clonefileat(dirs)",
            CloneOp::FromHandle => "fclonefileat",
        }
    }
}

impl fmt::Display for CloneOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What to do when the destination of a clone already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DestinationPolicy {
    /// The clone must be rejected and the existing destination left alone.
    #[default]
    Fail,
    /// Remove the existing destination before cloning.
    Replace,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    pub expected_len: usize,
    pub actual_len: usize,
    /// Offset of the first differing byte. If one is a prefix of the other, this is the shorter
    /// length.
    pub first_difference: usize,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected {} bytes, got {}, first difference at offset {}",
            self.expected_len, self.actual_len, self.first_difference
        )
    }
}

/// Exact byte comparison. No truncation or padding is tolerated.
pub fn compare_contents(expected: &[u8], actual: &[u8]) -> Option<Mismatch> {
    if expected == actual {
        return None;
    }
    let first_difference = expected
        .iter()
        .zip(actual)
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| min(expected.len(), actual.len()));
    Some(Mismatch {
        expected_len: expected.len(),
        actual_len: actual.len(),
        first_difference,
    })
}

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("setting up {what} for {op}: {source}")]
    Setup {
        op: CloneOp,
        what: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("{op} {src:?} -> {dst:?}: {source}")]
    Clone {
        op: CloneOp,
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: Error,
    },
    #[error("reading back {path:?} after {op}: {source}")]
    ReadBack {
        op: CloneOp,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{op} reported success but {path:?} differs from the source: {mismatch}")]
    Mismatch {
        op: CloneOp,
        path: PathBuf,
        mismatch: Mismatch,
    },
    #[error("{op} to {dst:?} succeeded but should have failed")]
    UnexpectedSuccess { op: CloneOp, dst: PathBuf },
    #[error("{op} failed but left a destination at {path:?}")]
    LeftDestination { op: CloneOp, path: PathBuf },
    #[error("{op} modified existing destination {path:?}")]
    Clobbered { op: CloneOp, path: PathBuf },
}

impl VerifyError {
    /// The clone failed only because the filesystem under the harness can't clone.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, VerifyError::Clone { source, .. } if source.is_unsupported())
    }

    pub fn op(&self) -> CloneOp {
        match self {
            VerifyError::Setup { op, .. }
            | VerifyError::Clone { op, .. }
            | VerifyError::ReadBack { op, .. }
            | VerifyError::Mismatch { op, .. }
            | VerifyError::UnexpectedSuccess { op, .. }
            | VerifyError::LeftDestination { op, .. }
            | VerifyError::Clobbered { op, .. } => *op,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CloneReport {
    pub op: CloneOp,
    pub src: PathBuf,
    pub dst: PathBuf,
    pub len: u64,
    /// Time spent in the clone call alone, excluding opening the handles it's given.
    pub elapsed: Duration,
}

#[derive(Debug)]
pub enum ExistingOutcome {
    /// The clone failed with [`Error::DestinationExists`] and the destination is unchanged.
    Rejected,
    /// The destination was removed and replaced by the clone.
    Replaced(CloneReport),
}

/// One verification's directories. Dropping it removes both.
struct Step {
    op: CloneOp,
    src_dir: TempDir,
    dst_dir: TempDir,
}

impl Step {
    fn src_path(&self) -> PathBuf {
        self.src_dir.path().join(SOURCE_NAME)
    }

    fn dst_path(&self) -> PathBuf {
        self.dst_dir.path().join(CLONED_NAME)
    }

    fn setup_err(&self, what: &'static str) -> impl FnOnce(io::Error) -> VerifyError {
        let op = self.op;
        move |source| VerifyError::Setup { op, what, source }
    }

    fn clone_err(&self, source: Error) -> VerifyError {
        VerifyError::Clone {
            op: self.op,
            src: self.src_path(),
            dst: self.dst_path(),
            source,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Harness {
    base: PathBuf,
    flags: CloneFlags,
    policy: DestinationPolicy,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// A harness working under [`env::test_dir`].
    pub fn new() -> Self {
        Self::in_dir(env::test_dir())
    }

    pub fn in_dir(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            flags: CloneFlags::empty(),
            policy: DestinationPolicy::default(),
        }
    }

    pub fn flags(mut self, flags: CloneFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn destination_policy(mut self, policy: DestinationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Clones `content` with `op` into a fresh destination and checks it reads back identically.
    pub fn verify(&self, op: CloneOp, content: &[u8]) -> Result<CloneReport, VerifyError> {
        let step = self.new_step(op)?;
        self.write_source(&step, content)?;
        self.clone_and_compare(&step, content)
    }

    pub fn verify_all(&self, content: &[u8]) -> Vec<(CloneOp, Result<CloneReport, VerifyError>)> {
        CloneOp::ALL
            .into_iter()
            .map(|op| (op, self.verify(op, content)))
            .collect()
    }

    /// Cloning a source that doesn't exist must fail without creating the destination.
    pub fn verify_missing_source(&self, op: CloneOp) -> Result<(), VerifyError> {
        let step = self.new_step(op)?;
        match self.run(&step)?.0 {
            Ok(()) => Err(VerifyError::UnexpectedSuccess {
                op,
                dst: step.dst_path(),
            }),
            Err(err) => {
                debug!(%op, %err, "clone of missing source failed");
                check_no_destination(&step)
            }
        }
    }

    /// Clones `content` over a destination that already holds `existing`, and checks the outcome
    /// matches the destination policy.
    pub fn verify_existing_destination(
        &self,
        op: CloneOp,
        content: &[u8],
        existing: &[u8],
    ) -> Result<ExistingOutcome, VerifyError> {
        let step = self.new_step(op)?;
        self.write_source(&step, content)?;
        let dst = step.dst_path();
        fs::write(&dst, existing).map_err(step.setup_err("existing destination"))?;
        match self.policy {
            DestinationPolicy::Replace => {
                fs::remove_file(&dst).map_err(step.setup_err("removing existing destination"))?;
                Ok(ExistingOutcome::Replaced(
                    self.clone_and_compare(&step, content)?,
                ))
            }
            DestinationPolicy::Fail => {
                match self.run(&step)?.0 {
                    Ok(()) => return Err(VerifyError::UnexpectedSuccess { op, dst }),
                    Err(Error::DestinationExists) => {}
                    Err(err) => return Err(step.clone_err(err)),
                }
                check_untouched(&step, existing)?;
                Ok(ExistingOutcome::Rejected)
            }
        }
    }

    fn new_step(&self, op: CloneOp) -> Result<Step, VerifyError> {
        let tempdir = |prefix: &str| {
            Builder::new()
                .prefix(prefix)
                .tempdir_in(&self.base)
                .map_err(|source| VerifyError::Setup {
                    op,
                    what: "temporary directory",
                    source,
                })
        };
        Ok(Step {
            op,
            src_dir: tempdir("src")?,
            dst_dir: tempdir("dest")?,
        })
    }

    /// Writes the source and closes it again before anything clones it.
    fn write_source(&self, step: &Step, content: &[u8]) -> Result<(), VerifyError> {
        fs::write(step.src_path(), content).map_err(step.setup_err("source file"))
    }

    fn clone_and_compare(&self, step: &Step, content: &[u8]) -> Result<CloneReport, VerifyError> {
        let (result, elapsed) = self.run(step)?;
        result.map_err(|err| step.clone_err(err))?;
        let len = check_destination(step, content)?;
        info!(op = %step.op, len, ?elapsed, "clone verified");
        Ok(CloneReport {
            op: step.op,
            src: step.src_path(),
            dst: step.dst_path(),
            len,
            elapsed,
        })
    }

    /// Performs the step's clone, timing only the clone call itself. The outer error is a setup
    /// failure, the inner one is the clone's.
    fn run(&self, step: &Step) -> Result<(PubResult<()>, Duration), VerifyError> {
        let src = step.src_path();
        let dst = step.dst_path();
        let flags = self.flags;
        Ok(match step.op {
            CloneOp::Path => timed(|| clonefile(&src, &dst, flags)),
            CloneOp::AtCwd => {
                timed(|| clonefileat(DirContext::Cwd, &src, DirContext::Cwd, &dst, flags))
            }
            CloneOp::AtDirs => {
                let src_dir = Dir::open(step.src_dir.path())
                    .map_err(step.setup_err("source directory handle"))?;
                let dst_dir = Dir::open(step.dst_dir.path())
                    .map_err(step.setup_err("destination directory handle"))?;
                timed(|| {
                    clonefileat(
                        src_dir.context(),
                        Path::new(SOURCE_NAME),
                        dst_dir.context(),
                        Path::new(CLONED_NAME),
                        flags,
                    )
                })
            }
            // Opening the source is part of this operation, so a missing source shows up as the
            // clone failing.
            CloneOp::FromHandle => match File::open(&src) {
                Ok(src_file) => timed(|| fclonefile(&src_file, &dst, flags)),
                Err(err) => (Err(err.into()), Duration::ZERO),
            },
        })
    }
}

fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let started = Instant::now();
    let value = f();
    (value, started.elapsed())
}

/// Reads the destination back and compares it with what was cloned. Returns its length.
fn check_destination(step: &Step, content: &[u8]) -> Result<u64, VerifyError> {
    let op = step.op;
    let dst = step.dst_path();
    let actual = fs::read(&dst).map_err(|source| VerifyError::ReadBack {
        op,
        path: dst.clone(),
        source,
    })?;
    if let Some(mismatch) = compare_contents(content, &actual) {
        return Err(VerifyError::Mismatch {
            op,
            path: dst,
            mismatch,
        });
    }
    Ok(actual.len() as u64)
}

/// A rejected clone must leave the existing destination as it was.
fn check_untouched(step: &Step, existing: &[u8]) -> Result<(), VerifyError> {
    let op = step.op;
    let dst = step.dst_path();
    let actual = fs::read(&dst).map_err(|source| VerifyError::ReadBack {
        op,
        path: dst.clone(),
        source,
    })?;
    if compare_contents(existing, &actual).is_some() {
        return Err(VerifyError::Clobbered { op, path: dst });
    }
    Ok(())
}

/// A failed clone must not leave anything, not even a dangling symlink, at the destination.
fn check_no_destination(step: &Step) -> Result<(), VerifyError> {
    let dst = step.dst_path();
    if dst.symlink_metadata().is_ok() {
        return Err(VerifyError::LeftDestination {
            op: step.op,
            path: dst,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test;
    use anyhow::Result;
    use tempfile::tempdir;

    // Stands in for a clone that reported success, so the verdicts can be checked on any
    // filesystem.
    fn step_with_destination(
        harness: &Harness,
        op: CloneOp,
        source: &[u8],
        destination: &[u8],
    ) -> Result<Step> {
        let step = harness.new_step(op)?;
        harness.write_source(&step, source)?;
        fs::write(step.dst_path(), destination)?;
        Ok(step)
    }

    #[test]
    fn corrupted_destination_is_a_mismatch() -> Result<()> {
        let base = tempdir()?;
        let harness = Harness::in_dir(base.path());
        let step =
            step_with_destination(&harness, CloneOp::Path, TEST_CONTENT, b"This is a best")?;
        let err = check_destination(&step, TEST_CONTENT).unwrap_err();
        match &err {
            VerifyError::Mismatch { op, path, mismatch } => {
                assert_eq!(*op, CloneOp::Path);
                assert_eq!(*path, step.dst_path());
                assert_eq!(mismatch.first_difference, 10);
            }
            _ => panic!("expected mismatch, got {err}"),
        }
        assert!(!err.is_unsupported());
        Ok(())
    }

    #[test]
    fn truncated_destination_is_a_mismatch() -> Result<()> {
        let base = tempdir()?;
        let harness = Harness::in_dir(base.path());
        let step = step_with_destination(&harness, CloneOp::AtDirs, TEST_CONTENT, b"This is")?;
        assert!(matches!(
            check_destination(&step, TEST_CONTENT),
            Err(VerifyError::Mismatch {
                op: CloneOp::AtDirs,
                mismatch: Mismatch {
                    expected_len: 14,
                    actual_len: 7,
                    first_difference: 7,
                },
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn matching_destination_passes() -> Result<()> {
        let base = tempdir()?;
        let harness = Harness::in_dir(base.path());
        let step = step_with_destination(&harness, CloneOp::AtCwd, TEST_CONTENT, TEST_CONTENT)?;
        assert_eq!(check_destination(&step, TEST_CONTENT)?, 14);
        Ok(())
    }

    #[test]
    fn vanished_destination_is_a_read_back_failure() -> Result<()> {
        let base = tempdir()?;
        let harness = Harness::in_dir(base.path());
        let step = step_with_destination(&harness, CloneOp::FromHandle, TEST_CONTENT, b"")?;
        fs::remove_file(step.dst_path())?;
        let err = check_destination(&step, TEST_CONTENT).unwrap_err();
        match &err {
            VerifyError::ReadBack { op, source, .. } => {
                assert_eq!(*op, CloneOp::FromHandle);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            _ => panic!("expected read back failure, got {err}"),
        }
        Ok(())
    }

    #[test]
    fn modified_existing_destination_is_clobbered() -> Result<()> {
        let base = tempdir()?;
        let harness = Harness::in_dir(base.path());
        let step = step_with_destination(&harness, CloneOp::Path, TEST_CONTENT, TEST_CONTENT)?;
        assert!(matches!(
            check_untouched(&step, b"already here"),
            Err(VerifyError::Clobbered {
                op: CloneOp::Path,
                ..
            })
        ));
        fs::write(step.dst_path(), b"already here")?;
        check_untouched(&step, b"already here")?;
        Ok(())
    }

    #[test]
    fn leftover_destination_reported() -> Result<()> {
        let base = tempdir()?;
        let harness = Harness::in_dir(base.path());
        let step = harness.new_step(CloneOp::AtCwd)?;
        check_no_destination(&step)?;
        // A dangling symlink counts.
        std::os::unix::fs::symlink(step.src_path(), step.dst_path())?;
        let err = check_no_destination(&step).unwrap_err();
        match &err {
            VerifyError::LeftDestination { op, path } => {
                assert_eq!(*op, CloneOp::AtCwd);
                assert_eq!(*path, step.dst_path());
            }
            _ => panic!("expected leftover destination, got {err}"),
        }
        Ok(())
    }

    #[test]
    fn opening_missing_source_is_not_timed() -> Result<()> {
        let base = tempdir()?;
        let harness = Harness::in_dir(base.path());
        let step = harness.new_step(CloneOp::FromHandle)?;
        let (result, elapsed) = harness.run(&step)?;
        assert_eq!(
            result.unwrap_err().io_kind(),
            Some(io::ErrorKind::NotFound)
        );
        assert_eq!(elapsed, Duration::ZERO);
        Ok(())
    }

    #[test]
    fn timed_measures_the_call() {
        let (value, elapsed) = timed(|| {
            std::thread::sleep(Duration::from_millis(20));
            7
        });
        assert_eq!(value, 7);
        assert!(elapsed >= Duration::from_millis(20));
    }
}
