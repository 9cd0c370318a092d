use std::fs::File;
use std::path::PathBuf;

use anyhow::{bail, Context};
use log::{info, warn};

use clonefile::harness::{CloneOp, DestinationPolicy, Harness, TEST_CONTENT};
use clonefile::testing::random_content;
use clonefile::{clonefile, clonefileat, fclonefile, CloneFlags, Dir, DirContext};

#[derive(clap::Args, Clone, Copy)]
struct FlagArgs {
    /// Clone a symbolic link source itself instead of what it points to.
    #[arg(long)]
    no_follow: bool,
    #[arg(long)]
    no_owner_copy: bool,
    #[arg(long)]
    acl: bool,
}

impl From<FlagArgs> for CloneFlags {
    fn from(args: FlagArgs) -> Self {
        let mut flags = CloneFlags::empty();
        if args.no_follow {
            flags |= CloneFlags::NOFOLLOW;
        }
        if args.no_owner_copy {
            flags |= CloneFlags::NOOWNERCOPY;
        }
        if args.acl {
            flags |= CloneFlags::ACL;
        }
        flags
    }
}

#[derive(clap::Subcommand)]
enum Commands {
    /// clonefile(2)
    #[command(name = "clone")]
    CloneFile {
        src: PathBuf,
        dst: PathBuf,
        #[command(flatten)]
        flags: FlagArgs,
    },
    /// clonefileat(2). Names are relative to the given directories, or the working directory.
    CloneAt {
        #[arg(long)]
        src_dir: Option<PathBuf>,
        src: PathBuf,
        #[arg(long)]
        dst_dir: Option<PathBuf>,
        dst: PathBuf,
        #[command(flatten)]
        flags: FlagArgs,
    },
    /// fclonefileat(2) from SRC opened read-only.
    Fclone {
        src: PathBuf,
        dst: PathBuf,
        #[command(flatten)]
        flags: FlagArgs,
    },
    /// Clone known content with every operation and check it reads back identically.
    Verify {
        /// Where to create temporary files. Defaults to CLONEFILE_TEST_DIR or the system temp dir.
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(long, conflicts_with = "random_len")]
        content: Option<String>,
        #[arg(long)]
        random_len: Option<usize>,
        /// Also check that an existing destination is replaced rather than rejected.
        #[arg(long)]
        replace: bool,
        #[command(flatten)]
        flags: FlagArgs,
    },
}

#[derive(clap::Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn open_dir(dir: Option<PathBuf>) -> anyhow::Result<Option<Dir>> {
    dir.map(|path| Dir::open(&path).with_context(|| format!("opening directory {:?}", path)))
        .transpose()
}

fn context(dir: &Option<Dir>) -> DirContext<'_> {
    dir.as_ref().map(Dir::context).unwrap_or(DirContext::Cwd)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli: Cli = clap::Parser::parse();
    use Commands::*;
    match cli.command {
        CloneFile { src, dst, flags } => {
            clonefile(&src, &dst, flags.into())
                .with_context(|| format!("cloning {:?} to {:?}", src, dst))?;
            Ok(())
        }
        CloneAt {
            src_dir,
            src,
            dst_dir,
            dst,
            flags,
        } => {
            let src_dir = open_dir(src_dir)?;
            let dst_dir = open_dir(dst_dir)?;
            clonefileat(
                context(&src_dir),
                &src,
                context(&dst_dir),
                &dst,
                flags.into(),
            )
            .with_context(|| format!("cloning {:?} to {:?}", src, dst))?;
            Ok(())
        }
        Fclone { src, dst, flags } => {
            let file = File::open(&src).with_context(|| format!("opening {:?}", src))?;
            fclonefile(&file, &dst, flags.into())
                .with_context(|| format!("cloning {:?} to {:?}", src, dst))?;
            Ok(())
        }
        Verify {
            dir,
            content,
            random_len,
            replace,
            flags,
        } => {
            let content = match (content, random_len) {
                (Some(content), _) => content.into_bytes(),
                (None, Some(len)) => random_content(len),
                (None, None) => TEST_CONTENT.to_vec(),
            };
            let policy = if replace {
                DestinationPolicy::Replace
            } else {
                DestinationPolicy::Fail
            };
            let harness = dir
                .map(Harness::in_dir)
                .unwrap_or_default()
                .flags(flags.into())
                .destination_policy(policy);
            info!("verifying clones under {}", harness.base().display());
            let mut failures = 0;
            for (op, result) in harness.verify_all(&content) {
                let result = result.and_then(|report| {
                    harness
                        .verify_existing_destination(op, &content, b"existing")
                        .map(|_| report)
                });
                match result {
                    Ok(report) => println!(
                        "{}: ok, {} bytes in {:?}",
                        op, report.len, report.elapsed
                    ),
                    Err(err) if err.is_unsupported() => {
                        warn!("{}: {}", op, err);
                        println!("{}: skipped, filesystem can't clone", op);
                    }
                    Err(err) => {
                        failures += 1;
                        println!("{}: FAILED: {}", op, err);
                    }
                }
            }
            if failures != 0 {
                bail!(
                    "{} of {} clone operations failed",
                    failures,
                    CloneOp::ALL.len()
                );
            }
            Ok(())
        }
    }
}
