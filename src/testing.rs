//! Random content for exercising clones with more than a handful of bytes.

use super::*;
use anyhow::{ensure, Result};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::cmp::min;
use std::io::{Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

pub fn random_content(len: usize) -> Vec<u8> {
    let mut content = vec![0; len];
    SmallRng::from_entropy().fill(&mut content[..]);
    content
}

/// Writes `len` random bytes to a new temporary file in `dir`. The file is removed on drop.
pub fn write_random_tempfile_in(dir: impl AsRef<Path>, len: u64) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new_in(dir)?;
    let mut rng = rand::thread_rng();
    let mut buf = [0; 4096];
    let mut remaining_size = len;
    while remaining_size > 0 {
        let n1 = min(remaining_size, buf.len() as u64).try_into()?;
        let buf1 = &mut buf[..n1];
        rng.fill(buf1);
        file.write_all(buf1)?;
        remaining_size -= n1 as u64;
    }
    ensure!(file.as_file().seek(SeekFrom::End(0))? == len);
    Ok(file)
}
