//! Audio archive: keeps every synthesized clip as `response_<n>.mp3`.
//!
//! The directory is scanned once when the archive opens; after that an atomic
//! counter hands out slots, so concurrent syntheses never compute the same index.
//! Files that do not match the naming scheme are ignored.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWriteExt;
use tracing::info;

const SLOT_PREFIX: &str = "response_";
const SLOT_EXTENSION: &str = ".mp3";

#[derive(Debug)]
pub struct AudioArchive {
    dir: PathBuf,
    next_slot: AtomicU64,
}

impl AudioArchive {
    /// Creates `dir` if needed and seeds the counter past the highest existing slot.
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let mut highest = 0;
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if let Some(index) = entry.file_name().to_str().and_then(slot_index) {
                highest = highest.max(index);
            }
        }

        info!(
            "Audio archive ready at '{}' (next slot {})",
            dir.display(),
            highest + 1
        );

        Ok(Self {
            dir,
            next_slot: AtomicU64::new(highest + 1),
        })
    }

    /// Writes `audio` to the next free slot and returns its path.
    /// Never overwrites: a slot that appeared on disk meanwhile is skipped.
    pub async fn store(&self, audio: &[u8]) -> io::Result<PathBuf> {
        loop {
            let index = self.next_slot.fetch_add(1, Ordering::SeqCst);
            let path = self.dir.join(slot_name(index));

            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            };

            file.write_all(audio).await?;
            file.flush().await?;
            return Ok(path);
        }
    }

    /// Names of the `.mp3` files in the archive directory, sorted by name.
    pub async fn list(&self) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(SLOT_EXTENSION) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

fn slot_name(index: u64) -> String {
    format!("{SLOT_PREFIX}{index}{SLOT_EXTENSION}")
}

/// Parses `response_<n>.mp3` into `n`.
fn slot_index(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix(SLOT_PREFIX)?
        .strip_suffix(SLOT_EXTENSION)?
        .parse()
        .ok()
}
