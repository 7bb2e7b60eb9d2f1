//! Corpus traversal and file loading.

use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{LexError, Result};

/// All regular files below a root directory, hidden entries excluded.
///
/// Iteration is lazy and depth-first. By default files come out in directory
/// enumeration order, which depends on the filesystem; [`Corpus::sorted`]
/// orders each directory by file name instead. Calling [`Corpus::files`] again
/// restarts the walk.
#[derive(Debug, Clone)]
pub struct Corpus {
    root: PathBuf,
    sorted: bool,
}

impl Corpus {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf(), sorted: false }
    }

    pub fn sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> impl Iterator<Item = PathBuf> {
        let mut walker = WalkDir::new(&self.root).min_depth(1).follow_links(true);
        if self.sorted {
            walker = walker.sort_by_file_name();
        }
        walker
            .into_iter()
            .filter_entry(|e| !is_hidden(e))
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(err) => {
                    warn!(error = %err, "skipping unreadable corpus entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(DirEntry::into_path)
    }

    pub fn collect(&self) -> Vec<PathBuf> {
        self.files().collect()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_str().map_or(false, |s| s.starts_with('.'))
}

/// Map `path`, copy it into an owned UTF-8 buffer and hand that to `f`.
///
/// The mapping is dropped before `f` runs and the buffer when this returns,
/// whether `f` succeeds or not. Empty files are not mapped.
pub fn with_mapped_text<P, F, R>(path: P, f: F) -> Result<R>
where
    P: AsRef<Path>,
    F: FnOnce(&str) -> Result<R>,
{
    let path = path.as_ref();
    let file = File::open(path)?;
    let len = file.metadata()?.len() as usize;
    let mut buf = Vec::with_capacity(len);
    if len > 0 {
        // SAFETY: the map is read-only and dropped at the end of this block;
        // a concurrent truncation of the corpus file is outside what we support.
        let mmap = unsafe { Mmap::map(&file)? };
        buf.extend_from_slice(&mmap);
    }
    let text = String::from_utf8(buf)
        .map_err(|e| LexError::encoding(format!("{}: {e}", path.display())))?;
    f(&text)
}

/// Files between two progress lines.
pub const PROGRESS_EVERY: usize = 1000;

/// Feed the text of every corpus file under `root` to `on_text`.
///
/// Files that cannot be read, are not UTF-8, or whose callback fails with a
/// per-item error are logged and skipped; any other error aborts the pass.
/// Returns the number of files processed successfully.
pub fn ingest_dir<F>(root: &Path, verbose: bool, mut on_text: F) -> Result<usize>
where
    F: FnMut(&Path, &str) -> Result<()>,
{
    let mut processed = 0;
    let mut seen = 0;
    for file in Corpus::new(root).files() {
        if seen % PROGRESS_EVERY == 0 {
            if verbose {
                info!(processed = seen, "processing corpus");
            } else {
                debug!(processed = seen, "processing corpus");
            }
        }
        seen += 1;
        match with_mapped_text(&file, |text| on_text(file.as_path(), text)) {
            Ok(()) => processed += 1,
            Err(e) if e.is_per_item() => warn!(file = %file.display(), error = %e, "skipping file"),
            Err(e) => return Err(e),
        }
    }
    info!(root = %root.display(), files = seen, processed, "corpus pass finished");
    Ok(processed)
}
