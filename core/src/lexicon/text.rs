//! Line-oriented `token value` interchange format.

use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{LexError, Result};
use crate::stats::FeatureFilter;

/// Parse one line. Blank lines yield `None`.
///
/// A line holding a tab is `token<TAB>value` and the token is taken verbatim,
/// which is what [`write_text_entries`] produces. Other lines are
/// hand-written input: `#` starts a comment, the value is the last
/// whitespace-separated field and a trailing comma is trimmed from the token.
pub fn parse_text_line(line: &str, lineno: usize) -> Result<Option<(String, u32)>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }
    if let Some((token, value)) = line.rsplit_once('\t') {
        return entry(token, value.trim(), lineno).map(Some);
    }
    let line = line.trim();
    if line.starts_with('#') {
        return Ok(None);
    }
    let (token, value) = line
        .rsplit_once(|c: char| c.is_whitespace())
        .ok_or_else(|| LexError::format(format!("line {lineno}: expected 'token value', got '{line}'")))?;
    entry(token.trim_end().trim_end_matches(',').trim_end(), value, lineno).map(Some)
}

fn entry(token: &str, value: &str, lineno: usize) -> Result<(String, u32)> {
    if token.trim().is_empty() {
        return Err(LexError::format(format!("line {lineno}: empty token")));
    }
    let value: u32 = value
        .parse()
        .map_err(|e| LexError::format(format!("line {lineno}: bad value '{value}': {e}")))?;
    Ok((token.to_string(), value))
}

pub fn read_text_entries(path: &Path, filter: Option<&FeatureFilter>) -> Result<Vec<(String, u32)>> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    let mut skipped = 0usize;
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let Some((token, value)) = parse_text_line(&line, i + 1)? else { continue };
        if let Some(filter) = filter {
            if let Err(reason) = filter.check(&token, value) {
                debug!(token = %token, value, ?reason, "filtered lexicon entry");
                skipped += 1;
                continue;
            }
        }
        entries.push((token, value));
    }
    if skipped > 0 {
        debug!(path = %path.display(), skipped, "entries rejected by feature filter");
    }
    Ok(entries)
}

pub fn write_text_entries<I>(path: &Path, entries: I) -> Result<usize>
where
    I: IntoIterator<Item = (String, u32)>,
{
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)?;
    }
    let mut w = BufWriter::new(File::create(path)?);
    let mut count = 0;
    for (token, value) in entries {
        if token.contains(['\n', '\r']) {
            return Err(LexError::format(format!("token {token:?} contains a line break")));
        }
        writeln!(w, "{token}\t{value}")?;
        count += 1;
    }
    w.flush()?;
    Ok(count)
}
