//! Content comparison and copying between linked files.
//!
//! Links come in two flavours. Repository-discovered links are compared byte
//! for byte. Manual pairs carry provenance text on their header line that is
//! expected to differ between the two sides, so they are compared, and copied,
//! with that line left out.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::trace;

/// Whether two linked files have equal content.
///
/// With `ignore_header_line`, both files are read as line sequences and the
/// third line of each is dropped before comparing.
///
/// # Errors
///
/// Returns an error if either file cannot be read.
pub fn files_equal(first: &Path, second: &Path, ignore_header_line: bool) -> Result<bool> {
    let equal = if ignore_header_line {
        let a = read(first)?;
        let b = read(second)?;
        without_header_line(&a).eq(without_header_line(&b))
    } else {
        bytes_equal(first, second)?
    };
    trace!(first = %first.display(), second = %second.display(), ignore_header_line, equal, "Compared");
    Ok(equal)
}

fn bytes_equal(first: &Path, second: &Path) -> Result<bool> {
    let len1 = std::fs::metadata(first)
        .with_context(|| format!("Failed to read metadata: {}", first.display()))?
        .len();
    let len2 = std::fs::metadata(second)
        .with_context(|| format!("Failed to read metadata: {}", second.display()))?
        .len();
    if len1 != len2 {
        return Ok(false);
    }

    let mut r1 = BufReader::new(open(first)?);
    let mut r2 = BufReader::new(open(second)?);
    let mut buf1 = vec![0u8; 64 * 1024];
    let mut buf2 = vec![0u8; 64 * 1024];

    loop {
        let n1 = read_full(&mut r1, &mut buf1)?;
        let n2 = read_full(&mut r2, &mut buf2)?;
        if n1 != n2 || buf1[..n1] != buf2[..n2] {
            return Ok(false);
        }
        if n1 == 0 {
            return Ok(true);
        }
    }
}

/// Fill `buf` as far as the reader allows; returns bytes read (0 at EOF).
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Overwrite `destination` with the content of `source`.
///
/// With `preserve_header_line`, the destination keeps its own third line and
/// everything else is taken from the source. If the destination has fewer than
/// three lines there is nothing to keep and the copy is verbatim.
///
/// # Errors
///
/// Returns an error if either file cannot be read or the destination cannot be
/// written.
pub fn copy_content(source: &Path, destination: &Path, preserve_header_line: bool) -> Result<()> {
    let content = read(source)?;

    let output = if preserve_header_line {
        let dest = read(destination)?;
        match lines(&dest).nth(crate::HEADER_LINE_INDEX) {
            Some(kept) => splice_header_line(&content, kept),
            None => content,
        }
    } else {
        content
    };

    std::fs::write(destination, output)
        .with_context(|| format!("Failed to write {}", destination.display()))
}

/// `content` with its third line replaced by `header` (appended if it is shorter).
fn splice_header_line(content: &[u8], header: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + header.len());
    let mut count = 0;
    for line in lines(content) {
        if count == crate::HEADER_LINE_INDEX {
            out.extend_from_slice(header);
            // Keep the line terminator shape of the source when the kept line
            // was the last one in the destination.
            if !header.ends_with(b"\n") && line.ends_with(b"\n") {
                out.push(b'\n');
            }
        } else {
            out.extend_from_slice(line);
        }
        count += 1;
    }
    if count <= crate::HEADER_LINE_INDEX {
        if !out.is_empty() && !out.ends_with(b"\n") {
            out.push(b'\n');
        }
        for _ in count..crate::HEADER_LINE_INDEX {
            out.push(b'\n');
        }
        out.extend_from_slice(header);
    }
    out
}

/// Lines of `data`, each keeping its trailing `\n` (if any).
fn lines(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    data.split_inclusive(|&b| b == b'\n')
}

fn without_header_line(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    lines(data)
        .enumerate()
        .filter(|(i, _)| *i != crate::HEADER_LINE_INDEX)
        .map(|(_, line)| line)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}
