// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Filesystem helper functions for other modules.
//!
//! Every record this crate touches is a tiny flat file holding a single whitespace delimited token. These helpers
//! open, fully read or write, and close such a file within one call, so no handle ever outlives an operation and
//! the filesystem stays the only source of truth. Files may also be read by other boot stages, which is why every
//! write is followed by a storage sync.
//!
//! Reads go through a buffer with an explicit capacity. A record that does not fit is reported as
//! [`FsError::TooLarge`] instead of being silently truncated.

use std::{
    fs::{self, File},
    io::{self, BufRead, BufReader, ErrorKind, Read, Write},
    path::Path,
};

use smallvec::SmallVec;
use thiserror::Error;

use crate::boot::report::Reporter;

/// The capacity of the buffer used for reading single token records.
///
/// The longest valid token is a canonical mode name, which is far below this.
pub const RECORD_CAPACITY: usize = 64;

/// The maximum size of a text file that may be read in one go, like the configuration file.
pub const TEXT_CAPACITY: usize = 4096;

/// The maximum amount of lines that [`dump_lines`] will print.
pub const MAX_DUMP_LINES: usize = 3000;

/// An error that may result from performing filesystem operations
#[derive(Error, Debug)]
pub enum FsError {
    /// The file does not exist.
    #[error("File not found")]
    NotFound,

    /// The file was larger than the buffer reserved for it.
    #[error("File too large (limit is {limit} bytes)")]
    TooLarge {
        /// The capacity of the buffer that was used.
        limit: usize,
    },

    /// The content of the file was not valid UTF-8.
    #[error("File is not valid UTF-8")]
    NotUtf8,

    /// A file could not be opened, read, or written.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FsError {
    /// Converts an [`io::Error`] into an [`FsError`], splitting out missing files.
    fn from_io(e: io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

/// Checks if a path exists.
///
/// It makes no distinction between whether a file could not be verified to exist or a file that really
/// does not exist. Both will return `false`.
#[must_use = "Has no effect if the result is unused"]
pub fn exists(path: &Path) -> bool {
    fs::metadata(path).is_ok()
}

/// Checks if a path exists and refers to a regular file.
#[must_use = "Has no effect if the result is unused"]
pub fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|meta| meta.is_file())
}

/// Reads a whole file into a buffer with a fixed capacity `N`.
///
/// # Errors
///
/// May return an `Error` if the file does not exist, could not be read, or holds more than `N` bytes.
pub fn read_bounded<const N: usize>(path: &Path) -> Result<SmallVec<[u8; N]>, FsError> {
    let file = File::open(path).map_err(FsError::from_io)?;

    let mut buf = SmallVec::new();
    let mut chunk = [0; 256];
    let mut reader = file.take(u64::try_from(N).unwrap_or(u64::MAX) + 1); // one more byte to detect overflow
    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FsError::Io(e)),
        };
        if buf.len() + read > N {
            return Err(FsError::TooLarge { limit: N });
        }
        buf.extend_from_slice(&chunk[..read]);
    }

    Ok(buf)
}

/// Reads the first whitespace delimited token of a small record file.
///
/// Returns `Ok(None)` if the file exists but holds no token at all.
///
/// # Errors
///
/// May return an `Error` if the file does not exist, could not be read, was larger than [`RECORD_CAPACITY`], or
/// was not valid UTF-8.
pub fn read_token(path: &Path) -> Result<Option<String>, FsError> {
    let buf = read_bounded::<RECORD_CAPACITY>(path)?;
    let content = str::from_utf8(&buf).map_err(|_| FsError::NotUtf8)?;
    Ok(content.split_whitespace().next().map(str::to_owned))
}

/// Reads a whole text file of at most [`TEXT_CAPACITY`] bytes.
///
/// # Errors
///
/// May return an `Error` if the file does not exist, could not be read, was too large, or was not valid UTF-8.
pub fn read_text(path: &Path) -> Result<String, FsError> {
    let buf = read_bounded::<TEXT_CAPACITY>(path)?;
    String::from_utf8(buf.into_vec()).map_err(|_| FsError::NotUtf8)
}

/// Writes `content` to a file, replacing what was there, then flushes and syncs it to storage.
///
/// # Errors
///
/// May return an `Error` if the file could not be created, written, flushed, or synced.
pub fn write_synced(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content)?;
    file.flush()?;
    file.sync_all()?;
    drop(file);
    sync();
    Ok(())
}

/// Writes `content` to an existing control file without syncing, like a sysfs attribute.
///
/// # Errors
///
/// May return an `Error` if the file could not be opened or written.
pub fn write_control(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(content)
}

/// Deletes a file. A file that is already gone counts as deleted.
///
/// # Errors
///
/// May return an `Error` if the file exists but could not be removed.
pub fn remove(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => {
            sync();
            Ok(())
        }
    }
}

/// Commits every pending filesystem write to storage.
pub fn sync() {
    // SAFETY: sync takes no arguments, cannot fail, and only asks the kernel to flush its buffers.
    unsafe { libc::sync() };
}

/// Prints a text file line by line to a [`Reporter`], returning the amount of lines printed.
///
/// At most [`MAX_DUMP_LINES`] lines are printed. A file that cannot be opened prints nothing.
pub fn dump_lines(path: &Path, reporter: &mut dyn Reporter) -> usize {
    let Ok(file) = File::open(path) else {
        return 0;
    };

    let mut lines = 0;
    for line in BufReader::new(file).lines().map_while(Result::ok) {
        if lines >= MAX_DUMP_LINES {
            break;
        }
        reporter.report(format_args!("{line}\n"));
        lines += 1;
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot::report::RecordingReporter;

    #[test]
    fn test_read_token() -> Result<(), FsError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("record");
        fs::write(&path, "  2nd-boot\nrest of file")?;
        assert_eq!(read_token(&path)?, Some("2nd-boot".to_owned()));

        fs::write(&path, " \n ")?;
        assert_eq!(read_token(&path)?, None);
        Ok(())
    }

    #[test]
    fn test_read_token_missing() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = read_token(&dir.path().join("missing"));
        assert!(matches!(result, Err(FsError::NotFound)));
    }

    #[test]
    fn test_read_bounded_too_large() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("big");
        fs::write(&path, [b'a'; RECORD_CAPACITY + 1]).expect("Failed to write file");
        assert!(matches!(
            read_token(&path),
            Err(FsError::TooLarge {
                limit: RECORD_CAPACITY
            })
        ));

        fs::write(&path, [b'a'; RECORD_CAPACITY]).expect("Failed to write file");
        assert!(read_token(&path).is_ok());
    }

    #[test]
    fn test_read_text_bounds() -> Result<(), FsError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bootmenu.conf");
        let text = "log_level=debug\n".repeat(TEXT_CAPACITY / 16);
        assert_eq!(text.len(), TEXT_CAPACITY);
        fs::write(&path, &text)?;
        assert_eq!(read_text(&path)?, text); // spans several read chunks

        fs::write(&path, format!("{text}x"))?;
        assert!(matches!(
            read_text(&path),
            Err(FsError::TooLarge {
                limit: TEXT_CAPACITY
            })
        ));

        fs::write(&path, [0xff, 0xfe])?;
        assert!(matches!(read_text(&path), Err(FsError::NotUtf8)));
        Ok(())
    }

    #[test]
    fn test_write_synced_and_remove() -> Result<(), FsError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("record");
        write_synced(&path, b"recovery")?;
        assert_eq!(read_token(&path)?, Some("recovery".to_owned()));
        write_synced(&path, b"no")?;
        assert_eq!(read_token(&path)?, Some("no".to_owned()));

        remove(&path)?;
        assert!(!exists(&path));
        remove(&path)?; // already gone
        Ok(())
    }

    #[test]
    fn test_dump_lines() -> Result<(), FsError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("log");
        fs::write(&path, "first\nsecond\n")?;

        let mut reporter = RecordingReporter::default();
        assert_eq!(dump_lines(&path, &mut reporter), 2);
        assert_eq!(reporter.lines(), ["first\n", "second\n"]);
        assert_eq!(dump_lines(&dir.path().join("missing"), &mut reporter), 0);
        Ok(())
    }
}
