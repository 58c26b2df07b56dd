//! Line sources for the deduplication engine.
//!
//! This module provides:
//! - [`ChunkedReader`]: lines from a bounded file, read in fixed-size chunks
//! - [`StreamWatcher`]: lines appended to a live file, polled on a timer
//! - Encoding detection ([`detect_encoding`]) and per-line decoding
//!
//! Both sources split on `\n`, remember whether a line ended in `\r\n`, and
//! carry a partial line across chunk (or poll) boundaries, so a line is never
//! split into two [`Line`] values however the bytes arrive.

pub mod chunked;
pub mod stream;

use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

pub use chunked::ChunkedReader;
pub use stream::{StreamConfig, StreamWatcher};

/// Default chunk size for bounded files (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Bytes inspected by [`detect_encoding`].
pub const SNIFF_SIZE: usize = 64 * 1024;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// How a line was terminated in the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
    /// Last line of a file without a terminator.
    None,
}

impl LineEnding {
    /// The terminator bytes.
    #[must_use]
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Lf => b"\n",
            Self::CrLf => b"\r\n",
            Self::None => b"",
        }
    }
}

/// One line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Decoded text without its terminator
    pub text: String,
    /// Zero-based position in the source
    pub index: u64,
    /// Byte offset of the first byte of the line
    pub offset: u64,
    /// Original terminator
    pub ending: LineEnding,
}

impl Line {
    /// A `\n`-terminated line at offset 0.
    #[must_use]
    pub fn new(text: impl Into<String>, index: u64) -> Self {
        Self {
            text: text.into(),
            index,
            offset: 0,
            ending: LineEnding::Lf,
        }
    }

    /// Set the byte offset.
    #[must_use]
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Set the terminator.
    #[must_use]
    pub fn with_ending(mut self, ending: LineEnding) -> Self {
        self.ending = ending;
        self
    }
}

/// Text encoding of a file, as detected from its first bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8, optionally with a byte order mark
    Utf8 {
        /// Whether the file starts with `EF BB BF`
        bom: bool,
    },
    /// ISO-8859-1; every byte is a character
    Latin1,
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::Utf8 { bom: false }
    }
}

impl TextEncoding {
    /// Display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Utf8 { bom: false } => "utf-8",
            Self::Utf8 { bom: true } => "utf-8-sig",
            Self::Latin1 => "latin-1",
        }
    }

    /// Byte order mark to write at the start of the file.
    #[must_use]
    pub fn bom(self) -> &'static [u8] {
        match self {
            Self::Utf8 { bom: true } => UTF8_BOM,
            _ => &[],
        }
    }

    /// Decode one line. The flag is `true` if bytes had to be replaced.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> (String, bool) {
        match self {
            Self::Utf8 { .. } => match std::str::from_utf8(bytes) {
                Ok(text) => (text.to_string(), false),
                Err(_) => (String::from_utf8_lossy(bytes).into_owned(), true),
            },
            Self::Latin1 => (bytes.iter().map(|&b| char::from(b)).collect(), false),
        }
    }

    /// Append the encoded form of `text` to `out`.
    ///
    /// Characters Latin-1 cannot represent are written as `?`; text decoded
    /// from a Latin-1 file never contains any.
    pub fn encode_into(self, text: &str, out: &mut Vec<u8>) {
        match self {
            Self::Utf8 { .. } => out.extend_from_slice(text.as_bytes()),
            Self::Latin1 => out.extend(
                text.chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')),
            ),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Guess the encoding of a byte prefix.
///
/// A UTF-8 sequence cut off at the end of the prefix still counts as UTF-8.
#[must_use]
pub fn sniff_encoding(prefix: &[u8]) -> TextEncoding {
    if prefix.starts_with(UTF8_BOM) {
        return TextEncoding::Utf8 { bom: true };
    }
    match std::str::from_utf8(prefix) {
        Ok(_) => TextEncoding::Utf8 { bom: false },
        Err(e) if e.error_len().is_none() => TextEncoding::Utf8 { bom: false },
        Err(_) => TextEncoding::Latin1,
    }
}

/// Detect the encoding of a file from its first [`SNIFF_SIZE`] bytes.
///
/// # Errors
///
/// Returns a [`FileAccessError`] if the file cannot be opened or read.
pub fn detect_encoding(path: &Path) -> Result<TextEncoding, FileAccessError> {
    let file = open_regular_file(path)?;
    let mut prefix = Vec::with_capacity(SNIFF_SIZE);
    file.take(SNIFF_SIZE as u64)
        .read_to_end(&mut prefix)
        .map_err(|e| FileAccessError::from_io(path, e))?;

    let encoding = sniff_encoding(&prefix);
    log::debug!("Detected encoding {} for {}", encoding, path.display());
    Ok(encoding)
}

/// Why a stream stopped producing lines. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Input exhausted and follow mode off
    EndOfFile,
    /// Maximum runtime elapsed
    Timeout,
    /// External stop request (Ctrl+C)
    Shutdown,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::EndOfFile => "end of file",
            Self::Timeout => "maximum runtime reached",
            Self::Shutdown => "stop requested",
        };
        f.write_str(text)
    }
}

/// A file that could not be read or written.
#[derive(thiserror::Error, Debug)]
pub enum FileAccessError {
    /// The path does not exist.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path exists but is not a regular file.
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// Any other I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl FileAccessError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// The path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(path) | Self::PermissionDenied(path) | Self::NotAFile(path) => path,
            Self::Io { path, .. } => path,
        }
    }
}

/// Open `path` for reading, rejecting directories and other non-files.
pub(crate) fn open_regular_file(path: &Path) -> Result<File, FileAccessError> {
    let file = File::open(path).map_err(|e| FileAccessError::from_io(path, e))?;
    let metadata = file
        .metadata()
        .map_err(|e| FileAccessError::from_io(path, e))?;
    if !metadata.is_file() {
        return Err(FileAccessError::NotAFile(path.to_path_buf()));
    }
    Ok(file)
}

/// An undecoded line as cut from the byte stream.
#[derive(Debug)]
pub(crate) struct RawLine {
    pub bytes: Vec<u8>,
    pub offset: u64,
    pub ending: LineEnding,
}

impl RawLine {
    pub fn decode(self, index: u64, encoding: TextEncoding, warnings: &mut u64) -> Line {
        let (text, replaced) = encoding.decode(&self.bytes);
        if replaced {
            *warnings += 1;
            log::trace!("Replaced undecodable bytes in line {}", index + 1);
        }
        Line {
            text,
            index,
            offset: self.offset,
            ending: self.ending,
        }
    }
}

/// Splits a byte stream into lines, carrying the unterminated tail forward.
#[derive(Debug, Default)]
pub(crate) struct LineSplitter {
    fragment: Vec<u8>,
    fragment_offset: u64,
    position: u64,
}

impl LineSplitter {
    /// Splitter whose first byte sits at `offset` in the file.
    pub fn new(offset: u64) -> Self {
        Self {
            fragment: Vec::new(),
            fragment_offset: offset,
            position: offset,
        }
    }

    /// Feed the next bytes, appending every completed line to `out`.
    pub fn push(&mut self, bytes: &[u8], out: &mut VecDeque<RawLine>) {
        let mut start = 0;
        while let Some(pos) = bytes[start..].iter().position(|&b| b == b'\n') {
            let end = start + pos;
            let mut line = std::mem::take(&mut self.fragment);
            line.extend_from_slice(&bytes[start..end]);

            let ending = if line.last() == Some(&b'\r') {
                line.pop();
                LineEnding::CrLf
            } else {
                LineEnding::Lf
            };
            out.push_back(RawLine {
                bytes: line,
                offset: self.fragment_offset,
                ending,
            });

            start = end + 1;
            self.fragment_offset = self.position + start as u64;
        }
        self.fragment.extend_from_slice(&bytes[start..]);
        self.position += bytes.len() as u64;
    }

    /// Whether an unterminated tail is being held.
    pub fn has_fragment(&self) -> bool {
        !self.fragment.is_empty()
    }

    /// Release the unterminated tail as a final line.
    pub fn finish(&mut self) -> Option<RawLine> {
        if self.fragment.is_empty() {
            return None;
        }
        let bytes = std::mem::take(&mut self.fragment);
        let offset = self.fragment_offset;
        self.fragment_offset = self.position;
        Some(RawLine {
            bytes,
            offset,
            ending: LineEnding::None,
        })
    }
}
