//! Bounded-file line reader.
//!
//! Reads a file in fixed-size byte chunks and yields whole lines. Memory use
//! is one chunk plus the longest line, independent of file size.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::{
    detect_encoding, open_regular_file, FileAccessError, Line, LineSplitter, RawLine,
    TextEncoding,
};

/// Lazy, finite, non-restartable sequence of the lines of a file.
///
/// # Example
///
/// ```no_run
/// use linedupe::reader::ChunkedReader;
/// use std::path::Path;
///
/// let reader = ChunkedReader::open(Path::new("access.log"), 64 * 1024).unwrap();
/// for line in reader {
///     println!("{}", line.unwrap().text);
/// }
/// ```
#[derive(Debug)]
pub struct ChunkedReader {
    path: PathBuf,
    file: File,
    encoding: TextEncoding,
    buffer: Vec<u8>,
    splitter: LineSplitter,
    pending: VecDeque<RawLine>,
    next_index: u64,
    bytes_read: u64,
    decode_warnings: u64,
    done: bool,
}

impl ChunkedReader {
    /// Open `path`, detecting its encoding first.
    ///
    /// A `chunk_size` of zero is treated as one byte.
    ///
    /// # Errors
    ///
    /// Returns a [`FileAccessError`] if the file cannot be opened.
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self, FileAccessError> {
        let encoding = detect_encoding(path)?;
        Self::with_encoding(path, chunk_size, encoding)
    }

    /// Open `path` with an already known encoding.
    ///
    /// The read buffer never exceeds the file's current size, so a huge
    /// `chunk_size` costs nothing on a small file.
    ///
    /// # Errors
    ///
    /// Returns a [`FileAccessError`] if the file cannot be opened.
    pub fn with_encoding(
        path: &Path,
        chunk_size: usize,
        encoding: TextEncoding,
    ) -> Result<Self, FileAccessError> {
        let mut file = open_regular_file(path)?;

        let start = encoding.bom().len() as u64;
        if start > 0 {
            file.seek(SeekFrom::Start(start))
                .map_err(|e| FileAccessError::from_io(path, e))?;
        }

        let remaining = file
            .metadata()
            .map_err(|e| FileAccessError::from_io(path, e))?
            .len()
            .saturating_sub(start);
        let buffer_len = usize::try_from(remaining)
            .map_or(chunk_size, |len| chunk_size.min(len))
            .max(1);

        log::debug!(
            "Reading {} ({}) in chunks of {}",
            path.display(),
            encoding,
            bytesize::ByteSize::b(buffer_len as u64)
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            encoding,
            buffer: vec![0; buffer_len],
            splitter: LineSplitter::new(start),
            pending: VecDeque::new(),
            next_index: 0,
            bytes_read: start,
            decode_warnings: 0,
            done: false,
        })
    }

    /// The encoding lines are decoded with.
    #[must_use]
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// The file being read.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes consumed so far, including a skipped byte order mark.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Lines in which undecodable bytes were replaced so far.
    #[must_use]
    pub fn decode_warnings(&self) -> u64 {
        self.decode_warnings
    }

    fn read_chunk(&mut self) -> io::Result<usize> {
        loop {
            match self.file.read(&mut self.buffer) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                result => return result,
            }
        }
    }
}

impl Iterator for ChunkedReader {
    type Item = Result<Line, FileAccessError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(raw) = self.pending.pop_front() {
                let line = raw.decode(self.next_index, self.encoding, &mut self.decode_warnings);
                self.next_index += 1;
                return Some(Ok(line));
            }
            if self.done {
                return None;
            }

            match self.read_chunk() {
                Ok(0) => {
                    self.done = true;
                    self.pending.extend(self.splitter.finish());
                }
                Ok(n) => {
                    self.bytes_read += n as u64;
                    self.splitter.push(&self.buffer[..n], &mut self.pending);
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(FileAccessError::from_io(&self.path, e)));
                }
            }
        }
    }
}
