//! Chunked CSV row parser
//!
//! Reads an uploaded file lazily, yielding raw rows in batches whose size is
//! bounded by a byte budget rather than a row count. The header line is kept
//! for reference only; the normalizer decides how columns map onto fields.

use csv::{ByteRecord, Reader, ReaderBuilder};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::ImportError;
use super::row::{HeaderIndex, RawRow, LINE_NUMBER_OFFSET};

/// File extension accepted for uploads
pub const ACCEPTED_EXTENSION: &str = "csv";

#[derive(Debug, Clone, Copy)]
pub struct RowParser {
    chunk_size: usize,
}

impl RowParser {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Open an uploaded file.
    ///
    /// The extension is checked before the file is touched.
    pub fn open(&self, path: &Path) -> Result<RowChunks<File>, ImportError> {
        if !has_accepted_extension(path) {
            return Err(ImportError::UnsupportedFileType {
                path: path.to_path_buf(),
            });
        }
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|e| ImportError::unreadable(path, e))?;
        self.from_reader(file, path)
    }

    /// Parse from any reader; `source` is only used in error messages.
    pub fn from_reader<R: Read>(
        &self,
        reader: R,
        source: &Path,
    ) -> Result<RowChunks<R>, ImportError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .buffer_capacity(self.chunk_size)
            .from_reader(reader);

        let headers = reader
            .byte_headers()
            .map_err(|e| ImportError::unreadable(source, e))?
            .clone();

        let names: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let name = String::from_utf8_lossy(h).into_owned();
                if i == 0 {
                    name.trim_start_matches('\u{feff}').to_string()
                } else {
                    name
                }
            })
            .collect();

        if names.iter().all(|n| n.trim().is_empty()) {
            return Err(ImportError::EmptyFile {
                path: source.to_path_buf(),
            });
        }

        tracing::debug!(source = %source.display(), columns = names.len(), "parsed header row");

        Ok(RowChunks {
            reader,
            headers: Arc::new(HeaderIndex::new(names)),
            chunk_size: self.chunk_size,
            source: source.to_path_buf(),
            record: ByteRecord::new(),
            ordinal: 0,
            done: false,
        })
    }
}

fn has_accepted_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ACCEPTED_EXTENSION))
}

/// Lazy, non-restartable sequence of row chunks
pub struct RowChunks<R> {
    reader: Reader<R>,
    headers: Arc<HeaderIndex>,
    chunk_size: usize,
    source: PathBuf,
    record: ByteRecord,
    ordinal: usize,
    done: bool,
}

impl<R: Read> RowChunks<R> {
    pub fn headers(&self) -> &HeaderIndex {
        &self.headers
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    fn decode(&self, line_number: usize) -> RawRow {
        let mut cells = Vec::with_capacity(self.record.len());
        for field in self.record.iter() {
            match std::str::from_utf8(field) {
                Ok(s) => cells.push(s.to_string()),
                Err(_) => {
                    return RawRow::unreadable(
                        line_number,
                        Arc::clone(&self.headers),
                        "Row contains text that is not valid UTF-8",
                    )
                }
            }
        }
        RawRow::new(line_number, cells, Arc::clone(&self.headers))
    }
}

impl<R: Read> Iterator for RowChunks<R> {
    type Item = Result<Vec<RawRow>, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let start = self.reader.position().byte();
        let mut chunk = Vec::new();

        loop {
            match self.reader.read_byte_record(&mut self.record) {
                Ok(true) => {
                    let row = self.decode(self.ordinal + LINE_NUMBER_OFFSET);
                    if row.is_blank() {
                        continue;
                    }
                    self.ordinal += 1;
                    chunk.push(row);

                    let consumed = self.reader.position().byte().saturating_sub(start);
                    if consumed >= self.chunk_size as u64 {
                        break;
                    }
                }
                Ok(false) => {
                    self.done = true;
                    break;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(ImportError::unreadable(&self.source, e)));
                }
            }
        }

        if chunk.is_empty() {
            None
        } else {
            tracing::debug!(rows = chunk.len(), "parsed chunk");
            Some(Ok(chunk))
        }
    }
}
