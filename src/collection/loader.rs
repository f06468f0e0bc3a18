use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use flate2::read::GzDecoder;
use tracing::debug;

use crate::error::Result;

/// Streaming reader over the passage collection: a TSV file with an
/// `index\ttext` header, one `doc_id\ttext` record per line, optionally
/// gzip-compressed (decided by the file extension).
///
/// The collection is assumed sorted by doc id. The builder relies on this:
/// it is what makes the doc id ranges of successive chunks disjoint.
pub struct CollectionLoader {
    file_path: PathBuf,
}

impl CollectionLoader {
    pub fn new<P: Into<PathBuf>>(file_path: P) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    fn open_reader(&self) -> Result<Box<dyn BufRead>> {
        let file = File::open(&self.file_path)?;
        let is_gzip = self
            .file_path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension == "gz" || extension == "gzip");
        if is_gzip {
            Ok(Box::new(BufReader::new(GzDecoder::new(file))))
        } else {
            Ok(Box::new(BufReader::new(file)))
        }
    }

    /// Counts the records in the collection without keeping any of them.
    pub fn total_docs(&self) -> Result<usize> {
        let mut reader = self.open_reader()?;
        let mut line = String::new();
        // header
        reader.read_line(&mut line)?;

        let mut total = 0;
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            if !line.trim().is_empty() {
                total += 1;
            }
        }
        Ok(total)
    }

    /// Opens a fresh stream positioned after the header.
    pub fn stream(&self) -> Result<DocumentStream> {
        let mut reader = self.open_reader()?;
        let mut header = String::new();
        reader.read_line(&mut header)?;
        Ok(DocumentStream {
            reader,
            line: String::new(),
        })
    }

    /// First documents of the collection, for the memory profiler.
    pub fn sample(&self, max_docs: usize) -> Result<Vec<(u32, String)>> {
        let mut stream = self.stream()?;
        Ok(stream.next_chunk(max_docs)?.unwrap_or_default())
    }
}

/// Pull-based iterator of owned record batches; the caller decides how many
/// documents to take on each pull, so chunk sizes can shrink mid-stream.
pub struct DocumentStream {
    reader: Box<dyn BufRead>,
    line: String,
}

impl DocumentStream {
    /// Reads up to `max_docs` records. `Ok(None)` once the stream is
    /// exhausted. Records that do not parse are skipped, matching the
    /// loader's tolerant TSV handling.
    pub fn next_chunk(&mut self, max_docs: usize) -> Result<Option<Vec<(u32, String)>>> {
        let mut batch = Vec::new();
        let mut at_end = false;

        while batch.len() < max_docs {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                at_end = true;
                break;
            }
            let record = self.line.trim_end_matches(['\n', '\r']);
            if record.is_empty() {
                continue;
            }
            match parse_record(record) {
                Some((doc_id, text)) => batch.push((doc_id, text)),
                None => debug!(line = record, "skipping malformed collection record"),
            }
        }

        if batch.is_empty() && at_end {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }
}

fn parse_record(line: &str) -> Option<(u32, String)> {
    let (doc_id, text) = line.split_once('\t')?;
    Some((doc_id.trim().parse().ok()?, text.to_string()))
}
