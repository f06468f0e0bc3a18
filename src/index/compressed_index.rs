use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::compressor::p_for_delta;
use crate::error::{EngineError, Result};
use crate::index::posting::Posting;
use crate::index::posting_list::PostingList;

/// Target number of postings per compressed chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Every k-th chunk boundary feeds the skip array of a posting list.
pub const SKIP_STRIDE: usize = 2;

const MAGIC: &[u8; 4] = b"QIDX";
const FORMAT_VERSION: u8 = 1;

/*
 On-disk index layout. Framing integers are little-endian; symbols inside a
 posting blob are big-endian (the codec's own convention). After the header
 the file is a plain concatenation of term records, end-of-file terminated:

   magic     : 4 bytes "QIDX"
   version   : u8
   per term:
     term_len  : u16
     term      : term_len bytes (UTF-8)
     n_chunks  : u32
     n_chunks x (first_doc_id: u32, last_doc_id: u32)
     n_chunks x (chunk_len: u32, chunk_bytes: chunk_len bytes)
*/

/// The compressed chunks of one term plus the doc id range of each chunk.
/// Boundaries are sorted and non-overlapping; they are what makes binary
/// searching for the right chunk possible.
#[derive(Debug, Clone, Default)]
pub struct ChunkedPostings {
    pub chunks: Vec<Vec<u8>>,
    pub boundaries: Vec<(u32, u32)>,
}

#[derive(Debug, Default)]
pub struct CompressedInvertedIndex {
    postings: FxHashMap<String, ChunkedPostings>,
    chunk_size: usize,
}

impl CompressedInvertedIndex {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            postings: FxHashMap::default(),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(|term| term.as_str())
    }

    /// Compresses `doc_ids`/`frequencies` into chunk-sized blobs and appends
    /// them to the term's list. Calls for the same term must carry disjoint
    /// doc id ranges; out-of-order calls are handled by resorting the chunk
    /// list, overlapping ones are the merger's job.
    pub fn add_postings(&mut self, term: &str, doc_ids: &[u32], frequencies: &[u32]) -> Result<()> {
        if doc_ids.len() != frequencies.len() {
            return Err(EngineError::InvalidArgument(format!(
                "doc_ids and frequencies must be the same length, got {} and {}",
                doc_ids.len(),
                frequencies.len()
            )));
        }
        if doc_ids.is_empty() {
            return Ok(());
        }

        let mut chunks = Vec::with_capacity(doc_ids.len().div_ceil(self.chunk_size));
        let mut boundaries = Vec::with_capacity(chunks.capacity());
        for (id_chunk, frequency_chunk) in doc_ids
            .chunks(self.chunk_size)
            .zip(frequencies.chunks(self.chunk_size))
        {
            chunks.push(p_for_delta::compress(id_chunk, frequency_chunk)?);
            boundaries.push((id_chunk[0], id_chunk[id_chunk.len() - 1]));
        }

        let entry = self.postings.entry(term.to_string()).or_default();
        let appended_out_of_order = entry
            .boundaries
            .last()
            .is_some_and(|last| last.0 > boundaries[0].0);
        entry.chunks.append(&mut chunks);
        entry.boundaries.append(&mut boundaries);

        if appended_out_of_order {
            let mut pairs: Vec<((u32, u32), Vec<u8>)> = entry
                .boundaries
                .drain(..)
                .zip(entry.chunks.drain(..))
                .collect();
            pairs.sort_by_key(|(boundary, _)| boundary.0);
            for (boundary, chunk) in pairs {
                entry.boundaries.push(boundary);
                entry.chunks.push(chunk);
            }
        }
        Ok(())
    }

    pub fn chunked_postings(&self, term: &str) -> Option<&ChunkedPostings> {
        self.postings.get(term)
    }

    /// Returns a navigable iterator over the term's chunks, or `None` for an
    /// unknown term.
    pub fn posting_list(&self, term: &str) -> Option<PostingList<'_>> {
        self.postings
            .get(term)
            .map(|chunked| PostingList::new(&chunked.chunks, &chunked.boundaries, SKIP_STRIDE))
    }

    /// Decodes every chunk of the term. Debug and merge path; query code
    /// should prefer [`Self::posting_list`].
    pub fn decompress_all(&self, term: &str) -> Result<Vec<Posting>> {
        let Some(chunked) = self.postings.get(term) else {
            return Ok(Vec::new());
        };
        let mut postings = Vec::new();
        for chunk in &chunked.chunks {
            let (doc_ids, frequencies) = p_for_delta::decompress(chunk)?;
            postings.extend(
                doc_ids
                    .into_iter()
                    .zip(frequencies)
                    .map(|(doc_id, frequency)| Posting::new(doc_id, frequency)),
            );
        }
        Ok(postings)
    }

    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(MAGIC)?;
        writer.write_all(&[FORMAT_VERSION])?;

        // sorted for a deterministic file regardless of insertion order
        let mut terms: Vec<&String> = self.postings.keys().collect();
        terms.sort();

        for term in terms {
            let chunked = &self.postings[term];
            writer.write_all(&(term.len() as u16).to_le_bytes())?;
            writer.write_all(term.as_bytes())?;
            writer.write_all(&(chunked.chunks.len() as u32).to_le_bytes())?;
            for (first, last) in &chunked.boundaries {
                writer.write_all(&first.to_le_bytes())?;
                writer.write_all(&last.to_le_bytes())?;
            }
            for chunk in &chunked.chunks {
                writer.write_all(&(chunk.len() as u32).to_le_bytes())?;
                writer.write_all(chunk)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let mut reader = RecordReader::new(&bytes);

        if reader.take(4)? != MAGIC {
            return Err(EngineError::CorruptIndexFile(
                "bad magic, not an index file".to_string(),
            ));
        }
        let version = reader.take(1)?[0];
        if version != FORMAT_VERSION {
            return Err(EngineError::CorruptIndexFile(format!(
                "unsupported index format version {version}"
            )));
        }

        let mut index = CompressedInvertedIndex::new();
        while !reader.is_at_end() {
            let term_len = reader.read_u16()? as usize;
            let term = std::str::from_utf8(reader.take(term_len)?)
                .map_err(|_| {
                    EngineError::CorruptIndexFile("term is not valid UTF-8".to_string())
                })?
                .to_string();

            let n_chunks = reader.read_u32()? as usize;
            let mut boundaries = Vec::with_capacity(n_chunks);
            for _ in 0..n_chunks {
                let first = reader.read_u32()?;
                let last = reader.read_u32()?;
                boundaries.push((first, last));
            }
            let mut chunks = Vec::with_capacity(n_chunks);
            for _ in 0..n_chunks {
                let chunk_len = reader.read_u32()? as usize;
                chunks.push(reader.take(chunk_len)?.to_vec());
            }
            index
                .postings
                .insert(term, ChunkedPostings { chunks, boundaries });
        }
        Ok(index)
    }
}

struct RecordReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> RecordReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn is_at_end(&self) -> bool {
        self.offset == self.bytes.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.offset.checked_add(len).filter(|end| *end <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.offset..end];
                self.offset = end;
                Ok(slice)
            }
            None => Err(EngineError::CorruptIndexFile(format!(
                "record of {len} bytes at offset {} runs past end of file",
                self.offset
            ))),
        }
    }

    fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_boundaries() {
        let doc_ids = vec![1, 2, 3, 5, 7, 9, 12, 15, 18, 20, 25, 30];
        let frequencies = vec![1, 2, 1, 3, 2, 1, 4, 2, 1, 2, 3, 1];

        let mut index = CompressedInvertedIndex::with_chunk_size(3);
        index.add_postings("term", &doc_ids, &frequencies).unwrap();

        let chunked = index.chunked_postings("term").unwrap();
        assert_eq!(chunked.chunks.len(), 4);
        assert_eq!(
            chunked.boundaries,
            vec![(1, 3), (5, 9), (12, 18), (20, 30)]
        );
    }

    #[test]
    fn test_decompress_all_round_trips() {
        let doc_ids = vec![1, 2, 3, 5, 7, 9, 12];
        let frequencies = vec![1, 2, 1, 3, 2, 1, 4];

        let mut index = CompressedInvertedIndex::with_chunk_size(3);
        index.add_postings("term", &doc_ids, &frequencies).unwrap();

        let postings = index.decompress_all("term").unwrap();
        let decoded_ids: Vec<u32> = postings.iter().map(|posting| posting.doc_id).collect();
        let decoded_frequencies: Vec<u32> =
            postings.iter().map(|posting| posting.term_frequency).collect();
        assert_eq!(decoded_ids, doc_ids);
        assert_eq!(decoded_frequencies, frequencies);
    }

    #[test]
    fn test_unknown_term() {
        let index = CompressedInvertedIndex::new();
        assert!(index.posting_list("missing").is_none());
        assert!(index.decompress_all("missing").unwrap().is_empty());
    }

    #[test]
    fn test_out_of_order_appends_are_resorted() {
        let mut index = CompressedInvertedIndex::with_chunk_size(2);
        index.add_postings("term", &[10, 11], &[1, 1]).unwrap();
        index.add_postings("term", &[1, 2], &[2, 2]).unwrap();

        let chunked = index.chunked_postings("term").unwrap();
        assert_eq!(chunked.boundaries, vec![(1, 2), (10, 11)]);

        let postings = index.decompress_all("term").unwrap();
        let decoded_ids: Vec<u32> = postings.iter().map(|posting| posting.doc_id).collect();
        assert_eq!(decoded_ids, vec![1, 2, 10, 11]);
    }

    #[test]
    fn test_empty_input_is_a_no_op() {
        let mut index = CompressedInvertedIndex::new();
        index.add_postings("term", &[], &[]).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inverted_index.bin");

        let mut index = CompressedInvertedIndex::with_chunk_size(3);
        index
            .add_postings("information", &[1, 2, 8, 11], &[1, 2, 1, 3])
            .unwrap();
        index.add_postings("retrieval", &[1, 3], &[1, 1]).unwrap();
        index.write_to_file(&path).unwrap();

        let loaded = CompressedInvertedIndex::load_from_file(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(
            loaded.chunked_postings("information").unwrap().boundaries,
            vec![(1, 8), (11, 11)]
        );
        assert_eq!(
            loaded.decompress_all("retrieval").unwrap(),
            vec![Posting::new(1, 1), Posting::new(3, 1)]
        );
    }

    #[test]
    fn test_bad_magic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_an_index.bin");
        std::fs::write(&path, b"XXXX\x01").unwrap();

        let result = CompressedInvertedIndex::load_from_file(&path);
        assert!(matches!(result, Err(EngineError::CorruptIndexFile(_))));
    }

    #[test]
    fn test_truncated_record_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inverted_index.bin");

        let mut index = CompressedInvertedIndex::new();
        index.add_postings("term", &[1, 2], &[1, 1]).unwrap();
        index.write_to_file(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 2]).unwrap();

        let result = CompressedInvertedIndex::load_from_file(&path);
        assert!(matches!(result, Err(EngineError::CorruptIndexFile(_))));
    }
}
