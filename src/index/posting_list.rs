use crate::compressor::p_for_delta;
use crate::error::Result;
use crate::index::posting::Posting;

/// Navigable iterator over one term's compressed chunks. Only the current
/// chunk is ever decompressed; navigation first narrows the candidate range
/// with the skip array (the first doc id of every k-th chunk), then binary
/// searches the chunk boundaries inside that range.
///
/// The iterator is monotonic: calls with non-decreasing targets never move
/// backward. [`PostingList::reset`] repositions to the start.
pub struct PostingList<'a> {
    chunks: &'a [Vec<u8>],
    boundaries: &'a [(u32, u32)],
    skips: Vec<u32>,
    skip_stride: usize,
    current_chunk: usize,
    position: usize,
    doc_ids: Vec<u32>,
    frequencies: Vec<u32>,
    loaded: bool,
}

impl<'a> PostingList<'a> {
    pub fn new(chunks: &'a [Vec<u8>], boundaries: &'a [(u32, u32)], skip_stride: usize) -> Self {
        let skip_stride = skip_stride.max(1);
        let skips = boundaries
            .iter()
            .step_by(skip_stride)
            .map(|(first, _)| *first)
            .collect();
        Self {
            chunks,
            boundaries,
            skips,
            skip_stride,
            current_chunk: 0,
            position: 0,
            doc_ids: Vec::new(),
            frequencies: Vec::new(),
            loaded: false,
        }
    }

    /// Returns the first posting with `doc_id >= target`, or `None` once the
    /// list is exhausted. The cursor is left on the returned posting.
    pub fn next_geq(&mut self, target: u32) -> Result<Option<Posting>> {
        if self.chunks.is_empty() {
            return Ok(None);
        }

        // skip array: the last skip entry at or below the target gives a
        // lower bound on the chunk that can hold it
        let skip_segment = self.skips.partition_point(|first| *first <= target);
        let lower = skip_segment.saturating_sub(1) * self.skip_stride;

        // first chunk in range whose last doc id reaches the target
        let chunk = lower
            + self.boundaries[lower..].partition_point(|(_, last)| *last < target);
        if chunk == self.boundaries.len() {
            return Ok(None);
        }

        if chunk != self.current_chunk || !self.loaded {
            self.load_chunk(chunk)?;
        }

        while self.position < self.doc_ids.len() {
            if self.doc_ids[self.position] >= target {
                return Ok(Some(Posting::new(
                    self.doc_ids[self.position],
                    self.frequencies[self.position],
                )));
            }
            self.position += 1;
        }

        // target was past everything left in this chunk: the next chunk's
        // first posting is the answer
        if chunk + 1 < self.chunks.len() {
            self.load_chunk(chunk + 1)?;
            if !self.doc_ids.is_empty() {
                return Ok(Some(Posting::new(self.doc_ids[0], self.frequencies[0])));
            }
        }
        Ok(None)
    }

    pub fn reset(&mut self) {
        self.current_chunk = 0;
        self.position = 0;
        self.loaded = false;
        self.doc_ids.clear();
        self.frequencies.clear();
    }

    fn load_chunk(&mut self, chunk: usize) -> Result<()> {
        let (doc_ids, frequencies) = p_for_delta::decompress(&self.chunks[chunk])?;
        self.doc_ids = doc_ids;
        self.frequencies = frequencies;
        self.current_chunk = chunk;
        self.position = 0;
        self.loaded = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::compressed_index::CompressedInvertedIndex;

    fn chunked_fixture() -> CompressedInvertedIndex {
        let doc_ids = vec![1, 2, 3, 5, 7, 9, 12, 15, 18, 20, 25, 30];
        let frequencies = vec![1, 2, 1, 3, 2, 1, 4, 2, 1, 2, 3, 1];
        let mut index = CompressedInvertedIndex::with_chunk_size(3);
        index.add_postings("term", &doc_ids, &frequencies).unwrap();
        index
    }

    #[test]
    fn test_next_geq_skips_between_chunks() {
        let index = chunked_fixture();
        let mut list = index.posting_list("term").unwrap();

        assert_eq!(list.next_geq(4).unwrap(), Some(Posting::new(5, 3)));
        assert_eq!(list.next_geq(10).unwrap(), Some(Posting::new(12, 4)));
        assert_eq!(list.next_geq(31).unwrap(), None);
        assert_eq!(list.next_geq(0).unwrap(), Some(Posting::new(1, 1)));
    }

    #[test]
    fn test_target_below_first_returns_first() {
        let index = chunked_fixture();
        let mut list = index.posting_list("term").unwrap();
        assert_eq!(list.next_geq(0).unwrap(), Some(Posting::new(1, 1)));
    }

    #[test]
    fn test_exact_matches_walk_the_whole_list() {
        let index = chunked_fixture();
        let mut list = index.posting_list("term").unwrap();
        for doc_id in [1u32, 2, 3, 5, 7, 9, 12, 15, 18, 20, 25, 30] {
            let posting = list.next_geq(doc_id).unwrap().unwrap();
            assert_eq!(posting.doc_id, doc_id);
        }
        assert_eq!(list.next_geq(31).unwrap(), None);
    }

    #[test]
    fn test_monotonic_over_gaps() {
        let index = chunked_fixture();
        let mut list = index.posting_list("term").unwrap();

        let mut previous = 0;
        for target in [0u32, 4, 4, 8, 13, 19, 26] {
            let posting = list.next_geq(target).unwrap().unwrap();
            assert!(posting.doc_id >= target);
            assert!(posting.doc_id >= previous);
            previous = posting.doc_id;
        }
    }

    #[test]
    fn test_reset_repositions_to_start() {
        let index = chunked_fixture();
        let mut list = index.posting_list("term").unwrap();

        assert_eq!(list.next_geq(20).unwrap(), Some(Posting::new(20, 2)));
        list.reset();
        assert_eq!(list.next_geq(0).unwrap(), Some(Posting::new(1, 1)));
    }

    #[test]
    fn test_empty_list_is_always_none() {
        let chunks: Vec<Vec<u8>> = Vec::new();
        let boundaries: Vec<(u32, u32)> = Vec::new();
        let mut list = PostingList::new(&chunks, &boundaries, 2);
        assert_eq!(list.next_geq(0).unwrap(), None);
        assert_eq!(list.next_geq(100).unwrap(), None);
    }
}
