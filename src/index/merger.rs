use std::collections::BTreeSet;
use std::path::PathBuf;

use rayon::prelude::*;
use tracing::debug;

use crate::compressor::p_for_delta;
use crate::error::{EngineError, Result};
use crate::index::compressed_index::CompressedInvertedIndex;

/// Merges two compressed posting blobs, summing frequencies where both sides
/// carry the same document.
pub fn merge_two_postings(blob1: &[u8], blob2: &[u8]) -> Result<Vec<u8>> {
    if blob1.is_empty() {
        return Ok(blob2.to_vec());
    }
    if blob2.is_empty() {
        return Ok(blob1.to_vec());
    }

    let (doc_ids1, frequencies1) = p_for_delta::decompress(blob1)?;
    let (doc_ids2, frequencies2) = p_for_delta::decompress(blob2)?;
    let (doc_ids, frequencies) =
        merge_posting_arrays(&doc_ids1, &frequencies1, &doc_ids2, &frequencies2);
    p_for_delta::compress(&doc_ids, &frequencies)
}

/// Two-pointer sorted merge over aligned arrays; equal doc ids sum their
/// frequencies.
pub fn merge_posting_arrays(
    doc_ids1: &[u32],
    frequencies1: &[u32],
    doc_ids2: &[u32],
    frequencies2: &[u32],
) -> (Vec<u32>, Vec<u32>) {
    let mut doc_ids = Vec::with_capacity(doc_ids1.len() + doc_ids2.len());
    let mut frequencies = Vec::with_capacity(doc_ids.capacity());

    let mut left = 0;
    let mut right = 0;
    while left < doc_ids1.len() && right < doc_ids2.len() {
        if doc_ids1[left] < doc_ids2[right] {
            doc_ids.push(doc_ids1[left]);
            frequencies.push(frequencies1[left]);
            left += 1;
        } else if doc_ids2[right] < doc_ids1[left] {
            doc_ids.push(doc_ids2[right]);
            frequencies.push(frequencies2[right]);
            right += 1;
        } else {
            doc_ids.push(doc_ids1[left]);
            frequencies.push(frequencies1[left] + frequencies2[right]);
            left += 1;
            right += 1;
        }
    }
    doc_ids.extend_from_slice(&doc_ids1[left..]);
    frequencies.extend_from_slice(&frequencies1[left..]);
    doc_ids.extend_from_slice(&doc_ids2[right..]);
    frequencies.extend_from_slice(&frequencies2[right..]);

    (doc_ids, frequencies)
}

/// Merges two indexes over the union of their terms. Postings are fully
/// decoded, merged with frequency sums, then rechunked through
/// `add_postings`, so the result is independent of the inputs' chunking.
pub fn merge_two_indexes(
    index1: &CompressedInvertedIndex,
    index2: &CompressedInvertedIndex,
) -> Result<CompressedInvertedIndex> {
    let mut merged = CompressedInvertedIndex::with_chunk_size(index1.chunk_size());

    let all_terms: BTreeSet<&str> = index1.terms().chain(index2.terms()).collect();
    for term in all_terms {
        let postings1 = index1.decompress_all(term)?;
        let postings2 = index2.decompress_all(term)?;

        let doc_ids1: Vec<u32> = postings1.iter().map(|posting| posting.doc_id).collect();
        let frequencies1: Vec<u32> = postings1
            .iter()
            .map(|posting| posting.term_frequency)
            .collect();
        let doc_ids2: Vec<u32> = postings2.iter().map(|posting| posting.doc_id).collect();
        let frequencies2: Vec<u32> = postings2
            .iter()
            .map(|posting| posting.term_frequency)
            .collect();

        let (doc_ids, frequencies) =
            merge_posting_arrays(&doc_ids1, &frequencies1, &doc_ids2, &frequencies2);
        merged.add_postings(term, &doc_ids, &frequencies)?;
    }
    Ok(merged)
}

/// Loads the partial indexes and reduces them with a pairwise tournament.
/// Pairs of the same level have independent inputs and outputs, so each
/// level is merged in parallel. Frequency sums are associative and
/// commutative, which makes the result independent of the pairing order.
pub fn merge_many(paths: &[PathBuf]) -> Result<CompressedInvertedIndex> {
    let mut indexes = paths
        .iter()
        .map(|path| CompressedInvertedIndex::load_from_file(path))
        .collect::<Result<Vec<_>>>()?;

    while indexes.len() > 1 {
        let before = indexes.len();

        let mut pairs = Vec::with_capacity(before / 2);
        let mut carry = None;
        let mut remaining = indexes.into_iter();
        loop {
            match (remaining.next(), remaining.next()) {
                (Some(first), Some(second)) => pairs.push((first, second)),
                (Some(odd), None) => {
                    carry = Some(odd);
                    break;
                }
                _ => break,
            }
        }

        let mut round: Vec<CompressedInvertedIndex> = pairs
            .par_iter()
            .map(|(first, second)| merge_two_indexes(first, second))
            .collect::<Result<Vec<_>>>()?;
        if let Some(odd) = carry {
            round.push(odd);
        }

        debug!(from = before, to = round.len(), "merge level complete");
        indexes = round;
    }

    match indexes.pop() {
        Some(index) => Ok(index),
        None => Err(EngineError::InvalidArgument(
            "the list of partial index paths is empty".to_string(),
        )),
    }
}
