use crate::error::{EngineError, Result};

// PForDelta codec for one chunk of postings. Doc ids are d-gap encoded, term
// frequencies are stored raw, and every symbol in the blob is packed at one
// common byte width. The blob is self-describing:
//
//   [width: u8][gaps, width bytes each, big-endian][frequencies, same]
//
// The width is chosen per blob from the largest gap or frequency and never
// exceeds 4 bytes since both streams are u32.

/// Compresses two aligned streams into a single blob. `doc_ids` must be
/// strictly ascending and the same length as `frequencies`.
pub fn compress(doc_ids: &[u32], frequencies: &[u32]) -> Result<Vec<u8>> {
    if doc_ids.len() != frequencies.len() {
        return Err(EngineError::InvalidArgument(format!(
            "doc_ids and frequencies must be the same length, got {} and {}",
            doc_ids.len(),
            frequencies.len()
        )));
    }
    if doc_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut gaps = Vec::with_capacity(doc_ids.len());
    gaps.push(doc_ids[0]);
    for pair in doc_ids.windows(2) {
        let gap = pair[1].checked_sub(pair[0]).ok_or_else(|| {
            EngineError::InvalidArgument(format!(
                "doc_ids must be ascending, got {} after {}",
                pair[1], pair[0]
            ))
        })?;
        gaps.push(gap);
    }

    let max_gap = gaps.iter().copied().max().unwrap_or(0);
    let max_frequency = frequencies.iter().copied().max().unwrap_or(0);
    let width = byte_width(max_gap.max(max_frequency));

    let mut blob = Vec::with_capacity(1 + 2 * width * gaps.len());
    blob.push(width as u8);
    for gap in &gaps {
        pack(&mut blob, *gap, width);
    }
    for frequency in frequencies {
        pack(&mut blob, *frequency, width);
    }
    Ok(blob)
}

/// Decompresses a blob back into `(doc_ids, frequencies)`. An empty blob
/// decodes to two empty streams.
pub fn decompress(blob: &[u8]) -> Result<(Vec<u32>, Vec<u32>)> {
    if blob.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let width = blob[0] as usize;
    if width == 0 || width > 4 {
        return Err(EngineError::CorruptBlob(format!(
            "symbol width {width} is out of range"
        )));
    }
    let body = &blob[1..];
    if body.is_empty() || body.len() % (2 * width) != 0 {
        return Err(EngineError::CorruptBlob(format!(
            "payload of {} bytes does not split into two {width}-byte streams",
            body.len()
        )));
    }

    let half = body.len() / 2;
    let gaps = unpack(&body[..half], width);
    let frequencies = unpack(&body[half..], width);

    let mut doc_ids = Vec::with_capacity(gaps.len());
    let mut previous = 0u32;
    for (position, gap) in gaps.iter().enumerate() {
        previous = if position == 0 {
            *gap
        } else {
            previous.checked_add(*gap).ok_or_else(|| {
                EngineError::CorruptBlob("doc id overflow while summing gaps".to_string())
            })?
        };
        doc_ids.push(previous);
    }
    Ok((doc_ids, frequencies))
}

// bit length rounded up to whole bytes, at least one
fn byte_width(value: u32) -> usize {
    let bits = (32 - value.leading_zeros() as usize).max(1);
    bits.div_ceil(8)
}

fn pack(out: &mut Vec<u8>, value: u32, width: usize) {
    out.extend_from_slice(&value.to_be_bytes()[4 - width..]);
}

fn unpack(data: &[u8], width: usize) -> Vec<u32> {
    data.chunks_exact(width)
        .map(|symbol| {
            let mut buf = [0u8; 4];
            buf[4 - width..].copy_from_slice(symbol);
            u32::from_be_bytes(buf)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_single_byte_width() {
        let doc_ids = vec![1, 5, 10];
        let frequencies = vec![2, 3, 1];

        let blob = compress(&doc_ids, &frequencies).unwrap();
        assert_eq!(blob[0], 1);
        assert_eq!(blob.len(), 1 + 2 * doc_ids.len());

        let (decoded_ids, decoded_frequencies) = decompress(&blob).unwrap();
        assert_eq!(decoded_ids, doc_ids);
        assert_eq!(decoded_frequencies, frequencies);
    }

    #[test]
    fn test_round_trip_empty() {
        let blob = compress(&[], &[]).unwrap();
        assert!(blob.is_empty());

        let (doc_ids, frequencies) = decompress(&blob).unwrap();
        assert!(doc_ids.is_empty());
        assert!(frequencies.is_empty());
    }

    #[test]
    fn test_width_follows_largest_symbol() {
        // gaps fit in one byte but the frequencies need two
        let doc_ids = vec![10, 11, 12];
        let frequencies = vec![1, 700, 2];

        let blob = compress(&doc_ids, &frequencies).unwrap();
        assert_eq!(blob[0], 2);

        let decoded = decompress(&blob).unwrap();
        assert_eq!(decoded, (doc_ids, frequencies));
    }

    #[test]
    fn test_round_trip_large_values() {
        let doc_ids = vec![1_000_000, 20_000_000, u32::MAX];
        let frequencies = vec![3, 1, 90_000];

        let blob = compress(&doc_ids, &frequencies).unwrap();
        assert_eq!(blob[0], 4);

        let decoded = decompress(&blob).unwrap();
        assert_eq!(decoded, (doc_ids, frequencies));
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let result = compress(&[1, 2, 3], &[1, 2]);
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn test_descending_doc_ids_rejected() {
        let result = compress(&[5, 3], &[1, 1]);
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn test_truncated_blob_rejected() {
        let blob = compress(&[1, 5, 10], &[2, 3, 1]).unwrap();
        let result = decompress(&blob[..blob.len() - 1]);
        assert!(matches!(result, Err(EngineError::CorruptBlob(_))));
    }

    #[test]
    fn test_bad_width_rejected() {
        let result = decompress(&[9, 1, 2]);
        assert!(matches!(result, Err(EngineError::CorruptBlob(_))));

        let result = decompress(&[0, 1, 2]);
        assert!(matches!(result, Err(EngineError::CorruptBlob(_))));
    }
}
