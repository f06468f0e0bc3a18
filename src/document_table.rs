use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::{EngineError, Result};

/// Maps each document id to its length in terms. Lengths feed the BM25
/// normalization, so the table is written once per build and read-only
/// afterwards.
#[derive(Debug, Default)]
pub struct DocumentTable {
    lengths: FxHashMap<u32, u32>,
}

impl DocumentTable {
    pub fn new() -> Self {
        Self {
            lengths: FxHashMap::default(),
        }
    }

    pub fn add_document(&mut self, doc_id: u32, length: u32) {
        self.lengths.insert(doc_id, length);
    }

    /// Returns 0 for unknown documents. Callers must not score against a
    /// zero length.
    pub fn document_length(&self, doc_id: u32) -> u32 {
        self.lengths.get(&doc_id).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.lengths.iter().map(|(doc_id, length)| (*doc_id, *length))
    }

    pub fn average_length(&self) -> f32 {
        if self.lengths.is_empty() {
            return 0.0;
        }
        let total: u64 = self.lengths.values().map(|length| *length as u64).sum();
        total as f32 / self.lengths.len() as f32
    }

    /// One `doc_id length` record per line.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for (doc_id, length) in &self.lengths {
            writeln!(writer, "{doc_id} {length}")?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut table = DocumentTable::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let record = fields
                .next()
                .zip(fields.next())
                .and_then(|(doc_id, length)| {
                    Some((doc_id.parse::<u32>().ok()?, length.parse::<u32>().ok()?))
                });
            match record {
                Some((doc_id, length)) => table.add_document(doc_id, length),
                None => {
                    return Err(EngineError::CorruptIndexFile(format!(
                        "malformed document table record: {line:?}"
                    )));
                }
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_document_has_zero_length() {
        let mut table = DocumentTable::new();
        table.add_document(1, 42);

        assert_eq!(table.document_length(1), 42);
        assert_eq!(table.document_length(2), 0);
    }

    #[test]
    fn test_add_is_an_upsert() {
        let mut table = DocumentTable::new();
        table.add_document(7, 10);
        table.add_document(7, 12);

        assert_eq!(table.len(), 1);
        assert_eq!(table.document_length(7), 12);
    }

    #[test]
    fn test_average_length() {
        let mut table = DocumentTable::new();
        assert_eq!(table.average_length(), 0.0);

        table.add_document(1, 4);
        table.add_document(2, 8);
        assert_eq!(table.average_length(), 6.0);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("document_table.txt");

        let mut table = DocumentTable::new();
        table.add_document(1, 12);
        table.add_document(9, 3);
        table.write_to_file(&path).unwrap();

        let loaded = DocumentTable::load_from_file(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.document_length(1), 12);
        assert_eq!(loaded.document_length(9), 3);

        let mut records: Vec<(u32, u32)> = loaded.iter().collect();
        records.sort();
        assert_eq!(records, vec![(1, 12), (9, 3)]);
    }

    #[test]
    fn test_malformed_record_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("document_table.txt");
        std::fs::write(&path, "1 12\nnot a record\n").unwrap();

        let result = DocumentTable::load_from_file(&path);
        assert!(matches!(result, Err(EngineError::CorruptIndexFile(_))));
    }
}
