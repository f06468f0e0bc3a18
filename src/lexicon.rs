use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::{EngineError, Result};
use crate::index::compressed_index::CompressedInvertedIndex;

/// Maps each term to its document frequency. Keeping the DF here, away from
/// the posting lists, makes the IDF lookup during scoring a single hash probe.
#[derive(Debug, Default)]
pub struct Lexicon {
    document_frequencies: FxHashMap<String, u32>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self {
            document_frequencies: FxHashMap::default(),
        }
    }

    /// Additive upsert: `DF(term) += df_delta`. The build pipeline calls this
    /// with 1 per distinct term per document, and partial DFs are summed over
    /// disjoint chunks.
    pub fn add_term(&mut self, term: &str, df_delta: u32) {
        if let Some(frequency) = self.document_frequencies.get_mut(term) {
            *frequency += df_delta;
        } else {
            self.document_frequencies.insert(term.to_string(), df_delta);
        }
    }

    pub fn document_frequency(&self, term: &str) -> Option<u32> {
        self.document_frequencies.get(term).copied()
    }

    pub fn all_terms(&self) -> impl Iterator<Item = &str> {
        self.document_frequencies.keys().map(|term| term.as_str())
    }

    pub fn len(&self) -> usize {
        self.document_frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document_frequencies.is_empty()
    }

    /// Recounts DFs from a merged index. Only needed when the merged inputs
    /// may have shared doc ids; the standard build merges disjoint partials
    /// and keeps its additive DFs.
    pub fn rebuild_from(index: &CompressedInvertedIndex) -> Result<Self> {
        let mut lexicon = Lexicon::new();
        for term in index.terms() {
            let postings = index.decompress_all(term)?;
            lexicon.add_term(term, postings.len() as u32);
        }
        Ok(lexicon)
    }

    /// One `term document_frequency` record per line.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for (term, frequency) in &self.document_frequencies {
            writeln!(writer, "{term} {frequency}")?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut lexicon = Lexicon::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = line.rsplit_once(' ').and_then(|(term, frequency)| {
                Some((term, frequency.parse::<u32>().ok()?))
            });
            match record {
                Some((term, frequency)) => lexicon.add_term(term, frequency),
                None => {
                    return Err(EngineError::CorruptIndexFile(format!(
                        "malformed lexicon record: {line:?}"
                    )));
                }
            }
        }
        Ok(lexicon)
    }
}
