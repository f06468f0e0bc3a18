use std::str::FromStr;

use crate::document_table::DocumentTable;
use crate::error::EngineError;
use crate::lexicon::Lexicon;

/// BM25 parameters
pub struct BM25Params {
    pub k1: f32, // term frequency saturation
    pub b: f32,  // document length normalization
}

impl Default for BM25Params {
    fn default() -> Self {
        BM25Params { k1: 1.5, b: 0.75 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringMethod {
    TfIdf,
    Bm25,
}

impl FromStr for ScoringMethod {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "tfidf" => Ok(ScoringMethod::TfIdf),
            "bm25" => Ok(ScoringMethod::Bm25),
            other => Err(EngineError::InvalidArgument(format!(
                "unknown scoring method {other:?}, choose \"tfidf\" or \"bm25\""
            ))),
        }
    }
}

/// Scores a single (term, document, tf) triple. The document count and the
/// average length are computed once at construction; per-call work is two
/// hash probes and the formula.
pub struct Scorer<'a> {
    lexicon: &'a Lexicon,
    document_table: &'a DocumentTable,
    total_documents: f32,
    average_document_length: f32,
    params: BM25Params,
}

impl<'a> Scorer<'a> {
    pub fn new(lexicon: &'a Lexicon, document_table: &'a DocumentTable) -> Self {
        Self::with_params(lexicon, document_table, BM25Params::default())
    }

    pub fn with_params(
        lexicon: &'a Lexicon,
        document_table: &'a DocumentTable,
        params: BM25Params,
    ) -> Self {
        Self {
            lexicon,
            document_table,
            total_documents: document_table.len() as f32,
            average_document_length: document_table.average_length(),
            params,
        }
    }

    pub fn score(
        &self,
        method: ScoringMethod,
        term: &str,
        doc_id: u32,
        term_frequency: u32,
    ) -> f32 {
        match method {
            ScoringMethod::TfIdf => self.tfidf(term, doc_id, term_frequency),
            ScoringMethod::Bm25 => self.bm25(term, doc_id, term_frequency),
        }
    }

    /// `(1 + ln tf) * ln(N / DF)`
    pub fn tfidf(&self, term: &str, doc_id: u32, term_frequency: u32) -> f32 {
        let Some(idf) = self.idf(term) else {
            return 0.0;
        };
        if self.document_table.document_length(doc_id) == 0 {
            return 0.0;
        }
        (1.0 + (term_frequency as f32).ln()) * idf
    }

    /// `ln(N / DF) * tf / (tf + k1 * (1 - b + b * |d| / avg|d|))`
    pub fn bm25(&self, term: &str, doc_id: u32, term_frequency: u32) -> f32 {
        let Some(idf) = self.idf(term) else {
            return 0.0;
        };
        let document_length = self.document_table.document_length(doc_id);
        if document_length == 0 {
            return 0.0;
        }

        let tf = term_frequency as f32;
        let length_norm = self.params.k1
            * (1.0 - self.params.b
                + self.params.b * document_length as f32 / self.average_document_length);
        idf * tf / (tf + length_norm)
    }

    fn idf(&self, term: &str) -> Option<f32> {
        match self.lexicon.document_frequency(term) {
            Some(df) if df > 0 => Some((self.total_documents / df as f32).ln()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Lexicon, DocumentTable) {
        let mut lexicon = Lexicon::new();
        lexicon.add_term("information", 2);
        lexicon.add_term("retrieval", 2);

        let mut table = DocumentTable::new();
        table.add_document(1, 2);
        table.add_document(2, 2);
        table.add_document(3, 2);
        (lexicon, table)
    }

    #[test]
    fn test_tfidf_matches_the_formula() {
        let (lexicon, table) = fixture();
        let scorer = Scorer::new(&lexicon, &table);

        let expected = (1.0 + 1.0f32.ln()) * (3.0f32 / 2.0).ln();
        assert!((scorer.tfidf("information", 1, 1) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_bm25_matches_the_formula() {
        let (lexicon, table) = fixture();
        let scorer = Scorer::new(&lexicon, &table);

        // |d| == avg|d|, so the length normalization collapses to k1
        let expected = (3.0f32 / 2.0).ln() * 1.0 / (1.0 + 1.5);
        assert!((scorer.bm25("retrieval", 3, 1) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_term_scores_zero() {
        let (lexicon, table) = fixture();
        let scorer = Scorer::new(&lexicon, &table);

        assert_eq!(scorer.tfidf("missing", 1, 4), 0.0);
        assert_eq!(scorer.bm25("missing", 1, 4), 0.0);
    }

    #[test]
    fn test_unknown_document_scores_zero() {
        let (lexicon, table) = fixture();
        let scorer = Scorer::new(&lexicon, &table);

        assert_eq!(scorer.tfidf("information", 99, 4), 0.0);
        assert_eq!(scorer.bm25("information", 99, 4), 0.0);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("tfidf".parse::<ScoringMethod>().unwrap(), ScoringMethod::TfIdf);
        assert_eq!("bm25".parse::<ScoringMethod>().unwrap(), ScoringMethod::Bm25);
        assert!(matches!(
            "pagerank".parse::<ScoringMethod>(),
            Err(EngineError::InvalidArgument(_))
        ));
    }
}
