use std::str::FromStr;

use rustc_hash::FxHashMap;

use crate::document_table::DocumentTable;
use crate::error::{EngineError, Result};
use crate::index::compressed_index::CompressedInvertedIndex;
use crate::lexicon::Lexicon;
use crate::query_parser::tokenizer::SearchTokenizer;
use crate::query_processor::top_k::{ScoredDocument, TopK};
use crate::scoring::scoring::{Scorer, ScoringMethod};

pub const DEFAULT_MAX_RESULTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Conjunctive,
    Disjunctive,
}

impl FromStr for QueryType {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "conjunctive" => Ok(QueryType::Conjunctive),
            "disjunctive" => Ok(QueryType::Disjunctive),
            other => Err(EngineError::InvalidArgument(format!(
                "unknown query type {other:?}, choose \"conjunctive\" or \"disjunctive\""
            ))),
        }
    }
}

/// Evaluates queries against a loaded index. Holds only shared references,
/// so query workers can run side by side over the same artifacts.
pub struct QueryProcessor<'a> {
    tokenizer: &'a SearchTokenizer,
    lexicon: &'a Lexicon,
    inverted_index: &'a CompressedInvertedIndex,
    scorer: Scorer<'a>,
}

impl<'a> QueryProcessor<'a> {
    pub fn new(
        tokenizer: &'a SearchTokenizer,
        lexicon: &'a Lexicon,
        document_table: &'a DocumentTable,
        inverted_index: &'a CompressedInvertedIndex,
    ) -> Self {
        Self {
            tokenizer,
            lexicon,
            inverted_index,
            scorer: Scorer::new(lexicon, document_table),
        }
    }

    /// Full pipeline: tokenize, evaluate, score, rank. Results come back in
    /// descending score order, at most `max_results` of them. An empty query
    /// yields no results; a query term missing from the index is simply an
    /// empty posting list, never an error.
    pub fn process_query(
        &self,
        query: &str,
        query_type: QueryType,
        method: ScoringMethod,
        max_results: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let terms = self.tokenizer.tokenize(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let scored = match query_type {
            QueryType::Conjunctive => self.execute_conjunctive(&terms, method)?,
            QueryType::Disjunctive => self.execute_disjunctive(&terms, method)?,
        };

        let mut top = TopK::new(max_results);
        for document in scored {
            top.push(document);
        }
        Ok(top.into_descending())
    }

    /// Document-at-a-time intersection. The rarest term drives the scan and
    /// the other lists are advanced with `next_geq`, so whole chunks of the
    /// longer lists are skipped. Candidates are scored as they survive.
    fn execute_conjunctive(
        &self,
        terms: &[String],
        method: ScoringMethod,
    ) -> Result<Vec<ScoredDocument>> {
        let mut ordered: Vec<&String> = terms.iter().collect();
        ordered.sort_by_key(|term| self.lexicon.document_frequency(term).unwrap_or(0));

        // the rarest term having no postings empties the whole conjunction
        let driver_term = ordered[0];
        let driver = self.inverted_index.decompress_all(driver_term)?;
        if driver.is_empty() {
            return Ok(Vec::new());
        }

        let mut others = Vec::with_capacity(ordered.len() - 1);
        for term in &ordered[1..] {
            match self.inverted_index.posting_list(term) {
                Some(list) => others.push((term.as_str(), list)),
                None => return Ok(Vec::new()),
            }
        }

        let mut results = Vec::new();
        'candidates: for posting in driver {
            let mut score =
                self.scorer
                    .score(method, driver_term, posting.doc_id, posting.term_frequency);
            for (term, list) in others.iter_mut() {
                match list.next_geq(posting.doc_id)? {
                    Some(found) if found.doc_id == posting.doc_id => {
                        score +=
                            self.scorer
                                .score(method, term, posting.doc_id, found.term_frequency);
                    }
                    Some(_) => continue 'candidates,
                    // this list is exhausted, no later candidate can match
                    None => break 'candidates,
                }
            }
            results.push(ScoredDocument {
                doc_id: posting.doc_id,
                score,
            });
        }
        Ok(results)
    }

    /// Union of the decoded lists; each candidate sums the scores of the
    /// terms that contain it.
    fn execute_disjunctive(
        &self,
        terms: &[String],
        method: ScoringMethod,
    ) -> Result<Vec<ScoredDocument>> {
        let mut scores: FxHashMap<u32, f32> = FxHashMap::default();
        for term in terms {
            for posting in self.inverted_index.decompress_all(term)? {
                *scores.entry(posting.doc_id).or_insert(0.0) +=
                    self.scorer
                        .score(method, term, posting.doc_id, posting.term_frequency);
            }
        }
        Ok(scores
            .into_iter()
            .map(|(doc_id, score)| ScoredDocument { doc_id, score })
            .collect())
    }
}
