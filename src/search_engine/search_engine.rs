use std::path::Path;

use tracing::info;

use crate::document_table::DocumentTable;
use crate::error::{EngineError, Result};
use crate::index::compressed_index::CompressedInvertedIndex;
use crate::lexicon::Lexicon;
use crate::query_parser::tokenizer::SearchTokenizer;
use crate::query_processor::query_processor::{QueryProcessor, QueryType};
use crate::query_processor::top_k::ScoredDocument;
use crate::scoring::scoring::ScoringMethod;
use crate::utils::paths;

/// Loads the index artifacts produced by a build and answers queries over
/// them. Everything is memory-resident and immutable after `load`, so one
/// engine can serve concurrent callers.
pub struct SearchEngine {
    tokenizer: SearchTokenizer,
    lexicon: Lexicon,
    document_table: DocumentTable,
    inverted_index: CompressedInvertedIndex,
}

impl SearchEngine {
    pub fn load(resources_dir: &Path) -> Result<Self> {
        Self::load_with_tokenizer(resources_dir, SearchTokenizer::new())
    }

    /// The tokenizer must match the one the index was built with.
    pub fn load_with_tokenizer(resources_dir: &Path, tokenizer: SearchTokenizer) -> Result<Self> {
        if !resources_dir.is_dir() {
            return Err(EngineError::InvalidArgument(format!(
                "resources directory {} does not exist",
                resources_dir.display()
            )));
        }

        let lexicon = Lexicon::load_from_file(&paths::lexicon_path(resources_dir))?;
        let document_table =
            DocumentTable::load_from_file(&paths::document_table_path(resources_dir))?;
        let inverted_index =
            CompressedInvertedIndex::load_from_file(&paths::inverted_index_path(resources_dir))?;
        info!(
            terms = lexicon.len(),
            documents = document_table.len(),
            "search engine loaded"
        );

        Ok(Self {
            tokenizer,
            lexicon,
            document_table,
            inverted_index,
        })
    }

    pub fn search(
        &self,
        query: &str,
        query_type: QueryType,
        method: ScoringMethod,
        max_results: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let processor = QueryProcessor::new(
            &self.tokenizer,
            &self.lexicon,
            &self.document_table,
            &self.inverted_index,
        );
        processor.process_query(query, query_type, method, max_results)
    }

    pub fn document_count(&self) -> usize {
        self.document_table.len()
    }

    pub fn term_count(&self) -> usize {
        self.lexicon.len()
    }
}
