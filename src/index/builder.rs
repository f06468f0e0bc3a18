use std::path::PathBuf;
use std::time::Instant;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::collection::loader::CollectionLoader;
use crate::document_table::DocumentTable;
use crate::error::{EngineError, Result};
use crate::index::compressed_index::{CompressedInvertedIndex, DEFAULT_CHUNK_SIZE};
use crate::index::merger;
use crate::lexicon::Lexicon;
use crate::query_parser::tokenizer::SearchTokenizer;
use crate::utils::memory::{
    MEMORY_USE_FRACTION, MAX_PROFILED_CHUNK_SIZE, MemoryProfile, MemoryProfiler,
    MemoryTrackingTools, PROFILE_SAMPLE_SIZE,
};
use crate::utils::paths;

pub struct IndexBuilderConfig {
    pub resources_dir: PathBuf,
    pub collection_path: PathBuf,
    /// Fixed documents-per-chunk; set to bypass the memory profiler.
    pub static_chunk_size: Option<usize>,
    /// Postings per compressed chunk (C).
    pub posting_chunk_size: usize,
    /// Hard cap on the profiled chunk size.
    pub max_profiled_chunk_size: usize,
    pub remove_stopwords: bool,
    pub stem: bool,
}

impl IndexBuilderConfig {
    pub fn new<P: Into<PathBuf>, C: Into<PathBuf>>(resources_dir: P, collection_path: C) -> Self {
        Self {
            resources_dir: resources_dir.into(),
            collection_path: collection_path.into(),
            static_chunk_size: None,
            posting_chunk_size: DEFAULT_CHUNK_SIZE,
            max_profiled_chunk_size: MAX_PROFILED_CHUNK_SIZE,
            remove_stopwords: true,
            stem: true,
        }
    }
}

/// Summary of a completed build, persisted as JSON next to the artifacts.
#[derive(Debug, Serialize)]
pub struct BuildStats {
    pub documents: usize,
    pub terms: usize,
    pub partial_indexes: usize,
    pub chunk_size: usize,
    pub elapsed_seconds: f64,
}

/// Drives the whole build: probe the collection, pick a chunk size, stream
/// chunks into partial indexes spilled to disk, merge them, persist the
/// final `{index, lexicon, document table}` triple, clean up the partials.
pub struct IndexBuilder {
    config: IndexBuilderConfig,
    loader: CollectionLoader,
    tokenizer: SearchTokenizer,
}

impl IndexBuilder {
    pub fn new(config: IndexBuilderConfig) -> Self {
        let loader = CollectionLoader::new(config.collection_path.clone());
        let tokenizer = SearchTokenizer::with_flags(config.remove_stopwords, config.stem);
        Self {
            config,
            loader,
            tokenizer,
        }
    }

    pub fn build_full_index(&self) -> Result<BuildStats> {
        let started = Instant::now();
        let total_docs = self.loader.total_docs()?;
        info!(total_docs, "starting full index build");

        let (initial_chunk_size, profile) = self.pick_chunk_size(total_docs)?;
        info!(chunk_size = initial_chunk_size, "chunk size selected");

        let mut document_table = DocumentTable::new();
        let mut lexicon = Lexicon::new();
        let mut memory = MemoryTrackingTools::new();
        let mut stream = self.loader.stream()?;
        let mut partial_paths: Vec<PathBuf> = Vec::new();
        let mut chunk_size = initial_chunk_size;

        loop {
            // re-check the guardrail before every pull: if available memory
            // shrank since profiling, the chunk shrinks with it
            if let Some(profile) = &profile {
                let budget = MEMORY_USE_FRACTION * memory.available_memory() as f64;
                let safe = (budget / profile.bytes_per_doc).floor() as usize;
                if safe == 0 {
                    return Err(EngineError::OutOfMemory(format!(
                        "available memory no longer fits any chunk at {:.0} bytes per document",
                        profile.bytes_per_doc
                    )));
                }
                if safe < chunk_size {
                    warn!(from = chunk_size, to = safe, "shrinking chunk under memory pressure");
                    chunk_size = safe;
                }
            }

            let Some(batch) = stream.next_chunk(chunk_size)? else {
                break;
            };

            let partial = self.process_chunk(&batch, &mut document_table, &mut lexicon)?;
            let path = paths::partial_index_path(&self.config.resources_dir, partial_paths.len());
            partial.write_to_file(&path)?;
            info!(
                partial = partial_paths.len(),
                documents = batch.len(),
                terms = partial.len(),
                "spilled partial index"
            );
            partial_paths.push(path);
        }

        let inverted_index = if partial_paths.is_empty() {
            CompressedInvertedIndex::with_chunk_size(self.config.posting_chunk_size)
        } else {
            info!(partials = partial_paths.len(), "merging partial indexes");
            merger::merge_many(&partial_paths)?
        };

        inverted_index.write_to_file(&paths::inverted_index_path(&self.config.resources_dir))?;
        lexicon.write_to_file(&paths::lexicon_path(&self.config.resources_dir))?;
        document_table.write_to_file(&paths::document_table_path(&self.config.resources_dir))?;
        for path in &partial_paths {
            std::fs::remove_file(path)?;
        }

        let stats = BuildStats {
            documents: document_table.len(),
            terms: lexicon.len(),
            partial_indexes: partial_paths.len(),
            chunk_size: initial_chunk_size,
            elapsed_seconds: started.elapsed().as_secs_f64(),
        };
        let stats_json = serde_json::to_string_pretty(&stats)?;
        std::fs::write(paths::build_stats_path(&self.config.resources_dir), stats_json)?;
        info!(
            documents = stats.documents,
            terms = stats.terms,
            elapsed_seconds = stats.elapsed_seconds,
            "index build complete"
        );
        Ok(stats)
    }

    fn pick_chunk_size(&self, total_docs: usize) -> Result<(usize, Option<MemoryProfile>)> {
        match self.config.static_chunk_size {
            Some(size) if size > 0 => Ok((size, None)),
            Some(_) => Err(EngineError::InvalidArgument(
                "static chunk size must be positive".to_string(),
            )),
            None if total_docs == 0 => Ok((self.config.max_profiled_chunk_size, None)),
            None => {
                let profile = self.profile_memory(total_docs)?;
                Ok((profile.estimated_chunk_size, Some(profile)))
            }
        }
    }

    /// Runs one representative mini-chunk through the full processing path
    /// and measures what it costs per document.
    fn profile_memory(&self, total_docs: usize) -> Result<MemoryProfile> {
        let sample_docs = PROFILE_SAMPLE_SIZE.min(total_docs);
        let mut profiler = MemoryProfiler::new(self.config.max_profiled_chunk_size);
        let batch = self.loader.sample(sample_docs)?;

        let profile = profiler.profile(sample_docs, || {
            let mut table = DocumentTable::new();
            let mut lexicon = Lexicon::new();
            self.process_chunk(&batch, &mut table, &mut lexicon)?;
            Ok(())
        })?;
        info!(
            bytes_per_doc = profile.bytes_per_doc,
            estimated_chunk_size = profile.estimated_chunk_size,
            "memory profile"
        );
        Ok(profile)
    }

    /// Tokenizes one batch and folds it into the document table, the lexicon
    /// and a fresh partial index. Doc ids arrive in collection order, so the
    /// per-term posting arrays come out ascending.
    fn process_chunk(
        &self,
        batch: &[(u32, String)],
        document_table: &mut DocumentTable,
        lexicon: &mut Lexicon,
    ) -> Result<CompressedInvertedIndex> {
        let mut chunk_postings: FxHashMap<String, (Vec<u32>, Vec<u32>)> = FxHashMap::default();

        for (doc_id, text) in batch {
            let tokens = self.tokenizer.tokenize(text);
            document_table.add_document(*doc_id, tokens.len() as u32);

            let mut term_frequencies: FxHashMap<String, u32> = FxHashMap::default();
            for token in tokens {
                *term_frequencies.entry(token).or_insert(0) += 1;
            }
            for (term, frequency) in term_frequencies {
                lexicon.add_term(&term, 1);
                let postings = chunk_postings.entry(term).or_default();
                postings.0.push(*doc_id);
                postings.1.push(frequency);
            }
        }

        let mut partial =
            CompressedInvertedIndex::with_chunk_size(self.config.posting_chunk_size);
        for (term, (doc_ids, frequencies)) in chunk_postings {
            partial.add_postings(&term, &doc_ids, &frequencies)?;
        }
        debug!(terms = partial.len(), documents = batch.len(), "chunk processed");
        Ok(partial)
    }
}
