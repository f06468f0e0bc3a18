use sysinfo::System;
use tracing::debug;

use crate::error::{EngineError, Result};

/// Share of memory the build is allowed to occupy; the rest is headroom for
/// the allocator and the OS.
pub const MEMORY_USE_FRACTION: f64 = 0.8;

/// Documents fed to the profiling mini-chunk (or the whole collection when
/// smaller).
pub const PROFILE_SAMPLE_SIZE: usize = 10_000;

/// Hard cap on the profiled chunk size. The first run tends to underestimate
/// per-document overhead, so the estimate is never trusted past this.
pub const MAX_PROFILED_CHUNK_SIZE: usize = 1_000_000;

pub struct MemoryTrackingTools {
    system: System,
}

impl Default for MemoryTrackingTools {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTrackingTools {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    pub fn available_memory(&mut self) -> u64 {
        self.system.refresh_memory();
        self.system.available_memory()
    }

    pub fn total_memory(&mut self) -> u64 {
        self.system.refresh_memory();
        self.system.total_memory()
    }
}

/// Outcome of profiling one representative mini-chunk.
#[derive(Debug, Clone, Copy)]
pub struct MemoryProfile {
    pub bytes_per_doc: f64,
    pub estimated_chunk_size: usize,
}

pub struct MemoryProfiler {
    tools: MemoryTrackingTools,
    chunk_size_cap: usize,
}

impl MemoryProfiler {
    pub fn new(chunk_size_cap: usize) -> Self {
        Self {
            tools: MemoryTrackingTools::new(),
            chunk_size_cap,
        }
    }

    /// Measures how much available memory `process_sample` consumes for
    /// `sample_docs` documents and derives the largest chunk size that keeps
    /// the build inside [`MEMORY_USE_FRACTION`] of total memory.
    pub fn profile<F>(&mut self, sample_docs: usize, mut process_sample: F) -> Result<MemoryProfile>
    where
        F: FnMut() -> Result<()>,
    {
        if sample_docs == 0 {
            return Err(EngineError::InvalidArgument(
                "cannot profile an empty sample".to_string(),
            ));
        }

        let before = self.tools.available_memory();
        process_sample()?;
        let after = self.tools.available_memory();

        // a noisy sample can report no growth at all; fall back to one byte
        // per document and let the cap bound the result
        let consumed = before.saturating_sub(after);
        let bytes_per_doc = (consumed as f64 / sample_docs as f64).max(1.0);

        let total = self.tools.total_memory() as f64;
        let estimated = ((MEMORY_USE_FRACTION * total) / bytes_per_doc).floor() as usize;
        let estimated_chunk_size = estimated.min(self.chunk_size_cap);
        debug!(
            consumed,
            bytes_per_doc, estimated_chunk_size, "memory profile complete"
        );

        if estimated_chunk_size == 0 {
            return Err(EngineError::OutOfMemory(format!(
                "no safe chunk size: {bytes_per_doc:.0} bytes per document against {total:.0} total bytes"
            )));
        }
        Ok(MemoryProfile {
            bytes_per_doc,
            estimated_chunk_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_is_capped() {
        let mut profiler = MemoryProfiler::new(100);
        let profile = profiler.profile(10, || Ok(())).unwrap();

        assert!(profile.bytes_per_doc >= 1.0);
        assert!(profile.estimated_chunk_size <= 100);
        assert!(profile.estimated_chunk_size > 0);
    }

    #[test]
    fn test_empty_sample_rejected() {
        let mut profiler = MemoryProfiler::new(100);
        let result = profiler.profile(0, || Ok(()));
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn test_profile_propagates_sample_errors() {
        let mut profiler = MemoryProfiler::new(100);
        let result = profiler.profile(10, || {
            Err(EngineError::InvalidArgument("boom".to_string()))
        });
        assert!(result.is_err());
    }
}
