use std::path::{Path, PathBuf};

pub fn inverted_index_path<P: AsRef<Path>>(resources: P) -> PathBuf {
    resources.as_ref().join("inverted_index.bin")
}

pub fn lexicon_path<P: AsRef<Path>>(resources: P) -> PathBuf {
    resources.as_ref().join("lexicon.txt")
}

pub fn document_table_path<P: AsRef<Path>>(resources: P) -> PathBuf {
    resources.as_ref().join("document_table.txt")
}

pub fn partial_index_path<P: AsRef<Path>>(resources: P, partial: usize) -> PathBuf {
    resources.as_ref().join(format!("partial_{partial}.bin"))
}

pub fn build_stats_path<P: AsRef<Path>>(resources: P) -> PathBuf {
    resources.as_ref().join("build_stats.json")
}
