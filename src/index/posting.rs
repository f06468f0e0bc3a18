/// One posting: a document and the term's frequency within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: u32,
    pub term_frequency: u32,
}

impl Posting {
    pub fn new(doc_id: u32, term_frequency: u32) -> Self {
        Self {
            doc_id,
            term_frequency,
        }
    }
}
