pub mod builder;
pub mod compressed_index;
pub mod merger;
pub mod posting;
pub mod posting_list;
