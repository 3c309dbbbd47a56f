//! Query structuring and search enhancement

pub mod structurer;

pub use structurer::{enhance_search_query, parse_query_structure, Gender, StructuredQuery};
