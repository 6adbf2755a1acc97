// src/cache/mod.rs
pub mod response;
pub mod source;

pub use response::{CacheStatus, ResponseCache};
pub use source::{matches_query, SourceCache};
