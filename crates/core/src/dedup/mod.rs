//! Exact-match duplicate detection against persisted records.

mod fingerprint;
mod index;

pub use fingerprint::record_fingerprint;
pub use index::DuplicateIndex;
