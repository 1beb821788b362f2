//! Downstream processing and storage of reconstructed tables.
pub mod flux;
pub mod storage;
