//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the durable store
//! - Plain in-process collections, for tests and throwaway runs

pub mod duckdb;
pub mod memory;

pub use self::duckdb::DuckDbRepository;
pub use self::memory::MemoryStore;
