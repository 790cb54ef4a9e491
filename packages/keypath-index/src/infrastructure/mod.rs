//! Infrastructure layer - Store adapters
//!
//! - `MemoryStore`: ordered in-memory adapter (tests, embedding)

pub mod memory;

pub use memory::MemoryStore;
