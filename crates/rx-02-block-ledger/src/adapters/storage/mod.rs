//! Storage Adapters
//!
//! Implementations of the `KeyValueStore` trait.

mod file;
mod memory;

pub use file::FileKVStore;
pub use memory::InMemoryKVStore;
