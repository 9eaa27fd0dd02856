//! Infrastructure layer - Checkpoint store adapters

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "memory")]
pub use memory::InMemoryCheckpointStore;
