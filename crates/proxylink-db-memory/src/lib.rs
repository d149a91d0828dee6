//! In-memory resource store backend.
//!
//! Exists so the controller, its tests, and the bundled server have a
//! complete store collaborator without any external dependency.

pub mod storage;

pub use storage::MemoryStore;
