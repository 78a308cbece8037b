//! Core pipeline: session memory and the per-message engine

pub mod engine;
pub mod memory;

pub use engine::Engine;
pub use memory::{MemoryError, SessionMemory};
