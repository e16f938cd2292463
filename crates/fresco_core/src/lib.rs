//! Fresco Core
//!
//! Contains the engine's foundation:
//! - Large-buffer memory management (page-aligned blocks, read-only
//!   snapshots, resizable blocks)

pub mod memory;

pub use memory::{Access, DynamicMemory, MemoryBlock, MemoryError, ReadOnlyMemory};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
