//! Large-buffer memory management
//!
//! Page-aligned byte arenas exposed through typed, bounds-checked views:
//! - [`MemoryBlock`] - fixed-size read-write block
//! - [`ReadOnlyMemory`] - snapshot that forbids writes
//! - [`DynamicMemory`] - resizable block that grows and shrinks in alignment units

mod block;
mod dynamic;
mod raw;
mod read_only;

pub use block::MemoryBlock;
pub use dynamic::DynamicMemory;
pub use read_only::ReadOnlyMemory;

use thiserror::Error;

/// Allocation granularity commonly found on Windows devices (64 KiB).
///
/// Other systems usually use a smaller power of two such as 4 KiB, so this
/// is a safe default quantum for resizable blocks everywhere.
pub const PAGE_GRANULARITY: usize = 64 * 1024;

/// Base address alignment of every block.
pub const BLOCK_ALIGN: usize = 4096;

/// Access mode a block was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    ReadWrite,
    ReadOnly,
}

/// Errors raised by memory blocks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("index {index} is out of range for a block of {len} elements")]
    OutOfRange { index: usize, len: usize },

    #[error("the collection is empty")]
    EmptyCollection,

    #[error("the block is read-only")]
    ReadOnly,

    #[error("alignment quantum must be non-zero")]
    InvalidAlignment,

    #[error("zero-sized element types cannot be stored")]
    ZeroSizedElement,

    #[error("failed to allocate {size} bytes of backing memory")]
    ResourceCreation { size: usize },
}

#[inline]
pub(crate) fn round_up(size: usize, alignment: usize) -> usize {
    size.div_ceil(alignment) * alignment
}
