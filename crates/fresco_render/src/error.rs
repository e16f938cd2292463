use fresco_core::MemoryError;
use thiserror::Error;

/// Reasons a draw is rejected. A rejected draw never touches the color buffer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DrawError {
    #[error("no swap chain is attached to the device")]
    NoSwapChain,

    #[error("no pipeline is set on the device")]
    NoPipeline,

    #[error("no vertex buffer has been uploaded")]
    NoVertexBuffer,

    #[error("the pipeline has no vertex shader")]
    MissingVertexShader,

    #[error("the pipeline has no pixel shader")]
    MissingPixelShader,

    #[error("vertex stride {stride} does not divide a buffer of {len} bytes")]
    StrideMismatch { len: usize, stride: usize },

    #[error("attribute at offset {offset} ({size} bytes) exceeds the {vertex_size}-byte vertex")]
    AttributeOutOfBounds {
        offset: usize,
        size: usize,
        vertex_size: usize,
    },

    #[error("color buffer holds {len} pixels but the image needs {required}")]
    TargetTooSmall { len: usize, required: usize },

    #[error("the swap chain has been disposed")]
    SwapChainDisposed,

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Errors raised by the swap chain.
#[derive(Debug, Error)]
pub enum SwapChainError {
    #[error("a swap chain needs at least one back buffer")]
    InvalidBufferCount,

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("failed to spawn the presentation thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("the presentation thread has stopped")]
    PresenterStopped,

    #[error("the swap chain has been disposed")]
    Disposed,
}
