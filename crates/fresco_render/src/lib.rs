//! Fresco Render
//!
//! Software triangle rendering without a GPU:
//! - Shaders and the pipeline that bundles them with a rasterizer
//! - Multithreaded 8-lane rasterizer (portable or AVX2)
//! - Device and deferred command queue
//! - Multi-buffered swap chain with a background presentation thread
//! - Host window contract and a frame loop driver
//!
//! Pixels are packed `u32`, red in the least significant byte. Image row 0
//! is the bottom of the picture and the last row in memory.

pub mod command;
pub mod device;
pub mod error;
pub mod frame_loop;
pub mod pipeline;
pub mod rasterizer;
pub mod shader;
pub mod swap_chain;
pub mod window;

pub use command::{Command, CommandQueue};
pub use device::{vertex_buffer, Device, VertexBuffer};
pub use error::{DrawError, SwapChainError};
pub use frame_loop::FrameLoop;
pub use pipeline::Pipeline;
pub use rasterizer::{pack_color, RasterAcceleration, RasterThreads, Rasterizer, Rasterizer3D};
pub use shader::{
    PassthroughVertexShader, PixelShader, PositionColor, VertexColorPixelShader, VertexShader,
};
pub use swap_chain::{PresentSink, SwapChain};
pub use window::{HeadlessWindow, HostWindow, NativeHandle, WindowConfig, WindowEvent};

pub use glam;
