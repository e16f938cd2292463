//! Rendering device
//!
//! The device holds the state commands act on: the active pipeline, the
//! active vertex buffer and the swap chain it draws into.

use crate::command::CommandQueue;
use crate::pipeline::Pipeline;
use crate::swap_chain::{BackBuffers, SwapChain};
use crate::DrawError;
use bytemuck::Pod;
use fresco_core::{MemoryError, ReadOnlyMemory};
use std::sync::Arc;
use tracing::{trace, warn};

/// Vertex data frozen at upload time.
pub type VertexBuffer = Arc<ReadOnlyMemory<u8>>;

/// Snapshot `vertices` into a read-only block.
pub fn vertex_buffer<T: Pod>(vertices: &[T]) -> Result<VertexBuffer, MemoryError> {
    Ok(Arc::new(ReadOnlyMemory::from_bytes(bytemuck::cast_slice(
        vertices,
    ))?))
}

#[derive(Default)]
pub struct Device {
    pipeline: Option<Arc<Pipeline>>,
    vertex_buffer: Option<VertexBuffer>,
    vertex_stride: usize,
    back_buffers: Option<BackBuffers>,
}

impl Device {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw into `swap_chain`'s back buffers from now on.
    pub fn set_swap_chain(&mut self, swap_chain: &SwapChain) {
        self.back_buffers = Some(swap_chain.back_buffers());
    }

    pub fn create_command_queue(&self) -> CommandQueue {
        CommandQueue::new()
    }

    pub fn pipeline(&self) -> Option<&Arc<Pipeline>> {
        self.pipeline.as_ref()
    }

    pub fn vertex_stride(&self) -> usize {
        self.vertex_stride
    }

    pub fn set_pipeline(&mut self, pipeline: Arc<Pipeline>) {
        self.pipeline = Some(pipeline);
    }

    pub fn upload_vertex_buffer(&mut self, buffer: VertexBuffer, stride: usize) {
        trace!(bytes = buffer.size(), stride, "vertex buffer uploaded");
        self.vertex_buffer = Some(buffer);
        self.vertex_stride = stride;
    }

    /// Draw the active vertex buffer with the active pipeline into the
    /// current back buffer. Returns `false`, writing nothing, when the draw
    /// is rejected.
    pub fn rasterize(&mut self) -> bool {
        match self.try_rasterize() {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "rasterize rejected");
                false
            }
        }
    }

    fn try_rasterize(&self) -> Result<(), DrawError> {
        let back_buffers = self.back_buffers.as_ref().ok_or(DrawError::NoSwapChain)?;
        let pipeline = self.pipeline.as_ref().ok_or(DrawError::NoPipeline)?;
        let vertices = self
            .vertex_buffer
            .as_ref()
            .ok_or(DrawError::NoVertexBuffer)?;
        back_buffers.draw(|target, size| {
            pipeline.rasterize(vertices.as_bytes(), self.vertex_stride, target, size)
        })
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("pipeline", &self.pipeline)
            .field("vertex_bytes", &self.vertex_buffer.as_ref().map(|b| b.size()))
            .field("vertex_stride", &self.vertex_stride)
            .field("has_swap_chain", &self.back_buffers.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::Rasterizer3D;
    use crate::shader::{PassthroughVertexShader, PositionColor, VertexColorPixelShader};
    use glam::{UVec2, Vec3, Vec4};
    use std::mem::size_of;

    fn pipeline() -> Arc<Pipeline> {
        Arc::new(Pipeline::with_offsets(
            Rasterizer3D::new(),
            Some(Arc::new(PassthroughVertexShader::of::<PositionColor>())),
            Some(Arc::new(VertexColorPixelShader::new(PositionColor::COLOR_OFFSET))),
            PositionColor::POSITION_OFFSET,
            PositionColor::COLOR_OFFSET,
        ))
    }

    fn triangle() -> VertexBuffer {
        vertex_buffer(&[
            PositionColor::new(Vec3::new(0.1, 0.1, 1.0), Vec4::ONE),
            PositionColor::new(Vec3::new(0.9, 0.1, 1.0), Vec4::ONE),
            PositionColor::new(Vec3::new(0.1, 0.9, 1.0), Vec4::ONE),
        ])
        .unwrap()
    }

    fn swap_chain() -> SwapChain {
        SwapChain::new(UVec2::new(32, 32), 2, |_: &[u32]| {}).unwrap()
    }

    #[test]
    fn rasterize_needs_every_input() {
        let chain = swap_chain();
        let mut device = Device::new();
        assert_eq!(device.try_rasterize(), Err(DrawError::NoSwapChain));

        device.set_swap_chain(&chain);
        assert_eq!(device.try_rasterize(), Err(DrawError::NoPipeline));

        device.set_pipeline(pipeline());
        assert_eq!(device.try_rasterize(), Err(DrawError::NoVertexBuffer));
        assert!(!device.rasterize());

        device.upload_vertex_buffer(triangle(), size_of::<PositionColor>());
        assert!(device.rasterize());
        assert!(chain.back_buffer().iter().any(|&p| p != 0));
    }

    #[test]
    fn rejected_draw_writes_nothing() {
        let chain = swap_chain();
        let mut device = Device::new();
        device.set_swap_chain(&chain);
        device.set_pipeline(pipeline());
        device.upload_vertex_buffer(triangle(), 5);

        assert!(!device.rasterize());
        assert!(chain.back_buffer().iter().all(|&p| p == 0));
    }

    #[test]
    fn disposed_swap_chain_is_rejected() {
        let mut chain = swap_chain();
        let mut device = Device::new();
        device.set_swap_chain(&chain);
        device.set_pipeline(pipeline());
        device.upload_vertex_buffer(triangle(), size_of::<PositionColor>());

        chain.dispose();
        assert_eq!(device.try_rasterize(), Err(DrawError::SwapChainDisposed));
    }

    #[test]
    fn uploaded_buffer_is_a_snapshot() {
        let mut vertices = vec![PositionColor::default(); 3];
        let buffer = vertex_buffer(&vertices).unwrap();
        vertices[0].position = [1.0, 2.0, 3.0];
        assert_eq!(buffer.size(), 3 * size_of::<PositionColor>());
        assert!(buffer.as_bytes().iter().all(|&b| b == 0));
    }
}
