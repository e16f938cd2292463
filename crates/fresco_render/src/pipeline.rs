//! Pipeline descriptor

use crate::rasterizer::Rasterizer;
use crate::shader::{PixelShader, VertexShader};
use crate::DrawError;
use glam::UVec2;
use std::fmt;
use std::sync::Arc;

/// Immutable bundle of rasterizer, shaders and vertex attribute offsets.
///
/// The pipeline owns its rasterizer and hands itself to it on every draw,
/// which is how the rasterizer reaches the shaders and attribute offsets.
/// Shaders are optional so an incomplete pipeline can still be built; it is
/// rejected when drawn.
pub struct Pipeline {
    rasterizer: Box<dyn Rasterizer>,
    vertex_shader: Option<Arc<dyn VertexShader>>,
    pixel_shader: Option<Arc<dyn PixelShader>>,
    position_offset: usize,
    color_offset: usize,
}

impl Pipeline {
    /// Pipeline with both attribute offsets at zero.
    pub fn new(
        rasterizer: impl Rasterizer + 'static,
        vertex_shader: Option<Arc<dyn VertexShader>>,
        pixel_shader: Option<Arc<dyn PixelShader>>,
    ) -> Self {
        Self::with_offsets(rasterizer, vertex_shader, pixel_shader, 0, 0)
    }

    /// Pipeline reading position and color at the given byte offsets of the
    /// transformed vertex.
    pub fn with_offsets(
        rasterizer: impl Rasterizer + 'static,
        vertex_shader: Option<Arc<dyn VertexShader>>,
        pixel_shader: Option<Arc<dyn PixelShader>>,
        position_offset: usize,
        color_offset: usize,
    ) -> Self {
        Self {
            rasterizer: Box::new(rasterizer),
            vertex_shader,
            pixel_shader,
            position_offset,
            color_offset,
        }
    }

    pub fn rasterizer(&self) -> &dyn Rasterizer {
        self.rasterizer.as_ref()
    }

    pub fn vertex_shader(&self) -> Option<&dyn VertexShader> {
        self.vertex_shader.as_deref()
    }

    pub fn pixel_shader(&self) -> Option<&dyn PixelShader> {
        self.pixel_shader.as_deref()
    }

    #[inline]
    pub fn position_offset(&self) -> usize {
        self.position_offset
    }

    #[inline]
    pub fn color_offset(&self) -> usize {
        self.color_offset
    }

    /// Draw `vertices` (a triangle list of `stride`-byte records) into `target`.
    pub fn rasterize(
        &self,
        vertices: &[u8],
        stride: usize,
        target: &mut [u32],
        size: UVec2,
    ) -> Result<(), DrawError> {
        self.rasterizer
            .rasterize(self, vertices, stride, target, size)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("has_vertex_shader", &self.vertex_shader.is_some())
            .field("has_pixel_shader", &self.pixel_shader.is_some())
            .field("position_offset", &self.position_offset)
            .field("color_offset", &self.color_offset)
            .finish()
    }
}
