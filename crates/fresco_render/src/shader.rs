//! Shader contracts
//!
//! Shaders are pluggable, pure units. The engine only fixes their shape:
//! a vertex shader maps one input record to one output record of a fixed
//! size, a pixel shader maps a transformed record to a color.

use glam::{Vec3, Vec4};
use std::mem::{offset_of, size_of};

/// Per-vertex transform.
///
/// `process` may be called any number of times per vertex and from any
/// worker thread, so it must be deterministic and side-effect free.
pub trait VertexShader: Send + Sync {
    /// Size in bytes of every transformed record.
    fn vertex_size(&self) -> usize;

    /// Transform `input` (one caller-stride record) into `output`, which is
    /// exactly [`vertex_size`](Self::vertex_size) bytes long.
    fn process(&self, input: &[u8], output: &mut [u8]);
}

/// Per-pixel color function over a transformed record.
pub trait PixelShader: Send + Sync {
    fn process(&self, vertex: &[u8]) -> Vec4;
}

/// Position + color vertex record.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PositionColor {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl PositionColor {
    pub const POSITION_OFFSET: usize = offset_of!(PositionColor, position);
    pub const COLOR_OFFSET: usize = offset_of!(PositionColor, color);

    pub fn new(position: Vec3, color: Vec4) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
        }
    }
}

/// Copies the input record through unchanged.
#[derive(Debug, Clone, Copy)]
pub struct PassthroughVertexShader {
    vertex_size: usize,
}

impl PassthroughVertexShader {
    pub fn new(vertex_size: usize) -> Self {
        Self { vertex_size }
    }

    /// Passthrough for `T`-sized records.
    pub fn of<T>() -> Self {
        Self::new(size_of::<T>())
    }
}

impl VertexShader for PassthroughVertexShader {
    fn vertex_size(&self) -> usize {
        self.vertex_size
    }

    fn process(&self, input: &[u8], output: &mut [u8]) {
        let n = input.len().min(output.len());
        output[..n].copy_from_slice(&input[..n]);
        output[n..].fill(0);
    }
}

/// Returns the color attribute stored in the transformed record.
#[derive(Debug, Clone, Copy)]
pub struct VertexColorPixelShader {
    color_offset: usize,
}

impl VertexColorPixelShader {
    pub fn new(color_offset: usize) -> Self {
        Self { color_offset }
    }
}

impl PixelShader for VertexColorPixelShader {
    fn process(&self, vertex: &[u8]) -> Vec4 {
        vertex
            .get(self.color_offset..self.color_offset + size_of::<[f32; 4]>())
            .map(|bytes| Vec4::from_array(bytemuck::pod_read_unaligned(bytes)))
            .unwrap_or(Vec4::ZERO)
    }
}
