//! Triangle rasterization
//!
//! A [`Rasterizer`] turns a triangle list into pixels. [`Rasterizer3D`] runs
//! the vertex shader into a scratch buffer, then fills one triangle per
//! primitive on the worker pool, testing 8 pixels at a time.

mod avx2;
mod fill;
mod raster3d;
mod target;
mod threads;
mod triangle;

pub use fill::pack_color;
pub use raster3d::Rasterizer3D;
pub use threads::{split_ranges, RasterThreads};

use crate::pipeline::Pipeline;
use crate::DrawError;
use glam::UVec2;
use serde::{Deserialize, Serialize};

/// Fill strategy used for the inner pixel loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterAcceleration {
    /// Portable 8-lane path, available everywhere.
    #[default]
    Lanes8,
    /// 8-lane AVX2 intrinsics on x86-64 CPUs that report AVX2.
    Avx2,
    /// 16-lane AVX-512. Recognized, but there is no fill routine for it yet.
    Avx512,
}

impl RasterAcceleration {
    /// Whether this machine can run the mode's fill routine.
    pub fn is_available(self) -> bool {
        match self {
            RasterAcceleration::Lanes8 => true,
            RasterAcceleration::Avx2 => avx2::is_supported(),
            RasterAcceleration::Avx512 => false,
        }
    }
}

/// Rasterization strategy owned by a [`Pipeline`].
pub trait Rasterizer: Send + Sync {
    /// Currently selected fill strategy.
    fn acceleration_mode(&self) -> RasterAcceleration;

    /// Switch the fill strategy. Returns `false` and keeps the current
    /// strategy when `mode` is unavailable.
    fn set_acceleration_mode(&mut self, mode: RasterAcceleration) -> bool;

    /// Draw a triangle list of `stride`-byte records into `target`, an image
    /// of `size` pixels stored top row first.
    ///
    /// On error nothing has been written to `target`.
    fn rasterize(
        &self,
        pipeline: &Pipeline,
        vertices: &[u8],
        stride: usize,
        target: &mut [u32],
        size: UVec2,
    ) -> Result<(), DrawError>;
}
