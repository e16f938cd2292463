//! Demo scene: a grid of colored quads.

use fresco_core::{DynamicMemory, MemoryError};
use fresco_render::PositionColor;
use glam::{Vec3, Vec4};

pub const COLUMNS: usize = 5;
pub const ROWS: usize = 4;

/// Vertices per quad (two triangles).
pub const QUAD_VERTICES: usize = 6;

/// Build `COLUMNS * ROWS` quads, each shaded from a different corner color.
///
/// Vertices accumulate in a resizable block growing by `alignment` bytes.
pub fn hello_world(alignment: usize) -> Result<DynamicMemory<PositionColor>, MemoryError> {
    let mut vertices = DynamicMemory::with_alignment(0, alignment)?;
    let cell_w = 1.0 / COLUMNS as f32;
    let cell_h = 1.0 / ROWS as f32;

    for row in 0..ROWS {
        for col in 0..COLUMNS {
            let x0 = col as f32 * cell_w + cell_w * 0.1;
            let y0 = row as f32 * cell_h + cell_h * 0.1;
            let x1 = x0 + cell_w * 0.8;
            let y1 = y0 + cell_h * 0.8;
            let tint = (row * COLUMNS + col) as f32 / (ROWS * COLUMNS) as f32;

            let bl = PositionColor::new(Vec3::new(x0, y0, 1.0), Vec4::new(1.0, tint, 0.0, 1.0));
            let br = PositionColor::new(Vec3::new(x1, y0, 1.0), Vec4::new(0.0, 1.0, tint, 1.0));
            let tr = PositionColor::new(Vec3::new(x1, y1, 1.0), Vec4::new(tint, 0.0, 1.0, 1.0));
            let tl = PositionColor::new(Vec3::new(x0, y1, 1.0), Vec4::new(1.0, 1.0, 1.0, 1.0));

            for vertex in [bl, br, tr, bl, tr, tl] {
                vertices.append(vertex)?;
            }
        }
    }
    Ok(vertices)
}
