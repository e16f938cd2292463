use bytemuck::Pod;
use glam::{UVec2, Vec2, Vec3, Vec4};
use std::mem::size_of;

/// Pixel-space bounding box, inclusive on both ends and inside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Bounds {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl Bounds {
    /// Integer box around `points` clamped to a `size` image, or `None` when
    /// the two do not overlap.
    pub fn clamped(points: &[Vec2; 3], size: UVec2) -> Option<Self> {
        if size.x == 0 || size.y == 0 {
            return None;
        }
        let min = points.iter().fold(Vec2::INFINITY, |acc, p| acc.min(*p)).floor();
        let max = points
            .iter()
            .fold(Vec2::NEG_INFINITY, |acc, p| acc.max(*p))
            .ceil();
        let limit = (size - UVec2::ONE).as_vec2();

        let lo = min.max(Vec2::ZERO);
        let hi = max.min(limit);
        if lo.x > hi.x || lo.y > hi.y {
            return None;
        }
        Some(Self {
            min_x: lo.x as usize,
            min_y: lo.y as usize,
            max_x: hi.x as usize,
            max_y: hi.y as usize,
        })
    }
}

/// One triangle projected to pixel space, ready to fill.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Triangle {
    pub points: [Vec2; 3],
    pub colors: [Vec4; 3],
    pub bounds: Bounds,
    /// Twice the signed area, positive for counter-clockwise points.
    pub area: f32,
}

impl Triangle {
    /// Build from three consecutive `vertex_size`-byte records.
    ///
    /// Positions are divided by their depth and scaled to `size`. Returns
    /// `None` for triangles that cannot produce a pixel: off-screen,
    /// degenerate, wound clockwise, or with non-finite coordinates.
    pub fn assemble(
        records: &[u8],
        vertex_size: usize,
        position_offset: usize,
        color_offset: usize,
        size: UVec2,
    ) -> Option<Self> {
        let extent = size.as_vec2();
        let mut points = [Vec2::ZERO; 3];
        let mut colors = [Vec4::ZERO; 3];

        for (i, record) in records.chunks_exact(vertex_size).take(3).enumerate() {
            let position = Vec3::from_array(read_attribute(record, position_offset));
            points[i] = (position / position.z).truncate() * extent;
            colors[i] = Vec4::from_array(read_attribute(record, color_offset));
        }

        if !points.iter().all(|p| p.is_finite()) {
            return None;
        }
        let area = edge(points[0], points[1], points[2]);
        if !(area > 0.0) {
            return None;
        }

        Some(Self {
            points,
            colors,
            bounds: Bounds::clamped(&points, size)?,
            area,
        })
    }
}

/// Signed area test: positive when `p` lies left of the directed line `a -> b`.
#[inline]
pub(crate) fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn read_attribute<A: Pod>(record: &[u8], offset: usize) -> A {
    bytemuck::pod_read_unaligned(&record[offset..offset + size_of::<A>()])
}
