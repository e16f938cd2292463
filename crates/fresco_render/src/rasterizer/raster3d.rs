use super::fill::{fill_lanes8, FillTriangle};
use super::target::SharedTarget;
use super::threads::RasterThreads;
use super::triangle::Triangle;
use super::{avx2, RasterAcceleration, Rasterizer};
use crate::pipeline::Pipeline;
use crate::DrawError;
use fresco_core::MemoryBlock;
use glam::UVec2;
use rayon::prelude::*;
use std::fmt;
use std::mem::size_of;
use tracing::{trace, warn};

/// Multithreaded triangle-list rasterizer.
///
/// Vertex shading runs once per record into a scratch block, then each
/// primitive is filled by one of at most `max_thread_count` workers.
#[derive(Clone)]
pub struct Rasterizer3D {
    mode: RasterAcceleration,
    fill: FillTriangle,
    threads: RasterThreads,
}

impl Rasterizer3D {
    pub fn new() -> Self {
        Self::with_threads(RasterThreads::new())
    }

    pub fn with_threads(threads: RasterThreads) -> Self {
        Self {
            mode: RasterAcceleration::Lanes8,
            fill: fill_lanes8,
            threads,
        }
    }

    pub fn threads(&self) -> &RasterThreads {
        &self.threads
    }

    /// Returns `false` and keeps the previous limit when `count` is zero.
    pub fn set_max_thread_count(&mut self, count: usize) -> bool {
        self.threads.set_max_thread_count(count)
    }
}

impl fmt::Debug for Rasterizer3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rasterizer3D")
            .field("mode", &self.mode)
            .field("threads", &self.threads)
            .finish()
    }
}

impl Default for Rasterizer3D {
    fn default() -> Self {
        Self::new()
    }
}

fn fill_for(mode: RasterAcceleration) -> Option<FillTriangle> {
    match mode {
        RasterAcceleration::Lanes8 => Some(fill_lanes8),
        #[cfg(target_arch = "x86_64")]
        RasterAcceleration::Avx2 if avx2::is_supported() => Some(avx2::fill_avx2),
        _ => None,
    }
}

fn check_attribute(offset: usize, size: usize, vertex_size: usize) -> Result<(), DrawError> {
    match offset.checked_add(size) {
        Some(end) if end <= vertex_size => Ok(()),
        _ => Err(DrawError::AttributeOutOfBounds {
            offset,
            size,
            vertex_size,
        }),
    }
}

impl Rasterizer for Rasterizer3D {
    fn acceleration_mode(&self) -> RasterAcceleration {
        self.mode
    }

    fn set_acceleration_mode(&mut self, mode: RasterAcceleration) -> bool {
        match fill_for(mode) {
            Some(fill) => {
                self.mode = mode;
                self.fill = fill;
                true
            }
            None => {
                warn!(?mode, current = ?self.mode, "acceleration mode unavailable");
                false
            }
        }
    }

    fn rasterize(
        &self,
        pipeline: &Pipeline,
        vertices: &[u8],
        stride: usize,
        target: &mut [u32],
        size: UVec2,
    ) -> Result<(), DrawError> {
        if stride == 0 || vertices.len() % stride != 0 {
            return Err(DrawError::StrideMismatch {
                len: vertices.len(),
                stride,
            });
        }
        let vertex_shader = pipeline
            .vertex_shader()
            .ok_or(DrawError::MissingVertexShader)?;
        // Colors come from the color attribute; the pixel shader only has to exist.
        pipeline.pixel_shader().ok_or(DrawError::MissingPixelShader)?;

        let vertex_size = vertex_shader.vertex_size();
        let position_offset = pipeline.position_offset();
        let color_offset = pipeline.color_offset();
        check_attribute(position_offset, size_of::<[f32; 3]>(), vertex_size)?;
        check_attribute(color_offset, size_of::<[f32; 4]>(), vertex_size)?;

        let required = size.x as usize * size.y as usize;
        if target.len() < required {
            return Err(DrawError::TargetTooSmall {
                len: target.len(),
                required,
            });
        }

        let count = vertices.len() / stride;
        let mut scratch = MemoryBlock::<u8>::new(count * vertex_size)?;
        scratch
            .as_mut_slice()?
            .par_chunks_mut(vertex_size)
            .zip(vertices.par_chunks(stride))
            .for_each(|(output, input)| vertex_shader.process(input, output));

        let primitives = count / 3;
        trace!(
            vertices = count,
            primitives,
            workers = self.threads.worker_count(primitives),
            mode = ?self.mode,
            "rasterize"
        );

        let records = scratch.as_slice();
        let primitive_size = 3 * vertex_size;
        let shared = SharedTarget::new(target, size);
        let fill = self.fill;
        self.threads.run(primitives, |i| {
            let start = i * primitive_size;
            let triangle = Triangle::assemble(
                &records[start..start + primitive_size],
                vertex_size,
                position_offset,
                color_offset,
                size,
            );
            if let Some(triangle) = triangle {
                fill(&triangle, &shared);
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{
        PassthroughVertexShader, PixelShader, PositionColor, VertexColorPixelShader, VertexShader,
    };
    use glam::{Vec3, Vec4};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
    const GREEN: Vec4 = Vec4::new(0.0, 1.0, 0.0, 1.0);
    const BLUE: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);

    fn pipeline(rasterizer: Rasterizer3D) -> Pipeline {
        Pipeline::with_offsets(
            rasterizer,
            Some(Arc::new(PassthroughVertexShader::of::<PositionColor>())),
            Some(Arc::new(VertexColorPixelShader::new(PositionColor::COLOR_OFFSET))),
            PositionColor::POSITION_OFFSET,
            PositionColor::COLOR_OFFSET,
        )
    }

    fn scenario() -> Vec<PositionColor> {
        vec![
            PositionColor::new(Vec3::new(0.25, 0.25, 1.0), RED),
            PositionColor::new(Vec3::new(0.75, 0.25, 1.0), GREEN),
            PositionColor::new(Vec3::new(0.75, 0.75, 1.0), BLUE),
        ]
    }

    fn draw(pipeline: &Pipeline, vertices: &[PositionColor], size: UVec2) -> Vec<u32> {
        let mut pixels = vec![0u32; (size.x * size.y) as usize];
        pipeline
            .rasterize(
                bytemuck::cast_slice(vertices),
                size_of::<PositionColor>(),
                &mut pixels,
                size,
            )
            .unwrap();
        pixels
    }

    fn channels(pixel: u32) -> [u32; 4] {
        [pixel & 0xFF, (pixel >> 8) & 0xFF, (pixel >> 16) & 0xFF, pixel >> 24]
    }

    #[test]
    fn blends_vertex_colors_inside_the_triangle() {
        let size = UVec2::new(100, 100);
        let pixels = draw(&pipeline(Rasterizer3D::new()), &scenario(), size);

        // Image (58, 41) lands on memory row 58 with weights 0.34, 0.34, 0.32.
        let [r, g, b, a] = channels(pixels[58 * 100 + 58]);
        assert_eq!((r, g, b), (86, 86, 81));
        assert!(a >= 254);

        // Image (62, 37), near the centroid.
        assert_ne!(pixels[62 * 100 + 62], 0);

        // Image (62, 62) sits on the first-to-last vertex edge, memory row 37.
        let [r, g, b, a] = channels(pixels[37 * 100 + 62]);
        assert_eq!((r, g, b), (66, 0, 188));
        assert!(a >= 254);

        // Above the diagonal is outside.
        assert_eq!(pixels[(99 - 70) * 100 + 30], 0);
    }

    #[test]
    fn writes_stay_inside_the_bounding_box() {
        let size = UVec2::new(100, 100);
        let pixels = draw(&pipeline(Rasterizer3D::new()), &scenario(), size);

        for y in 0..100usize {
            for x in 0..100usize {
                let pixel = pixels[(99 - y) * 100 + x];
                if !(25..=75).contains(&x) || !(25..=75).contains(&y) {
                    assert_eq!(pixel, 0, "({x}, {y}) is outside the box");
                }
            }
        }
        assert!(pixels.iter().any(|&p| p != 0));
    }

    #[test]
    fn off_screen_triangles_write_nothing() {
        let vertices = [
            PositionColor::new(Vec3::new(1.5, 1.5, 1.0), RED),
            PositionColor::new(Vec3::new(2.5, 1.5, 1.0), GREEN),
            PositionColor::new(Vec3::new(2.5, 2.5, 1.0), BLUE),
        ];
        let pixels = draw(&pipeline(Rasterizer3D::new()), &vertices, UVec2::new(32, 32));
        assert!(pixels.iter().all(|&p| p == 0));
    }

    #[test]
    fn trailing_partial_primitive_is_ignored() {
        let mut vertices = scenario();
        vertices.push(PositionColor::new(Vec3::new(0.1, 0.1, 1.0), RED));
        let size = UVec2::new(100, 100);
        let with_tail = draw(&pipeline(Rasterizer3D::new()), &vertices, size);
        let without = draw(&pipeline(Rasterizer3D::new()), &scenario(), size);
        assert_eq!(with_tail, without);
    }

    #[test]
    fn rejected_draws_leave_the_target_untouched() {
        let size = UVec2::new(16, 16);
        let vertices = scenario();
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        let stride = size_of::<PositionColor>();
        let mut pixels = vec![7u32; 256];

        let p = pipeline(Rasterizer3D::new());
        assert_eq!(
            p.rasterize(bytes, stride - 1, &mut pixels, size),
            Err(DrawError::StrideMismatch {
                len: bytes.len(),
                stride: stride - 1
            })
        );
        assert!(matches!(
            p.rasterize(bytes, 0, &mut pixels, size),
            Err(DrawError::StrideMismatch { .. })
        ));
        assert_eq!(
            p.rasterize(bytes, stride, &mut pixels[..100], size),
            Err(DrawError::TargetTooSmall {
                len: 100,
                required: 256
            })
        );

        let no_vs = Pipeline::new(
            Rasterizer3D::new(),
            None,
            Some(Arc::new(VertexColorPixelShader::new(12))),
        );
        assert_eq!(
            no_vs.rasterize(bytes, stride, &mut pixels, size),
            Err(DrawError::MissingVertexShader)
        );

        let no_ps = Pipeline::new(
            Rasterizer3D::new(),
            Some(Arc::new(PassthroughVertexShader::of::<PositionColor>())),
            None,
        );
        assert_eq!(
            no_ps.rasterize(bytes, stride, &mut pixels, size),
            Err(DrawError::MissingPixelShader)
        );

        let bad_offset = Pipeline::with_offsets(
            Rasterizer3D::new(),
            Some(Arc::new(PassthroughVertexShader::of::<PositionColor>())),
            Some(Arc::new(VertexColorPixelShader::new(20))),
            0,
            20,
        );
        assert_eq!(
            bad_offset.rasterize(bytes, stride, &mut pixels, size),
            Err(DrawError::AttributeOutOfBounds {
                offset: 20,
                size: 16,
                vertex_size: 28
            })
        );

        assert!(pixels.iter().all(|&p| p == 7));
    }

    struct CountingShader {
        calls: AtomicUsize,
        inner: PassthroughVertexShader,
    }

    impl VertexShader for CountingShader {
        fn vertex_size(&self) -> usize {
            self.inner.vertex_size()
        }

        fn process(&self, input: &[u8], output: &mut [u8]) {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.inner.process(input, output);
        }
    }

    struct Unused;

    impl PixelShader for Unused {
        fn process(&self, _vertex: &[u8]) -> Vec4 {
            Vec4::ZERO
        }
    }

    #[test]
    fn vertex_shader_runs_once_per_record() {
        let shader = Arc::new(CountingShader {
            calls: AtomicUsize::new(0),
            inner: PassthroughVertexShader::of::<PositionColor>(),
        });
        let p = Pipeline::with_offsets(
            Rasterizer3D::new(),
            Some(shader.clone()),
            Some(Arc::new(Unused)),
            PositionColor::POSITION_OFFSET,
            PositionColor::COLOR_OFFSET,
        );
        let mut vertices = scenario();
        vertices.extend(scenario());
        vertices.push(scenario()[0]);
        draw(&p, &vertices, UVec2::new(20, 20));
        assert_eq!(shader.calls.load(Ordering::Relaxed), 7);
    }

    #[test]
    fn worker_count_does_not_change_the_image() {
        let size = UVec2::new(64, 48);
        let mut vertices = Vec::new();
        for i in 0..12 {
            let dx = i as f32 * 0.06;
            vertices.extend([
                PositionColor::new(Vec3::new(0.05 + dx, 0.1, 1.0), RED),
                PositionColor::new(Vec3::new(0.2 + dx, 0.1, 1.0), GREEN),
                PositionColor::new(Vec3::new(0.1 + dx, 0.8, 1.0), BLUE),
            ]);
        }
        let single = draw(
            &pipeline(Rasterizer3D::with_threads(RasterThreads::with_max_threads(1))),
            &vertices[..3],
            size,
        );
        let many = draw(
            &pipeline(Rasterizer3D::with_threads(RasterThreads::with_max_threads(8))),
            &vertices[..3],
            size,
        );
        assert_eq!(single, many);

        // Disjoint triangles: any split produces the same pixels.
        let spaced: Vec<PositionColor> = vertices
            .chunks(3)
            .step_by(3)
            .flatten()
            .copied()
            .collect();
        let one = draw(
            &pipeline(Rasterizer3D::with_threads(RasterThreads::with_max_threads(1))),
            &spaced,
            size,
        );
        let four = draw(
            &pipeline(Rasterizer3D::with_threads(RasterThreads::with_max_threads(4))),
            &spaced,
            size,
        );
        assert_eq!(one, four);
    }

    #[test]
    fn unavailable_modes_keep_the_current_one() {
        let mut rasterizer = Rasterizer3D::new();
        assert_eq!(rasterizer.acceleration_mode(), RasterAcceleration::Lanes8);

        assert!(!rasterizer.set_acceleration_mode(RasterAcceleration::Avx512));
        assert_eq!(rasterizer.acceleration_mode(), RasterAcceleration::Lanes8);

        let avx2 = RasterAcceleration::Avx2.is_available();
        assert_eq!(rasterizer.set_acceleration_mode(RasterAcceleration::Avx2), avx2);
        let expected = if avx2 {
            RasterAcceleration::Avx2
        } else {
            RasterAcceleration::Lanes8
        };
        assert_eq!(rasterizer.acceleration_mode(), expected);

        assert!(rasterizer.set_acceleration_mode(RasterAcceleration::Lanes8));
        assert!(!rasterizer.set_max_thread_count(0));
        assert!(rasterizer.set_max_thread_count(2));
        assert_eq!(rasterizer.threads().max_thread_count(), 2);
    }

    #[test]
    fn avx2_draw_matches_portable_draw() {
        if !RasterAcceleration::Avx2.is_available() {
            return;
        }
        let mut accelerated = Rasterizer3D::new();
        assert!(accelerated.set_acceleration_mode(RasterAcceleration::Avx2));

        let size = UVec2::new(100, 100);
        let portable = draw(&pipeline(Rasterizer3D::new()), &scenario(), size);
        let simd = draw(&pipeline(accelerated), &scenario(), size);
        for (p, s) in portable.iter().zip(&simd) {
            assert_eq!(*p == 0, *s == 0);
            for (a, b) in channels(*p).into_iter().zip(channels(*s)) {
                assert!(a.abs_diff(b) <= 1);
            }
        }
    }
}
