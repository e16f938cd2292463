//! Fresco Runtime
//!
//! Renders the demo scene into a headless window for a fixed number of
//! frames. Usage: `fresco [settings.json]`

mod scene;

use anyhow::{Context, Result};
use fresco_render::{
    vertex_buffer, FrameLoop, HeadlessWindow, PassthroughVertexShader, Pipeline, PositionColor,
    RasterThreads, Rasterizer, Rasterizer3D, VertexColorPixelShader, WindowConfig,
};
use fresco_services::Settings;
use std::mem::size_of;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Fresco v{}", fresco_core::VERSION);

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(&path).with_context(|| format!("loading {path}"))?,
        None => Settings::default(),
    };
    tracing::debug!(?settings, "settings");

    let threads = match settings.raster.max_threads {
        Some(n) => RasterThreads::with_max_threads(n),
        None => RasterThreads::new(),
    };
    let mut rasterizer = Rasterizer3D::with_threads(threads);
    if !rasterizer.set_acceleration_mode(settings.raster.acceleration) {
        tracing::warn!(
            requested = ?settings.raster.acceleration,
            using = ?rasterizer.acceleration_mode(),
            "falling back to the portable fill"
        );
    }

    let pipeline = Arc::new(Pipeline::with_offsets(
        rasterizer,
        Some(Arc::new(PassthroughVertexShader::of::<PositionColor>())),
        Some(Arc::new(VertexColorPixelShader::new(PositionColor::COLOR_OFFSET))),
        PositionColor::POSITION_OFFSET,
        PositionColor::COLOR_OFFSET,
    ));

    let mut scene = scene::hello_world(settings.memory.alignment)?;
    let vertices = vertex_buffer(scene.occupied())?;
    scene.release();
    tracing::info!(vertices = vertices.len() / size_of::<PositionColor>(), "scene ready");

    let checksum = Arc::new(AtomicU64::new(0));
    let sink_checksum = Arc::clone(&checksum);
    let sink = move |pixels: &[u32]| {
        let sum = pixels.iter().fold(0u64, |acc, &p| acc.wrapping_add(u64::from(p)));
        sink_checksum.fetch_add(sum, Ordering::Relaxed);
    };

    let window = HeadlessWindow::new(
        WindowConfig {
            title: "Fresco".to_string(),
            width: settings.display.width,
            height: settings.display.height,
        },
        settings.frames,
    );
    let mut frame_loop = FrameLoop::new(window, settings.display.buffer_count, sink)?;
    frame_loop.set_clear_color(0xFF20_1810);

    let frames = frame_loop.run(|queue| {
        queue.set_pipeline(Arc::clone(&pipeline));
        queue.upload_vertex_buffer(Arc::clone(&vertices), size_of::<PositionColor>());
        queue.rasterize();
    })?;

    tracing::info!(
        frames,
        checksum = checksum.load(Ordering::Relaxed),
        "Runtime finished"
    );
    Ok(())
}
