//! Frame loop driver
//!
//! Ties a host window to a device and swap chain: each frame polls window
//! events, reallocates the swap chain on resize, clears the back buffer,
//! records and executes a command queue, and presents.

use crate::command::CommandQueue;
use crate::device::Device;
use crate::error::SwapChainError;
use crate::swap_chain::{PresentSink, SwapChain};
use crate::window::{HostWindow, WindowEvent};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Interval between frame-rate log lines.
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

pub struct FrameLoop<W: HostWindow> {
    window: W,
    device: Device,
    swap_chain: SwapChain,
    queue: CommandQueue,
    clear_color: u32,
    frames: u64,
}

impl<W: HostWindow> FrameLoop<W> {
    /// Create a swap chain sized to `window` and attach it to a fresh device.
    pub fn new(
        mut window: W,
        buffer_count: usize,
        sink: impl PresentSink,
    ) -> Result<Self, SwapChainError> {
        let swap_chain = SwapChain::new(window.size(), buffer_count, sink)?;
        let mut device = Device::new();
        device.set_swap_chain(&swap_chain);
        let queue = device.create_command_queue();
        window.show();
        Ok(Self {
            window,
            device,
            swap_chain,
            queue,
            clear_color: 0,
            frames: 0,
        })
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn swap_chain(&self) -> &SwapChain {
        &self.swap_chain
    }

    /// Packed color every back buffer is cleared to before drawing.
    pub fn set_clear_color(&mut self, color: u32) {
        self.clear_color = color;
    }

    /// Frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one frame. Returns `false`, without drawing, once the window
    /// asks to close.
    pub fn frame(&mut self, record: impl FnOnce(&mut CommandQueue)) -> Result<bool, SwapChainError> {
        if !self.window.exists() {
            return Ok(false);
        }
        for event in self.window.poll_events() {
            match event {
                WindowEvent::Resized(size) => {
                    debug!(width = size.x, height = size.y, "window resized");
                    self.swap_chain.resize(size)?;
                }
                WindowEvent::CloseRequested => return Ok(false),
            }
        }

        self.swap_chain.clear(self.clear_color)?;
        record(&mut self.queue);
        self.queue.execute(&mut self.device);
        self.swap_chain.present()?;
        self.frames += 1;
        Ok(true)
    }

    /// Run frames until the window closes, logging the frame rate once per
    /// second. Returns the number of frames presented.
    pub fn run(&mut self, mut record: impl FnMut(&mut CommandQueue)) -> Result<u64, SwapChainError> {
        let start = self.frames;
        let mut last_report = Instant::now();
        let mut since_report = 0u64;

        while self.frame(&mut record)? {
            since_report += 1;
            let elapsed = last_report.elapsed();
            if elapsed >= REPORT_INTERVAL {
                let fps = since_report as f64 / elapsed.as_secs_f64();
                info!(fps, frames = self.frames, "frame rate");
                last_report = Instant::now();
                since_report = 0;
            }
        }

        self.window.hide();
        Ok(self.frames - start)
    }
}
