//! Multi-buffered swap chain
//!
//! Each cycle has two phases. While rendering, the caller owns the current
//! back buffer. `present` hands that buffer to the presentation thread,
//! blocks until the sink is done with it, and then advances to the next
//! buffer. The two sides rendezvous on one mutex and two condition variables.

use crate::error::{DrawError, SwapChainError};
use fresco_core::MemoryBlock;
use glam::UVec2;
use std::mem::size_of;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often the presentation thread checks for cancellation.
const CANCEL_POLL: Duration = Duration::from_secs(1);

/// How often `present` checks that the presentation thread is still alive.
const ACK_POLL: Duration = Duration::from_millis(100);

/// Final destination of a presented image.
///
/// Called from the presentation thread, once per [`SwapChain::present`],
/// with the whole back buffer (top row first).
pub trait PresentSink: Send + 'static {
    fn present(&mut self, pixels: &[u32]);
}

impl<F> PresentSink for F
where
    F: FnMut(&[u32]) + Send + 'static,
{
    fn present(&mut self, pixels: &[u32]) {
        self(pixels)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Rendering,
    PresentRequested,
    Presented,
}

struct Frames {
    buffers: Vec<MemoryBlock<u32>>,
    index: usize,
    size: UVec2,
    phase: Phase,
}

impl Frames {
    fn allocate(count: usize, size: UVec2) -> Result<Vec<MemoryBlock<u32>>, SwapChainError> {
        let pixels = size.x as usize * size.y as usize;
        (0..count)
            .map(|_| MemoryBlock::with_len(pixels).map_err(SwapChainError::from))
            .collect()
    }

    fn release(&mut self) {
        for buffer in &mut self.buffers {
            buffer.release();
        }
        self.buffers.clear();
    }
}

struct Shared {
    frames: Mutex<Frames>,
    request: Condvar,
    ack: Condvar,
    cancelled: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Frames> {
        // A sink that panicked leaves the frames intact; keep using them.
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Access to the current back buffer for drawing, held by the device.
#[derive(Clone)]
pub(crate) struct BackBuffers(Arc<Shared>);

impl BackBuffers {
    /// Run `draw` against the current back buffer and its image size.
    pub fn draw<R>(
        &self,
        draw: impl FnOnce(&mut [u32], UVec2) -> Result<R, DrawError>,
    ) -> Result<R, DrawError> {
        if self.0.cancelled.load(Ordering::Acquire) {
            return Err(DrawError::SwapChainDisposed);
        }
        let mut frames = self.0.lock();
        let size = frames.size;
        let index = frames.index;
        let buffer = frames
            .buffers
            .get_mut(index)
            .ok_or(DrawError::SwapChainDisposed)?;
        draw(buffer.as_mut_slice()?, size)
    }
}

/// N back buffers of packed pixels and the thread that presents them.
pub struct SwapChain {
    shared: Arc<Shared>,
    presenter: Option<JoinHandle<()>>,
    buffer_count: usize,
}

impl SwapChain {
    /// Allocate `buffer_count` zeroed buffers of `size` pixels and start the
    /// presentation thread.
    pub fn new(
        size: UVec2,
        buffer_count: usize,
        sink: impl PresentSink,
    ) -> Result<Self, SwapChainError> {
        if buffer_count == 0 {
            return Err(SwapChainError::InvalidBufferCount);
        }
        let shared = Arc::new(Shared {
            frames: Mutex::new(Frames {
                buffers: Frames::allocate(buffer_count, size)?,
                index: 0,
                size,
                phase: Phase::Rendering,
            }),
            request: Condvar::new(),
            ack: Condvar::new(),
            cancelled: AtomicBool::new(false),
        });

        let presenter = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("fresco-present".into())
                .spawn(move || run_presenter(&shared, sink))?
        };

        info!(width = size.x, height = size.y, buffer_count, "swap chain created");
        Ok(Self {
            shared,
            presenter: Some(presenter),
            buffer_count,
        })
    }

    /// Present the current back buffer and advance to the next one.
    ///
    /// Blocks until the sink has returned.
    pub fn present(&mut self) -> Result<(), SwapChainError> {
        let Some(presenter) = self.presenter.as_ref() else {
            return Err(SwapChainError::Disposed);
        };

        let mut frames = self.shared.lock();
        frames.phase = Phase::PresentRequested;
        self.shared.request.notify_one();

        while frames.phase != Phase::Presented {
            if presenter.is_finished() {
                frames.phase = Phase::Rendering;
                return Err(SwapChainError::PresenterStopped);
            }
            frames = self
                .shared
                .ack
                .wait_timeout(frames, ACK_POLL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        frames.phase = Phase::Rendering;
        frames.index = (frames.index + 1) % self.buffer_count;
        Ok(())
    }

    /// Reallocate every buffer at `size`. Contents are zeroed and drawing
    /// restarts at the first buffer.
    pub fn resize(&mut self, size: UVec2) -> Result<(), SwapChainError> {
        if self.presenter.is_none() {
            return Err(SwapChainError::Disposed);
        }
        let buffers = Frames::allocate(self.buffer_count, size)?;
        let mut frames = self.shared.lock();
        frames.release();
        frames.buffers = buffers;
        frames.size = size;
        frames.index = 0;
        info!(width = size.x, height = size.y, "swap chain resized");
        Ok(())
    }

    /// Stop the presentation thread and release every buffer. Calling it
    /// again does nothing.
    pub fn dispose(&mut self) {
        let Some(presenter) = self.presenter.take() else {
            return;
        };
        self.shared.cancelled.store(true, Ordering::Release);
        self.shared.request.notify_all();
        if presenter.join().is_err() {
            warn!("presentation thread panicked");
        }
        self.shared.lock().release();
        info!("swap chain disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.presenter.is_none()
    }

    /// Fill the current back buffer with one packed color.
    pub fn clear(&mut self, color: u32) -> Result<(), SwapChainError> {
        let mut frames = self.shared.lock();
        let index = frames.index;
        let buffer = frames
            .buffers
            .get_mut(index)
            .ok_or(SwapChainError::Disposed)?;
        buffer.fill(color)?;
        Ok(())
    }

    /// Copy of the current back buffer.
    pub fn back_buffer(&self) -> Vec<u32> {
        let frames = self.shared.lock();
        frames
            .buffers
            .get(frames.index)
            .map(MemoryBlock::to_vec)
            .unwrap_or_default()
    }

    /// Base address of the current back buffer, null once disposed.
    pub fn back_buffer_address(&self) -> *const u8 {
        let frames = self.shared.lock();
        frames
            .buffers
            .get(frames.index)
            .map_or(std::ptr::null(), MemoryBlock::address)
    }

    pub fn current_index(&self) -> usize {
        self.shared.lock().index
    }

    pub fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    pub fn image_size(&self) -> UVec2 {
        self.shared.lock().size
    }

    /// Bytes per buffer.
    pub fn buffer_size(&self) -> usize {
        let size = self.image_size();
        size.x as usize * size.y as usize * size_of::<u32>()
    }

    pub(crate) fn back_buffers(&self) -> BackBuffers {
        BackBuffers(Arc::clone(&self.shared))
    }
}

impl Drop for SwapChain {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for SwapChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapChain")
            .field("buffer_count", &self.buffer_count)
            .field("image_size", &self.image_size())
            .field("current_index", &self.current_index())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

fn run_presenter(shared: &Shared, mut sink: impl PresentSink) {
    debug!("presentation thread started");
    let mut frames = shared.lock();
    loop {
        if shared.cancelled.load(Ordering::Acquire) {
            break;
        }
        if frames.phase == Phase::PresentRequested {
            let index = frames.index;
            sink.present(frames.buffers[index].as_slice());
            frames.phase = Phase::Presented;
            shared.ack.notify_one();
            continue;
        }
        frames = shared
            .request
            .wait_timeout(frames, CANCEL_POLL)
            .unwrap_or_else(PoisonError::into_inner)
            .0;
    }
    debug!("presentation thread stopped");
}
