//! Window contract
//!
//! The engine never creates native windows. A host implements
//! [`HostWindow`] for whatever it draws into and forwards its events;
//! [`HeadlessWindow`] stands in when there is nothing on screen.

use glam::UVec2;
use std::collections::VecDeque;

/// Opaque native window handle, passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NativeHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// The client area now measures this many pixels.
    Resized(UVec2),
    CloseRequested,
}

pub trait HostWindow {
    /// Client area in pixels.
    fn size(&self) -> UVec2;

    fn handle(&self) -> NativeHandle;

    /// `false` once the window has been closed.
    fn exists(&self) -> bool;

    fn show(&mut self);

    fn hide(&mut self);

    /// Drain events received since the last call.
    fn poll_events(&mut self) -> Vec<WindowEvent>;
}

pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Fresco".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Window with no native surface that closes itself after a fixed number
/// of frames. Resizes can be scripted to land on given frames.
#[derive(Debug)]
pub struct HeadlessWindow {
    title: String,
    size: UVec2,
    visible: bool,
    frame: u64,
    frame_budget: u64,
    resizes: VecDeque<(u64, UVec2)>,
    closed: bool,
}

impl HeadlessWindow {
    pub fn new(config: WindowConfig, frame_budget: u64) -> Self {
        Self {
            title: config.title,
            size: UVec2::new(config.width, config.height),
            visible: false,
            frame: 0,
            frame_budget,
            resizes: VecDeque::new(),
            closed: false,
        }
    }

    /// Report a resize to `size` when polled on `frame`.
    pub fn schedule_resize(&mut self, frame: u64, size: UVec2) {
        let at = self.resizes.partition_point(|(f, _)| *f <= frame);
        self.resizes.insert(at, (frame, size));
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Frames polled so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl HostWindow for HeadlessWindow {
    fn size(&self) -> UVec2 {
        self.size
    }

    fn handle(&self) -> NativeHandle {
        NativeHandle::default()
    }

    fn exists(&self) -> bool {
        !self.closed
    }

    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn poll_events(&mut self) -> Vec<WindowEvent> {
        if self.closed {
            return Vec::new();
        }
        let mut events = Vec::new();
        while let Some(&(frame, size)) = self.resizes.front() {
            if frame > self.frame {
                break;
            }
            self.resizes.pop_front();
            self.size = size;
            events.push(WindowEvent::Resized(size));
        }
        self.frame += 1;
        if self.frame > self.frame_budget {
            self.closed = true;
            events.push(WindowEvent::CloseRequested);
        }
        events
    }
}
