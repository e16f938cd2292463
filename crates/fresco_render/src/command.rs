//! Deferred commands

use crate::device::{Device, VertexBuffer};
use crate::pipeline::Pipeline;
use std::collections::VecDeque;
use std::sync::Arc;

/// One recorded device operation.
#[derive(Debug, Clone)]
pub enum Command {
    SetPipeline(Arc<Pipeline>),
    UploadVertexBuffer { buffer: VertexBuffer, stride: usize },
    Rasterize,
}

impl Command {
    fn apply(self, device: &mut Device) {
        match self {
            Command::SetPipeline(pipeline) => device.set_pipeline(pipeline),
            Command::UploadVertexBuffer { buffer, stride } => {
                device.upload_vertex_buffer(buffer, stride)
            }
            Command::Rasterize => {
                device.rasterize();
            }
        }
    }
}

/// FIFO of commands, run against a device on [`execute`](Self::execute).
#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: VecDeque<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push_back(command);
    }

    pub fn set_pipeline(&mut self, pipeline: Arc<Pipeline>) {
        self.push(Command::SetPipeline(pipeline));
    }

    pub fn upload_vertex_buffer(&mut self, buffer: VertexBuffer, stride: usize) {
        self.push(Command::UploadVertexBuffer { buffer, stride });
    }

    pub fn rasterize(&mut self) {
        self.push(Command::Rasterize);
    }

    /// Run and drain every pending command in submission order.
    pub fn execute(&mut self, device: &mut Device) {
        while let Some(command) = self.commands.pop_front() {
            command.apply(device);
        }
    }

    /// Drop pending commands without running them.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
