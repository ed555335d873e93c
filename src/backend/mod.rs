//! Graphics backend seam.
//!
//! The renderer talks to the GPU through a small bind-then-operate API: state
//! is bound (`use_program`, `bind_vertex_array`) and later calls act on the
//! bound state. `GpuBackend` implements it on top of wgpu; tests use a
//! recording implementation.

mod gpu;
#[cfg(test)]
pub(crate) mod recording;

use std::fmt;

pub use gpu::GpuBackend;

use crate::config::ClearColor;
use crate::model::Mesh;
use crate::shader::ShaderStage;

/// Full-window viewport rectangle in physical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Result of a compile or link step.
///
/// The handle is returned even when `log` is set; callers keep using it.
#[derive(Debug)]
pub struct Compiled<T> {
    pub handle: T,
    pub log: Option<String>,
}

impl<T> Compiled<T> {
    pub fn ok(handle: T) -> Self {
        Self { handle, log: None }
    }

    pub fn failed(handle: T, log: impl Into<String>) -> Self {
        Self {
            handle,
            log: Some(log.into()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.log.is_none()
    }
}

/// Unrecoverable presentation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    OutOfMemory,
    Surface(String),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::OutOfMemory => f.write_str("out of memory while acquiring a frame"),
            FrameError::Surface(msg) => write!(f, "surface error: {msg}"),
        }
    }
}

impl std::error::Error for FrameError {}

pub trait Backend {
    type Shader;
    type Program;
    type VertexArray;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Compiled<Self::Shader>;

    fn link_program(
        &mut self,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Compiled<Self::Program>;

    /// Releases an intermediate shader object.
    fn delete_shader(&mut self, shader: Self::Shader);

    /// Uploads `mesh` once into immutable buffers bundled with its layout.
    fn create_vertex_array(&mut self, mesh: &Mesh<'_>) -> Self::VertexArray;

    fn set_viewport(&mut self, viewport: Viewport);

    fn clear(&mut self, color: ClearColor);

    fn use_program(&mut self, program: &Self::Program);

    fn bind_vertex_array(&mut self, vertex_array: Option<&Self::VertexArray>);

    /// Draws `index_count` `u32` indices from the bound vertex array as a
    /// triangle list.
    fn draw_elements(&mut self, index_count: u32);

    fn swap_buffers(&mut self) -> Result<(), FrameError>;
}
