use crate::backend::{Backend, FrameError, Viewport};
use crate::config::ClearColor;
use crate::input::InputState;
use crate::model::Mesh;
use crate::shader::{self, ShaderDiagnostic};

/// Owns the quad's GPU state and drives one frame at a time.
///
/// Everything is created in `new`; the frame path only binds and draws.
pub struct Renderer<B: Backend> {
    backend: B,
    program: B::Program,
    vertex_array: B::VertexArray,
    index_count: u32,
    clear_color: ClearColor,
    viewport: Viewport,
    should_close: bool,
}

impl<B: Backend> Renderer<B> {
    /// Sets the initial viewport, uploads the quad, and builds the program.
    ///
    /// Shader failures are logged and returned; the renderer keeps going with
    /// whatever program the backend handed back.
    pub fn new(
        backend: B,
        framebuffer: Viewport,
        clear_color: ClearColor,
    ) -> (Self, Vec<ShaderDiagnostic>) {
        Self::with_shaders(
            backend,
            framebuffer,
            clear_color,
            shader::VERTEX_SHADER,
            shader::FRAGMENT_SHADER,
        )
    }

    pub fn with_shaders(
        mut backend: B,
        framebuffer: Viewport,
        clear_color: ClearColor,
        vertex_source: &str,
        fragment_source: &str,
    ) -> (Self, Vec<ShaderDiagnostic>) {
        backend.set_viewport(framebuffer);

        let mesh = Mesh::QUAD;
        let vertex_array = backend.create_vertex_array(&mesh);

        let build = shader::build_program(&mut backend, vertex_source, fragment_source);
        if build.is_clean() {
            log::debug!("shader program linked");
        }

        let renderer = Self {
            backend,
            program: build.program,
            vertex_array,
            index_count: mesh.index_count(),
            clear_color,
            viewport: framebuffer,
            should_close: false,
        };

        (renderer, build.diagnostics)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Keeps the viewport covering the whole framebuffer.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::full(width, height);
        self.backend.set_viewport(self.viewport);
    }

    pub fn should_close(&self) -> bool {
        self.should_close
    }

    pub fn request_close(&mut self) {
        self.should_close = true;
    }

    /// Marks the window for closing while the close key is held.
    ///
    /// The flag is only observed before the next frame; the current one
    /// still renders.
    pub fn process_input(&mut self, input: &InputState) {
        if input.close_key_down() {
            self.should_close = true;
        }
    }

    /// Clear, one indexed draw of the quad, present.
    pub fn render(&mut self) -> Result<(), FrameError> {
        self.backend.clear(self.clear_color);

        self.backend.use_program(&self.program);
        self.backend.bind_vertex_array(Some(&self.vertex_array));
        self.backend.draw_elements(self.index_count);
        self.backend.bind_vertex_array(None);

        self.backend.swap_buffers()
    }

    /// One loop iteration: input, then the frame.
    ///
    /// Returns `Ok(false)` without drawing once closing was requested.
    pub fn frame(&mut self, input: &InputState) -> Result<bool, FrameError> {
        if self.should_close {
            return Ok(false);
        }

        self.process_input(input);
        self.render()?;
        Ok(true)
    }
}
