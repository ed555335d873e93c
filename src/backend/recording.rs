use wgpu::naga;

use super::{Backend, Compiled, FrameError, Viewport};
use crate::config::ClearColor;
use crate::model::Mesh;
use crate::shader::ShaderStage;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CompileShader(ShaderStage),
    LinkProgram,
    DeleteShader(ShaderStage),
    CreateVertexArray { vertices: usize, indices: usize },
    SetViewport(Viewport),
    Clear(ClearColor),
    UseProgram { id: u32, linked: bool },
    BindVertexArray(Option<u32>),
    DrawElements { index_count: u32, vertex_array: Option<u32> },
    SwapBuffers,
}

#[derive(Debug)]
pub struct RecordedShader {
    stage: ShaderStage,
    compiled: bool,
    has_entry_point: bool,
}

#[derive(Debug)]
pub struct RecordedProgram {
    id: u32,
    linked: bool,
}

#[derive(Debug)]
pub struct RecordedVertexArray {
    id: u32,
}

/// Backend that records every call instead of touching a GPU.
///
/// Shader sources go through naga's WGSL front end and validator, so compile
/// results match what the device would report.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<Call>,
    next_id: u32,
    bound_vertex_array: Option<u32>,
    fail_swap: Option<FrameError>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    pub fn fail_next_swap(&mut self, err: FrameError) {
        self.fail_swap = Some(err);
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Parses and validates `source`, returning the rendered diagnostic on failure.
fn validate_wgsl(source: &str) -> Result<naga::Module, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| e.emit_to_string(source))?;

    Ok(module)
}

impl Backend for RecordingBackend {
    type Shader = RecordedShader;
    type Program = RecordedProgram;
    type VertexArray = RecordedVertexArray;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Compiled<RecordedShader> {
        self.calls.push(Call::CompileShader(stage));

        match validate_wgsl(source) {
            Ok(module) => {
                let has_entry_point = module
                    .entry_points
                    .iter()
                    .any(|ep| ep.name == stage.entry_point());
                Compiled::ok(RecordedShader {
                    stage,
                    compiled: true,
                    has_entry_point,
                })
            }
            Err(log) => Compiled::failed(
                RecordedShader {
                    stage,
                    compiled: false,
                    has_entry_point: false,
                },
                log,
            ),
        }
    }

    fn link_program(
        &mut self,
        vertex: &RecordedShader,
        fragment: &RecordedShader,
    ) -> Compiled<RecordedProgram> {
        self.calls.push(Call::LinkProgram);

        let log = if !vertex.compiled || !fragment.compiled {
            Some("error: attached shaders did not compile".to_string())
        } else {
            [vertex, fragment]
                .into_iter()
                .find(|shader| !shader.has_entry_point)
                .map(|shader| {
                    format!(
                        "error: {} entry point `{}` not found",
                        shader.stage,
                        shader.stage.entry_point()
                    )
                })
        };

        let program = RecordedProgram {
            id: self.next_id(),
            linked: log.is_none(),
        };

        match log {
            Some(log) => Compiled::failed(program, log),
            None => Compiled::ok(program),
        }
    }

    fn delete_shader(&mut self, shader: RecordedShader) {
        self.calls.push(Call::DeleteShader(shader.stage));
    }

    fn create_vertex_array(&mut self, mesh: &Mesh<'_>) -> RecordedVertexArray {
        self.calls.push(Call::CreateVertexArray {
            vertices: mesh.vertices.len(),
            indices: mesh.indices.len(),
        });
        RecordedVertexArray { id: self.next_id() }
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.calls.push(Call::SetViewport(viewport));
    }

    fn clear(&mut self, color: ClearColor) {
        self.calls.push(Call::Clear(color));
    }

    fn use_program(&mut self, program: &RecordedProgram) {
        self.calls.push(Call::UseProgram {
            id: program.id,
            linked: program.linked,
        });
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<&RecordedVertexArray>) {
        self.bound_vertex_array = vertex_array.map(|vao| vao.id);
        self.calls.push(Call::BindVertexArray(self.bound_vertex_array));
    }

    fn draw_elements(&mut self, index_count: u32) {
        self.calls.push(Call::DrawElements {
            index_count,
            vertex_array: self.bound_vertex_array,
        });
    }

    fn swap_buffers(&mut self) -> Result<(), FrameError> {
        self.calls.push(Call::SwapBuffers);
        match self.fail_swap.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
