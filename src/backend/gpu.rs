use std::iter;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::{Context, Result};
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::{Backend, Compiled, FrameError, Viewport};
use crate::config::{ClearColor, ContextRequest};
use crate::model::{Mesh, Vertex};
use crate::shader::ShaderStage;

pub struct GpuShader {
    module: wgpu::ShaderModule,
    stage: ShaderStage,
}

pub struct GpuProgram {
    pipeline: wgpu::RenderPipeline,
}

/// Vertex and index buffers plus the layout baked into every pipeline.
pub struct GpuVertexArray {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

struct PendingDraw {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// Log level for uncaptured device errors.
///
/// A validation message identical to the previous one drops to `debug`; any
/// other error is logged at `error`.
#[derive(Debug, Default)]
struct ErrorThrottle {
    last_validation: Mutex<Option<String>>,
}

impl ErrorThrottle {
    fn level(&self, validation: bool, message: &str) -> log::Level {
        if !validation {
            return log::Level::Error;
        }

        let mut last = self
            .last_validation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if last.as_deref() == Some(message) {
            log::Level::Debug
        } else {
            *last = Some(message.to_owned());
            log::Level::Error
        }
    }
}

/// wgpu implementation of [`Backend`].
///
/// Bind calls update the current state, `draw_elements` snapshots it, and
/// `swap_buffers` replays the frame into a single render pass and presents.
pub struct GpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    viewport: Viewport,

    clear_color: Option<wgpu::Color>,
    bound_program: Option<wgpu::RenderPipeline>,
    bound_vertex_array: Option<(wgpu::Buffer, wgpu::Buffer)>,
    draws: Vec<PendingDraw>,
}

impl GpuBackend {
    /// Creates the surface for `window` and acquires an adapter and device.
    pub async fn new(window: Arc<Window>, request: &ContextRequest) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: request.backends,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create a rendering surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: request.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no graphics adapter supports the requested backends")?;

        let info = adapter.get_info();
        log::info!("using {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("TrojanAlpha device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create a graphics device")?;

        // A program that failed to link is still drawn; validation errors
        // from that are reported instead of panicking.
        let throttle = ErrorThrottle::default();
        device.on_uncaptured_error(Box::new(move |err: wgpu::Error| {
            let validation = matches!(err, wgpu::Error::Validation { .. });
            let message = err.to_string();
            log::log!(throttle.level(validation, &message), "{message}");
        }));

        let surface_caps = surface.get_capabilities(&adapter);

        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface reports no supported formats")?;

        let present_mode = if surface_caps.present_modes.contains(&request.present_mode) {
            request.present_mode
        } else {
            wgpu::PresentMode::Fifo
        };

        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            viewport: Viewport::full(size.width, size.height),
            clear_color: None,
            bound_program: None,
            bound_vertex_array: None,
            draws: Vec::new(),
        })
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Runs `f` inside a validation error scope and returns its message.
    fn capture_validation<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> (T, Option<String>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let error = pollster::block_on(self.device.pop_error_scope());
        (value, error.map(|e| e.to_string()))
    }
}

impl Backend for GpuBackend {
    type Shader = GpuShader;
    type Program = GpuProgram;
    type VertexArray = GpuVertexArray;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Compiled<GpuShader> {
        let label = match stage {
            ShaderStage::Vertex => "TrojanAlpha vertex shader",
            ShaderStage::Fragment => "TrojanAlpha fragment shader",
        };

        let (module, error) = self.capture_validation(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        });

        let shader = GpuShader { module, stage };
        match error {
            Some(log) => Compiled::failed(shader, log),
            None => Compiled::ok(shader),
        }
    }

    fn link_program(
        &mut self,
        vertex: &GpuShader,
        fragment: &GpuShader,
    ) -> Compiled<GpuProgram> {
        let format = self.config.format;

        let (pipeline, error) = self.capture_validation(|device| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("TrojanAlpha pipeline layout"),
                bind_group_layouts: &[],
                push_constant_ranges: &[],
            });

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("TrojanAlpha pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &vertex.module,
                    entry_point: Some(vertex.stage.entry_point()),
                    buffers: &[Vertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment.module,
                    entry_point: Some(fragment.stage.entry_point()),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            })
        });

        let program = GpuProgram { pipeline };
        match error {
            Some(log) => Compiled::failed(program, log),
            None => Compiled::ok(program),
        }
    }

    fn delete_shader(&mut self, shader: GpuShader) {
        drop(shader);
    }

    fn create_vertex_array(&mut self, mesh: &Mesh<'_>) -> GpuVertexArray {
        // No COPY_DST: the buffers are written once at creation.
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("TrojanAlpha vertex buffer"),
                contents: bytemuck::cast_slice(mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("TrojanAlpha index buffer"),
                contents: bytemuck::cast_slice(mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        GpuVertexArray {
            vertex_buffer,
            index_buffer,
        }
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;

        // wgpu rejects zero-sized surfaces; keep the old configuration until
        // the window is restored.
        if viewport.is_empty() {
            return;
        }

        if self.config.width != viewport.width || self.config.height != viewport.height {
            self.config.width = viewport.width;
            self.config.height = viewport.height;
            self.reconfigure();
        }
    }

    fn clear(&mut self, color: ClearColor) {
        self.clear_color = Some(color.into());
    }

    fn use_program(&mut self, program: &GpuProgram) {
        self.bound_program = Some(program.pipeline.clone());
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<&GpuVertexArray>) {
        self.bound_vertex_array =
            vertex_array.map(|vao| (vao.vertex_buffer.clone(), vao.index_buffer.clone()));
    }

    fn draw_elements(&mut self, index_count: u32) {
        let (Some(pipeline), Some((vertex_buffer, index_buffer))) =
            (&self.bound_program, &self.bound_vertex_array)
        else {
            log::warn!("draw with no program or vertex array bound; skipped");
            return;
        };

        self.draws.push(PendingDraw {
            pipeline: pipeline.clone(),
            vertex_buffer: vertex_buffer.clone(),
            index_buffer: index_buffer.clone(),
            index_count,
        });
    }

    fn swap_buffers(&mut self) -> Result<(), FrameError> {
        let draws = std::mem::take(&mut self.draws);
        let clear_color = self.clear_color.take();

        if self.viewport.is_empty() {
            return Ok(());
        }

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timeout");
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(FrameError::OutOfMemory),
            Err(err) => return Err(FrameError::Surface(err.to_string())),
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: clear_color.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let vp = self.viewport;
            render_pass.set_viewport(
                vp.x as f32,
                vp.y as f32,
                vp.width as f32,
                vp.height as f32,
                0.0,
                1.0,
            );

            for draw in &draws {
                render_pass.set_pipeline(&draw.pipeline);
                render_pass.set_vertex_buffer(0, draw.vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }

        self.queue.submit(iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
