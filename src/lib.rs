// Great thanks to https://github.com/sotrh/learn-wgpu
// This code is modified

pub mod backend;
pub mod config;
pub mod input;
pub mod logging;
pub mod model;
pub mod renderer;
pub mod shader;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::backend::{GpuBackend, Viewport};
use crate::config::Config;
use crate::input::{InputState, handle_input};
use crate::logging::LoggingConfig;
use crate::renderer::Renderer;

struct State {
    renderer: Renderer<GpuBackend>,
    window: Arc<Window>,
}

impl State {
    fn new(event_loop: &ActiveEventLoop, config: &Config) -> Result<State> {
        let attributes = Window::default_attributes()
            .with_title(config.title.as_str())
            .with_inner_size(config.initial_size)
            .with_resizable(config.resizable);

        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("Failed to create window")?,
        );

        let backend = pollster::block_on(GpuBackend::new(window.clone(), &config.context))
            .context("Failed to initialize the graphics API")?;

        let size = window.inner_size();
        let (renderer, diagnostics) = Renderer::new(
            backend,
            Viewport::full(size.width, size.height),
            config.clear_color,
        );
        if !diagnostics.is_empty() {
            log::warn!(
                "continuing with {} shader diagnostic(s); output may be blank",
                diagnostics.len()
            );
        }

        Ok(State { renderer, window })
    }

    fn window(&self) -> &Window {
        &self.window
    }
}

struct App {
    config: Config,
    input: InputState,
    state: Option<State>,
    failed: bool,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            input: InputState::new(config.close_key),
            config,
            state: None,
            failed: false,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failed = true;
        event_loop.exit();
    }

    fn exit_code(&self) -> ExitCode {
        if self.failed {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match State::new(event_loop, &self.config) {
            Ok(state) => {
                state.window().request_redraw();
                self.state = Some(state);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if window_id != state.window().id() {
            return;
        }

        if handle_input(&mut self.input, &event) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => state.renderer.request_close(),
            WindowEvent::Resized(physical_size) => {
                state
                    .renderer
                    .resize(physical_size.width, physical_size.height);
            }
            WindowEvent::RedrawRequested => match state.renderer.frame(&self.input) {
                Ok(true) => state.window().request_redraw(),
                Ok(false) => event_loop.exit(),
                Err(err) => {
                    let err = anyhow::Error::new(err).context("Failed to present frame");
                    self.fail(event_loop, err);
                }
            },
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            if state.renderer.should_close() {
                event_loop.exit();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        log::debug!("shutting down");
        self.state = None;
    }
}

/// Opens the window and renders until it is closed.
pub fn run_with(config: Config) -> Result<ExitCode> {
    let event_loop = EventLoop::new().context("Failed to initialize the windowing layer")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop
        .run_app(&mut app)
        .context("event loop terminated with an error")?;

    Ok(app.exit_code())
}

pub fn run() -> ExitCode {
    logging::init_logging(LoggingConfig::default());

    match run_with(Config::default()) {
        Ok(code) => code,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
