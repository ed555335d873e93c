use winit::dpi::PhysicalSize;
use winit::keyboard::KeyCode;

/// Graphics context request: which backends to try and how to pick an adapter.
#[derive(Debug, Clone)]
pub struct ContextRequest {
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,

    /// FIFO waits for vertical sync on present.
    pub present_mode: wgpu::PresentMode,
}

impl Default for ContextRequest {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::PRIMARY,
            power_preference: wgpu::PowerPreference::default(),
            present_mode: wgpu::PresentMode::Fifo,
        }
    }
}

/// RGBA clear color in linear space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClearColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl ClearColor {
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

impl From<ClearColor> for wgpu::Color {
    fn from(c: ClearColor) -> Self {
        wgpu::Color {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

/// Startup parameters. Fixed at compile time; nothing is read from the
/// command line or environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub title: String,
    pub initial_size: PhysicalSize<u32>,
    pub resizable: bool,
    pub clear_color: ClearColor,
    pub close_key: KeyCode,
    pub context: ContextRequest,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "TrojanAlpha".to_string(),
            initial_size: PhysicalSize::new(800, 600),
            resizable: true,
            clear_color: ClearColor::new(0.2, 0.3, 0.3, 1.0),
            close_key: KeyCode::Escape,
            context: ContextRequest::default(),
        }
    }
}
