use std::fmt;

use crate::backend::Backend;

pub const VERTEX_SHADER: &str = include_str!("shaders/triangle.vert.wgsl");
pub const FRAGMENT_SHADER: &str = include_str!("shaders/triangle.frag.wgsl");

/// Size of the info-log buffer, including the terminator slot; at most
/// `INFO_LOG_CAPACITY - 1` characters of a compiler or linker log are kept.
pub const INFO_LOG_CAPACITY: usize = 512;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Fragment => "fs_main",
        }
    }

    fn tag(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "VERTEX",
            ShaderStage::Fragment => "FRAGMENT",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// A compile or link failure with its (truncated) info log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderDiagnostic {
    Compile { stage: ShaderStage, log: String },
    Link { log: String },
}

impl ShaderDiagnostic {
    pub fn compile(stage: ShaderStage, log: &str) -> Self {
        ShaderDiagnostic::Compile {
            stage,
            log: truncate_info_log(log),
        }
    }

    pub fn link(log: &str) -> Self {
        ShaderDiagnostic::Link {
            log: truncate_info_log(log),
        }
    }

    pub fn log(&self) -> &str {
        match self {
            ShaderDiagnostic::Compile { log, .. } | ShaderDiagnostic::Link { log } => log,
        }
    }
}

impl fmt::Display for ShaderDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderDiagnostic::Compile { stage, log } => {
                write!(f, "ERROR::SHADER::{}::COMPILATION_FAILED\n{log}", stage.tag())
            }
            ShaderDiagnostic::Link { log } => write!(f, "ERROR::SHADER::LINK::FAILED\n{log}"),
        }
    }
}

impl std::error::Error for ShaderDiagnostic {}

/// Keeps at most `INFO_LOG_CAPACITY - 1` characters of `log`.
pub fn truncate_info_log(log: &str) -> String {
    log.chars().take(INFO_LOG_CAPACITY - 1).collect()
}

/// A linked program plus every failure met while building it.
#[derive(Debug)]
pub struct ProgramBuild<P> {
    pub program: P,
    pub diagnostics: Vec<ShaderDiagnostic>,
}

impl<P> ProgramBuild<P> {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn linked(&self) -> bool {
        !self
            .diagnostics
            .iter()
            .any(|d| matches!(d, ShaderDiagnostic::Link { .. }))
    }
}

/// Compiles both stages, links them, and releases the stage objects.
///
/// Failures are logged and collected but never abort: the returned program is
/// used as-is even when it did not link.
pub fn build_program<B: Backend>(
    backend: &mut B,
    vertex_source: &str,
    fragment_source: &str,
) -> ProgramBuild<B::Program> {
    let mut diagnostics = Vec::new();

    let vertex = compile_stage(backend, ShaderStage::Vertex, vertex_source, &mut diagnostics);
    let fragment = compile_stage(
        backend,
        ShaderStage::Fragment,
        fragment_source,
        &mut diagnostics,
    );

    let linked = backend.link_program(&vertex, &fragment);
    if let Some(log) = &linked.log {
        let diagnostic = ShaderDiagnostic::link(log);
        log::error!("{diagnostic}");
        diagnostics.push(diagnostic);
    }

    backend.delete_shader(vertex);
    backend.delete_shader(fragment);

    ProgramBuild {
        program: linked.handle,
        diagnostics,
    }
}

fn compile_stage<B: Backend>(
    backend: &mut B,
    stage: ShaderStage,
    source: &str,
    diagnostics: &mut Vec<ShaderDiagnostic>,
) -> B::Shader {
    let compiled = backend.compile_shader(stage, source);
    if let Some(log) = &compiled.log {
        let diagnostic = ShaderDiagnostic::compile(stage, log);
        log::error!("{diagnostic}");
        diagnostics.push(diagnostic);
    }
    compiled.handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Call, RecordingBackend};

    // Both name the right entry point; only the syntax is wrong.
    const BROKEN_VERTEX: &str = "@vertex fn vs_main( {{{ this is not wgsl";
    const BROKEN_FRAGMENT: &str = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0, ; }";

    #[test]
    fn embedded_sources_define_entry_points() {
        assert!(VERTEX_SHADER.contains("@vertex"));
        assert!(VERTEX_SHADER.contains("fn vs_main("));
        assert!(VERTEX_SHADER.contains("@location(0) position: vec3<f32>"));
        assert!(FRAGMENT_SHADER.contains("@fragment"));
        assert!(FRAGMENT_SHADER.contains("fn fs_main("));
        assert!(FRAGMENT_SHADER.contains("vec4<f32>(1.0, 0.5, 0.2, 1.0)"));
    }

    #[test]
    fn valid_sources_link_without_diagnostics() {
        let mut backend = RecordingBackend::new();
        let build = build_program(&mut backend, VERTEX_SHADER, FRAGMENT_SHADER);

        assert!(build.is_clean());
        assert!(build.linked());
    }

    #[test]
    fn malformed_vertex_source_reports_vertex_failure() {
        let mut backend = RecordingBackend::new();
        let build = build_program(&mut backend, BROKEN_VERTEX, FRAGMENT_SHADER);

        assert!(!build.linked());
        let first = build.diagnostics[0].to_string();
        assert!(first.starts_with("ERROR::SHADER::VERTEX::COMPILATION_FAILED\n"));
        assert!(first.len() > "ERROR::SHADER::VERTEX::COMPILATION_FAILED\n".len());
        assert!(
            build
                .diagnostics
                .iter()
                .all(|d| !d.to_string().contains("FRAGMENT"))
        );
    }

    #[test]
    fn malformed_fragment_source_reports_fragment_failure() {
        let mut backend = RecordingBackend::new();
        let build = build_program(&mut backend, VERTEX_SHADER, BROKEN_FRAGMENT);

        assert!(!build.linked());
        assert_eq!(build.diagnostics.len(), 2);
        assert!(
            build.diagnostics[0]
                .to_string()
                .starts_with("ERROR::SHADER::FRAGMENT::COMPILATION_FAILED\n")
        );
        assert!(
            build.diagnostics[1]
                .to_string()
                .starts_with("ERROR::SHADER::LINK::FAILED\n")
        );
    }

    #[test]
    fn embedded_sources_compile_on_their_own() {
        let mut backend = RecordingBackend::new();
        assert!(backend.compile_shader(ShaderStage::Vertex, VERTEX_SHADER).succeeded());
        assert!(backend.compile_shader(ShaderStage::Fragment, FRAGMENT_SHADER).succeeded());
    }

    #[test]
    fn missing_entry_point_fails_at_link() {
        let fragment_only = "@fragment fn main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        let mut backend = RecordingBackend::new();
        let build = build_program(&mut backend, VERTEX_SHADER, fragment_only);

        assert!(!build.linked());
        assert_eq!(build.diagnostics.len(), 1);
        let link = build.diagnostics[0].to_string();
        assert!(link.starts_with("ERROR::SHADER::LINK::FAILED\n"));
        assert!(link.contains("fs_main"));
    }

    #[test]
    fn shaders_are_released_after_link_even_on_failure() {
        let mut backend = RecordingBackend::new();
        build_program(&mut backend, BROKEN_VERTEX, BROKEN_FRAGMENT);

        assert_eq!(
            backend.calls(),
            &[
                Call::CompileShader(ShaderStage::Vertex),
                Call::CompileShader(ShaderStage::Fragment),
                Call::LinkProgram,
                Call::DeleteShader(ShaderStage::Vertex),
                Call::DeleteShader(ShaderStage::Fragment),
            ]
        );
    }

    #[test]
    fn info_log_is_capped_at_511_characters() {
        let long = "x".repeat(2000);
        assert_eq!(truncate_info_log(&long).chars().count(), 511);
        assert_eq!(truncate_info_log("short"), "short");

        let diagnostic = ShaderDiagnostic::link(&long);
        assert_eq!(diagnostic.log().len(), 511);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let long = "é".repeat(600);
        let truncated = truncate_info_log(&long);
        assert_eq!(truncated.chars().count(), 511);
        assert_eq!(truncated.len(), 511 * 2);
    }
}
