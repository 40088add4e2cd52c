use core::fmt::Debug;

use kerntune_common::{backtrace::BackTrace, DimensionVector, EngineError, TuneError};
use kerntune_core::ParameterPair;
use thiserror::Error;

/// Marker replaced by the local size defines in compute shader sources.
pub const LOCAL_SIZE_MARKER: &str = "//{DEFINE_LOCAL_SIZE}";

/// Pipeline stage of a shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Compute shader.
    Compute,
    /// Vertex shader.
    Vertex,
    /// Fragment shader.
    Fragment,
}

/// A shader to compile into SPIR-V.
#[derive(new, Clone, Debug)]
pub struct ShaderSource<'a> {
    /// Entry point.
    pub name: &'a str,
    /// GLSL source with the parameter defines prepended.
    pub source: &'a str,
    /// Pipeline stage.
    pub stage: ShaderStage,
    /// Local size of the launch.
    pub local_size: DimensionVector,
    /// Parameter values of the configuration.
    pub parameter_pairs: &'a [ParameterPair],
}

impl ShaderSource<'_> {
    /// The source with the [local size marker](LOCAL_SIZE_MARKER) replaced.
    pub fn preprocessed(&self) -> String {
        inject_local_size(self.source, self.local_size)
    }
}

/// Errors returned by a [shader compiler](ShaderCompiler).
#[derive(Error, Clone)]
pub enum CompilationError {
    /// The compiler rejected the source.
    #[error("Failed to compile shader {name}\nCaused by:\n  {reason}\nBacktrace:\n{backtrace}")]
    Rejected {
        /// Entry point of the shader.
        name: String,
        /// Compiler output.
        reason: String,
        /// The captured backtrace.
        backtrace: BackTrace,
    },

    /// The compiler can't handle the stage.
    #[error("Shader stage {stage:?} is not supported\nBacktrace:\n{backtrace}")]
    UnsupportedStage {
        /// The requested stage.
        stage: ShaderStage,
        /// The captured backtrace.
        backtrace: BackTrace,
    },
}

impl core::fmt::Debug for CompilationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{self}"))
    }
}

impl From<CompilationError> for TuneError {
    fn from(value: CompilationError) -> Self {
        let name = match &value {
            CompilationError::Rejected { .. } => "SHADER_COMPILATION_FAILED",
            CompilationError::UnsupportedStage { .. } => "SHADER_STAGE_UNSUPPORTED",
        };
        let error = EngineError::new("shader compiler", -1, name).with_info(value.to_string());
        TuneError::Engine(error)
    }
}

/// Compiles GLSL sources into SPIR-V words for the Vulkan backend.
///
/// Output is all or nothing, a failure never yields partial words.
pub trait ShaderCompiler: Send + Debug {
    /// Compile the shader.
    fn compile(&mut self, shader: &ShaderSource<'_>) -> Result<Vec<u32>, CompilationError>;
}

/// Replace the [local size marker](LOCAL_SIZE_MARKER) with the `LOCAL_SIZE_X/Y/Z` defines.
pub fn inject_local_size(source: &str, local_size: DimensionVector) -> String {
    let defines = format!(
        "#define LOCAL_SIZE_X {}\n#define LOCAL_SIZE_Y {}\n#define LOCAL_SIZE_Z {}\n",
        local_size.x, local_size.y, local_size.z
    );
    source.replace(LOCAL_SIZE_MARKER, &defines)
}
