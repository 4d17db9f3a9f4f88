//! Graphics backend capability consumed by the shader manager
//!
//! The manager never talks to a GPU API directly; it drives whatever
//! implements [`ShaderBackend`]. Handles are opaque integers minted by the
//! backend, in the style of GL object names.

use thiserror::Error;

/// The programmable stage a compilation unit targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage.
    Vertex,
    /// Fragment stage.
    Fragment,
}

/// Opaque handle to one compiled shader object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderHandle(u32);

impl ShaderHandle {
    /// Wraps a backend-assigned identifier.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The backend-assigned identifier.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Opaque handle to one linked shader program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramHandle(u32);

impl ProgramHandle {
    /// Wraps a backend-assigned identifier.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The backend-assigned identifier.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// The backend rejected a compilation unit.
///
/// Carries no text; fetch the diagnostic with [`ShaderBackend::info_log`]
/// before issuing further compiles or links.
#[derive(Debug, Error)]
#[error("shader compilation rejected by backend")]
pub struct CompileFailed;

/// The backend rejected a program link.
///
/// Carries no text; fetch the diagnostic with [`ShaderBackend::info_log`].
#[derive(Debug, Error)]
#[error("program link rejected by backend")]
pub struct LinkFailed;

/// Shader compilation, linking and binding, abstracted over the GPU API.
///
/// All calls are synchronous and run on the caller's thread. Handle
/// deletion follows GL semantics: deleting a shader that is attached to a
/// live program, or a program that is not currently bound, must be safe.
pub trait ShaderBackend {
    /// Compiles `source` for `stage` into a fresh shader object.
    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &[u8],
    ) -> Result<ShaderHandle, CompileFailed>;

    /// Links a vertex and a fragment shader into a fresh program. No
    /// program object survives a failed link.
    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, LinkFailed>;

    /// Copies the diagnostic text of the most recent failed compile or link
    /// into `buf`, truncating to its length. Returns the number of bytes
    /// written.
    fn info_log(&mut self, buf: &mut [u8]) -> usize;

    /// Deletes one shader object.
    fn delete_shader(&mut self, shader: ShaderHandle);

    /// Deletes one program object.
    fn delete_program(&mut self, program: ProgramHandle);

    /// Makes `program` the one subsequent draws use.
    fn use_program(&mut self, program: ProgramHandle);
}
