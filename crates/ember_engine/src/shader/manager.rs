//! Shader hot-reload state machine
//!
//! [`ShaderManager`] owns the vertex and fragment units of one program and
//! recompiles them when their source files change on disk. Replacement is
//! transactional: a broken edit never takes down rendering, because the
//! previously linked program stays bound until a complete compile-and-link
//! round succeeds.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::backend::{CompileFailed, LinkFailed, ProgramHandle, ShaderBackend, ShaderHandle, ShaderStage};
use super::watch::{ChangeEvent, FileWatcher, WatchError, WatchId};
use crate::memory::{Allocator, Block};

/// Read granularity for shader sources, and the cap on diagnostic text.
const READ_CHUNK: usize = 4096;

/// Errors produced by [`ShaderManager`] operations.
///
/// The compile and link variants carry a [`Block`] referencing diagnostic
/// text the backend wrote into the scratch allocator passed to the failing
/// call; resolve it with [`Allocator::bytes`] before reusing or clearing
/// that allocator.
#[derive(Debug, Error)]
pub enum ShaderError {
    /// A shader source file could not be opened.
    #[error("failed to open shader source `{path}`: {source}")]
    SourceOpen {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A shader source file could not be read.
    #[error("failed to read shader source `{path}`: {source}")]
    SourceRead {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The scratch allocator ran out of space for source or diagnostic text.
    #[error("scratch allocator exhausted while staging shader data")]
    ScratchExhausted,
    /// The vertex stage failed to compile.
    #[error("vertex shader failed to compile")]
    CompileVertex {
        /// Compiler diagnostic, resident in the call's scratch allocator.
        log: Block,
    },
    /// The fragment stage failed to compile.
    #[error("fragment shader failed to compile")]
    CompileFragment {
        /// Compiler diagnostic, resident in the call's scratch allocator.
        log: Block,
    },
    /// Both stages compiled but the program did not link.
    #[error("shader program failed to link")]
    Link {
        /// Linker diagnostic, resident in the call's scratch allocator.
        log: Block,
    },
    /// A file watch could not be established.
    #[error(transparent)]
    Watch(#[from] WatchError),
}

impl ShaderError {
    /// The diagnostic block, for the variants that carry one.
    #[must_use]
    pub const fn log(&self) -> Option<Block> {
        match self {
            Self::CompileVertex { log } | Self::CompileFragment { log } | Self::Link { log } => {
                Some(*log)
            }
            _ => None,
        }
    }
}

/// One compiled stage bound to its on-disk source.
///
/// The file stays open for the unit's lifetime and is re-read from the
/// start on every recompile.
#[derive(Debug)]
struct ShaderUnit {
    path: PathBuf,
    file: File,
    stage: ShaderStage,
    watch: WatchId,
    shader: ShaderHandle,
}

/// File-watch driven owner of one vertex+fragment shader program.
///
/// Construction compiles both stages; the program itself links lazily on
/// the first [`program`](ShaderManager::program) call. From then on,
/// [`reload_if_needed`](ShaderManager::reload_if_needed) keeps the program
/// in sync with its sources, always serving the last successfully linked
/// program when an edit does not survive compilation.
///
/// The graphics backend and scratch memory are borrowed per call; the
/// manager retains no reference to either between calls, so a per-frame
/// arena can be cleared immediately after any of these operations return.
#[derive(Debug)]
pub struct ShaderManager<W: FileWatcher> {
    vertex: ShaderUnit,
    fragment: ShaderUnit,
    watcher: W,
    pending: Vec<ChangeEvent>,
    program: Option<ProgramHandle>,
}

impl<W: FileWatcher> ShaderManager<W> {
    /// Opens, reads and compiles both shader sources, then registers them
    /// with `watcher`.
    ///
    /// Scratch memory is used for staging source text and, on failure, the
    /// compiler diagnostic. Any partially created backend objects are
    /// deleted before an error is returned, so a failed construction leaks
    /// nothing.
    pub fn new(
        vertex_path: impl Into<PathBuf>,
        fragment_path: impl Into<PathBuf>,
        mut watcher: W,
        backend: &mut dyn ShaderBackend,
        scratch: &mut dyn Allocator,
    ) -> Result<Self, ShaderError> {
        let vertex_path = vertex_path.into();
        let fragment_path = fragment_path.into();

        let (vertex_file, vertex_shader) =
            open_and_compile(&vertex_path, ShaderStage::Vertex, backend, scratch)?;
        let (fragment_file, fragment_shader) =
            match open_and_compile(&fragment_path, ShaderStage::Fragment, backend, scratch) {
                Ok(unit) => unit,
                Err(err) => {
                    backend.delete_shader(vertex_shader);
                    return Err(err);
                }
            };

        let mut register = |path: &Path| match watcher.watch(path) {
            Ok(id) => Ok(id),
            Err(err) => {
                backend.delete_shader(vertex_shader);
                backend.delete_shader(fragment_shader);
                Err(ShaderError::from(err))
            }
        };
        let vertex_watch = register(&vertex_path)?;
        let fragment_watch = register(&fragment_path)?;

        Ok(Self {
            vertex: ShaderUnit {
                path: vertex_path,
                file: vertex_file,
                stage: ShaderStage::Vertex,
                watch: vertex_watch,
                shader: vertex_shader,
            },
            fragment: ShaderUnit {
                path: fragment_path,
                file: fragment_file,
                stage: ShaderStage::Fragment,
                watch: fragment_watch,
                shader: fragment_shader,
            },
            watcher,
            pending: Vec::new(),
            program: None,
        })
    }

    /// The linked program, linking it first if necessary.
    ///
    /// Idempotent once linked: repeated calls return the same handle with
    /// no backend traffic. A failed link leaves the manager in its
    /// not-yet-linked state, so the call can simply be retried.
    pub fn program(
        &mut self,
        backend: &mut dyn ShaderBackend,
        scratch: &mut dyn Allocator,
    ) -> Result<ProgramHandle, ShaderError> {
        if let Some(program) = self.program {
            return Ok(program);
        }
        match backend.link_program(self.vertex.shader, self.fragment.shader) {
            Ok(program) => {
                self.program = Some(program);
                Ok(program)
            }
            Err(LinkFailed) => Err(ShaderError::Link {
                log: fetch_link_log(backend, scratch),
            }),
        }
    }

    /// The linked program, if one exists, without touching the backend.
    #[must_use]
    pub const fn current_program(&self) -> Option<ProgramHandle> {
        self.program
    }

    /// Path of the vertex shader source.
    #[must_use]
    pub fn vertex_path(&self) -> &Path {
        &self.vertex.path
    }

    /// Path of the fragment shader source.
    #[must_use]
    pub fn fragment_path(&self) -> &Path {
        &self.fragment.path
    }

    /// Recompiles and relinks if any watched source changed.
    ///
    /// Drains the watcher without blocking. No pending changes means no
    /// backend traffic and `Ok(false)`. Otherwise both stages are
    /// recompiled and relinked exactly once, however many events were
    /// pending — and whichever of the two files fired them; recompiling
    /// only the changed stage would be an obvious refinement, but reload is
    /// rare enough that the blunt version has never been worth the extra
    /// bookkeeping.
    ///
    /// On success the new program replaces the old one atomically and
    /// `Ok(true)` is returned. On any compile or link failure the manager
    /// keeps serving the previous program and shaders untouched, deletes
    /// the temporary objects, and returns the error.
    ///
    /// # Panics
    ///
    /// Panics if changes are pending before the program was ever linked;
    /// the reload cycle only exists to replace a live program.
    pub fn reload_if_needed(
        &mut self,
        backend: &mut dyn ShaderBackend,
        scratch: &mut dyn Allocator,
    ) -> Result<bool, ShaderError> {
        self.pending.clear();
        self.watcher.poll(&mut self.pending);
        if self.pending.is_empty() {
            return Ok(false);
        }
        for event in &self.pending {
            if event.watch == self.vertex.watch {
                log::debug!("shader source `{}` changed", self.vertex.path.display());
            } else if event.watch == self.fragment.watch {
                log::debug!("shader source `{}` changed", self.fragment.path.display());
            }
        }
        self.reload(backend, scratch)?;
        Ok(true)
    }

    /// One full recompile-and-relink round with transactional replacement.
    fn reload(
        &mut self,
        backend: &mut dyn ShaderBackend,
        scratch: &mut dyn Allocator,
    ) -> Result<(), ShaderError> {
        assert!(
            self.program.is_some(),
            "shader reload attempted before the program was ever linked"
        );

        let new_vertex = match compile_from_file(
            &mut self.vertex.file,
            &self.vertex.path,
            self.vertex.stage,
            backend,
            scratch,
        ) {
            Ok(shader) => shader,
            Err(err) => {
                log::warn!(
                    "vertex shader reload failed, keeping last good program: {err}"
                );
                return Err(err);
            }
        };
        let new_fragment = match compile_from_file(
            &mut self.fragment.file,
            &self.fragment.path,
            self.fragment.stage,
            backend,
            scratch,
        ) {
            Ok(shader) => shader,
            Err(err) => {
                backend.delete_shader(new_vertex);
                log::warn!(
                    "fragment shader reload failed, keeping last good program: {err}"
                );
                return Err(err);
            }
        };
        let new_program = match backend.link_program(new_vertex, new_fragment) {
            Ok(program) => program,
            Err(LinkFailed) => {
                backend.delete_shader(new_vertex);
                backend.delete_shader(new_fragment);
                log::warn!("shader relink failed, keeping last good program");
                return Err(ShaderError::Link {
                    log: fetch_link_log(backend, scratch),
                });
            }
        };

        // Swap order matters: the old program stays current until the new
        // one is bound, so there is never a moment without a usable program.
        backend.delete_shader(self.vertex.shader);
        backend.delete_shader(self.fragment.shader);
        backend.use_program(new_program);
        if let Some(old) = self.program.replace(new_program) {
            backend.delete_program(old);
        }
        self.vertex.shader = new_vertex;
        self.fragment.shader = new_fragment;
        log::info!(
            "reloaded shader program from `{}` + `{}`",
            self.vertex.path.display(),
            self.fragment.path.display()
        );
        Ok(())
    }

    /// Deletes the program and both shader objects, consuming the manager.
    pub fn shutdown(self, backend: &mut dyn ShaderBackend) {
        backend.delete_shader(self.vertex.shader);
        backend.delete_shader(self.fragment.shader);
        if let Some(program) = self.program {
            backend.delete_program(program);
        }
    }
}

fn open_and_compile(
    path: &Path,
    stage: ShaderStage,
    backend: &mut dyn ShaderBackend,
    scratch: &mut dyn Allocator,
) -> Result<(File, ShaderHandle), ShaderError> {
    let mut file = File::open(path).map_err(|source| ShaderError::SourceOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let shader = compile_from_file(&mut file, path, stage, backend, scratch)?;
    Ok((file, shader))
}

/// Re-reads the source from the start and hands it to the backend. On
/// rejection the backend's diagnostic replaces the staged source text in
/// scratch and is referenced by the returned error.
fn compile_from_file(
    file: &mut File,
    path: &Path,
    stage: ShaderStage,
    backend: &mut dyn ShaderBackend,
    scratch: &mut dyn Allocator,
) -> Result<ShaderHandle, ShaderError> {
    let source = read_whole_file(file, path, scratch)?;
    match backend.compile_shader(stage, scratch.bytes(source)) {
        Ok(shader) => Ok(shader),
        Err(CompileFailed) => {
            let log = fetch_info_log(backend, scratch, source);
            Err(match stage {
                ShaderStage::Vertex => ShaderError::CompileVertex { log },
                ShaderStage::Fragment => ShaderError::CompileFragment { log },
            })
        }
    }
}

/// Reads the whole file into one scratch block, growing in [`READ_CHUNK`]
/// steps. The block is the most recent scratch allocation throughout, so
/// with an arena behind the scratch handle every grow and the final trim
/// resize in place.
fn read_whole_file(
    file: &mut File,
    path: &Path,
    scratch: &mut dyn Allocator,
) -> Result<Block, ShaderError> {
    file.seek(SeekFrom::Start(0))
        .map_err(|source| ShaderError::SourceRead {
            path: path.to_path_buf(),
            source,
        })?;
    let mut block = scratch
        .alloc(READ_CHUNK, 1)
        .ok_or(ShaderError::ScratchExhausted)?;
    let mut filled = 0;
    loop {
        if filled == block.len() {
            block = scratch
                .realloc(block, block.len() + READ_CHUNK, 1)
                .ok_or(ShaderError::ScratchExhausted)?;
        }
        let read = file
            .read(&mut scratch.bytes_mut(block)[filled..])
            .map_err(|source| ShaderError::SourceRead {
                path: path.to_path_buf(),
                source,
            })?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    scratch
        .realloc(block, filled, 1)
        .ok_or(ShaderError::ScratchExhausted)
}

/// Replaces `spent` (staged text that is no longer needed) with the
/// backend's diagnostic, reusing the same scratch region where possible.
fn fetch_info_log(
    backend: &mut dyn ShaderBackend,
    scratch: &mut dyn Allocator,
    spent: Block,
) -> Block {
    let log = scratch.realloc(spent, READ_CHUNK, 1).unwrap_or(spent);
    let written = backend.info_log(scratch.bytes_mut(log));
    scratch
        .realloc(log, written.min(log.len()), 1)
        .unwrap_or(log)
}

/// Fetches a link diagnostic into freshly allocated scratch. A scratch
/// allocator too exhausted to hold any text yields an empty block.
fn fetch_link_log(backend: &mut dyn ShaderBackend, scratch: &mut dyn Allocator) -> Block {
    let Some(log) = scratch.alloc(READ_CHUNK, 1) else {
        return Block::new(0, 0);
    };
    let written = backend.info_log(scratch.bytes_mut(log));
    scratch
        .realloc(log, written.min(log.len()), 1)
        .unwrap_or(log)
}
