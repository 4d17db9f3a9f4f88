//! # Ember Engine
//!
//! Support library for real-time rendering hosts: fixed-buffer frame memory
//! and live shader reloading.
//!
//! ## Features
//!
//! - **Arena Allocator**: bump allocation over a caller-owned buffer, O(1)
//!   bulk reset, in-place resize of the most recent allocation
//! - **Pool Allocator**: fixed-size block recycling on top of any backing
//!   allocator
//! - **Shader Hot Reloading**: file-watch driven recompilation with
//!   transactional swap and last-known-good fallback
//! - **Backend Agnostic**: compilation, linking and file watching live
//!   behind small traits, so the library never touches a GPU API directly
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ember_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut backend = my_backend(); // your ShaderBackend implementation
//!     let mut scratch_buf = vec![0u8; 5 * 1024 * 1024].into_boxed_slice();
//!     let mut scratch = Arena::new(&mut scratch_buf);
//!
//!     let mut shaders = ShaderManager::new(
//!         "shaders/vert.glsl",
//!         "shaders/frag.glsl",
//!         MtimeWatcher::new(),
//!         &mut backend,
//!         &mut scratch,
//!     )?;
//!
//!     loop {
//!         scratch.clear();
//!         shaders.reload_if_needed(&mut backend, &mut scratch)?;
//!         let program = shaders.program(&mut backend, &mut scratch)?;
//!         draw_frame(&mut backend, program);
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

pub mod config;
pub mod foundation;
pub mod memory;
pub mod shader;

/// Common imports for library users
pub mod prelude {
    pub use crate::config::{AppConfig, Config, ConfigError, MemoryConfig, ShaderConfig};
    pub use crate::memory::{Allocator, Arena, Block, PoolAllocator};
    pub use crate::shader::{
        ChangeEvent, CompileFailed, FileWatcher, LinkFailed, MtimeWatcher, ProgramHandle,
        ShaderBackend, ShaderError, ShaderHandle, ShaderManager, ShaderStage, WatchError, WatchId,
    };
}
