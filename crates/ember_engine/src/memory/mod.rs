//! Frame memory: fixed-buffer allocators for per-frame and persistent data
//!
//! The allocation strategies here trade general-purpose deallocation for
//! predictable layout and O(1) bulk reset. [`Arena`] bumps through a
//! caller-owned buffer; [`PoolAllocator`] recycles fixed-size blocks carved
//! from any backing [`Allocator`]. Consumers that only need "some scratch
//! memory for the duration of this call" take `&mut dyn Allocator` and work
//! with either.

mod allocator;
mod arena;
mod pool;

pub use allocator::{Allocator, Block};
pub use arena::Arena;
pub use pool::PoolAllocator;
