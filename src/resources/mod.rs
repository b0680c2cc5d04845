//! Resource management
//!
//! Typed GPU resources and the allocator that creates them for the frame
//! graph.

mod allocator;
mod texture_cache;
mod types;

pub use allocator::*;
pub use texture_cache::TextureCache;
pub use types::*;
