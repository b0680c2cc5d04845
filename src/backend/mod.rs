//! Backend abstraction layer
//!
//! Provides the [`Driver`] contract the caches allocate through, the opaque
//! handle types it hands out, and a [`DummyDriver`] that needs no GPU.

pub mod dummy;
pub mod traits;
pub mod types;

pub use dummy::{DriverStats, DummyDriver, ObjectKind};
pub use traits::*;
pub use types::*;
