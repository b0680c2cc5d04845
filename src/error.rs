//! Error types.
//!
//! Only conditions a caller can react to are modelled here. Broken internal
//! invariants (unknown handles, double culling, zero-capacity caches) are
//! programming errors and panic at the call site instead.

use thiserror::Error;

/// Errors reported by a [`Driver`](crate::backend::Driver).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Failed to create resource: {0}")]
    ResourceCreationFailed(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Errors produced while compiling or executing a [`FrameGraph`](crate::graph::FrameGraph).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameGraphError {
    #[error("frame graph contains a cyclic dependency")]
    CyclicDependency,
    #[error("pass '{pass}' accesses unknown resource #{resource}")]
    UnknownResource { pass: String, resource: u32 },
    #[error("resource '{0}' is read but never written")]
    ResourceNeverWritten(String),
    #[error("frame graph must be compiled before execution")]
    NotCompiled,
    #[error(transparent)]
    Backend(#[from] BackendError),
}
