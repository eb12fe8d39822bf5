//! VM error types

use crate::frame::FrameId;
use crate::object::ObjectRef;
use thiserror::Error;

/// Errors surfaced by the snek VM.
///
/// `OutOfMemory` and `HeapLimitExceeded` are resource exhaustion and are
/// returned to the caller. The remaining variants describe precondition
/// violations; the plain VM API panics with them, the `try_*` variants hand
/// them back instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// Backing storage for an object, a registry slot or a frame could not grow
    #[error("OutOfMemory")]
    OutOfMemory,

    /// The configured object cap was reached
    #[error("heap limit of {limit} objects exceeded")]
    HeapLimitExceeded {
        /// Configured maximum number of live objects
        limit: usize,
    },

    /// Popped a frame off an empty frame stack
    #[error("frame stack is empty")]
    FrameStackEmpty,

    /// Handle does not name a live object in this heap
    #[error("stale or foreign object handle {0}")]
    StaleObject(ObjectRef),

    /// Frame is not on the frame stack
    #[error("frame {0} is not on the frame stack")]
    UnknownFrame(FrameId),
}

impl VmError {
    /// Whether this error reports a bug in the caller rather than exhausted resources
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            VmError::FrameStackEmpty | VmError::StaleObject(_) | VmError::UnknownFrame(_)
        )
    }
}

impl From<std::collections::TryReserveError> for VmError {
    fn from(_: std::collections::TryReserveError) -> Self {
        VmError::OutOfMemory
    }
}

/// Result type for VM operations
pub type Result<T> = std::result::Result<T, VmError>;
