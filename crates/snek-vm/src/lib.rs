//! # snek VM memory manager
//!
//! Heap object registry, frame stack and mark/sweep collector for a small
//! tagged-object VM.
//!
//! ## Design
//!
//! - **Heap registry**: sole owner of every object; objects are named by
//!   generation-checked [`ObjectRef`] handles, never by pointers
//! - **Frames**: each frame on the stack holds non-owning root handles
//! - **Collector**: stop-the-world mark (worklist, no recursion) then sweep;
//!   runs only when asked
//! - **Single-threaded**: share a VM across threads with [`SharedVm`]

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod collector;
pub mod error;
pub mod frame;
pub mod heap;
pub mod object;
pub mod shared;
pub mod vm;

pub use collector::{Collector, GcStats};
pub use error::{Result, VmError};
pub use frame::{Frame, FrameId, FrameStack};
pub use heap::{GcConfig, HeapRegistry, SweepOutcome};
pub use object::{Object, ObjectKind, ObjectRef, Trace};
pub use shared::SharedVm;
pub use vm::Vm;
