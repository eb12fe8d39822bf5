//! Frames: per-scope root sets, kept on a LIFO stack

use std::fmt;

use crate::error::{Result, VmError};
use crate::object::ObjectRef;

/// Identifies a frame while it is on the [`FrameStack`].
///
/// `serial` is unique per push, so the id of a popped frame never resolves to
/// a later frame pushed at the same depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId {
    depth: u32,
    serial: u64,
}

impl FrameId {
    /// Position on the stack, 0 being the bottom frame
    pub const fn depth(self) -> u32 {
        self.depth
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}#{}", self.depth, self.serial)
    }
}

/// One scope's root references.
///
/// A frame owns its root list but none of the objects it names. Dropping or
/// releasing a frame never touches the heap.
#[derive(Debug)]
pub struct Frame {
    id: FrameId,
    roots: Vec<ObjectRef>,
}

impl Frame {
    fn new(id: FrameId) -> Self {
        Self {
            id,
            roots: Vec::new(),
        }
    }

    /// Id this frame had on the stack
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// Append a root. The same object may be referenced any number of times.
    pub fn reference(&mut self, object: ObjectRef) -> Result<()> {
        self.roots.try_reserve(1)?;
        self.roots.push(object);
        Ok(())
    }

    /// Roots in insertion order
    pub fn roots(&self) -> &[ObjectRef] {
        &self.roots
    }

    /// Number of roots
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether the frame holds no roots
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Free the root list. Referenced objects are left to the collector.
    pub fn release(self) {}
}

/// Stack of frames owned by the VM
#[derive(Debug, Default)]
pub struct FrameStack {
    frames: Vec<Frame>,
    next_serial: u64,
}

impl FrameStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new empty frame and return its id
    pub fn push(&mut self) -> Result<FrameId> {
        self.frames.try_reserve(1)?;
        let id = FrameId {
            depth: next_depth(self.frames.len())?,
            serial: self.next_serial,
        };
        self.next_serial += 1;
        self.frames.push(Frame::new(id));
        Ok(id)
    }

    /// Remove the top frame, handing ownership to the caller
    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// Borrow a frame that is still on the stack
    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.frames
            .get(id.depth as usize)
            .filter(|frame| frame.id == id)
    }

    /// Mutably borrow a frame that is still on the stack
    pub fn get_mut(&mut self, id: FrameId) -> Option<&mut Frame> {
        self.frames
            .get_mut(id.depth as usize)
            .filter(|frame| frame.id == id)
    }

    /// Number of frames
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frames are on the stack
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Every root of every frame on the stack
    pub fn roots(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.frames.iter().flat_map(|frame| frame.roots.iter().copied())
    }

    /// Drop every frame; returns how many were on the stack
    pub fn clear(&mut self) -> usize {
        let depth = self.frames.len();
        self.frames.clear();
        depth
    }
}

/// Depth of a frame pushed onto a stack of `len` frames
fn next_depth(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| VmError::OutOfMemory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_is_lifo() {
        let mut stack = FrameStack::new();
        let f1 = stack.push().unwrap();
        let f2 = stack.push().unwrap();
        assert_eq!(stack.depth(), 2);
        assert_eq!(f1.depth(), 0);
        assert_eq!(f2.depth(), 1);

        assert_eq!(stack.pop().map(|f| f.id()), Some(f2));
        assert_eq!(stack.pop().map(|f| f.id()), Some(f1));
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_reference_allows_duplicates() {
        let mut stack = FrameStack::new();
        let id = stack.push().unwrap();
        let obj = ObjectRef::new(0, 0, 0);

        let frame = stack.get_mut(id).unwrap();
        frame.reference(obj).unwrap();
        frame.reference(obj).unwrap();
        assert_eq!(frame.roots(), &[obj, obj]);
    }

    #[test]
    fn test_popped_id_does_not_resolve_to_new_frame() {
        let mut stack = FrameStack::new();
        let old = stack.push().unwrap();
        stack.pop().unwrap().release();

        let new = stack.push().unwrap();
        assert_eq!(old.depth(), new.depth());
        assert!(stack.get(old).is_none());
        assert!(stack.get(new).is_some());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_depth_overflow_is_an_error() {
        assert_eq!(next_depth(u32::MAX as usize), Ok(u32::MAX));
        assert_eq!(
            next_depth(u32::MAX as usize + 1),
            Err(VmError::OutOfMemory)
        );
    }

    #[test]
    fn test_roots_spans_all_frames() {
        let mut stack = FrameStack::new();
        let f1 = stack.push().unwrap();
        let f2 = stack.push().unwrap();
        let a = ObjectRef::new(0, 0, 0);
        let b = ObjectRef::new(0, 1, 0);
        stack.get_mut(f1).unwrap().reference(a).unwrap();
        stack.get_mut(f2).unwrap().reference(b).unwrap();

        let roots: Vec<_> = stack.roots().collect();
        assert_eq!(roots, vec![a, b]);
    }

    #[test]
    fn test_release_empty_frame() {
        let mut stack = FrameStack::new();
        stack.push().unwrap();
        let frame = stack.pop().unwrap();
        assert!(frame.is_empty());
        frame.release();
        assert!(stack.is_empty());
    }
}
