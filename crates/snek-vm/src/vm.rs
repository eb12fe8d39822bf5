//! VM: owns the heap registry and the frame stack

use crate::collector::{Collector, GcStats};
use crate::error::{Result, VmError};
use crate::frame::{Frame, FrameId, FrameStack};
use crate::heap::{GcConfig, HeapRegistry, SweepOutcome};
use crate::object::{Object, ObjectKind, ObjectRef};

/// The snek virtual machine's memory manager.
///
/// All object and frame handles come from a `Vm`. Objects are unreachable
/// until a frame references them and are only freed by
/// [`collect_garbage`](Self::collect_garbage) or when the VM is dropped.
///
/// Methods that take handles panic on precondition violations (stale object,
/// popped frame, empty stack). The `try_*` variants return the error instead.
#[derive(Debug)]
pub struct Vm {
    config: GcConfig,
    heap: HeapRegistry,
    frames: FrameStack,
    collector: Collector,
}

impl Vm {
    /// Create an empty VM with default config
    pub fn new() -> Self {
        Self {
            config: GcConfig::default(),
            heap: HeapRegistry::new(),
            frames: FrameStack::new(),
            collector: Collector::new(),
        }
    }

    /// Create an empty VM with custom config
    pub fn with_config(config: GcConfig) -> Result<Self> {
        Ok(Self {
            heap: HeapRegistry::with_config(&config)?,
            frames: FrameStack::new(),
            collector: Collector::new(),
            config,
        })
    }

    fn alloc(&mut self, kind: ObjectKind) -> Result<ObjectRef> {
        self.heap.register(Object::new(kind))
    }

    #[track_caller]
    fn expect_live(&self, object: ObjectRef) {
        if let Err(err) = self.heap.check(object) {
            panic!("{err}");
        }
    }

    /// Allocate an integer
    pub fn new_integer(&mut self, value: i64) -> Result<ObjectRef> {
        self.alloc(ObjectKind::Integer(value))
    }

    /// Allocate a float
    pub fn new_float(&mut self, value: f64) -> Result<ObjectRef> {
        self.alloc(ObjectKind::Float(value))
    }

    /// Allocate a string holding a copy of `value`
    pub fn new_string(&mut self, value: &str) -> Result<ObjectRef> {
        let mut buf = String::new();
        buf.try_reserve_exact(value.len())?;
        buf.push_str(value);
        self.alloc(ObjectKind::String(buf.into_boxed_str()))
    }

    /// Allocate a vector over three existing objects.
    ///
    /// # Panics
    /// Panics if a component is not a live object of this VM.
    #[track_caller]
    pub fn new_vector3(&mut self, x: ObjectRef, y: ObjectRef, z: ObjectRef) -> Result<ObjectRef> {
        for component in [x, y, z] {
            self.expect_live(component);
        }
        self.alloc(ObjectKind::Vector3([x, y, z]))
    }

    /// Allocate an array over existing objects.
    ///
    /// # Panics
    /// Panics if an element is not a live object of this VM.
    #[track_caller]
    pub fn new_array(&mut self, items: &[ObjectRef]) -> Result<ObjectRef> {
        for &item in items {
            self.expect_live(item);
        }
        let mut buf = Vec::new();
        buf.try_reserve_exact(items.len())?;
        buf.extend_from_slice(items);
        self.alloc(ObjectKind::Array(buf.into_boxed_slice()))
    }

    /// Push a new empty frame
    pub fn new_frame(&mut self) -> Result<FrameId> {
        let id = self.frames.push()?;

        #[cfg(feature = "gc_logging")]
        tracing::debug!(
            target: "snek::gc",
            frame = %id,
            depth = self.frames.depth(),
            "frame pushed"
        );

        Ok(id)
    }

    /// Pop the top frame. The caller owns it and should [`Frame::release`] it.
    ///
    /// # Panics
    /// Panics if the frame stack is empty.
    #[track_caller]
    pub fn frame_pop(&mut self) -> Frame {
        match self.try_frame_pop() {
            Ok(frame) => frame,
            Err(err) => panic!("{err}"),
        }
    }

    /// Pop the top frame, failing with [`VmError::FrameStackEmpty`]
    pub fn try_frame_pop(&mut self) -> Result<Frame> {
        let frame = self.frames.pop().ok_or(VmError::FrameStackEmpty)?;

        #[cfg(feature = "gc_logging")]
        tracing::debug!(
            target: "snek::gc",
            frame = %frame.id(),
            roots = frame.len(),
            "frame popped"
        );

        Ok(frame)
    }

    /// Root `object` in `frame`. Only allocation failure is returned.
    ///
    /// # Panics
    /// Panics if `frame` is not on the stack or `object` is not live.
    #[track_caller]
    pub fn frame_reference(&mut self, frame: FrameId, object: ObjectRef) -> Result<()> {
        match self.try_frame_reference(frame, object) {
            Err(err) if err.is_precondition() => panic!("{err}"),
            other => other,
        }
    }

    /// Root `object` in `frame`, reporting precondition violations as errors
    pub fn try_frame_reference(&mut self, frame: FrameId, object: ObjectRef) -> Result<()> {
        self.heap.check(object)?;
        self.frames
            .get_mut(frame)
            .ok_or(VmError::UnknownFrame(frame))?
            .reference(object)
    }

    /// Borrow a frame that is still on the stack
    pub fn frame(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(id)
    }

    /// Number of frames on the stack
    pub fn frame_depth(&self) -> usize {
        self.frames.depth()
    }

    /// Run a full mark/sweep collection
    pub fn collect_garbage(&mut self) -> SweepOutcome {
        self.collector.collect(&self.frames, &mut self.heap)
    }

    /// Whether the live object count has reached the configured threshold
    pub fn should_gc(&self) -> bool {
        self.heap.count() >= self.config.gc_threshold
    }

    /// Number of live objects
    pub fn object_count(&self) -> usize {
        self.heap.count()
    }

    /// Bytes accounted to live objects
    pub fn total_bytes(&self) -> usize {
        self.heap.total_bytes()
    }

    /// Borrow a live object
    pub fn get(&self, object: ObjectRef) -> Option<&Object> {
        self.heap.get(object)
    }

    /// The heap registry
    pub fn heap(&self) -> &HeapRegistry {
        &self.heap
    }

    /// Collector statistics
    pub fn stats(&self) -> &GcStats {
        self.collector.stats()
    }

    /// Config the VM was built with
    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    /// Tear down the VM, freeing every frame and object unconditionally
    pub fn free(self) {}
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Vm {
    fn drop(&mut self) {
        let _frames = self.frames.clear();
        let _objects = self.heap.teardown();

        #[cfg(feature = "gc_logging")]
        tracing::info!(
            target: "snek::gc",
            frames = _frames,
            objects = _objects,
            collections = self.collector.stats().collections,
            "VM torn down"
        );
    }
}
