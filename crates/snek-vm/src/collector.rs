//! Mark-sweep garbage collector

use crate::frame::FrameStack;
use crate::heap::{HeapRegistry, SweepOutcome};
use crate::object::{ObjectRef, Trace};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Stop-the-world mark/sweep collector.
///
/// Roots are every reference held by a frame on the [`FrameStack`]; the
/// universe of objects is the [`HeapRegistry`]. The worklist is kept between
/// cycles so a collection reuses its buffer.
#[derive(Debug, Default)]
pub struct Collector {
    /// Objects discovered but not yet scanned
    worklist: VecDeque<ObjectRef>,
    /// Statistics
    stats: GcStats,
}

/// GC statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GcStats {
    /// Number of collections
    pub collections: u64,
    /// Total time spent in GC
    pub total_pause: Duration,
    /// Time spent in the last collection
    pub last_pause: Duration,
    /// Objects marked in last collection
    pub last_marked: usize,
    /// Objects freed in last collection
    pub last_freed: usize,
    /// Bytes reclaimed in last collection
    pub last_reclaimed_bytes: usize,
}

impl Collector {
    /// Create new collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a full GC cycle: mark from every frame root, then sweep `heap`.
    ///
    /// Runs to completion. Never frees an object transitively reachable from
    /// a frame on `frames`.
    ///
    /// # Panics
    /// Panics if a root or an edge names an object that is not in `heap`.
    pub fn collect(&mut self, frames: &FrameStack, heap: &mut HeapRegistry) -> SweepOutcome {
        let start = Instant::now();

        #[cfg(feature = "gc_logging")]
        tracing::debug!(
            target: "snek::gc",
            frames = frames.depth(),
            heap_bytes = heap.total_bytes(),
            objects = heap.count(),
            "GC cycle starting"
        );

        // Phase 1: Mark
        let marked = self.mark(frames.roots(), heap);

        // Phase 2: Sweep
        let outcome = heap.sweep();
        debug_assert_eq!(outcome.survivors, marked);

        let elapsed = start.elapsed();
        self.stats.collections += 1;
        self.stats.total_pause += elapsed;
        self.stats.last_pause = elapsed;
        self.stats.last_marked = marked;
        self.stats.last_freed = outcome.freed_objects;
        self.stats.last_reclaimed_bytes = outcome.freed_bytes;

        #[cfg(feature = "gc_logging")]
        tracing::info!(
            target: "snek::gc",
            collection = self.stats.collections,
            marked,
            freed_objects = outcome.freed_objects,
            reclaimed_bytes = outcome.freed_bytes,
            live_objects = heap.count(),
            live_bytes = heap.total_bytes(),
            pause_us = elapsed.as_micros() as u64,
            "GC cycle complete"
        );

        outcome
    }

    /// Mark phase: flag everything reachable from `roots`; returns the number
    /// of objects marked.
    ///
    /// An object is scanned only the first time its mark is set, which keeps
    /// diamonds and cycles from being traced twice.
    fn mark(
        &mut self,
        roots: impl IntoIterator<Item = ObjectRef>,
        heap: &mut HeapRegistry,
    ) -> usize {
        let mut marked = 0;
        self.worklist.clear();
        self.worklist.extend(roots);

        while let Some(handle) = self.worklist.pop_front() {
            if !heap.mark(handle) {
                continue;
            }
            marked += 1;

            let worklist = &mut self.worklist;
            if let Some(object) = heap.get(handle) {
                object.trace(&mut |child| worklist.push_back(child));
            }
        }

        marked
    }

    /// Get statistics
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Object, ObjectKind};

    fn alloc(heap: &mut HeapRegistry, kind: ObjectKind) -> ObjectRef {
        heap.register(Object::new(kind)).unwrap()
    }

    #[test]
    fn test_collector_creation() {
        let collector = Collector::new();
        assert_eq!(collector.stats().collections, 0);
    }

    #[test]
    fn test_collect_empty() {
        let mut heap = HeapRegistry::new();
        let frames = FrameStack::new();
        let mut collector = Collector::new();

        let outcome = collector.collect(&frames, &mut heap);
        assert_eq!(outcome, SweepOutcome::default());
        assert_eq!(collector.stats().collections, 1);
    }

    #[test]
    fn test_mark_single_root() {
        let mut heap = HeapRegistry::new();
        let mut frames = FrameStack::new();
        let mut collector = Collector::new();

        let root = alloc(&mut heap, ObjectKind::Integer(1));
        alloc(&mut heap, ObjectKind::Integer(2));
        let f = frames.push().unwrap();
        frames.get_mut(f).unwrap().reference(root).unwrap();

        let outcome = collector.collect(&frames, &mut heap);
        assert_eq!(outcome.freed_objects, 1);
        assert_eq!(collector.stats().last_marked, 1);
        assert!(heap.contains(root));
        assert!(!heap.get(root).unwrap().is_marked());
    }

    #[test]
    fn test_diamond_marked_once() {
        let mut heap = HeapRegistry::new();
        let mut frames = FrameStack::new();
        let mut collector = Collector::new();

        let leaf = alloc(&mut heap, ObjectKind::Integer(7));
        let left = alloc(&mut heap, ObjectKind::Vector3([leaf, leaf, leaf]));
        let right = alloc(&mut heap, ObjectKind::Array(vec![leaf].into()));
        let top = alloc(&mut heap, ObjectKind::Vector3([left, right, leaf]));

        let f = frames.push().unwrap();
        let frame = frames.get_mut(f).unwrap();
        frame.reference(top).unwrap();
        frame.reference(left).unwrap();

        let outcome = collector.collect(&frames, &mut heap);
        assert_eq!(outcome.freed_objects, 0);
        assert_eq!(collector.stats().last_marked, 4);
        assert_eq!(heap.count(), 4);
    }

    #[test]
    fn test_stats_accumulate() {
        let mut heap = HeapRegistry::new();
        let frames = FrameStack::new();
        let mut collector = Collector::new();

        alloc(&mut heap, ObjectKind::String("garbage".into()));
        let bytes = heap.total_bytes();

        collector.collect(&frames, &mut heap);
        assert_eq!(collector.stats().last_freed, 1);
        assert_eq!(collector.stats().last_reclaimed_bytes, bytes);

        collector.collect(&frames, &mut heap);
        let stats = collector.stats();
        assert_eq!(stats.collections, 2);
        assert_eq!(stats.last_freed, 0);
        assert_eq!(stats.last_reclaimed_bytes, 0);
        assert!(stats.total_pause >= stats.last_pause);
    }

    #[test]
    #[should_panic(expected = "GC invariant violated")]
    fn test_dangling_root_is_fatal() {
        let mut heap = HeapRegistry::new();
        let mut frames = FrameStack::new();
        let mut collector = Collector::new();

        let obj = alloc(&mut heap, ObjectKind::Integer(1));
        collector.collect(&frames, &mut heap);

        let f = frames.push().unwrap();
        frames.get_mut(f).unwrap().reference(obj).unwrap();
        collector.collect(&frames, &mut heap);
    }
}
