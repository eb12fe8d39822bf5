//! Heap registry: the sole owner of every allocated object

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Result, VmError};
use crate::object::{Object, ObjectRef};

static NEXT_HEAP_ID: AtomicU32 = AtomicU32::new(1);

/// GC configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcConfig {
    /// Slots reserved up front (default: 64)
    pub initial_capacity: usize,
    /// Maximum number of live objects, `None` for no cap (default: None)
    pub max_objects: Option<usize>,
    /// Live object count at which a collection is due (default: 1024)
    pub gc_threshold: usize,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            max_objects: None,
            gc_threshold: 1024,
        }
    }
}

/// A registry slot. Vacant slots keep their generation so stale handles can
/// be told apart from the slot's next occupant.
#[derive(Debug)]
struct Slot {
    generation: u32,
    object: Option<Object>,
}

/// Result of a sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Objects freed
    pub freed_objects: usize,
    /// Bytes freed
    pub freed_bytes: usize,
    /// Objects that survived (and had their mark cleared)
    pub survivors: usize,
}

/// The authoritative collection of live objects.
///
/// Objects are stored in a `Vec` of slots and named by [`ObjectRef`]s
/// carrying the slot index and generation. Only [`sweep`](Self::sweep) and
/// [`teardown`](Self::teardown) free objects.
#[derive(Debug)]
pub struct HeapRegistry {
    /// Stamped into every handle so handles from another registry are rejected
    id: u32,
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    count: usize,
    total_bytes: usize,
    max_objects: Option<usize>,
}

impl HeapRegistry {
    /// Create an empty registry with default config
    pub fn new() -> Self {
        Self {
            id: NEXT_HEAP_ID.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free_list: Vec::new(),
            count: 0,
            total_bytes: 0,
            max_objects: None,
        }
    }

    /// Create an empty registry sized and capped by `config`
    pub fn with_config(config: &GcConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.slots.try_reserve(config.initial_capacity)?;
        registry.max_objects = config.max_objects;
        Ok(registry)
    }

    /// Take ownership of `object` and return its handle.
    ///
    /// On error nothing is registered.
    pub fn register(&mut self, object: Object) -> Result<ObjectRef> {
        match self.max_objects {
            Some(limit) if self.count >= limit => {
                return Err(VmError::HeapLimitExceeded { limit });
            }
            _ => {}
        }

        let bytes = object.heap_size();
        let handle = match self.free_list.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                debug_assert!(slot.object.is_none());
                slot.object = Some(object);
                ObjectRef::new(self.id, index, slot.generation)
            }
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| VmError::OutOfMemory)?;
                self.slots.try_reserve(1)?;
                // Sweep pushes freed slots onto the free list without allocating.
                self.free_list.try_reserve(self.slots.len() + 1 - self.free_list.len())?;
                self.slots.push(Slot {
                    generation: 0,
                    object: Some(object),
                });
                ObjectRef::new(self.id, index, 0)
            }
        };

        self.count += 1;
        self.total_bytes += bytes;
        Ok(handle)
    }

    fn slot_index(&self, handle: ObjectRef) -> Option<usize> {
        if handle.heap_id() != self.id {
            return None;
        }
        let index = handle.index() as usize;
        let slot = self.slots.get(index)?;
        if slot.generation != handle.generation() || slot.object.is_none() {
            return None;
        }
        Some(index)
    }

    /// Whether `handle` names a live object in this registry
    pub fn contains(&self, handle: ObjectRef) -> bool {
        self.slot_index(handle).is_some()
    }

    /// Borrow a live object
    pub fn get(&self, handle: ObjectRef) -> Option<&Object> {
        let index = self.slot_index(handle)?;
        self.slots[index].object.as_ref()
    }

    /// Fail with [`VmError::StaleObject`] unless `handle` is live
    pub fn check(&self, handle: ObjectRef) -> Result<()> {
        if self.contains(handle) {
            Ok(())
        } else {
            Err(VmError::StaleObject(handle))
        }
    }

    /// Set the mark bit of `handle`; returns true if it was not already set.
    ///
    /// # Panics
    /// Panics if `handle` is not live. A dangling root or edge means the
    /// object graph is corrupt and the collection cannot continue.
    pub(crate) fn mark(&mut self, handle: ObjectRef) -> bool {
        let Some(object) = self
            .slot_index(handle)
            .and_then(|index| self.slots[index].object.as_mut())
        else {
            panic!("GC invariant violated: {}", VmError::StaleObject(handle));
        };
        if object.is_marked() {
            return false;
        }
        object.set_marked(true);
        true
    }

    /// Free every unmarked object and clear the mark on every survivor
    pub fn sweep(&mut self) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(object) = slot.object.as_mut() else {
                continue;
            };

            if object.is_marked() {
                object.set_marked(false);
                outcome.survivors += 1;
                continue;
            }

            outcome.freed_bytes += object.heap_size();
            outcome.freed_objects += 1;
            vacate(slot, index, &mut self.free_list);
        }

        self.count -= outcome.freed_objects;
        self.total_bytes -= outcome.freed_bytes;
        debug_assert_eq!(self.count, outcome.survivors);
        outcome
    }

    /// Free every object regardless of marks; returns how many were freed.
    ///
    /// Handles issued before teardown stay stale if the registry is reused.
    pub fn teardown(&mut self) -> usize {
        let freed = self.count;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.object.is_some() {
                vacate(slot, index, &mut self.free_list);
            }
        }
        self.count = 0;
        self.total_bytes = 0;
        freed
    }

    /// Number of live objects
    pub fn count(&self) -> usize {
        self.count
    }

    /// Bytes accounted to live objects
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Whether no objects are live
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Iterate live objects
    pub fn iter(&self) -> impl Iterator<Item = (ObjectRef, &Object)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.object
                .as_ref()
                .map(|object| (ObjectRef::new(self.id, index as u32, slot.generation), object))
        })
    }
}

/// Empty `slot` and bump its generation. A slot whose generation reaches
/// `u32::MAX` is retired instead of going back on the free list.
fn vacate(slot: &mut Slot, index: usize, free_list: &mut Vec<u32>) {
    slot.object = None;
    slot.generation += 1;
    if slot.generation < u32::MAX {
        free_list.push(index as u32);
    }
}

impl Default for HeapRegistry {
    fn default() -> Self {
        Self::new()
    }
}
