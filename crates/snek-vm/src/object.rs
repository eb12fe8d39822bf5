//! Heap object layout

use std::fmt;

/// Handle to an object owned by a [`HeapRegistry`](crate::heap::HeapRegistry).
///
/// Handles are non-owning. The generation changes every time the slot is
/// freed, so a handle to a swept object is detected instead of aliasing
/// whatever object later reuses the slot. `heap` names the registry that
/// issued the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    heap: u32,
    index: u32,
    generation: u32,
}

impl ObjectRef {
    pub(crate) const fn new(heap: u32, index: u32, generation: u32) -> Self {
        Self {
            heap,
            index,
            generation,
        }
    }

    /// Id of the registry that issued this handle
    pub const fn heap_id(self) -> u32 {
        self.heap
    }

    /// Slot index in the registry
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Slot generation at allocation time
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}#{}@{}", self.heap, self.index, self.generation)
    }
}

/// Trait for payloads that hold references to other heap objects
pub trait Trace {
    /// Report every outgoing reference to `tracer`
    fn trace(&self, tracer: &mut dyn FnMut(ObjectRef));
}

/// Object type tags
pub mod tags {
    /// Integer object
    pub const INTEGER: u8 = 1;
    /// Float object
    pub const FLOAT: u8 = 2;
    /// String object
    pub const STRING: u8 = 3;
    /// Vector3 object
    pub const VECTOR3: u8 = 4;
    /// Array object
    pub const ARRAY: u8 = 5;
}

/// Object payload
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    /// Signed 64-bit integer
    Integer(i64),
    /// 64-bit float
    Float(f64),
    /// Owned string buffer
    String(Box<str>),
    /// Three component references
    Vector3([ObjectRef; 3]),
    /// Fixed list of element references
    Array(Box<[ObjectRef]>),
}

impl ObjectKind {
    /// Type tag of this payload
    pub fn tag(&self) -> u8 {
        match self {
            ObjectKind::Integer(_) => tags::INTEGER,
            ObjectKind::Float(_) => tags::FLOAT,
            ObjectKind::String(_) => tags::STRING,
            ObjectKind::Vector3(_) => tags::VECTOR3,
            ObjectKind::Array(_) => tags::ARRAY,
        }
    }

    /// Human readable type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ObjectKind::Integer(_) => "integer",
            ObjectKind::Float(_) => "float",
            ObjectKind::String(_) => "string",
            ObjectKind::Vector3(_) => "vector3",
            ObjectKind::Array(_) => "array",
        }
    }

    /// Bytes owned by the payload outside the object itself
    fn payload_bytes(&self) -> usize {
        match self {
            ObjectKind::String(s) => s.len(),
            ObjectKind::Array(items) => items.len() * std::mem::size_of::<ObjectRef>(),
            ObjectKind::Integer(_) | ObjectKind::Float(_) | ObjectKind::Vector3(_) => 0,
        }
    }
}

impl Trace for ObjectKind {
    fn trace(&self, tracer: &mut dyn FnMut(ObjectRef)) {
        match self {
            ObjectKind::Vector3(components) => components.iter().copied().for_each(tracer),
            ObjectKind::Array(items) => items.iter().copied().for_each(tracer),
            ObjectKind::Integer(_) | ObjectKind::Float(_) | ObjectKind::String(_) => {}
        }
    }
}

/// A heap object: payload plus the collector's mark bit
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    marked: bool,
    kind: ObjectKind,
}

impl Object {
    /// Create an unmarked object
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            marked: false,
            kind,
        }
    }

    /// Payload
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Whether the collector has marked this object in the current cycle
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    pub(crate) fn set_marked(&mut self, marked: bool) {
        self.marked = marked;
    }

    /// Type tag
    pub fn tag(&self) -> u8 {
        self.kind.tag()
    }

    /// Human readable type name
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Bytes accounted to this object: the object itself plus owned payload
    pub fn heap_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.kind.payload_bytes()
    }

    /// Integer value, if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self.kind {
            ObjectKind::Integer(value) => Some(value),
            _ => None,
        }
    }

    /// Float value, if this is a float
    pub fn as_float(&self) -> Option<f64> {
        match self.kind {
            ObjectKind::Float(value) => Some(value),
            _ => None,
        }
    }

    /// String contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ObjectKind::String(s) => Some(s),
            _ => None,
        }
    }

    /// Components, if this is a vector3
    pub fn as_vector3(&self) -> Option<[ObjectRef; 3]> {
        match self.kind {
            ObjectKind::Vector3(components) => Some(components),
            _ => None,
        }
    }

    /// Elements, if this is an array
    pub fn as_array(&self) -> Option<&[ObjectRef]> {
        match &self.kind {
            ObjectKind::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl Trace for Object {
    fn trace(&self, tracer: &mut dyn FnMut(ObjectRef)) {
        self.kind.trace(tracer);
    }
}
