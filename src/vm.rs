//! The boundary to the script VM.
//!
//! Planes and screen items mirror script objects. The compositor reads an
//! object's properties once per add/update call and writes back only the
//! handful of corrections the interpreter has always written back.

use std::collections::HashMap;
use std::fmt;

/// Opaque handle of a script object.
///
/// Planes and items the engine creates for itself get ids from the
/// synthetic range so they can never collide with VM objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ObjectId(pub u32);

impl ObjectId {
    pub const NULL: ObjectId = ObjectId(0);
    const SYNTHETIC_BASE: u32 = 0x8000_0000;

    pub const fn synthetic(n: u32) -> Self {
        ObjectId(Self::SYNTHETIC_BASE | n)
    }

    pub fn is_synthetic(self) -> bool {
        self.0 & Self::SYNTHETIC_BASE != 0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.0 >> 16, self.0 & 0xffff)
    }
}

/// Object properties the graphics subsystem knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    // screen items
    Plane,
    X,
    Y,
    Z,
    ScaleX,
    ScaleY,
    MaxScale,
    ScaleSignal,
    View,
    Loop,
    Cel,
    FixPriority,
    Priority,
    UseInsetRect,
    Mirrored,
    // planes (and item inset rects)
    InLeft,
    InTop,
    InRight,
    InBottom,
    VanishingX,
    VanishingY,
    Picture,
    Back,
}

/// Property access into the VM heap.
pub trait ObjectStore {
    /// Read a property; absent properties read as 0, like the VM.
    fn read(&self, object: ObjectId, selector: Selector) -> i32;
    fn write(&mut self, object: ObjectId, selector: Selector, value: i32);
}

/// Hash-map backed store, enough to drive the engine without a VM.
#[derive(Debug, Default, Clone)]
pub struct MemoryObjectStore {
    values: HashMap<(ObjectId, Selector), i32>,
    writes: Vec<(ObjectId, Selector, i32)>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set several properties at once.
    pub fn set(&mut self, object: ObjectId, props: &[(Selector, i32)]) {
        for &(sel, value) in props {
            self.values.insert((object, sel), value);
        }
    }

    pub fn get(&self, object: ObjectId, selector: Selector) -> i32 {
        self.read(object, selector)
    }

    /// Writes performed by the engine (not by [`MemoryObjectStore::set`]).
    pub fn engine_writes(&self) -> &[(ObjectId, Selector, i32)] {
        &self.writes
    }

    pub fn clear_engine_writes(&mut self) {
        self.writes.clear();
    }
}

impl ObjectStore for MemoryObjectStore {
    fn read(&self, object: ObjectId, selector: Selector) -> i32 {
        self.values.get(&(object, selector)).copied().unwrap_or(0)
    }

    fn write(&mut self, object: ObjectId, selector: Selector, value: i32) {
        self.values.insert((object, selector), value);
        self.writes.push((object, selector, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_ids_are_tagged() {
        let id = ObjectId::synthetic(3);
        assert!(id.is_synthetic());
        assert!(!ObjectId(0x0012_0034).is_synthetic());
        assert_eq!(ObjectId(0x0012_0034).to_string(), "0012:0034");
    }

    #[test]
    fn store_tracks_engine_writes_only() {
        let mut store = MemoryObjectStore::new();
        let obj = ObjectId(7);
        store.set(obj, &[(Selector::Loop, 4)]);
        assert_eq!(store.read(obj, Selector::Loop), 4);
        assert_eq!(store.read(obj, Selector::Cel), 0);
        store.write(obj, Selector::Loop, 0);
        assert_eq!(store.engine_writes(), &[(obj, Selector::Loop, 0)]);
    }
}
