//! Session-scoped identity bookkeeping.
//!
//! The writer maps each object identity it meets to a sequential id; the
//! reader maps the same sequential ids back to the objects it rebuilt. Both
//! sides assign ids in traversal order, so id *n* on read always names the
//! object that received id *n* on write.
//!
//! Id [`NULL_ID`] is pre-assigned to the null reference in both views; real
//! objects are numbered from 1. A registry lives exactly as long as one
//! archive and is never shared.

use std::collections::HashMap;

use crate::error::{GraphcodeError, Result};
use crate::graph::Handle;

/// The id of the null reference.
pub const NULL_ID: u64 = 0;

/// Write-side view: identity to sequential id.
#[derive(Debug)]
pub struct WriteRegistry {
    ids: HashMap<Handle, u64>,
    next_id: u64,
}

impl WriteRegistry {
    /// Creates a registry holding only the null reference.
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            next_id: NULL_ID + 1,
        }
    }

    /// Looks `identity` up, inserting it at the next id when absent.
    ///
    /// Returns `(already_present, id)`. Must run before the object's fields
    /// are written, so that a cycle back to it finds it registered.
    pub fn register_on_write(&mut self, identity: Handle) -> (bool, u64) {
        if let Some(&id) = self.ids.get(&identity) {
            return (true, id);
        }
        let id = self.allocate();
        self.ids.insert(identity, id);
        (false, id)
    }

    /// Consumes an id for a tracked embedded object.
    ///
    /// Embedded values are always written in full and never become the
    /// target of a back-reference; the id only keeps both sides in step.
    pub fn register_embedded(&mut self) -> u64 {
        self.allocate()
    }

    /// Returns the id assigned to `identity`, if any.
    pub fn lookup(&self, identity: Handle) -> Option<u64> {
        self.ids.get(&identity).copied()
    }

    /// Number of object ids handed out (the null reference excluded).
    pub fn objects_registered(&self) -> u64 {
        self.next_id - (NULL_ID + 1)
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for WriteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Null,
    Object(Handle),
    Embedded,
    /// Taken by an object whose constructor arguments are still being read.
    Reserved,
}

/// Read-side view: sequential id to rebuilt object.
#[derive(Debug)]
pub struct ReadRegistry {
    slots: Vec<Slot>,
}

impl ReadRegistry {
    /// Creates a registry holding only the null reference.
    pub fn new() -> Self {
        Self {
            slots: vec![Slot::Null],
        }
    }

    /// Appends `instance` at the next sequential id and returns that id.
    pub fn register_on_read(&mut self, instance: Handle) -> u64 {
        self.push(Slot::Object(instance))
    }

    /// Consumes the next id for a tracked embedded object. The id can never
    /// be resolved.
    pub fn register_embedded(&mut self) -> u64 {
        self.push(Slot::Embedded)
    }

    /// Takes the next id for an object that does not exist yet.
    ///
    /// The writer numbers a new object before its constructor arguments, so
    /// the reader must do the same before running the constructor. Bind the
    /// instance afterwards with [`fill`](Self::fill).
    pub fn reserve(&mut self) -> u64 {
        self.push(Slot::Reserved)
    }

    /// Binds a reserved id to the instance built for it.
    pub fn fill(&mut self, id: u64, instance: Handle) -> Result<()> {
        let slot = usize::try_from(id).ok().and_then(|index| self.slots.get_mut(index));
        match slot {
            Some(slot) if *slot == Slot::Reserved => {
                *slot = Slot::Object(instance);
                Ok(())
            }
            _ => Err(GraphcodeError::Internal(format!(
                "object id {id} was not reserved"
            ))),
        }
    }

    /// Resolves a back-reference. `Ok(None)` is the null reference.
    pub fn resolve_on_read(&self, id: u64) -> Result<Option<Handle>> {
        let slot = usize::try_from(id)
            .ok()
            .and_then(|index| self.slots.get(index))
            .ok_or(GraphcodeError::DanglingReference {
                id,
                registered: self.slots.len() as u64,
            })?;
        match *slot {
            Slot::Null => Ok(None),
            Slot::Object(handle) => Ok(Some(handle)),
            Slot::Embedded => Err(GraphcodeError::Format(format!(
                "object id {id} belongs to an embedded object"
            ))),
            Slot::Reserved => Err(GraphcodeError::Format(format!(
                "object id {id} is referenced from its own constructor arguments"
            ))),
        }
    }

    /// Number of object ids registered (the null reference excluded).
    pub fn objects_registered(&self) -> u64 {
        self.slots.len() as u64 - 1
    }

    fn push(&mut self, slot: Slot) -> u64 {
        let id = self.slots.len() as u64;
        self.slots.push(slot);
        id
    }
}

impl Default for ReadRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_ids_are_sequential_and_stable() {
        let mut registry = WriteRegistry::new();
        let a = Handle::new(7);
        let b = Handle::new(3);

        assert_eq!(registry.register_on_write(a), (false, 1));
        assert_eq!(registry.register_on_write(b), (false, 2));
        assert_eq!(registry.register_on_write(a), (true, 1));
        assert_eq!(registry.lookup(b), Some(2));
        assert_eq!(registry.objects_registered(), 2);
    }

    #[test]
    fn embedded_objects_always_consume_an_id() {
        let mut registry = WriteRegistry::new();
        let a = Handle::new(0);

        assert_eq!(registry.register_embedded(), 1);
        assert_eq!(registry.register_on_write(a), (false, 2));
        assert_eq!(registry.register_embedded(), 3);
        assert_eq!(registry.lookup(a), Some(2));
        assert_eq!(registry.objects_registered(), 3);
    }

    #[test]
    fn read_ids_mirror_write_ids() -> Result<()> {
        let mut registry = ReadRegistry::new();
        let first = Handle::new(0);
        let second = Handle::new(1);

        assert_eq!(registry.register_on_read(first), 1);
        assert_eq!(registry.register_on_read(second), 2);
        assert_eq!(registry.resolve_on_read(NULL_ID)?, None);
        assert_eq!(registry.resolve_on_read(2)?, Some(second));
        assert_eq!(registry.objects_registered(), 2);
        Ok(())
    }

    #[test]
    fn unknown_ids_are_dangling() {
        let mut registry = ReadRegistry::new();
        registry.register_on_read(Handle::new(0));

        assert!(matches!(
            registry.resolve_on_read(5),
            Err(GraphcodeError::DanglingReference { id: 5, registered: 2 })
        ));
        assert!(matches!(
            registry.resolve_on_read(u64::MAX),
            Err(GraphcodeError::DanglingReference { .. })
        ));
    }

    #[test]
    fn embedded_ids_cannot_be_resolved() {
        let mut registry = ReadRegistry::new();
        let id = registry.register_embedded();
        assert_eq!(registry.objects_registered(), 1);
        assert!(matches!(registry.resolve_on_read(id), Err(GraphcodeError::Format(_))));
    }

    #[test]
    fn reserved_ids_resolve_once_filled() -> Result<()> {
        let mut registry = ReadRegistry::new();
        let outer = registry.reserve();
        // A constructor argument registered while the outer object is pending.
        let inner = registry.register_on_read(Handle::new(0));
        assert_eq!((outer, inner), (1, 2));
        assert!(matches!(registry.resolve_on_read(outer), Err(GraphcodeError::Format(_))));

        registry.fill(outer, Handle::new(1))?;
        assert_eq!(registry.resolve_on_read(outer)?, Some(Handle::new(1)));
        assert_eq!(registry.resolve_on_read(inner)?, Some(Handle::new(0)));
        Ok(())
    }

    #[test]
    fn only_reserved_ids_can_be_filled() {
        let mut registry = ReadRegistry::new();
        let id = registry.register_on_read(Handle::new(0));
        assert!(matches!(registry.fill(id, Handle::new(1)), Err(GraphcodeError::Internal(_))));
        assert!(matches!(registry.fill(NULL_ID, Handle::new(1)), Err(GraphcodeError::Internal(_))));
        assert!(matches!(registry.fill(9, Handle::new(1)), Err(GraphcodeError::Internal(_))));
    }
}
