use std::any::{Any, type_name};

use super::id::Handle;
use crate::object::Archivable;
use crate::{GraphcodeError, Result};

/// The container for an object graph.
///
/// Acts as an arena for polymorphic objects: [`insert`](Self::insert) moves an
/// object in and hands back its [`Handle`]. Objects reference each other by
/// handle, so shared objects and cycles need no shared ownership.
///
/// A slot is vacant only while the input archive is populating the object it
/// holds; lookups of a vacant slot fail with [`GraphcodeError::Internal`].
#[derive(Debug, Default)]
pub struct ObjectGraph {
    slots: Vec<Option<Box<dyn Archivable>>>,
}

impl ObjectGraph {
    /// Creates a new, empty `ObjectGraph`.
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Moves an object into the graph.
    ///
    /// Returns the `Handle` of the newly stored object.
    pub fn insert<T: Archivable>(&mut self, object: T) -> Handle {
        self.insert_boxed(Box::new(object))
    }

    /// Moves an already boxed object into the graph.
    ///
    /// The handle is the new slot's index, so it cannot collide with the
    /// handle of any object already stored.
    pub fn insert_boxed(&mut self, object: Box<dyn Archivable>) -> Handle {
        let handle = Handle::new(self.slots.len());
        self.slots.push(Some(object));
        handle
    }

    /// Retrieves an object by handle.
    pub fn get(&self, handle: Handle) -> Result<&dyn Archivable> {
        match self.slots.get(handle.index()) {
            Some(Some(object)) => Ok(object.as_ref()),
            Some(None) => Err(vacant(handle)),
            None => Err(out_of_bounds(handle)),
        }
    }

    /// Retrieves an object mutably by handle.
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut dyn Archivable> {
        match self.slots.get_mut(handle.index()) {
            Some(Some(object)) => Ok(object.as_mut()),
            Some(None) => Err(vacant(handle)),
            None => Err(out_of_bounds(handle)),
        }
    }

    /// Retrieves an object and downcasts it to its concrete type.
    pub fn get_as<T: Archivable>(&self, handle: Handle) -> Result<&T> {
        let object = self.get(handle)?;
        let class_name = object.class_name();
        let any: &dyn Any = object;
        any.downcast_ref::<T>()
            .ok_or_else(|| wrong_type::<T>(handle, class_name))
    }

    /// Retrieves an object mutably and downcasts it to its concrete type.
    pub fn get_mut_as<T: Archivable>(&mut self, handle: Handle) -> Result<&mut T> {
        let object = self.get_mut(handle)?;
        let class_name = object.class_name();
        let any: &mut dyn Any = object;
        any.downcast_mut::<T>()
            .ok_or_else(|| wrong_type::<T>(handle, class_name))
    }

    /// Returns true if the object behind `handle` has concrete type `T`.
    pub fn is<T: Archivable>(&self, handle: Handle) -> bool {
        self.get(handle)
            .map(|object| (object as &dyn Any).is::<T>())
            .unwrap_or(false)
    }

    /// Returns the handles of all stored objects, in insertion order.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        (0..self.slots.len()).map(Handle::new)
    }

    /// Returns true if the graph holds no objects.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the number of objects in the graph.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Moves an object out of its slot so it can be populated while the
    /// graph stays mutably borrowed by the reader.
    pub(crate) fn take(&mut self, handle: Handle) -> Result<Box<dyn Archivable>> {
        let slot = self
            .slots
            .get_mut(handle.index())
            .ok_or_else(|| out_of_bounds(handle))?;
        slot.take().ok_or_else(|| vacant(handle))
    }

    /// Puts an object taken with [`take`](Self::take) back into its slot.
    pub(crate) fn restore(&mut self, handle: Handle, object: Box<dyn Archivable>) -> Result<()> {
        let slot = self
            .slots
            .get_mut(handle.index())
            .ok_or_else(|| out_of_bounds(handle))?;
        if slot.is_some() {
            return Err(GraphcodeError::Internal(format!(
                "slot {handle} was refilled while its object was being populated"
            )));
        }
        *slot = Some(object);
        Ok(())
    }
}

fn out_of_bounds(handle: Handle) -> GraphcodeError {
    GraphcodeError::Internal(format!("handle {handle} is out of bounds"))
}

fn vacant(handle: Handle) -> GraphcodeError {
    GraphcodeError::Internal(format!("object {handle} is still being populated"))
}

fn wrong_type<T>(handle: Handle, class_name: &str) -> GraphcodeError {
    GraphcodeError::Internal(format!(
        "object {handle} is a '{class_name}', not a {}",
        type_name::<T>()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{InputArchive, OutputArchive};
    use crate::object::ArchiveFields;

    #[derive(Debug, PartialEq)]
    struct Point(i32);

    #[derive(Debug)]
    struct Label;

    impl ArchiveFields for Point {
        fn write_fields(&self, _ar: &mut OutputArchive<'_>) -> Result<()> {
            Ok(())
        }
        fn read_fields(&mut self, _ar: &mut InputArchive<'_>) -> Result<()> {
            Ok(())
        }
    }

    impl Archivable for Point {
        fn class_name(&self) -> &'static str {
            "test::Point"
        }
    }

    impl ArchiveFields for Label {
        fn write_fields(&self, _ar: &mut OutputArchive<'_>) -> Result<()> {
            Ok(())
        }
        fn read_fields(&mut self, _ar: &mut InputArchive<'_>) -> Result<()> {
            Ok(())
        }
    }

    impl Archivable for Label {
        fn class_name(&self) -> &'static str {
            "test::Label"
        }
    }

    #[test]
    fn handles_follow_insertion_order() -> Result<()> {
        let mut graph = ObjectGraph::new();
        let a = graph.insert(Point(1));
        let b = graph.insert(Label);
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(graph.handles().collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(graph.get(b)?.class_name(), "test::Label");
        Ok(())
    }

    #[test]
    fn downcasts_to_concrete_type() -> Result<()> {
        let mut graph = ObjectGraph::new();
        let p = graph.insert(Point(3));
        graph.get_mut_as::<Point>(p)?.0 = 4;
        assert_eq!(graph.get_as::<Point>(p)?, &Point(4));
        assert!(graph.is::<Point>(p));
        assert!(!graph.is::<Label>(p));
        assert!(matches!(graph.get_as::<Label>(p), Err(GraphcodeError::Internal(_))));
        Ok(())
    }

    #[test]
    fn take_leaves_a_vacant_slot() -> Result<()> {
        let mut graph = ObjectGraph::new();
        let p = graph.insert(Point(9));
        let object = graph.take(p)?;
        assert!(matches!(graph.get(p), Err(GraphcodeError::Internal(_))));
        assert!(graph.take(p).is_err());
        graph.restore(p, object)?;
        assert!(graph.restore(p, Box::new(Label)).is_err());
        assert_eq!(graph.get_as::<Point>(p)?, &Point(9));
        Ok(())
    }

    #[test]
    fn unknown_handle_is_out_of_bounds() {
        let graph = ObjectGraph::new();
        assert!(graph.get(Handle::new(0)).is_err());
        assert!(graph.get(Handle::new(usize::MAX)).is_err());
        assert!(graph.is_empty());
    }

    #[test]
    fn every_insert_gets_a_distinct_handle() {
        let mut graph = ObjectGraph::new();
        let handles: Vec<Handle> = (0..1000).map(|i| graph.insert(Point(i))).collect();
        let unique: std::collections::HashSet<Handle> = handles.iter().copied().collect();
        assert_eq!(unique.len(), 1000);
        assert!(handles.iter().enumerate().all(|(i, h)| h.index() == i));
        assert_eq!(graph.handles().collect::<Vec<_>>(), handles);
    }
}
