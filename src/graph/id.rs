use std::fmt;

/// Identity of an object stored in an [`ObjectGraph`](super::ObjectGraph).
///
/// The value is the object's slot index in the graph. Slots are appended and
/// never reused, so every object keeps its handle for the graph's lifetime
/// and two reference fields share an object exactly when their handles are
/// equal. The write-side registry keys on handles for the same reason.
///
/// A handle is only meaningful for the graph that issued it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(usize);

impl Handle {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// The slot index behind this handle.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
