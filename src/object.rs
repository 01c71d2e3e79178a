//! The capability set every archivable type exposes.
//!
//! - [`ArchiveFields`]: read and write the object's own fields. This is all an
//!   embedded (by-value) object needs.
//! - [`Archivable`]: an object that can live in an [`ObjectGraph`](crate::ObjectGraph)
//!   and be reached through reference fields. It reports its concrete class name
//!   and may write constructor arguments ahead of its fields.
//! - [`Constructible`]: the static construction path. Reads the constructor
//!   arguments back and materializes a fresh instance whose fields are then
//!   populated through [`ArchiveFields::read_fields`].
//!
//! `#[derive(Archivable)]` implements all three for structs with named fields.

use std::any::Any;
use std::fmt;

use crate::archive::{InputArchive, OutputArchive};
use crate::error::Result;

/// Field-by-field serialization of an object.
pub trait ArchiveFields {
    /// Writes every field, in a fixed order.
    fn write_fields(&self, ar: &mut OutputArchive<'_>) -> Result<()>;

    /// Reads every field, in the order [`write_fields`](Self::write_fields) wrote them.
    fn read_fields(&mut self, ar: &mut InputArchive<'_>) -> Result<()>;
}

/// An object that can be stored in an [`ObjectGraph`](crate::ObjectGraph) and
/// reached through reference fields.
pub trait Archivable: ArchiveFields + Any + Send + Sync {
    /// The name under which the concrete type is registered in the
    /// [`ClassFactory`](crate::ClassFactory).
    fn class_name(&self) -> &'static str;

    /// Writes the data the reader needs before the instance can exist.
    ///
    /// Written between the class name and the fields of a new object.
    /// References are allowed here, except back to the object itself: it does
    /// not exist yet when the reader consumes these arguments.
    fn write_constructor_args(&self, _ar: &mut OutputArchive<'_>) -> Result<()> {
        Ok(())
    }
}

/// The static construction path of an [`Archivable`] type.
pub trait Constructible: Archivable + Sized {
    /// Class name used when registering the type in a factory.
    const CLASS_NAME: &'static str;

    /// Reads the constructor arguments written by
    /// [`Archivable::write_constructor_args`] and builds the instance.
    ///
    /// Fields are populated afterwards; they should start out at their defaults.
    fn construct(ar: &mut InputArchive<'_>) -> Result<Self>;
}

impl fmt::Debug for dyn Archivable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Archivable(class={})", self.class_name())
    }
}
