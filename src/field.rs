//! Field kinds understood by the archives.
//!
//! - [`Field`]: values written raw through the primitive stream (scalars,
//!   strings) and vectors of them, framed by the array protocol.
//! - [`ArchiveEnum`]: enums stored as their `i32` projection.
//! - [`ReferenceField`]: handles into the object graph (`Handle`,
//!   `Option<Handle>` and vectors of both), stored as polymorphic envelopes.

use std::any::type_name;

use crate::archive::{InputArchive, OutputArchive, RefKind};
use crate::error::{GraphcodeError, Result};
use crate::factory::Constructor;
use crate::graph::Handle;

/// Upper bound on the capacity reserved up front when reading a vector.
/// Larger arrays grow as elements arrive, so a corrupt length prefix cannot
/// trigger a huge allocation before any element is read.
const MAX_PREALLOC: usize = 4096;

/// A value stored inline, without identity.
pub trait Field {
    /// Writes the value.
    fn write_field(&self, ar: &mut OutputArchive<'_>, name: &str) -> Result<()>;

    /// Reads the value in place.
    fn read_field(&mut self, ar: &mut InputArchive<'_>, name: &str) -> Result<()>;
}

macro_rules! primitive_fields {
    ($($ty:ty => $write:ident / $read:ident),* $(,)?) => {
        $(
            impl Field for $ty {
                fn write_field(&self, ar: &mut OutputArchive<'_>, _name: &str) -> Result<()> {
                    ar.stream().$write(*self)
                }

                fn read_field(&mut self, ar: &mut InputArchive<'_>, _name: &str) -> Result<()> {
                    *self = ar.stream().$read()?;
                    Ok(())
                }
            }
        )*
    };
}

primitive_fields! {
    bool => write_bool / read_bool,
    i8 => write_i8 / read_i8,
    u8 => write_u8 / read_u8,
    i16 => write_i16 / read_i16,
    u16 => write_u16 / read_u16,
    i32 => write_i32 / read_i32,
    u32 => write_u32 / read_u32,
    i64 => write_i64 / read_i64,
    u64 => write_u64 / read_u64,
    f32 => write_f32 / read_f32,
    f64 => write_f64 / read_f64,
    char => write_char / read_char,
}

impl Field for usize {
    fn write_field(&self, ar: &mut OutputArchive<'_>, _name: &str) -> Result<()> {
        ar.stream().write_u64(*self as u64)
    }

    fn read_field(&mut self, ar: &mut InputArchive<'_>, name: &str) -> Result<()> {
        let raw = ar.stream().read_u64()?;
        *self = usize::try_from(raw).map_err(|_| {
            GraphcodeError::Format(format!("field '{name}': {raw} does not fit in usize"))
        })?;
        Ok(())
    }
}

impl Field for String {
    fn write_field(&self, ar: &mut OutputArchive<'_>, _name: &str) -> Result<()> {
        ar.stream().write_str(self)
    }

    fn read_field(&mut self, ar: &mut InputArchive<'_>, _name: &str) -> Result<()> {
        *self = ar.stream().read_string()?;
        Ok(())
    }
}

impl<T: Field + Default> Field for Vec<T> {
    fn write_field(&self, ar: &mut OutputArchive<'_>, name: &str) -> Result<()> {
        let element_class = type_name::<T>();
        ar.begin_array(name, self.len(), element_class)?;
        for (i, element) in self.iter().enumerate() {
            if i > 0 {
                ar.between_array_elements(self.len(), element_class)?;
            }
            element.write_field(ar, name)?;
        }
        ar.end_array(self.len(), element_class)
    }

    fn read_field(&mut self, ar: &mut InputArchive<'_>, name: &str) -> Result<()> {
        let count = ar.begin_array(name)?;
        self.clear();
        self.reserve(count.min(MAX_PREALLOC));
        for i in 0..count {
            if i > 0 {
                ar.between_array_elements(name)?;
            }
            let mut element = T::default();
            element.read_field(ar, name)?;
            self.push(element);
        }
        ar.end_array(name)
    }
}

/// An enum stored as an `i32`, with no type tag.
///
/// The reader must know the enum type from the field it is reading.
/// `#[derive(ArchiveEnum)]` implements this and [`Field`] for fieldless enums.
pub trait ArchiveEnum: Sized {
    /// Projects the variant to its integer value.
    fn to_i32(&self) -> i32;

    /// Maps an integer back to a variant, `None` if no variant has it.
    fn from_i32(value: i32) -> Option<Self>;
}

/// A reference into the object graph.
pub trait ReferenceField {
    /// Writes the reference as an envelope of the given kind.
    fn write_reference(&self, ar: &mut OutputArchive<'_>, name: &str, kind: RefKind) -> Result<()>;

    /// Reads an envelope. `constructor` is `None` for polymorphic references
    /// (resolved through the factory) and the static type's constructor
    /// otherwise.
    fn read_reference(
        &mut self,
        ar: &mut InputArchive<'_>,
        name: &str,
        constructor: Option<Constructor>,
    ) -> Result<()>;
}

impl ReferenceField for Handle {
    fn write_reference(&self, ar: &mut OutputArchive<'_>, _name: &str, kind: RefKind) -> Result<()> {
        ar.write_envelope(Some(*self), kind)
    }

    fn read_reference(
        &mut self,
        ar: &mut InputArchive<'_>,
        name: &str,
        constructor: Option<Constructor>,
    ) -> Result<()> {
        *self = ar.read_envelope(constructor)?.ok_or_else(|| {
            GraphcodeError::Format(format!("null reference in non-nullable field '{name}'"))
        })?;
        Ok(())
    }
}

impl ReferenceField for Option<Handle> {
    fn write_reference(&self, ar: &mut OutputArchive<'_>, _name: &str, kind: RefKind) -> Result<()> {
        ar.write_envelope(*self, kind)
    }

    fn read_reference(
        &mut self,
        ar: &mut InputArchive<'_>,
        _name: &str,
        constructor: Option<Constructor>,
    ) -> Result<()> {
        *self = ar.read_envelope(constructor)?;
        Ok(())
    }
}

macro_rules! reference_vec {
    ($elem:ty, $placeholder:expr) => {
        impl ReferenceField for Vec<$elem> {
            fn write_reference(
                &self,
                ar: &mut OutputArchive<'_>,
                name: &str,
                kind: RefKind,
            ) -> Result<()> {
                let element_class = type_name::<$elem>();
                ar.begin_array(name, self.len(), element_class)?;
                for (i, element) in self.iter().enumerate() {
                    if i > 0 {
                        ar.between_array_elements(self.len(), element_class)?;
                    }
                    element.write_reference(ar, name, kind)?;
                }
                ar.end_array(self.len(), element_class)
            }

            fn read_reference(
                &mut self,
                ar: &mut InputArchive<'_>,
                name: &str,
                constructor: Option<Constructor>,
            ) -> Result<()> {
                let count = ar.begin_array(name)?;
                self.clear();
                self.reserve(count.min(MAX_PREALLOC));
                for i in 0..count {
                    if i > 0 {
                        ar.between_array_elements(name)?;
                    }
                    let mut element: $elem = $placeholder;
                    element.read_reference(ar, name, constructor)?;
                    self.push(element);
                }
                ar.end_array(name)
            }
        }
    };
}

reference_vec!(Handle, Handle::new(usize::MAX));
reference_vec!(Option<Handle>, None);
