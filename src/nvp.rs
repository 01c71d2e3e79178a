//! Named values: the unit handed to every archive call.
//!
//! A [`NameValue`] pairs a field with its semantic name and a set of
//! [`NvpFlags`]. The binary encoding ignores the name, but every call still
//! carries it so that the same field code can drive encodings that need it.

use std::ops::BitOr;

/// Flags attached to a named value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NvpFlags(u8);

impl NvpFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Make an embedded object consume an object id on both sides. The id is
    /// never the target of a back-reference.
    pub const TRACK_OBJECT: Self = Self(0b0000_0001);

    /// Returns true if every flag of `other` is set.
    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Returns the raw bits.
    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl BitOr for NvpFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A transient view of one field: its name, its flags and a reference to it.
///
/// Never owns the value. Writers pass `NameValue<&T>`, readers `NameValue<&mut T>`.
#[derive(Debug)]
pub struct NameValue<'n, T> {
    name: &'n str,
    flags: NvpFlags,
    value: T,
}

impl<'n, T> NameValue<'n, T> {
    /// Wraps `value` under `name`, with no flags.
    pub fn new(name: &'n str, value: T) -> Self {
        Self {
            name,
            flags: NvpFlags::NONE,
            value,
        }
    }

    /// Adds `flags` to the value.
    pub fn with_flags(mut self, flags: NvpFlags) -> Self {
        self.flags = self.flags | flags;
        self
    }

    /// Shorthand for `with_flags(NvpFlags::TRACK_OBJECT)`.
    pub fn tracked(self) -> Self {
        self.with_flags(NvpFlags::TRACK_OBJECT)
    }

    /// The semantic name of the field.
    pub fn name(&self) -> &'n str {
        self.name
    }

    /// The flags of the field.
    pub fn flags(&self) -> NvpFlags {
        self.flags
    }

    /// Borrows the wrapped accessor.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Splits the named value into its name, flags and accessor.
    pub fn into_parts(self) -> (&'n str, NvpFlags, T) {
        (self.name, self.flags, self.value)
    }
}

/// Builds a [`NameValue`] with no flags.
///
/// ```rust
/// use graphcode::{nvp, NvpFlags};
///
/// let mass = 12.5_f64;
/// let field = nvp("mass", &mass);
/// assert_eq!(field.name(), "mass");
/// assert_eq!(field.flags(), NvpFlags::NONE);
/// ```
pub fn nvp<T>(name: &str, value: T) -> NameValue<'_, T> {
    NameValue::new(name, value)
}
