//! The archive sessions: [`OutputArchive`] writes an object graph to a
//! primitive stream and [`InputArchive`] rebuilds it.
//!
//! ## Wire protocol
//!
//! Values are written raw, in field order, with no tags. Arrays carry a
//! `u64` length prefix. A reference field is one envelope:
//!
//! ```text
//! new object        [class name: string] [constructor args] [fields]
//! back-reference    ["oID": string] [id: u64]
//! null reference    ["oID": string] [0: u64]
//! ```
//!
//! Statically typed references write `""` as the class name; the reader builds
//! them through the known type instead of the class factory.

mod input;
mod output;

pub use input::InputArchive;
pub use output::OutputArchive;

/// Name of the field carrying per-type version tags.
pub(crate) const VERSION_FIELD: &str = "_version";

/// How a reference field names the class of a new object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// The concrete class name is written; the reader uses the class factory.
    Polymorphic,
    /// An empty class name is written; the reader uses the static type.
    Static,
}
