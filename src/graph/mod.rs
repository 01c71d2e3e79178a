//! The object arena that archives read from and write into.
//!
//! Reference fields never hold pointers. They hold [`Handle`]s into an
//! [`ObjectGraph`], which owns every polymorphic object of a session.

/// Defines the `ObjectGraph` arena.
pub mod core;
/// Defines the `Handle` type.
pub mod id;

pub use core::ObjectGraph;
pub use id::Handle;
