//! # Graphcode
//!
//! Binary archives for directed graphs of polymorphic objects.
//!
//! ## Overview
//!
//! Graphcode persists an object graph and restores it with its shape intact.
//! Objects reached through several references are written once and restored
//! once: every later reference becomes a back-reference to the first copy.
//! Polymorphic objects carry their class name on the wire, and the reader
//! rebuilds the concrete type through a [`ClassFactory`].
//!
//! ### Key Features
//!
//! *   **Identity preservation:** diamonds and cycles survive a round trip as
//!     diamonds and cycles, never as duplicated trees.
//! *   **Polymorphic reconstruction:** the concrete type of an object is
//!     chosen at read time from the class name stored in the stream.
//! *   **Two-phase construction:** types that cannot be default-constructed
//!     write constructor arguments that the reader consumes before the
//!     instance exists.
//! *   **Narrow I/O surface:** archives only talk to a primitive stream
//!     ([`OutStream`] / [`InStream`]), so writer and reader stay bit compatible.
//!
//! ## Architecture
//!
//! ### The Object Graph
//!
//! Objects live in an [`ObjectGraph`] arena and reference each other through
//! [`Handle`]s. A handle is the identity of an object: the write-side
//! registry keys on it, and the read side hands out fresh handles in the
//! same order ids were assigned.
//!
//! ### Sessions
//!
//! An [`OutputArchive`] or [`InputArchive`] is one session: one stream, one
//! identity registry, strictly sequential. Sessions share no mutable state,
//! so independent sessions may run on different threads. The class factory
//! is read-only once populated and can serve all of them.
//!
//! ## Usage
//!
//! ```rust
//! use graphcode::{Archivable, ClassFactory, Graphcode, Handle, ObjectGraph};
//!
//! #[derive(Archivable, Default, Debug)]
//! #[archive(class = "demo::Joint")]
//! struct Joint {
//!     stiffness: f64,
//! }
//!
//! #[derive(Archivable, Default, Debug)]
//! #[archive(class = "demo::Link")]
//! struct Link {
//!     name: String,
//!     #[archive(polymorphic)]
//!     joint: Option<Handle>,
//! }
//!
//! let mut graph = ObjectGraph::new();
//! let joint = graph.insert(Joint { stiffness: 2.5 });
//! let link = graph.insert(Link { name: "arm".into(), joint: Some(joint) });
//!
//! let bytes = Graphcode::to_bytes(&graph, link)?;
//!
//! let mut factory = ClassFactory::new();
//! factory.register::<Joint>()?;
//! factory.register::<Link>()?;
//!
//! let restored = Graphcode::from_bytes(&bytes, &factory)?;
//! let link = restored.graph.get_as::<Link>(restored.root)?;
//! assert_eq!(link.name, "arm");
//! let joint = restored.graph.get_as::<Joint>(link.joint.expect("joint"))?;
//! assert_eq!(joint.stiffness, 2.5);
//! # Ok::<(), graphcode::GraphcodeError>(())
//! ```
//!
//! ### Safety and Error Handling
//!
//! * **No Panics:** No `unwrap()` or `panic!()` calls in the library (enforced by clippy lints).
//! * **Comprehensive Errors:** All failures correspond to a [`GraphcodeError`] type.
//! * **Encapsulated Unsafe:** the only `unsafe` block memory-maps archive files in [`Graphcode::load`].

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// --- PUBLIC API MODULES ---
pub mod api;
pub mod archive;
pub mod config;
pub mod error;
pub mod factory;
pub mod field;
pub mod graph;
pub mod nvp;
pub mod object;
pub mod registry;
pub mod stream;

// --- RE-EXPORTS ---

pub use api::{Graphcode, Restored};
pub use archive::{InputArchive, OutputArchive, RefKind};
pub use config::ArchiveConfig;
pub use error::{GraphcodeError, Result};
pub use factory::{ClassFactory, Constructor, SENTINEL};
pub use field::{ArchiveEnum, Field, ReferenceField};
pub use graph::{Handle, ObjectGraph};
pub use nvp::{NameValue, NvpFlags, nvp};
pub use object::{ArchiveFields, Archivable, Constructible};
pub use registry::{NULL_ID, ReadRegistry, WriteRegistry};
pub use stream::{BinaryInStream, BinaryOutStream, InStream, OutStream};

// Re-export the derive macros so they are accessible as `graphcode::Archivable`
// and `graphcode::ArchiveEnum`.
pub use graphcode_derive::{ArchiveEnum, Archivable};
