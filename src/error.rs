//! Centralized error handling for Graphcode.
//!
//! Every failure of an archive session is reported through [`GraphcodeError`]
//! and propagated with `?`. Nothing in the library panics or retries: an error
//! aborts the traversal that detected it and surfaces to the caller of the
//! top-level read or write.
//!
//! ## Error Categories
//!
//! - **Stream errors** ([`GraphcodeError::Io`], [`GraphcodeError::Serialization`]):
//!   the primitive stream could not read or write (truncated input, disk full,
//!   encoder failure).
//! - **Construction errors** ([`GraphcodeError::Construction`]): a class name read
//!   from the stream is unknown to the [`ClassFactory`](crate::ClassFactory), or a
//!   statically typed constructor refused to build an instance.
//! - **Dangling references** ([`GraphcodeError::DanglingReference`]): a back-reference
//!   names an object id that was never registered in this session.
//! - **Format errors** ([`GraphcodeError::Format`]): the bytes decode but make no
//!   sense (invalid enum discriminant, invalid UTF-8, null in a non-null field).
//! - **Registration errors** ([`GraphcodeError::Registration`]): misuse of the
//!   class factory, such as registering a reserved class name.
//! - **Internal errors** ([`GraphcodeError::Internal`]): invalid handles and other
//!   violated invariants of the object graph.
//!
//! ## Usage
//!
//! ```rust
//! use graphcode::{ClassFactory, Graphcode, GraphcodeError};
//!
//! let factory = ClassFactory::new();
//! // "Missing" was never registered: the reader reports the class by name.
//! let mut bytes = Vec::new();
//! bytes.extend_from_slice(&7u64.to_le_bytes());
//! bytes.extend_from_slice(b"Missing");
//!
//! match Graphcode::from_bytes(&bytes, &factory) {
//!     Err(GraphcodeError::Construction { class_name, .. }) => assert_eq!(class_name, "Missing"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

use bincode::error::{DecodeError, EncodeError};

/// A specialized `Result` type for Graphcode operations.
pub type Result<T> = std::result::Result<T, GraphcodeError>;

/// The master error enum covering all failure domains of an archive session.
///
/// This type is `Clone` so that a failure can be kept by a batch operation
/// (see [`Graphcode::load_many`](crate::Graphcode::load_many)) while the
/// underlying `io::Error` stays shared behind an `Arc`.
#[derive(Debug, Clone)]
pub enum GraphcodeError {
    /// Low-level I/O failure of the primitive stream.
    ///
    /// Truncated input surfaces here as `UnexpectedEof`.
    Io(Arc<io::Error>),

    /// The primitive encoder or decoder (bincode) rejected a value.
    Serialization(String),

    /// An object could not be constructed while reading a reference field.
    Construction {
        /// The class name read from the stream (or the static type's name).
        class_name: String,
        /// Why construction failed.
        reason: String,
    },

    /// A back-reference named an object id that is not registered.
    ///
    /// Either the stream is corrupt or it contains a forward reference, which
    /// the format never produces.
    DanglingReference {
        /// The id read from the stream.
        id: u64,
        /// Number of ids registered so far in the session (including null).
        registered: u64,
    },

    /// The stream decodes but violates the archive format.
    Format(String),

    /// Misuse of the class factory.
    Registration(String),

    /// A violated invariant of the object graph (invalid or vacant handle).
    Internal(String),
}

impl GraphcodeError {
    /// Creates a construction error for `class_name`.
    pub fn construction(class_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Construction {
            class_name: class_name.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for failures of the underlying primitive stream.
    pub fn is_stream_error(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Serialization(_))
    }
}

impl fmt::Display for GraphcodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O Error: {e}"),
            Self::Serialization(s) => write!(f, "Serialization Error: {s}"),
            Self::Construction { class_name, reason } => {
                write!(f, "Construction Error: cannot create '{class_name}': {reason}")
            }
            Self::DanglingReference { id, registered } => write!(
                f,
                "Dangling Reference: object id {id} is not registered ({registered} ids known)"
            ),
            Self::Format(s) => write!(f, "Format Error: {s}"),
            Self::Registration(s) => write!(f, "Registration Error: {s}"),
            Self::Internal(s) => write!(f, "Internal Logic Error: {s}"),
        }
    }
}

impl std::error::Error for GraphcodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for GraphcodeError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<EncodeError> for GraphcodeError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::Io { inner, .. } => Self::Io(Arc::new(inner)),
            other => Self::Serialization(other.to_string()),
        }
    }
}

impl From<DecodeError> for GraphcodeError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Io { inner, .. } => Self::Io(Arc::new(inner)),
            DecodeError::UnexpectedEnd { additional } => Self::Io(Arc::new(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("stream ended {additional} bytes early"),
            ))),
            DecodeError::Utf8 { inner } => Self::Format(format!("invalid UTF-8 in string: {inner}")),
            other => Self::Serialization(other.to_string()),
        }
    }
}
