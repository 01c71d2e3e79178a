//! The primitive stream: sequential binary I/O of fixed-width values.
//!
//! Archives never touch bytes directly. They talk to an [`OutStream`] or an
//! [`InStream`], which own the physical encoding of every primitive kind. The
//! binary implementations encode through `bincode` with a fixed-width,
//! little-endian configuration:
//!
//! ```text
//! bool        1 byte (0 / 1)
//! i8 .. u64   1, 2, 4 or 8 bytes, little endian
//! f32 / f64   IEEE-754 bits, little endian
//! char        4 bytes (Unicode scalar value as u32)
//! string      u64 byte length + UTF-8 bytes
//! bytes       u64 length + raw bytes
//! ```
//!
//! Streams are strictly sequential: there is no seeking and no framing beyond
//! the length prefixes above. The protocol is order dependent, so a reader
//! must request kinds in the same order the writer produced them.

use std::io::{Read, Write};

use bincode::config::{self, Configuration, Fixint, Limit, LittleEndian, NoLimit};

use crate::error::{GraphcodeError, Result};

/// Encoding used for every value written by [`BinaryOutStream`].
const WRITE_CONFIG: Configuration<LittleEndian, Fixint, NoLimit> =
    config::standard().with_little_endian().with_fixed_int_encoding();

/// Largest single string or blob the reader accepts (1 GiB).
const MAX_BLOB_LEN: usize = 1 << 30;

/// Decoding mirror of [`WRITE_CONFIG`], bounded so a corrupt length prefix
/// cannot trigger an unbounded allocation.
const READ_CONFIG: Configuration<LittleEndian, Fixint, Limit<MAX_BLOB_LEN>> =
    config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
        .with_limit::<MAX_BLOB_LEN>();

/// Sequential writer of primitive values.
///
/// The trait is object safe: archives hold a `&mut dyn OutStream`, so any
/// encoding can be plugged in as long as its [`InStream`] peer agrees on it.
pub trait OutStream {
    /// Writes a boolean.
    fn write_bool(&mut self, value: bool) -> Result<()>;
    /// Writes a signed byte.
    fn write_i8(&mut self, value: i8) -> Result<()>;
    /// Writes an unsigned byte.
    fn write_u8(&mut self, value: u8) -> Result<()>;
    /// Writes a signed 16-bit integer.
    fn write_i16(&mut self, value: i16) -> Result<()>;
    /// Writes an unsigned 16-bit integer.
    fn write_u16(&mut self, value: u16) -> Result<()>;
    /// Writes a signed 32-bit integer.
    fn write_i32(&mut self, value: i32) -> Result<()>;
    /// Writes an unsigned 32-bit integer.
    fn write_u32(&mut self, value: u32) -> Result<()>;
    /// Writes a signed 64-bit integer.
    fn write_i64(&mut self, value: i64) -> Result<()>;
    /// Writes an unsigned 64-bit integer.
    fn write_u64(&mut self, value: u64) -> Result<()>;
    /// Writes a 32-bit float.
    fn write_f32(&mut self, value: f32) -> Result<()>;
    /// Writes a 64-bit float.
    fn write_f64(&mut self, value: f64) -> Result<()>;
    /// Writes a character as its scalar value.
    fn write_char(&mut self, value: char) -> Result<()> {
        self.write_u32(u32::from(value))
    }
    /// Writes a length-prefixed UTF-8 string.
    fn write_str(&mut self, value: &str) -> Result<()>;
    /// Writes a length-prefixed byte blob.
    fn write_bytes(&mut self, value: &[u8]) -> Result<()>;
    /// Flushes buffered output to the sink.
    fn flush(&mut self) -> Result<()>;
}

/// Sequential reader of primitive values, mirroring [`OutStream`].
pub trait InStream {
    /// Reads a boolean.
    fn read_bool(&mut self) -> Result<bool>;
    /// Reads a signed byte.
    fn read_i8(&mut self) -> Result<i8>;
    /// Reads an unsigned byte.
    fn read_u8(&mut self) -> Result<u8>;
    /// Reads a signed 16-bit integer.
    fn read_i16(&mut self) -> Result<i16>;
    /// Reads an unsigned 16-bit integer.
    fn read_u16(&mut self) -> Result<u16>;
    /// Reads a signed 32-bit integer.
    fn read_i32(&mut self) -> Result<i32>;
    /// Reads an unsigned 32-bit integer.
    fn read_u32(&mut self) -> Result<u32>;
    /// Reads a signed 64-bit integer.
    fn read_i64(&mut self) -> Result<i64>;
    /// Reads an unsigned 64-bit integer.
    fn read_u64(&mut self) -> Result<u64>;
    /// Reads a 32-bit float.
    fn read_f32(&mut self) -> Result<f32>;
    /// Reads a 64-bit float.
    fn read_f64(&mut self) -> Result<f64>;
    /// Reads a character written by [`OutStream::write_char`].
    fn read_char(&mut self) -> Result<char> {
        let raw = self.read_u32()?;
        char::from_u32(raw)
            .ok_or_else(|| GraphcodeError::Format(format!("0x{raw:08X} is not a valid char")))
    }
    /// Reads a length-prefixed UTF-8 string.
    fn read_string(&mut self) -> Result<String>;
    /// Reads a length-prefixed byte blob.
    fn read_bytes(&mut self) -> Result<Vec<u8>>;
}

/// Binary [`OutStream`] over any `std::io::Write` sink.
#[derive(Debug)]
pub struct BinaryOutStream<W: Write> {
    inner: W,
    bytes_written: u64,
}

impl<W: Write> BinaryOutStream<W> {
    /// Wraps a sink. Wrap files in a `BufWriter`: every primitive is a
    /// separate small write.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes_written: 0,
        }
    }

    /// Total number of bytes emitted so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Returns a reference to the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwraps the stream, returning the sink.
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn encode<E: bincode::Encode>(&mut self, value: E) -> Result<()> {
        let written = bincode::encode_into_std_write(value, &mut self.inner, WRITE_CONFIG)?;
        self.bytes_written += written as u64;
        Ok(())
    }
}

macro_rules! encode_methods {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method(&mut self, value: $ty) -> Result<()> {
                self.encode(value)
            }
        )*
    };
}

impl<W: Write> OutStream for BinaryOutStream<W> {
    encode_methods! {
        write_bool: bool,
        write_i8: i8,
        write_u8: u8,
        write_i16: i16,
        write_u16: u16,
        write_i32: i32,
        write_u32: u32,
        write_i64: i64,
        write_u64: u64,
        write_f32: f32,
        write_f64: f64,
        write_str: &str,
        write_bytes: &[u8],
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Binary [`InStream`] over any `std::io::Read` source.
#[derive(Debug)]
pub struct BinaryInStream<R: Read> {
    inner: R,
}

impl<R: Read> BinaryInStream<R> {
    /// Wraps a source.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Unwraps the stream, returning the source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn decode<D: bincode::Decode<()>>(&mut self) -> Result<D> {
        Ok(bincode::decode_from_std_read(&mut self.inner, READ_CONFIG)?)
    }
}

macro_rules! decode_methods {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method(&mut self) -> Result<$ty> {
                self.decode()
            }
        )*
    };
}

impl<R: Read> InStream for BinaryInStream<R> {
    decode_methods! {
        read_bool: bool,
        read_i8: i8,
        read_u8: u8,
        read_i16: i16,
        read_u16: u16,
        read_i32: i32,
        read_u32: u32,
        read_i64: i64,
        read_u64: u64,
        read_f32: f32,
        read_f64: f64,
        read_string: String,
        read_bytes: Vec<u8>,
    }
}
