#![deny(unsafe_code)]

//! Type-directed value serialization.
//!
//! A [`Codec`] is selected by the static shape of a value and knows three
//! things: the value's [`Desc`] (advertised during the handshake), how to
//! move the value across a blocking socket (`write`/`read`), and how to
//! make partial progress reading it from a non-blocking socket through an
//! explicit per-value [`Codec::Reader`] state machine (`reader`/`accum`).
//!
//! Values are self-delimiting: there is no envelope or length prefix beyond
//! what the shape itself dictates, so both peers must agree on the shape —
//! that is what the handshake's descriptor exchange checks.
//!
//! Multi-byte integers are fixed-width little-endian and dynamic lengths
//! are platform-sized, so peers must share primitive widths; this is a
//! protocol constraint, not something the codec negotiates.

mod scalar;
mod seq;
mod tuple;

#[macro_use]
mod macros;

use std::io::{Read, Write};

pub use remex_stream::NetError;
pub use remex_wire::{Ctor, Desc, EnumConst, Field};

pub use scalar::ScalarReader;
pub use seq::{ArrayReader, MapReader, StringReader, VecReader};
pub use tuple::{
    TupleReader1, TupleReader2, TupleReader3, TupleReader4, TupleReader5, TupleReader6,
    TupleReader7, TupleReader8,
};

/// Serialization for one static shape.
///
/// `write` and `read` run on a blocking socket and either finish or fail.
/// The resumable path builds a fresh state with [`Codec::reader`], then
/// calls [`Codec::accum`] each time the socket becomes readable: it
/// consumes everything currently available and returns `Ok(true)` exactly
/// when the value is fully materialized in `out`.
pub trait Codec: Sized {
    /// True iff the in-memory layout of the value equals its wire layout,
    /// allowing whole runs of values to move as one bulk transfer.
    const CAN_MEMCPY: bool;

    /// Fixed wire footprint in bytes. Only meaningful when
    /// [`Codec::CAN_MEMCPY`] holds; composites report 0.
    const WIRE_SIZE: usize;

    /// Resumption state for one in-flight value.
    type Reader;

    /// The shape descriptor advertised for this type.
    fn descriptor() -> Desc;

    /// Write one value to a blocking sink.
    fn write<W: Write + ?Sized>(w: &mut W, value: &Self) -> Result<(), NetError>;

    /// Read one value from a blocking source, replacing `out`.
    fn read<R: Read + ?Sized>(r: &mut R, out: &mut Self) -> Result<(), NetError>;

    /// A fresh, prepared resumption state.
    fn reader() -> Self::Reader;

    /// Consume available bytes; `Ok(true)` iff `out` is now complete.
    fn accum<R: Read + ?Sized>(
        r: &mut R,
        state: &mut Self::Reader,
        out: &mut Self,
    ) -> Result<bool, NetError>;

    /// Write a contiguous run of values. Memcopyable codecs override this
    /// with a single bulk send.
    fn write_slice<W: Write + ?Sized>(w: &mut W, values: &[Self]) -> Result<(), NetError> {
        for value in values {
            Self::write(w, value)?;
        }
        Ok(())
    }

    /// Read a contiguous run of values. Memcopyable codecs override this
    /// with a single bulk receive.
    fn read_slice<R: Read + ?Sized>(r: &mut R, out: &mut [Self]) -> Result<(), NetError> {
        for value in out {
            Self::read(r, value)?;
        }
        Ok(())
    }
}

/// Reader that drives an underlying codec into a scratch value, for shapes
/// decoded *through* another shape (enumerations through their
/// representation, records through their field tuple).
pub struct ViaReader<U: Codec> {
    /// The underlying codec's resumption state.
    pub state: U::Reader,
    /// Scratch holding the partially- or fully-decoded underlying value.
    pub value: U,
}

impl<U: Codec + Default> ViaReader<U> {
    pub fn new() -> Self {
        Self {
            state: U::reader(),
            value: U::default(),
        }
    }
}

impl<U: Codec + Default> Default for ViaReader<U> {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a value to a byte vector. Handy for tests and for building
/// handshake declarations.
pub fn to_bytes<T: Codec>(value: &T) -> Result<Vec<u8>, NetError> {
    let mut out = Vec::new();
    T::write(&mut out, value)?;
    Ok(out)
}

/// Decode a value from a byte slice with the blocking read path.
pub fn from_bytes<T: Codec + Default>(bytes: &[u8]) -> Result<T, NetError> {
    let mut cur = std::io::Cursor::new(bytes);
    let mut out = T::default();
    T::read(&mut cur, &mut out)?;
    Ok(out)
}
