//! Codecs for primitive scalars and unit.

use std::io::{Read, Write};
use std::mem;

use remex_stream::{recv_all, recv_some, send_all};
use remex_wire::Desc;

use crate::{Codec, NetError};

/// Resumable reader for a fixed-width scalar: a byte counter over a small
/// scratch buffer.
pub struct ScalarReader<const N: usize> {
    pub(crate) buf: [u8; N],
    filled: usize,
}

impl<const N: usize> ScalarReader<N> {
    pub(crate) fn new() -> Self {
        Self {
            buf: [0; N],
            filled: 0,
        }
    }

    /// Pull available bytes until the scratch is full or the socket blocks.
    pub(crate) fn fill<R: Read + ?Sized>(&mut self, r: &mut R) -> Result<bool, NetError> {
        while self.filled < N {
            let got = recv_some(r, &mut self.buf[self.filled..])?;
            if got == 0 {
                return Ok(false);
            }
            self.filled += got;
        }
        Ok(true)
    }
}

macro_rules! scalar_codec {
    ($ty:ty, $prim:expr) => {
        impl Codec for $ty {
            const CAN_MEMCPY: bool = true;
            const WIRE_SIZE: usize = mem::size_of::<$ty>();
            type Reader = ScalarReader<{ mem::size_of::<$ty>() }>;

            fn descriptor() -> Desc {
                Desc::prim($prim)
            }

            fn write<W: Write + ?Sized>(w: &mut W, value: &Self) -> Result<(), NetError> {
                send_all(w, &value.to_le_bytes())
            }

            fn read<R: Read + ?Sized>(r: &mut R, out: &mut Self) -> Result<(), NetError> {
                let mut raw = [0u8; mem::size_of::<$ty>()];
                recv_all(r, &mut raw)?;
                *out = <$ty>::from_le_bytes(raw);
                Ok(())
            }

            fn reader() -> Self::Reader {
                ScalarReader::new()
            }

            fn accum<R: Read + ?Sized>(
                r: &mut R,
                state: &mut Self::Reader,
                out: &mut Self,
            ) -> Result<bool, NetError> {
                if state.fill(r)? {
                    *out = <$ty>::from_le_bytes(state.buf);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }

            fn write_slice<W: Write + ?Sized>(w: &mut W, values: &[Self]) -> Result<(), NetError> {
                let mut buf = Vec::with_capacity(values.len() * mem::size_of::<$ty>());
                for value in values {
                    buf.extend_from_slice(&value.to_le_bytes());
                }
                send_all(w, &buf)
            }

            fn read_slice<R: Read + ?Sized>(r: &mut R, out: &mut [Self]) -> Result<(), NetError> {
                let mut buf = vec![0u8; out.len() * mem::size_of::<$ty>()];
                recv_all(r, &mut buf)?;
                for (value, raw) in out.iter_mut().zip(buf.chunks_exact(mem::size_of::<$ty>())) {
                    let mut fixed = [0u8; mem::size_of::<$ty>()];
                    fixed.copy_from_slice(raw);
                    *value = <$ty>::from_le_bytes(fixed);
                }
                Ok(())
            }
        }
    };
}

scalar_codec!(u8, "byte");
scalar_codec!(i8, "char");
scalar_codec!(i16, "short");
scalar_codec!(u16, "short");
scalar_codec!(i32, "int");
scalar_codec!(u32, "int");
scalar_codec!(i64, "long");
scalar_codec!(u64, "long");
scalar_codec!(usize, "long");
scalar_codec!(f32, "float");
scalar_codec!(f64, "double");

impl Codec for bool {
    const CAN_MEMCPY: bool = true;
    const WIRE_SIZE: usize = 1;
    type Reader = ScalarReader<1>;

    fn descriptor() -> Desc {
        Desc::prim("bool")
    }

    fn write<W: Write + ?Sized>(w: &mut W, value: &Self) -> Result<(), NetError> {
        send_all(w, &[*value as u8])
    }

    fn read<R: Read + ?Sized>(r: &mut R, out: &mut Self) -> Result<(), NetError> {
        let mut raw = [0u8; 1];
        recv_all(r, &mut raw)?;
        *out = raw[0] != 0;
        Ok(())
    }

    fn reader() -> Self::Reader {
        ScalarReader::new()
    }

    fn accum<R: Read + ?Sized>(
        r: &mut R,
        state: &mut Self::Reader,
        out: &mut Self,
    ) -> Result<bool, NetError> {
        if state.fill(r)? {
            *out = state.buf[0] != 0;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn write_slice<W: Write + ?Sized>(w: &mut W, values: &[Self]) -> Result<(), NetError> {
        let buf: Vec<u8> = values.iter().map(|b| *b as u8).collect();
        send_all(w, &buf)
    }

    fn read_slice<R: Read + ?Sized>(r: &mut R, out: &mut [Self]) -> Result<(), NetError> {
        let mut buf = vec![0u8; out.len()];
        recv_all(r, &mut buf)?;
        for (value, raw) in out.iter_mut().zip(buf.iter()) {
            *value = *raw != 0;
        }
        Ok(())
    }
}

/// Unit occupies zero bytes on the wire. Nothing to copy, so it is not
/// memcopyable despite being trivially "complete".
impl Codec for () {
    const CAN_MEMCPY: bool = false;
    const WIRE_SIZE: usize = 0;
    type Reader = ();

    fn descriptor() -> Desc {
        Desc::prim("unit")
    }

    fn write<W: Write + ?Sized>(_w: &mut W, _value: &Self) -> Result<(), NetError> {
        Ok(())
    }

    fn read<R: Read + ?Sized>(_r: &mut R, _out: &mut Self) -> Result<(), NetError> {
        Ok(())
    }

    fn reader() -> Self::Reader {}

    fn accum<R: Read + ?Sized>(
        _r: &mut R,
        _state: &mut Self::Reader,
        _out: &mut Self,
    ) -> Result<bool, NetError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_bytes, to_bytes};

    #[test]
    fn scalars_are_little_endian() {
        assert_eq!(to_bytes(&0x0102_0304u32).unwrap(), [0x04, 0x03, 0x02, 0x01]);
        assert_eq!(to_bytes(&1i16).unwrap(), [0x01, 0x00]);
    }

    #[test]
    fn boundary_values_round_trip() {
        for v in [i32::MIN, -1, 0, 1, i32::MAX] {
            assert_eq!(from_bytes::<i32>(&to_bytes(&v).unwrap()).unwrap(), v);
        }
        for v in [u64::MIN, u64::MAX] {
            assert_eq!(from_bytes::<u64>(&to_bytes(&v).unwrap()).unwrap(), v);
        }
        for v in [f64::MIN, 0.0, f64::MAX] {
            assert_eq!(from_bytes::<f64>(&to_bytes(&v).unwrap()).unwrap(), v);
        }
    }

    #[test]
    fn bool_decodes_any_nonzero_as_true() {
        assert!(from_bytes::<bool>(&[0x02]).unwrap());
        assert!(!from_bytes::<bool>(&[0x00]).unwrap());
    }

    #[test]
    fn unit_occupies_no_bytes() {
        assert!(to_bytes(&()).unwrap().is_empty());
        from_bytes::<()>(&[]).unwrap();
    }

    /// Yields its bytes, then would-block instead of reporting EOF.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.0.is_empty() {
                return Err(std::io::ErrorKind::WouldBlock.into());
            }
            let n = buf.len().min(self.0.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn scalar_reader_is_a_byte_counter() {
        let bytes = to_bytes(&0xAABB_CCDDu32).unwrap();
        let mut state = <u32 as Codec>::reader();
        let mut out = 0u32;
        for (i, b) in bytes.iter().enumerate() {
            let mut src = Trickle(std::slice::from_ref(b));
            let done = <u32 as Codec>::accum(&mut src, &mut state, &mut out).unwrap();
            assert_eq!(done, i == bytes.len() - 1);
        }
        assert_eq!(out, 0xAABB_CCDD);
    }
}
