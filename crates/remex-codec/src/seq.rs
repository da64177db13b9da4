//! Codecs for dynamic sequences, strings, fixed arrays, and maps.

use std::collections::BTreeMap;
use std::io::{Cursor, ErrorKind, Read, Write};
use std::mem;

use remex_stream::{recv_all, recv_some, send_all};
use remex_wire::Desc;

use crate::{Codec, NetError};

type LenReader = <usize as Codec>::Reader;

fn body_len<T: Codec>(n: usize) -> Result<usize, NetError> {
    n.checked_mul(T::WIRE_SIZE)
        .ok_or_else(|| NetError::Io(ErrorKind::InvalidData.into()))
}

/// Pull bytes into `buf[*filled..]` until full or blocked.
fn fill_bytes<R: Read + ?Sized>(
    r: &mut R,
    buf: &mut [u8],
    filled: &mut usize,
) -> Result<bool, NetError> {
    while *filled < buf.len() {
        let got = recv_some(r, &mut buf[*filled..])?;
        if got == 0 {
            return Ok(false);
        }
        *filled += got;
    }
    Ok(true)
}

/// Resumable reader for `Vec<T>`: length first, then either one bulk byte
/// run (memcopyable elements) or element-wise child states.
pub enum VecReader<T: Codec> {
    Len { st: LenReader, n: usize },
    Bulk { buf: Vec<u8>, filled: usize },
    Elems { idx: usize, st: T::Reader },
    Done,
}

impl<T: Codec + Default> Codec for Vec<T> {
    const CAN_MEMCPY: bool = false;
    const WIRE_SIZE: usize = 0;
    type Reader = VecReader<T>;

    fn descriptor() -> Desc {
        Desc::array(T::descriptor())
    }

    fn write<W: Write + ?Sized>(w: &mut W, value: &Self) -> Result<(), NetError> {
        <usize as Codec>::write(w, &value.len())?;
        T::write_slice(w, value)
    }

    fn read<R: Read + ?Sized>(r: &mut R, out: &mut Self) -> Result<(), NetError> {
        let mut n = 0usize;
        <usize as Codec>::read(r, &mut n)?;
        out.clear();
        out.resize_with(n, T::default);
        T::read_slice(r, out)
    }

    fn reader() -> Self::Reader {
        VecReader::Len {
            st: <usize as Codec>::reader(),
            n: 0,
        }
    }

    fn accum<R: Read + ?Sized>(
        r: &mut R,
        state: &mut Self::Reader,
        out: &mut Self,
    ) -> Result<bool, NetError> {
        loop {
            match state {
                VecReader::Len { st, n } => {
                    if !<usize as Codec>::accum(r, st, n)? {
                        return Ok(false);
                    }
                    let n = *n;
                    out.clear();
                    out.resize_with(n, T::default);
                    *state = if T::CAN_MEMCPY {
                        VecReader::Bulk {
                            buf: vec![0u8; body_len::<T>(n)?],
                            filled: 0,
                        }
                    } else {
                        VecReader::Elems {
                            idx: 0,
                            st: T::reader(),
                        }
                    };
                }
                VecReader::Bulk { buf, filled } => {
                    if !fill_bytes(r, buf, filled)? {
                        return Ok(false);
                    }
                    let buf = mem::take(buf);
                    *state = VecReader::Done;
                    T::read_slice(&mut Cursor::new(buf), out)?;
                    return Ok(true);
                }
                VecReader::Elems { idx, st } => {
                    while *idx < out.len() {
                        if !T::accum(r, st, &mut out[*idx])? {
                            return Ok(false);
                        }
                        *idx += 1;
                        *st = T::reader();
                    }
                    *state = VecReader::Done;
                    return Ok(true);
                }
                VecReader::Done => return Ok(true),
            }
        }
    }
}

/// Resumable reader for `String`: the memcopyable-vector reader plus a
/// UTF-8 check at completion.
pub enum StringReader {
    Len { st: LenReader, n: usize },
    Body { buf: Vec<u8>, filled: usize },
    Done,
}

impl Codec for String {
    const CAN_MEMCPY: bool = false;
    const WIRE_SIZE: usize = 0;
    type Reader = StringReader;

    fn descriptor() -> Desc {
        Desc::array(Desc::prim("char"))
    }

    fn write<W: Write + ?Sized>(w: &mut W, value: &Self) -> Result<(), NetError> {
        <usize as Codec>::write(w, &value.len())?;
        send_all(w, value.as_bytes())
    }

    fn read<R: Read + ?Sized>(r: &mut R, out: &mut Self) -> Result<(), NetError> {
        let mut n = 0usize;
        <usize as Codec>::read(r, &mut n)?;
        let mut buf = vec![0u8; n];
        recv_all(r, &mut buf)?;
        *out = into_string(buf)?;
        Ok(())
    }

    fn reader() -> Self::Reader {
        StringReader::Len {
            st: <usize as Codec>::reader(),
            n: 0,
        }
    }

    fn accum<R: Read + ?Sized>(
        r: &mut R,
        state: &mut Self::Reader,
        out: &mut Self,
    ) -> Result<bool, NetError> {
        loop {
            match state {
                StringReader::Len { st, n } => {
                    if !<usize as Codec>::accum(r, st, n)? {
                        return Ok(false);
                    }
                    let n = *n;
                    *state = StringReader::Body {
                        buf: vec![0u8; n],
                        filled: 0,
                    };
                }
                StringReader::Body { buf, filled } => {
                    if !fill_bytes(r, buf, filled)? {
                        return Ok(false);
                    }
                    let buf = mem::take(buf);
                    *state = StringReader::Done;
                    *out = into_string(buf)?;
                    return Ok(true);
                }
                StringReader::Done => return Ok(true),
            }
        }
    }
}

fn into_string(buf: Vec<u8>) -> Result<String, NetError> {
    String::from_utf8(buf).map_err(|_| {
        NetError::Io(std::io::Error::new(
            ErrorKind::InvalidData,
            "string payload is not valid UTF-8",
        ))
    })
}

/// Resumable reader for `[T; N]`: a byte counter when the element is
/// memcopyable, otherwise an element index plus the in-flight child state.
pub enum ArrayReader<T: Codec> {
    Bulk { buf: Vec<u8>, filled: usize },
    Elems { idx: usize, st: T::Reader },
    Done,
}

impl<T: Codec, const N: usize> Codec for [T; N] {
    const CAN_MEMCPY: bool = T::CAN_MEMCPY;
    const WIRE_SIZE: usize = N * T::WIRE_SIZE;
    type Reader = ArrayReader<T>;

    fn descriptor() -> Desc {
        Desc::fixed_array(T::descriptor(), N as u64)
    }

    fn write<W: Write + ?Sized>(w: &mut W, value: &Self) -> Result<(), NetError> {
        T::write_slice(w, value.as_slice())
    }

    fn read<R: Read + ?Sized>(r: &mut R, out: &mut Self) -> Result<(), NetError> {
        T::read_slice(r, out.as_mut_slice())
    }

    fn reader() -> Self::Reader {
        if T::CAN_MEMCPY {
            ArrayReader::Bulk {
                buf: vec![0u8; N * T::WIRE_SIZE],
                filled: 0,
            }
        } else {
            ArrayReader::Elems {
                idx: 0,
                st: T::reader(),
            }
        }
    }

    fn accum<R: Read + ?Sized>(
        r: &mut R,
        state: &mut Self::Reader,
        out: &mut Self,
    ) -> Result<bool, NetError> {
        match state {
            ArrayReader::Bulk { buf, filled } => {
                if !fill_bytes(r, buf, filled)? {
                    return Ok(false);
                }
                let buf = mem::take(buf);
                *state = ArrayReader::Done;
                T::read_slice(&mut Cursor::new(buf), out.as_mut_slice())?;
                Ok(true)
            }
            ArrayReader::Elems { idx, st } => {
                while *idx < N {
                    if !T::accum(r, st, &mut out[*idx])? {
                        return Ok(false);
                    }
                    *idx += 1;
                    *st = T::reader();
                }
                *state = ArrayReader::Done;
                Ok(true)
            }
            ArrayReader::Done => Ok(true),
        }
    }
}

enum MapPhase {
    Len,
    Key,
    Val,
}

/// Resumable reader for maps: a phase machine over length, key, and value,
/// with scratch storage for the entry being assembled.
pub struct MapReader<K: Codec + Default, V: Codec + Default> {
    phase: MapPhase,
    len_st: LenReader,
    remaining: usize,
    key_st: K::Reader,
    key: K,
    val_st: V::Reader,
    val: V,
}

impl<K, V> Codec for BTreeMap<K, V>
where
    K: Codec + Default + Ord,
    V: Codec + Default,
{
    const CAN_MEMCPY: bool = false;
    const WIRE_SIZE: usize = 0;
    type Reader = MapReader<K, V>;

    /// Maps share their descriptor and wire format with a sequence of
    /// key/value pairs.
    fn descriptor() -> Desc {
        <Vec<(K, V)> as Codec>::descriptor()
    }

    fn write<W: Write + ?Sized>(w: &mut W, value: &Self) -> Result<(), NetError> {
        <usize as Codec>::write(w, &value.len())?;
        for (k, v) in value {
            K::write(w, k)?;
            V::write(w, v)?;
        }
        Ok(())
    }

    fn read<R: Read + ?Sized>(r: &mut R, out: &mut Self) -> Result<(), NetError> {
        let mut n = 0usize;
        <usize as Codec>::read(r, &mut n)?;
        out.clear();
        for _ in 0..n {
            let mut k = K::default();
            K::read(r, &mut k)?;
            let mut v = V::default();
            V::read(r, &mut v)?;
            out.insert(k, v);
        }
        Ok(())
    }

    fn reader() -> Self::Reader {
        MapReader {
            phase: MapPhase::Len,
            len_st: <usize as Codec>::reader(),
            remaining: 0,
            key_st: K::reader(),
            key: K::default(),
            val_st: V::reader(),
            val: V::default(),
        }
    }

    fn accum<R: Read + ?Sized>(
        r: &mut R,
        state: &mut Self::Reader,
        out: &mut Self,
    ) -> Result<bool, NetError> {
        loop {
            match state.phase {
                MapPhase::Len => {
                    if !<usize as Codec>::accum(r, &mut state.len_st, &mut state.remaining)? {
                        return Ok(false);
                    }
                    out.clear();
                    state.phase = MapPhase::Key;
                }
                MapPhase::Key => {
                    if state.remaining == 0 {
                        return Ok(true);
                    }
                    if !K::accum(r, &mut state.key_st, &mut state.key)? {
                        return Ok(false);
                    }
                    state.phase = MapPhase::Val;
                }
                MapPhase::Val => {
                    if !V::accum(r, &mut state.val_st, &mut state.val)? {
                        return Ok(false);
                    }
                    out.insert(mem::take(&mut state.key), mem::take(&mut state.val));
                    state.remaining -= 1;
                    state.key_st = K::reader();
                    state.val_st = V::reader();
                    state.phase = MapPhase::Key;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_bytes, to_bytes};

    #[test]
    fn vec_is_length_prefixed() {
        let bytes = to_bytes(&vec![1u8, 2, 3]).unwrap();
        let mut expect = 3usize.to_le_bytes().to_vec();
        expect.extend_from_slice(&[1, 2, 3]);
        assert_eq!(bytes, expect);
    }

    #[test]
    fn vec_round_trips_at_boundary_sizes() {
        for n in [0usize, 1, 1024, 1 << 20] {
            let v: Vec<u8> = (0..n).map(|i| i as u8).collect();
            assert_eq!(from_bytes::<Vec<u8>>(&to_bytes(&v).unwrap()).unwrap(), v);
        }
    }

    #[test]
    fn nested_vec_round_trips() {
        let v = vec![vec![1u32, 2], vec![], vec![3]];
        assert_eq!(
            from_bytes::<Vec<Vec<u32>>>(&to_bytes(&v).unwrap()).unwrap(),
            v
        );
    }

    #[test]
    fn string_round_trips_with_embedded_nuls() {
        for s in ["", "x", "a\0b\0", "héllo"] {
            let s = s.to_string();
            assert_eq!(from_bytes::<String>(&to_bytes(&s).unwrap()).unwrap(), s);
        }
        let big = "m".repeat(1 << 20);
        assert_eq!(from_bytes::<String>(&to_bytes(&big).unwrap()).unwrap(), big);
    }

    #[test]
    fn string_rejects_invalid_utf8() {
        let mut bytes = 2usize.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        assert!(from_bytes::<String>(&bytes).is_err());
    }

    #[test]
    fn fixed_arrays_round_trip() {
        let empty: [u32; 0] = [];
        assert_eq!(
            from_bytes::<[u32; 0]>(&to_bytes(&empty).unwrap()).unwrap(),
            empty
        );
        let one = [7i64];
        assert_eq!(from_bytes::<[i64; 1]>(&to_bytes(&one).unwrap()).unwrap(), one);
        let eight = [1u16, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(
            from_bytes::<[u16; 8]>(&to_bytes(&eight).unwrap()).unwrap(),
            eight
        );
    }

    #[test]
    fn fixed_array_has_no_length_prefix() {
        let bytes = to_bytes(&[1u8, 2, 3, 4]).unwrap();
        assert_eq!(bytes, [1, 2, 3, 4]);
    }

    #[test]
    fn map_matches_vec_of_pairs_wire_format() {
        let mut m = BTreeMap::new();
        m.insert(1u8, 10u8);
        m.insert(2u8, 20u8);
        let as_pairs: Vec<(u8, u8)> = vec![(1, 10), (2, 20)];
        assert_eq!(to_bytes(&m).unwrap(), to_bytes(&as_pairs).unwrap());
        assert_eq!(
            <BTreeMap<u8, u8> as Codec>::descriptor(),
            <Vec<(u8, u8)> as Codec>::descriptor()
        );
    }

    #[test]
    fn map_round_trips() {
        let mut m = BTreeMap::new();
        for i in 0..1000u32 {
            m.insert(i, format!("v{i}"));
        }
        assert_eq!(
            from_bytes::<BTreeMap<u32, String>>(&to_bytes(&m).unwrap()).unwrap(),
            m
        );
        let empty: BTreeMap<u32, String> = BTreeMap::new();
        assert_eq!(
            from_bytes::<BTreeMap<u32, String>>(&to_bytes(&empty).unwrap()).unwrap(),
            empty
        );
    }
}
