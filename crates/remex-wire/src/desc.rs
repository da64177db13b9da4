//! The type descriptor tree and its canonical byte encoding.
//!
//! Descriptors describe the serialized shape of a value: primitives, fixed
//! and dynamic arrays, records, sums, enumerations, and named aliases. The
//! byte encoding is used only during the handshake, where each RPC
//! declaration advertises its argument-tuple and result shapes; values
//! themselves never carry descriptors.
//!
//! Encoding: one tag byte per node, then the node payload. Strings are
//! length-prefixed with a platform-sized little-endian count, matching the
//! framing the value codec uses for dynamic sequences.

use std::fmt;

const TAG_PRIM: u8 = 0x00;
const TAG_ALIAS: u8 = 0x01;
const TAG_ARRAY: u8 = 0x02;
const TAG_FIXED_ARRAY: u8 = 0x03;
const TAG_RECORD: u8 = 0x04;
const TAG_VARIANT: u8 = 0x05;
const TAG_ENUM: u8 = 0x06;

/// Shape of a serialized value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Desc {
    /// A primitive, named `bool`, `byte`, `char`, `short`, `int`, `long`,
    /// `float`, `double`, or `unit`.
    Prim(String),
    /// An opaque alias: a distinct name over an underlying shape.
    Alias(String, Box<Desc>),
    /// A dynamic sequence of one element shape.
    Array(Box<Desc>),
    /// A fixed-length sequence of one element shape.
    FixedArray(Box<Desc>, u64),
    /// An ordered list of named fields. Tuples are records whose field
    /// names are `.f0, .f1, ...` with ordinal -1.
    Record(Vec<Field>),
    /// A tagged sum with ordered constructors.
    Variant(Vec<Ctor>),
    /// An enumeration over an underlying representation shape.
    Enum(Box<Desc>, Vec<EnumConst>),
}

/// One field of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ordinal: i32,
    pub desc: Desc,
}

/// One constructor of a sum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ctor {
    pub name: String,
    pub tag: u32,
    pub desc: Desc,
}

/// One named constant of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConst {
    pub name: String,
    pub value: u64,
}

impl Field {
    pub fn new(name: impl Into<String>, ordinal: i32, desc: Desc) -> Self {
        Self {
            name: name.into(),
            ordinal,
            desc,
        }
    }

    /// A field with no stable ordinal (records and tuples both use -1).
    pub fn positional(name: impl Into<String>, desc: Desc) -> Self {
        Self::new(name, -1, desc)
    }
}

impl Ctor {
    pub fn new(name: impl Into<String>, tag: u32, desc: Desc) -> Self {
        Self {
            name: name.into(),
            tag,
            desc,
        }
    }
}

impl EnumConst {
    pub fn new(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl Desc {
    pub fn prim(name: impl Into<String>) -> Self {
        Desc::Prim(name.into())
    }

    pub fn alias(name: impl Into<String>, inner: Desc) -> Self {
        Desc::Alias(name.into(), Box::new(inner))
    }

    pub fn array(elem: Desc) -> Self {
        Desc::Array(Box::new(elem))
    }

    pub fn fixed_array(elem: Desc, len: u64) -> Self {
        Desc::FixedArray(Box::new(elem), len)
    }

    pub fn record(fields: Vec<Field>) -> Self {
        Desc::Record(fields)
    }

    pub fn variant(ctors: Vec<Ctor>) -> Self {
        Desc::Variant(ctors)
    }

    pub fn enumeration(rep: Desc, consts: Vec<EnumConst>) -> Self {
        Desc::Enum(Box::new(rep), consts)
    }

    /// Canonical byte encoding, as advertised during the handshake.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Desc::Prim(name) => {
                out.push(TAG_PRIM);
                put_str(out, name);
            }
            Desc::Alias(name, inner) => {
                out.push(TAG_ALIAS);
                put_str(out, name);
                inner.encode_into(out);
            }
            Desc::Array(elem) => {
                out.push(TAG_ARRAY);
                elem.encode_into(out);
            }
            Desc::FixedArray(elem, len) => {
                out.push(TAG_FIXED_ARRAY);
                out.extend_from_slice(&len.to_le_bytes());
                elem.encode_into(out);
            }
            Desc::Record(fields) => {
                out.push(TAG_RECORD);
                put_len(out, fields.len());
                for f in fields {
                    put_str(out, &f.name);
                    out.extend_from_slice(&f.ordinal.to_le_bytes());
                    f.desc.encode_into(out);
                }
            }
            Desc::Variant(ctors) => {
                out.push(TAG_VARIANT);
                put_len(out, ctors.len());
                for c in ctors {
                    put_str(out, &c.name);
                    out.extend_from_slice(&c.tag.to_le_bytes());
                    c.desc.encode_into(out);
                }
            }
            Desc::Enum(rep, consts) => {
                out.push(TAG_ENUM);
                rep.encode_into(out);
                put_len(out, consts.len());
                for c in consts {
                    put_str(out, &c.name);
                    out.extend_from_slice(&c.value.to_le_bytes());
                }
            }
        }
    }

    /// Decode a canonical encoding. The whole input must be consumed.
    pub fn decode(bytes: &[u8]) -> Result<Desc, DescError> {
        let mut cur = Cursor { buf: bytes, pos: 0 };
        let desc = cur.desc()?;
        if cur.pos != bytes.len() {
            return Err(DescError::TrailingBytes);
        }
        Ok(desc)
    }
}

impl fmt::Display for Desc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Desc::Prim(name) => write!(f, "{name}"),
            Desc::Alias(name, inner) => write!(f, "{name}={inner}"),
            Desc::Array(elem) => write!(f, "[{elem}]"),
            Desc::FixedArray(elem, len) => write!(f, "[{elem};{len}]"),
            Desc::Record(fields) => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", field.name, field.desc)?;
                }
                write!(f, "}}")
            }
            Desc::Variant(ctors) => {
                write!(f, "<")?;
                for (i, ctor) in ctors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{}:{}", ctor.name, ctor.desc)?;
                }
                write!(f, ">")
            }
            Desc::Enum(rep, _) => write!(f, "enum({rep})"),
        }
    }
}

/// Failure while decoding a canonical descriptor encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescError {
    /// Input ended inside a node.
    Truncated,
    /// Unknown node tag byte.
    BadTag(u8),
    /// A name was not valid UTF-8.
    BadUtf8,
    /// Input continued past the root node.
    TrailingBytes,
}

impl fmt::Display for DescError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescError::Truncated => write!(f, "descriptor encoding is truncated"),
            DescError::BadTag(t) => write!(f, "unknown descriptor tag: {t:#04x}"),
            DescError::BadUtf8 => write!(f, "descriptor name is not valid UTF-8"),
            DescError::TrailingBytes => write!(f, "trailing bytes after descriptor"),
        }
    }
}

impl std::error::Error for DescError {}

fn put_len(out: &mut Vec<u8>, n: usize) {
    out.extend_from_slice(&n.to_le_bytes());
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    put_len(out, s.len());
    out.extend_from_slice(s.as_bytes());
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8], DescError> {
        if self.buf.len() - self.pos < n {
            return Err(DescError::Truncated);
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn byte(&mut self) -> Result<u8, DescError> {
        Ok(self.take(1)?[0])
    }

    fn len(&mut self) -> Result<usize, DescError> {
        let mut raw = [0u8; std::mem::size_of::<usize>()];
        let n = raw.len();
        raw.copy_from_slice(self.take(n)?);
        Ok(usize::from_le_bytes(raw))
    }

    fn u32(&mut self) -> Result<u32, DescError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn i32(&mut self) -> Result<i32, DescError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(i32::from_le_bytes(raw))
    }

    fn u64(&mut self) -> Result<u64, DescError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(raw))
    }

    fn string(&mut self) -> Result<String, DescError> {
        let n = self.len()?;
        let raw = self.take(n)?;
        String::from_utf8(raw.to_vec()).map_err(|_| DescError::BadUtf8)
    }

    fn desc(&mut self) -> Result<Desc, DescError> {
        match self.byte()? {
            TAG_PRIM => Ok(Desc::Prim(self.string()?)),
            TAG_ALIAS => {
                let name = self.string()?;
                let inner = self.desc()?;
                Ok(Desc::alias(name, inner))
            }
            TAG_ARRAY => Ok(Desc::array(self.desc()?)),
            TAG_FIXED_ARRAY => {
                let len = self.u64()?;
                let elem = self.desc()?;
                Ok(Desc::fixed_array(elem, len))
            }
            TAG_RECORD => {
                let n = self.len()?;
                let mut fields = Vec::with_capacity(n.min(64));
                for _ in 0..n {
                    let name = self.string()?;
                    let ordinal = self.i32()?;
                    let desc = self.desc()?;
                    fields.push(Field::new(name, ordinal, desc));
                }
                Ok(Desc::Record(fields))
            }
            TAG_VARIANT => {
                let n = self.len()?;
                let mut ctors = Vec::with_capacity(n.min(64));
                for _ in 0..n {
                    let name = self.string()?;
                    let tag = self.u32()?;
                    let desc = self.desc()?;
                    ctors.push(Ctor::new(name, tag, desc));
                }
                Ok(Desc::Variant(ctors))
            }
            TAG_ENUM => {
                let rep = self.desc()?;
                let n = self.len()?;
                let mut consts = Vec::with_capacity(n.min(64));
                for _ in 0..n {
                    let name = self.string()?;
                    let value = self.u64()?;
                    consts.push(EnumConst::new(name, value));
                }
                Ok(Desc::enumeration(rep, consts))
            }
            other => Err(DescError::BadTag(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(desc: &Desc) {
        let bytes = desc.encode();
        let back = Desc::decode(&bytes).expect("decode");
        assert_eq!(&back, desc);
    }

    #[test]
    fn primitives_round_trip() {
        for name in ["bool", "byte", "char", "short", "int", "long", "float", "double", "unit"] {
            round_trip(&Desc::prim(name));
        }
    }

    #[test]
    fn nested_composites_round_trip() {
        let desc = Desc::record(vec![
            Field::positional(".f0", Desc::array(Desc::prim("int"))),
            Field::positional(
                ".f1",
                Desc::variant(vec![
                    Ctor::new("Ok", 0, Desc::prim("long")),
                    Ctor::new("Err", 1, Desc::array(Desc::prim("char"))),
                ]),
            ),
            Field::positional(".f2", Desc::fixed_array(Desc::prim("double"), 8)),
        ]);
        round_trip(&desc);
    }

    #[test]
    fn alias_and_enum_round_trip() {
        round_trip(&Desc::alias("userId", Desc::prim("long")));
        round_trip(&Desc::enumeration(
            Desc::prim("int"),
            vec![EnumConst::new("Red", 0), EnumConst::new("Green", 1)],
        ));
    }

    #[test]
    fn truncated_input_is_rejected() {
        let bytes = Desc::array(Desc::prim("int")).encode();
        assert_eq!(
            Desc::decode(&bytes[..bytes.len() - 1]),
            Err(DescError::Truncated)
        );
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = Desc::prim("int").encode();
        bytes.push(0);
        assert_eq!(Desc::decode(&bytes), Err(DescError::TrailingBytes));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(Desc::decode(&[0xff]), Err(DescError::BadTag(0xff)));
    }
}
