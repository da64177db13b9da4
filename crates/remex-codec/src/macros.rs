//! Declarative codec definitions for user types.
//!
//! These replace reflection metadata: declaring a type through one of the
//! macros emits the type itself together with its [`Codec`](crate::Codec)
//! implementation, so the shape on the wire is exactly the declaration
//! order.
//!
//! All payload and field types must implement `Codec + Default`.

/// Declare a reflective record: a struct whose wire format is the tuple of
/// its fields in declaration order and whose descriptor carries the field
/// names.
///
/// Supports up to eight fields (the tuple codec's widest arity).
///
/// ```ignore
/// wire_record! {
///     pub struct Point { x: f64, y: f64 }
/// }
/// ```
#[macro_export]
macro_rules! wire_record {
    ( $(#[$meta:meta])* $vis:vis struct $name:ident {
        $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $fty:ty ),+ $(,)?
    } ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Default)]
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field: $fty, )+
        }

        impl $crate::Codec for $name {
            const CAN_MEMCPY: bool = false;
            const WIRE_SIZE: usize = 0;
            type Reader = $crate::ViaReader<( $($fty,)+ )>;

            fn descriptor() -> $crate::Desc {
                $crate::Desc::record(::std::vec![
                    $( $crate::Field::positional(
                        stringify!($field),
                        <$fty as $crate::Codec>::descriptor(),
                    ), )+
                ])
            }

            fn write<W: ::std::io::Write + ?Sized>(
                w: &mut W,
                value: &Self,
            ) -> ::core::result::Result<(), $crate::NetError> {
                $( <$fty as $crate::Codec>::write(w, &value.$field)?; )+
                Ok(())
            }

            fn read<R: ::std::io::Read + ?Sized>(
                r: &mut R,
                out: &mut Self,
            ) -> ::core::result::Result<(), $crate::NetError> {
                $( <$fty as $crate::Codec>::read(r, &mut out.$field)?; )+
                Ok(())
            }

            fn reader() -> Self::Reader {
                $crate::ViaReader::new()
            }

            fn accum<R: ::std::io::Read + ?Sized>(
                r: &mut R,
                state: &mut Self::Reader,
                out: &mut Self,
            ) -> ::core::result::Result<bool, $crate::NetError> {
                if <( $($fty,)+ ) as $crate::Codec>::accum(r, &mut state.state, &mut state.value)? {
                    let ( $($field,)+ ) = ::core::mem::take(&mut state.value);
                    $( out.$field = $field; )+
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    };
}

/// Declare a tagged sum: an enum whose wire format is a `u32` tag followed
/// by the active constructor's payload. Every constructor carries exactly
/// one payload type (use a tuple for several values, `()` for none).
///
/// The second identifier names the generated resumable-reader enum, which
/// reserves the variant name `Tag`. By default the descriptor carries the
/// constructor names; `@positional` descriptors use `.f0, .f1, ...`
/// instead, with an identical wire shape.
///
/// ```ignore
/// wire_variant! {
///     pub enum Reply, reader ReplyReader {
///         Num(i32),
///         Text(String),
///         Nothing(()),
///     }
/// }
/// ```
#[macro_export]
macro_rules! wire_variant {
    ( $(#[$meta:meta])* $vis:vis enum $name:ident, reader $reader:ident {
        $fvar:ident($fty:ty) $(, $var:ident($ty:ty) )* $(,)?
    } ) => {
        $crate::wire_variant!(@impl named $(#[$meta])* $vis enum $name, reader $reader {
            $fvar($fty) $(, $var($ty))*
        });
    };
    ( @positional $(#[$meta:meta])* $vis:vis enum $name:ident, reader $reader:ident {
        $fvar:ident($fty:ty) $(, $var:ident($ty:ty) )* $(,)?
    } ) => {
        $crate::wire_variant!(@impl positional $(#[$meta])* $vis enum $name, reader $reader {
            $fvar($fty) $(, $var($ty))*
        });
    };
    ( @impl $mode:ident $(#[$meta:meta])* $vis:vis enum $name:ident, reader $reader:ident {
        $fvar:ident($fty:ty) $(, $var:ident($ty:ty) )*
    } ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis enum $name {
            $fvar($fty),
            $( $var($ty), )*
        }

        impl ::core::default::Default for $name {
            fn default() -> Self {
                $name::$fvar(::core::default::Default::default())
            }
        }

        /// Resumable reader: the tag first, then the active constructor's
        /// own reader.
        $vis enum $reader {
            Tag($crate::ViaReader<u32>),
            $fvar(<$fty as $crate::Codec>::Reader),
            $( $var(<$ty as $crate::Codec>::Reader), )*
        }

        impl $crate::Codec for $name {
            const CAN_MEMCPY: bool = false;
            const WIRE_SIZE: usize = 0;
            type Reader = $reader;

            fn descriptor() -> $crate::Desc {
                let mut ctors: ::std::vec::Vec<$crate::Ctor> = ::std::vec::Vec::new();
                $crate::wire_variant!(@ctor $mode ctors, $fvar, $fty);
                $( $crate::wire_variant!(@ctor $mode ctors, $var, $ty); )*
                $crate::Desc::variant(ctors)
            }

            fn write<W: ::std::io::Write + ?Sized>(
                w: &mut W,
                value: &Self,
            ) -> ::core::result::Result<(), $crate::NetError> {
                let mut tag: u32 = 0;
                if let $name::$fvar(payload) = value {
                    <u32 as $crate::Codec>::write(w, &tag)?;
                    return <$fty as $crate::Codec>::write(w, payload);
                }
                tag += 1;
                $(
                    if let $name::$var(payload) = value {
                        <u32 as $crate::Codec>::write(w, &tag)?;
                        return <$ty as $crate::Codec>::write(w, payload);
                    }
                    tag += 1;
                )*
                let _ = tag;
                unreachable!("constructor list is exhaustive")
            }

            fn read<R: ::std::io::Read + ?Sized>(
                r: &mut R,
                out: &mut Self,
            ) -> ::core::result::Result<(), $crate::NetError> {
                let mut tag = 0u32;
                <u32 as $crate::Codec>::read(r, &mut tag)?;
                let mut next: u32 = 0;
                if tag == next {
                    *out = $name::$fvar(::core::default::Default::default());
                    if let $name::$fvar(payload) = out {
                        return <$fty as $crate::Codec>::read(r, payload);
                    }
                }
                next += 1;
                $(
                    if tag == next {
                        *out = $name::$var(::core::default::Default::default());
                        if let $name::$var(payload) = out {
                            return <$ty as $crate::Codec>::read(r, payload);
                        }
                    }
                    next += 1;
                )*
                let _ = next;
                Err($crate::NetError::BadTag(tag))
            }

            fn reader() -> Self::Reader {
                $reader::Tag($crate::ViaReader::new())
            }

            fn accum<R: ::std::io::Read + ?Sized>(
                r: &mut R,
                state: &mut Self::Reader,
                out: &mut Self,
            ) -> ::core::result::Result<bool, $crate::NetError> {
                loop {
                    match state {
                        $reader::Tag(tr) => {
                            if !<u32 as $crate::Codec>::accum(r, &mut tr.state, &mut tr.value)? {
                                return Ok(false);
                            }
                            let tag = tr.value;
                            let mut matched = false;
                            let mut next: u32 = 0;
                            if tag == next {
                                *out = $name::$fvar(::core::default::Default::default());
                                *state = $reader::$fvar(<$fty as $crate::Codec>::reader());
                                matched = true;
                            }
                            next += 1;
                            $(
                                if !matched && tag == next {
                                    *out = $name::$var(::core::default::Default::default());
                                    *state = $reader::$var(<$ty as $crate::Codec>::reader());
                                    matched = true;
                                }
                                next += 1;
                            )*
                            let _ = next;
                            if !matched {
                                return Err($crate::NetError::BadTag(tag));
                            }
                        }
                        $reader::$fvar(st) => {
                            return match out {
                                $name::$fvar(payload) => {
                                    <$fty as $crate::Codec>::accum(r, st, payload)
                                }
                                _ => Ok(false),
                            };
                        }
                        $(
                            $reader::$var(st) => {
                                return match out {
                                    $name::$var(payload) => {
                                        <$ty as $crate::Codec>::accum(r, st, payload)
                                    }
                                    _ => Ok(false),
                                };
                            }
                        )*
                    }
                }
            }
        }
    };
    (@ctor named $acc:ident, $var:ident, $ty:ty) => {
        {
            let tag = $acc.len() as u32;
            $acc.push($crate::Ctor::new(
                stringify!($var),
                tag,
                <$ty as $crate::Codec>::descriptor(),
            ));
        }
    };
    (@ctor positional $acc:ident, $var:ident, $ty:ty) => {
        {
            let tag = $acc.len() as u32;
            $acc.push($crate::Ctor::new(
                ::std::format!(".f{tag}"),
                tag,
                <$ty as $crate::Codec>::descriptor(),
            ));
        }
    };
}

/// Declare an enumeration over an integer representation. Serialized as the
/// representation; decoding validates the constant.
///
/// ```ignore
/// wire_enum! {
///     pub enum Color: u32 { Red = 0, Green = 1, Blue = 2 }
/// }
/// ```
#[macro_export]
macro_rules! wire_enum {
    ( $(#[$meta:meta])* $vis:vis enum $name:ident : $rep:ty {
        $fvar:ident = $fval:expr $(, $var:ident = $val:expr )* $(,)?
    } ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        $vis enum $name {
            #[default]
            $fvar = $fval,
            $( $var = $val, )*
        }

        impl $crate::Codec for $name {
            const CAN_MEMCPY: bool = true;
            const WIRE_SIZE: usize = ::core::mem::size_of::<$rep>();
            type Reader = $crate::ViaReader<$rep>;

            fn descriptor() -> $crate::Desc {
                $crate::Desc::enumeration(
                    <$rep as $crate::Codec>::descriptor(),
                    ::std::vec![
                        $crate::EnumConst::new(stringify!($fvar), $fval as u64),
                        $( $crate::EnumConst::new(stringify!($var), $val as u64), )*
                    ],
                )
            }

            fn write<W: ::std::io::Write + ?Sized>(
                w: &mut W,
                value: &Self,
            ) -> ::core::result::Result<(), $crate::NetError> {
                <$rep as $crate::Codec>::write(w, &(*value as $rep))
            }

            fn read<R: ::std::io::Read + ?Sized>(
                r: &mut R,
                out: &mut Self,
            ) -> ::core::result::Result<(), $crate::NetError> {
                let mut raw: $rep = ::core::default::Default::default();
                <$rep as $crate::Codec>::read(r, &mut raw)?;
                *out = Self::__from_rep(raw)?;
                Ok(())
            }

            fn reader() -> Self::Reader {
                $crate::ViaReader::new()
            }

            fn accum<R: ::std::io::Read + ?Sized>(
                r: &mut R,
                state: &mut Self::Reader,
                out: &mut Self,
            ) -> ::core::result::Result<bool, $crate::NetError> {
                if <$rep as $crate::Codec>::accum(r, &mut state.state, &mut state.value)? {
                    *out = Self::__from_rep(state.value)?;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }

        impl $name {
            #[doc(hidden)]
            fn __from_rep(raw: $rep) -> ::core::result::Result<Self, $crate::NetError> {
                if raw == $fval as $rep {
                    return Ok($name::$fvar);
                }
                $(
                    if raw == $val as $rep {
                        return Ok($name::$var);
                    }
                )*
                Err($crate::NetError::BadTag(raw as u32))
            }
        }
    };
}

/// Declare an opaque alias: a newtype serialized exactly like its inner
/// shape, with a descriptor carrying the alias name.
///
/// ```ignore
/// wire_alias!(pub struct Millis(pub u64), "millis");
/// ```
#[macro_export]
macro_rules! wire_alias {
    ( $(#[$meta:meta])* $vis:vis struct $name:ident($fvis:vis $inner:ty), $alias:expr ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Default)]
        $vis struct $name($fvis $inner);

        impl $crate::Codec for $name {
            const CAN_MEMCPY: bool = <$inner as $crate::Codec>::CAN_MEMCPY;
            const WIRE_SIZE: usize = <$inner as $crate::Codec>::WIRE_SIZE;
            type Reader = <$inner as $crate::Codec>::Reader;

            fn descriptor() -> $crate::Desc {
                $crate::Desc::alias($alias, <$inner as $crate::Codec>::descriptor())
            }

            fn write<W: ::std::io::Write + ?Sized>(
                w: &mut W,
                value: &Self,
            ) -> ::core::result::Result<(), $crate::NetError> {
                <$inner as $crate::Codec>::write(w, &value.0)
            }

            fn read<R: ::std::io::Read + ?Sized>(
                r: &mut R,
                out: &mut Self,
            ) -> ::core::result::Result<(), $crate::NetError> {
                <$inner as $crate::Codec>::read(r, &mut out.0)
            }

            fn reader() -> Self::Reader {
                <$inner as $crate::Codec>::reader()
            }

            fn accum<R: ::std::io::Read + ?Sized>(
                r: &mut R,
                state: &mut Self::Reader,
                out: &mut Self,
            ) -> ::core::result::Result<bool, $crate::NetError> {
                <$inner as $crate::Codec>::accum(r, state, &mut out.0)
            }
        }
    };
}
