//! Codecs for tuples.
//!
//! A tuple is encoded as its fields in order, described as a record with
//! positional `.fN` names. The resumable reader is a tagged enum over the
//! per-field reader states: the active variant carries the in-flight
//! field's state, and completing a field moves to the next variant with a
//! freshly prepared child state.

use std::io::{Read, Write};

use remex_wire::{Desc, Field};

use crate::{Codec, NetError};

/// One step of a tuple reader: drive the active field, advance on
/// completion. Expands to an if-else chain so each state knows its
/// successor. Evaluates to `Ok(true)` when a state transition happened and
/// `Ok(false)` when the active field is still waiting for bytes.
macro_rules! tuple_step {
    ($r:ident, $state:ident, $out:ident, $reader:ident;
     $var:ident / $idx:tt / $ty:ident, $nvar:ident / $nidx:tt / $nty:ident
     $(, $rvar:ident / $ridx:tt / $rty:ident)*) => {
        if let $reader::$var(st) = &mut *$state {
            if <$ty as Codec>::accum($r, st, &mut $out.$idx)? {
                *$state = $reader::$nvar(<$nty as Codec>::reader());
                Ok::<bool, NetError>(true)
            } else {
                Ok(false)
            }
        } else {
            tuple_step!($r, $state, $out, $reader;
                $nvar / $nidx / $nty $(, $rvar / $ridx / $rty)*)
        }
    };
    ($r:ident, $state:ident, $out:ident, $reader:ident;
     $var:ident / $idx:tt / $ty:ident) => {
        if let $reader::$var(st) = &mut *$state {
            if <$ty as Codec>::accum($r, st, &mut $out.$idx)? {
                *$state = $reader::Done;
                Ok::<bool, NetError>(true)
            } else {
                Ok(false)
            }
        } else {
            Ok(false)
        }
    };
}

macro_rules! tuple_codec {
    ($reader:ident; $fvar:ident / $fidx:tt / $fty:ident
     $(, $var:ident / $idx:tt / $ty:ident)*) => {
        /// Resumable tuple reader: the variant is the field currently being
        /// read.
        pub enum $reader<$fty: Codec $(, $ty: Codec)*> {
            $fvar(<$fty as Codec>::Reader),
            $( $var(<$ty as Codec>::Reader), )*
            Done,
        }

        impl<$fty: Codec $(, $ty: Codec)*> Codec for ($fty, $($ty,)*) {
            const CAN_MEMCPY: bool = false;
            const WIRE_SIZE: usize = 0;
            type Reader = $reader<$fty $(, $ty)*>;

            fn descriptor() -> Desc {
                Desc::record(vec![
                    Field::positional(concat!(".f", $fidx), <$fty as Codec>::descriptor()),
                    $( Field::positional(concat!(".f", $idx), <$ty as Codec>::descriptor()), )*
                ])
            }

            fn write<W: Write + ?Sized>(w: &mut W, value: &Self) -> Result<(), NetError> {
                <$fty as Codec>::write(w, &value.$fidx)?;
                $( <$ty as Codec>::write(w, &value.$idx)?; )*
                Ok(())
            }

            fn read<R: Read + ?Sized>(r: &mut R, out: &mut Self) -> Result<(), NetError> {
                <$fty as Codec>::read(r, &mut out.$fidx)?;
                $( <$ty as Codec>::read(r, &mut out.$idx)?; )*
                Ok(())
            }

            fn reader() -> Self::Reader {
                $reader::$fvar(<$fty as Codec>::reader())
            }

            fn accum<R: Read + ?Sized>(
                r: &mut R,
                state: &mut Self::Reader,
                out: &mut Self,
            ) -> Result<bool, NetError> {
                loop {
                    if let $reader::Done = state {
                        return Ok(true);
                    }
                    let advanced = tuple_step!(r, state, out, $reader;
                        $fvar / $fidx / $fty $(, $var / $idx / $ty)*)?;
                    if !advanced {
                        return Ok(false);
                    }
                }
            }
        }
    };
}

tuple_codec!(TupleReader1; F0/0/A);
tuple_codec!(TupleReader2; F0/0/A, F1/1/B);
tuple_codec!(TupleReader3; F0/0/A, F1/1/B, F2/2/C);
tuple_codec!(TupleReader4; F0/0/A, F1/1/B, F2/2/C, F3/3/D);
tuple_codec!(TupleReader5; F0/0/A, F1/1/B, F2/2/C, F3/3/D, F4/4/E);
tuple_codec!(TupleReader6; F0/0/A, F1/1/B, F2/2/C, F3/3/D, F4/4/E, F5/5/F);
tuple_codec!(TupleReader7; F0/0/A, F1/1/B, F2/2/C, F3/3/D, F4/4/E, F5/5/F, F6/6/G);
tuple_codec!(TupleReader8; F0/0/A, F1/1/B, F2/2/C, F3/3/D, F4/4/E, F5/5/F, F6/6/G, F7/7/H);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_bytes, to_bytes};

    #[test]
    fn pair_concatenates_fields() {
        let bytes = to_bytes(&(0x01020304u32, 0x7fu8)).unwrap();
        assert_eq!(bytes, [0x04, 0x03, 0x02, 0x01, 0x7f]);
    }

    #[test]
    fn tuples_round_trip() {
        let one = (42i64,);
        assert_eq!(from_bytes::<(i64,)>(&to_bytes(&one).unwrap()).unwrap(), one);

        let seven = (1u8, 2i16, 3u32, 4i64, 5.0f32, true, -6i8);
        assert_eq!(
            from_bytes::<(u8, i16, u32, i64, f32, bool, i8)>(&to_bytes(&seven).unwrap()).unwrap(),
            seven
        );
    }

    #[test]
    fn tuple_descriptor_uses_positional_names() {
        let desc = <(u8, bool) as Codec>::descriptor();
        let Desc::Record(fields) = desc else {
            panic!("tuple must describe as a record");
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, ".f0");
        assert_eq!(fields[0].ordinal, -1);
        assert_eq!(fields[1].name, ".f1");
    }
}
