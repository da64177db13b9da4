//! Resumable-read equivalence: feeding an encoding through `accum` in
//! arbitrary chunks must produce the same value as the blocking read, must
//! report incomplete on every partial prefix, and must complete exactly
//! when the last byte arrives.

use std::collections::BTreeMap;
use std::fmt::Debug;

use remex_codec::{from_bytes, to_bytes, wire_record, wire_variant, Codec, NetError};
use remex_testkit::Trickle;

wire_variant! {
    pub enum Chunk, reader ChunkReader {
        A(u8),
        B(Vec<u8>),
        C(()),
    }
}

wire_record! {
    pub struct Sample {
        pub id: u64,
        pub name: String,
        pub series: Vec<f64>,
    }
}

/// Decode `bytes` by delivering at most `chunk` bytes per readable event.
fn resumable_decode<T: Codec + Default>(bytes: &[u8], chunk: usize) -> T {
    let mut src = Trickle::new(bytes, chunk);
    let mut state = T::reader();
    let mut out = T::default();
    loop {
        src.refill();
        if T::accum(&mut src, &mut state, &mut out).expect("accum") {
            assert!(src.is_drained(), "reader finished early");
            return out;
        }
        assert!(!src.is_drained(), "reader stalled with all bytes consumed");
    }
}

/// Byte-at-a-time feed, asserting the complete/incomplete verdict at every
/// step: false on every proper prefix, true exactly on the last byte.
fn assert_prefix_discipline<T: Codec + Default + PartialEq + Debug>(value: &T) {
    let bytes = to_bytes(value).expect("encode");
    if bytes.is_empty() {
        return;
    }
    let mut src = Trickle::new(&bytes, 1);
    let mut state = T::reader();
    let mut out = T::default();
    for i in 0..bytes.len() {
        src.refill();
        let done = T::accum(&mut src, &mut state, &mut out).expect("accum");
        assert_eq!(done, i == bytes.len() - 1, "verdict at byte {i}");
    }
    assert_eq!(&out, value);
}

fn assert_equivalent<T: Codec + Default + PartialEq + Debug>(value: &T) {
    let bytes = to_bytes(value).expect("encode");
    let blocking: T = from_bytes(&bytes).expect("blocking decode");
    assert_eq!(&blocking, value);
    for chunk in [1, 7, 999] {
        let resumed: T = resumable_decode(&bytes, chunk);
        assert_eq!(&resumed, value, "chunk size {chunk}");
    }
}

#[test]
fn scalars_and_tuples_resume() {
    assert_equivalent(&0xDEAD_BEEFu32);
    assert_equivalent(&(-1i64, 2u8, 3.5f64));
    assert_prefix_discipline(&0x0102_0304_0506_0708u64);
    assert_prefix_discipline(&(1u8, 2u16, 3u32));
}

#[test]
fn vectors_resume_in_bulk_and_element_wise_modes() {
    // Memcopyable element: the body is a single byte-counted run.
    assert_equivalent(&(0..1024u32).collect::<Vec<u32>>());
    assert_equivalent(&Vec::<u32>::new());
    // Composite element: the reader walks elements.
    assert_equivalent(&vec![vec![1u8, 2], vec![], vec![3, 4, 5]]);
    assert_prefix_discipline(&vec![1u16, 2, 3]);
}

#[test]
fn hundred_strings_survive_every_chunking() {
    let v: Vec<String> = (0..100)
        .map(|i| "x".repeat(i % 23) + &i.to_string())
        .collect();
    assert_equivalent(&v);
}

#[test]
fn strings_and_maps_resume() {
    assert_equivalent(&String::from("resumable"));
    assert_equivalent(&String::new());
    assert_prefix_discipline(&String::from("ab\0cd"));

    let mut m = BTreeMap::new();
    for i in 0..50u32 {
        m.insert(i, format!("value-{i}"));
    }
    assert_equivalent(&m);
    assert_equivalent(&BTreeMap::<u32, String>::new());
    assert_prefix_discipline(&{
        let mut m = BTreeMap::new();
        m.insert(1u8, 2u8);
        m
    });
}

#[test]
fn fixed_arrays_resume() {
    assert_equivalent(&[0u8; 0]);
    assert_equivalent(&[123i64]);
    assert_equivalent(&[1u16, 2, 3, 4, 5, 6, 7, 8]);
    assert_equivalent(&[String::from("a"), String::from("bb")]);
    assert_prefix_discipline(&[7u32, 8, 9]);
}

#[test]
fn sums_resume_including_empty_and_large_payloads() {
    assert_equivalent(&Chunk::A(42));
    assert_equivalent(&Chunk::C(()));
    assert_equivalent(&Chunk::B(Vec::new()));
    assert_equivalent(&Chunk::B(vec![0xAA; 65536]));
    assert_prefix_discipline(&Chunk::B(vec![1, 2, 3]));
}

#[test]
fn records_resume() {
    let sample = Sample {
        id: 7,
        name: "sensor".into(),
        series: vec![1.0, -2.0, 3.25],
    };
    assert_equivalent(&sample);
    assert_prefix_discipline(&sample);
}

#[test]
fn peer_close_mid_value_surfaces_on_the_next_tick() {
    let bytes = to_bytes(&(0..100u32).collect::<Vec<u32>>()).unwrap();
    // A plain cursor reports EOF (orderly close) once its bytes run out.
    let mut src = std::io::Cursor::new(&bytes[..bytes.len() / 2]);
    let mut state = <Vec<u32> as Codec>::reader();
    let mut out = Vec::new();
    match <Vec<u32> as Codec>::accum(&mut src, &mut state, &mut out) {
        Err(NetError::PeerClosed) => {}
        other => panic!("expected PeerClosed, got {other:?}"),
    }
}

#[test]
fn blocking_read_reports_peer_close_mid_value() {
    let bytes = to_bytes(&String::from("truncate me")).unwrap();
    let err = from_bytes::<String>(&bytes[..bytes.len() - 3]).unwrap_err();
    assert!(matches!(err, NetError::PeerClosed));
}
