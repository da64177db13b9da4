//! Synchronous calls against an in-process peer: value round-trips,
//! byte-level wire checks, unit results, and session breakage.

use std::sync::{Arc, Mutex};

use remex_codec::{to_bytes, Codec};
use remex_session::{net_client, SessionError};
use remex_stream::{recv_all, send_all, NetError};
use remex_testkit::TestPeer;

net_client! {
    client Arith {
        rpc echo_i32(n: i32) -> i32 = "\\x.x";
        rpc sum_pairs(ps: Vec<(i32, i32)>) -> i32 = "\\ps.sum(map(\\p.p.0+p.1, ps))";
        rpc note(msg: String) -> () = "putStrLn";
        rpc flaky(n: i32) -> i32 = "flaky";
    }
}

fn spawn_peer(echo_args: Arc<Mutex<Vec<u8>>>) -> TestPeer {
    TestPeer::builder()
        .handle(1, move |sock| {
            // Capture the argument bytes raw, then echo them back as the
            // reply so both directions are byte-checked.
            let mut raw = [0u8; 4];
            recv_all(sock, &mut raw)?;
            echo_args.lock().expect("arg log").extend_from_slice(&raw);
            send_all(sock, &raw)
        })
        .handle(2, |sock| {
            let mut args = (Vec::<(i32, i32)>::new(),);
            <(Vec<(i32, i32)>,) as Codec>::read(sock, &mut args)?;
            let total: i32 = args.0.iter().map(|(a, b)| a + b).sum();
            <i32 as Codec>::write(sock, &total)
        })
        .handle(3, |sock| {
            let mut args = (String::new(),);
            <(String,) as Codec>::read(sock, &mut args)?;
            // Unit result: nothing goes back on the wire.
            Ok(())
        })
        .handle(4, |sock| {
            let mut args = (0i32,);
            <(i32,) as Codec>::read(sock, &mut args)?;
            // Half a reply, then close the connection.
            send_all(sock, &[0x01, 0x02])?;
            Err(NetError::PeerClosed)
        })
        .spawn()
}

#[test]
fn echo_round_trips_and_matches_the_wire_format() {
    let echo_args = Arc::new(Mutex::new(Vec::new()));
    let peer = spawn_peer(Arc::clone(&echo_args));
    let mut client = Arith::connect("127.0.0.1", peer.port()).unwrap();

    assert_eq!(client.echo_i32(42).unwrap(), 42);
    assert_eq!(peer.invocations(), vec![1]);
    assert_eq!(echo_args.lock().unwrap().as_slice(), &[0x2A, 0x00, 0x00, 0x00]);
}

#[test]
fn sum_pairs_encodes_length_then_flat_ints() {
    let peer = spawn_peer(Arc::new(Mutex::new(Vec::new())));
    let mut client = Arith::connect("127.0.0.1", peer.port()).unwrap();

    let pairs = vec![(1, 2), (3, 4), (5, 6)];
    // One platform-sized length, then six four-byte ints.
    let encoded = to_bytes(&pairs).unwrap();
    assert_eq!(encoded.len(), std::mem::size_of::<usize>() + 6 * 4);

    assert_eq!(client.sum_pairs(pairs).unwrap(), 21);
}

#[test]
fn unit_results_skip_the_reply_read() {
    let peer = spawn_peer(Arc::new(Mutex::new(Vec::new())));
    let mut client = Arith::connect("127.0.0.1", peer.port()).unwrap();

    client.note("hello".to_string()).unwrap();
    // The session stays aligned for the next call.
    assert_eq!(client.echo_i32(7).unwrap(), 7);
    assert_eq!(peer.invocations(), vec![3, 1]);
}

#[test]
fn peer_close_mid_reply_breaks_the_session() {
    let peer = spawn_peer(Arc::new(Mutex::new(Vec::new())));
    let mut client = Arith::connect("127.0.0.1", peer.port()).unwrap();

    match client.flaky(9) {
        Err(SessionError::Net(NetError::PeerClosed)) => {}
        other => panic!("expected PeerClosed, got {other:?}"),
    }
    assert!(client.is_broken());

    match client.echo_i32(1) {
        Err(SessionError::Broken) => {}
        other => panic!("expected Broken, got {other:?}"),
    }

    // A reconnect runs the handshake again and revives the session.
    client.reconnect("127.0.0.1", peer.port()).unwrap();
    assert!(!client.is_broken());
    assert_eq!(client.echo_i32(5).unwrap(), 5);
}
