//! Handshake behavior against an in-process peer: declaration order and
//! ids, structural descriptor checks, and rejection semantics.

use remex_codec::Codec;
use remex_session::{net_client, SessionError};
use remex_testkit::TestPeer;
use remex_wire::Desc;

net_client! {
    client Trio {
        rpc first(x: i32) -> i32 = "f1";
        rpc second(s: String) -> i32 = "f2";
        rpc third(b: bool) -> bool = "f3";
    }
}

#[test]
fn declarations_go_out_in_order_with_ids_from_one() {
    let peer = TestPeer::builder().spawn();
    let _client = Trio::connect("127.0.0.1", peer.port()).unwrap();

    let decls = peer.declarations();
    assert_eq!(decls.len(), 3);
    assert_eq!(
        decls.iter().map(|d| d.id).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(
        decls.iter().map(|d| d.expr.as_str()).collect::<Vec<_>>(),
        vec!["f1", "f2", "f3"]
    );
}

#[test]
fn advertised_descriptors_decode_to_the_static_shapes() {
    let peer = TestPeer::builder().spawn();
    let _client = Trio::connect("127.0.0.1", peer.port()).unwrap();

    let decls = peer.declarations();
    assert_eq!(
        Desc::decode(&decls[0].in_type).unwrap(),
        <(i32,) as Codec>::descriptor()
    );
    assert_eq!(
        Desc::decode(&decls[1].in_type).unwrap(),
        <(String,) as Codec>::descriptor()
    );
    assert_eq!(
        Desc::decode(&decls[2].out_type).unwrap(),
        <bool as Codec>::descriptor()
    );
}

#[test]
fn rejection_carries_context_and_stops_the_handshake() {
    let peer = TestPeer::builder()
        .policy(|decl| {
            if decl.id == 2 {
                Err("type mismatch".to_string())
            } else {
                Ok(())
            }
        })
        .spawn();

    match Trio::connect("127.0.0.1", peer.port()) {
        Err(SessionError::Rejected { id, expr, message }) => {
            assert_eq!(id, 2);
            assert_eq!(expr, "f2");
            assert_eq!(message, "type mismatch");
        }
        other => panic!("expected rejection, got {:?}", other.err()),
    }

    // The third declaration was never written: the peer saw exactly two.
    let decls = peer.declarations();
    assert_eq!(decls.len(), 2);
    assert_eq!(
        decls.iter().map(|d| d.id).collect::<Vec<_>>(),
        vec![1, 2]
    );
}
