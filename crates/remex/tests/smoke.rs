//! End-to-end smoke test through the umbrella crate's public surface.

use remex::{net_client, wire_record, Codec};
use remex_testkit::TestPeer;

wire_record! {
    pub struct Point {
        pub x: f64,
        pub y: f64,
    }
}

net_client! {
    client Geometry {
        rpc midpoint(a: Point, b: Point) -> Point = "\\a b.mid(a, b)";
    }
}

#[test]
fn midpoint_over_a_real_socket() {
    let peer = TestPeer::builder()
        .handle(1, |sock| {
            let mut args = (Point::default(), Point::default());
            <(Point, Point) as Codec>::read(sock, &mut args)?;
            let (a, b) = args;
            let mid = Point {
                x: (a.x + b.x) / 2.0,
                y: (a.y + b.y) / 2.0,
            };
            <Point as Codec>::write(sock, &mid)
        })
        .spawn();

    let mut client = Geometry::connect("127.0.0.1", peer.port()).unwrap();
    let mid = client
        .midpoint(Point { x: 0.0, y: 2.0 }, Point { x: 4.0, y: 6.0 })
        .unwrap();
    assert_eq!(mid, Point { x: 2.0, y: 4.0 });
}
