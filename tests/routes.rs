// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! End-to-end scenarios driving the public API over inline XML fixtures.

use railroute::coords::LonLat;
use railroute::osm::ingest::Source;
use railroute::{geomath, FindRouteResult, RailRouter, RouteStatus};

fn router_from(xml: &str) -> RailRouter {
    let mut router = RailRouter::new();
    router
        .parse(&Source::Buffer(xml.as_bytes().to_vec()))
        .expect("fixture parses");
    router
}

fn ids(result: &FindRouteResult) -> Vec<i64> {
    result.route_nodes.iter().map(|n| n.id).collect()
}

/// One milli-degree of arc along the equator, in meters.
const MILLIDEG: f64 = 111.319_490_793;

/// A single straight way with stops at both ends and a plain node in
/// between. The ways come before the nodes on purpose: the two passes
/// make document order irrelevant.
const LINEAR: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<osm version="0.6" generator="test">
  <way id="10">
    <nd ref="1"/>
    <nd ref="2"/>
    <nd ref="3"/>
    <tag k="railway" v="rail"/>
  </way>
  <node id="1" lat="0" lon="0">
    <tag k="railway" v="station"/>
    <tag k="name" v="Alpha"/>
  </node>
  <node id="2" lat="0" lon="0.001"/>
  <node id="3" lat="0" lon="0.002">
    <tag k="railway" v="station"/>
    <tag k="name" v="Beta"/>
    <tag k="alt_name" v="Beta Central"/>
  </node>
  <relation id="20">
    <member type="way" ref="10" role="main"/>
    <tag k="type" v="route"/>
  </relation>
</osm>
"#;

#[test]
fn linear_chain() {
    let router = router_from(LINEAR);
    let result = router.find_route("Alpha", "Beta");

    assert_eq!(result.status, RouteStatus::Ok);
    assert!(result.is_ok());
    assert_eq!((result.start_count, result.end_count), (1, 1));
    assert_eq!(result.start_node.unwrap().id, 1);
    assert_eq!(result.end_node.unwrap().id, 3);
    assert!((result.distance - 2.0 * MILLIDEG).abs() < 1e-3, "got {}", result.distance);
    assert_eq!(ids(&result), vec![1, 2, 3]);
    assert!(result.sharp_turns.is_empty());
}

#[test]
fn linear_chain_reversed() {
    let router = router_from(LINEAR);
    let result = router.find_route("Beta", "Alpha");

    assert_eq!(result.status, RouteStatus::Ok);
    assert_eq!(ids(&result), vec![3, 2, 1]);
    assert!((result.distance - 2.0 * MILLIDEG).abs() < 1e-3);
}

#[test]
fn alternate_names_resolve() {
    let router = router_from(LINEAR);
    let result = router.find_route("Alpha", "Beta Central");
    assert_eq!(result.status, RouteStatus::Ok);
    assert_eq!(result.end_node.unwrap().id, 3);
}

#[test]
fn queries_do_not_interfere() {
    let router = router_from(LINEAR);
    let first = router.find_route("Alpha", "Beta").distance;
    for _ in 0..3 {
        assert_eq!(router.find_route("Alpha", "Beta").distance, first);
    }
}

#[test]
fn missing_stations() {
    let router = router_from(LINEAR);

    let result = router.find_route("Alpha", "Zulu");
    assert_eq!(result.status, RouteStatus::EndStationNotFound);
    assert_eq!((result.start_count, result.end_count), (1, 0));
    assert!(result.route_nodes.is_empty());

    let result = router.find_route("Zulu", "Alpha");
    assert_eq!(result.status, RouteStatus::StartStationNotFound);

    let result = router.find_route("Xray", "Zulu");
    assert_eq!(result.status, RouteStatus::BothStationsNotFound);
    assert_eq!((result.start_count, result.end_count), (0, 0));
}

/// LINEAR with the way marked one-way in the forward direction.
const ONEWAY: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<osm version="0.6" generator="test">
  <node id="1" lat="0" lon="0">
    <tag k="railway" v="station"/>
    <tag k="name" v="Alpha"/>
  </node>
  <node id="2" lat="0" lon="0.001"/>
  <node id="3" lat="0" lon="0.002">
    <tag k="railway" v="station"/>
    <tag k="name" v="Beta"/>
  </node>
  <way id="10">
    <nd ref="1"/>
    <nd ref="2"/>
    <nd ref="3"/>
    <tag k="railway" v="rail"/>
    <tag k="oneway" v="yes"/>
  </way>
</osm>
"#;

#[test]
fn oneway_routes_forward_only() {
    let router = router_from(ONEWAY);

    let forward = router.find_route("Alpha", "Beta");
    assert_eq!(forward.status, RouteStatus::Ok);
    assert_eq!(ids(&forward), vec![1, 2, 3]);

    let backward = router.find_route("Beta", "Alpha");
    assert_eq!(backward.status, RouteStatus::NoRouteFound);
    assert_eq!((backward.start_count, backward.end_count), (1, 1));
}

#[test]
fn designated_direction_backward_flips_the_way() {
    let fixture = ONEWAY.replace(
        "<tag k=\"oneway\" v=\"yes\"/>",
        "<tag k=\"designated_direction\" v=\"backward\"/>",
    );
    let router = router_from(&fixture);

    assert_eq!(
        router.find_route("Alpha", "Beta").status,
        RouteStatus::NoRouteFound
    );
    assert_eq!(router.find_route("Beta", "Alpha").status, RouteStatus::Ok);
}

/// Two ways meeting at node 2; stations on different ways.
const JUNCTION: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<osm version="0.6" generator="test">
  <node id="1" lat="0" lon="0">
    <tag k="railway" v="station"/>
    <tag k="name" v="Alpha"/>
  </node>
  <node id="2" lat="0" lon="0.001"/>
  <node id="3" lat="0" lon="0.002"/>
  <node id="4" lat="0.001" lon="0.001">
    <tag k="railway" v="station"/>
    <tag k="name" v="Beta"/>
  </node>
  <way id="10">
    <nd ref="1"/>
    <nd ref="2"/>
    <nd ref="3"/>
    <tag k="railway" v="rail"/>
  </way>
  <way id="11">
    <nd ref="2"/>
    <nd ref="4"/>
    <tag k="railway" v="rail"/>
  </way>
</osm>
"#;

#[test]
fn routes_across_a_junction() {
    let router = router_from(JUNCTION);
    let result = router.find_route("Alpha", "Beta");

    assert_eq!(result.status, RouteStatus::Ok);
    assert_eq!(ids(&result), vec![1, 2, 4]);
    assert!((result.distance - 2.0 * MILLIDEG).abs() < 1e-3, "got {}", result.distance);
}

/// Two stops named Alpha at different distances from Beta.
const TWO_STARTS: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<osm version="0.6" generator="test">
  <node id="1" lat="0" lon="0">
    <tag k="railway" v="station"/>
    <tag k="name" v="Alpha"/>
  </node>
  <node id="2" lat="0" lon="0.001"/>
  <node id="3" lat="0" lon="0.002">
    <tag k="railway" v="station"/>
    <tag k="name" v="Beta"/>
  </node>
  <node id="4" lat="0" lon="0.01">
    <tag k="railway" v="station"/>
    <tag k="name" v="Alpha"/>
  </node>
  <way id="10">
    <nd ref="1"/>
    <nd ref="2"/>
    <nd ref="3"/>
    <tag k="railway" v="rail"/>
  </way>
  <way id="11">
    <nd ref="3"/>
    <nd ref="4"/>
    <tag k="railway" v="rail"/>
  </way>
</osm>
"#;

#[test]
fn closest_of_several_starts_wins() {
    let router = router_from(TWO_STARTS);
    let result = router.find_route("Alpha", "Beta");

    assert_eq!(result.status, RouteStatus::Ok);
    assert_eq!(result.start_count, 2);
    assert_eq!(result.end_count, 1);
    assert_eq!(result.start_node.unwrap().id, 1);
    assert!((result.distance - 2.0 * MILLIDEG).abs() < 1e-3);
}

/// A right-angle bend at node 2: exactly 90°, which is not sharp yet.
const RIGHT_ANGLE: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<osm version="0.6" generator="test">
  <node id="1" lat="0" lon="0">
    <tag k="railway" v="station"/>
    <tag k="name" v="Alpha"/>
  </node>
  <node id="2" lat="0" lon="0.001"/>
  <node id="3" lat="0.001" lon="0.001">
    <tag k="railway" v="station"/>
    <tag k="name" v="Beta"/>
  </node>
  <way id="10">
    <nd ref="1"/>
    <nd ref="2"/>
    <nd ref="3"/>
    <tag k="railway" v="rail"/>
  </way>
</osm>
"#;

#[test]
fn right_angle_is_not_reported() {
    let router = router_from(RIGHT_ANGLE);
    let result = router.find_route("Alpha", "Beta");

    assert_eq!(result.status, RouteStatus::Ok);
    assert_eq!(ids(&result), vec![1, 2, 3]);
    assert!(result.sharp_turns.is_empty());
}

#[test]
fn hairpin_turn_is_reported() {
    // move node 3 so the bend at node 2 becomes ~135°
    let fixture = RIGHT_ANGLE.replace(
        "<node id=\"3\" lat=\"0.001\" lon=\"0.001\">",
        "<node id=\"3\" lat=\"0.001\" lon=\"0\">",
    );
    let router = router_from(&fixture);
    let result = router.find_route("Alpha", "Beta");

    assert_eq!(result.status, RouteStatus::Ok);
    let turns: Vec<i64> = result.sharp_turns.iter().map(|n| n.id).collect();
    assert_eq!(turns, vec![2]);
}

/// A diamond: two alternative paths from Papa to Quebec.
const DIAMOND: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<osm version="0.6" generator="test">
  <node id="1" lat="0" lon="0">
    <tag k="railway" v="station"/>
    <tag k="name" v="Papa"/>
  </node>
  <node id="2" lat="0" lon="0.002"/>
  <node id="3" lat="0.001" lon="0.004"/>
  <node id="4" lat="-0.002" lon="0.004"/>
  <node id="5" lat="0" lon="0.006">
    <tag k="railway" v="station"/>
    <tag k="name" v="Quebec"/>
  </node>
  <way id="10">
    <nd ref="1"/>
    <nd ref="2"/>
    <tag k="railway" v="rail"/>
  </way>
  <way id="11">
    <nd ref="2"/>
    <nd ref="3"/>
    <nd ref="5"/>
    <tag k="railway" v="rail"/>
  </way>
  <way id="12">
    <nd ref="2"/>
    <nd ref="4"/>
    <nd ref="5"/>
    <tag k="railway" v="rail"/>
  </way>
</osm>
"#;

/// Node positions of the DIAMOND fixture as (id, lat, lon).
const DIAMOND_COORDS: [(i64, f64, f64); 5] = [
    (1, 0.0, 0.0),
    (2, 0.0, 0.002),
    (3, 0.001, 0.004),
    (4, -0.002, 0.004),
    (5, 0.0, 0.006),
];

/// Polyline segments of the DIAMOND fixture.
const DIAMOND_SEGMENTS: [(i64, i64); 5] = [(1, 2), (2, 3), (3, 5), (2, 4), (4, 5)];

/// Textbook Dijkstra over the full per-polyline graph, used as the
/// optimality reference.
fn reference_shortest(from: i64, to: i64) -> f64 {
    let index = |id: i64| DIAMOND_COORDS.iter().position(|c| c.0 == id).unwrap();
    let pos = |id: i64| {
        let c = DIAMOND_COORDS[index(id)];
        LonLat::from_degrees(c.2, c.1)
    };

    let n = DIAMOND_COORDS.len();
    let mut adjacent = vec![Vec::new(); n];
    for &(a, b) in &DIAMOND_SEGMENTS {
        let d = geomath::distance(pos(a), pos(b));
        adjacent[index(a)].push((index(b), d));
        adjacent[index(b)].push((index(a), d));
    }

    let mut dist = vec![f64::INFINITY; n];
    let mut done = vec![false; n];
    dist[index(from)] = 0.0;
    while let Some(u) = (0..n)
        .filter(|&i| !done[i] && dist[i].is_finite())
        .min_by(|&a, &b| dist[a].total_cmp(&dist[b]))
    {
        done[u] = true;
        for &(v, d) in &adjacent[u] {
            if dist[u] + d < dist[v] {
                dist[v] = dist[u] + d;
            }
        }
    }

    dist[index(to)]
}

#[test]
fn matches_the_reference_dijkstra() {
    let router = router_from(DIAMOND);
    let result = router.find_route("Papa", "Quebec");

    assert_eq!(result.status, RouteStatus::Ok);
    let expected = reference_shortest(1, 5);
    assert!(
        (result.distance - expected).abs() < 1e-9 * expected,
        "engine {} vs reference {expected}",
        result.distance
    );
    // the shorter branch goes through node 3
    assert_eq!(ids(&result), vec![1, 2, 3, 5]);
}

#[test]
fn route_is_legal() {
    let router = router_from(DIAMOND);
    let result = router.find_route("Papa", "Quebec");

    for pair in result.route_nodes.windows(2) {
        let (a, b) = (pair[0].id, pair[1].id);
        assert!(
            DIAMOND_SEGMENTS
                .iter()
                .any(|&(x, y)| (x, y) == (a, b) || (x, y) == (b, a)),
            "nodes {a} and {b} are not adjacent in any way"
        );
    }
}

/// A way referencing a node that never appears in the document, plus a
/// disconnected island.
const BROKEN: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<osm version="0.6" generator="test">
  <node id="1" lat="0" lon="0">
    <tag k="railway" v="station"/>
    <tag k="name" v="Alpha"/>
  </node>
  <node id="2" lat="0" lon="0.001">
    <tag k="railway" v="station"/>
    <tag k="name" v="Beta"/>
  </node>
  <node id="5" lat="0.5" lon="0.5"/>
  <node id="6" lat="0.5" lon="0.501">
    <tag k="railway" v="station"/>
    <tag k="name" v="Gamma"/>
  </node>
  <way id="10">
    <nd ref="1"/>
    <nd ref="2"/>
    <nd ref="99"/>
    <tag k="railway" v="rail"/>
  </way>
  <way id="11">
    <nd ref="5"/>
    <nd ref="6"/>
    <tag k="railway" v="rail"/>
  </way>
</osm>
"#;

#[test]
fn broken_ways_are_skipped_not_fatal() {
    let router = router_from(BROKEN);

    // the stretch before the missing node still routes
    let result = router.find_route("Alpha", "Beta");
    assert_eq!(result.status, RouteStatus::Ok);
    assert_eq!(ids(&result), vec![1, 2]);

    // the island stays unreachable
    let result = router.find_route("Alpha", "Gamma");
    assert_eq!(result.status, RouteStatus::NoRouteFound);
}

#[test]
fn non_rail_ways_are_ignored() {
    let fixture = LINEAR.replace(
        "<tag k=\"railway\" v=\"rail\"/>",
        "<tag k=\"highway\" v=\"primary\"/>",
    );
    let router = router_from(&fixture);

    // the stations were never referenced by a rail way, so they are
    // not even stored
    let result = router.find_route("Alpha", "Beta");
    assert_eq!(result.status, RouteStatus::BothStationsNotFound);
}

#[test]
fn abandoned_rails_still_route() {
    let fixture = LINEAR.replace(
        "<tag k=\"railway\" v=\"rail\"/>",
        "<tag k=\"railway\" v=\"abandoned\"/>",
    );
    let router = router_from(&fixture);
    assert_eq!(router.find_route("Alpha", "Beta").status, RouteStatus::Ok);
}
