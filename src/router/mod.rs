// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! The rail routing engine: tag-based selection of rail ways, compaction
//! of the selected polylines into a sparse routing graph, and
//! shortest-path queries between named stops.

mod compile;
mod reconstruct;
mod search;

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::arena::{Arena, Handle};
use crate::osm::ingest::{Ingest, Pass, Source};
use crate::osm::{Node, Way};
use crate::EngineError;

pub use compile::CompileError;

/// A directed traversal of a contiguous stretch of one way between two
/// routing nodes.
///
/// Carries enough provenance (way id plus start/end positions within it)
/// to expand back into the original polyline geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct RouteEdge {
    /// Id of the way this edge summarizes; 0 marks a never-filled slot.
    way_id: i64,
    start_pos: u16,
    end_pos: u16,
    /// Target routing node, or None when the slot was left behind by a
    /// partially dropped way.
    other: Option<u32>,
    /// Initial bearing of the edge's first segment, in radians.
    direction: f32,
    /// Accumulated great-circle length of the stretch, in meters.
    length: f64,
}

/// A node retained as a vertex of the compiled routing graph.
#[derive(Debug, Clone, Copy)]
struct RouteNode {
    source_id: i64,
    /// Pre-sized run of edge slots in the arena.
    edges: Handle,
}

/// Outcome classification of [RailRouter::find_route].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStatus {
    Ok,
    StartStationNotFound,
    EndStationNotFound,
    BothStationsNotFound,
    NoRouteFound,
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::StartStationNotFound => "Start station not found",
            Self::EndStationNotFound => "End station not found",
            Self::BothStationsNotFound => "Both stations not found",
            Self::NoRouteFound => "No route found",
        })
    }
}

/// Result of a [RailRouter::find_route] query.
#[derive(Debug, Clone)]
pub struct FindRouteResult<'r> {
    pub status: RouteStatus,

    /// How many stops matched the start name.
    pub start_count: usize,

    /// How many stops matched the end name.
    pub end_count: usize,

    /// The stop the winning route departs from.
    pub start_node: Option<&'r Node>,

    /// The stop the winning route arrives at.
    pub end_node: Option<&'r Node>,

    /// Route length in meters.
    pub distance: f64,

    /// Full route geometry in travel order.
    pub route_nodes: Vec<&'r Node>,

    /// Interior geometry nodes where the route turns by more than 90°.
    pub sharp_turns: Vec<&'r Node>,
}

impl<'r> FindRouteResult<'r> {
    pub fn is_ok(&self) -> bool {
        self.status == RouteStatus::Ok
    }

    fn not_found(status: RouteStatus, start_count: usize, end_count: usize) -> Self {
        Self {
            status,
            start_count,
            end_count,
            start_node: None,
            end_node: None,
            distance: 0.0,
            route_nodes: Vec::new(),
            sharp_turns: Vec::new(),
        }
    }
}

/// Values of the `railway` tag marking a way as part of the rail network.
const RAIL_VALUES: [&str; 4] = ["rail", "abandoned", "disused", "narrow_gauge"];

/// Build-once, query-many rail routing engine.
///
/// [RailRouter::parse] ingests a document in two streaming passes (rail
/// ways first, then the nodes they reference) and compiles the routing
/// graph in a final pass. [RailRouter::find_route] never mutates the
/// engine, so a compiled router can serve any number of queries.
#[derive(Default)]
pub struct RailRouter {
    nodes: BTreeMap<i64, Node>,
    ways: BTreeMap<i64, Way>,

    /// Node ids referenced by rail ways; dropped after compilation.
    needed_nodes: HashSet<i64>,

    /// Stop name -> routing-node indices, sorted and unique per name.
    stops: BTreeMap<String, Vec<u32>>,

    route_nodes: Vec<RouteNode>,
    edges: Arena<RouteEdge>,
}

impl RailRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the rail-routing passes over `source` and compiles the
    /// routing graph.
    pub fn parse(&mut self, source: &Source) -> Result<(), EngineError> {
        let mut ingest = Ingest::new();
        ingest.add_pass(Pass::new("loading ways").on_way(Self::collect_way));
        ingest.add_pass(Pass::new("loading nodes").on_node(Self::collect_node));
        ingest.add_pass(Pass::new("compiling graph").on_finish(Self::compile_pass));
        ingest.run(self, source)
    }

    fn collect_way(&mut self, way: Way) {
        let is_rail = way
            .tags
            .get("railway")
            .is_some_and(|v| RAIL_VALUES.contains(&v));
        if is_rail {
            self.needed_nodes.extend(way.nodes.iter().copied());
            self.ways.insert(way.id, way);
        }
    }

    fn collect_node(&mut self, node: Node) {
        if self.needed_nodes.contains(&node.id) {
            self.nodes.insert(node.id, node);
        }
    }

    fn compile_pass(&mut self) -> Result<(), EngineError> {
        self.compile().map_err(EngineError::from)
    }

    fn edges_of(&self, index: u32) -> &[RouteEdge] {
        self.edges.get(self.route_nodes[index as usize].edges)
    }
}
