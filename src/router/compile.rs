// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{HashMap, HashSet};

use crate::arena::{Arena, CapacityExceeded};
use crate::geomath;
use crate::osm::Node;

use super::{RailRouter, RouteEdge, RouteNode};

/// Logical impossibility discovered while building the routing graph.
///
/// Broken ways are skipped with a diagnostic instead; these errors mean
/// the input violates an invariant the compiled graph depends on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("node position {0} does not fit the edge position field")]
    PositionOverflow(usize),

    #[error("way #{0}: endpoint is not a routing node")]
    EndpointNotRouting(i64),

    #[error("stop node #{0} did not become a routing node")]
    StopNotRouting(i64),

    #[error("node #{0}: edge slots exhausted")]
    EdgeSlotsExhausted(i64),

    #[error(transparent)]
    Arena(#[from] CapacityExceeded),
}

/// Per-node tallies collected before routing nodes are created.
#[derive(Debug, Clone, Copy, Default)]
struct Connectivity {
    /// Incident edge ends: 1 per endpoint occurrence, 2 per interior one.
    edge_ends: u32,
    /// Number of way occurrences referencing the node.
    ways: u32,
    is_stop: bool,
}

/// A node is a stop when it is a station or halt, or an explicit train
/// stop position.
fn is_stop(node: &Node) -> bool {
    node.tags.is("railway", "station")
        || node.tags.is("railway", "halt")
        || (node.tags.is("public_transport", "stop_position") && node.tags.is("train", "yes"))
}

/// Keys whose values all name the stop.
const NAME_KEYS: [&str; 3] = ["name", "alt_name", "official_name"];

impl RailRouter {
    /// Collapses the stored ways into the routing graph and indexes stops.
    ///
    /// Runs as the finalization pass of [RailRouter::parse], after both
    /// entity passes have populated the way and node maps.
    pub(super) fn compile(&mut self) -> Result<(), CompileError> {
        // drop the needed-nodes scratch
        self.needed_nodes = HashSet::new();

        log::info!(target: "railroute", "{} nodes", self.nodes.len());
        log::info!(target: "railroute", "{} ways", self.ways.len());

        let mut connectivity: HashMap<i64, Connectivity> = HashMap::new();
        let mut id_to_route_node: HashMap<i64, u32> = HashMap::new();
        let mut stop_names: Vec<(String, i64)> = Vec::new();

        // find stops; one name entry per distinct value among the name keys
        for node in self.nodes.values() {
            if !is_stop(node) {
                continue;
            }
            let mut distinct: Vec<&str> = Vec::new();
            for key in NAME_KEYS {
                if let Some(name) = node.tags.get(key) {
                    if !distinct.contains(&name) {
                        distinct.push(name);
                    }
                }
            }
            if distinct.is_empty() {
                continue;
            }
            connectivity.entry(node.id).or_default().is_stop = true;
            for name in distinct {
                stop_names.push((name.to_string(), node.id));
            }
        }

        // count incident edge ends and way occurrences
        for way in self.ways.values() {
            if way.nodes.len() < 2 {
                continue;
            }
            let last = way.nodes.len() - 1;
            for (pos, &id) in way.nodes.iter().enumerate() {
                let c = connectivity.entry(id).or_default();
                c.edge_ends += if pos == 0 || pos == last { 1 } else { 2 };
                c.ways += 1;
            }
        }

        // create routing nodes in node-map iteration order
        for (&id, _) in self.nodes.iter() {
            let Some(c) = connectivity.get(&id).copied() else {
                // only reachable through degenerate ways, which are skipped
                log::warn!(target: "railroute", "node #{id}: not referenced by any usable way, skipping");
                continue;
            };

            if c.ways > 1 || c.edge_ends != 2 || c.is_stop {
                let edges = self.edges.alloc(c.edge_ends as usize)?;
                self.route_nodes.push(RouteNode {
                    source_id: id,
                    edges,
                });
                id_to_route_node.insert(id, (self.route_nodes.len() - 1) as u32);
            }
        }

        log::info!(target: "railroute", "{} routing nodes", self.route_nodes.len());

        // split the stored polylines into routing edges
        let mut nedges: usize = 0;
        {
            let Self {
                ref ways,
                ref nodes,
                ref route_nodes,
                ref mut edges,
                ..
            } = *self;

            for (&way_id, way) in ways {
                if way.nodes.len() < 2 {
                    log::warn!(target: "railroute", "way #{way_id}: has only {} nodes, skipping", way.nodes.len());
                    continue;
                }

                let Some(first) = nodes.get(&way.nodes[0]) else {
                    log::warn!(target: "railroute", "way #{way_id}: missing node[0] #{}, skipping", way.nodes[0]);
                    continue;
                };

                let forward = !way.tags.is("oneway", "-1")
                    && !way.tags.is("designated_direction", "backward");
                let backward = !way.tags.is("oneway", "yes")
                    && !way.tags.is("designated_direction", "forward");

                // the first node is an endpoint and therefore a routing node
                let Some(&first_route_node) = id_to_route_node.get(&way.nodes[0]) else {
                    return Err(CompileError::EndpointNotRouting(way_id));
                };

                let mut prev = first;
                let mut start_route_node = first_route_node;
                let mut start_pos: usize = 0;
                let mut start_ref = first;
                let mut segment_second: Option<&Node> = None;
                let mut dist = 0.0f64;

                for pos in 1..way.nodes.len() {
                    let Some(this) = nodes.get(&way.nodes[pos]) else {
                        log::warn!(target: "railroute", "way #{way_id}: missing node[{pos}] #{}, skipping rest", way.nodes[pos]);
                        break;
                    };

                    if segment_second.is_none() {
                        segment_second = Some(this);
                    }

                    dist += geomath::distance(prev.lonlat, this.lonlat);

                    let this_route_node = id_to_route_node.get(&way.nodes[pos]).copied();
                    if pos == way.nodes.len() - 1 && this_route_node.is_none() {
                        return Err(CompileError::EndpointNotRouting(way_id));
                    }

                    if let Some(this_rn) = this_route_node {
                        if start_pos >= usize::from(u16::MAX) || pos >= usize::from(u16::MAX) {
                            return Err(CompileError::PositionOverflow(pos));
                        }

                        if forward {
                            let second = segment_second
                                .expect("a committed segment has at least one step");
                            push_edge(
                                edges,
                                route_nodes,
                                start_route_node,
                                RouteEdge {
                                    way_id,
                                    start_pos: start_pos as u16,
                                    end_pos: pos as u16,
                                    other: Some(this_rn),
                                    direction: geomath::bearing(start_ref.lonlat, second.lonlat)
                                        as f32,
                                    length: dist,
                                },
                            )?;
                            nedges += 1;
                        }

                        if backward {
                            push_edge(
                                edges,
                                route_nodes,
                                this_rn,
                                RouteEdge {
                                    way_id,
                                    start_pos: pos as u16,
                                    end_pos: start_pos as u16,
                                    other: Some(start_route_node),
                                    direction: geomath::bearing(this.lonlat, prev.lonlat) as f32,
                                    length: dist,
                                },
                            )?;
                            nedges += 1;
                        }

                        dist = 0.0;
                        start_route_node = this_rn;
                        start_pos = pos;
                        start_ref = this;
                        segment_second = None;
                    }

                    prev = this;
                }
            }

            // keep each node's edges shortest-first so the search's
            // early exit stays admissible; never-filled slots go last
            for rn in route_nodes.iter() {
                edges.get_mut(rn.edges).sort_by(|a, b| {
                    (a.way_id == 0)
                        .cmp(&(b.way_id == 0))
                        .then(a.length.total_cmp(&b.length))
                });
            }
        }

        log::info!(target: "railroute", "{nedges} routing edges");

        // fold the collected names into the stop index
        for (name, node_id) in stop_names {
            let index = *id_to_route_node
                .get(&node_id)
                .ok_or(CompileError::StopNotRouting(node_id))?;
            self.stops.entry(name).or_default().push(index);
        }

        Ok(())
    }
}

/// Fills the first free slot of the routing node's pre-sized edge array.
fn push_edge(
    arena: &mut Arena<RouteEdge>,
    route_nodes: &[RouteNode],
    at: u32,
    edge: RouteEdge,
) -> Result<(), CompileError> {
    let rn = &route_nodes[at as usize];
    match arena.get_mut(rn.edges).iter_mut().find(|s| s.way_id == 0) {
        Some(slot) => {
            *slot = edge;
            Ok(())
        }
        None => Err(CompileError::EdgeSlotsExhausted(rn.source_id)),
    }
}
