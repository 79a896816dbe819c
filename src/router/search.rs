// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::BinaryHeap;

use crate::lazy_array::LazyArray;

use super::{FindRouteResult, RailRouter, RouteStatus};

#[derive(Debug, Clone, Copy)]
struct QueueItem {
    length: f64,
    node: u32,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length
    }
}

impl Eq for QueueItem {}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // NOTE: We revert the order of comparison,
        // as lower lengths are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap.
        other.length.total_cmp(&self.length)
    }
}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl RailRouter {
    /// Finds the shortest route between two named stops using Dijkstra's
    /// algorithm.
    ///
    /// Several stops may carry the same name; the search runs from all
    /// stops matching `name_a` at once and finishes at the closest stop
    /// matching `name_b`. Queries never mutate the engine - all scratch
    /// state is local to the call.
    pub fn find_route(&self, name_a: &str, name_b: &str) -> FindRouteResult<'_> {
        let start_nodes: &[u32] = self.stops.get(name_a).map(Vec::as_slice).unwrap_or_default();
        let fin_nodes: &[u32] = self.stops.get(name_b).map(Vec::as_slice).unwrap_or_default();

        let start_count = start_nodes.len();
        let end_count = fin_nodes.len();

        let missing = match (start_nodes.is_empty(), fin_nodes.is_empty()) {
            (true, true) => Some(RouteStatus::BothStationsNotFound),
            (true, false) => Some(RouteStatus::StartStationNotFound),
            (false, true) => Some(RouteStatus::EndStationNotFound),
            (false, false) => None,
        };
        if let Some(status) = missing {
            return FindRouteResult::not_found(status, start_count, end_count);
        }

        let size = self.route_nodes.len();
        let mut starts: LazyArray<Option<u32>> = LazyArray::new(size, None);
        let mut prevs: LazyArray<Option<u32>> = LazyArray::new(size, None);
        let mut lengths: LazyArray<f64> = LazyArray::new(size, f64::INFINITY);
        let mut queue: BinaryHeap<QueueItem> = BinaryHeap::new();

        for &start in start_nodes {
            starts.set(start as usize, Some(start));
            lengths.set(start as usize, 0.0);
            queue.push(QueueItem {
                length: 0.0,
                node: start,
            });
        }

        let mut shortest = f64::INFINITY;
        while let Some(item) = queue.pop() {
            let at = item.node as usize;

            // a changed length means the node was settled through a
            // shorter path already - stale entries are skipped
            if lengths.get(at) < item.length {
                continue;
            }

            if fin_nodes.contains(&item.node) {
                shortest = shortest.min(lengths.get(at));
            }

            for edge in self.edges_of(item.node) {
                let new_length = lengths.get(at) + edge.length;

                // edges are sorted by length, so no later edge of this
                // node can improve on an already known complete route
                if new_length > shortest {
                    break;
                }

                // slots left behind by partially dropped ways
                let Some(other) = edge.other else { continue };

                if new_length < lengths.get(other as usize) {
                    starts.set(other as usize, starts.get(at));
                    prevs.set(other as usize, Some(item.node));
                    lengths.set(other as usize, new_length);

                    queue.push(QueueItem {
                        length: new_length,
                        node: other,
                    });
                }
            }
        }

        // the closest target; the first one in index order wins ties
        let mut best_fin = fin_nodes[0];
        for &fin in &fin_nodes[1..] {
            if lengths.get(fin as usize) < lengths.get(best_fin as usize) {
                best_fin = fin;
            }
        }

        let distance = lengths.get(best_fin as usize);
        if distance.is_infinite() {
            return FindRouteResult::not_found(RouteStatus::NoRouteFound, start_count, end_count);
        }

        self.recover(best_fin, &prevs, &starts, distance, start_count, end_count)
    }
}
