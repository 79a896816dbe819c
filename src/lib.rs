// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Offline rail-network routing over OSM XML extracts.
//!
//! A [RailRouter] ingests a document in streaming passes, compiles the
//! rail ways into a compact routing graph and answers shortest-path
//! queries between named stops:
//!
//! ```no_run
//! use railroute::osm::ingest::Source;
//! use railroute::RailRouter;
//!
//! let mut router = RailRouter::new();
//! router.parse(&Source::Path("extract.osm".into()))?;
//!
//! let result = router.find_route("Лосиноостровская", "Лось");
//! println!("{}: {} m", result.status, result.distance);
//! # Ok::<(), railroute::EngineError>(())
//! ```

pub mod arena;
pub mod coords;
pub mod geomath;
pub mod lazy_array;
pub mod osm;
pub mod router;

pub use coords::{Coord, CoordError, LonLat};
pub use router::{FindRouteResult, RailRouter, RouteStatus};

use osm::ingest::ParseError;
use router::CompileError;

/// Top-level error of the routing engine.
///
/// Everything propagates to the entry point; the only condition handled
/// locally is a broken way, which compilation skips with a diagnostic.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse: {0}")]
    Parse(#[from] ParseError),

    #[error("compile: {0}")]
    Compile(#[from] CompileError),
}
