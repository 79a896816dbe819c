// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Pass-driven ingestion of OSM documents.
//!
//! A [Pass] is a set of per-entity callbacks plus an optional
//! finalization step. An [Ingest] runs its passes in registration order,
//! each one re-reading the document through a fresh tokenizer. Entities
//! are only accumulated for kinds the current pass has a callback for.
//!
//! The tokenizer contract is the [Event] stream; any
//! `Iterator<Item = Result<Event, ParseError>>` works as a source. The
//! bundled implementation is the XML reader in [super::xml].

use std::fs::File;
use std::io;
use std::path::PathBuf;

use crate::coords::{CoordError, LonLat};
use crate::EngineError;

use super::{xml, Action, EntityKind, Member, Node, Relation, Way};

/// A logical event produced by a document tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Opens a new entity. For nodes, `lonlat` is always present.
    Begin(Begin),

    /// A key-value tag of the entity being built.
    Tag { key: String, value: String },

    /// A node reference of the way being built.
    NodeRef(i64),

    /// A member of the relation being built.
    Member(Member),

    /// Closes the entity being built.
    End(EntityKind),
}

/// Payload of [Event::Begin].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Begin {
    pub kind: EntityKind,
    pub id: i64,
    pub lonlat: Option<LonLat>,
    pub action: Action,
}

/// Trait alias for tokenizers which can stream [Events](Event) from an
/// underlying document - alias for
/// `Iterator<Item = Result<Event, ParseError>>`.
pub trait EventSource: Iterator<Item = Result<Event, ParseError>> {}

impl<I: Iterator<Item = Result<Event, ParseError>>> EventSource for I {}

/// Structural or attribute problem in the input document.
#[derive(Debug, thiserror::Error)]
#[error("{kind} (at byte {position})")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub position: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("invalid utf-8 in attribute value")]
    Utf8,

    #[error("missing {0} attribute")]
    MissingAttribute(&'static str),

    #[error("bad {0} attribute")]
    BadNumber(&'static str),

    #[error("bad action attribute")]
    BadAction,

    #[error("bad coordinate: {0}")]
    Coord(#[from] CoordError),

    #[error("bad relation member type")]
    BadMemberType,
}

/// Where an [Ingest] reads its document from.
///
/// Standard input cannot be rewound for a second pass, so callers slurp
/// it into a [Source::Buffer] up front.
#[derive(Debug)]
pub enum Source {
    Path(PathBuf),
    Buffer(Vec<u8>),
}

/// Callbacks of a single pass over a shared state `S`.
pub struct Pass<S> {
    name: &'static str,
    node: Option<fn(&mut S, Node)>,
    way: Option<fn(&mut S, Way)>,
    relation: Option<fn(&mut S, Relation)>,
    finish: Option<fn(&mut S) -> Result<(), EngineError>>,
    dumps: bool,
}

impl<S> Pass<S> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            node: None,
            way: None,
            relation: None,
            finish: None,
            dumps: false,
        }
    }

    pub fn on_node(mut self, f: fn(&mut S, Node)) -> Self {
        self.node = Some(f);
        self
    }

    pub fn on_way(mut self, f: fn(&mut S, Way)) -> Self {
        self.way = Some(f);
        self
    }

    pub fn on_relation(mut self, f: fn(&mut S, Relation)) -> Self {
        self.relation = Some(f);
        self
    }

    /// Registers a finalization step, run after the entity callbacks
    /// (if any) have seen the whole document.
    pub fn on_finish(mut self, f: fn(&mut S) -> Result<(), EngineError>) -> Self {
        self.finish = Some(f);
        self
    }

    /// Marks the pass as emitting entities to standard output, which makes
    /// the ingest bracket the run with the `<osm>` preamble and closer.
    pub fn dumping(mut self) -> Self {
        self.dumps = true;
        self
    }

    fn wants(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Node => self.node.is_some(),
            EntityKind::Way => self.way.is_some(),
            EntityKind::Relation => self.relation.is_some(),
        }
    }

    fn has_entity_callbacks(&self) -> bool {
        self.node.is_some() || self.way.is_some() || self.relation.is_some()
    }
}

/// Drives registered passes over a document.
pub struct Ingest<S> {
    passes: Vec<Pass<S>>,
}

impl<S> Ingest<S> {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    pub fn add_pass(&mut self, pass: Pass<S>) {
        self.passes.push(pass);
    }

    /// Runs all passes in registration order against `source`.
    ///
    /// Fails on the first I/O, parse or finalization error; entity
    /// callbacks themselves are infallible.
    pub fn run(&self, state: &mut S, source: &Source) -> Result<(), EngineError> {
        let mut dump_opened = false;

        for (i, pass) in self.passes.iter().enumerate() {
            if pass.name.is_empty() {
                log::info!(target: "railroute.osm", "pass {} of {}", i + 1, self.passes.len());
            } else {
                log::info!(
                    target: "railroute.osm",
                    "pass {} of {}: {}", i + 1, self.passes.len(), pass.name
                );
            }

            if pass.dumps && !dump_opened {
                dump_open();
                dump_opened = true;
            }

            if pass.has_entity_callbacks() {
                match source {
                    Source::Path(path) => {
                        let f = File::open(path)?;
                        drive(state, pass, xml::events_from_io(io::BufReader::new(f)))?;
                    }
                    Source::Buffer(data) => drive(state, pass, xml::events_from_buffer(data))?,
                }
            }

            if let Some(finish) = pass.finish {
                finish(state)?;
            }
        }

        if dump_opened {
            dump_close();
        }
        Ok(())
    }
}

impl<S> Default for Ingest<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn dump_open() {
    println!("<?xml version='1.0' encoding='UTF-8'?>");
    println!("<osm version=\"0.6\" generator=\"mposm\">");
}

fn dump_close() {
    println!("</osm>");
}

/// Accumulates events into transient entities and dispatches them to the
/// pass callbacks. Kinds without a callback are not accumulated at all.
fn drive<S, E: EventSource>(state: &mut S, pass: &Pass<S>, events: E) -> Result<(), ParseError> {
    let mut node: Option<Node> = None;
    let mut way: Option<Way> = None;
    let mut relation: Option<Relation> = None;

    for event in events {
        match event? {
            Event::Begin(begin) if pass.wants(begin.kind) => match begin.kind {
                EntityKind::Node => {
                    let mut n = Node::new(begin.id, begin.lonlat.unwrap_or_default());
                    n.action = begin.action;
                    node = Some(n);
                }
                EntityKind::Way => {
                    let mut w = Way::new(begin.id);
                    w.action = begin.action;
                    way = Some(w);
                }
                EntityKind::Relation => {
                    let mut r = Relation::new(begin.id);
                    r.action = begin.action;
                    relation = Some(r);
                }
            },
            Event::Begin(_) => {}

            Event::Tag { key, value } => {
                // first writer wins on duplicate keys
                if let Some(n) = node.as_mut() {
                    n.tags.add(key, value);
                } else if let Some(w) = way.as_mut() {
                    w.tags.add(key, value);
                } else if let Some(r) = relation.as_mut() {
                    r.tags.add(key, value);
                }
            }

            Event::NodeRef(id) => {
                if let Some(w) = way.as_mut() {
                    w.nodes.push(id);
                }
            }

            Event::Member(m) => {
                if let Some(r) = relation.as_mut() {
                    r.members.push(m);
                }
            }

            Event::End(EntityKind::Node) => {
                if let (Some(n), Some(f)) = (node.take(), pass.node) {
                    f(state, n);
                }
            }
            Event::End(EntityKind::Way) => {
                if let (Some(w), Some(f)) = (way.take(), pass.way) {
                    f(state, w);
                }
            }
            Event::End(EntityKind::Relation) => {
                if let (Some(r), Some(f)) = (relation.take(), pass.relation) {
                    f(state, r);
                }
            }
        }
    }

    Ok(())
}
