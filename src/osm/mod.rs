// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! The OpenStreetMap entity model - nodes, ways and relations with their
//! tags - plus the XML rendition used by dumping passes.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::io;

use crate::coords::LonLat;

pub mod ingest;
pub mod xml;

/// Editing action attached to an entity in the input document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Action {
    #[default]
    None,
    Create,
    Modify,
    Delete,
}

impl Action {
    fn as_attr(self) -> Option<&'static str> {
        match self {
            Action::None => None,
            Action::Create => Some("create"),
            Action::Modify => Some("modify"),
            Action::Delete => Some("delete"),
        }
    }
}

/// Kind of an OSM entity, also used to type relation member references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Way,
    Relation,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node => write!(f, "node"),
            Self::Way => write!(f, "way"),
            Self::Relation => write!(f, "relation"),
        }
    }
}

/// An ordered string-to-string tag mapping, unique by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tag only if the key is absent.
    /// Returns false when the key was already present.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        match self.0.entry(key.into()) {
            std::collections::btree_map::Entry::Vacant(e) => {
                e.insert(value.into());
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Inserts or overwrites a tag.
    /// Returns true iff the key was newly inserted.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        self.0.insert(key.into(), value.into()).is_none()
    }

    /// Removes a tag. Returns true iff the key was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.0.remove(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns true iff the key exists and its value is byte-equal
    /// to `value`.
    pub fn is(&self, key: &str, value: &str) -> bool {
        self.0.get(key).is_some_and(|v| v == value)
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over tags in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn dump<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        for (k, v) in self.iter() {
            writeln!(w, "    <tag k=\"{}\" v=\"{}\"/>", encode_attr(k), encode_attr(v))?;
        }
        Ok(())
    }
}

/// Escapes the characters XML does not allow verbatim inside a
/// double-quoted attribute value.
pub fn encode_attr(s: &str) -> Cow<'_, str> {
    fn needs_escape(b: u8) -> bool {
        matches!(b, b'&' | b'<' | b'>' | b'"' | b'\'' | b'\t' | b'\n' | b'\r')
    }

    if !s.bytes().any(needs_escape) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn dump_common<W: io::Write>(w: &mut W, id: i64, action: Action) -> io::Result<()> {
    write!(w, "id=\"{id}\"")?;
    if let Some(a) = action.as_attr() {
        write!(w, " action=\"{a}\"")?;
    }
    Ok(())
}

/// Represents an [OSM node](https://wiki.openstreetmap.org/wiki/Node).
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: i64,
    pub lonlat: LonLat,
    pub action: Action,
    pub tags: Tags,
}

impl Node {
    pub fn new(id: i64, lonlat: LonLat) -> Self {
        Self {
            id,
            lonlat,
            action: Action::None,
            tags: Tags::new(),
        }
    }

    /// Writes the XML rendition of the node.
    pub fn dump<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "  <node ")?;
        dump_common(w, self.id, self.action)?;
        write!(w, " lat=\"{}\" lon=\"{}\"", self.lonlat.lat, self.lonlat.lon)?;
        if self.tags.is_empty() {
            writeln!(w, "/>")
        } else {
            writeln!(w, ">")?;
            self.tags.dump(w)?;
            writeln!(w, "  </node>")
        }
    }
}

/// Represents an [OSM way](https://wiki.openstreetmap.org/wiki/Way) -
/// an ordered polyline of node references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Way {
    pub id: i64,
    pub action: Action,
    pub tags: Tags,
    pub nodes: Vec<i64>,
}

impl Way {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            action: Action::None,
            tags: Tags::new(),
            nodes: Vec::new(),
        }
    }

    /// A way is closed when its first and last node references are equal.
    pub fn is_closed(&self) -> bool {
        !self.nodes.is_empty() && self.nodes.first() == self.nodes.last()
    }

    /// Appends the first node reference unless the way is already closed.
    pub fn close(&mut self) {
        if !self.nodes.is_empty() && !self.is_closed() {
            self.nodes.push(self.nodes[0]);
        }
    }

    pub fn reverse(&mut self) {
        self.nodes.reverse();
    }

    /// Writes the XML rendition of the way.
    pub fn dump<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "  <way ")?;
        dump_common(w, self.id, self.action)?;
        writeln!(w, ">")?;
        for node in &self.nodes {
            writeln!(w, "    <nd ref=\"{node}\"/>")?;
        }
        self.tags.dump(w)?;
        writeln!(w, "  </way>")
    }
}

/// A single member reference of a [Relation].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub kind: EntityKind,
    pub id: i64,
    pub role: String,
}

/// Represents an [OSM relation](https://wiki.openstreetmap.org/wiki/Relation).
///
/// Relations are carried through the ingest for completeness; rail
/// routing ignores them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub id: i64,
    pub action: Action,
    pub tags: Tags,
    pub members: Vec<Member>,
}

impl Relation {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            action: Action::None,
            tags: Tags::new(),
            members: Vec::new(),
        }
    }

    pub fn reverse(&mut self) {
        self.members.reverse();
    }

    /// Writes the XML rendition of the relation.
    pub fn dump<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "  <relation ")?;
        dump_common(w, self.id, self.action)?;
        writeln!(w, ">")?;
        for m in &self.members {
            writeln!(
                w,
                "    <member type=\"{}\" ref=\"{}\" role=\"{}\"/>",
                m.kind,
                m.id,
                encode_attr(&m.role)
            )?;
        }
        self.tags.dump(w)?;
        writeln!(w, "  </relation>")
    }
}
