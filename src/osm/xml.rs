// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::io;
use std::str::from_utf8;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesStart;

use super::ingest::{Begin, Event, EventSource, ParseError, ParseErrorKind};
use super::{Action, EntityKind, Member};
use crate::coords::{Coord, LonLat};

/// Streams ingest [Events](Event) from an XML document behind an
/// [io::BufRead].
pub fn events_from_io<R: io::BufRead>(reader: R) -> impl EventSource {
    Reader::from_io(reader)
}

/// Streams ingest [Events](Event) from an in-memory XML document.
pub fn events_from_buffer(b: &[u8]) -> impl EventSource + '_ {
    Reader::from_buffer(b)
}

/// Parser is a trait for objects which can parse XML.
///
/// This trait only exists to fix the mismatch of
/// [quick_xml::Reader::read_event] when working on buffered data
/// and [quick_xml::Reader::read_event_into] when working on IO.
trait Parser {
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<quick_xml::events::Event<'a>>;
    fn position(&self) -> u64;
}

/// IoParser implements [Parser] over an [io::BufRead].
struct IoParser<R: io::BufRead>(quick_xml::Reader<R>, Vec<u8>);

impl<R: io::BufRead> IoParser<R> {
    #[inline]
    fn new(reader: R) -> Self {
        Self(quick_xml::Reader::from_reader(reader), Vec::default())
    }
}

impl<R: io::BufRead> Parser for IoParser<R> {
    #[inline]
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<quick_xml::events::Event<'a>> {
        self.0.read_event_into(&mut self.1)
    }

    #[inline]
    fn position(&self) -> u64 {
        self.0.buffer_position() as u64
    }
}

/// BufParser implements [Parser] over a slice of bytes (`&[u8]`).
struct BufParser<'a>(quick_xml::Reader<&'a [u8]>);

impl<'a> BufParser<'a> {
    #[inline]
    fn new(data: &'a [u8]) -> Self {
        Self(quick_xml::Reader::from_reader(data))
    }
}

impl<'a> Parser for BufParser<'a> {
    #[inline]
    fn read_event<'b>(&'b mut self) -> quick_xml::Result<quick_xml::events::Event<'b>> {
        self.0.read_event()
    }

    #[inline]
    fn position(&self) -> u64 {
        self.0.buffer_position() as u64
    }
}

/// Reader translates XML elements into ingest [Events](Event).
struct Reader<P: Parser> {
    parser: P,
    /// Kind of the entity whose element is currently open, if any.
    open: Option<EntityKind>,
    /// Second half of a self-closing entity element.
    pending: Option<Event>,
    eof: bool,
}

impl<P: Parser> Reader<P> {
    #[inline]
    fn new(parser: P) -> Self {
        Self {
            parser,
            open: None,
            pending: None,
            eof: false,
        }
    }
}

impl<'a> Reader<BufParser<'a>> {
    #[inline]
    fn from_buffer(data: &'a [u8]) -> Self {
        Self::new(BufParser::new(data))
    }
}

impl<R: io::BufRead> Reader<IoParser<R>> {
    #[inline]
    fn from_io(reader: R) -> Self {
        Self::new(IoParser::new(reader))
    }
}

impl<P: Parser> Iterator for Reader<P> {
    type Item = Result<Event, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(ev) = self.pending.take() {
            return Some(Ok(ev));
        }

        while !self.eof {
            let position = self.parser.position();
            let event = match self.parser.read_event() {
                Ok(e) => e,
                Err(e) => {
                    self.eof = true;
                    return Some(Err(ParseError {
                        kind: e.into(),
                        position,
                    }));
                }
            };

            macro_rules! try_at {
                ($result:expr) => {
                    match $result {
                        Ok(value) => value,
                        Err(kind) => {
                            self.eof = true;
                            return Some(Err(ParseError { kind, position }));
                        }
                    }
                };
            }

            match event {
                quick_xml::events::Event::Empty(start) => match start.local_name().as_ref() {
                    b"node" | b"way" | b"relation" => {
                        let begin = try_at!(parse_begin(&start));
                        self.pending = Some(Event::End(begin.kind));
                        return Some(Ok(Event::Begin(begin)));
                    }
                    b"tag" if self.open.is_some() => {
                        let (key, value) = try_at!(parse_tag(&start));
                        return Some(Ok(Event::Tag { key, value }));
                    }
                    b"nd" if self.open == Some(EntityKind::Way) => {
                        return Some(Ok(Event::NodeRef(try_at!(parse_nd(&start)))));
                    }
                    b"member" if self.open == Some(EntityKind::Relation) => {
                        return Some(Ok(Event::Member(try_at!(parse_member(&start)))));
                    }
                    _ => {}
                },

                quick_xml::events::Event::Start(start) => match start.local_name().as_ref() {
                    b"node" | b"way" | b"relation" => {
                        let begin = try_at!(parse_begin(&start));
                        self.open = Some(begin.kind);
                        return Some(Ok(Event::Begin(begin)));
                    }
                    // "tag", "nd" and "member" must be self-closing
                    _ => {}
                },

                quick_xml::events::Event::End(end) => match end.local_name().as_ref() {
                    b"node" | b"way" | b"relation" => {
                        if let Some(kind) = self.open.take() {
                            return Some(Ok(Event::End(kind)));
                        }
                    }
                    _ => {}
                },

                quick_xml::events::Event::Eof => {
                    self.eof = true;
                }

                _ => {}
            }
        }

        None
    }
}

fn parse_begin(start: &BytesStart<'_>) -> Result<Begin, ParseErrorKind> {
    let kind = match start.local_name().as_ref() {
        b"node" => EntityKind::Node,
        b"way" => EntityKind::Way,
        _ => EntityKind::Relation,
    };

    let mut id: Option<i64> = None;
    let mut lat: Option<Coord> = None;
    let mut lon: Option<Coord> = None;
    let mut action = Action::None;

    for attr in start.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"id" => id = Some(parse_number(&attr.value, "id")?),
            b"lat" if kind == EntityKind::Node => {
                lat = Some(Coord::parse(attr_str(&attr.value)?)?)
            }
            b"lon" if kind == EntityKind::Node => {
                lon = Some(Coord::parse(attr_str(&attr.value)?)?)
            }
            b"action" => action = parse_action(&attr.value)?,
            _ => {}
        }
    }

    let id = id.ok_or(ParseErrorKind::MissingAttribute("id"))?;
    let lonlat = if kind == EntityKind::Node {
        let lat = lat.ok_or(ParseErrorKind::MissingAttribute("lat"))?;
        let lon = lon.ok_or(ParseErrorKind::MissingAttribute("lon"))?;
        Some(LonLat::new(lon, lat))
    } else {
        None
    };

    Ok(Begin {
        kind,
        id,
        lonlat,
        action,
    })
}

fn parse_tag(start: &BytesStart<'_>) -> Result<(String, String), ParseErrorKind> {
    let mut key = None;
    let mut value = None;

    for attr in start.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"k" => key = Some(unescape(&attr)?),
            b"v" => value = Some(unescape(&attr)?),
            _ => {}
        }
    }

    match (key, value) {
        (Some(k), Some(v)) => Ok((k, v)),
        (None, _) => Err(ParseErrorKind::MissingAttribute("k")),
        (_, None) => Err(ParseErrorKind::MissingAttribute("v")),
    }
}

fn parse_nd(start: &BytesStart<'_>) -> Result<i64, ParseErrorKind> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"ref" {
            return parse_number(&attr.value, "ref");
        }
    }
    Err(ParseErrorKind::MissingAttribute("ref"))
}

fn parse_member(start: &BytesStart<'_>) -> Result<Member, ParseErrorKind> {
    let mut kind = None;
    let mut id: Option<i64> = None;
    let mut role = None;

    for attr in start.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"type" => {
                kind = Some(match attr.value.as_ref() {
                    b"node" => EntityKind::Node,
                    b"way" => EntityKind::Way,
                    b"relation" => EntityKind::Relation,
                    _ => return Err(ParseErrorKind::BadMemberType),
                })
            }
            b"ref" => id = Some(parse_number(&attr.value, "ref")?),
            b"role" => role = Some(unescape(&attr)?),
            _ => {}
        }
    }

    match (kind, id, role) {
        (Some(kind), Some(id), Some(role)) => Ok(Member { kind, id, role }),
        (None, _, _) => Err(ParseErrorKind::MissingAttribute("type")),
        (_, None, _) => Err(ParseErrorKind::MissingAttribute("ref")),
        (_, _, None) => Err(ParseErrorKind::MissingAttribute("role")),
    }
}

fn parse_action(value: &[u8]) -> Result<Action, ParseErrorKind> {
    match value {
        b"create" => Ok(Action::Create),
        b"modify" => Ok(Action::Modify),
        b"delete" => Ok(Action::Delete),
        _ => Err(ParseErrorKind::BadAction),
    }
}

fn parse_number(value: &[u8], name: &'static str) -> Result<i64, ParseErrorKind> {
    attr_str(value)?
        .parse()
        .map_err(|_| ParseErrorKind::BadNumber(name))
}

fn attr_str(value: &[u8]) -> Result<&str, ParseErrorKind> {
    from_utf8(value).map_err(|_| ParseErrorKind::Utf8)
}

fn unescape(attr: &Attribute<'_>) -> Result<String, ParseErrorKind> {
    attr.unescape_value()
        .map(|v| v.into_owned())
        .map_err(ParseErrorKind::Xml)
}
