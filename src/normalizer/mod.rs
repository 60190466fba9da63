//! Generic RSS 2.0 / Atom parsing.
//!
//! The document is scanned once for RSS `<item>` and Atom `<entry>` elements.
//! Each element's raw markup is then parsed on its own, so a broken entry
//! only costs that entry.

use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::{NsReader, Reader};
use regex::Regex;

use crate::app::{FinwireError, ItemParseError, Result};
use crate::domain::time::{parse_iso8601, parse_rfc2822};
use crate::domain::truncate_chars;

pub const ATOM_NS: &[u8] = b"http://www.w3.org/2005/Atom";
pub const TITLE_LIMIT: usize = 200;
pub const CONTENT_LIMIT: usize = 500;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[a-z][^>]*>").expect("valid tag regex"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Rss,
    Atom,
}

/// A feed entry before source metadata is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub kind: EntryKind,
    pub title: String,
    pub content: String,
    pub link: Option<String>,
    pub published_at: Option<chrono::DateTime<chrono::FixedOffset>>,
}

#[derive(Clone, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Parse a feed document into per-entry results, RSS items first.
    ///
    /// Fails only when the document itself cannot be read as XML.
    pub fn normalize(&self, body: &[u8]) -> Result<Vec<std::result::Result<FeedEntry, ItemParseError>>> {
        let xml = std::str::from_utf8(body)
            .map_err(|e| FinwireError::FeedParse(format!("feed is not UTF-8: {}", e)))?;

        let (rss, atom) = split_entries(xml)?;
        if rss.is_empty() && atom.is_empty() && !looks_like_feed(xml) {
            return Err(FinwireError::FeedParse("document has no RSS or Atom root".into()));
        }

        let entries = rss
            .into_iter()
            .map(|raw| parse_entry(EntryKind::Rss, raw))
            .chain(atom.into_iter().map(|raw| parse_entry(EntryKind::Atom, raw)))
            .collect();

        Ok(entries)
    }
}

fn looks_like_feed(xml: &str) -> bool {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return matches!(e.local_name().as_ref(), b"rss" | b"feed" | b"RDF" | b"channel");
            }
            Ok(Event::Eof) | Err(_) => return false,
            _ => {}
        }
    }
}

/// Collect the inner markup of every RSS item and Atom entry.
fn split_entries(xml: &str) -> Result<(Vec<&str>, Vec<&str>)> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().check_end_names = false;

    let mut rss = Vec::new();
    let mut atom = Vec::new();

    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| FinwireError::FeedParse(e.to_string()))?;
        let in_atom = matches!(ns, ResolveResult::Bound(Namespace(uri)) if uri == ATOM_NS);

        match event {
            Event::Start(start) => {
                let kind = match start.local_name().as_ref() {
                    b"item" if !in_atom => Some(EntryKind::Rss),
                    b"entry" if in_atom => Some(EntryKind::Atom),
                    _ => None,
                };
                let Some(kind) = kind else {
                    continue;
                };

                let span = reader
                    .read_to_end(start.name())
                    .map_err(|e| FinwireError::FeedParse(e.to_string()))?;
                let raw = &xml[span.start as usize..span.end as usize];
                match kind {
                    EntryKind::Rss => rss.push(raw),
                    EntryKind::Atom => atom.push(raw),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok((rss, atom))
}

#[derive(Default)]
struct Fields {
    title: String,
    description: String,
    summary: String,
    content: String,
    link: Option<String>,
    pub_date: String,
    updated: String,
    published: String,
}

impl Fields {
    fn slot(&mut self, kind: EntryKind, name: &[u8]) -> Option<&mut String> {
        match (kind, name) {
            (_, b"title") => Some(&mut self.title),
            (EntryKind::Rss, b"description") => Some(&mut self.description),
            (EntryKind::Rss, b"pubDate") => Some(&mut self.pub_date),
            (EntryKind::Atom, b"summary") => Some(&mut self.summary),
            (EntryKind::Atom, b"content") => Some(&mut self.content),
            (EntryKind::Atom, b"updated") => Some(&mut self.updated),
            (EntryKind::Atom, b"published") => Some(&mut self.published),
            _ => None,
        }
    }
}

fn parse_entry(kind: EntryKind, raw: &str) -> std::result::Result<FeedEntry, ItemParseError> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut fields = Fields::default();
    let mut rss_link = String::new();
    // child element of the entry currently being read
    let mut current: Option<Vec<u8>> = None;
    let mut depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ItemParseError::Xml(e.to_string()))?;

        match event {
            Event::Start(e) => {
                if depth == 0 {
                    if kind == EntryKind::Atom && e.local_name().as_ref() == b"link" {
                        take_atom_link(&e, &mut fields.link)?;
                    }
                    current = Some(e.local_name().as_ref().to_vec());
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 0 && kind == EntryKind::Atom && e.local_name().as_ref() == b"link" {
                    take_atom_link(&e, &mut fields.link)?;
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    current = None;
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| ItemParseError::Xml(e.to_string()))?;
                append_field(kind, &mut fields, &mut rss_link, current.as_deref(), &text);
            }
            Event::CData(c) => {
                let bytes = c.into_inner();
                let text = String::from_utf8_lossy(&bytes);
                append_field(kind, &mut fields, &mut rss_link, current.as_deref(), &text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if kind == EntryKind::Rss && !rss_link.trim().is_empty() {
        fields.link = Some(rss_link.trim().to_string());
    }

    let title = clean_text(&fields.title);
    if title.is_empty() {
        return Err(ItemParseError::EmptyTitle);
    }

    let (body, published_at) = match kind {
        EntryKind::Rss => (fields.description, parse_rfc2822(&fields.pub_date)),
        EntryKind::Atom => {
            let body = if fields.summary.trim().is_empty() {
                fields.content
            } else {
                fields.summary
            };
            let published_at = parse_iso8601(&fields.updated).or_else(|| parse_iso8601(&fields.published));
            (body, published_at)
        }
    };

    Ok(FeedEntry {
        kind,
        title: truncate_chars(&title, TITLE_LIMIT),
        content: truncate_chars(&clean_text(&body), CONTENT_LIMIT),
        link: fields.link,
        published_at,
    })
}

fn append_field(kind: EntryKind, fields: &mut Fields, rss_link: &mut String, current: Option<&[u8]>, text: &str) {
    let Some(name) = current else {
        return;
    };
    if kind == EntryKind::Rss && name == b"link" {
        rss_link.push_str(text);
        return;
    }
    if let Some(slot) = fields.slot(kind, name) {
        slot.push_str(text);
    }
}

/// Atom links: prefer `rel="alternate"` (or no rel), keep the first one seen.
fn take_atom_link(e: &BytesStart<'_>, link: &mut Option<String>) -> std::result::Result<(), ItemParseError> {
    let rel = e
        .try_get_attribute("rel")
        .map_err(|err| ItemParseError::Xml(err.to_string()))?
        .map(|a| String::from_utf8_lossy(&a.value).into_owned());
    if link.is_some() || !matches!(rel.as_deref(), None | Some("alternate")) {
        return Ok(());
    }

    if let Some(href) = e
        .try_get_attribute("href")
        .map_err(|err| ItemParseError::Xml(err.to_string()))?
    {
        let href = href
            .unescape_value()
            .map_err(|err| ItemParseError::Xml(err.to_string()))?;
        if !href.trim().is_empty() {
            *link = Some(href.trim().to_string());
        }
    }
    Ok(())
}

/// Decode entities, drop markup and collapse whitespace.
fn clean_text(s: &str) -> String {
    let decoded = decode_html_entities(s);
    let stripped = TAG_RE.replace_all(&decoded, " ");
    WS_RE.replace_all(&stripped, " ").trim().to_string()
}
