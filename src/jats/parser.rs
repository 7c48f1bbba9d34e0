//! Event-driven JATS parser.
//!
//! One `DocumentAssembler` is created per document and discarded afterwards:
//! all mutable state (element path, text accumulators, section and builder
//! stacks) is local to that pass, so independent parser instances can run
//! concurrently without locking.

use std::collections::HashMap;

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::jats::render::render_article;
use crate::jats::ParseError;
use crate::models::{
    AbstractSection, Article, Author, BodySection, FigureInfo, ReferenceInfo, TableInfo,
};

const EUROPE_PMC_IMAGE_BASE: &str = "https://europepmc.org/articles";

/// Parser for JATS/NLM full-text XML.
///
/// A parser instance only carries the optional PMC identifier used to
/// resolve figure image URLs; per-document state lives in the assembler
/// constructed by each call, so one instance may be reused or shared.
#[derive(Debug, Clone, Default)]
pub struct JatsParser {
    pmcid: Option<String>,
}

impl JatsParser {
    pub fn new() -> Self {
        Self { pmcid: None }
    }

    /// Create a parser that resolves figure graphics against the given
    /// PMC identifier (with or without the `PMC` prefix).
    pub fn with_pmcid(pmcid: impl Into<String>) -> Self {
        Self {
            pmcid: Some(pmcid.into()),
        }
    }

    /// Parse a JATS document into an [`Article`].
    pub fn parse(&self, xml: &str) -> Result<Article, ParseError> {
        DocumentAssembler::new(self.pmcid.clone()).run(xml)
    }

    /// Parse and render to a flat HTML string.
    ///
    /// Produces the same semantic content as [`parse`](Self::parse)
    /// followed by [`render_article`].
    pub fn render_html(&self, xml: &str) -> Result<String, ParseError> {
        let article = self.parse(xml)?;
        Ok(render_article(&article))
    }
}

/// Inline style tags rewrite to display markup instead of being stripped.
fn inline_markup(tag: &str) -> Option<(&'static str, &'static str)> {
    match tag {
        "bold" => Some(("<strong>", "</strong>")),
        "italic" => Some(("<em>", "</em>")),
        "sub" => Some(("<sub>", "</sub>")),
        "sup" => Some(("<sup>", "</sup>")),
        "monospace" => Some(("<code>", "</code>")),
        _ => None,
    }
}

/// Elements whose character data is collected into a dedicated accumulator.
fn is_capture_tag(tag: &str) -> bool {
    matches!(
        tag,
        "article-title"
            | "journal-title"
            | "title"
            | "p"
            | "label"
            | "surname"
            | "given-names"
            | "aff"
            | "volume"
            | "issue"
            | "fpage"
            | "lpage"
            | "year"
            | "source"
            | "article-id"
            | "pub-id"
            | "mixed-citation"
            | "citation"
            | "td"
            | "th"
    )
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One open element on the path stack.
struct Frame {
    name: String,
    /// This element pushed a text accumulator that must be popped on close.
    buffered: bool,
    /// Closing markup to emit into the enclosing accumulator (inline
    /// styles and anchors).
    close: Option<&'static str>,
}

#[derive(Default)]
struct SectionBuilder {
    title: String,
    paragraphs: Vec<String>,
    children: Vec<BodySection>,
}

impl SectionBuilder {
    fn build(self) -> BodySection {
        BodySection {
            title: self.title,
            paragraphs: self.paragraphs,
            children: self.children,
        }
    }
}

#[derive(Default)]
struct TableBuilder {
    id: String,
    label: String,
    caption: String,
    html: String,
    cell: Option<PendingCell>,
}

struct PendingCell {
    tag: String,
    attrs: String,
}

impl TableBuilder {
    fn build(self) -> TableInfo {
        TableInfo {
            id: self.id,
            label: self.label,
            caption: self.caption,
            html: self.html,
        }
    }
}

#[derive(Default)]
struct FigureBuilder {
    id: String,
    label: String,
    caption: String,
    graphic: Option<String>,
}

impl FigureBuilder {
    fn build(self, pmcid: Option<&str>) -> FigureInfo {
        let image_url = match (self.graphic.as_deref(), pmcid) {
            (Some(graphic), Some(pmcid)) if !pmcid.is_empty() => {
                let digits = pmcid.trim_start_matches("PMC");
                let filename = graphic.rsplit('/').next().unwrap_or(graphic);
                let suffix = if filename.contains('.') { "" } else { ".jpg" };
                Some(format!(
                    "{}/PMC{}/bin/{}{}",
                    EUROPE_PMC_IMAGE_BASE, digits, graphic, suffix
                ))
            }
            _ => None,
        };

        FigureInfo {
            id: self.id,
            label: self.label,
            caption: self.caption,
            image_url,
        }
    }
}

#[derive(Default)]
struct ReferenceBuilder {
    id: String,
    label: String,
    raw_citation: String,
    authors: Vec<String>,
    title: String,
    source: String,
    year: String,
    volume: String,
    issue: String,
    fpage: String,
    lpage: String,
    doi: String,
    pmid: String,
    cur_surname: String,
    cur_given: String,
}

impl ReferenceBuilder {
    fn finish_name(&mut self) {
        if !self.cur_surname.is_empty() {
            let name = if self.cur_given.is_empty() {
                self.cur_surname.clone()
            } else {
                format!("{} {}", self.cur_surname, self.cur_given)
            };
            self.authors.push(name);
        }
        self.cur_surname.clear();
        self.cur_given.clear();
    }

    fn build(self) -> ReferenceInfo {
        ReferenceInfo {
            id: self.id,
            label: self.label,
            raw_citation: self.raw_citation,
            authors: self.authors,
            title: self.title,
            source: self.source,
            year: self.year,
            volume: self.volume,
            issue: self.issue,
            fpage: self.fpage,
            lpage: self.lpage,
            doi: self.doi,
            pmid: self.pmid,
        }
    }
}

/// Which float builder is currently open, as an explicit tag so the event
/// handlers dispatch on the enum rather than on runtime type checks.
enum OpenBuilder {
    Table(TableBuilder),
    Figure(FigureBuilder),
    Reference(ReferenceBuilder),
}

#[derive(Default)]
struct PendingAuthor {
    surname: String,
    given_names: String,
    affiliations: Vec<String>,
    aff_rids: Vec<String>,
}

/// Per-document parse state.
struct DocumentAssembler {
    pmcid_hint: Option<String>,

    path: Vec<Frame>,
    buffers: Vec<String>,

    article: Article,

    section_stack: Vec<SectionBuilder>,
    builders: Vec<OpenBuilder>,

    in_abstract: bool,
    in_body: bool,
    abstract_pending: Option<AbstractSection>,
    loose_paragraphs: Vec<String>,

    current_author: Option<PendingAuthor>,
    pending_authors: Vec<PendingAuthor>,
    affiliations: HashMap<String, String>,
    pending_aff_id: Option<String>,

    pending_id_type: Option<String>,
    pending_pubid_type: Option<String>,

    seen_element: bool,
}

impl DocumentAssembler {
    fn new(pmcid_hint: Option<String>) -> Self {
        Self {
            pmcid_hint,
            path: Vec::new(),
            buffers: Vec::new(),
            article: Article::default(),
            section_stack: Vec::new(),
            builders: Vec::new(),
            in_abstract: false,
            in_body: false,
            abstract_pending: None,
            loose_paragraphs: Vec::new(),
            current_author: None,
            pending_authors: Vec::new(),
            affiliations: HashMap::new(),
            pending_aff_id: None,
            pending_id_type: None,
            pending_pubid_type: None,
            seen_element: false,
        }
    }

    fn run(mut self, xml: &str) -> Result<Article, ParseError> {
        let mut reader = Reader::from_reader(xml.as_bytes());
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    self.seen_element = true;
                    self.handle_start(e);
                }
                Ok(Event::Empty(ref e)) => {
                    self.seen_element = true;
                    self.handle_empty(e);
                }
                Ok(Event::Text(e)) => {
                    let text = match e.decode() {
                        Ok(cow) => partial_escape(&*cow).into_owned(),
                        // Unknown entities stay as-is; the raw form is
                        // already display-safe.
                        Err(_) => String::from_utf8_lossy(e.as_ref()).into_owned(),
                    };
                    self.push_text(&text);
                }
                Ok(Event::CData(e)) => {
                    let raw = String::from_utf8_lossy(e.as_ref()).into_owned();
                    let escaped = partial_escape(&raw).into_owned();
                    self.push_text(&escaped);
                }
                Ok(Event::GeneralRef(e)) => {
                    let name = String::from_utf8_lossy(e.as_ref()).into_owned();
                    self.push_entity(&name);
                }
                Ok(Event::End(_)) => self.handle_end(),
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(ParseError::MalformedDocument(format!(
                        "XML error at byte {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
            }
            buf.clear();
        }

        if !self.seen_element {
            return Err(ParseError::MalformedDocument(
                "no XML content found".to_string(),
            ));
        }

        self.finish()
    }

    fn finish(mut self) -> Result<Article, ParseError> {
        // Affiliation xrefs resolve once the whole document has been seen;
        // <aff> elements may follow the contrib group they describe.
        for pending in self.pending_authors.drain(..) {
            let mut affiliations = pending.affiliations;
            for rid in &pending.aff_rids {
                if let Some(text) = self.affiliations.get(rid) {
                    affiliations.push(text.clone());
                }
            }
            self.article.authors.push(Author {
                surname: pending.surname,
                given_names: if pending.given_names.is_empty() {
                    None
                } else {
                    Some(pending.given_names)
                },
                affiliations,
            });
        }

        debug!(
            title = %self.article.title,
            authors = self.article.authors.len(),
            sections = self.article.body_sections.len(),
            figures = self.article.figures.len(),
            tables = self.article.tables.len(),
            references = self.article.references.len(),
            "assembled article"
        );

        Ok(self.article)
    }

    // ===== element helpers =====

    fn in_path(&self, tag: &str) -> bool {
        self.path.iter().any(|f| f.name == tag)
    }

    fn parent_is(&self, tag: &str) -> bool {
        self.path
            .len()
            .checked_sub(2)
            .and_then(|i| self.path.get(i))
            .map(|f| f.name == tag)
            .unwrap_or(false)
    }

    fn push_text(&mut self, text: &str) {
        if let Some(top) = self.buffers.last_mut() {
            top.push_str(text);
        }
    }

    /// Entity references arrive as their own events. Predefined and
    /// numeric references resolve to characters; anything else (`&nbsp;`
    /// and friends) passes through verbatim, which is already valid in
    /// the HTML output.
    fn push_entity(&mut self, name: &str) {
        if let Some(resolved) = quick_xml::escape::resolve_predefined_entity(name) {
            let escaped = partial_escape(resolved).into_owned();
            self.push_text(&escaped);
        } else if let Some(num) = name.strip_prefix('#') {
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse().ok(),
            };
            if let Some(ch) = code.and_then(char::from_u32) {
                let mut utf8 = [0u8; 4];
                let escaped = partial_escape(&*ch.encode_utf8(&mut utf8)).into_owned();
                self.push_text(&escaped);
            }
        } else {
            self.push_text(&format!("&{};", name));
        }
    }

    fn attr(e: &BytesStart<'_>, name: &str) -> Option<String> {
        e.attributes().flatten().find_map(|a| {
            if a.key.local_name().as_ref() == name.as_bytes() {
                a.unescape_value().ok().map(|v| v.into_owned())
            } else {
                None
            }
        })
    }

    // ===== start events =====

    fn handle_start(&mut self, e: &BytesStart<'_>) {
        let tag = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
        let mut frame = Frame {
            name: tag.clone(),
            buffered: false,
            close: None,
        };

        if let Some((open, close)) = inline_markup(&tag) {
            if !self.buffers.is_empty() {
                self.push_text(open);
                frame.close = Some(close);
            }
            self.path.push(frame);
            return;
        }

        match tag.as_str() {
            "xref" => {
                let ref_type = Self::attr(e, "ref-type").unwrap_or_default();
                let rid = Self::attr(e, "rid").unwrap_or_default();
                if ref_type == "aff" {
                    if let Some(author) = self.current_author.as_mut() {
                        author.aff_rids.push(rid);
                    }
                } else if !self.buffers.is_empty() && !rid.is_empty() {
                    let escaped = quick_xml::escape::escape(&rid).into_owned();
                    self.push_text(&format!("<a href=\"#{}\">", escaped));
                    frame.close = Some("</a>");
                }
            }
            "ext-link" => {
                if let Some(href) = Self::attr(e, "href") {
                    if !self.buffers.is_empty() {
                        let escaped = quick_xml::escape::escape(&href).into_owned();
                        self.push_text(&format!("<a href=\"{}\">", escaped));
                        frame.close = Some("</a>");
                    }
                }
            }
            "abstract" => {
                self.in_abstract = true;
                self.abstract_pending = Some(AbstractSection::default());
            }
            "body" => self.in_body = true,
            "sec" => {
                if self.in_abstract {
                    self.flush_abstract_section();
                    self.abstract_pending = Some(AbstractSection::default());
                } else if self.in_body {
                    self.section_stack.push(SectionBuilder::default());
                }
            }
            "table-wrap" => {
                self.builders.push(OpenBuilder::Table(TableBuilder {
                    id: Self::attr(e, "id").unwrap_or_default(),
                    ..Default::default()
                }));
            }
            "fig" => {
                self.builders.push(OpenBuilder::Figure(FigureBuilder {
                    id: Self::attr(e, "id").unwrap_or_default(),
                    ..Default::default()
                }));
            }
            "ref" => {
                self.builders.push(OpenBuilder::Reference(ReferenceBuilder {
                    id: Self::attr(e, "id").unwrap_or_default(),
                    ..Default::default()
                }));
            }
            "contrib" => {
                let contrib_type = Self::attr(e, "contrib-type");
                if contrib_type.as_deref().unwrap_or("author") == "author" {
                    self.current_author = Some(PendingAuthor::default());
                }
            }
            "aff" => {
                self.pending_aff_id = Self::attr(e, "id");
            }
            "article-id" => {
                self.pending_id_type = Self::attr(e, "pub-id-type");
            }
            "pub-id" => {
                self.pending_pubid_type = Self::attr(e, "pub-id-type");
            }
            "graphic" | "inline-graphic" => {
                if let Some(OpenBuilder::Figure(fig)) = self.builders.last_mut() {
                    if fig.graphic.is_none() {
                        fig.graphic = Self::attr(e, "href");
                    }
                }
            }
            "table" | "thead" | "tbody" | "tfoot" | "tr" => {
                if let Some(OpenBuilder::Table(table)) = self.builders.last_mut() {
                    table.html.push('<');
                    table.html.push_str(&tag);
                    table.html.push('>');
                }
            }
            "td" | "th" => {
                if let Some(OpenBuilder::Table(table)) = self.builders.last_mut() {
                    let mut attrs = String::new();
                    for name in ["colspan", "rowspan"] {
                        if let Some(value) = Self::attr(e, name) {
                            let escaped = quick_xml::escape::escape(&value).into_owned();
                            attrs.push_str(&format!(" {}=\"{}\"", name, escaped));
                        }
                    }
                    table.cell = Some(PendingCell {
                        tag: tag.clone(),
                        attrs,
                    });
                }
            }
            _ => {}
        }

        if is_capture_tag(&tag) {
            self.buffers.push(String::new());
            frame.buffered = true;
        }

        self.path.push(frame);
    }

    /// Self-closing elements: the interesting ones carry only attributes.
    fn handle_empty(&mut self, e: &BytesStart<'_>) {
        let tag = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
        match tag.as_str() {
            "graphic" | "inline-graphic" => {
                if let Some(OpenBuilder::Figure(fig)) = self.builders.last_mut() {
                    if fig.graphic.is_none() {
                        fig.graphic = Self::attr(e, "href");
                    }
                }
            }
            "xref" => {
                let ref_type = Self::attr(e, "ref-type").unwrap_or_default();
                if ref_type == "aff" {
                    if let Some(author) = self.current_author.as_mut() {
                        author.aff_rids.push(Self::attr(e, "rid").unwrap_or_default());
                    }
                }
            }
            "break" => self.push_text("<br/>"),
            _ => {}
        }
    }

    // ===== end events =====

    fn handle_end(&mut self) {
        let Some(frame) = self.path.last() else {
            return;
        };
        let tag = frame.name.clone();
        let buffered = frame.buffered;
        let close = frame.close;

        if let Some(close) = close {
            self.push_text(close);
        }

        if buffered {
            let text = normalize_ws(&self.buffers.pop().unwrap_or_default());
            self.route_text(&tag, text);
        }

        match tag.as_str() {
            "abstract" => {
                self.flush_abstract_section();
                self.in_abstract = false;
            }
            "body" => {
                self.in_body = false;
                if !self.loose_paragraphs.is_empty() {
                    let paragraphs = std::mem::take(&mut self.loose_paragraphs);
                    self.article.body_sections.insert(
                        0,
                        BodySection {
                            title: String::new(),
                            paragraphs,
                            children: Vec::new(),
                        },
                    );
                }
            }
            "sec" => {
                if self.in_abstract {
                    self.flush_abstract_section();
                    self.abstract_pending = Some(AbstractSection::default());
                } else if self.in_body {
                    if let Some(builder) = self.section_stack.pop() {
                        let section = builder.build();
                        match self.section_stack.last_mut() {
                            Some(parent) => parent.children.push(section),
                            None => self.article.body_sections.push(section),
                        }
                    }
                }
            }
            "table-wrap" => {
                if let Some(OpenBuilder::Table(table)) = self.builders.pop() {
                    self.article.tables.push(table.build());
                }
            }
            "fig" => {
                if let Some(OpenBuilder::Figure(fig)) = self.builders.pop() {
                    let pmcid = self
                        .pmcid_hint
                        .clone()
                        .filter(|id| !id.is_empty())
                        .or_else(|| {
                            if self.article.pmcid.is_empty() {
                                None
                            } else {
                                Some(self.article.pmcid.clone())
                            }
                        });
                    self.article.figures.push(fig.build(pmcid.as_deref()));
                }
            }
            "ref" => {
                if let Some(OpenBuilder::Reference(reference)) = self.builders.pop() {
                    self.article.references.push(reference.build());
                }
            }
            "table" | "thead" | "tbody" | "tfoot" | "tr" => {
                if let Some(OpenBuilder::Table(table)) = self.builders.last_mut() {
                    table.html.push_str(&format!("</{}>", tag));
                }
            }
            "contrib" => {
                if let Some(author) = self.current_author.take() {
                    if !author.surname.is_empty() {
                        self.pending_authors.push(author);
                    }
                }
            }
            "name" | "string-name" => {
                if self.in_path("element-citation") {
                    if let Some(OpenBuilder::Reference(reference)) = self.builders.last_mut() {
                        reference.finish_name();
                    }
                }
            }
            _ => {}
        }

        self.path.pop();
    }

    fn flush_abstract_section(&mut self) {
        if let Some(pending) = self.abstract_pending.take() {
            if !pending.title.is_empty() || !pending.content.is_empty() {
                self.article.abstract_sections.push(pending);
            }
        }
    }

    /// Route a finished accumulator to its destination. Text that closes
    /// inside an enclosing accumulator (a table cell, a mixed citation)
    /// bubbles back up so document order is preserved.
    fn route_text(&mut self, tag: &str, text: String) {
        let has_parent_buffer = !self.buffers.is_empty();
        let in_caption = self.in_path("caption");
        let in_element_citation = self.in_path("element-citation");
        let in_contrib = self.in_path("contrib");

        match tag {
            "p" => {
                if has_parent_buffer {
                    self.push_text(&text);
                } else if let Some(builder) = self.builders.last_mut() {
                    if in_caption {
                        match builder {
                            OpenBuilder::Figure(fig) => append_part(&mut fig.caption, &text),
                            OpenBuilder::Table(table) => append_part(&mut table.caption, &text),
                            OpenBuilder::Reference(_) => {}
                        }
                    }
                } else if self.in_abstract {
                    if text.is_empty() {
                        return;
                    }
                    if let Some(pending) = self.abstract_pending.as_mut() {
                        if !pending.content.is_empty() {
                            pending.content.push('\n');
                        }
                        pending.content.push_str(&text);
                    }
                } else if self.in_body && !text.is_empty() {
                    match self.section_stack.last_mut() {
                        Some(section) => section.paragraphs.push(text),
                        None => self.loose_paragraphs.push(text),
                    }
                }
            }
            "title" => {
                if let Some(builder) = self.builders.last_mut() {
                    if in_caption {
                        match builder {
                            OpenBuilder::Figure(fig) => append_part(&mut fig.caption, &text),
                            OpenBuilder::Table(table) => append_part(&mut table.caption, &text),
                            OpenBuilder::Reference(_) => {}
                        }
                    }
                } else if self.in_abstract {
                    if let Some(pending) = self.abstract_pending.as_mut() {
                        if pending.title.is_empty() {
                            pending.title = text;
                        }
                    }
                } else if self.in_body && self.parent_is("sec") {
                    if let Some(section) = self.section_stack.last_mut() {
                        if section.title.is_empty() {
                            section.title = text;
                        }
                    }
                }
            }
            "article-title" => {
                if matches!(self.builders.last(), Some(OpenBuilder::Reference(_))) {
                    if in_element_citation {
                        if let Some(OpenBuilder::Reference(reference)) = self.builders.last_mut() {
                            reference.title = text;
                        }
                    } else {
                        self.push_text(&text);
                    }
                } else if self.in_path("title-group") && self.article.title.is_empty() {
                    self.article.title = text;
                }
            }
            "journal-title" => {
                if self.article.journal.is_empty() && !self.in_path("ref") {
                    self.article.journal = text;
                }
            }
            "label" => {
                if let Some(builder) = self.builders.last_mut() {
                    match builder {
                        OpenBuilder::Figure(fig) => fig.label = text,
                        OpenBuilder::Table(table) => table.label = text,
                        OpenBuilder::Reference(reference) => reference.label = text,
                    }
                }
            }
            "surname" => {
                if in_contrib {
                    if let Some(author) = self.current_author.as_mut() {
                        author.surname = text;
                    }
                } else if in_element_citation {
                    if let Some(OpenBuilder::Reference(reference)) = self.builders.last_mut() {
                        reference.cur_surname = text;
                    }
                } else {
                    self.push_text(&text);
                }
            }
            "given-names" => {
                if in_contrib {
                    if let Some(author) = self.current_author.as_mut() {
                        author.given_names = text;
                    }
                } else if in_element_citation {
                    if let Some(OpenBuilder::Reference(reference)) = self.builders.last_mut() {
                        reference.cur_given = text;
                    }
                } else {
                    self.push_text(&text);
                }
            }
            "aff" => {
                if in_contrib {
                    if let Some(author) = self.current_author.as_mut() {
                        if !text.is_empty() {
                            author.affiliations.push(text);
                        }
                    }
                } else if let Some(id) = self.pending_aff_id.take() {
                    self.affiliations.insert(id, text);
                }
            }
            "source" => {
                if matches!(self.builders.last(), Some(OpenBuilder::Reference(_))) {
                    if in_element_citation {
                        if let Some(OpenBuilder::Reference(reference)) = self.builders.last_mut() {
                            reference.source = text;
                        }
                    } else {
                        self.push_text(&text);
                    }
                }
            }
            "year" | "volume" | "issue" | "fpage" | "lpage" => {
                self.route_numbered_field(tag, text, in_element_citation);
            }
            "article-id" => {
                let id_type = self.pending_id_type.take().unwrap_or_default();
                let slot = match id_type.as_str() {
                    "doi" => Some(&mut self.article.doi),
                    "pmid" => Some(&mut self.article.pmid),
                    "pmc" | "pmcid" => Some(&mut self.article.pmcid),
                    _ => None,
                };
                if let Some(slot) = slot {
                    if slot.is_empty() {
                        *slot = text;
                    }
                }
            }
            "pub-id" => {
                let id_type = self.pending_pubid_type.take().unwrap_or_default();
                if matches!(self.builders.last(), Some(OpenBuilder::Reference(_))) {
                    if in_element_citation {
                        if let Some(OpenBuilder::Reference(reference)) = self.builders.last_mut() {
                            match id_type.as_str() {
                                "doi" => reference.doi = text,
                                "pmid" => reference.pmid = text,
                                _ => {}
                            }
                        }
                    } else {
                        self.push_text(&text);
                    }
                }
            }
            "mixed-citation" | "citation" => {
                if let Some(OpenBuilder::Reference(reference)) = self.builders.last_mut() {
                    reference.raw_citation = text;
                }
            }
            "td" | "th" => {
                if let Some(OpenBuilder::Table(table)) = self.builders.last_mut() {
                    if let Some(cell) = table.cell.take() {
                        table.html.push_str(&format!(
                            "<{}{}>{}</{}>",
                            cell.tag, cell.attrs, text, cell.tag
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    /// year/volume/issue/fpage/lpage live both in citations and in the
    /// article's own metadata; context decides which one this was.
    fn route_numbered_field(&mut self, tag: &str, text: String, in_element_citation: bool) {
        if matches!(self.builders.last(), Some(OpenBuilder::Reference(_))) {
            if in_element_citation {
                if let Some(OpenBuilder::Reference(reference)) = self.builders.last_mut() {
                    let slot = match tag {
                        "year" => &mut reference.year,
                        "volume" => &mut reference.volume,
                        "issue" => &mut reference.issue,
                        "fpage" => &mut reference.fpage,
                        _ => &mut reference.lpage,
                    };
                    if slot.is_empty() {
                        *slot = text;
                    }
                }
            } else {
                self.push_text(&text);
            }
            return;
        }

        if self.in_path("article-meta") && !self.in_abstract {
            let slot = match tag {
                "year" if self.in_path("pub-date") => Some(&mut self.article.year),
                "year" => None,
                "volume" => Some(&mut self.article.volume),
                "issue" => Some(&mut self.article.issue),
                "fpage" => Some(&mut self.article.fpage),
                _ => Some(&mut self.article.lpage),
            };
            if let Some(slot) = slot {
                if slot.is_empty() {
                    *slot = text;
                }
            }
        }
    }
}

fn append_part(target: &mut String, part: &str) {
    if part.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(part);
}
