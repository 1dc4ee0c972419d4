//! Encoder tokenizing document text.

use quick_xml::{
    events::{BytesStart, Event},
    name::{Namespace, ResolveResult},
    reader::NsReader,
};
use thiserror::Error;
use tracing::debug;

use super::{
    codebook::Codebook,
    header::DocumentHeader,
    token::{GlobalToken, TagToken},
};

/// Errors occurring while encoding document text.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The text is not well-formed.
    #[error("Malformed document text: {0}.")]
    Xml(String),
    /// An element is in no namespace.
    #[error("Element `{0}` is in no namespace.")]
    NoNamespace(String),
    /// An element's namespace has no code page.
    #[error("Unknown namespace `{0}`.")]
    UnknownNamespace(String),
    /// An element is missing from its code page.
    #[error("Unknown element `{name}` in namespace `{namespace}`.")]
    UnknownElement { namespace: String, name: String },
    /// An element carries an attribute other than a namespace declaration.
    #[error("Found unsupported attribute `{0}`.")]
    Attribute(String),
    /// Found text before or after the root element.
    #[error("Found text outside the root element.")]
    TextOutsideRoot,
    /// Found a second root element.
    #[error("Found more than one root element.")]
    MultipleRoots,
    /// The text ended with elements still open.
    #[error("Reached the end of the text with {0} element(s) open.")]
    UnclosedElements(usize),
    /// The text holds no root element.
    #[error("Found no root element.")]
    MissingRoot,
}

impl From<quick_xml::Error> for EncodeError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err.to_string())
    }
}

/// Accumulates tokens, deferring each start tag until it is known whether the
/// element has content.
///
/// Whitespace-only text is held back: it is dropped when a child element
/// follows or precedes it, and kept as content otherwise.
struct Encoder {
    out: Vec<u8>,
    page: u8,
    pending: Option<u8>,
    blank: String,
    after_child: bool,
    depth: usize,
    closed_root: bool,
}

impl Encoder {
    fn new() -> Self {
        let mut out = Vec::new();
        DocumentHeader::ACTIVESYNC.write(&mut out);

        Self {
            out,
            page: 0,
            pending: None,
            blank: String::new(),
            after_child: false,
            depth: 0,
            closed_root: false,
        }
    }

    fn flush(&mut self) {
        if let Some(identity) = self.pending.take() {
            self.out.push(TagToken::new(identity, true).to_byte());
        }
    }

    fn open(&mut self, page: u8, identity: u8) -> Result<(), EncodeError> {
        if self.closed_root {
            Err(EncodeError::MultipleRoots)?;
        }

        self.flush();

        if page != self.page {
            self.out.push(GlobalToken::SwitchPage as u8);
            self.out.push(page);
            self.page = page;
        }

        self.pending = Some(identity);
        self.blank.clear();
        self.after_child = false;
        self.depth += 1;

        Ok(())
    }

    fn close(&mut self) {
        if !self.after_child && !self.blank.is_empty() {
            let blank = std::mem::take(&mut self.blank);
            self.flush();
            self.write_str(&blank);
        }

        match self.pending.take() {
            Some(identity) => self.out.push(TagToken::new(identity, false).to_byte()),
            None => self.out.push(GlobalToken::End as u8),
        }

        self.blank.clear();
        self.after_child = true;

        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.closed_root = true;
        }
    }

    fn text(&mut self, text: &str) -> Result<(), EncodeError> {
        if text.trim().is_empty() {
            if self.depth > 0 {
                self.blank.push_str(text);
            }
            return Ok(());
        }

        if self.depth == 0 {
            Err(EncodeError::TextOutsideRoot)?;
        }

        self.flush();

        let blank = std::mem::take(&mut self.blank);
        self.write_str(&(blank + text));

        Ok(())
    }

    fn write_str(&mut self, text: &str) {
        self.out.push(GlobalToken::StrI as u8);
        self.out.extend_from_slice(text.as_bytes());
        self.out.push(0x00);
    }
}

/// Encode document text into a byte vector.
///
/// Every element must be in a namespace naming a code page. Whitespace-only
/// text between elements is dropped; all other text is written inline.
pub fn encode(text: &str, codebook: &Codebook) -> Result<Vec<u8>, EncodeError> {
    let mut reader = NsReader::from_str(text);
    let mut encoder = Encoder::new();

    loop {
        let (namespace, event) = reader.read_resolved_event()?;

        match event {
            Event::Start(e) => {
                let (page, identity) = resolve(codebook, namespace, &e)?;
                encoder.open(page, identity)?;
            }
            Event::Empty(e) => {
                let (page, identity) = resolve(codebook, namespace, &e)?;
                encoder.open(page, identity)?;
                encoder.close();
            }
            Event::End(_) => encoder.close(),
            Event::Text(e) => {
                let text = e.unescape().map_err(|err| EncodeError::Xml(err.to_string()))?;
                encoder.text(&text)?;
            }
            Event::CData(e) => encoder.text(&String::from_utf8_lossy(&e))?,
            Event::Eof => break,
            _ => {}
        }
    }

    if encoder.depth != 0 {
        Err(EncodeError::UnclosedElements(encoder.depth))?;
    }

    if !encoder.closed_root {
        Err(EncodeError::MissingRoot)?;
    }

    debug!(length = encoder.out.len(), "encoded document");

    Ok(encoder.out)
}

/// Resolve a start tag to a code page and tag identity, rejecting attributes.
fn resolve(
    codebook: &Codebook,
    namespace: ResolveResult,
    e: &BytesStart,
) -> Result<(u8, u8), EncodeError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| EncodeError::Xml(err.to_string()))?;

        if attr.key.as_namespace_binding().is_none() {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            Err(EncodeError::Attribute(key))?;
        }
    }

    let local = e.local_name();
    let name = String::from_utf8_lossy(local.as_ref());

    let namespace = match namespace {
        ResolveResult::Bound(Namespace(ns)) => String::from_utf8_lossy(ns).into_owned(),
        _ => Err(EncodeError::NoNamespace(name.to_string()))?,
    };

    let page = codebook
        .page_by_namespace(&namespace)
        .ok_or_else(|| EncodeError::UnknownNamespace(namespace.clone()))?;

    let identity = codebook
        .tag_identity(page.number, &name)
        .ok_or_else(|| EncodeError::UnknownElement {
            namespace,
            name: name.to_string(),
        })?;

    Ok((page.number, identity))
}
