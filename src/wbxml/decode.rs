//! Slice-based decoder producing document text.

use std::borrow::Cow;

use either::Either::{Left, Right};
use quick_xml::escape::escape;
use thiserror::Error;
use tracing::debug;

use super::{
    codebook::{CodePage, Codebook},
    header::{
        DocumentHeader, HeaderError, read_mb_u_int32, take, take_slice, take_terminated,
    },
    token::{GlobalToken, classify},
};

/// Errors occurring while decoding from a slice.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Unexpectedly reached the end of the slice.
    #[error("Unexpectedly reached the end of the slice.")]
    EndOfSlice,
    /// A multi-byte integer is longer than five bytes or overflows.
    #[error("Malformed multi-byte integer.")]
    MalformedInteger,
    /// The document declares a character set other than UTF-8 or ASCII.
    #[error("Unsupported character set ({0}).")]
    UnsupportedCharset(u32),
    /// An offset points outside the string table.
    #[error("String table offset {0} is out of range.")]
    StringTableReference(u32),
    /// Switched to a code page missing from the codebook.
    #[error("Unknown code page ({0}).")]
    UnknownCodePage(u8),
    /// Found a tag missing from the current code page.
    #[error("Unknown tag {identity:#04x} on code page {page}.")]
    UnknownTag { page: u8, identity: u8 },
    /// Found a tag carrying attributes.
    #[error("Found unsupported attributes.")]
    Attributes,
    /// An entity names an invalid code point.
    #[error("Invalid entity ({0:#x}).")]
    Entity(u32),
    /// Found an end token with no open element.
    #[error("Found an end token with no open element.")]
    UnexpectedEnd,
    /// Found content before the root element.
    #[error("Found content outside the root element.")]
    ContentOutsideRoot,
    /// The body holds no root element.
    #[error("Found no root element.")]
    MissingRoot,
    /// Elements are nested more deeply than [`MAX_DEPTH`].
    #[error("Elements nest deeper than {0} levels.")]
    NestingTooDeep(usize),
}

/// Deepest element nesting accepted in a document body.
pub const MAX_DEPTH: usize = 64;

impl From<HeaderError> for DecodeError {
    fn from(err: HeaderError) -> Self {
        match err {
            HeaderError::EndOfSlice => Self::EndOfSlice,
            HeaderError::MalformedInteger => Self::MalformedInteger,
            HeaderError::UnsupportedCharset(mib) => Self::UnsupportedCharset(mib),
            HeaderError::StringTableReference(offset) => Self::StringTableReference(offset),
        }
    }
}

/// An element of the decoded tree.
#[derive(Debug)]
struct Element {
    /// Code page of a tag token, or `None` for a literal tag.
    page: Option<&'static CodePage>,
    name: Cow<'static, str>,
    content: Vec<Content>,
}

#[derive(Debug)]
enum Content {
    Element(Element),
    Text(String),
}

/// Decode a document from a slice, rendering it as text.
///
/// Bytes following the close of the root element are ignored.
pub fn decode(r: &[u8], codebook: &Codebook) -> Result<String, DecodeError> {
    let i = &mut 0; // Offset of the next unread byte.

    let header = DocumentHeader::read(r, i)?;
    debug!(version = header.version, charset = ?header.charset, "decoding document");

    let root = decode_body(r, i, &header, codebook)?;
    debug!(consumed = *i, trailing = r.len() - *i, "decoded document body");

    Ok(render(&root))
}

fn decode_body(
    r: &[u8],
    i: &mut usize,
    header: &DocumentHeader,
    codebook: &Codebook,
) -> Result<Element, DecodeError> {
    let mut page = 0;

    // Open elements, innermost last.
    let mut stack: Vec<Element> = Vec::new();

    loop {
        if *i >= r.len() {
            Err(if stack.is_empty() {
                DecodeError::MissingRoot
            } else {
                DecodeError::EndOfSlice
            })?;
        }

        let [b] = take(r, i)?;

        let (element, has_content) = match classify(b) {
            Left(GlobalToken::SwitchPage) => {
                let [number] = take(r, i)?;
                codebook
                    .page(number)
                    .ok_or(DecodeError::UnknownCodePage(number))?;
                page = number;
                continue;
            }
            Left(GlobalToken::End) => {
                let element = stack.pop().ok_or(DecodeError::UnexpectedEnd)?;
                match stack.last_mut() {
                    Some(parent) => parent.content.push(Content::Element(element)),
                    None => return Ok(element),
                }
                continue;
            }
            Left(GlobalToken::Entity) => {
                let code = read_mb_u_int32(r, i)?;
                let c = char::from_u32(code).ok_or(DecodeError::Entity(code))?;
                push_text(&mut stack, c.to_string())?;
                continue;
            }
            Left(GlobalToken::StrI) => {
                let s = take_terminated(r, i)?;
                push_text(&mut stack, String::from_utf8_lossy(s).into_owned())?;
                continue;
            }
            Left(GlobalToken::StrT) => {
                let offset = read_mb_u_int32(r, i)?;
                let s = header.string_at(offset)?;
                push_text(&mut stack, String::from_utf8_lossy(s).into_owned())?;
                continue;
            }
            Left(GlobalToken::Opaque) => {
                let length = read_mb_u_int32(r, i)? as usize;
                let s = take_slice(r, i, length)?;
                push_text(&mut stack, String::from_utf8_lossy(s).into_owned())?;
                continue;
            }
            Left(GlobalToken::Pi) => {
                skip_pi(r, i)?;
                continue;
            }
            Left(GlobalToken::ExtI0 | GlobalToken::ExtI1 | GlobalToken::ExtI2) => {
                take_terminated(r, i)?;
                continue;
            }
            Left(GlobalToken::ExtT0 | GlobalToken::ExtT1 | GlobalToken::ExtT2) => {
                read_mb_u_int32(r, i)?;
                continue;
            }
            Left(GlobalToken::Ext0 | GlobalToken::Ext1 | GlobalToken::Ext2) => continue,
            Left(GlobalToken::LiteralA | GlobalToken::LiteralAc) => Err(DecodeError::Attributes)?,
            Left(literal @ (GlobalToken::Literal | GlobalToken::LiteralC)) => {
                let offset = read_mb_u_int32(r, i)?;
                let name = String::from_utf8_lossy(header.string_at(offset)?).into_owned();

                let element = Element {
                    page: None,
                    name: Cow::Owned(name),
                    content: Vec::new(),
                };

                (element, literal == GlobalToken::LiteralC)
            }
            Right(tag) => {
                if tag.has_attributes {
                    Err(DecodeError::Attributes)?;
                }

                let name = codebook
                    .tag_name(page, tag.identity)
                    .ok_or(DecodeError::UnknownTag {
                        page,
                        identity: tag.identity,
                    })?;

                let element = Element {
                    page: codebook.page(page),
                    name: Cow::Borrowed(name),
                    content: Vec::new(),
                };

                (element, tag.has_content)
            }
        };

        if stack.len() >= MAX_DEPTH {
            Err(DecodeError::NestingTooDeep(MAX_DEPTH))?;
        }

        if has_content {
            stack.push(element);
        } else {
            match stack.last_mut() {
                Some(parent) => parent.content.push(Content::Element(element)),
                None => return Ok(element),
            }
        }
    }
}

fn push_text(stack: &mut [Element], text: String) -> Result<(), DecodeError> {
    let parent = stack.last_mut().ok_or(DecodeError::ContentOutsideRoot)?;
    parent.content.push(Content::Text(text));
    Ok(())
}

/// Skip a processing instruction, up to and including its end token.
///
/// Attribute codes are not interpreted; only the payloads of value tokens are
/// stepped over.
fn skip_pi(r: &[u8], i: &mut usize) -> Result<(), DecodeError> {
    loop {
        let [b] = take(r, i)?;

        match classify(b) {
            Left(GlobalToken::End) => return Ok(()),
            Left(GlobalToken::StrI | GlobalToken::ExtI0 | GlobalToken::ExtI1 | GlobalToken::ExtI2) => {
                take_terminated(r, i)?;
            }
            Left(
                GlobalToken::StrT
                | GlobalToken::Entity
                | GlobalToken::ExtT0
                | GlobalToken::ExtT1
                | GlobalToken::ExtT2
                | GlobalToken::Literal,
            ) => {
                read_mb_u_int32(r, i)?;
            }
            Left(GlobalToken::Opaque) => {
                let length = read_mb_u_int32(r, i)? as usize;
                take_slice(r, i, length)?;
            }
            Left(GlobalToken::SwitchPage) => {
                take::<1>(r, i)?;
            }
            _ => {}
        }
    }
}

/// Render a decoded tree as indented text, declaring every code page used on
/// the root element.
fn render(root: &Element) -> String {
    enum Step<'a> {
        Open(&'a Element, usize),
        Text(&'a str, usize),
        Close(&'a Element, usize),
    }

    let namespaces = namespaces(root);

    let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    let mut steps = vec![Step::Open(root, 0)];

    while let Some(step) = steps.pop() {
        match step {
            Step::Open(element, depth) => {
                indent(&mut out, depth);
                out.push('<');
                push_name(&mut out, element);

                if depth == 0 {
                    for page in &namespaces {
                        out.push_str(" xmlns:");
                        out.push_str(page.prefix);
                        out.push_str("=\"");
                        out.push_str(page.namespace);
                        out.push('"');
                    }
                }

                let text_only = element
                    .content
                    .iter()
                    .all(|c| matches!(c, Content::Text(_)));

                if element.content.is_empty() {
                    out.push_str("/>\n");
                } else if text_only {
                    out.push('>');
                    for content in &element.content {
                        if let Content::Text(text) = content {
                            out.push_str(&escape(text.as_str()));
                        }
                    }
                    out.push_str("</");
                    push_name(&mut out, element);
                    out.push_str(">\n");
                } else {
                    out.push_str(">\n");
                    steps.push(Step::Close(element, depth));
                    for content in element.content.iter().rev() {
                        steps.push(match content {
                            Content::Element(child) => Step::Open(child, depth + 1),
                            Content::Text(text) => Step::Text(text, depth + 1),
                        });
                    }
                }
            }
            Step::Text(text, depth) => {
                indent(&mut out, depth);
                out.push_str(&escape(text));
                out.push('\n');
            }
            Step::Close(element, depth) => {
                indent(&mut out, depth);
                out.push_str("</");
                push_name(&mut out, element);
                out.push_str(">\n");
            }
        }
    }

    out
}

/// Collect the code pages used in a tree, in order of first use.
fn namespaces(root: &Element) -> Vec<&'static CodePage> {
    let mut pages: Vec<&'static CodePage> = Vec::new();
    let mut pending = vec![root];

    while let Some(element) = pending.pop() {
        if let Some(page) = element.page {
            if !pages.iter().any(|p| p.number == page.number) {
                pages.push(page);
            }
        }

        for content in element.content.iter().rev() {
            if let Content::Element(child) = content {
                pending.push(child);
            }
        }
    }

    pages
}

fn push_name(out: &mut String, element: &Element) {
    if let Some(page) = element.page {
        out.push_str(page.prefix);
        out.push(':');
    }
    out.push_str(&element.name);
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}
