//! Document text model and the provisioning document.
//!
//! Documents are read by streaming their text and publishing to the
//! [`FromElements`] and [`FromElement`] traits. A receiver names the blocks it
//! wants by their path below the root element; the text of each direct child
//! element of a matched block is handed to the block's receiver.
//!
//! In most cases these traits can be derived. See the
//! [`FromElements`](macro@FromElements) and [`FromElement`](macro@FromElement)
//! macros for details.

use quick_xml::{
    events::{BytesStart, Event},
    reader::Reader,
};
use thiserror::Error;

/// Derive [`FromElements`] for a struct holding a collection of blocks.
///
/// # Example
///
/// To collect a single block, add the `block("path")` attribute to an
/// `Option<T>` struct field, where `path` is the `/`-separated list of element
/// names leading from (but excluding) the root to the block, and `T` is a type
/// implementing [`FromElement`] and [`Default`]. A repeated block is merged
/// into the earlier one, so its fields only replace those it sets again. To
/// collect every occurrence separately, apply the attribute to a `Vec<T>`
/// instead.
///
/// ```
/// #[derive(Debug, Default, FromElements)]
/// struct Response {
///     #[block("Policies/Policy")]
///     policy: Option<Policy>,
/// }
/// ```
pub use easprov_derive::FromElements;

/// Produce block receivers for a document.
///
/// See the [`FromElements`](macro@FromElements) derive macro for an automatic
/// implementation of this trait.
pub trait FromElements {
    /// Open a fresh receiver for the block at a path, if one exists.
    fn add_block(&mut self, path: &str) -> Option<&mut dyn FromElement>;
    /// Retrieve the receiver most recently opened for a path, if one exists.
    fn block(&mut self, path: &str) -> Option<&mut dyn FromElement>;
}

/// Derive [`FromElement`] for a struct representing a single block.
///
/// # Example
///
/// Add the `element("Name")` attribute to an `Option<T>` struct field, where
/// `Name` is the local name of a child element and `T` implements
/// `From<&str>`. A repeated element replaces the earlier value.
///
/// ```
/// #[derive(Debug, Default, FromElement)]
/// struct Policy {
///     #[element("PolicyType")]
///     policy_type: Option<String>,
///     #[element("PolicyKey")]
///     policy_key: Option<String>,
/// }
/// ```
pub use easprov_derive::FromElement;

/// Receive the text of a block's child elements.
///
/// The default implementation ignores received text.
#[allow(unused_variables)]
pub trait FromElement {
    /// Add the text of a child element, given by its local name.
    fn add_text(&mut self, name: &str, text: &str) {}
}

/// Errors occurring while reading document text.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The text is not well-formed.
    #[error("Malformed document text: {0}.")]
    Xml(String),
    /// The text holds no root element.
    #[error("Found no root element.")]
    MissingRoot,
    /// The root element has an unexpected name.
    #[error("Expected root element `{expected}`, found `{found}`.")]
    UnexpectedRoot { expected: String, found: String },
    /// The text ended with elements still open.
    #[error("Reached the end of the text with elements open.")]
    UnclosedElements,
    /// Elements are nested more deeply than [`MAX_DEPTH`].
    #[error("Elements nest deeper than {0} levels.")]
    NestingTooDeep(usize),
}

/// Deepest element nesting accepted, counting the root.
pub const MAX_DEPTH: usize = crate::wbxml::decode::MAX_DEPTH;

/// Read document text, publishing blocks below a named root to a receiver.
///
/// Element names are matched by their local part; namespace prefixes are
/// ignored. Anything after the root element closes is not read.
pub fn read(text: &str, root: &str, o: &mut impl FromElements) -> Result<(), ParseError> {
    let mut reader = Reader::from_str(text);

    // Names of open elements below the root.
    let mut path: Vec<String> = Vec::new();
    let mut seen_root = false;

    // Depth (in `path`) and path of the open block.
    let mut block: Option<(usize, String)> = None;
    // Name and accumulated text of the open child element of the block.
    let mut field: Option<(String, String)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| ParseError::Xml(err.to_string()))?;

        match event {
            Event::Start(e) if !seen_root => {
                check_root(&e, root)?;
                seen_root = true;
            }
            Event::Empty(e) if !seen_root => return check_root(&e, root),
            Event::Start(e) => {
                push(&mut path, &e)?;
                open(o, &path, &mut block, &mut field);
            }
            Event::Empty(e) => {
                push(&mut path, &e)?;
                open(o, &path, &mut block, &mut field);
                close(o, &mut path, &mut block, &mut field);
            }
            Event::End(_) => {
                if path.is_empty() {
                    return Ok(());
                }
                close(o, &mut path, &mut block, &mut field);
            }
            Event::Text(e) => {
                if let Some((_, acc)) = field_at(&mut field, &block, path.len()) {
                    let text = e.unescape().map_err(|err| ParseError::Xml(err.to_string()))?;
                    acc.push_str(&text);
                }
            }
            Event::CData(e) => {
                if let Some((_, acc)) = field_at(&mut field, &block, path.len()) {
                    acc.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::Eof => {
                Err(if seen_root {
                    ParseError::UnclosedElements
                } else {
                    ParseError::MissingRoot
                })?;
            }
            _ => {}
        }
    }
}

/// Push the name of an element opened below the root.
fn push(path: &mut Vec<String>, e: &BytesStart) -> Result<(), ParseError> {
    if path.len() + 1 >= MAX_DEPTH {
        Err(ParseError::NestingTooDeep(MAX_DEPTH))?;
    }

    path.push(local_name(e));
    Ok(())
}

/// Handle the start of the element at the top of `path`.
fn open(
    o: &mut impl FromElements,
    path: &[String],
    block: &mut Option<(usize, String)>,
    field: &mut Option<(String, String)>,
) {
    match block {
        Some((depth, _)) => {
            if path.len() == *depth + 1 {
                let name = path.last().cloned().unwrap_or_default();
                *field = Some((name, String::new()));
            }
        }
        None => {
            let joined = path.join("/");
            if o.add_block(&joined).is_some() {
                *block = Some((path.len(), joined));
            }
        }
    }
}

/// Handle the end of the element at the top of `path`, popping it.
fn close(
    o: &mut impl FromElements,
    path: &mut Vec<String>,
    block: &mut Option<(usize, String)>,
    field: &mut Option<(String, String)>,
) {
    let depth = block.as_ref().map(|(depth, _)| *depth);

    if depth == Some(path.len()) {
        *block = None;
    } else if depth.map(|d| d + 1) == Some(path.len()) {
        if let (Some((_, block_path)), Some((name, text))) = (block.as_ref(), field.take()) {
            if let Some(receiver) = o.block(block_path) {
                receiver.add_text(&name, &text);
            }
        }
    }

    path.pop();
}

/// The open field, if text at this depth belongs to it.
fn field_at<'a>(
    field: &'a mut Option<(String, String)>,
    block: &Option<(usize, String)>,
    depth: usize,
) -> Option<&'a mut (String, String)> {
    match block {
        Some((block_depth, _)) if depth == block_depth + 1 => field.as_mut(),
        _ => None,
    }
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn check_root(e: &BytesStart, root: &str) -> Result<(), ParseError> {
    let found = local_name(e);
    if found != root {
        Err(ParseError::UnexpectedRoot {
            expected: root.to_string(),
            found,
        })?;
    }
    Ok(())
}

/// Device identity reported by a provisioning request.
#[derive(Debug, Default, Clone, PartialEq, Eq, FromElement)]
pub struct DeviceSettings {
    #[element("Model")]
    pub model: Option<String>,
    #[element("IMEI")]
    pub imei: Option<String>,
    #[element("FriendlyName")]
    pub friendly_name: Option<String>,
    #[element("OS")]
    pub os: Option<String>,
    #[element("PhoneNumber")]
    pub phone_number: Option<String>,
    #[element("UserAgent")]
    pub user_agent: Option<String>,
    #[element("MobileOperator")]
    pub mobile_operator: Option<String>,
}

/// Policy requested by a provisioning request.
#[derive(Debug, Default, Clone, PartialEq, Eq, FromElement)]
pub struct Policy {
    #[element("PolicyType")]
    pub policy_type: Option<String>,
}

/// A provisioning request or response.
///
/// ```text
/// <O:Provision xmlns:O="Provision" xmlns:S="Settings">
///     <S:DeviceInformation>
///         <S:Set>
///             <S:Model>MIX 2</S:Model>
///             ...
///         </S:Set>
///     </S:DeviceInformation>
///     <O:Policies>
///         <O:Policy>
///             <O:PolicyType>MS-EAS-Provisioning-WBXML</O:PolicyType>
///         </O:Policy>
///     </O:Policies>
/// </O:Provision>
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, FromElements)]
pub struct ProvisioningDocument {
    #[block("DeviceInformation/Set")]
    pub settings: Option<DeviceSettings>,
    #[block("Policies/Policy")]
    pub policy: Option<Policy>,
}

impl ProvisioningDocument {
    pub const ROOT: &'static str = "Provision";

    /// Read a document from text.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut document = Self::default();
        read(text, Self::ROOT, &mut document)?;
        Ok(document)
    }

    /// Read a document from text, substituting an empty document on error.
    pub fn parse_lossy(text: &str) -> Self {
        Self::parse(text).unwrap_or_default()
    }

    fn setting(&self, f: impl Fn(&DeviceSettings) -> Option<&String>) -> &str {
        self.settings.as_ref().and_then(f).map_or("", String::as_str)
    }

    pub fn model(&self) -> &str {
        self.setting(|s| s.model.as_ref())
    }

    pub fn imei(&self) -> &str {
        self.setting(|s| s.imei.as_ref())
    }

    pub fn friendly_name(&self) -> &str {
        self.setting(|s| s.friendly_name.as_ref())
    }

    pub fn os(&self) -> &str {
        self.setting(|s| s.os.as_ref())
    }

    pub fn phone_number(&self) -> &str {
        self.setting(|s| s.phone_number.as_ref())
    }

    pub fn user_agent(&self) -> &str {
        self.setting(|s| s.user_agent.as_ref())
    }

    pub fn mobile_operator(&self) -> &str {
        self.setting(|s| s.mobile_operator.as_ref())
    }

    pub fn policy_type(&self) -> &str {
        self.policy
            .as_ref()
            .and_then(|p| p.policy_type.as_deref())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIX_2: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<O:Provision xmlns:O="Provision" xmlns:S="Settings">
    <S:DeviceInformation>
        <S:Set>
            <S:Model>MIX 2</S:Model>
            <S:IMEI>888833336669999</S:IMEI>
            <S:FriendlyName>MIX 2</S:FriendlyName>
            <S:OS>Android 8.0.0</S:OS>
            <S:PhoneNumber>+8618599999999</S:PhoneNumber>
            <S:UserAgent>Android/8.0.0-EAS-1.3</S:UserAgent>
            <S:MobileOperator>中国联通 (46001)</S:MobileOperator>
        </S:Set>
    </S:DeviceInformation>
    <O:Policies>
        <O:Policy>
            <O:PolicyType>MS-EAS-Provisioning-WBXML</O:PolicyType>
        </O:Policy>
    </O:Policies>
</O:Provision>
"#;

    #[test]
    fn parse_provisioning_document() {
        let document = ProvisioningDocument::parse(MIX_2).unwrap();

        assert_eq!(document.model(), "MIX 2");
        assert_eq!(document.imei(), "888833336669999");
        assert_eq!(document.friendly_name(), "MIX 2");
        assert_eq!(document.os(), "Android 8.0.0");
        assert_eq!(document.phone_number(), "+8618599999999");
        assert_eq!(document.user_agent(), "Android/8.0.0-EAS-1.3");
        assert_eq!(document.mobile_operator(), "中国联通 (46001)");
        assert_eq!(document.policy_type(), "MS-EAS-Provisioning-WBXML");
    }

    #[test]
    fn absent_fields_are_empty() {
        let document = ProvisioningDocument::parse("<Provision><Policies/></Provision>").unwrap();
        assert_eq!(document, ProvisioningDocument::default());
        assert_eq!(document.model(), "");
        assert_eq!(document.policy_type(), "");

        let document = ProvisioningDocument::parse("<Provision/>").unwrap();
        assert_eq!(document, ProvisioningDocument::default());
    }

    #[test]
    fn only_direct_children_of_a_block_are_fields() {
        let text = "<Provision><DeviceInformation><Set>\
                    <Model>A<Extra><Model>B</Model></Extra>C</Model>\
                    </Set></DeviceInformation>\
                    <Set><Model>D</Model></Set></Provision>";

        let document = ProvisioningDocument::parse(text).unwrap();
        assert_eq!(document.model(), "AC");
    }

    #[test]
    fn text_is_unescaped_and_cdata_joined() {
        let text = "<Provision><DeviceInformation><Set>\
                    <Model>a &amp; b<![CDATA[ <c>]]></Model><IMEI/>\
                    </Set></DeviceInformation></Provision>";

        let document = ProvisioningDocument::parse(text).unwrap();
        assert_eq!(document.model(), "a & b <c>");
        assert_eq!(document.settings.unwrap().imei, Some(String::new()));
    }

    #[test]
    fn repeated_blocks_merge_and_fields_replace() {
        let text = "<Provision><DeviceInformation>\
                    <Set><Model>A</Model><IMEI>1</IMEI></Set>\
                    <Set><Model>B</Model><Model>C</Model></Set>\
                    </DeviceInformation>\
                    <DeviceInformation><Set><OS>Android</OS></Set></DeviceInformation>\
                    </Provision>";

        let document = ProvisioningDocument::parse(text).unwrap();
        assert_eq!(document.model(), "C");
        assert_eq!(document.imei(), "1");
        assert_eq!(document.os(), "Android");
    }

    #[test]
    fn parse_errors() {
        let err = ProvisioningDocument::parse("<Settings/>").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedRoot { found, .. } if found == "Settings"));

        let err = ProvisioningDocument::parse("").unwrap_err();
        assert!(matches!(err, ParseError::MissingRoot));

        let err = ProvisioningDocument::parse("<Provision><Policies>").unwrap_err();
        assert!(matches!(err, ParseError::UnclosedElements | ParseError::Xml(_)));

        let err = ProvisioningDocument::parse("<Provision></Policies>").unwrap_err();
        assert!(matches!(err, ParseError::Xml(_)));
    }

    #[test]
    fn parse_limits_nesting() {
        let nested = |depth: usize| {
            let mut text = String::from("<Provision>");
            text.push_str(&"<a>".repeat(depth - 1));
            text.push_str(&"</a>".repeat(depth - 1));
            text.push_str("</Provision>");
            text
        };

        assert!(ProvisioningDocument::parse(&nested(MAX_DEPTH)).is_ok());

        let err = ProvisioningDocument::parse(&nested(MAX_DEPTH + 1)).unwrap_err();
        assert!(matches!(err, ParseError::NestingTooDeep(MAX_DEPTH)));

        let err = ProvisioningDocument::parse(&nested(100_000)).unwrap_err();
        assert!(matches!(err, ParseError::NestingTooDeep(MAX_DEPTH)));
    }

    #[test]
    fn parse_lossy_substitutes_empty_document() {
        let document = ProvisioningDocument::parse_lossy("<Provision><Policies>");
        assert_eq!(document, ProvisioningDocument::default());
    }
}
