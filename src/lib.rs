//! Device identity from ActiveSync provisioning documents.
//!
//! A provisioning request carries a device's model, IMEI, friendly name, phone
//! number and mobile operator inside a WAP Binary XML document. This crate
//! decodes such documents, strips characters that may not appear in document
//! text, and flattens the identity into a `||`-separated record:
//!
//! ```text
//! MIX 2||888833336669999||MIX 2||+8618599999999||中国联通 (46001)
//! ```
//!
//! Most users should begin with [`Pipeline`]. The [`wbxml`] module exposes the
//! binary codec on its own, and [`ffi`] provides a C ABI for host processes.
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `cli`: build the `easprov` binary (default).

pub mod document;
pub mod ffi;
pub mod pipeline;
pub mod record;
pub mod sanitize;
pub mod wbxml;

pub use document::{FromElement, FromElements, ParseError, ProvisioningDocument};
pub use pipeline::{CodecConfiguration, Error, Pipeline, READ_CAPACITY, read_bounded};
pub use record::FieldRecord;
pub use wbxml::ProtocolVersion;
