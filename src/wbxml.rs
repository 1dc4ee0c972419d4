//! Binary codec for ActiveSync documents.
//!
//! ActiveSync carries its XML documents in the WAP Binary XML format: a short
//! header followed by a stream of single-byte tokens. Element names are
//! replaced by tag identities, grouped into code pages (one per XML
//! namespace), and text is written inline or through a string table.
//!
//! [`decode`] renders a binary document as indented text; [`encode`] performs
//! the inverse. Both take a [`Codebook`] selecting the protocol revision whose
//! tags are recognized; documents passed between them must use the same one.

pub mod codebook;
pub mod decode;
pub mod encode;
pub mod header;
pub mod token;

pub use codebook::{Codebook, ProtocolVersion};
pub use decode::{DecodeError, decode};
pub use encode::{EncodeError, encode};
