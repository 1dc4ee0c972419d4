//! Decode, sanitize and extract, as one configured pipeline.

use std::io::Read;

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    document::{ParseError, ProvisioningDocument},
    record::FieldRecord,
    sanitize::sanitize,
    wbxml::{self, Codebook, DecodeError, EncodeError, ProtocolVersion},
};

/// Most bytes read from a single input.
pub const READ_CAPACITY: usize = 102400;

/// Read at most [`READ_CAPACITY`] bytes, silently dropping the remainder.
pub fn read_bounded(r: impl Read) -> std::io::Result<Vec<u8>> {
    let mut data = Vec::new();
    r.take(READ_CAPACITY as u64).read_to_end(&mut data)?;
    Ok(data)
}

/// Errors occurring while extracting a record.
#[derive(Debug, Error)]
pub enum Error {
    /// The binary document could not be decoded.
    #[error("Failed to decode document: {0}")]
    Decode(#[from] DecodeError),
    /// The decoded text is not a provisioning document.
    #[error("Failed to parse document: {0}")]
    Parse(#[from] ParseError),
}

/// The protocol revision shared by both codec directions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfiguration {
    pub protocol: ProtocolVersion,
}

impl CodecConfiguration {
    pub fn new(protocol: ProtocolVersion) -> Self {
        Self { protocol }
    }
}

/// Binary documents to device-identity records.
///
/// By default, extraction failures are logged and replaced with an all-empty
/// record. Call [`Pipeline::propagate_errors`] to receive them instead.
#[derive(Debug, Clone)]
pub struct Pipeline {
    codebook: Codebook,
    propagate_errors: bool,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(CodecConfiguration::default())
    }
}

impl Pipeline {
    pub fn new(config: CodecConfiguration) -> Self {
        Self {
            codebook: Codebook::new(config.protocol),
            propagate_errors: false,
        }
    }

    /// Return extraction failures rather than an empty record.
    pub fn propagate_errors(mut self, propagate: bool) -> Self {
        self.propagate_errors = propagate;
        self
    }

    pub fn configuration(&self) -> CodecConfiguration {
        CodecConfiguration::new(self.codebook.version())
    }

    /// Decode a binary document to text, unsanitized.
    pub fn decode(&self, data: &[u8]) -> Result<String, DecodeError> {
        wbxml::decode(data, &self.codebook)
    }

    /// Encode document text. The text is not sanitized.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, EncodeError> {
        wbxml::encode(text, &self.codebook)
    }

    /// Extract the device-identity record from a binary document.
    ///
    /// Unless errors are propagated, this never fails.
    pub fn extract(&self, data: &[u8]) -> Result<FieldRecord, Error> {
        match self.try_extract(data) {
            Ok(record) => Ok(record),
            Err(err) if !self.propagate_errors => {
                warn!(%err, "substituting empty record");
                Ok(FieldRecord::default())
            }
            Err(err) => Err(err),
        }
    }

    fn try_extract(&self, data: &[u8]) -> Result<FieldRecord, Error> {
        let text = self.decode(data)?;
        let text = sanitize(&text);

        debug!(length = text.len(), "decoded document");

        let document = ProvisioningDocument::parse(&text)?;

        Ok(FieldRecord::from(&document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"<O:Provision xmlns:O="Provision" xmlns:S="Settings">
    <S:DeviceInformation>
        <S:Set>
            <S:Model>MIX 2</S:Model>
            <S:IMEI>888833336669999</S:IMEI>
        </S:Set>
    </S:DeviceInformation>
</O:Provision>"#;

    #[test]
    fn extract_encoded_document() {
        let pipeline = Pipeline::default();
        let data = pipeline.encode(DOCUMENT).unwrap();

        let record = pipeline.extract(&data).unwrap();
        assert_eq!(record.to_string(), "MIX 2||888833336669999||||||");
    }

    #[test]
    fn extract_suppresses_failures_by_default() {
        let pipeline = Pipeline::default();

        let record = pipeline.extract(&[0x03, 0x01, 0x6A, 0x00, 0x00, 0x63]).unwrap();
        assert_eq!(record, FieldRecord::default());

        let record = pipeline.extract(b"not a binary document").unwrap();
        assert_eq!(record.to_string(), "||||");
    }

    #[test]
    fn extract_propagates_failures_on_request() {
        let pipeline = Pipeline::default().propagate_errors(true);

        let err = pipeline.extract(&[0x03, 0x01, 0x6A]).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));

        // A settings document decodes, but has the wrong root.
        let data = pipeline
            .encode(r#"<S:Settings xmlns:S="Settings"/>"#)
            .unwrap();
        let err = pipeline.extract(&data).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::UnexpectedRoot { .. })));
    }

    #[test]
    fn decoded_text_is_sanitized_before_parsing() {
        let pipeline = Pipeline::default().propagate_errors(true);

        // <O:Provision><S:DeviceInformation><S:Set><S:Model>"A\x01B"</S:Model>
        let data = [
            0x03, 0x01, 0x6A, 0x00, 0x00, 0x0E, 0x45, 0x00, 0x12, 0x56, 0x48, 0x57, 0x03, b'A',
            0x01, b'B', 0x00, 0x01, 0x01, 0x01, 0x01,
        ];

        assert!(pipeline.decode(&data).unwrap().contains("A\u{1}B"));
        assert_eq!(pipeline.extract(&data).unwrap().model(), "AB");
    }

    #[test]
    fn configuration_selects_codebook() {
        let config = CodecConfiguration::new(ProtocolVersion::V12_1);
        let pipeline = Pipeline::new(config);
        assert_eq!(pipeline.configuration(), config);

        let text = r#"<S:MobileOperator xmlns:S="Settings">x</S:MobileOperator>"#;
        assert!(pipeline.encode(text).is_err());
        assert!(Pipeline::default().encode(text).is_ok());
    }

    #[test]
    fn read_bounded_truncates() {
        let data = vec![0x41; READ_CAPACITY + 10];
        assert_eq!(read_bounded(data.as_slice()).unwrap().len(), READ_CAPACITY);
        assert_eq!(read_bounded(&b"abc"[..]).unwrap(), b"abc");
    }
}
