//! Flattened device-identity record.

use std::fmt::{self, Display, Formatter};

use crate::document::ProvisioningDocument;

/// The five device-identity fields of a provisioning document, in the order
/// consumers read them.
///
/// Fields are positional: an absent field is an empty string, never omitted.
/// The separator is not escaped, so a value containing it corrupts the
/// serialized record.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldRecord {
    model: String,
    imei: String,
    friendly_name: String,
    phone_number: String,
    mobile_operator: String,
}

impl FieldRecord {
    pub const SEPARATOR: &'static str = "||";

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn imei(&self) -> &str {
        &self.imei
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn mobile_operator(&self) -> &str {
        &self.mobile_operator
    }

    /// All fields in serialization order.
    pub fn fields(&self) -> [&str; 5] {
        [
            &self.model,
            &self.imei,
            &self.friendly_name,
            &self.phone_number,
            &self.mobile_operator,
        ]
    }
}

impl From<&ProvisioningDocument> for FieldRecord {
    fn from(document: &ProvisioningDocument) -> Self {
        Self {
            model: document.model().to_string(),
            imei: document.imei().to_string(),
            friendly_name: document.friendly_name().to_string(),
            phone_number: document.phone_number().to_string(),
            mobile_operator: document.mobile_operator().to_string(),
        }
    }
}

impl Display for FieldRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fields().join(Self::SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DeviceSettings, Policy};

    #[test]
    fn extract_in_fixed_order() {
        let document = ProvisioningDocument {
            settings: Some(DeviceSettings {
                model: Some("MIX 2".into()),
                imei: Some("888833336669999".into()),
                friendly_name: Some("MIX 2".into()),
                os: Some("Android 8.0.0".into()),
                phone_number: Some("+8618599999999".into()),
                user_agent: Some("Android/8.0.0-EAS-1.3".into()),
                mobile_operator: Some("中国联通 (46001)".into()),
            }),
            policy: Some(Policy {
                policy_type: Some("MS-EAS-Provisioning-WBXML".into()),
            }),
        };

        let record = FieldRecord::from(&document);
        assert_eq!(
            record.to_string(),
            "MIX 2||888833336669999||MIX 2||+8618599999999||中国联通 (46001)"
        );
    }

    #[test]
    fn absent_fields_keep_their_position() {
        assert_eq!(FieldRecord::default().to_string(), "||||");

        let document = ProvisioningDocument {
            settings: Some(DeviceSettings {
                imei: Some("1".into()),
                mobile_operator: Some("2".into()),
                ..Default::default()
            }),
            policy: None,
        };

        let record = FieldRecord::from(&document);
        assert_eq!(record.fields(), ["", "1", "", "", "2"]);
        assert_eq!(record.to_string(), "||1||||||2");
    }

    #[test]
    fn separator_is_not_escaped() {
        let document = ProvisioningDocument {
            settings: Some(DeviceSettings {
                model: Some("a||b".into()),
                ..Default::default()
            }),
            policy: None,
        };

        let record = FieldRecord::from(&document);
        assert_eq!(record.to_string().split(FieldRecord::SEPARATOR).count(), 6);
    }
}
