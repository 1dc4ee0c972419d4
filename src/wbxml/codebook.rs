//! Code pages mapping tag identities to ActiveSync element names.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// An ActiveSync protocol revision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtocolVersion {
    V12_0,
    V12_1,
    V14_0,
    #[default]
    V14_1,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::V12_0 => "12.0",
            Self::V12_1 => "12.1",
            Self::V14_0 => "14.0",
            Self::V14_1 => "14.1",
        })
    }
}

/// The protocol revision is not one this crate knows.
#[derive(Debug, Error)]
#[error("Unknown protocol version `{0}`.")]
pub struct UnknownVersion(String);

impl FromStr for ProtocolVersion {
    type Err = UnknownVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "12.0" => Ok(Self::V12_0),
            "12.1" => Ok(Self::V12_1),
            "14.0" => Ok(Self::V14_0),
            "14.1" => Ok(Self::V14_1),
            _ => Err(UnknownVersion(s.to_string())),
        }
    }
}

/// A tag and the revision that introduced it.
#[derive(Debug)]
pub struct Tag {
    pub identity: u8,
    pub name: &'static str,
    pub since: ProtocolVersion,
}

/// A set of tags sharing an XML namespace.
#[derive(Debug)]
pub struct CodePage {
    pub number: u8,
    pub namespace: &'static str,
    pub prefix: &'static str,
    tags: &'static [Tag],
}

/// Tag dictionaries for one protocol revision.
#[derive(Debug, Clone, Copy)]
pub struct Codebook {
    version: ProtocolVersion,
}

impl Codebook {
    pub fn new(version: ProtocolVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Look up a code page by number.
    pub fn page(&self, number: u8) -> Option<&'static CodePage> {
        PAGES.iter().find(|p| p.number == number)
    }

    /// Look up a code page by namespace, ignoring a trailing colon.
    pub fn page_by_namespace(&self, namespace: &str) -> Option<&'static CodePage> {
        let namespace = namespace.strip_suffix(':').unwrap_or(namespace);
        PAGES.iter().find(|p| p.namespace == namespace)
    }

    /// Resolve a tag identity on a page to an element name.
    pub fn tag_name(&self, page: u8, identity: u8) -> Option<&'static str> {
        self.tags(page)
            .find(|t| t.identity == identity)
            .map(|t| t.name)
    }

    /// Resolve an element name on a page to a tag identity.
    pub fn tag_identity(&self, page: u8, name: &str) -> Option<u8> {
        self.tags(page)
            .find(|t| t.name == name)
            .map(|t| t.identity)
    }

    fn tags(&self, page: u8) -> impl Iterator<Item = &'static Tag> {
        let version = self.version;

        self.page(page)
            .into_iter()
            .flat_map(|p| p.tags)
            .filter(move |t| t.since <= version)
    }
}

impl Default for Codebook {
    fn default() -> Self {
        Self::new(ProtocolVersion::default())
    }
}

macro_rules! tags {
    (@since) => { ProtocolVersion::V12_0 };
    (@since $since:ident) => { ProtocolVersion::$since };
    ($($identity:literal => $name:literal $(since $since:ident)?),* $(,)?) => {
        &[$(Tag {
            identity: $identity,
            name: $name,
            since: tags!(@since $($since)?),
        }),*]
    };
}

static PAGES: [CodePage; 5] = [
    CodePage {
        number: 0,
        namespace: "AirSync",
        prefix: "A",
        tags: tags! {
            0x05 => "Sync",
            0x06 => "Responses",
            0x07 => "Add",
            0x08 => "Change",
            0x09 => "Delete",
            0x0A => "Fetch",
            0x0B => "SyncKey",
            0x0C => "ClientId",
            0x0D => "ServerId",
            0x0E => "Status",
            0x0F => "Collection",
            0x10 => "Class",
            0x12 => "CollectionId",
            0x13 => "GetChanges",
            0x14 => "MoreAvailable",
            0x15 => "WindowSize",
            0x16 => "Commands",
            0x17 => "Options",
            0x18 => "FilterType",
            0x1B => "Conflict",
            0x1C => "Collections",
            0x1D => "ApplicationData",
            0x1E => "DeletesAsMoves",
            0x20 => "Supported",
            0x21 => "SoftDelete",
            0x22 => "MIMESupport",
            0x23 => "MIMETruncation",
            0x24 => "Wait",
            0x25 => "Limit",
            0x26 => "Partial",
            0x27 => "ConversationMode" since V14_0,
            0x28 => "MaxItems" since V14_0,
            0x29 => "HeartbeatInterval" since V14_0,
        },
    },
    CodePage {
        number: 7,
        namespace: "FolderHierarchy",
        prefix: "FH",
        tags: tags! {
            0x07 => "DisplayName",
            0x08 => "ServerId",
            0x09 => "ParentId",
            0x0A => "Type",
            0x0C => "Status",
            0x0E => "Changes",
            0x0F => "Add",
            0x10 => "Delete",
            0x11 => "Update",
            0x12 => "SyncKey",
            0x13 => "FolderCreate",
            0x14 => "FolderDelete",
            0x15 => "FolderUpdate",
            0x16 => "FolderSync",
            0x17 => "Count",
        },
    },
    CodePage {
        number: 13,
        namespace: "Ping",
        prefix: "P",
        tags: tags! {
            0x05 => "Ping",
            0x06 => "AutdState",
            0x07 => "Status",
            0x08 => "HeartbeatInterval",
            0x09 => "Folders",
            0x0A => "Folder",
            0x0B => "Id",
            0x0C => "Class",
            0x0D => "MaxFolders",
        },
    },
    CodePage {
        number: 14,
        namespace: "Provision",
        prefix: "O",
        tags: tags! {
            0x05 => "Provision",
            0x06 => "Policies",
            0x07 => "Policy",
            0x08 => "PolicyType",
            0x09 => "PolicyKey",
            0x0A => "Data",
            0x0B => "Status",
            0x0C => "RemoteWipe",
            0x0D => "EASProvisionDoc",
            0x0E => "DevicePasswordEnabled",
            0x0F => "AlphanumericDevicePasswordRequired",
            0x10 => "RequireStorageCardEncryption",
            0x11 => "PasswordRecoveryEnabled",
            0x13 => "AttachmentsEnabled",
            0x14 => "MinDevicePasswordLength",
            0x15 => "MaxInactivityTimeDeviceLock",
            0x16 => "MaxDevicePasswordFailedAttempts",
            0x17 => "MaxAttachmentSize",
            0x18 => "AllowSimpleDevicePassword",
            0x19 => "DevicePasswordExpiration",
            0x1A => "DevicePasswordHistory",
            0x1B => "AllowStorageCard",
            0x1C => "AllowCamera",
            0x1D => "RequireDeviceEncryption",
            0x1E => "AllowUnsignedApplications",
            0x1F => "AllowUnsignedInstallationPackages",
            0x20 => "MinDevicePasswordComplexCharacters",
            0x21 => "AllowWiFi",
            0x22 => "AllowTextMessaging",
            0x23 => "AllowPOPIMAPEmail",
            0x24 => "AllowBluetooth",
            0x25 => "AllowIrDA",
            0x26 => "RequireManualSyncWhenRoaming",
            0x27 => "AllowDesktopSync",
            0x28 => "MaxCalendarAgeFilter",
            0x29 => "AllowHTMLEmail",
            0x2A => "MaxEmailAgeFilter",
            0x2B => "MaxEmailBodyTruncationSize",
            0x2C => "MaxEmailHTMLBodyTruncationSize",
            0x2D => "RequireSignedSMIMEMessages",
            0x2E => "RequireEncryptedSMIMEMessages",
            0x2F => "RequireSignedSMIMEAlgorithm",
            0x30 => "RequireEncryptionSMIMEAlgorithm",
            0x31 => "AllowSMIMEEncryptionAlgorithmNegotiation",
            0x32 => "AllowSMIMESoftCerts",
            0x33 => "AllowBrowser",
            0x34 => "AllowConsumerEmail",
            0x35 => "AllowRemoteDesktop",
            0x36 => "AllowInternetSharing",
            0x37 => "UnapprovedInROMApplicationList",
            0x38 => "ApplicationName",
            0x39 => "ApprovedApplicationList",
            0x3A => "Hash",
        },
    },
    CodePage {
        number: 18,
        namespace: "Settings",
        prefix: "S",
        tags: tags! {
            0x05 => "Settings",
            0x06 => "Status",
            0x07 => "Get",
            0x08 => "Set",
            0x09 => "Oof",
            0x0A => "OofState",
            0x0B => "StartTime",
            0x0C => "EndTime",
            0x0D => "OofMessage",
            0x0E => "AppliesToInternal",
            0x0F => "AppliesToExternalKnown",
            0x10 => "AppliesToExternalUnknown",
            0x11 => "Enabled",
            0x12 => "ReplyMessage",
            0x13 => "BodyType",
            0x14 => "DevicePassword",
            0x15 => "Password",
            0x16 => "DeviceInformation" since V12_1,
            0x17 => "Model" since V12_1,
            0x18 => "IMEI" since V12_1,
            0x19 => "FriendlyName" since V12_1,
            0x1A => "OS" since V12_1,
            0x1B => "OSLanguage" since V12_1,
            0x1C => "PhoneNumber" since V12_1,
            0x1D => "UserInformation",
            0x1E => "EmailAddresses",
            0x1F => "SmtpAddress",
            0x20 => "UserAgent" since V12_1,
            0x21 => "EnableOutboundSMS" since V14_0,
            0x22 => "MobileOperator" since V14_0,
            0x23 => "PrimarySmtpAddress" since V14_0,
            0x24 => "Accounts" since V14_0,
            0x25 => "Account" since V14_0,
            0x26 => "AccountId" since V14_0,
            0x27 => "AccountName" since V14_0,
            0x28 => "UserDisplayName" since V14_0,
            0x29 => "SendDisabled" since V14_0,
            0x2B => "RightsManagementInformation" since V14_1,
        },
    },
];
