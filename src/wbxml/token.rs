//! Single-byte tokens of the document body.

use either::Either::{self, Left, Right};
use tartan_bitfield::bitfield;
use zerocopy::TryFromBytes;

/// A token with the same meaning on every code page.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromBytes)]
pub enum GlobalToken {
    SwitchPage = 0x00,
    End = 0x01,
    Entity = 0x02,
    StrI = 0x03,
    Literal = 0x04,
    ExtI0 = 0x40,
    ExtI1 = 0x41,
    ExtI2 = 0x42,
    Pi = 0x43,
    LiteralC = 0x44,
    ExtT0 = 0x80,
    ExtT1 = 0x81,
    ExtT2 = 0x82,
    StrT = 0x83,
    LiteralA = 0x84,
    Ext0 = 0xC0,
    Ext1 = 0xC1,
    Ext2 = 0xC2,
    Opaque = 0xC3,
    LiteralAc = 0xC4,
}

bitfield! {
    struct TagByte(u8) {
        [0..6] identity: u8,
        [6] has_content,
        [7] has_attributes,
    }
}

/// A tag token, resolved against the current code page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagToken {
    pub identity: u8,
    pub has_content: bool,
    pub has_attributes: bool,
}

impl TagToken {
    /// Largest identity representable in a tag byte.
    pub const MAX_IDENTITY: u8 = 0x3F;

    pub fn new(identity: u8, has_content: bool) -> Self {
        Self {
            identity,
            has_content,
            has_attributes: false,
        }
    }

    pub fn to_byte(self) -> u8 {
        let mut tag = TagByte(0);
        tag.set_identity(self.identity);
        tag.set_has_content(self.has_content);
        tag.set_has_attributes(self.has_attributes);
        tag.0
    }
}

impl From<u8> for TagToken {
    fn from(r: u8) -> Self {
        let tag = TagByte(r);

        Self {
            identity: tag.identity(),
            has_content: tag.has_content(),
            has_attributes: tag.has_attributes(),
        }
    }
}

/// Split a body byte into a global token or a tag token.
///
/// Global tokens occupy identities `0x00..=0x04` of every flag combination,
/// so the two sets never overlap.
pub fn classify(r: u8) -> Either<GlobalToken, TagToken> {
    let token: Result<GlobalToken, _> = zerocopy::try_transmute!(r);

    match token {
        Ok(token) => Left(token),
        Err(_) => Right(TagToken::from(r)),
    }
}
