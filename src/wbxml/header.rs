//! Document header and the primitives shared by every stage.

use thiserror::Error;

/// An error reading a document header or one of its primitives.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// Unexpectedly reached the end of the slice.
    #[error("Unexpectedly reached the end of the slice.")]
    EndOfSlice,
    /// A multi-byte integer is longer than five bytes or overflows.
    #[error("Malformed multi-byte integer.")]
    MalformedInteger,
    /// The character set is neither UTF-8 nor a subset of it.
    #[error("Unsupported character set ({0}).")]
    UnsupportedCharset(u32),
    /// An offset points outside the string table.
    #[error("String table offset {0} is out of range.")]
    StringTableReference(u32),
}

/// Identifier of the document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicId {
    /// A well-known identifier (`1` is "unknown").
    Known(u32),
    /// An offset into the string table holding the identifier.
    StringTable(u32),
}

/// Character sets whose strings decode as UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Unspecified,
    UsAscii,
    Utf8,
}

impl Charset {
    /// Look up a character set by its IANA MIBenum.
    pub fn from_mib(mib: u32) -> Option<Self> {
        match mib {
            0 => Some(Self::Unspecified),
            3 => Some(Self::UsAscii),
            106 => Some(Self::Utf8),
            _ => None,
        }
    }

    pub fn mib(self) -> u32 {
        match self {
            Self::Unspecified => 0,
            Self::UsAscii => 3,
            Self::Utf8 => 106,
        }
    }
}

/// The fields preceding the document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    pub version: u8,
    pub public_id: PublicId,
    pub charset: Charset,
    pub string_table: Vec<u8>,
}

impl DocumentHeader {
    /// The header every ActiveSync document carries: version 1.3, unknown
    /// public identifier, UTF-8, no string table.
    pub const ACTIVESYNC: Self = Self {
        version: 0x03,
        public_id: PublicId::Known(1),
        charset: Charset::Utf8,
        string_table: Vec::new(),
    };

    /// Read a header from the start of a slice, advancing the offset past it.
    pub fn read(r: &[u8], i: &mut usize) -> Result<Self, HeaderError> {
        let [version] = take(r, i)?;

        let public_id = match read_mb_u_int32(r, i)? {
            0 => PublicId::StringTable(read_mb_u_int32(r, i)?),
            id => PublicId::Known(id),
        };

        let mib = read_mb_u_int32(r, i)?;
        let charset = Charset::from_mib(mib).ok_or(HeaderError::UnsupportedCharset(mib))?;

        let length = read_mb_u_int32(r, i)? as usize;
        let string_table = take_slice(r, i, length)?.to_vec();

        Ok(Self {
            version,
            public_id,
            charset,
            string_table,
        })
    }

    /// Append this header to a buffer.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.push(self.version);

        match self.public_id {
            PublicId::Known(id) => write_mb_u_int32(out, id),
            PublicId::StringTable(offset) => {
                write_mb_u_int32(out, 0);
                write_mb_u_int32(out, offset);
            }
        }

        write_mb_u_int32(out, self.charset.mib());
        write_mb_u_int32(out, self.string_table.len() as u32);
        out.extend_from_slice(&self.string_table);
    }

    /// Retrieve the NUL-terminated string starting at an offset of the string
    /// table.
    pub fn string_at(&self, offset: u32) -> Result<&[u8], HeaderError> {
        let tail = self
            .string_table
            .get(offset as usize..)
            .ok_or(HeaderError::StringTableReference(offset))?;

        let end = tail
            .iter()
            .position(|b| *b == 0)
            .ok_or(HeaderError::StringTableReference(offset))?;

        Ok(&tail[..end])
    }
}

/// Take an exact number of bytes from an offset in a slice, advancing the offset.
pub(crate) fn take<const N: usize>(r: &[u8], i: &mut usize) -> Result<[u8; N], HeaderError> {
    let bytes = take_slice(r, i, N)?;
    let mut buf = [0; N];
    buf.copy_from_slice(bytes);
    Ok(buf)
}

/// Take a run of bytes from an offset in a slice, advancing the offset.
pub(crate) fn take_slice<'a>(
    r: &'a [u8],
    i: &mut usize,
    n: usize,
) -> Result<&'a [u8], HeaderError> {
    let s = *i;
    let e = s.checked_add(n).ok_or(HeaderError::EndOfSlice)?;
    let bytes = r.get(s..e).ok_or(HeaderError::EndOfSlice)?;
    *i = e;
    Ok(bytes)
}

/// Take bytes up to a NUL terminator, advancing the offset past the terminator.
pub(crate) fn take_terminated<'a>(r: &'a [u8], i: &mut usize) -> Result<&'a [u8], HeaderError> {
    let tail = r.get(*i..).ok_or(HeaderError::EndOfSlice)?;
    let end = tail
        .iter()
        .position(|b| *b == 0)
        .ok_or(HeaderError::EndOfSlice)?;

    *i += end + 1;
    Ok(&tail[..end])
}

/// Read a big-endian base-128 integer of at most five bytes.
pub(crate) fn read_mb_u_int32(r: &[u8], i: &mut usize) -> Result<u32, HeaderError> {
    let mut value: u32 = 0;

    for _ in 0..5 {
        let [b] = take(r, i)?;

        if value > u32::MAX >> 7 {
            Err(HeaderError::MalformedInteger)?;
        }

        value = (value << 7) | u32::from(b & 0x7F);

        if b & 0x80 == 0 {
            return Ok(value);
        }
    }

    Err(HeaderError::MalformedInteger)
}

/// Append a big-endian base-128 integer.
pub(crate) fn write_mb_u_int32(out: &mut Vec<u8>, mut value: u32) {
    let mut buf = [0u8; 5];
    let mut n = buf.len() - 1;

    buf[n] = (value & 0x7F) as u8;
    value >>= 7;

    while value != 0 {
        n -= 1;
        buf[n] = 0x80 | (value & 0x7F) as u8;
        value >>= 7;
    }

    out.extend_from_slice(&buf[n..]);
}
