//! Binary persistence for [`TrackBuilder`].
//!
//! ```text
//!  offset  size  field
//!  0       4     magic  "STRK"
//!  4       2     version (u16, LE)
//!  6       2     flags   (u16, LE, reserved = 0)
//!  8       4     CRC32 of body (u32, LE)
//!  12      ..    body: bincode-encoded TrackBuilder
//! ```
//!
//! The checksum is verified before decoding, and decoding a [`TrackBuilder`]
//! re-runs its constructor checks, so a corrupt blob never yields a
//! half-initialised track.

use std::{fs, path::Path};

use tracing::{debug, warn};

use crate::{
    error::{Result, TrackError},
    track::TrackBuilder,
};

pub const TRACK_MAGIC: [u8; 4] = *b"STRK";
pub const TRACK_VERSION: u16 = 1;
const HEADER_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    version: u16,
    flags: u16,
    crc32: u32,
}

impl Header {
    fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&TRACK_MAGIC);
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.flags.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.crc32.to_le_bytes());
        bytes
    }

    fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(TrackError::Truncated);
        }
        if bytes[0..4] != TRACK_MAGIC {
            return Err(TrackError::InvalidMagic);
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version > TRACK_VERSION {
            return Err(TrackError::UnsupportedVersion(version));
        }
        Ok(Self {
            version,
            flags: u16::from_le_bytes([bytes[6], bytes[7]]),
            crc32: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        })
    }
}

impl TrackBuilder {
    /// Encodes the builder, segments and image included, into a blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(self)?;
        let header = Header {
            version: TRACK_VERSION,
            flags: 0,
            crc32: crc32fast::hash(&body),
        };
        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(&header.to_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Decodes a blob written by [`to_bytes`](TrackBuilder::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Header::parse(bytes)?;
        let body = &bytes[HEADER_LEN..];

        let actual = crc32fast::hash(body);
        if actual != header.crc32 {
            return Err(TrackError::ChecksumMismatch {
                expected: header.crc32,
                actual,
            });
        }

        let builder: TrackBuilder = bincode::deserialize(body)?;
        debug!(version = header.version, flags = header.flags, "decoded track");
        Ok(builder)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes).inspect_err(|err| warn!(?path, "could not load track: {err}"))
    }
}
