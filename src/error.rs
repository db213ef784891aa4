use derive_more::{Display, From};

pub type Result<T> = core::result::Result<T, TrackError>;

#[derive(Debug, Display, From)]
#[display("{self:?}")]
pub enum TrackError {
    /// A track needs at least one segment to have a start point.
    NoSegments,
    /// Raster dimensions must both be non-zero.
    InvalidDimensions { width: usize, height: usize },
    /// Half-width must be finite and non-negative.
    InvalidHalfWidth(f64),
    /// Segment at this index has a NaN or infinite coordinate.
    NonFiniteSegment(usize),
    /// Rasterization was aborted before it finished.
    Cancelled,
    /// Blob does not start with the track magic bytes.
    InvalidMagic,
    /// Blob was written by a newer format version.
    UnsupportedVersion(u16),
    /// Blob is shorter than its header.
    Truncated,
    ChecksumMismatch { expected: u32, actual: u32 },
    /// Stored image does not match the stored dimensions.
    ImageMismatch,
    #[from]
    Io(std::io::Error),
    #[from]
    Codec(bincode::Error),
}

impl std::error::Error for TrackError {}
