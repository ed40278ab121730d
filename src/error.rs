use alloc::string::String;
use enough::StopReason;

/// Errors from DIB decoding, encoding, and pixel access.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DibError {
    /// A negative coordinate, zero dimension, or unrecognized bit depth.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A coordinate or linear index beyond the image bounds.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// The object is not in a state where the call makes sense.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Header or stream content violates the DIB layout.
    #[error("invalid DIB format: {0}")]
    InvalidFormat(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// The stream ended in the middle of a read.
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("stream seek failed: {0}")]
    SeekFailed(String),

    #[error("stream write failed: {0}")]
    WriteFailed(String),

    #[cfg(feature = "std")]
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dimensions too large: {width}x{height}")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("operation cancelled")]
    Cancelled(StopReason),
}

impl From<StopReason> for DibError {
    fn from(r: StopReason) -> Self {
        DibError::Cancelled(r)
    }
}
