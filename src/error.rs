use std::fmt::{self, Debug, Display, Formatter};
use std::io;

use http::StatusCode;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A set of errors that can occur while decoding a multipart stream and in other
/// operations.
#[derive(thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The boundary is blank, longer than 70 characters or not ASCII.
    #[error("invalid multipart boundary: {reason}")]
    InvalidBoundary { reason: String },

    /// The scratch buffer cannot hold the largest delimiter plus its lookahead.
    #[error("scratch buffer of {size} bytes is too small, at least {min} bytes are needed")]
    ScratchBufferTooSmall { size: usize, min: usize },

    /// A [`TieredBuffer`](crate::TieredBuffer) was configured with a total limit below its memory limit.
    #[error("total limit of {total} bytes is lower than the memory limit of {memory} bytes")]
    InvalidTierLimits { memory: u64, total: u64 },

    /// A single chunk passed to the decoder is larger than its scratch buffer.
    #[error("chunk of {len} bytes exceeds the scratch buffer capacity of {capacity} bytes")]
    ChunkTooLarge { len: usize, capacity: usize },

    /// A part's header block or body outgrew its buffer ceiling.
    #[error("storage limit exceeded: {limit} bytes")]
    StorageLimitExceeded { limit: u64 },

    /// The charset named by a part or by a `_charset_` field is not known.
    #[error("unknown charset: {0:?}")]
    UnknownCharset(String),

    /// The stream ended before the close delimiter was seen.
    #[error("incomplete multipart stream")]
    IncompleteStream,

    /// The request entity exceeded the whole stream limit.
    #[error("stream size exceeded the maximum limit: {limit} bytes")]
    StreamSizeExceeded { limit: u64 },

    /// A write or read was attempted on a closed buffer.
    #[error("buffer is already closed")]
    BufferClosed,

    /// Stream read failed.
    #[error("stream read failed: {0}")]
    StreamReadFailed(BoxError),

    /// The part handler rejected a part.
    #[error("part handler failed: {0}")]
    HandlerFailed(BoxError),

    /// Creating, writing, reading or deleting a spill file failed.
    #[error("spill file i/o failed: {0}")]
    Io(#[from] io::Error),

    /// The `Content-Type` header is not `multipart/form-data`.
    #[error("Content-Type is not multipart/form-data")]
    NoMultipart,

    /// Failed to convert the `Content-Type` to [`mime::Mime`] type.
    #[error("Failed to convert Content-Type to `mime::Mime` type: {0}")]
    DecodeContentType(mime::FromStrError),

    /// No boundary found in `Content-Type` header.
    #[error("multipart boundary not found in Content-Type")]
    NoBoundary,

    /// A size string could not be parsed as a [`DataSize`](crate::DataSize).
    #[error("invalid data size: {0:?}")]
    InvalidDataSize(String),

    /// Failed to decode the part data as `JSON` in
    /// [`part.json()`](crate::Part::json) method.
    #[cfg(feature = "json")]
    #[error("failed to decode part data as JSON: {0}")]
    DecodeJson(serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_boundary<S: ToString>(reason: S) -> Self {
        Error::InvalidBoundary {
            reason: reason.to_string(),
        }
    }

    /// Wraps any error returned from a [`PartHandler`](crate::PartHandler).
    pub fn handler<E: Into<BoxError>>(err: E) -> Self {
        Error::HandlerFailed(err.into())
    }

    /// The response status a server should answer with when body decoding fails with this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::StorageLimitExceeded { .. } | Error::StreamSizeExceeded { .. } | Error::ChunkTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Error::InvalidBoundary { .. }
            | Error::UnknownCharset(_)
            | Error::IncompleteStream
            | Error::NoMultipart
            | Error::DecodeContentType(_)
            | Error::NoBoundary => StatusCode::BAD_REQUEST,
            #[cfg(feature = "json")]
            Error::DecodeJson(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code() {
        assert_eq!(
            Error::StorageLimitExceeded { limit: 1 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            Error::StreamSizeExceeded { limit: 1 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(Error::UnknownCharset("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::IncompleteStream.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::from(io::Error::new(io::ErrorKind::Other, "disk full")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::ChunkTooLarge { len: 10, capacity: 8 }.to_string(),
            "chunk of 10 bytes exceeds the scratch buffer capacity of 8 bytes"
        );
        assert_eq!(Error::UnknownCharset("x-nope".into()).to_string(), "unknown charset: \"x-nope\"");
    }
}
