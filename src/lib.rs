//! A streaming `multipart/form-data` decoder with bounded memory use.
//!
//! The decoder accepts chunks of any size, finds part boundaries with a fixed-size scratch buffer,
//! accumulates headers in memory and spools bodies to temporary files, so no upload can exhaust
//! memory regardless of its size. Text parts are decoded to strings with charset negotiation
//! (`charset` parameter, then the `_charset_` field, then UTF-8), binary parts are handed over as
//! [`SpooledFile`]s that are deleted when dropped.
//!
//! Three layers are available:
//!
//! * [`MultipartDecoder`]: the synchronous core, fed `decode(chunk, is_last_chunk)`.
//! * [`MultipartConsumer`]: adds the whole stream size gate and splits oversized chunks.
//! * [`Multipart`]: drives a consumer from any `Stream` of bytes.
//!
//! # Examples
//!
//! ```
//! use multispool::{Constraints, DataSize, Multipart, SizeLimit};
//! use bytes::Bytes;
//! use std::convert::Infallible;
//! use futures_util::stream::once;
//!
//! # async fn run() {
//! let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
//! let stream = once(async move { Result::<Bytes, Infallible>::Ok(Bytes::from(data)) });
//!
//! let constraints = Constraints::new().size_limit(SizeLimit::new().per_field(DataSize::mebibytes(1)));
//! let multipart = Multipart::with_constraints(stream, "X-BOUNDARY", constraints);
//!
//! let parts = multipart.parts().await.unwrap();
//! assert_eq!(parts[0].name(), "my_text_field");
//! assert_eq!(parts[0].text(), Some("abcd"));
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(run());
//! ```
//!
//! ## Optional features
//!
//! * `json`: [`Part::json`].
//! * `tokio-io`: [`Multipart::with_reader`] over a tokio `AsyncRead`.
//! * `log`: decoder events through the `log` facade.

macro_rules! trace {
    ($($arg:tt)+) => {
        #[cfg(feature = "log")]
        ::log::trace!($($arg)+);
        #[cfg(not(feature = "log"))]
        let _ = format_args!($($arg)+);
    };
}

macro_rules! debug {
    ($($arg:tt)+) => {
        #[cfg(feature = "log")]
        ::log::debug!($($arg)+);
        #[cfg(not(feature = "log"))]
        let _ = format_args!($($arg)+);
    };
}

macro_rules! warn {
    ($($arg:tt)+) => {
        #[cfg(feature = "log")]
        ::log::warn!($($arg)+);
        #[cfg(not(feature = "log"))]
        let _ = format_args!($($arg)+);
    };
}

pub use bytes;
pub use constraints::Constraints;
pub use consumer::MultipartConsumer;
pub use data_size::DataSize;
pub use decoder::MultipartDecoder;
pub use error::Error;
pub use limiter::SizeLimiter;
pub use multipart::Multipart;
pub use part::{handler_fn, HandlerFn, Part, PartHandler, PartMetadata};
pub use size_limit::SizeLimit;
pub use spooled::SpooledFile;
pub use tiered::{Tier, TierReader, TieredBuffer};

mod buffer;
mod charset;
mod constants;
mod constraints;
mod consumer;
mod content_disposition;
mod data_size;
mod decoder;
mod error;
mod helpers;
mod limiter;
mod multipart;
mod part;
mod size_limit;
mod spooled;
mod state;
mod tiered;

/// A Result type often returned from methods that can have `multispool` errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Parses the `Content-Type` header to extract the boundary value.
///
/// # Examples
///
/// ```
/// # fn run(){
/// let content_type = "multipart/form-data; boundary=ABCDEFG";
///
/// assert_eq!(multispool::parse_boundary(content_type), Ok("ABCDEFG".to_owned()));
/// # }
/// # run();
/// ```
pub fn parse_boundary<T: AsRef<str>>(content_type: T) -> Result<String> {
    let m = content_type
        .as_ref()
        .parse::<mime::Mime>()
        .map_err(Error::DecodeContentType)?;

    if !(m.type_() == mime::MULTIPART && m.subtype() == mime::FORM_DATA) {
        return Err(Error::NoMultipart);
    }

    m.get_param(mime::BOUNDARY)
        .map(|name| name.as_str().to_owned())
        .ok_or(Error::NoBoundary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_boundary() {
        let content_type = "multipart/form-data; boundary=ABCDEFG";
        assert_eq!(parse_boundary(content_type), Ok("ABCDEFG".to_owned()));

        let content_type = "multipart/form-data; boundary=------ABCDEFG";
        assert_eq!(parse_boundary(content_type), Ok("------ABCDEFG".to_owned()));

        let content_type = "boundary=------ABCDEFG";
        assert!(parse_boundary(content_type).is_err());

        let content_type = "text/plain";
        assert_eq!(parse_boundary(content_type), Err(Error::NoMultipart));

        let content_type = "text/plain; boundary=------ABCDEFG";
        assert_eq!(parse_boundary(content_type), Err(Error::NoMultipart));

        let content_type = "multipart/form-data";
        assert_eq!(parse_boundary(content_type), Err(Error::NoBoundary));
    }
}
