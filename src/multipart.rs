use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
#[cfg(feature = "tokio-io")]
use tokio::io::AsyncRead;
#[cfg(feature = "tokio-io")]
use tokio_util::io::ReaderStream;

use crate::constraints::Constraints;
use crate::consumer::MultipartConsumer;
use crate::part::{Part, PartHandler};

/// Decodes a `multipart/form-data` body delivered as a [`Stream`] of byte chunks.
///
/// Chunks can be of any size. The stream is polled to its end even after the whole stream limit
/// is crossed so that the connection is drained, see [`MultipartConsumer`].
///
/// # Examples
///
/// ```
/// use multispool::Multipart;
/// use bytes::Bytes;
/// use std::convert::Infallible;
/// use futures_util::stream::once;
///
/// # async fn run() {
/// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
/// let stream = once(async move { Result::<Bytes, Infallible>::Ok(Bytes::from(data)) });
/// let multipart = Multipart::new(stream, "X-BOUNDARY");
///
/// for part in multipart.parts().await.unwrap() {
///     println!("Part: {:?} = {:?}", part.name(), part.text());
/// }
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(run());
/// ```
#[derive(Debug)]
pub struct Multipart<S> {
    stream: S,
    boundary: String,
    constraints: Constraints,
    content_length: Option<u64>,
}

impl<S, O, E> Multipart<S>
where
    S: Stream<Item = Result<O, E>>,
    O: Into<Bytes>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    /// Construct a new `Multipart` instance with the given stream and the boundary.
    pub fn new<B: Into<String>>(stream: S, boundary: B) -> Multipart<S> {
        Multipart::with_constraints(stream, boundary, Constraints::default())
    }

    /// Construct a new `Multipart` instance with the given stream, the boundary and constraints.
    pub fn with_constraints<B: Into<String>>(stream: S, boundary: B, constraints: Constraints) -> Multipart<S> {
        Multipart {
            stream,
            boundary: boundary.into(),
            constraints,
            content_length: None,
        }
    }

    /// Sets the length the transport declared for the body, e.g. from `Content-Length`.
    ///
    /// A declared length over the whole stream limit skips decoding entirely.
    pub fn content_length(mut self, content_length: Option<u64>) -> Multipart<S> {
        self.content_length = content_length;
        self
    }

    /// Decodes the whole stream, passing every part to `handler`, and returns the handler.
    pub async fn decode<H: PartHandler>(self, handler: H) -> crate::Result<H> {
        let mut consumer = MultipartConsumer::new(self.boundary, handler, self.constraints, self.content_length)?;

        let stream = self.stream;
        futures_util::pin_mut!(stream);

        while let Some(item) = stream.next().await {
            let chunk: Bytes = item.map_err(|err| crate::Error::StreamReadFailed(err.into()))?.into();
            consumer.data(&chunk, false)?;
        }

        consumer.data(&[], true)?;
        consumer.finish()
    }

    /// Decodes the whole stream and collects its parts.
    pub async fn parts(self) -> crate::Result<Vec<Part>> {
        self.decode(Vec::new()).await
    }
}

#[cfg(feature = "tokio-io")]
impl<R: AsyncRead> Multipart<ReaderStream<R>> {
    /// Construct a new `Multipart` instance with the given [`AsyncRead`] reader and the boundary.
    ///
    /// # Optional
    ///
    /// This requires the optional `tokio-io` feature to be enabled.
    ///
    /// # Examples
    ///
    /// ```
    /// use multispool::Multipart;
    ///
    /// # async fn run() {
    /// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
    /// let reader = data.as_bytes();
    /// let multipart = Multipart::with_reader(reader, "X-BOUNDARY");
    ///
    /// let parts = multipart.parts().await.unwrap();
    /// assert_eq!(parts[0].text(), Some("abcd"));
    /// # }
    /// # tokio::runtime::Runtime::new().unwrap().block_on(run());
    /// ```
    pub fn with_reader<B: Into<String>>(reader: R, boundary: B) -> Multipart<ReaderStream<R>> {
        Multipart::new(ReaderStream::new(reader), boundary)
    }

    /// Same as [`with_reader`](Multipart::with_reader) but with constraints.
    pub fn with_reader_with_constraints<B: Into<String>>(
        reader: R,
        boundary: B,
        constraints: Constraints,
    ) -> Multipart<ReaderStream<R>> {
        Multipart::with_constraints(ReaderStream::new(reader), boundary, constraints)
    }
}
