use crate::constraints::Constraints;
use crate::decoder::MultipartDecoder;
use crate::limiter::SizeLimiter;
use crate::part::PartHandler;

/// Feeds a request body of any chunk size through a [`SizeLimiter`] into a [`MultipartDecoder`].
///
/// Chunks larger than the decoder's scratch buffer are split before decoding. When the declared
/// content length is already over the whole stream limit no decoder is constructed at all, and
/// when the running total crosses the limit mid-stream the decoder is closed (deleting its spill
/// files) and the rest of the body is drained. Either way [`finish`](MultipartConsumer::finish)
/// reports [`Error::StreamSizeExceeded`](crate::Error::StreamSizeExceeded).
///
/// # Examples
///
/// ```
/// use multispool::{Constraints, DataSize, Error, MultipartConsumer, Part, SizeLimit};
///
/// let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(DataSize::bytes(0)));
/// let mut consumer = MultipartConsumer::new("X-BOUNDARY", Vec::<Part>::new(), constraints, Some(5)).unwrap();
///
/// assert!(!consumer.is_decoding());
/// consumer.data(b"hello", true).unwrap();
/// assert_eq!(consumer.finish().unwrap_err(), Error::StreamSizeExceeded { limit: 0 });
/// ```
#[derive(Debug)]
pub struct MultipartConsumer<H> {
    limiter: SizeLimiter,
    decoder: Option<MultipartDecoder<H>>,
}

impl<H: PartHandler> MultipartConsumer<H> {
    /// Creates a consumer for a body with the given boundary and, if the transport knows it, its
    /// declared length.
    pub fn new<B: Into<String>>(
        boundary: B,
        handler: H,
        constraints: Constraints,
        content_length: Option<u64>,
    ) -> crate::Result<MultipartConsumer<H>> {
        let mut limiter = SizeLimiter::new(constraints.size_limit.whole_stream);

        let decoder = if limiter.check_declared(content_length) {
            Some(MultipartDecoder::with_constraints(boundary, handler, constraints)?)
        } else {
            None
        };

        Ok(MultipartConsumer { limiter, decoder })
    }

    /// Consumes the next chunk of the body. Pass `end_of_stream = true` once the transport is
    /// exhausted; the final chunk may be empty.
    ///
    /// Decode errors are returned right away and release the decoder. After that, and while the
    /// body is being discarded, chunks are only counted.
    pub fn data(&mut self, chunk: &[u8], end_of_stream: bool) -> crate::Result<()> {
        let admitted = self.limiter.admit(chunk);

        let decoder = match self.decoder.as_mut() {
            Some(decoder) => decoder,
            None => return Ok(()),
        };

        let chunk = match admitted {
            Some(chunk) => chunk,
            None => {
                self.release();
                return Ok(());
            }
        };

        let result = feed(decoder, chunk, end_of_stream);
        if result.is_err() {
            self.release();
        }

        result
    }

    /// The preferred chunk size: the decoder's scratch buffer capacity, which is fixed for the
    /// lifetime of the consumer. `None` once the consumer is only draining.
    ///
    /// Larger chunks are split, so this is a sizing hint for the transport, not a flow control
    /// signal.
    pub fn capacity_hint(&self) -> Option<usize> {
        self.decoder.as_ref().map(MultipartDecoder::chunk_capacity)
    }

    pub fn is_discarding(&self) -> bool {
        self.limiter.is_discarding()
    }

    /// Whether chunks still reach a decoder.
    pub fn is_decoding(&self) -> bool {
        self.decoder.is_some()
    }

    /// Bytes received so far, discarded ones included.
    pub fn received(&self) -> u64 {
        self.limiter.received()
    }

    /// Ends the body and returns the handler.
    ///
    /// Fails with [`Error::StreamSizeExceeded`](crate::Error::StreamSizeExceeded) when the body went
    /// over the whole stream limit, and with [`Error::IncompleteStream`](crate::Error::IncompleteStream)
    /// when the close delimiter was never decoded or an earlier `data` call failed.
    pub fn finish(mut self) -> crate::Result<H> {
        if self.limiter.is_discarding() {
            return Err(crate::Error::StreamSizeExceeded {
                limit: self.limiter.limit(),
            });
        }

        match self.decoder.take() {
            Some(mut decoder) => {
                decoder.decode(&[], true)?;
                decoder.into_handler()
            }
            None => Err(crate::Error::IncompleteStream),
        }
    }

    fn release(&mut self) {
        if let Some(mut decoder) = self.decoder.take() {
            if let Err(err) = decoder.close() {
                warn!("failed to release multipart decoder: {}", err);
            }
        }
    }
}

fn feed<H: PartHandler>(decoder: &mut MultipartDecoder<H>, chunk: &[u8], end_of_stream: bool) -> crate::Result<()> {
    for piece in chunk.chunks(decoder.chunk_capacity()) {
        decoder.decode(piece, false)?;
    }

    if end_of_stream {
        decoder.decode(&[], true)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataSize, Part, SizeLimit};

    const BODY: &[u8] = b"--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"f\"; filename=\"a.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n0123456789abcdef\r\n--X-BOUNDARY--\r\n";

    fn constraints(whole_stream: u64) -> Constraints {
        Constraints::new()
            .scratch_buffer_size(32)
            .size_limit(SizeLimit::new().whole_stream(DataSize::bytes(whole_stream)))
    }

    #[test]
    fn test_preflight_rejects_declared_length() {
        let mut consumer = MultipartConsumer::new("X-BOUNDARY", Vec::<Part>::new(), constraints(0), Some(5)).unwrap();

        assert!(!consumer.is_decoding());
        assert!(consumer.is_discarding());
        assert_eq!(consumer.capacity_hint(), None);

        consumer.data(b"12345", true).unwrap();
        assert_eq!(consumer.received(), 5);
        assert_eq!(
            consumer.finish().unwrap_err(),
            crate::Error::StreamSizeExceeded { limit: 0 }
        );
    }

    #[test]
    fn test_splits_large_chunks() {
        let mut consumer =
            MultipartConsumer::new("X-BOUNDARY", Vec::<Part>::new(), constraints(1024), Some(BODY.len() as u64))
                .unwrap();

        assert_eq!(consumer.capacity_hint(), Some(32));
        consumer.data(BODY, true).unwrap();

        let parts = consumer.finish().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].file().unwrap().read_to_vec().unwrap(), b"0123456789abcdef");
    }

    #[test]
    fn test_streaming_overflow_discards() {
        let dir = tempfile::tempdir().unwrap();
        let constraints = constraints(BODY.len() as u64 - 10).temp_dir(dir.path());
        let mut consumer = MultipartConsumer::new("X-BOUNDARY", Vec::<Part>::new(), constraints, None).unwrap();

        let (head, tail) = BODY.split_at(BODY.len() - 20);
        consumer.data(head, false).unwrap();
        assert!(consumer.is_decoding());

        consumer.data(tail, true).unwrap();
        assert!(!consumer.is_decoding());
        assert!(consumer.is_discarding());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        assert_eq!(
            consumer.finish().unwrap_err(),
            crate::Error::StreamSizeExceeded {
                limit: BODY.len() as u64 - 10
            }
        );
    }

    #[test]
    fn test_decode_error_releases_decoder() {
        let mut consumer = MultipartConsumer::new("X-BOUNDARY", Vec::<Part>::new(), constraints(1024), None).unwrap();

        let err = consumer.data(b"--X-BOUNDARY\r\n\r\nno close", true).unwrap_err();
        assert_eq!(err, crate::Error::IncompleteStream);
        assert!(!consumer.is_decoding());

        consumer.data(b"ignored", true).unwrap();
        assert_eq!(consumer.finish().unwrap_err(), crate::Error::IncompleteStream);
    }

    #[test]
    fn test_finish_flushes() {
        let mut consumer = MultipartConsumer::new("X-BOUNDARY", Vec::<Part>::new(), constraints(1024), None).unwrap();
        consumer.data(BODY, false).unwrap();

        assert_eq!(consumer.finish().unwrap().len(), 1);
    }
}
