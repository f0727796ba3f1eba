use crate::buffer::ScratchBuffer;
use crate::charset::Charset;
use crate::constants;
use crate::constraints::Constraints;
use crate::part::{Part, PartHandler, PartMetadata};
use crate::state::{Delimiters, Segment};
use crate::tiered::TieredBuffer;

/// A streaming `multipart/form-data` decoder that works on chunks of any size.
///
/// Chunks are staged in a fixed-size scratch buffer and scanned for the delimiter of the current
/// segment. Header blocks are accumulated in memory up to the header limit; bodies go to a
/// file-backed [`TieredBuffer`] up to the body limit, so memory use stays bounded no matter how
/// large the upload is. Every completed part is handed to the [`PartHandler`] before the `decode`
/// call that completed it returns, in wire order.
///
/// Text parts (`text/*`) are decoded with, in order of preference, the part's own `charset`, the
/// charset announced by an earlier `_charset_` field, or UTF-8. The `_charset_` field itself is
/// also passed to the handler.
///
/// Nested and `multipart/mixed` bodies are not supported. Once the close delimiter has been seen
/// the decoder discards everything it is fed.
///
/// The decoder is owned by a single request: all decoding goes through `&mut self`, so sharing one
/// across tasks requires the caller to serialize access.
///
/// # Examples
///
/// ```
/// use multispool::{MultipartDecoder, Part};
///
/// # fn run() -> multispool::Result<()> {
/// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
/// let mut decoder = MultipartDecoder::new("X-BOUNDARY", Vec::new())?;
///
/// for chunk in data.as_bytes().chunks(7) {
///     decoder.decode(chunk, false)?;
/// }
/// decoder.decode(&[], true)?;
///
/// let parts: Vec<Part> = decoder.into_handler()?;
/// assert_eq!(parts[0].name(), "my_text_field");
/// assert_eq!(parts[0].text(), Some("abcd"));
/// # Ok(())
/// # }
/// # run().unwrap();
/// ```
#[derive(Debug)]
pub struct MultipartDecoder<H> {
    handler: H,
    constraints: Constraints,
    scratch: ScratchBuffer,
    delimiters: Delimiters,
    min_bytes_needed: usize,
    segment: Segment,
    header: Option<TieredBuffer>,
    body: Option<TieredBuffer>,
    metadata: Option<PartMetadata>,
    default_charset: Option<Charset>,
    next_part_idx: usize,
    closed: bool,
}

impl<H: PartHandler> MultipartDecoder<H> {
    /// Creates a decoder with the default [`Constraints`].
    pub fn new<B: Into<String>>(boundary: B, handler: H) -> crate::Result<MultipartDecoder<H>> {
        MultipartDecoder::with_constraints(boundary, handler, Constraints::default())
    }

    /// Creates a decoder.
    ///
    /// Fails if the boundary is blank, longer than 70 characters or not ASCII, or if the scratch
    /// buffer can't hold the body delimiter plus three bytes of lookahead.
    pub fn with_constraints<B: Into<String>>(
        boundary: B,
        handler: H,
        constraints: Constraints,
    ) -> crate::Result<MultipartDecoder<H>> {
        let boundary = boundary.into();

        if boundary.trim().is_empty() {
            return Err(crate::Error::invalid_boundary("boundary cannot be blank"));
        }

        if boundary.len() > constants::MAX_BOUNDARY_LEN {
            return Err(crate::Error::invalid_boundary(format!(
                "boundary is {} characters long, the limit is {}",
                boundary.len(),
                constants::MAX_BOUNDARY_LEN
            )));
        }

        if !boundary.is_ascii() {
            return Err(crate::Error::invalid_boundary("boundary must be ASCII"));
        }

        let delimiters = Delimiters::new(&boundary);
        let min_bytes_needed = delimiters.min_bytes_needed();

        if constraints.scratch_buffer_size < min_bytes_needed {
            return Err(crate::Error::ScratchBufferTooSmall {
                size: constraints.scratch_buffer_size,
                min: min_bytes_needed,
            });
        }

        Ok(MultipartDecoder {
            handler,
            scratch: ScratchBuffer::with_capacity(constraints.scratch_buffer_size),
            constraints,
            delimiters,
            min_bytes_needed,
            segment: Segment::Preamble,
            header: None,
            body: None,
            metadata: None,
            default_charset: None,
            next_part_idx: 0,
            closed: false,
        })
    }

    /// Feeds the next chunk of the body.
    ///
    /// `chunk` may not be larger than the scratch buffer. Pass `is_last_chunk = true` with the
    /// final chunk (which may be empty); the decoder then processes everything still buffered and
    /// fails with [`Error::IncompleteStream`](crate::Error::IncompleteStream) if the close
    /// delimiter never showed up.
    ///
    /// Any error closes the decoder (see [`close`](MultipartDecoder::close)); parts that were
    /// in progress are dropped and later calls are no-ops.
    pub fn decode(&mut self, chunk: &[u8], is_last_chunk: bool) -> crate::Result<()> {
        let result = self.decode_chunk(chunk, is_last_chunk);

        if result.is_err() {
            if let Err(err) = self.close() {
                warn!("failed to release multipart decoder after an error: {}", err);
            }
        }

        result
    }

    fn decode_chunk(&mut self, chunk: &[u8], is_last_chunk: bool) -> crate::Result<()> {
        if chunk.len() > self.scratch.capacity() {
            return Err(crate::Error::ChunkTooLarge {
                len: chunk.len(),
                capacity: self.scratch.capacity(),
            });
        }

        let mut rest = chunk;
        while !rest.is_empty() {
            let n = self.scratch.fill(rest);
            rest = &rest[n..];

            if self.scratch.is_full() {
                self.process(false)?;
            }
        }

        if is_last_chunk {
            self.process(true)?;

            if self.segment != Segment::Epilogue {
                return Err(crate::Error::IncompleteStream);
            }
        }

        Ok(())
    }

    /// The largest chunk [`decode`](MultipartDecoder::decode) accepts.
    pub fn chunk_capacity(&self) -> usize {
        self.scratch.capacity()
    }

    /// Whether the close delimiter has been seen.
    pub fn is_complete(&self) -> bool {
        self.segment == Segment::Epilogue && !self.closed
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Releases the decoder and returns its handler.
    ///
    /// Fails with [`Error::IncompleteStream`](crate::Error::IncompleteStream) if the close delimiter
    /// was never decoded.
    pub fn into_handler(mut self) -> crate::Result<H> {
        if !self.is_complete() {
            self.close()?;
            return Err(crate::Error::IncompleteStream);
        }

        Ok(self.handler)
    }

    /// Drops the part in progress, deleting its spill file, and makes the decoder inert.
    ///
    /// Parts already passed to the handler are not affected. Dropping the decoder has the same
    /// effect but ignores I/O errors.
    pub fn close(&mut self) -> crate::Result<()> {
        if !self.is_complete() {
            self.closed = true;
        }
        self.segment = Segment::Epilogue;
        self.metadata = None;
        self.scratch.clear();

        let mut result = Ok(());
        for mut buffer in self.header.take().into_iter().chain(self.body.take()) {
            if let Err(err) = buffer.close() {
                result = Err(err);
            }
        }

        result
    }

    fn process(&mut self, flush: bool) -> crate::Result<()> {
        loop {
            if self.segment == Segment::Epilogue {
                self.scratch.clear();
                return Ok(());
            }

            let data = self.scratch.unconsumed();
            let delimiter = self.delimiters.get(self.segment);

            // Before the last chunk, keep enough bytes around to test the longest delimiter and peek
            // past it; after it, whatever can still hold the delimiter is tested.
            let needed = if flush { delimiter.len() } else { self.min_bytes_needed };
            if data.len() < needed {
                return Ok(());
            }

            let testable = data.len() - needed + 1;
            let found = find_delimiter(data, delimiter, testable);
            let content = &data[..found.unwrap_or(testable)];

            match self.segment {
                Segment::Header if !content.is_empty() => {
                    let limit = self.constraints.size_limit.per_part_header;
                    accumulator(&mut self.header, limit, limit, &self.constraints)?.write(content)?;
                }
                Segment::Body if !content.is_empty() => {
                    let limit = self.body_limit();
                    accumulator(&mut self.body, 0, limit, &self.constraints)?.write(content)?;
                }
                _ => {}
            }

            let at = match found {
                Some(at) => at,
                None => {
                    self.scratch.consume(testable);
                    continue;
                }
            };

            let after = &data[at + delimiter.len()..];
            let followed_by_crlf = after.starts_with(constants::CRLF.as_bytes());
            let followed_by_close = after.starts_with(constants::BOUNDARY_EXT.as_bytes());
            let consumed = at + delimiter.len();

            match self.segment {
                // A boundary line must end with CRLF, or with "--" when the body has no parts.
                Segment::Preamble if followed_by_crlf => {
                    // The CRLF is left in place so every header block starts with one.
                    self.scratch.consume(consumed);
                    self.transition(Segment::Header);
                }
                Segment::Preamble if followed_by_close => {
                    self.scratch.consume(consumed);
                    self.transition(Segment::Epilogue);
                }
                Segment::Preamble => self.scratch.consume(at + 1),
                Segment::Header => {
                    self.scratch.consume(consumed);
                    self.finish_header()?;
                    self.transition(Segment::Body);
                }
                Segment::Body => {
                    self.scratch.consume(consumed);
                    self.finish_part()?;
                    self.transition(if followed_by_close {
                        Segment::Epilogue
                    } else {
                        Segment::Header
                    });
                }
                Segment::Epilogue => {}
            }
        }
    }

    fn transition(&mut self, next: Segment) {
        debug!("delimiter found for segment {:?}, moving on to {:?}", self.segment, next);
        self.segment = next;
    }

    fn body_limit(&self) -> u64 {
        let name = self.metadata.as_ref().map(PartMetadata::name);
        self.constraints.size_limit.extract_size_limit_for(name)
    }

    fn finish_header(&mut self) -> crate::Result<()> {
        let raw = match self.header.take() {
            Some(mut header) => {
                let raw = header.read_to_vec()?;
                header.close()?;
                raw
            }
            None => Vec::new(),
        };

        self.metadata = Some(PartMetadata::parse(&raw));

        Ok(())
    }

    fn finish_part(&mut self) -> crate::Result<()> {
        let limit = self.body_limit();
        let metadata = self.metadata.take().unwrap_or_default();

        let body = match self.body.take() {
            Some(body) => body,
            None => new_accumulator(0, limit, &self.constraints)?,
        };

        let part = if metadata.is_text() {
            self.text_part(metadata, body)?
        } else {
            Part::Binary {
                file: body.into_spooled_file()?,
                metadata,
            }
        };

        debug!(
            "part #{} {:?} ({}) decoded",
            self.next_part_idx,
            part.name(),
            part.content_type()
        );
        self.next_part_idx += 1;

        self.handler.on_part(part)
    }

    fn text_part(&mut self, metadata: PartMetadata, mut body: TieredBuffer) -> crate::Result<Part> {
        let charset = match metadata.charset() {
            Some(label) => Charset::for_label(label)?,
            None => self.default_charset.unwrap_or(Charset::UTF_8),
        };

        let value = charset.decode(&body.read_to_vec()?);
        body.close()?;

        if metadata.name() == constants::CHARSET_FIELD_NAME {
            let charset = Charset::for_label(&value)?;
            debug!("default charset for parts without one is now {}", charset.name());
            self.default_charset = Some(charset);
        }

        Ok(Part::Text { metadata, value })
    }
}

fn new_accumulator(memory_limit: u64, total_limit: u64, constraints: &Constraints) -> crate::Result<TieredBuffer> {
    TieredBuffer::build(memory_limit, total_limit, constraints.temp_dir.clone())
}

fn accumulator<'a>(
    slot: &'a mut Option<TieredBuffer>,
    memory_limit: u64,
    total_limit: u64,
    constraints: &Constraints,
) -> crate::Result<&'a mut TieredBuffer> {
    let buffer = match slot.take() {
        Some(buffer) => buffer,
        None => new_accumulator(memory_limit, total_limit, constraints)?,
    };

    Ok(slot.insert(buffer))
}

/// Returns the first offset below `testable` at which `delimiter` starts.
fn find_delimiter(data: &[u8], delimiter: &[u8], testable: usize) -> Option<usize> {
    let first = *delimiter.first()?;
    let mut from = 0;

    while let Some(idx) = memchr::memchr(first, &data[from..testable]) {
        let at = from + idx;
        if data[at..].starts_with(delimiter) {
            return Some(at);
        }
        from = at + 1;
    }

    None
}
