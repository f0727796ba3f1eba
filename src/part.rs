use http::header::{self, HeaderMap};
use mime::Mime;
#[cfg(feature = "json")]
use serde::de::DeserializeOwned;

use crate::content_disposition::ContentDisposition;
use crate::helpers;
use crate::spooled::SpooledFile;

/// Metadata parsed from one part's header block.
#[derive(Debug, Clone, PartialEq)]
pub struct PartMetadata {
    name: String,
    file_name: Option<String>,
    content_type: Mime,
    headers: HeaderMap,
}

impl PartMetadata {
    /// Parses a raw header block, the bytes between a boundary line and the blank line that
    /// ends the headers.
    ///
    /// Parsing never fails. Malformed lines are skipped, a missing `Content-Type` means
    /// `text/plain` (RFC 7578, 4.4) and one that can't be parsed means `application/octet-stream`.
    /// A part without a `name` parameter gets an empty name.
    ///
    /// # Examples
    ///
    /// ```
    /// use multispool::PartMetadata;
    ///
    /// let metadata = PartMetadata::parse(b"Content-Disposition: form-data; name=\"file\"; filename=\"a.bin\"\r\nContent-Type: image/png\r\n");
    ///
    /// assert_eq!(metadata.name(), "file");
    /// assert_eq!(metadata.file_name(), Some("a.bin"));
    /// assert_eq!(metadata.content_type(), &mime::IMAGE_PNG);
    /// assert!(!metadata.is_text());
    /// ```
    pub fn parse(raw: &[u8]) -> PartMetadata {
        let headers = helpers::parse_header_block(raw);
        let content_disposition = ContentDisposition::parse(&headers);

        let content_type = match headers
            .get(header::CONTENT_TYPE)
            .map(|val| String::from_utf8_lossy(val.as_bytes()))
        {
            Some(val) => val.parse::<Mime>().unwrap_or_else(|_| {
                warn!("unparseable part Content-Type {:?}, treating the part as binary", val);
                mime::APPLICATION_OCTET_STREAM
            }),
            None => mime::TEXT_PLAIN,
        };

        let name = content_disposition.field_name.unwrap_or_else(|| {
            warn!("part has no name in its Content-Disposition header");
            String::new()
        });

        PartMetadata {
            name,
            file_name: content_disposition.file_name,
            content_type,
            headers,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `filename` parameter of the `Content-Disposition` header, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn content_type(&self) -> &Mime {
        &self.content_type
    }

    /// The `charset` parameter of the part's own content type.
    pub fn charset(&self) -> Option<&str> {
        self.content_type.get_param(mime::CHARSET).map(|charset| charset.as_str())
    }

    /// All headers of the part. Lookups are case-insensitive.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Whether the part is decoded as text, i.e. its content type is `text/*`.
    pub fn is_text(&self) -> bool {
        self.content_type.type_() == mime::TEXT
    }
}

impl Default for PartMetadata {
    fn default() -> Self {
        PartMetadata {
            name: String::new(),
            file_name: None,
            content_type: mime::TEXT_PLAIN,
            headers: HeaderMap::new(),
        }
    }
}

/// A decoded part, either text held in memory or binary contents spooled to disk.
#[derive(Debug)]
pub enum Part {
    Text { metadata: PartMetadata, value: String },
    Binary { metadata: PartMetadata, file: SpooledFile },
}

impl Part {
    pub fn metadata(&self) -> &PartMetadata {
        match self {
            Part::Text { metadata, .. } | Part::Binary { metadata, .. } => metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.metadata().file_name()
    }

    pub fn content_type(&self) -> &Mime {
        self.metadata().content_type()
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Part::Text { .. })
    }

    /// The decoded value of a text part.
    pub fn text(&self) -> Option<&str> {
        match self {
            Part::Text { value, .. } => Some(value),
            Part::Binary { .. } => None,
        }
    }

    /// The spooled file of a binary part.
    pub fn file(&self) -> Option<&SpooledFile> {
        match self {
            Part::Binary { file, .. } => Some(file),
            Part::Text { .. } => None,
        }
    }

    /// Deserializes the part's contents as JSON.
    ///
    /// # Optional
    ///
    /// This requires the optional `json` feature to be enabled.
    #[cfg(feature = "json")]
    pub fn json<T: DeserializeOwned>(&self) -> crate::Result<T> {
        match self {
            Part::Text { value, .. } => serde_json::from_str(value).map_err(crate::Error::DecodeJson),
            Part::Binary { file, .. } => serde_json::from_slice(&file.read_to_vec()?).map_err(crate::Error::DecodeJson),
        }
    }
}

/// Receives every part, in wire order, during the `decode` call that completed it.
///
/// Returning an error aborts decoding.
pub trait PartHandler {
    fn on_part(&mut self, part: Part) -> crate::Result<()>;
}

/// Collects every part.
impl PartHandler for Vec<Part> {
    fn on_part(&mut self, part: Part) -> crate::Result<()> {
        self.push(part);
        Ok(())
    }
}

/// A [`PartHandler`] backed by a closure, see [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F>(F);

impl<F> std::fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HandlerFn").finish_non_exhaustive()
    }
}

impl<F> PartHandler for HandlerFn<F>
where
    F: FnMut(Part) -> crate::Result<()>,
{
    fn on_part(&mut self, part: Part) -> crate::Result<()> {
        (self.0)(part)
    }
}

/// Creates a [`PartHandler`] from a closure.
///
/// # Examples
///
/// ```
/// use multispool::{handler_fn, MultipartDecoder, Part};
///
/// # fn run() -> multispool::Result<()> {
/// let mut names = Vec::new();
/// let mut decoder = MultipartDecoder::new("X-BOUNDARY", handler_fn(|part: Part| {
///     names.push(part.name().to_owned());
///     Ok(())
/// }))?;
///
/// decoder.decode(b"--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--X-BOUNDARY--\r\n", true)?;
/// drop(decoder);
///
/// assert_eq!(names, ["a"]);
/// # Ok(())
/// # }
/// # run().unwrap();
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: FnMut(Part) -> crate::Result<()>,
{
    HandlerFn(f)
}
