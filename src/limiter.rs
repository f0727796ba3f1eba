/// Request-wide entity size gate.
///
/// A declared content length above the limit rejects the body before any decoding starts. Past
/// that, delivered bytes are counted and once the running total crosses the limit the limiter
/// switches to discarding: further bytes are accepted and dropped, so the transport can drain the
/// connection and answer with a proper status instead of severing it.
#[derive(Debug, Clone)]
pub struct SizeLimiter {
    limit: u64,
    received: u64,
    discarding: bool,
}

impl SizeLimiter {
    pub fn new(limit: u64) -> SizeLimiter {
        SizeLimiter {
            limit,
            received: 0,
            discarding: false,
        }
    }

    /// Checks the length declared by the transport, e.g. a `Content-Length` header.
    ///
    /// Returns `false` and switches to discarding when it already exceeds the limit.
    pub fn check_declared(&mut self, content_length: Option<u64>) -> bool {
        match content_length {
            Some(len) if len > self.limit => {
                debug!("declared content length {} exceeds the limit of {} bytes", len, self.limit);
                self.discarding = true;
                false
            }
            _ => true,
        }
    }

    /// Counts `chunk` and returns it if it should be decoded.
    ///
    /// The chunk that crosses the limit and every chunk after it are dropped.
    pub fn admit<'a>(&mut self, chunk: &'a [u8]) -> Option<&'a [u8]> {
        self.received = self.received.saturating_add(chunk.len() as u64);

        if !self.discarding && self.received > self.limit {
            warn!(
                "{} bytes received, over the limit of {} bytes, discarding the rest of the body",
                self.received, self.limit
            );
            self.discarding = true;
        }

        if self.discarding {
            None
        } else {
            Some(chunk)
        }
    }

    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    /// Bytes delivered so far, discarded ones included.
    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}
