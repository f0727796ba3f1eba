use crate::constants;

/// Parsing phases of a multipart body:
///
/// ```text
/// multipart-body  := preamble 1*encapsulation close-delimiter epilogue
/// encapsulation   := "--" boundary CRLF header-part CRLF body-part
/// close-delimiter := "--" boundary "--"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment {
    Preamble,
    Header,
    Body,
    Epilogue,
}

impl Segment {
    pub(crate) const COUNT: usize = 4;

    pub(crate) fn ordinal(self) -> usize {
        self as usize
    }
}

/// The delimiter that ends each segment, indexed by segment ordinal.
#[derive(Debug)]
pub(crate) struct Delimiters([Box<[u8]>; Segment::COUNT]);

impl Delimiters {
    pub(crate) fn new(boundary: &str) -> Self {
        let preamble = format!("{}{}", constants::BOUNDARY_EXT, boundary);
        let body = format!("{}{}{}", constants::CRLF, constants::BOUNDARY_EXT, boundary);

        Delimiters([
            preamble.into_bytes().into_boxed_slice(),
            constants::CRLF_CRLF.as_bytes().into(),
            body.into_bytes().into_boxed_slice(),
            Box::default(),
        ])
    }

    pub(crate) fn get(&self, segment: Segment) -> &[u8] {
        &self.0[segment.ordinal()]
    }

    /// Bytes that must be buffered before any segment's delimiter can be tested unambiguously.
    pub(crate) fn min_bytes_needed(&self) -> usize {
        self.0.iter().map(|delimiter| delimiter.len()).max().unwrap_or(0) + constants::DELIMITER_LOOKAHEAD
    }
}
