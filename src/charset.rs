use encoding_rs::{Encoding, UTF_8};

/// ISO-8859-1 labels. `encoding_rs` maps these to windows-1252, which differs in 0x80..=0x9F.
const LATIN1_LABELS: &[&str] = &[
    "iso-8859-1",
    "iso8859-1",
    "iso88591",
    "iso_8859-1",
    "iso_8859_1",
    "iso_8859-1:1987",
    "8859_1",
    "latin1",
    "l1",
    "iso-ir-100",
    "csisolatin1",
    "ibm819",
    "ibm-819",
    "cp819",
    "819",
];

/// The character set a text part is decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Charset {
    /// Every byte maps to the code point of the same value.
    Latin1,
    Encoding(&'static Encoding),
}

impl Charset {
    pub(crate) const UTF_8: Charset = Charset::Encoding(UTF_8);

    pub(crate) fn for_label(label: &str) -> crate::Result<Charset> {
        let trimmed = label.trim();

        if LATIN1_LABELS.iter().any(|latin1| trimmed.eq_ignore_ascii_case(latin1)) {
            return Ok(Charset::Latin1);
        }

        Encoding::for_label(trimmed.as_bytes())
            .map(Charset::Encoding)
            .ok_or_else(|| crate::Error::UnknownCharset(label.to_owned()))
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Charset::Latin1 => "ISO-8859-1",
            Charset::Encoding(encoding) => encoding.name(),
        }
    }

    /// Decodes `bytes` without BOM sniffing, so the charset is never overridden by the content.
    pub(crate) fn decode(self, bytes: &[u8]) -> String {
        match self {
            Charset::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Charset::Encoding(encoding) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
        }
    }
}
