use crate::data_size::DataSize;

pub(crate) const DEFAULT_WHOLE_STREAM_SIZE_LIMIT: DataSize = DataSize::megabytes(200);
pub(crate) const DEFAULT_PER_FIELD_SIZE_LIMIT: DataSize = DataSize::mebibytes(100);
pub(crate) const DEFAULT_PER_PART_HEADER_SIZE_LIMIT: DataSize = DataSize::kibibytes(100);
pub(crate) const DEFAULT_SCRATCH_BUFFER_SIZE: usize = 8 * 1024;

/// Capacity of the write buffer sitting in front of a spill file.
pub(crate) const SPILL_FILE_BUFFER_SIZE: usize = 8 * 1024;
pub(crate) const SPILL_FILE_PREFIX: &str = "multispool-";

/// RFC 2046 caps boundaries at 70 characters.
pub(crate) const MAX_BOUNDARY_LEN: usize = 70;

/// Bytes past the body delimiter that must be visible before it can be tested: the two
/// bytes of a close delimiter's `--` plus one data byte.
pub(crate) const DELIMITER_LOOKAHEAD: usize = 3;

pub(crate) const BOUNDARY_EXT: &str = "--";
pub(crate) const CRLF: &str = "\r\n";
pub(crate) const CRLF_CRLF: &str = "\r\n\r\n";

/// A text part with this name carries the default charset for parts without one (RFC 7578, 4.6).
pub(crate) const CHARSET_FIELD_NAME: &str = "_charset_";
