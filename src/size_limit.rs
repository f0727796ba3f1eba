use std::collections::HashMap;

use crate::constants;
use crate::data_size::DataSize;

/// Size limits that keep a multipart upload from exhausting memory or disk.
///
/// Please refer [`Constraints`](crate::Constraints) for more info.
///
/// # Examples
///
/// ```
/// use multispool::{DataSize, SizeLimit};
///
/// let size_limit = SizeLimit::new()
///     .whole_stream(DataSize::megabytes(50))
///     .per_part_header(DataSize::kibibytes(16))
///     .per_field(DataSize::mebibytes(10))
///     .for_field("avatar", DataSize::mebibytes(2));
/// ```
#[derive(Debug, Clone)]
pub struct SizeLimit {
    pub(crate) whole_stream: u64,
    pub(crate) per_part_header: u64,
    pub(crate) per_field: u64,
    pub(crate) field_map: HashMap<String, u64>,
}

impl SizeLimit {
    /// Creates the default limits: 200 MB for the whole stream, 100 KiB for a part's headers
    /// and 100 MiB for a part's body.
    pub fn new() -> SizeLimit {
        SizeLimit::default()
    }

    /// Sets size limit for the whole request entity.
    ///
    /// Bytes past this limit are drained and dropped instead of decoded.
    pub fn whole_stream<L: Into<DataSize>>(mut self, limit: L) -> SizeLimit {
        self.whole_stream = limit.into().as_u64();
        self
    }

    /// Sets size limit for each part's header block.
    pub fn per_part_header<L: Into<DataSize>>(mut self, limit: L) -> SizeLimit {
        self.per_part_header = limit.into().as_u64();
        self
    }

    /// Sets size limit for each part's body.
    pub fn per_field<L: Into<DataSize>>(mut self, limit: L) -> SizeLimit {
        self.per_field = limit.into().as_u64();
        self
    }

    /// Sets size limit for a specific field, it overrides the `per_field` value for this field.
    ///
    /// It is useful when you want to set a tighter limit on a textual field, which is decoded
    /// into memory once it's complete.
    pub fn for_field<N: Into<String>, L: Into<DataSize>>(mut self, field_name: N, limit: L) -> SizeLimit {
        self.field_map.insert(field_name.into(), limit.into().as_u64());
        self
    }

    pub(crate) fn extract_size_limit_for(&self, field: Option<&str>) -> u64 {
        field
            .and_then(|field| self.field_map.get(field))
            .copied()
            .unwrap_or(self.per_field)
    }
}

impl Default for SizeLimit {
    fn default() -> Self {
        SizeLimit {
            whole_stream: constants::DEFAULT_WHOLE_STREAM_SIZE_LIMIT.as_u64(),
            per_part_header: constants::DEFAULT_PER_PART_HEADER_SIZE_LIMIT.as_u64(),
            per_field: constants::DEFAULT_PER_FIELD_SIZE_LIMIT.as_u64(),
            field_map: HashMap::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let size_limit = SizeLimit::new();
        assert_eq!(size_limit.whole_stream, 200_000_000);
        assert_eq!(size_limit.per_part_header, 100 * 1024);
        assert_eq!(size_limit.per_field, 100 * 1024 * 1024);
    }

    #[test]
    fn test_field_override() {
        let size_limit = SizeLimit::new().per_field(10u64).for_field("avatar", 2u64);

        assert_eq!(size_limit.extract_size_limit_for(Some("avatar")), 2);
        assert_eq!(size_limit.extract_size_limit_for(Some("other")), 10);
        assert_eq!(size_limit.extract_size_limit_for(None), 10);
    }
}
