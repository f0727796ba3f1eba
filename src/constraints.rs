use std::path::PathBuf;

use crate::constants;
use crate::size_limit::SizeLimit;

/// Configuration for decoding a multipart body.
///
/// # Examples
///
/// ```
/// use multispool::{Constraints, DataSize, SizeLimit};
///
/// let constraints = Constraints::new()
///     .scratch_buffer_size(32 * 1024)
///     .size_limit(SizeLimit::new().per_field(DataSize::mebibytes(5)))
///     .temp_dir(std::env::temp_dir());
/// ```
#[derive(Debug, Clone)]
pub struct Constraints {
    pub(crate) size_limit: SizeLimit,
    pub(crate) scratch_buffer_size: usize,
    pub(crate) temp_dir: Option<PathBuf>,
}

impl Constraints {
    /// Creates default constraints: [`SizeLimit::default`], an 8 KiB scratch buffer and spill
    /// files in the system temp directory.
    pub fn new() -> Constraints {
        Constraints::default()
    }

    pub fn size_limit(mut self, size_limit: SizeLimit) -> Constraints {
        self.size_limit = size_limit;
        self
    }

    /// Sets the decoder's scratch buffer size, which is also the largest chunk a
    /// [`MultipartDecoder`](crate::MultipartDecoder) accepts per call.
    pub fn scratch_buffer_size(mut self, size: usize) -> Constraints {
        self.scratch_buffer_size = size;
        self
    }

    /// Sets the directory spill files are created in.
    pub fn temp_dir<P: Into<PathBuf>>(mut self, dir: P) -> Constraints {
        self.temp_dir = Some(dir.into());
        self
    }
}

impl Default for Constraints {
    fn default() -> Self {
        Constraints {
            size_limit: SizeLimit::default(),
            scratch_buffer_size: constants::DEFAULT_SCRATCH_BUFFER_SIZE,
            temp_dir: None,
        }
    }
}
