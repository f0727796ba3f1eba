use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use tempfile::NamedTempFile;

use crate::constants;
use crate::spooled::SpooledFile;

/// Storage tiers of a [`TieredBuffer`], lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Memory,
    File,
}

impl Tier {
    const COUNT: usize = 2;

    fn ordinal(self) -> usize {
        self as usize
    }
}

/// An append-only byte sink that starts in memory and spills to a temporary file.
///
/// Bytes accumulate in memory until the next write would take the memory tier past
/// `memory_limit`; at that point the buffered bytes are moved into a temp file and every later
/// write goes straight to disk. A write that would take the buffer past `total_limit` fails with
/// [`Error::StorageLimitExceeded`](crate::Error::StorageLimitExceeded) and leaves the buffer as it was.
///
/// The temp file is created on the first spill only. It is deleted by [`close`](TieredBuffer::close)
/// or when the buffer is dropped, unless ownership was moved out with
/// [`into_spooled_file`](TieredBuffer::into_spooled_file).
///
/// A `TieredBuffer` has a single owner: every mutating operation takes `&mut self`, so callers
/// that share one across tasks must serialize access themselves.
///
/// # Examples
///
/// ```
/// use multispool::{Tier, TieredBuffer};
///
/// # fn run() -> multispool::Result<()> {
/// let mut buffer = TieredBuffer::new(4, 1024)?;
/// buffer.write(b"abc")?;
/// assert_eq!(buffer.current_tier(), Tier::Memory);
///
/// buffer.write(b"def")?;
/// assert_eq!(buffer.current_tier(), Tier::File);
/// assert_eq!(buffer.read_to_vec()?, b"abcdef");
///
/// buffer.close()?;
/// # Ok(())
/// # }
/// # run().unwrap();
/// ```
#[derive(Debug)]
pub struct TieredBuffer {
    memory_limit: u64,
    total_limit: u64,
    temp_dir: Option<PathBuf>,
    tier: Tier,
    usage: [u64; Tier::COUNT],
    memory: Vec<u8>,
    file: Option<BufWriter<NamedTempFile>>,
    closed: bool,
}

impl TieredBuffer {
    /// Creates a buffer spilling into the system temp directory.
    pub fn new(memory_limit: u64, total_limit: u64) -> crate::Result<TieredBuffer> {
        TieredBuffer::build(memory_limit, total_limit, None)
    }

    /// Creates a buffer spilling into `dir`.
    pub fn in_dir<P: Into<PathBuf>>(memory_limit: u64, total_limit: u64, dir: P) -> crate::Result<TieredBuffer> {
        TieredBuffer::build(memory_limit, total_limit, Some(dir.into()))
    }

    pub(crate) fn build(memory_limit: u64, total_limit: u64, temp_dir: Option<PathBuf>) -> crate::Result<TieredBuffer> {
        if total_limit < memory_limit {
            return Err(crate::Error::InvalidTierLimits {
                memory: memory_limit,
                total: total_limit,
            });
        }

        Ok(TieredBuffer {
            memory_limit,
            total_limit,
            temp_dir,
            tier: Tier::Memory,
            usage: [0; Tier::COUNT],
            memory: Vec::new(),
            file: None,
            closed: false,
        })
    }

    /// Appends `bytes`, spilling to disk when the memory tier would overflow.
    pub fn write(&mut self, bytes: &[u8]) -> crate::Result<()> {
        if self.closed {
            return Err(crate::Error::BufferClosed);
        }

        if bytes.is_empty() {
            return Ok(());
        }

        let incoming = bytes.len() as u64;

        if self.len().saturating_add(incoming) > self.total_limit {
            return Err(crate::Error::StorageLimitExceeded {
                limit: self.total_limit,
            });
        }

        if self.tier == Tier::Memory && self.usage[Tier::Memory.ordinal()] + incoming > self.memory_limit {
            self.spill()?;
        }

        match self.tier {
            Tier::Memory => self.memory.extend_from_slice(bytes),
            Tier::File => self.file_writer()?.write_all(bytes)?,
        }

        self.usage[self.tier.ordinal()] += incoming;

        Ok(())
    }

    /// Total bytes written so far, across both tiers.
    pub fn len(&self) -> u64 {
        self.usage.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes that were accepted while `tier` was the active tier.
    ///
    /// The counters only grow: bytes moved to disk by a spill stay accounted to the memory tier,
    /// so the two counters always add up to [`len`](TieredBuffer::len).
    pub fn bytes_written_for_tier(&self, tier: Tier) -> u64 {
        self.usage[tier.ordinal()]
    }

    pub fn current_tier(&self) -> Tier {
        self.tier
    }

    pub fn is_file_backed(&self) -> bool {
        self.tier == Tier::File
    }

    pub fn memory_limit(&self) -> u64 {
        self.memory_limit
    }

    pub fn total_limit(&self) -> u64 {
        self.total_limit
    }

    /// Path of the spill file, if one has been created.
    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|writer| writer.get_ref().path())
    }

    /// Returns a reader over the buffered bytes, flushing pending file writes first.
    pub fn as_reader(&mut self) -> crate::Result<TierReader<'_>> {
        if self.closed {
            return Err(crate::Error::BufferClosed);
        }

        match self.file.as_mut() {
            Some(writer) if self.tier == Tier::File => {
                writer.flush()?;
                let file = writer.get_ref().reopen()?;
                Ok(TierReader::File(BufReader::new(file)))
            }
            _ => Ok(TierReader::Memory(Cursor::new(self.memory.as_slice()))),
        }
    }

    /// Materializes every buffered byte in memory. Only meant for bounded contents.
    pub fn read_to_vec(&mut self) -> crate::Result<Vec<u8>> {
        let capacity = usize::try_from(self.len()).unwrap_or(0);
        let mut bytes = Vec::with_capacity(capacity);
        self.as_reader()?.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Decodes the buffered bytes as text in `encoding`, ignoring any byte order mark. Only meant
    /// for bounded contents.
    pub fn as_text(&mut self, encoding: &'static Encoding) -> crate::Result<String> {
        let bytes = self.read_to_vec()?;
        let (text, _) = encoding.decode_without_bom_handling(&bytes);
        Ok(text.into_owned())
    }

    /// Hands the spill file over to the caller, spilling first if the contents are still in memory.
    pub fn into_spooled_file(mut self) -> crate::Result<SpooledFile> {
        if self.closed {
            return Err(crate::Error::BufferClosed);
        }

        if self.tier == Tier::Memory {
            self.spill()?;
        }

        let len = self.len();
        let file = self.file_writer()?;
        file.flush()?;

        let file = match self.file.take() {
            Some(writer) => writer.into_inner().map_err(|err| err.into_error())?,
            None => return Err(crate::Error::BufferClosed),
        };

        Ok(SpooledFile::new(file.into_temp_path(), len))
    }

    /// Drops the buffered bytes and deletes the spill file. Calling it again is a no-op.
    pub fn close(&mut self) -> crate::Result<()> {
        if self.closed {
            return Ok(());
        }

        self.closed = true;
        self.memory = Vec::new();

        if let Some(writer) = self.file.take() {
            let (file, _) = writer.into_parts();
            trace!("deleting spill file {:?}", file.path());
            file.close()?;
        }

        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn spill(&mut self) -> crate::Result<()> {
        debug!(
            "memory tier limit of {} bytes reached, spilling {} bytes to disk",
            self.memory_limit,
            self.memory.len()
        );

        let memory = std::mem::take(&mut self.memory);
        let result = self
            .file_writer()
            .and_then(|writer| writer.write_all(&memory).map_err(crate::Error::from));

        match result {
            Ok(()) => {
                self.tier = Tier::File;
                Ok(())
            }
            Err(err) => {
                // Back to the memory tier, the partial spill file is dropped.
                self.memory = memory;
                self.file = None;
                Err(err)
            }
        }
    }

    fn file_writer(&mut self) -> crate::Result<&mut BufWriter<NamedTempFile>> {
        let writer = match self.file.take() {
            Some(writer) => writer,
            None => {
                let mut builder = tempfile::Builder::new();
                builder.prefix(constants::SPILL_FILE_PREFIX);

                let file = match self.temp_dir.as_deref() {
                    Some(dir) => builder.tempfile_in(dir)?,
                    None => builder.tempfile()?,
                };

                debug!("created spill file {:?}", file.path());
                BufWriter::with_capacity(constants::SPILL_FILE_BUFFER_SIZE, file)
            }
        };

        Ok(self.file.insert(writer))
    }
}

/// A reader over the contents of whichever tier is active.
#[derive(Debug)]
pub enum TierReader<'a> {
    Memory(Cursor<&'a [u8]>),
    File(BufReader<File>),
}

impl Read for TierReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            TierReader::Memory(cursor) => cursor.read(buf),
            TierReader::File(reader) => reader.read(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_accounting(buffer: &TieredBuffer, expected: u64) {
        assert_eq!(
            buffer.bytes_written_for_tier(Tier::Memory) + buffer.bytes_written_for_tier(Tier::File),
            expected
        );
        assert_eq!(buffer.len(), expected);
    }

    #[test]
    fn test_stays_in_memory_below_limit() {
        let mut buffer = TieredBuffer::new(16, 32).unwrap();
        buffer.write(b"hello").unwrap();
        buffer.write(b" world").unwrap();

        assert_eq!(buffer.current_tier(), Tier::Memory);
        assert!(buffer.path().is_none());
        assert_eq!(buffer.read_to_vec().unwrap(), b"hello world");
        assert_accounting(&buffer, 11);
    }

    #[test]
    fn test_spills_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = TieredBuffer::in_dir(8, 1024, dir.path()).unwrap();
        buffer.write(b"12345678").unwrap();
        assert_eq!(buffer.current_tier(), Tier::Memory);

        buffer.write(b"9").unwrap();
        assert!(buffer.is_file_backed());
        assert_eq!(buffer.bytes_written_for_tier(Tier::Memory), 8);
        assert_eq!(buffer.bytes_written_for_tier(Tier::File), 1);

        let path = buffer.path().unwrap().to_owned();
        assert!(path.starts_with(dir.path()));
        assert_eq!(buffer.read_to_vec().unwrap(), b"123456789");
        assert_eq!(std::fs::read(&path).unwrap(), b"123456789");
    }

    #[test]
    fn test_zero_memory_limit_is_file_backed_immediately() {
        let mut buffer = TieredBuffer::new(0, 64).unwrap();
        assert!(buffer.path().is_none());

        buffer.write(b"x").unwrap();
        assert!(buffer.is_file_backed());
        assert!(buffer.path().is_some());
        buffer.close().unwrap();
    }

    #[test]
    fn test_accounting_after_every_write() {
        let mut buffer = TieredBuffer::new(10, 1000).unwrap();
        let mut written = 0;

        for size in [0usize, 3, 7, 1, 13, 0, 200, 5] {
            buffer.write(&vec![b'a'; size]).unwrap();
            written += size as u64;
            assert_accounting(&buffer, written);
        }

        assert_eq!(buffer.read_to_vec().unwrap().len() as u64, written);
    }

    #[test]
    fn test_total_limit() {
        let mut buffer = TieredBuffer::new(1024, 2048).unwrap();
        buffer.write(&[7; 2000]).unwrap();

        assert_eq!(
            buffer.write(&[7; 49]),
            Err(crate::Error::StorageLimitExceeded { limit: 2048 })
        );
        assert_accounting(&buffer, 2000);

        buffer.write(&[7; 48]).unwrap();
        assert_accounting(&buffer, 2048);
        assert!(buffer.write(b"x").is_err());
        assert_eq!(buffer.read_to_vec().unwrap().len(), 2048);
    }

    #[test]
    fn test_equal_limits_never_spill() {
        let mut buffer = TieredBuffer::new(4, 4).unwrap();
        buffer.write(b"abcd").unwrap();
        assert!(buffer.write(b"e").is_err());
        assert_eq!(buffer.current_tier(), Tier::Memory);
        assert!(buffer.path().is_none());
    }

    #[test]
    fn test_invalid_limits() {
        assert_eq!(
            TieredBuffer::new(10, 1).unwrap_err(),
            crate::Error::InvalidTierLimits { memory: 10, total: 1 }
        );
    }

    #[test]
    fn test_as_text() {
        let mut buffer = TieredBuffer::new(0, 64).unwrap();
        buffer.write(b"caf\xe9").unwrap();
        assert_eq!(buffer.as_text(encoding_rs::WINDOWS_1252).unwrap(), "café");
        assert_eq!(buffer.as_text(encoding_rs::UTF_8).unwrap(), "caf\u{FFFD}");

        let mut buffer = TieredBuffer::new(64, 64).unwrap();
        buffer.write(b"\xef\xbb\xbfA").unwrap();
        assert_eq!(buffer.as_text(encoding_rs::WINDOWS_1252).unwrap(), "\u{ef}\u{bb}\u{bf}A");
    }

    #[test]
    fn test_failed_spill_keeps_memory_tier() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = TieredBuffer::in_dir(4, 100, dir.path().join("missing")).unwrap();

        buffer.write(b"abc").unwrap();
        assert!(matches!(buffer.write(b"de"), Err(crate::Error::Io(_))));

        assert_eq!(buffer.current_tier(), Tier::Memory);
        assert!(buffer.path().is_none());
        assert_eq!(buffer.read_to_vec().unwrap(), b"abc");
        assert_accounting(&buffer, 3);

        std::fs::create_dir(dir.path().join("missing")).unwrap();
        buffer.write(b"de").unwrap();
        assert!(buffer.is_file_backed());
        assert_eq!(buffer.read_to_vec().unwrap(), b"abcde");
        assert_accounting(&buffer, 5);
    }

    #[test]
    fn test_close_deletes_file_and_is_idempotent() {
        let mut buffer = TieredBuffer::new(0, 64).unwrap();
        buffer.write(b"abc").unwrap();
        let path = buffer.path().unwrap().to_owned();
        assert!(path.exists());

        buffer.close().unwrap();
        assert!(!path.exists());
        buffer.close().unwrap();

        assert!(buffer.is_closed());
        assert_eq!(buffer.write(b"x"), Err(crate::Error::BufferClosed));
        assert!(buffer.read_to_vec().is_err());
    }

    #[test]
    fn test_drop_deletes_file() {
        let mut buffer = TieredBuffer::new(0, 64).unwrap();
        buffer.write(b"abc").unwrap();
        let path = buffer.path().unwrap().to_owned();

        drop(buffer);
        assert!(!path.exists());
    }

    #[test]
    fn test_into_spooled_file_from_memory() {
        let mut buffer = TieredBuffer::new(64, 64).unwrap();
        buffer.write(&[1, 2, 3]).unwrap();
        assert!(buffer.path().is_none());

        let file = buffer.into_spooled_file().unwrap();
        assert_eq!(file.len(), 3);
        assert_eq!(std::fs::read(file.path()).unwrap(), [1, 2, 3]);
    }

    #[test]
    fn test_into_spooled_file_when_empty() {
        let buffer = TieredBuffer::new(0, 64).unwrap();
        let file = buffer.into_spooled_file().unwrap();
        assert!(file.is_empty());
        assert!(file.path().exists());
    }
}
