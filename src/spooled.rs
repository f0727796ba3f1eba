use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tempfile::TempPath;

/// A binary part's contents, spooled to a temporary file.
///
/// The file belongs to whoever holds this value and is deleted when it is dropped or
/// [`close`](SpooledFile::close)d, so a handler that wants to keep an upload must
/// [`persist`](SpooledFile::persist) or [`keep`](SpooledFile::keep) it.
#[derive(Debug)]
pub struct SpooledFile {
    path: TempPath,
    len: u64,
}

impl SpooledFile {
    pub(crate) fn new(path: TempPath, len: u64) -> Self {
        SpooledFile { path, len }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the contents in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Opens the file for reading.
    pub fn open(&self) -> crate::Result<File> {
        Ok(File::open(&self.path)?)
    }

    /// Reads the whole file into memory.
    pub fn read_to_vec(&self) -> crate::Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(usize::try_from(self.len).unwrap_or(0));
        self.open()?.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Moves the file to `to`, which then outlives this value.
    pub fn persist<P: AsRef<Path>>(self, to: P) -> crate::Result<()> {
        self.path.persist(to).map_err(|err| crate::Error::Io(err.error))
    }

    /// Keeps the file at its temporary location and returns that path.
    pub fn keep(self) -> crate::Result<PathBuf> {
        self.path.keep().map_err(|err| crate::Error::Io(err.error))
    }

    /// Deletes the file, reporting any failure instead of ignoring it like `drop` does.
    pub fn close(self) -> crate::Result<()> {
        Ok(self.path.close()?)
    }
}

impl AsRef<Path> for SpooledFile {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

#[cfg(test)]
mod tests {
    use crate::TieredBuffer;

    fn spooled(contents: &[u8]) -> super::SpooledFile {
        let mut buffer = TieredBuffer::new(0, 1024).unwrap();
        buffer.write(contents).unwrap();
        buffer.into_spooled_file().unwrap()
    }

    #[test]
    fn test_read_back() {
        let file = spooled(b"binary\0data");
        assert_eq!(file.len(), 11);
        assert_eq!(file.read_to_vec().unwrap(), b"binary\0data");
    }

    #[test]
    fn test_drop_deletes() {
        let file = spooled(b"abc");
        let path = file.path().to_owned();
        assert!(path.exists());

        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_close_deletes() {
        let file = spooled(b"abc");
        let path = file.path().to_owned();

        file.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_persist() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("upload.bin");

        spooled(&[1, 2, 3]).persist(&target).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), [1, 2, 3]);
    }

    #[test]
    fn test_keep() {
        let path = spooled(b"kept").keep().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"kept");
        std::fs::remove_file(path).unwrap();
    }
}
