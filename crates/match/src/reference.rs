use std::fs::File;
use std::io;
use std::path::Path;

/// Random-access read capability over a prior copy of a file.
///
/// The matcher and delta replay only ever need "read these bytes at this
/// offset", so any backing store can serve as a reference.
pub trait ReferenceSource {
    /// Total length in bytes.
    fn len(&self) -> u64;

    /// Fills `buf` with the bytes starting at `offset`.
    ///
    /// Reading past the end fails with [`io::ErrorKind::UnexpectedEof`].
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Returns `true` when the reference holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn slice_read_at(data: &[u8], offset: u64, buf: &mut [u8]) -> io::Result<()> {
    let start = usize::try_from(offset).ok().filter(|&start| start <= data.len());
    let range = start.and_then(|start| {
        let end = start.checked_add(buf.len())?;
        (end <= data.len()).then_some(start..end)
    });
    match range {
        Some(range) => {
            buf.copy_from_slice(&data[range]);
            Ok(())
        }
        None => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "read of {} bytes at offset {offset} exceeds reference of {} bytes",
                buf.len(),
                data.len()
            ),
        )),
    }
}

impl ReferenceSource for [u8] {
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        slice_read_at(self, offset, buf)
    }
}

impl ReferenceSource for Vec<u8> {
    fn len(&self) -> u64 {
        Vec::len(self) as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        slice_read_at(self, offset, buf)
    }
}

impl<T: ReferenceSource + ?Sized> ReferenceSource for &T {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_at(offset, buf)
    }
}

impl<T: ReferenceSource + ?Sized> ReferenceSource for Box<T> {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_at(offset, buf)
    }
}

/// A file on disk used as a reference without loading it into memory.
#[derive(Debug)]
pub struct FileReference {
    file: File,
    len: u64,
}

impl FileReference {
    /// Opens `path` read-only.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::from_file(File::open(path)?)
    }

    /// Wraps an already opened file.
    pub fn from_file(file: File) -> io::Result<Self> {
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }
}

impl ReferenceSource for FileReference {
    fn len(&self) -> u64 {
        self.len
    }

    #[cfg(unix)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        use std::os::unix::fs::FileExt;

        self.file.read_exact_at(buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        use std::os::windows::fs::FileExt;

        let mut filled = 0;
        while filled < buf.len() {
            match self.file.seek_read(&mut buf[filled..], offset + filled as u64) {
                Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}
