use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use bytes::{Buf, BytesMut};

use crate::error::{Result, TransportError};

const READ_CHUNK_SIZE: usize = 256;

/// A link that delivers bytes one at a time.
///
/// `read_byte` blocks for at most the source's read timeout. A timeout is not
/// an error: it returns `Ok(None)` so the caller can check for cancellation
/// between reads. Any `Err` is fatal for the current session.
pub trait ByteSource: Send {
    /// Read the next byte, or `Ok(None)` if the read timed out.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Adapts any `Read` into a [`ByteSource`].
///
/// Reads are buffered in chunks and handed out one byte at a time. End of
/// stream maps to [`TransportError::Closed`]; `TimedOut` and `WouldBlock`
/// map to a read timeout.
pub struct StreamSource<R> {
    inner: R,
    buf: BytesMut,
    label: String,
}

impl<R: Read + Send> StreamSource<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self::with_label(inner, "stream")
    }

    /// Wrap a reader with an explicit description.
    pub fn with_label(inner: R, label: impl Into<String>) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            label: label.into(),
        }
    }

    /// Borrow the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the source and return the reader. Buffered bytes are dropped.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl StreamSource<File> {
    /// Open a capture file.
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TransportError::OpenFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::with_label(file, format!("file:{}", path.display())))
    }
}

impl<R: Read + Send> ByteSource for StreamSource<R> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.buf.has_remaining() {
            return Ok(Some(self.buf.get_u8()));
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(Some(self.buf.get_u8()));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
                {
                    return Ok(None)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

impl<R> std::fmt::Debug for StreamSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSource")
            .field("label", &self.label)
            .field("buffered", &self.buf.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn drain<S: ByteSource>(source: &mut S) -> Vec<u8> {
        let mut out = Vec::new();
        while let Ok(Some(b)) = source.read_byte() {
            out.push(b);
        }
        out
    }

    #[test]
    fn yields_bytes_in_order_then_closes() {
        let data: Vec<u8> = (0..=255u8).chain(0..10u8).collect();
        let mut source = StreamSource::new(Cursor::new(data.clone()));

        assert_eq!(drain(&mut source), data);
        assert!(matches!(source.read_byte(), Err(TransportError::Closed)));
    }

    #[test]
    fn empty_stream_is_closed() {
        let mut source = StreamSource::new(Cursor::new(Vec::<u8>::new()));
        assert!(matches!(source.read_byte(), Err(TransportError::Closed)));
    }

    #[test]
    fn timeout_is_not_an_error() {
        let mut source = StreamSource::new(Scripted::new(vec![
            Step::Err(ErrorKind::TimedOut),
            Step::Data(vec![0xAA]),
            Step::Err(ErrorKind::WouldBlock),
        ]));

        assert_eq!(source.read_byte().unwrap(), None);
        assert_eq!(source.read_byte().unwrap(), Some(0xAA));
        assert_eq!(source.read_byte().unwrap(), None);
        assert!(matches!(source.read_byte(), Err(TransportError::Closed)));
    }

    #[test]
    fn interrupted_read_retries() {
        let mut source = StreamSource::new(Scripted::new(vec![
            Step::Err(ErrorKind::Interrupted),
            Step::Data(vec![0x55]),
        ]));
        assert_eq!(source.read_byte().unwrap(), Some(0x55));
    }

    #[test]
    fn hard_io_error_propagates() {
        let mut source = StreamSource::new(Scripted::new(vec![Step::Err(
            ErrorKind::BrokenPipe,
        )]));
        let err = source.read_byte().unwrap_err();
        assert!(matches!(err, TransportError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn boxed_source_delegates() {
        let mut source: Box<dyn ByteSource> =
            Box::new(StreamSource::with_label(Cursor::new(vec![1, 2]), "boxed"));
        assert_eq!(source.describe(), "boxed");
        assert_eq!(drain(&mut source), vec![1, 2]);
    }

    #[test]
    fn open_missing_file_reports_path() {
        let path = std::env::temp_dir().join(format!(
            "rrcmon-missing-{}-capture.bin",
            std::process::id()
        ));
        let err = StreamSource::open_file(&path).unwrap_err();
        assert!(matches!(err, TransportError::OpenFile { .. }));
        assert!(err.to_string().contains("rrcmon-missing"));
    }

    #[test]
    fn open_file_reads_capture() {
        let dir = std::env::temp_dir().join(format!("rrcmon-transport-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("capture.bin");
        std::fs::write(&path, [0xAA, 0x55, 0x00]).unwrap();

        let mut source = StreamSource::open_file(&path).unwrap();
        assert!(source.describe().starts_with("file:"));
        assert_eq!(drain(&mut source), vec![0xAA, 0x55, 0x00]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    enum Step {
        Data(Vec<u8>),
        Err(ErrorKind),
    }

    struct Scripted {
        steps: std::collections::VecDeque<Step>,
    }

    impl Scripted {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.steps.pop_front() {
                None => Ok(0),
                Some(Step::Err(kind)) => Err(std::io::Error::from(kind)),
                Some(Step::Data(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
            }
        }
    }
}
