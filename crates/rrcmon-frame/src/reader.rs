use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};

use crate::codec::Frame;
use crate::error::{FrameError, Result};
use crate::parser::{report_mismatch, FrameParser};

const READ_CHUNK_SIZE: usize = 1024;

/// Reads checksum-verified frames from any `Read` stream.
///
/// Handles partial reads and resynchronization internally. Frames that fail
/// their checksum are logged, counted and skipped; callers only ever see
/// valid frames.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    parser: FrameParser,
    checksum_errors: u64,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            parser: FrameParser::new(),
            checksum_errors: 0,
        }
    }

    /// Read the next valid frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached, even
    /// if a partial frame was pending.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            while self.buf.has_remaining() {
                let byte = self.buf.get_u8();
                match self.parser.feed(byte) {
                    Ok(Some(frame)) => return Ok(frame),
                    Ok(None) => {}
                    Err(mismatch) => {
                        self.checksum_errors += 1;
                        report_mismatch(&mismatch);
                    }
                }
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Frames dropped so far because their checksum did not verify.
    pub fn checksum_errors(&self) -> u64 {
        self.checksum_errors
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream. Buffered bytes are
    /// dropped.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> std::fmt::Debug for FrameReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("buffered", &self.buf.len())
            .field("state", &self.parser.state())
            .field("checksum_errors", &self.checksum_errors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    use bytes::BytesMut;

    use super::*;
    use crate::codec::encode_frame;

    fn wire(frames: &[(u8, &[u8])]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for (code, payload) in frames {
            encode_frame(*code, payload, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn read_single_frame() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[(0x06, &[0x01, 0x01])])));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.function_code(), 0x06);
        assert_eq!(frame.payload().as_ref(), &[0x01, 0x01]);
    }

    #[test]
    fn read_multiple_frames() {
        let bytes = wire(&[
            (0x00, &[0x01, 0x20, 0x1C]),
            (0x06, &[0x02, 0x01]),
            (0x08, &[1, 2, 3, 4, 5, 6, 7]),
        ]);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        let f1 = reader.read_frame().unwrap();
        let f2 = reader.read_frame().unwrap();
        let f3 = reader.read_frame().unwrap();

        assert_eq!(f1.function_code(), 0x00);
        assert_eq!(f2.function_code(), 0x06);
        assert_eq!((f3.function_code(), f3.length()), (0x08, 7));
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire(&[(0x07, &[0u8; 24])]),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.function_code(), 0x07);
        assert_eq!(frame.checksum(), 0xD3);
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut bytes = wire(&[(0x07, &[0u8; 24])]);
        bytes.truncate(10);

        let mut reader = FrameReader::new(Cursor::new(bytes));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn skips_noise_and_bad_checksums() {
        let mut bytes = vec![0x13, 0x37, 0x55];
        let mut corrupt = wire(&[(0x0A, &[0u8; 7])]);
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0x01;
        bytes.extend(corrupt);
        bytes.extend([0xAA, 0x00]);
        bytes.extend(wire(&[(0x06, &[0x03, 0x20])]));

        let mut reader = FrameReader::new(Cursor::new(bytes));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.function_code(), 0x06);
        assert_eq!(reader.checksum_errors(), 1);
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(wire(&[(0x06, &[0x01, 0x40])])),
        };
        let mut framed = FrameReader::new(reader);
        let frame = framed.read_frame().unwrap();

        assert_eq!(frame.payload().as_ref(), &[0x01, 0x40]);
    }

    #[test]
    fn hard_io_error_propagates() {
        let mut framed = FrameReader::new(FailingReader);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    #[cfg(unix)]
    fn concurrent_reader_writer_threads() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let reader = Arc::new(Mutex::new(FrameReader::new(right)));

        let reader_thread = {
            let reader = Arc::clone(&reader);
            std::thread::spawn(move || {
                for expected in 0..64u8 {
                    let frame = reader.lock().unwrap().read_frame().unwrap();
                    assert_eq!(frame.function_code(), expected % 5);
                    assert_eq!(frame.payload().as_ref(), &[expected; 3]);
                }
            })
        };

        for i in 0..64u8 {
            writer.send(i % 5, &[i; 3]).unwrap();
        }

        reader_thread.join().unwrap();
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        assert_eq!(reader.checksum_errors(), 0);
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }
    }
}
