//! Entry content copy with a reusable buffer.
//!
//! Archive decoders report their faults through the reader side of the copy,
//! while the filesystem reports through the writer side. The two are kept
//! apart in [`StreamError`] so the extractor can ask the decoder to classify
//! read faults and treat write faults as plain I/O failures.

use std::io::Read;
use std::io::Write;
use std::io::{self};

use thiserror::Error;

/// Buffer size for entry copies (64KB).
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Failure while streaming an entry to disk.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Reading decoded entry content failed.
    #[error("error copying stream: {0}")]
    Read(#[source] io::Error),

    /// Creating, writing or flushing the output failed.
    #[error("writing output: {0}")]
    Write(#[source] io::Error),
}

/// Stack-allocated buffer, reused for every entry of one extraction.
#[derive(Debug)]
pub struct CopyBuffer {
    #[allow(clippy::large_stack_arrays)]
    buf: [u8; COPY_BUFFER_SIZE],
}

impl CopyBuffer {
    /// Creates a new zeroed copy buffer.
    #[inline]
    #[must_use]
    #[allow(clippy::large_stack_arrays)]
    pub fn new() -> Self {
        Self {
            buf: [0u8; COPY_BUFFER_SIZE],
        }
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        COPY_BUFFER_SIZE
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies `reader` into `writer`, returning the number of bytes copied.
///
/// Interrupted reads are retried.
///
/// # Errors
///
/// Returns `StreamError::Read` or `StreamError::Write` depending on which
/// side failed.
#[inline]
pub fn copy_with_buffer<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut CopyBuffer,
) -> Result<u64, StreamError> {
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(StreamError::Read(e)),
        };

        writer
            .write_all(&buffer.buf[..bytes_read])
            .map_err(StreamError::Write)?;

        total += bytes_read as u64;
    }

    Ok(total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Error;
    use std::io::ErrorKind;

    #[test]
    fn test_copy_buffer_size() {
        assert_eq!(CopyBuffer::default().size(), 64 * 1024);
    }

    #[test]
    fn test_copy_multiple_chunks() {
        let mut buffer = CopyBuffer::new();
        let input_data: Vec<u8> = (0..COPY_BUFFER_SIZE * 3 + 1000)
            .map(|i| (i % 251) as u8)
            .collect();
        let mut output = Vec::new();

        let copied =
            copy_with_buffer(&mut Cursor::new(&input_data), &mut output, &mut buffer).unwrap();
        assert_eq!(copied, input_data.len() as u64);
        assert_eq!(output, input_data);
    }

    #[test]
    fn test_copy_empty_source() {
        let mut output = Vec::new();
        let copied = copy_with_buffer(
            &mut Cursor::new(Vec::<u8>::new()),
            &mut output,
            &mut CopyBuffer::new(),
        )
        .unwrap();
        assert_eq!(copied, 0);
    }

    #[test]
    fn test_copy_read_failure_is_read_error() {
        struct Truncated(usize);

        impl Read for Truncated {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.0 == 0 {
                    return Err(Error::new(ErrorKind::UnexpectedEof, "volume missing"));
                }
                let n = self.0.min(buf.len());
                buf[..n].fill(7);
                self.0 -= n;
                Ok(n)
            }
        }

        let mut output = Vec::new();
        let result = copy_with_buffer(&mut Truncated(10), &mut output, &mut CopyBuffer::new());
        match result {
            Err(StreamError::Read(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
            other => panic!("expected read error, got {other:?}"),
        }
        assert_eq!(output.len(), 10);
    }

    #[test]
    fn test_copy_write_failure_is_write_error() {
        struct Full;

        impl Write for Full {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(Error::other("disk full"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let result = copy_with_buffer(&mut Cursor::new(b"data"), &mut Full, &mut CopyBuffer::new());
        assert!(matches!(result, Err(StreamError::Write(_))));
    }

    #[test]
    fn test_copy_retries_interrupted_reads() {
        struct Flaky {
            interrupted: bool,
            data: Cursor<Vec<u8>>,
        }

        impl Read for Flaky {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(Error::new(ErrorKind::Interrupted, "signal"));
                }
                self.data.read(buf)
            }
        }

        let mut reader = Flaky {
            interrupted: false,
            data: Cursor::new(b"payload".to_vec()),
        };
        let mut output = Vec::new();
        let copied = copy_with_buffer(&mut reader, &mut output, &mut CopyBuffer::new()).unwrap();
        assert_eq!(copied, 7);
        assert_eq!(output, b"payload");
    }
}
