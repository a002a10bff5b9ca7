use std::io::{self, Read, Write};
use std::sync::mpsc::{channel, Receiver, Sender};

use tracing::trace;

use crate::error::TransportError;

/// Create a connected pair of in-memory byte streams.
///
/// Bytes written to one end become readable on the other, preserving write
/// boundaries as chunks the way a serial driver delivers them. Dropping
/// either end makes the peer's reads return EOF and its writes fail.
pub fn loopback() -> (Duplex, Duplex) {
    let (left_tx, right_rx) = channel();
    let (right_tx, left_rx) = channel();
    (
        Duplex {
            reader: ChunkReader::new(left_rx),
            writer: ChunkWriter { tx: left_tx },
        },
        Duplex {
            reader: ChunkReader::new(right_rx),
            writer: ChunkWriter { tx: right_tx },
        },
    )
}

/// One end of an in-memory duplex byte stream.
#[derive(Debug)]
pub struct Duplex {
    reader: ChunkReader,
    writer: ChunkWriter,
}

impl Duplex {
    /// Split into independently owned read and write halves.
    ///
    /// Needed when one thread drives the engine's feed loop while another
    /// sends commands.
    pub fn split(self) -> (ChunkReader, ChunkWriter) {
        (self.reader, self.writer)
    }
}

impl Read for Duplex {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Write for Duplex {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Read half of a [`Duplex`]. Blocks until the peer writes or disconnects.
#[derive(Debug)]
pub struct ChunkReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    offset: usize,
}

impl ChunkReader {
    fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            pending: Vec::new(),
            offset: 0,
        }
    }
}

impl Read for ChunkReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.offset >= self.pending.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.offset = 0;
                }
                // Sender dropped: clean EOF, like a closed serial port.
                Err(_) => {
                    trace!("loopback reader reached end of stream");
                    return Ok(0);
                }
            }
        }

        let available = &self.pending[self.offset..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.offset += n;
        Ok(n)
    }
}

/// Write half of a [`Duplex`].
#[derive(Debug)]
pub struct ChunkWriter {
    tx: Sender<Vec<u8>>,
}

impl Write for ChunkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .send(buf.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, TransportError::Closed))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::thread;

    use super::*;

    #[test]
    fn roundtrip_preserves_bytes() {
        let (mut left, mut right) = loopback();

        left.write_all(b"hello").unwrap();
        let mut buf = [0u8; 5];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        right.write_all(b"world").unwrap();
        left.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn small_reads_drain_large_chunk() {
        let (mut left, mut right) = loopback();
        left.write_all(&[1, 2, 3, 4, 5, 6]).unwrap();

        let mut buf = [0u8; 4];
        let n = right.read(&mut buf).unwrap();
        assert_eq!((n, &buf[..n]), (4, &[1u8, 2, 3, 4][..]));
        let n = right.read(&mut buf).unwrap();
        assert_eq!((n, &buf[..n]), (2, &[5u8, 6][..]));
    }

    #[test]
    fn eof_after_peer_dropped() {
        let (left, mut right) = loopback();
        drop(left);

        let mut buf = [0u8; 8];
        assert_eq!(right.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn write_to_dropped_peer_fails() {
        let (mut left, right) = loopback();
        drop(right);

        let err = left.write_all(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn split_halves_work_across_threads() {
        let (left, right) = loopback();
        let (mut left_read, mut left_write) = left.split();
        let (mut right_read, mut right_write) = right.split();

        let echo = thread::spawn(move || {
            let mut buf = [0u8; 16];
            loop {
                let n = right_read.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                right_write.write_all(&buf[..n]).unwrap();
            }
        });

        left_write.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        left_read.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        drop(left_write);
        echo.join().unwrap();
    }
}
