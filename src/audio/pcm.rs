//! Raw PCM decoding
//!
//! Both the capture stream and replay files carry headerless signed 16-bit
//! little-endian mono samples.

use std::io::{self, ErrorKind, Read};

use super::CHUNK_BYTES;

const SAMPLE_BYTES: usize = std::mem::size_of::<i16>();

/// Decode S16LE bytes into samples. A trailing odd byte is ignored.
pub fn decode_s16le(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(SAMPLE_BYTES)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Reads a PCM source in fixed-size chunks of whole samples
pub struct PcmChunks<R> {
    reader: R,
    chunk_bytes: usize,
}

impl<R: Read> PcmChunks<R> {
    pub fn new(reader: R) -> Self {
        Self::with_chunk_bytes(reader, CHUNK_BYTES)
    }

    /// `chunk_bytes` is rounded down to whole samples (minimum one sample)
    pub fn with_chunk_bytes(reader: R, chunk_bytes: usize) -> Self {
        let chunk_bytes = (chunk_bytes / SAMPLE_BYTES).max(1) * SAMPLE_BYTES;
        Self {
            reader,
            chunk_bytes,
        }
    }

    /// Read the next chunk.
    ///
    /// Short reads are retried until the chunk is full, so every chunk but
    /// the last has exactly `chunk_bytes` bytes. Returns `None` at end of
    /// input. A final odd byte is dropped.
    pub fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut chunk = vec![0u8; self.chunk_bytes];
        let mut filled = 0;

        while filled < chunk.len() {
            match self.reader.read(&mut chunk[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        chunk.truncate(filled - filled % SAMPLE_BYTES);
        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some(chunk))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that hands out at most `step` bytes per call
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.step).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_decode_little_endian() {
        let bytes = [0x01, 0x00, 0xff, 0xff, 0x00, 0x80, 0xff, 0x7f];
        assert_eq!(decode_s16le(&bytes), vec![1, -1, i16::MIN, i16::MAX]);
    }

    #[test]
    fn test_decode_ignores_odd_trailing_byte() {
        assert_eq!(decode_s16le(&[0x10, 0x00, 0x42]), vec![16]);
        assert!(decode_s16le(&[0x42]).is_empty());
    }

    #[test]
    fn test_chunks_are_fixed_size_until_eof() {
        let data: Vec<u8> = (0..10u8).collect();
        let mut chunks = PcmChunks::with_chunk_bytes(Cursor::new(data), 4);

        assert_eq!(chunks.next_chunk().unwrap(), Some(vec![0, 1, 2, 3]));
        assert_eq!(chunks.next_chunk().unwrap(), Some(vec![4, 5, 6, 7]));
        assert_eq!(chunks.next_chunk().unwrap(), Some(vec![8, 9]));
        assert_eq!(chunks.next_chunk().unwrap(), None);
    }

    #[test]
    fn test_short_reads_are_coalesced() {
        let reader = Trickle {
            data: (0..12u8).collect(),
            pos: 0,
            step: 3,
        };
        let mut chunks = PcmChunks::with_chunk_bytes(reader, 8);

        assert_eq!(chunks.next_chunk().unwrap().map(|c| c.len()), Some(8));
        assert_eq!(chunks.next_chunk().unwrap(), Some(vec![8, 9, 10, 11]));
        assert_eq!(chunks.next_chunk().unwrap(), None);
    }

    #[test]
    fn test_odd_byte_at_eof_is_dropped() {
        let mut chunks = PcmChunks::with_chunk_bytes(Cursor::new(vec![1, 2, 3]), 8);
        assert_eq!(chunks.next_chunk().unwrap(), Some(vec![1, 2]));
        assert_eq!(chunks.next_chunk().unwrap(), None);

        let mut lone = PcmChunks::new(Cursor::new(vec![9]));
        assert_eq!(lone.next_chunk().unwrap(), None);
    }

    #[test]
    fn test_chunk_size_rounded_to_whole_samples() {
        let mut chunks = PcmChunks::with_chunk_bytes(Cursor::new(vec![0u8; 10]), 5);
        assert_eq!(chunks.next_chunk().unwrap().map(|c| c.len()), Some(4));
    }
}
