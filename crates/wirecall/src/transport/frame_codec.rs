// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Length-prefix framing for request and response payloads.
//!
//! ```text
//! +----------------+-------------------+
//! | Length (4B BE) | Payload           |
//! +----------------+-------------------+
//! ```
//!
//! The length counts payload bytes only. Stream reads may return any number
//! of bytes, so the codec accumulates input and yields a frame only once the
//! declared length has been consumed.
//!
//! # Example
//!
//! ```
//! use wirecall::transport::FrameCodec;
//!
//! let frame = FrameCodec::encode(b"ping").unwrap();
//! assert_eq!(&frame[..4], &4u32.to_be_bytes());
//!
//! let mut codec = FrameCodec::new(1024);
//! codec.feed(&frame[..3]);
//! assert_eq!(codec.decode_buffered().unwrap(), None);
//! codec.feed(&frame[3..]);
//! assert_eq!(codec.decode_buffered().unwrap(), Some(b"ping".to_vec()));
//! ```

use crate::config::{DEFAULT_MAX_FRAME_SIZE, FRAME_HEADER_SIZE, READ_CHUNK_SIZE};
use crate::error::TransportError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Incremental frame decoder.
#[derive(Debug)]
pub struct FrameCodec {
    /// Current read state
    state: ReadState,

    /// Header or body bytes of the frame being assembled
    buffer: Vec<u8>,

    /// Maximum accepted payload size
    max_size: usize,

    /// Statistics: frames decoded
    frames_decoded: u64,

    /// Statistics: payload bytes decoded
    bytes_decoded: u64,

    /// Statistics: frames rejected as too large
    frames_rejected: u64,

    /// Received bytes not yet consumed
    accumulator: Vec<u8>,

    /// Read position in accumulator
    accumulator_pos: usize,
}

#[derive(Debug, Clone, Copy)]
enum ReadState {
    ReadingLength { bytes_read: usize },
    ReadingBody { expected_len: usize, bytes_read: usize },
}

impl Default for ReadState {
    fn default() -> Self {
        ReadState::ReadingLength { bytes_read: 0 }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl FrameCodec {
    pub fn new(max_size: usize) -> Self {
        Self {
            state: ReadState::default(),
            buffer: vec![0u8; FRAME_HEADER_SIZE],
            max_size,
            frames_decoded: 0,
            bytes_decoded: 0,
            frames_rejected: 0,
            accumulator: Vec::with_capacity(READ_CHUNK_SIZE),
            accumulator_pos: 0,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn bytes_decoded(&self) -> u64 {
        self.bytes_decoded
    }

    pub fn frames_rejected(&self) -> u64 {
        self.frames_rejected
    }

    /// Drop any partial frame and buffered input.
    pub fn reset(&mut self) {
        self.state = ReadState::default();
        self.buffer.resize(FRAME_HEADER_SIZE, 0);
        self.accumulator.clear();
        self.accumulator_pos = 0;
    }

    /// Encode a payload as `[length: u32 BE][payload]`.
    ///
    /// Fails with [`TransportError::FrameTooLarge`] when the payload length
    /// does not fit the 4-byte header.
    pub fn encode(payload: &[u8]) -> Result<Vec<u8>, TransportError> {
        let header = frame_header(payload.len())?;
        let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
        frame.extend_from_slice(&header);
        frame.extend_from_slice(payload);
        Ok(frame)
    }

    /// Append received bytes.
    pub fn feed(&mut self, data: &[u8]) {
        if self.accumulator_pos > 0 && self.accumulator_pos > self.accumulator.len() / 2 {
            self.accumulator.drain(..self.accumulator_pos);
            self.accumulator_pos = 0;
        }
        self.accumulator.extend_from_slice(data);
    }

    /// Extract the next complete frame from the fed bytes.
    ///
    /// Returns `Ok(None)` when more input is needed. A declared length above
    /// the maximum is an error; the stream cannot be resynchronized after it.
    pub fn decode_buffered(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            let available = &self.accumulator[self.accumulator_pos..];

            match self.state {
                ReadState::ReadingLength { bytes_read } => {
                    let take = (FRAME_HEADER_SIZE - bytes_read).min(available.len());
                    self.buffer[bytes_read..bytes_read + take].copy_from_slice(&available[..take]);
                    self.accumulator_pos += take;

                    let total = bytes_read + take;
                    if total < FRAME_HEADER_SIZE {
                        self.state = ReadState::ReadingLength { bytes_read: total };
                        return Ok(None);
                    }

                    let len = u32::from_be_bytes([
                        self.buffer[0],
                        self.buffer[1],
                        self.buffer[2],
                        self.buffer[3],
                    ]) as usize;

                    if len > self.max_size {
                        self.frames_rejected += 1;
                        self.state = ReadState::default();
                        return Err(TransportError::FrameTooLarge {
                            len,
                            max: self.max_size,
                        });
                    }

                    if len == 0 {
                        self.frames_decoded += 1;
                        self.state = ReadState::default();
                        return Ok(Some(Vec::new()));
                    }

                    self.buffer.resize(len, 0);
                    self.state = ReadState::ReadingBody {
                        expected_len: len,
                        bytes_read: 0,
                    };
                }

                ReadState::ReadingBody {
                    expected_len,
                    bytes_read,
                } => {
                    let take = (expected_len - bytes_read).min(available.len());
                    self.buffer[bytes_read..bytes_read + take].copy_from_slice(&available[..take]);
                    self.accumulator_pos += take;

                    let total = bytes_read + take;
                    if total < expected_len {
                        self.state = ReadState::ReadingBody {
                            expected_len,
                            bytes_read: total,
                        };
                        return Ok(None);
                    }

                    let message = self.buffer[..expected_len].to_vec();
                    self.frames_decoded += 1;
                    self.bytes_decoded += expected_len as u64;

                    self.buffer.resize(FRAME_HEADER_SIZE, 0);
                    self.state = ReadState::default();

                    return Ok(Some(message));
                }
            }
        }
    }

    /// Whether a frame has been started but not completed.
    pub fn is_partial(&self) -> bool {
        match self.state {
            ReadState::ReadingLength { bytes_read } => bytes_read > 0,
            ReadState::ReadingBody { .. } => true,
        }
    }

    /// Bytes still needed to finish the current header or body.
    pub fn bytes_needed(&self) -> usize {
        match self.state {
            ReadState::ReadingLength { bytes_read } => FRAME_HEADER_SIZE - bytes_read,
            ReadState::ReadingBody {
                expected_len,
                bytes_read,
            } => expected_len - bytes_read,
        }
    }

    pub fn has_buffered_data(&self) -> bool {
        self.accumulator_pos < self.accumulator.len()
    }

    /// Error describing a stream that ended at the current position.
    fn eof_error(&self) -> TransportError {
        match self.state {
            ReadState::ReadingLength { bytes_read: 0 } => TransportError::Closed,
            ReadState::ReadingLength { bytes_read } => TransportError::IncompleteFrame {
                expected: FRAME_HEADER_SIZE,
                received: bytes_read,
            },
            ReadState::ReadingBody {
                expected_len,
                bytes_read,
            } => TransportError::IncompleteFrame {
                expected: expected_len,
                received: bytes_read,
            },
        }
    }

    // ------------------------------------------------------------------------
    // Stream helpers
    // ------------------------------------------------------------------------

    /// Read one frame, looping over partial reads.
    ///
    /// End of stream before any byte of a frame yields
    /// [`TransportError::Closed`]; inside a frame it yields
    /// [`TransportError::IncompleteFrame`].
    pub async fn read_frame<R>(&mut self, reader: &mut R) -> Result<Vec<u8>, TransportError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            if let Some(frame) = self.decode_buffered()? {
                return Ok(frame);
            }
            let n = reader
                .read(&mut chunk[..self.bytes_needed().min(READ_CHUNK_SIZE)])
                .await
                .map_err(TransportError::Read)?;
            if n == 0 {
                return Err(self.eof_error());
            }
            self.feed(&chunk[..n]);
        }
    }

    /// Write one frame and flush it.
    pub async fn write_frame<W>(&self, writer: &mut W, payload: &[u8]) -> Result<(), TransportError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        if payload.len() > self.max_size {
            return Err(TransportError::FrameTooLarge {
                len: payload.len(),
                max: self.max_size,
            });
        }
        let frame = Self::encode(payload)?;
        writer
            .write_all(&frame)
            .await
            .map_err(TransportError::Write)?;
        writer.flush().await.map_err(TransportError::Write)
    }
}

fn frame_header(len: usize) -> Result<[u8; FRAME_HEADER_SIZE], TransportError> {
    u32::try_from(len)
        .map(u32::to_be_bytes)
        .map_err(|_| TransportError::FrameTooLarge {
            len,
            max: u32::MAX as usize,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_encode_simple() {
        let frame = FrameCodec::encode(b"hello").unwrap();
        assert_eq!(frame.len(), 4 + 5);
        assert_eq!(&frame[..4], &5u32.to_be_bytes());
        assert_eq!(&frame[4..], b"hello");
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_header_rejects_length_beyond_u32() {
        assert_eq!(frame_header(7).unwrap(), 7u32.to_be_bytes());
        assert_eq!(frame_header(u32::MAX as usize).unwrap(), [0xFF; 4]);
        match frame_header(u32::MAX as usize + 1) {
            Err(TransportError::FrameTooLarge { len, max }) => {
                assert_eq!(len, 1 << 32);
                assert_eq!(max, u32::MAX as usize);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_empty_message() {
        let mut codec = FrameCodec::new(1024);
        codec.feed(&FrameCodec::encode(b"").unwrap());
        assert_eq!(codec.decode_buffered().unwrap(), Some(Vec::new()));
        assert!(!codec.is_partial());
    }

    #[test]
    fn test_decode_multiple() {
        let mut codec = FrameCodec::new(1024);
        let mut buf = FrameCodec::encode(b"first").unwrap();
        buf.extend(FrameCodec::encode(b"second").unwrap());
        codec.feed(&buf);

        assert_eq!(codec.decode_buffered().unwrap(), Some(b"first".to_vec()));
        assert_eq!(codec.decode_buffered().unwrap(), Some(b"second".to_vec()));
        assert_eq!(codec.decode_buffered().unwrap(), None);
        assert_eq!(codec.frames_decoded(), 2);
        assert_eq!(codec.bytes_decoded(), 11);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut codec = FrameCodec::new(1024);
        let frame = FrameCodec::encode(b"abcdef").unwrap();

        for (i, b) in frame.iter().enumerate() {
            codec.feed(&[*b]);
            let out = codec.decode_buffered().unwrap();
            if i + 1 < frame.len() {
                assert_eq!(out, None);
                assert!(codec.is_partial());
            } else {
                assert_eq!(out, Some(b"abcdef".to_vec()));
            }
        }
    }

    #[test]
    fn test_bytes_needed() {
        let mut codec = FrameCodec::new(1024);
        assert_eq!(codec.bytes_needed(), 4);

        let frame = FrameCodec::encode(b"hello").unwrap();
        codec.feed(&frame[..2]);
        codec.decode_buffered().unwrap();
        assert_eq!(codec.bytes_needed(), 2);

        codec.feed(&frame[2..6]);
        codec.decode_buffered().unwrap();
        assert_eq!(codec.bytes_needed(), 3);
    }

    #[test]
    fn test_too_large_rejected() {
        let mut codec = FrameCodec::new(8);
        codec.feed(&u32::MAX.to_be_bytes());
        match codec.decode_buffered() {
            Err(TransportError::FrameTooLarge { len, max }) => {
                assert_eq!(len, u32::MAX as usize);
                assert_eq!(max, 8);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(codec.frames_rejected(), 1);
    }

    #[test]
    fn test_reset_discards_partial() {
        let mut codec = FrameCodec::new(1024);
        codec.feed(&FrameCodec::encode(b"hello").unwrap()[..6]);
        codec.decode_buffered().unwrap();
        assert!(codec.is_partial());

        codec.reset();
        assert!(!codec.is_partial());
        assert!(!codec.has_buffered_data());
    }

    #[test]
    fn test_read_frame_reassembles_partial_reads() {
        let rt = runtime();
        rt.block_on(async {
            let payloads: Vec<Vec<u8>> = (0..20)
                .map(|i| (0..fastrand::usize(0..3000)).map(|j| (i + j) as u8).collect())
                .collect();

            // A small duplex buffer forces short reads on the other end.
            let (mut tx, mut rx) = tokio::io::duplex(fastrand::usize(1..64));
            let expected = payloads.clone();
            let writer = tokio::spawn(async move {
                let codec = FrameCodec::new(4096);
                for p in &payloads {
                    codec.write_frame(&mut tx, p).await.unwrap();
                }
            });

            let mut codec = FrameCodec::new(4096);
            for p in &expected {
                assert_eq!(&codec.read_frame(&mut rx).await.unwrap(), p);
            }
            writer.await.unwrap();

            assert!(matches!(
                codec.read_frame(&mut rx).await,
                Err(TransportError::Closed)
            ));
        });
    }

    #[test]
    fn test_read_frame_truncated_body() {
        let rt = runtime();
        rt.block_on(async {
            let frame = FrameCodec::encode(b"truncated").unwrap();
            let mut input: &[u8] = &frame[..7];
            let mut codec = FrameCodec::new(1024);

            match codec.read_frame(&mut input).await {
                Err(TransportError::IncompleteFrame { expected, received }) => {
                    assert_eq!(expected, 9);
                    assert_eq!(received, 3);
                }
                other => panic!("unexpected {:?}", other),
            }
        });
    }

    #[test]
    fn test_write_frame_respects_max() {
        let rt = runtime();
        rt.block_on(async {
            let codec = FrameCodec::new(4);
            let mut sink = Vec::new();
            assert!(matches!(
                codec.write_frame(&mut sink, b"too long").await,
                Err(TransportError::FrameTooLarge { len: 8, max: 4 })
            ));
            assert!(sink.is_empty());
        });
    }
}
