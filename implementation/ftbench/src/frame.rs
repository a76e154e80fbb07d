//! This module implements the fixed-size frame format.
//!
//! Every frame occupies `capacity + BINARY_OVERHEAD` bytes on the wire, no
//! matter how many of the payload bytes are meaningful:
//!
//! ```text
//! +----------+------------------------------+-----------+
//! | kind u32 | payload (capacity bytes)     | len u64   |
//! +----------+------------------------------+-----------+
//! ```
//!
//! All integers are in network byte order. Payload bytes beyond `len` are
//! written as zeroes but never read back.

use crate::error::{Malformed, Violation};
use byteorder::{ByteOrder, NetworkEndian};
use bytes::{BufMut, Bytes, BytesMut};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    mem,
};

/// The default payload capacity of a single frame (1 MiB).
pub const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024;

const KIND_SIZE: usize = mem::size_of::<u32>();
const LENGTH_SIZE: usize = mem::size_of::<u64>();
const ZEROS: [u8; 4096] = [0; 4096];

/// The overhead in bytes of serializing a single frame, besides the payload.
pub const BINARY_OVERHEAD: usize = KIND_SIZE + LENGTH_SIZE;

/// Computes the size of a frame on the wire for the given payload capacity.
pub fn frame_size(capacity: usize) -> usize {
    capacity + BINARY_OVERHEAD
}

/// What the payload of a frame carries.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum FrameKind {
    /// A chunk of file content.
    FileData,

    /// A control token.
    Control,
}

/// The closed vocabulary of control tokens.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum ControlToken {
    /// A file transfer is beginning.
    Start,

    /// The current file transfer is complete.
    End,

    /// Another file will follow on the same connection.
    SendAgain,

    /// The session is over, no more frames will be sent.
    Exit,
}

/// A single unit of transmission.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Frame {
    kind: FrameKind,
    payload: Bytes,
}

impl FrameKind {
    fn from_u32(val: u32) -> Result<Self, Malformed> {
        match val {
            0 => Ok(FrameKind::FileData),
            1 => Ok(FrameKind::Control),
            other => Err(Malformed::UnknownKind(other)),
        }
    }

    fn to_u32(self) -> u32 {
        match self {
            FrameKind::FileData => 0,
            FrameKind::Control => 1,
        }
    }
}

impl ControlToken {
    /// The token as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            ControlToken::Start => "START",
            ControlToken::End => "END",
            ControlToken::SendAgain => "SEND_AGAIN",
            ControlToken::Exit => "EXIT",
        }
    }

    /// Parses a token from the meaningful bytes of a control payload.
    ///
    /// Trailing NUL bytes are ignored, so C-string style tokens are accepted.
    pub fn parse(raw: &[u8]) -> Result<Self, Violation> {
        let trimmed = match raw.iter().rposition(|&b| b != 0) {
            Some(last) => &raw[..=last],
            None => &raw[..0],
        };

        match trimmed {
            b"START" => Ok(ControlToken::Start),
            b"END" => Ok(ControlToken::End),
            b"SEND_AGAIN" => Ok(ControlToken::SendAgain),
            b"EXIT" => Ok(ControlToken::Exit),
            other => Err(Violation::UnknownToken(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }
}

impl Display for ControlToken {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        self.as_str().fmt(fmt)
    }
}

impl Frame {
    /// Creates a frame carrying a chunk of file content.
    pub fn file_data(payload: Bytes) -> Self {
        Frame {
            kind: FrameKind::FileData,
            payload,
        }
    }

    /// Creates a control frame carrying the given token.
    pub fn control(token: ControlToken) -> Self {
        Frame {
            kind: FrameKind::Control,
            payload: Bytes::from_static(token.as_str().as_bytes()),
        }
    }

    /// Creates a control frame with arbitrary payload.
    ///
    /// Used to exercise the receiver with tokens outside of the vocabulary.
    pub fn raw_control(payload: Bytes) -> Self {
        Frame {
            kind: FrameKind::Control,
            payload,
        }
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// The meaningful bytes of the payload.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// The number of meaningful payload bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Interprets the payload as a control token.
    pub fn token(&self) -> Result<ControlToken, Violation> {
        ControlToken::parse(&self.payload)
    }

    /// Reads a frame from a block of exactly `frame_size(capacity)` bytes.
    pub fn read_from(block: Bytes, capacity: usize) -> Result<Frame, Malformed> {
        let expected = frame_size(capacity);
        if block.len() != expected {
            return Err(Malformed::BlockSize {
                expected,
                actual: block.len(),
            });
        }

        let kind = FrameKind::from_u32(NetworkEndian::read_u32(&block[..KIND_SIZE]))?;
        let length = NetworkEndian::read_u64(&block[KIND_SIZE + capacity..]);
        if length > capacity as u64 {
            return Err(Malformed::LengthOverflow { length, capacity });
        }

        let payload = block.slice(KIND_SIZE, KIND_SIZE + length as usize);
        Ok(Frame { kind, payload })
    }

    /// Appends the fixed-size binary form of the frame to the given buffer.
    pub fn write_to(&self, dst: &mut BytesMut, capacity: usize) -> Result<(), Malformed> {
        if self.payload.len() > capacity {
            return Err(Malformed::LengthOverflow {
                length: self.payload.len() as u64,
                capacity,
            });
        }

        // BufMut on BytesMut doesn't grow on its own
        dst.reserve(frame_size(capacity));

        dst.put_u32_be(self.kind.to_u32());
        dst.put_slice(&self.payload);

        let mut padding = capacity - self.payload.len();
        while padding > 0 {
            let n = padding.min(ZEROS.len());
            dst.put_slice(&ZEROS[..n]);
            padding -= n;
        }

        dst.put_u64_be(self.payload.len() as u64);
        Ok(())
    }

    /// Encodes the frame into a new fixed-size block.
    pub fn to_block(&self, capacity: usize) -> Result<Bytes, Malformed> {
        let mut buf = BytesMut::with_capacity(frame_size(capacity));
        self.write_to(&mut buf, capacity)?;
        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: usize = 64;

    #[test]
    fn block_has_fixed_size() {
        let small = Frame::control(ControlToken::End).to_block(CAP).unwrap();
        let full = Frame::file_data(vec![7; CAP].into()).to_block(CAP).unwrap();

        assert_eq!(small.len(), frame_size(CAP));
        assert_eq!(full.len(), frame_size(CAP));
    }

    #[test]
    fn round_trip() {
        let frame = Frame::file_data(Bytes::from(&b"hello world"[..]));
        let block = frame.to_block(CAP).unwrap();
        let decoded = Frame::read_from(block, CAP).unwrap();

        assert_eq!(decoded.kind(), FrameKind::FileData);
        assert_eq!(decoded.len(), 11);
        assert_eq!(&decoded.payload()[..], b"hello world");
    }

    #[test]
    fn round_trip_control() {
        let block = Frame::control(ControlToken::SendAgain).to_block(CAP).unwrap();
        let decoded = Frame::read_from(block, CAP).unwrap();

        assert_eq!(decoded.kind(), FrameKind::Control);
        assert_eq!(decoded.token(), Ok(ControlToken::SendAgain));
    }

    #[test]
    fn wire_layout() {
        let block = Frame::control(ControlToken::Exit).to_block(CAP).unwrap();

        assert_eq!(&block[..4], &[0, 0, 0, 1]);
        assert_eq!(&block[4..8], b"EXIT");
        assert!(block[8..4 + CAP].iter().all(|&b| b == 0));
        assert_eq!(NetworkEndian::read_u64(&block[4 + CAP..]), 4);
    }

    #[test]
    fn wrong_block_size() {
        let block = Frame::control(ControlToken::Start).to_block(CAP).unwrap();

        assert_eq!(
            Frame::read_from(block.slice_to(frame_size(CAP) - 1), CAP),
            Err(Malformed::BlockSize {
                expected: frame_size(CAP),
                actual: frame_size(CAP) - 1,
            }),
        );
    }

    #[test]
    fn unknown_kind() {
        let start = Frame::control(ControlToken::Start).to_block(CAP).unwrap();
        let mut block = BytesMut::from(&start[..]);
        NetworkEndian::write_u32(&mut block[..4], 2);

        assert_eq!(
            Frame::read_from(block.freeze(), CAP),
            Err(Malformed::UnknownKind(2)),
        );
    }

    #[test]
    fn length_overflow() {
        let start = Frame::control(ControlToken::Start).to_block(CAP).unwrap();
        let mut block = BytesMut::from(&start[..]);
        NetworkEndian::write_u64(&mut block[4 + CAP..], CAP as u64 + 1);

        assert_eq!(
            Frame::read_from(block.freeze(), CAP),
            Err(Malformed::LengthOverflow {
                length: CAP as u64 + 1,
                capacity: CAP,
            }),
        );
    }

    #[test]
    fn oversized_payload_is_not_encoded() {
        let frame = Frame::file_data(vec![1; CAP + 1].into());
        assert!(frame.to_block(CAP).is_err());
    }

    #[test]
    fn token_parsing() {
        assert_eq!(ControlToken::parse(b"START"), Ok(ControlToken::Start));
        assert_eq!(ControlToken::parse(b"EXIT\0"), Ok(ControlToken::Exit));
        assert_eq!(
            ControlToken::parse(b"STOP"),
            Err(Violation::UnknownToken("STOP".to_owned())),
        );
        assert_eq!(
            ControlToken::parse(b""),
            Err(Violation::UnknownToken(String::new())),
        );
    }
}
