use bytes::BytesMut;
use log::trace;
use std::io::{self, ErrorKind};
use tokio::{
    codec::{Decoder, Encoder, Framed},
    net::TcpStream,
};

use crate::{
    error::{Error, Violation},
    frame::{self, Frame, FrameKind, DEFAULT_MAX_PAYLOAD},
};

/// A TCP connection speaking the frame protocol.
pub type Connection = Framed<TcpStream, FrameCodec>;

/// An implementation of a (de)serializer of fixed-size frames.
///
/// This mostly just wraps `Frame::read_from` and `Frame::write_to`. The
/// decoder holds back until a whole frame's worth of bytes is buffered, so
/// short reads off the socket are accumulated transparently.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct FrameCodec {
    capacity: usize,
}

impl FrameCodec {
    /// Creates a codec for frames with the given payload capacity.
    ///
    /// # Panics
    ///
    /// Panics if the capacity is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);

        FrameCodec { capacity }
    }

    /// The payload capacity of a single frame.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of bytes every frame occupies on the wire.
    pub fn frame_size(&self) -> usize {
        frame::frame_size(self.capacity)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        FrameCodec::new(DEFAULT_MAX_PAYLOAD)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<Self::Item>, Self::Error> {
        let size = self.frame_size();

        if src.len() < size {
            // Make room for the rest of the frame in one go
            src.reserve(size - src.len());
            return Ok(None);
        }

        let block = src.split_to(size).freeze();
        let frame = Frame::read_from(block, self.capacity)?;

        trace!("decoded {:?} frame with {} bytes", frame.kind(), frame.len());
        Ok(Some(frame))
    }

    fn decode_eof(
        &mut self,
        buf: &mut BytesMut,
    ) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None if buf.is_empty() => Ok(None),
            None => {
                let msg = format!(
                    "stream ended {} bytes into a {} byte frame",
                    buf.len(),
                    self.frame_size(),
                );

                Err(Error::ConnectionLost(io::Error::new(ErrorKind::UnexpectedEof, msg)))
            }
        }
    }
}

impl Encoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn encode(
        &mut self,
        item: Frame,
        dst: &mut BytesMut,
    ) -> Result<(), Self::Error> {
        if item.kind() == FrameKind::FileData && item.is_empty() {
            return Err(Violation::EmptyData.into());
        }

        item.write_to(dst, self.capacity)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ControlToken;

    const CAP: usize = 16;

    fn encoded(frames: &[Frame]) -> BytesMut {
        let mut codec = FrameCodec::new(CAP);
        let mut buf = BytesMut::new();
        for frame in frames {
            codec.encode(frame.clone(), &mut buf).unwrap();
        }
        buf
    }

    #[test]
    fn accumulates_partial_reads() {
        let wire = encoded(&[
            Frame::control(ControlToken::Start),
            Frame::file_data(vec![3; 5].into()),
        ]);
        let mut codec = FrameCodec::new(CAP);
        let mut buf = BytesMut::new();
        let mut frames = Vec::new();

        // Feed the wire bytes in awkward pieces
        for piece in wire.chunks(7) {
            buf.extend_from_slice(piece);
            while let Some(frame) = codec.decode(&mut buf).unwrap() {
                frames.push(frame);
            }
        }

        assert_eq!(
            frames,
            vec![
                Frame::control(ControlToken::Start),
                Frame::file_data(vec![3; 5].into()),
            ],
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn incomplete_frame_waits() {
        let wire = encoded(&[Frame::control(ControlToken::End)]);
        let mut buf = BytesMut::from(&wire[..wire.len() - 1]);

        assert!(FrameCodec::new(CAP).decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), wire.len() - 1);
    }

    #[test]
    fn eof_mid_frame_is_connection_lost() {
        let wire = encoded(&[Frame::file_data(vec![1; CAP].into())]);
        let mut buf = BytesMut::from(&wire[..10]);

        let err = FrameCodec::new(CAP).decode_eof(&mut buf).unwrap_err();
        assert!(err.is_connection_lost());
    }

    #[test]
    fn clean_eof() {
        let mut buf = BytesMut::new();
        assert!(FrameCodec::new(CAP).decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn unknown_kind_is_malformed() {
        let mut wire = encoded(&[Frame::control(ControlToken::Exit)]);
        wire[3] = 9;

        let err = FrameCodec::new(CAP).decode(&mut wire).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn refuses_empty_file_data() {
        let mut buf = BytesMut::new();
        let err = FrameCodec::new(CAP)
            .encode(Frame::file_data(Default::default()), &mut buf)
            .unwrap_err();

        assert!(err.is_protocol_violation());
        assert!(buf.is_empty());
    }
}
