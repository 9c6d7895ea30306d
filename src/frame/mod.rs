//! The frames needed before a session exists.
//!
//! Only PADDING, PING, CONNECTION_CLOSE and STREAM are understood. Anything
//! else is an [`Error::UnknownFrameType`].

mod connection_close;
mod stream;

pub use connection_close::{ConnectionCloseFrame, HANDSHAKE_FAILED};
pub use stream::StreamFrame;

use nom::number::complete::be_u8;

use crate::buffer::Buf;
use crate::util::NomError;
use crate::Error;

use connection_close::CONNECTION_CLOSE_FRAME_TYPE;
use stream::{STREAM_FRAME_MASK, STREAM_FRAME_TYPE};

const PADDING_FRAME_TYPE: u8 = 0x00;
const PING_FRAME_TYPE: u8 = 0x07;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Stream(StreamFrame),
    ConnectionClose(ConnectionCloseFrame),
    Ping,
}

impl Frame {
    pub fn serialize(&self, output: &mut Buf) -> Result<(), Error> {
        match self {
            Frame::Stream(f) => f.serialize(output),
            Frame::ConnectionClose(f) => f.serialize(output),
            Frame::Ping => {
                output.push(PING_FRAME_TYPE);
                Ok(())
            }
        }
    }

    pub fn encoded_len(&self) -> Result<usize, Error> {
        match self {
            Frame::Stream(f) => f.encoded_len(),
            Frame::ConnectionClose(f) => f.encoded_len(),
            Frame::Ping => Ok(1),
        }
    }
}

/// Parse the next frame, skipping any padding in front of it.
///
/// Returns `None` when only padding is left.
pub fn parse_next_frame(input: &[u8]) -> Result<(&[u8], Option<Frame>), Error> {
    let start = input
        .iter()
        .position(|b| *b != PADDING_FRAME_TYPE)
        .unwrap_or(input.len());
    let input = &input[start..];

    if input.is_empty() {
        return Ok((input, None));
    }

    let (_, frame_type) = be_u8::<_, NomError>(input)?;

    let (rest, frame) = match frame_type {
        t if t & STREAM_FRAME_MASK == STREAM_FRAME_TYPE => {
            let (rest, f) = StreamFrame::parse(input)?;
            (rest, Frame::Stream(f))
        }
        CONNECTION_CLOSE_FRAME_TYPE => {
            let (rest, f) = ConnectionCloseFrame::parse(input)?;
            (rest, Frame::ConnectionClose(f))
        }
        PING_FRAME_TYPE => (&input[1..], Frame::Ping),
        t => return Err(Error::UnknownFrameType(t)),
    };

    trace!("Parsed frame {:?}", frame);

    Ok((rest, Some(frame)))
}
