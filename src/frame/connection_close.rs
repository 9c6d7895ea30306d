use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

use crate::buffer::Buf;
use crate::util::{varint, varint_len, write_varint};
use crate::Error;

pub(super) const CONNECTION_CLOSE_FRAME_TYPE: u8 = 0x02;

/// Error code sent when the handshake fails.
pub const HANDSHAKE_FAILED: u16 = 28;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCloseFrame {
    pub error_code: u16,
    pub reason_phrase: String,
}

impl ConnectionCloseFrame {
    pub fn new(error_code: u16, reason_phrase: impl Into<String>) -> Self {
        ConnectionCloseFrame {
            error_code,
            reason_phrase: reason_phrase.into(),
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ConnectionCloseFrame> {
        let (input, _frame_type) = be_u8(input)?;
        let (input, error_code) = be_u16(input)?;
        let (input, reason_len) = varint(input)?;
        let (input, reason) = take(reason_len as usize)(input)?;

        Ok((
            input,
            ConnectionCloseFrame {
                error_code,
                reason_phrase: String::from_utf8_lossy(reason).into_owned(),
            },
        ))
    }

    pub fn serialize(&self, output: &mut Buf) -> Result<(), Error> {
        let reason = self.reason_phrase.as_bytes();
        varint_len(reason.len() as u64)?;

        output.push(CONNECTION_CLOSE_FRAME_TYPE);
        output.extend_from_slice(&self.error_code.to_be_bytes());
        write_varint(reason.len() as u64, output)?;
        output.extend_from_slice(reason);
        Ok(())
    }

    pub fn encoded_len(&self) -> Result<usize, Error> {
        let reason_len = self.reason_phrase.len();
        Ok(1 + 2 + varint_len(reason_len as u64)? + reason_len)
    }
}
