use nom::bytes::complete::take;
use nom::number::complete::be_u8;
use nom::IResult;

use crate::buffer::Buf;
use crate::util::{varint, varint_len, write_varint};
use crate::Error;

pub(super) const STREAM_FRAME_TYPE: u8 = 0x10;
pub(super) const STREAM_FRAME_MASK: u8 = 0xf8;

const OFF_BIT: u8 = 0x04;
const LEN_BIT: u8 = 0x02;
const FIN_BIT: u8 = 0x01;

/// Data on a stream.
///
/// Without `data_len_present` the data runs to the end of the packet, so
/// such a frame must be the last one written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    pub stream_id: u64,
    pub offset: u64,
    pub fin: bool,
    pub data_len_present: bool,
    pub data: Vec<u8>,
}

impl StreamFrame {
    pub fn new(stream_id: u64, data: Vec<u8>) -> Self {
        StreamFrame {
            stream_id,
            offset: 0,
            fin: false,
            data_len_present: true,
            data,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], StreamFrame> {
        let (input, frame_type) = be_u8(input)?;
        let (input, stream_id) = varint(input)?;

        let (input, offset) = if frame_type & OFF_BIT > 0 {
            varint(input)?
        } else {
            (input, 0)
        };

        let (input, data) = if frame_type & LEN_BIT > 0 {
            let (input, len) = varint(input)?;
            take(len as usize)(input)?
        } else {
            take(input.len())(input)?
        };

        Ok((
            input,
            StreamFrame {
                stream_id,
                offset,
                fin: frame_type & FIN_BIT > 0,
                data_len_present: frame_type & LEN_BIT > 0,
                data: data.to_vec(),
            },
        ))
    }

    fn frame_type(&self) -> u8 {
        let mut t = STREAM_FRAME_TYPE;
        if self.offset != 0 {
            t |= OFF_BIT;
        }
        if self.data_len_present {
            t |= LEN_BIT;
        }
        if self.fin {
            t |= FIN_BIT;
        }
        t
    }

    pub fn serialize(&self, output: &mut Buf) -> Result<(), Error> {
        // Fail before writing anything.
        self.encoded_len()?;

        output.push(self.frame_type());
        write_varint(self.stream_id, output)?;
        if self.offset != 0 {
            write_varint(self.offset, output)?;
        }
        if self.data_len_present {
            write_varint(self.data.len() as u64, output)?;
        }
        output.extend_from_slice(&self.data);
        Ok(())
    }

    pub fn encoded_len(&self) -> Result<usize, Error> {
        let mut len = 1 + varint_len(self.stream_id)?;
        if self.offset != 0 {
            len += varint_len(self.offset)?;
        }
        if self.data_len_present {
            len += varint_len(self.data.len() as u64)?;
        }
        Ok(len + self.data.len())
    }
}
