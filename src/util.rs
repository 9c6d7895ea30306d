use std::ops::RangeFrom;

use nom::error::{make_error, ErrorKind, ParseError};
use nom::number::complete::be_u8;
use nom::{Err, IResult, InputIter, InputLength, Slice};

use crate::buffer::Buf;
use crate::Error;

/// The nom error type of every byte-slice parser in the crate.
pub(crate) type NomError<'a> = nom::error::Error<&'a [u8]>;

/// Largest value a variable-length integer can carry (62 bits).
pub const MAX_VARINT: u64 = (1 << 62) - 1;

/// Read a big-endian unsigned integer of `bound` bytes (at most 8).
pub fn be_uint_n<I, E: ParseError<I>>(bound: usize) -> impl Fn(I) -> IResult<I, u64, E>
where
    I: Slice<RangeFrom<usize>> + InputIter<Item = u8> + InputLength,
{
    move |input: I| {
        if input.input_len() < bound {
            Err(Err::Error(make_error(input, ErrorKind::Eof)))
        } else {
            let mut res = 0u64;

            for byte in input.iter_elements().take(bound) {
                res = (res << 8) + byte as u64;
            }

            Ok((input.slice(bound..), res))
        }
    }
}

/// Read a QUIC variable-length integer.
///
/// The two high bits of the first byte select a 1, 2, 4 or 8 byte encoding.
pub fn varint(input: &[u8]) -> IResult<&[u8], u64> {
    let (_, first) = be_u8(input)?;
    let len = 1usize << (first >> 6);
    let (rest, value) = be_uint_n::<_, NomError>(len)(input)?;
    let mask = (1u64 << (8 * len - 2)) - 1;
    Ok((rest, value & mask))
}

/// Number of bytes [`write_varint`] uses for `value`.
pub fn varint_len(value: u64) -> Result<usize, Error> {
    match value {
        0..=0x3f => Ok(1),
        0x40..=0x3fff => Ok(2),
        0x4000..=0x3fff_ffff => Ok(4),
        0x4000_0000..=MAX_VARINT => Ok(8),
        _ => Err(Error::VarIntTooLarge(value)),
    }
}

/// Append `value` as a variable-length integer using the shortest encoding.
pub fn write_varint(value: u64, out: &mut Buf) -> Result<(), Error> {
    match varint_len(value)? {
        1 => out.push(value as u8),
        2 => out.extend_from_slice(&(value as u16 | 0x4000).to_be_bytes()),
        4 => out.extend_from_slice(&(value as u32 | 0x8000_0000).to_be_bytes()),
        _ => out.extend_from_slice(&(value | 0xc000_0000_0000_0000).to_be_bytes()),
    }
    Ok(())
}
