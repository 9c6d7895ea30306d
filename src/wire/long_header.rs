//! The long header used by handshake packets.
//!
//! ```text
//! 0x80|type(1) version(4) dcil|scil(1) dest(0|4..18) src(0|4..18)
//! payload length(varint) packet number(4)
//! ```
//!
//! A version of 0 marks a version negotiation packet. The connection IDs
//! follow as usual and the rest of the packet is the version list.

use nom::number::complete::{be_u32, be_u8};

use super::{version_negotiation, Header, HeaderForm, LONG_HEADER_BIT};
use crate::buffer::Buf;
use crate::types::{
    ConnectionId, PacketNumberLen, PacketType, Perspective, VersionNumber, MAX_CONNECTION_ID_LEN,
    MIN_CONNECTION_ID_LEN,
};
use crate::util::{varint, varint_len, write_varint, NomError};
use crate::Error;

const PACKET_NUMBER_LEN: usize = 4;

/// Decode one nibble of the connection ID length byte.
fn decode_connection_id_len(nibble: u8) -> usize {
    if nibble == 0 {
        0
    } else {
        nibble as usize + 3
    }
}

fn encode_connection_id_len(len: usize) -> Result<u8, Error> {
    match len {
        0 => Ok(0),
        MIN_CONNECTION_ID_LEN..=MAX_CONNECTION_ID_LEN => Ok((len - 3) as u8),
        _ => Err(Error::InvalidConnectionIdLength(len)),
    }
}

/// The byte holding both connection ID lengths, destination in the high nibble.
pub(super) fn connection_id_len_byte(dest: &ConnectionId, src: &ConnectionId) -> Result<u8, Error> {
    let dcil = encode_connection_id_len(dest.len())?;
    let scil = encode_connection_id_len(src.len())?;
    Ok(dcil << 4 | scil)
}

fn parse_connection_ids(input: &[u8]) -> Result<(&[u8], ConnectionId, ConnectionId), Error> {
    let (input, lens) = be_u8::<_, NomError>(input)?;
    let (input, dest) = ConnectionId::parse(input, decode_connection_id_len(lens >> 4))?;
    let (input, src) = ConnectionId::parse(input, decode_connection_id_len(lens & 0x0f))?;
    Ok((input, dest, src))
}

pub(super) fn parse(input: &[u8], sent_by: Perspective) -> Result<(&[u8], Header), Error> {
    let (input, first) = be_u8::<_, NomError>(input)?;
    let (input, version) = be_u32::<_, NomError>(input)?;

    if version == 0 {
        if sent_by == Perspective::Client {
            return Err(Error::InvalidVersionNegotiationPacket("sent by the client"));
        }
        let (input, dest, src) = parse_connection_ids(input)?;
        let (rest, versions) = version_negotiation::parse_version_list(input)?;
        let header = Header {
            form: HeaderForm::Long,
            is_version_negotiation: true,
            supported_versions: versions,
            dest_connection_id: dest,
            src_connection_id: src,
            ..Default::default()
        };
        return Ok((rest, header));
    }

    let packet_type = match PacketType::from_u8(first & !LONG_HEADER_BIT) {
        PacketType::Unknown(v) => return Err(Error::InvalidPacketType(v)),
        t => t,
    };

    let (input, dest, src) = parse_connection_ids(input)?;
    let (input, payload_len) = varint(input)?;
    let (input, packet_number) = be_u32::<_, NomError>(input)?;

    let header = Header {
        form: HeaderForm::Long,
        packet_type: Some(packet_type),
        version: Some(VersionNumber(version)),
        dest_connection_id: dest,
        src_connection_id: src,
        packet_number: packet_number as u64,
        packet_number_len: Some(PacketNumberLen::Len4),
        payload_len,
        ..Default::default()
    };

    Ok((input, header))
}

/// Checks shared by [`write`] and [`encoded_len`]. Returns the packet type,
/// version and connection ID length byte to write.
fn validate(header: &Header, for_len: bool) -> Result<(PacketType, VersionNumber, u8), Error> {
    if header.is_version_negotiation {
        return Err(if for_len {
            Error::LengthOfVersionNegotiation
        } else {
            Error::WriteVersionNegotiation
        });
    }
    // Every long header carries a version.
    if header.reset_flag {
        return Err(Error::ResetAndVersionFlagSet);
    }

    let packet_type = match header.packet_type {
        None => return Err(Error::PacketTypeNotSet),
        Some(PacketType::Unknown(v)) => return Err(Error::InvalidPacketType(v)),
        Some(t) => t,
    };

    let version = match header.version {
        None | Some(VersionNumber(0)) => return Err(Error::VersionNotSet),
        Some(v) => v,
    };

    let lens = connection_id_len_byte(&header.dest_connection_id, &header.src_connection_id)?;

    match header.packet_number_len {
        None => return Err(Error::PacketNumberLenNotSet),
        Some(PacketNumberLen::Len4) => {}
        Some(PacketNumberLen::Len6) => return Err(Error::InvalidPacketNumberLen6),
        Some(len) => return Err(Error::LongHeaderPacketNumberLen(len)),
    }

    varint_len(header.payload_len)?;

    Ok((packet_type, version, lens))
}

pub(super) fn write(header: &Header, out: &mut Buf, sent_by: Perspective) -> Result<(), Error> {
    let (packet_type, version, lens) = validate(header, false)?;

    if !packet_type.allowed_from(sent_by) {
        return Err(Error::UnexpectedPacketType(packet_type, sent_by));
    }

    out.push(LONG_HEADER_BIT | packet_type.as_u8());
    out.extend_from_slice(&version.as_u32().to_be_bytes());
    out.push(lens);
    out.extend_from_slice(&header.dest_connection_id);
    out.extend_from_slice(&header.src_connection_id);
    write_varint(header.payload_len, out)?;
    out.extend_from_slice(&(header.packet_number as u32).to_be_bytes());

    Ok(())
}

pub(super) fn encoded_len(header: &Header) -> Result<usize, Error> {
    validate(header, true)?;

    Ok(1 + 4
        + 1
        + header.dest_connection_id.len()
        + header.src_connection_id.len()
        + varint_len(header.payload_len)?
        + PACKET_NUMBER_LEN)
}
