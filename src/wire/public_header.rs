//! The legacy public header.
//!
//! ```text
//! flags(1) [connection ID(8)] [version(4)] [diversification nonce(32)] [packet number(1|2|4)]
//! ```
//!
//! Flag bits: 0x01 version, 0x02 reset, 0x04 diversification nonce (server
//! only), 0x08 connection ID present, 0x30 packet number length.
//!
//! A public reset header ends right after the connection ID. Anything that
//! follows is the reset message body and is handed back as payload.

use nom::number::complete::{be_u32, be_u8};

use super::{Header, HeaderForm};
use crate::buffer::Buf;
use crate::types::{
    ConnectionId, DiversificationNonce, PacketNumberLen, Perspective, VersionNumber,
    DIVERSIFICATION_NONCE_LEN, PUBLIC_CONNECTION_ID_LEN,
};
use crate::util::{be_uint_n, NomError};
use crate::Error;

const FLAG_VERSION: u8 = 0x01;
const FLAG_RESET: u8 = 0x02;
const FLAG_DIVERSIFICATION_NONCE: u8 = 0x04;
const FLAG_CONNECTION_ID: u8 = 0x08;
const PACKET_NUMBER_LEN_MASK: u8 = 0x30;

/// A public header carries a packet number unless it is a reset, or a
/// version negotiation packet from the server.
fn has_packet_number(reset: bool, version_flag: bool, sent_by: Perspective) -> bool {
    if reset {
        return false;
    }
    !(version_flag && sent_by == Perspective::Server)
}

pub(super) fn parse(input: &[u8], sent_by: Perspective) -> Result<(&[u8], Header), Error> {
    let (mut input, flags) = be_u8::<_, NomError>(input)?;

    let reset_flag = flags & FLAG_RESET > 0;
    let version_flag = flags & FLAG_VERSION > 0;
    let omit_connection_id = flags & FLAG_CONNECTION_ID == 0;

    if omit_connection_id && sent_by == Perspective::Client {
        return Err(Error::ReceivedOmittedConnectionId);
    }
    if omit_connection_id && reset_flag {
        return Err(Error::ResetWithoutConnectionId);
    }

    let mut header = Header {
        form: HeaderForm::Public,
        reset_flag,
        omit_connection_id,
        ..Default::default()
    };

    let with_packet_number = has_packet_number(reset_flag, version_flag, sent_by);
    if with_packet_number {
        header.packet_number_len = Some(match flags & PACKET_NUMBER_LEN_MASK {
            0x30 => return Err(Error::InvalidPacketNumberLen6),
            0x20 => PacketNumberLen::Len4,
            0x10 => PacketNumberLen::Len2,
            _ => PacketNumberLen::Len1,
        });
    }

    if !omit_connection_id {
        let (rest, connection_id) = ConnectionId::parse(input, PUBLIC_CONNECTION_ID_LEN)?;
        if connection_id.is_zero() {
            return Err(Error::InvalidConnectionId);
        }
        header.dest_connection_id = connection_id.clone();
        header.src_connection_id = connection_id;
        input = rest;
    }

    // The nonce bit only means something in regular packets from the server.
    if sent_by == Perspective::Server
        && flags & FLAG_DIVERSIFICATION_NONCE > 0
        && !version_flag
        && !reset_flag
    {
        let (rest, nonce) = DiversificationNonce::parse(input)?;
        header.diversification_nonce = Some(nonce);
        input = rest;
    }

    if version_flag && !reset_flag {
        if sent_by == Perspective::Server {
            let (rest, versions) = super::version_negotiation::parse_version_list(input)?;
            header.is_version_negotiation = true;
            header.supported_versions = versions;
            return Ok((rest, header));
        }
        let (rest, version) = be_u32::<_, NomError>(input)?;
        header.version = Some(VersionNumber(version));
        input = rest;
    }

    if let Some(len) = header.packet_number_len {
        let (rest, packet_number) = be_uint_n::<_, NomError>(len.bytes())(input)?;
        header.packet_number = packet_number;
        input = rest;
    }

    Ok((input, header))
}

/// Checks shared by [`write`] and [`encoded_len`].
///
/// Returns whether a packet number follows.
fn validate(header: &Header, sent_by: Perspective, for_len: bool) -> Result<bool, Error> {
    let version_flag = header.has_version_flag();

    if header.reset_flag && version_flag {
        return Err(Error::ResetAndVersionFlagSet);
    }
    if header.is_version_negotiation || (version_flag && sent_by == Perspective::Server) {
        return Err(if for_len {
            Error::LengthOfVersionNegotiation
        } else {
            Error::WriteVersionNegotiation
        });
    }
    if header.reset_flag && header.omit_connection_id {
        return Err(Error::ResetWithoutConnectionId);
    }
    if header.dest_connection_id != header.src_connection_id {
        return Err(Error::ConnectionIdMismatch);
    }
    let omitted_and_empty = header.omit_connection_id && header.dest_connection_id.is_empty();
    if !omitted_and_empty && header.dest_connection_id.len() != PUBLIC_CONNECTION_ID_LEN {
        return Err(Error::WrongConnectionIdLength(
            header.dest_connection_id.len(),
        ));
    }
    if header.diversification_nonce.is_some()
        && (sent_by == Perspective::Client || header.reset_flag)
    {
        return Err(Error::DiversificationNonceNotAllowed);
    }

    let with_packet_number = has_packet_number(header.reset_flag, version_flag, sent_by);
    if with_packet_number {
        match header.packet_number_len {
            None => return Err(Error::PacketNumberLenNotSet),
            Some(PacketNumberLen::Len6) => return Err(Error::InvalidPacketNumberLen6),
            Some(_) => {}
        }
    }

    Ok(with_packet_number)
}

pub(super) fn write(header: &Header, out: &mut Buf, sent_by: Perspective) -> Result<(), Error> {
    let with_packet_number = validate(header, sent_by, false)?;

    let mut flags = 0u8;
    if header.version.is_some() {
        flags |= FLAG_VERSION;
    }
    if header.reset_flag {
        flags |= FLAG_RESET;
    }
    if !header.omit_connection_id {
        flags |= FLAG_CONNECTION_ID;
    }
    if header.diversification_nonce.is_some() {
        flags |= FLAG_DIVERSIFICATION_NONCE;
    }
    // Only announce a length if a packet number is written.
    let packet_number_len = header.packet_number_len.filter(|_| with_packet_number);
    flags |= match packet_number_len {
        Some(PacketNumberLen::Len2) => 0x10,
        Some(PacketNumberLen::Len4) => 0x20,
        _ => 0x00,
    };

    out.push(flags);
    if !header.omit_connection_id {
        out.extend_from_slice(&header.dest_connection_id);
    }
    if let Some(version) = header.version {
        out.extend_from_slice(&version.as_u32().to_be_bytes());
    }
    if let Some(nonce) = &header.diversification_nonce {
        out.extend_from_slice(nonce);
    }
    if let Some(len) = packet_number_len {
        let bytes = header.packet_number.to_be_bytes();
        out.extend_from_slice(&bytes[bytes.len() - len.bytes()..]);
    }

    Ok(())
}

pub(super) fn encoded_len(header: &Header, sent_by: Perspective) -> Result<usize, Error> {
    let with_packet_number = validate(header, sent_by, true)?;

    // flags
    let mut len = 1;
    if !header.omit_connection_id {
        len += PUBLIC_CONNECTION_ID_LEN;
    }
    if header.version.is_some() {
        len += 4;
    }
    if header.diversification_nonce.is_some() {
        len += DIVERSIFICATION_NONCE_LEN;
    }
    if with_packet_number {
        // validate() guarantees the length is set.
        len += header.packet_number_len.map(|l| l.bytes()).unwrap_or(0);
    }
    Ok(len)
}
