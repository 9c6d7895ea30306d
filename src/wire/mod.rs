//! Packet header codec.
//!
//! Two header forms share one [`Header`] value:
//!
//! * the long header, used by handshake packets, tagged by bit 0x80 of the
//!   first byte.
//! * the legacy public header with its flag byte, fixed 8 byte connection ID,
//!   optional version, optional diversification nonce and 1/2/4 byte packet
//!   number.
//!
//! Version negotiation packets exist in both forms. They are parsed into a
//! `Header` with `is_version_negotiation` set and no version, and can only be
//! produced through the compose functions.

mod long_header;
mod public_header;
mod version_negotiation;

use std::fmt;

use nom::number::complete::be_u8;

pub use version_negotiation::{compose_long_version_negotiation, compose_version_negotiation};

use crate::buffer::Buf;
use crate::types::{
    ConnectionId, DiversificationNonce, PacketNumber, PacketNumberLen, PacketType, Perspective,
    VersionNumber,
};
use crate::util::NomError;
use crate::Error;

/// Bit 0x80 of the first byte selects the long header.
pub(crate) const LONG_HEADER_BIT: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderForm {
    Long,
    Public,
}

/// A parsed packet header.
///
/// Fields that only exist in one form are left at their defaults in the
/// other. `raw` holds the encoded header bytes after a parse; they are the
/// associated data when the payload is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub form: HeaderForm,

    /// Long header only.
    pub packet_type: Option<PacketType>,

    /// `None` when the header carries no version. Version negotiation
    /// packets also have `None` here and list their versions separately.
    pub version: Option<VersionNumber>,

    pub is_version_negotiation: bool,
    pub supported_versions: Vec<VersionNumber>,

    /// Public header only.
    pub reset_flag: bool,

    /// Public header only. Legal when the server sent the packet.
    pub omit_connection_id: bool,

    pub dest_connection_id: ConnectionId,
    pub src_connection_id: ConnectionId,

    pub packet_number: PacketNumber,

    /// Must be set before writing; there is no default width.
    pub packet_number_len: Option<PacketNumberLen>,

    /// Long header only. Length of the protected payload that follows.
    pub payload_len: u64,

    /// Public header only, server to client.
    pub diversification_nonce: Option<DiversificationNonce>,

    pub raw: Buf,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            form: HeaderForm::Public,
            packet_type: None,
            version: None,
            is_version_negotiation: false,
            supported_versions: Vec::new(),
            reset_flag: false,
            omit_connection_id: false,
            dest_connection_id: ConnectionId::empty(),
            src_connection_id: ConnectionId::empty(),
            packet_number: 0,
            packet_number_len: None,
            payload_len: 0,
            diversification_nonce: None,
            raw: Buf::new(),
        }
    }
}

impl Header {
    /// A long header of the given type. Long header packet numbers are always 4 bytes.
    pub fn long(
        packet_type: PacketType,
        version: VersionNumber,
        dest_connection_id: ConnectionId,
        src_connection_id: ConnectionId,
        packet_number: PacketNumber,
    ) -> Header {
        Header {
            form: HeaderForm::Long,
            packet_type: Some(packet_type),
            version: Some(version),
            dest_connection_id,
            src_connection_id,
            packet_number,
            packet_number_len: Some(PacketNumberLen::Len4),
            ..Default::default()
        }
    }

    /// A public header for a regular packet. The single connection ID is used
    /// as both source and destination.
    pub fn public(
        connection_id: ConnectionId,
        packet_number: PacketNumber,
        packet_number_len: PacketNumberLen,
    ) -> Header {
        Header {
            form: HeaderForm::Public,
            dest_connection_id: connection_id.clone(),
            src_connection_id: connection_id,
            packet_number,
            packet_number_len: Some(packet_number_len),
            ..Default::default()
        }
    }

    /// A public header for a public reset packet.
    pub fn public_reset(connection_id: ConnectionId) -> Header {
        Header {
            form: HeaderForm::Public,
            reset_flag: true,
            dest_connection_id: connection_id.clone(),
            src_connection_id: connection_id,
            ..Default::default()
        }
    }

    /// Parse the header of a packet sent by `sent_by`.
    ///
    /// Returns the bytes following the header. They are the packet payload.
    pub fn parse(input: &[u8], sent_by: Perspective) -> Result<(&[u8], Header), Error> {
        let (_, first) = be_u8::<_, NomError>(input)?;

        let (rest, mut header) = if first & LONG_HEADER_BIT > 0 {
            long_header::parse(input, sent_by)?
        } else {
            public_header::parse(input, sent_by)?
        };

        let consumed = input.len() - rest.len();
        header.raw = Buf::from_slice(&input[..consumed]);

        trace!("Parsed {}", header);

        Ok((rest, header))
    }

    /// Serialize the header as sent by `sent_by`.
    ///
    /// All validation happens before the first byte is appended, so `out` is
    /// left untouched on error.
    pub fn write(&self, out: &mut Buf, sent_by: Perspective) -> Result<(), Error> {
        match self.form {
            HeaderForm::Long => long_header::write(self, out, sent_by),
            HeaderForm::Public => public_header::write(self, out, sent_by),
        }
    }

    /// The exact number of bytes [`Header::write`] would produce.
    pub fn encoded_len(&self, sent_by: Perspective) -> Result<usize, Error> {
        match self.form {
            HeaderForm::Long => long_header::encoded_len(self),
            HeaderForm::Public => public_header::encoded_len(self, sent_by),
        }
    }

    pub fn is_long_header(&self) -> bool {
        self.form == HeaderForm::Long
    }

    /// Whether the public header version flag is set.
    pub fn has_version_flag(&self) -> bool {
        self.version.is_some() || self.is_version_negotiation
    }

    /// Emit the header at debug level.
    pub fn log(&self) {
        debug!("{}", self);
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_version_negotiation {
            return write!(
                f,
                "VersionNegotiationPacket{{DestConnectionID: {}, SrcConnectionID: {}, SupportedVersions: {:?}}}",
                self.dest_connection_id, self.src_connection_id, self.supported_versions
            );
        }

        let version = DisplayVersion(self.version);

        match self.form {
            HeaderForm::Long => {
                let packet_type = self.packet_type.unwrap_or(PacketType::Unknown(0));
                write!(
                    f,
                    "Long Header{{Type: {}, DestConnectionID: {}, SrcConnectionID: {}, PacketNumber: {:#x}, PayloadLen: {}, Version: {}}}",
                    packet_type,
                    self.dest_connection_id,
                    self.src_connection_id,
                    self.packet_number,
                    self.payload_len,
                    version
                )
            }
            HeaderForm::Public => {
                let connection_id = if self.omit_connection_id {
                    ConnectionId::empty()
                } else {
                    self.dest_connection_id.clone()
                };
                let pn_len = self.packet_number_len.map(|l| l.bytes()).unwrap_or(0);
                write!(
                    f,
                    "Public Header{{ConnectionID: {}, PacketNumber: {:#x}, PacketNumberLen: {}, Version: {}",
                    connection_id, self.packet_number, pn_len, version
                )?;
                if let Some(nonce) = &self.diversification_nonce {
                    write!(f, ", DiversificationNonce: {:?}", nonce)?;
                }
                write!(f, "}}")
            }
        }
    }
}

struct DisplayVersion(Option<VersionNumber>);

impl fmt::Display for DisplayVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "(unset)"),
        }
    }
}
