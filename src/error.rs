use thiserror::Error;

use crate::handshake::{Alert, HandshakeState};
use crate::types::{PacketNumberLen, PacketType, Perspective, VersionNumber};

#[derive(Debug, Error)]
pub enum Error {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("invalid connection ID")]
    InvalidConnectionId,

    #[error("received a packet with an omitted connection ID")]
    ReceivedOmittedConnectionId,

    #[error("invalid connection ID length: {0} bytes")]
    InvalidConnectionIdLength(usize),

    #[error("public header: source connection ID must be equal to destination connection ID")]
    ConnectionIdMismatch,

    #[error("public header: wrong length for connection ID: {0} (expected 8)")]
    WrongConnectionIdLength(usize),

    #[error("invalid packet number length: 6 bytes")]
    InvalidPacketNumberLen6,

    #[error("packet number length not set")]
    PacketNumberLenNotSet,

    #[error("long header packet numbers are 4 bytes, got {0:?}")]
    LongHeaderPacketNumberLen(PacketNumberLen),

    #[error("invalid version negotiation packet: {0}")]
    InvalidVersionNegotiationPacket(&'static str),

    #[error("public reset packet without connection ID")]
    ResetWithoutConnectionId,

    #[error("reset flag and version flag are both set")]
    ResetAndVersionFlagSet,

    #[error("writing of version negotiation packets not supported")]
    WriteVersionNegotiation,

    #[error("length is undefined for version negotiation packets")]
    LengthOfVersionNegotiation,

    #[error("invalid packet type {0:#x}")]
    InvalidPacketType(u8),

    #[error("long header: packet type not set")]
    PacketTypeNotSet,

    #[error("long header: version not set")]
    VersionNotSet,

    #[error("diversification nonce only allowed in regular packets sent by the server")]
    DiversificationNonceNotAllowed,

    #[error("{0} packet not allowed from {1:?}")]
    UnexpectedPacketType(PacketType, Perspective),

    #[error("value {0} too large for a variable-length integer")]
    VarIntTooLarge(u64),

    #[error("unknown frame type {0:#x}")]
    UnknownFrameType(u8),

    #[error("packet doesn't contain a STREAM_FRAME")]
    NoStreamFrame,

    #[error("received STREAM_FRAME for wrong stream (stream ID {0})")]
    WrongStream(u64),

    #[error("received stream data with non-zero offset")]
    NonZeroOffset,

    #[error("packet authentication failed")]
    DecryptionFailed,

    #[error("packet encryption failed")]
    EncryptionFailed,

    #[error("unsupported version {0}")]
    UnsupportedVersion(VersionNumber),

    #[error("{0}")]
    Alert(Alert),

    #[error("expected handshake state {expected:?}, got {actual:?}")]
    UnexpectedHandshakeState {
        expected: HandshakeState,
        actual: HandshakeState,
    },

    #[error("invalid config: {0}")]
    Config(&'static str),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl<I> From<nom::Err<nom::error::Error<I>>> for Error {
    fn from(_: nom::Err<nom::error::Error<I>>) -> Self {
        Error::UnexpectedEof
    }
}

impl From<Alert> for Error {
    fn from(alert: Alert) -> Self {
        Error::Alert(alert)
    }
}
