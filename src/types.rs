//! Protocol value types shared by the header codec, the transcoder and the
//! stateless server.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

use nom::bytes::complete::take;
use nom::IResult;
use tinyvec::ArrayVec;

use crate::rng::SeededRng;
use crate::Error;

/// Longest connection ID the long header can express.
pub const MAX_CONNECTION_ID_LEN: usize = 18;

/// Shortest non-empty connection ID the long header can express.
pub const MIN_CONNECTION_ID_LEN: usize = 4;

/// The public header always carries exactly this many connection ID bytes.
pub const PUBLIC_CONNECTION_ID_LEN: usize = 8;

/// Length of the diversification nonce in a server-sent public header.
pub const DIVERSIFICATION_NONCE_LEN: usize = 32;

/// Packet numbers are plain integers; the width on the wire is carried separately.
pub type PacketNumber = u64;

/// An opaque connection identifier of 0 to 18 bytes.
#[derive(Clone, Default)]
pub struct ConnectionId(ArrayVec<[u8; MAX_CONNECTION_ID_LEN]>);

impl ConnectionId {
    /// Create a connection ID from raw bytes.
    pub fn new(data: &[u8]) -> Result<Self, Error> {
        if data.len() > MAX_CONNECTION_ID_LEN {
            return Err(Error::InvalidConnectionIdLength(data.len()));
        }
        let mut bytes = ArrayVec::default();
        bytes.extend_from_slice(data);
        Ok(ConnectionId(bytes))
    }

    /// The zero-length connection ID.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Generate a random connection ID of `len` bytes.
    pub fn random(rng: &mut SeededRng, len: usize) -> Result<Self, Error> {
        if len > MAX_CONNECTION_ID_LEN {
            return Err(Error::InvalidConnectionIdLength(len));
        }
        let mut bytes = ArrayVec::default();
        for _ in 0..len {
            bytes.push(rng.random::<u8>());
        }
        Ok(ConnectionId(bytes))
    }

    /// Read exactly `len` bytes as a connection ID.
    pub(crate) fn parse(input: &[u8], len: usize) -> IResult<&[u8], ConnectionId> {
        let (input, data) = take(len)(input)?;
        let mut bytes = ArrayVec::default();
        // len comes from a 4 bit field (max 15 + 3) or the fixed public length.
        bytes.extend_from_slice(data);
        Ok((input, ConnectionId(bytes)))
    }

    pub fn is_zero(&self) -> bool {
        self.iter().all(|b| *b == 0)
    }
}

impl Deref for ConnectionId {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for ConnectionId {
    fn eq(&self, other: &Self) -> bool {
        self.deref() == other.deref()
    }
}

impl Eq for ConnectionId {}

impl Hash for ConnectionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.deref().hash(state)
    }
}

impl<'a> TryFrom<&'a [u8]> for ConnectionId {
    type Error = Error;

    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(empty)");
        }
        write!(f, "0x")?;
        for b in self.iter() {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self)
    }
}

/// A 32 bit protocol version tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VersionNumber(pub u32);

const GQUIC_VERSION_0: u32 = 0x5130_3030;
const MAX_GQUIC_VERSION: u32 = 0x5130_3439;

impl VersionNumber {
    /// Placeholder used by writers that don't care about the version.
    pub const WHATEVER: VersionNumber = VersionNumber(0);

    /// Sentinel for a version that could not be determined.
    pub const UNKNOWN: VersionNumber = VersionNumber(u32::MAX);

    /// The TLS development version. Uses the long header and the null AEAD.
    pub const TLS: VersionNumber = VersionNumber(101);

    /// gQUIC version 39, "Q039". Uses the public header.
    pub const GQUIC_39: VersionNumber = VersionNumber(GQUIC_VERSION_0 + 3 * 0x100 + 0x9);

    pub fn from_u32(value: u32) -> Self {
        VersionNumber(value)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Whether the handshake of this version runs over TLS.
    pub fn uses_tls(&self) -> bool {
        *self == Self::TLS
    }

    /// The stream carrying handshake data for this version.
    pub fn crypto_stream_id(&self) -> u64 {
        if self.uses_tls() {
            0
        } else {
            1
        }
    }

    fn is_gquic(&self) -> bool {
        self.0 > GQUIC_VERSION_0 && self.0 <= MAX_GQUIC_VERSION
    }

    fn to_gquic_version(self) -> u32 {
        let v = self.0 - GQUIC_VERSION_0;
        10 * (v / 0x100) + (v % 0x10)
    }

    /// Reserved versions follow the 0x?a?a?a?a pattern and are never negotiated.
    pub fn is_reserved(&self) -> bool {
        self.0 & 0x0f0f_0f0f == 0x0a0a_0a0a
    }

    /// Pick a random reserved version for greasing.
    pub fn generate_reserved(rng: &mut SeededRng) -> Self {
        let r: u32 = rng.random();
        VersionNumber((r | 0x0a0a_0a0a) & 0xfafa_fafa)
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::WHATEVER => write!(f, "whatever"),
            Self::UNKNOWN => write!(f, "unknown"),
            Self::TLS => write!(f, "TLS dev version (WIP)"),
            v if v.is_gquic() => write!(f, "gQUIC {}", v.to_gquic_version()),
            v => write!(f, "{:#x}", v.0),
        }
    }
}

impl fmt::Debug for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionNumber({})", self)
    }
}

/// Width of an encoded packet number.
///
/// `Len6` exists in the public header tag space but is never accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketNumberLen {
    Len1,
    Len2,
    Len4,
    Len6,
}

impl PacketNumberLen {
    pub fn bytes(&self) -> usize {
        match self {
            PacketNumberLen::Len1 => 1,
            PacketNumberLen::Len2 => 2,
            PacketNumberLen::Len4 => 4,
            PacketNumberLen::Len6 => 6,
        }
    }
}

/// Which endpoint sent a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perspective {
    Client,
    Server,
}

impl Perspective {
    pub fn opposite(&self) -> Perspective {
        match self {
            Perspective::Client => Perspective::Server,
            Perspective::Server => Perspective::Client,
        }
    }
}

/// Long header packet types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Initial,
    Retry,
    Handshake,
    ZeroRtt,
    Unknown(u8),
}

impl PacketType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x7f => PacketType::Initial,
            0x7e => PacketType::Retry,
            0x7d => PacketType::Handshake,
            0x7c => PacketType::ZeroRtt,
            _ => PacketType::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            PacketType::Initial => 0x7f,
            PacketType::Retry => 0x7e,
            PacketType::Handshake => 0x7d,
            PacketType::ZeroRtt => 0x7c,
            PacketType::Unknown(value) => *value,
        }
    }

    /// Whether an endpoint in `sent_by` may send this packet type.
    pub fn allowed_from(&self, sent_by: Perspective) -> bool {
        match sent_by {
            Perspective::Client => matches!(
                self,
                PacketType::Initial | PacketType::Handshake | PacketType::ZeroRtt
            ),
            Perspective::Server => matches!(self, PacketType::Retry | PacketType::Handshake),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketType::Initial => write!(f, "Initial"),
            PacketType::Retry => write!(f, "Retry"),
            PacketType::Handshake => write!(f, "Handshake"),
            PacketType::ZeroRtt => write!(f, "0-RTT Protected"),
            PacketType::Unknown(v) => write!(f, "unknown packet type: {}", v),
        }
    }
}

/// Server-chosen randomness carried in the public header.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DiversificationNonce(pub [u8; DIVERSIFICATION_NONCE_LEN]);

impl DiversificationNonce {
    pub(crate) fn parse(input: &[u8]) -> IResult<&[u8], DiversificationNonce> {
        let (input, data) = take(DIVERSIFICATION_NONCE_LEN)(input)?;
        let mut nonce = [0; DIVERSIFICATION_NONCE_LEN];
        nonce.copy_from_slice(data);
        Ok((input, DiversificationNonce(nonce)))
    }
}

impl Deref for DiversificationNonce {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for DiversificationNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x?}", &self.0)
    }
}
