//! The seam to the TLS handshake.
//!
//! The stateless server never looks inside the handshake. It feeds the
//! client's bytes to a [`HandshakeEngine`] through a [`CryptoStreamConn`],
//! steps it, and acts on the [`Alert`] and [`HandshakeState`] it reports.

mod crypto_stream;

pub use crypto_stream::CryptoStreamConn;

use std::fmt;
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::types::VersionNumber;
use crate::Error;

/// Result of one engine step.
///
/// The TLS alert registry plus two local signals: [`Alert::NoAlert`] for a
/// step that went fine and [`Alert::StatelessRetry`] when the engine wants
/// the client to come back with a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    CloseNotify,
    UnexpectedMessage,
    BadRecordMac,
    RecordOverflow,
    HandshakeFailure,
    BadCertificate,
    UnsupportedCertificate,
    CertificateRevoked,
    CertificateExpired,
    CertificateUnknown,
    IllegalParameter,
    UnknownCa,
    AccessDenied,
    DecodeError,
    DecryptError,
    ProtocolVersion,
    InsufficientSecurity,
    InternalError,
    InappropriateFallback,
    UserCanceled,
    MissingExtension,
    UnsupportedExtension,
    UnrecognizedName,
    BadCertificateStatusResponse,
    UnknownPskIdentity,
    CertificateRequired,
    NoApplicationProtocol,
    StatelessRetry,
    WouldBlock,
    NoAlert,
    Unknown(u8),
}

impl Alert {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Alert::CloseNotify,
            10 => Alert::UnexpectedMessage,
            20 => Alert::BadRecordMac,
            22 => Alert::RecordOverflow,
            40 => Alert::HandshakeFailure,
            42 => Alert::BadCertificate,
            43 => Alert::UnsupportedCertificate,
            44 => Alert::CertificateRevoked,
            45 => Alert::CertificateExpired,
            46 => Alert::CertificateUnknown,
            47 => Alert::IllegalParameter,
            48 => Alert::UnknownCa,
            49 => Alert::AccessDenied,
            50 => Alert::DecodeError,
            51 => Alert::DecryptError,
            70 => Alert::ProtocolVersion,
            71 => Alert::InsufficientSecurity,
            80 => Alert::InternalError,
            86 => Alert::InappropriateFallback,
            90 => Alert::UserCanceled,
            109 => Alert::MissingExtension,
            110 => Alert::UnsupportedExtension,
            112 => Alert::UnrecognizedName,
            113 => Alert::BadCertificateStatusResponse,
            115 => Alert::UnknownPskIdentity,
            116 => Alert::CertificateRequired,
            120 => Alert::NoApplicationProtocol,
            253 => Alert::StatelessRetry,
            254 => Alert::WouldBlock,
            255 => Alert::NoAlert,
            _ => Alert::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Alert::CloseNotify => 0,
            Alert::UnexpectedMessage => 10,
            Alert::BadRecordMac => 20,
            Alert::RecordOverflow => 22,
            Alert::HandshakeFailure => 40,
            Alert::BadCertificate => 42,
            Alert::UnsupportedCertificate => 43,
            Alert::CertificateRevoked => 44,
            Alert::CertificateExpired => 45,
            Alert::CertificateUnknown => 46,
            Alert::IllegalParameter => 47,
            Alert::UnknownCa => 48,
            Alert::AccessDenied => 49,
            Alert::DecodeError => 50,
            Alert::DecryptError => 51,
            Alert::ProtocolVersion => 70,
            Alert::InsufficientSecurity => 71,
            Alert::InternalError => 80,
            Alert::InappropriateFallback => 86,
            Alert::UserCanceled => 90,
            Alert::MissingExtension => 109,
            Alert::UnsupportedExtension => 110,
            Alert::UnrecognizedName => 112,
            Alert::BadCertificateStatusResponse => 113,
            Alert::UnknownPskIdentity => 115,
            Alert::CertificateRequired => 116,
            Alert::NoApplicationProtocol => 120,
            Alert::StatelessRetry => 253,
            Alert::WouldBlock => 254,
            Alert::NoAlert => 255,
            Alert::Unknown(value) => *value,
        }
    }

    /// Human readable description, used as the reason phrase of a
    /// CONNECTION_CLOSE.
    pub fn description(&self) -> &'static str {
        match self {
            Alert::CloseNotify => "close notify",
            Alert::UnexpectedMessage => "unexpected message",
            Alert::BadRecordMac => "bad record mac",
            Alert::RecordOverflow => "record overflow",
            Alert::HandshakeFailure => "handshake failure",
            Alert::BadCertificate => "bad certificate",
            Alert::UnsupportedCertificate => "unsupported certificate",
            Alert::CertificateRevoked => "certificate revoked",
            Alert::CertificateExpired => "certificate expired",
            Alert::CertificateUnknown => "certificate unknown",
            Alert::IllegalParameter => "illegal parameter",
            Alert::UnknownCa => "unknown ca",
            Alert::AccessDenied => "access denied",
            Alert::DecodeError => "decode error",
            Alert::DecryptError => "decrypt error",
            Alert::ProtocolVersion => "protocol version",
            Alert::InsufficientSecurity => "insufficient security",
            Alert::InternalError => "internal error",
            Alert::InappropriateFallback => "inappropriate fallback",
            Alert::UserCanceled => "user canceled",
            Alert::MissingExtension => "missing extension",
            Alert::UnsupportedExtension => "unsupported extension",
            Alert::UnrecognizedName => "unrecognized name",
            Alert::BadCertificateStatusResponse => "bad certificate status response",
            Alert::UnknownPskIdentity => "unknown PSK identity",
            Alert::CertificateRequired => "certificate required",
            Alert::NoApplicationProtocol => "no application protocol",
            Alert::StatelessRetry => "stateless retry",
            Alert::WouldBlock => "would have blocked",
            Alert::NoAlert => "no alert",
            Alert::Unknown(_) => "unknown alert",
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alert::Unknown(v) => write!(f, "unknown alert {}", v),
            _ => f.write_str(self.description()),
        }
    }
}

/// Where an engine is in the handshake.
///
/// The stateless server only tells apart the states it expects after its
/// two steps on a fresh ClientHello.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    ServerStart,
    ServerRecvdCh,
    ServerNegotiated,
    ServerWaitEoed,
    ServerWaitFlight2,
    ServerWaitCert,
    ServerWaitCv,
    ServerWaitFinished,
    Connected,
}

/// Transport parameters negotiated in the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportParameters {
    pub stream_flow_control_window: u32,
    pub connection_flow_control_window: u32,
    pub max_streams: u32,
    pub omit_connection_id: bool,
    pub idle_timeout: Duration,
}

/// One handshake attempt.
///
/// An engine reads and writes handshake bytes through the
/// [`CryptoStreamConn`] it was created with.
pub trait HandshakeEngine: Send {
    /// Process whatever input is buffered and write any reply.
    fn step(&mut self) -> Alert;

    fn state(&self) -> HandshakeState;
}

/// Creates a fresh [`HandshakeEngine`] per attempt.
pub trait HandshakeProvider: Send + Sync {
    /// The receiver yields the peer's transport parameters once the engine
    /// has seen them.
    fn new_engine(
        &self,
        conn: CryptoStreamConn,
        version: VersionNumber,
    ) -> Result<(Box<dyn HandshakeEngine>, Receiver<TransportParameters>), Error>;
}
