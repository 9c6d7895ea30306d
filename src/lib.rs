//! quicgate
//!
//! Packet header codec and stateless Initial packet handling for the server
//! side of a QUIC handshake.
//!
//! The crate covers what happens to the first packet of a connection before
//! any per-client state exists:
//!
//! * [`Header`] parses and writes both the long header and the legacy public
//!   header, including version negotiation and public reset framing.
//! * [`unpack_initial_packet`] and [`pack_unencrypted_packet`] open and seal
//!   the single frame of an Initial packet with the [`NullAead`].
//! * [`StatelessServer`] answers unsupported versions, drops undersized or
//!   bogus packets, sends stateless retries and handshake errors, and hands
//!   handshakes that progressed to the session layer as a
//!   [`StatelessSession`].
//!
//! The TLS handshake itself is plugged in through [`HandshakeProvider`].

#![forbid(unsafe_code)]
#![warn(clippy::all)]
// #![deny(missing_docs)]

#[macro_use]
extern crate log;

mod buffer;
mod config;
mod crypto;
mod error;
mod frame;
mod handshake;
mod initial;
mod rng;
mod server;
mod types;
mod util;
mod wire;

pub use buffer::Buf;
pub use config::{Config, ConfigBuilder, MIN_INITIAL_PACKET_SIZE};
pub use crypto::{Aead, NullAead};
pub use error::Error;
pub use frame::{parse_next_frame, ConnectionCloseFrame, Frame, StreamFrame, HANDSHAKE_FAILED};
pub use handshake::{
    Alert, CryptoStreamConn, HandshakeEngine, HandshakeProvider, HandshakeState,
    TransportParameters,
};
pub use initial::{pack_unencrypted_packet, unpack_initial_packet};
pub use rng::SeededRng;
pub use server::{DropReason, InitialOutcome, PacketConn, StatelessServer, StatelessSession};
pub use types::{
    ConnectionId, DiversificationNonce, PacketNumber, PacketNumberLen, PacketType, Perspective,
    VersionNumber,
};
pub use wire::{compose_long_version_negotiation, compose_version_negotiation, Header, HeaderForm};
