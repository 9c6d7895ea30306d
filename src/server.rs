// Stateless Initial packet handling:
//
// 1. Client sends an Initial packet carrying its ClientHello in a STREAM
//    frame on the crypto stream.
// 2. Unsupported version: reply with a version negotiation packet.
// 3. Too small or doesn't open with the null AEAD: drop without a reply.
// 4. The ClientHello is fed to a fresh handshake engine.
//    - Engine asks for a stateless retry: send its cookie challenge in a
//      Retry packet and forget the client.
//    - Engine fails: send a CONNECTION_CLOSE in a Handshake packet.
//    - Engine progresses: pick a connection ID and hand the engine to the
//      session layer. Nothing is written here.
//
// No per-client state is kept until the handoff.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};

use crate::crypto::NullAead;
use crate::frame::{ConnectionCloseFrame, Frame, StreamFrame, HANDSHAKE_FAILED};
use crate::handshake::{
    Alert, CryptoStreamConn, HandshakeEngine, HandshakeProvider, HandshakeState,
    TransportParameters,
};
use crate::initial::{pack_unencrypted_packet, unpack_initial_packet};
use crate::rng::SeededRng;
use crate::types::{ConnectionId, PacketType, Perspective, VersionNumber};
use crate::wire::{compose_long_version_negotiation, compose_version_negotiation, Header};
use crate::{Config, Error};

/// Where reply packets go.
pub trait PacketConn: Send + Sync {
    fn write_to(&self, packet: &[u8], addr: SocketAddr) -> io::Result<usize>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl PacketConn for UdpSocket {
    fn write_to(&self, packet: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.send_to(packet, addr)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        UdpSocket::local_addr(self)
    }
}

/// A handshake that got past the stateless checks.
///
/// Handed to the session layer, which owns it from then on.
pub struct StatelessSession {
    /// Connection ID picked by the server.
    pub connection_id: ConnectionId,
    pub version: VersionNumber,
    pub remote_addr: SocketAddr,
    pub engine: Box<dyn HandshakeEngine>,
    /// Holds the server's handshake flight, ready to be sent.
    pub crypto_stream: CryptoStreamConn,
    pub params: Receiver<TransportParameters>,
}

impl std::fmt::Debug for StatelessSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatelessSession")
            .field("connection_id", &self.connection_id)
            .field("version", &self.version)
            .field("remote_addr", &self.remote_addr)
            .field("state", &self.engine.state())
            .finish()
    }
}

/// Why a packet produced no reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Header could not be parsed.
    Malformed,
    /// Header carries no version.
    NoVersion,
    /// Long header of a type other than Initial.
    NotInitial,
    TooSmall,
    /// Null AEAD, frame or stream checks failed.
    UnpackFailed,
    /// No engine could be created.
    EngineFailed,
    /// The reply could not be built or sent.
    SendFailed,
    /// Nobody receives sessions anymore.
    HandoffClosed,
}

/// What became of one Initial packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialOutcome {
    NegotiationSent,
    Dropped(DropReason),
    RetrySent,
    ErrorSent,
    SessionHandedOff,
}

/// Handles Initial packets before any session exists.
pub struct StatelessServer {
    conn: Arc<dyn PacketConn>,
    config: Arc<Config>,
    provider: Arc<dyn HandshakeProvider>,
    rng: Mutex<SeededRng>,
    sessions: Sender<StatelessSession>,
}

impl StatelessServer {
    /// Create a server replying through `conn`.
    ///
    /// Sessions that complete the stateless phase arrive on the returned receiver.
    pub fn new(
        conn: Arc<dyn PacketConn>,
        config: Arc<Config>,
        provider: Arc<dyn HandshakeProvider>,
    ) -> (Self, Receiver<StatelessSession>) {
        let (tx, rx) = match config.session_queue() {
            Some(bound) => crossbeam_channel::bounded(bound),
            None => crossbeam_channel::unbounded(),
        };

        let server = StatelessServer {
            conn,
            rng: Mutex::new(SeededRng::new(config.rng_seed())),
            config,
            provider,
            sessions: tx,
        };

        (server, rx)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse a datagram from `remote` and handle it as an Initial packet.
    pub fn handle_packet(&self, remote: SocketAddr, packet: &[u8]) -> InitialOutcome {
        match Header::parse(packet, Perspective::Client) {
            Ok((data, hdr)) => self.handle_initial(remote, &hdr, data),
            Err(e) => {
                debug!("Dropping unparseable packet from {}: {}", remote, e);
                InitialOutcome::Dropped(DropReason::Malformed)
            }
        }
    }

    /// Handle an Initial packet whose header was already parsed.
    ///
    /// `data` is the packet after the header. At most one packet is written
    /// in reply. Errors are never returned, the outcome is informational.
    pub fn handle_initial(&self, remote: SocketAddr, hdr: &Header, data: &[u8]) -> InitialOutcome {
        debug!("Received Initial packet from {}", remote);
        hdr.log();

        if hdr.is_long_header() && hdr.packet_type != Some(PacketType::Initial) {
            debug!("Dropping non-Initial packet from {}", remote);
            return InitialOutcome::Dropped(DropReason::NotInitial);
        }

        let version = match hdr.version {
            Some(v) => v,
            None => {
                debug!("Dropping packet without version from {}", remote);
                return InitialOutcome::Dropped(DropReason::NoVersion);
            }
        };

        if !self.config.is_supported_version(version) {
            debug!("Client offered unsupported version {}, sending version negotiation", version);
            return match self.send_version_negotiation(remote, hdr) {
                Ok(()) => InitialOutcome::NegotiationSent,
                Err(e) => {
                    warn!("Failed to send version negotiation to {}: {}", remote, e);
                    InitialOutcome::Dropped(DropReason::SendFailed)
                }
            };
        }

        let size = hdr.raw.len() + data.len();
        if size < self.config.min_initial_packet_size() {
            debug!(
                "Dropping too small Initial packet ({} < {} bytes)",
                size,
                self.config.min_initial_packet_size()
            );
            return InitialOutcome::Dropped(DropReason::TooSmall);
        }

        let aead = match NullAead::new(Perspective::Server, &hdr.dest_connection_id, version) {
            Ok(v) => v,
            Err(e) => {
                debug!("Dropping Initial packet: {}", e);
                return InitialOutcome::Dropped(DropReason::UnpackFailed);
            }
        };

        let frame = match unpack_initial_packet(&aead, hdr, data, version) {
            Ok(v) => v,
            Err(e) => {
                debug!("Dropping Initial packet: {}", e);
                return InitialOutcome::Dropped(DropReason::UnpackFailed);
            }
        };

        let crypto_stream = CryptoStreamConn::new(remote, self.config.crypto_stream_capacity());
        if let Err(e) = crypto_stream.add_data_for_reading(&frame.data) {
            warn!("Crypto stream unusable: {}", e);
            return InitialOutcome::Dropped(DropReason::EngineFailed);
        }

        let (mut engine, params) = match self.provider.new_engine(crypto_stream.clone(), version)
        {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to create handshake engine: {}", e);
                return InitialOutcome::Dropped(DropReason::EngineFailed);
            }
        };

        match engine.step() {
            Alert::NoAlert => {}
            Alert::StatelessRetry => {
                return match self.send_retry(remote, hdr, &aead, version, &crypto_stream) {
                    Ok(()) => {
                        debug!("Sent stateless retry to {}", remote);
                        InitialOutcome::RetrySent
                    }
                    Err(e) => {
                        warn!("Failed to send retry to {}: {}", remote, e);
                        InitialOutcome::Dropped(DropReason::SendFailed)
                    }
                };
            }
            alert => return self.fail_handshake(remote, hdr, &aead, version, alert.into()),
        }

        if let Err(e) = drive_to_flight2(engine.as_mut()) {
            return self.fail_handshake(remote, hdr, &aead, version, e);
        }

        let connection_id = match self.new_connection_id(hdr) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to generate connection ID: {}", e);
                return InitialOutcome::Dropped(DropReason::EngineFailed);
            }
        };
        debug!(
            "Handing off session {} for {} ({})",
            connection_id, remote, version
        );

        let session = StatelessSession {
            connection_id,
            version,
            remote_addr: remote,
            engine,
            crypto_stream,
            params,
        };

        match self.sessions.send(session) {
            Ok(()) => InitialOutcome::SessionHandedOff,
            Err(_) => {
                warn!("Session receiver gone, dropping handshake from {}", remote);
                InitialOutcome::Dropped(DropReason::HandoffClosed)
            }
        }
    }

    fn send_version_negotiation(&self, remote: SocketAddr, hdr: &Header) -> Result<(), Error> {
        let versions = self.config.supported_versions();

        let packet = if hdr.is_long_header() {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            compose_long_version_negotiation(
                &hdr.src_connection_id,
                &hdr.dest_connection_id,
                versions,
                &mut rng,
            )?
        } else {
            compose_version_negotiation(&hdr.dest_connection_id, versions)?
        };

        self.conn.write_to(&packet, remote)?;
        Ok(())
    }

    fn send_retry(
        &self,
        remote: SocketAddr,
        hdr: &Header,
        aead: &NullAead,
        version: VersionNumber,
        crypto_stream: &CryptoStreamConn,
    ) -> Result<(), Error> {
        let reply = Header::long(
            PacketType::Retry,
            version,
            hdr.src_connection_id.clone(),
            hdr.dest_connection_id.clone(),
            hdr.packet_number,
        );

        let frame = Frame::Stream(StreamFrame {
            data_len_present: false,
            ..StreamFrame::new(version.crypto_stream_id(), crypto_stream.take_written()?)
        });

        let packet = pack_unencrypted_packet(aead, &reply, &frame, Perspective::Server)?;
        trace!("Sending Retry {}", reply);
        self.conn.write_to(&packet, remote)?;
        Ok(())
    }

    fn fail_handshake(
        &self,
        remote: SocketAddr,
        hdr: &Header,
        aead: &NullAead,
        version: VersionNumber,
        reason: Error,
    ) -> InitialOutcome {
        debug!("Handshake with {} failed: {}", remote, reason);

        match self.send_connection_close(remote, hdr, aead, version, &reason.to_string()) {
            Ok(()) => InitialOutcome::ErrorSent,
            Err(e) => {
                warn!("Failed to send CONNECTION_CLOSE to {}: {}", remote, e);
                InitialOutcome::Dropped(DropReason::SendFailed)
            }
        }
    }

    fn send_connection_close(
        &self,
        remote: SocketAddr,
        hdr: &Header,
        aead: &NullAead,
        version: VersionNumber,
        reason: &str,
    ) -> Result<(), Error> {
        let reply = Header::long(
            PacketType::Handshake,
            version,
            hdr.src_connection_id.clone(),
            hdr.dest_connection_id.clone(),
            1,
        );
        let frame = Frame::ConnectionClose(ConnectionCloseFrame::new(HANDSHAKE_FAILED, reason));

        let packet = pack_unencrypted_packet(aead, &reply, &frame, Perspective::Server)?;
        self.conn.write_to(&packet, remote)?;
        Ok(())
    }

    /// A random connection ID that is neither of the client's.
    fn new_connection_id(&self, hdr: &Header) -> Result<ConnectionId, Error> {
        let len = self.config.connection_id_len();
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            let id = ConnectionId::random(&mut rng, len)?;
            if id != hdr.dest_connection_id && id != hdr.src_connection_id {
                return Ok(id);
            }
        }
    }
}

/// After a ClientHello is accepted the engine must have negotiated. A second
/// step writes the server flight and leaves it waiting for the client's.
fn drive_to_flight2(engine: &mut dyn HandshakeEngine) -> Result<(), Error> {
    expect_state(engine, HandshakeState::ServerNegotiated)?;

    match engine.step() {
        Alert::NoAlert => {}
        alert => return Err(alert.into()),
    }

    expect_state(engine, HandshakeState::ServerWaitFlight2)
}

fn expect_state(engine: &dyn HandshakeEngine, expected: HandshakeState) -> Result<(), Error> {
    let actual = engine.state();
    if actual != expected {
        return Err(Error::UnexpectedHandshakeState { expected, actual });
    }
    Ok(())
}
