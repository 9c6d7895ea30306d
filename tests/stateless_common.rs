//! Shared helpers for stateless server integration tests.
//!
//! This file has no `#[test]` functions; Cargo compiles it as a no-op binary.
//! Import it from other test files via `mod stateless_common;`.

#![allow(unused)]

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};
use quicgate::{
    Aead, Alert, Buf, Config, ConnectionId, CryptoStreamConn, Error, Frame, HandshakeEngine,
    HandshakeProvider, HandshakeState, Header, NullAead, PacketConn, PacketType, Perspective,
    StatelessServer, StatelessSession, StreamFrame, TransportParameters, VersionNumber,
};

pub fn remote() -> SocketAddr {
    "192.0.2.1:4433".parse().unwrap()
}

pub fn client_dest() -> ConnectionId {
    ConnectionId::new(&[0xde, 0xad, 0xbe, 0xef, 0xca, 0xfe, 0x13, 0x37]).unwrap()
}

pub fn client_src() -> ConnectionId {
    ConnectionId::new(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap()
}

/// Records every packet written instead of sending it.
#[derive(Default)]
pub struct RecordingConn {
    packets: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
}

impl RecordingConn {
    pub fn packets(&self) -> Vec<(Vec<u8>, SocketAddr)> {
        self.packets.lock().unwrap().clone()
    }
}

impl PacketConn for RecordingConn {
    fn write_to(&self, packet: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.packets.lock().unwrap().push((packet.to_vec(), addr));
        Ok(packet.len())
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok("127.0.0.1:443".parse().unwrap())
    }
}

/// One scripted engine step: the alert to return, the state afterwards and
/// the bytes to write to the crypto stream.
#[derive(Debug, Clone)]
pub struct Step {
    pub alert: Alert,
    pub state: HandshakeState,
    pub write: Vec<u8>,
}

impl Step {
    pub fn new(alert: Alert, state: HandshakeState, write: &[u8]) -> Self {
        Step {
            alert,
            state,
            write: write.to_vec(),
        }
    }
}

/// A handshake engine that plays back a script.
pub struct ScriptedEngine {
    conn: CryptoStreamConn,
    steps: VecDeque<Step>,
    state: HandshakeState,
    received: Arc<Mutex<Vec<u8>>>,
    _params: Sender<TransportParameters>,
}

impl HandshakeEngine for ScriptedEngine {
    fn step(&mut self) -> Alert {
        let mut buf = [0u8; 256];
        loop {
            match self.conn.read(&mut buf) {
                Ok(n) => self.received.lock().unwrap().extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(_) => return Alert::InternalError,
            }
        }

        let Some(step) = self.steps.pop_front() else {
            return Alert::InternalError;
        };
        self.conn.write_all(&step.write).unwrap();
        self.state = step.state;
        step.alert
    }

    fn state(&self) -> HandshakeState {
        self.state
    }
}

/// Hands out [`ScriptedEngine`]s and remembers what they were fed.
pub struct ScriptedProvider {
    script: Vec<Step>,
    pub engines_created: Mutex<usize>,
    pub received: Arc<Mutex<Vec<u8>>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Step>) -> Self {
        ScriptedProvider {
            script,
            engines_created: Mutex::new(0),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn engines_created(&self) -> usize {
        *self.engines_created.lock().unwrap()
    }
}

impl HandshakeProvider for ScriptedProvider {
    fn new_engine(
        &self,
        conn: CryptoStreamConn,
        version: VersionNumber,
    ) -> Result<(Box<dyn HandshakeEngine>, Receiver<TransportParameters>), Error> {
        assert!(version.uses_tls());
        *self.engines_created.lock().unwrap() += 1;

        let (tx, rx) = crossbeam_channel::unbounded();
        let engine = ScriptedEngine {
            conn,
            steps: self.script.clone().into(),
            state: HandshakeState::ServerStart,
            received: self.received.clone(),
            _params: tx,
        };
        Ok((Box::new(engine), rx))
    }
}

/// Script of an engine that accepts the ClientHello.
pub fn accepting_script() -> Vec<Step> {
    vec![
        Step::new(Alert::NoAlert, HandshakeState::ServerNegotiated, b""),
        Step::new(Alert::NoAlert, HandshakeState::ServerWaitFlight2, b"server flight"),
    ]
}

pub struct Harness {
    pub server: Arc<StatelessServer>,
    pub sessions: Receiver<StatelessSession>,
    pub conn: Arc<RecordingConn>,
    pub provider: Arc<ScriptedProvider>,
}

pub fn harness(script: Vec<Step>) -> Harness {
    harness_with_config(script, Config::builder().build().unwrap())
}

pub fn harness_with_config(script: Vec<Step>, config: Config) -> Harness {
    let _ = env_logger::try_init();

    let conn = Arc::new(RecordingConn::default());
    let provider = Arc::new(ScriptedProvider::new(script));
    let (server, sessions) =
        StatelessServer::new(conn.clone(), Arc::new(config), provider.clone());

    Harness {
        server: Arc::new(server),
        sessions,
        conn,
        provider,
    }
}

pub fn client_aead() -> NullAead {
    NullAead::new(Perspective::Client, &client_dest(), VersionNumber::TLS).unwrap()
}

/// Build a client Initial packet of exactly `total_len` bytes.
///
/// `frame` goes first, PADDING fills the rest.
pub fn client_initial(version: VersionNumber, frame: &Frame, total_len: usize) -> Vec<u8> {
    client_packet(PacketType::Initial, version, frame, total_len)
}

/// Like [`client_initial`], for any long header packet type.
pub fn client_packet(
    packet_type: PacketType,
    version: VersionNumber,
    frame: &Frame,
    total_len: usize,
) -> Vec<u8> {
    let mut hdr = Header::long(packet_type, version, client_dest(), client_src(), 0x42);
    // Any value with a 2 byte encoding, to size the header.
    hdr.payload_len = 1000;
    let header_len = hdr.encoded_len(Perspective::Client).unwrap();
    hdr.payload_len = (total_len - header_len) as u64;
    assert_eq!(hdr.encoded_len(Perspective::Client).unwrap(), header_len);

    let mut packet = Buf::new();
    hdr.write(&mut packet, Perspective::Client).unwrap();

    let aead = client_aead();
    let plaintext_len = total_len - header_len - aead.overhead();
    let mut payload = Buf::new();
    frame.serialize(&mut payload).unwrap();
    assert!(payload.len() <= plaintext_len, "frame too large");
    while payload.len() < plaintext_len {
        payload.push(0);
    }
    aead.seal(&mut payload, hdr.packet_number, &packet).unwrap();
    packet.extend_from_slice(&payload);

    assert_eq!(packet.len(), total_len);
    packet.into_vec()
}

pub fn client_hello_frame() -> Frame {
    Frame::Stream(StreamFrame::new(0, b"client hello".to_vec()))
}

/// Parse a server reply and open its payload with the client's null AEAD.
pub fn open_reply(packet: &[u8]) -> (Header, Frame) {
    let (data, hdr) = Header::parse(packet, Perspective::Server).unwrap();
    assert_eq!(hdr.payload_len as usize, data.len());
    let plaintext = client_aead()
        .open(data, hdr.packet_number, &hdr.raw)
        .unwrap();
    let (_, frame) = quicgate::parse_next_frame(&plaintext).unwrap();
    (hdr, frame.unwrap())
}
