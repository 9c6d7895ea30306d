#![no_main]

//! Fuzz target for the stateless server.
//!
//! Feeds arbitrary datagrams to a server whose handshake engine accepts
//! anything. Looks for panics on the way to a drop, reply or handoff.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use libfuzzer_sys::fuzz_target;

use quicgate::{
    Alert, Config, CryptoStreamConn, Error, HandshakeEngine, HandshakeProvider, HandshakeState,
    PacketConn, StatelessServer, TransportParameters, VersionNumber,
};

struct NullConn;

impl PacketConn for NullConn {
    fn write_to(&self, packet: &[u8], _addr: SocketAddr) -> io::Result<usize> {
        Ok(packet.len())
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(([127, 0, 0, 1], 443).into())
    }
}

struct AcceptingEngine(HandshakeState);

impl HandshakeEngine for AcceptingEngine {
    fn step(&mut self) -> Alert {
        self.0 = match self.0 {
            HandshakeState::ServerStart => HandshakeState::ServerNegotiated,
            _ => HandshakeState::ServerWaitFlight2,
        };
        Alert::NoAlert
    }

    fn state(&self) -> HandshakeState {
        self.0
    }
}

struct AcceptingProvider;

impl HandshakeProvider for AcceptingProvider {
    fn new_engine(
        &self,
        _conn: CryptoStreamConn,
        _version: VersionNumber,
    ) -> Result<(Box<dyn HandshakeEngine>, Receiver<TransportParameters>), Error> {
        let (_, rx) = crossbeam_channel::bounded(1);
        Ok((Box::new(AcceptingEngine(HandshakeState::ServerStart)), rx))
    }
}

fuzz_target!(|data: &[u8]| {
    let config = match Config::builder()
        .min_initial_packet_size(1)
        .rng_seed(1)
        .build()
    {
        Ok(c) => c,
        Err(_) => return,
    };

    let (server, sessions) =
        StatelessServer::new(Arc::new(NullConn), Arc::new(config), Arc::new(AcceptingProvider));

    let _ = server.handle_packet(([192, 0, 2, 1], 4433).into(), data);
    drop(sessions);
});
