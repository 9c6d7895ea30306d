use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory duplex buffer between a handshake engine and the packet layer.
///
/// The engine reads the peer's handshake bytes and writes its own through
/// [`io::Read`] and [`io::Write`]. The packet layer feeds the former with
/// [`add_data_for_reading`](Self::add_data_for_reading) and drains the
/// latter with [`take_written`](Self::take_written).
///
/// Clones share the same buffers, so one handle can go to the engine while
/// the caller keeps another.
#[derive(Clone)]
pub struct CryptoStreamConn {
    remote: SocketAddr,
    inner: Arc<Mutex<Pipe>>,
}

struct Pipe {
    incoming: VecDeque<u8>,
    outgoing: Vec<u8>,
    capacity: usize,
}

impl CryptoStreamConn {
    /// `capacity` bounds the bytes written and not yet taken.
    pub fn new(remote: SocketAddr, capacity: usize) -> Self {
        CryptoStreamConn {
            remote,
            inner: Arc::new(Mutex::new(Pipe {
                incoming: VecDeque::new(),
                outgoing: Vec::new(),
                capacity,
            })),
        }
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    /// Queue bytes received from the peer.
    pub fn add_data_for_reading(&self, data: &[u8]) -> io::Result<()> {
        self.lock()?.incoming.extend(data);
        Ok(())
    }

    /// Take everything the engine wrote so far.
    pub fn take_written(&self) -> io::Result<Vec<u8>> {
        Ok(std::mem::take(&mut self.lock()?.outgoing))
    }

    /// Number of received bytes not yet read.
    pub fn pending_read(&self) -> io::Result<usize> {
        Ok(self.lock()?.incoming.len())
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, Pipe>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "crypto stream lock poisoned"))
    }
}

impl io::Read for CryptoStreamConn {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut pipe = self.lock()?;
        if pipe.incoming.is_empty() && !buf.is_empty() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        io::Read::read(&mut pipe.incoming, buf)
    }
}

impl io::Write for CryptoStreamConn {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut pipe = self.lock()?;
        let room = pipe.capacity.saturating_sub(pipe.outgoing.len());
        if room == 0 && !buf.is_empty() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let n = room.min(buf.len());
        pipe.outgoing.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for CryptoStreamConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoStreamConn")
            .field("remote", &self.remote)
            .finish()
    }
}
