use crate::types::{VersionNumber, MAX_CONNECTION_ID_LEN, MIN_CONNECTION_ID_LEN};
use crate::Error;

/// Smallest Initial packet a server will process.
pub const MIN_INITIAL_PACKET_SIZE: usize = 1200;

/// Stateless server configuration
#[derive(Debug, Clone)]
pub struct Config {
    supported_versions: Vec<VersionNumber>,
    min_initial_packet_size: usize,
    connection_id_len: usize,
    crypto_stream_capacity: usize,
    session_queue: Option<usize>,
    rng_seed: Option<u64>,
}

impl Config {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            supported_versions: vec![VersionNumber::TLS],
            min_initial_packet_size: MIN_INITIAL_PACKET_SIZE,
            connection_id_len: 8,
            crypto_stream_capacity: 16384,
            session_queue: None,
            rng_seed: None,
        }
    }

    /// Versions this server accepts, in order of preference.
    ///
    /// Also the list sent in version negotiation packets.
    #[inline(always)]
    pub fn supported_versions(&self) -> &[VersionNumber] {
        &self.supported_versions
    }

    #[inline(always)]
    pub fn is_supported_version(&self, version: VersionNumber) -> bool {
        self.supported_versions.contains(&version)
    }

    /// Initial packets smaller than this are dropped.
    #[inline(always)]
    pub fn min_initial_packet_size(&self) -> usize {
        self.min_initial_packet_size
    }

    /// Length of the connection IDs the server picks.
    #[inline(always)]
    pub fn connection_id_len(&self) -> usize {
        self.connection_id_len
    }

    /// Bytes a handshake engine may write before they are taken.
    #[inline(always)]
    pub fn crypto_stream_capacity(&self) -> usize {
        self.crypto_stream_capacity
    }

    /// Bound of the session handoff channel. `None` is unbounded.
    #[inline(always)]
    pub fn session_queue(&self) -> Option<usize> {
        self.session_queue
    }

    /// Seed for connection IDs and greased versions.
    #[inline(always)]
    pub fn rng_seed(&self) -> Option<u64> {
        self.rng_seed
    }
}

/// Builder for the stateless server configuration.
pub struct ConfigBuilder {
    supported_versions: Vec<VersionNumber>,
    min_initial_packet_size: usize,
    connection_id_len: usize,
    crypto_stream_capacity: usize,
    session_queue: Option<usize>,
    rng_seed: Option<u64>,
}

impl ConfigBuilder {
    /// Set the supported versions.
    ///
    /// Defaults to the TLS development version only.
    pub fn supported_versions(mut self, versions: impl Into<Vec<VersionNumber>>) -> Self {
        self.supported_versions = versions.into();
        self
    }

    /// Set the smallest Initial packet to process.
    ///
    /// Defaults to 1200.
    pub fn min_initial_packet_size(mut self, size: usize) -> Self {
        self.min_initial_packet_size = size;
        self
    }

    /// Set the length of server chosen connection IDs, 4 to 18 bytes.
    ///
    /// Defaults to 8.
    pub fn connection_id_len(mut self, len: usize) -> Self {
        self.connection_id_len = len;
        self
    }

    /// Defaults to 16384.
    pub fn crypto_stream_capacity(mut self, capacity: usize) -> Self {
        self.crypto_stream_capacity = capacity;
        self
    }

    /// Bound the session handoff channel.
    ///
    /// Defaults to unbounded. With a bound, the server blocks on handoff
    /// while the queue is full.
    pub fn session_queue(mut self, bound: usize) -> Self {
        self.session_queue = Some(bound);
        self
    }

    /// Seed the random number generator for deterministic behavior.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Build the configuration.
    ///
    /// Returns `Error::Config` for values the server can't work with.
    pub fn build(self) -> Result<Config, Error> {
        if self.supported_versions.is_empty() {
            return Err(Error::Config("no supported versions"));
        }
        if self.min_initial_packet_size == 0 {
            return Err(Error::Config("min_initial_packet_size must be non-zero"));
        }
        if !(MIN_CONNECTION_ID_LEN..=MAX_CONNECTION_ID_LEN).contains(&self.connection_id_len) {
            return Err(Error::Config("connection_id_len must be 4 to 18 bytes"));
        }
        if self.crypto_stream_capacity == 0 {
            return Err(Error::Config("crypto_stream_capacity must be non-zero"));
        }

        Ok(Config {
            supported_versions: self.supported_versions,
            min_initial_packet_size: self.min_initial_packet_size,
            connection_id_len: self.connection_id_len,
            crypto_stream_capacity: self.crypto_stream_capacity,
            session_queue: self.session_queue,
            rng_seed: self.rng_seed,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            supported_versions: vec![VersionNumber::TLS],
            min_initial_packet_size: MIN_INITIAL_PACKET_SIZE,
            connection_id_len: 8,
            crypto_stream_capacity: 16384,
            session_queue: None,
            rng_seed: None,
        }
    }
}
