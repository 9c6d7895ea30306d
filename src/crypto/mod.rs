//! Packet protection for Initial packets.
//!
//! Before a handshake has produced keys, packets are protected with the
//! "null" AEAD. Its keys are derived from the connection ID the client
//! picked, so both sides and any observer can compute them. The protection
//! guards against corruption and off-path injection, not against reading.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Key, Nonce};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::buffer::Buf;
use crate::types::{ConnectionId, PacketNumber, Perspective, VersionNumber};
use crate::Error;

/// Salt for extracting the handshake secret from the connection ID.
const HANDSHAKE_SALT: [u8; 20] = [
    0xaf, 0xc8, 0x24, 0xec, 0x5f, 0xc7, 0x7e, 0xca, 0x1e, 0x9d, 0x36, 0xf3, 0x7f, 0xb2, 0xd4,
    0x65, 0x18, 0xc3, 0x66, 0x39,
];

const SECRET_LEN: usize = 32;
const KEY_LEN: usize = 16;
const IV_LEN: usize = 12;

/// GCM authentication tag length.
pub const AEAD_TAG_LEN: usize = 16;

/// Seals and opens packet payloads.
pub trait Aead: Send + Sync {
    /// Encrypt `payload` in place and append the tag.
    fn seal(&self, payload: &mut Buf, packet_number: PacketNumber, ad: &[u8]) -> Result<(), Error>;

    /// Authenticate and decrypt `ciphertext`.
    fn open(&self, ciphertext: &[u8], packet_number: PacketNumber, ad: &[u8]) -> Result<Buf, Error>;

    /// Bytes added by [`Aead::seal`].
    fn overhead(&self) -> usize;
}

struct DirectionalKey {
    cipher: Aes128Gcm,
    iv: [u8; IV_LEN],
}

impl DirectionalKey {
    fn derive(secret: &[u8]) -> Result<Self, Error> {
        let key = Zeroizing::new(hkdf_expand_label::<KEY_LEN>(secret, b"key")?);
        let iv = hkdf_expand_label::<IV_LEN>(secret, b"iv")?;
        let cipher = Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(&*key));
        Ok(DirectionalKey { cipher, iv })
    }

    /// iv XOR the packet number, right aligned.
    fn nonce(&self, packet_number: PacketNumber) -> [u8; IV_LEN] {
        let mut nonce = self.iv;
        let pn = packet_number.to_be_bytes();
        for (n, p) in nonce[IV_LEN - 8..].iter_mut().zip(pn.iter()) {
            *n ^= p;
        }
        nonce
    }
}

/// AES-128-GCM keyed from the client's destination connection ID.
pub struct NullAead {
    own: DirectionalKey,
    peer: DirectionalKey,
}

impl NullAead {
    /// Create the null AEAD as seen by `perspective`.
    ///
    /// Only versions that run the handshake over TLS have one.
    pub fn new(
        perspective: Perspective,
        connection_id: &ConnectionId,
        version: VersionNumber,
    ) -> Result<Self, Error> {
        if !version.uses_tls() {
            return Err(Error::UnsupportedVersion(version));
        }

        let (prk, _) = Hkdf::<Sha256>::extract(Some(&HANDSHAKE_SALT[..]), connection_id);

        let client_secret = Zeroizing::new(hkdf_expand_label::<SECRET_LEN>(&prk, b"client hs")?);
        let server_secret = Zeroizing::new(hkdf_expand_label::<SECRET_LEN>(&prk, b"server hs")?);

        let client = DirectionalKey::derive(&*client_secret)?;
        let server = DirectionalKey::derive(&*server_secret)?;

        let (own, peer) = match perspective {
            Perspective::Client => (client, server),
            Perspective::Server => (server, client),
        };

        Ok(NullAead { own, peer })
    }
}

impl Aead for NullAead {
    fn seal(&self, payload: &mut Buf, packet_number: PacketNumber, ad: &[u8]) -> Result<(), Error> {
        let nonce = self.own.nonce(packet_number);
        self.own
            .cipher
            .encrypt_in_place(Nonce::from_slice(&nonce), ad, payload)
            .map_err(|_| Error::EncryptionFailed)
    }

    fn open(&self, ciphertext: &[u8], packet_number: PacketNumber, ad: &[u8]) -> Result<Buf, Error> {
        if ciphertext.len() < AEAD_TAG_LEN {
            return Err(Error::DecryptionFailed);
        }
        let nonce = self.peer.nonce(packet_number);
        let mut plaintext = Buf::from_slice(ciphertext);
        self.peer
            .cipher
            .decrypt_in_place(Nonce::from_slice(&nonce), ad, &mut plaintext)
            .map_err(|_| Error::DecryptionFailed)?;
        Ok(plaintext)
    }

    fn overhead(&self) -> usize {
        AEAD_TAG_LEN
    }
}

impl std::fmt::Debug for NullAead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NullAead").finish_non_exhaustive()
    }
}

/// HKDF-Expand with the "QUIC " label prefix and no context.
///
/// ```text
/// u16 length || u8 label length || "QUIC " || label
/// ```
fn hkdf_expand_label<const N: usize>(secret: &[u8], label: &[u8]) -> Result<[u8; N], Error> {
    const PREFIX: &[u8] = b"QUIC ";

    let mut info = Vec::with_capacity(3 + PREFIX.len() + label.len());
    info.extend_from_slice(&(N as u16).to_be_bytes());
    info.push((PREFIX.len() + label.len()) as u8);
    info.extend_from_slice(PREFIX);
    info.extend_from_slice(label);

    let hk = Hkdf::<Sha256>::from_prk(secret).map_err(|_| Error::EncryptionFailed)?;
    let mut out = [0u8; N];
    hk.expand(&info, &mut out)
        .map_err(|_| Error::EncryptionFailed)?;
    Ok(out)
}
