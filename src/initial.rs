//! Unwrapping and wrapping the single frame of an Initial packet.

use crate::buffer::Buf;
use crate::crypto::Aead;
use crate::frame::{parse_next_frame, Frame, StreamFrame};
use crate::types::{Perspective, VersionNumber};
use crate::wire::Header;
use crate::Error;

/// Open an Initial packet and return the handshake data it carries.
///
/// `data` is the packet after the header. The first frame must be a
/// STREAM frame on the crypto stream of `version`, starting at offset 0.
pub fn unpack_initial_packet(
    aead: &dyn Aead,
    hdr: &Header,
    data: &[u8],
    version: VersionNumber,
) -> Result<StreamFrame, Error> {
    let decrypted = aead.open(data, hdr.packet_number, &hdr.raw)?;

    let frame = match parse_next_frame(&decrypted)? {
        (_, Some(Frame::Stream(f))) => f,
        _ => return Err(Error::NoStreamFrame),
    };

    if frame.stream_id != version.crypto_stream_id() {
        return Err(Error::WrongStream(frame.stream_id));
    }
    if frame.offset != 0 {
        return Err(Error::NonZeroOffset);
    }

    trace!(
        "Unpacked {} bytes of handshake data from packet {:#x}",
        frame.data.len(),
        hdr.packet_number
    );

    Ok(frame)
}

/// Build a packet carrying a single frame, sealed with `aead`.
///
/// For long headers `payload_len` is set to the sealed frame length; the
/// value in `hdr` is ignored.
pub fn pack_unencrypted_packet(
    aead: &dyn Aead,
    hdr: &Header,
    frame: &Frame,
    sent_by: Perspective,
) -> Result<Buf, Error> {
    let frame_len = frame.encoded_len()?;

    let mut hdr = hdr.clone();
    if hdr.is_long_header() {
        hdr.payload_len = (frame_len + aead.overhead()) as u64;
    }

    let header_len = hdr.encoded_len(sent_by)?;
    let mut packet = Buf::with_capacity(header_len + frame_len + aead.overhead());
    hdr.write(&mut packet, sent_by)?;

    let mut payload = Buf::with_capacity(frame_len + aead.overhead());
    frame.serialize(&mut payload)?;
    aead.seal(&mut payload, hdr.packet_number, &packet)?;

    packet.extend_from_slice(&payload);
    Ok(packet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::NullAead;
    use crate::frame::ConnectionCloseFrame;
    use crate::types::{ConnectionId, PacketType};

    fn dest() -> ConnectionId {
        ConnectionId::new(&[0xde, 0xad, 0xbe, 0xef, 0xca, 0xfe, 0x13, 0x37]).unwrap()
    }

    fn src() -> ConnectionId {
        ConnectionId::new(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap()
    }

    fn client_aead() -> NullAead {
        NullAead::new(Perspective::Client, &dest(), VersionNumber::TLS).unwrap()
    }

    fn server_aead() -> NullAead {
        NullAead::new(Perspective::Server, &dest(), VersionNumber::TLS).unwrap()
    }

    fn client_packet(frame: Frame) -> Buf {
        let hdr = Header::long(PacketType::Initial, VersionNumber::TLS, dest(), src(), 0x42);
        pack_unencrypted_packet(&client_aead(), &hdr, &frame, Perspective::Client).unwrap()
    }

    fn unpack(packet: &[u8]) -> Result<StreamFrame, Error> {
        let (data, hdr) = Header::parse(packet, Perspective::Client)?;
        unpack_initial_packet(&server_aead(), &hdr, data, VersionNumber::TLS)
    }

    #[test]
    fn unpack_handshake_data() {
        let packet = client_packet(Frame::Stream(StreamFrame::new(0, b"client hello".to_vec())));
        let frame = unpack(&packet).unwrap();
        assert_eq!(frame.stream_id, 0);
        assert_eq!(frame.data, b"client hello");
    }

    #[test]
    fn payload_len_matches_sealed_payload() {
        let frame = Frame::Stream(StreamFrame::new(0, b"foobar".to_vec()));
        let packet = client_packet(frame.clone());
        let (data, hdr) = Header::parse(&packet, Perspective::Client).unwrap();
        assert_eq!(hdr.payload_len as usize, data.len());
        assert_eq!(data.len(), frame.encoded_len().unwrap() + 16);
    }

    #[test]
    fn padding_before_stream_frame() {
        let hdr = Header::long(PacketType::Initial, VersionNumber::TLS, dest(), src(), 1);
        let mut packet = Buf::new();
        hdr.write(&mut packet, Perspective::Client).unwrap();
        let mut payload = Buf::from_slice(&[0, 0, 0]);
        Frame::Stream(StreamFrame::new(0, b"ch".to_vec()))
            .serialize(&mut payload)
            .unwrap();
        client_aead().seal(&mut payload, 1, &packet).unwrap();
        packet.extend_from_slice(&payload);

        assert_eq!(unpack(&packet).unwrap().data, b"ch");
    }

    #[test]
    fn reject_other_frame() {
        let packet = client_packet(Frame::ConnectionClose(ConnectionCloseFrame::new(1, "")));
        let err = unpack(&packet).unwrap_err();
        assert_eq!(err.to_string(), "packet doesn't contain a STREAM_FRAME");

        let packet = client_packet(Frame::Ping);
        assert!(matches!(unpack(&packet), Err(Error::NoStreamFrame)));
    }

    #[test]
    fn reject_wrong_stream() {
        let packet = client_packet(Frame::Stream(StreamFrame::new(3, b"foobar".to_vec())));
        let err = unpack(&packet).unwrap_err();
        assert_eq!(
            err.to_string(),
            "received STREAM_FRAME for wrong stream (stream ID 3)"
        );
    }

    #[test]
    fn reject_non_zero_offset() {
        let frame = StreamFrame {
            offset: 10,
            ..StreamFrame::new(0, b"foobar".to_vec())
        };
        let packet = client_packet(Frame::Stream(frame));
        let err = unpack(&packet).unwrap_err();
        assert_eq!(err.to_string(), "received stream data with non-zero offset");
    }

    #[test]
    fn reject_tampered_packet() {
        let mut packet = client_packet(Frame::Stream(StreamFrame::new(0, b"foobar".to_vec())));
        let last = packet.len() - 1;
        packet[last] ^= 0x01;
        assert!(matches!(unpack(&packet), Err(Error::DecryptionFailed)));
    }

    #[test]
    fn reject_tampered_header() {
        let mut packet = client_packet(Frame::Stream(StreamFrame::new(0, b"foobar".to_vec())));
        // Last byte of the packet number.
        packet[1 + 4 + 1 + 8 + 8 + 1 + 3] ^= 0x01;
        assert!(unpack(&packet).is_err());
    }

    #[test]
    fn server_reply_opens_on_client() {
        let hdr = Header::long(PacketType::Handshake, VersionNumber::TLS, src(), dest(), 1);
        let frame = Frame::ConnectionClose(ConnectionCloseFrame::new(28, "no"));
        let packet =
            pack_unencrypted_packet(&server_aead(), &hdr, &frame, Perspective::Server).unwrap();

        let (data, hdr) = Header::parse(&packet, Perspective::Server).unwrap();
        let opened = client_aead().open(data, hdr.packet_number, &hdr.raw).unwrap();
        let (_, parsed) = parse_next_frame(&opened).unwrap();
        assert_eq!(parsed, Some(frame));
    }
}
