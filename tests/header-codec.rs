//! Header codec properties across both header forms.

use quicgate::{
    compose_version_negotiation, Buf, ConnectionId, DiversificationNonce, Error, Header,
    PacketNumberLen, PacketType, Perspective, VersionNumber,
};

fn conn_id(seed: u8, len: usize) -> ConnectionId {
    let bytes: Vec<u8> = (0..len as u8).map(|i| seed.wrapping_add(i) | 1).collect();
    ConnectionId::new(&bytes).unwrap()
}

fn roundtrip(hdr: &Header, sent_by: Perspective) {
    let mut out = Buf::new();
    hdr.write(&mut out, sent_by).unwrap();
    let len = hdr.encoded_len(sent_by).unwrap();
    assert_eq!(out.len(), len, "encoded_len for {}", hdr);

    out.extend_from_slice(b"payload");
    let (rest, mut parsed) = Header::parse(&out, sent_by).unwrap();
    assert_eq!(rest, b"payload");
    assert_eq!(parsed.raw.len(), len);

    parsed.raw = hdr.raw.clone();
    assert_eq!(&parsed, hdr);
}

#[test]
fn public_headers_roundtrip() {
    let _ = env_logger::try_init();

    let pn_lens = [
        (PacketNumberLen::Len1, 0xffu64),
        (PacketNumberLen::Len2, 0xbeef),
        (PacketNumberLen::Len4, 0xdecafbad),
    ];

    for (pn_len, pn) in pn_lens {
        let plain = Header::public(conn_id(0x10, 8), pn, pn_len);
        roundtrip(&plain, Perspective::Client);
        roundtrip(&plain, Perspective::Server);

        let with_version = Header {
            version: Some(VersionNumber::GQUIC_39),
            ..plain.clone()
        };
        roundtrip(&with_version, Perspective::Client);

        let with_nonce = Header {
            diversification_nonce: Some(DiversificationNonce([0x5a; 32])),
            ..plain.clone()
        };
        roundtrip(&with_nonce, Perspective::Server);

        let omitted = Header {
            omit_connection_id: true,
            dest_connection_id: ConnectionId::empty(),
            src_connection_id: ConnectionId::empty(),
            ..plain
        };
        roundtrip(&omitted, Perspective::Server);
    }

    roundtrip(&Header::public_reset(conn_id(0x20, 8)), Perspective::Server);
}

#[test]
fn long_headers_roundtrip() {
    let types = [
        (PacketType::Initial, Perspective::Client),
        (PacketType::ZeroRtt, Perspective::Client),
        (PacketType::Handshake, Perspective::Client),
        (PacketType::Handshake, Perspective::Server),
        (PacketType::Retry, Perspective::Server),
    ];

    for (packet_type, sent_by) in types {
        for (dest_len, src_len) in [(0, 0), (4, 18), (8, 8), (18, 0)] {
            for payload_len in [0, 63, 1200, 1 << 20] {
                let hdr = Header {
                    payload_len,
                    ..Header::long(
                        packet_type,
                        VersionNumber::TLS,
                        conn_id(0x30, dest_len),
                        conn_id(0x40, src_len),
                        0x1234_5678,
                    )
                };
                roundtrip(&hdr, sent_by);
            }
        }
    }
}

#[test]
fn six_byte_packet_numbers_are_rejected() {
    let mut packet = vec![0x38];
    packet.extend_from_slice(&conn_id(0x10, 8));
    packet.extend_from_slice(&[0x23, 0x42, 0xad, 0xfb, 0xca, 0xde, 0xff, 0xff]);

    for sent_by in [Perspective::Client, Perspective::Server] {
        let err = Header::parse(&packet, sent_by).unwrap_err();
        assert!(matches!(err, Error::InvalidPacketNumberLen6));
    }
}

#[test]
fn omitted_connection_id_only_from_server() {
    let packet = [0x00, 0x42, 0xff, 0xff];

    let err = Header::parse(&packet, Perspective::Client).unwrap_err();
    assert!(matches!(err, Error::ReceivedOmittedConnectionId));

    let (rest, hdr) = Header::parse(&packet, Perspective::Server).unwrap();
    assert!(hdr.omit_connection_id);
    assert!(hdr.dest_connection_id.is_empty());
    assert!(hdr.src_connection_id.is_empty());
    assert_eq!(hdr.packet_number, 0x42);
    assert_eq!(rest.len(), 2);
}

#[test]
fn composed_version_negotiation_parses_back() {
    let versions = [
        VersionNumber::TLS,
        VersionNumber::GQUIC_39,
        VersionNumber(0x1a2a3a4a),
    ];
    let packet = compose_version_negotiation(&conn_id(0x50, 8), &versions).unwrap();

    let (rest, hdr) = Header::parse(&packet, Perspective::Server).unwrap();
    assert!(rest.is_empty());
    assert!(hdr.is_version_negotiation);
    assert_eq!(hdr.version, None);
    assert_eq!(hdr.packet_number_len, None);
    assert_eq!(hdr.supported_versions, versions);
    assert!(hdr.supported_versions[2].is_reserved());
}

#[test]
fn version_negotiation_cannot_be_written() {
    let packet = compose_version_negotiation(&conn_id(0x50, 8), &[VersionNumber::TLS]).unwrap();
    let (_, hdr) = Header::parse(&packet, Perspective::Server).unwrap();

    let mut out = Buf::new();
    assert!(matches!(
        hdr.write(&mut out, Perspective::Server),
        Err(Error::WriteVersionNegotiation)
    ));
    assert!(matches!(
        hdr.encoded_len(Perspective::Server),
        Err(Error::LengthOfVersionNegotiation)
    ));
    assert!(out.is_empty());
}
