use nom::multi::many0;
use nom::number::complete::be_u32;

use super::long_header::connection_id_len_byte;
use super::LONG_HEADER_BIT;
use crate::buffer::Buf;
use crate::rng::SeededRng;
use crate::types::{ConnectionId, VersionNumber, PUBLIC_CONNECTION_ID_LEN};
use crate::util::NomError;
use crate::Error;

/// Version flag and connection ID flag of the public header.
const PUBLIC_NEGOTIATION_FLAGS: u8 = 0x01 | 0x08;

/// Parse the rest of a version negotiation packet as a list of version tags.
pub(super) fn parse_version_list(input: &[u8]) -> Result<(&[u8], Vec<VersionNumber>), Error> {
    if input.is_empty() {
        return Err(Error::InvalidVersionNegotiationPacket("empty version list"));
    }
    if input.len() % 4 != 0 {
        return Err(Error::InvalidVersionNegotiationPacket("truncated version tag"));
    }

    let (rest, tags) = many0(be_u32::<_, NomError>)(input)?;
    let versions = tags.into_iter().map(VersionNumber).collect();

    Ok((rest, versions))
}

/// Compose a public header version negotiation packet.
///
/// The versions are written verbatim after the echoed connection ID, which
/// must be 8 bytes like every public header connection ID.
pub fn compose_version_negotiation(
    connection_id: &ConnectionId,
    versions: &[VersionNumber],
) -> Result<Buf, Error> {
    if connection_id.len() != PUBLIC_CONNECTION_ID_LEN {
        return Err(Error::WrongConnectionIdLength(connection_id.len()));
    }

    let mut out = Buf::with_capacity(1 + connection_id.len() + 4 * versions.len());
    out.push(PUBLIC_NEGOTIATION_FLAGS);
    out.extend_from_slice(connection_id);
    for v in versions {
        out.extend_from_slice(&v.as_u32().to_be_bytes());
    }
    Ok(out)
}

/// Compose a long header version negotiation packet.
///
/// One reserved version is appended after `versions` so peers don't come to
/// rely on the list being exactly what they expect.
pub fn compose_long_version_negotiation(
    dest_connection_id: &ConnectionId,
    src_connection_id: &ConnectionId,
    versions: &[VersionNumber],
    rng: &mut SeededRng,
) -> Result<Buf, Error> {
    let lens = connection_id_len_byte(dest_connection_id, src_connection_id)?;

    let mut out = Buf::with_capacity(
        1 + 4 + 1 + dest_connection_id.len() + src_connection_id.len() + 4 * (versions.len() + 1),
    );
    out.push(rng.random::<u8>() | LONG_HEADER_BIT);
    out.extend_from_slice(&0u32.to_be_bytes());
    out.push(lens);
    out.extend_from_slice(dest_connection_id);
    out.extend_from_slice(src_connection_id);
    for v in versions {
        out.extend_from_slice(&v.as_u32().to_be_bytes());
    }
    let greased = VersionNumber::generate_reserved(rng);
    out.extend_from_slice(&greased.as_u32().to_be_bytes());

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Perspective;
    use crate::wire::{Header, HeaderForm};

    fn conn_id() -> ConnectionId {
        ConnectionId::new(&[0x13, 0x37, 0, 0, 0xde, 0xca, 0xfb, 0xad]).unwrap()
    }

    #[test]
    fn compose_public() {
        let versions = [VersionNumber(1001), VersionNumber(1003)];
        let data = compose_version_negotiation(&conn_id(), &versions).unwrap();
        assert_eq!(data[0], 0x09);
        assert_eq!(&data[1..9], &*conn_id());
        assert_eq!(&data[9..], &[0, 0, 0x03, 0xe9, 0, 0, 0x03, 0xeb]);
    }

    #[test]
    fn parse_composed_public() {
        let versions = [VersionNumber::TLS, VersionNumber::GQUIC_39];
        let data = compose_version_negotiation(&conn_id(), &versions).unwrap();
        let (rest, hdr) = Header::parse(&data, Perspective::Server).unwrap();
        assert!(rest.is_empty());
        assert_eq!(hdr.form, HeaderForm::Public);
        assert!(hdr.is_version_negotiation);
        assert!(hdr.has_version_flag());
        assert_eq!(hdr.version, None);
        assert_eq!(hdr.packet_number_len, None);
        assert_eq!(hdr.dest_connection_id, conn_id());
        assert_eq!(hdr.supported_versions, versions);
    }

    #[test]
    fn reject_empty_version_list() {
        let data = compose_version_negotiation(&conn_id(), &[]).unwrap();
        let err = Header::parse(&data, Perspective::Server).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid version negotiation packet: empty version list"
        );
    }

    #[test]
    fn reject_truncated_version_list() {
        let mut data = compose_version_negotiation(&conn_id(), &[VersionNumber::TLS]).unwrap();
        data.extend_from_slice(&[0x13, 0x37]);
        let err = Header::parse(&data, Perspective::Server).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidVersionNegotiationPacket("truncated version tag")
        ));
    }

    #[test]
    fn compose_public_rejects_bad_connection_id() {
        let short = ConnectionId::new(&[1, 2, 3, 4]).unwrap();
        let res = compose_version_negotiation(&short, &[VersionNumber::TLS]);
        assert!(matches!(res, Err(Error::WrongConnectionIdLength(4))));

        let res = compose_version_negotiation(&ConnectionId::empty(), &[VersionNumber::TLS]);
        assert!(matches!(res, Err(Error::WrongConnectionIdLength(0))));
    }

    #[test]
    fn compose_long_appends_reserved_version() {
        let mut rng = SeededRng::new(Some(42));
        let src = ConnectionId::new(&[1, 2, 3, 4, 5, 6]).unwrap();
        let versions = [VersionNumber::TLS];
        let data = compose_long_version_negotiation(&conn_id(), &src, &versions, &mut rng).unwrap();

        assert!(data[0] & 0x80 > 0);
        let (rest, hdr) = Header::parse(&data, Perspective::Server).unwrap();
        assert!(rest.is_empty());
        assert_eq!(hdr.form, HeaderForm::Long);
        assert!(hdr.is_version_negotiation);
        assert_eq!(hdr.version, None);
        assert_eq!(hdr.dest_connection_id, conn_id());
        assert_eq!(hdr.src_connection_id, src);
        assert_eq!(hdr.supported_versions.len(), 2);
        assert_eq!(hdr.supported_versions[0], VersionNumber::TLS);
        assert!(hdr.supported_versions[1].is_reserved());
    }

    #[test]
    fn compose_long_rejects_bad_connection_id() {
        let mut rng = SeededRng::new(Some(1));
        let short = ConnectionId::new(&[1, 2]).unwrap();
        let res = compose_long_version_negotiation(&short, &conn_id(), &[], &mut rng);
        assert!(matches!(res, Err(Error::InvalidConnectionIdLength(2))));
    }
}
