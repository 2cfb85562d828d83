use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use super::checksum::checksum;
use super::PacketError;

pub const ICMP_ECHO_REQUEST: u8 = 8;
pub const ICMP_ECHO_REPLY: u8 = 0;

pub const ICMP_HEADER_LEN: usize = 8;
/// Raw IPv4 ICMP sockets hand back the whole datagram; the ICMP header
/// is read at this fixed offset.
pub const IPV4_HEADER_LEN: usize = 20;
pub const DEFAULT_PAYLOAD_SIZE: usize = 59;
/// Filler byte for echo payloads (ASCII 'Q').
pub const PAYLOAD_FILL: u8 = b'Q';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
}

impl IcmpHeader {
    pub fn echo_request(identifier: u16, sequence: u16) -> Self {
        Self {
            icmp_type: ICMP_ECHO_REQUEST,
            code: 0,
            checksum: 0,
            identifier,
            sequence,
        }
    }

    pub fn is_echo_reply(&self) -> bool {
        self.icmp_type == ICMP_ECHO_REPLY
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        // Writes into a Vec cannot fail
        let _ = out.write_u8(self.icmp_type);
        let _ = out.write_u8(self.code);
        let _ = out.write_u16::<BigEndian>(self.checksum);
        let _ = out.write_u16::<BigEndian>(self.identifier);
        let _ = out.write_u16::<BigEndian>(self.sequence);
    }

    fn read_from(data: &[u8]) -> std::io::Result<Self> {
        let mut cursor = Cursor::new(data);
        Ok(Self {
            icmp_type: cursor.read_u8()?,
            code: cursor.read_u8()?,
            checksum: cursor.read_u16::<BigEndian>()?,
            identifier: cursor.read_u16::<BigEndian>()?,
            sequence: cursor.read_u16::<BigEndian>()?,
        })
    }
}

/// Builds an echo request: header with a zero checksum plus `payload_size`
/// filler bytes, checksummed, then re-encoded with the real checksum.
pub fn encode_echo_request(identifier: u16, sequence: u16, payload_size: usize) -> Vec<u8> {
    encode(IcmpHeader::echo_request(identifier, sequence), payload_size)
}

/// Same layout as a request but typed as a reply. Used by the in-memory
/// sockets in tests to answer a request.
#[cfg(test)]
pub fn encode_echo_reply(identifier: u16, sequence: u16, payload_size: usize) -> Vec<u8> {
    let mut header = IcmpHeader::echo_request(identifier, sequence);
    header.icmp_type = ICMP_ECHO_REPLY;
    encode(header, payload_size)
}

fn encode(mut header: IcmpHeader, payload_size: usize) -> Vec<u8> {
    let payload = vec![PAYLOAD_FILL; payload_size];

    header.checksum = 0;
    let mut packet = Vec::with_capacity(ICMP_HEADER_LEN + payload_size);
    header.write_to(&mut packet);
    packet.extend_from_slice(&payload);

    header.checksum = checksum(&packet);
    packet.clear();
    header.write_to(&mut packet);
    packet.extend_from_slice(&payload);
    packet
}

/// Parses the ICMP header that follows the 20-byte IPv4 header of a
/// datagram read from a raw socket.
pub fn decode_icmp_header(datagram: &[u8]) -> Result<IcmpHeader, PacketError> {
    let end = IPV4_HEADER_LEN + ICMP_HEADER_LEN;
    if datagram.len() < end {
        return Err(PacketError::Malformed { len: datagram.len() });
    }
    IcmpHeader::read_from(&datagram[IPV4_HEADER_LEN..end])
        .map_err(|_| PacketError::Malformed { len: datagram.len() })
}

/// Parses the header of a bare ICMP message (no IP header in front).
#[cfg(test)]
pub fn decode_bare_header(message: &[u8]) -> Result<IcmpHeader, PacketError> {
    if message.len() < ICMP_HEADER_LEN {
        return Err(PacketError::Malformed { len: message.len() });
    }
    IcmpHeader::read_from(&message[..ICMP_HEADER_LEN])
        .map_err(|_| PacketError::Malformed { len: message.len() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icmp::checksum;

    fn with_ip_filler(icmp: &[u8]) -> Vec<u8> {
        let mut datagram = vec![0u8; IPV4_HEADER_LEN];
        datagram.extend_from_slice(icmp);
        datagram
    }

    #[test]
    fn test_echo_request_layout() {
        let packet = encode_echo_request(0x1234, 1, DEFAULT_PAYLOAD_SIZE);
        assert_eq!(packet.len(), ICMP_HEADER_LEN + DEFAULT_PAYLOAD_SIZE);
        assert_eq!(packet[0], ICMP_ECHO_REQUEST);
        assert_eq!(packet[1], 0);
        assert_eq!(&packet[4..6], &[0x12, 0x34]);
        assert_eq!(&packet[6..8], &[0x00, 0x01]);
        assert!(packet[8..].iter().all(|&b| b == b'Q'));
    }

    #[test]
    fn test_embedded_checksum_matches_recomputation() {
        let packet = encode_echo_request(4321, 7, 59);
        let embedded = u16::from_be_bytes([packet[2], packet[3]]);

        let mut zeroed = packet.clone();
        zeroed[2] = 0;
        zeroed[3] = 0;
        assert_eq!(checksum::checksum(&zeroed), embedded);
        assert!(checksum::verify(&packet));
    }

    #[test]
    fn test_odd_payload_checksum() {
        let packet = encode_echo_request(1, 1, 3);
        assert!(checksum::verify(&packet));
    }

    #[test]
    fn test_decode_synthetic_datagram() {
        let datagram = with_ip_filler(&encode_echo_request(0xBEEF, 3, 0));
        assert_eq!(datagram.len(), 28);

        let header = decode_icmp_header(&datagram).unwrap();
        assert_eq!(header.identifier, 0xBEEF);
        assert_eq!(header.icmp_type, ICMP_ECHO_REQUEST);
        assert_eq!(header.sequence, 3);
        assert!(!header.is_echo_reply());
    }

    #[test]
    fn test_decode_reply() {
        let datagram = with_ip_filler(&encode_echo_reply(77, 2, 59));
        let header = decode_icmp_header(&datagram).unwrap();
        assert!(header.is_echo_reply());
        assert_eq!(header.identifier, 77);
    }

    #[test]
    fn test_decode_short_datagram() {
        let err = decode_icmp_header(&[0u8; 27]).unwrap_err();
        assert_eq!(err, PacketError::Malformed { len: 27 });
        assert!(decode_bare_header(&[8, 0, 0]).is_err());
    }

    #[test]
    fn test_decode_bare_header() {
        let header = decode_bare_header(&encode_echo_request(9, 10, 4)).unwrap();
        assert_eq!(header, IcmpHeader { checksum: header.checksum, ..IcmpHeader::echo_request(9, 10) });
    }
}
