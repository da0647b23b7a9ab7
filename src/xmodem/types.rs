use crc::{Crc, CRC_16_XMODEM};

use crate::config::CHUNK_SIZE;

pub const SOH: u8 = 0x01;
pub const EOT: u8 = 0x04;
pub const ACK: u8 = 0x06;
pub const NAK: u8 = 0x15;
/// Asks the sender to start a CRC transfer.
pub const HANDSHAKE_BYTE: u8 = b'C';

pub const HEADER_SIZE: usize = 3;
pub const PAYLOAD_SIZE: usize = 128;
pub const CRC_SIZE: usize = 2;
pub const PACKET_SIZE: usize = HEADER_SIZE + PAYLOAD_SIZE + CRC_SIZE;

pub const PACKETS_PER_CHUNK: u32 = (CHUNK_SIZE / PAYLOAD_SIZE) as u32;

/// Poly 0x1021, init 0, no reflection, no final XOR.
pub const CRC_XMODEM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

const _: () = assert!(CHUNK_SIZE % PAYLOAD_SIZE == 0);

/// One 133 byte data packet: SOH, number, !number, payload, CRC16 (BE).
#[derive(Debug, Clone, Copy)]
pub struct Packet<'a> {
    bytes: &'a [u8; PACKET_SIZE],
}

#[derive(Debug, Clone, Copy)]
pub enum Frame<'a> {
    Data(Packet<'a>),
    EndOfTransmission,
    /// Anything else. Neither acknowledged nor rejected.
    Unrecognized,
}

impl<'a> Packet<'a> {
    pub fn number(&self) -> u8 {
        self.bytes[1]
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[HEADER_SIZE..HEADER_SIZE + PAYLOAD_SIZE]
    }

    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes([self.bytes[PACKET_SIZE - 2], self.bytes[PACKET_SIZE - 1]])
    }

    /// Only the payload is covered, the header is not part of the CRC.
    pub fn checksum_ok(&self) -> bool {
        CRC_XMODEM.checksum(self.payload()) == self.checksum()
    }
}

impl<'a> Frame<'a> {
    pub fn parse(input: &'a [u8]) -> Self {
        match input {
            [EOT] => Frame::EndOfTransmission,
            [SOH, ..] => match <&[u8; PACKET_SIZE]>::try_from(input) {
                Ok(bytes) => Frame::Data(Packet { bytes }),
                Err(_) => Frame::Unrecognized,
            },
            _ => Frame::Unrecognized,
        }
    }
}
