// Public interfaces.
pub mod types;

use crate::config::HANDSHAKE_INTERVAL_MS;
use crate::flash::types::UpdateChunk;

use self::types::{Packet, PACKETS_PER_CHUNK, PAYLOAD_SIZE};

/// Packet bookkeeping for one XMODEM-CRC transfer.
///
/// The receiver never talks to flash itself. It places payloads into the
/// [`UpdateChunk`] and reports which chunk index became full.
#[derive(Debug, Clone, Default)]
pub struct Receiver {
    packets: u32,
    handshake_ms: u32,
}

impl Receiver {
    pub const fn new() -> Self {
        Self {
            packets: 0,
            handshake_ms: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn packet_count(&self) -> u32 {
        self.packets
    }

    pub fn received_bytes(&self) -> u32 {
        self.packets * PAYLOAD_SIZE as u32
    }

    /// Stores a checksum-valid packet. Returns the chunk index once the chunk is full.
    pub fn accept(&mut self, packet: &Packet<'_>, chunk: &mut UpdateChunk) -> Option<u32> {
        self.packets += 1;

        let position = (self.packets - 1) % PACKETS_PER_CHUNK;
        chunk.fill(position as usize * PAYLOAD_SIZE, packet.payload());

        if self.packets % PACKETS_PER_CHUNK == 0 {
            Some(self.packets / PACKETS_PER_CHUNK - 1)
        } else {
            None
        }
    }

    /// Chunk index and byte count still sitting in the chunk at end of transmission.
    pub fn remainder(&self) -> Option<(u32, usize)> {
        let pending = self.packets % PACKETS_PER_CHUNK;
        if pending == 0 {
            return None;
        }

        Some((
            self.packets / PACKETS_PER_CHUNK,
            pending as usize * PAYLOAD_SIZE,
        ))
    }

    /// Called once per millisecond while the handshake is armed. True when a 'C' is due.
    pub fn handshake_tick(&mut self) -> bool {
        let due = self.handshake_ms >= HANDSHAKE_INTERVAL_MS;
        if due {
            self.handshake_ms = 0;
        }
        self.handshake_ms += 1;

        due
    }
}
