use embedded_hal::blocking::delay::DelayMs;

use crate::boot;
use crate::command;
use crate::config::CHUNK_SIZE;
use crate::flags::route;
use crate::flags::types::{Route, UpdateFlags};
use crate::flash::types::UpdateChunk;
use crate::flash::ChunkWriter;
use crate::fmt::{error, info, trace, warn};
use crate::hal::{Board, Parts};
use crate::types::Error;
use crate::xmodem::types::{Frame, ACK, HANDSHAKE_BYTE, NAK};
use crate::xmodem::Receiver;

/// What the main loop does after one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[must_use]
pub enum Step {
    Continue,
    /// Restart the MCU after the settle delay.
    Reset,
}

/// Update state owned by the main loop and lent to every handler.
///
/// Only touched from the main context, never from an interrupt.
pub struct Session {
    flags: UpdateFlags,
    chunk: UpdateChunk,
    receiver: Receiver,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub const fn new() -> Self {
        Self {
            flags: UpdateFlags::empty(),
            chunk: UpdateChunk::new(),
            receiver: Receiver::new(),
        }
    }

    pub fn flags(&self) -> UpdateFlags {
        self.flags
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn chunk(&self) -> &UpdateChunk {
        &self.chunk
    }

    pub(crate) fn chunk_mut(&mut self) -> &mut UpdateChunk {
        &mut self.chunk
    }

    pub(crate) fn arm(&mut self, flags: UpdateFlags) {
        self.apply(self.flags.union(flags));
    }

    pub(crate) fn disarm(&mut self, flags: UpdateFlags) {
        self.apply(self.flags.difference(flags));
    }

    fn apply(&mut self, next: UpdateFlags) {
        if next.is_legal() {
            self.flags = next;
        } else {
            error!("Illegal flag combination {:#x}, back to menu", next.bits());
            self.flags = UpdateFlags::empty();
        }
    }

    /// Arms the handshake and packet reception with a fresh counter.
    pub(crate) fn begin_transfer(&mut self, external: bool) {
        let mut flags = UpdateFlags::HANDSHAKE | UpdateFlags::RECEIVING;
        if external {
            flags.insert(UpdateFlags::EXTERNAL_TARGET);
        }
        self.receiver.reset();
        self.arm(flags);
    }

    /// Drops whatever was in progress and returns to the menu.
    pub(crate) fn abandon(&mut self) {
        self.flags = UpdateFlags::empty();
        self.receiver.reset();
    }

    /// Handles one main loop event. An empty `input` is an idle tick.
    pub fn dispatch<B: Board>(&mut self, parts: &mut Parts<B>, input: &[u8]) -> Step {
        match route(self.flags, !input.is_empty()) {
            Route::Idle => Step::Continue,
            Route::Handshake => {
                self.handshake(parts);
                Step::Continue
            }
            Route::PendingCopy => boot::copy_slot_to_partition(self, parts),
            Route::Command => command::process(self, parts, input),
            Route::Transfer => self.receive(parts, input),
            Route::DownloadSlot => command::select_download_slot(self, parts, input),
            Route::LoadSlot => command::select_load_slot(self, parts, input),
            Route::Version => command::init_version(self, parts, input),
            Route::Invalid => {
                warn!("Invalid flag value: {:#x}", self.flags.bits());
                Step::Continue
            }
        }
    }

    fn handshake<B: Board>(&mut self, parts: &mut Parts<B>) {
        parts.delay.delay_ms(1);
        if self.receiver.handshake_tick() {
            reply(parts, HANDSHAKE_BYTE);
        }
    }

    fn receive<B: Board>(&mut self, parts: &mut Parts<B>, input: &[u8]) -> Step {
        match Frame::parse(input) {
            Frame::Data(packet) => {
                if !packet.checksum_ok() {
                    warn!("Packet {} failed CRC check", packet.number());
                    reply(parts, NAK);
                    return Step::Continue;
                }

                self.disarm(UpdateFlags::HANDSHAKE);
                if let Some(index) = self.receiver.accept(&packet, &mut self.chunk) {
                    if let Err(e) = self.flush(parts, index, CHUNK_SIZE) {
                        error!("Failed to write chunk {}: {:?}", index, e);
                        self.abandon();
                        return Step::Continue;
                    }
                }

                reply(parts, ACK);
                Step::Continue
            }
            Frame::EndOfTransmission => {
                reply(parts, ACK);
                self.finish(parts)
            }
            Frame::Unrecognized => {
                trace!("Ignoring {} byte frame", input.len());
                Step::Continue
            }
        }
    }

    fn flush<B: Board>(&mut self, parts: &mut Parts<B>, index: u32, len: usize) -> Result<(), Error> {
        if self.flags.contains(UpdateFlags::EXTERNAL_TARGET) {
            parts.external.write_chunk(index, &self.chunk, len)
        } else {
            parts.internal.write_chunk(index, &self.chunk, len)
        }
    }

    /// End of transmission: flush the partial chunk, then either record the
    /// slot size and go back to the menu, or reset into the new application.
    fn finish<B: Board>(&mut self, parts: &mut Parts<B>) -> Step {
        let external = self.flags.contains(UpdateFlags::EXTERNAL_TARGET);

        if let Some((index, len)) = self.receiver.remainder() {
            if let Err(e) = self.flush(parts, index, len) {
                error!("Failed to write final chunk {}: {:?}", index, e);
                self.abandon();
                return Step::Continue;
            }
        }

        self.disarm(UpdateFlags::HANDSHAKE | UpdateFlags::RECEIVING | UpdateFlags::EXTERNAL_TARGET);

        if !external {
            info!("IAP update completed, restart!");
            return Step::Reset;
        }

        let slot = parts.external.slot();
        let size = self.receiver.received_bytes();
        match parts
            .store
            .update(&mut parts.delay, |r| r.set_image_size(slot, size))
        {
            Ok(_) => info!("Download completed! {} bytes in slot {}", size, slot),
            Err(e) => error!("Failed to record size of slot {}: {:?}", slot, e),
        }
        command::print_menu();

        Step::Continue
    }
}

/// Single-byte protocol answer. A UART that refuses it is logged, the sender retries on its own.
fn reply<B: Board>(parts: &mut Parts<B>, byte: u8) {
    if let Err(e) = parts.send(byte) {
        warn!("Failed to send {:#x}: {:?}", byte, e);
    }
}
