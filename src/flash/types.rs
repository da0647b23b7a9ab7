use crate::config::CHUNK_SIZE;

/// Scratch buffer moved to flash in one write. Reused across chunks.
#[derive(Clone)]
pub struct UpdateChunk {
    data: [u8; CHUNK_SIZE],
}

impl UpdateChunk {
    pub const fn new() -> Self {
        Self {
            data: [0xFF; CHUNK_SIZE],
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The first `len` bytes, clamped to the chunk size.
    pub fn bytes(&self, len: usize) -> &[u8] {
        &self.data[..len.min(CHUNK_SIZE)]
    }

    /// Copies `payload` in at `offset`. The caller keeps it inside the chunk.
    pub fn fill(&mut self, offset: usize, payload: &[u8]) {
        self.data[offset..offset + payload.len()].copy_from_slice(payload);
    }
}

impl Default for UpdateChunk {
    fn default() -> Self {
        Self::new()
    }
}
