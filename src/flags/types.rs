use core::ops::BitOr;

/// Set of independent update conditions. Only the combinations in
/// [`UpdateFlags::LEGAL`] may be stored in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UpdateFlags(u32);

/// Handler selected for the next event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Route {
    /// Nothing armed and nothing received.
    Idle,
    Handshake,
    PendingCopy,
    Command,
    Transfer,
    DownloadSlot,
    LoadSlot,
    Version,
    /// Input arrived while only a no-input condition is armed.
    Invalid,
}

impl UpdateFlags {
    /// Send 'C' until the first packet arrives.
    pub const HANDSHAKE: Self = Self(0x01);
    pub const RECEIVING: Self = Self(0x02);
    pub const AWAIT_DOWNLOAD_SLOT: Self = Self(0x04);
    /// Transfer data goes to the selected external slot.
    pub const EXTERNAL_TARGET: Self = Self(0x08);
    pub const AWAIT_LOAD_SLOT: Self = Self(0x10);
    pub const PENDING_COPY: Self = Self(0x20);
    pub const AWAIT_VERSION: Self = Self(0x40);

    pub const LEGAL: [Self; 9] = [
        Self::empty(),
        Self::HANDSHAKE.union(Self::RECEIVING),
        Self::RECEIVING,
        Self::HANDSHAKE
            .union(Self::RECEIVING)
            .union(Self::EXTERNAL_TARGET),
        Self::RECEIVING.union(Self::EXTERNAL_TARGET),
        Self::AWAIT_DOWNLOAD_SLOT,
        Self::AWAIT_LOAD_SLOT,
        Self::PENDING_COPY,
        Self::AWAIT_VERSION,
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        *self = self.union(other);
    }

    pub fn remove(&mut self, other: Self) {
        *self = self.difference(other);
    }

    pub fn is_legal(self) -> bool {
        Self::LEGAL.contains(&self)
    }
}

impl BitOr for UpdateFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}
