use crate::config::types::Layout;
use crate::types::Error;

/// First two entries of the application's vector table, checked before the jump.
///
/// Can only be built through [`VectorTable::new`], so holding one means the
/// stack pointer lies in RAM and the reset handler inside the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VectorTable {
    base: u32,
    initial_sp: u32,
    reset_vector: u32,
}

impl VectorTable {
    pub fn new(initial_sp: u32, reset_vector: u32, layout: &Layout) -> Result<Self, Error> {
        if !layout.ram.holds_stack_pointer(initial_sp) {
            return Err(Error::InvalidStackPointer(initial_sp));
        }
        // Thumb bit set on every Cortex-M handler address.
        if !layout.app.contains(reset_vector & !1) {
            return Err(Error::InvalidResetVector(reset_vector));
        }

        Ok(Self {
            base: layout.app.start,
            initial_sp,
            reset_vector,
        })
    }

    /// Address VTOR gets pointed at.
    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn initial_sp(&self) -> u32 {
        self.initial_sp
    }

    pub fn reset_vector(&self) -> u32 {
        self.reset_vector
    }
}

/// How [`Bootloader::boot`](super::Bootloader::boot) ended, when it returns at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootOutcome {
    /// Stay in the command line.
    Interactive,
    /// A reset was requested.
    Reset,
    /// Control went to the application.
    Launched,
}
