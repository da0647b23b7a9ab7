//! [`System`] for Cortex-M3/M4 parts.

use cortex_m::peripheral::SCB;

use crate::boot::types::VectorTable;
use crate::hal::System;

/// Core control through the `cortex-m` crate. `deinit` puts the board's
/// clocks, UART, SPI and I2C back to their reset state before a jump.
pub struct CortexM<F: FnMut()> {
    deinit: F,
}

impl<F: FnMut()> CortexM<F> {
    pub fn new(deinit: F) -> Self {
        Self { deinit }
    }
}

impl<F: FnMut()> System for CortexM<F> {
    fn reset(&mut self) {
        SCB::sys_reset();
    }

    fn deinit_peripherals(&mut self) {
        (self.deinit)();
    }

    unsafe fn start_application(&mut self, vectors: &VectorTable) {
        cortex_m::interrupt::disable();

        let mut cp = cortex_m::Peripherals::steal();
        cp.SYST.disable_counter();
        cp.SYST.disable_interrupt();
        for (icer, icpr) in cp.NVIC.icer.iter().zip(cp.NVIC.icpr.iter()) {
            icer.write(u32::MAX);
            icpr.write(u32::MAX);
        }

        cp.SCB.vtor.write(vectors.base());
        cortex_m::asm::dsb();
        cortex_m::asm::isb();

        // A request raised before the counter stopped would still fire
        // through the application's table.
        SCB::clear_pendst();
        SCB::clear_pendsv();

        // Every source is masked in the NVIC, the application expects PRIMASK clear.
        cortex_m::interrupt::enable();

        // Loads MSP and PC from the table and branches, never returns.
        cortex_m::asm::bootload(vectors.base() as *const u32)
    }
}
