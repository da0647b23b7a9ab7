// Public interfaces.
pub mod types;


use embedded_hal::blocking::delay::DelayMs;

use crate::command::print_menu;
use crate::config::types::Layout;
use crate::config::{BOOT_WINDOW_MS, CHUNK_SIZE, ENTRY_KEYS, OTA_SLOT, RESET_DELAY_MS};
use crate::flags::types::UpdateFlags;
use crate::flash::ChunkWriter;
use crate::fmt::{error, info, warn};
use crate::hal::{Board, Console, Parts, Peripherals, System};
use crate::session::{Session, Step};
use crate::types::Error;

use self::types::{BootOutcome, VectorTable};

/// The whole update engine: session state plus the board's drivers.
pub struct Bootloader<B: Board> {
    session: Session,
    parts: Parts<B>,
    layout: Layout,
}

impl<B: Board> Bootloader<B> {
    pub fn new(layout: &Layout, peripherals: Peripherals<B>) -> Result<Self, Error> {
        Ok(Self {
            session: Session::new(),
            parts: Parts::new(layout, peripherals)?,
            layout: *layout,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn parts(&self) -> &Parts<B> {
        &self.parts
    }

    pub fn parts_mut(&mut self) -> &mut Parts<B> {
        &mut self.parts
    }

    /// Runs once after reset.
    ///
    /// Waits for the entry key, then either copies a pending OTA image out of
    /// slot 0 or jumps to the application. A rejected copy or jump falls back
    /// to the command line.
    pub fn boot(&mut self) -> BootOutcome {
        info!(
            "Bootloader: Press 'w' within {} seconds to enter command line.",
            BOOT_WINDOW_MS / 1000
        );

        if self.wait_for_entry_key() {
            return self.enter_command_line();
        }

        if self.update_pending() {
            info!("OTA upgrade!");
            self.parts.external.select_slot(OTA_SLOT);
            self.session.arm(UpdateFlags::PENDING_COPY);

            if copy_slot_to_partition(&mut self.session, &mut self.parts) == Step::Reset {
                self.restart();
                return BootOutcome::Reset;
            }
            return self.enter_command_line();
        }

        info!("Bootloader: Jump to APP...");
        match self.launch() {
            Ok(()) => BootOutcome::Launched,
            Err(e) => {
                warn!("Jump aborted: {:?}", e);
                self.enter_command_line()
            }
        }
    }

    /// One main loop iteration: dispatch the next input segment, or an idle tick.
    pub fn poll(&mut self) -> Step {
        let segment = self.parts.console.poll_segment();
        let input = segment.as_deref().unwrap_or(&[]);

        let step = self.session.dispatch(&mut self.parts, input);
        if step == Step::Reset {
            self.restart();
        }

        step
    }

    pub fn run(mut self) -> ! {
        if self.boot() == BootOutcome::Launched {
            error!("Application returned to the bootloader");
        }

        loop {
            let _ = self.poll();
        }
    }

    fn enter_command_line(&mut self) -> BootOutcome {
        info!("Bootloader: Enter command line.");
        print_menu();
        BootOutcome::Interactive
    }

    fn wait_for_entry_key(&mut self) -> bool {
        for _ in 0..BOOT_WINDOW_MS {
            if let Some(segment) = self.parts.console.poll_segment() {
                if let [key] = segment.as_slice() {
                    if ENTRY_KEYS.contains(key) {
                        return true;
                    }
                }
            }
            self.parts.delay.delay_ms(1);
        }

        false
    }

    /// An unreadable record counts as "nothing pending".
    fn update_pending(&mut self) -> bool {
        match self.parts.store.load() {
            Ok(record) if record.is_update_pending() => true,
            Ok(record) => {
                info!("No OTA event, OTA flag: {:#x}", record.update_pending);
                false
            }
            Err(e) => {
                error!("Cannot check OTA flag: {:?}", e);
                false
            }
        }
    }

    fn launch(&mut self) -> Result<(), Error> {
        let base = self.layout.app.start;
        let initial_sp = self.parts.internal.read_word(base)?;
        let reset_vector = self.parts.internal.read_word(base + 4)?;

        let vectors = VectorTable::new(initial_sp, reset_vector, &self.layout)?;
        info!("MSP: {:#x}", vectors.initial_sp());

        self.parts.system.deinit_peripherals();
        // SAFETY: stack pointer and reset vector were validated above.
        unsafe { self.parts.system.start_application(&vectors) };

        Ok(())
    }

    fn restart(&mut self) {
        self.parts.delay.delay_ms(RESET_DELAY_MS);
        self.parts.system.reset();
    }
}

/// Copies the selected slot into the application partition.
///
/// Refuses empty images and sizes that aren't word aligned or don't fit,
/// before anything is erased. Success asks for a reset, failure clears the copy request.
pub(crate) fn copy_slot_to_partition<B: Board>(session: &mut Session, parts: &mut Parts<B>) -> Step {
    let slot = parts.external.slot();

    match copy_image(session, parts, slot) {
        Ok(()) => {
            info!("Program loaded successfully, restarting system...");
            Step::Reset
        }
        Err(e) => {
            error!("Loading slot {} failed: {:?}", slot, e);
            session.disarm(UpdateFlags::PENDING_COPY);
            Step::Continue
        }
    }
}

fn copy_image<B: Board>(session: &mut Session, parts: &mut Parts<B>, slot: u8) -> Result<(), Error> {
    let size = parts.store.load()?.image_size(slot)?;
    info!("Loading firmware from slot {} (size={} bytes)", slot, size);

    if size == 0 {
        return Err(Error::EmptyImage(slot));
    }
    if size % 4 != 0 {
        return Err(Error::MisalignedImage(size));
    }
    if size > parts.internal.partition().size {
        return Err(Error::OutOfBounds(size));
    }

    parts.internal.erase_partition()?;

    let full_chunks = size / CHUNK_SIZE as u32;
    for index in 0..full_chunks {
        parts
            .external
            .read_chunk(slot, index, session.chunk_mut(), CHUNK_SIZE)?;
        parts.internal.write_chunk(index, session.chunk(), CHUNK_SIZE)?;
    }

    let rest = size as usize % CHUNK_SIZE;
    if rest != 0 {
        parts
            .external
            .read_chunk(slot, full_chunks, session.chunk_mut(), rest)?;
        parts.internal.write_chunk(full_chunks, session.chunk(), rest)?;
    }

    Ok(())
}
