// Public interfaces.
pub mod types;

use crate::config::VERSION_LEN;
use crate::flags::types::UpdateFlags;
use crate::fmt::{error, info, warn};
use crate::hal::{Board, Parts};
use crate::session::{Session, Step};
use crate::types::Error;

use self::types::{parse_slot, Command};

pub fn print_menu() {
    info!("================================================");
    info!("|           BootLoader Operation Menu           |");
    info!("================================================");
    for command in Command::ALL {
        info!("[{}] {}", command.key() - b'0', command.description());
    }
    info!("================================================");
}

/// Runs the menu entry selected by a one-byte `input`. Anything else is
/// logged and leaves the session untouched.
pub fn process<B: Board>(session: &mut Session, parts: &mut Parts<B>, input: &[u8]) -> Step {
    let key = match input {
        [key] => *key,
        _ => {
            warn!("Invalid input length: {}", input.len());
            return Step::Continue;
        }
    };

    let Some(command) = Command::from_key(key) else {
        warn!("Invalid command: {:?}", Error::InvalidCommand(key));
        print_menu();
        return Step::Continue;
    };

    match execute(command, session, parts) {
        Ok(step) => step,
        Err(e) => {
            error!("Command [{}] failed: {:?}", key - b'0', e);
            Step::Continue
        }
    }
}

fn execute<B: Board>(
    command: Command,
    session: &mut Session,
    parts: &mut Parts<B>,
) -> Result<Step, Error> {
    let last_slot = parts.external.layout().slot_count.min(10).saturating_sub(1);

    match command {
        Command::EraseApp => {
            parts.internal.erase_partition()?;
            info!("APP partition erased.");
        }
        Command::DownloadInternal => {
            info!("IAP download firmware to Flash.");
            parts.internal.erase_partition()?;
            info!("Use Xmodem to download a BIN file to Flash.");
            session.begin_transfer(false);
        }
        Command::DownloadExternal => {
            info!(
                "IAP download firmware to External Flash, please enter the firmware location (1-{}).",
                last_slot
            );
            session.arm(UpdateFlags::AWAIT_DOWNLOAD_SLOT);
        }
        Command::LoadExternal => {
            info!(
                "Load firmware from External Flash, please enter the firmware location (1-{}).",
                last_slot
            );
            session.arm(UpdateFlags::AWAIT_LOAD_SLOT);
        }
        Command::InitVersion => {
            info!("Init OTA version...");
            warn!("************************************************************");
            warn!("*  WARNING: OTA version initializer invoked                *");
            warn!("*  This operation is only for debugging or factory setup   *");
            warn!("*  Not part of normal OTA workflow                         *");
            warn!("*  Incorrect use may reset version state unexpectedly      *");
            warn!("************************************************************");
            info!("Enter the version string (max {} bytes).", VERSION_LEN - 1);
            session.arm(UpdateFlags::AWAIT_VERSION);
        }
        Command::ShowVersion => {
            let record = parts.store.load()?;
            info!("Version: {}", record.version_str());
        }
        Command::Restart => {
            info!("System restarting...");
            return Ok(Step::Reset);
        }
    }

    Ok(Step::Continue)
}

/// Slot for an external download. Arms the transfer, clears the slot's
/// recorded size and erases the slot.
pub fn select_download_slot<B: Board>(
    session: &mut Session,
    parts: &mut Parts<B>,
    input: &[u8],
) -> Step {
    let slot = match parse_slot(input, parts.external.layout().slot_count) {
        Ok(slot) => slot,
        Err(e) => {
            warn!("Invalid slot selection: {:?}", e);
            return Step::Continue;
        }
    };

    session.disarm(UpdateFlags::AWAIT_DOWNLOAD_SLOT);
    parts.external.select_slot(slot);
    session.begin_transfer(true);

    let prepared = parts
        .store
        .update(&mut parts.delay, |r| r.set_image_size(slot, 0))
        .and_then(|_| parts.external.erase_slot(slot));
    if let Err(e) = prepared {
        error!("Failed to prepare slot {}: {:?}", slot, e);
        session.abandon();
        return Step::Continue;
    }

    info!(
        "Use Xmodem to download a BIN file to external Flash slot {}.",
        slot
    );
    Step::Continue
}

/// Slot to copy into the application partition on the next idle tick.
pub fn select_load_slot<B: Board>(
    session: &mut Session,
    parts: &mut Parts<B>,
    input: &[u8],
) -> Step {
    let slot = match parse_slot(input, parts.external.layout().slot_count) {
        Ok(slot) => slot,
        Err(e) => {
            warn!("Invalid slot selection: {:?}", e);
            return Step::Continue;
        }
    };

    session.disarm(UpdateFlags::AWAIT_LOAD_SLOT);
    parts.external.select_slot(slot);
    session.arm(UpdateFlags::PENDING_COPY);
    Step::Continue
}

/// Stores the whole segment as the OTA version string. The flag stays armed
/// until a version is saved.
pub fn init_version<B: Board>(session: &mut Session, parts: &mut Parts<B>, input: &[u8]) -> Step {
    if input.len() >= VERSION_LEN {
        error!(
            "Invalid version len (must < {} bytes): {}",
            VERSION_LEN,
            input.len()
        );
        return Step::Continue;
    }

    match parts.store.update(&mut parts.delay, |r| r.set_version(input)) {
        Ok(record) => {
            info!("Version init successfully: {}", record.version_str());
            session.disarm(UpdateFlags::AWAIT_VERSION);
        }
        Err(e) => error!("Failed to store version: {:?}", e),
    }

    Step::Continue
}
