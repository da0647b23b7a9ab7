// Public interfaces.
pub mod types;

use types::{Route, UpdateFlags};

// Checked in order, the first armed entry wins.
const IDLE_HANDLERS: [(UpdateFlags, Route); 2] = [
    (UpdateFlags::HANDSHAKE, Route::Handshake),
    (UpdateFlags::PENDING_COPY, Route::PendingCopy),
];

const INPUT_HANDLERS: [(UpdateFlags, Route); 4] = [
    (UpdateFlags::RECEIVING, Route::Transfer),
    (UpdateFlags::AWAIT_DOWNLOAD_SLOT, Route::DownloadSlot),
    (UpdateFlags::AWAIT_LOAD_SLOT, Route::LoadSlot),
    (UpdateFlags::AWAIT_VERSION, Route::Version),
];

/// Picks the handler for one main loop iteration.
///
/// Without input only the pacing and copy handlers can run. With input, an
/// all-clear session hands it to the command processor.
pub fn route(flags: UpdateFlags, has_input: bool) -> Route {
    if !has_input {
        return IDLE_HANDLERS
            .iter()
            .find(|(flag, _)| flags.intersects(*flag))
            .map_or(Route::Idle, |(_, route)| *route);
    }

    if flags.is_empty() {
        return Route::Command;
    }

    INPUT_HANDLERS
        .iter()
        .find(|(flag, _)| flags.intersects(*flag))
        .map_or(Route::Invalid, |(_, route)| *route)
}
