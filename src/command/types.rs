use crate::types::Error;

/// Menu entries, selected with '1'..='7'.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    EraseApp,
    DownloadInternal,
    DownloadExternal,
    LoadExternal,
    InitVersion,
    ShowVersion,
    Restart,
}

impl Command {
    pub const ALL: [Command; 7] = [
        Command::EraseApp,
        Command::DownloadInternal,
        Command::DownloadExternal,
        Command::LoadExternal,
        Command::InitVersion,
        Command::ShowVersion,
        Command::Restart,
    ];

    pub fn from_key(key: u8) -> Option<Self> {
        let index = key.checked_sub(b'1')?;
        Self::ALL.get(index as usize).copied()
    }

    pub fn key(self) -> u8 {
        // Position in ALL, which has fewer than 9 entries.
        b'1' + self as u8
    }

    pub fn description(self) -> &'static str {
        match self {
            Command::EraseApp => "Erase APP partition",
            Command::DownloadInternal => "IAP: Download firmware to Internal Flash",
            Command::DownloadExternal => "IAP: Download firmware to External Flash",
            Command::LoadExternal => "Load firmware from External Flash",
            Command::InitVersion => "Init OTA version",
            Command::ShowVersion => "Check OTA version",
            Command::Restart => "System restart",
        }
    }
}

/// Parses a one-byte slot selector. Slot 0 can't be picked from the menu.
pub fn parse_slot(input: &[u8], slot_count: u8) -> Result<u8, Error> {
    let last = (b'0' + slot_count.min(10)).saturating_sub(1);
    match input {
        [digit @ b'1'..=b'9'] if *digit <= last => Ok(digit - b'0'),
        [other] => Err(Error::InvalidSlot(*other)),
        _ => Err(Error::InvalidLength(input.len())),
    }
}
