//! Protocol types

use super::ProtocolError;
use crate::store::StorePath;

/// Command tags, the first byte of every request
///
/// New commands get a new byte value and a fully length-prefixed payload.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTag {
    /// Register a temporary GC root for a store path
    AddTempRoot = 0x00,
}

impl TryFrom<u8> for CommandTag {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(CommandTag::AddTempRoot),
            _ => Err(ProtocolError::UnrecognizedCommand(value)),
        }
    }
}

/// A decoded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddTempRoot(StorePath),
}

impl Command {
    pub fn tag(&self) -> CommandTag {
        match self {
            Command::AddTempRoot(_) => CommandTag::AddTempRoot,
        }
    }

    /// Bytes following the length field
    pub fn payload(&self) -> &[u8] {
        match self {
            Command::AddTempRoot(path) => path.as_bytes(),
        }
    }
}
