//! Versioned console snapshots. A `SaveState` captures every byte of
//! mutable emulation state (CPU, RAM, PPU, APU, controllers, mapper
//! registers); ROM contents are deliberately excluded since they are
//! immutable and already held by the console's cartridge.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::apu::Apu;
use crate::controller::Controller;

/// Bumped whenever the snapshot layout changes incompatibly.
pub const STATE_VERSION: u32 = 1;

#[derive(Debug)]
pub enum StateError {
    /// The blob could not be decoded at all.
    Malformed(String),
    /// The blob decoded but was written by an incompatible core version.
    VersionMismatch { found: u32 },
    /// A component section has the wrong shape (e.g. a RAM vector of the
    /// wrong length, or a mapper blob for a different board).
    WrongLayout(&'static str),
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::Malformed(msg) => write!(f, "Malformed save state: {}", msg),
            StateError::VersionMismatch { found } => write!(
                f,
                "Save state version {} is incompatible with version {}",
                found, STATE_VERSION
            ),
            StateError::WrongLayout(what) => write!(f, "Save state layout mismatch: {}", what),
        }
    }
}

impl std::error::Error for StateError {}

#[derive(Serialize, Deserialize)]
pub struct CpuState {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: u8,
    pub cycles: u64,
    pub stall: u16,
}

#[derive(Serialize, Deserialize)]
pub struct PpuState {
    pub ctrl: u8,
    pub mask: u8,
    pub status: u8,
    pub oam_addr: u8,
    pub v: u16,
    pub t: u16,
    pub fine_x: u8,
    pub w: bool,
    pub read_buffer: u8,
    pub scanline: u16,
    pub dot: u16,
    pub odd_frame: bool,
    pub frame_count: u64,
    pub nmi_pending: bool,
    pub vram: Vec<u8>,
    pub palette_ram: Vec<u8>,
    pub oam: Vec<u8>,
}

/// The full console snapshot. Applied all-or-nothing: `Nes::load_state`
/// validates every section before mutating anything.
#[derive(Serialize, Deserialize)]
pub struct SaveState {
    pub version: u32,
    pub mapper_id: u8,
    pub cpu: CpuState,
    pub ram: Vec<u8>,
    pub ppu: PpuState,
    pub apu: Apu,
    pub controllers: [Controller; 2],
    pub mapper: Vec<u8>,
}

impl SaveState {
    pub fn to_bytes(&self) -> Result<Vec<u8>, StateError> {
        serde_json::to_vec(self).map_err(|e| StateError::Malformed(e.to_string()))
    }

    /// Decode and version-check a blob. Layout checks against the live
    /// console happen in `Nes::load_state`.
    pub fn from_bytes(data: &[u8]) -> Result<Self, StateError> {
        let state: SaveState =
            serde_json::from_slice(data).map_err(|e| StateError::Malformed(e.to_string()))?;
        if state.version != STATE_VERSION {
            return Err(StateError::VersionMismatch {
                found: state.version,
            });
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_blob_is_malformed() {
        assert!(matches!(
            SaveState::from_bytes(b"{\"version\":1,\"mapper_id\""),
            Err(StateError::Malformed(_))
        ));
    }

    #[test]
    fn test_garbage_blob_is_malformed() {
        assert!(matches!(
            SaveState::from_bytes(&[0xDE, 0xAD, 0xBE, 0xEF]),
            Err(StateError::Malformed(_))
        ));
    }
}
