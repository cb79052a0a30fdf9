mod axrom;
mod cnrom;
mod colordreams;
mod gxrom;
mod mmc1;
mod mmc3;
mod nrom;
mod uxrom;

pub use axrom::AxRom;
pub use cnrom::CnRom;
pub use colordreams::ColorDreams;
pub use gxrom::GxRom;
pub use mmc1::Mmc1;
pub use mmc3::Mmc3;
pub use nrom::Nrom;
pub use uxrom::UxRom;

use crate::cartridge::{Cartridge, CartridgeError, Mirroring};
use crate::state::StateError;

/// Cartridge-side bank-switching circuit. The bus routes every PRG access
/// at $4020-$FFFF and every PPU pattern-table access at $0000-$1FFF here;
/// the mapper alone decides which physical ROM/RAM byte that means.
pub trait Mapper {
    fn prg_read(&self, addr: u16) -> u8;
    fn prg_write(&mut self, addr: u16, val: u8);
    fn chr_read(&self, addr: u16) -> u8;
    fn chr_write(&mut self, addr: u16, val: u8);
    fn mirroring(&self) -> Mirroring;

    /// End-of-scanline notification, delivered by the PPU while rendering.
    /// Only scanline-counting boards (MMC3) care.
    fn notify_scanline(&mut self) {}

    /// Take the IRQ line, clearing it.
    fn poll_irq(&mut self) -> bool {
        false
    }

    /// Mutable register and RAM state as an opaque blob, for save states.
    /// ROM contents are not included; they come from the cartridge itself.
    fn save_registers(&self) -> Vec<u8>;

    /// Restore a blob produced by `save_registers`. Validates the length
    /// before touching anything, so a failed load leaves the mapper intact.
    fn load_registers(&mut self, data: &[u8]) -> Result<(), StateError>;
}

/// iNES mapper numbers with a registered implementation.
pub const SUPPORTED: [u8; 8] = [0, 1, 2, 3, 4, 7, 11, 66];

pub fn supported(id: u8) -> bool {
    SUPPORTED.contains(&id)
}

/// Build the mapper for the cartridge's declared mapper number. The
/// cartridge is consumed: the mapper owns PRG/CHR storage from here on.
pub fn create(cart: Cartridge) -> Result<Box<dyn Mapper>, CartridgeError> {
    let id = cart.mapper_id;
    match id {
        0 => Ok(Box::new(Nrom::new(cart))),
        1 => Ok(Box::new(Mmc1::new(cart))),
        2 => Ok(Box::new(UxRom::new(cart))),
        3 => Ok(Box::new(CnRom::new(cart))),
        4 => Ok(Box::new(Mmc3::new(cart))),
        7 => Ok(Box::new(AxRom::new(cart))),
        11 => Ok(Box::new(ColorDreams::new(cart))),
        66 => Ok(Box::new(GxRom::new(cart))),
        _ => Err(CartridgeError::UnsupportedMapper(id)),
    }
}

/// Check that a register blob has the exact length a mapper expects.
fn expect_len(data: &[u8], expected: usize) -> Result<(), StateError> {
    if data.len() == expected {
        Ok(())
    } else {
        Err(StateError::WrongLayout("mapper register blob length"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cartridge::{CHR_ROM_PAGE_SIZE, PRG_ROM_PAGE_SIZE};

    pub(crate) fn test_cartridge(mapper_id: u8, prg_pages: usize, chr_pages: usize) -> Cartridge {
        let chr_is_ram = chr_pages == 0;
        Cartridge {
            prg_rom: vec![0; prg_pages * PRG_ROM_PAGE_SIZE],
            chr: vec![0; chr_pages.max(1) * CHR_ROM_PAGE_SIZE],
            chr_is_ram,
            mapper_id,
            mirroring: Mirroring::Horizontal,
        }
    }

    #[test]
    fn test_factory_covers_registry() {
        for id in SUPPORTED {
            let cart = test_cartridge(id, 2, 1);
            assert!(create(cart).is_ok(), "mapper {} registered but not built", id);
        }
    }

    #[test]
    fn test_factory_rejects_unregistered() {
        let cart = test_cartridge(5, 2, 1);
        assert!(matches!(
            create(cart),
            Err(CartridgeError::UnsupportedMapper(5))
        ));
    }
}
