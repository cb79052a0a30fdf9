use super::{expect_len, Mapper};
use crate::cartridge::{Cartridge, Mirroring};
use crate::state::StateError;

/// Mapper 2 (UxROM): 16KB PRG bank switched at $8000-$BFFF via any write
/// to $8000-$FFFF; the last 16KB bank is fixed at $C000-$FFFF. CHR is
/// usually 8KB of RAM.
pub struct UxRom {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    mirroring: Mirroring,
    prg_bank: u8,
    last_bank_start: usize,
}

impl UxRom {
    pub fn new(cart: Cartridge) -> Self {
        let last_bank_start = cart.prg_rom.len() - 0x4000;
        UxRom {
            prg_rom: cart.prg_rom,
            chr: cart.chr,
            chr_is_ram: cart.chr_is_ram,
            mirroring: cart.mirroring,
            prg_bank: 0,
            last_bank_start,
        }
    }

    fn bank_count(&self) -> usize {
        self.prg_rom.len() / 0x4000
    }
}

impl Mapper for UxRom {
    fn prg_read(&self, addr: u16) -> u8 {
        match addr {
            0x8000..=0xBFFF => {
                let bank = (self.prg_bank as usize) % self.bank_count();
                self.prg_rom[bank * 0x4000 + (addr & 0x3FFF) as usize]
            }
            0xC000..=0xFFFF => self.prg_rom[self.last_bank_start + (addr & 0x3FFF) as usize],
            _ => 0,
        }
    }

    fn prg_write(&mut self, addr: u16, val: u8) {
        if addr >= 0x8000 {
            self.prg_bank = val & 0x0F;
        }
    }

    fn chr_read(&self, addr: u16) -> u8 {
        self.chr[(addr as usize) % self.chr.len()]
    }

    fn chr_write(&mut self, addr: u16, val: u8) {
        if self.chr_is_ram {
            let len = self.chr.len();
            self.chr[(addr as usize) % len] = val;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn save_registers(&self) -> Vec<u8> {
        let mut blob = vec![self.prg_bank];
        if self.chr_is_ram {
            blob.extend_from_slice(&self.chr);
        }
        blob
    }

    fn load_registers(&mut self, data: &[u8]) -> Result<(), StateError> {
        let chr_len = if self.chr_is_ram { self.chr.len() } else { 0 };
        expect_len(data, 1 + chr_len)?;
        self.prg_bank = data[0];
        if self.chr_is_ram {
            self.chr.copy_from_slice(&data[1..]);
        }
        Ok(())
    }
}
