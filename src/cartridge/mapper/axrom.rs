use super::{expect_len, Mapper};
use crate::cartridge::{Cartridge, Mirroring};
use crate::state::StateError;

/// Mapper 7 (AxROM): 32KB PRG banks selected by bits 0-2 of any write to
/// $8000-$FFFF; bit 4 picks the one-screen nametable. CHR is 8KB RAM.
pub struct AxRom {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    bank: u8,
}

impl AxRom {
    pub fn new(cart: Cartridge) -> Self {
        AxRom {
            prg_rom: cart.prg_rom,
            chr: cart.chr,
            chr_is_ram: cart.chr_is_ram,
            bank: 0,
        }
    }

    fn bank_count(&self) -> usize {
        (self.prg_rom.len() / 0x8000).max(1)
    }
}

impl Mapper for AxRom {
    fn prg_read(&self, addr: u16) -> u8 {
        match addr {
            0x8000..=0xFFFF => {
                let bank = ((self.bank & 0x07) as usize) % self.bank_count();
                let index = bank * 0x8000 + (addr - 0x8000) as usize;
                // A 16K-only image wraps within the 32K window
                self.prg_rom[index % self.prg_rom.len()]
            }
            _ => 0,
        }
    }

    fn prg_write(&mut self, addr: u16, val: u8) {
        if addr >= 0x8000 {
            self.bank = val;
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
        if self.bank & 0x10 != 0 {
            Mirroring::OneScreenUpper
        } else {
            Mirroring::OneScreenLower
        }
    }

    fn save_registers(&self) -> Vec<u8> {
        let mut blob = vec![self.bank];
        if self.chr_is_ram {
            blob.extend_from_slice(&self.chr);
        }
        blob
    }

    fn load_registers(&mut self, data: &[u8]) -> Result<(), StateError> {
        let chr_len = if self.chr_is_ram { self.chr.len() } else { 0 };
        expect_len(data, 1 + chr_len)?;
        self.bank = data[0];
        if self.chr_is_ram {
            self.chr.copy_from_slice(&data[1..]);
        }
        Ok(())
    }
}
