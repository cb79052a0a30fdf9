use super::{expect_len, Mapper};
use crate::cartridge::{Cartridge, Mirroring};
use crate::state::StateError;

/// Mapper 11 (Color Dreams): one register; bits 0-1 select a 32KB PRG
/// bank, bits 4-7 select an 8KB CHR bank.
pub struct ColorDreams {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    mirroring: Mirroring,
    reg: u8,
}

impl ColorDreams {
    pub fn new(cart: Cartridge) -> Self {
        ColorDreams {
            prg_rom: cart.prg_rom,
            chr: cart.chr,
            mirroring: cart.mirroring,
            reg: 0,
        }
    }
}

impl Mapper for ColorDreams {
    fn prg_read(&self, addr: u16) -> u8 {
        match addr {
            0x8000..=0xFFFF => {
                let banks = (self.prg_rom.len() / 0x8000).max(1);
                let bank = ((self.reg & 0x03) as usize) % banks;
                let index = bank * 0x8000 + (addr - 0x8000) as usize;
                // A 16K-only image wraps within the 32K window
                self.prg_rom[index % self.prg_rom.len()]
            }
            _ => 0,
        }
    }

    fn prg_write(&mut self, addr: u16, val: u8) {
        if addr >= 0x8000 {
            self.reg = val;
        }
    }

    fn chr_read(&self, addr: u16) -> u8 {
        let banks = (self.chr.len() / 0x2000).max(1);
        let bank = ((self.reg >> 4) as usize) % banks;
        self.chr[bank * 0x2000 + (addr & 0x1FFF) as usize]
    }

    fn chr_write(&mut self, _addr: u16, _val: u8) {
        // CHR is ROM on these boards
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn save_registers(&self) -> Vec<u8> {
        vec![self.reg]
    }

    fn load_registers(&mut self, data: &[u8]) -> Result<(), StateError> {
        expect_len(data, 1)?;
        self.reg = data[0];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_cartridge;
    use super::*;

    #[test]
    fn test_split_register_banks() {
        let mut cart = test_cartridge(11, 4, 2);
        cart.prg_rom[0x8000] = 0xA1; // PRG bank 1
        cart.chr[0x2000] = 0xB1; // CHR bank 1
        let mut mapper = ColorDreams::new(cart);

        mapper.prg_write(0x8000, 0x11); // PRG bank 1, CHR bank 1
        assert_eq!(mapper.prg_read(0x8000), 0xA1);
        assert_eq!(mapper.chr_read(0x0000), 0xB1);
    }

    #[test]
    fn test_16k_prg_wraps_in_32k_window() {
        let mut cart = test_cartridge(11, 1, 1);
        cart.prg_rom[0x0000] = 0xE0;
        let mapper = ColorDreams::new(cart);

        assert_eq!(mapper.prg_read(0xC000), 0xE0);
    }
}
