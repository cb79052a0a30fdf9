use super::{expect_len, Mapper};
use crate::cartridge::{Cartridge, Mirroring};
use crate::state::StateError;

/// Mapper 66 (GxROM): one register; bits 4-5 select a 32KB PRG bank,
/// bits 0-1 select an 8KB CHR bank.
pub struct GxRom {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    mirroring: Mirroring,
    prg_bank: u8,
    chr_bank: u8,
}

impl GxRom {
    pub fn new(cart: Cartridge) -> Self {
        GxRom {
            prg_rom: cart.prg_rom,
            chr: cart.chr,
            mirroring: cart.mirroring,
            prg_bank: 0,
            chr_bank: 0,
        }
    }
}

impl Mapper for GxRom {
    fn prg_read(&self, addr: u16) -> u8 {
        match addr {
            0x8000..=0xFFFF => {
                let banks = (self.prg_rom.len() / 0x8000).max(1);
                let bank = (self.prg_bank as usize) % banks;
                let index = bank * 0x8000 + (addr - 0x8000) as usize;
                // A 16K-only image wraps within the 32K window
                self.prg_rom[index % self.prg_rom.len()]
            }
            _ => 0,
        }
    }

    fn prg_write(&mut self, addr: u16, val: u8) {
        if addr >= 0x8000 {
            self.prg_bank = (val >> 4) & 0x03;
            self.chr_bank = val & 0x03;
        }
    }

    fn chr_read(&self, addr: u16) -> u8 {
        let banks = (self.chr.len() / 0x2000).max(1);
        let bank = (self.chr_bank as usize) % banks;
        self.chr[bank * 0x2000 + (addr & 0x1FFF) as usize]
    }

    fn chr_write(&mut self, _addr: u16, _val: u8) {
        // CHR is ROM on GxROM boards
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn save_registers(&self) -> Vec<u8> {
        vec![self.prg_bank, self.chr_bank]
    }

    fn load_registers(&mut self, data: &[u8]) -> Result<(), StateError> {
        expect_len(data, 2)?;
        self.prg_bank = data[0];
        self.chr_bank = data[1];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_cartridge;
    use super::*;

    #[test]
    fn test_split_register_banks() {
        let mut cart = test_cartridge(66, 4, 2);
        cart.prg_rom[0x8000] = 0xA1; // PRG bank 1
        cart.chr[0x2000] = 0xB1; // CHR bank 1
        let mut mapper = GxRom::new(cart);

        mapper.prg_write(0x8000, 0x11); // PRG bank 1 (bits 4-5), CHR bank 1 (bits 0-1)
        assert_eq!(mapper.prg_read(0x8000), 0xA1);
        assert_eq!(mapper.chr_read(0x0000), 0xB1);
    }

    #[test]
    fn test_16k_prg_wraps_in_32k_window() {
        let mut cart = test_cartridge(66, 1, 1);
        cart.prg_rom[0x0000] = 0xE0;
        let mapper = GxRom::new(cart);

        assert_eq!(mapper.prg_read(0xC000), 0xE0);
    }

    #[test]
    fn test_register_blob_round_trip() {
        let mut mapper = GxRom::new(test_cartridge(66, 4, 2));
        mapper.prg_write(0x8000, 0x21);
        let blob = mapper.save_registers();

        let mut fresh = GxRom::new(test_cartridge(66, 4, 2));
        fresh.load_registers(&blob).unwrap();
        assert_eq!(fresh.save_registers(), blob);
        assert!(fresh.load_registers(&[1]).is_err());
    }
}
