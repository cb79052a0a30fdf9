use super::{expect_len, Mapper};
use crate::cartridge::{Cartridge, Mirroring};
use crate::state::StateError;

/// Mapper 3 (CNROM): fixed 16/32KB PRG, 8KB CHR bank selected by any
/// write to $8000-$FFFF.
pub struct CnRom {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    mirroring: Mirroring,
    chr_bank: u8,
    one_prg_bank: bool,
}

impl CnRom {
    pub fn new(cart: Cartridge) -> Self {
        let one_prg_bank = cart.prg_rom.len() <= 0x4000;
        CnRom {
            prg_rom: cart.prg_rom,
            chr: cart.chr,
            mirroring: cart.mirroring,
            chr_bank: 0,
            one_prg_bank,
        }
    }

    fn chr_bank_count(&self) -> usize {
        self.chr.len() / 0x2000
    }
}

impl Mapper for CnRom {
    fn prg_read(&self, addr: u16) -> u8 {
        match addr {
            0x8000..=0xFFFF => {
                let mut index = (addr - 0x8000) as usize;
                if self.one_prg_bank {
                    index &= 0x3FFF;
                }
                self.prg_rom[index]
            }
            _ => 0,
        }
    }

    fn prg_write(&mut self, addr: u16, val: u8) {
        if addr >= 0x8000 {
            self.chr_bank = val & 0x03;
        }
    }

    fn chr_read(&self, addr: u16) -> u8 {
        let bank = (self.chr_bank as usize) % self.chr_bank_count();
        self.chr[bank * 0x2000 + (addr & 0x1FFF) as usize]
    }

    fn chr_write(&mut self, _addr: u16, _val: u8) {
        // CHR is ROM on CNROM boards
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn save_registers(&self) -> Vec<u8> {
        vec![self.chr_bank]
    }

    fn load_registers(&mut self, data: &[u8]) -> Result<(), StateError> {
        expect_len(data, 1)?;
        self.chr_bank = data[0];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_cartridge;
    use super::*;

    #[test]
    fn test_chr_bank_switch() {
        let mut cart = test_cartridge(3, 1, 2);
        cart.chr[0x0000] = 0xA0;
        cart.chr[0x2000] = 0xA1;
        let mut mapper = CnRom::new(cart);

        assert_eq!(mapper.chr_read(0x0000), 0xA0);
        mapper.prg_write(0x8000, 1);
        assert_eq!(mapper.chr_read(0x0000), 0xA1);
    }

    #[test]
    fn test_prg_mirror_with_single_bank() {
        let mut cart = test_cartridge(3, 1, 1);
        cart.prg_rom[0x10] = 0x5A;
        let mapper = CnRom::new(cart);

        assert_eq!(mapper.prg_read(0x8010), 0x5A);
        assert_eq!(mapper.prg_read(0xC010), 0x5A);
    }

    #[test]
    fn test_chr_writes_ignored() {
        let mut cart = test_cartridge(3, 1, 1);
        cart.chr[0] = 0x11;
        let mut mapper = CnRom::new(cart);
        mapper.chr_write(0, 0x99);
        assert_eq!(mapper.chr_read(0), 0x11);
    }
}
