use super::{expect_len, Mapper};
use crate::cartridge::{Cartridge, Mirroring};
use crate::state::StateError;

const PRG_RAM_SIZE: usize = 8192;

/// Mapper 0 (NROM): No bank switching.
/// NROM-128: 16KB PRG ROM mirrored at $8000 and $C000.
/// NROM-256: 32KB PRG ROM at $8000-$FFFF.
/// 8KB CHR ROM (or CHR RAM) at PPU $0000-$1FFF.
pub struct Nrom {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    mirroring: Mirroring,
    prg_ram: Vec<u8>,
}

impl Nrom {
    pub fn new(cart: Cartridge) -> Self {
        Nrom {
            prg_rom: cart.prg_rom,
            chr: cart.chr,
            chr_is_ram: cart.chr_is_ram,
            mirroring: cart.mirroring,
            prg_ram: vec![0; PRG_RAM_SIZE],
        }
    }
}

impl Mapper for Nrom {
    fn prg_read(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize],
            0x8000..=0xFFFF => {
                let mut index = (addr - 0x8000) as usize;
                if self.prg_rom.len() == 16384 {
                    index %= 16384; // mirror for NROM-128
                }
                self.prg_rom[index]
            }
            _ => 0,
        }
    }

    fn prg_write(&mut self, addr: u16, val: u8) {
        if let 0x6000..=0x7FFF = addr {
            self.prg_ram[(addr - 0x6000) as usize] = val;
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
        let mut blob = self.prg_ram.clone();
        if self.chr_is_ram {
            blob.extend_from_slice(&self.chr);
        }
        blob
    }

    fn load_registers(&mut self, data: &[u8]) -> Result<(), StateError> {
        let chr_len = if self.chr_is_ram { self.chr.len() } else { 0 };
        expect_len(data, PRG_RAM_SIZE + chr_len)?;
        self.prg_ram.copy_from_slice(&data[..PRG_RAM_SIZE]);
        if self.chr_is_ram {
            self.chr.copy_from_slice(&data[PRG_RAM_SIZE..]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_cartridge;
    use super::*;

    #[test]
    fn test_nrom128_mirroring() {
        let mut cart = test_cartridge(0, 1, 1);
        cart.prg_rom[0] = 0xAA;
        cart.prg_rom[0x3FFF] = 0xBB;
        let mapper = Nrom::new(cart);

        // $8000 and $C000 should mirror
        assert_eq!(mapper.prg_read(0x8000), 0xAA);
        assert_eq!(mapper.prg_read(0xC000), 0xAA);
        assert_eq!(mapper.prg_read(0xBFFF), 0xBB);
        assert_eq!(mapper.prg_read(0xFFFF), 0xBB);
    }

    #[test]
    fn test_nrom256() {
        let mut cart = test_cartridge(0, 2, 1);
        cart.prg_rom[0] = 0xAA;
        cart.prg_rom[0x4000] = 0xBB;
        let mapper = Nrom::new(cart);

        assert_eq!(mapper.prg_read(0x8000), 0xAA);
        assert_eq!(mapper.prg_read(0xC000), 0xBB); // different in NROM-256
    }

    #[test]
    fn test_prg_ram() {
        let mut mapper = Nrom::new(test_cartridge(0, 1, 1));

        mapper.prg_write(0x6000, 0x42);
        assert_eq!(mapper.prg_read(0x6000), 0x42);
    }

    #[test]
    fn test_chr_rom_is_read_only() {
        let mut cart = test_cartridge(0, 1, 1);
        cart.chr[0x100] = 0xFF;
        let mut mapper = Nrom::new(cart);

        assert_eq!(mapper.chr_read(0x100), 0xFF);
        mapper.chr_write(0x100, 0x00);
        assert_eq!(mapper.chr_read(0x100), 0xFF);
    }

    #[test]
    fn test_chr_ram_is_writable() {
        let mut mapper = Nrom::new(test_cartridge(0, 1, 0));
        mapper.chr_write(0x100, 0x77);
        assert_eq!(mapper.chr_read(0x100), 0x77);
    }

    #[test]
    fn test_register_blob_round_trip() {
        let mut mapper = Nrom::new(test_cartridge(0, 1, 0));
        mapper.prg_write(0x6123, 0x55);
        mapper.chr_write(0x10, 0x66);

        let blob = mapper.save_registers();
        let mut fresh = Nrom::new(test_cartridge(0, 1, 0));
        fresh.load_registers(&blob).unwrap();
        assert_eq!(fresh.prg_read(0x6123), 0x55);
        assert_eq!(fresh.chr_read(0x10), 0x66);

        assert!(fresh.load_registers(&blob[1..]).is_err());
    }
}
