use super::{expect_len, Mapper};
use crate::cartridge::{Cartridge, Mirroring};
use crate::state::StateError;

const PRG_RAM_SIZE: usize = 8192;

/// Mapper 1 (MMC1): serial bank switching through a 5-bit shift register.
/// Any PRG write with bit 7 set resets the shift register; otherwise bit 0
/// is shifted in LSB-first, and the fifth write latches the value into the
/// register selected by the address ($8000 control, $A000/$C000 CHR banks,
/// $E000 PRG bank).
pub struct Mmc1 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    prg_ram: Vec<u8>,

    shift: u8,
    shift_count: u8,
    /// Bits 0-1 mirroring, 2-3 PRG mode, 4 CHR mode.
    control: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_bank: u8,
}

impl Mmc1 {
    pub fn new(cart: Cartridge) -> Self {
        Mmc1 {
            prg_rom: cart.prg_rom,
            chr: cart.chr,
            chr_is_ram: cart.chr_is_ram,
            prg_ram: vec![0; PRG_RAM_SIZE],
            shift: 0,
            shift_count: 0,
            // Power-on: $8000 switchable, $C000 fixed to the last bank
            control: 0x0C,
            chr_bank0: 0,
            chr_bank1: 0,
            prg_bank: 0,
        }
    }

    fn prg_mode(&self) -> u8 {
        (self.control >> 2) & 0b11
    }

    fn prg_bank_count(&self) -> usize {
        self.prg_rom.len() / 0x4000
    }

    fn chr_4k_count(&self) -> usize {
        (self.chr.len() / 0x1000).max(1)
    }

    /// CHR offset for a pattern-table address under the current banking
    /// mode (4KB switched pair, or a single 8KB bank when control bit 4
    /// is clear).
    fn chr_offset(&self, addr: u16) -> usize {
        let addr = (addr & 0x1FFF) as usize;
        let eight_kb_mode = self.control & 0x10 == 0;
        if eight_kb_mode {
            let bank = ((self.chr_bank0 & 0x1E) as usize) % self.chr_4k_count();
            bank * 0x1000 + addr
        } else if addr < 0x1000 {
            let bank = (self.chr_bank0 as usize) % self.chr_4k_count();
            bank * 0x1000 + addr
        } else {
            let bank = (self.chr_bank1 as usize) % self.chr_4k_count();
            bank * 0x1000 + (addr - 0x1000)
        }
    }
}

impl Mapper for Mmc1 {
    fn prg_read(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize],
            0x8000..=0xFFFF => {
                let banks = self.prg_bank_count();
                let offset = (addr - 0x8000) as usize;
                let index = match self.prg_mode() {
                    // 32KB mode: low bit of the bank number ignored
                    0 | 1 => {
                        let bank = ((self.prg_bank & 0x0E) as usize) % banks;
                        bank * 0x4000 + offset
                    }
                    // First bank fixed at $8000, switchable at $C000
                    2 => {
                        if addr < 0xC000 {
                            offset
                        } else {
                            let bank = (self.prg_bank as usize) % banks;
                            bank * 0x4000 + (offset - 0x4000)
                        }
                    }
                    // Switchable at $8000, last bank fixed at $C000
                    _ => {
                        if addr < 0xC000 {
                            let bank = (self.prg_bank as usize) % banks;
                            bank * 0x4000 + offset
                        } else {
                            (banks - 1) * 0x4000 + (offset - 0x4000)
                        }
                    }
                };
                // PRG sizes that don't fill the board's window (16K-only
                // carts, non-power-of-two page counts) wrap instead of
                // running off the end, like the CHR path
                self.prg_rom[index % self.prg_rom.len()]
            }
            _ => 0,
        }
    }

    fn prg_write(&mut self, addr: u16, val: u8) {
        if let 0x6000..=0x7FFF = addr {
            self.prg_ram[(addr - 0x6000) as usize] = val;
            return;
        }
        if addr < 0x8000 {
            return;
        }

        if val & 0x80 != 0 {
            self.shift = 0;
            self.shift_count = 0;
            self.control |= 0x0C;
            return;
        }

        self.shift >>= 1;
        self.shift |= (val & 1) << 4;
        self.shift_count += 1;
        if self.shift_count < 5 {
            return;
        }

        let value = self.shift & 0x1F;
        match addr {
            0x8000..=0x9FFF => self.control = value,
            0xA000..=0xBFFF => self.chr_bank0 = value,
            0xC000..=0xDFFF => self.chr_bank1 = value,
            _ => self.prg_bank = value & 0x0F,
        }
        self.shift = 0;
        self.shift_count = 0;
    }

    fn chr_read(&self, addr: u16) -> u8 {
        self.chr[self.chr_offset(addr) % self.chr.len()]
    }

    fn chr_write(&mut self, addr: u16, val: u8) {
        if self.chr_is_ram {
            let index = self.chr_offset(addr) % self.chr.len();
            self.chr[index] = val;
        }
    }

    fn mirroring(&self) -> Mirroring {
        match self.control & 0b11 {
            0 => Mirroring::OneScreenLower,
            1 => Mirroring::OneScreenUpper,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }

    fn save_registers(&self) -> Vec<u8> {
        let mut blob = vec![
            self.shift,
            self.shift_count,
            self.control,
            self.chr_bank0,
            self.chr_bank1,
            self.prg_bank,
        ];
        blob.extend_from_slice(&self.prg_ram);
        if self.chr_is_ram {
            blob.extend_from_slice(&self.chr);
        }
        blob
    }

    fn load_registers(&mut self, data: &[u8]) -> Result<(), StateError> {
        let chr_len = if self.chr_is_ram { self.chr.len() } else { 0 };
        expect_len(data, 6 + PRG_RAM_SIZE + chr_len)?;
        self.shift = data[0];
        self.shift_count = data[1];
        self.control = data[2];
        self.chr_bank0 = data[3];
        self.chr_bank1 = data[4];
        self.prg_bank = data[5];
        self.prg_ram.copy_from_slice(&data[6..6 + PRG_RAM_SIZE]);
        if self.chr_is_ram {
            self.chr.copy_from_slice(&data[6 + PRG_RAM_SIZE..]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_cartridge;
    use super::*;

    /// Write one 5-bit value through the serial interface.
    fn serial_write(mapper: &mut Mmc1, addr: u16, value: u8) {
        for i in 0..5 {
            mapper.prg_write(addr, (value >> i) & 1);
        }
    }

    #[test]
    fn test_power_on_fixes_last_bank_at_c000() {
        let mut cart = test_cartridge(1, 4, 1);
        cart.prg_rom[0x0000] = 0x10;
        cart.prg_rom[0xC000] = 0x13; // last bank
        let mapper = Mmc1::new(cart);

        assert_eq!(mapper.prg_read(0x8000), 0x10);
        assert_eq!(mapper.prg_read(0xC000), 0x13);
    }

    #[test]
    fn test_serial_prg_bank_select() {
        let mut cart = test_cartridge(1, 4, 1);
        cart.prg_rom[0x4000] = 0x11; // bank 1
        let mut mapper = Mmc1::new(cart);

        serial_write(&mut mapper, 0xE000, 1);
        assert_eq!(mapper.prg_read(0x8000), 0x11);
    }

    #[test]
    fn test_partial_write_does_not_latch() {
        let mut cart = test_cartridge(1, 4, 1);
        cart.prg_rom[0x0000] = 0x10;
        let mut mapper = Mmc1::new(cart);

        for _ in 0..4 {
            mapper.prg_write(0xE000, 1);
        }
        assert_eq!(mapper.prg_read(0x8000), 0x10); // still bank 0
    }

    #[test]
    fn test_reset_bit_clears_shift_register() {
        let mut cart = test_cartridge(1, 4, 1);
        cart.prg_rom[0x0000] = 0x10;
        cart.prg_rom[0x8000] = 0x12; // bank 2
        let mut mapper = Mmc1::new(cart);

        mapper.prg_write(0xE000, 1);
        mapper.prg_write(0xE000, 0x80); // reset mid-sequence
        serial_write(&mut mapper, 0xE000, 2);
        assert_eq!(mapper.prg_read(0x8000), 0x12);
    }

    #[test]
    fn test_32k_mode_with_odd_bank_count_wraps() {
        let mut cart = test_cartridge(1, 3, 1); // three 16K pages
        cart.prg_rom[0x3FFF] = 0x77;
        let mut mapper = Mmc1::new(cart);

        serial_write(&mut mapper, 0x8000, 0x00); // 32K PRG mode
        serial_write(&mut mapper, 0xE000, 2); // bank pair starting past the end
        assert_eq!(mapper.prg_read(0xFFFF), 0x77);
    }

    #[test]
    fn test_mirroring_control() {
        let mut mapper = Mmc1::new(test_cartridge(1, 2, 1));
        serial_write(&mut mapper, 0x8000, 0x02 | 0x0C);
        assert_eq!(mapper.mirroring(), Mirroring::Vertical);
        serial_write(&mut mapper, 0x8000, 0x03 | 0x0C);
        assert_eq!(mapper.mirroring(), Mirroring::Horizontal);
        serial_write(&mut mapper, 0x8000, 0x0C);
        assert_eq!(mapper.mirroring(), Mirroring::OneScreenLower);
    }

    #[test]
    fn test_chr_4k_banking() {
        let mut cart = test_cartridge(1, 2, 2); // four 4K CHR banks
        cart.chr[0x0000] = 0xC0;
        cart.chr[0x1000] = 0xC1;
        cart.chr[0x2000] = 0xC2;
        let mut mapper = Mmc1::new(cart);

        // 4KB mode, bank 2 low / bank 1 high
        serial_write(&mut mapper, 0x8000, 0x10 | 0x0C);
        serial_write(&mut mapper, 0xA000, 2);
        serial_write(&mut mapper, 0xC000, 1);
        assert_eq!(mapper.chr_read(0x0000), 0xC2);
        assert_eq!(mapper.chr_read(0x1000), 0xC1);
    }
}
