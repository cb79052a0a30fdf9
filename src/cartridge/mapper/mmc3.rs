use super::{expect_len, Mapper};
use crate::cartridge::{Cartridge, Mirroring};
use crate::state::StateError;

const PRG_RAM_SIZE: usize = 8192;

/// Mapper 4 (MMC3): eight bank registers selected through the $8000
/// even/odd register pair, switchable mirroring at $A000, and a scanline
/// IRQ counter programmed through $C000-$E001. R0/R1 map 2KB CHR slots,
/// R2-R5 map 1KB CHR slots, R6/R7 map 8KB PRG slots; bit 6 of the bank
/// select swaps the PRG layout and bit 7 swaps the CHR halves.
pub struct Mmc3 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    prg_ram: Vec<u8>,

    bank_select: u8,
    regs: [u8; 8],
    mirroring: Mirroring,

    irq_latch: u8,
    irq_counter: u8,
    irq_reload_pending: bool,
    irq_enabled: bool,
    irq_pending: bool,
}

impl Mmc3 {
    pub fn new(cart: Cartridge) -> Self {
        Mmc3 {
            prg_rom: cart.prg_rom,
            chr: cart.chr,
            chr_is_ram: cart.chr_is_ram,
            prg_ram: vec![0; PRG_RAM_SIZE],
            bank_select: 0,
            regs: [0; 8],
            mirroring: cart.mirroring,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload_pending: false,
            irq_enabled: false,
            irq_pending: false,
        }
    }

    fn prg_bank_count(&self) -> usize {
        (self.prg_rom.len() / 0x2000).max(1)
    }

    fn chr_1k_count(&self) -> usize {
        (self.chr.len() / 0x400).max(1)
    }

    /// Physical CHR offset for a pattern-table address under the current
    /// bank registers and CHR-invert bit.
    fn chr_offset(&self, addr: u16) -> usize {
        let invert = self.bank_select & 0x80 != 0;
        // With invert, the 2KB pair moves to $1000 and the 1KB quads to $0000
        let addr = if invert { addr ^ 0x1000 } else { addr } as usize;
        let n_1k = self.chr_1k_count();
        if addr < 0x1000 {
            // Two 2KB slots (R0, R1), register low bit forced clear
            let reg = if addr < 0x0800 { 0 } else { 1 };
            let bank = ((self.regs[reg] & 0xFE) as usize) % n_1k;
            bank * 0x400 + (addr & 0x7FF)
        } else {
            // Four 1KB slots (R2-R5)
            let reg = 2 + ((addr - 0x1000) >> 10);
            let bank = (self.regs[reg] as usize) % n_1k;
            bank * 0x400 + (addr & 0x3FF)
        }
    }
}

impl Mapper for Mmc3 {
    fn prg_read(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize],
            0x8000..=0xFFFF => {
                let banks = self.prg_bank_count();
                let last = banks - 1;
                let second_last = last.saturating_sub(1);
                let r6 = ((self.regs[6] & 0x3F) as usize) % banks;
                let r7 = ((self.regs[7] & 0x3F) as usize) % banks;
                let swap = self.bank_select & 0x40 != 0;

                let bank = match (addr - 0x8000) >> 13 {
                    0 => if swap { second_last } else { r6 },
                    1 => r7,
                    2 => if swap { r6 } else { second_last },
                    _ => last,
                };
                self.prg_rom[bank * 0x2000 + (addr & 0x1FFF) as usize]
            }
            _ => 0,
        }
    }

    fn prg_write(&mut self, addr: u16, val: u8) {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize] = val,
            0x8000..=0x9FFF => {
                if addr & 1 == 0 {
                    self.bank_select = val;
                } else {
                    self.regs[(self.bank_select & 7) as usize] = val;
                }
            }
            0xA000..=0xBFFF => {
                if addr & 1 == 0 {
                    // Ignored on four-screen boards, which hard-wire mirroring
                    if self.mirroring != Mirroring::FourScreen {
                        self.mirroring = if val & 1 != 0 {
                            Mirroring::Horizontal
                        } else {
                            Mirroring::Vertical
                        };
                    }
                }
                // Odd addresses are PRG-RAM protect; left permissive
            }
            0xC000..=0xDFFF => {
                if addr & 1 == 0 {
                    self.irq_latch = val;
                } else {
                    self.irq_counter = 0;
                    self.irq_reload_pending = true;
                }
            }
            0xE000..=0xFFFF => {
                if addr & 1 == 0 {
                    self.irq_enabled = false;
                    self.irq_pending = false;
                } else {
                    self.irq_enabled = true;
                }
            }
            _ => {}
        }
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
        self.mirroring
    }

    fn notify_scanline(&mut self) {
        if self.irq_counter == 0 || self.irq_reload_pending {
            self.irq_counter = self.irq_latch;
            self.irq_reload_pending = false;
        } else {
            self.irq_counter -= 1;
        }
        if self.irq_counter == 0 && self.irq_enabled {
            self.irq_pending = true;
        }
    }

    fn poll_irq(&mut self) -> bool {
        let pending = self.irq_pending;
        self.irq_pending = false;
        pending
    }

    fn save_registers(&self) -> Vec<u8> {
        let mut blob = vec![self.bank_select];
        blob.extend_from_slice(&self.regs);
        blob.push(match self.mirroring {
            Mirroring::Vertical => 0,
            Mirroring::Horizontal => 1,
            _ => 2,
        });
        blob.push(self.irq_latch);
        blob.push(self.irq_counter);
        blob.push(self.irq_reload_pending as u8);
        blob.push(self.irq_enabled as u8);
        blob.push(self.irq_pending as u8);
        blob.extend_from_slice(&self.prg_ram);
        if self.chr_is_ram {
            blob.extend_from_slice(&self.chr);
        }
        blob
    }

    fn load_registers(&mut self, data: &[u8]) -> Result<(), StateError> {
        let chr_len = if self.chr_is_ram { self.chr.len() } else { 0 };
        expect_len(data, 15 + PRG_RAM_SIZE + chr_len)?;
        self.bank_select = data[0];
        self.regs.copy_from_slice(&data[1..9]);
        if self.mirroring != Mirroring::FourScreen {
            self.mirroring = match data[9] {
                0 => Mirroring::Vertical,
                1 => Mirroring::Horizontal,
                _ => self.mirroring,
            };
        }
        self.irq_latch = data[10];
        self.irq_counter = data[11];
        self.irq_reload_pending = data[12] != 0;
        self.irq_enabled = data[13] != 0;
        self.irq_pending = data[14] != 0;
        self.prg_ram.copy_from_slice(&data[15..15 + PRG_RAM_SIZE]);
        if self.chr_is_ram {
            self.chr.copy_from_slice(&data[15 + PRG_RAM_SIZE..]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_cartridge;
    use super::*;

    fn mmc3() -> Mmc3 {
        Mmc3::new(test_cartridge(4, 4, 2)) // eight 8K PRG banks, 16 1K CHR banks
    }

    #[test]
    fn test_fixed_banks_at_power_on() {
        let mut cart = test_cartridge(4, 4, 2);
        cart.prg_rom[0x6 * 0x2000] = 0x66; // second-to-last bank
        cart.prg_rom[0x7 * 0x2000] = 0x77; // last bank
        let mapper = Mmc3::new(cart);

        assert_eq!(mapper.prg_read(0xC000), 0x66);
        assert_eq!(mapper.prg_read(0xE000), 0x77);
    }

    #[test]
    fn test_prg_bank_select_and_swap() {
        let mut cart = test_cartridge(4, 4, 2);
        cart.prg_rom[0x3 * 0x2000] = 0x33;
        cart.prg_rom[0x6 * 0x2000] = 0x66;
        let mut mapper = Mmc3::new(cart);

        mapper.prg_write(0x8000, 6); // select R6
        mapper.prg_write(0x8001, 3); // R6 = bank 3
        assert_eq!(mapper.prg_read(0x8000), 0x33);

        mapper.prg_write(0x8000, 6 | 0x40); // swap mode: $8000 fixed, $C000 = R6
        assert_eq!(mapper.prg_read(0x8000), 0x66);
        assert_eq!(mapper.prg_read(0xC000), 0x33);
    }

    #[test]
    fn test_chr_banking_with_invert() {
        let mut cart = test_cartridge(4, 4, 2);
        cart.chr[0x4 * 0x400] = 0x44; // 1K bank 4
        let mut mapper = Mmc3::new(cart);

        mapper.prg_write(0x8000, 0); // select R0 (2K slot at $0000)
        mapper.prg_write(0x8001, 4);
        assert_eq!(mapper.chr_read(0x0000), 0x44);

        mapper.prg_write(0x8000, 0x80); // invert: 2K slots move to $1000
        assert_eq!(mapper.chr_read(0x1000), 0x44);
    }

    #[test]
    fn test_mirroring_register() {
        let mut mapper = mmc3();
        mapper.prg_write(0xA000, 1);
        assert_eq!(mapper.mirroring(), Mirroring::Horizontal);
        mapper.prg_write(0xA000, 0);
        assert_eq!(mapper.mirroring(), Mirroring::Vertical);
    }

    #[test]
    fn test_scanline_irq_fires_after_latch_count() {
        let mut mapper = mmc3();
        mapper.prg_write(0xC000, 3); // latch = 3
        mapper.prg_write(0xC001, 0); // reload
        mapper.prg_write(0xE001, 0); // enable

        // Reload scanline + 3 countdown scanlines
        mapper.notify_scanline();
        assert!(!mapper.poll_irq());
        mapper.notify_scanline();
        mapper.notify_scanline();
        assert!(!mapper.poll_irq());
        mapper.notify_scanline();
        assert!(mapper.poll_irq());
        assert!(!mapper.poll_irq()); // line cleared by the poll
    }

    #[test]
    fn test_irq_disable_acknowledges() {
        let mut mapper = mmc3();
        mapper.prg_write(0xC000, 0);
        mapper.prg_write(0xC001, 0);
        mapper.prg_write(0xE001, 0);
        mapper.notify_scanline();
        mapper.prg_write(0xE000, 0); // disable + acknowledge
        assert!(!mapper.poll_irq());
    }
}
