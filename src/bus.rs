use log::trace;

use crate::apu::Apu;
use crate::cartridge::mapper::{self, Mapper};
use crate::cartridge::{Cartridge, CartridgeError};
use crate::controller::Controller;
use crate::ppu::Ppu;

/// The CPU's view of the machine: 2KB of work RAM, the PPU and APU
/// register windows, the two pads, and everything from $4020 up routed
/// through the mapper.
pub struct Bus {
    pub ram: [u8; 2048],
    pub ppu: Ppu,
    pub apu: Apu,
    pub mapper: Box<dyn Mapper>,
    pub controller1: Controller,
    pub controller2: Controller,
    /// CPU cycles the pending OAM DMA will cost (0 when none pending).
    pub dma_stall: u16,
}

impl Bus {
    pub fn new(cartridge: Cartridge) -> Result<Self, CartridgeError> {
        Ok(Bus {
            ram: [0; 2048],
            ppu: Ppu::new(),
            apu: Apu::new(),
            mapper: mapper::create(cartridge)?,
            controller1: Controller::new(),
            controller2: Controller::new(),
            dma_stall: 0,
        })
    }

    pub fn cpu_read(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            0x2000..=0x3FFF => self
                .ppu
                .cpu_read(0x2000 + (addr & 0x07), self.mapper.as_ref()),
            0x4015 => self.apu.read_status(),
            0x4016 => self.controller1.read(),
            0x4017 => self.controller2.read(),
            0x4000..=0x401F => 0, // write-only APU regs, $4014, test registers
            0x4020..=0xFFFF => self.mapper.prg_read(addr),
        }
    }

    pub fn cpu_write(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize] = val,
            0x2000..=0x3FFF => {
                self.ppu
                    .cpu_write(0x2000 + (addr & 0x07), val, self.mapper.as_mut())
            }
            0x4014 => self.oam_dma(val),
            0x4000..=0x4013 => self.apu.cpu_write(addr, val),
            0x4015 => self.apu.write_status(val),
            0x4016 => {
                // The strobe line feeds both pads
                self.controller1.write(val);
                self.controller2.write(val);
            }
            0x4017 => self.apu.write_frame_counter(val),
            0x4018..=0x401F => {
                trace!("ignored write to test register {:#06X}", addr);
            }
            0x4020..=0xFFFF => self.mapper.prg_write(addr, val),
        }
    }

    /// Debug read with no side effects: status flags stay put, the
    /// controller shift registers don't advance.
    pub fn peek(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            0x2000..=0x3FFF => match 0x2000 + (addr & 0x07) {
                0x2002 => self.ppu.status.bits(),
                0x2004 => self.ppu.oam[self.ppu.oam_addr as usize],
                _ => 0,
            },
            0x4015 => self.apu.peek_status(),
            0x4016 => self.controller1.peek(),
            0x4017 => self.controller2.peek(),
            0x4000..=0x401F => 0,
            0x4020..=0xFFFF => self.mapper.prg_read(addr),
        }
    }

    /// $4014 write: copy a 256-byte page into OAM. The CPU is halted for
    /// 513 cycles (the odd-cycle 514th is added by the caller, which
    /// knows the CPU's cycle parity).
    fn oam_dma(&mut self, page: u8) {
        let base = (page as u16) << 8;
        for i in 0..256u16 {
            let val = self.cpu_read(base + i);
            self.ppu.oam[self.ppu.oam_addr.wrapping_add(i as u8) as usize] = val;
        }
        self.dma_stall = 513;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mapper::tests::test_cartridge;
    use crate::controller::BUTTON_A;

    fn test_bus() -> Bus {
        Bus::new(test_cartridge(0, 1, 1)).unwrap()
    }

    #[test]
    fn test_ram_mirrors_every_2k() {
        let mut bus = test_bus();
        bus.cpu_write(0x0000, 0x11);
        assert_eq!(bus.cpu_read(0x0800), 0x11);
        assert_eq!(bus.cpu_read(0x1000), 0x11);
        assert_eq!(bus.cpu_read(0x1800), 0x11);
    }

    #[test]
    fn test_ppu_registers_mirror_through_3fff() {
        let mut bus = test_bus();
        bus.cpu_write(0x2006, 0x21); // $2006 via its mirror at $3FFE
        bus.cpu_write(0x3FFE, 0x00);
        bus.cpu_write(0x2007, 0x5A);
        assert_eq!(bus.ppu.internal_read(0x2100, bus.mapper.as_ref()), 0x5A);
    }

    #[test]
    fn test_controller_strobe_reaches_both_pads() {
        let mut bus = test_bus();
        bus.controller1.buttons = BUTTON_A;
        bus.controller2.buttons = BUTTON_A;
        bus.cpu_write(0x4016, 1);
        bus.cpu_write(0x4016, 0);
        assert_eq!(bus.cpu_read(0x4016), 1);
        assert_eq!(bus.cpu_read(0x4017), 1);
    }

    #[test]
    fn test_oam_dma_copies_page_and_requests_stall() {
        let mut bus = test_bus();
        for i in 0..256u16 {
            bus.cpu_write(0x0200 + i, i as u8);
        }
        bus.cpu_write(0x4014, 0x02);
        assert_eq!(bus.dma_stall, 513);
        assert_eq!(bus.ppu.oam[0], 0);
        assert_eq!(bus.ppu.oam[0xFF], 0xFF);
    }

    #[test]
    fn test_oam_dma_respects_oam_addr_offset() {
        let mut bus = test_bus();
        bus.cpu_write(0x2003, 0x10); // OAMADDR
        bus.cpu_write(0x0200, 0xAB);
        bus.cpu_write(0x4014, 0x02);
        assert_eq!(bus.ppu.oam[0x10], 0xAB);
    }

    #[test]
    fn test_peek_does_not_clear_vblank() {
        let mut bus = test_bus();
        // Tick the PPU to VBlank
        while !bus.ppu.tick(bus.mapper.as_mut()) {}
        assert_ne!(bus.peek(0x2002) & 0x80, 0);
        assert_ne!(bus.peek(0x2002) & 0x80, 0, "peek left the flag alone");
        assert_ne!(bus.cpu_read(0x2002) & 0x80, 0);
        assert_eq!(bus.peek(0x2002) & 0x80, 0, "real read cleared it");
    }

    #[test]
    fn test_cartridge_space_routes_to_mapper() {
        let mut cart = test_cartridge(0, 1, 1);
        cart.prg_rom[0] = 0x42;
        let mut bus = Bus::new(cart).unwrap();
        assert_eq!(bus.cpu_read(0x8000), 0x42);
        assert_eq!(bus.cpu_read(0xC000), 0x42, "NROM-128 mirrors the bank");
    }
}
