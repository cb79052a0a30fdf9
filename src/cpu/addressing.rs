use super::Cpu;
use crate::bus::Bus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
    Implied,
    Accumulator,
}

pub fn pages_differ(a: u16, b: u16) -> bool {
    (a & 0xFF00) != (b & 0xFF00)
}

impl Cpu {
    fn fetch_operand_byte(&mut self, bus: &mut Bus) -> u8 {
        let val = bus.cpu_read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        val
    }

    fn fetch_operand_word(&mut self, bus: &mut Bus) -> u16 {
        let lo = self.fetch_operand_byte(bus) as u16;
        let hi = self.fetch_operand_byte(bus) as u16;
        (hi << 8) | lo
    }

    /// Resolve the effective address for the current instruction, consuming
    /// its operand bytes. The second value is 1 when an indexed read
    /// crossed a page (the caller decides whether that costs anything).
    pub(super) fn resolve_address(&mut self, bus: &mut Bus, mode: AddressingMode) -> (u16, u8) {
        match mode {
            AddressingMode::Immediate => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                (addr, 0)
            }
            AddressingMode::ZeroPage => (self.fetch_operand_byte(bus) as u16, 0),
            AddressingMode::ZeroPageX => {
                let base = self.fetch_operand_byte(bus);
                (base.wrapping_add(self.x) as u16, 0)
            }
            AddressingMode::ZeroPageY => {
                let base = self.fetch_operand_byte(bus);
                (base.wrapping_add(self.y) as u16, 0)
            }
            AddressingMode::Absolute => (self.fetch_operand_word(bus), 0),
            AddressingMode::AbsoluteX => {
                let base = self.fetch_operand_word(bus);
                let addr = base.wrapping_add(self.x as u16);
                (addr, pages_differ(base, addr) as u8)
            }
            AddressingMode::AbsoluteY => {
                let base = self.fetch_operand_word(bus);
                let addr = base.wrapping_add(self.y as u16);
                (addr, pages_differ(base, addr) as u8)
            }
            AddressingMode::Indirect => {
                // JMP ($xxFF) wraps within the page instead of crossing it
                let ptr = self.fetch_operand_word(bus);
                let lo = bus.cpu_read(ptr) as u16;
                let hi_addr = if ptr & 0x00FF == 0x00FF {
                    ptr & 0xFF00
                } else {
                    ptr.wrapping_add(1)
                };
                let hi = bus.cpu_read(hi_addr) as u16;
                ((hi << 8) | lo, 0)
            }
            AddressingMode::IndirectX => {
                let ptr = self.fetch_operand_byte(bus).wrapping_add(self.x);
                let lo = bus.cpu_read(ptr as u16) as u16;
                let hi = bus.cpu_read(ptr.wrapping_add(1) as u16) as u16;
                ((hi << 8) | lo, 0)
            }
            AddressingMode::IndirectY => {
                let ptr = self.fetch_operand_byte(bus);
                let lo = bus.cpu_read(ptr as u16) as u16;
                let hi = bus.cpu_read(ptr.wrapping_add(1) as u16) as u16;
                let base = (hi << 8) | lo;
                let addr = base.wrapping_add(self.y as u16);
                (addr, pages_differ(base, addr) as u8)
            }
            // Relative is consumed by the branch logic; the rest have no
            // memory operand at all
            AddressingMode::Relative | AddressingMode::Implied | AddressingMode::Accumulator => {
                (0, 0)
            }
        }
    }
}
