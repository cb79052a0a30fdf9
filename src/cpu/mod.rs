pub mod addressing;
pub mod opcodes;
pub mod trace;

use bitflags::bitflags;

use crate::bus::Bus;
use crate::state::CpuState;
use self::addressing::{pages_differ, AddressingMode};
use self::opcodes::{Mnemonic as M, OpInfo, OPCODES};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct CpuFlags: u8 {
        const CARRY     = 0b0000_0001;
        const ZERO      = 0b0000_0010;
        const IRQ_DIS   = 0b0000_0100;
        const DECIMAL   = 0b0000_1000;
        const BREAK     = 0b0001_0000;
        const BREAK2    = 0b0010_0000;
        const OVERFLOW  = 0b0100_0000;
        const NEGATIVE  = 0b1000_0000;
    }
}

const STACK_BASE: u16 = 0x0100;
const NMI_VECTOR: u16 = 0xFFFA;
const RESET_VECTOR: u16 = 0xFFFC;
const IRQ_VECTOR: u16 = 0xFFFE;

/// The 2A03's 6502 core (no decimal mode). Cycle counts include the
/// page-cross and branch surcharges; interrupts are taken only between
/// instructions, which is where `step` leaves the machine.
#[derive(Clone)]
pub struct Cpu {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: CpuFlags,
    pub cycles: u64,
    /// Cycles the CPU is halted for (OAM DMA).
    pub stall: u16,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Cpu {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            status: CpuFlags::from_bits_truncate(0x24), // IRQ disabled, BREAK2 set
            cycles: 0,
            stall: 0,
        }
    }

    pub fn reset(&mut self, bus: &mut Bus) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFD;
        self.status = CpuFlags::from_bits_truncate(0x24);
        self.pc = self.read_vector(bus, RESET_VECTOR);
        self.cycles = 7;
        self.stall = 0;
    }

    fn read_vector(&mut self, bus: &mut Bus, addr: u16) -> u16 {
        let lo = bus.cpu_read(addr) as u16;
        let hi = bus.cpu_read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Service an NMI and return its cycle cost, so the caller can run
    /// the PPU/APU catch-up for the interrupt sequence too.
    pub fn nmi(&mut self, bus: &mut Bus) -> u8 {
        self.interrupt(bus, NMI_VECTOR)
    }

    /// Maskable interrupt request. Ignored while the I flag is set.
    /// Returns the cycle cost (0 when masked).
    pub fn irq(&mut self, bus: &mut Bus) -> u8 {
        if self.status.contains(CpuFlags::IRQ_DIS) {
            return 0;
        }
        self.interrupt(bus, IRQ_VECTOR)
    }

    fn interrupt(&mut self, bus: &mut Bus, vector: u16) -> u8 {
        self.push_word(bus, self.pc);
        // B clear, bit 5 set on the pushed copy
        self.push(bus, (self.status.bits() | 0x20) & !0x10);
        self.status.insert(CpuFlags::IRQ_DIS);
        self.pc = self.read_vector(bus, vector);
        self.cycles += 7;
        7
    }

    fn push(&mut self, bus: &mut Bus, val: u8) {
        bus.cpu_write(STACK_BASE | self.sp as u16, val);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pull(&mut self, bus: &mut Bus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.cpu_read(STACK_BASE | self.sp as u16)
    }

    fn push_word(&mut self, bus: &mut Bus, val: u16) {
        self.push(bus, (val >> 8) as u8);
        self.push(bus, val as u8);
    }

    fn pull_word(&mut self, bus: &mut Bus) -> u16 {
        let lo = self.pull(bus) as u16;
        let hi = self.pull(bus) as u16;
        (hi << 8) | lo
    }

    fn set_zn(&mut self, val: u8) {
        self.status.set(CpuFlags::ZERO, val == 0);
        self.status.set(CpuFlags::NEGATIVE, val & 0x80 != 0);
    }

    /// Pulled status keeps the live B bits; bit 5 always reads set.
    fn set_status_from_stack(&mut self, flags: u8) {
        self.status = CpuFlags::from_bits_truncate((flags & 0xCF) | (self.status.bits() & 0x30));
        self.status.insert(CpuFlags::BREAK2);
    }

    /// Run one instruction (or burn one stall cycle) and return how many
    /// CPU cycles it took.
    pub fn step(&mut self, bus: &mut Bus) -> u8 {
        if self.stall > 0 {
            self.stall -= 1;
            self.cycles += 1;
            return 1;
        }

        let opcode = bus.cpu_read(self.pc);
        self.pc = self.pc.wrapping_add(1);

        let taken = self.execute(bus, opcode);
        self.cycles += taken as u64;
        taken
    }

    fn read_operand(&mut self, bus: &mut Bus, mode: AddressingMode) -> (u8, u8) {
        let (addr, extra) = self.resolve_address(bus, mode);
        (bus.cpu_read(addr), extra)
    }

    /// Read-modify-write against memory; the shift/inc family goes
    /// through here for every mode except Accumulator.
    fn rmw(&mut self, bus: &mut Bus, mode: AddressingMode, f: impl Fn(&mut Cpu, u8) -> u8) -> u8 {
        let (addr, _) = self.resolve_address(bus, mode);
        let val = bus.cpu_read(addr);
        let result = f(self, val);
        bus.cpu_write(addr, result);
        result
    }

    fn branch(&mut self, bus: &mut Bus, condition: bool) -> u8 {
        let offset = bus.cpu_read(self.pc) as i8;
        self.pc = self.pc.wrapping_add(1);
        if condition {
            let target = self.pc.wrapping_add(offset as u16);
            let extra = if pages_differ(self.pc, target) { 2 } else { 1 };
            self.pc = target;
            extra
        } else {
            0
        }
    }

    fn cost(info: &OpInfo, extra: u8) -> u8 {
        if info.page_penalty {
            info.cycles + extra
        } else {
            info.cycles
        }
    }

    fn execute(&mut self, bus: &mut Bus, opcode: u8) -> u8 {
        let info = &OPCODES[opcode as usize];
        let mode = info.mode;

        match info.mnemonic {
            // Loads and stores
            M::Lda => {
                let (val, extra) = self.read_operand(bus, mode);
                self.a = val;
                self.set_zn(val);
                Self::cost(info, extra)
            }
            M::Ldx => {
                let (val, extra) = self.read_operand(bus, mode);
                self.x = val;
                self.set_zn(val);
                Self::cost(info, extra)
            }
            M::Ldy => {
                let (val, extra) = self.read_operand(bus, mode);
                self.y = val;
                self.set_zn(val);
                Self::cost(info, extra)
            }
            M::Sta => {
                let (addr, _) = self.resolve_address(bus, mode);
                bus.cpu_write(addr, self.a);
                info.cycles
            }
            M::Stx => {
                let (addr, _) = self.resolve_address(bus, mode);
                bus.cpu_write(addr, self.x);
                info.cycles
            }
            M::Sty => {
                let (addr, _) = self.resolve_address(bus, mode);
                bus.cpu_write(addr, self.y);
                info.cycles
            }

            // Register transfers
            M::Tax => {
                self.x = self.a;
                self.set_zn(self.x);
                info.cycles
            }
            M::Tay => {
                self.y = self.a;
                self.set_zn(self.y);
                info.cycles
            }
            M::Tsx => {
                self.x = self.sp;
                self.set_zn(self.x);
                info.cycles
            }
            M::Txa => {
                self.a = self.x;
                self.set_zn(self.a);
                info.cycles
            }
            M::Txs => {
                self.sp = self.x;
                info.cycles
            }
            M::Tya => {
                self.a = self.y;
                self.set_zn(self.a);
                info.cycles
            }

            // Arithmetic
            M::Adc => {
                let (val, extra) = self.read_operand(bus, mode);
                self.adc(val);
                Self::cost(info, extra)
            }
            M::Sbc => {
                let (val, extra) = self.read_operand(bus, mode);
                self.sbc(val);
                Self::cost(info, extra)
            }
            M::Cmp => {
                let (val, extra) = self.read_operand(bus, mode);
                self.compare(self.a, val);
                Self::cost(info, extra)
            }
            M::Cpx => {
                let (val, extra) = self.read_operand(bus, mode);
                self.compare(self.x, val);
                Self::cost(info, extra)
            }
            M::Cpy => {
                let (val, extra) = self.read_operand(bus, mode);
                self.compare(self.y, val);
                Self::cost(info, extra)
            }

            // Boolean logic
            M::And => {
                let (val, extra) = self.read_operand(bus, mode);
                self.a &= val;
                self.set_zn(self.a);
                Self::cost(info, extra)
            }
            M::Ora => {
                let (val, extra) = self.read_operand(bus, mode);
                self.a |= val;
                self.set_zn(self.a);
                Self::cost(info, extra)
            }
            M::Eor => {
                let (val, extra) = self.read_operand(bus, mode);
                self.a ^= val;
                self.set_zn(self.a);
                Self::cost(info, extra)
            }
            M::Bit => {
                let (val, _) = self.read_operand(bus, mode);
                self.status.set(CpuFlags::ZERO, self.a & val == 0);
                self.status.set(CpuFlags::OVERFLOW, val & 0x40 != 0);
                self.status.set(CpuFlags::NEGATIVE, val & 0x80 != 0);
                info.cycles
            }

            // Shifts and rotates
            M::Asl => {
                if mode == AddressingMode::Accumulator {
                    self.a = self.asl(self.a);
                } else {
                    self.rmw(bus, mode, Cpu::asl);
                }
                info.cycles
            }
            M::Lsr => {
                if mode == AddressingMode::Accumulator {
                    self.a = self.lsr(self.a);
                } else {
                    self.rmw(bus, mode, Cpu::lsr);
                }
                info.cycles
            }
            M::Rol => {
                if mode == AddressingMode::Accumulator {
                    self.a = self.rol(self.a);
                } else {
                    self.rmw(bus, mode, Cpu::rol);
                }
                info.cycles
            }
            M::Ror => {
                if mode == AddressingMode::Accumulator {
                    self.a = self.ror(self.a);
                } else {
                    self.rmw(bus, mode, Cpu::ror);
                }
                info.cycles
            }

            // Increments and decrements
            M::Inc => {
                let val = self.rmw(bus, mode, |_, v| v.wrapping_add(1));
                self.set_zn(val);
                info.cycles
            }
            M::Dec => {
                let val = self.rmw(bus, mode, |_, v| v.wrapping_sub(1));
                self.set_zn(val);
                info.cycles
            }
            M::Inx => {
                self.x = self.x.wrapping_add(1);
                self.set_zn(self.x);
                info.cycles
            }
            M::Iny => {
                self.y = self.y.wrapping_add(1);
                self.set_zn(self.y);
                info.cycles
            }
            M::Dex => {
                self.x = self.x.wrapping_sub(1);
                self.set_zn(self.x);
                info.cycles
            }
            M::Dey => {
                self.y = self.y.wrapping_sub(1);
                self.set_zn(self.y);
                info.cycles
            }

            // Branches
            M::Bcc => info.cycles + self.branch(bus, !self.status.contains(CpuFlags::CARRY)),
            M::Bcs => info.cycles + self.branch(bus, self.status.contains(CpuFlags::CARRY)),
            M::Beq => info.cycles + self.branch(bus, self.status.contains(CpuFlags::ZERO)),
            M::Bne => info.cycles + self.branch(bus, !self.status.contains(CpuFlags::ZERO)),
            M::Bmi => info.cycles + self.branch(bus, self.status.contains(CpuFlags::NEGATIVE)),
            M::Bpl => info.cycles + self.branch(bus, !self.status.contains(CpuFlags::NEGATIVE)),
            M::Bvc => info.cycles + self.branch(bus, !self.status.contains(CpuFlags::OVERFLOW)),
            M::Bvs => info.cycles + self.branch(bus, self.status.contains(CpuFlags::OVERFLOW)),

            // Jumps and subroutines
            M::Jmp => {
                let (addr, _) = self.resolve_address(bus, mode);
                self.pc = addr;
                info.cycles
            }
            M::Jsr => {
                let (target, _) = self.resolve_address(bus, mode);
                self.push_word(bus, self.pc.wrapping_sub(1));
                self.pc = target;
                info.cycles
            }
            M::Rts => {
                self.pc = self.pull_word(bus).wrapping_add(1);
                info.cycles
            }
            M::Rti => {
                let flags = self.pull(bus);
                self.set_status_from_stack(flags);
                self.pc = self.pull_word(bus);
                info.cycles
            }
            M::Brk => {
                // The byte after BRK is padding
                self.pc = self.pc.wrapping_add(1);
                self.push_word(bus, self.pc);
                self.push(bus, self.status.bits() | 0x30);
                self.status.insert(CpuFlags::IRQ_DIS);
                self.pc = self.read_vector(bus, IRQ_VECTOR);
                info.cycles
            }

            // Stack
            M::Pha => {
                self.push(bus, self.a);
                info.cycles
            }
            M::Php => {
                // B and bit 5 both set on the pushed copy
                self.push(bus, self.status.bits() | 0x30);
                info.cycles
            }
            M::Pla => {
                self.a = self.pull(bus);
                self.set_zn(self.a);
                info.cycles
            }
            M::Plp => {
                let flags = self.pull(bus);
                self.set_status_from_stack(flags);
                info.cycles
            }

            // Flag manipulation
            M::Clc => {
                self.status.remove(CpuFlags::CARRY);
                info.cycles
            }
            M::Cld => {
                self.status.remove(CpuFlags::DECIMAL);
                info.cycles
            }
            M::Cli => {
                self.status.remove(CpuFlags::IRQ_DIS);
                info.cycles
            }
            M::Clv => {
                self.status.remove(CpuFlags::OVERFLOW);
                info.cycles
            }
            M::Sec => {
                self.status.insert(CpuFlags::CARRY);
                info.cycles
            }
            M::Sed => {
                self.status.insert(CpuFlags::DECIMAL);
                info.cycles
            }
            M::Sei => {
                self.status.insert(CpuFlags::IRQ_DIS);
                info.cycles
            }

            // Unofficial opcodes with stable behavior
            M::Lax => {
                let (val, extra) = self.read_operand(bus, mode);
                self.a = val;
                self.x = val;
                self.set_zn(val);
                Self::cost(info, extra)
            }
            M::Sax => {
                let (addr, _) = self.resolve_address(bus, mode);
                bus.cpu_write(addr, self.a & self.x);
                info.cycles
            }
            M::Dcp => {
                let val = self.rmw(bus, mode, |_, v| v.wrapping_sub(1));
                self.compare(self.a, val);
                info.cycles
            }
            M::Isb => {
                let val = self.rmw(bus, mode, |_, v| v.wrapping_add(1));
                self.sbc(val);
                info.cycles
            }
            M::Slo => {
                let val = self.rmw(bus, mode, Cpu::asl);
                self.a |= val;
                self.set_zn(self.a);
                info.cycles
            }
            M::Rla => {
                let val = self.rmw(bus, mode, Cpu::rol);
                self.a &= val;
                self.set_zn(self.a);
                info.cycles
            }
            M::Sre => {
                let val = self.rmw(bus, mode, Cpu::lsr);
                self.a ^= val;
                self.set_zn(self.a);
                info.cycles
            }
            M::Rra => {
                let val = self.rmw(bus, mode, Cpu::ror);
                self.adc(val);
                info.cycles
            }

            // NOPs, official and otherwise: consume the operand bytes the
            // encoding calls for, touch nothing else
            M::Nop => match mode {
                AddressingMode::Implied | AddressingMode::Accumulator => info.cycles,
                _ => {
                    let (_, extra) = self.resolve_address(bus, mode);
                    Self::cost(info, extra)
                }
            },
        }
    }

    fn adc(&mut self, val: u8) {
        let carry = self.status.contains(CpuFlags::CARRY) as u16;
        let sum = self.a as u16 + val as u16 + carry;
        let result = sum as u8;
        self.status.set(CpuFlags::CARRY, sum > 0xFF);
        self.status.set(
            CpuFlags::OVERFLOW,
            (self.a ^ result) & (val ^ result) & 0x80 != 0,
        );
        self.a = result;
        self.set_zn(result);
    }

    fn sbc(&mut self, val: u8) {
        self.adc(val ^ 0xFF); // SBC is ADC of the complement
    }

    fn compare(&mut self, reg: u8, val: u8) {
        self.status.set(CpuFlags::CARRY, reg >= val);
        self.set_zn(reg.wrapping_sub(val));
    }

    fn asl(&mut self, val: u8) -> u8 {
        self.status.set(CpuFlags::CARRY, val & 0x80 != 0);
        let result = val << 1;
        self.set_zn(result);
        result
    }

    fn lsr(&mut self, val: u8) -> u8 {
        self.status.set(CpuFlags::CARRY, val & 0x01 != 0);
        let result = val >> 1;
        self.set_zn(result);
        result
    }

    fn rol(&mut self, val: u8) -> u8 {
        let old_carry = self.status.contains(CpuFlags::CARRY) as u8;
        self.status.set(CpuFlags::CARRY, val & 0x80 != 0);
        let result = (val << 1) | old_carry;
        self.set_zn(result);
        result
    }

    fn ror(&mut self, val: u8) -> u8 {
        let old_carry = self.status.contains(CpuFlags::CARRY) as u8;
        self.status.set(CpuFlags::CARRY, val & 0x01 != 0);
        let result = (val >> 1) | (old_carry << 7);
        self.set_zn(result);
        result
    }

    // --- Save-state support ---

    pub fn snapshot(&self) -> CpuState {
        CpuState {
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.sp,
            pc: self.pc,
            status: self.status.bits(),
            cycles: self.cycles,
            stall: self.stall,
        }
    }

    pub fn restore(&mut self, state: &CpuState) {
        self.a = state.a;
        self.x = state.x;
        self.y = state.y;
        self.sp = state.sp;
        self.pc = state.pc;
        self.status = CpuFlags::from_bits_truncate(state.status);
        self.cycles = state.cycles;
        self.stall = state.stall;
    }
}
