use super::opcodes::OPCODES;
use super::Cpu;
use crate::bus::Bus;

impl Cpu {
    /// Nestest-style trace line for the instruction at PC:
    /// "C000  4C F5 C5  JMP  A:00 X:00 Y:00 P:24 SP:FD CYC:7".
    /// Reads go through `peek` so tracing never perturbs the machine.
    pub fn trace(&self, bus: &Bus) -> String {
        let pc = self.pc;
        let opcode = bus.peek(pc);
        let info = &OPCODES[opcode as usize];

        let bytes: Vec<String> = (0..info.bytes as u16)
            .map(|i| format!("{:02X}", bus.peek(pc.wrapping_add(i))))
            .collect();

        format!(
            "{:04X}  {:<8}  {:<4} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            pc,
            bytes.join(" "),
            info.name,
            self.a,
            self.x,
            self.y,
            self.status.bits(),
            self.sp,
            self.cycles,
        )
    }
}
