//! The 6502 opcode matrix. Every one of the 256 encodings has an entry,
//! including the unofficial ones; execution dispatches on the mnemonic,
//! so the matrix is the single source of truth for byte counts, base
//! cycle costs, and page-cross penalties.

use super::addressing::AddressingMode;

/// Instruction families. Unofficial opcodes with stable, game-relied-upon
/// behavior (LAX, SAX, DCP, ISB, SLO, RLA, SRE, RRA) execute for real;
/// the unstable leftovers (ANC, ALR, ARR, AXS, XAA, AHX, TAS, SHX, SHY,
/// LAS, KIL) are costed as NOPs of the right width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs,
    Clc, Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx,
    Iny, Jmp, Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp,
    Rol, Ror, Rti, Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay,
    Tsx, Txa, Txs, Tya,
    // Unofficial, implemented
    Lax, Sax, Dcp, Isb, Slo, Rla, Sre, Rra,
}

pub struct OpInfo {
    pub mnemonic: Mnemonic,
    pub name: &'static str,
    pub mode: AddressingMode,
    pub bytes: u8,
    pub cycles: u8,
    /// Whether a page-crossing index read costs one extra cycle.
    pub page_penalty: bool,
}

const fn op(
    mnemonic: Mnemonic,
    name: &'static str,
    mode: AddressingMode,
    bytes: u8,
    cycles: u8,
    page_penalty: bool,
) -> OpInfo {
    OpInfo {
        mnemonic,
        name,
        mode,
        bytes,
        cycles,
        page_penalty,
    }
}

use self::Mnemonic as M;
use super::addressing::AddressingMode as A;

#[rustfmt::skip]
pub const OPCODES: [OpInfo; 256] = [
    // 0x00
    op(M::Brk, "BRK", A::Implied, 1, 7, false),
    op(M::Ora, "ORA", A::IndirectX, 2, 6, false),
    op(M::Nop, "*KIL", A::Implied, 1, 2, false),
    op(M::Slo, "*SLO", A::IndirectX, 2, 8, false),
    op(M::Nop, "*NOP", A::ZeroPage, 2, 3, false),
    op(M::Ora, "ORA", A::ZeroPage, 2, 3, false),
    op(M::Asl, "ASL", A::ZeroPage, 2, 5, false),
    op(M::Slo, "*SLO", A::ZeroPage, 2, 5, false),
    op(M::Php, "PHP", A::Implied, 1, 3, false),
    op(M::Ora, "ORA", A::Immediate, 2, 2, false),
    op(M::Asl, "ASL", A::Accumulator, 1, 2, false),
    op(M::Nop, "*ANC", A::Immediate, 2, 2, false),
    op(M::Nop, "*NOP", A::Absolute, 3, 4, false),
    op(M::Ora, "ORA", A::Absolute, 3, 4, false),
    op(M::Asl, "ASL", A::Absolute, 3, 6, false),
    op(M::Slo, "*SLO", A::Absolute, 3, 6, false),
    // 0x10
    op(M::Bpl, "BPL", A::Relative, 2, 2, false),
    op(M::Ora, "ORA", A::IndirectY, 2, 5, true),
    op(M::Nop, "*KIL", A::Implied, 1, 2, false),
    op(M::Slo, "*SLO", A::IndirectY, 2, 8, false),
    op(M::Nop, "*NOP", A::ZeroPageX, 2, 4, false),
    op(M::Ora, "ORA", A::ZeroPageX, 2, 4, false),
    op(M::Asl, "ASL", A::ZeroPageX, 2, 6, false),
    op(M::Slo, "*SLO", A::ZeroPageX, 2, 6, false),
    op(M::Clc, "CLC", A::Implied, 1, 2, false),
    op(M::Ora, "ORA", A::AbsoluteY, 3, 4, true),
    op(M::Nop, "*NOP", A::Implied, 1, 2, false),
    op(M::Slo, "*SLO", A::AbsoluteY, 3, 7, false),
    op(M::Nop, "*NOP", A::AbsoluteX, 3, 4, true),
    op(M::Ora, "ORA", A::AbsoluteX, 3, 4, true),
    op(M::Asl, "ASL", A::AbsoluteX, 3, 7, false),
    op(M::Slo, "*SLO", A::AbsoluteX, 3, 7, false),
    // 0x20
    op(M::Jsr, "JSR", A::Absolute, 3, 6, false),
    op(M::And, "AND", A::IndirectX, 2, 6, false),
    op(M::Nop, "*KIL", A::Implied, 1, 2, false),
    op(M::Rla, "*RLA", A::IndirectX, 2, 8, false),
    op(M::Bit, "BIT", A::ZeroPage, 2, 3, false),
    op(M::And, "AND", A::ZeroPage, 2, 3, false),
    op(M::Rol, "ROL", A::ZeroPage, 2, 5, false),
    op(M::Rla, "*RLA", A::ZeroPage, 2, 5, false),
    op(M::Plp, "PLP", A::Implied, 1, 4, false),
    op(M::And, "AND", A::Immediate, 2, 2, false),
    op(M::Rol, "ROL", A::Accumulator, 1, 2, false),
    op(M::Nop, "*ANC", A::Immediate, 2, 2, false),
    op(M::Bit, "BIT", A::Absolute, 3, 4, false),
    op(M::And, "AND", A::Absolute, 3, 4, false),
    op(M::Rol, "ROL", A::Absolute, 3, 6, false),
    op(M::Rla, "*RLA", A::Absolute, 3, 6, false),
    // 0x30
    op(M::Bmi, "BMI", A::Relative, 2, 2, false),
    op(M::And, "AND", A::IndirectY, 2, 5, true),
    op(M::Nop, "*KIL", A::Implied, 1, 2, false),
    op(M::Rla, "*RLA", A::IndirectY, 2, 8, false),
    op(M::Nop, "*NOP", A::ZeroPageX, 2, 4, false),
    op(M::And, "AND", A::ZeroPageX, 2, 4, false),
    op(M::Rol, "ROL", A::ZeroPageX, 2, 6, false),
    op(M::Rla, "*RLA", A::ZeroPageX, 2, 6, false),
    op(M::Sec, "SEC", A::Implied, 1, 2, false),
    op(M::And, "AND", A::AbsoluteY, 3, 4, true),
    op(M::Nop, "*NOP", A::Implied, 1, 2, false),
    op(M::Rla, "*RLA", A::AbsoluteY, 3, 7, false),
    op(M::Nop, "*NOP", A::AbsoluteX, 3, 4, true),
    op(M::And, "AND", A::AbsoluteX, 3, 4, true),
    op(M::Rol, "ROL", A::AbsoluteX, 3, 7, false),
    op(M::Rla, "*RLA", A::AbsoluteX, 3, 7, false),
    // 0x40
    op(M::Rti, "RTI", A::Implied, 1, 6, false),
    op(M::Eor, "EOR", A::IndirectX, 2, 6, false),
    op(M::Nop, "*KIL", A::Implied, 1, 2, false),
    op(M::Sre, "*SRE", A::IndirectX, 2, 8, false),
    op(M::Nop, "*NOP", A::ZeroPage, 2, 3, false),
    op(M::Eor, "EOR", A::ZeroPage, 2, 3, false),
    op(M::Lsr, "LSR", A::ZeroPage, 2, 5, false),
    op(M::Sre, "*SRE", A::ZeroPage, 2, 5, false),
    op(M::Pha, "PHA", A::Implied, 1, 3, false),
    op(M::Eor, "EOR", A::Immediate, 2, 2, false),
    op(M::Lsr, "LSR", A::Accumulator, 1, 2, false),
    op(M::Nop, "*ALR", A::Immediate, 2, 2, false),
    op(M::Jmp, "JMP", A::Absolute, 3, 3, false),
    op(M::Eor, "EOR", A::Absolute, 3, 4, false),
    op(M::Lsr, "LSR", A::Absolute, 3, 6, false),
    op(M::Sre, "*SRE", A::Absolute, 3, 6, false),
    // 0x50
    op(M::Bvc, "BVC", A::Relative, 2, 2, false),
    op(M::Eor, "EOR", A::IndirectY, 2, 5, true),
    op(M::Nop, "*KIL", A::Implied, 1, 2, false),
    op(M::Sre, "*SRE", A::IndirectY, 2, 8, false),
    op(M::Nop, "*NOP", A::ZeroPageX, 2, 4, false),
    op(M::Eor, "EOR", A::ZeroPageX, 2, 4, false),
    op(M::Lsr, "LSR", A::ZeroPageX, 2, 6, false),
    op(M::Sre, "*SRE", A::ZeroPageX, 2, 6, false),
    op(M::Cli, "CLI", A::Implied, 1, 2, false),
    op(M::Eor, "EOR", A::AbsoluteY, 3, 4, true),
    op(M::Nop, "*NOP", A::Implied, 1, 2, false),
    op(M::Sre, "*SRE", A::AbsoluteY, 3, 7, false),
    op(M::Nop, "*NOP", A::AbsoluteX, 3, 4, true),
    op(M::Eor, "EOR", A::AbsoluteX, 3, 4, true),
    op(M::Lsr, "LSR", A::AbsoluteX, 3, 7, false),
    op(M::Sre, "*SRE", A::AbsoluteX, 3, 7, false),
    // 0x60
    op(M::Rts, "RTS", A::Implied, 1, 6, false),
    op(M::Adc, "ADC", A::IndirectX, 2, 6, false),
    op(M::Nop, "*KIL", A::Implied, 1, 2, false),
    op(M::Rra, "*RRA", A::IndirectX, 2, 8, false),
    op(M::Nop, "*NOP", A::ZeroPage, 2, 3, false),
    op(M::Adc, "ADC", A::ZeroPage, 2, 3, false),
    op(M::Ror, "ROR", A::ZeroPage, 2, 5, false),
    op(M::Rra, "*RRA", A::ZeroPage, 2, 5, false),
    op(M::Pla, "PLA", A::Implied, 1, 4, false),
    op(M::Adc, "ADC", A::Immediate, 2, 2, false),
    op(M::Ror, "ROR", A::Accumulator, 1, 2, false),
    op(M::Nop, "*ARR", A::Immediate, 2, 2, false),
    op(M::Jmp, "JMP", A::Indirect, 3, 5, false),
    op(M::Adc, "ADC", A::Absolute, 3, 4, false),
    op(M::Ror, "ROR", A::Absolute, 3, 6, false),
    op(M::Rra, "*RRA", A::Absolute, 3, 6, false),
    // 0x70
    op(M::Bvs, "BVS", A::Relative, 2, 2, false),
    op(M::Adc, "ADC", A::IndirectY, 2, 5, true),
    op(M::Nop, "*KIL", A::Implied, 1, 2, false),
    op(M::Rra, "*RRA", A::IndirectY, 2, 8, false),
    op(M::Nop, "*NOP", A::ZeroPageX, 2, 4, false),
    op(M::Adc, "ADC", A::ZeroPageX, 2, 4, false),
    op(M::Ror, "ROR", A::ZeroPageX, 2, 6, false),
    op(M::Rra, "*RRA", A::ZeroPageX, 2, 6, false),
    op(M::Sei, "SEI", A::Implied, 1, 2, false),
    op(M::Adc, "ADC", A::AbsoluteY, 3, 4, true),
    op(M::Nop, "*NOP", A::Implied, 1, 2, false),
    op(M::Rra, "*RRA", A::AbsoluteY, 3, 7, false),
    op(M::Nop, "*NOP", A::AbsoluteX, 3, 4, true),
    op(M::Adc, "ADC", A::AbsoluteX, 3, 4, true),
    op(M::Ror, "ROR", A::AbsoluteX, 3, 7, false),
    op(M::Rra, "*RRA", A::AbsoluteX, 3, 7, false),
    // 0x80
    op(M::Nop, "*NOP", A::Immediate, 2, 2, false),
    op(M::Sta, "STA", A::IndirectX, 2, 6, false),
    op(M::Nop, "*NOP", A::Immediate, 2, 2, false),
    op(M::Sax, "*SAX", A::IndirectX, 2, 6, false),
    op(M::Sty, "STY", A::ZeroPage, 2, 3, false),
    op(M::Sta, "STA", A::ZeroPage, 2, 3, false),
    op(M::Stx, "STX", A::ZeroPage, 2, 3, false),
    op(M::Sax, "*SAX", A::ZeroPage, 2, 3, false),
    op(M::Dey, "DEY", A::Implied, 1, 2, false),
    op(M::Nop, "*NOP", A::Immediate, 2, 2, false),
    op(M::Txa, "TXA", A::Implied, 1, 2, false),
    op(M::Nop, "*XAA", A::Immediate, 2, 2, false),
    op(M::Sty, "STY", A::Absolute, 3, 4, false),
    op(M::Sta, "STA", A::Absolute, 3, 4, false),
    op(M::Stx, "STX", A::Absolute, 3, 4, false),
    op(M::Sax, "*SAX", A::Absolute, 3, 4, false),
    // 0x90
    op(M::Bcc, "BCC", A::Relative, 2, 2, false),
    op(M::Sta, "STA", A::IndirectY, 2, 6, false),
    op(M::Nop, "*KIL", A::Implied, 1, 2, false),
    op(M::Nop, "*AHX", A::IndirectY, 2, 6, false),
    op(M::Sty, "STY", A::ZeroPageX, 2, 4, false),
    op(M::Sta, "STA", A::ZeroPageX, 2, 4, false),
    op(M::Stx, "STX", A::ZeroPageY, 2, 4, false),
    op(M::Sax, "*SAX", A::ZeroPageY, 2, 4, false),
    op(M::Tya, "TYA", A::Implied, 1, 2, false),
    op(M::Sta, "STA", A::AbsoluteY, 3, 5, false),
    op(M::Txs, "TXS", A::Implied, 1, 2, false),
    op(M::Nop, "*TAS", A::AbsoluteY, 3, 5, false),
    op(M::Nop, "*SHY", A::AbsoluteX, 3, 5, false),
    op(M::Sta, "STA", A::AbsoluteX, 3, 5, false),
    op(M::Nop, "*SHX", A::AbsoluteY, 3, 5, false),
    op(M::Nop, "*AHX", A::AbsoluteY, 3, 5, false),
    // 0xA0
    op(M::Ldy, "LDY", A::Immediate, 2, 2, false),
    op(M::Lda, "LDA", A::IndirectX, 2, 6, false),
    op(M::Ldx, "LDX", A::Immediate, 2, 2, false),
    op(M::Lax, "*LAX", A::IndirectX, 2, 6, false),
    op(M::Ldy, "LDY", A::ZeroPage, 2, 3, false),
    op(M::Lda, "LDA", A::ZeroPage, 2, 3, false),
    op(M::Ldx, "LDX", A::ZeroPage, 2, 3, false),
    op(M::Lax, "*LAX", A::ZeroPage, 2, 3, false),
    op(M::Tay, "TAY", A::Implied, 1, 2, false),
    op(M::Lda, "LDA", A::Immediate, 2, 2, false),
    op(M::Tax, "TAX", A::Implied, 1, 2, false),
    op(M::Lax, "*LAX", A::Immediate, 2, 2, false),
    op(M::Ldy, "LDY", A::Absolute, 3, 4, false),
    op(M::Lda, "LDA", A::Absolute, 3, 4, false),
    op(M::Ldx, "LDX", A::Absolute, 3, 4, false),
    op(M::Lax, "*LAX", A::Absolute, 3, 4, false),
    // 0xB0
    op(M::Bcs, "BCS", A::Relative, 2, 2, false),
    op(M::Lda, "LDA", A::IndirectY, 2, 5, true),
    op(M::Nop, "*KIL", A::Implied, 1, 2, false),
    op(M::Lax, "*LAX", A::IndirectY, 2, 5, true),
    op(M::Ldy, "LDY", A::ZeroPageX, 2, 4, false),
    op(M::Lda, "LDA", A::ZeroPageX, 2, 4, false),
    op(M::Ldx, "LDX", A::ZeroPageY, 2, 4, false),
    op(M::Lax, "*LAX", A::ZeroPageY, 2, 4, false),
    op(M::Clv, "CLV", A::Implied, 1, 2, false),
    op(M::Lda, "LDA", A::AbsoluteY, 3, 4, true),
    op(M::Tsx, "TSX", A::Implied, 1, 2, false),
    op(M::Nop, "*LAS", A::AbsoluteY, 3, 4, true),
    op(M::Ldy, "LDY", A::AbsoluteX, 3, 4, true),
    op(M::Lda, "LDA", A::AbsoluteX, 3, 4, true),
    op(M::Ldx, "LDX", A::AbsoluteY, 3, 4, true),
    op(M::Lax, "*LAX", A::AbsoluteY, 3, 4, true),
    // 0xC0
    op(M::Cpy, "CPY", A::Immediate, 2, 2, false),
    op(M::Cmp, "CMP", A::IndirectX, 2, 6, false),
    op(M::Nop, "*NOP", A::Immediate, 2, 2, false),
    op(M::Dcp, "*DCP", A::IndirectX, 2, 8, false),
    op(M::Cpy, "CPY", A::ZeroPage, 2, 3, false),
    op(M::Cmp, "CMP", A::ZeroPage, 2, 3, false),
    op(M::Dec, "DEC", A::ZeroPage, 2, 5, false),
    op(M::Dcp, "*DCP", A::ZeroPage, 2, 5, false),
    op(M::Iny, "INY", A::Implied, 1, 2, false),
    op(M::Cmp, "CMP", A::Immediate, 2, 2, false),
    op(M::Dex, "DEX", A::Implied, 1, 2, false),
    op(M::Nop, "*AXS", A::Immediate, 2, 2, false),
    op(M::Cpy, "CPY", A::Absolute, 3, 4, false),
    op(M::Cmp, "CMP", A::Absolute, 3, 4, false),
    op(M::Dec, "DEC", A::Absolute, 3, 6, false),
    op(M::Dcp, "*DCP", A::Absolute, 3, 6, false),
    // 0xD0
    op(M::Bne, "BNE", A::Relative, 2, 2, false),
    op(M::Cmp, "CMP", A::IndirectY, 2, 5, true),
    op(M::Nop, "*KIL", A::Implied, 1, 2, false),
    op(M::Dcp, "*DCP", A::IndirectY, 2, 8, false),
    op(M::Nop, "*NOP", A::ZeroPageX, 2, 4, false),
    op(M::Cmp, "CMP", A::ZeroPageX, 2, 4, false),
    op(M::Dec, "DEC", A::ZeroPageX, 2, 6, false),
    op(M::Dcp, "*DCP", A::ZeroPageX, 2, 6, false),
    op(M::Cld, "CLD", A::Implied, 1, 2, false),
    op(M::Cmp, "CMP", A::AbsoluteY, 3, 4, true),
    op(M::Nop, "*NOP", A::Implied, 1, 2, false),
    op(M::Dcp, "*DCP", A::AbsoluteY, 3, 7, false),
    op(M::Nop, "*NOP", A::AbsoluteX, 3, 4, true),
    op(M::Cmp, "CMP", A::AbsoluteX, 3, 4, true),
    op(M::Dec, "DEC", A::AbsoluteX, 3, 7, false),
    op(M::Dcp, "*DCP", A::AbsoluteX, 3, 7, false),
    // 0xE0
    op(M::Cpx, "CPX", A::Immediate, 2, 2, false),
    op(M::Sbc, "SBC", A::IndirectX, 2, 6, false),
    op(M::Nop, "*NOP", A::Immediate, 2, 2, false),
    op(M::Isb, "*ISB", A::IndirectX, 2, 8, false),
    op(M::Cpx, "CPX", A::ZeroPage, 2, 3, false),
    op(M::Sbc, "SBC", A::ZeroPage, 2, 3, false),
    op(M::Inc, "INC", A::ZeroPage, 2, 5, false),
    op(M::Isb, "*ISB", A::ZeroPage, 2, 5, false),
    op(M::Inx, "INX", A::Implied, 1, 2, false),
    op(M::Sbc, "SBC", A::Immediate, 2, 2, false),
    op(M::Nop, "NOP", A::Implied, 1, 2, false),
    op(M::Sbc, "*SBC", A::Immediate, 2, 2, false),
    op(M::Cpx, "CPX", A::Absolute, 3, 4, false),
    op(M::Sbc, "SBC", A::Absolute, 3, 4, false),
    op(M::Inc, "INC", A::Absolute, 3, 6, false),
    op(M::Isb, "*ISB", A::Absolute, 3, 6, false),
    // 0xF0
    op(M::Beq, "BEQ", A::Relative, 2, 2, false),
    op(M::Sbc, "SBC", A::IndirectY, 2, 5, true),
    op(M::Nop, "*KIL", A::Implied, 1, 2, false),
    op(M::Isb, "*ISB", A::IndirectY, 2, 8, false),
    op(M::Nop, "*NOP", A::ZeroPageX, 2, 4, false),
    op(M::Sbc, "SBC", A::ZeroPageX, 2, 4, false),
    op(M::Inc, "INC", A::ZeroPageX, 2, 6, false),
    op(M::Isb, "*ISB", A::ZeroPageX, 2, 6, false),
    op(M::Sed, "SED", A::Implied, 1, 2, false),
    op(M::Sbc, "SBC", A::AbsoluteY, 3, 4, true),
    op(M::Nop, "*NOP", A::Implied, 1, 2, false),
    op(M::Isb, "*ISB", A::AbsoluteY, 3, 7, false),
    op(M::Nop, "*NOP", A::AbsoluteX, 3, 4, true),
    op(M::Sbc, "SBC", A::AbsoluteX, 3, 4, true),
    op(M::Inc, "INC", A::AbsoluteX, 3, 7, false),
    op(M::Isb, "*ISB", A::AbsoluteX, 3, 7, false),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_entries() {
        let lda_imm = &OPCODES[0xA9];
        assert_eq!(lda_imm.mnemonic, Mnemonic::Lda);
        assert_eq!(lda_imm.bytes, 2);
        assert_eq!(lda_imm.cycles, 2);

        let sta_abs_x = &OPCODES[0x9D];
        assert_eq!(sta_abs_x.mnemonic, Mnemonic::Sta);
        assert_eq!(sta_abs_x.cycles, 5);
        assert!(!sta_abs_x.page_penalty, "stores never pay the page penalty");

        let jmp_ind = &OPCODES[0x6C];
        assert_eq!(jmp_ind.mode, AddressingMode::Indirect);
        assert_eq!(jmp_ind.cycles, 5);
    }

    #[test]
    fn test_byte_counts_match_modes() {
        for (i, info) in OPCODES.iter().enumerate() {
            let expected = match info.mode {
                AddressingMode::Implied | AddressingMode::Accumulator => 1,
                AddressingMode::Immediate
                | AddressingMode::ZeroPage
                | AddressingMode::ZeroPageX
                | AddressingMode::ZeroPageY
                | AddressingMode::IndirectX
                | AddressingMode::IndirectY
                | AddressingMode::Relative => 2,
                AddressingMode::Absolute
                | AddressingMode::AbsoluteX
                | AddressingMode::AbsoluteY
                | AddressingMode::Indirect => 3,
            };
            assert_eq!(info.bytes, expected, "opcode {:#04X}", i);
        }
    }
}
