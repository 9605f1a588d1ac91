use std::fmt;

use super::{BranchOp, ImmOp, Instruction, JumpOp, RegOp};

/// Disassembles the instruction into the text used by the execution trace
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::R {
                op: RegOp::Jr,
                rd_rs1,
                ..
            } => write!(f, "jr {}", rd_rs1),
            Instruction::R { op, rd_rs1, rs2 } => write!(f, "{} {}, {}", op, rd_rs1, rs2),
            Instruction::I {
                op: ImmOp::Sltui,
                rd_rs1,
                imm,
            } => write!(f, "sltui {}, {}", rd_rs1, imm),
            Instruction::I { op, rd_rs1, imm } => write!(f, "{} {}, {}", op, rd_rs1, imm as i16),
            Instruction::Shift { op, rd_rs1, shamt } => write!(f, "{} {}, {}", op, rd_rs1, shamt),
            Instruction::B {
                op: op @ (BranchOp::Bz | BranchOp::Bnz),
                rs1,
                offset,
                ..
            } => write!(f, "{} {}, {}", op, rs1, offset),
            Instruction::B {
                op,
                rs1,
                rs2,
                offset,
            } => write!(f, "{} {}, {}, {}", op, rs1, rs2, offset),
            Instruction::S {
                op,
                rs1,
                rs2,
                offset,
            } => write!(f, "{} {}, {}({})", op, rs1, offset, rs2),
            Instruction::L {
                op,
                rd,
                rs2,
                offset,
            } => write!(f, "{} {}, {}({})", op, rd, offset, rs2),
            Instruction::J {
                op: JumpOp::J, imm, ..
            } => write!(f, "j {}", imm),
            Instruction::J { op, rd, imm } => write!(f, "{} {}, {}", op, rd, imm),
            Instruction::U { op, rd, imm } => write!(f, "{} {}, {}", op, rd, imm),
            Instruction::Sys { svc } => write!(f, "ecall {}", svc),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::instruction::{asm, Instruction};
    use crate::memory::Word;
    use crate::register::Register::*;

    fn disasm(word: Word) -> String {
        match Instruction::decode(word) {
            Ok(instruction) => instruction.to_string(),
            Err(err) => err.to_string(),
        }
    }

    #[test]
    fn render_r_type() {
        assert_eq!(disasm(asm::r(0x0, A0, T0, 0x0)), "add t0, a0");
        assert_eq!(disasm(asm::r(0x1, T1, S0, 0x0)), "sub s0, t1");
        assert_eq!(disasm(asm::r(0x3, A1, A0, 0x2)), "sltu a0, a1");
        assert_eq!(disasm(asm::r(0x6, S1, S0, 0x3)), "sra s0, s1");
        assert_eq!(disasm(asm::r(0xA, Sp, T0, 0x7)), "mv t0, sp");
        assert_eq!(disasm(asm::r(0xB, A1, Ra, 0x0)), "jr ra");
        assert_eq!(disasm(asm::r(0xC, T1, Ra, 0x0)), "jalr ra, t1");
    }

    #[test]
    fn render_i_type() {
        assert_eq!(disasm(asm::i(0x7D, T0, 0x0)), "addi t0, -3");
        assert_eq!(disasm(asm::i(0x7D, T0, 0x1)), "slti t0, -3");
        assert_eq!(disasm(asm::i(100, T0, 0x2)), "sltui t0, 100");
        assert_eq!(disasm(asm::i(0x0F, A0, 0x5)), "andi a0, 15");
        assert_eq!(disasm(asm::i(5, A0, 0x7)), "li a0, 5");
        assert_eq!(disasm(asm::i(0x1 << 4 | 3, T0, 0x3)), "slli t0, 3");
        assert_eq!(disasm(asm::i(0x2 << 4 | 8, T0, 0x3)), "srli t0, 8");
        assert_eq!(disasm(asm::i(0x4 << 4 | 1, T0, 0x3)), "srai t0, 1");
    }

    #[test]
    fn render_branches() {
        assert_eq!(disasm(asm::b(0xE, T1, T0, 0x0)), "beq t0, t1, -2");
        assert_eq!(disasm(asm::b(0x4, A1, T0, 0x2)), "bz t0, 4");
        assert_eq!(disasm(asm::b(0x1, A1, A0, 0x3)), "bnz a0, 1");
        assert_eq!(disasm(asm::b(0x3, A1, A0, 0x6)), "bltu a0, a1, 3");
    }

    #[test]
    fn render_memory_access() {
        assert_eq!(disasm(asm::s(2, Sp, A0, 0x0)), "sb a0, 2(sp)");
        assert_eq!(disasm(asm::s(0, Sp, A0, 0x1)), "sw a0, 0(sp)");
        assert_eq!(disasm(asm::l(0, Sp, A1, 0x1)), "lw a1, 0(sp)");
        assert_eq!(disasm(asm::l(15, S0, T1, 0x0)), "lb t1, 15(s0)");
    }

    #[test]
    fn render_jumps_and_upper() {
        assert_eq!(disasm(asm::j(false, -8, T0)), "j -8");
        assert_eq!(disasm(asm::j(true, 16, Ra)), "jal ra, 16");
        assert_eq!(disasm(asm::u(false, 0x0480, T0)), "lui t0, 1152");
        assert_eq!(disasm(asm::u(true, 0x0080, T0)), "auipc t0, 128");
        assert_eq!(disasm(asm::ecall(3)), "ecall 3");
        assert_eq!(disasm(asm::ecall(0x3FF)), "ecall 1023");
    }

    #[test]
    fn render_decode_error() {
        assert_eq!(
            disasm(asm::i(0x7 << 4 | 2, A0, 0x3)),
            format!(
                "unknown instruction 0x{:04X} (invalid shift mode `0x7`)",
                asm::i(0x7 << 4 | 2, A0, 0x3)
            )
        );
    }
}
