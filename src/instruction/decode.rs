use std::error;
use std::fmt;

use crate::memory::Word;
use crate::register::Register;

use super::{
    sign_extend, BranchOp, ImmOp, Instruction, JumpOp, LoadOp, RegOp, ShiftOp, StoreOp, UpperOp,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    UnknownRType { funct4: u8, funct3: u8 },
    UnknownShiftMode { mode: u8 },
    UnknownStore { funct3: u8 },
    UnknownLoad { funct3: u8 },
    /// A code with no entry in the operation table of a fully assigned format
    Unassigned { format: char, code: u8 },
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeErrorKind::UnknownRType { funct4, funct3 } => write!(
                f,
                "no R-type operation for funct4 `0x{:X}`, funct3 `0x{:X}`",
                funct4, funct3
            ),
            DecodeErrorKind::UnknownShiftMode { mode } => {
                write!(f, "invalid shift mode `0x{:X}`", mode)
            }
            DecodeErrorKind::UnknownStore { funct3 } => {
                write!(f, "no store for funct3 `0x{:X}`", funct3)
            }
            DecodeErrorKind::UnknownLoad { funct3 } => {
                write!(f, "no load for funct3 `0x{:X}`", funct3)
            }
            DecodeErrorKind::Unassigned { format, code } => {
                write!(f, "no {}-type operation for code `0x{:X}`", format, code)
            }
        }
    }
}

/// A word whose format is known but whose operation fields match nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    pub word: Word,
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    fn new(word: Word, kind: DecodeErrorKind) -> Self {
        Self { word, kind }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown instruction 0x{:04X} ({})", self.word, self.kind)
    }
}

impl error::Error for DecodeError {}

/// Bit-field accessors over a raw instruction word
#[derive(Debug, Clone, Copy)]
struct Fields(Word);

impl Fields {
    fn bits(self, shift: u32, width: u32) -> Word {
        (self.0 >> shift) & ((1 << width) - 1)
    }

    fn opcode(self) -> u8 {
        self.bits(0, 3) as u8
    }

    fn funct3(self) -> u8 {
        self.bits(3, 3) as u8
    }

    fn funct4(self) -> u8 {
        self.bits(12, 4) as u8
    }

    /// `rd` / `rd_rs1` / `rs1`, bits [8:6]
    fn rd(self) -> Register {
        Register::from_field(self.0, 6)
    }

    /// bits [11:9]
    fn rs2(self) -> Register {
        Register::from_field(self.0, 9)
    }

    /// 4-bit offset in bits [15:12]
    fn offset4(self) -> Word {
        self.bits(12, 4)
    }

    /// bits [15:9]
    fn imm7(self) -> Word {
        self.bits(9, 7)
    }

    /// bits [14:9]
    fn imm_high(self) -> Word {
        self.bits(9, 6)
    }

    /// bits [5:3]
    fn imm_low(self) -> Word {
        self.bits(3, 3)
    }

    fn flag(self) -> u8 {
        self.bits(15, 1) as u8
    }
}

impl Instruction {
    /// Decodes a raw instruction word.
    ///
    /// # Errors
    ///
    /// Every opcode selects a format, but some formats leave funct codes
    /// unassigned. Those words produce a [`DecodeError`].
    pub fn decode(word: Word) -> Result<Self, DecodeError> {
        let fields = Fields(word);
        let funct3 = fields.funct3();
        let unassigned =
            |format, code| DecodeError::new(word, DecodeErrorKind::Unassigned { format, code });

        let instruction = match fields.opcode() {
            0 => {
                let funct4 = fields.funct4();
                let op = RegOp::from_code((funct4, funct3)).ok_or_else(|| {
                    DecodeError::new(word, DecodeErrorKind::UnknownRType { funct4, funct3 })
                })?;
                Instruction::R {
                    op,
                    rd_rs1: fields.rd(),
                    rs2: fields.rs2(),
                }
            }
            1 => {
                let imm7 = fields.imm7();
                match ImmOp::from_code(funct3) {
                    Some(op) => {
                        let imm = match op {
                            ImmOp::Sltui => imm7,
                            _ => sign_extend(imm7, 7),
                        };
                        Instruction::I {
                            op,
                            rd_rs1: fields.rd(),
                            imm,
                        }
                    }
                    // funct3 3 is the only code without an ImmOp
                    None => {
                        let mode = ((imm7 >> 4) & 0x7) as u8;
                        let op = ShiftOp::from_code(mode).ok_or_else(|| {
                            DecodeError::new(word, DecodeErrorKind::UnknownShiftMode { mode })
                        })?;
                        Instruction::Shift {
                            op,
                            rd_rs1: fields.rd(),
                            shamt: (imm7 & 0xF) as u8,
                        }
                    }
                }
            }
            2 => Instruction::B {
                op: BranchOp::from_code(funct3).ok_or_else(|| unassigned('B', funct3))?,
                rs1: fields.rd(),
                rs2: fields.rs2(),
                offset: sign_extend(fields.offset4(), 4) as i16,
            },
            3 => Instruction::S {
                op: StoreOp::from_code(funct3).ok_or_else(|| {
                    DecodeError::new(word, DecodeErrorKind::UnknownStore { funct3 })
                })?,
                rs1: fields.rd(),
                rs2: fields.rs2(),
                offset: fields.offset4(),
            },
            4 => Instruction::L {
                op: LoadOp::from_code(funct3).ok_or_else(|| {
                    DecodeError::new(word, DecodeErrorKind::UnknownLoad { funct3 })
                })?,
                rd: fields.rd(),
                rs2: fields.rs2(),
                offset: fields.offset4(),
            },
            5 => {
                let imm = fields.imm_high() << 4 | fields.imm_low() << 1;
                Instruction::J {
                    op: JumpOp::from_code(fields.flag())
                        .ok_or_else(|| unassigned('J', fields.flag()))?,
                    rd: fields.rd(),
                    imm: sign_extend(imm, 10) as i16,
                }
            }
            6 => Instruction::U {
                op: UpperOp::from_code(fields.flag())
                    .ok_or_else(|| unassigned('U', fields.flag()))?,
                rd: fields.rd(),
                imm: fields.imm_high() << 10 | fields.imm_low() << 7,
            },
            _ => Instruction::Sys {
                svc: fields.bits(6, 10),
            },
        };

        Ok(instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::asm;

    #[test]
    fn decode_r_type() {
        assert_eq!(
            Instruction::decode(asm::r(0x0, Register::T1, Register::T0, 0x0)),
            Ok(Instruction::R {
                op: RegOp::Add,
                rd_rs1: Register::T0,
                rs2: Register::T1,
            })
        );
        assert_eq!(
            Instruction::decode(asm::r(0xC, Register::A0, Register::Ra, 0x0)),
            Ok(Instruction::R {
                op: RegOp::Jalr,
                rd_rs1: Register::Ra,
                rs2: Register::A0,
            })
        );
    }

    #[test]
    fn decode_r_type_mismatched_functs() {
        // sub with the funct3 of slt
        let word = asm::r(0x1, Register::T1, Register::T0, 0x1);
        assert_eq!(
            Instruction::decode(word),
            Err(DecodeError::new(
                word,
                DecodeErrorKind::UnknownRType {
                    funct4: 0x1,
                    funct3: 0x1
                }
            ))
        );
        assert!(Instruction::decode(asm::r(0xF, Register::T0, Register::T0, 0x0)).is_err());
    }

    #[test]
    fn decode_i_type_sign_extension() {
        assert_eq!(
            Instruction::decode(asm::i(0x7F, Register::T0, 0x0)),
            Ok(Instruction::I {
                op: ImmOp::Addi,
                rd_rs1: Register::T0,
                imm: 0xFFFF,
            })
        );
        assert_eq!(
            Instruction::decode(asm::i(0x40, Register::T0, 0x2)),
            Ok(Instruction::I {
                op: ImmOp::Sltui,
                rd_rs1: Register::T0,
                imm: 0x40,
            })
        );
        assert_eq!(
            Instruction::decode(asm::i(0x3F, Register::A0, 0x7)),
            Ok(Instruction::I {
                op: ImmOp::Li,
                rd_rs1: Register::A0,
                imm: 63,
            })
        );
    }

    #[test]
    fn decode_shifts() {
        assert_eq!(
            Instruction::decode(asm::i(0x1 << 4 | 3, Register::S0, 0x3)),
            Ok(Instruction::Shift {
                op: ShiftOp::Slli,
                rd_rs1: Register::S0,
                shamt: 3,
            })
        );
        assert_eq!(
            Instruction::decode(asm::i(0x4 << 4 | 0xF, Register::S0, 0x3)),
            Ok(Instruction::Shift {
                op: ShiftOp::Srai,
                rd_rs1: Register::S0,
                shamt: 15,
            })
        );

        let word = asm::i(0x3 << 4, Register::S0, 0x3);
        assert_eq!(
            Instruction::decode(word),
            Err(DecodeError::new(
                word,
                DecodeErrorKind::UnknownShiftMode { mode: 0x3 }
            ))
        );
    }

    #[test]
    fn decode_branch_offsets() {
        assert_eq!(
            Instruction::decode(asm::b(0xF, Register::T1, Register::T0, 0x0)),
            Ok(Instruction::B {
                op: BranchOp::Beq,
                rs1: Register::T0,
                rs2: Register::T1,
                offset: -1,
            })
        );
        assert_eq!(
            Instruction::decode(asm::b(0x7, Register::T0, Register::A1, 0x7)),
            Ok(Instruction::B {
                op: BranchOp::Bgeu,
                rs1: Register::A1,
                rs2: Register::T0,
                offset: 7,
            })
        );
    }

    #[test]
    fn every_branch_funct3_is_assigned() {
        for funct3 in 0..8 {
            let decoded = Instruction::decode(asm::b(0, Register::T0, Register::T0, funct3));
            match decoded {
                Ok(Instruction::B { op, .. }) => assert_eq!(op.code(), funct3 as u8),
                other => panic!("funct3 {} decoded as {:?}", funct3, other),
            }
        }
    }

    #[test]
    fn link_flag_selects_by_code() {
        for (link, op) in [(false, JumpOp::J), (true, JumpOp::Jal)] {
            match Instruction::decode(asm::j(link, 0, Register::Ra)) {
                Ok(Instruction::J { op: decoded, .. }) => assert_eq!(decoded, op),
                other => panic!("link {} decoded as {:?}", link, other),
            }
        }
        for (auipc, op) in [(false, UpperOp::Lui), (true, UpperOp::Auipc)] {
            match Instruction::decode(asm::u(auipc, 0, Register::Ra)) {
                Ok(Instruction::U { op: decoded, .. }) => assert_eq!(decoded, op),
                other => panic!("flag {} decoded as {:?}", auipc, other),
            }
        }
    }

    #[test]
    fn decode_memory_access() {
        assert_eq!(
            Instruction::decode(asm::s(0x0, Register::Sp, Register::A0, 0x1)),
            Ok(Instruction::S {
                op: StoreOp::Sw,
                rs1: Register::A0,
                rs2: Register::Sp,
                offset: 0,
            })
        );
        assert_eq!(
            Instruction::decode(asm::l(0xF, Register::Sp, Register::A1, 0x4)),
            Ok(Instruction::L {
                op: LoadOp::Lbu,
                rd: Register::A1,
                rs2: Register::Sp,
                offset: 15,
            })
        );
        assert!(Instruction::decode(asm::s(0, Register::Sp, Register::A0, 0x2)).is_err());
        assert!(Instruction::decode(asm::l(0, Register::Sp, Register::A0, 0x3)).is_err());
    }

    #[test]
    fn decode_jumps() {
        assert_eq!(
            Instruction::decode(asm::j(false, -8, Register::T0)),
            Ok(Instruction::J {
                op: JumpOp::J,
                rd: Register::T0,
                imm: -8,
            })
        );
        assert_eq!(
            Instruction::decode(asm::j(true, 510, Register::Ra)),
            Ok(Instruction::J {
                op: JumpOp::Jal,
                rd: Register::Ra,
                imm: 510,
            })
        );
        assert_eq!(
            Instruction::decode(asm::j(true, -512, Register::Ra)),
            Ok(Instruction::J {
                op: JumpOp::Jal,
                rd: Register::Ra,
                imm: -512,
            })
        );
    }

    #[test]
    fn decode_upper_immediates() {
        assert_eq!(
            Instruction::decode(asm::u(false, 0xFF80, Register::T0)),
            Ok(Instruction::U {
                op: UpperOp::Lui,
                rd: Register::T0,
                imm: 0xFF80,
            })
        );
        assert_eq!(
            Instruction::decode(asm::u(true, 0x0480, Register::A0)),
            Ok(Instruction::U {
                op: UpperOp::Auipc,
                rd: Register::A0,
                imm: 0x0480,
            })
        );
    }

    #[test]
    fn decode_ecall() {
        assert_eq!(
            Instruction::decode(asm::ecall(3)),
            Ok(Instruction::Sys { svc: 3 })
        );
        assert_eq!(
            Instruction::decode(asm::ecall(0x3FF)),
            Ok(Instruction::Sys { svc: 0x3FF })
        );
    }

    #[test]
    fn decode_error_message() {
        let err = Instruction::decode(0x0038).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown instruction 0x0038 (no R-type operation for funct4 `0x0`, funct3 `0x7`)"
        );
    }
}
