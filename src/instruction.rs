//! Z16 instruction formats and the operation tables shared by the decoder,
//! the disassembler and the processor.
//!
//! Every instruction is a single little-endian 16-bit word whose low three
//! bits select one of eight formats:
//!
//! | Format | Fields                                                         |
//! |--------|----------------------------------------------------------------|
//! | R (0)  | funct4[15:12] rs2[11:9] rd/rs1[8:6] funct3[5:3]                |
//! | I (1)  | imm7[15:9] rd/rs1[8:6] funct3[5:3]                             |
//! | B (2)  | offset[15:12] rs2[11:9] rs1[8:6] funct3[5:3]                   |
//! | S (3)  | offset[15:12] rs2[11:9] rs1[8:6] funct3[5:3]                   |
//! | L (4)  | offset[15:12] rs2[11:9] rd[8:6] funct3[5:3]                    |
//! | J (5)  | link[15] imm[9:4] at [14:9] rd[8:6] imm[3:1] at [5:3]          |
//! | U (6)  | auipc[15] imm[15:10] at [14:9] rd[8:6] imm[9:7] at [5:3]       |
//! | SYS (7)| svc[15:6]                                                      |

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::memory::Word;
use crate::register::Register;

mod decode;
mod display;

pub use decode::{DecodeError, DecodeErrorKind};

/// Sign-extends the low `bits` bits of `value` to 16 bits
pub fn sign_extend(value: Word, bits: u32) -> Word {
    debug_assert!(bits > 0 && bits <= 16);
    let shift = 16 - bits;
    (((value << shift) as i16) >> shift) as Word
}

macro_rules! operations {
    (
        $( #[doc = $tdoc:expr] )+
        $table:ident ( $key:ty ) {
            $( $( #[doc = $doc:expr] )+ $name:ident = $code:expr => $mnemonic:literal , )+
        }
    ) => {
        $( #[doc = $tdoc] )+
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $table {
            $(
                $( #[doc = $doc] )+
                $name,
            )+
        }

        impl $table {
            pub const ALL: &'static [Self] = &[ $( Self::$name , )+ ];

            /// Looks up the operation encoded by `code`
            pub fn from_code(code: $key) -> Option<Self> {
                Self::ALL.iter().copied().find(|op| op.code() == code)
            }

            pub fn code(&self) -> $key {
                match self {
                    $( Self::$name => $code , )+
                }
            }

            pub fn mnemonic(&self) -> &'static str {
                match self {
                    $( Self::$name => $mnemonic , )+
                }
            }
        }

        impl fmt::Display for $table {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.mnemonic())
            }
        }
    };
}

operations! {
    /// Register-register operations, keyed by `(funct4, funct3)`
    RegOp((u8, u8)) {
        /// `rd = rd + rs2`
        Add = (0x0, 0x0) => "add",
        /// `rd = rd - rs2`
        Sub = (0x1, 0x0) => "sub",
        /// Signed less-than
        Slt = (0x2, 0x1) => "slt",
        /// Unsigned less-than
        Sltu = (0x3, 0x2) => "sltu",
        /// Logical shift left by the low 4 bits of `rs2`
        Sll = (0x4, 0x3) => "sll",
        /// Logical shift right by the low 4 bits of `rs2`
        Srl = (0x5, 0x3) => "srl",
        /// Arithmetic shift right by the low 4 bits of `rs2`
        Sra = (0x6, 0x3) => "sra",
        /// Bitwise or
        Or = (0x7, 0x4) => "or",
        /// Bitwise and
        And = (0x8, 0x5) => "and",
        /// Bitwise exclusive or
        Xor = (0x9, 0x6) => "xor",
        /// `rd = rs2`
        Mv = (0xA, 0x7) => "mv",
        /// Jump to the address in `rd/rs1`
        Jr = (0xB, 0x0) => "jr",
        /// Jump to `rd/rs1 + rs2`, saving the return address in `rd/rs1`
        Jalr = (0xC, 0x0) => "jalr",
    }
}

operations! {
    /// Register-immediate operations, keyed by `funct3` (3 selects a shift)
    ImmOp(u8) {
        /// Add the sign-extended immediate
        Addi = 0x0 => "addi",
        /// Signed less-than against the sign-extended immediate
        Slti = 0x1 => "slti",
        /// Unsigned less-than against the zero-extended immediate
        Sltui = 0x2 => "sltui",
        /// Bitwise or
        Ori = 0x4 => "ori",
        /// Bitwise and
        Andi = 0x5 => "andi",
        /// Bitwise exclusive or
        Xori = 0x6 => "xori",
        /// Load the sign-extended immediate
        Li = 0x7 => "li",
    }
}

operations! {
    /// Immediate shifts, keyed by the 3-bit mode in `imm7[6:4]`
    ShiftOp(u8) {
        /// Logical shift left
        Slli = 0x1 => "slli",
        /// Logical shift right
        Srli = 0x2 => "srli",
        /// Arithmetic shift right
        Srai = 0x4 => "srai",
    }
}

operations! {
    /// Conditional branches, keyed by `funct3`
    BranchOp(u8) {
        /// Equal
        Beq = 0x0 => "beq",
        /// Not equal
        Bne = 0x1 => "bne",
        /// `rs1` is zero
        Bz = 0x2 => "bz",
        /// `rs1` is not zero
        Bnz = 0x3 => "bnz",
        /// Signed less-than
        Blt = 0x4 => "blt",
        /// Signed greater-or-equal
        Bge = 0x5 => "bge",
        /// Unsigned less-than
        Bltu = 0x6 => "bltu",
        /// Unsigned greater-or-equal
        Bgeu = 0x7 => "bgeu",
    }
}

operations! {
    /// Stores, keyed by `funct3`
    StoreOp(u8) {
        /// Store the low byte
        Sb = 0x0 => "sb",
        /// Store the whole word, little endian
        Sw = 0x1 => "sw",
    }
}

operations! {
    /// Loads, keyed by `funct3`
    LoadOp(u8) {
        /// Load a sign-extended byte
        Lb = 0x0 => "lb",
        /// Load a word, little endian
        Lw = 0x1 => "lw",
        /// Load a zero-extended byte
        Lbu = 0x4 => "lbu",
    }
}

operations! {
    /// PC-relative jumps, keyed by the link flag
    JumpOp(u8) {
        /// Jump without linking
        J = 0x0 => "j",
        /// Jump and save the return address
        Jal = 0x1 => "jal",
    }
}

operations! {
    /// Upper immediates, keyed by bit 15
    UpperOp(u8) {
        /// Load the upper immediate
        Lui = 0x0 => "lui",
        /// Add the upper immediate to the pc
        Auipc = 0x1 => "auipc",
    }
}

/// Services reachable through `ecall`
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(TryFromPrimitive, IntoPrimitive)]
pub enum Service {
    /// Print `a0` as a signed decimal number
    PrintInt = 1,
    /// Stop the simulation
    Terminate = 3,
    /// Print the NUL-terminated string at address `a0`
    PrintStr = 5,
}

/// A fully decoded instruction word.
///
/// Immediates are stored already extended to the value the processor
/// operates on, so disassembly and execution agree on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    R {
        op: RegOp,
        rd_rs1: Register,
        rs2: Register,
    },
    I {
        op: ImmOp,
        rd_rs1: Register,
        /// Sign-extended, except for `sltui`
        imm: Word,
    },
    Shift {
        op: ShiftOp,
        rd_rs1: Register,
        shamt: u8,
    },
    B {
        op: BranchOp,
        rs1: Register,
        rs2: Register,
        /// Signed displacement in instruction words
        offset: i16,
    },
    S {
        op: StoreOp,
        /// Register holding the value to store
        rs1: Register,
        /// Base address register
        rs2: Register,
        offset: Word,
    },
    L {
        op: LoadOp,
        rd: Register,
        /// Base address register
        rs2: Register,
        offset: Word,
    },
    J {
        op: JumpOp,
        rd: Register,
        /// Signed displacement in bytes
        imm: i16,
    },
    U {
        op: UpperOp,
        rd: Register,
        imm: Word,
    },
    Sys {
        svc: Word,
    },
}
