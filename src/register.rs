use std::fmt;
use std::ops::{Index, IndexMut};

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::memory::Word;

/// The eight general purpose registers, named by their ABI alias.
///
/// None of them is hardwired to zero.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(TryFromPrimitive, IntoPrimitive)]
pub enum Register {
    T0 = 0,
    Ra = 1,
    Sp = 2,
    S0 = 3,
    S1 = 4,
    T1 = 5,
    A0 = 6,
    A1 = 7,
}

impl Register {
    pub const ALL: [Self; 8] = [
        Self::T0,
        Self::Ra,
        Self::Sp,
        Self::S0,
        Self::S1,
        Self::T1,
        Self::A0,
        Self::A1,
    ];

    /// Picks the register selected by the 3-bit field at `shift` in `word`
    pub fn from_field(word: Word, shift: u32) -> Self {
        Self::ALL[((word >> shift) & 0x7) as usize]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::T0 => "t0",
            Self::Ra => "ra",
            Self::Sp => "sp",
            Self::S0 => "s0",
            Self::S1 => "s1",
            Self::T1 => "t1",
            Self::A0 => "a0",
            Self::A1 => "a1",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The register file, zeroed on creation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterFile {
    regs: [Word; 8],
}

impl RegisterFile {
    pub fn get(&self, reg: Register) -> Word {
        self.regs[u8::from(reg) as usize]
    }

    pub fn set(&mut self, reg: Register, value: Word) {
        self.regs[u8::from(reg) as usize] = value;
    }
}

impl Index<Register> for RegisterFile {
    type Output = Word;

    fn index(&self, reg: Register) -> &Word {
        &self.regs[u8::from(reg) as usize]
    }
}

impl IndexMut<Register> for RegisterFile {
    fn index_mut(&mut self, reg: Register) -> &mut Word {
        &mut self.regs[u8::from(reg) as usize]
    }
}

impl fmt::Display for RegisterFile {
    /// One register per line: `a0: 0x002A (42)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for reg in Register::ALL {
            let value = self[reg];
            writeln!(f, "{}: 0x{:04X} ({})", reg, value, value as i16)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abi_names_follow_index() {
        let names: Vec<&str> = Register::ALL.iter().map(Register::name).collect();
        assert_eq!(names, ["t0", "ra", "sp", "s0", "s1", "t1", "a0", "a1"]);
        assert_eq!(Register::try_from(6).ok(), Some(Register::A0));
        assert!(Register::try_from(8).is_err());
    }

    #[test]
    fn from_field_masks_three_bits() {
        assert_eq!(Register::from_field(0b110_000_000, 6), Register::A0);
        assert_eq!(Register::from_field(0xFFFF, 9), Register::A1);
    }

    #[test]
    fn every_register_is_writable() {
        let mut regs = RegisterFile::default();
        for (i, reg) in Register::ALL.iter().enumerate() {
            regs.set(*reg, 0x1000 + i as Word);
        }
        assert_eq!(regs[Register::T0], 0x1000);
        assert_eq!(regs.get(Register::A1), 0x1007);
    }

    #[test]
    fn display_lists_registers() {
        let mut regs = RegisterFile::default();
        regs[Register::A0] = 0xFFFF;
        let text = regs.to_string();
        assert!(text.starts_with("t0: 0x0000 (0)\n"));
        assert!(text.contains("a0: 0xFFFF (-1)\n"));
    }
}
