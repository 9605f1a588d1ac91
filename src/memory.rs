use std::error;
use std::fmt;
use std::ops::Range;

pub mod image;

pub type Byte = u8; // 1 byte
pub type Word = u16; // 2 bytes

/// Default memory, covering the whole 16-bit address space
pub type StdMem = Memory<0x10000>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// An access of `width` bytes at `address` does not fit into memory
    OutOfBounds { address: usize, width: usize },
    /// A string scan starting at `start` ran off the end of memory
    Unterminated { start: Word },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::OutOfBounds { address, width: 1 } => {
                write!(f, "memory has no address `0x{:04X}`", address)
            }
            MemoryError::OutOfBounds { address, width } => write!(
                f,
                "{}-byte access at `0x{:04X}` runs past the end of memory",
                width, address
            ),
            MemoryError::Unterminated { start } => write!(
                f,
                "string at `0x{:04X}` is not NUL-terminated before the end of memory",
                start
            ),
        }
    }
}

impl error::Error for MemoryError {}

pub type Result<T, E = MemoryError> = std::result::Result<T, E>;

/// Computes `base + offset`, failing instead of wrapping around the address space
pub fn effective_address(base: Word, offset: Word) -> Result<Word> {
    base.checked_add(offset)
        .ok_or(MemoryError::OutOfBounds {
            address: base as usize + offset as usize,
            width: 1,
        })
}

/// Emulates byte-addressable memory for use with the CPU
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Memory<const S: usize> {
    /// The actual data of the memory
    pub data: Box<[Byte]>,
}

impl<const S: usize> Default for Memory<S> {
    /// Initializes zeroed memory
    fn default() -> Self {
        Memory {
            data: vec![0; S].into_boxed_slice(),
        }
    }
}

impl<const S: usize> fmt::Debug for Memory<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self.data.iter().filter(|byte| **byte != 0).count();
        f.debug_struct("Memory")
            .field("size", &S)
            .field("nonzero", &used)
            .finish()
    }
}

impl<const S: usize> Memory<S> {
    /// Checks that `width` bytes starting at `position` lie inside memory
    fn check(position: Word, width: usize) -> Result<usize> {
        let start = position as usize;
        if start + width > S {
            return Err(MemoryError::OutOfBounds {
                address: start,
                width,
            });
        }

        Ok(start)
    }

    /// Reads a byte from the memory
    pub fn read_byte(&self, position: Word) -> Result<Byte> {
        let at = Self::check(position, 1)?;
        Ok(self.data[at])
    }

    /// Writes a byte to the memory
    pub fn write_byte(&mut self, position: Word, value: Byte) -> Result<()> {
        let at = Self::check(position, 1)?;
        self.data[at] = value;
        Ok(())
    }

    /// Reads a word from the memory (little endian)
    pub fn read_word(&self, position: Word) -> Result<Word> {
        let at = Self::check(position, 2)?;
        Ok((self.data[at + 1] as Word) << 8 | (self.data[at] as Word))
    }

    /// Writes a word to the memory (little endian)
    pub fn write_word(&mut self, position: Word, value: Word) -> Result<()> {
        let at = Self::check(position, 2)?;
        self.data[at] = (value & 0xFF) as Byte;
        self.data[at + 1] = (value >> 8) as Byte;
        Ok(())
    }

    /// Writes an array of bytes to the memory
    pub fn write_array(&mut self, position: Word, data: &[Byte]) -> Result<()> {
        let at = Self::check(position, data.len())?;
        self.data[at..at + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Reads the NUL-terminated byte string starting at `position`.
    ///
    /// The terminator is not part of the returned bytes.
    ///
    /// # Errors
    ///
    /// Fails if `position` is outside of memory or no NUL byte is found
    /// before the end of memory.
    pub fn read_cstr(&self, position: Word) -> Result<&[Byte]> {
        let start = Self::check(position, 1)?;
        match self.data[start..].iter().position(|byte| *byte == 0) {
            Some(len) => Ok(&self.data[start..start + len]),
            None => Err(MemoryError::Unterminated { start: position }),
        }
    }

    /// Formats `range` as a hex dump with 16 bytes per line
    pub fn dump(&self, range: Range<usize>) -> String {
        let end = range.end.min(S);
        let mut out = String::new();

        for line in (range.start..end).step_by(16) {
            let bytes = &self.data[line..(line + 16).min(end)];
            let hex: Vec<String> = bytes.iter().map(|byte| format!("{:02X}", byte)).collect();
            out.push_str(&format!("0x{:04X}: {}\n", line, hex.join(" ")));
        }

        out
    }
}

/// Writes a block of 16-bit instruction words (little endian) directly into the memory
#[macro_export]
macro_rules! write_instructions {
    ( $mem:ident : $pos:expr => $( $word:expr ),+ $(,)? ) => {{
        let mut position: $crate::memory::Word = $pos;
        let mut result = Ok(());
        $(
            if result.is_ok() {
                result = $mem.write_word(position, $word as $crate::memory::Word);
                position = position.wrapping_add(2);
            }
        )+
        let _ = position;
        result
    }};
}
