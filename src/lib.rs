//! Instruction set simulator for the Z16, a 16-bit architecture with eight
//! registers and 64 KiB of byte-addressable memory.

pub mod instruction;
pub mod memory;
pub mod processor;
pub mod register;
