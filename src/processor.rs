use std::error;
use std::fmt;
use std::io::{self, Write};

use crate::instruction::{
    BranchOp, DecodeError, ImmOp, Instruction, JumpOp, LoadOp, RegOp, Service, ShiftOp, StoreOp,
    UpperOp,
};
use crate::memory::{effective_address, Byte, Memory, MemoryError, Word};
use crate::register::{Register, RegisterFile};
use log::*;

/// I/O requested by an executed instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    PrintInt(i16),
    PrintStr(Vec<Byte>),
}

/// How the pc moves after an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Advance to the next instruction word
    Next,
    /// Continue at the given address
    Jump(Word),
    /// Stop the simulation
    Halt,
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// The program requested termination through `ecall`
    Terminated,
    /// The next instruction would have been fetched past the end of memory
    EndOfMemory,
}

#[derive(Debug)]
pub enum SimError {
    /// Fatal memory access while executing the instruction at `pc`
    Memory { pc: Word, source: MemoryError },
    /// Writing to the console failed
    Io(io::Error),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Memory { pc, source } => {
                write!(f, "memory fault at pc 0x{:04X}: {}", pc, source)
            }
            SimError::Io(_) => f.write_str("failed to write simulator output"),
        }
    }
}

impl error::Error for SimError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            SimError::Memory { source, .. } => Some(source),
            SimError::Io(err) => Some(err),
        }
    }
}

impl From<io::Error> for SimError {
    fn from(err: io::Error) -> Self {
        SimError::Io(err)
    }
}

/// Receives the trace and the output of a running program
pub trait Console {
    /// Called with every decoded instruction before it executes
    fn trace(&mut self, pc: Word, instruction: &Instruction) -> io::Result<()>;

    /// Called instead of [`Console::trace`] for words that fail to decode
    fn trace_invalid(&mut self, pc: Word, err: &DecodeError) -> io::Result<()>;

    fn print_int(&mut self, value: i16) -> io::Result<()>;

    fn print_str(&mut self, bytes: &[Byte]) -> io::Result<()>;

    fn emit(&mut self, effect: &Effect) -> io::Result<()> {
        match effect {
            Effect::None => Ok(()),
            Effect::PrintInt(value) => self.print_int(*value),
            Effect::PrintStr(bytes) => self.print_str(bytes),
        }
    }
}

/// Writes the trace and program output to any writer
#[derive(Debug)]
pub struct StdConsole<W: Write> {
    out: W,
    trace: bool,
}

impl<W: Write> StdConsole<W> {
    pub fn new(out: W) -> Self {
        Self { out, trace: true }
    }

    /// Enables or disables trace lines; program output is always written
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Console for StdConsole<W> {
    fn trace(&mut self, pc: Word, instruction: &Instruction) -> io::Result<()> {
        if self.trace {
            writeln!(self.out, "0x{:04X}: {}", pc, instruction)?;
        }
        Ok(())
    }

    fn trace_invalid(&mut self, pc: Word, err: &DecodeError) -> io::Result<()> {
        if self.trace {
            writeln!(self.out, "0x{:04X}: {}", pc, err)?;
        }
        Ok(())
    }

    fn print_int(&mut self, value: i16) -> io::Result<()> {
        writeln!(self.out, "{}", value)?;
        self.out.flush()
    }

    fn print_str(&mut self, bytes: &[Byte]) -> io::Result<()> {
        self.out.write_all(bytes)?;
        self.out.flush()
    }
}

/// Emulates a Z16 CPU
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Processor {
    /// Program counter
    pub pc: Word,
    /// General purpose registers
    pub regs: RegisterFile,
}

impl Processor {
    /// Initializes a new CPU
    /// @param entrypoint The address of the first instruction
    pub fn new(entrypoint: Word) -> Self {
        Self {
            pc: entrypoint,
            regs: RegisterFile::default(),
        }
    }

    /// Executes a single decoded instruction against the registers and
    /// `memory`. The pc is left untouched; the returned [`Control`] says
    /// where execution continues.
    pub fn execute_instruction<const S: usize>(
        &mut self,
        instruction: Instruction,
        memory: &mut Memory<S>,
    ) -> Result<(Control, Effect), MemoryError> {
        let regs = &mut self.regs;
        let pc = self.pc;

        match instruction {
            Instruction::R { op, rd_rs1, rs2 } => {
                let a = regs[rd_rs1];
                let b = regs[rs2];
                let shamt = (b & 0xF) as u32;

                let result = match op {
                    RegOp::Add => a.wrapping_add(b),
                    RegOp::Sub => a.wrapping_sub(b),
                    RegOp::Slt => ((a as i16) < (b as i16)) as Word,
                    RegOp::Sltu => (a < b) as Word,
                    RegOp::Sll => a << shamt,
                    RegOp::Srl => a >> shamt,
                    RegOp::Sra => ((a as i16) >> shamt) as Word,
                    RegOp::Or => a | b,
                    RegOp::And => a & b,
                    RegOp::Xor => a ^ b,
                    RegOp::Mv => b,
                    RegOp::Jr => {
                        debug!("jr {}: 0x{:04X}", rd_rs1, a);
                        return Ok((Control::Jump(a), Effect::None));
                    }
                    RegOp::Jalr => {
                        let target = a.wrapping_add(b);
                        regs[rd_rs1] = pc.wrapping_add(2);
                        debug!("jalr {}, {}: 0x{:04X}", rd_rs1, rs2, target);
                        return Ok((Control::Jump(target), Effect::None));
                    }
                };

                regs[rd_rs1] = result;
                debug!("{} {} {}: {}", op, a, b, result);
            }
            Instruction::I { op, rd_rs1, imm } => {
                let a = regs[rd_rs1];

                let result = match op {
                    ImmOp::Addi => a.wrapping_add(imm),
                    ImmOp::Slti => ((a as i16) < (imm as i16)) as Word,
                    ImmOp::Sltui => (a < imm) as Word,
                    ImmOp::Ori => a | imm,
                    ImmOp::Andi => a & imm,
                    ImmOp::Xori => a ^ imm,
                    ImmOp::Li => imm,
                };

                regs[rd_rs1] = result;
                debug!("{} {} {}: {}", op, a, imm as i16, result);
            }
            Instruction::Shift { op, rd_rs1, shamt } => {
                let a = regs[rd_rs1];
                let shamt = shamt as u32;

                let result = match op {
                    ShiftOp::Slli => a << shamt,
                    ShiftOp::Srli => a >> shamt,
                    ShiftOp::Srai => ((a as i16) >> shamt) as Word,
                };

                regs[rd_rs1] = result;
                debug!("{} {} {}: {}", op, a, shamt, result);
            }
            Instruction::B {
                op,
                rs1,
                rs2,
                offset,
            } => {
                let a = regs[rs1];
                let b = regs[rs2];

                let taken = match op {
                    BranchOp::Beq => a == b,
                    BranchOp::Bne => a != b,
                    BranchOp::Bz => a == 0,
                    BranchOp::Bnz => a != 0,
                    BranchOp::Blt => (a as i16) < (b as i16),
                    BranchOp::Bge => (a as i16) >= (b as i16),
                    BranchOp::Bltu => a < b,
                    BranchOp::Bgeu => a >= b,
                };

                let target = pc.wrapping_add(offset.wrapping_mul(2) as Word);
                debug!("{} {} {}: taken={} target=0x{:04X}", op, a, b, taken, target);

                if taken {
                    return Ok((Control::Jump(target), Effect::None));
                }
            }
            Instruction::S {
                op,
                rs1,
                rs2,
                offset,
            } => {
                let address = effective_address(regs[rs2], offset)?;
                let value = regs[rs1];

                match op {
                    StoreOp::Sb => memory.write_byte(address, value as Byte)?,
                    StoreOp::Sw => memory.write_word(address, value)?,
                }

                debug!("{} 0x{:04X} -> 0x{:04X}", op, value, address);
            }
            Instruction::L {
                op,
                rd,
                rs2,
                offset,
            } => {
                let address = effective_address(regs[rs2], offset)?;

                let value = match op {
                    LoadOp::Lb => memory.read_byte(address)? as i8 as i16 as Word,
                    LoadOp::Lbu => memory.read_byte(address)? as Word,
                    LoadOp::Lw => memory.read_word(address)?,
                };

                regs[rd] = value;
                debug!("{} 0x{:04X} <- 0x{:04X}", op, value, address);
            }
            Instruction::J { op, rd, imm } => {
                let target = pc.wrapping_add(imm as Word);
                if op == JumpOp::Jal {
                    regs[rd] = pc.wrapping_add(2);
                }

                debug!("{} {}: 0x{:04X}", op, imm, target);
                return Ok((Control::Jump(target), Effect::None));
            }
            Instruction::U { op, rd, imm } => {
                regs[rd] = match op {
                    UpperOp::Lui => imm,
                    UpperOp::Auipc => pc.wrapping_add(imm),
                };

                debug!("{} {}: 0x{:04X}", op, imm, regs[rd]);
            }
            Instruction::Sys { svc } => {
                let a0 = regs[Register::A0];

                match Service::try_from(svc) {
                    Ok(Service::PrintInt) => {
                        return Ok((Control::Next, Effect::PrintInt(a0 as i16)));
                    }
                    Ok(Service::PrintStr) => {
                        let bytes = memory.read_cstr(a0)?.to_vec();
                        return Ok((Control::Next, Effect::PrintStr(bytes)));
                    }
                    Ok(Service::Terminate) => {
                        debug!("ecall {}: terminate", svc);
                        return Ok((Control::Halt, Effect::None));
                    }
                    Err(_) => warn!("Unknown ecall service {} at 0x{:04X}", svc, pc),
                }
            }
        }

        Ok((Control::Next, Effect::None))
    }

    /// Runs one fetch, decode, trace and execute cycle.
    ///
    /// Returns `Some` once the simulation has halted.
    pub fn execute<const S: usize, C: Console>(
        &mut self,
        memory: &mut Memory<S>,
        console: &mut C,
    ) -> Result<Option<Halt>, SimError> {
        let pc = self.pc;
        let fault = |source| SimError::Memory { pc, source };

        let word = memory.read_word(pc).map_err(fault)?; // Read instruction where PC is

        let control = match Instruction::decode(word) {
            Ok(instruction) => {
                console.trace(pc, &instruction)?;
                let (control, effect) = self
                    .execute_instruction(instruction, memory)
                    .map_err(fault)?;
                console.emit(&effect)?;
                control
            }
            Err(err) => {
                warn!("0x{:04X}: {}", pc, err);
                console.trace_invalid(pc, &err)?;
                Control::Next
            }
        };

        match control {
            Control::Next => match pc.checked_add(2) {
                Some(next) => self.pc = next,
                None => return Ok(Some(Halt::EndOfMemory)),
            },
            Control::Jump(target) => self.pc = target,
            Control::Halt => return Ok(Some(Halt::Terminated)),
        }

        Ok(None)
    }

    /// Run program until a termination condition is met
    pub fn execute_until_halt<const S: usize, C: Console>(
        &mut self,
        memory: &mut Memory<S>,
        console: &mut C,
    ) -> Result<Halt, SimError> {
        loop {
            if let Some(halt) = self.execute(memory, console)? {
                info!("Program halted ({:?}) at 0x{:04X}", halt, self.pc);
                return Ok(halt);
            }
        }
    }
}
