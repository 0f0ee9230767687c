//! Simulating and execution of machine code.
//!
//! This module is focused on executing instruction words which already sit in memory
//! (usually placed there by [`Machine::assemble`]).
//!
//! This module consists of:
//! - [`Cpu`]: The execution engine, holding the register file and the PC.
//! - [`mem`]: The module handling memory and the register file.
//! - [`io`]: The module handling where the write syscall sends its output.
//! - [`observer`]: The module tracking which memory locations and registers were accessed.
//! - [`debug`]: The module handling types of breakpoints for the machine.
//!
//! # Usage
//!
//! Most users should drive execution through [`Machine`], which owns a [`Cpu`] and its memory.
//! The [`Cpu`] can also be driven by hand:
//!
//! ```
//! use riscvm::ast::reg_consts::{A0, ZERO};
//! use riscvm::ast::sim::{Instruction, Opcode};
//! use riscvm::sim::{Cpu, SimFlags};
//! use riscvm::sim::io::EmptyIO;
//! use riscvm::sim::mem::Memory;
//!
//! let mut mem = Memory::new(64);
//! mem.write_word(0, Instruction::new_i(Opcode::ADDI, A0, ZERO, 5).encode()).unwrap();
//!
//! let mut cpu = Cpu::new();
//! cpu.cycle(&mut mem, &EmptyIO, SimFlags::default()).unwrap();
//! assert_eq!(cpu.reg_file()[A0], 5);
//! assert_eq!(cpu.pc(), 4);
//! ```
//!
//! # Execution
//!
//! One [`Cpu::cycle`]:
//! 1. reads the word at the PC,
//! 2. advances the PC by 4,
//! 3. decodes the word and executes it.
//!
//! Branch and `JAL` targets are absolute addresses.
//! `ECALL` selects a syscall with register `a7`:
//! - `64`: write `a2` bytes starting at address `a1` to file descriptor `a0`
//!     (1 is stdout, 2 is stderr, anything else is discarded),
//! - `93`: exit with the code in `a0`.
//!
//! [`Machine`]: crate::machine::Machine
//! [`Machine::assemble`]: crate::machine::Machine::assemble

pub mod mem;
pub mod io;
pub mod observer;
pub mod debug;

use crate::ast::reg_consts::{A0, A1, A2, A7};
use crate::ast::sim::{Instruction, Opcode};
use crate::ast::Reg;

use self::io::{IODevice, Stream};
use self::mem::{Memory, RegFile};
use self::observer::{AccessObserver, AccessSet};

/// Syscall number of `write(fd, buf, count)`.
pub const SYS_WRITE: u32 = 64;
/// Syscall number of `exit(code)`.
pub const SYS_EXIT: u32 = 93;

/// Errors that can occur during simulation.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum SimErr {
    /// The word's opcode is not an instruction (it is reserved or is a pseudo-instruction slot).
    InvalidOpcode(u8),
    /// The opcode was decoded, but the simulator has no behavior for it.
    UnhandledOpcode(Opcode),
    /// A memory access fell (at least partly) outside of memory.
    OutOfBounds {
        /// The address of the access.
        addr: u32,
        /// The number of bytes accessed.
        width: u32
    },
    /// `ECALL` was executed with an unknown syscall number in `a7`.
    InvalidSyscall(u32),
    /// `DIV` or `REM` divided by zero (only raised if [`SimFlags::trap_div_by_zero`] is set).
    DivideByZero,
}
impl std::fmt::Display for SimErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimErr::InvalidOpcode(op)           => write!(f, "simulator executed invalid opcode {op}"),
            SimErr::UnhandledOpcode(op)         => write!(f, "simulator cannot execute {op}"),
            SimErr::OutOfBounds { addr, width } => write!(f, "{width}-byte access at 0x{addr:08X} is out of bounds"),
            SimErr::InvalidSyscall(n)           => write!(f, "unknown syscall {n}"),
            SimErr::DivideByZero                => f.write_str("division by zero"),
        }
    }
}
impl std::error::Error for SimErr {}
impl crate::err::Error for SimErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            SimErr::InvalidOpcode(_)    => Some("the PC may have run past the end of the program into data".into()),
            SimErr::UnhandledOpcode(_)  => None,
            SimErr::OutOfBounds { .. }  => Some("check the base register and offset of this load or store".into()),
            SimErr::InvalidSyscall(_)   => Some(format!("set a7 to {SYS_WRITE} (write) or {SYS_EXIT} (exit) before ECALL").into()),
            SimErr::DivideByZero        => Some("disable trap_div_by_zero to have x / 0 = -1 and x % 0 = x".into()),
        }
    }
}

/// Anything that can cause a step to abruptly fail to finish.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum StepBreak {
    /// The exit syscall was executed with the given code.
    Exit(i32),
    /// `EBREAK` was executed.
    Breakpoint,
    /// A simulation error occurred.
    Err(SimErr),
}
impl From<SimErr> for StepBreak {
    fn from(value: SimErr) -> Self {
        Self::Err(value)
    }
}

/// Configuration flags for execution.
///
/// Read the field descriptions for more details.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub struct SimFlags {
    /// Whether `DIV` and `REM` by zero raise [`SimErr::DivideByZero`].
    ///
    /// If this is `false`, division by zero does not fault:
    /// `x / 0` is `-1` (all bits set) and `x % 0` is `x`.
    ///
    /// By default, this flag is `false`.
    pub trap_div_by_zero: bool,
}

/// The execution engine.
///
/// This holds the register file, the PC, and the bookkeeping of what the last steps did.
/// Memory and IO are owned elsewhere and passed into [`Cpu::cycle`].
#[derive(Debug, Default)]
pub struct Cpu {
    reg_file: RegFile,
    pc: u32,
    instructions_run: u64,
    observer: AccessObserver,
}
impl Cpu {
    /// Creates a new CPU with all registers and the PC zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroes all registers and the PC, and clears the instruction count and the observer.
    pub fn reset(&mut self) {
        self.reg_file.reset();
        self.pc = 0;
        self.instructions_run = 0;
        self.observer.clear();
    }

    /// The register file.
    pub fn reg_file(&self) -> &RegFile {
        &self.reg_file
    }
    /// The register file (mutably).
    pub fn reg_file_mut(&mut self) -> &mut RegFile {
        &mut self.reg_file
    }
    /// The program counter (the address of the next instruction to fetch).
    pub fn pc(&self) -> u32 {
        self.pc
    }
    /// Sets the program counter.
    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }
    /// The number of instructions which have been fully executed since the last reset.
    pub fn instructions_run(&self) -> u64 {
        self.instructions_run
    }
    /// The access observer, which tracks which memory locations and registers were accessed.
    pub fn observer(&self) -> &AccessObserver {
        &self.observer
    }
    /// The access observer (mutably).
    pub fn observer_mut(&mut self) -> &mut AccessObserver {
        &mut self.observer
    }

    fn read_reg(&mut self, reg: Reg) -> u32 {
        self.observer.update_reg_accesses(reg, AccessSet::READ);
        self.reg_file[reg]
    }
    fn write_reg(&mut self, reg: Reg, value: u32) {
        let old = self.reg_file[reg];
        self.reg_file.set(reg, value);
        self.observer.update_reg_accesses(reg, AccessSet::write_of(old, self.reg_file[reg]));
    }
    fn load(&mut self, mem: &Memory, addr: u32, width: u32) -> Result<u32, SimErr> {
        let value = match width {
            1 => mem.read_byte(addr)? as i8 as i32 as u32,
            2 => mem.read_half(addr)? as i16 as i32 as u32,
            _ => mem.read_word(addr)?,
        };
        self.observer.update_mem_range(addr, width, AccessSet::READ);
        Ok(value)
    }
    fn store(&mut self, mem: &mut Memory, addr: u32, bytes: &[u8]) -> Result<(), SimErr> {
        let sets: Vec<_> = mem.read_bytes(addr, bytes.len() as u32)?
            .iter()
            .zip(bytes)
            .map(|(&old, &new)| AccessSet::write_of(old, new))
            .collect();

        mem.write_bytes(addr, bytes)?;
        for (a, set) in (addr..).zip(sets) {
            self.observer.update_mem_accesses(a, set);
        }
        Ok(())
    }

    /// Simulates one step, executing one instruction.
    ///
    /// If this returns an error, execution stopped partway through the instruction.
    /// Any register or memory writes the instruction completed before that point are kept.
    /// Note that the PC has already advanced past a fetched instruction, even one that failed to decode.
    pub fn cycle(&mut self, mem: &mut Memory, io: &impl IODevice, flags: SimFlags) -> Result<(), StepBreak> {
        let instr_pc = self.pc;
        let word = mem.read_word(instr_pc)?;
        self.pc = instr_pc.wrapping_add(4);

        let instr = Instruction::decode(word)?;
        let result = self.execute(instr, instr_pc, mem, io, flags);
        if !matches!(result, Err(StepBreak::Err(_))) {
            self.instructions_run = self.instructions_run.wrapping_add(1);
        }
        result
    }

    fn execute(&mut self, instr: Instruction, instr_pc: u32, mem: &mut Memory, io: &impl IODevice, flags: SimFlags) -> Result<(), StepBreak> {
        let Instruction { opcode, rd, rs1, rs2, imm } = instr;
        let simm = instr.simm() as u32;

        match opcode {
            Opcode::AND | Opcode::OR | Opcode::XOR
            | Opcode::SLL | Opcode::SRL | Opcode::SRA
            | Opcode::ADD | Opcode::SUB | Opcode::MUL | Opcode::DIV | Opcode::REM
            | Opcode::SLT => {
                let a = self.read_reg(rs1);
                let b = self.read_reg(rs2);
                let result = alu(opcode, a, b, flags)?;
                self.write_reg(rd, result);
            },
            Opcode::ANDI | Opcode::ORI | Opcode::XORI
            | Opcode::SLLI | Opcode::SRLI | Opcode::SRAI
            | Opcode::ADDI | Opcode::SUBI
            | Opcode::SLTI => {
                let a = self.read_reg(rs1);
                let result = alu(opcode, a, simm, flags)?;
                self.write_reg(rd, result);
            },
            Opcode::LUI => self.write_reg(rd, imm << 12),
            Opcode::AUIPC => self.write_reg(rd, instr_pc.wrapping_add(imm << 12)),
            Opcode::LW | Opcode::LH | Opcode::LB => {
                let width = match opcode {
                    Opcode::LB => 1,
                    Opcode::LH => 2,
                    _ => 4,
                };
                let addr = self.read_reg(rs1).wrapping_add(simm);
                let value = self.load(mem, addr, width)?;
                self.write_reg(rd, value);
            },
            Opcode::SW | Opcode::SH | Opcode::SB => {
                let value = self.read_reg(rs1);
                let addr = self.read_reg(rs2).wrapping_add(simm);
                let bytes = value.to_le_bytes();
                let width = match opcode {
                    Opcode::SB => 1,
                    Opcode::SH => 2,
                    _ => 4,
                };
                self.store(mem, addr, &bytes[..width])?;
            },
            Opcode::BEQ | Opcode::BNE | Opcode::BLT | Opcode::BGE => {
                let a = self.read_reg(rs1);
                let b = self.read_reg(rs2);
                let taken = match opcode {
                    Opcode::BEQ => a == b,
                    Opcode::BNE => a != b,
                    Opcode::BLT => (a as i32) < (b as i32),
                    _ => (a as i32) >= (b as i32),
                };
                if taken {
                    self.pc = imm;
                }
            },
            Opcode::JAL => {
                self.write_reg(rd, self.pc);
                self.pc = imm;
            },
            Opcode::JALR => {
                let target = self.read_reg(rs1).wrapping_add(simm);
                self.write_reg(rd, self.pc);
                self.pc = target;
            },
            Opcode::ECALL => self.syscall(mem, io)?,
            Opcode::EBREAK => return Err(StepBreak::Breakpoint),
        }

        Ok(())
    }

    fn syscall(&mut self, mem: &Memory, io: &impl IODevice) -> Result<(), StepBreak> {
        match self.read_reg(A7) {
            SYS_WRITE => {
                let fd = self.read_reg(A0);
                let buf = self.read_reg(A1);
                let count = self.read_reg(A2);

                let bytes = mem.read_bytes(buf, count)?;
                self.observer.update_mem_range(buf, count, AccessSet::READ);
                if let Some(stream) = Stream::from_fd(fd) {
                    // a sink which refuses output does not stop the program
                    io.io_write(stream, bytes);
                }
                Ok(())
            },
            SYS_EXIT => Err(StepBreak::Exit(self.read_reg(A0) as i32)),
            n => Err(SimErr::InvalidSyscall(n).into())
        }
    }
}

/// Computes the result of an arithmetic/logic opcode.
///
/// Register-immediate opcodes compute the same operation as their register-register counterparts.
fn alu(opcode: Opcode, a: u32, b: u32, flags: SimFlags) -> Result<u32, SimErr> {
    let result = match opcode {
        Opcode::AND | Opcode::ANDI => a & b,
        Opcode::OR  | Opcode::ORI  => a | b,
        Opcode::XOR | Opcode::XORI => a ^ b,
        // wrapping shifts only use the low 5 bits of the shift amount
        Opcode::SLL | Opcode::SLLI => a.wrapping_shl(b),
        Opcode::SRL | Opcode::SRLI => a.wrapping_shr(b),
        Opcode::SRA | Opcode::SRAI => (a as i32).wrapping_shr(b) as u32,
        Opcode::ADD | Opcode::ADDI => a.wrapping_add(b),
        Opcode::SUB | Opcode::SUBI => a.wrapping_sub(b),
        Opcode::MUL => a.wrapping_mul(b),
        Opcode::DIV | Opcode::REM if b == 0 => match (flags.trap_div_by_zero, opcode) {
            (true, _) => return Err(SimErr::DivideByZero),
            (false, Opcode::DIV) => u32::MAX,
            (false, _) => a,
        },
        Opcode::DIV => (a as i32).wrapping_div(b as i32) as u32,
        Opcode::REM => (a as i32).wrapping_rem(b as i32) as u32,
        Opcode::SLT | Opcode::SLTI => u32::from((a as i32) < (b as i32)),
        op => return Err(SimErr::UnhandledOpcode(op)),
    };
    Ok(result)
}
