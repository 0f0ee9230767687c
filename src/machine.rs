//! The machine, which ties the assembler and the execution engine together.
//!
//! The key type here is [`Machine`], which owns one [`Cpu`] and one [`Memory`],
//! and exposes the operations a front end needs:
//! - [`Machine::assemble`]: assemble source code and load it into memory,
//! - [`Machine::step`] and [`Machine::run_while`]: execute,
//! - [`Machine::reset`]: return to a clean state,
//! - accessors for the registers, PC, and memory (for display).
//!
//! ```
//! use riscvm::machine::{Machine, StepOutcome};
//! use riscvm::ast::reg_consts::A1;
//!
//! let mut machine = Machine::default();
//! machine.assemble("
//!     .section .text
//!     addi a0, zero, 5
//!     add a1, a0, a0
//! ").unwrap();
//!
//! assert_eq!(machine.step(), StepOutcome::Continued);
//! assert_eq!(machine.step(), StepOutcome::Continued);
//! assert_eq!(machine.reg_file()[A1], 10);
//! ```
use std::collections::HashSet;

use crate::asm::{self, AsmErr, LinkedImage};
use crate::ast::sim::disassemble_word;
use crate::parse::{parse_ast, ParseErr};
use crate::sim::debug::Breakpoint;
use crate::sim::io::{IODevice, SimIO};
use crate::sim::mem::{Memory, RegFile};
use crate::sim::observer::AccessObserver;
use crate::sim::{Cpu, SimErr, SimFlags, StepBreak};

/// Configuration for a [`Machine`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MachineConfig {
    /// The size of memory, in bytes.
    pub memory_size: usize,
    /// The names of the sections to lay out first, in order.
    ///
    /// Sections not listed here are laid out after these,
    /// in the order they first appear in the source.
    pub section_order: Vec<String>,
    /// Flags for execution.
    pub flags: SimFlags,
}
impl MachineConfig {
    /// Creates a configuration with the given memory size (and the default sections and flags).
    pub fn new(memory_size: usize) -> Self {
        Self { memory_size, ..Default::default() }
    }

    /// Replaces the section order.
    ///
    /// ```
    /// use riscvm::machine::MachineConfig;
    ///
    /// let config = MachineConfig::new(0x1000).with_sections(["text", "data"]);
    /// assert_eq!(config.section_order, ["text", "data"]);
    /// ```
    pub fn with_sections<S: Into<String>>(mut self, sections: impl IntoIterator<Item=S>) -> Self {
        self.section_order = sections.into_iter().map(Into::into).collect();
        self
    }
}
impl Default for MachineConfig {
    /// 16 KiB of memory, with sections `text`, `rodata`, `data`, `bss`.
    fn default() -> Self {
        Self {
            memory_size: 16 * 1024,
            section_order: ["text", "rodata", "data", "bss"].map(String::from).to_vec(),
            flags: SimFlags::default(),
        }
    }
}

/// The result of a step (or of a run of steps).
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum StepOutcome {
    /// Execution can continue.
    Continued,
    /// The program exited with the given code.
    ///
    /// This is latched: stepping again returns the same outcome until a reset.
    Exited(i32),
    /// An `EBREAK` was executed, or a user breakpoint matched.
    ///
    /// This is not latched: stepping again resumes execution.
    Breakpoint,
    /// Execution failed.
    ///
    /// This is latched: stepping again returns the same outcome until a reset.
    Faulted(SimErr),
}
impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepOutcome::Continued  => f.write_str("Continued"),
            StepOutcome::Exited(c)  => write!(f, "Exit Code {c}"),
            StepOutcome::Breakpoint => f.write_str("Reached Break Point"),
            StepOutcome::Faulted(e) => e.fmt(f),
        }
    }
}

/// Error from [`Machine::assemble`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AssembleErr {
    /// The source could not be parsed.
    Parse(ParseErr),
    /// The source could not be assembled or linked.
    Asm(AsmErr),
}
impl From<ParseErr> for AssembleErr {
    fn from(value: ParseErr) -> Self {
        Self::Parse(value)
    }
}
impl From<AsmErr> for AssembleErr {
    fn from(value: AsmErr) -> Self {
        Self::Asm(value)
    }
}
impl std::fmt::Display for AssembleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssembleErr::Parse(e) => e.fmt(f),
            AssembleErr::Asm(e) => e.fmt(f),
        }
    }
}
impl std::error::Error for AssembleErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssembleErr::Parse(e) => Some(e),
            AssembleErr::Asm(e) => Some(e),
        }
    }
}
impl crate::err::Error for AssembleErr {
    fn span(&self) -> Option<crate::err::ErrSpan> {
        match self {
            AssembleErr::Parse(e) => e.span(),
            AssembleErr::Asm(e) => e.span(),
        }
    }

    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            AssembleErr::Parse(e) => e.help(),
            AssembleErr::Asm(e) => e.help(),
        }
    }
}

/// A machine: an execution engine, its memory, and where its output goes.
///
/// Execution starts at address 0 (where the first laid-out section is loaded).
pub struct Machine {
    config: MachineConfig,
    cpu: Cpu,
    mem: Memory,
    io: SimIO,

    /// The outcome which stops all further execution until a reset
    /// (an exit or a fault).
    latch: Option<StepOutcome>,
    /// The image of the last successful assembly.
    image: Option<LinkedImage>,

    /// Breakpoints for the machine.
    ///
    /// These are checked after every step of [`Machine::run_while`].
    pub breakpoints: HashSet<Breakpoint>,
}
impl Machine {
    /// Creates a new machine with the given configuration.
    pub fn new(config: MachineConfig) -> Self {
        Self {
            mem: Memory::new(config.memory_size),
            config,
            cpu: Cpu::new(),
            io: SimIO::Empty,
            latch: None,
            image: None,
            breakpoints: HashSet::new(),
        }
    }

    /// Assembles source code and writes the result into memory, starting at address 0.
    ///
    /// This either fully succeeds or does nothing:
    /// memory is only written once parsing, assembling, and linking all succeed.
    /// Bytes past the end of the image are left untouched,
    /// and the CPU state (registers and PC) is not reset.
    pub fn assemble(&mut self, src: &str) -> Result<(), AssembleErr> {
        let ast = parse_ast(src)?;
        let obj = asm::assemble(ast)?;
        let image = obj.link(&self.config.section_order, self.mem.capacity())?;

        self.mem.write_bytes(0, image.bytes())
            .unwrap_or_else(|_| unreachable!("linked image should have been checked to fit in memory"));
        self.image.replace(image);
        Ok(())
    }

    /// Runs one cycle of the CPU, latching exits and faults.
    fn step_inner(&mut self) -> StepOutcome {
        if let Some(outcome) = &self.latch {
            return outcome.clone();
        }

        match self.cpu.cycle(&mut self.mem, &self.io, self.config.flags) {
            Ok(()) => StepOutcome::Continued,
            Err(StepBreak::Breakpoint) => StepOutcome::Breakpoint,
            Err(StepBreak::Exit(code)) => self.latch.insert(StepOutcome::Exited(code)).clone(),
            Err(StepBreak::Err(e)) => self.latch.insert(StepOutcome::Faulted(e)).clone(),
        }
    }

    /// Simulates one step, executing one instruction.
    ///
    /// The observer is cleared beforehand, so afterwards it holds exactly the accesses of this step.
    ///
    /// Once the machine has exited or faulted, this returns that same outcome
    /// without executing anything, until [`Machine::reset`] or [`Machine::reset_cpu`] is called.
    pub fn step(&mut self) -> StepOutcome {
        self.cpu.observer_mut().clear();
        self.step_inner()
    }

    /// Runs until the tripwire condition returns false (or any of the typical breaks occur).
    ///
    /// The typical break conditions are:
    /// - the program exits or faults,
    /// - `EBREAK` is executed,
    /// - a breakpoint matches (checked after each step).
    ///
    /// If the tripwire stops the run, this returns [`StepOutcome::Continued`].
    /// The observer holds every access of the whole run.
    pub fn run_while(&mut self, mut tripwire: impl FnMut(&mut Machine) -> bool) -> StepOutcome {
        self.cpu.observer_mut().clear();

        loop {
            if !tripwire(self) {
                break StepOutcome::Continued;
            }

            match self.step_inner() {
                StepOutcome::Continued => {},
                outcome => break outcome,
            }

            // After executing, check that any breakpoints were hit.
            if self.breakpoints.iter().any(|bp| bp.check(self)) {
                break StepOutcome::Breakpoint;
            }
        }
    }

    /// Runs until the program stops on its own (or a breakpoint matches).
    ///
    /// This blocks until the program ends.
    /// If you would like to limit the maximum number of steps to execute, consider [`Machine::run_with_limit`].
    pub fn run(&mut self) -> StepOutcome {
        self.run_while(|_| true)
    }

    /// Runs with a limit on how many instructions to execute.
    pub fn run_with_limit(&mut self, max_steps: u64) -> StepOutcome {
        let i = self.instructions_run();
        self.run_while(|m| m.instructions_run().wrapping_sub(i) < max_steps)
    }

    /// Resets the CPU and memory.
    ///
    /// The configuration, breakpoints, and IO are kept.
    pub fn reset(&mut self) {
        self.reset_cpu();
        self.reset_memory();
    }

    /// Zeroes the registers and PC, and clears the latched outcome and the observer.
    pub fn reset_cpu(&mut self) {
        self.cpu.reset();
        self.latch.take();
    }

    /// Zeroes all of memory.
    pub fn reset_memory(&mut self) {
        self.mem.reset();
    }

    /// The configuration.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }
    /// The execution flags (mutably).
    pub fn flags_mut(&mut self) -> &mut SimFlags {
        &mut self.config.flags
    }

    /// Sets where the write syscall sends its output, closing the previous output.
    pub fn set_io(&mut self, io: impl Into<SimIO>) {
        std::mem::replace(&mut self.io, io.into()).close();
    }

    /// The register file.
    pub fn reg_file(&self) -> &RegFile {
        self.cpu.reg_file()
    }
    /// The program counter.
    pub fn pc(&self) -> u32 {
        self.cpu.pc()
    }
    /// The memory.
    pub fn memory(&self) -> &Memory {
        &self.mem
    }
    /// The access observer.
    ///
    /// After [`Machine::step`], this holds the accesses of that step.
    /// After [`Machine::run_while`], this holds the accesses of the whole run.
    pub fn observer(&self) -> &AccessObserver {
        self.cpu.observer()
    }
    /// The image of the last successful [`Machine::assemble`], if there was one.
    pub fn image(&self) -> Option<&LinkedImage> {
        self.image.as_ref()
    }
    /// The number of instructions executed since the last reset.
    pub fn instructions_run(&self) -> u64 {
        self.cpu.instructions_run()
    }

    /// Disassembles the word at the given address, for display.
    ///
    /// ```
    /// use riscvm::machine::Machine;
    ///
    /// let mut machine = Machine::default();
    /// machine.assemble("li a0, 5").unwrap();
    /// assert_eq!(machine.disassemble(0).unwrap(), "000A050F  ADDI a0, zero, 5");
    /// ```
    pub fn disassemble(&self, addr: u32) -> Result<String, SimErr> {
        self.mem.read_word(addr).map(disassemble_word)
    }
}
impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // memory is left out, it is mostly zeroes
        f.debug_struct("Machine")
            .field("config", &self.config)
            .field("cpu", &self.cpu)
            .field("io", &self.io)
            .field("latch", &self.latch)
            .field("breakpoints", &self.breakpoints)
            .finish_non_exhaustive()
    }
}
impl Default for Machine {
    fn default() -> Self {
        Self::new(MachineConfig::default())
    }
}
