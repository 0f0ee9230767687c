//! Utilities to debug simulation.
//!
//! The key type here is [`Breakpoint`], which can be added to the [`Machine`]'s
//! breakpoint field to cause the machine to stop running.
//!
//! These are separate from the `EBREAK` instruction:
//! a `Breakpoint` is checked by [`Machine::run_while`] after each step, and needs no change to the program.
//!
//! [`Machine`]: crate::machine::Machine
//! [`Machine::run_while`]: crate::machine::Machine::run_while
use std::fmt::Write;

use crate::ast::Reg;
use crate::machine::Machine;

/// Common breakpoints.
#[derive(PartialEq, Eq, Hash)]
pub enum Breakpoint {
    /// Break when the PC is equal to the given value.
    PC(u32),

    /// Break when the provided register holds a given value.
    Reg {
        /// Register to check.
        reg: Reg,
        /// Predicate to break against.
        value: Comparator
    },
    /// Break when the word at the provided memory address holds a given value.
    Mem {
        /// Address to check.
        addr: u32,
        /// Predicate to break against.
        value: Comparator
    },
}

impl Breakpoint where Breakpoint: Send + Sync { /* assert Breakpoint is send/sync */ }

impl Breakpoint {
    /// Checks if a break should occur.
    ///
    /// A memory breakpoint on an address outside of memory never breaks.
    pub fn check(&self, machine: &Machine) -> bool {
        match self {
            Breakpoint::PC(expected) => *expected == machine.pc(),
            Breakpoint::Reg { reg, value: cmp } => cmp.check(machine.reg_file()[*reg]),
            Breakpoint::Mem { addr, value: cmp } => machine.memory()
                .read_word(*addr)
                .is_ok_and(|w| cmp.check(w)),
        }
    }

    fn fmt_bp(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::PC(expected) => {
                write!(f, "PC == 0x{expected:08X}")?;
            },
            Self::Reg { reg, value } => {
                write!(f, "{reg} ")?;
                value.fmt_cmp(f)?;
            },
            Self::Mem { addr, value } => {
                write!(f, "mem[0x{addr:08X}] ")?;
                value.fmt_cmp(f)?;
            },
        }
        Ok(())
    }
}
impl std::fmt::Debug for Breakpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Breakpoint(")?;
        self.fmt_bp(f)?;
        f.write_char(')')
    }
}
/// Predicate checking whether the current value is equal to the value.
///
/// Values are compared unsigned.
#[derive(PartialEq, Eq, Hash, Debug)]
pub enum Comparator {
    /// Never breaks.
    Never,
    /// Break if the desired value is less than the provided value.
    Lt(u32),
    /// Break if the desired value is equal to the provided value.
    Eq(u32),
    /// Break if the desired value is less than or equal to the provided value.
    Le(u32),
    /// Break if the desired value is greater than the provided value.
    Gt(u32),
    /// Break if the desired value is not equal to the provided value.
    Ne(u32),
    /// Break if the desired value is greater than or equal to the provided value.
    Ge(u32),
    /// Always breaks.
    Always
}
impl Comparator {
    /// Checks if the operand passes the comparator.
    pub fn check(&self, operand: u32) -> bool {
        match *self {
            Comparator::Never  => false,
            Comparator::Lt(r)  => operand < r,
            Comparator::Eq(r)  => operand == r,
            Comparator::Le(r)  => operand <= r,
            Comparator::Gt(r)  => operand > r,
            Comparator::Ne(r)  => operand != r,
            Comparator::Ge(r)  => operand >= r,
            Comparator::Always => true,
        }
    }

    fn fmt_cmp(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Comparator::Never  => f.write_str("never"),
            Comparator::Lt(r)  => write!(f, "< {r}"),
            Comparator::Eq(r)  => write!(f, "== {r}"),
            Comparator::Le(r)  => write!(f, "<= {r}"),
            Comparator::Gt(r)  => write!(f, "> {r}"),
            Comparator::Ne(r)  => write!(f, "!= {r}"),
            Comparator::Ge(r)  => write!(f, ">= {r}"),
            Comparator::Always => f.write_str("always"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::reg_consts::A0;

    use super::{Breakpoint, Comparator};

    #[test]
    fn test_debug_fmt() {
        assert_eq!(format!("{:?}", Breakpoint::PC(0x40)), "Breakpoint(PC == 0x00000040)");
        assert_eq!(
            format!("{:?}", Breakpoint::Reg { reg: A0, value: Comparator::Ge(3) }),
            "Breakpoint(a0 >= 3)"
        );
        assert_eq!(
            format!("{:?}", Breakpoint::Mem { addr: 0x100, value: Comparator::Always }),
            "Breakpoint(mem[0x00000100] always)"
        );
    }

    #[test]
    fn test_comparator() {
        assert!(Comparator::Lt(5).check(4));
        assert!(!Comparator::Lt(5).check(5));
        assert!(Comparator::Ne(5).check(u32::MAX));
        assert!(!Comparator::Never.check(0));
        assert!(Comparator::Always.check(0));
    }
}
