//! Components relating to the abstract syntax trees (ASTs)
//! used in representing assembly and machine instructions.
//!
//! These components together are used to construct...
//! - [`asm::Stmt`] (a data structure holding an assembly source code statement),
//! - and [`sim::Instruction`] (a data structure holding a decoded machine instruction).

pub mod asm;
pub mod sim;

use std::num::TryFromIntError;

/// A register. Must be between 0 and 31.
///
/// This `Reg` struct can either be constructed by selecting a register from [`reg_consts`],
/// by name with [`Reg::from_name`], or by using [`Reg::try_from`].
///
/// Register 0 ([`reg_consts::ZERO`]) is hardwired to zero in the simulator.
///
/// ## Examples
///
/// ```text
/// ADD a1, a0, a0
///     ~~  ~~  ~~
/// ADDI x5, zero, 10
///      ~~  ~~~~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct Reg(pub(crate) u8);

/// The ABI names of each register, indexed by register number.
const ABI_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2",
    "s0", "s1", "a0", "a1", "a2", "a3", "a4", "a5",
    "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7",
    "s8", "s9", "s10", "s11", "t3", "t4", "t5", "t6",
];

/// Register constants, named by their ABI alias.
pub mod reg_consts {
    use super::Reg;

    /// Hardwired zero.
    pub const ZERO: Reg = Reg(0);
    /// Return address.
    pub const RA: Reg = Reg(1);
    /// Stack pointer.
    pub const SP: Reg = Reg(2);
    /// Global pointer.
    pub const GP: Reg = Reg(3);
    /// Thread pointer.
    pub const TP: Reg = Reg(4);
    #[allow(missing_docs)] pub const T0: Reg = Reg(5);
    #[allow(missing_docs)] pub const T1: Reg = Reg(6);
    #[allow(missing_docs)] pub const T2: Reg = Reg(7);
    #[allow(missing_docs)] pub const S0: Reg = Reg(8);
    #[allow(missing_docs)] pub const S1: Reg = Reg(9);
    /// First argument register. Also the file descriptor or exit code of a syscall.
    pub const A0: Reg = Reg(10);
    /// Second argument register. Also the buffer address of the write syscall.
    pub const A1: Reg = Reg(11);
    /// Third argument register. Also the byte count of the write syscall.
    pub const A2: Reg = Reg(12);
    #[allow(missing_docs)] pub const A3: Reg = Reg(13);
    #[allow(missing_docs)] pub const A4: Reg = Reg(14);
    #[allow(missing_docs)] pub const A5: Reg = Reg(15);
    #[allow(missing_docs)] pub const A6: Reg = Reg(16);
    /// Eighth argument register. Selects the syscall for `ECALL`.
    pub const A7: Reg = Reg(17);
    #[allow(missing_docs)] pub const S2: Reg = Reg(18);
    #[allow(missing_docs)] pub const S3: Reg = Reg(19);
    #[allow(missing_docs)] pub const S4: Reg = Reg(20);
    #[allow(missing_docs)] pub const S5: Reg = Reg(21);
    #[allow(missing_docs)] pub const S6: Reg = Reg(22);
    #[allow(missing_docs)] pub const S7: Reg = Reg(23);
    #[allow(missing_docs)] pub const S8: Reg = Reg(24);
    #[allow(missing_docs)] pub const S9: Reg = Reg(25);
    #[allow(missing_docs)] pub const S10: Reg = Reg(26);
    #[allow(missing_docs)] pub const S11: Reg = Reg(27);
    #[allow(missing_docs)] pub const T3: Reg = Reg(28);
    #[allow(missing_docs)] pub const T4: Reg = Reg(29);
    #[allow(missing_docs)] pub const T5: Reg = Reg(30);
    #[allow(missing_docs)] pub const T6: Reg = Reg(31);
}
impl Reg {
    /// The number of addressable registers (including the zero register).
    pub const COUNT: usize = 32;

    /// Gets the register number of this [`Reg`]. This is always between 0 and 31.
    pub fn reg_no(self) -> u8 {
        self.0
    }

    /// Gets the ABI name of this register (e.g., `a0`).
    pub fn abi_name(self) -> &'static str {
        ABI_NAMES[usize::from(self.0)]
    }

    /// Looks up a register by its ABI alias (case-insensitive).
    ///
    /// This does not accept the numeric `xN` form; that is handled by the lexer.
    ///
    /// ```
    /// use riscvm::ast::Reg;
    /// use riscvm::ast::reg_consts::{A0, ZERO};
    ///
    /// assert_eq!(Reg::from_name("a0"), Some(A0));
    /// assert_eq!(Reg::from_name("ZERO"), Some(ZERO));
    /// assert_eq!(Reg::from_name("a8"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Reg> {
        ABI_NAMES.iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .map(|i| Reg(i as u8))
    }

    /// Creates a register from the low 5 bits of a value.
    pub(crate) fn new_trunc(n: u32) -> Reg {
        Reg((n & 0b11111) as u8)
    }
}
impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.abi_name())
    }
}
impl From<Reg> for usize {
    // Used for indexing the reg file in [`crate::sim::mem::RegFile`].
    fn from(value: Reg) -> Self {
        usize::from(value.0)
    }
}
impl TryFrom<u8> for Reg {
    type Error = TryFromIntError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0..=31 => Ok(Reg(value)),
            // HACKy, but there's no other way to create this error
            _      => u8::try_from(256).map(|_| unreachable!("should've been TryFromIntError")),
        }
    }
}

/// An unsigned bit field of an instruction word.
///
/// `N` indicates the bit size of the field.
/// The field's value is stored unsigned, but can be read sign-extended via [`Field::get_signed`].
///
/// ## Examples
///
/// `Field<15>` is the immediate of I- and S-format instructions:
/// ```text
/// ADDI a0, zero, 5
///                ~
/// SW a0, sp, 0
///            ~
/// ```
///
/// `Field<20>` is the immediate of U-format instructions:
/// ```text
/// JAL ra, 0x40
///         ~~~~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub struct Field<const N: u32>(u32);

impl<const N: u32> Field<N> {
    const MASK: u32 = match N {
        32 => u32::MAX,
        n  => (1 << n) - 1
    };

    /// Creates a new field by keeping the low `N` bits of the integer
    /// and discarding the rest.
    ///
    /// # Examples
    ///
    /// ```
    /// # use riscvm::ast::Field;
    /// #
    /// let neg5  = Field::<5>::new_trunc(-5i32 as u32); // 0b11...1_11011
    /// let pos15 = Field::<5>::new_trunc(15);           // 0b00...0_01111
    /// let pos32 = Field::<5>::new_trunc(32);           // 0b00...1_00000
    /// assert_eq!(neg5.get(), 0b11011);
    /// assert_eq!(neg5.get_signed(), -5);
    /// assert_eq!(pos15.get_signed(), 15);
    /// assert_eq!(pos32.get(), 0);
    /// ```
    pub fn new_trunc(n: u32) -> Self {
        Self(n & Self::MASK)
    }

    /// Gets the (zero-extended) value of the field.
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Gets the sign-extended value of the field.
    pub fn get_signed(&self) -> i32 {
        let shift = 32 - N;
        ((self.0 << shift) as i32) >> shift
    }
}

/// A label.
///
/// This struct stores the name of the label (accessible by the `name` field)
/// and the source code span indicating where the label is located in assembly source code.
///
/// # Examples
/// ```text
/// .section .text
/// main:
/// ~~~~
///     la a1, msg
///            ~~~
///     j end
///       ~~~
/// end:
/// ~~~
///     ecall
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Label {
    /// The label's identifier
    pub name: String,

    /// The start of the label in assembly source code.
    ///
    /// Since name stores the length of the string,
    /// we don't need to store the whole span.
    start: usize
}
impl Label {
    /// Creates a new label.
    pub fn new(name: String, span: std::ops::Range<usize>) -> Self {
        debug_assert_eq!(span.start + name.len(), span.end, "span should have the same length as name");
        Label { name, start: span.start }
    }
    /// Returns the span of the label in assembly source code.
    pub fn span(&self) -> std::ops::Range<usize> {
        self.start .. (self.start + self.name.len())
    }
}
impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.name.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::reg_consts::*;
    use super::{Field, Reg};

    #[test]
    fn test_reg_names() {
        for n in 0..32u8 {
            let reg = Reg::try_from(n).unwrap();
            assert_eq!(Reg::from_name(reg.abi_name()), Some(reg));
        }

        assert_eq!(Reg::from_name("Sp"), Some(SP));
        assert_eq!(Reg::from_name("s11"), Some(S11));
        assert_eq!(Reg::from_name("t6"), Some(T6));
        assert_eq!(Reg::from_name("x1"), None);
        assert!(Reg::try_from(32).is_err());
        assert_eq!(A7.to_string(), "a7");
    }

    #[test]
    fn test_field_edges() {
        assert_eq!(Field::<15>::new_trunc(0x7FFF).get_signed(), -1);
        assert_eq!(Field::<15>::new_trunc(0x3FFF).get_signed(), 0x3FFF);
        assert_eq!(Field::<15>::new_trunc(0x8000).get(), 0);
        assert_eq!(Field::<20>::new_trunc(u32::MAX).get(), 0xF_FFFF);
        assert_eq!(Field::<32>::new_trunc(u32::MAX).get(), u32::MAX);
        assert_eq!(Field::<32>::new_trunc(u32::MAX).get_signed(), -1);
    }
}
