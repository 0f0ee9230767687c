//! This module holds the machine-level instruction set:
//! its opcode table ([`Opcode`]), its formats ([`IType`]),
//! and the decoded form of an instruction word ([`Instruction`]).
//!
//! Every instruction word is 32 bits wide, with the opcode in its low 7 bits.
//! The rest of the word is laid out according to the opcode's format:
//!
//! | format | `[0:7)` | `[7:12)` | `[12:17)` | `[17:22)` | `[22:32)` |
//! |--------|---------|----------|-----------|-----------|-----------|
//! | R      | opcode  | rd       | rs1       | rs2       | -         |
//! | I      | opcode  | rd       | rs1       | imm\[0:15)          ||
//! | S      | opcode  | rs1      | rs2       | imm\[0:15)          ||
//! | U      | opcode  | rd       | imm\[0:20)                     |||
//! | E      | opcode  | -        | -         | -         | -         |
//!
//! Note that S-format words hold `rs1` where the other formats hold `rd`.
use std::fmt::Write as _;

use crate::sim::SimErr;

use super::{Field, Reg};
use super::reg_consts::ZERO;

/// The instruction format, which determines the bit layout of an instruction word.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum IType {
    /// Register-register (`rd`, `rs1`, `rs2`).
    R,
    /// Register-immediate (`rd`, `rs1`, 15-bit `imm`).
    I,
    /// Store/branch (`rs1`, `rs2`, 15-bit `imm`).
    S,
    /// Upper/jump (`rd`, 20-bit `imm`).
    U,
    /// Environment (no operands).
    E,
}
impl IType {
    /// The operands an instruction of this format accepts in assembly source, in order.
    pub fn operands(self) -> &'static [OperandKind] {
        use OperandKind::{Imm, Reg};
        match self {
            IType::R => &[Reg, Reg, Reg],
            IType::I => &[Reg, Reg, Imm],
            IType::S => &[Reg, Reg, Imm],
            IType::U => &[Reg, Imm],
            IType::E => &[],
        }
    }
}

/// The kind of operand an instruction expects in some position.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum OperandKind {
    /// A register.
    Reg,
    /// An immediate value (or a symbol which resolves to one).
    Imm,
}

macro_rules! opcode_table {
    ($($name:ident = $value:literal: $itype:ident),+ $(,)?) => {
        /// An opcode of the instruction set.
        ///
        /// Each opcode's numeric value is fixed explicitly
        /// (and is *not* determined by declaration order),
        /// so reordering the variants does not change the binary encoding.
        ///
        /// The values not assigned here are reserved.
        /// 0 is never valid, and 22-24, 33-34, 37-38, 41, and 46-52 are held by
        /// assembler pseudo-instructions (see [`crate::ast::asm::PseudoOp`]), which have no encoding.
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        #[repr(u8)]
        pub enum Opcode {
            $(
                #[allow(missing_docs)]
                $name = $value
            ),+
        }

        impl Opcode {
            /// Gets the opcode from its numeric value,
            /// returning `None` if the value is reserved or out of range.
            pub fn from_u8(n: u8) -> Option<Opcode> {
                match n {
                    $($value => Some(Opcode::$name)),+,
                    _ => None
                }
            }

            /// The format of this opcode.
            pub fn itype(self) -> IType {
                match self {
                    $(Opcode::$name => IType::$itype),+
                }
            }

            /// The mnemonic of this opcode (in uppercase).
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$name => stringify!($name)),+
                }
            }

            /// Iterates over all opcodes in the table.
            pub fn iter() -> impl Iterator<Item=Opcode> {
                [$(Opcode::$name),+].into_iter()
            }
        }

        impl std::str::FromStr for Opcode {
            type Err = ();

            /// Parses a mnemonic (case-insensitively).
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match &*s.to_uppercase() {
                    $(stringify!($name) => Ok(Opcode::$name)),+,
                    _ => Err(())
                }
            }
        }
    }
}
opcode_table! {
    AND    =  1: R,
    OR     =  2: R,
    XOR    =  3: R,
    ANDI   =  4: I,
    ORI    =  5: I,
    XORI   =  6: I,
    SLL    =  7: R,
    SRL    =  8: R,
    SRA    =  9: R,
    SLLI   = 10: I,
    SRLI   = 11: I,
    SRAI   = 12: I,
    ADD    = 13: R,
    SUB    = 14: R,
    ADDI   = 15: I,
    SUBI   = 16: I,
    MUL    = 17: R,
    DIV    = 18: R,
    REM    = 19: R,
    LUI    = 20: U,
    AUIPC  = 21: U,
    LW     = 25: I,
    LH     = 26: I,
    LB     = 27: I,
    SW     = 28: S,
    SH     = 29: S,
    SB     = 30: S,
    BEQ    = 31: S,
    BNE    = 32: S,
    BLT    = 35: S,
    BGE    = 36: S,
    JAL    = 39: U,
    JALR   = 40: I,
    ECALL  = 42: E,
    EBREAK = 43: E,
    SLT    = 44: R,
    SLTI   = 45: I,
}
impl Opcode {
    /// The operands this opcode accepts in assembly source, in order.
    pub fn operands(self) -> &'static [OperandKind] {
        self.itype().operands()
    }

    /// Whether this opcode's immediate is an absolute target address
    /// (and is therefore read unsigned).
    pub fn has_target(self) -> bool {
        matches!(self, Opcode::BEQ | Opcode::BNE | Opcode::BLT | Opcode::BGE | Opcode::JAL)
    }
}
impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

const OPCODE_MASK: u32 = 0b111_1111;

/// Packs fields into an instruction word according to the given format.
///
/// All fields are truncated to their bit width before packing.
/// Fields that the format does not define are ignored.
///
/// ```
/// use riscvm::ast::sim::{encode, IType};
///
/// // ADDI a0, zero, 5
/// let word = encode(IType::I, 15, 10, 0, 0, 5);
/// assert_eq!(word, (5 << 17) | (10 << 7) | 15);
/// ```
pub fn encode(itype: IType, opcode: u8, rd: u8, rs1: u8, rs2: u8, imm: u32) -> u32 {
    let op = u32::from(opcode) & OPCODE_MASK;
    let rd = u32::from(rd) & 0b11111;
    let rs1 = u32::from(rs1) & 0b11111;
    let rs2 = u32::from(rs2) & 0b11111;

    match itype {
        IType::R => (rs2 << 17) | (rs1 << 12) | (rd << 7) | op,
        IType::I => (Field::<15>::new_trunc(imm).get() << 17) | (rs1 << 12) | (rd << 7) | op,
        IType::S => (Field::<15>::new_trunc(imm).get() << 17) | (rs2 << 12) | (rs1 << 7) | op,
        IType::U => (Field::<20>::new_trunc(imm).get() << 12) | (rd << 7) | op,
        IType::E => op,
    }
}

/// A decoded machine instruction.
///
/// Fields not defined by the opcode's format are zero
/// ([`reg_consts::ZERO`] for registers).
///
/// `imm` holds the raw (unsigned) immediate field: 15 bits for I/S-format, 20 bits for U-format.
/// See [`Instruction::simm`] for its sign-extended value.
///
/// [`reg_consts::ZERO`]: crate::ast::reg_consts::ZERO
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Instruction {
    /// The opcode.
    pub opcode: Opcode,
    /// Destination register (R, I, U).
    pub rd: Reg,
    /// First source register (R, I, S).
    pub rs1: Reg,
    /// Second source register (R, S).
    pub rs2: Reg,
    /// Immediate field (I, S, U).
    pub imm: u32,
}
impl Instruction {
    /// Creates an R-format instruction.
    pub fn new_r(opcode: Opcode, rd: Reg, rs1: Reg, rs2: Reg) -> Self {
        debug_assert_eq!(opcode.itype(), IType::R);
        Self { opcode, rd, rs1, rs2, imm: 0 }
    }
    /// Creates an I-format instruction, truncating the immediate to 15 bits.
    pub fn new_i(opcode: Opcode, rd: Reg, rs1: Reg, imm: u32) -> Self {
        debug_assert_eq!(opcode.itype(), IType::I);
        Self { opcode, rd, rs1, rs2: ZERO, imm: Field::<15>::new_trunc(imm).get() }
    }
    /// Creates an S-format instruction, truncating the immediate to 15 bits.
    pub fn new_s(opcode: Opcode, rs1: Reg, rs2: Reg, imm: u32) -> Self {
        debug_assert_eq!(opcode.itype(), IType::S);
        Self { opcode, rd: ZERO, rs1, rs2, imm: Field::<15>::new_trunc(imm).get() }
    }
    /// Creates a U-format instruction, truncating the immediate to 20 bits.
    pub fn new_u(opcode: Opcode, rd: Reg, imm: u32) -> Self {
        debug_assert_eq!(opcode.itype(), IType::U);
        Self { opcode, rd, rs1: ZERO, rs2: ZERO, imm: Field::<20>::new_trunc(imm).get() }
    }
    /// Creates an E-format instruction.
    pub fn new_e(opcode: Opcode) -> Self {
        debug_assert_eq!(opcode.itype(), IType::E);
        Self { opcode, rd: ZERO, rs1: ZERO, rs2: ZERO, imm: 0 }
    }

    /// The format of this instruction.
    pub fn itype(&self) -> IType {
        self.opcode.itype()
    }

    /// The immediate field, sign-extended from its bit width.
    pub fn simm(&self) -> i32 {
        match self.itype() {
            IType::I | IType::S => Field::<15>::new_trunc(self.imm).get_signed(),
            IType::U => Field::<20>::new_trunc(self.imm).get_signed(),
            IType::R | IType::E => 0,
        }
    }

    /// The value the immediate field stands for when this instruction executes.
    ///
    /// Branch targets and U-format immediates are read as unsigned.
    /// Every other immediate is sign-extended.
    /// This is `None` if the instruction's format has no immediate (R- and E-format).
    ///
    /// ```
    /// use riscvm::ast::sim::{Instruction, Opcode};
    /// use riscvm::ast::reg_consts::{A0, ZERO};
    ///
    /// assert_eq!(Instruction::new_i(Opcode::ADDI, A0, ZERO, 0x4010).imm_value(), Some(0xFFFF_C010));
    /// assert_eq!(Instruction::new_s(Opcode::BEQ, A0, ZERO, 0x4010).imm_value(), Some(0x4010));
    /// ```
    pub fn imm_value(&self) -> Option<u32> {
        match (self.itype(), self.opcode) {
            (IType::R | IType::E, _) => None,
            (IType::U, _) | (_, Opcode::BEQ | Opcode::BNE | Opcode::BLT | Opcode::BGE) => Some(self.imm),
            _ => Some(self.simm() as u32),
        }
    }

    /// Creates a copy of this instruction with its immediate field replaced (and truncated).
    ///
    /// This returns `None` if the instruction's format has no immediate (R- and E-format).
    pub fn with_imm(self, imm: u32) -> Option<Self> {
        match self.itype() {
            IType::I => Some(Self::new_i(self.opcode, self.rd, self.rs1, imm)),
            IType::S => Some(Self::new_s(self.opcode, self.rs1, self.rs2, imm)),
            IType::U => Some(Self::new_u(self.opcode, self.rd, imm)),
            IType::R | IType::E => None,
        }
    }

    /// Encodes this instruction into a word.
    ///
    /// ```
    /// use riscvm::ast::sim::{Instruction, Opcode};
    /// use riscvm::ast::reg_consts::{A0, A1};
    ///
    /// let instr = Instruction::new_r(Opcode::ADD, A1, A0, A0);
    /// assert_eq!(Instruction::decode(instr.encode()).unwrap(), instr);
    /// ```
    pub fn encode(&self) -> u32 {
        encode(
            self.itype(),
            self.opcode as u8,
            self.rd.reg_no(),
            self.rs1.reg_no(),
            self.rs2.reg_no(),
            self.imm
        )
    }

    /// Decodes a word into an instruction.
    ///
    /// This fails with [`SimErr::InvalidOpcode`] if the word's opcode is not in the table
    /// (reserved values, pseudo-instruction slots, and values out of range).
    pub fn decode(word: u32) -> Result<Self, SimErr> {
        let op = (word & OPCODE_MASK) as u8;
        let opcode = Opcode::from_u8(op).ok_or(SimErr::InvalidOpcode(op))?;

        let hi  = Reg::new_trunc(word >> 7);
        let mid = Reg::new_trunc(word >> 12);
        let lo  = Reg::new_trunc(word >> 17);

        let instr = match opcode.itype() {
            IType::R => Self::new_r(opcode, hi, mid, lo),
            IType::I => Self::new_i(opcode, hi, mid, word >> 17),
            IType::S => Self::new_s(opcode, hi, mid, word >> 17),
            IType::U => Self::new_u(opcode, hi, word >> 12),
            IType::E => Self::new_e(opcode),
        };
        Ok(instr)
    }
}
impl std::fmt::Display for Instruction {
    /// Disassembles the instruction into assembly source syntax.
    ///
    /// ```
    /// use riscvm::ast::sim::{Instruction, Opcode};
    /// use riscvm::ast::reg_consts::{A0, ZERO};
    ///
    /// let instr = Instruction::new_i(Opcode::ADDI, A0, ZERO, -3i32 as u32);
    /// assert_eq!(instr.to_string(), "ADDI a0, zero, -3");
    /// ```
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let imm = |f: &mut std::fmt::Formatter<'_>| match self.opcode.has_target() {
            true  => write!(f, "0x{:X}", self.imm),
            false => write!(f, "{}", self.simm()),
        };

        f.write_str(self.opcode.mnemonic())?;
        match self.itype() {
            IType::R => write!(f, " {}, {}, {}", self.rd, self.rs1, self.rs2),
            IType::I => {
                write!(f, " {}, {}, ", self.rd, self.rs1)?;
                imm(f)
            },
            IType::S => {
                write!(f, " {}, {}, ", self.rs1, self.rs2)?;
                imm(f)
            },
            IType::U => {
                write!(f, " {}, ", self.rd)?;
                imm(f)
            },
            IType::E => Ok(()),
        }
    }
}

/// Helper for displaying a raw word alongside its disassembly (or `???` if it does not decode).
pub(crate) fn disassemble_word(word: u32) -> String {
    let mut out = format!("{word:08X}  ");
    match Instruction::decode(word) {
        Ok(instr) => { let _ = write!(out, "{instr}"); },
        Err(_) => out.push_str("???"),
    }
    out
}
