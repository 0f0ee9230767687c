//! This module holds the AST of assembly source code.
//!
//! The key types are:
//! - [`Stmt`]: a statement (an instruction or a directive, along with its labels),
//! - [`AsmInstr`]: an instruction as written in source, including pseudo-instructions,
//! - [`Directive`]: an assembler directive.
use std::ops::Range;

use super::sim::Opcode;
use super::{Label, Reg};

/// An operand as written in source, before it is checked against an instruction's signature.
///
/// ## Examples
/// ```text
/// ADDI a0, zero, 5
///      ~~  ~~~~  ~
/// LA a1, msg
///    ~~  ~~~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Operand {
    /// A register (`x5`, `a0`).
    Reg(Reg),
    /// A numeric or character immediate (`5`, `-0x10`, `'a'`).
    Imm(i32),
    /// A symbol (label) reference, resolved at link time.
    Symbol(Label),
}
impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Reg(r) => r.fmt(f),
            Operand::Imm(i) => i.fmt(f),
            Operand::Symbol(l) => l.fmt(f),
        }
    }
}

/// An immediate value or a label.
///
/// During assembly, an immediate is encoded as-is.
/// A label is encoded as zero and its location is recorded so that
/// the linker can patch in the label's absolute address.
///
/// ## Examples
/// ```text
/// J end
///   ~~~
/// BNEZ t0, 0x40
///          ~~~~
/// .word msg, 12
///       ~~~  ~~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum ImmOrLabel {
    #[allow(missing_docs)]
    Imm(i32),
    #[allow(missing_docs)]
    Label(Label)
}
impl std::fmt::Display for ImmOrLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImmOrLabel::Imm(i) => i.fmt(f),
            ImmOrLabel::Label(l) => l.fmt(f),
        }
    }
}

macro_rules! pseudo_enum {
    ($($name:ident),+ $(,)?) => {
        /// A pseudo-instruction mnemonic.
        ///
        /// Pseudo-instructions have no encoding of their own;
        /// the assembler expands each into one or more real instructions.
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        pub enum PseudoOp {
            $(
                #[allow(missing_docs)]
                $name
            ),+
        }

        impl std::str::FromStr for PseudoOp {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match &*s.to_uppercase() {
                    $(stringify!($name) => Ok(Self::$name)),+,
                    _ => Err(())
                }
            }
        }

        impl std::fmt::Display for PseudoOp {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$name => f.write_str(stringify!($name))),+
                }
            }
        }
    }
}
pseudo_enum! {
    MV, LI, LA, BEQZ, BNEZ, J, JR, RET,
    SEQZ, SNEZ, SLTZ, SGTZ, NOP, PUSH, POP,
}

/// An assembly source code instruction.
///
/// Real instructions are grouped by format; pseudo-instructions have their own variants.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum AsmInstr {
    /// An R-format instruction (`ADD rd, rs1, rs2`).
    R {
        #[allow(missing_docs)] opcode: Opcode,
        #[allow(missing_docs)] rd: Reg,
        #[allow(missing_docs)] rs1: Reg,
        #[allow(missing_docs)] rs2: Reg
    },
    /// An I-format instruction (`ADDI rd, rs1, imm`).
    I {
        #[allow(missing_docs)] opcode: Opcode,
        #[allow(missing_docs)] rd: Reg,
        #[allow(missing_docs)] rs1: Reg,
        #[allow(missing_docs)] imm: ImmOrLabel
    },
    /// An S-format instruction (`SW rs1, rs2, imm` or `BEQ rs1, rs2, target`).
    S {
        #[allow(missing_docs)] opcode: Opcode,
        #[allow(missing_docs)] rs1: Reg,
        #[allow(missing_docs)] rs2: Reg,
        #[allow(missing_docs)] imm: ImmOrLabel
    },
    /// A U-format instruction (`JAL rd, target`).
    U {
        #[allow(missing_docs)] opcode: Opcode,
        #[allow(missing_docs)] rd: Reg,
        #[allow(missing_docs)] imm: ImmOrLabel
    },
    /// An E-format instruction (`ECALL`).
    E {
        #[allow(missing_docs)] opcode: Opcode
    },

    /// `LI rd, imm` = `ADDI rd, zero, imm`
    LI(Reg, ImmOrLabel),
    /// `LA rd, sym` = `ADDI rd, zero, sym`
    LA(Reg, ImmOrLabel),
    /// `MV rd, rs` = `ADDI rd, rs, 0`
    MV(Reg, Reg),
    /// `BEQZ rs, target` = `BEQ rs, zero, target`
    BEQZ(Reg, ImmOrLabel),
    /// `BNEZ rs, target` = `BNE rs, zero, target`
    BNEZ(Reg, ImmOrLabel),
    /// `JR target` = `JAL ra, target`
    JR(ImmOrLabel),
    /// `J target` = `JAL zero, target`
    J(ImmOrLabel),
    /// `RET` = `JALR zero, ra, 0`
    RET,
    /// `NOP` = `ADDI zero, zero, 0`
    NOP,
    /// `PUSH rs` = `SW rs, sp, 0` + `SUBI sp, sp, 4`
    PUSH(Reg),
    /// `POP rd` = `ADDI sp, sp, 4` + `LW rd, sp, 0`
    POP(Reg),
}

/// An assembler directive.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Directive {
    /// `.section NAME`: switches the section subsequent statements are written into.
    Section(String),
    /// `.word V, ...`: appends 32-bit values.
    Word(Vec<ImmOrLabel>),
    /// `.half V, ...`: appends 16-bit values.
    Half(Vec<ImmOrLabel>),
    /// `.byte V, ...`: appends 8-bit values.
    Byte(Vec<ImmOrLabel>),
    /// `.string "..."`, `.ascii "..."`, or `.asciz "..."`: appends the string's bytes.
    ///
    /// None of these add a terminator. A NUL has to be written out (`"hi\0"`).
    Ascii(String),
    /// `.skip N`: appends N zero bytes.
    Skip(u32),
    /// `.set SYM, V`: defines (or redefines) a symbol with an absolute value.
    Set(Label, i32),
    /// `.globl SYM`: accepted for compatibility; has no effect.
    Globl(Label),
}
/// Either an instruction or a directive.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum StmtKind {
    #[allow(missing_docs)]
    Instr(AsmInstr),
    #[allow(missing_docs)]
    Directive(Directive),
    /// Nothing but labels (i.e., labels at the end of the file).
    Empty,
}

/// A "statement" in assembly.
///
/// This can either be an instruction or a directive,
/// and includes any labels that were defined before it.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Stmt {
    /// The labels.
    pub labels: Vec<Label>,
    /// The instruction or directive.
    pub nucleus: StmtKind,
    /// The span of the nucleus.
    pub span: Range<usize>
}
