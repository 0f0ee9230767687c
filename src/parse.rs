//! Parsing assembly source code into an AST.
//!
//! This module is used to convert strings (which represent assembly source code)
//! into abstract syntax trees that maintain all of the information of the source code
//! in an easier to handle format.
//!
//! The main function to use from this module is [`parse_ast`],
//! which parses an assembly code program into a `Vec<`[`Stmt`]`>`.
//!
//! ```
//! use riscvm::parse::parse_ast;
//!
//! let src = "
//!     .section .text
//!     main:
//!         li a0, 5
//!         add a1, a0, a0
//! ";
//! let ast = parse_ast(src).unwrap();
//! assert_eq!(ast.len(), 3);
//! ```
//!
//! The grammar is token-driven, and does not depend on line breaks:
//! ```text
//! stmt     := (SYMBOL ':')* (instr | DIRECTIVE args)
//! instr    := SYMBOL [operand (',' operand)*]
//! operand  := REG | INT | SYMBOL
//! ```
//! An instruction reads as many operands as its signature declares,
//! so a mnemonic which takes no operands (e.g., `RET`) ends its statement immediately.
pub mod lex;

use std::ops::Range;

use logos::{Logos, SpannedIter};

use crate::ast::asm::{AsmInstr, Directive, ImmOrLabel, Operand, PseudoOp, Stmt, StmtKind};
use crate::ast::sim::{IType, Opcode, OperandKind};
use crate::ast::{Label, Reg};

use self::lex::{LexErr, Token};

/// Parses an assembly source code string into a `Vec` of statements.
///
/// # Example
/// ```
/// use riscvm::parse::parse_ast;
///
/// let src = "
///     .section .data
///     msg: .string \"Hi\"
///     .section .text
///     la a1, msg
///     ecall
/// ";
/// let ast = parse_ast(src).unwrap();
/// assert_eq!(ast.len(), 5);
/// ```
pub fn parse_ast(s: &str) -> Result<Vec<Stmt>, ParseErr> {
    let mut parser = Parser::new(s);
    std::iter::from_fn(|| parser.parse_stmt().transpose())
        .collect()
}

/// Kinds of errors that can occur from parsing assembly code.
///
/// See [`ParseErr`] for this error type with span information included.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ParseErrKind {
    /// The source could not be tokenized.
    Lex(LexErr),
    /// A token other than the one expected was found (`None` being the end of the file).
    ExpectedToken {
        /// A description of what was expected.
        expected: &'static str,
        /// The token found.
        found: Option<Token>
    },
    /// An operand was expected (after a mnemonic or a comma), but something else was found.
    ExpectedOperand,
    /// The mnemonic is not an instruction or pseudo-instruction.
    UnknownMnemonic(String),
    /// The directive does not exist.
    UnknownDirective(String),
    /// The pseudo-instruction is reserved, but has no expansion.
    UnimplementedPseudo(PseudoOp),
    /// An operand was of the wrong kind (e.g., an immediate where a register is needed).
    OperandMismatch {
        /// The operand kind that was expected here.
        expected: OperandKind
    },
    /// The instruction was given the wrong number of operands.
    WrongOperandCount {
        /// The number of operands the instruction takes.
        expected: usize,
        /// The number of operands provided.
        found: usize
    },
}
impl std::fmt::Display for ParseErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lex(e) => e.fmt(f),
            Self::ExpectedToken { expected, found: Some(t) } => write!(f, "expected {expected}, found {t}"),
            Self::ExpectedToken { expected, found: None } => write!(f, "expected {expected}, found end of file"),
            Self::ExpectedOperand => f.write_str("expected operand"),
            Self::UnknownMnemonic(m) => write!(f, "unknown instruction '{m}'"),
            Self::UnknownDirective(d) => write!(f, "unknown directive .{d}"),
            Self::UnimplementedPseudo(p) => write!(f, "pseudo-instruction {p} is not implemented"),
            Self::OperandMismatch { expected: OperandKind::Reg } => f.write_str("expected register operand"),
            Self::OperandMismatch { expected: OperandKind::Imm } => f.write_str("expected immediate or symbol operand"),
            Self::WrongOperandCount { expected, found } => write!(f, "expected {expected} operand(s), found {found}"),
        }
    }
}

/// Error from parsing assembly code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParseErr {
    /// The kind of error.
    pub kind: ParseErrKind,
    /// The span in the source associated with this error.
    pub span: Range<usize>
}
impl ParseErr {
    /// Creates a new [`ParseErr`].
    pub fn new(kind: ParseErrKind, span: Range<usize>) -> Self {
        ParseErr { kind, span }
    }
}
impl std::fmt::Display for ParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for ParseErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ParseErrKind::Lex(e) => Some(e),
            _ => None
        }
    }
}
impl crate::err::Error for ParseErr {
    fn span(&self) -> Option<crate::err::ErrSpan> {
        Some(self.span.clone().into())
    }

    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match &self.kind {
            ParseErrKind::Lex(e) => e.help(),
            ParseErrKind::ExpectedToken { .. } => None,
            ParseErrKind::ExpectedOperand => Some("operands are registers, immediates, or symbols".into()),
            ParseErrKind::UnknownMnemonic(_) => Some("labels must be followed by a colon".into()),
            ParseErrKind::UnknownDirective(_) => Some("valid directives are .section, .word, .half, .byte, .string, .ascii, .asciz, .skip, .set, and .globl".into()),
            ParseErrKind::UnimplementedPseudo(_) => Some("write out the equivalent instruction(s) instead".into()),
            ParseErrKind::OperandMismatch { .. } => Some("pc cannot be used as an operand".into()),
            ParseErrKind::WrongOperandCount { .. } => None,
        }
    }
}

/// The operand signature of a pseudo-instruction, or `None` if it has no expansion.
fn pseudo_operands(op: PseudoOp) -> Option<&'static [OperandKind]> {
    use OperandKind::{Imm, Reg};
    match op {
        PseudoOp::LI | PseudoOp::LA => Some(&[Reg, Imm]),
        PseudoOp::MV => Some(&[Reg, Reg]),
        PseudoOp::BEQZ | PseudoOp::BNEZ => Some(&[Reg, Imm]),
        PseudoOp::J | PseudoOp::JR => Some(&[Imm]),
        PseudoOp::RET | PseudoOp::NOP => Some(&[]),
        PseudoOp::PUSH | PseudoOp::POP => Some(&[Reg]),
        PseudoOp::SEQZ | PseudoOp::SNEZ | PseudoOp::SLTZ | PseudoOp::SGTZ => None,
    }
}

/// Operands that have been counted, but not yet checked against their expected kinds.
///
/// Each entry is `None` if the operand was `pc` (which is never a valid operand).
struct Operands {
    ops: std::vec::IntoIter<(Option<Operand>, Range<usize>)>,
    end: Range<usize>
}
impl Operands {
    fn next_reg(&mut self) -> Result<Reg, ParseErr> {
        match self.ops.next() {
            Some((Some(Operand::Reg(r)), _)) => Ok(r),
            Some((_, span)) => Err(ParseErr::new(ParseErrKind::OperandMismatch { expected: OperandKind::Reg }, span)),
            None => Err(ParseErr::new(ParseErrKind::ExpectedOperand, self.end.clone())),
        }
    }
    fn next_imm(&mut self) -> Result<ImmOrLabel, ParseErr> {
        match self.ops.next() {
            Some((Some(Operand::Imm(i)), _)) => Ok(ImmOrLabel::Imm(i)),
            Some((Some(Operand::Symbol(l)), _)) => Ok(ImmOrLabel::Label(l)),
            Some((_, span)) => Err(ParseErr::new(ParseErrKind::OperandMismatch { expected: OperandKind::Imm }, span)),
            None => Err(ParseErr::new(ParseErrKind::ExpectedOperand, self.end.clone())),
        }
    }
}

/// The assembly parser.
///
/// This reads tokens from the lexer with one token of lookahead,
/// producing one [`Stmt`] at a time via [`Parser::parse_stmt`].
pub struct Parser<'s> {
    tokens: std::iter::Peekable<SpannedIter<'s, Token>>,
    /// The end of the last consumed token.
    last_end: usize,
    src_len: usize,
}
impl<'s> Parser<'s> {
    /// Creates a new parser over the given source.
    pub fn new(src: &'s str) -> Self {
        Self {
            tokens: Token::lexer(src).spanned().peekable(),
            last_end: 0,
            src_len: src.len(),
        }
    }

    fn eof_span(&self) -> Range<usize> {
        self.src_len..self.src_len
    }

    /// Peeks at the next token, without consuming it.
    fn peek(&mut self) -> Result<Option<&Token>, ParseErr> {
        match self.tokens.peek() {
            None => Ok(None),
            Some((Ok(t), _)) => Ok(Some(t)),
            Some((Err(e), span)) => Err(ParseErr::new(ParseErrKind::Lex(*e), span.clone())),
        }
    }

    /// Consumes the next token.
    fn advance(&mut self) -> Result<Option<(Token, Range<usize>)>, ParseErr> {
        match self.tokens.next() {
            None => Ok(None),
            Some((Ok(t), span)) => {
                self.last_end = span.end;
                Ok(Some((t, span)))
            },
            Some((Err(e), span)) => Err(ParseErr::new(ParseErrKind::Lex(e), span)),
        }
    }

    /// Consumes the next token if it is equal to `token`, returning whether it was consumed.
    fn advance_if(&mut self, token: &Token) -> Result<bool, ParseErr> {
        let matches = self.peek()? == Some(token);
        if matches {
            self.advance()?;
        }
        Ok(matches)
    }

    /// Consumes the next token, raising an error if there is none.
    fn expect_any(&mut self, expected: &'static str) -> Result<(Token, Range<usize>), ParseErr> {
        match self.advance()? {
            Some(t) => Ok(t),
            None => Err(ParseErr::new(ParseErrKind::ExpectedToken { expected, found: None }, self.eof_span())),
        }
    }

    fn expect_comma(&mut self) -> Result<(), ParseErr> {
        match self.expect_any("','")? {
            (Token::Comma, _) => Ok(()),
            (t, span) => Err(ParseErr::new(ParseErrKind::ExpectedToken { expected: "','", found: Some(t) }, span)),
        }
    }

    /// Parses the next statement, or returns `None` if there are no more statements.
    pub fn parse_stmt(&mut self) -> Result<Option<Stmt>, ParseErr> {
        let mut labels = vec![];

        loop {
            let Some((token, span)) = self.advance()? else {
                // labels at the end of the file
                return match labels.is_empty() {
                    true  => Ok(None),
                    false => Ok(Some(Stmt { labels, nucleus: StmtKind::Empty, span: self.eof_span() })),
                };
            };

            let nucleus = match token {
                Token::Symbol(name) => {
                    if self.advance_if(&Token::Colon)? {
                        labels.push(Label::new(name, span));
                        continue;
                    }
                    StmtKind::Instr(self.parse_instr(&name, span.clone())?)
                },
                Token::Directive(name) => StmtKind::Directive(self.parse_directive(&name, span.clone())?),
                t => return Err(ParseErr::new(ParseErrKind::ExpectedToken {
                    expected: "label, instruction, or directive",
                    found: Some(t)
                }, span)),
            };

            return Ok(Some(Stmt { labels, nucleus, span: span.start..self.last_end }));
        }
    }

    /// Parses one operand.
    ///
    /// `pc` is accepted here and rejected once the operand's kind is known.
    fn parse_operand(&mut self) -> Result<(Option<Operand>, Range<usize>), ParseErr> {
        match self.advance()? {
            Some((Token::Reg(r), span))    => Ok((Some(Operand::Reg(r)), span)),
            Some((Token::Int(i), span))    => Ok((Some(Operand::Imm(i)), span)),
            Some((Token::Symbol(s), span)) => Ok((Some(Operand::Symbol(Label::new(s, span.clone()))), span)),
            Some((Token::PC, span))        => Ok((None, span)),
            Some((_, span)) => Err(ParseErr::new(ParseErrKind::ExpectedOperand, span)),
            None => Err(ParseErr::new(ParseErrKind::ExpectedOperand, self.eof_span())),
        }
    }

    /// Parses the operand list of an instruction with the given signature,
    /// verifying the operand count.
    fn parse_operands(&mut self, signature: &[OperandKind], mnemonic: Range<usize>) -> Result<Operands, ParseErr> {
        let mut ops = vec![];
        if !signature.is_empty() {
            ops.push(self.parse_operand()?);
            while self.advance_if(&Token::Comma)? {
                ops.push(self.parse_operand()?);
            }
        }

        let end = mnemonic.start..self.last_end;
        if ops.len() != signature.len() {
            return Err(ParseErr::new(ParseErrKind::WrongOperandCount { expected: signature.len(), found: ops.len() }, end));
        }
        Ok(Operands { ops: ops.into_iter(), end })
    }

    fn parse_instr(&mut self, mnemonic: &str, span: Range<usize>) -> Result<AsmInstr, ParseErr> {
        if let Ok(opcode) = mnemonic.parse::<Opcode>() {
            let mut ops = self.parse_operands(opcode.operands(), span)?;

            let instr = match opcode.itype() {
                IType::R => AsmInstr::R { opcode, rd: ops.next_reg()?, rs1: ops.next_reg()?, rs2: ops.next_reg()? },
                IType::I => AsmInstr::I { opcode, rd: ops.next_reg()?, rs1: ops.next_reg()?, imm: ops.next_imm()? },
                IType::S => AsmInstr::S { opcode, rs1: ops.next_reg()?, rs2: ops.next_reg()?, imm: ops.next_imm()? },
                IType::U => AsmInstr::U { opcode, rd: ops.next_reg()?, imm: ops.next_imm()? },
                IType::E => AsmInstr::E { opcode },
            };
            return Ok(instr);
        }

        let Ok(pseudo) = mnemonic.parse::<PseudoOp>() else {
            return Err(ParseErr::new(ParseErrKind::UnknownMnemonic(mnemonic.to_string()), span));
        };
        let Some(signature) = pseudo_operands(pseudo) else {
            return Err(ParseErr::new(ParseErrKind::UnimplementedPseudo(pseudo), span));
        };

        let mut ops = self.parse_operands(signature, span)?;
        let instr = match pseudo {
            PseudoOp::LI   => AsmInstr::LI(ops.next_reg()?, ops.next_imm()?),
            PseudoOp::LA   => AsmInstr::LA(ops.next_reg()?, ops.next_imm()?),
            PseudoOp::MV   => AsmInstr::MV(ops.next_reg()?, ops.next_reg()?),
            PseudoOp::BEQZ => AsmInstr::BEQZ(ops.next_reg()?, ops.next_imm()?),
            PseudoOp::BNEZ => AsmInstr::BNEZ(ops.next_reg()?, ops.next_imm()?),
            PseudoOp::JR   => AsmInstr::JR(ops.next_imm()?),
            PseudoOp::J    => AsmInstr::J(ops.next_imm()?),
            PseudoOp::RET  => AsmInstr::RET,
            PseudoOp::NOP  => AsmInstr::NOP,
            PseudoOp::PUSH => AsmInstr::PUSH(ops.next_reg()?),
            PseudoOp::POP  => AsmInstr::POP(ops.next_reg()?),
            PseudoOp::SEQZ | PseudoOp::SNEZ | PseudoOp::SLTZ | PseudoOp::SGTZ => {
                return Err(ParseErr::new(ParseErrKind::UnimplementedPseudo(pseudo), ops.end));
            }
        };
        Ok(instr)
    }

    /// Parses a comma-separated list of immediates and symbols (at least one).
    fn parse_values(&mut self) -> Result<Vec<ImmOrLabel>, ParseErr> {
        let mut values = vec![];
        loop {
            let value = match self.expect_any("immediate or symbol")? {
                (Token::Int(i), _) => ImmOrLabel::Imm(i),
                (Token::Symbol(s), span) => ImmOrLabel::Label(Label::new(s, span)),
                (t, span) => return Err(ParseErr::new(ParseErrKind::ExpectedToken { expected: "immediate or symbol", found: Some(t) }, span)),
            };
            values.push(value);

            if !self.advance_if(&Token::Comma)? {
                break Ok(values);
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, ParseErr> {
        match self.expect_any("string literal")? {
            (Token::String(s), _) => Ok(s),
            (t, span) => Err(ParseErr::new(ParseErrKind::ExpectedToken { expected: "string literal", found: Some(t) }, span)),
        }
    }

    fn parse_symbol(&mut self) -> Result<Label, ParseErr> {
        match self.expect_any("symbol")? {
            (Token::Symbol(s), span) => Ok(Label::new(s, span)),
            (t, span) => Err(ParseErr::new(ParseErrKind::ExpectedToken { expected: "symbol", found: Some(t) }, span)),
        }
    }

    fn parse_directive(&mut self, name: &str, span: Range<usize>) -> Result<Directive, ParseErr> {
        let directive = match &*name.to_lowercase() {
            "section" => match self.expect_any("section name")? {
                // both `.section .text` and `.section text`
                (Token::Directive(s) | Token::Symbol(s), _) => Directive::Section(s),
                (t, span) => return Err(ParseErr::new(ParseErrKind::ExpectedToken { expected: "section name", found: Some(t) }, span)),
            },
            "word" => Directive::Word(self.parse_values()?),
            "half" => Directive::Half(self.parse_values()?),
            "byte" => Directive::Byte(self.parse_values()?),
            "string" | "ascii" | "asciz" => Directive::Ascii(self.parse_string()?),
            "skip" => match self.expect_any("byte count")? {
                (Token::Int(n), _) if n >= 0 => Directive::Skip(n as u32),
                (t, span) => return Err(ParseErr::new(ParseErrKind::ExpectedToken { expected: "non-negative byte count", found: Some(t) }, span)),
            },
            "set" => {
                let label = self.parse_symbol()?;
                self.expect_comma()?;
                match self.expect_any("immediate")? {
                    (Token::Int(n), _) => Directive::Set(label, n),
                    (t, span) => return Err(ParseErr::new(ParseErrKind::ExpectedToken { expected: "immediate", found: Some(t) }, span)),
                }
            },
            "globl" | "global" => Directive::Globl(self.parse_symbol()?),
            _ => return Err(ParseErr::new(ParseErrKind::UnknownDirective(name.to_string()), span)),
        };

        Ok(directive)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::asm::{AsmInstr, Directive, ImmOrLabel, PseudoOp, StmtKind};
    use crate::ast::reg_consts::*;
    use crate::ast::sim::{Opcode, OperandKind};
    use crate::ast::Label;
    use crate::err::LexErr;

    use super::{parse_ast, ParseErrKind};

    fn parse_one(src: &str) -> StmtKind {
        let mut ast = parse_ast(src).unwrap();
        assert_eq!(ast.len(), 1, "expected one statement in {src:?}");
        ast.remove(0).nucleus
    }
    fn assert_parse_fail(src: &str, kind: ParseErrKind) {
        assert_eq!(parse_ast(src).unwrap_err().kind, kind, "parsing {src:?}");
    }
    fn label(name: &str, start: usize) -> ImmOrLabel {
        ImmOrLabel::Label(Label::new(name.to_string(), start..start + name.len()))
    }

    #[test]
    fn test_instr_formats() {
        assert_eq!(
            parse_one("add a1, a0, x5"),
            StmtKind::Instr(AsmInstr::R { opcode: Opcode::ADD, rd: A1, rs1: A0, rs2: T0 })
        );
        assert_eq!(
            parse_one("ADDI a0, zero, -5"),
            StmtKind::Instr(AsmInstr::I { opcode: Opcode::ADDI, rd: A0, rs1: ZERO, imm: ImmOrLabel::Imm(-5) })
        );
        assert_eq!(
            parse_one("sw a0, sp, 8"),
            StmtKind::Instr(AsmInstr::S { opcode: Opcode::SW, rs1: A0, rs2: SP, imm: ImmOrLabel::Imm(8) })
        );
        assert_eq!(
            parse_one("beq t0, t1, loop"),
            StmtKind::Instr(AsmInstr::S { opcode: Opcode::BEQ, rs1: T0, rs2: T1, imm: label("loop", 12) })
        );
        assert_eq!(
            parse_one("jal ra, 'a'"),
            StmtKind::Instr(AsmInstr::U { opcode: Opcode::JAL, rd: RA, imm: ImmOrLabel::Imm('a' as i32) })
        );
        assert_eq!(parse_one("Ecall"), StmtKind::Instr(AsmInstr::E { opcode: Opcode::ECALL }));
    }

    #[test]
    fn test_negated_operands() {
        assert_eq!(parse_one("li a0, -'a'"), StmtKind::Instr(AsmInstr::LI(A0, ImmOrLabel::Imm(-97))));
        assert_eq!(parse_one("li a0, - 5"), StmtKind::Instr(AsmInstr::LI(A0, ImmOrLabel::Imm(-5))));
        assert_eq!(parse_one("addi a0, a0, -0x10"), StmtKind::Instr(AsmInstr::I {
            opcode: Opcode::ADDI, rd: A0, rs1: A0, imm: ImmOrLabel::Imm(-16)
        }));
        assert_eq!(
            parse_one(".word -'a', - 5"),
            StmtKind::Directive(Directive::Word(vec![ImmOrLabel::Imm(-97), ImmOrLabel::Imm(-5)]))
        );
        assert_parse_fail("li a0, -value", ParseErrKind::Lex(LexErr::DanglingMinus));
    }

    #[test]
    fn test_pseudo() {
        assert_eq!(parse_one("li a0, 0x10"), StmtKind::Instr(AsmInstr::LI(A0, ImmOrLabel::Imm(16))));
        assert_eq!(parse_one("li a0, value"), StmtKind::Instr(AsmInstr::LI(A0, label("value", 7))));
        assert_eq!(parse_one("la a1, msg"), StmtKind::Instr(AsmInstr::LA(A1, label("msg", 7))));
        assert_eq!(parse_one("mv s0, a0"), StmtKind::Instr(AsmInstr::MV(S0, A0)));
        assert_eq!(parse_one("beqz t0, end"), StmtKind::Instr(AsmInstr::BEQZ(T0, label("end", 9))));
        assert_eq!(parse_one("bnez t0, 0x40"), StmtKind::Instr(AsmInstr::BNEZ(T0, ImmOrLabel::Imm(0x40))));
        assert_eq!(parse_one("jr f"), StmtKind::Instr(AsmInstr::JR(label("f", 3))));
        assert_eq!(parse_one("j f"), StmtKind::Instr(AsmInstr::J(label("f", 2))));
        assert_eq!(parse_one("ret"), StmtKind::Instr(AsmInstr::RET));
        assert_eq!(parse_one("NOP"), StmtKind::Instr(AsmInstr::NOP));
        assert_eq!(parse_one("push ra"), StmtKind::Instr(AsmInstr::PUSH(RA)));
        assert_eq!(parse_one("pop ra"), StmtKind::Instr(AsmInstr::POP(RA)));
    }

    #[test]
    fn test_unimplemented_pseudo() {
        assert_parse_fail("seqz a0, a1", ParseErrKind::UnimplementedPseudo(PseudoOp::SEQZ));
        assert_parse_fail("snez a0, a1", ParseErrKind::UnimplementedPseudo(PseudoOp::SNEZ));
        assert_parse_fail("SLTZ a0, a1", ParseErrKind::UnimplementedPseudo(PseudoOp::SLTZ));
        assert_parse_fail("sgtz a0, a1", ParseErrKind::UnimplementedPseudo(PseudoOp::SGTZ));
    }

    #[test]
    fn test_labels() {
        let ast = parse_ast("
            main: start:
                nop
            loop: j loop
            end:
        ").unwrap();

        assert_eq!(ast.len(), 3);
        let names = |i: usize| ast[i].labels.iter().map(|l| &*l.name).collect::<Vec<_>>();
        assert_eq!(names(0), ["main", "start"]);
        assert_eq!(names(1), ["loop"]);
        assert_eq!(names(2), ["end"]);
        assert_eq!(ast[2].nucleus, StmtKind::Empty);
    }

    #[test]
    fn test_no_operand_boundaries() {
        // zero-operand instructions end their statement immediately,
        // and statements do not need to be on their own line:
        let ast = parse_ast("ret nop ecall li a0, 1 ebreak").unwrap();
        assert_eq!(ast.len(), 5);
        assert_eq!(ast[3].nucleus, StmtKind::Instr(AsmInstr::LI(A0, ImmOrLabel::Imm(1))));
    }

    #[test]
    fn test_spans() {
        let src = "  lbl: addi a0, a0, 1 # comment\n  ecall";
        let ast = parse_ast(src).unwrap();
        assert_eq!(&src[ast[0].span.clone()], "addi a0, a0, 1");
        assert_eq!(&src[ast[0].labels[0].span()], "lbl");
        assert_eq!(&src[ast[1].span.clone()], "ecall");
    }

    #[test]
    fn test_directives() {
        assert_eq!(parse_one(".section .text"), StmtKind::Directive(Directive::Section("text".into())));
        assert_eq!(parse_one(".SECTION data"), StmtKind::Directive(Directive::Section("data".into())));
        assert_eq!(
            parse_one(".word 1, -2, msg"),
            StmtKind::Directive(Directive::Word(vec![ImmOrLabel::Imm(1), ImmOrLabel::Imm(-2), label("msg", 13)]))
        );
        assert_eq!(parse_one(".half 0xFFFF"), StmtKind::Directive(Directive::Half(vec![ImmOrLabel::Imm(0xFFFF)])));
        assert_eq!(parse_one(".byte 'a'"), StmtKind::Directive(Directive::Byte(vec![ImmOrLabel::Imm(97)])));
        assert_eq!(parse_one(".string \"hi\\n\""), StmtKind::Directive(Directive::Ascii("hi\n".into())));
        assert_eq!(parse_one(".ascii \"hi\""), StmtKind::Directive(Directive::Ascii("hi".into())));
        assert_eq!(parse_one(".asciz \"hi\""), StmtKind::Directive(Directive::Ascii("hi".into())));
        assert_eq!(parse_one(".skip 16"), StmtKind::Directive(Directive::Skip(16)));
        assert_eq!(
            parse_one(".set LEN, 12"),
            StmtKind::Directive(Directive::Set(Label::new("LEN".into(), 5..8), 12))
        );
        assert_eq!(
            parse_one(".globl main"),
            StmtKind::Directive(Directive::Globl(Label::new("main".into(), 7..11)))
        );
    }

    #[test]
    fn test_directive_fail() {
        assert_parse_fail(".orig 0x3000", ParseErrKind::UnknownDirective("orig".into()));
        assert_parse_fail(".skip -1", ParseErrKind::ExpectedToken { expected: "non-negative byte count", found: Some(super::Token::Int(-1)) });
        assert_parse_fail(".string", ParseErrKind::ExpectedToken { expected: "string literal", found: None });
        assert_parse_fail(".set X 1", ParseErrKind::ExpectedToken { expected: "','", found: Some(super::Token::Int(1)) });
        assert_parse_fail(".section 5", ParseErrKind::ExpectedToken { expected: "section name", found: Some(super::Token::Int(5)) });
    }

    #[test]
    fn test_operand_fail() {
        assert_parse_fail("addi a0, 1, 1", ParseErrKind::OperandMismatch { expected: OperandKind::Reg });
        assert_parse_fail("add a0, a0, 1", ParseErrKind::OperandMismatch { expected: OperandKind::Reg });
        assert_parse_fail("addi a0, a0, a0", ParseErrKind::OperandMismatch { expected: OperandKind::Imm });
        assert_parse_fail("jal pc, 0", ParseErrKind::OperandMismatch { expected: OperandKind::Reg });
        assert_parse_fail("mv a0, pc", ParseErrKind::OperandMismatch { expected: OperandKind::Reg });

        assert_parse_fail("addi a0, a0", ParseErrKind::WrongOperandCount { expected: 3, found: 2 });
        assert_parse_fail("li a0, 1, 2", ParseErrKind::WrongOperandCount { expected: 2, found: 3 });
        assert_parse_fail("addi a0, a0,", ParseErrKind::ExpectedOperand);
        assert_parse_fail("addi a0, a0, :", ParseErrKind::ExpectedOperand);
    }

    #[test]
    fn test_stmt_fail() {
        assert_parse_fail("foo a0", ParseErrKind::UnknownMnemonic("foo".into()));
        assert_parse_fail("5", ParseErrKind::ExpectedToken { expected: "label, instruction, or directive", found: Some(super::Token::Int(5)) });
        assert_parse_fail("addi a0, x32, 1", ParseErrKind::Lex(LexErr::InvalidReg));
        assert_parse_fail("li a0, 99999999999", ParseErrKind::Lex(LexErr::DoesNotFitI32));
        assert_parse_fail(".string \"oops", ParseErrKind::Lex(LexErr::UnclosedStrLit));
    }
}
