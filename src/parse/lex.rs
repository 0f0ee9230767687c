//! Tokenizing assembly source.
//!
//! This module holds the tokens that characterize the assembly language ([`Token`]).
//! This module is used by the parser to facilitate the conversion of
//! assembly source code into an AST.
//!
//! The module's key data structure is the [`Token`] enum,
//! which lists all of the tokens of the assembly language.
//!
//! Every byte in `0x00..=0x20` (including new lines) is whitespace,
//! and `#` starts a comment that runs to the end of the line.

use std::num::IntErrorKind;

use logos::{Lexer, Logos};

use crate::ast::Reg;

/// A unit of information in assembly source code.
#[derive(Debug, Logos, PartialEq, Eq, Clone)]
#[logos(skip r"[\x00-\x20]+")]
#[logos(skip r"#[^\n]*")]
#[logos(error = LexErr)]
pub enum Token {
    // Note, these regexes span over tokens that are technically invalid
    // (e.g., 23trst matches for a numeric even though it shouldn't).
    // This is intended.
    // These regexes collect what would be considered one discernable unit
    // and validates it using the validator function.

    /// An immediate value.
    ///
    /// This can be:
    /// - a decimal literal (e.g., `9`),
    /// - a hex literal (e.g., `0x7F`),
    /// - a binary literal (e.g., `0b1010`),
    /// - a character literal (e.g., `'a'`, `'\n'`).
    ///
    /// A leading `-` negates the literal after it (e.g., `-14`, `- 0x10`, `-'a'`).
    #[regex(r"[0-9][0-9A-Za-z_]*", lex_int)]
    #[token("'", lex_char_literal)]
    #[token("-", lex_negated)]
    Int(i32),

    /// A register, either in numeric form (`x0`-`x31`)
    /// or by its ABI alias (e.g., `zero`, `sp`, `a0`, case-insensitive).
    #[regex(r"x[0-9]+", lex_reg)]
    #[regex(r"zero|ra|sp|gp|tp|t[0-6]|s[0-9]|s1[01]|a[0-7]", lex_reg_alias, ignore(case))]
    Reg(Reg),

    /// The program counter alias (`pc`).
    ///
    /// This is recognized so it does not become a symbol,
    /// but no instruction accepts it as an operand.
    #[token("pc", ignore(case))]
    PC,

    /// An identifier.
    ///
    /// This can refer to either:
    /// - a label (e.g., `main`, `loop_1`, `_start`)
    /// - an instruction mnemonic (e.g. `addi`, `LW`, `ecall`)
    ///
    /// Mnemonics are matched case-insensitively by the parser,
    /// but labels are case-sensitive.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lx| lx.slice().to_string())]
    Symbol(String),

    /// A directive (e.g., `.section`, `.word`).
    #[regex(r"\.[A-Za-z_][A-Za-z0-9_]*", |lx| lx.slice()[1..].to_string())]
    Directive(String),

    /// A string literal (e.g., `"Hello!"`), which may span lines
    #[token(r#"""#, lex_str_literal)]
    String(String),

    /// A colon, which appears after labels
    #[token(":")]
    Colon,

    /// A comma, which delineate operands of an instruction
    #[token(",")]
    Comma,
}
impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Int(n)       => write!(f, "immediate {n}"),
            Token::Reg(r)       => write!(f, "register {r}"),
            Token::PC           => f.write_str("pc"),
            Token::Symbol(s)    => write!(f, "symbol '{s}'"),
            Token::Directive(d) => write!(f, "directive .{d}"),
            Token::String(_)    => f.write_str("string literal"),
            Token::Colon        => f.write_str("':'"),
            Token::Comma        => f.write_str("','"),
        }
    }
}

/// Any errors raised in attempting to tokenize an input stream.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum LexErr {
    /// Numeric literal cannot fit within the range of an i32
    /// (or a u32, for hex and binary literals).
    DoesNotFitI32,
    /// Numeric literal has invalid digits for its radix
    InvalidNumeric,
    /// Numeric literal has a radix prefix (`0x`, `0b`) but no digits after it
    EmptyNumeric,
    /// String literal is missing an end quotation mark.
    UnclosedStrLit,
    /// Character literal is missing an end quotation mark.
    UnclosedCharLit,
    /// Character literal has no character in it (`''`).
    EmptyCharLit,
    /// A `-` was not followed by a numeric or character literal.
    DanglingMinus,
    /// Token had the format x\d+, but \d+ isn't 0-31.
    InvalidReg,
    /// A symbol was used which is not allowed in assembly files
    #[default]
    InvalidSymbol
}
impl std::fmt::Display for LexErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErr::DoesNotFitI32   => f.write_str("numeric token does not fit 32-bit integer"),
            LexErr::InvalidNumeric  => f.write_str("invalid numeric literal"),
            LexErr::EmptyNumeric    => f.write_str("numeric literal has no digits"),
            LexErr::UnclosedStrLit  => f.write_str("unclosed string literal"),
            LexErr::UnclosedCharLit => f.write_str("unclosed character literal"),
            LexErr::EmptyCharLit    => f.write_str("empty character literal"),
            LexErr::DanglingMinus   => f.write_str("expected literal after '-'"),
            LexErr::InvalidReg      => f.write_str("invalid register"),
            LexErr::InvalidSymbol   => f.write_str("unrecognized symbol"),
        }
    }
}
impl std::error::Error for LexErr {}
impl crate::err::Error for LexErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            LexErr::DoesNotFitI32   => Some(format!("the range for a 32-bit integer is [{}, {}]", i32::MIN, u32::MAX).into()),
            LexErr::InvalidNumeric  => Some("a decimal literal consists of 0-9, a hex literal is 0x followed by 0-9, A-F, and a binary literal is 0b followed by 0-1".into()),
            LexErr::EmptyNumeric    => Some("there should be digits here".into()),
            LexErr::UnclosedStrLit  => Some("add a quote to the end of the string literal".into()),
            LexErr::UnclosedCharLit => Some("character literals hold exactly one character, like 'a' or '\\n'".into()),
            LexErr::EmptyCharLit    => Some("character literals hold exactly one character, like 'a' or '\\n'".into()),
            LexErr::DanglingMinus   => Some("only numeric and character literals can be negated".into()),
            LexErr::InvalidReg      => Some("this must be x0-x31".into()),
            LexErr::InvalidSymbol   => Some("this char does not occur in any token in this assembly language".into()),
        }
    }
}
/// Helper that converts an int error kind to its corresponding LexErr.
fn convert_int_error(e: &IntErrorKind) -> LexErr {
    match e {
        IntErrorKind::Empty        => LexErr::EmptyNumeric,
        IntErrorKind::InvalidDigit => LexErr::InvalidNumeric,
        IntErrorKind::PosOverflow  => LexErr::DoesNotFitI32,
        IntErrorKind::NegOverflow  => LexErr::DoesNotFitI32,
        _ => LexErr::InvalidNumeric,
    }
}
fn lex_int(lx: &Lexer<'_, Token>) -> Result<i32, LexErr> {
    parse_int(lx.slice(), false)
}
/// Reads the literal after a `-` (skipping any whitespace before it) and negates it.
fn lex_negated(lx: &mut Lexer<'_, Token>) -> Result<i32, LexErr> {
    let rem = lx.remainder();
    let literal = rem.trim_start_matches(|c: char| c <= '\x20');
    lx.bump(rem.len() - literal.len());

    match literal.chars().next() {
        Some('0'..='9') => {
            let len = literal.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(literal.len());
            lx.bump(len);
            parse_int(&literal[..len], true)
        },
        Some('\'') => {
            lx.bump(1);
            // a char literal is at most 0x10FFFF, so this cannot overflow
            lex_char_literal(lx).map(|n| -n)
        },
        _ => Err(LexErr::DanglingMinus),
    }
}
fn parse_int(literal: &str, negative: bool) -> Result<i32, LexErr> {
    let (radix, digits) = if let Some(hex) = literal.strip_prefix("0x").or_else(|| literal.strip_prefix("0X")) {
        (16, hex)
    } else if let Some(bin) = literal.strip_prefix("0b").or_else(|| literal.strip_prefix("0B")) {
        (2, bin)
    } else {
        (10, literal)
    };

    let magnitude = u32::from_str_radix(digits, radix)
        .map_err(|e| convert_int_error(e.kind()))?;

    match (negative, radix) {
        (true, _)   => i32::try_from(-i64::from(magnitude)).map_err(|_| LexErr::DoesNotFitI32),
        // hex and binary literals are bit patterns, so they can use the full u32 range
        (false, 10) => i32::try_from(magnitude).map_err(|_| LexErr::DoesNotFitI32),
        (false, _)  => Ok(magnitude as i32),
    }
}
/// Resolves the character after a backslash in a string or character literal.
fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        // everything else (\\, \", \') is taken literally
        c => c
    }
}
fn lex_char_literal(lx: &mut Lexer<'_, Token>) -> Result<i32, LexErr> {
    let mut chars = lx.remainder().chars();

    let (ch, len) = match chars.next() {
        Some('\'') => {
            lx.bump(1);
            return Err(LexErr::EmptyCharLit);
        },
        Some('\\') => match chars.next() {
            Some(c) if c != '\n' => (unescape(c), 1 + c.len_utf8()),
            _ => return Err(LexErr::UnclosedCharLit),
        },
        Some(c) if c != '\n' => (c, c.len_utf8()),
        _ => return Err(LexErr::UnclosedCharLit),
    };

    match chars.next() {
        Some('\'') => {
            lx.bump(len + 1);
            Ok(ch as i32)
        },
        _ => {
            lx.bump(len);
            Err(LexErr::UnclosedCharLit)
        }
    }
}
fn lex_reg(lx: &Lexer<'_, Token>) -> Result<Reg, LexErr> {
    lx.slice()[1..].parse::<u8>().ok()
        .and_then(|r| Reg::try_from(r).ok())
        .ok_or(LexErr::InvalidReg)
}
fn lex_reg_alias(lx: &Lexer<'_, Token>) -> Result<Reg, LexErr> {
    Reg::from_name(lx.slice())
        .ok_or(LexErr::InvalidReg)
}
fn lex_str_literal(lx: &mut Lexer<'_, Token>) -> Result<String, LexErr> {
    // strings can span lines
    let rem = lx.remainder();

    // find the first unescaped quote, and consume tokens up to and including it
    let mut escaped = false;
    let mlen = rem.char_indices()
        .find(|&(_, c)| {
            let end = c == '"' && !escaped;
            escaped = c == '\\' && !escaped;
            end
        })
        .map(|(n, _)| n);

    match mlen {
        Some(len) => lx.bump(len + 1),
        None => {
            lx.bump(rem.len());
            return Err(LexErr::UnclosedStrLit);
        }
    }

    // get the string inside quotes:
    let inner = &lx.slice()[1..(lx.slice().len() - 1)];
    let mut buf = String::with_capacity(inner.len());

    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            // there always has to be a character after, because the closing quote cannot be escaped
            '\\' => buf.extend(chars.next().map(unescape)),
            c => buf.push(c),
        }
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use logos::Logos;

    use crate::ast::reg_consts::*;
    use crate::err::LexErr;
    use crate::parse::lex::Token;

    fn symbol(s: &str) -> Token {
        Token::Symbol(s.to_string())
    }
    fn directive(s: &str) -> Token {
        Token::Directive(s.to_string())
    }
    fn str_literal(s: &str) -> Token {
        Token::String(s.to_string())
    }

    #[test]
    fn test_numeric_dec_success() {
        // Basic
        let mut tokens = Token::lexer("0 123 456 789");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(123))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(456))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(789))));
        assert_eq!(tokens.next(), None);

        // Negative
        let mut tokens = Token::lexer("-123 -456 -0");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(-123))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(-456))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_numeric_hex_bin_success() {
        let mut tokens = Token::lexer("0x2110 0xABCD 0XabCd 0x0 0xFFFFFFFF -0x10 0b1010 0B11");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0x2110))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0xABCD))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0xABCD))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(-1))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(-0x10))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0b1010))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0b11))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_numeric_overflow() {
        // Overflow success tests
        let mut tokens = Token::lexer("2147483647 -2147483648 0x80000000 -0x80000000");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(i32::MAX))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(i32::MIN))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(i32::MIN))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(i32::MIN))));
        assert_eq!(tokens.next(), None);

        // Overflow failure tests
        assert_eq!(Token::lexer("2147483648").next(), Some(Err(LexErr::DoesNotFitI32)));
        assert_eq!(Token::lexer("-2147483649").next(), Some(Err(LexErr::DoesNotFitI32)));
        assert_eq!(Token::lexer("0x100000000").next(), Some(Err(LexErr::DoesNotFitI32)));
        assert_eq!(Token::lexer("-0x80000001").next(), Some(Err(LexErr::DoesNotFitI32)));
        assert_eq!(Token::lexer("999999999999999999999999999999").next(), Some(Err(LexErr::DoesNotFitI32)));
    }

    #[test]
    fn test_numeric_invalid() {
        assert_eq!(Token::lexer("3Q").next(), Some(Err(LexErr::InvalidNumeric)));
        assert_eq!(Token::lexer("0x0Q").next(), Some(Err(LexErr::InvalidNumeric)));
        assert_eq!(Token::lexer("0b102").next(), Some(Err(LexErr::InvalidNumeric)));
        assert_eq!(Token::lexer("0x").next(), Some(Err(LexErr::EmptyNumeric)));
        assert_eq!(Token::lexer("-").next(), Some(Err(LexErr::DanglingMinus)));
        assert_eq!(Token::lexer("- a0").next(), Some(Err(LexErr::DanglingMinus)));
        assert_eq!(Token::lexer("-0x").next(), Some(Err(LexErr::EmptyNumeric)));
    }

    #[test]
    fn test_negation() {
        let mut tokens = Token::lexer("-'a' - 5 -0x10 -\t'\\n' -\n7 --1");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(-('a' as i32)))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(-5))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(-0x10))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(-('\n' as i32)))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(-7))));
        assert_eq!(tokens.next(), Some(Err(LexErr::DanglingMinus)));

        // the span covers the minus and the literal:
        let mut tokens = Token::lexer("li a0, - 'b'").spanned();
        assert_eq!(tokens.nth(3), Some((Ok(Token::Int(-('b' as i32))), 7..12)));
    }

    #[test]
    fn test_char() {
        let mut tokens = Token::lexer(r"'a' 'Z' ' ' '\n' '\t' '\r' '\0' '\\' '\''");
        assert_eq!(tokens.next(), Some(Ok(Token::Int('a' as i32))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int('Z' as i32))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(' ' as i32))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int('\n' as i32))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int('\t' as i32))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int('\r' as i32))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int('\\' as i32))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int('\'' as i32))));
        assert_eq!(tokens.next(), None);

        assert_eq!(Token::lexer("''").next(), Some(Err(LexErr::EmptyCharLit)));
        assert_eq!(Token::lexer("-''").next(), Some(Err(LexErr::EmptyCharLit)));
        assert_eq!(Token::lexer("'ab'").next(), Some(Err(LexErr::UnclosedCharLit)));
        assert_eq!(Token::lexer("'a").next(), Some(Err(LexErr::UnclosedCharLit)));
        assert_eq!(Token::lexer("'").next(), Some(Err(LexErr::UnclosedCharLit)));
    }

    #[test]
    fn test_regs() {
        // Successes:
        let mut tokens = Token::lexer("x0 x1 x10 x31 zero ra sp gp tp ZERO Sp");
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(ZERO))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(RA))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(A0))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(T6))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(ZERO))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(RA))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(SP))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(GP))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(TP))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(ZERO))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(SP))));
        assert_eq!(tokens.next(), None);

        let mut tokens = Token::lexer("t0 t6 s0 s9 s10 s11 a0 a7");
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(T0))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(T6))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(S0))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(S9))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(S10))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(S11))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(A0))));
        assert_eq!(tokens.next(), Some(Ok(Token::Reg(A7))));
        assert_eq!(tokens.next(), None);

        // Not registers:
        let mut tokens = Token::lexer("a8 t7 s12 x1y zeroes pc PC");
        assert_eq!(tokens.next(), Some(Ok(symbol("a8"))));
        assert_eq!(tokens.next(), Some(Ok(symbol("t7"))));
        assert_eq!(tokens.next(), Some(Ok(symbol("s12"))));
        assert_eq!(tokens.next(), Some(Ok(symbol("x1y"))));
        assert_eq!(tokens.next(), Some(Ok(symbol("zeroes"))));
        assert_eq!(tokens.next(), Some(Ok(Token::PC)));
        assert_eq!(tokens.next(), Some(Ok(Token::PC)));
        assert_eq!(tokens.next(), None);

        // Failures:
        assert_eq!(Token::lexer("x32").next(), Some(Err(LexErr::InvalidReg)));
        assert_eq!(Token::lexer("x99999999999").next(), Some(Err(LexErr::InvalidReg)));
    }

    #[test]
    fn test_str() {
        let mut tokens = Token::lexer(r#" " " "abc" "def" "!@#$%^&*()" "" "#);
        assert_eq!(tokens.next(), Some(Ok(str_literal(" "))));
        assert_eq!(tokens.next(), Some(Ok(str_literal("abc"))));
        assert_eq!(tokens.next(), Some(Ok(str_literal("def"))));
        assert_eq!(tokens.next(), Some(Ok(str_literal("!@#$%^&*()"))));
        assert_eq!(tokens.next(), Some(Ok(str_literal(""))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_str_escape() {
        let mut tokens = Token::lexer(r#" "\n" "\r" "\t" "\\" "\"" "\0" "\e" "a\\" "#);
        assert_eq!(tokens.next(), Some(Ok(str_literal("\n"))));
        assert_eq!(tokens.next(), Some(Ok(str_literal("\r"))));
        assert_eq!(tokens.next(), Some(Ok(str_literal("\t"))));
        assert_eq!(tokens.next(), Some(Ok(str_literal("\\"))));
        assert_eq!(tokens.next(), Some(Ok(str_literal("\""))));
        assert_eq!(tokens.next(), Some(Ok(str_literal("\0"))));
        assert_eq!(tokens.next(), Some(Ok(str_literal("e"))));
        assert_eq!(tokens.next(), Some(Ok(str_literal("a\\"))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_str_unclosed() {
        assert_eq!(Token::lexer(r#"""#).next(), Some(Err(LexErr::UnclosedStrLit)));
        assert_eq!(Token::lexer(r#""\""#).next(), Some(Err(LexErr::UnclosedStrLit)));
        assert_eq!(Token::lexer("\"abc\nnop").next(), Some(Err(LexErr::UnclosedStrLit)));
    }

    #[test]
    fn test_str_multiline() {
        let mut tokens = Token::lexer("\"line 1\nline 2\" nop");
        assert_eq!(tokens.next(), Some(Ok(str_literal("line 1\nline 2"))));
        assert_eq!(tokens.next(), Some(Ok(symbol("nop"))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_symbols() {
        let mut tokens = Token::lexer("main loop_1 _start ADDI addi");
        assert_eq!(tokens.next(), Some(Ok(symbol("main"))));
        assert_eq!(tokens.next(), Some(Ok(symbol("loop_1"))));
        assert_eq!(tokens.next(), Some(Ok(symbol("_start"))));
        assert_eq!(tokens.next(), Some(Ok(symbol("ADDI"))));
        assert_eq!(tokens.next(), Some(Ok(symbol("addi"))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_directive() {
        let mut tokens = Token::lexer(".section .text .word ._");
        assert_eq!(tokens.next(), Some(Ok(directive("section"))));
        assert_eq!(tokens.next(), Some(Ok(directive("text"))));
        assert_eq!(tokens.next(), Some(Ok(directive("word"))));
        assert_eq!(tokens.next(), Some(Ok(directive("_"))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_punct_and_comments() {
        let mut tokens = Token::lexer("0\n1,2:3 # abcdef, 4\n\t5\r\n");
        assert_eq!(tokens.next(), Some(Ok(Token::Int(0))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(1))));
        assert_eq!(tokens.next(), Some(Ok(Token::Comma)));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(2))));
        assert_eq!(tokens.next(), Some(Ok(Token::Colon)));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(3))));
        assert_eq!(tokens.next(), Some(Ok(Token::Int(5))));
        assert_eq!(tokens.next(), None);

        // control characters are whitespace:
        let mut tokens = Token::lexer("\x00\x01ecall\x1F");
        assert_eq!(tokens.next(), Some(Ok(symbol("ecall"))));
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn test_invalid_symbol() {
        for c in "!$%&()*+/;<=>?@[]^`{|}~".chars() {
            let string = c.to_string();
            assert_eq!(
                Token::lexer(&string).next(),
                Some(Err(LexErr::InvalidSymbol)),
                "Expected {string:?} to be an invalid symbol"
            );
        }
    }
}
