//! Assembling assembly source ASTs into object files, and linking object files into memory images.
//!
//! This module is used to convert source ASTs (`Vec<`[`Stmt`]`>`) into images
//! that can be loaded into memory and executed by the simulator.
//!
//! Assembly happens in two passes:
//! 1. [`assemble`] walks the statements once, expanding pseudo-instructions and
//!     writing each statement's bytes into its section. Every symbol operand is
//!     encoded as zero and recorded as a [`Usage`] to patch later.
//! 2. [`ObjectFile::link`] lays the sections out in a configured order,
//!     resolves every symbol to an absolute address, and patches each usage.
//!
//! The module notably consists of:
//! - [`assemble`]: the first pass, which produces an [`ObjectFile`],
//! - [`SymbolTable`]: the symbols defined during the first pass,
//! - [`ObjectFile`]: section bytes, symbols, and pending usages,
//! - [`LinkedImage`]: the final byte image, along with the section and symbol addresses.
//!
//! [`Stmt`]: crate::ast::asm::Stmt

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use crate::ast::asm::{AsmInstr, Directive, ImmOrLabel, Stmt, StmtKind};
use crate::ast::reg_consts::{RA, SP, ZERO};
use crate::ast::sim::{Instruction, Opcode};
use crate::ast::Label;
use crate::err::ErrSpan;

/// Assembles an assembly source code AST into an object file.
///
/// The object file still has to be linked before it can be loaded into memory.
///
/// # Example
/// ```
/// use riscvm::parse::parse_ast;
/// use riscvm::asm::assemble;
///
/// let src = "
///     .section .text
///     main: li a0, 1
///           j main
/// ";
/// let ast = parse_ast(src).unwrap();
///
/// let obj = assemble(ast).unwrap();
/// assert_eq!(obj.sections().len(), 1);
/// assert_eq!(obj.usages().len(), 1);
///
/// let image = obj.link(&["text"], 0x100).unwrap();
/// assert_eq!(image.lookup_symbol("main"), Some(0));
/// assert_eq!(image.bytes().len(), 8);
/// ```
pub fn assemble(ast: Vec<Stmt>) -> Result<ObjectFile, AsmErr> {
    let mut obj = ObjectFile::empty();
    for stmt in ast {
        obj.write_stmt(stmt)?;
    }
    Ok(obj)
}

/// Kinds of errors that can occur from assembling given assembly code.
///
/// See [`AsmErr`] for this error type with span information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum AsmErrKind {
    /// A symbol was referenced but never defined (link).
    UndefinedSymbol(String),
    /// There were multiple labels of the same name at different locations (pass 1).
    DuplicateLabel,
    /// The laid-out sections do not fit in memory (link).
    SectionOverflow {
        /// The total size of all sections, in bytes.
        size: u64,
        /// The size of memory, in bytes.
        capacity: usize
    },
    /// A section grew past the 32-bit address space (pass 1).
    AddressSpaceOverflow(String),
    /// A symbol usage points at a word whose immediate cannot be patched (link).
    UnpatchableInstr,
    /// A symbol's address does not survive being stored in an instruction's immediate (link).
    ImmOutOfRange {
        /// The symbol.
        name: String,
        /// The symbol's address.
        value: u32
    },
}
impl std::fmt::Display for AsmErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UndefinedSymbol(name) => write!(f, "undefined symbol '{name}'"),
            Self::DuplicateLabel        => f.write_str("label was defined multiple times"),
            Self::SectionOverflow { size, capacity } => write!(f, "program needs {size} bytes, but memory only holds {capacity}"),
            Self::AddressSpaceOverflow(name) => write!(f, "section '{name}' does not fit in a 32-bit address space"),
            Self::UnpatchableInstr      => f.write_str("cannot patch a symbol into this instruction"),
            Self::ImmOutOfRange { name, value } => write!(f, "symbol '{name}' (at {value:#x}) does not fit in this instruction's immediate"),
        }
    }
}

/// Error from assembling given assembly code.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AsmErr {
    /// The value with a span.
    pub kind: AsmErrKind,
    /// The span in the source associated with this value.
    pub span: ErrSpan
}
impl AsmErr {
    /// Creates a new [`AsmErr`].
    pub fn new<E: Into<ErrSpan>>(kind: AsmErrKind, span: E) -> Self {
        AsmErr { kind, span: span.into() }
    }
}
impl std::fmt::Display for AsmErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for AsmErr {}
impl crate::err::Error for AsmErr {
    fn span(&self) -> Option<crate::err::ErrSpan> {
        self.span.first().map(|_| self.span.clone())
    }

    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match &self.kind {
            AsmErrKind::UndefinedSymbol(name) => Some(format!("define this symbol with a label (`{name}:`) or with `.set {name}, VALUE`").into()),
            AsmErrKind::DuplicateLabel        => Some("labels must be unique within a file, try renaming one of the labels".into()),
            AsmErrKind::SectionOverflow { .. } => Some("try increasing the memory size of the machine".into()),
            AsmErrKind::AddressSpaceOverflow(_) => Some("sections can hold at most 4 GiB".into()),
            AsmErrKind::UnpatchableInstr      => None,
            AsmErrKind::ImmOutOfRange { .. } => Some("only branch and jump targets are unsigned, other 15-bit immediates are sign-extended and reach addresses up to 0x3FFF".into()),
        }
    }
}

/// The value a symbol was defined with.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum SymbolValue {
    /// A location in a section (from a label).
    ///
    /// The address is only known once the section is placed by the linker.
    Relative {
        /// Index of the section (see [`ObjectFile::sections`]).
        section: usize,
        /// Byte offset from the start of the section.
        offset: u32
    },
    /// A fixed value (from `.set`).
    Absolute(u32),
}

#[derive(Debug, PartialEq, Eq, Clone)]
struct SymbolData {
    value: SymbolValue,
    /// Span of the symbol's definition.
    span: Range<usize>
}

/// The symbols defined by an object file.
///
/// Symbols are case-sensitive.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct SymbolTable {
    map: HashMap<String, SymbolData>
}
impl SymbolTable {
    /// Defines a label at a section location.
    ///
    /// Redefining a label at the same location is allowed,
    /// but redefining it anywhere else is a [`AsmErrKind::DuplicateLabel`] error.
    fn add_label(&mut self, label: &Label, value: SymbolValue) -> Result<(), AsmErr> {
        match self.map.entry(label.name.clone()) {
            // Two labels with different values. Conflict.
            Entry::Occupied(e) if e.get().value != value => {
                let span1 = e.get().span.clone();
                let span2 = label.span();
                Err(AsmErr::new(AsmErrKind::DuplicateLabel, [span1, span2]))
            },
            // Two labels with same value. No conflict.
            Entry::Occupied(_) => Ok(()),
            // New label.
            Entry::Vacant(e) => {
                e.insert(SymbolData { value, span: label.span() });
                Ok(())
            }
        }
    }

    /// Defines (or redefines) a symbol with an absolute value.
    fn set(&mut self, label: &Label, value: u32) {
        self.map.insert(label.name.clone(), SymbolData { value: SymbolValue::Absolute(value), span: label.span() });
    }

    /// Gets the value of a given symbol (if it exists).
    ///
    /// ## Example
    /// ```
    /// use riscvm::parse::parse_ast;
    /// use riscvm::asm::{assemble, SymbolValue};
    ///
    /// let src = "
    ///     .set LEN, 12
    ///     .section .text
    ///     nop
    ///     loop: j loop
    /// ";
    /// let obj = assemble(parse_ast(src).unwrap()).unwrap();
    /// let sym = obj.symbol_table();
    ///
    /// assert_eq!(sym.lookup("LEN"), Some(SymbolValue::Absolute(12)));
    /// assert_eq!(sym.lookup("loop"), Some(SymbolValue::Relative { section: 0, offset: 4 }));
    /// assert_eq!(sym.lookup("LOOP"), None);
    /// ```
    pub fn lookup(&self, name: &str) -> Option<SymbolValue> {
        self.map.get(name).map(|data| data.value)
    }

    /// Gets an iterable of the mapping from symbols to values.
    pub fn iter(&self) -> impl Iterator<Item=(&str, SymbolValue)> + '_ {
        self.map.iter().map(|(name, data)| (&**name, data.value))
    }
}

/// How a symbol usage is written back once the symbol's address is known.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum UsageKind {
    /// The immediate field of the instruction word at this location.
    Instr,
    /// A raw 32-bit little-endian value (`.word`).
    Word,
    /// A raw 16-bit little-endian value (`.half`), truncated.
    Half,
    /// A raw 8-bit value (`.byte`), truncated.
    Byte,
}

/// A reference to a symbol which has to be patched during linking.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Usage {
    /// Index of the section the reference is in (see [`ObjectFile::sections`]).
    pub section: usize,
    /// Byte offset of the reference in its section.
    pub offset: u32,
    /// How the reference is patched.
    pub kind: UsageKind,
    /// The referenced symbol.
    pub label: Label
}

#[derive(Debug, PartialEq, Eq, Clone)]
enum Chunk {
    Bytes(Vec<u8>),
    /// A `.skip` run. The zeroes are only written out once the section is linked.
    Zeros(u64),
}

/// A named, contiguous run of bytes.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Section {
    name: String,
    chunks: Vec<Chunk>,
    len: u64
}
impl Section {
    fn new(name: String) -> Self {
        Self { name, chunks: vec![], len: 0 }
    }
    /// The name of the section (without any leading dot).
    pub fn name(&self) -> &str {
        &self.name
    }
    /// The size of the section, in bytes.
    pub fn size(&self) -> u64 {
        self.len
    }
    /// The current write offset of the section.
    ///
    /// Past the end of the address space, this saturates.
    /// The statement that got it there is rejected once it is written.
    fn cursor(&self) -> u32 {
        u32::try_from(self.len).unwrap_or(u32::MAX)
    }
    fn push_bytes(&mut self, bytes: &[u8]) {
        self.len += bytes.len() as u64;
        match self.chunks.last_mut() {
            Some(Chunk::Bytes(buf)) => buf.extend_from_slice(bytes),
            _ => self.chunks.push(Chunk::Bytes(bytes.to_vec())),
        }
    }
    fn skip(&mut self, n: u32) {
        self.len += u64::from(n);
        match self.chunks.last_mut() {
            Some(Chunk::Zeros(z)) => *z += u64::from(n),
            _ => self.chunks.push(Chunk::Zeros(u64::from(n))),
        }
    }
    /// Appends the section's bytes (with every symbol reference still zero) to `out`.
    fn write_to(&self, out: &mut Vec<u8>) {
        for chunk in &self.chunks {
            match chunk {
                Chunk::Bytes(buf) => out.extend_from_slice(buf),
                Chunk::Zeros(n) => out.resize(out.len() + *n as usize, 0),
            }
        }
    }
}

/// An object file.
///
/// This is the product of the first assembler pass.
/// It holds each section's bytes (in encounter order), the symbol table,
/// and the symbol usages that still need to be patched.
///
/// It can be linked into a [`LinkedImage`] with [`ObjectFile::link`].
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct ObjectFile {
    sections: Vec<Section>,
    /// The index of the section currently being written, if one has been selected.
    current: Option<usize>,
    symbols: SymbolTable,
    usages: Vec<Usage>
}
impl ObjectFile {
    /// Creates an empty object file.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The sections, in the order they were first encountered.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }
    /// The symbol table.
    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }
    /// The symbol usages which are patched during linking.
    pub fn usages(&self) -> &[Usage] {
        &self.usages
    }

    fn find_section(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.name == name)
    }
    fn find_or_add_section(&mut self, name: &str) -> usize {
        self.find_section(name).unwrap_or_else(|| {
            self.sections.push(Section::new(name.to_string()));
            self.sections.len() - 1
        })
    }
    /// The index of the section being written.
    ///
    /// Before any `.section` directive, this is the section named `""`.
    fn current_section(&mut self) -> usize {
        match self.current {
            Some(i) => i,
            None => {
                let i = self.find_or_add_section("");
                self.current.replace(i);
                i
            }
        }
    }

    /// Writes a value which may be a symbol reference at the current location.
    ///
    /// Symbols are written as zero and recorded as usages.
    fn write_value(&mut self, value: ImmOrLabel, kind: UsageKind) {
        let section = self.current_section();
        let offset = self.sections[section].cursor();

        let n = match value {
            ImmOrLabel::Imm(n) => n as u32,
            ImmOrLabel::Label(label) => {
                self.usages.push(Usage { section, offset, kind, label });
                0
            }
        };

        let section = &mut self.sections[section];
        match kind {
            UsageKind::Instr | UsageKind::Word => section.push_bytes(&n.to_le_bytes()),
            UsageKind::Half => section.push_bytes(&(n as u16).to_le_bytes()),
            UsageKind::Byte => section.push_bytes(&[n as u8]),
        }
    }

    fn write_instr(&mut self, instr: AsmInstr) {
        for (sim, imm) in instr.expand() {
            let section = self.current_section();
            let offset = self.sections[section].cursor();

            if let Some(label) = imm {
                self.usages.push(Usage { section, offset, kind: UsageKind::Instr, label });
            }
            self.sections[section].push_bytes(&sim.encode().to_le_bytes());
        }
    }

    fn write_directive(&mut self, directive: Directive) {
        match directive {
            Directive::Section(name) => {
                let i = self.find_or_add_section(&name);
                self.current.replace(i);
            },
            Directive::Word(values) => values.into_iter().for_each(|v| self.write_value(v, UsageKind::Word)),
            Directive::Half(values) => values.into_iter().for_each(|v| self.write_value(v, UsageKind::Half)),
            Directive::Byte(values) => values.into_iter().for_each(|v| self.write_value(v, UsageKind::Byte)),
            Directive::Ascii(s) => {
                let section = self.current_section();
                self.sections[section].push_bytes(s.as_bytes());
            },
            Directive::Skip(n) => {
                let section = self.current_section();
                self.sections[section].skip(n);
            },
            Directive::Set(label, value) => self.symbols.set(&label, value as u32),
            Directive::Globl(_) => {},
        }
    }

    fn write_stmt(&mut self, stmt: Stmt) -> Result<(), AsmErr> {
        if !stmt.labels.is_empty() {
            let section = self.current_section();
            let offset = self.sections[section].cursor();
            for label in &stmt.labels {
                self.symbols.add_label(label, SymbolValue::Relative { section, offset })?;
            }
        }

        match stmt.nucleus {
            StmtKind::Instr(instr) => self.write_instr(instr),
            StmtKind::Directive(directive) => self.write_directive(directive),
            StmtKind::Empty => {},
        }

        // only the current section can have grown
        if let Some(section) = self.current.map(|i| &self.sections[i]) {
            if section.len > u64::from(u32::MAX) {
                return Err(AsmErr::new(AsmErrKind::AddressSpaceOverflow(section.name.clone()), stmt.span));
            }
        }
        Ok(())
    }

    /// Links the object file into an image that fits in `capacity` bytes.
    ///
    /// The linking algorithm is as follows:
    /// - The sections named in `order` are laid out first (in that order),
    ///     including ones that are never used (which are empty).
    ///     Any other sections follow, in the order they were first encountered.
    /// - Each section is placed right after the previous one, starting at address 0.
    ///     If they do not all fit within `capacity`, error.
    /// - Every symbol is given its absolute address (the base of its section plus its offset,
    ///     or its `.set` value).
    /// - Every usage is patched with the absolute address of its symbol.
    ///     If the symbol is not defined, error.
    pub fn link<S: AsRef<str>>(self, order: &[S], capacity: usize) -> Result<LinkedImage, AsmErr> {
        let Self { mut sections, symbols, usages, .. } = self;

        // Final layout order, as section indices:
        let mut layout = vec![];
        for name in order {
            let name = name.as_ref();
            let i = match sections.iter().position(|s| s.name == name) {
                Some(i) => i,
                None => {
                    sections.push(Section::new(name.to_string()));
                    sections.len() - 1
                }
            };
            if !layout.contains(&i) {
                layout.push(i);
            }
        }
        for i in 0..sections.len() {
            if !layout.contains(&i) {
                layout.push(i);
            }
        }

        let size: u64 = sections.iter().map(|s| s.len).sum();
        if size > capacity as u64 || u32::try_from(size).is_err() {
            return Err(AsmErr::new(AsmErrKind::SectionOverflow { size, capacity }, ErrSpan::Many(vec![])));
        }

        let mut bases = vec![0; sections.len()];
        let mut bytes = Vec::with_capacity(size as usize);
        for &i in &layout {
            bases[i] = bytes.len() as u32;
            sections[i].write_to(&mut bytes);
        }

        let resolve = |value: SymbolValue| match value {
            SymbolValue::Relative { section, offset } => bases[section].wrapping_add(offset),
            SymbolValue::Absolute(n) => n,
        };
        let symbol_addrs: BTreeMap<_, _> = symbols.iter()
            .map(|(name, value)| (name.to_string(), resolve(value)))
            .collect();

        for usage in usages {
            let addr = *symbol_addrs.get(&usage.label.name)
                .ok_or_else(|| AsmErr::new(AsmErrKind::UndefinedSymbol(usage.label.name.clone()), usage.label.span()))?;

            let start = (bases[usage.section] + usage.offset) as usize;
            match usage.kind {
                UsageKind::Instr => {
                    let mut word = [0; 4];
                    word.copy_from_slice(&bytes[start..start + 4]);
                    let patched = Instruction::decode(u32::from_le_bytes(word))
                        .ok()
                        .and_then(|instr| instr.with_imm(addr))
                        .ok_or_else(|| AsmErr::new(AsmErrKind::UnpatchableInstr, usage.label.span()))?;
                    if patched.imm_value() != Some(addr) {
                        let kind = AsmErrKind::ImmOutOfRange { name: usage.label.name.clone(), value: addr };
                        return Err(AsmErr::new(kind, usage.label.span()));
                    }

                    bytes[start..start + 4].copy_from_slice(&patched.encode().to_le_bytes());
                },
                UsageKind::Word => bytes[start..start + 4].copy_from_slice(&addr.to_le_bytes()),
                UsageKind::Half => bytes[start..start + 2].copy_from_slice(&(addr as u16).to_le_bytes()),
                UsageKind::Byte => bytes[start] = addr as u8,
            }
        }

        let sections = layout.into_iter()
            .map(|i| {
                let Section { name, len, .. } = std::mem::replace(&mut sections[i], Section::new(String::new()));
                let start = bases[i];
                (name, start .. start + len as u32)
            })
            .collect();

        Ok(LinkedImage { sections, symbols: symbol_addrs, bytes })
    }
}

impl AsmInstr {
    /// Expands this instruction into the real instructions it assembles to.
    ///
    /// A symbol operand is encoded as zero, and returned alongside its instruction.
    fn expand(self) -> Vec<(Instruction, Option<Label>)> {
        fn split(imm: ImmOrLabel) -> (u32, Option<Label>) {
            match imm {
                ImmOrLabel::Imm(n) => (n as u32, None),
                ImmOrLabel::Label(label) => (0, Some(label)),
            }
        }
        fn one(instr: Instruction, label: Option<Label>) -> Vec<(Instruction, Option<Label>)> {
            vec![(instr, label)]
        }

        match self {
            AsmInstr::R { opcode, rd, rs1, rs2 } => one(Instruction::new_r(opcode, rd, rs1, rs2), None),
            AsmInstr::I { opcode, rd, rs1, imm } => {
                let (imm, label) = split(imm);
                one(Instruction::new_i(opcode, rd, rs1, imm), label)
            },
            AsmInstr::S { opcode, rs1, rs2, imm } => {
                let (imm, label) = split(imm);
                one(Instruction::new_s(opcode, rs1, rs2, imm), label)
            },
            AsmInstr::U { opcode, rd, imm } => {
                let (imm, label) = split(imm);
                one(Instruction::new_u(opcode, rd, imm), label)
            },
            AsmInstr::E { opcode } => one(Instruction::new_e(opcode), None),

            AsmInstr::LI(rd, imm) | AsmInstr::LA(rd, imm) => {
                let (imm, label) = split(imm);
                one(Instruction::new_i(Opcode::ADDI, rd, ZERO, imm), label)
            },
            AsmInstr::MV(rd, rs) => one(Instruction::new_i(Opcode::ADDI, rd, rs, 0), None),
            AsmInstr::BEQZ(rs, target) => {
                let (target, label) = split(target);
                one(Instruction::new_s(Opcode::BEQ, rs, ZERO, target), label)
            },
            AsmInstr::BNEZ(rs, target) => {
                let (target, label) = split(target);
                one(Instruction::new_s(Opcode::BNE, rs, ZERO, target), label)
            },
            AsmInstr::JR(target) => {
                let (target, label) = split(target);
                one(Instruction::new_u(Opcode::JAL, RA, target), label)
            },
            AsmInstr::J(target) => {
                let (target, label) = split(target);
                one(Instruction::new_u(Opcode::JAL, ZERO, target), label)
            },
            AsmInstr::RET => one(Instruction::new_i(Opcode::JALR, ZERO, RA, 0), None),
            AsmInstr::NOP => one(Instruction::new_i(Opcode::ADDI, ZERO, ZERO, 0), None),
            AsmInstr::PUSH(rs) => vec![
                (Instruction::new_s(Opcode::SW, rs, SP, 0), None),
                (Instruction::new_i(Opcode::SUBI, SP, SP, 4), None),
            ],
            AsmInstr::POP(rd) => vec![
                (Instruction::new_i(Opcode::ADDI, SP, SP, 4), None),
                (Instruction::new_i(Opcode::LW, rd, SP, 0), None),
            ],
        }
    }
}

/// A linked memory image.
///
/// This is the final product after assembly source code is fully assembled and linked.
/// Its bytes are loaded into memory starting at address 0.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct LinkedImage {
    /// Each section's name and address range, in layout order.
    sections: Vec<(String, Range<u32>)>,
    /// The absolute address of every symbol.
    symbols: BTreeMap<String, u32>,
    bytes: Vec<u8>
}
impl LinkedImage {
    /// The bytes of the image.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Gets the address range of a given section (if it exists).
    pub fn section_range(&self, name: &str) -> Option<Range<u32>> {
        self.sections.iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r.clone())
    }

    /// Gets the base address of a given section (if it exists).
    pub fn section_base(&self, name: &str) -> Option<u32> {
        self.section_range(name).map(|r| r.start)
    }

    /// Iterates over every section's name and address range, in layout order.
    pub fn sections(&self) -> impl Iterator<Item=(&str, Range<u32>)> + '_ {
        self.sections.iter().map(|(n, r)| (&**n, r.clone()))
    }

    /// Gets the absolute address of a given symbol (if it exists).
    pub fn lookup_symbol(&self, name: &str) -> Option<u32> {
        self.symbols.get(name).copied()
    }

    /// Gets a symbol whose address is the given address (if one exists).
    ///
    /// If several symbols share the address, the alphabetically first is returned.
    pub fn rev_lookup_symbol(&self, addr: u32) -> Option<&str> {
        self.symbols.iter()
            .find(|&(_, &a)| a == addr)
            .map(|(name, _)| &**name)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::reg_consts::*;
    use crate::ast::sim::{Instruction, Opcode};
    use crate::ast::Label;
    use crate::err::ErrSpan;
    use crate::parse::parse_ast;

    use super::{assemble, AsmErr, AsmErrKind, LinkedImage, ObjectFile, Section, SymbolValue, Usage, UsageKind};

    const ORDER: [&str; 4] = ["text", "rodata", "data", "bss"];

    fn assemble_src(src: &str) -> Result<ObjectFile, AsmErr> {
        let ast = parse_ast(src).unwrap();
        assemble(ast)
    }
    fn link_src(src: &str, order: &[&str]) -> Result<LinkedImage, AsmErr> {
        assemble_src(src)?.link(order, 0x4000)
    }
    fn assert_asm_fail<T: std::fmt::Debug>(r: Result<T, AsmErr>, kind: AsmErrKind) {
        assert_eq!(r.unwrap_err().kind, kind);
    }
    fn word_at(image: &LinkedImage, addr: u32) -> u32 {
        let a = addr as usize;
        let mut word = [0; 4];
        word.copy_from_slice(&image.bytes()[a..a + 4]);
        u32::from_le_bytes(word)
    }

    #[test]
    fn test_sym_basic() {
        let src = "
        .section .text
            a: addi a0, a0, 0
               andi a0, a0, 1
            c: addi a0, a0, 0
            d: push a0
               ecall
            e: beqz a0, c
               .skip 2
            b: jal ra, a
        ";

        let obj = assemble_src(src).unwrap();
        let sym = obj.symbol_table();
        let rel = |offset| Some(SymbolValue::Relative { section: 0, offset });
        assert_eq!(sym.lookup("a"), rel(0));
        assert_eq!(sym.lookup("c"), rel(8));
        assert_eq!(sym.lookup("d"), rel(12));
        assert_eq!(sym.lookup("e"), rel(24));
        assert_eq!(sym.lookup("b"), rel(30));
        assert_eq!(sym.lookup("A"), None);
    }

    #[test]
    fn test_forward_and_backward_labels() {
        let src = "
        .section .text
            start: li a0, 5
                   j end
                   nop
            end:   ecall
                   j start
        ";

        let image = link_src(src, &ORDER).unwrap();
        assert_eq!(image.lookup_symbol("end"), Some(12));
        assert_eq!(word_at(&image, 4), Instruction::new_u(Opcode::JAL, ZERO, 12).encode());
        assert_eq!(word_at(&image, 16), Instruction::new_u(Opcode::JAL, ZERO, 0).encode());
    }

    #[test]
    fn test_section_order() {
        let src = "
        .section .data
            val: .word 42
        .section .text
            main: la a0, val
                  lw a1, a0, 0
        ";

        let image = link_src(src, &["text", "data"]).unwrap();
        assert_eq!(image.section_range("text"), Some(0..8));
        assert_eq!(image.section_range("data"), Some(8..12));
        assert_eq!(image.lookup_symbol("val"), Some(8));
        assert_eq!(word_at(&image, 0), Instruction::new_i(Opcode::ADDI, A0, ZERO, 8).encode());
        assert_eq!(word_at(&image, 8), 42);
    }

    #[test]
    fn test_unlisted_and_empty_sections() {
        let src = "
            li a0, 1
        .section extra
            .byte 1, 2
        .section text
            nop
        ";

        let obj = assemble_src(src).unwrap();
        let names: Vec<_> = obj.sections().iter().map(|s| s.name()).collect();
        assert_eq!(names, ["", "extra", "text"]);

        let image = obj.link(&ORDER, 0x100).unwrap();
        let layout: Vec<_> = image.sections().collect();
        assert_eq!(layout, [
            ("text", 0..4),
            ("rodata", 4..4),
            ("data", 4..4),
            ("bss", 4..4),
            ("", 4..8),
            ("extra", 8..10),
        ]);
        assert_eq!(image.section_base("rodata"), Some(4));
        assert_eq!(image.bytes().len(), 10);
    }

    #[test]
    fn test_undefined_symbol() {
        let src = "
        .section .text
            j nowhere
        ";
        let obj = assemble_src(src).unwrap();
        assert_asm_fail(obj.link(&ORDER, 0x100), AsmErrKind::UndefinedSymbol("nowhere".into()));

        assert_asm_fail(link_src(".word missing", &ORDER), AsmErrKind::UndefinedSymbol("missing".into()));
    }

    #[test]
    fn test_duplicate_label() {
        let src = "
            dup: nop
            dup: nop
        ";
        let err = assemble_src(src).unwrap_err();
        assert_eq!(err.kind, AsmErrKind::DuplicateLabel);
        assert!(matches!(err.span, ErrSpan::Two(_)));

        // same location is fine:
        let src = "
            dup: dup: nop
        ";
        assert!(assemble_src(src).is_ok());

        // labels are case-sensitive:
        let src = "
            dup: nop
            DUP: nop
        ";
        assert!(assemble_src(src).is_ok());
    }

    #[test]
    fn test_set() {
        let src = "
            .set SIZE, 0x20
            .set SIZE, 0x40
            over: nop
            .set over, 3
            li a0, SIZE
            li a1, over
        ";
        let image = link_src(src, &ORDER).unwrap();
        assert_eq!(image.lookup_symbol("SIZE"), Some(0x40));
        assert_eq!(image.lookup_symbol("over"), Some(3));
        assert_eq!(word_at(&image, 4), Instruction::new_i(Opcode::ADDI, A0, ZERO, 0x40).encode());
        assert_eq!(word_at(&image, 8), Instruction::new_i(Opcode::ADDI, A1, ZERO, 3).encode());
    }

    #[test]
    fn test_data_relocation() {
        let src = "
        .section .text
            f: ret
        .section .data
            table: .word f, 0x12345678
                   .half table
                   .byte table, -1
        ";
        let image = link_src(src, &ORDER).unwrap();
        let data = image.section_base("data").unwrap();
        assert_eq!(data, 4);
        assert_eq!(&image.bytes()[4..], [
            0, 0, 0, 0,
            0x78, 0x56, 0x34, 0x12,
            4, 0,
            4, 0xFF
        ]);
    }

    #[test]
    fn test_strings() {
        let src = r#"
            .string "ab"
            .ascii "c"
            .asciz "d"
        "#;
        let image = link_src(src, &[]).unwrap();
        assert_eq!(image.bytes(), b"abcd");

        let image = link_src(r#".asciz "hi\0""#, &[]).unwrap();
        assert_eq!(image.bytes(), b"hi\0");
    }

    #[test]
    fn test_pseudo_expansion() {
        let src = "
            push a0
            pop a1
            mv s0, a0
            ret
            jr 0x40
            bnez t0, 0x10
        ";
        let image = link_src(src, &[]).unwrap();
        let expected = [
            Instruction::new_s(Opcode::SW, A0, SP, 0),
            Instruction::new_i(Opcode::SUBI, SP, SP, 4),
            Instruction::new_i(Opcode::ADDI, SP, SP, 4),
            Instruction::new_i(Opcode::LW, A1, SP, 0),
            Instruction::new_i(Opcode::ADDI, S0, A0, 0),
            Instruction::new_i(Opcode::JALR, ZERO, RA, 0),
            Instruction::new_u(Opcode::JAL, RA, 0x40),
            Instruction::new_s(Opcode::BNE, T0, ZERO, 0x10),
        ];
        for (i, instr) in expected.into_iter().enumerate() {
            assert_eq!(word_at(&image, 4 * i as u32), instr.encode(), "instruction {i}");
        }
    }

    #[test]
    fn test_section_overflow() {
        let src = "
            .skip 100
            nop
        ";
        let obj = assemble_src(src).unwrap();
        assert_asm_fail(obj.clone().link(&ORDER, 100), AsmErrKind::SectionOverflow { size: 104, capacity: 100 });
        assert!(obj.link(&ORDER, 104).is_ok());
    }

    #[test]
    fn test_large_skip() {
        // 4 GiB - 2 of zeroes, which are never allocated
        let src = "
            .skip 0x7FFFFFFF
            .skip 0x7FFFFFFF
        ";
        let obj = assemble_src(src).unwrap();
        assert_eq!(obj.sections()[0].size(), 0xFFFF_FFFE);
        assert_asm_fail(obj.link(&ORDER, 0x4000), AsmErrKind::SectionOverflow { size: 0xFFFF_FFFE, capacity: 0x4000 });

        let src = "
            .skip 0x7FFFFFFF
            .skip 0x7FFFFFFF
            .skip 0x7FFFFFFF
        ";
        let err = assemble_src(src).unwrap_err();
        assert_eq!(err.kind, AsmErrKind::AddressSpaceOverflow("".into()));
        assert!(matches!(err.span, ErrSpan::One(_)));

        // skips in between data are laid out in place:
        let image = link_src(".byte 1 .skip 2 .byte 2 .skip 1", &[]).unwrap();
        assert_eq!(image.bytes(), [1, 0, 0, 2, 0]);
    }

    #[test]
    fn test_imm_out_of_range() {
        let src = "
        .section .text
            la t0, buf
        .section .data
            .skip 0x4000
            buf: .word 5
        ";
        let obj = assemble_src(src).unwrap();
        assert_asm_fail(obj.link(&ORDER, 0x8000), AsmErrKind::ImmOutOfRange { name: "buf".into(), value: 0x4004 });

        // branch targets are unsigned, so they reach the whole 15-bit range:
        let src = "
            beqz a0, far
            .skip 0x4000
            far: ecall
        ";
        let image = assemble_src(src).unwrap().link(&ORDER, 0x8000).unwrap();
        assert_eq!(word_at(&image, 0), Instruction::new_s(Opcode::BEQ, A0, ZERO, 0x4004).encode());

        // negative values survive sign extension:
        let src = "
            .set NEG, -4
            li a0, NEG
        ";
        let image = link_src(src, &ORDER).unwrap();
        assert_eq!(word_at(&image, 0), Instruction::new_i(Opcode::ADDI, A0, ZERO, -4i32 as u32).encode());
        assert_asm_fail(link_src(".set NEG, -4\n j NEG", &ORDER), AsmErrKind::ImmOutOfRange { name: "NEG".into(), value: -4i32 as u32 });
    }

    #[test]
    fn test_unpatchable() {
        let mut obj = ObjectFile::empty();
        let mut text = Section::new("text".into());
        text.push_bytes(&Instruction::new_r(Opcode::ADD, A0, A0, A0).encode().to_le_bytes());
        obj.sections.push(text);
        obj.symbols.set(&Label::new("x".into(), 0..1), 1);
        obj.usages.push(Usage { section: 0, offset: 0, kind: UsageKind::Instr, label: Label::new("x".into(), 0..1) });

        assert_asm_fail(obj.link(&ORDER, 0x100), AsmErrKind::UnpatchableInstr);
    }

    #[test]
    fn test_rev_lookup() {
        let src = "
            b: a: nop
            c: nop
        ";
        let image = link_src(src, &[]).unwrap();
        assert_eq!(image.rev_lookup_symbol(0), Some("a"));
        assert_eq!(image.rev_lookup_symbol(4), Some("c"));
        assert_eq!(image.rev_lookup_symbol(8), None);
    }
}
