//! Memory handling for the simulator.
//!
//! This module consists of:
//! - [`Memory`]: The byte-addressable memory.
//! - [`MemoryView`]: A borrowed range of memory, which displays as a hex dump.
//! - [`RegFile`]: The register file.

use std::ops::Range;

use crate::ast::Reg;

use super::SimErr;

/// Memory.
///
/// This is a flat array of bytes, addressed from 0 up to (but not including) its capacity.
/// Multi-byte values are stored little-endian.
///
/// Every access is bounds-checked.
/// An access of `width` bytes at `addr` fails with [`SimErr::OutOfBounds`]
/// unless all of `addr..addr + width` lies within the memory.
///
/// ```
/// use riscvm::sim::mem::Memory;
///
/// let mut mem = Memory::new(16);
/// mem.write_word(4, 0x1234_5678).unwrap();
/// assert_eq!(mem.read_word(4), Ok(0x1234_5678));
/// assert_eq!(mem.read_byte(4), Ok(0x78));
/// assert!(mem.read_word(14).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    data: Box<[u8]>
}
impl Memory {
    /// Creates a new zeroed memory of the given size (in bytes).
    pub fn new(size: usize) -> Self {
        Self { data: vec![0; size].into_boxed_slice() }
    }

    /// The size of the memory in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Zeroes every byte of memory.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Computes the index range of an access, checking that it lies within memory.
    fn range(&self, addr: u32, width: u32) -> Result<Range<usize>, SimErr> {
        let start = addr as usize;
        start.checked_add(width as usize)
            .filter(|&end| end <= self.data.len())
            .map(|end| start..end)
            .ok_or(SimErr::OutOfBounds { addr, width })
    }

    /// Reads `N` bytes starting at `addr`.
    fn read_array<const N: usize>(&self, addr: u32) -> Result<[u8; N], SimErr> {
        let mut buf = [0; N];
        buf.copy_from_slice(&self.data[self.range(addr, N as u32)?]);
        Ok(buf)
    }

    /// Reads a byte from memory.
    pub fn read_byte(&self, addr: u32) -> Result<u8, SimErr> {
        self.read_array::<1>(addr).map(|[b]| b)
    }
    /// Reads a (little-endian) 16-bit value from memory.
    pub fn read_half(&self, addr: u32) -> Result<u16, SimErr> {
        self.read_array(addr).map(u16::from_le_bytes)
    }
    /// Reads a (little-endian) 32-bit value from memory.
    pub fn read_word(&self, addr: u32) -> Result<u32, SimErr> {
        self.read_array(addr).map(u32::from_le_bytes)
    }
    /// Reads a contiguous block of `len` bytes from memory.
    pub fn read_bytes(&self, addr: u32, len: u32) -> Result<&[u8], SimErr> {
        Ok(&self.data[self.range(addr, len)?])
    }

    /// Writes a byte into memory.
    pub fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), SimErr> {
        self.write_bytes(addr, &[value])
    }
    /// Writes a (little-endian) 16-bit value into memory.
    pub fn write_half(&mut self, addr: u32, value: u16) -> Result<(), SimErr> {
        self.write_bytes(addr, &value.to_le_bytes())
    }
    /// Writes a (little-endian) 32-bit value into memory.
    pub fn write_word(&mut self, addr: u32, value: u32) -> Result<(), SimErr> {
        self.write_bytes(addr, &value.to_le_bytes())
    }
    /// Writes a contiguous block of bytes into memory.
    ///
    /// Nothing is written if any part of the block is out of bounds.
    pub fn write_bytes(&mut self, addr: u32, bytes: &[u8]) -> Result<(), SimErr> {
        let range = self.range(addr, bytes.len() as u32)?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Gets the raw bytes of the memory.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Creates a view over a range of memory, which can be displayed as a hex dump.
    ///
    /// The range is clamped to the bounds of memory.
    ///
    /// ```
    /// use riscvm::sim::mem::Memory;
    ///
    /// let mut mem = Memory::new(64);
    /// mem.write_bytes(0x10, b"Hi!").unwrap();
    /// assert_eq!(
    ///     mem.view(0x10..0x20).to_string(),
    ///     "00000010  48 69 21 00 00 00 00 00  00 00 00 00 00 00 00 00  |Hi!.............|\n"
    /// );
    /// ```
    pub fn view(&self, range: Range<u32>) -> MemoryView<'_> {
        let end = (range.end as usize).min(self.data.len());
        let start = (range.start as usize).min(end);
        MemoryView { base: start as u32, bytes: &self.data[start..end] }
    }
}
impl std::fmt::Display for Memory {
    /// Displays the entire memory as a hex dump.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        MemoryView { base: 0, bytes: &self.data }.fmt(f)
    }
}

/// A borrowed range of memory.
///
/// Its [`Display`](std::fmt::Display) implementation prints a hex dump,
/// 16 bytes per row, with an address column and an ASCII gutter
/// (where non-printable bytes appear as `.`).
#[derive(Debug, Clone, Copy)]
pub struct MemoryView<'m> {
    base: u32,
    bytes: &'m [u8]
}
impl MemoryView<'_> {
    /// The address of the first byte of this view.
    pub fn base(&self) -> u32 {
        self.base
    }
    /// The bytes of this view.
    pub fn bytes(&self) -> &[u8] {
        self.bytes
    }
}
impl std::fmt::Display for MemoryView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const ROW: usize = 16;

        for (i, row) in self.bytes.chunks(ROW).enumerate() {
            write!(f, "{:08X} ", self.base as usize + i * ROW)?;
            for col in 0..ROW {
                if col % 8 == 0 {
                    f.write_str(" ")?;
                }
                match row.get(col) {
                    Some(b) => write!(f, "{b:02X} ")?,
                    None => f.write_str("   ")?,
                }
            }

            f.write_str(" |")?;
            for &b in row {
                let c = match b.is_ascii_graphic() || b == b' ' {
                    true  => char::from(b),
                    false => '.',
                };
                write!(f, "{c}")?;
            }
            f.write_str("|\n")?;
        }
        Ok(())
    }
}

/// The register file.
///
/// This struct can be indexed with a [`Reg`]
/// (which can be constructed using the [`crate::ast::reg_consts`] module or via [`Reg::try_from`]).
///
/// Register `x0` always reads as zero.
/// Writes to it (via [`RegFile::set`]) are discarded.
///
/// # Example
///
/// ```
/// use riscvm::sim::mem::RegFile;
/// use riscvm::ast::reg_consts::{A0, ZERO};
///
/// let mut reg = RegFile::new();
/// reg.set(A0, 11);
/// reg.set(ZERO, 11);
/// assert_eq!(reg[A0], 11);
/// assert_eq!(reg[ZERO], 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegFile([u32; Reg::COUNT]);
impl RegFile {
    /// Creates a register file with every register zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of a register.
    ///
    /// This does nothing if the register is `x0`.
    pub fn set(&mut self, reg: Reg, value: u32) {
        if reg.reg_no() != 0 {
            self.0[usize::from(reg)] = value;
        }
    }

    /// Zeroes every register.
    pub fn reset(&mut self) {
        self.0 = [0; Reg::COUNT];
    }

    /// Gets all register values, indexed by register number.
    pub fn as_array(&self) -> &[u32; Reg::COUNT] {
        &self.0
    }
}
impl std::ops::Index<Reg> for RegFile {
    type Output = u32;

    fn index(&self, index: Reg) -> &Self::Output {
        &self.0[usize::from(index)]
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::reg_consts::*;
    use crate::sim::SimErr;

    use super::{Memory, RegFile};

    #[test]
    fn test_little_endian() {
        let mut mem = Memory::new(8);
        mem.write_word(0, 0xDEAD_BEEF).unwrap();
        assert_eq!(mem.as_bytes()[..4], [0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(mem.read_half(0), Ok(0xBEEF));
        assert_eq!(mem.read_half(2), Ok(0xDEAD));
        assert_eq!(mem.read_byte(3), Ok(0xDE));

        mem.write_half(5, 0x1234).unwrap();
        assert_eq!(mem.read_byte(5), Ok(0x34));
        assert_eq!(mem.read_byte(6), Ok(0x12));
    }

    #[test]
    fn test_bounds() {
        let mut mem = Memory::new(16);
        assert_eq!(mem.capacity(), 16);

        assert!(mem.read_word(12).is_ok());
        assert_eq!(mem.read_word(13), Err(SimErr::OutOfBounds { addr: 13, width: 4 }));
        assert_eq!(mem.read_half(15), Err(SimErr::OutOfBounds { addr: 15, width: 2 }));
        assert_eq!(mem.read_byte(16), Err(SimErr::OutOfBounds { addr: 16, width: 1 }));
        assert_eq!(mem.read_word(u32::MAX), Err(SimErr::OutOfBounds { addr: u32::MAX, width: 4 }));

        // failed writes leave memory untouched
        assert!(mem.write_word(14, u32::MAX).is_err());
        assert!(mem.as_bytes().iter().all(|&b| b == 0));

        assert_eq!(mem.read_bytes(10, 6).map(<[u8]>::len), Ok(6));
        assert!(mem.read_bytes(10, 7).is_err());
    }

    #[test]
    fn test_reset() {
        let mut mem = Memory::new(4);
        mem.write_word(0, 0x0101_0101).unwrap();
        mem.reset();
        assert_eq!(mem.read_word(0), Ok(0));
    }

    #[test]
    fn test_hex_dump() {
        let mut mem = Memory::new(20);
        mem.write_bytes(0, b"Hello\n").unwrap();
        mem.write_byte(17, 0x7F).unwrap();

        let expected = concat!(
            "00000000  48 65 6C 6C 6F 0A 00 00  00 00 00 00 00 00 00 00  |Hello...........|\n",
            "00000010  00 7F 00 00                                       |....|\n",
        );
        assert_eq!(mem.to_string(), expected);

        // views are clamped to memory:
        assert_eq!(mem.view(18..100).bytes().len(), 2);
        assert_eq!(mem.view(18..100).base(), 18);
        assert_eq!(mem.view(50..100).to_string(), "");
    }

    #[test]
    fn test_reg_file() {
        let mut reg = RegFile::new();
        reg.set(ZERO, 99);
        reg.set(T6, 1);
        reg.set(SP, 0x4000);
        assert_eq!(reg[ZERO], 0);
        assert_eq!(reg[T6], 1);
        assert_eq!(reg[SP], 0x4000);

        reg.reset();
        assert_eq!(reg, RegFile::new());
    }
}
