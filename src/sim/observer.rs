//! Module handles access observers,
//! which store which accesses occur at a given memory location or register.
//!
//! You would typically access an observer via [`Machine::observer`].
//! This [`AccessObserver`] can be used to read or update accesses via its
//! [`get_mem_accesses`] and [`get_reg_accesses`] methods (and their `update_*` counterparts).
//!
//! Memory accesses are tracked per byte, so a word write marks four addresses.
//!
//! [`Machine::observer`]: crate::machine::Machine::observer
//! [`get_mem_accesses`]: AccessObserver::get_mem_accesses
//! [`get_reg_accesses`]: AccessObserver::get_reg_accesses

use std::collections::BTreeMap;

use crate::ast::Reg;

/// The set of accesses which have occurred at this location.
///
/// ## Example
///
/// ```
/// # use riscvm::sim::observer::AccessSet;
///
/// let accesses = AccessSet::READ;
/// assert!(accesses.accessed());
/// assert!(accesses.read());
/// assert!(!accesses.written());
/// assert!(!accesses.modified());
/// ```
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub struct AccessSet(u8);
impl AccessSet {
    /// Set with only the read flag enabled.
    pub const READ: Self = Self(1 << 0);
    /// Set with only the write flag enabled.
    pub const WRITTEN: Self = Self(1 << 1);
    /// Set with only the modify flag enabled.
    pub const MODIFIED: Self = Self(1 << 2);

    /// The set for a write which replaced `old` with `new`.
    ///
    /// This is always [`AccessSet::WRITTEN`], and also [`AccessSet::MODIFIED`] if the value changed.
    pub fn write_of<T: PartialEq>(old: T, new: T) -> Self {
        match old == new {
            true  => Self::WRITTEN,
            false => Self::WRITTEN | Self::MODIFIED,
        }
    }

    /// True if any access has occurred.
    pub fn accessed(&self) -> bool {
        self.0 != 0
    }

    /// True if a read has occurred.
    pub fn read(&self) -> bool {
        self.0 & Self::READ.0 != 0
    }
    /// True if a write has occurred (does not necessarily have to change data).
    pub fn written(&self) -> bool {
        self.0 & Self::WRITTEN.0 != 0
    }
    /// True if a write has occurred (data must change).
    pub fn modified(&self) -> bool {
        self.0 & Self::MODIFIED.0 != 0
    }
}
impl std::ops::BitOr for AccessSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}
impl std::ops::BitOrAssign for AccessSet {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}
impl std::fmt::Debug for AccessSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessFlags")
            .field("accessed", &self.accessed())
            .field("read", &self.read())
            .field("written", &self.written())
            .field("modified", &self.modified())
            .finish()
    }
}

/// A struct that tracks accesses in memory and in the register file.
#[derive(Debug, Default)]
pub struct AccessObserver {
    mem: BTreeMap<u32, AccessSet>,
    regs: [AccessSet; Reg::COUNT]
}
impl AccessObserver {
    /// Creates a new access observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all accesses.
    pub fn clear(&mut self) {
        std::mem::take(self);
    }

    /// Gets the access set for the given memory location.
    pub fn get_mem_accesses(&self, addr: u32) -> AccessSet {
        self.mem.get(&addr).copied().unwrap_or_default()
    }

    /// Adds new flags to the access set for the given memory location.
    pub fn update_mem_accesses(&mut self, addr: u32, set: AccessSet) {
        *self.mem.entry(addr).or_default() |= set;
    }

    /// Adds new flags to the access sets of `len` consecutive memory locations starting at `addr`.
    pub fn update_mem_range(&mut self, addr: u32, len: u32, set: AccessSet) {
        for a in (0..len).map(|i| addr.wrapping_add(i)) {
            self.update_mem_accesses(a, set);
        }
    }

    /// Gets the access set for the given register.
    pub fn get_reg_accesses(&self, reg: Reg) -> AccessSet {
        self.regs[usize::from(reg)]
    }

    /// Adds new flags to the access set for the given register.
    pub fn update_reg_accesses(&mut self, reg: Reg, set: AccessSet) {
        self.regs[usize::from(reg)] |= set;
    }

    /// Takes all memory accesses which have occurred since last clear,
    /// as well as clearing memory accesses.
    ///
    /// This iterator is sorted in address order.
    pub fn take_mem_accesses(&mut self) -> impl Iterator<Item=(u32, AccessSet)> {
        std::mem::take(&mut self.mem).into_iter()
    }

    /// Iterates over every register which has been accessed since last clear,
    /// in register order.
    pub fn reg_accesses(&self) -> impl Iterator<Item=(Reg, AccessSet)> + '_ {
        self.regs.iter()
            .enumerate()
            .filter(|(_, set)| set.accessed())
            .map(|(i, &set)| (Reg::new_trunc(i as u32), set))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::reg_consts::*;

    use super::{AccessObserver, AccessSet};

    #[test]
    fn test_write_of() {
        assert!(!AccessSet::write_of(1, 1).modified());
        assert!(AccessSet::write_of(1, 1).written());
        assert!(AccessSet::write_of(1, 2).modified());
    }

    #[test]
    fn test_observer() {
        let mut obs = AccessObserver::new();
        obs.update_mem_range(0x10, 4, AccessSet::WRITTEN);
        obs.update_mem_accesses(0x12, AccessSet::READ);
        obs.update_reg_accesses(A0, AccessSet::READ);
        obs.update_reg_accesses(T0, AccessSet::write_of(0, 3));

        assert!(obs.get_mem_accesses(0x12).read());
        assert!(obs.get_mem_accesses(0x12).written());
        assert!(!obs.get_mem_accesses(0x14).accessed());
        assert_eq!(
            obs.reg_accesses().map(|(r, _)| r).collect::<Vec<_>>(),
            [T0, A0]
        );
        assert!(obs.get_reg_accesses(T0).modified());

        let addrs: Vec<_> = obs.take_mem_accesses().map(|(a, _)| a).collect();
        assert_eq!(addrs, [0x10, 0x11, 0x12, 0x13]);
        assert!(!obs.get_mem_accesses(0x10).accessed());

        obs.clear();
        assert_eq!(obs.reg_accesses().count(), 0);
    }
}
