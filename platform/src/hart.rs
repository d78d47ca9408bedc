//! Hart identity and the derived interrupt-line assignment.

use core::fmt;

/// One hardware execution unit, `0..hart_count`.
///
/// Assigned by hardware and read through [`crate::boot::HartContext`],
/// never derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HartId(u32);

impl HartId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A hart's pair of interrupt-router delivery contexts.
///
/// The mapping is fixed wire ABI against the router's context numbering:
/// `signal = 2 * hart`, `timer = 2 * hart + 1`. Injectivity over the hart
/// id makes assignments pairwise disjoint across harts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqLines {
    pub signal: u32,
    pub timer: u32,
}

impl IrqLines {
    #[must_use]
    pub const fn for_hart(hart: HartId) -> Self {
        Self {
            signal: 2 * hart.0,
            timer: 2 * hart.0 + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn line_formula() {
        let lines = IrqLines::for_hart(HartId::new(3));
        assert_eq!(IrqLines { signal: 6, timer: 7 }, lines);

        let lines = IrqLines::for_hart(HartId::new(5));
        assert_eq!(IrqLines { signal: 10, timer: 11 }, lines);
    }

    #[test]
    fn assignments_are_pairwise_disjoint() {
        let mut seen = BTreeSet::new();
        for hart in 0..8 {
            let lines = IrqLines::for_hart(HartId::new(hart));
            assert_eq!(2 * hart, lines.signal);
            assert_eq!(2 * hart + 1, lines.timer);
            assert!(seen.insert(lines.signal));
            assert!(seen.insert(lines.timer));
        }
        assert_eq!(16, seen.len());
    }
}
