//! Property attribute bit set.

use std::fmt;

/// Writable / enumerable / configurable flags of one property.
///
/// Part of shape transition keys, so it is `Copy + Hash`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyAttributes(u8);

impl PropertyAttributes {
    pub const WRITABLE: u8 = 1 << 0;
    pub const ENUMERABLE: u8 = 1 << 1;
    pub const CONFIGURABLE: u8 = 1 << 2;

    /// Writable, enumerable and configurable: what assignment creates.
    pub const DEFAULT: PropertyAttributes =
        PropertyAttributes(Self::WRITABLE | Self::ENUMERABLE | Self::CONFIGURABLE);

    /// None of the flags set.
    pub const NONE: PropertyAttributes = PropertyAttributes(0);

    /// Writable and configurable but hidden from enumeration (built-in methods).
    pub const HIDDEN: PropertyAttributes =
        PropertyAttributes(Self::WRITABLE | Self::CONFIGURABLE);

    pub const fn from_bits(bits: u8) -> Self {
        PropertyAttributes(bits & (Self::WRITABLE | Self::ENUMERABLE | Self::CONFIGURABLE))
    }

    pub const fn new(writable: bool, enumerable: bool, configurable: bool) -> Self {
        let mut bits = 0;
        if writable {
            bits |= Self::WRITABLE;
        }
        if enumerable {
            bits |= Self::ENUMERABLE;
        }
        if configurable {
            bits |= Self::CONFIGURABLE;
        }
        PropertyAttributes(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_writable(self) -> bool {
        self.0 & Self::WRITABLE != 0
    }

    #[inline]
    pub const fn is_enumerable(self) -> bool {
        self.0 & Self::ENUMERABLE != 0
    }

    #[inline]
    pub const fn is_configurable(self) -> bool {
        self.0 & Self::CONFIGURABLE != 0
    }

    pub fn set_writable(&mut self, value: bool) {
        self.set(Self::WRITABLE, value);
    }

    pub fn set_enumerable(&mut self, value: bool) {
        self.set(Self::ENUMERABLE, value);
    }

    pub fn set_configurable(&mut self, value: bool) {
        self.set(Self::CONFIGURABLE, value);
    }

    fn set(&mut self, bit: u8, value: bool) {
        if value {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}

impl Default for PropertyAttributes {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Debug for PropertyAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(self.is_writable(), 'w'),
            flag(self.is_enumerable(), 'e'),
            flag(self.is_configurable(), 'c')
        )
    }
}
