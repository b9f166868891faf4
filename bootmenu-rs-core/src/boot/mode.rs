// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`BootMode`], the fixed set of targets that the device can start.
//!
//! The ordinal position of each mode is significant. It is both the index stored as the default mode, and the index
//! that a menu returns when a mode is selected.

use core::fmt;

use crate::boot::store::WriteError;

/// The amount of boot modes there are.
pub const MODES_COUNT: usize = 5;

/// The canonical names of each mode, in ordinal order.
const MODE_NAMES: [&str; MODES_COUNT] = [
    "bootmenu",
    "2nd-boot",
    "2nd-boot-uart",
    "2nd-system",
    "recovery",
];

/// A boot target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BootMode {
    /// Stay in the boot menu.
    #[default]
    BootMenu,

    /// Boot the alternate kernel.
    SecondBoot,

    /// Boot the alternate kernel with a serial console.
    SecondBootUart,

    /// Boot the alternate system partition.
    SecondSystem,

    /// Boot the vendor recovery image.
    Recovery,
}

impl BootMode {
    /// Every mode, in ordinal order.
    pub const ALL: [Self; MODES_COUNT] = [
        Self::BootMenu,
        Self::SecondBoot,
        Self::SecondBootUart,
        Self::SecondSystem,
        Self::Recovery,
    ];

    /// Decodes a canonical mode name.
    ///
    /// The match is exact and case sensitive. Anything unrecognized decodes to [`BootMode::BootMenu`], so that a
    /// corrupted record always leaves the device in the menu rather than failing.
    #[must_use = "Has no effect if the result is unused"]
    pub fn decode(name: &str) -> Self {
        MODE_NAMES
            .iter()
            .position(|&x| x == name)
            .and_then(Self::from_index)
            .unwrap_or_default()
    }

    /// Returns the canonical name of the mode.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn encode(self) -> &'static str {
        MODE_NAMES[self.index()]
    }

    /// Returns the canonical name for a raw ordinal. Out of range ordinals give the name of [`BootMode::BootMenu`].
    #[must_use = "Has no effect if the result is unused"]
    pub fn encode_index(index: usize) -> &'static str {
        Self::from_index(index).unwrap_or_default().encode()
    }

    /// Returns the ordinal of the mode.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the mode at an ordinal, if there is one.
    #[must_use = "Has no effect if the result is unused"]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl TryFrom<usize> for BootMode {
    type Error = WriteError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::from_index(index).ok_or(WriteError::BadMode(index))
    }
}

impl fmt::Display for BootMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encode())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_canonical_roundtrip() {
        for name in MODE_NAMES {
            assert_eq!(BootMode::decode(name).encode(), name);
        }
    }

    #[test]
    fn test_decode_is_case_sensitive() {
        assert_eq!(BootMode::decode("Recovery"), BootMode::BootMenu);
        assert_eq!(BootMode::decode("recovery"), BootMode::Recovery);
        assert_eq!(BootMode::decode(" recovery"), BootMode::BootMenu);
        assert_eq!(BootMode::decode(""), BootMode::BootMenu);
    }

    #[test]
    fn test_ordinals() {
        assert_eq!(BootMode::SecondSystem.index(), 3);
        assert_eq!(BootMode::from_index(4), Some(BootMode::Recovery));
        assert_eq!(BootMode::from_index(MODES_COUNT), None);
        assert_eq!(BootMode::encode_index(2), "2nd-boot-uart");
        assert_eq!(BootMode::encode_index(usize::MAX), "bootmenu");
        assert!(matches!(
            BootMode::try_from(9),
            Err(WriteError::BadMode(9))
        ));
    }

    proptest! {
        #[test]
        fn unknown_names_decode_to_menu(x in any::<String>()) {
            if !MODE_NAMES.contains(&x.as_str()) {
                prop_assert_eq!(BootMode::decode(&x), BootMode::BootMenu);
            }
        }

        #[test]
        fn encode_index_is_total(x in any::<usize>()) {
            prop_assert!(MODE_NAMES.contains(&BootMode::encode_index(x)));
        }
    }
}
