//! GUIDs carried by `__declspec(uuid("..."))`

use std::fmt;
use std::str::FromStr;

/// 128-bit GUID in the Microsoft field split.
///
/// Parsed from `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`, optionally wrapped in braces.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    #[must_use]
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    pub const NIL: Guid = Guid::new(0, 0, 0, [0; 8]);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuidParseError {
    #[error("expected 5 dash-separated groups, got {0}")]
    GroupCount(usize),

    #[error("group {index} must be {expected} hex digits, got '{group}'")]
    GroupLength {
        index: usize,
        expected: usize,
        group: String,
    },

    #[error("group {index} is not hexadecimal: '{group}'")]
    NotHex { index: usize, group: String },
}

const GROUP_LENGTHS: [usize; 5] = [8, 4, 4, 4, 12];

impl FromStr for Guid {
    type Err = GuidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s
            .strip_prefix('{')
            .and_then(|inner| inner.strip_suffix('}'))
            .unwrap_or(s);

        let groups: Vec<&str> = s.split('-').collect();
        if groups.len() != GROUP_LENGTHS.len() {
            return Err(GuidParseError::GroupCount(groups.len()));
        }

        let mut digits = [0u8; 32];
        let mut cursor = 0;
        for (index, (group, &expected)) in groups.iter().zip(&GROUP_LENGTHS).enumerate() {
            if group.len() != expected {
                return Err(GuidParseError::GroupLength {
                    index,
                    expected,
                    group: group.to_string(),
                });
            }
            for byte in group.bytes() {
                let Some(digit) = (byte as char).to_digit(16) else {
                    return Err(GuidParseError::NotHex {
                        index,
                        group: group.to_string(),
                    });
                };
                digits[cursor] = digit as u8;
                cursor += 1;
            }
        }

        let nibbles = |range: std::ops::Range<usize>| {
            digits[range]
                .iter()
                .fold(0u32, |acc, &digit| (acc << 4) | u32::from(digit))
        };

        let mut data4 = [0u8; 8];
        for (i, byte) in data4.iter_mut().enumerate() {
            let start = 16 + i * 2;
            *byte = nibbles(start..start + 2) as u8;
        }

        Ok(Guid::new(
            nibbles(0..8),
            nibbles(8..12) as u16,
            nibbles(12..16) as u16,
            data4,
        ))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}
