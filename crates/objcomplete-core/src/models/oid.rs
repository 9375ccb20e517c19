use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CompleteError, Result};

/// Base-62 digit alphabet, in value order.
pub const B62_DIGITS: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const BASE: u64 = 62;
pub const NB_DIGITS_HI: usize = 11;
pub const NB_DIGITS_LO: usize = 7;
/// Length of the textual form: leading underscore plus both digit groups.
pub const NB_CHARS: usize = 1 + NB_DIGITS_HI + NB_DIGITS_LO;

pub const MIN_HI: u64 = 62 * 62 * 62;
pub const MAX_HI: u64 = 10 * 62 * (62 * 62 * 62) * (62 * 62 * 62) * (62 * 62 * 62);
pub const MIN_LO: u64 = 62 * 62;
pub const MAX_LO: u64 = 62 * (62 * 62 * 62) * (62 * 62 * 62);

/// Value of a single base-62 digit, if `c` is one.
pub fn b62_value(c: char) -> Option<u64> {
    match c {
        '0'..='9' => Some(c as u64 - '0' as u64),
        'a'..='z' => Some(c as u64 - 'a' as u64 + 10),
        'A'..='Z' => Some(c as u64 - 'A' as u64 + 36),
        _ => None,
    }
}

/// A persistent object identifier, e.g. `_0abcdefghijABCDEFG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    hi: u64,
    lo: u64,
}

impl ObjectId {
    /// Build from the two numeric halves, checking their ranges.
    pub fn from_parts(hi: u64, lo: u64) -> Option<Self> {
        if (MIN_HI..MAX_HI).contains(&hi) && (MIN_LO..MAX_LO).contains(&lo) {
            Some(Self { hi, lo })
        } else {
            None
        }
    }

    pub fn hi(&self) -> u64 {
        self.hi
    }

    pub fn lo(&self) -> u64 {
        self.lo
    }

    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || CompleteError::InvalidOid(input.to_string());

        let chars: Vec<char> = input.trim().chars().collect();
        if chars.len() != NB_CHARS || chars[0] != '_' || !chars[1].is_ascii_digit() {
            return Err(invalid());
        }

        let hi = decode_digits(&chars[1..=NB_DIGITS_HI]).ok_or_else(invalid)?;
        let lo = decode_digits(&chars[NB_DIGITS_HI + 1..]).ok_or_else(invalid)?;

        Self::from_parts(hi, lo).ok_or_else(invalid)
    }
}

fn decode_digits(digits: &[char]) -> Option<u64> {
    digits.iter().try_fold(0u64, |acc, &c| {
        acc.checked_mul(BASE)?.checked_add(b62_value(c)?)
    })
}

fn encode_digits(mut n: u64, width: usize, out: &mut String) {
    let mut buf = vec![b'0'; width];
    for slot in buf.iter_mut().rev() {
        *slot = B62_DIGITS[(n % BASE) as usize];
        n /= BASE;
    }
    out.extend(buf.into_iter().map(char::from));
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = String::with_capacity(NB_CHARS);
        s.push('_');
        encode_digits(self.hi, NB_DIGITS_HI, &mut s);
        encode_digits(self.lo, NB_DIGITS_LO, &mut s);
        f.write_str(&s)
    }
}

impl FromStr for ObjectId {
    type Err = CompleteError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_canonical_oid() {
        let id = ObjectId::parse("_0abcdefghijABCDEFG").unwrap();
        assert_eq!(id.to_string(), "_0abcdefghijABCDEFG");
        assert!(id.hi() >= MIN_HI && id.hi() < MAX_HI);
        assert!(id.lo() >= MIN_LO && id.lo() < MAX_LO);
    }

    #[test]
    fn parse_trims_whitespace() {
        let id: ObjectId = " _1Io89yIORqn02SFOKz \n".parse().unwrap();
        assert_eq!(id.to_string(), "_1Io89yIORqn02SFOKz");
    }

    #[test]
    fn rejects_malformed_oids() {
        assert!(ObjectId::parse("").is_err());
        assert!(ObjectId::parse("0abcdefghijABCDEFG").is_err());
        assert!(ObjectId::parse("_aabcdefghijABCDEFG").is_err());
        assert!(ObjectId::parse("_0abcdefghijABCDEF").is_err());
        assert!(ObjectId::parse("_0abcdefghij-BCDEFG").is_err());
        // hi below its minimum
        assert!(ObjectId::parse("_00000000000ABCDEFG").is_err());
        // lo below its minimum
        assert!(ObjectId::parse("_0abcdefghij000000z").is_err());
    }

    #[test]
    fn from_parts_zero_pads_display() {
        let id = ObjectId::from_parts(MIN_HI, MIN_LO).unwrap();
        assert_eq!(id.to_string(), "_000000010000000100");
        assert_eq!(ObjectId::parse(&id.to_string()).unwrap(), id);
        assert!(ObjectId::from_parts(MAX_HI, MIN_LO).is_none());
    }

    #[test]
    fn serde_uses_text_form() {
        let id = ObjectId::parse("_0abcdefghijABCDEFG").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"_0abcdefghijABCDEFG\"");
        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<ObjectId>("\"42\"").is_err());
    }
}
