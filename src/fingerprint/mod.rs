//! Hashed structural fingerprints and similarity scoring.

use crate::molecule::Molecule;
use nom::{
    character::complete::{char, u32 as decimal},
    combinator::all_consuming,
    multi::separated_list0,
    IResult,
};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use thiserror::Error;

mod circular;
pub use circular::*;

mod similarity;
pub use similarity::*;

/// Number of bit positions a fingerprint can use.
pub const FINGERPRINT_WIDTH: u32 = 2048;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("Malformed fingerprint text: {0:?}")]
    Malformed(String),
    #[error("Fingerprint bit {0} is outside [0, 2048)")]
    OutOfRange(u32),
}

/// A set of feature bits in `[0, FINGERPRINT_WIDTH)`.
///
/// Equality is set equality. The text form is the ascending bits joined by `,`; the empty
/// set is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Fingerprint(BTreeSet<u32>);

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bits(bits: impl IntoIterator<Item = u32>) -> Result<Self, FingerprintError> {
        let mut fingerprint = Self::new();
        for bit in bits {
            if bit >= FINGERPRINT_WIDTH {
                return Err(FingerprintError::OutOfRange(bit));
            }
            fingerprint.0.insert(bit);
        }
        Ok(fingerprint)
    }

    /// Set the bit a hash folds onto.
    pub(crate) fn set_hashed(&mut self, hash: u64) {
        self.0.insert((hash % FINGERPRINT_WIDTH as u64) as u32);
    }

    pub fn bit_count(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, bit: u32) -> bool {
        self.0.contains(&bit)
    }

    /// Bits in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn intersection_count(&self, other: &Fingerprint) -> usize {
        // walk the smaller set
        let (small, large) = if self.0.len() <= other.0.len() {
            (&self.0, &other.0)
        } else {
            (&other.0, &self.0)
        };
        small.iter().filter(|bit| large.contains(bit)).count()
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, bit) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{bit}")?;
        }
        Ok(())
    }
}

fn bit_list(input: &str) -> IResult<&str, Vec<u32>> {
    all_consuming(separated_list0(char(','), decimal))(input)
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (_, bits) = bit_list(s).map_err(|_| FingerprintError::Malformed(s.to_string()))?;
        Self::from_bits(bits)
    }
}

/// Anything that can be reduced to a fingerprint.
pub trait ToFingerprint {
    fn fingerprint(&self) -> Fingerprint;
}

impl ToFingerprint for str {
    fn fingerprint(&self) -> Fingerprint {
        fingerprint(self)
    }
}

impl ToFingerprint for String {
    fn fingerprint(&self) -> Fingerprint {
        fingerprint(self)
    }
}

/// Molecules are fingerprinted through their SMILES text.
impl ToFingerprint for Molecule {
    fn fingerprint(&self) -> Fingerprint {
        fingerprint(&self.to_smiles())
    }
}
