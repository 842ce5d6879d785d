//! Static per-element lookup tables.

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

lazy_static! {
    /// Atomic numbers for the elements the parser knows by name.
    static ref ATOMIC_NUMBERS: HashMap<&'static str, u8> = [
        ("H", 1), ("He", 2), ("Li", 3), ("Be", 4), ("B", 5), ("C", 6), ("N", 7), ("O", 8),
        ("F", 9), ("Ne", 10), ("Na", 11), ("Mg", 12), ("Al", 13), ("Si", 14), ("P", 15),
        ("S", 16), ("Cl", 17), ("Ar", 18), ("K", 19), ("Ca", 20), ("Mn", 25), ("Fe", 26),
        ("Co", 27), ("Ni", 28), ("Cu", 29), ("Zn", 30), ("As", 33), ("Se", 34), ("Br", 35),
        ("Kr", 36), ("Ag", 47), ("Sn", 50), ("I", 53), ("Xe", 54), ("Pt", 78), ("Au", 79),
        ("Hg", 80), ("Pb", 82),
    ]
    .into_iter()
    .collect();

    /// Inclusive formal charge ranges considered chemically reasonable.
    static ref CHARGE_RANGES: HashMap<&'static str, (i32, i32)> = [
        ("H", (-1, 1)),
        ("C", (-1, 1)),
        ("N", (-1, 1)),
        ("O", (-1, 0)),
        ("F", (-1, 0)),
        ("Cl", (-1, 0)),
        ("Br", (-1, 0)),
        ("I", (-1, 0)),
    ]
    .into_iter()
    .collect();

    /// Symbols that may be written without brackets.
    static ref ORGANIC_SUBSET: HashSet<&'static str> =
        ["B", "C", "N", "O", "P", "S", "F", "Cl", "Br", "I"].into_iter().collect();

    /// Symbols that have a lowercase aromatic spelling.
    static ref AROMATIC_CAPABLE: HashSet<&'static str> =
        ["B", "C", "N", "O", "P", "S", "As", "Se"].into_iter().collect();
}

const DEFAULT_CHARGE_RANGE: (i32, i32) = (-2, 2);

/// Atomic number for a symbol, 0 when the symbol is not listed.
pub fn atomic_number(symbol: &str) -> u8 {
    ATOMIC_NUMBERS.get(symbol).copied().unwrap_or(0)
}

/// Whether the symbol names a listed element.
pub fn is_known_element(symbol: &str) -> bool {
    ATOMIC_NUMBERS.contains_key(symbol)
}

/// Maximum valence by symbol (H=1, C=4, N=3, O=2, S=6, P=5, halogens=1, default=4).
pub fn max_valence(symbol: &str) -> u32 {
    match symbol {
        "H" => 1,
        "C" => 4,
        "N" => 3,
        "O" => 2,
        "S" => 6,
        "P" => 5,
        "F" | "Cl" | "Br" | "I" => 1,
        _ => 4,
    }
}

/// Expected (normal) valences for a neutral atom of this element.
///
/// Unlisted elements fall back to their maximum valence.
pub fn expected_valences(symbol: &str) -> Vec<u32> {
    let valences: &[u32] = match symbol {
        "H" => &[1],
        "B" => &[3],
        "C" => &[4],
        "N" => &[3, 5],
        "O" => &[2],
        "Si" => &[4],
        "P" => &[3, 5],
        "S" => &[2, 4, 6],
        "F" | "Cl" | "Br" | "I" => &[1],
        _ => return vec![max_valence(symbol)],
    };
    valences.to_vec()
}

/// Inclusive acceptable formal charge range for an element.
pub fn charge_range(symbol: &str) -> (i32, i32) {
    CHARGE_RANGES
        .get(symbol)
        .copied()
        .unwrap_or(DEFAULT_CHARGE_RANGE)
}

pub fn is_halogen(symbol: &str) -> bool {
    matches!(symbol, "F" | "Cl" | "Br" | "I")
}

/// Whether the symbol can be written bare (outside brackets).
pub fn is_organic_subset(symbol: &str) -> bool {
    ORGANIC_SUBSET.contains(symbol)
}

pub fn is_aromatic_capable(symbol: &str) -> bool {
    AROMATIC_CAPABLE.contains(symbol)
}

/// Map a lowercase aromatic SMILES spelling (`c`, `n`, `se`, ...) to its element symbol.
pub fn from_aromatic_spelling(spelling: &str) -> Option<String> {
    let mut chars = spelling.chars();
    let first = chars.next()?;
    if !first.is_ascii_lowercase() {
        return None;
    }
    let symbol: String = first.to_ascii_uppercase().to_string() + chars.as_str();
    if is_aromatic_capable(&symbol) {
        Some(symbol)
    } else {
        None
    }
}
