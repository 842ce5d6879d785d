use super::Fingerprint;
use crate::parse::percent_label;
use std::collections::{BTreeMap, HashSet};
use tracing::*;

/// Largest neighborhood radius hashed around each atom.
pub const MAX_RADIUS: usize = 2;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// 64-bit FNV-1a. Stable across builds and platforms, so stored fingerprints stay valid.
pub fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
    })
}

#[derive(Debug, Clone, Copy)]
enum Pattern {
    Contains(&'static str),
    StartsWith(&'static str),
    EndsWith(&'static str),
}

impl Pattern {
    fn matches(self, smiles: &str) -> bool {
        match self {
            Pattern::Contains(p) => smiles.contains(p),
            Pattern::StartsWith(p) => smiles.starts_with(p),
            Pattern::EndsWith(p) => smiles.ends_with(p),
        }
    }
}

use Pattern::*;

/// Functional groups recognized directly in SMILES text. A group matches when any of its
/// patterns does.
const FUNCTIONAL_GROUPS: &[(&str, &[Pattern])] = &[
    ("hydroxyl", &[Contains("[OH]"), Contains("(O)"), EndsWith("CO"), StartsWith("OC")]),
    ("carbonyl", &[Contains("C=O"), Contains("=O")]),
    ("carboxyl", &[Contains("C(=O)O"), Contains("C(O)=O")]),
    ("amine", &[Contains("CN"), StartsWith("N"), Contains("[NH")]),
    ("amide", &[Contains("C(=O)N"), Contains("NC(=O)")]),
    ("ether", &[Contains("COC"), Contains("cOC"), Contains("cOc")]),
    ("ester", &[Contains("C(=O)OC"), Contains("OC(=O)")]),
    ("nitro", &[Contains("[N+](=O)[O-]"), Contains("N(=O)=O")]),
    ("cyano", &[Contains("C#N")]),
    ("halogen", &[Contains("F"), Contains("Cl"), Contains("Br"), Contains("I")]),
    ("aromatic ring", &[Contains("c1"), Contains("c2")]),
    ("sulfide", &[Contains("CSC"), Contains("cSc"), Contains("SC")]),
    ("phosphate", &[Contains("P(=O)"), Contains("OP(")]),
];

/// Names of the functional groups the text matches, in table order.
pub fn functional_groups(smiles: &str) -> Vec<&'static str> {
    FUNCTIONAL_GROUPS
        .iter()
        .filter(|(_, patterns)| patterns.iter().any(|p| p.matches(smiles)))
        .map(|(name, _)| *name)
        .collect()
}

/// Atoms and adjacency read straight from SMILES text, without building a molecule.
///
/// Bracket atoms keep only their element symbol (in the case written) and ring labels only
/// add adjacency. Anything unrecognized is skipped.
#[derive(Debug, Default)]
struct Skeleton {
    symbols: Vec<String>,
    /// (neighbor, bond order) per atom
    adjacency: Vec<Vec<(usize, u32)>>,
}

impl Skeleton {
    fn read(smiles: &str) -> Self {
        let mut skeleton = Self::default();
        let chars: Vec<char> = smiles.chars().collect();
        let mut current: Option<usize> = None;
        let mut branches = Vec::new();
        let mut rings: BTreeMap<u32, usize> = BTreeMap::new();
        let mut order = 1;

        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            match c {
                '(' => branches.extend(current),
                ')' => current = branches.pop().or(current),
                '=' => order = 2,
                '#' => order = 3,
                '.' => {
                    current = None;
                    order = 1;
                }
                '0'..='9' | '%' => {
                    let label = if c == '%' {
                        // a malformed label leaves the following characters to be read as usual
                        percent_label(&chars[i + 1..]).map(|(label, width)| {
                            i += width;
                            label
                        })
                    } else {
                        c.to_digit(10)
                    };
                    if let (Some(label), Some(atom)) = (label, current) {
                        match rings.remove(&label) {
                            Some(opening) if opening != atom => {
                                skeleton.connect(opening, atom, order)
                            }
                            Some(_) => {}
                            None => {
                                rings.insert(label, atom);
                            }
                        }
                    }
                    order = 1;
                }
                '[' => {
                    let end = chars[i..].iter().position(|&x| x == ']').map(|p| i + p);
                    let content: String = match end {
                        Some(end) => chars[i + 1..end].iter().collect(),
                        None => chars[i + 1..].iter().collect(),
                    };
                    let symbol: String = content
                        .chars()
                        .skip_while(|c| c.is_ascii_digit())
                        .enumerate()
                        .take_while(|(n, c)| {
                            c.is_ascii_alphabetic() && (*n == 0 || c.is_ascii_lowercase())
                        })
                        .map(|(_, c)| c)
                        .collect();
                    if !symbol.is_empty() {
                        current = Some(skeleton.add(symbol, current, order));
                        order = 1;
                    }
                    i = end.unwrap_or(chars.len());
                }
                c if c.is_ascii_alphabetic() => {
                    let two_letter = matches!(
                        (c, chars.get(i + 1)),
                        ('C', Some('l')) | ('B', Some('r'))
                    );
                    let symbol: String = if two_letter {
                        i += 1;
                        chars[i - 1..=i].iter().collect()
                    } else {
                        c.to_string()
                    };
                    current = Some(skeleton.add(symbol, current, order));
                    order = 1;
                }
                _ => {}
            }
            i += 1;
        }
        skeleton
    }

    fn add(&mut self, symbol: String, previous: Option<usize>, order: u32) -> usize {
        let atom = self.symbols.len();
        self.symbols.push(symbol);
        self.adjacency.push(Vec::new());
        if let Some(previous) = previous {
            self.connect(previous, atom, order);
        }
        atom
    }

    fn connect(&mut self, a: usize, b: usize, order: u32) {
        self.adjacency[a].push((b, order));
        self.adjacency[b].push((a, order));
    }

    /// Feature strings for one atom, from radius 0 outwards.
    fn circular_features(&self, atom: usize) -> Vec<String> {
        let mut feature = self.symbols[atom].clone();
        let mut features = vec![feature.clone()];
        let mut visited = HashSet::from([atom]);
        let mut frontier = vec![atom];

        for _ in 0..MAX_RADIUS {
            let mut tokens = Vec::new();
            let mut next = Vec::new();
            for &member in &frontier {
                for &(neighbor, order) in &self.adjacency[member] {
                    if visited.insert(neighbor) {
                        tokens.push(format!("{}{order}", self.symbols[neighbor]));
                        next.push(neighbor);
                    }
                }
            }
            if tokens.is_empty() {
                break;
            }
            tokens.sort();
            feature = format!("{feature}:{}", tokens.join(","));
            features.push(feature.clone());
            frontier = next;
        }
        features
    }
}

/// Fingerprint SMILES text: circular atom neighborhoods up to [`MAX_RADIUS`], plus one bit
/// per recognized functional group.
///
/// The same text always gives the same fingerprint.
pub fn fingerprint(smiles: &str) -> Fingerprint {
    let smiles = smiles.trim();
    let skeleton = Skeleton::read(smiles);
    let mut fingerprint = Fingerprint::new();
    for atom in 0..skeleton.symbols.len() {
        for feature in skeleton.circular_features(atom) {
            fingerprint.set_hashed(fnv1a(&feature));
        }
    }
    for group in functional_groups(smiles) {
        fingerprint.set_hashed(fnv1a(&format!("FG:{group}")));
    }
    trace!(
        "Fingerprinted {smiles:?}: {} atoms, {} bits",
        skeleton.symbols.len(),
        fingerprint.bit_count()
    );
    fingerprint
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a(""), 0xcbf29ce484222325);
        assert_eq!(fnv1a("a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_skeleton() {
        let skeleton = Skeleton::read("C1CC1[NH3+]");
        assert_eq!(skeleton.symbols, vec!["C", "C", "C", "N"]);
        assert_eq!(skeleton.adjacency[0].len(), 2);
        assert_eq!(skeleton.adjacency[2].len(), 3);

        let skeleton = Skeleton::read("ClC(Br)=O");
        assert_eq!(skeleton.symbols, vec!["Cl", "C", "Br", "O"]);
        assert_eq!(skeleton.adjacency[1], vec![(0, 1), (2, 1), (3, 2)]);
    }

    #[test]
    fn test_skeleton_percent_labels() {
        let skeleton = Skeleton::read("C%12CCC%12");
        assert_eq!(skeleton.symbols.len(), 4);
        assert_eq!(skeleton.adjacency[0].len(), 2);

        let skeleton = Skeleton::read("C%(123)CCC%(123)");
        assert_eq!(skeleton.symbols.len(), 4);
        assert_eq!(skeleton.adjacency[3].len(), 2);

        // a one-digit `%` label does not swallow the next atom
        let skeleton = Skeleton::read("C%1C");
        assert_eq!(skeleton.symbols, vec!["C", "C"]);
        assert_eq!(skeleton.adjacency[0], vec![(1, 1)]);
    }

    #[test]
    fn test_circular_features() {
        let skeleton = Skeleton::read("CC=O");
        assert_eq!(skeleton.circular_features(0), vec!["C", "C:C1", "C:C1:O2"]);
        assert_eq!(skeleton.circular_features(1), vec!["C", "C:C1,O2"]);
    }

    #[test]
    fn test_functional_groups() {
        assert_eq!(functional_groups("CC(=O)O"), vec!["carbonyl", "carboxyl"]);
        assert_eq!(functional_groups("CCO"), vec!["hydroxyl"]);
        assert!(functional_groups("CC#N").contains(&"cyano"));
        assert!(functional_groups("c1ccccc1Cl").contains(&"halogen"));
        assert!(functional_groups("c1ccccc1Cl").contains(&"aromatic ring"));
        assert!(functional_groups("CCCC").is_empty());
    }

    #[test]
    fn test_deterministic_and_in_range() {
        let a = fingerprint("CC(=O)Oc1ccccc1C(=O)O");
        let b = fingerprint("CC(=O)Oc1ccccc1C(=O)O");
        assert_eq!(a, b);
        assert!(!a.is_empty());
        assert!(a.iter().all(|bit| bit < crate::fingerprint::FINGERPRINT_WIDTH));
    }

    #[test]
    fn test_empty_text() {
        assert!(fingerprint("").is_empty());
        assert!(fingerprint("   ").is_empty());
    }

    #[test]
    fn test_different_structures_differ() {
        assert_ne!(fingerprint("CCO"), fingerprint("CCN"));
        assert_ne!(fingerprint("C1CCCCC1"), fingerprint("c1ccccc1"));
    }
}
