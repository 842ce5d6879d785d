use super::bracket::decode_bracket_atom;
use crate::element;
use crate::molecule::{Atom, AtomId, BondKind, Molecule, MoleculeError};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmilesError {
    #[error("Branch start '(' at position {0} without a current atom")]
    BranchNoCurrentAtom(usize),
    #[error("Branch end ')' at position {0} without a matching '('")]
    BranchEndNoStart(usize),
    #[error("Ring closure {0} at position {1} without a current atom")]
    RingClosureNoCurrentAtom(u32, usize),
    #[error("Ring closure {0} at position {1} would bond an atom to itself")]
    RingClosureSelfBond(u32, usize),
    #[error("Expected two digits or '(digits)' after '%' at position {0}")]
    MalformedRingLabel(usize),
    #[error("Unclosed bracket '[' at position {0}")]
    UnclosedBracket(usize),
    #[error("Cannot decode bracket atom '[{0}]' at position {1}")]
    InvalidBracketAtom(String, usize),
    #[error("Unknown element '{0}' at position {1}")]
    UnknownElement(String, usize),
    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),
    #[error("Ring closure label(s) {0:?} opened but never closed")]
    UnclosedRing(Vec<u32>),
    #[error("{0} branch(es) opened with '(' but never closed")]
    UnclosedBranch(usize),
    #[error(transparent)]
    Structure(#[from] MoleculeError),
}

/// How the parser treats malformed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Skip anything malformed and keep going.
    #[default]
    Lenient,
    /// Reject malformed input with a [`SmilesError`].
    Strict,
}

/// Parses a SMILES string into a Molecule.
///
/// Malformed input never fails: unmatched `)`, dangling ring labels, unclosed brackets and
/// unknown characters are skipped. Empty or whitespace-only text gives an empty molecule.
pub fn parse_smiles(smiles: &str) -> Molecule {
    match SmilesParser::new(smiles, ParseMode::Lenient).parse() {
        Ok(molecule) => molecule,
        Err(e) => {
            // Lenient parsing only fails on internal inconsistencies.
            warn!("Lenient parse of {smiles:?} failed: {e}");
            Molecule::new()
        }
    }
}

/// Parses a SMILES string, rejecting anything malformed.
pub fn parse_smiles_strict(smiles: &str) -> Result<Molecule, SmilesError> {
    SmilesParser::new(smiles, ParseMode::Strict).parse()
}

/// Parses with an explicit [`ParseMode`].
pub fn parse_smiles_with(smiles: &str, mode: ParseMode) -> Result<Molecule, SmilesError> {
    SmilesParser::new(smiles, mode).parse()
}

fn bond_kind(c: char) -> Option<BondKind> {
    match c {
        '-' => Some(BondKind::Single),
        '=' => Some(BondKind::Double),
        '#' => Some(BondKind::Triple),
        ':' => Some(BondKind::Aromatic),
        _ => None,
    }
}

/// The label after a `%`: two digits (`%12`) or any run of digits in parentheses (`%(123)`).
/// Returns the label and how many characters it spans.
pub(crate) fn percent_label(chars: &[char]) -> Option<(u32, usize)> {
    if chars.first() == Some(&'(') {
        let close = chars.iter().position(|&c| c == ')')?;
        let digits = &chars[1..close];
        if digits.is_empty() || !digits.iter().all(char::is_ascii_digit) {
            return None;
        }
        let label = digits.iter().collect::<String>().parse().ok()?;
        return Some((label, close + 1));
    }
    match chars.get(..2)? {
        [tens, ones] => Some((tens.to_digit(10)? * 10 + ones.to_digit(10)?, 2)),
        _ => None,
    }
}

struct SmilesParser {
    chars: Vec<char>,
    mode: ParseMode,
    molecule: Molecule,
    next_id: AtomId,
    current_atom: Option<AtomId>,
    /// Bond written since the last atom or ring closure. `None` means the default single bond.
    pending_bond: Option<BondKind>,
    branch_stack: Vec<AtomId>,
    /// Open ring labels, with any bond written at the opening occurrence.
    ring_map: BTreeMap<u32, (AtomId, Option<BondKind>)>,
}

impl SmilesParser {
    fn new(smiles: &str, mode: ParseMode) -> Self {
        Self {
            chars: smiles.trim().chars().collect(),
            mode,
            molecule: Molecule::new(),
            next_id: 0,
            current_atom: None,
            pending_bond: None,
            branch_stack: Vec::new(),
            ring_map: BTreeMap::new(),
        }
    }

    /// Fail in strict mode, log and carry on in lenient mode.
    fn recover(&self, error: SmilesError) -> Result<(), SmilesError> {
        match self.mode {
            ParseMode::Strict => Err(error),
            ParseMode::Lenient => {
                debug!("Ignoring malformed SMILES input: {error}");
                Ok(())
            }
        }
    }

    fn parse(mut self) -> Result<Molecule, SmilesError> {
        let mut i = 0;
        while i < self.chars.len() {
            let c = self.chars[i];
            match c {
                '(' => {
                    match self.current_atom {
                        Some(atom) => self.branch_stack.push(atom),
                        None => self.recover(SmilesError::BranchNoCurrentAtom(i))?,
                    }
                    i += 1;
                }
                ')' => {
                    match self.branch_stack.pop() {
                        Some(atom) => self.current_atom = Some(atom),
                        None => self.recover(SmilesError::BranchEndNoStart(i))?,
                    }
                    i += 1;
                }
                '-' | '=' | '#' | ':' => {
                    self.pending_bond = bond_kind(c);
                    i += 1;
                }
                // Directional bonds only carry cis/trans information.
                '/' | '\\' => i += 1,
                '.' => {
                    self.current_atom = None;
                    self.pending_bond = None;
                    i += 1;
                }
                '%' => match percent_label(&self.chars[i + 1..]) {
                    Some((label, width)) => {
                        self.ring_closure(label, i)?;
                        i += 1 + width;
                    }
                    None => {
                        self.recover(SmilesError::MalformedRingLabel(i))?;
                        i += 1;
                    }
                },
                '0'..='9' => {
                    let label = c.to_digit(10).unwrap_or_default();
                    self.ring_closure(label, i)?;
                    i += 1;
                }
                '[' => i = self.bracket_atom(i)?,
                c if c.is_ascii_alphabetic() => i = self.organic_atom(i)?,
                // Anything after whitespace is a title, not structure.
                c if c.is_whitespace() => break,
                _ => {
                    self.recover(SmilesError::UnexpectedCharacter(c, i))?;
                    i += 1;
                }
            }
        }
        self.finish()
    }

    fn finish(self) -> Result<Molecule, SmilesError> {
        if !self.ring_map.is_empty() {
            let labels: Vec<u32> = self.ring_map.keys().copied().collect();
            self.recover(SmilesError::UnclosedRing(labels))?;
        }
        if !self.branch_stack.is_empty() {
            self.recover(SmilesError::UnclosedBranch(self.branch_stack.len()))?;
        }
        trace!(
            "Parsed {} atoms and {} bonds",
            self.molecule.atom_count(),
            self.molecule.bond_count()
        );
        Ok(self.molecule)
    }

    /// Add an atom, bond it to the current atom with the pending bond, and make it current.
    fn place_atom(&mut self, atom: Atom) -> Result<(), SmilesError> {
        let bond = self.pending_bond.take().unwrap_or_default();
        let id = self.molecule.add_atom(atom)?;
        if let Some(prev_atom) = self.current_atom {
            self.molecule.add_bond(prev_atom, id, bond)?;
        }
        self.current_atom = Some(id);
        Ok(())
    }

    fn new_atom(&mut self, symbol: &str) -> Atom {
        let atom = Atom::new(self.next_id, symbol);
        self.next_id += 1;
        atom
    }

    fn ring_closure(&mut self, label: u32, position: usize) -> Result<(), SmilesError> {
        let Some(current) = self.current_atom else {
            return self.recover(SmilesError::RingClosureNoCurrentAtom(label, position));
        };

        match self.ring_map.remove(&label) {
            Some((opening, opening_bond)) => {
                let bond = self.pending_bond.take().or(opening_bond).unwrap_or_default();
                if opening == current {
                    return self.recover(SmilesError::RingClosureSelfBond(label, position));
                }
                self.molecule.add_bond(opening, current, bond)?;
            }
            None => {
                let bond = self.pending_bond.take();
                self.ring_map.insert(label, (current, bond));
            }
        }
        Ok(())
    }

    /// Parse `[...]` starting at `start`, returning the position after it.
    fn bracket_atom(&mut self, start: usize) -> Result<usize, SmilesError> {
        let Some(end_relative) = self.chars[start + 1..].iter().position(|&x| x == ']') else {
            self.recover(SmilesError::UnclosedBracket(start))?;
            return Ok(start + 1);
        };
        let end = start + 1 + end_relative;
        let content: String = self.chars[start + 1..end].iter().collect();

        let lenient = self.mode == ParseMode::Lenient;
        let decoded = decode_bracket_atom(&content)
            .filter(|(_, rest)| rest.is_empty() || lenient)
            .map(|(decoded, _)| decoded);
        let Some(decoded) = decoded else {
            self.recover(SmilesError::InvalidBracketAtom(content.clone(), start))?;
            return Ok(end + 1);
        };
        if !element::is_known_element(&decoded.symbol) {
            self.recover(SmilesError::UnknownElement(decoded.symbol.clone(), start))?;
        }

        let mut atom = self
            .new_atom(&decoded.symbol)
            .with_charge(decoded.charge)
            .with_hydrogens(decoded.hydrogens);
        if decoded.chirality.is_some() {
            atom = atom.with_chirality(decoded.chirality);
        }
        atom.aromatic = decoded.aromatic;
        self.place_atom(atom)?;
        Ok(end + 1)
    }

    /// Parse an unbracketed atom starting at `start`, returning the position after it.
    fn organic_atom(&mut self, start: usize) -> Result<usize, SmilesError> {
        let c = self.chars[start];
        let next = self.chars.get(start + 1).copied().filter(|n| n.is_ascii_lowercase());

        if c.is_ascii_uppercase() {
            // Take two letters when they name an element, unless the pair reads more naturally
            // as an organic atom followed by an aromatic one (`Sc`, `Co`, `Cn`, ...).
            let pair = next.map(|n| format!("{c}{n}"));
            let two_letter = match (&pair, next) {
                (Some(pair), Some(n)) => {
                    element::is_known_element(pair)
                        && !(element::is_organic_subset(&c.to_string())
                            && element::from_aromatic_spelling(&n.to_string()).is_some())
                }
                _ => false,
            };
            let (symbol, width) = match pair {
                Some(pair) if two_letter => (pair, 2),
                _ => (c.to_string(), 1),
            };

            if !element::is_known_element(&symbol) {
                self.recover(SmilesError::UnknownElement(symbol.clone(), start))?;
            }
            let atom = self.new_atom(&symbol);
            self.place_atom(atom)?;
            return Ok(start + width);
        }

        // Lowercase: an aromatic atom, possibly with a two-letter spelling like `se`.
        let candidates = [next.map(|n| format!("{c}{n}")), Some(c.to_string())];
        for spelling in candidates.into_iter().flatten() {
            if let Some(symbol) = element::from_aromatic_spelling(&spelling) {
                let atom = self.new_atom(&symbol).aromatic();
                self.place_atom(atom)?;
                return Ok(start + spelling.len());
            }
        }
        self.recover(SmilesError::UnknownElement(c.to_string(), start))?;
        Ok(start + 1)
    }
}
