use crate::element;
use crate::molecule::{Atom, AtomId, BondId, BondKind, Molecule};
use std::collections::{HashMap, HashSet};
use std::fmt::Write;

/// A bond left out of the spanning tree, written as a pair of ring labels.
#[derive(Debug, Clone)]
struct RingClosure {
    opening: AtomId, // written first; carries the bare label
    closing: AtomId, // written later; carries the bond symbol and the label
    bond: BondKind,
    label: usize,
}

/// Convert a molecule into SMILES text.
///
/// Traversal is a depth-first search from the first atom, visiting neighbors in bond-list
/// order. The output is not canonical: reordering atoms or bonds can change it.
/// Atoms unreachable from the first atom are written as extra `.`-separated fragments.
pub fn to_smiles(molecule: &Molecule) -> String {
    let mut writer = SmilesWriter::new(molecule);
    let mut result = String::new();
    for atom in molecule.atoms() {
        if writer.visited.contains(&atom.id) {
            continue;
        }
        if !result.is_empty() {
            result.push('.');
        }
        writer.span(atom.id);
        writer.write_atom(atom.id, &mut result);
    }
    result
}

struct SmilesWriter<'a> {
    molecule: &'a Molecule,
    visited: HashSet<AtomId>,
    /// bonds that are either spanning-tree edges or recorded ring closures
    used_bonds: HashSet<BondId>,
    children: HashMap<AtomId, Vec<(AtomId, BondKind)>>,
    ring_closures: Vec<RingClosure>,
    next_label: usize,
}

impl<'a> SmilesWriter<'a> {
    fn new(molecule: &'a Molecule) -> Self {
        Self {
            molecule,
            visited: HashSet::new(),
            used_bonds: HashSet::new(),
            children: HashMap::new(),
            ring_closures: Vec::new(),
            next_label: 0,
        }
    }

    /// First pass: compute a spanning tree (via DFS) and record every back edge as a
    /// ring closure. A back edge always leads to an ancestor, which is written earlier.
    fn span(&mut self, current: AtomId) {
        self.visited.insert(current);
        let neighbors: Vec<(AtomId, BondId, BondKind)> = self
            .molecule
            .neighbors(current)
            .map(|(nbr, bond)| (nbr, bond.id, bond.kind))
            .collect();

        for (nbr, bond_id, kind) in neighbors {
            if !self.used_bonds.insert(bond_id) {
                continue;
            }
            if self.visited.contains(&nbr) {
                self.ring_closures.push(RingClosure {
                    opening: nbr,
                    closing: current,
                    bond: kind,
                    label: 0,
                });
            } else {
                self.children.entry(current).or_default().push((nbr, kind));
                self.span(nbr);
            }
        }
    }

    /// Second pass: write the spanning tree, inserting ring-closure labels and wrapping
    /// every child except the last in parentheses.
    fn write_atom(&mut self, current: AtomId, result: &mut String) {
        if let Some(atom) = self.molecule.atom(current) {
            result.push_str(&atom_token(atom));
        }

        for closure in self.ring_closures.iter().filter(|rc| rc.closing == current) {
            result.push_str(closure.bond.symbol());
            result.push_str(&format_ring(closure.label));
        }
        for closure in self.ring_closures.iter_mut().filter(|rc| rc.opening == current) {
            self.next_label += 1;
            closure.label = self.next_label;
            result.push_str(&format_ring(closure.label));
        }

        let children = self.children.remove(&current).unwrap_or_default();
        if let Some(((last, last_bond), branches)) = children.split_last() {
            for (child, bond) in branches {
                result.push('(');
                result.push_str(bond.symbol());
                self.write_atom(*child, result);
                result.push(')');
            }
            result.push_str(last_bond.symbol());
            self.write_atom(*last, result);
        }
    }
}

/// The token for one atom: bare symbol in the organic subset, bracket form otherwise.
pub fn atom_token(atom: &Atom) -> String {
    let symbol = if atom.aromatic && element::is_aromatic_capable(&atom.symbol) {
        atom.symbol.to_lowercase()
    } else {
        atom.symbol.clone()
    };

    let needs_brackets = !element::is_organic_subset(&atom.symbol)
        || atom.formal_charge != 0
        || atom.is_chiral;
    if !needs_brackets {
        return symbol;
    }

    let mut token = format!("[{symbol}");
    match atom.chirality {
        Some('R') => token.push_str("@@"),
        Some('S') => token.push('@'),
        _ => {}
    }
    if atom.implicit_hydrogens > 0 {
        token.push('H');
        if atom.implicit_hydrogens > 1 {
            let _ = write!(token, "{}", atom.implicit_hydrogens);
        }
    }
    if atom.formal_charge != 0 {
        token.push(if atom.formal_charge > 0 { '+' } else { '-' });
        let magnitude = atom.formal_charge.unsigned_abs();
        if magnitude > 1 {
            let _ = write!(token, "{magnitude}");
        }
    }
    token.push(']');
    token
}

/// Ring labels above 9 take the two-digit `%nn` form, and labels above 99 the `%(nnn)` form.
fn format_ring(label: usize) -> String {
    match label {
        0..=9 => label.to_string(),
        10..=99 => format!("%{label}"),
        _ => format!("%({label})"),
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || "@+-=#():/\\%.[]".contains(c)
}

/// Purely syntactic check: allowed characters, balanced `()` and non-nested, balanced `[]`.
///
/// No chemistry is checked. Empty text is rejected.
pub fn is_valid_syntax(smiles: &str) -> bool {
    if smiles.is_empty() {
        return false;
    }
    let mut depth = 0usize;
    let mut in_bracket = false;
    for c in smiles.chars() {
        if !is_allowed(c) {
            return false;
        }
        match c {
            '[' if in_bracket => return false,
            '[' => in_bracket = true,
            ']' if !in_bracket => return false,
            ']' => in_bracket = false,
            '(' | ')' if in_bracket => return false,
            '(' => depth += 1,
            ')' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0 && !in_bracket
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::molecule::{Atom, BondKind};
    use crate::parse_smiles;

    fn bond_kinds(molecule: &Molecule) -> Vec<BondKind> {
        let mut kinds: Vec<BondKind> = molecule.bonds().iter().map(|b| b.kind).collect();
        kinds.sort();
        kinds
    }

    fn check_round_trip(smiles: &str) {
        let molecule = parse_smiles(smiles);
        let written = to_smiles(&molecule);
        let reparsed = parse_smiles(&written);
        assert_eq!(
            molecule.atom_count(),
            reparsed.atom_count(),
            "{smiles} -> {written}"
        );
        assert_eq!(bond_kinds(&molecule), bond_kinds(&reparsed), "{smiles} -> {written}");
        assert!(is_valid_syntax(&written), "{written}");
    }

    #[test]
    fn test_linear_chain_has_no_parentheses() {
        assert_eq!(to_smiles(&parse_smiles("CCO")), "CCO");
        assert_eq!(to_smiles(&parse_smiles("C=CC#N")), "C=CC#N");
    }

    #[test]
    fn test_branches() {
        assert_eq!(to_smiles(&parse_smiles("CC(C)C")), "CC(C)C");
        assert_eq!(to_smiles(&parse_smiles("CC(=O)O")), "CC(=O)O");
    }

    #[test]
    fn test_ring_closures() {
        assert_eq!(to_smiles(&parse_smiles("C1CCCCC1")), "C1CCCCC1");
        assert_eq!(to_smiles(&parse_smiles("C1=CCCCC1")), "C1=CCCCC1");
        // labels are never reused
        assert_eq!(to_smiles(&parse_smiles("C1CC1C1CC1")), "C1CC1C2CC2");
    }

    #[test]
    fn test_ring_bond_symbol_on_closing_atom() {
        let mut molecule = Molecule::new();
        for id in 0..4 {
            molecule.add_atom(Atom::new(id, "C")).unwrap();
        }
        molecule.add_bond(0, 1, BondKind::Single).unwrap();
        molecule.add_bond(1, 2, BondKind::Single).unwrap();
        molecule.add_bond(2, 3, BondKind::Single).unwrap();
        molecule.add_bond(3, 0, BondKind::Double).unwrap();
        assert_eq!(to_smiles(&molecule), "C1CCC=1");
    }

    #[test]
    fn test_bracket_tokens() {
        assert_eq!(atom_token(&Atom::new(0, "N").with_charge(1).with_hydrogens(4)), "[NH4+]");
        assert_eq!(atom_token(&Atom::new(0, "O").with_charge(-1)), "[O-]");
        assert_eq!(atom_token(&Atom::new(0, "Fe").with_charge(3)), "[Fe+3]");
        assert_eq!(atom_token(&Atom::new(0, "Na")), "[Na]");
        assert_eq!(
            atom_token(&Atom::new(0, "C").with_hydrogens(1).with_chirality(Some('R'))),
            "[C@@H]"
        );
        assert_eq!(
            atom_token(&Atom::new(0, "C").with_chirality(Some('S'))),
            "[C@]"
        );
        // hydrogens only show up in bracket form
        assert_eq!(atom_token(&Atom::new(0, "C").with_hydrogens(4)), "C");
        assert_eq!(atom_token(&Atom::new(0, "C").aromatic()), "c");
    }

    #[test]
    fn test_empty_molecule() {
        assert_eq!(to_smiles(&Molecule::new()), "");
    }

    #[test]
    fn test_disconnected_fragments() {
        assert_eq!(to_smiles(&parse_smiles("[Na+].[Cl-]")), "[Na+].[Cl-]");
    }

    #[test]
    fn test_round_trips() {
        for smiles in [
            "CCO",
            "C1CCCCC1",
            "c1ccccc1",
            "CC(=O)Oc1ccccc1C(=O)O",
            "C1CNCCN1c(c2)c(F)cc3c2N(C4CC4)C=C(C3=O)C(=O)O",
            "N[C@@H](Cc1ccccc1)C(=O)O",
            "C12C3C4C1C5C2C3C45",
            "[NH4+].[O-]C(=O)C",
            "C#CC=CC(Cl)(Br)I",
        ] {
            check_round_trip(smiles);
        }
    }

    #[test]
    fn test_many_ring_labels() {
        let smiles = "C1CC1".repeat(100);
        let molecule = parse_smiles(&smiles);
        assert_eq!(molecule.bond_count(), 399);

        let written = to_smiles(&molecule);
        assert!(written.contains("%99"), "{written}");
        assert!(written.contains("%(100)"), "{written}");
        let reparsed = parse_smiles(&written);
        assert_eq!(reparsed.atom_count(), 300);
        assert_eq!(reparsed.bond_count(), molecule.bond_count());
        assert!(is_valid_syntax(&written));
    }

    #[test]
    fn test_syntax_check() {
        assert!(is_valid_syntax("CCO"));
        assert!(is_valid_syntax("C1CC(=O)[NH3+]CC1"));
        assert!(is_valid_syntax("F/C=C\\F"));
        assert!(is_valid_syntax("C%(100)CC%(100)"));
        assert!(!is_valid_syntax(""));
        assert!(!is_valid_syntax("CC(C"));
        assert!(!is_valid_syntax("CC)C("));
        assert!(!is_valid_syntax("C[NH4"));
        assert!(!is_valid_syntax("C[[N]]"));
        assert!(!is_valid_syntax("CC O"));
        assert!(!is_valid_syntax("C*C"));
    }
}
