use super::{FailureReason, ValidationError, ValidationHandler, ValidationResult};
use crate::molecule::{AtomId, BondKind, BondStereo, Molecule};
use std::collections::HashSet;
use tracing::*;

/// How far substituent signatures look past the first substituent atom.
const SIGNATURE_DEPTH: usize = 2;

const STEREO_ELEMENTS: [&str; 4] = ["C", "N", "S", "P"];

/// Hydrogens listed per atom in signatures. A stereocenter has at most four connections, so
/// larger counts never change a comparison.
const LISTED_HYDROGENS: u32 = 4;

fn hydrogen_tokens(count: u32) -> impl Iterator<Item = String> {
    (0..count.min(LISTED_HYDROGENS)).map(|_| "H".to_string())
}

/// Checks declared chiral centers, and points out stereo information that looks missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct StereochemistryHandler;

/// Describe the substituent rooted at `atom`, reached from `from`.
///
/// The signature is the element symbol followed by the sorted signatures of the atom's own
/// substituents (implicit hydrogens included), down to `depth` more levels.
pub fn substituent_signature(
    molecule: &Molecule,
    atom: AtomId,
    from: AtomId,
    depth: usize,
) -> String {
    let Some(current) = molecule.atom(atom) else {
        return String::new();
    };
    if depth == 0 {
        return current.symbol.clone();
    }

    let mut branches: Vec<String> = molecule
        .neighbors(atom)
        .filter(|&(neighbor, _)| neighbor != from)
        .map(|(neighbor, bond)| {
            format!(
                "{}{}",
                bond.kind.symbol(),
                substituent_signature(molecule, neighbor, atom, depth - 1)
            )
        })
        .collect();
    branches.extend(hydrogen_tokens(current.implicit_hydrogens));
    if branches.is_empty() {
        return current.symbol.clone();
    }
    branches.sort();
    format!("{}({})", current.symbol, branches.join(","))
}

/// Whether the atom could be a tetrahedral stereocenter: C, N, S or P with four single
/// connections (implicit hydrogens included) leading to four different substituents.
pub fn is_potential_chiral_center(molecule: &Molecule, atom: AtomId) -> bool {
    let Some(center) = molecule.atom(atom) else {
        return false;
    };
    if !STEREO_ELEMENTS.contains(&center.symbol.as_str()) {
        return false;
    }
    if molecule.degree(atom) + center.implicit_hydrogens as usize != 4 {
        return false;
    }
    if molecule
        .bonds_of(atom)
        .any(|b| matches!(b.kind, BondKind::Double | BondKind::Triple))
    {
        return false;
    }

    let mut signatures: Vec<String> = molecule
        .neighbors(atom)
        .map(|(neighbor, _)| substituent_signature(molecule, neighbor, atom, SIGNATURE_DEPTH))
        .collect();
    signatures.extend(hydrogen_tokens(center.implicit_hydrogens));
    let distinct: HashSet<&String> = signatures.iter().collect();
    distinct.len() == 4
}

impl StereochemistryHandler {
    fn check_centers(&self, molecule: &Molecule, result: &mut ValidationResult) {
        for atom in molecule.atoms() {
            let potential = is_potential_chiral_center(molecule, atom.id);
            if atom.is_chiral {
                if !potential {
                    result.add_error(
                        ValidationError::new(
                            FailureReason::InvalidStereochemistry,
                            format!("{} is marked chiral but cannot be a stereocenter", atom.symbol),
                        )
                        .at_atom(atom.id),
                    );
                }
                if let Some(label) = atom.chirality.filter(|l| !matches!(*l, 'R' | 'S')) {
                    result.add_error(
                        ValidationError::new(
                            FailureReason::InvalidStereochemistry,
                            format!("unknown configuration label '{label}'"),
                        )
                        .at_atom(atom.id),
                    );
                }
            } else if potential {
                trace!("Atom {} looks like an unmarked stereocenter", atom.id);
                result.add_warning(
                    format!("{} is a potential chiral center without a configuration", atom.symbol),
                    Some(atom.id),
                );
            }
        }
    }

    /// Neighbor symbols of one double-bond end, excluding the partner, plus its hydrogens.
    fn end_substituents(molecule: &Molecule, end: AtomId, partner: AtomId) -> Vec<String> {
        let mut symbols: Vec<String> = molecule
            .neighbors(end)
            .filter(|&(neighbor, _)| neighbor != partner)
            .filter_map(|(neighbor, _)| molecule.atom(neighbor).map(|a| a.symbol.clone()))
            .collect();
        let hydrogens = molecule.atom(end).map_or(0, |a| a.implicit_hydrogens);
        symbols.extend(hydrogen_tokens(hydrogens));
        symbols
    }

    fn check_double_bonds(&self, molecule: &Molecule, result: &mut ValidationResult) {
        let all_distinct = |symbols: &[String]| {
            symbols.iter().collect::<HashSet<_>>().len() == symbols.len()
        };

        for bond in molecule.bonds().iter().filter(|b| b.kind == BondKind::Double) {
            let first = Self::end_substituents(molecule, bond.begin, bond.end);
            let second = Self::end_substituents(molecule, bond.end, bond.begin);
            if first.len() < 2 || second.len() < 2 {
                continue;
            }
            if all_distinct(first.as_slice()) || all_distinct(second.as_slice()) {
                result.add_warning(
                    format!(
                        "double bond between atoms {} and {} may have E/Z isomers",
                        bond.begin, bond.end
                    ),
                    Some(bond.begin),
                );
            }
        }
    }

    fn check_wedges(&self, molecule: &Molecule, result: &mut ValidationResult) {
        let declared = |id: AtomId| molecule.atom(id).is_some_and(|a| a.is_chiral);
        for bond in molecule.bonds() {
            if !matches!(bond.stereo, BondStereo::Up | BondStereo::Down) {
                continue;
            }
            if !declared(bond.begin) && !declared(bond.end) {
                result.add_warning(
                    format!("stereo bond {} touches no declared chiral center", bond.id),
                    Some(bond.begin),
                );
            }
        }
    }
}

impl ValidationHandler for StereochemistryHandler {
    fn name(&self) -> &'static str {
        "stereochemistry"
    }

    fn check(
        &self,
        molecule: &Molecule,
        result: &mut ValidationResult,
    ) -> Result<(), ValidationError> {
        self.check_centers(molecule, result);
        self.check_double_bonds(molecule, result);
        self.check_wedges(molecule, result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::molecule::{Atom, Bond};
    use crate::parse_smiles;

    fn run(molecule: &Molecule) -> ValidationResult {
        let mut result = ValidationResult::new();
        StereochemistryHandler.check(molecule, &mut result).unwrap();
        result
    }

    #[test]
    fn test_signatures() {
        let ethanol = parse_smiles("[CH3][CH2][OH]");
        assert_eq!(substituent_signature(&ethanol, 2, 1, 2), "O(H)");
        assert_eq!(substituent_signature(&ethanol, 1, 0, 2), "C(H,H,O(H))");
        assert_eq!(substituent_signature(&ethanol, 1, 0, 0), "C");
    }

    #[test]
    fn test_alanine_center() {
        let alanine = parse_smiles("N[C@@H]([CH3])C(=O)O");
        assert!(is_potential_chiral_center(&alanine, 1));
        let result = run(&alanine);
        assert!(result.is_valid(), "{:?}", result.errors());
    }

    #[test]
    fn test_symmetric_center_is_not_potential() {
        // two identical methyl groups
        let molecule = parse_smiles("[CH3][C@H]([CH3])O");
        assert!(!is_potential_chiral_center(&molecule, 1));
        let result = run(&molecule);
        assert!(!result.is_valid());
        assert_eq!(result.reason(), FailureReason::InvalidStereochemistry);
        assert_eq!(result.errors()[0].atom_id, Some(1));
    }

    #[test]
    fn test_unmarked_center_warns() {
        let molecule = parse_smiles("N[CH]([CH3])C(=O)O");
        let result = run(&molecule);
        assert!(result.is_valid());
        assert!(result.warnings().iter().any(|w| w.atom_id == Some(1)));
    }

    #[test]
    fn test_bad_label() {
        let mut molecule = parse_smiles("N[C@@H]([CH3])C(=O)O");
        let mut atoms: Vec<Atom> = molecule.atoms().to_vec();
        atoms[1].chirality = Some('Q');
        let bonds: Vec<Bond> = molecule.bonds().to_vec();
        molecule = Molecule::new();
        for atom in atoms {
            molecule.add_atom(atom).unwrap();
        }
        for bond in bonds {
            molecule.insert_bond(bond).unwrap();
        }
        let result = run(&molecule);
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].reason, FailureReason::InvalidStereochemistry);
    }

    #[test]
    fn test_double_bond_isomers() {
        // 2-butene with explicit hydrogens: each end has C and H
        let butene = parse_smiles("[CH3][CH]=[CH][CH3]");
        let result = run(&butene);
        assert_eq!(result.warnings().len(), 1);

        // isobutylene: one end has two hydrogens, the other two methyls
        let isobutylene = parse_smiles("[CH2]=C([CH3])[CH3]");
        assert!(run(&isobutylene).warnings().is_empty());
    }

    #[test]
    fn test_huge_hydrogen_count_next_to_center() {
        let mut molecule = Molecule::new();
        molecule.add_atom(Atom::new(0, "C").with_hydrogens(1)).unwrap();
        molecule.add_atom(Atom::new(1, "C").with_hydrogens(u32::MAX)).unwrap();
        molecule.add_atom(Atom::new(2, "N").with_hydrogens(2)).unwrap();
        molecule.add_atom(Atom::new(3, "O").with_hydrogens(1)).unwrap();
        molecule.add_atom(Atom::new(4, "C").with_hydrogens(u32::MAX)).unwrap();
        molecule.add_bond(0, 1, BondKind::Single).unwrap();
        molecule.add_bond(0, 2, BondKind::Single).unwrap();
        molecule.add_bond(0, 3, BondKind::Single).unwrap();
        molecule.add_bond(1, 4, BondKind::Double).unwrap();
        assert!(is_potential_chiral_center(&molecule, 0));
        let result = run(&molecule);
        assert!(result.is_valid());
    }

    #[test]
    fn test_wedge_without_center() {
        let mut molecule = Molecule::new();
        molecule.add_atom(Atom::new(0, "C").with_hydrogens(3)).unwrap();
        molecule.add_atom(Atom::new(1, "C").with_hydrogens(3)).unwrap();
        molecule
            .insert_bond(Bond {
                id: 0,
                begin: 0,
                end: 1,
                kind: BondKind::Single,
                stereo: BondStereo::Up,
            })
            .unwrap();
        let result = run(&molecule);
        assert!(result.is_valid());
        assert_eq!(result.warnings().len(), 1);
    }
}
