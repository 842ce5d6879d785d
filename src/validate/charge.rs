use super::{FailureReason, ValidationError, ValidationHandler, ValidationResult};
use crate::element;
use crate::molecule::Molecule;
use tracing::*;

/// Largest total charge magnitude a structure may carry.
pub const MAX_TOTAL_CHARGE: i64 = 4;

/// Rejects empty structures and grossly unbalanced charge; flags per-atom charges outside the
/// element's usual range.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChargeBalanceHandler;

impl ValidationHandler for ChargeBalanceHandler {
    fn name(&self) -> &'static str {
        "charge balance"
    }

    fn check(
        &self,
        molecule: &Molecule,
        result: &mut ValidationResult,
    ) -> Result<(), ValidationError> {
        if molecule.is_empty() {
            return Err(ValidationError::new(
                FailureReason::EmptyStructure,
                "molecule has no atoms",
            ));
        }

        for atom in molecule.atoms() {
            let (low, high) = element::charge_range(&atom.symbol);
            if atom.formal_charge < low || atom.formal_charge > high {
                trace!(
                    "{} atom {} has charge {} outside [{low}, {high}]",
                    atom.symbol,
                    atom.id,
                    atom.formal_charge
                );
                result.add_error(
                    ValidationError::new(
                        FailureReason::InvalidAtom,
                        format!(
                            "charge {} on {} is outside [{low}, {high}]",
                            atom.formal_charge, atom.symbol
                        ),
                    )
                    .at_atom(atom.id),
                );
            }
        }

        let total = molecule.total_charge();
        if total.abs() > MAX_TOTAL_CHARGE {
            return Err(ValidationError::new(
                FailureReason::ChargeImbalance,
                format!("total charge {total} exceeds {MAX_TOTAL_CHARGE} in magnitude"),
            ));
        }
        if total != 0 {
            result.add_warning(format!("molecule carries a net charge of {total}"), None);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::molecule::Atom;

    fn single(atom: Atom) -> Molecule {
        let mut molecule = Molecule::new();
        molecule.add_atom(atom).unwrap();
        molecule
    }

    fn run(molecule: &Molecule) -> (Result<(), ValidationError>, ValidationResult) {
        let mut result = ValidationResult::new();
        let outcome = ChargeBalanceHandler.check(molecule, &mut result);
        (outcome, result)
    }

    #[test]
    fn test_neutral_passes_quietly() {
        let (outcome, result) = run(&single(Atom::new(0, "C").with_hydrogens(4)));
        assert!(outcome.is_ok());
        assert!(result.errors().is_empty());
        assert!(result.warnings().is_empty());
    }

    #[test]
    fn test_large_charge_is_terminal() {
        let (outcome, _) = run(&single(Atom::new(0, "C").with_charge(5)));
        assert_eq!(outcome.unwrap_err().reason, FailureReason::ChargeImbalance);
    }

    #[test]
    fn test_out_of_range_atom_is_recorded() {
        // O+ is outside oxygen's [-1, 0]; total +1 is only a warning
        let (outcome, result) = run(&single(Atom::new(7, "O").with_charge(1)));
        assert!(outcome.is_ok());
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].reason, FailureReason::InvalidAtom);
        assert_eq!(result.errors()[0].atom_id, Some(7));
        assert_eq!(result.warnings().len(), 1);
    }

    #[test]
    fn test_default_range() {
        let (_, result) = run(&single(Atom::new(0, "Fe").with_charge(2)));
        assert!(result.errors().is_empty());
        let (_, result) = run(&single(Atom::new(0, "Fe").with_charge(3)));
        assert_eq!(result.errors().len(), 1);
    }

    #[test]
    fn test_extreme_charges_are_reported() {
        let mut molecule = Molecule::new();
        molecule.add_atom(Atom::new(0, "Fe").with_charge(i32::MAX)).unwrap();
        molecule.add_atom(Atom::new(1, "Fe").with_charge(1)).unwrap();
        let (outcome, result) = run(&molecule);
        assert_eq!(outcome.unwrap_err().reason, FailureReason::ChargeImbalance);
        assert_eq!(result.errors().len(), 1);

        let mut molecule = Molecule::new();
        molecule.add_atom(Atom::new(0, "Fe").with_charge(i32::MIN)).unwrap();
        molecule.add_atom(Atom::new(1, "Fe").with_charge(i32::MIN)).unwrap();
        let (outcome, _) = run(&molecule);
        assert_eq!(outcome.unwrap_err().reason, FailureReason::ChargeImbalance);
    }

    #[test]
    fn test_balanced_salt() {
        let mut molecule = Molecule::new();
        molecule.add_atom(Atom::new(0, "Na").with_charge(1)).unwrap();
        molecule.add_atom(Atom::new(1, "Cl").with_charge(-1)).unwrap();
        let (outcome, result) = run(&molecule);
        assert!(outcome.is_ok());
        assert!(result.is_valid());
        assert!(result.warnings().is_empty());
    }
}
