use super::{FailureReason, ValidationError, ValidationHandler, ValidationResult};
use crate::element;
use crate::molecule::{Atom, BondKind, Molecule};
use petgraph::graph::NodeIndex;
use petgraph::visit::Bfs;
use std::collections::BTreeSet;
use tracing::*;

/// Checks each atom's valence against the valences its element normally takes, plus a few
/// element-specific bond rules and connectivity.
#[derive(Debug, Clone, Copy, Default)]
pub struct BondingRulesHandler;

/// Normal valences for the atom, shifted up and down by the magnitude of its charge.
/// The unshifted values are kept.
pub fn allowed_valences(atom: &Atom) -> BTreeSet<u32> {
    let shift = atom.formal_charge.unsigned_abs();
    let mut allowed = BTreeSet::new();
    for valence in element::expected_valences(&atom.symbol) {
        allowed.insert(valence);
        allowed.insert(valence + shift);
        if let Some(lower) = valence.checked_sub(shift) {
            allowed.insert(lower);
        }
    }
    allowed
}

impl BondingRulesHandler {
    fn check_valence(
        &self,
        molecule: &Molecule,
        atom: &Atom,
        result: &mut ValidationResult,
    ) -> Result<(), ValidationError> {
        let valence = molecule.valence(atom.id);
        let allowed = allowed_valences(atom);
        let Some(&highest) = allowed.last() else {
            return Ok(());
        };

        if valence > highest {
            return Err(ValidationError::new(
                FailureReason::InvalidBondingRules,
                format!(
                    "{} atom {} has valence {valence}, more than {highest}",
                    atom.symbol, atom.id
                ),
            )
            .at_atom(atom.id));
        }
        if !allowed.contains(&valence) {
            result.add_warning(
                format!(
                    "{} has valence {valence}; hydrogens may be missing or the atom is a radical",
                    atom.symbol
                ),
                Some(atom.id),
            );
        }
        Ok(())
    }

    fn check_bond_kinds(&self, molecule: &Molecule, atom: &Atom, result: &mut ValidationResult) {
        let halogen = element::is_halogen(&atom.symbol) && atom.formal_charge == 0;
        let oxygen = atom.symbol == "O";
        if !halogen && !oxygen {
            return;
        }

        for bond in molecule.bonds_of(atom.id) {
            if halogen && bond.kind != BondKind::Single {
                result.add_error(
                    ValidationError::new(
                        FailureReason::InvalidBondingRules,
                        format!("neutral {} may only form single bonds", atom.symbol),
                    )
                    .at_atom(atom.id),
                );
            } else if oxygen && bond.kind == BondKind::Triple {
                result.add_error(
                    ValidationError::new(
                        FailureReason::InvalidBondingRules,
                        "oxygen cannot form a triple bond",
                    )
                    .at_atom(atom.id),
                );
            }
        }
    }

    fn check_connectivity(&self, molecule: &Molecule, result: &mut ValidationResult) {
        let graph = molecule.graph();
        if graph.node_count() == 0 {
            return;
        }
        let mut bfs = Bfs::new(&graph, NodeIndex::new(0));
        let mut reached = 0;
        while bfs.next(&graph).is_some() {
            reached += 1;
        }
        if reached < graph.node_count() {
            debug!("Reached {reached} of {} atoms", graph.node_count());
            result.add_warning(
                format!(
                    "molecule is disconnected: {} of {} atoms are not reachable from the first atom",
                    graph.node_count() - reached,
                    graph.node_count()
                ),
                None,
            );
        }
    }
}

impl ValidationHandler for BondingRulesHandler {
    fn name(&self) -> &'static str {
        "bonding rules"
    }

    fn check(
        &self,
        molecule: &Molecule,
        result: &mut ValidationResult,
    ) -> Result<(), ValidationError> {
        for atom in molecule.atoms() {
            self.check_valence(molecule, atom, result)?;
            self.check_bond_kinds(molecule, atom, result);
        }
        self.check_connectivity(molecule, result);
        Ok(())
    }
}
