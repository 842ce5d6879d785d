use crate::element;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter, Result as FmtResult};
use thiserror::Error;

/// Caller-assigned atom identifier, unique within one molecule.
pub type AtomId = usize;
pub type BondId = usize;

/// An undirected petgraph view of a molecule. Node weights are atom ids.
pub type MoleculeGraph = UnGraph<AtomId, BondKind>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoleculeError {
    #[error("Atom id {0} is already used in this molecule")]
    DuplicateAtom(AtomId),
    #[error("Bond {bond} references atom {atom}, which is not in the molecule")]
    MissingAtom { bond: BondId, atom: AtomId },
    #[error("Bond {bond} joins atom {atom} to itself")]
    SelfBond { bond: BondId, atom: AtomId },
    #[error("Bond id {0} is already used in this molecule")]
    DuplicateBond(BondId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum BondKind {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondKind {
    /// Bond order used for valence sums. Aromatic bonds count as 1.
    pub fn order(self) -> u32 {
        match self {
            BondKind::Single | BondKind::Aromatic => 1,
            BondKind::Double => 2,
            BondKind::Triple => 3,
        }
    }

    /// The SMILES bond symbol. Single bonds are implicit.
    pub fn symbol(self) -> &'static str {
        match self {
            BondKind::Single => "",
            BondKind::Double => "=",
            BondKind::Triple => "#",
            BondKind::Aromatic => ":",
        }
    }
}

/// Wedge/dash marker on a bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondStereo {
    #[default]
    None,
    Up,
    Down,
    Either,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub id: AtomId,
    pub symbol: String,
    pub atomic_number: u8,
    pub formal_charge: i32,
    pub implicit_hydrogens: u32,
    pub is_chiral: bool,
    /// Configuration label, `R` or `S` when known.
    pub chirality: Option<char>,
    pub aromatic: bool,
}

impl Atom {
    pub fn new(id: AtomId, symbol: &str) -> Self {
        Self {
            id,
            symbol: symbol.to_string(),
            atomic_number: element::atomic_number(symbol),
            formal_charge: 0,
            implicit_hydrogens: 0,
            is_chiral: false,
            chirality: None,
            aromatic: false,
        }
    }

    pub fn with_charge(mut self, charge: i32) -> Self {
        self.formal_charge = charge;
        self
    }

    pub fn with_hydrogens(mut self, count: u32) -> Self {
        self.implicit_hydrogens = count;
        self
    }

    /// Mark the atom as a chiral center with the given configuration label.
    pub fn with_chirality(mut self, label: Option<char>) -> Self {
        self.is_chiral = true;
        self.chirality = label;
        self
    }

    pub fn aromatic(mut self) -> Self {
        self.aromatic = true;
        self
    }

    pub fn max_valence(&self) -> u32 {
        element::max_valence(&self.symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bond {
    pub id: BondId,
    pub begin: AtomId,
    pub end: AtomId,
    pub kind: BondKind,
    pub stereo: BondStereo,
}

impl Bond {
    pub fn order(&self) -> u32 {
        self.kind.order()
    }

    pub fn touches(&self, atom: AtomId) -> bool {
        self.begin == atom || self.end == atom
    }

    /// The endpoint opposite to `atom`, if `atom` is an endpoint at all.
    pub fn other(&self, atom: AtomId) -> Option<AtomId> {
        if self.begin == atom {
            Some(self.end)
        } else if self.end == atom {
            Some(self.begin)
        } else {
            None
        }
    }
}

/// A molecular graph stored as flat atom and bond arenas.
///
/// Atom order is significant: the first atom is where serialization starts.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    index: HashMap<AtomId, usize>,
    bond_ids: HashSet<BondId>,
    next_bond: BondId,
    /// bond indices touching each atom, parallel to `atoms`
    incident: Vec<Vec<usize>>,
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_atom(&mut self, atom: Atom) -> Result<AtomId, MoleculeError> {
        if self.index.contains_key(&atom.id) {
            return Err(MoleculeError::DuplicateAtom(atom.id));
        }
        let id = atom.id;
        self.index.insert(id, self.atoms.len());
        self.atoms.push(atom);
        self.incident.push(Vec::new());
        Ok(id)
    }

    /// Add a bond with the next free bond id.
    pub fn add_bond(
        &mut self,
        begin: AtomId,
        end: AtomId,
        kind: BondKind,
    ) -> Result<BondId, MoleculeError> {
        let id = self.next_bond_id();
        self.insert_bond(Bond {
            id,
            begin,
            end,
            kind,
            stereo: BondStereo::None,
        })
    }

    /// Add a fully specified bond.
    pub fn insert_bond(&mut self, bond: Bond) -> Result<BondId, MoleculeError> {
        if self.bond_ids.contains(&bond.id) {
            return Err(MoleculeError::DuplicateBond(bond.id));
        }
        if bond.begin == bond.end {
            return Err(MoleculeError::SelfBond {
                bond: bond.id,
                atom: bond.begin,
            });
        }
        let begin = self.index_of(bond.begin).ok_or(MoleculeError::MissingAtom {
            bond: bond.id,
            atom: bond.begin,
        })?;
        let end = self.index_of(bond.end).ok_or(MoleculeError::MissingAtom {
            bond: bond.id,
            atom: bond.end,
        })?;

        let id = bond.id;
        self.bond_ids.insert(id);
        self.next_bond = self.next_bond.max(id.saturating_add(1));
        let position = self.bonds.len();
        self.bonds.push(bond);
        self.incident[begin].push(position);
        self.incident[end].push(position);
        Ok(id)
    }

    pub fn next_atom_id(&self) -> AtomId {
        self.atoms.iter().map(|a| a.id.saturating_add(1)).max().unwrap_or(0)
    }

    pub fn next_bond_id(&self) -> BondId {
        self.next_bond
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.index_of(id).map(|i| &self.atoms[i])
    }

    /// Position of the atom in the atom sequence.
    pub fn index_of(&self, id: AtomId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Bonds touching `atom`, in bond-list order.
    pub fn bonds_of(&self, atom: AtomId) -> impl Iterator<Item = &Bond> + '_ {
        let positions = match self.index_of(atom) {
            Some(i) => self.incident[i].as_slice(),
            None => &[],
        };
        positions.iter().map(move |&p| &self.bonds[p])
    }

    /// Neighbor atom ids of `atom`, paired with the connecting bond, in bond-list order.
    pub fn neighbors(&self, atom: AtomId) -> impl Iterator<Item = (AtomId, &Bond)> + '_ {
        self.bonds_of(atom)
            .filter_map(move |b| b.other(atom).map(|other| (other, b)))
    }

    pub fn degree(&self, atom: AtomId) -> usize {
        self.bonds_of(atom).count()
    }

    /// Sum of incident bond orders plus implicit hydrogens, saturating at `u32::MAX`.
    pub fn valence(&self, atom: AtomId) -> u32 {
        let hydrogens = self.atom(atom).map_or(0, |a| a.implicit_hydrogens);
        self.bonds_of(atom)
            .map(Bond::order)
            .fold(hydrogens, u32::saturating_add)
    }

    /// Sum of formal charges. Summed in `i64` so no set of `i32` charges can overflow.
    pub fn total_charge(&self) -> i64 {
        self.atoms.iter().map(|a| a.formal_charge as i64).sum()
    }

    /// Build a petgraph view of the molecule. Node `i` is the `i`-th atom.
    pub fn graph(&self) -> MoleculeGraph {
        let mut graph = MoleculeGraph::with_capacity(self.atoms.len(), self.bonds.len());
        for atom in &self.atoms {
            graph.add_node(atom.id);
        }
        for bond in &self.bonds {
            // endpoints were checked on insertion
            if let (Some(a), Some(b)) = (self.index_of(bond.begin), self.index_of(bond.end)) {
                graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), bond.kind);
            }
        }
        graph
    }

    /// Parse SMILES text leniently into a molecule.
    pub fn from_smiles(smiles: &str) -> Self {
        crate::parse_smiles(smiles)
    }

    pub fn to_smiles(&self) -> String {
        crate::to_smiles(self)
    }
}

impl Display for Molecule {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.to_smiles())
    }
}
