//! Structural validation as a chain of independent rule handlers.
//!
//! Each handler looks at the whole molecule. It may record non-fatal errors and warnings
//! on the shared [`ValidationResult`], or return a terminal [`ValidationError`], which stops
//! the chain. The standard chain checks charge balance, then bonding rules, then
//! stereochemistry.

use crate::molecule::{AtomId, Molecule};
use std::fmt::{Display, Formatter, Result as FmtResult};
use thiserror::Error;
use tracing::*;

mod charge;
pub use charge::*;

mod bonding;
pub use bonding::*;

mod stereo;
pub use stereo::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FailureReason {
    #[default]
    None,
    ChargeImbalance,
    InvalidBondingRules,
    InvalidStereochemistry,
    EmptyStructure,
    InvalidAtom,
    UnknownError,
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            FailureReason::None => "no failure",
            FailureReason::ChargeImbalance => "charge imbalance",
            FailureReason::InvalidBondingRules => "invalid bonding",
            FailureReason::InvalidStereochemistry => "invalid stereochemistry",
            FailureReason::EmptyStructure => "empty structure",
            FailureReason::InvalidAtom => "invalid atom",
            FailureReason::UnknownError => "unknown error",
        };
        write!(f, "{name}")
    }
}

/// One recorded error. Returned from a handler, it is also the terminal failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}: {message}")]
pub struct ValidationError {
    pub reason: FailureReason,
    pub message: String,
    pub atom_id: Option<AtomId>,
}

impl ValidationError {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            atom_id: None,
        }
    }

    pub fn at_atom(mut self, atom_id: AtomId) -> Self {
        self.atom_id = Some(atom_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub message: String,
    pub atom_id: Option<AtomId>,
}

impl Display for ValidationWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.atom_id {
            Some(id) => write!(f, "atom {id}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Outcome of running a validator.
///
/// Validity is derived from the error list, so a result with any error is always invalid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    terminal: Option<FailureReason>,
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// A result that failed before any handler ran.
    pub fn failure(error: ValidationError) -> Self {
        let mut result = Self::new();
        result.fail(error);
        result
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The terminal failure reason, or the reason of the first recorded error if no handler
    /// stopped the chain. `None` for valid results.
    pub fn reason(&self) -> FailureReason {
        self.terminal
            .or_else(|| self.errors.first().map(|e| e.reason))
            .unwrap_or_default()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    /// Human-readable message of the failure, if any.
    pub fn message(&self) -> Option<&str> {
        let reason = self.reason();
        self.errors
            .iter()
            .find(|e| e.reason == reason)
            .map(|e| e.message.as_str())
    }

    /// Record a non-terminal error.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, message: impl Into<String>, atom_id: Option<AtomId>) {
        self.warnings.push(ValidationWarning {
            message: message.into(),
            atom_id,
        });
    }

    fn fail(&mut self, error: ValidationError) {
        self.terminal = Some(error.reason);
        self.errors.push(error);
    }
}

/// One rule in the validation chain.
pub trait ValidationHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Check the molecule. `Err` is a terminal failure and stops the chain.
    fn check(&self, molecule: &Molecule, result: &mut ValidationResult)
        -> Result<(), ValidationError>;
}

/// An ordered chain of handlers.
pub struct Validator {
    handlers: Vec<Box<dyn ValidationHandler>>,
}

impl Validator {
    /// An empty chain. Every molecule passes it.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Charge balance, then bonding rules, then stereochemistry.
    pub fn standard() -> Self {
        Self::new()
            .with_handler(ChargeBalanceHandler)
            .with_handler(BondingRulesHandler)
            .with_handler(StereochemistryHandler)
    }

    pub fn with_handler(mut self, handler: impl ValidationHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn validate(&self, molecule: &Molecule) -> ValidationResult {
        let mut result = ValidationResult::new();
        for handler in &self.handlers {
            debug!("Running {} on {} atoms", handler.name(), molecule.atom_count());
            if let Err(error) = handler.check(molecule, &mut result) {
                debug!("{} failed: {error}", handler.name());
                result.fail(error);
                break;
            }
        }
        result
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::standard()
    }
}

/// Validate a molecule with the standard chain.
pub fn validate(molecule: &Molecule) -> ValidationResult {
    Validator::standard().validate(molecule)
}

/// Validate a molecule that may be absent. An absent molecule is an empty structure.
pub fn validate_optional(molecule: Option<&Molecule>) -> ValidationResult {
    match molecule {
        Some(molecule) => validate(molecule),
        None => ValidationResult::failure(ValidationError::new(
            FailureReason::EmptyStructure,
            "no molecule given",
        )),
    }
}
