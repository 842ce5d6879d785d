//! SMILES parsing and writing, structural validation, and fingerprint similarity over a
//! shared molecular graph.

mod element;
pub use element::*;

mod molecule;
pub use molecule::*;

mod parse;
pub use parse::*;

mod validate;
pub use validate::*;

mod fingerprint;
pub use fingerprint::*;

mod library;
pub use library::*;

/// Install a global `tracing` subscriber printing events at `level` and above.
///
/// Unknown level names fall back to `info`. Calling this again is harmless, which lets
/// every test start with it.
pub fn init_logging(level: &str) {
    let level = level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_test_writer()
        .try_init();
}
