//! Fingerprint libraries stored as CSV.
//!
//! Each record is `id,smiles,fingerprint,bit_count`, with the fingerprint in its text form.

use crate::fingerprint::{Candidate, Fingerprint};
use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Writer};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::*;

pub const LIBRARY_HEADER: [&str; 4] = ["id", "smiles", "fingerprint", "bit_count"];

/// Read a library from any CSV source with a header row.
pub fn read_library_from(reader: impl Read) -> Result<Vec<Candidate>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let mut candidates = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Reading library record {}", row + 1))?;
        let field = |i: usize| record.get(i).unwrap_or_default();

        let fingerprint: Fingerprint = field(2)
            .parse()
            .with_context(|| format!("Parsing fingerprint of {:?}", field(0)))?;
        let bit_count: usize = field(3)
            .trim()
            .parse()
            .with_context(|| format!("Parsing bit count of {:?}", field(0)))?;
        if bit_count != fingerprint.bit_count() {
            bail!(
                "Record {:?} claims {bit_count} bits but its fingerprint has {}",
                field(0),
                fingerprint.bit_count()
            );
        }

        candidates.push(Candidate::new(field(0), field(1)).with_fingerprint(fingerprint));
    }
    Ok(candidates)
}

/// Read a library file.
pub fn read_library(path: impl AsRef<Path>) -> Result<Vec<Candidate>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Opening library {}", path.display()))?;
    let candidates = read_library_from(file)
        .with_context(|| format!("Loading library {}", path.display()))?;
    info!("Loaded {} candidates from {}", candidates.len(), path.display());
    Ok(candidates)
}

/// Write candidates as library records, fingerprinting any that lack one.
pub fn write_library_to(writer: impl Write, candidates: &[Candidate]) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(LIBRARY_HEADER)?;
    for candidate in candidates {
        let fingerprint = candidate.resolve_fingerprint();
        wtr.write_record([
            candidate.id.as_str(),
            candidate.smiles.as_str(),
            fingerprint.to_string().as_str(),
            fingerprint.bit_count().to_string().as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a library file, replacing any existing one.
pub fn write_library(path: impl AsRef<Path>, candidates: &[Candidate]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Creating {}", path.display()))?;
    write_library_to(file, candidates)
        .with_context(|| format!("Writing library {}", path.display()))?;
    info!("Library of {} candidates written to {}", candidates.len(), path.display());
    Ok(())
}
