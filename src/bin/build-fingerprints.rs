use anyhow::{bail, Context, Result};
use chemline::*;
use csv::ReaderBuilder;
use tracing::*;

const USAGE: &str = "usage: build-fingerprints <input.csv> <output.csv> [smiles-column]";

/// Read a headered CSV of SMILES and write a fingerprint library.
///
/// The SMILES column defaults to `smiles`. Rows are identified by an `id` column when the
/// input has one, otherwise by row number.
fn main() -> Result<()> {
    init_logging("info");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (input, output) = match (args.first(), args.get(1)) {
        (Some(input), Some(output)) => (input, output),
        _ => bail!(USAGE),
    };
    let smiles_column = args.get(2).map(String::as_str).unwrap_or("smiles");

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(input)
        .with_context(|| format!("Opening {input}"))?;
    let headers = rdr.headers()?.clone();
    let find = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
    let Some(smiles_index) = find(smiles_column) else {
        bail!("{input} has no {smiles_column:?} column");
    };
    let id_index = find("id");

    let mut candidates = Vec::new();
    let mut invalid = 0;
    for (row, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} of {input}", row + 1))?;
        let smiles = record.get(smiles_index).unwrap_or_default().trim();
        if !is_valid_syntax(smiles) {
            warn!("Row {}: {smiles:?} is not valid SMILES, skipping", row + 1);
            invalid += 1;
            continue;
        }
        let id = match id_index.and_then(|i| record.get(i)) {
            Some(id) => id.to_string(),
            None => (row + 1).to_string(),
        };
        candidates.push(Candidate::new(id, smiles).with_fingerprint(fingerprint(smiles)));
    }

    write_library(output, &candidates)?;
    info!(
        "Fingerprinted {} molecules from {input} ({invalid} skipped)",
        candidates.len()
    );
    Ok(())
}
