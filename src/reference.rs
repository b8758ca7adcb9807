//! Static reference data shipped next to the binary.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::consts::LANGUAGE_CODES;

#[derive(Deserialize)]
struct LanguageRow {
    #[serde(rename = "Lang")]
    lang: String,
}

/// Read the language list from a CSV file with a `Lang` column.
pub fn load_languages(path: &Path) -> Result<Vec<String>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open language table {}", path.display()))?;
    parse_languages(file).with_context(|| format!("invalid language table {}", path.display()))
}

/// Distinct, non-empty language names in file order.
pub fn parse_languages<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut out: Vec<String> = Vec::new();
    for row in rdr.deserialize::<LanguageRow>() {
        let row = row?;
        if !row.lang.is_empty() && !out.contains(&row.lang) {
            out.push(row.lang);
        }
    }
    Ok(out)
}

/// Display name for a warehouse language code; unknown values pass through.
pub fn language_name(code: &str) -> &str {
    LANGUAGE_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or(code)
}
