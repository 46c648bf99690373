use crate::error::{ExportError, Result};
use regex::{Regex, RegexBuilder};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Result of a complete filter run.
#[derive(Debug)]
pub struct FilterSummary {
    pub kept: usize,
    pub removed: usize,
    pub output_file: String,
}

/// Build the case-insensitive matcher from the keyword list: each keyword
/// escaped literally, OR-combined via pattern alternation.
pub fn build_keyword_pattern(keywords: &[String]) -> Result<Regex> {
    let parts: Vec<String> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(regex::escape)
        .collect();

    if parts.is_empty() {
        return Err(ExportError::Config(
            "keyword list is empty; nothing to filter".into(),
        ));
    }

    Ok(RegexBuilder::new(&parts.join("|"))
        .case_insensitive(true)
        .build()?)
}

/// Run the filter pipeline: copy `input` to `output`, dropping every row
/// where any cell contains any keyword as a substring. Header, column
/// order, and the relative order of surviving rows are preserved; all
/// cells are treated as text.
#[instrument]
pub fn run_filter(input: &Path, output: &Path, keywords: &[String]) -> Result<FilterSummary> {
    let matcher = build_keyword_pattern(keywords)?;

    let mut reader = csv::Reader::from_path(input)?;
    let headers = reader.headers()?.clone();

    let mut writer = csv::Writer::from_path(output)?;
    writer.write_record(&headers)?;

    let mut kept = 0;
    let mut removed = 0;
    for record in reader.records() {
        let record = record?;
        if record.iter().any(|cell| matcher.is_match(cell)) {
            removed += 1;
            debug!(row = kept + removed, "removed row");
        } else {
            writer.write_record(&record)?;
            kept += 1;
        }
    }
    writer.flush()?;

    info!(kept, removed, output = %output.display(), "filter complete");
    Ok(FilterSummary {
        kept,
        removed,
        output_file: output.display().to_string(),
    })
}
