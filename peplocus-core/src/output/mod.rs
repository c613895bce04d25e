//! Output formatting for search results.
//!
//! Two artifacts per run, both tab-separated:
//!
//! - **Annotated**: one row per input identification: the original input
//!   columns plus rank, location count, competition status, origin,
//!   location string, category, matched keyword, category info,
//!   modification-aware matched sequence, and (in read mode) read-support
//!   counts.
//! - **FdrStats**: one row per (length, category, origin, score) stratum
//!   cell with target/decoy/ambiguous counts, cumulative counts and the
//!   unsmoothed decoy/target ratio.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use peplocus_core::{SearchEngine, RunInputs, config::{PeplocusConfig, OutputFormat}};
//! use peplocus_core::output::write_results;
//! use std::fs::File;
//!
//! # let engine = SearchEngine::new(PeplocusConfig::default());
//! # let inputs: RunInputs = unimplemented!();
//! let results = engine.run(inputs)?;
//!
//! let mut rows = File::create("identifications.tsv")?;
//! write_results(&mut rows, &results, OutputFormat::Annotated)?;
//!
//! let mut stats = File::create("fdr_stats.tsv")?;
//! write_results(&mut stats, &results, OutputFormat::FdrStats)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::{config::OutputFormat, results::RunResults, types::PeplocusError};
use std::io::Write;

mod formats {
    pub mod rows;
    pub mod stats;
}

use formats::{rows::write_rows_format, stats::write_stats_format};

/// Writes one result artifact in the requested format.
///
/// # Errors
///
/// Returns [`PeplocusError::IoError`] when the writer fails.
pub fn write_results<W: Write>(
    writer: &mut W,
    results: &RunResults,
    format: OutputFormat,
) -> Result<(), PeplocusError> {
    match format {
        OutputFormat::Annotated => write_rows_format(writer, results),
        OutputFormat::FdrStats => write_stats_format(writer, results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fdr::{FdrRow, StratumCounts};
    use crate::results::{AnnotatedRow, RunStats};
    use crate::types::Category;
    use std::io::Cursor;

    fn create_test_results(read_mode: bool) -> RunResults {
        RunResults {
            input_header: vec!["Peptide".to_string(), "Score".to_string()],
            rows: vec![AnnotatedRow {
                columns: vec!["SAMPLER".to_string(), "98.5".to_string()],
                rank: 1,
                location_count: 1,
                status: "target".to_string(),
                origin: "genome".to_string(),
                location: "chr1:+:30-51".to_string(),
                category: "CDS".to_string(),
                keyword: "SAMPLER".to_string(),
                info: "T1".to_string(),
                matched_sequence: "SAMPLER".to_string(),
                read_target: 2,
                read_decoy: 0,
            }],
            fdr: vec![FdrRow {
                length: 7,
                category: Category::Cds,
                origin: "genome".to_string(),
                score: 99,
                counts: StratumCounts {
                    target: 1,
                    decoy: 0,
                    ambiguous: 0,
                },
                cumulative_target: 1,
                cumulative_decoy: 0,
                ratio: 0.0,
            }],
            stats: RunStats {
                calls: 1,
                keywords: 2,
                units: 10,
                hits: 1,
            },
            read_mode,
        }
    }

    #[test]
    fn test_write_annotated_format() {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        let results = create_test_results(false);

        write_results(&mut cursor, &results, OutputFormat::Annotated).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let mut lines = output.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("Peptide\tScore\trank\t"));
        assert!(!header.contains("read_support"));
        let row = lines.next().unwrap();
        assert!(row.contains("chr1:+:30-51"));
        assert!(row.contains("\tCDS\t"));
        assert!(row.contains("\ttarget\t"));
    }

    #[test]
    fn test_write_annotated_format_read_mode() {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        let results = create_test_results(true);

        write_results(&mut cursor, &results, OutputFormat::Annotated).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.lines().next().unwrap().ends_with("read_support_target\tread_support_decoy"));
        assert!(output.lines().nth(1).unwrap().ends_with("2\t0"));
    }

    #[test]
    fn test_write_stats_format() {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        let results = create_test_results(false);

        write_results(&mut cursor, &results, OutputFormat::FdrStats).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with("length\tcategory\torigin\tscore\t"));
        assert!(output.contains("7\tCDS\tgenome\t99\t1\t0\t0\t1\t0\t0.000000"));
    }

    #[test]
    fn test_write_empty_results() {
        let results = RunResults {
            input_header: vec!["Peptide".to_string(), "Score".to_string()],
            rows: vec![],
            fdr: vec![],
            stats: RunStats::default(),
            read_mode: false,
        };
        for format in [OutputFormat::Annotated, OutputFormat::FdrStats] {
            let mut buffer = Vec::new();
            let mut cursor = Cursor::new(&mut buffer);
            write_results(&mut cursor, &results, format).unwrap();
            let output = String::from_utf8(buffer).unwrap();
            // Headers are written even with no data rows
            assert_eq!(output.lines().count(), 1, "format {format:?}");
        }
    }
}
