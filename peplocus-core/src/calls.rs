//! Peptide call table parsing.
//!
//! The input is a delimited table (tab or comma, detected from the header)
//! with required `peptide` and `score` columns and optional grouping
//! columns (`fraction`, `scan`, `feature`). Any further columns are
//! tolerated and carried through to the annotated output unchanged.
//!
//! Peptide strings are residue letters with optional `(±delta)` tags after
//! the modified residue, e.g. `SAMPLE(+0.98)R`. A malformed peptide string
//! is fatal.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::constants::{
    DEAMIDATION_DELTA, MAX_PEPTIDE_LENGTH, MIN_PEPTIDE_LENGTH, MODIFICATION_TOLERANCE,
};
use crate::sequence::is_residue;
use crate::types::{Modification, PeplocusError, PeptideCall};

/// Parsed call table: original header plus one [`PeptideCall`] per row
#[derive(Debug, Clone)]
pub struct CallTable {
    pub header: Vec<String>,
    pub calls: Vec<PeptideCall>,
}

/// Parses a peptide string into plain residues and modification tags.
///
/// # Errors
///
/// Returns [`PeplocusError::InvalidPeptide`] for unknown residues, unmatched
/// or leading tags, unparsable deltas, or out-of-range lengths.
///
/// # Examples
///
/// ```rust
/// use peplocus_core::calls::parse_peptide;
///
/// let (residues, mods) = parse_peptide("SAMPLE(+0.98)R").unwrap();
/// assert_eq!(residues, "SAMPLER");
/// assert_eq!(mods[0].position, 5);
/// ```
pub fn parse_peptide(text: &str) -> Result<(String, Vec<Modification>), PeplocusError> {
    let mut residues = String::new();
    let mut modifications = Vec::new();
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c == '(' {
            if residues.is_empty() {
                return Err(PeplocusError::InvalidPeptide(format!(
                    "{text}: modification tag before any residue"
                )));
            }
            let mut tag = String::new();
            let mut closed = false;
            for t in chars.by_ref() {
                if t == ')' {
                    closed = true;
                    break;
                }
                tag.push(t);
            }
            if !closed {
                return Err(PeplocusError::InvalidPeptide(format!(
                    "{text}: unterminated modification tag"
                )));
            }
            let delta: f64 = tag.trim_start_matches('+').parse().map_err(|_| {
                PeplocusError::InvalidPeptide(format!("{text}: bad modification delta ({tag})"))
            })?;
            modifications.push(Modification {
                position: residues.len() - 1,
                delta,
            });
        } else if c.is_ascii_alphabetic() {
            let upper = c.to_ascii_uppercase();
            if !is_residue(upper as u8) {
                return Err(PeplocusError::InvalidPeptide(format!(
                    "{text}: unknown residue {c}"
                )));
            }
            residues.push(upper);
        } else {
            return Err(PeplocusError::InvalidPeptide(format!(
                "{text}: unexpected character {c}"
            )));
        }
    }

    if residues.len() < MIN_PEPTIDE_LENGTH || residues.len() > MAX_PEPTIDE_LENGTH {
        return Err(PeplocusError::InvalidPeptide(format!(
            "{text}: length {} outside {}..={}",
            residues.len(),
            MIN_PEPTIDE_LENGTH,
            MAX_PEPTIDE_LENGTH
        )));
    }

    Ok((residues, modifications))
}

/// Applies distinguishing modifications to the residue string.
///
/// Deamidation deltas on N or Q change the searched residue (N->D, Q->E);
/// all other modifications leave the search sequence untouched.
#[must_use]
pub fn apply_distinguishing_mods(residues: &str, modifications: &[Modification]) -> String {
    let mut out: Vec<u8> = residues.bytes().collect();
    for m in modifications {
        if (m.delta - DEAMIDATION_DELTA).abs() <= MODIFICATION_TOLERANCE {
            match out.get(m.position) {
                Some(b'N') => out[m.position] = b'D',
                Some(b'Q') => out[m.position] = b'E',
                _ => {}
            }
        }
    }
    String::from_utf8(out).unwrap_or_else(|_| residues.to_string())
}

fn find_column(header: &[String], names: &[&str]) -> Option<usize> {
    header.iter().position(|h| {
        let h = h.trim().to_ascii_lowercase();
        names.iter().any(|n| h == *n)
    })
}

/// Reads a peptide call table from any buffered reader.
///
/// # Errors
///
/// Returns [`PeplocusError::ParseError`] for a missing header or required
/// column and [`PeplocusError::InvalidPeptide`] for malformed peptides.
pub fn read_calls<R: BufRead>(reader: R) -> Result<CallTable, PeplocusError> {
    let mut lines = reader.lines();
    let header_line = loop {
        match lines.next() {
            Some(line) => {
                let line = line?;
                if !line.trim().is_empty() {
                    break line;
                }
            }
            None => {
                return Err(PeplocusError::ParseError(
                    "empty peptide call table".to_string(),
                ))
            }
        }
    };

    let delimiter = if header_line.contains('\t') { '\t' } else { ',' };
    let header: Vec<String> = header_line
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .collect();

    let peptide_col = find_column(&header, &["peptide", "sequence"]).ok_or_else(|| {
        PeplocusError::ParseError("call table is missing a peptide column".to_string())
    })?;
    let score_col = find_column(&header, &["score", "confidence", "alc", "alc (%)"])
        .ok_or_else(|| {
            PeplocusError::ParseError("call table is missing a score column".to_string())
        })?;
    let fraction_col = find_column(&header, &["fraction"]);
    let scan_col = find_column(&header, &["scan"]);
    let feature_col = find_column(&header, &["feature"]);

    let mut calls = Vec::new();
    for (row, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let columns: Vec<String> = line.split(delimiter).map(|s| s.trim().to_string()).collect();
        let get = |col: Option<usize>| -> String {
            col.and_then(|i| columns.get(i)).cloned().unwrap_or_default()
        };
        let peptide = columns.get(peptide_col).cloned().unwrap_or_default();
        let (residues, modifications) = parse_peptide(&peptide)?;
        let score: f64 = columns
            .get(score_col)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                PeplocusError::ParseError(format!("row {}: unparsable score", row + 1))
            })?;

        // Rows without grouping keys each form their own feature block
        let fraction = match fraction_col {
            Some(_) => get(fraction_col),
            None => format!("row{row}"),
        };

        calls.push(PeptideCall {
            residues,
            modifications,
            score,
            fraction,
            scan: get(scan_col),
            feature: get(feature_col),
            columns,
            row,
        });
    }

    Ok(CallTable { header, calls })
}

/// Reads a peptide call table from a file path
pub fn read_calls_file<P: AsRef<Path>>(path: P) -> Result<CallTable, PeplocusError> {
    let file = File::open(path.as_ref())?;
    read_calls(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_peptide_plain() {
        let (residues, mods) = parse_peptide("SAMPLER").unwrap();
        assert_eq!(residues, "SAMPLER");
        assert!(mods.is_empty());
    }

    #[test]
    fn test_parse_peptide_with_modifications() {
        let (residues, mods) = parse_peptide("SAMPLE(+0.98)R(-17.03)").unwrap();
        assert_eq!(residues, "SAMPLER");
        assert_eq!(mods.len(), 2);
        assert_eq!(mods[0].position, 5);
        assert!((mods[0].delta - 0.98).abs() < 1e-9);
        assert_eq!(mods[1].position, 6);
        assert!((mods[1].delta + 17.03).abs() < 1e-9);
    }

    #[test]
    fn test_parse_peptide_lowercase() {
        let (residues, _) = parse_peptide("sampler").unwrap();
        assert_eq!(residues, "SAMPLER");
    }

    #[test]
    fn test_parse_peptide_malformed() {
        assert!(parse_peptide("SAMPL3R").is_err());
        assert!(parse_peptide("(+0.98)SAMPLER").is_err());
        assert!(parse_peptide("SAMPLE(+0.98R").is_err());
        assert!(parse_peptide("SAMPLE(abc)R").is_err());
        assert!(parse_peptide("SAMB").is_err()); // B is not a residue
        assert!(parse_peptide("SAM").is_err()); // too short
    }

    #[test]
    fn test_distinguishing_deamidation() {
        let (residues, mods) = parse_peptide("SAMPN(+0.98)LER").unwrap();
        assert_eq!(apply_distinguishing_mods(&residues, &mods), "SAMPDLER");

        let (residues, mods) = parse_peptide("Q(+0.98)SAMPLER").unwrap();
        assert_eq!(apply_distinguishing_mods(&residues, &mods), "ESAMPLER");
    }

    #[test]
    fn test_non_distinguishing_modification_kept_out_of_sequence() {
        // SAMPLE(+0.98)R collapses to the same search sequence as
        // SAMPLER because E is not in the distinguishing set.
        let (residues, mods) = parse_peptide("SAMPLE(+0.98)R").unwrap();
        assert_eq!(apply_distinguishing_mods(&residues, &mods), "SAMPLER");

        let (residues, mods) = parse_peptide("SAMPLE(+42.01)R").unwrap();
        assert_eq!(apply_distinguishing_mods(&residues, &mods), "SAMPLER");
    }

    #[test]
    fn test_read_calls_tab_table() {
        let table = "Fraction\tScan\tPeptide\tScore\textra\n1\t100\tSAMPLER\t98.5\tx\n1\t101\tGLEAMING\t55\ty\n";
        let parsed = read_calls(table.as_bytes()).unwrap();
        assert_eq!(parsed.header.len(), 5);
        assert_eq!(parsed.calls.len(), 2);
        assert_eq!(parsed.calls[0].residues, "SAMPLER");
        assert!((parsed.calls[0].score - 98.5).abs() < 1e-9);
        assert_eq!(parsed.calls[0].fraction, "1");
        assert_eq!(parsed.calls[0].scan, "100");
        assert_eq!(parsed.calls[1].residues, "GLEAMING");
        assert_eq!(parsed.calls[1].columns[4], "y");
    }

    #[test]
    fn test_read_calls_comma_table_without_groups() {
        let table = "peptide,score\nSAMPLER,90\n";
        let parsed = read_calls(table.as_bytes()).unwrap();
        assert_eq!(parsed.calls.len(), 1);
        // Each row becomes its own feature block when grouping keys are absent
        assert_eq!(parsed.calls[0].fraction, "row0");
    }

    #[test]
    fn test_read_calls_missing_columns() {
        assert!(read_calls("peptide\nSAMPLER\n".as_bytes()).is_err());
        assert!(read_calls("score\n90\n".as_bytes()).is_err());
        assert!(read_calls("".as_bytes()).is_err());
    }

    #[test]
    fn test_read_calls_malformed_peptide_is_fatal() {
        let table = "peptide\tscore\nSAMPL3R\t90\n";
        assert!(matches!(
            read_calls(table.as_bytes()),
            Err(PeplocusError::InvalidPeptide(_))
        ));
    }
}
