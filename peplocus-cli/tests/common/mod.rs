#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;

/// Nucleotides encoding the SAMPLER test peptide
pub const SAMPLER_NT: &str = "TCTGCTATGCCTCTTGAACGT";

/// Runs the peplocus binary with the given arguments
pub fn run_peplocus(args: &[&str]) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("peplocus").unwrap();
    cmd.args(args);
    cmd.assert()
}

/// Paths of one on-disk fixture set
pub struct Fixture {
    pub genome: PathBuf,
    pub annotation: PathBuf,
    pub calls: PathBuf,
}

/// Writes a minimal genome/annotation/calls fixture into `dir`.
///
/// chr1 carries SAMPLER as an in-frame CDS at 30..51 inside a single-exon
/// transcript spanning 0..81.
pub fn write_fixture(dir: &Path) -> Fixture {
    let genome = dir.join("genome.fasta");
    let sequence = format!("{}{}{}", "A".repeat(30), SAMPLER_NT, "A".repeat(30));
    fs::write(&genome, format!(">chr1\n{sequence}\n")).unwrap();

    let annotation = dir.join("annotation.tsv");
    fs::write(&annotation, "T1\tG1\tchr1\t+\t0-81\t30-51\tcurated\t1\n").unwrap();

    let calls = dir.join("calls.tsv");
    fs::write(
        &calls,
        "Fraction\tScan\tPeptide\tScore\n1\t100\tSAMPLER\t98.5\n1\t100\tWWWWWWW\t44.0\n",
    )
    .unwrap();

    Fixture {
        genome,
        annotation,
        calls,
    }
}
