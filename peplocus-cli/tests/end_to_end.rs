mod common;

use std::fs;

use tempfile::TempDir;

use crate::common::{run_peplocus, write_fixture};

#[test]
fn cli_help_lists_inputs() {
    let assert = run_peplocus(&["--help"]).success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    for flag in ["--calls", "--genome", "--annotation", "--variants", "--stats"] {
        assert!(output.contains(flag), "help misses {flag}");
    }
}

#[test]
fn cds_identification_end_to_end() {
    let dir = TempDir::new().unwrap();
    let fixture = write_fixture(dir.path());
    let out = dir.path().join("out.tsv");

    run_peplocus(&[
        "-c",
        fixture.calls.to_str().unwrap(),
        "-g",
        fixture.genome.to_str().unwrap(),
        "-a",
        fixture.annotation.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "-q",
    ])
    .success();

    let table = fs::read_to_string(&out).unwrap();
    let mut lines = table.lines();
    let header = lines.next().unwrap();
    assert!(header.contains("Peptide"));
    assert!(header.contains("\tcategory\t"));

    let sampler_row = lines.next().unwrap();
    assert!(sampler_row.contains("\ttarget\t"));
    assert!(sampler_row.contains("chr1:+:30-51"));
    assert!(sampler_row.contains("\tCDS\t"));
    assert!(sampler_row.contains("T1"));

    let unmatched_row = lines.next().unwrap();
    assert!(unmatched_row.contains("\tnone\t"));
}

#[test]
fn fdr_statistics_artifact() {
    let dir = TempDir::new().unwrap();
    let fixture = write_fixture(dir.path());
    let out = dir.path().join("out.tsv");
    let stats = dir.path().join("stats.tsv");

    run_peplocus(&[
        "-c",
        fixture.calls.to_str().unwrap(),
        "-g",
        fixture.genome.to_str().unwrap(),
        "-a",
        fixture.annotation.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "-s",
        stats.to_str().unwrap(),
        "-q",
    ])
    .success();

    let table = fs::read_to_string(&stats).unwrap();
    let header = table.lines().next().unwrap();
    assert_eq!(
        header,
        "length\tcategory\torigin\tscore\ttargets\tdecoys\tambiguous\tcum_targets\tcum_decoys\tratio"
    );
    // The CDS stratum must carry the single target identification
    assert!(table
        .lines()
        .any(|l| l.starts_with("7\tCDS\tgenome\t99\t1")));
}

#[test]
fn variant_mismatch_aborts() {
    let dir = TempDir::new().unwrap();
    let fixture = write_fixture(dir.path());
    let variants = dir.path().join("variants.tsv");
    // The fixture genome has A at position 5, not G
    fs::write(&variants, "chr1\t5\tG\tT\tg.6G>T\n").unwrap();

    run_peplocus(&[
        "-c",
        fixture.calls.to_str().unwrap(),
        "-g",
        fixture.genome.to_str().unwrap(),
        "-v",
        variants.to_str().unwrap(),
        "-q",
    ])
    .failure();
}

#[test]
fn repeated_runs_are_identical() {
    let dir = TempDir::new().unwrap();
    let fixture = write_fixture(dir.path());

    let run_once = |threads: &str, out_name: &str| -> String {
        let out = dir.path().join(out_name);
        run_peplocus(&[
            "-c",
            fixture.calls.to_str().unwrap(),
            "-g",
            fixture.genome.to_str().unwrap(),
            "-a",
            fixture.annotation.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "-t",
            threads,
            "-q",
        ])
        .success();
        fs::read_to_string(&out).unwrap()
    };

    let first = run_once("1", "out1.tsv");
    let second = run_once("4", "out2.tsv");
    assert_eq!(first, second);
}
