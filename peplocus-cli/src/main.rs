//! # Peplocus CLI - Peptide-to-Genome Search
//!
//! Command-line interface for the peplocus search and localization engine.
//!
//! ## Usage
//!
//! ```bash
//! # Basic search of a call table against a genome
//! peplocus -c calls.tsv -g genome.fasta -a annotation.tsv -o out.tsv
//!
//! # With variants, an extra protein database and FDR statistics
//! peplocus -c calls.tsv -g genome.fasta -a annotation.tsv \
//!          -v variants.tsv -e extra.fasta -s fdr_stats.tsv -o out.tsv
//!
//! # Read-support counting
//! peplocus -c calls.tsv -g genome.fasta -r reads.fasta -o out.tsv
//! ```
//!
//! ## Options
//!
//! - `-c, --calls <FILE>`: Peptide call table, tab or comma separated (required)
//! - `-g, --genome <FILE>`: Genome FASTA
//! - `-a, --annotation <FILE>`: Normalized transcript annotation table
//! - `-n, --origin <NAME>`: Genome-of-origin id (default: genome)
//! - `-v, --variants <FILE>`: Normalized variant table
//! - `-e, --extra <FILE>`: Extra amino-acid FASTA
//! - `-x, --rnaseq <FILE>`: RNA-seq-derived nucleotide FASTA
//! - `-r, --reads <FILE>`: Raw reads FASTA (counter mode)
//! - `-o, --output <FILE>`: Annotated output table (default: stdout)
//! - `-s, --stats <FILE>`: FDR statistics table
//! - `-t, --threads <N>`: Worker threads (default: all cores)
//! - `-w, --window-size <N>`: Genomic window size in nucleotides
//! - `--max-splice-gap <N>`: Cis-splicing intervening distance bound (residues)
//! - `--no-transcript` / `--no-frameshift` / `--no-spliced` / `--no-substitution`:
//!   disable the corresponding search mode
//! - `-q, --quiet`: Suppress progress messages

use clap::{Arg, ArgAction, Command};
use peplocus_core::calls::read_calls_file;
use peplocus_core::config::{OutputFormat, PeplocusConfig};
use peplocus_core::output::write_results;
use peplocus_core::provider::{load_variant_file, GenomeSource, InMemoryProvider, NamedSequence};
use peplocus_core::sequence::io::read_fasta_sequences;
use peplocus_core::{RunInputs, SearchEngine};
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Parses arguments, assembles the run inputs, executes the engine and
/// writes the requested artifacts.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("peplocus")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Peptide-to-genome search and localization")
        .arg(
            Arg::new("calls")
                .short('c')
                .long("calls")
                .value_name("FILE")
                .required(true)
                .help("Peptide call table (TSV/CSV)"),
        )
        .arg(
            Arg::new("genome")
                .short('g')
                .long("genome")
                .value_name("FILE")
                .help("Genome FASTA file"),
        )
        .arg(
            Arg::new("annotation")
                .short('a')
                .long("annotation")
                .value_name("FILE")
                .help("Normalized transcript annotation table"),
        )
        .arg(
            Arg::new("origin")
                .short('n')
                .long("origin")
                .value_name("NAME")
                .default_value("genome")
                .help("Genome-of-origin id"),
        )
        .arg(
            Arg::new("variants")
                .short('v')
                .long("variants")
                .value_name("FILE")
                .help("Normalized variant table"),
        )
        .arg(
            Arg::new("extra")
                .short('e')
                .long("extra")
                .value_name("FILE")
                .help("Extra amino-acid FASTA"),
        )
        .arg(
            Arg::new("rnaseq")
                .short('x')
                .long("rnaseq")
                .value_name("FILE")
                .help("RNA-seq-derived nucleotide FASTA"),
        )
        .arg(
            Arg::new("reads")
                .short('r')
                .long("reads")
                .value_name("FILE")
                .help("Raw reads FASTA (counter mode)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Annotated output table (default: stdout)"),
        )
        .arg(
            Arg::new("stats")
                .short('s')
                .long("stats")
                .value_name("FILE")
                .help("FDR statistics table"),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_name("N")
                .help("Worker threads"),
        )
        .arg(
            Arg::new("window-size")
                .short('w')
                .long("window-size")
                .value_name("N")
                .help("Genomic window size in nucleotides"),
        )
        .arg(
            Arg::new("max-splice-gap")
                .long("max-splice-gap")
                .value_name("N")
                .help("Cis-splicing intervening distance bound (residues)"),
        )
        .arg(
            Arg::new("no-transcript")
                .long("no-transcript")
                .action(ArgAction::SetTrue)
                .help("Disable spliced-transcript search"),
        )
        .arg(
            Arg::new("no-frameshift")
                .long("no-frameshift")
                .action(ArgAction::SetTrue)
                .help("Disable frameshift search"),
        )
        .arg(
            Arg::new("no-spliced")
                .long("no-spliced")
                .action(ArgAction::SetTrue)
                .help("Disable cis-splicing search"),
        )
        .arg(
            Arg::new("no-substitution")
                .long("no-substitution")
                .action(ArgAction::SetTrue)
                .help("Disable substitution search"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Suppress progress messages"),
        )
        .get_matches();

    let mut config = PeplocusConfig {
        transcript_search: !matches.get_flag("no-transcript"),
        frameshift_search: !matches.get_flag("no-frameshift"),
        spliced_search: !matches.get_flag("no-spliced"),
        substitution_search: !matches.get_flag("no-substitution"),
        quiet: matches.get_flag("quiet"),
        ..Default::default()
    };
    if let Some(threads) = matches.get_one::<String>("threads") {
        config.num_threads = Some(threads.parse().map_err(|_| "Invalid thread count")?);
    }
    if let Some(size) = matches.get_one::<String>("window-size") {
        config.window_size = size.parse().map_err(|_| "Invalid window size")?;
    }
    if let Some(gap) = matches.get_one::<String>("max-splice-gap") {
        config.max_splice_gap = gap.parse().map_err(|_| "Invalid splice gap")?;
    }

    let calls = read_calls_file(
        matches
            .get_one::<String>("calls")
            .expect("calls is required"),
    )?;

    let mut genomes = Vec::new();
    if let Some(genome_file) = matches.get_one::<String>("genome") {
        let mut provider = InMemoryProvider::new();
        provider.load_genome_fasta(genome_file)?;
        if let Some(annotation_file) = matches.get_one::<String>("annotation") {
            provider.load_annotation_file(annotation_file)?;
        }
        genomes.push(GenomeSource {
            origin: matches
                .get_one::<String>("origin")
                .expect("origin has a default")
                .clone(),
            provider: Box::new(provider),
        });
    }

    let variants = match matches.get_one::<String>("variants") {
        Some(file) => load_variant_file(file)?,
        None => Vec::new(),
    };
    let load_named = |file: Option<&String>| -> Result<Vec<NamedSequence>, Box<dyn std::error::Error>> {
        match file {
            Some(file) => Ok(read_fasta_sequences(file)?
                .into_iter()
                .map(|(name, _desc, seq)| NamedSequence { name, seq })
                .collect()),
            None => Ok(Vec::new()),
        }
    };
    let extra = load_named(matches.get_one::<String>("extra"))?;
    let rnaseq = load_named(matches.get_one::<String>("rnaseq"))?;
    let reads = match matches.get_one::<String>("reads") {
        Some(file) => read_fasta_sequences(file)?
            .into_iter()
            .map(|(_name, _desc, seq)| seq)
            .collect(),
        None => Vec::new(),
    };

    let engine = SearchEngine::new(config);
    let results = engine.run(RunInputs {
        calls,
        genomes,
        variants,
        extra,
        rnaseq,
        reads,
    })?;

    let mut writer: Box<dyn Write> = if let Some(output_file) = matches.get_one::<String>("output")
    {
        Box::new(BufWriter::new(File::create(output_file)?))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };
    write_results(&mut writer, &results, OutputFormat::Annotated)?;
    writer.flush()?;

    if let Some(stats_file) = matches.get_one::<String>("stats") {
        let mut stats_writer = BufWriter::new(File::create(stats_file)?);
        write_results(&mut stats_writer, &results, OutputFormat::FdrStats)?;
        stats_writer.flush()?;
    }

    if !matches.get_flag("quiet") {
        eprintln!(
            "Search complete: {} calls, {} keywords, {} units, {} hits.",
            results.stats.calls, results.stats.keywords, results.stats.units, results.stats.hits
        );
    }

    Ok(())
}
