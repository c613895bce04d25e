//! # Peplocus - Peptide-to-Genome Search Engine
//!
//! Maps observed peptide sequences (from mass-spectrometry identification)
//! onto every plausible genomic origin across the six-frame-translated
//! genome, transcriptome and auxiliary sequence universe, including
//! non-canonical origins: frameshifted ORFs downstream of indels,
//! cis-spliced peptides, single-residue substitutions and
//! RNA-seq-derived sequences. The reliability of each call is estimated
//! via target-decoy competition, stratified by peptide length, category
//! and origin.
//!
//! ## Pipeline
//!
//! 1. Peptide calls are expanded into canonical keywords (I/L interchange,
//!    position-0 deamidation, D-before-G ambiguity) and a single
//!    Aho-Corasick automaton is built over all of them.
//! 2. The scheduler enumerates every search unit (plain six-frame
//!    genomic windows, spliced transcripts, frameshift/spliced/
//!    substitution candidates, extra and RNA-seq FASTA, raw reads) and a
//!    fixed worker pool pulls them lazily.
//! 3. The variant-aware translator streams each window through the
//!    automaton, branching over alt alleles.
//! 4. Matches map back to strand-correct, possibly multi-part genomic
//!    regions; each receives exactly one genomic category.
//! 5. Per call, the best target and decoy locations compete; results feed
//!    the stratified FDR histogram and the annotated output table.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use peplocus_core::{SearchEngine, RunInputs, config::PeplocusConfig};
//! use peplocus_core::calls::read_calls_file;
//! use peplocus_core::provider::{GenomeSource, InMemoryProvider};
//!
//! let mut provider = InMemoryProvider::new();
//! provider.load_genome_fasta("genome.fasta")?;
//! provider.load_annotation_file("annotation.tsv")?;
//!
//! let engine = SearchEngine::new(PeplocusConfig::default());
//! let results = engine.run(RunInputs::new(
//!     read_calls_file("calls.tsv")?,
//!     vec![GenomeSource {
//!         origin: "hg38".to_string(),
//!         provider: Box::new(provider),
//!     }],
//! ))?;
//!
//! println!("Annotated {} identifications", results.rows.len());
//! # Ok::<(), peplocus_core::types::PeplocusError>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`config`]: Run configuration
//! - [`engine`]: Pipeline orchestration
//! - [`types`]: Core data types and errors
//! - [`calls`]: Peptide call table parsing
//! - [`keyword`]: Canonical keywords and the multi-pattern automaton
//! - [`sequence`]: Genetic code, strand and decoy transforms, FASTA I/O
//! - [`provider`]: Sequence/annotation providers and variants
//! - [`translate`]: Variant-aware multi-frame translation
//! - [`search`]: Unit enumeration and the parallel driver
//! - [`mapper`]: Match-offset to genomic-coordinate mapping
//! - [`classify`]: Genomic-category classification
//! - [`fdr`]: Target-decoy stratification
//! - [`results`]: Run results
//! - [`output`]: TSV artifact writers

pub mod calls;
pub mod classify;
pub mod config;
pub mod constants;
pub mod engine;
pub mod fdr;
pub mod keyword;
pub mod mapper;
pub mod output;
pub mod provider;
pub mod results;
pub mod search;
pub mod sequence;
pub mod translate;
pub mod types;

pub use engine::{RunInputs, SearchEngine};
pub use results::RunResults;
pub use types::PeplocusError;
