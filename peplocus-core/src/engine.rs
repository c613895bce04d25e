//! Run orchestration.
//!
//! [`SearchEngine::run`] drives the full pipeline: variant validation,
//! single-threaded automaton construction, the parallel search phase over
//! the whole unit universe, container finalization, per-hit
//! classification, per-call best-location selection, FDR accumulation and
//! the final input-ordered annotated table. Everything after the parallel
//! phase is single-threaded; output order never depends on thread count.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::calls::{apply_distinguishing_mods, CallTable};
use crate::classify::{classify, ClassifyContext};
use crate::config::PeplocusConfig;
use crate::fdr::{FdrAccumulator, HitOutcome};
use crate::keyword::KeywordAutomaton;
use crate::provider::{
    validate_variants, GenomeSource, InMemoryProvider, NamedSequence, VariantRecord,
};
use crate::results::{AnnotatedRow, RunResults, RunStats};
use crate::search::{run_search, SearchUniverse};
use crate::types::{CategoryCall, GenomicHit, PeplocusError};

/// All inputs of one run
pub struct RunInputs {
    pub calls: CallTable,
    pub genomes: Vec<GenomeSource>,
    pub variants: Vec<VariantRecord>,
    /// Extra amino-acid database
    pub extra: Vec<NamedSequence>,
    /// RNA-seq-derived nucleotide sequences
    pub rnaseq: Vec<NamedSequence>,
    /// Raw reads (activates read-support counting)
    pub reads: Vec<Vec<u8>>,
}

impl RunInputs {
    /// Minimal inputs: calls against genomes only
    #[must_use]
    pub fn new(calls: CallTable, genomes: Vec<GenomeSource>) -> Self {
        Self {
            calls,
            genomes,
            variants: Vec::new(),
            extra: Vec::new(),
            rnaseq: Vec::new(),
            reads: Vec::new(),
        }
    }
}

/// Main search and localization engine.
///
/// # Examples
///
/// ```rust,no_run
/// use peplocus_core::{SearchEngine, RunInputs, config::PeplocusConfig};
/// use peplocus_core::calls::read_calls_file;
/// use peplocus_core::provider::{GenomeSource, InMemoryProvider};
///
/// let mut provider = InMemoryProvider::new();
/// provider.load_genome_fasta("genome.fasta")?;
/// provider.load_annotation_file("annotation.tsv")?;
///
/// let engine = SearchEngine::new(PeplocusConfig::default());
/// let inputs = RunInputs::new(
///     read_calls_file("calls.tsv")?,
///     vec![GenomeSource { origin: "hg38".to_string(), provider: Box::new(provider) }],
/// );
/// let results = engine.run(inputs)?;
/// println!("{} rows, {} hits", results.rows.len(), results.stats.hits);
/// # Ok::<(), peplocus_core::types::PeplocusError>(())
/// ```
#[derive(Debug)]
pub struct SearchEngine {
    pub config: PeplocusConfig,
}

impl SearchEngine {
    #[must_use]
    pub const fn new(config: PeplocusConfig) -> Self {
        Self { config }
    }

    /// Runs the complete pipeline.
    ///
    /// # Errors
    ///
    /// Any fatal condition aborts the run: malformed peptides, variant
    /// mismatches, reserved names, classifier inconsistencies, coordinate
    /// validation failures. Partial state is discarded.
    pub fn run(&self, inputs: RunInputs) -> Result<RunResults, PeplocusError> {
        let RunInputs {
            calls: call_table,
            genomes,
            variants,
            extra,
            rnaseq,
            reads,
        } = inputs;
        let quiet = self.config.quiet;

        // Variants are validated (and later applied) against every genome
        // carrying their reference
        let mut variants_by: HashMap<(String, String), Vec<VariantRecord>> = HashMap::new();
        for source in &genomes {
            let names = source.provider.reference_names();
            let relevant: Vec<VariantRecord> = variants
                .iter()
                .filter(|v| names.contains(&v.reference))
                .cloned()
                .collect();
            validate_variants(source.provider.as_ref(), &relevant)?;
            for v in relevant {
                variants_by
                    .entry((source.origin.clone(), v.reference.clone()))
                    .or_default()
                    .push(v);
            }
        }
        for records in variants_by.values_mut() {
            records.sort_by_key(|v| v.position);
        }

        // Automaton: built once, single-threaded, frozen before the pool
        let mut building = KeywordAutomaton::new();
        let mut call_keywords: Vec<Vec<usize>> = Vec::with_capacity(call_table.calls.len());
        for (i, call) in call_table.calls.iter().enumerate() {
            let residues = apply_distinguishing_mods(&call.residues, &call.modifications);
            call_keywords.push(building.insert_call(i, &residues)?);
        }
        let automaton = building.prepare()?;
        if !quiet {
            eprintln!(
                "Prepared automaton: {} keywords from {} calls",
                automaton.len(),
                call_table.calls.len()
            );
        }

        let universe = SearchUniverse {
            genomes: &genomes,
            variants: &variants_by,
            extra: &extra,
            rnaseq: &rnaseq,
            reads: &reads,
        };
        let search_stats = match self.config.num_threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| PeplocusError::ThreadPool(e.to_string()))?
                .install(|| run_search(&universe, &automaton, &self.config))?,
            None => run_search(&universe, &automaton, &self.config)?,
        };
        if !quiet {
            eprintln!(
                "Searched {} units, {} hits after deduplication",
                search_stats.units, search_stats.hits
            );
        }

        // Snapshot the containers; everything below is single-threaded
        let entry_hits: Vec<Vec<GenomicHit>> = automaton
            .entries()
            .iter()
            .map(|e| e.hits.lock().expect("poisoned keyword container lock").clone())
            .collect();

        // Classification, cached per stored hit
        let empty_provider = InMemoryProvider::new();
        let enabled = self.config.enabled_categories.as_deref();
        let contexts: HashMap<&str, ClassifyContext<'_>> = genomes
            .iter()
            .map(|g| {
                (
                    g.origin.as_str(),
                    ClassifyContext::new(g.provider.as_ref(), enabled),
                )
            })
            .collect();
        let fallback = ClassifyContext::new(&empty_provider, enabled);
        let mut entry_categories: Vec<Vec<CategoryCall>> = Vec::with_capacity(entry_hits.len());
        for hits in &entry_hits {
            let mut categories = Vec::with_capacity(hits.len());
            for hit in hits {
                let ctx = contexts.get(hit.origin.as_str()).unwrap_or(&fallback);
                categories.push(classify(hit, ctx)?);
            }
            entry_categories.push(categories);
        }

        // Per-call best-location selection, ranking and FDR accumulation
        let read_mode = !reads.is_empty();
        let mut accumulator = FdrAccumulator::new();
        let mut rows = Vec::with_capacity(call_table.calls.len());
        for (i, call) in call_table.calls.iter().enumerate() {
            let mut candidates: Vec<(&GenomicHit, &CategoryCall)> = Vec::new();
            let mut read_target = 0u64;
            let mut read_decoy = 0u64;
            for &entry in &call_keywords[i] {
                for (hit, category) in entry_hits[entry].iter().zip(&entry_categories[entry]) {
                    candidates.push((hit, category));
                }
                read_target += automaton.entry(entry).read_support.target();
                read_decoy += automaton.entry(entry).read_support.decoy();
            }

            let best = |decoy: bool| -> Option<&(&GenomicHit, &CategoryCall)> {
                candidates
                    .iter()
                    .filter(|(h, _)| h.is_decoy() == decoy)
                    .min_by(|a, b| {
                        a.1.category
                            .priority()
                            .cmp(&b.1.category.priority())
                            .then_with(|| a.0.cmp_identity(b.0))
                    })
            };
            let location_count = candidates.iter().filter(|(h, _)| !h.is_decoy()).count();
            let best_target = best(false);
            let best_decoy = best(true);
            let (reported, outcome) = match (best_target, best_decoy) {
                (Some(t), Some(d)) => match t.1.category.priority().cmp(&d.1.category.priority()) {
                    Ordering::Less => (Some(t), Some(HitOutcome::Target)),
                    Ordering::Greater => (Some(d), Some(HitOutcome::Decoy)),
                    Ordering::Equal => (Some(t), Some(HitOutcome::Ambiguous)),
                },
                (Some(t), None) => (Some(t), Some(HitOutcome::Target)),
                (None, Some(d)) => (Some(d), Some(HitOutcome::Decoy)),
                (None, None) => (None, None),
            };

            let row = match reported {
                Some((hit, category)) => {
                    let outcome = outcome.expect("reported location implies an outcome");
                    accumulator.record(
                        call.residues.len(),
                        category.category,
                        &hit.origin,
                        call.score,
                        outcome,
                    );
                    let status = match outcome {
                        HitOutcome::Target => "target",
                        HitOutcome::Decoy => "decoy",
                        HitOutcome::Ambiguous => "ambiguous",
                    };
                    let info = if category.transcripts.is_empty() {
                        hit.provenance.clone()
                    } else if hit.provenance.is_empty() {
                        category.transcripts.join(",")
                    } else {
                        format!("{};{}", hit.provenance, category.transcripts.join(","))
                    };
                    AnnotatedRow {
                        columns: call.columns.clone(),
                        rank: 0,
                        location_count,
                        status: status.to_string(),
                        origin: hit.origin.clone(),
                        location: hit.region.to_string(),
                        category: category.category.to_string(),
                        keyword: hit.keyword.clone(),
                        info,
                        matched_sequence: call.modified_sequence(&hit.keyword),
                        read_target,
                        read_decoy,
                    }
                }
                None => AnnotatedRow {
                    columns: call.columns.clone(),
                    rank: 0,
                    location_count: 0,
                    status: "none".to_string(),
                    origin: String::new(),
                    location: String::new(),
                    category: String::new(),
                    keyword: String::new(),
                    info: String::new(),
                    matched_sequence: String::new(),
                    read_target,
                    read_decoy,
                },
            };
            rows.push(row);
        }

        // Rank co-identified peptides within each feature block by score
        let mut blocks: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, call) in call_table.calls.iter().enumerate() {
            blocks.entry(call.block_key()).or_default().push(i);
        }
        for members in blocks.values() {
            let mut sorted = members.clone();
            sorted.sort_by(|&a, &b| {
                call_table.calls[b]
                    .score
                    .partial_cmp(&call_table.calls[a].score)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.cmp(&b))
            });
            for (rank, &i) in sorted.iter().enumerate() {
                rows[i].rank = rank + 1;
            }
        }

        if !quiet {
            eprintln!("Annotated {} identifications", rows.len());
        }

        Ok(RunResults {
            input_header: call_table.header,
            rows,
            fdr: accumulator.rows(),
            stats: RunStats {
                calls: call_table.calls.len(),
                keywords: automaton.len(),
                units: search_stats.units,
                hits: search_stats.hits,
            },
            read_mode,
        })
    }
}
