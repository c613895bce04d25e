//! Search-unit enumeration and the parallel driver.
//!
//! The searchable universe (genomic windows, spliced transcripts,
//! frameshift/spliced/substitution candidates, extra and RNA-seq FASTA,
//! raw reads) is enumerated as lightweight descriptors, materialized
//! lazily into self-contained units (all provider access happens in the
//! sequential pull, never mid-task), and pulled by the rayon pool via
//! `par_bridge`. Workers append hits to the per-keyword containers under
//! each container's own lock; any worker error aborts the whole stage.
//!
//! After the pool drains, [`finalize_containers`] deduplicates every
//! container by full hit identity (independent units rediscover the same
//! hit through window overlap), drops decoy hits that collide with a
//! target hit of the same keyword at the same stripped region, and sorts
//! deterministically.

pub mod modes;

use std::collections::{HashMap, HashSet};

use bio::bio_types::strand::Strand;
use rayon::iter::{ParallelBridge, ParallelIterator};

use crate::config::PeplocusConfig;
use crate::constants::{CODON_LENGTH, MAX_WINDOW_VARIANTS, PSEUDO_RNASEQ, READ_BATCH_SIZE};
use crate::keyword::{KeywordAutomaton, Prepared};
use crate::mapper::{map_genomic, map_transcript_junction};
use crate::provider::{GenomeSource, NamedSequence, VariantRecord};
use crate::sequence::{
    reverse_complement, reversed, shuffle_seed, shuffled, translate_frame, windows,
};
use crate::translate::{reflect_variants, translate_and_match, WindowVariant};
use crate::types::{DecoyPolicy, GenomicHit, PeplocusError};

/// Everything the parallel phase searches, shared read-only
pub struct SearchUniverse<'a> {
    pub genomes: &'a [GenomeSource],
    /// (origin, reference) → records sorted by position
    pub variants: &'a HashMap<(String, String), Vec<VariantRecord>>,
    /// Extra amino-acid database
    pub extra: &'a [NamedSequence],
    /// RNA-seq-derived nucleotide sequences
    pub rnaseq: &'a [NamedSequence],
    /// Raw reads, counter-mode only
    pub reads: &'a [Vec<u8>],
}

#[derive(Debug, Clone)]
enum UnitDescriptor {
    Genomic {
        genome: usize,
        reference: String,
        start: u64,
        end: u64,
        strand: Strand,
        policy: DecoyPolicy,
    },
    Transcript {
        genome: usize,
        transcript: usize,
        policy: DecoyPolicy,
    },
    Frameshift {
        genome: usize,
        transcript: usize,
        decoy: bool,
    },
    Spliced {
        genome: usize,
        transcript: usize,
        decoy: bool,
    },
    Substitution {
        genome: usize,
        transcript: usize,
        decoy: bool,
    },
    Extra {
        index: usize,
        decoy: bool,
    },
    RnaSeq {
        index: usize,
        decoy: bool,
    },
    Reads {
        start: usize,
        end: usize,
    },
}

enum SearchUnit {
    Genomic {
        origin: String,
        reference: String,
        window_start: u64,
        window_len: usize,
        seq: Vec<u8>,
        variants: Vec<WindowVariant>,
        strand: Strand,
        policy: DecoyPolicy,
    },
    Transcript {
        origin: String,
        genome: usize,
        transcript: usize,
        seq: Vec<u8>,
        policy: DecoyPolicy,
    },
    Frameshift {
        origin: String,
        genome: usize,
        transcript: usize,
        region_seq: Vec<u8>,
        cds_t_start: u64,
        decoy: bool,
    },
    Spliced {
        origin: String,
        genome: usize,
        transcript: usize,
        protein: Vec<u8>,
        cds_t_start: u64,
        decoy: bool,
    },
    Substitution {
        origin: String,
        genome: usize,
        transcript: usize,
        protein: Vec<u8>,
        cds_t_start: u64,
        decoy: bool,
    },
    Extra {
        name: String,
        seq: Vec<u8>,
        decoy: bool,
    },
    RnaSeq {
        name: String,
        seq: Vec<u8>,
        decoy: bool,
    },
    Reads {
        reads: Vec<Vec<u8>>,
    },
}

/// Appends one hit to its keyword's shared container
pub(crate) fn append_hit(
    automaton: &KeywordAutomaton<Prepared>,
    pattern: usize,
    hit: GenomicHit,
) {
    automaton
        .entry(pattern)
        .hits
        .lock()
        .expect("poisoned keyword container lock")
        .push(hit);
}

fn enumerate_descriptors(
    universe: &SearchUniverse<'_>,
    automaton: &KeywordAutomaton<Prepared>,
    config: &PeplocusConfig,
) -> Result<Vec<UnitDescriptor>, PeplocusError> {
    // Overlap covers the longest keyword in any frame offset
    let overlap = CODON_LENGTH * automaton.max_len() + 2;
    let window_size = config.window_size.max(overlap + CODON_LENGTH);
    let mut out = Vec::new();

    for (genome, source) in universe.genomes.iter().enumerate() {
        for reference in source.provider.reference_names() {
            let length = source.provider.reference_length(&reference)?;
            for (start, end) in windows(length, window_size, overlap) {
                for strand in [Strand::Forward, Strand::Reverse] {
                    for policy in [DecoyPolicy::None, DecoyPolicy::Reverse] {
                        out.push(UnitDescriptor::Genomic {
                            genome,
                            reference: reference.clone(),
                            start,
                            end,
                            strand,
                            policy,
                        });
                    }
                }
            }
        }

        for (transcript, t) in source.provider.transcripts().iter().enumerate() {
            if config.transcript_search && t.exons.len() >= 2 {
                for policy in [DecoyPolicy::None, DecoyPolicy::Reverse] {
                    out.push(UnitDescriptor::Transcript {
                        genome,
                        transcript,
                        policy,
                    });
                }
            }
            // Transcripts lacking a complete CDS are skipped here
            if !t.is_coding() || !t.cds_complete || t.cds_transcript_range().is_none() {
                continue;
            }
            for decoy in [false, true] {
                if config.frameshift_search {
                    out.push(UnitDescriptor::Frameshift {
                        genome,
                        transcript,
                        decoy,
                    });
                }
                if config.spliced_search {
                    out.push(UnitDescriptor::Spliced {
                        genome,
                        transcript,
                        decoy,
                    });
                }
                if config.substitution_search {
                    out.push(UnitDescriptor::Substitution {
                        genome,
                        transcript,
                        decoy,
                    });
                }
            }
        }
    }

    for index in 0..universe.extra.len() {
        for decoy in [false, true] {
            out.push(UnitDescriptor::Extra { index, decoy });
        }
    }
    for index in 0..universe.rnaseq.len() {
        for decoy in [false, true] {
            out.push(UnitDescriptor::RnaSeq { index, decoy });
        }
    }
    let mut start = 0;
    while start < universe.reads.len() {
        let end = (start + READ_BATCH_SIZE).min(universe.reads.len());
        out.push(UnitDescriptor::Reads { start, end });
        start = end;
    }

    Ok(out)
}

/// Window-relative per-allele variants fully inside `[start, end)`
fn slice_window_variants(
    records: Option<&Vec<VariantRecord>>,
    start: u64,
    end: u64,
) -> Vec<WindowVariant> {
    let mut out = Vec::new();
    let Some(records) = records else {
        return out;
    };
    for record in records {
        let span = record.ref_allele.len() as u64;
        if record.position < start || record.position + span > end {
            continue;
        }
        if out.len() >= MAX_WINDOW_VARIANTS {
            break;
        }
        for alt in &record.alt_alleles {
            out.push(WindowVariant {
                offset: (record.position - start) as usize,
                ref_allele: record.ref_allele.clone(),
                alt: alt.clone(),
                provenance: record.provenance.clone(),
            });
        }
    }
    out.sort_by_key(|v| v.offset);
    out
}

fn materialize(
    descriptor: UnitDescriptor,
    universe: &SearchUniverse<'_>,
) -> Result<SearchUnit, PeplocusError> {
    match descriptor {
        UnitDescriptor::Genomic {
            genome,
            reference,
            start,
            end,
            strand,
            policy,
        } => {
            let source = &universe.genomes[genome];
            let base = source.provider.sequence(&reference, start, end)?;
            let window_len = base.len();
            let key = (source.origin.clone(), reference.clone());
            let variants = if policy == DecoyPolicy::None {
                slice_window_variants(universe.variants.get(&key), start, end)
            } else {
                Vec::new()
            };
            let (seq, variants) = match (strand, policy) {
                (Strand::Reverse, DecoyPolicy::None) => {
                    let reflected = reflect_variants(&variants, window_len);
                    (reverse_complement(&base), reflected)
                }
                (Strand::Reverse, _) => (reversed(&reverse_complement(&base)), Vec::new()),
                (_, DecoyPolicy::None) => (base, variants),
                (_, _) => (reversed(&base), Vec::new()),
            };
            Ok(SearchUnit::Genomic {
                origin: source.origin.clone(),
                reference,
                window_start: start,
                window_len,
                seq,
                variants,
                strand,
                policy,
            })
        }
        UnitDescriptor::Transcript {
            genome,
            transcript,
            policy,
        } => {
            let source = &universe.genomes[genome];
            let t = &source.provider.transcripts()[transcript];
            let mut seq = t.spliced_sequence(source.provider.as_ref())?;
            if policy == DecoyPolicy::Reverse {
                seq = reversed(&seq);
            }
            Ok(SearchUnit::Transcript {
                origin: source.origin.clone(),
                genome,
                transcript,
                seq,
                policy,
            })
        }
        UnitDescriptor::Frameshift {
            genome,
            transcript,
            decoy,
        } => {
            let source = &universe.genomes[genome];
            let t = &source.provider.transcripts()[transcript];
            let spliced = t.spliced_sequence(source.provider.as_ref())?;
            let (cds_t_start, _) = t
                .cds_transcript_range()
                .expect("enumeration admits complete CDS only");
            let mut region_seq = spliced[cds_t_start as usize..].to_vec();
            if decoy {
                region_seq = reversed(&region_seq);
            }
            Ok(SearchUnit::Frameshift {
                origin: source.origin.clone(),
                genome,
                transcript,
                region_seq,
                cds_t_start,
                decoy,
            })
        }
        UnitDescriptor::Spliced {
            genome,
            transcript,
            decoy,
        }
        | UnitDescriptor::Substitution {
            genome,
            transcript,
            decoy,
        } => {
            let source = &universe.genomes[genome];
            let t = &source.provider.transcripts()[transcript];
            let spliced = t.spliced_sequence(source.provider.as_ref())?;
            let (cds_t_start, cds_t_end) = t
                .cds_transcript_range()
                .expect("enumeration admits complete CDS only");
            let mut protein =
                translate_frame(&spliced[cds_t_start as usize..cds_t_end as usize], 0);
            if protein.last() == Some(&b'*') {
                protein.pop();
            }
            if decoy {
                protein.reverse();
            }
            let origin = source.origin.clone();
            match descriptor {
                UnitDescriptor::Spliced { .. } => Ok(SearchUnit::Spliced {
                    origin,
                    genome,
                    transcript,
                    protein,
                    cds_t_start,
                    decoy,
                }),
                _ => Ok(SearchUnit::Substitution {
                    origin,
                    genome,
                    transcript,
                    protein,
                    cds_t_start,
                    decoy,
                }),
            }
        }
        UnitDescriptor::Extra { index, decoy } => {
            let entry = &universe.extra[index];
            let seq = if decoy {
                shuffled(&entry.seq, shuffle_seed(&entry.name, 1))
            } else {
                entry.seq.clone()
            };
            Ok(SearchUnit::Extra {
                name: entry.name.clone(),
                seq,
                decoy,
            })
        }
        UnitDescriptor::RnaSeq { index, decoy } => {
            let entry = &universe.rnaseq[index];
            let seq = if decoy {
                shuffled(&entry.seq, shuffle_seed(&entry.name, 2))
            } else {
                entry.seq.clone()
            };
            Ok(SearchUnit::RnaSeq {
                name: entry.name.clone(),
                seq,
                decoy,
            })
        }
        UnitDescriptor::Reads { start, end } => Ok(SearchUnit::Reads {
            reads: universe.reads[start..end].to_vec(),
        }),
    }
}

fn process(
    unit: SearchUnit,
    universe: &SearchUniverse<'_>,
    automaton: &KeywordAutomaton<Prepared>,
    config: &PeplocusConfig,
) -> Result<(), PeplocusError> {
    match unit {
        SearchUnit::Genomic {
            origin,
            reference,
            window_start,
            window_len,
            seq,
            variants,
            strand,
            policy,
        } => {
            for tm in translate_and_match(&seq, &variants, automaton) {
                let keyword = &automaton.entry(tm.pattern).keyword;
                let hit = map_genomic(
                    &origin,
                    &reference,
                    window_start,
                    window_len,
                    strand,
                    policy,
                    &tm,
                    keyword,
                );
                append_hit(automaton, tm.pattern, hit);
            }
            Ok(())
        }
        SearchUnit::Transcript {
            origin,
            genome,
            transcript,
            seq,
            policy,
        } => {
            let t = &universe.genomes[genome].provider.transcripts()[transcript];
            for tm in translate_and_match(&seq, &[], automaton) {
                let keyword = &automaton.entry(tm.pattern).keyword;
                if let Some(hit) = map_transcript_junction(&origin, t, policy, &tm, keyword) {
                    append_hit(automaton, tm.pattern, hit);
                }
            }
            Ok(())
        }
        SearchUnit::Frameshift {
            origin,
            genome,
            transcript,
            region_seq,
            cds_t_start,
            decoy,
        } => {
            let source = &universe.genomes[genome];
            let t = &source.provider.transcripts()[transcript];
            modes::search_frameshift(
                &origin,
                t,
                source.provider.as_ref(),
                &region_seq,
                cds_t_start,
                decoy,
                automaton,
            )
        }
        SearchUnit::Spliced {
            origin,
            genome,
            transcript,
            protein,
            cds_t_start,
            decoy,
        } => {
            let source = &universe.genomes[genome];
            let t = &source.provider.transcripts()[transcript];
            modes::search_spliced(
                &origin,
                t,
                source.provider.as_ref(),
                &protein,
                cds_t_start,
                config.max_splice_gap,
                decoy,
                automaton,
            )
        }
        SearchUnit::Substitution {
            origin,
            genome,
            transcript,
            protein,
            cds_t_start,
            decoy,
        } => {
            let source = &universe.genomes[genome];
            let t = &source.provider.transcripts()[transcript];
            modes::search_substitution(
                &origin,
                t,
                source.provider.as_ref(),
                &protein,
                cds_t_start,
                decoy,
                automaton,
            )
        }
        SearchUnit::Extra { name, seq, decoy } => {
            modes::search_extra(&name, &seq, decoy, automaton);
            Ok(())
        }
        SearchUnit::RnaSeq { name, seq, decoy } => {
            let policy = if decoy {
                DecoyPolicy::Shuffle
            } else {
                DecoyPolicy::None
            };
            let window_len = seq.len();
            for strand in [Strand::Forward, Strand::Reverse] {
                let stranded = match strand {
                    Strand::Reverse => reverse_complement(&seq),
                    _ => seq.clone(),
                };
                for tm in translate_and_match(&stranded, &[], automaton) {
                    let keyword = &automaton.entry(tm.pattern).keyword;
                    let mut hit = map_genomic(
                        PSEUDO_RNASEQ,
                        PSEUDO_RNASEQ,
                        0,
                        window_len,
                        strand,
                        policy,
                        &tm,
                        keyword,
                    );
                    hit.provenance = name.clone();
                    append_hit(automaton, tm.pattern, hit);
                }
            }
            Ok(())
        }
        SearchUnit::Reads { reads } => {
            modes::search_reads(&reads, automaton);
            Ok(())
        }
    }
}

/// Summary of the parallel phase
#[derive(Debug, Clone, Copy)]
pub struct SearchStats {
    /// Search units enumerated (target and decoy)
    pub units: usize,
    /// Hits surviving deduplication
    pub hits: usize,
}

/// Runs the parallel search phase over the whole universe.
///
/// Units are streamed lazily and pulled by the rayon pool; the first
/// worker error aborts the entire stage.
pub fn run_search(
    universe: &SearchUniverse<'_>,
    automaton: &KeywordAutomaton<Prepared>,
    config: &PeplocusConfig,
) -> Result<SearchStats, PeplocusError> {
    let descriptors = enumerate_descriptors(universe, automaton, config)?;
    let units = descriptors.len();

    descriptors
        .into_iter()
        .map(|d| materialize(d, universe))
        .par_bridge()
        .try_for_each(|unit| process(unit?, universe, automaton, config))?;

    let hits = finalize_containers(automaton);
    Ok(SearchStats { units, hits })
}

fn stripped_region_key(hit: &GenomicHit) -> String {
    let mut key = format!(
        "{}:{}",
        hit.region.base_reference(),
        crate::types::strand_char(hit.region.strand)
    );
    for p in &hit.region.parts {
        key.push_str(&format!(":{}-{}", p.start, p.end));
    }
    key
}

/// Deduplicates every container, enforces the target/decoy exclusion and
/// sorts deterministically. Returns the surviving hit count.
pub fn finalize_containers(automaton: &KeywordAutomaton<Prepared>) -> usize {
    let mut total = 0;
    for entry in automaton.entries() {
        let mut hits = entry
            .hits
            .lock()
            .expect("poisoned keyword container lock");
        hits.sort_unstable_by(GenomicHit::cmp_identity);
        hits.dedup();
        // No hit may be reported under both a target and the decoy-prefixed
        // reference for the same keyword and region
        let target_regions: HashSet<String> = hits
            .iter()
            .filter(|h| !h.is_decoy())
            .map(stripped_region_key)
            .collect();
        hits.retain(|h| !h.is_decoy() || !target_regions.contains(&stripped_region_key(h)));
        total += hits.len();
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PSEUDO_EXTRA;
    use crate::provider::InMemoryProvider;
    use crate::types::GenomicRegion;

    const SAMPLER_NT: &[u8] = b"TCTGCTATGCCTCTTGAACGT";

    fn automaton_with(peptides: &[&str]) -> KeywordAutomaton<Prepared> {
        let mut automaton = KeywordAutomaton::new();
        for (i, p) in peptides.iter().enumerate() {
            automaton.insert_call(i, p).unwrap();
        }
        automaton.prepare().unwrap()
    }

    fn genome_universe<'a>(
        genomes: &'a [GenomeSource],
        variants: &'a HashMap<(String, String), Vec<VariantRecord>>,
    ) -> SearchUniverse<'a> {
        SearchUniverse {
            genomes,
            variants,
            extra: &[],
            rnaseq: &[],
            reads: &[],
        }
    }

    fn single_genome(seq: &[u8]) -> Vec<GenomeSource> {
        let mut provider = InMemoryProvider::new();
        provider.add_sequence("chr1", seq.to_vec()).unwrap();
        vec![GenomeSource {
            origin: "genome".to_string(),
            provider: Box::new(provider),
        }]
    }

    fn all_hits(automaton: &KeywordAutomaton<Prepared>) -> Vec<GenomicHit> {
        automaton
            .entries()
            .iter()
            .flat_map(|e| e.hits.lock().unwrap().clone())
            .collect()
    }

    #[test]
    fn test_plain_genomic_search_finds_target_once() {
        let automaton = automaton_with(&["SAMPLER"]);
        let mut seq = b"AAT".to_vec();
        seq.extend_from_slice(SAMPLER_NT);
        seq.extend_from_slice(b"GGATTT");
        let genomes = single_genome(&seq);
        let variants = HashMap::new();
        let universe = genome_universe(&genomes, &variants);
        let config = PeplocusConfig {
            quiet: true,
            ..Default::default()
        };

        let stats = run_search(&universe, &automaton, &config).unwrap();
        assert!(stats.units >= 4);
        let hits = all_hits(&automaton);
        let targets: Vec<_> = hits
            .iter()
            .filter(|h| !h.is_decoy() && h.keyword == "SAMPLER")
            .collect();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].region.parts[0].start, 3);
        assert_eq!(targets[0].region.parts[0].end, 24);
    }

    #[test]
    fn test_window_overlap_rediscovery_deduplicated() {
        let automaton = automaton_with(&["SAMPLER"]);
        // Place the peptide so that two overlapping windows both see it:
        // windows(250, 150, 23) = (0,150), (127,250)
        let mut seq = vec![b'A'; 250];
        seq[128..149].copy_from_slice(SAMPLER_NT);
        let genomes = single_genome(&seq);
        let variants = HashMap::new();
        let universe = genome_universe(&genomes, &variants);
        let config = PeplocusConfig {
            window_size: 150,
            quiet: true,
            ..Default::default()
        };
        run_search(&universe, &automaton, &config).unwrap();
        let hits = all_hits(&automaton);
        let targets: Vec<_> = hits
            .iter()
            .filter(|h| !h.is_decoy() && h.keyword == "SAMPLER")
            .collect();
        assert_eq!(targets.len(), 1);
    }

    #[test]
    fn test_no_double_target_decoy_report() {
        // A palindromic-in-reverse keyword can show up in both the
        // window and its reversal; the decoy copy must be suppressed.
        let automaton = automaton_with(&["KKKKK"]);
        // AAA codes K; the reversed window still reads KKKKK
        let seq = vec![b'A'; 30];
        let genomes = single_genome(&seq);
        let variants = HashMap::new();
        let universe = genome_universe(&genomes, &variants);
        let config = PeplocusConfig {
            quiet: true,
            ..Default::default()
        };
        run_search(&universe, &automaton, &config).unwrap();

        let hits = all_hits(&automaton);
        let mut seen: HashMap<String, (bool, bool)> = HashMap::new();
        for h in &hits {
            let key = format!("{}:{}", h.keyword, stripped_region_key(h));
            let entry = seen.entry(key).or_default();
            if h.is_decoy() {
                entry.1 = true;
            } else {
                entry.0 = true;
            }
        }
        for (key, (target, decoy)) in seen {
            assert!(
                !(target && decoy),
                "{key} reported as both target and decoy"
            );
        }
    }

    #[test]
    fn test_variant_only_hit_carries_provenance() {
        let automaton = automaton_with(&["SAMPLER"]);
        let mut seq = b"AAT".to_vec();
        seq.extend_from_slice(SAMPLER_NT);
        seq.extend_from_slice(b"GGATTT");
        seq[9] = b'C'; // break the ATG on the reference path
        let genomes = single_genome(&seq);
        let mut variants = HashMap::new();
        variants.insert(
            ("genome".to_string(), "chr1".to_string()),
            vec![VariantRecord {
                reference: "chr1".to_string(),
                position: 9,
                ref_allele: b"C".to_vec(),
                alt_alleles: vec![b"A".to_vec()],
                provenance: "g.10C>A".to_string(),
            }],
        );
        let universe = genome_universe(&genomes, &variants);
        let config = PeplocusConfig {
            quiet: true,
            ..Default::default()
        };
        run_search(&universe, &automaton, &config).unwrap();

        let hits = all_hits(&automaton);
        let targets: Vec<_> = hits
            .iter()
            .filter(|h| !h.is_decoy() && h.keyword == "SAMPLER")
            .collect();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].provenance, "g.10C>A");
    }

    #[test]
    fn test_rnaseq_and_extra_units() {
        let automaton = automaton_with(&["SAMPLER"]);
        let genomes: Vec<GenomeSource> = Vec::new();
        let variants = HashMap::new();
        let extra = vec![NamedSequence {
            name: "prot1".to_string(),
            seq: b"GGGSAMPLERGGG".to_vec(),
        }];
        let rnaseq = vec![NamedSequence {
            name: "contig1".to_string(),
            seq: SAMPLER_NT.to_vec(),
        }];
        let universe = SearchUniverse {
            genomes: &genomes,
            variants: &variants,
            extra: &extra,
            rnaseq: &rnaseq,
            reads: &[],
        };
        let config = PeplocusConfig {
            quiet: true,
            ..Default::default()
        };
        run_search(&universe, &automaton, &config).unwrap();

        let hits = all_hits(&automaton);
        let extra_hit = hits
            .iter()
            .find(|h| h.region.reference == PSEUDO_EXTRA)
            .expect("extra hit");
        assert_eq!(extra_hit.provenance, "prot1");
        // Amino-acid units map 1:1, not 3:1
        assert_eq!(extra_hit.region.parts[0], crate::types::RegionPart::new(3, 10));

        let rnaseq_hit = hits
            .iter()
            .find(|h| h.region.reference == PSEUDO_RNASEQ)
            .expect("rnaseq hit");
        assert_eq!(rnaseq_hit.provenance, "contig1");
        assert_eq!(rnaseq_hit.region.parts[0].len(), 21);
    }

    #[test]
    fn test_read_counters() {
        let automaton = automaton_with(&["SAMPLER"]);
        let genomes: Vec<GenomeSource> = Vec::new();
        let variants = HashMap::new();
        let reads: Vec<Vec<u8>> = vec![
            SAMPLER_NT.to_vec(),
            reverse_complement(SAMPLER_NT),
            b"AAAAAAAAAAAAAAAAAAAAA".to_vec(),
        ];
        let universe = SearchUniverse {
            genomes: &genomes,
            variants: &variants,
            extra: &[],
            rnaseq: &[],
            reads: &reads,
        };
        let config = PeplocusConfig {
            quiet: true,
            ..Default::default()
        };
        run_search(&universe, &automaton, &config).unwrap();

        let entry_index = automaton.keyword_index("SAMPLER").unwrap();
        let support = &automaton.entry(entry_index).read_support;
        // Both the forward read and its reverse complement support the
        // keyword; the poly-A read does not.
        assert_eq!(support.target(), 2);
    }

    #[test]
    fn test_deterministic_across_thread_counts() {
        // Repeated runs with any thread count produce identical hit sets
        let run = |threads: usize| -> Vec<String> {
            let automaton = automaton_with(&["SAMPLER", "KKKKK"]);
            let mut seq = b"AAT".to_vec();
            seq.extend_from_slice(SAMPLER_NT);
            seq.extend_from_slice(&vec![b'A'; 40]);
            let genomes = single_genome(&seq);
            let variants = HashMap::new();
            let universe = genome_universe(&genomes, &variants);
            let config = PeplocusConfig {
                quiet: true,
                window_size: 40,
                ..Default::default()
            };
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap();
            pool.install(|| run_search(&universe, &automaton, &config))
                .unwrap();
            automaton
                .entries()
                .iter()
                .flat_map(|e| {
                    let hits = e.hits.lock().unwrap();
                    hits.iter()
                        .map(|h| format!("{}|{}|{}", h.keyword, h.region, h.provenance))
                        .collect::<Vec<_>>()
                })
                .collect()
        };

        assert_eq!(run(1), run(4));
    }

    #[test]
    fn test_region_display_in_key() {
        let hit = GenomicHit {
            region: GenomicRegion::contiguous("REV_chr1", Strand::Forward, 5, 15),
            keyword: "SAMPLER".to_string(),
            provenance: String::new(),
            origin: "genome".to_string(),
            frame: 0,
        };
        assert_eq!(stripped_region_key(&hit), "chr1:+:5-15");
    }
}
