//! Specialized matchers for the non-plain search modes.
//!
//! All three transcript-anchored matchers share the same shape: build a
//! short residue stream around a candidate event (frame shift, splice
//! join, substitution), run the automaton over it, and keep only matches
//! that actually involve the event. A match that avoids the shift point,
//! the join, or the substituted residue is already covered by the plain
//! genomic windows and would double-report.

use std::collections::HashSet;

use crate::constants::{FRAMESHIFT_DELTAS, PSEUDO_EXTRA, SUBSTITUTION_ALPHABET};
use crate::keyword::{KeywordAutomaton, Prepared};
use crate::mapper::{decoy_reference, map_transcript_parts, DecoyTransform};
use crate::provider::{SequenceProvider, Transcript};
use crate::search::append_hit;
use crate::sequence::{is_residue, reverse_complement, shuffle_seed, shuffled, translate_frame};
use crate::types::{DecoyPolicy, GenomicHit, GenomicRegion, PeplocusError};

use bio::bio_types::strand::Strand;

/// Frameshift search over one CDS + 3'UTR region.
///
/// At every downstream codon boundary the frame is re-spliced by
/// δ ∈ {±1, ±2} and the continuation re-translated; only matches
/// straddling the shift point are accepted. `region_seq` starts at the
/// CDS and runs to the transcript end (already reversed for decoys).
#[allow(clippy::too_many_arguments)]
pub(crate) fn search_frameshift(
    origin: &str,
    transcript: &Transcript,
    provider: &dyn SequenceProvider,
    region_seq: &[u8],
    cds_t_start: u64,
    decoy: bool,
    automaton: &KeywordAutomaton<Prepared>,
) -> Result<(), PeplocusError> {
    let context = automaton.max_len().saturating_sub(1);
    if context == 0 {
        return Ok(());
    }
    let region_len = region_seq.len();
    let protein = translate_frame(region_seq, 0);

    for c in 1..protein.len() {
        let boundary = 3 * c;
        let left_from = c.saturating_sub(context);
        let left = &protein[left_from..c];
        for &delta in &FRAMESHIFT_DELTAS {
            let resume = boundary as i64 + delta;
            if resume < 0 || resume as usize >= region_len {
                continue;
            }
            let resume = resume as usize;
            let take = (3 * context).min(region_len - resume);
            let right = translate_frame(&region_seq[resume..resume + take], 0);

            let mut stream = left.to_vec();
            stream.extend_from_slice(&right);
            for (pattern, end) in automaton.find_in(&stream) {
                let keyword = &automaton.entry(pattern).keyword;
                let start = end - keyword.len();
                if start >= left.len() || end <= left.len() {
                    continue; // must straddle the shift point
                }
                let left_aa = left.len() - start;
                let right_aa = end - left.len();
                let li = (boundary - 3 * left_aa, boundary);
                let ri = (resume, resume + 3 * right_aa);
                let (first, second, transform) = if decoy {
                    (
                        (region_len - ri.1, region_len - ri.0),
                        (region_len - li.1, region_len - li.0),
                        DecoyTransform::ReverseNucleotide,
                    )
                } else {
                    (li, ri, DecoyTransform::None)
                };
                let intervals = [
                    (
                        cds_t_start + first.0 as u64,
                        cds_t_start + first.1 as u64,
                    ),
                    (
                        cds_t_start + second.0 as u64,
                        cds_t_start + second.1 as u64,
                    ),
                ];
                let provenance = format!("fs{delta:+}@{}", cds_t_start + boundary as u64);
                let hit = map_transcript_parts(
                    origin, transcript, provider, &intervals, keyword, provenance, transform,
                    None,
                )?;
                append_hit(automaton, pattern, hit);
            }
        }
    }
    Ok(())
}

/// Cis-splicing search over one CDS protein.
///
/// All left+right part pairs with intervening distance 1..=`max_gap`
/// residues are concatenated; only matches straddling the join survive.
#[allow(clippy::too_many_arguments)]
pub(crate) fn search_spliced(
    origin: &str,
    transcript: &Transcript,
    provider: &dyn SequenceProvider,
    protein: &[u8],
    cds_t_start: u64,
    max_gap: usize,
    decoy: bool,
    automaton: &KeywordAutomaton<Prepared>,
) -> Result<(), PeplocusError> {
    let context = automaton.max_len().saturating_sub(1);
    if context == 0 {
        return Ok(());
    }
    let n = protein.len();

    for cut in 1..n {
        let left_from = cut.saturating_sub(context);
        let left = &protein[left_from..cut];
        for gap in 1..=max_gap {
            let resume = cut + gap;
            if resume >= n {
                break;
            }
            let right = &protein[resume..(resume + context).min(n)];
            let mut stream = left.to_vec();
            stream.extend_from_slice(right);
            for (pattern, end) in automaton.find_in(&stream) {
                let keyword = &automaton.entry(pattern).keyword;
                let start = end - keyword.len();
                if start >= left.len() || end <= left.len() {
                    continue; // must straddle the join
                }
                let left_aa = left.len() - start;
                let right_aa = end - left.len();
                let li = (cut - left_aa, cut);
                let ri = (resume, resume + right_aa);
                let (first, second, transform) = if decoy {
                    (
                        (n - ri.1, n - ri.0),
                        (n - li.1, n - li.0),
                        DecoyTransform::ReverseResidue,
                    )
                } else {
                    (li, ri, DecoyTransform::None)
                };
                let intervals = [
                    (
                        cds_t_start + 3 * first.0 as u64,
                        cds_t_start + 3 * first.1 as u64,
                    ),
                    (
                        cds_t_start + 3 * second.0 as u64,
                        cds_t_start + 3 * second.1 as u64,
                    ),
                ];
                // Two colon-delimited location tokens mark a spliced hit
                let provenance = format!(
                    "{}-{}:{}-{}",
                    intervals[0].0, intervals[0].1, intervals[1].0, intervals[1].1
                );
                let hit = map_transcript_parts(
                    origin, transcript, provider, &intervals, keyword, provenance, transform,
                    None,
                )?;
                append_hit(automaton, pattern, hit);
            }
        }
    }
    Ok(())
}

/// Substitution search over one CDS protein.
///
/// One substitution at every position over the fixed 19-letter alphabet
/// (isoleucine excluded); only matches covering the substituted position
/// survive.
pub(crate) fn search_substitution(
    origin: &str,
    transcript: &Transcript,
    provider: &dyn SequenceProvider,
    protein: &[u8],
    cds_t_start: u64,
    decoy: bool,
    automaton: &KeywordAutomaton<Prepared>,
) -> Result<(), PeplocusError> {
    let context = automaton.max_len().saturating_sub(1);
    if context == 0 {
        return Ok(());
    }
    let n = protein.len();

    for position in 0..n {
        let original = protein[position];
        if !is_residue(original) {
            continue; // stops and unknowns are not substitutable
        }
        let from = position.saturating_sub(context);
        let to = (position + context + 1).min(n);
        let mut buffer = protein[from..to].to_vec();
        let local = position - from;
        for &alt in SUBSTITUTION_ALPHABET {
            if alt == original {
                continue;
            }
            buffer[local] = alt;
            for (pattern, end) in automaton.find_in(&buffer) {
                let keyword = &automaton.entry(pattern).keyword;
                let start = end - keyword.len();
                if !(start <= local && local < end) {
                    continue; // must cover the substituted position
                }
                let interval = (from + start, from + end);
                let substituted = local - start;
                let (interval, transform) = if decoy {
                    (
                        (n - interval.1, n - interval.0),
                        DecoyTransform::ReverseResidue,
                    )
                } else {
                    (interval, DecoyTransform::None)
                };
                let intervals = [(
                    cds_t_start + 3 * interval.0 as u64,
                    cds_t_start + 3 * interval.1 as u64,
                )];
                let provenance =
                    format!("p.{}{}{}", original as char, position + 1, alt as char);
                let hit = map_transcript_parts(
                    origin,
                    transcript,
                    provider,
                    &intervals,
                    keyword,
                    provenance,
                    transform,
                    Some(substituted),
                )?;
                append_hit(automaton, pattern, hit);
            }
        }
    }
    Ok(())
}

/// Extra amino-acid database search.
///
/// Hits anchor on the reserved `extra` pseudo-reference with amino-acid
/// coordinates; the sequence name travels in the provenance.
pub(crate) fn search_extra(
    name: &str,
    seq: &[u8],
    decoy: bool,
    automaton: &KeywordAutomaton<Prepared>,
) {
    let policy = if decoy {
        DecoyPolicy::Shuffle
    } else {
        DecoyPolicy::None
    };
    for (pattern, end) in automaton.find_in(seq) {
        let keyword = &automaton.entry(pattern).keyword;
        let start = end - keyword.len();
        let hit = GenomicHit {
            region: GenomicRegion::contiguous(
                decoy_reference(PSEUDO_EXTRA, policy),
                Strand::Forward,
                start as u64,
                end as u64,
            ),
            keyword: keyword.clone(),
            provenance: name.to_string(),
            origin: PSEUDO_EXTRA.to_string(),
            frame: 0,
        };
        append_hit(automaton, pattern, hit);
    }
}

/// Matched keyword set of one read across all six frames
fn read_matches(read: &[u8], automaton: &KeywordAutomaton<Prepared>) -> HashSet<usize> {
    let mut matched = HashSet::new();
    let rc = reverse_complement(read);
    for seq in [read, rc.as_slice()] {
        for frame in 0..3 {
            let residues = translate_frame(seq, frame);
            for (pattern, _end) in automaton.find_in(&residues) {
                matched.insert(pattern);
            }
        }
    }
    matched
}

/// Read-support counting: no coordinates, only per-keyword atomic
/// target/decoy counters.
pub(crate) fn search_reads(reads: &[Vec<u8>], automaton: &KeywordAutomaton<Prepared>) {
    for read in reads {
        for pattern in read_matches(read, automaton) {
            automaton.entry(pattern).read_support.add_target();
        }
        let label = String::from_utf8_lossy(read).to_string();
        let decoy_read = shuffled(read, shuffle_seed(&label, 3));
        for pattern in read_matches(&decoy_read, automaton) {
            automaton.entry(pattern).read_support.add_decoy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyword::KeywordAutomaton;
    use crate::provider::{InMemoryProvider, TranscriptSource};
    use crate::types::RegionPart;

    const SAMPLER_NT: &[u8] = b"TCTGCTATGCCTCTTGAACGT";

    fn automaton_with(peptides: &[&str]) -> KeywordAutomaton<Prepared> {
        let mut automaton = KeywordAutomaton::new();
        for (i, p) in peptides.iter().enumerate() {
            automaton.insert_call(i, p).unwrap();
        }
        automaton.prepare().unwrap()
    }

    /// Single-exon forward transcript whose CDS is the whole sequence
    fn plain_transcript(len: u64) -> Transcript {
        Transcript {
            id: "T1".to_string(),
            gene_id: "G1".to_string(),
            reference: "chr1".to_string(),
            strand: Strand::Forward,
            exons: vec![RegionPart::new(0, len)],
            cds: Some(RegionPart::new(0, len)),
            source: TranscriptSource::Curated,
            cds_complete: true,
        }
    }

    fn provider_with(seq: &[u8]) -> InMemoryProvider {
        let mut provider = InMemoryProvider::new();
        provider.add_sequence("chr1", seq.to_vec()).unwrap();
        provider
    }

    fn hits_of(automaton: &KeywordAutomaton<Prepared>, keyword: &str) -> Vec<GenomicHit> {
        let index = automaton.keyword_index(keyword).unwrap();
        automaton.entry(index).hits.lock().unwrap().clone()
    }

    #[test]
    fn test_frameshift_plus_one_found() {
        // Genome: SAMP in frame, one inserted base, then LER continuing in
        // the +1 frame. The peptide exists only across the shift.
        let mut genome = SAMPLER_NT[..12].to_vec();
        genome.push(b'G'); // the frame-breaking base
        genome.extend_from_slice(&SAMPLER_NT[12..]);
        genome.extend_from_slice(b"TAA");
        let provider = provider_with(&genome);
        let transcript = plain_transcript(genome.len() as u64);
        let automaton = automaton_with(&["SAMPLER"]);

        search_frameshift(
            "genome",
            &transcript,
            &provider,
            &genome,
            0,
            false,
            &automaton,
        )
        .unwrap();

        let hits = hits_of(&automaton, "SAMPLER");
        assert_eq!(hits.len(), 1);
        let hit = &hits[0];
        assert_eq!(
            hit.region.parts,
            vec![RegionPart::new(0, 12), RegionPart::new(13, 22)]
        );
        assert!(hit.provenance.starts_with("fs+1@"));
        // The shift-sized gap keeps the region compact but non-multiple-of-3
        assert!(hit.region.is_compact());
        assert_ne!(hit.region.span_len() % 3, 0);
    }

    #[test]
    fn test_frameshift_decoy_round_trip() {
        let mut genome = SAMPLER_NT[..12].to_vec();
        genome.push(b'G');
        genome.extend_from_slice(&SAMPLER_NT[12..]);
        genome.extend_from_slice(b"TAA");
        let provider = provider_with(&genome);
        let transcript = plain_transcript(genome.len() as u64);
        // The decoy stream reverses the nucleotides, so search for whatever
        // the reversed region yields across a -1 shift; validation inside
        // map_transcript_parts must accept every produced hit.
        let automaton = automaton_with(&["SAMPLER"]);
        let reversed_region: Vec<u8> = genome.iter().rev().copied().collect();
        search_frameshift(
            "genome",
            &transcript,
            &provider,
            &reversed_region,
            0,
            true,
            &automaton,
        )
        .unwrap();
        for hit in hits_of(&automaton, "SAMPLER") {
            assert!(hit.region.is_decoy());
        }
    }

    #[test]
    fn test_frameshift_requires_straddle() {
        // The peptide sits wholly before any shift point: no hit
        let mut genome = SAMPLER_NT.to_vec();
        genome.extend_from_slice(b"GGGTTTAAACCCGGGTTTAAA");
        let provider = provider_with(&genome);
        let transcript = plain_transcript(genome.len() as u64);
        let automaton = automaton_with(&["SAMPLER"]);
        search_frameshift(
            "genome",
            &transcript,
            &provider,
            &genome,
            0,
            false,
            &automaton,
        )
        .unwrap();
        assert!(hits_of(&automaton, "SAMPLER").is_empty());
    }

    #[test]
    fn test_spliced_join_found() {
        // SAMP ... (9 intervening residues) ... LER within one protein
        let protein = b"GGGSAMPWWWCCCWWWLERGGG".to_vec();
        let nt: Vec<u8> = protein
            .iter()
            .map(|&aa| codon_for(aa))
            .collect::<Vec<_>>()
            .concat();
        let provider = provider_with(&nt);
        let transcript = plain_transcript(nt.len() as u64);
        let automaton = automaton_with(&["SAMPLER"]);

        search_spliced(
            "genome",
            &transcript,
            &provider,
            &protein,
            0,
            25,
            false,
            &automaton,
        )
        .unwrap();

        let hits = hits_of(&automaton, "SAMPLER");
        assert_eq!(hits.len(), 1);
        let hit = &hits[0];
        // SAMP at aa 3..7 and LER at aa 16..19, times three in nucleotides
        assert_eq!(
            hit.region.parts,
            vec![RegionPart::new(9, 21), RegionPart::new(48, 57)]
        );
        // Spliced provenance carries two colon-delimited location tokens
        assert_eq!(hit.provenance.split(':').count(), 2);
        assert!(!hit.region.is_compact());
    }

    #[test]
    fn test_spliced_gap_bound_respected() {
        let protein = b"GGGSAMPWWWCCCWWWLERGGG".to_vec();
        let nt: Vec<u8> = protein
            .iter()
            .map(|&aa| codon_for(aa))
            .collect::<Vec<_>>()
            .concat();
        let provider = provider_with(&nt);
        let transcript = plain_transcript(nt.len() as u64);
        let automaton = automaton_with(&["SAMPLER"]);
        // The real gap is 9 residues; a bound of 5 must find nothing
        search_spliced(
            "genome",
            &transcript,
            &provider,
            &protein,
            0,
            5,
            false,
            &automaton,
        )
        .unwrap();
        assert!(hits_of(&automaton, "SAMPLER").is_empty());
    }

    #[test]
    fn test_substitution_found_with_notation() {
        // Genome encodes SAMPWER; the substitution W->L recovers SAMPLER
        let protein = b"GGGSAMPWERGGG".to_vec();
        let nt: Vec<u8> = protein
            .iter()
            .map(|&aa| codon_for(aa))
            .collect::<Vec<_>>()
            .concat();
        let provider = provider_with(&nt);
        let transcript = plain_transcript(nt.len() as u64);
        let automaton = automaton_with(&["SAMPLER"]);

        search_substitution(
            "genome",
            &transcript,
            &provider,
            &protein,
            0,
            false,
            &automaton,
        )
        .unwrap();

        let hits = hits_of(&automaton, "SAMPLER");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].provenance, "p.W8L");
        assert_eq!(hits[0].region.parts, vec![RegionPart::new(9, 30)]);
    }

    #[test]
    fn test_substitution_skips_isoleucine_target() {
        // I is excluded from the alphabet: recovering SAMPIER via W->I is
        // impossible, but the SAMPLER sibling keyword covers it via W->L.
        let protein = b"GGGSAMPWERGGG".to_vec();
        let nt: Vec<u8> = protein
            .iter()
            .map(|&aa| codon_for(aa))
            .collect::<Vec<_>>()
            .concat();
        let provider = provider_with(&nt);
        let transcript = plain_transcript(nt.len() as u64);
        let automaton = automaton_with(&["SAMPIER"]);

        search_substitution(
            "genome",
            &transcript,
            &provider,
            &protein,
            0,
            false,
            &automaton,
        )
        .unwrap();

        assert!(hits_of(&automaton, "SAMPIER").is_empty());
        let sibling = hits_of(&automaton, "SAMPLER");
        assert_eq!(sibling.len(), 1);
        assert_eq!(sibling[0].provenance, "p.W8L");
    }

    #[test]
    fn test_extra_search_coordinates() {
        let automaton = automaton_with(&["SAMPLER"]);
        search_extra("prot1", b"AASAMPLERAA", false, &automaton);
        let hits = hits_of(&automaton, "SAMPLER");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].region.parts, vec![RegionPart::new(2, 9)]);
        assert_eq!(hits[0].provenance, "prot1");
        assert!(!hits[0].is_decoy());
    }

    #[test]
    fn test_read_counting_deduplicates_frames() {
        let automaton = automaton_with(&["KKKKK"]);
        // Poly-A read matches KKKKK in several frames and positions but
        // counts once per read
        let reads = vec![vec![b'A'; 30]];
        search_reads(&reads, &automaton);
        let index = automaton.keyword_index("KKKKK").unwrap();
        assert_eq!(automaton.entry(index).read_support.target(), 1);
    }

    /// One fixed codon per residue, for building test genomes
    fn codon_for(aa: u8) -> Vec<u8> {
        match aa {
            b'A' => b"GCT".to_vec(),
            b'C' => b"TGT".to_vec(),
            b'E' => b"GAA".to_vec(),
            b'G' => b"GGA".to_vec(),
            b'L' => b"CTT".to_vec(),
            b'M' => b"ATG".to_vec(),
            b'P' => b"CCT".to_vec(),
            b'R' => b"CGT".to_vec(),
            b'S' => b"TCT".to_vec(),
            b'W' => b"TGG".to_vec(),
            _ => b"GGG".to_vec(),
        }
    }
}
