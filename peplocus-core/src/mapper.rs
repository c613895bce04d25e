//! Match-offset to genomic-coordinate mapping.
//!
//! Translator offsets are exact window offsets; getting back to genome
//! space is a matter of reflecting them for reverse strands and reverse
//! decoys (the two reflections cancel when both apply) and, for
//! transcript-anchored units, pushing intervals through the exon model into
//! possibly multi-part genomic regions.
//!
//! Frameshift, spliced and substitution placements are validated by
//! re-extracting the mapped parts from the provider and re-translating
//! them against the matched keyword; a mismatch is fatal since it would
//! poison every downstream statistic.

use bio::bio_types::strand::Strand;

use crate::constants::DECOY_PREFIX;
use crate::provider::{SequenceProvider, Transcript};
use crate::sequence::{reverse_complement, reversed, translate_frame};
use crate::translate::TranslatedMatch;
use crate::types::{DecoyPolicy, GenomicHit, GenomicRegion, PeplocusError, RegionPart};

/// Reference name for a hit under the given decoy policy
#[must_use]
pub fn decoy_reference(reference: &str, policy: DecoyPolicy) -> String {
    if policy.is_decoy() {
        format!("{DECOY_PREFIX}{reference}")
    } else {
        reference.to_string()
    }
}

/// Reflects a half-open interval within a sequence of length `len`
#[must_use]
pub const fn reflect_interval(len: usize, start: usize, end: usize) -> (usize, usize) {
    (len - end, len - start)
}

/// Maps one plain-window match to its genomic hit.
///
/// The window offsets are reflected once for a reverse-strand unit and once
/// for a reverse decoy; shuffle decoys keep shuffled-space offsets, which
/// stay reproducible through the deterministic per-unit seed.
#[must_use]
pub fn map_genomic(
    origin: &str,
    reference: &str,
    window_start: u64,
    window_len: usize,
    strand: Strand,
    policy: DecoyPolicy,
    tm: &TranslatedMatch,
    keyword: &str,
) -> GenomicHit {
    let reflect = (strand == Strand::Reverse) != (policy == DecoyPolicy::Reverse);
    let (start, end) = if reflect {
        reflect_interval(window_len, tm.ref_start, tm.ref_end)
    } else {
        (tm.ref_start, tm.ref_end)
    };
    let abs_start = window_start + start as u64;
    let abs_end = window_start + end as u64;
    // Absolute frame: window-relative lanes would make the same hit differ
    // between overlapping windows and defeat deduplication
    let frame = match strand {
        Strand::Reverse => (abs_end % 3) as u8,
        _ => (abs_start % 3) as u8,
    };
    GenomicHit {
        region: GenomicRegion::contiguous(
            decoy_reference(reference, policy),
            strand,
            abs_start,
            abs_end,
        ),
        keyword: keyword.to_string(),
        provenance: tm.variants.join(";"),
        origin: origin.to_string(),
        frame,
    }
}

/// Maps a spliced-transcript match into genomic space.
///
/// Returns `None` when the mapped region does not actually cross a splice
/// boundary: single-exon placements are already covered by the plain
/// genomic windows and would double-report.
#[must_use]
pub fn map_transcript_junction(
    origin: &str,
    transcript: &Transcript,
    policy: DecoyPolicy,
    tm: &TranslatedMatch,
    keyword: &str,
) -> Option<GenomicHit> {
    let spliced_len = transcript.spliced_len() as usize;
    let (start, end) = if policy == DecoyPolicy::Reverse {
        reflect_interval(spliced_len, tm.ref_start, tm.ref_end)
    } else {
        (tm.ref_start, tm.ref_end)
    };
    let parts = transcript.transcript_to_genomic(start as u64, end as u64)?;
    if parts.len() < 2 {
        return None;
    }
    Some(GenomicHit {
        region: GenomicRegion {
            reference: decoy_reference(&transcript.reference, policy),
            strand: transcript.strand,
            parts,
        },
        keyword: keyword.to_string(),
        provenance: format!("tx={}", transcript.id),
        origin: origin.to_string(),
        frame: tm.frame,
    })
}

/// Decoy transform of a transcript-anchored special-mode unit.
///
/// Frameshift units reverse the nucleotide region (the matcher re-splices
/// raw codons); spliced and substitution units reverse the translated
/// residue string. Validation has to undo the same transform it searched
/// under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoyTransform {
    None,
    ReverseNucleotide,
    ReverseResidue,
}

impl DecoyTransform {
    #[must_use]
    pub const fn is_decoy(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Places flanking transcript-space intervals independently, unions them
/// into one multi-part region, and validates the union.
///
/// `intervals` are nucleotide intervals in transcript coordinates, in
/// transcript (5'→3') order. For decoys the caller passes the
/// already-reflected real intervals; validation re-applies the decoy
/// transform to the extracted sequence. `substituted` permits one mismatch
/// at the given keyword offset (substitution hits differ from the genome
/// at exactly that residue).
///
/// # Errors
///
/// [`PeplocusError::CoordinateValidation`] when the union does not
/// reproduce the matched keyword.
#[allow(clippy::too_many_arguments)]
pub fn map_transcript_parts(
    origin: &str,
    transcript: &Transcript,
    provider: &dyn SequenceProvider,
    intervals: &[(u64, u64)],
    keyword: &str,
    provenance: String,
    transform: DecoyTransform,
    substituted: Option<usize>,
) -> Result<GenomicHit, PeplocusError> {
    let mut all_parts: Vec<RegionPart> = Vec::new();
    let mut extracted: Vec<u8> = Vec::new();

    for &(t_start, t_end) in intervals {
        let parts = transcript
            .transcript_to_genomic(t_start, t_end)
            .ok_or_else(|| {
                PeplocusError::CoordinateValidation(format!(
                    "transcript {}: interval {t_start}-{t_end} outside the exon model",
                    transcript.id
                ))
            })?;
        let mut interval_seq = Vec::new();
        for p in &parts {
            interval_seq.extend(provider.sequence(&transcript.reference, p.start, p.end)?);
        }
        if transcript.strand == Strand::Reverse {
            interval_seq = reverse_complement(&interval_seq);
        }
        extracted.extend(interval_seq);
        all_parts.extend(parts);
    }
    all_parts.sort_unstable();

    if transform == DecoyTransform::ReverseNucleotide {
        extracted = reversed(&extracted);
    }
    let mut translation = translate_frame(&extracted, 0);
    if transform == DecoyTransform::ReverseResidue {
        translation.reverse();
    }
    let valid = translation.len() == keyword.len()
        && translation
            .iter()
            .zip(keyword.bytes())
            .enumerate()
            .all(|(i, (&got, expected))| got == expected || substituted == Some(i));
    if !valid {
        return Err(PeplocusError::CoordinateValidation(format!(
            "transcript {}: expected {keyword}, re-translated {}",
            transcript.id,
            String::from_utf8_lossy(&translation)
        )));
    }

    let reference = if transform.is_decoy() {
        format!("{DECOY_PREFIX}{}", transcript.reference)
    } else {
        transcript.reference.clone()
    };
    Ok(GenomicHit {
        region: GenomicRegion {
            reference,
            strand: transcript.strand,
            parts: all_parts,
        },
        keyword: keyword.to_string(),
        provenance,
        origin: origin.to_string(),
        frame: 0,
    })
}

/// Re-extracts the unit-local sequence a hit was matched in.
///
/// Concatenates the region parts from the base reference, applies the
/// strand, then the decoy policy. Translating the result in frame 0
/// reproduces the matched keyword for every variant-free hit.
pub fn region_unit_sequence(
    provider: &dyn SequenceProvider,
    hit: &GenomicHit,
    policy: DecoyPolicy,
) -> Result<Vec<u8>, PeplocusError> {
    let mut seq = Vec::new();
    for p in &hit.region.parts {
        seq.extend(provider.sequence(hit.region.base_reference(), p.start, p.end)?);
    }
    if hit.region.strand == Strand::Reverse {
        seq = reverse_complement(&seq);
    }
    if policy == DecoyPolicy::Reverse {
        seq = reversed(&seq);
    }
    Ok(seq)
}
