use crate::results::RunResults;
use crate::types::PeplocusError;
use std::io::Write;

/// Writes the FDR statistics table, one row per stratum and score bin
pub fn write_stats_format<W: Write>(
    writer: &mut W,
    results: &RunResults,
) -> Result<(), PeplocusError> {
    writeln!(
        writer,
        "length\tcategory\torigin\tscore\ttargets\tdecoys\tambiguous\tcum_targets\tcum_decoys\tratio"
    )?;
    for row in &results.fdr {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.6}",
            row.length,
            row.category,
            row.origin,
            row.score,
            row.counts.target,
            row.counts.decoy,
            row.counts.ambiguous,
            row.cumulative_target,
            row.cumulative_decoy,
            row.ratio
        )?;
    }
    Ok(())
}
