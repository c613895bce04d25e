use crate::results::RunResults;
use crate::types::PeplocusError;
use std::io::Write;

/// Annotation columns appended after the input columns
const ANNOTATION_COLUMNS: [&str; 9] = [
    "rank",
    "locations",
    "decoy",
    "origin",
    "location",
    "category",
    "keyword",
    "info",
    "matched_sequence",
];

/// Writes the annotated row-per-identification table
pub fn write_rows_format<W: Write>(
    writer: &mut W,
    results: &RunResults,
) -> Result<(), PeplocusError> {
    let mut header = results.input_header.clone();
    header.extend(ANNOTATION_COLUMNS.iter().map(|c| c.to_string()));
    if results.read_mode {
        header.push("read_support_target".to_string());
        header.push("read_support_decoy".to_string());
    }
    writeln!(writer, "{}", header.join("\t"))?;

    for row in &results.rows {
        let mut fields = row.columns.clone();
        fields.push(row.rank.to_string());
        fields.push(row.location_count.to_string());
        fields.push(row.status.clone());
        fields.push(row.origin.clone());
        fields.push(row.location.clone());
        fields.push(row.category.clone());
        fields.push(row.keyword.clone());
        fields.push(row.info.clone());
        fields.push(row.matched_sequence.clone());
        if results.read_mode {
            fields.push(row.read_target.to_string());
            fields.push(row.read_decoy.to_string());
        }
        writeln!(writer, "{}", fields.join("\t"))?;
    }
    Ok(())
}
