//! Presentation of collation results (HTML, structured map, JSON, CSV, console).

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

use crate::models::{
    join_tokens, AlignmentTable, CollationResult, EnrichedVariant, ReferenceUnit, VariantMap,
};

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Requested presentation of an alignment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Html,
    Structured,
}

/// A rendered alignment table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Rendered {
    Html(String),
    Structured(BTreeMap<String, String>),
}

pub fn render(table: &AlignmentTable, mode: RenderMode) -> Rendered {
    match mode {
        RenderMode::Html => Rendered::Html(render_html(table)),
        RenderMode::Structured => Rendered::Structured(render_structured(table)),
    }
}

/// Witness -> its tokens across the table, gaps omitted.
pub fn render_structured(table: &AlignmentTable) -> BTreeMap<String, String> {
    table
        .witnesses
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let tokens: Vec<_> = table.witness_tokens(idx).into_iter().cloned().collect();
            (name.clone(), join_tokens(&tokens))
        })
        .collect()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML fragment: one row per witness, one cell per column, gaps empty,
/// inside a right-to-left container.
pub fn render_html(table: &AlignmentTable) -> String {
    let mut html = String::from("<div class=\"collation\" dir=\"rtl\">\n<table>\n");

    for (idx, witness) in table.witnesses.iter().enumerate() {
        html.push_str("<tr>");
        html.push_str(&format!("<th>{}</th>", escape_html(witness)));
        for column in &table.columns {
            let class = if column.is_variant { "variant" } else { "invariant" };
            html.push_str(&format!(
                "<td class=\"{}\">{}</td>",
                class,
                escape_html(&column.cell_text(idx))
            ));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</table>\n</div>\n");
    html
}

/// Standalone HTML page around the collation table.
pub fn render_html_page(table: &AlignmentTable, reference: Option<&ReferenceUnit>) -> String {
    let heading = match reference {
        Some(r) => format!(
            "Collation for <b>{}</b> chapter <b>{}</b> verse <b>{}</b>",
            escape_html(&r.tradition),
            escape_html(&r.chapter),
            escape_html(&r.verse)
        ),
        None => "Collation".to_string(),
    };

    format!(
        r##"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Collation</title>
    <style>
        th, td {{ border-style: dotted; border-color: #96D4D4; padding: 0.2em 0.5em; }}
        td.variant {{ background: #FFF4D6; }}
        .collation {{ display: flex; flex-direction: column; align-items: center; }}
    </style>
</head>
<body>
{heading}
{table}</body>
</html>
"##,
        heading = heading,
        table = render_html(table)
    )
}

/// Write the HTML page to a file.
pub fn write_html_file(result: &CollationResult, path: &Path) -> Result<(), OutputError> {
    let html = render_html_page(&result.table, result.reference.as_ref());
    std::fs::write(path, html)?;
    Ok(())
}

/// Write a collation result as JSON.
pub fn write_json<W: Write>(result: &CollationResult, writer: &mut W) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(result)?;
    writer.write_all(json.as_bytes())?;
    Ok(())
}

/// Write a collation result as JSON to a file.
pub fn write_json_file(result: &CollationResult, path: &Path) -> Result<(), OutputError> {
    let mut file = std::fs::File::create(path)?;
    write_json(result, &mut file)
}

/// Write morphology-enriched variants as JSON.
pub fn write_enriched_json<W: Write>(
    enriched: &BTreeMap<String, EnrichedVariant>,
    writer: &mut W,
) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(enriched)?;
    writer.write_all(json.as_bytes())?;
    Ok(())
}

pub fn write_enriched_json_file(
    enriched: &BTreeMap<String, EnrichedVariant>,
    path: &Path,
) -> Result<(), OutputError> {
    let mut file = std::fs::File::create(path)?;
    write_enriched_json(enriched, &mut file)
}

fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// Write variant records as CSV.
pub fn write_variants_csv<W: Write>(variants: &VariantMap, writer: &mut W) -> Result<(), OutputError> {
    writeln!(
        writer,
        "key,column_index,witness_1,witness_2,reading_1,reading_2,distance,letter_difference,guessed_type"
    )?;

    for (key, record) in variants {
        let letters: String = record.letter_difference.iter().collect();
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{}",
            csv_field(key),
            record.column_index,
            csv_field(&record.witness_1),
            csv_field(&record.witness_2),
            csv_field(&record.reading_1),
            csv_field(&record.reading_2),
            record.distance,
            csv_field(&letters),
            record.guessed_type
        )?;
    }

    Ok(())
}

/// Write variant records as CSV to a file.
pub fn write_variants_csv_file(variants: &VariantMap, path: &Path) -> Result<(), OutputError> {
    let mut file = std::fs::File::create(path)?;
    write_variants_csv(variants, &mut file)
}

/// Plain-text alignment table, one line per witness, cells separated by `|`.
pub fn format_table(table: &AlignmentTable) -> String {
    let name_width = table
        .witnesses
        .iter()
        .map(|w| w.chars().count())
        .max()
        .unwrap_or(0);
    let widths: Vec<usize> = table
        .columns
        .iter()
        .map(|column| {
            (0..table.witnesses.len())
                .map(|idx| column.cell_text(idx).chars().count())
                .max()
                .unwrap_or(0)
                .max(1)
        })
        .collect();

    let pad = |text: &str, width: usize| {
        let len = text.chars().count();
        format!("{}{}", text, " ".repeat(width.saturating_sub(len)))
    };

    let mut out = String::new();
    for (idx, witness) in table.witnesses.iter().enumerate() {
        out.push_str(&pad(witness, name_width));
        for (column, &width) in table.columns.iter().zip(&widths) {
            let cell = column.cell_text(idx);
            let cell = if cell.is_empty() { "-".to_string() } else { cell.replace('\n', " ") };
            out.push_str(" | ");
            out.push_str(&pad(&cell, width));
        }
        out.push('\n');
    }

    let markers: String = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(column, &width)| {
            let mark = if column.is_variant { "^" } else { " " };
            format!("   {}", pad(mark, width))
        })
        .collect();
    out.push_str(&pad("", name_width));
    out.push_str(markers.trim_end());
    out.push('\n');

    out
}

pub fn print_table(table: &AlignmentTable) {
    print!("{}", format_table(table));
}

/// Summary report of a collation.
pub fn format_summary(result: &CollationResult) -> String {
    let mut out = String::from("\n=== Collation Summary ===\n");
    out.push_str(&format!("Version: {}\n", result.version));
    if let Some(reference) = &result.reference {
        out.push_str(&format!("Reference: {}\n", reference));
    }
    out.push_str("\nWitnesses:\n");
    for witness in &result.witnesses {
        out.push_str(&format!("  {} ({} tokens)\n", witness.name, witness.tokens.len()));
    }
    let params = &result.parameters;
    out.push_str("\nParameters:\n");
    out.push_str(&format!("  Keep reconstructed: {}\n", params.keep_reconstructed));
    out.push_str(&format!("  Strip vowels: {}\n", params.strip_vowels));
    out.push_str(&format!("  Segmentation: {}\n", params.segmentation));
    out.push_str(&format!("  Near match: {}\n", params.near_match));
    out.push_str("\nResults:\n");
    out.push_str(&format!("  Columns: {}\n", result.table.columns.len()));
    out.push_str(&format!("  Variant columns: {}\n", result.table.variant_count()));
    out.push_str(&format!("  Variant pairs: {}\n", result.variants.len()));
    out
}

/// Print a summary report to stdout.
pub fn print_summary(result: &CollationResult) {
    print!("{}", format_summary(result));
}

/// Variant records in a human-readable format, at most `limit` of them.
pub fn format_variants(variants: &VariantMap, limit: Option<usize>) -> String {
    let total = variants.len();
    let shown = limit.unwrap_or(total).min(total);

    let mut out = String::new();
    for (key, record) in variants.iter().take(shown) {
        let letters: String = record.letter_difference.iter().collect();
        out.push_str(&format!(
            "{}: {:?} ↔ {:?}  distance={} letters=[{}] type={}\n",
            key, record.reading_1, record.reading_2, record.distance, letters, record.guessed_type
        ));
    }

    if shown < total {
        out.push_str(&format!("... and {} more variants\n", total - shown));
    }
    out
}

/// Print variant records to stdout.
pub fn print_variants(variants: &VariantMap, limit: Option<usize>) {
    print!("{}", format_variants(variants, limit));
}
