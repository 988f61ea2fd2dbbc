//! Collation orchestration.
//!
//! This module coordinates one collation request end to end: fetching
//! readings, folding witnesses, aligning, and analyzing variants. Each
//! request builds its own witnesses and table; nothing is shared across calls.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use thiserror::Error;
use tracing::info;

use crate::align::align_witnesses;
use crate::config::{CollationParams, ConfigError};
use crate::models::{CollationResult, ParallelReading, ReferenceUnit, WitnessReadings};
use crate::source::ReadingSource;
use crate::variants::analyze_table;
use crate::witness::{build_witnesses, group_by_witness, MalformedInputError};

#[derive(Error, Debug)]
pub enum CollationError {
    #[error("Malformed input: {0}")]
    MalformedInput(#[from] MalformedInputError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Reading source error: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Collate already-grouped witnesses.
pub fn collate_witnesses(
    witnesses: &[WitnessReadings],
    reference: Option<&ReferenceUnit>,
    params: &CollationParams,
) -> Result<CollationResult, CollationError> {
    params.validate()?;

    let texts = build_witnesses(witnesses, params)?;
    let table = align_witnesses(&texts, params);
    let variants = analyze_table(&table);

    info!(
        reference = %reference.map(ToString::to_string).unwrap_or_else(|| "-".to_string()),
        witnesses = texts.len(),
        columns = table.columns.len(),
        variant_columns = table.variant_count(),
        variant_pairs = variants.len(),
        "collation complete"
    );

    Ok(CollationResult {
        version: env!("CARGO_PKG_VERSION").to_string(),
        reference: reference.cloned(),
        parameters: params.clone(),
        witnesses: texts,
        table,
        variants,
    })
}

/// Collate parallel-lookup rows, grouping them by witness first.
pub fn collate_rows(
    rows: Vec<ParallelReading>,
    reference: Option<&ReferenceUnit>,
    params: &CollationParams,
) -> Result<CollationResult, CollationError> {
    let witnesses = group_by_witness(rows)?;
    collate_witnesses(&witnesses, reference, params)
}

/// Fetch the parallels of a reference unit and collate them.
pub fn collate_reference<S: ReadingSource>(
    source: &S,
    reference: &ReferenceUnit,
    params: &CollationParams,
) -> Result<CollationResult, CollationError> {
    let rows = source
        .parallel_readings(reference)
        .map_err(|e| CollationError::Source(Box::new(e)))?;
    collate_rows(rows, Some(reference), params)
}

/// Collate many reference units.
///
/// Readings are fetched sequentially (sources need not be thread-safe), then
/// each reference is collated independently in parallel. Results come back in
/// input order.
pub fn collate_references<S: ReadingSource>(
    source: &S,
    references: &[ReferenceUnit],
    params: &CollationParams,
    show_progress: bool,
) -> Vec<(ReferenceUnit, Result<CollationResult, CollationError>)> {
    let fetched: Vec<(ReferenceUnit, Result<Vec<ParallelReading>, CollationError>)> = references
        .iter()
        .map(|reference| {
            let rows = source
                .parallel_readings(reference)
                .map_err(|e| CollationError::Source(Box::new(e)));
            (reference.clone(), rows)
        })
        .collect();

    let progress = if show_progress {
        let pb = ProgressBar::new(fetched.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let results: Vec<(ReferenceUnit, Result<CollationResult, CollationError>)> = fetched
        .into_par_iter()
        .map(|(reference, rows)| {
            let result = rows.and_then(|rows| collate_rows(rows, Some(&reference), params));

            if let Some(ref pb) = progress {
                pb.inc(1);
            }

            (reference, result)
        })
        .collect();

    if let Some(pb) = progress {
        pb.finish_with_message("Done");
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GuessedType, Reading, Separator};
    use crate::source::MemorySource;

    fn words(witness: &str, text: &str) -> Vec<ParallelReading> {
        text.split_whitespace()
            .enumerate()
            .map(|(i, w)| ParallelReading {
                witness: witness.to_string(),
                reading: Reading::new(w, Separator::Space, i as u32 + 1),
            })
            .collect()
    }

    #[test]
    fn test_collate_reference_from_source() {
        let reference = ReferenceUnit::new("1QIsa", "1", "1");
        let mut rows = words("1QIsa", "חזון ישעיהו בן אמוץ");
        rows.extend(words("4QIsa", "חזון ישעיה בן אמוץ"));
        let source = MemorySource::new().with_readings(reference.clone(), rows);

        let result = collate_reference(&source, &reference, &CollationParams::default()).unwrap();
        assert_eq!(result.table.witnesses, vec!["1QIsa", "4QIsa"]);
        assert_eq!(result.variants.len(), 1);
        let record = result.variants.values().next().unwrap();
        assert_eq!(record.guessed_type, GuessedType::Unknown);
        assert_eq!(record.distance, 1);
        assert_eq!(result.reference, Some(reference));
    }

    #[test]
    fn test_empty_source_is_malformed() {
        let source = MemorySource::new();
        let err = collate_reference(
            &source,
            &ReferenceUnit::new("x", "1", "1"),
            &CollationParams::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CollationError::MalformedInput(MalformedInputError::EmptyWitnessSet)
        ));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = CollationParams {
            edit_cost: 0,
            ..Default::default()
        };
        let err = collate_rows(words("A", "a"), None, &params).unwrap_err();
        assert!(matches!(err, CollationError::Config(_)));
    }

    #[test]
    fn test_collate_references_keeps_input_order() {
        let r1 = ReferenceUnit::new("A", "1", "1");
        let r2 = ReferenceUnit::new("A", "1", "2");
        let r3 = ReferenceUnit::new("A", "1", "3");
        let mut rows = words("A", "a b");
        rows.extend(words("B", "a c"));
        let source = MemorySource::new()
            .with_readings(r1.clone(), rows)
            .with_readings(r3.clone(), words("A", "x"));

        let results = collate_references(
            &source,
            &[r1.clone(), r2.clone(), r3.clone()],
            &CollationParams::default(),
            false,
        );
        let order: Vec<&ReferenceUnit> = results.iter().map(|(r, _)| r).collect();
        assert_eq!(order, vec![&r1, &r2, &r3]);
        assert_eq!(results[0].1.as_ref().unwrap().variants.len(), 1);
        assert!(results[1].1.is_err());
        assert!(results[2].1.as_ref().unwrap().variants.is_empty());
    }
}
