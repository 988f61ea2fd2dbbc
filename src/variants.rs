//! Variant analysis over an alignment table.
//!
//! Every variant column is broken down into all unordered witness pairs; each
//! pair with differing readings yields a `VariantRecord` carrying the edit
//! distance, the letters present on one side only, and a coarse guess
//! (omission when one side is empty, otherwise unknown).

use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::metrics::{compute_letter_difference, compute_levenshtein};
use crate::models::{
    AlignmentTable, Column, EnrichedVariant, GuessedType, MorphologicalAnalysis, ReferenceUnit,
    VariantMap, VariantRecord, FRAGMENTATION_PLACEHOLDER,
};
use crate::source::{MorphologyScope, MorphologySource};

/// Deterministic key for a witness pair.
pub fn pair_key(witness_1: &str, witness_2: &str) -> String {
    format!("{}-{}", witness_1, witness_2)
}

/// Every unordered pair `(i, j)` with `i < j` over `count` witnesses.
pub fn combine_pairs(count: usize) -> Vec<(usize, usize)> {
    (0..count)
        .flat_map(|i| (i + 1..count).map(move |j| (i, j)))
        .collect()
}

pub fn detect_omission(reading_1: &str, reading_2: &str) -> bool {
    reading_1.is_empty() || reading_2.is_empty()
}

/// Compare two readings of one column.
pub fn analyze_pair(
    column_index: usize,
    witness_1: &str,
    witness_2: &str,
    reading_1: &str,
    reading_2: &str,
) -> VariantRecord {
    let guessed_type = if detect_omission(reading_1, reading_2) {
        GuessedType::Omission
    } else {
        GuessedType::Unknown
    };

    VariantRecord {
        column_index,
        witness_1: witness_1.to_string(),
        witness_2: witness_2.to_string(),
        witness_pair_key: pair_key(witness_1, witness_2),
        reading_1: reading_1.to_string(),
        reading_2: reading_2.to_string(),
        distance: compute_levenshtein(reading_1, reading_2),
        letter_difference: compute_letter_difference(reading_1, reading_2),
        guessed_type,
    }
}

/// Records for one column, keyed `"{column_index}:{pair_key}"`.
///
/// Pairs whose readings are identical are skipped.
pub fn analyze_column(table: &AlignmentTable, column: &Column) -> Vec<(String, VariantRecord)> {
    let readings: Vec<String> = (0..table.witnesses.len())
        .map(|idx| column.cell_text(idx))
        .collect();

    combine_pairs(table.witnesses.len())
        .into_iter()
        .filter_map(|(i, j)| {
            let (w1, w2) = (&table.witnesses[i], &table.witnesses[j]);
            if readings[i] == readings[j] {
                debug!(column = column.index, pair = %pair_key(w1, w2), "identical readings; analysis skipped");
                return None;
            }
            let record = analyze_pair(column.index, w1, w2, &readings[i], &readings[j]);
            Some((format!("{}:{}", column.index, record.witness_pair_key), record))
        })
        .collect()
}

/// Analyze every variant column of the table.
///
/// Columns are analyzed in parallel; the map's ordering makes the result
/// independent of scheduling.
pub fn analyze_table(table: &AlignmentTable) -> VariantMap {
    table
        .columns
        .par_iter()
        .filter(|column| column.is_variant)
        .flat_map_iter(|column| analyze_column(table, column))
        .collect()
}

/// Collapse duplicate analyses (same fields and values), keeping first-seen order.
pub fn distinct_analyses(records: Vec<MorphologicalAnalysis>) -> Vec<MorphologicalAnalysis> {
    let mut seen: BTreeSet<MorphologicalAnalysis> = BTreeSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.clone()))
        .collect()
}

/// Attach morphological analyses to every token of every variant reading.
///
/// Lookups are scoped to the witness that carries the token (and to the
/// reference's chapter and verse when given). Placeholder tokens are not
/// looked up. Results are cached for the duration of the call only.
pub fn enrich_variants<S: MorphologySource>(
    variants: &VariantMap,
    reference: Option<&ReferenceUnit>,
    source: &S,
) -> Result<BTreeMap<String, EnrichedVariant>, S::Error> {
    let mut cache: HashMap<(String, String), Vec<MorphologicalAnalysis>> = HashMap::new();
    let mut enriched = BTreeMap::new();

    for (key, record) in variants {
        let mut morphology: BTreeMap<String, Vec<MorphologicalAnalysis>> = BTreeMap::new();

        for (witness, reading) in [
            (&record.witness_1, &record.reading_1),
            (&record.witness_2, &record.reading_2),
        ] {
            for token in reading.split_whitespace() {
                if token.contains(FRAGMENTATION_PLACEHOLDER) {
                    continue;
                }
                let cache_key = (witness.clone(), token.to_string());
                if !cache.contains_key(&cache_key) {
                    let scope = MorphologyScope::for_witness(witness, reference);
                    let found = distinct_analyses(source.word_analyses(token, &scope)?);
                    cache.insert(cache_key.clone(), found);
                }
                if let Some(found) = cache.get(&cache_key) {
                    morphology
                        .entry(token.to_string())
                        .or_default()
                        .extend(found.iter().cloned());
                }
            }
        }

        for analyses in morphology.values_mut() {
            *analyses = distinct_analyses(std::mem::take(analyses));
        }

        enriched.insert(
            key.clone(),
            EnrichedVariant {
                record: record.clone(),
                morphology,
            },
        );
    }

    Ok(enriched)
}
