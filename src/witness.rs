//! Folding per-reading records into one text per witness.

use crate::config::CollationParams;
use crate::models::{ParallelReading, Reading, Token, WitnessReadings, WitnessText};
use crate::normalize::normalize_reading;
use thiserror::Error;

/// Input that cannot be folded into witnesses; aborts the whole collation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedInputError {
    #[error("No witnesses supplied")]
    EmptyWitnessSet,
    #[error("Row {row} has an empty witness name")]
    UnnamedWitness { row: usize },
    #[error("Witness {0} supplied more than once")]
    DuplicateWitness(String),
    #[error("Witness {witness}: reading {found} follows reading {previous}")]
    OutOfOrder {
        witness: String,
        previous: u32,
        found: u32,
    },
    #[error("Witness {witness}: reading {sequence_in_line} has no separator tag")]
    MissingSeparator {
        witness: String,
        sequence_in_line: u32,
    },
}

/// Split folded text into tokens on whitespace and line breaks.
pub fn tokenize(text: &str) -> Vec<Token> {
    text.split_whitespace().map(Token::new).collect()
}

/// Fold one witness's readings into a single normalized string.
///
/// Readings are taken in the order given and must already be sorted by
/// `sequence_in_line`; they are checked, never re-sorted.
pub fn build_witness_text(
    name: &str,
    readings: &[Reading],
    params: &CollationParams,
) -> Result<WitnessText, MalformedInputError> {
    let mut folded = String::new();
    let mut previous: Option<u32> = None;

    for reading in readings {
        if let Some(prev) = previous {
            if reading.sequence_in_line < prev {
                return Err(MalformedInputError::OutOfOrder {
                    witness: name.to_string(),
                    previous: prev,
                    found: reading.sequence_in_line,
                });
            }
        }
        previous = Some(reading.sequence_in_line);

        let separator = reading
            .separator
            .ok_or_else(|| MalformedInputError::MissingSeparator {
                witness: name.to_string(),
                sequence_in_line: reading.sequence_in_line,
            })?;

        folded.push_str(&normalize_reading(reading, params));
        folded.push_str(separator.as_text());
    }

    let text = folded.trim().to_string();
    let tokens = tokenize(&text);

    Ok(WitnessText {
        name: name.to_string(),
        text,
        tokens,
    })
}

/// Group parallel-lookup rows by witness, keeping first-appearance order of
/// witnesses and delivery order of readings within each.
pub fn group_by_witness(
    rows: Vec<ParallelReading>,
) -> Result<Vec<WitnessReadings>, MalformedInputError> {
    let mut groups: Vec<WitnessReadings> = Vec::new();

    for (row, parallel) in rows.into_iter().enumerate() {
        if parallel.witness.trim().is_empty() {
            return Err(MalformedInputError::UnnamedWitness { row });
        }
        match groups.iter_mut().find(|g| g.name == parallel.witness) {
            Some(group) => group.readings.push(parallel.reading),
            None => groups.push(WitnessReadings {
                name: parallel.witness,
                readings: vec![parallel.reading],
            }),
        }
    }

    Ok(groups)
}

/// Build every witness of a collation request.
pub fn build_witnesses(
    witnesses: &[WitnessReadings],
    params: &CollationParams,
) -> Result<Vec<WitnessText>, MalformedInputError> {
    if witnesses.is_empty() {
        return Err(MalformedInputError::EmptyWitnessSet);
    }

    let mut built: Vec<WitnessText> = Vec::with_capacity(witnesses.len());
    for (row, witness) in witnesses.iter().enumerate() {
        if witness.name.trim().is_empty() {
            return Err(MalformedInputError::UnnamedWitness { row });
        }
        if built.iter().any(|w| w.name == witness.name) {
            return Err(MalformedInputError::DuplicateWitness(witness.name.clone()));
        }
        built.push(build_witness_text(&witness.name, &witness.readings, params)?);
    }

    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Separator;

    fn row(witness: &str, text: &str, seq: u32) -> ParallelReading {
        ParallelReading {
            witness: witness.to_string(),
            reading: Reading::new(text, Separator::Space, seq),
        }
    }

    #[test]
    fn test_fold_with_separators() {
        let readings = vec![
            Reading::new("בראשית", Separator::Space, 1),
            Reading::new("ברא", Separator::Break, 2),
            Reading::new("אל", Separator::Joined, 3),
            Reading::new("הים", Separator::Space, 4),
        ];
        let w = build_witness_text("4Q1", &readings, &CollationParams::default()).unwrap();
        assert_eq!(w.text, "בראשית ברא\nאלהים");
        let tokens: Vec<&str> = w.tokens.iter().map(Token::as_str).collect();
        assert_eq!(tokens, vec!["בראשית", "ברא", "אלהים"]);
    }

    #[test]
    fn test_trim_only_outer_whitespace() {
        let readings = vec![
            Reading::new(" a", Separator::Space, 1),
            Reading::new("b", Separator::Break, 2),
        ];
        let w = build_witness_text("A", &readings, &CollationParams::default()).unwrap();
        assert_eq!(w.text, "a b");
    }

    #[test]
    fn test_reconstructed_reading_becomes_placeholder() {
        let readings = vec![
            Reading::new("a", Separator::Space, 1),
            Reading::new("b", Separator::Space, 2).reconstructed(),
            Reading::new("[c", Separator::Space, 3),
        ];
        let params = CollationParams::default();
        let w = build_witness_text("A", &readings, &params).unwrap();
        assert_eq!(w.text, "a φ φ");

        let keep = CollationParams {
            keep_reconstructed: true,
            ..Default::default()
        };
        let w = build_witness_text("A", &readings, &keep).unwrap();
        assert_eq!(w.text, "a b [c");
    }

    #[test]
    fn test_out_of_order_rejected() {
        let readings = vec![
            Reading::new("a", Separator::Space, 2),
            Reading::new("b", Separator::Space, 1),
        ];
        let err = build_witness_text("A", &readings, &CollationParams::default()).unwrap_err();
        assert_eq!(
            err,
            MalformedInputError::OutOfOrder {
                witness: "A".into(),
                previous: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_missing_separator_rejected() {
        let mut reading = Reading::new("a", Separator::Space, 1);
        reading.separator = None;
        let err = build_witness_text("A", &[reading], &CollationParams::default()).unwrap_err();
        assert!(matches!(err, MalformedInputError::MissingSeparator { .. }));
    }

    #[test]
    fn test_group_by_witness_keeps_order() {
        let rows = vec![
            row("B", "x", 1),
            row("A", "a", 1),
            row("B", "y", 2),
            row("A", "b", 2),
        ];
        let groups = group_by_witness(rows).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "B");
        assert_eq!(groups[0].readings[1].text, "y");
        assert_eq!(groups[1].name, "A");
    }

    #[test]
    fn test_group_by_witness_rejects_empty_name() {
        let rows = vec![row("A", "a", 1), row("  ", "b", 1)];
        assert_eq!(
            group_by_witness(rows).unwrap_err(),
            MalformedInputError::UnnamedWitness { row: 1 }
        );
    }

    #[test]
    fn test_build_witnesses_errors() {
        let params = CollationParams::default();
        assert_eq!(
            build_witnesses(&[], &params).unwrap_err(),
            MalformedInputError::EmptyWitnessSet
        );

        let dup = vec![
            WitnessReadings { name: "A".into(), readings: vec![] },
            WitnessReadings { name: "A".into(), readings: vec![] },
        ];
        assert_eq!(
            build_witnesses(&dup, &params).unwrap_err(),
            MalformedInputError::DuplicateWitness("A".into())
        );
    }

    #[test]
    fn test_empty_witness_builds_empty_text() {
        let w = build_witness_text("A", &[], &CollationParams::default()).unwrap();
        assert!(w.is_empty());
        assert_eq!(w.text, "");
    }
}
