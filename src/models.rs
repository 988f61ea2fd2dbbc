//! Data structures for the collation and variant-analysis pipeline.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::config::CollationParams;

/// Reserved token standing in for damaged or reconstructed text.
pub const FRAGMENTATION_PLACEHOLDER: &str = "φ";

/// What follows a reading when the witness text is folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Separator {
    Space,
    Break,
    /// Reading runs straight into the next one (tagged `none` by the source)
    #[serde(rename = "none")]
    Joined,
}

impl Separator {
    /// Parse a trailing-separator tag as stored by the reading source.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "space" => Some(Separator::Space),
            "break" => Some(Separator::Break),
            "none" => Some(Separator::Joined),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Separator::Space => "space",
            Separator::Break => "break",
            Separator::Joined => "none",
        }
    }

    /// Text appended after a reading carrying this separator.
    pub fn as_text(self) -> &'static str {
        match self {
            Separator::Space => " ",
            Separator::Break => "\n",
            Separator::Joined => "",
        }
    }
}

/// Atomic transcribed unit, as delivered by the reading source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(default)]
    pub text: String,
    /// `None` when the source row carried no (or an unknown) separator tag
    #[serde(default)]
    pub separator: Option<Separator>,
    pub sequence_in_line: u32,
    #[serde(default)]
    pub is_fully_reconstructed: bool,
}

impl Reading {
    pub fn new(text: &str, separator: Separator, sequence_in_line: u32) -> Self {
        Self {
            text: text.to_string(),
            separator: Some(separator),
            sequence_in_line,
            is_fully_reconstructed: false,
        }
    }

    pub fn reconstructed(mut self) -> Self {
        self.is_fully_reconstructed = true;
        self
    }
}

/// One row of a parallel lookup: a reading tagged with its witness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelReading {
    pub witness: String,
    pub reading: Reading,
}

/// A named witness with its ordered readings for one reference unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessReadings {
    pub name: String,
    pub readings: Vec<Reading>,
}

/// Normalized unit of comparison inside a folded witness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(text: impl Into<String>) -> Self {
        Token(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the token carries fragmentation placeholder text.
    pub fn has_placeholder(&self) -> bool {
        self.0.contains(FRAGMENTATION_PLACEHOLDER)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A witness folded into one string plus its token sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessText {
    pub name: String,
    pub text: String,
    pub tokens: Vec<Token>,
}

impl WitnessText {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// One position in the aligned output.
///
/// `cells` is indexed like `AlignmentTable::witnesses`; an empty cell is a gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub index: usize,
    pub cells: Vec<Vec<Token>>,
    pub is_variant: bool,
}

impl Column {
    pub fn is_gap(&self, witness_idx: usize) -> bool {
        self.cells.get(witness_idx).map_or(true, |cell| cell.is_empty())
    }

    /// Comparison string for one witness: tokens joined by a space, empty for a gap.
    pub fn cell_text(&self, witness_idx: usize) -> String {
        self.cells
            .get(witness_idx)
            .map(|cell| join_tokens(cell))
            .unwrap_or_default()
    }
}

/// Join tokens with single spaces.
pub fn join_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(Token::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ordered column table, the authoritative output of the alignment engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentTable {
    pub witnesses: Vec<String>,
    pub columns: Vec<Column>,
}

impl AlignmentTable {
    pub fn witness_index(&self, name: &str) -> Option<usize> {
        self.witnesses.iter().position(|w| w == name)
    }

    /// Non-gap tokens of one witness, read left to right across the table.
    pub fn witness_tokens(&self, witness_idx: usize) -> Vec<&Token> {
        self.columns
            .iter()
            .filter_map(|c| c.cells.get(witness_idx))
            .flatten()
            .collect()
    }

    pub fn variant_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_variant)
    }

    pub fn variant_count(&self) -> usize {
        self.variant_columns().count()
    }
}

/// Coarse classification of a variant pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuessedType {
    Omission,
    Unknown,
}

impl fmt::Display for GuessedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuessedType::Omission => f.write_str("omission"),
            GuessedType::Unknown => f.write_str("unknown"),
        }
    }
}

/// Comparison of two witnesses at one variant column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub column_index: usize,
    pub witness_1: String,
    pub witness_2: String,
    pub witness_pair_key: String,
    pub reading_1: String,
    pub reading_2: String,
    pub distance: usize,
    pub letter_difference: BTreeSet<char>,
    pub guessed_type: GuessedType,
}

/// Variant records keyed by `"{column_index}:{witness_pair_key}"`.
pub type VariantMap = BTreeMap<String, VariantRecord>;

/// Flat morphological analysis record; field order is irrelevant.
pub type MorphologicalAnalysis = BTreeMap<String, Option<String>>;

/// A variant record with the morphological analyses of its tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedVariant {
    #[serde(flatten)]
    pub record: VariantRecord,
    /// token text -> distinct analyses, for both readings
    pub morphology: BTreeMap<String, Vec<MorphologicalAnalysis>>,
}

/// Tradition name plus chapter and verse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceUnit {
    pub tradition: String,
    pub chapter: String,
    pub verse: String,
}

impl ReferenceUnit {
    pub fn new(tradition: &str, chapter: &str, verse: &str) -> Self {
        Self {
            tradition: tradition.to_string(),
            chapter: chapter.to_string(),
            verse: verse.to_string(),
        }
    }
}

impl fmt::Display for ReferenceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.tradition, self.chapter, self.verse)
    }
}

/// Full output of one collation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollationResult {
    pub version: String,
    pub reference: Option<ReferenceUnit>,
    pub parameters: CollationParams,
    pub witnesses: Vec<WitnessText>,
    pub table: AlignmentTable,
    pub variants: VariantMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separator_tags() {
        assert_eq!(Separator::from_tag("space"), Some(Separator::Space));
        assert_eq!(Separator::from_tag("break"), Some(Separator::Break));
        assert_eq!(Separator::from_tag("none"), Some(Separator::Joined));
        assert_eq!(Separator::from_tag("tab"), None);

        for sep in [Separator::Space, Separator::Break, Separator::Joined] {
            assert_eq!(Separator::from_tag(sep.tag()), Some(sep));
        }
    }

    #[test]
    fn test_separator_serde_uses_source_tags() {
        let json = serde_json::to_string(&Separator::Joined).unwrap();
        assert_eq!(json, "\"none\"");
        let sep: Separator = serde_json::from_str("\"break\"").unwrap();
        assert_eq!(sep, Separator::Break);
    }

    #[test]
    fn test_column_cell_text() {
        let column = Column {
            index: 0,
            cells: vec![vec![Token::new("a"), Token::new("b")], vec![]],
            is_variant: true,
        };
        assert_eq!(column.cell_text(0), "a b");
        assert_eq!(column.cell_text(1), "");
        assert!(column.is_gap(1));
        assert!(column.is_gap(7));
    }

    #[test]
    fn test_witness_tokens_skip_gaps() {
        let table = AlignmentTable {
            witnesses: vec!["A".into(), "B".into()],
            columns: vec![
                Column {
                    index: 0,
                    cells: vec![vec![Token::new("x")], vec![]],
                    is_variant: true,
                },
                Column {
                    index: 1,
                    cells: vec![vec![Token::new("y")], vec![Token::new("y")]],
                    is_variant: false,
                },
            ],
        };
        let b: Vec<&str> = table.witness_tokens(1).into_iter().map(Token::as_str).collect();
        assert_eq!(b, vec!["y"]);
        assert_eq!(table.variant_count(), 1);
        assert_eq!(table.witness_index("B"), Some(1));
    }
}
