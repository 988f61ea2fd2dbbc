//! Collaborator interfaces: where readings and morphological analyses come from.
//!
//! The collation core never talks to storage directly. A request handler owns
//! one value per interface and passes it in; `db::SqliteCorpus` implements
//! both against SQLite, and `MemorySource` serves explicit test fixtures.

use std::collections::HashMap;
use std::convert::Infallible;

use crate::models::{MorphologicalAnalysis, ParallelReading, ReferenceUnit};

/// Supplies the ordered reading rows of every witness parallel to a reference.
pub trait ReadingSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reading rows of all parallel witnesses, ordered within each witness.
    fn parallel_readings(
        &self,
        reference: &ReferenceUnit,
    ) -> Result<Vec<ParallelReading>, Self::Error>;

    /// Distinct witness names parallel to a reference.
    fn parallel_witnesses(&self, reference: &ReferenceUnit) -> Result<Vec<String>, Self::Error> {
        let mut names: Vec<String> = Vec::new();
        for row in self.parallel_readings(reference)? {
            if !names.contains(&row.witness) {
                names.push(row.witness);
            }
        }
        Ok(names)
    }
}

/// Optional location narrowing a morphology lookup.
///
/// `column` only applies with a `manuscript`, and `line` only with a `column`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MorphologyScope {
    pub manuscript: Option<String>,
    pub column: Option<String>,
    pub line: Option<String>,
}

impl MorphologyScope {
    /// Scope for one witness at a reference unit (chapter = column, verse = line).
    pub fn for_witness(witness: &str, reference: Option<&ReferenceUnit>) -> Self {
        Self {
            manuscript: Some(witness.to_string()),
            column: reference.map(|r| r.chapter.clone()),
            line: reference.map(|r| r.verse.clone()),
        }
    }

    /// Drop the parts that have no effect without their parent.
    pub fn effective(&self) -> Self {
        let manuscript = self.manuscript.clone();
        let column = manuscript.as_ref().and(self.column.clone());
        let line = column.as_ref().and(self.line.clone());
        Self {
            manuscript,
            column,
            line,
        }
    }
}

/// Supplies morphological analyses for a token string.
pub trait MorphologySource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Analyses of every stored occurrence of `word` within `scope`;
    /// duplicates are allowed.
    fn word_analyses(
        &self,
        word: &str,
        scope: &MorphologyScope,
    ) -> Result<Vec<MorphologicalAnalysis>, Self::Error>;
}

/// In-memory collaborator built explicitly per test or per fixture file.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    readings: HashMap<ReferenceUnit, Vec<ParallelReading>>,
    /// word -> (manuscript, chapter, verse, analysis)
    analyses: HashMap<String, Vec<(String, String, String, MorphologicalAnalysis)>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_readings(mut self, reference: ReferenceUnit, rows: Vec<ParallelReading>) -> Self {
        self.readings.entry(reference).or_default().extend(rows);
        self
    }

    pub fn with_analysis(
        mut self,
        word: &str,
        manuscript: &str,
        chapter: &str,
        verse: &str,
        analysis: MorphologicalAnalysis,
    ) -> Self {
        self.analyses.entry(word.to_string()).or_default().push((
            manuscript.to_string(),
            chapter.to_string(),
            verse.to_string(),
            analysis,
        ));
        self
    }
}

impl ReadingSource for MemorySource {
    type Error = Infallible;

    fn parallel_readings(
        &self,
        reference: &ReferenceUnit,
    ) -> Result<Vec<ParallelReading>, Self::Error> {
        Ok(self.readings.get(reference).cloned().unwrap_or_default())
    }
}

impl MorphologySource for MemorySource {
    type Error = Infallible;

    fn word_analyses(
        &self,
        word: &str,
        scope: &MorphologyScope,
    ) -> Result<Vec<MorphologicalAnalysis>, Self::Error> {
        let scope = scope.effective();
        let fits = |expected: &Option<String>, actual: &String| {
            expected.as_ref().map_or(true, |e| e == actual)
        };

        Ok(self
            .analyses
            .get(word)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(ms, col, line, _)| {
                        fits(&scope.manuscript, ms)
                            && fits(&scope.column, col)
                            && fits(&scope.line, line)
                    })
                    .map(|(_, _, _, analysis)| analysis.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}
