//! SQLite access layer implementing the reading and morphology collaborators.
//!
//! All statements are parameterized; identifiers and values never reach SQL
//! text through string formatting.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::models::{MorphologicalAnalysis, ParallelReading, Reading, ReferenceUnit, Separator};
use crate::source::{MorphologyScope, MorphologySource, ReadingSource};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Manuscript not found: {0}")]
    ManuscriptNotFound(String),
}

/// Fields of a morphological analysis row, in output order.
pub const MORPHOLOGY_FIELDS: [&str; 14] = [
    "lemma",
    "word_class",
    "short_definition",
    "root_designation",
    "verb_stem",
    "verb_tense",
    "person",
    "gender",
    "number",
    "state",
    "augment",
    "suffix_person",
    "suffix_gender",
    "suffix_number",
];

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS readings (
    reading_id INTEGER PRIMARY KEY,
    manuscript TEXT NOT NULL,
    chapter TEXT NOT NULL,
    verse TEXT NOT NULL,
    sequence_in_line INTEGER NOT NULL,
    reading TEXT NOT NULL DEFAULT '',
    followed_by TEXT,
    is_fully_reconstructed INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_readings_location ON readings(manuscript, chapter, verse);
CREATE INDEX IF NOT EXISTS idx_readings_text ON readings(reading);

CREATE TABLE IF NOT EXISTS parallel_readings (
    anchor_reading_id INTEGER NOT NULL REFERENCES readings(reading_id),
    reading_id INTEGER NOT NULL REFERENCES readings(reading_id)
);
CREATE INDEX IF NOT EXISTS idx_parallel_anchor ON parallel_readings(anchor_reading_id);

CREATE TABLE IF NOT EXISTS morphological_analyses (
    reading_id INTEGER NOT NULL REFERENCES readings(reading_id),
    element_sequence INTEGER NOT NULL DEFAULT 0,
    lemma TEXT,
    word_class TEXT,
    short_definition TEXT,
    root_designation TEXT,
    verb_stem TEXT,
    verb_tense TEXT,
    person TEXT,
    gender TEXT,
    number TEXT,
    state TEXT,
    augment TEXT,
    suffix_person TEXT,
    suffix_gender TEXT,
    suffix_number TEXT
);
CREATE INDEX IF NOT EXISTS idx_morphology_reading ON morphological_analyses(reading_id);
";

/// Corpus statistics
#[derive(Debug, Serialize)]
pub struct CorpusStats {
    pub manuscripts: u64,
    pub readings: u64,
    pub parallel_links: u64,
    pub morphological_analyses: u64,
}

/// SQLite-backed reading and morphology source.
pub struct SqliteCorpus {
    conn: Connection,
}

impl SqliteCorpus {
    pub fn open(db_path: &Path) -> Result<Self, DbError> {
        Ok(Self {
            conn: Connection::open(db_path)?,
        })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create the tables if they do not exist yet.
    pub fn init_schema(&self) -> Result<(), DbError> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Readings of a single manuscript at a chapter and verse, in line order.
    pub fn manuscript_readings(
        &self,
        manuscript: &str,
        chapter: &str,
        verse: &str,
    ) -> Result<Vec<Reading>, DbError> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM readings WHERE manuscript = ?1 LIMIT 1",
                params![manuscript],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(DbError::ManuscriptNotFound(manuscript.to_string()));
        }

        let mut stmt = self.conn.prepare(
            "SELECT reading, followed_by, sequence_in_line, is_fully_reconstructed
             FROM readings
             WHERE manuscript = ?1 AND chapter = ?2 AND verse = ?3
             ORDER BY sequence_in_line",
        )?;
        let mut rows = stmt.query(params![manuscript, chapter, verse])?;

        let mut readings = Vec::new();
        while let Some(row) = rows.next()? {
            readings.push(reading_from_row(row, 0)?);
        }

        Ok(readings)
    }

    pub fn corpus_stats(&self) -> Result<CorpusStats, DbError> {
        let count = |sql: &str| -> Result<u64, DbError> {
            Ok(self.conn.query_row(sql, [], |row| row.get::<_, i64>(0))? as u64)
        };

        Ok(CorpusStats {
            manuscripts: count("SELECT COUNT(DISTINCT manuscript) FROM readings")?,
            readings: count("SELECT COUNT(*) FROM readings")?,
            parallel_links: count("SELECT COUNT(*) FROM parallel_readings")?,
            morphological_analyses: count("SELECT COUNT(*) FROM morphological_analyses")?,
        })
    }
}

/// Build a `Reading` from columns `(reading, followed_by, sequence_in_line,
/// is_fully_reconstructed)` starting at `offset`.
fn reading_from_row(row: &rusqlite::Row<'_>, offset: usize) -> Result<Reading, rusqlite::Error> {
    let text: Option<String> = row.get(offset)?;
    let followed_by: Option<String> = row.get(offset + 1)?;
    let sequence_in_line: u32 = row.get(offset + 2)?;
    let is_fully_reconstructed: bool = row.get(offset + 3)?;

    Ok(Reading {
        text: text.unwrap_or_default(),
        separator: followed_by.as_deref().and_then(Separator::from_tag),
        sequence_in_line,
        is_fully_reconstructed,
    })
}

impl ReadingSource for SqliteCorpus {
    type Error = DbError;

    /// The reference's tradition names the anchor manuscript whose readings
    /// at chapter/verse are linked to their parallels.
    ///
    /// Rows come grouped by witness, each witness in its own line order.
    /// Witnesses are ordered by the first anchor reading they are linked to,
    /// the anchor manuscript first on ties. A reading linked to several
    /// anchor readings is returned once.
    fn parallel_readings(
        &self,
        reference: &ReferenceUnit,
    ) -> Result<Vec<ParallelReading>, DbError> {
        let mut stmt = self.conn.prepare(
            "WITH linked AS (
                 SELECT b.reading_id, b.manuscript, b.reading, b.followed_by,
                        b.sequence_in_line, b.is_fully_reconstructed,
                        a.sequence_in_line AS anchor_sequence
                 FROM readings AS a
                 JOIN parallel_readings AS p ON p.anchor_reading_id = a.reading_id
                 JOIN readings AS b ON b.reading_id = p.reading_id
                 WHERE a.manuscript = ?1 AND a.chapter = ?2 AND a.verse = ?3
             ),
             first_seen AS (
                 SELECT manuscript, MIN(anchor_sequence) AS first_anchor
                 FROM linked
                 GROUP BY manuscript
             )
             SELECT l.manuscript, l.reading, l.followed_by, l.sequence_in_line, l.is_fully_reconstructed
             FROM linked AS l
             JOIN first_seen AS f ON f.manuscript = l.manuscript
             GROUP BY l.reading_id
             ORDER BY f.first_anchor, l.manuscript <> ?1, l.manuscript, l.sequence_in_line, l.reading_id",
        )?;
        let mut rows = stmt.query(params![reference.tradition, reference.chapter, reference.verse])?;

        let mut parallels = Vec::new();
        while let Some(row) = rows.next()? {
            parallels.push(ParallelReading {
                witness: row.get(0)?,
                reading: reading_from_row(row, 1)?,
            });
        }

        Ok(parallels)
    }
}

impl MorphologySource for SqliteCorpus {
    type Error = DbError;

    fn word_analyses(
        &self,
        word: &str,
        scope: &MorphologyScope,
    ) -> Result<Vec<MorphologicalAnalysis>, DbError> {
        let scope = scope.effective();
        let columns = MORPHOLOGY_FIELDS
            .iter()
            .map(|field| format!("m.{}", field))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {}
             FROM morphological_analyses AS m
             JOIN readings AS r ON r.reading_id = m.reading_id
             WHERE r.reading = ?1
               AND (?2 IS NULL OR r.manuscript = ?2)
               AND (?3 IS NULL OR r.chapter = ?3)
               AND (?4 IS NULL OR r.verse = ?4)
             ORDER BY r.reading_id, m.element_sequence",
            columns
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![word, scope.manuscript, scope.column, scope.line])?;

        let mut analyses = Vec::new();
        while let Some(row) = rows.next()? {
            let mut analysis = MorphologicalAnalysis::new();
            for (idx, field) in MORPHOLOGY_FIELDS.iter().enumerate() {
                analysis.insert(field.to_string(), row.get::<_, Option<String>>(idx)?);
            }
            analyses.push(analysis);
        }

        Ok(analyses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> SqliteCorpus {
        let corpus = SqliteCorpus::from_connection(Connection::open_in_memory().unwrap());
        corpus.init_schema().unwrap();
        corpus
            .connection()
            .execute_batch(
                "INSERT INTO readings VALUES (1, '1QS', '1', '1', 1, 'ל', 'space', 0);
                 INSERT INTO readings VALUES (2, '1QS', '1', '1', 2, 'אלהים', 'none', 0);
                 INSERT INTO readings VALUES (3, '4Q1', '2', '3', 1, 'ל', NULL, 0);
                 INSERT INTO parallel_readings VALUES (1, 1), (1, 3), (2, 2);
                 INSERT INTO morphological_analyses (reading_id, lemma, word_class)
                     VALUES (1, 'ל', 'Präposition'), (3, 'ל', 'Präposition');",
            )
            .unwrap();
        corpus
    }

    #[test]
    fn test_parallel_readings_order_and_tags() {
        let corpus = corpus();
        let rows = corpus
            .parallel_readings(&ReferenceUnit::new("1QS", "1", "1"))
            .unwrap();
        let witnesses: Vec<&str> = rows.iter().map(|r| r.witness.as_str()).collect();
        assert_eq!(witnesses, vec!["1QS", "1QS", "4Q1"]);
        assert_eq!(rows[0].reading.separator, Some(Separator::Space));
        assert_eq!(rows[1].reading.separator, Some(Separator::Joined));
        assert_eq!(rows[2].reading.separator, None);
    }

    #[test]
    fn test_parallel_readings_keep_witness_line_order() {
        let corpus = SqliteCorpus::from_connection(Connection::open_in_memory().unwrap());
        corpus.init_schema().unwrap();
        // 4QS transposes the two words and links its first word twice
        corpus
            .connection()
            .execute_batch(
                "INSERT INTO readings VALUES (1, '1QS', '1', '1', 1, 'ברא', 'space', 0);
                 INSERT INTO readings VALUES (2, '1QS', '1', '1', 2, 'אלהים', 'none', 0);
                 INSERT INTO readings VALUES (3, '4QS', '2', '5', 1, 'אלהים', 'space', 0);
                 INSERT INTO readings VALUES (4, '4QS', '2', '5', 2, 'ברא', 'none', 0);
                 INSERT INTO parallel_readings VALUES (1, 4), (1, 1), (2, 2), (2, 3), (1, 3);",
            )
            .unwrap();

        let rows = corpus
            .parallel_readings(&ReferenceUnit::new("1QS", "1", "1"))
            .unwrap();
        let seen: Vec<(&str, u32)> = rows
            .iter()
            .map(|r| (r.witness.as_str(), r.reading.sequence_in_line))
            .collect();
        assert_eq!(seen, vec![("1QS", 1), ("1QS", 2), ("4QS", 1), ("4QS", 2)]);
    }

    #[test]
    fn test_word_analyses_scoping() {
        let corpus = corpus();
        let all = corpus.word_analyses("ל", &MorphologyScope::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["word_class"].as_deref(), Some("Präposition"));
        assert_eq!(all[0]["gender"], None);
        assert_eq!(all[0].len(), MORPHOLOGY_FIELDS.len());

        let scope = MorphologyScope {
            manuscript: Some("4Q1".into()),
            column: Some("2".into()),
            line: Some("3".into()),
        };
        assert_eq!(corpus.word_analyses("ל", &scope).unwrap().len(), 1);

        let quoted = corpus.word_analyses("ל' OR '1'='1", &MorphologyScope::default()).unwrap();
        assert!(quoted.is_empty());
    }

    #[test]
    fn test_manuscript_readings() {
        let corpus = corpus();
        let readings = corpus.manuscript_readings("1QS", "1", "1").unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[1].text, "אלהים");
        assert!(matches!(
            corpus.manuscript_readings("11Q5", "1", "1"),
            Err(DbError::ManuscriptNotFound(_))
        ));
    }

    #[test]
    fn test_corpus_stats() {
        let stats = corpus().corpus_stats().unwrap();
        assert_eq!(stats.manuscripts, 2);
        assert_eq!(stats.readings, 3);
        assert_eq!(stats.parallel_links, 3);
        assert_eq!(stats.morphological_analyses, 2);
    }
}
