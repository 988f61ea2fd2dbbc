//! Manuscript Collation Library
//!
//! Token-level collation of parallel manuscript witnesses and pairwise
//! variant analysis. Readings are folded into one normalized text per
//! witness, aligned progressively into a column table, and every variant
//! column is broken down into classified witness-pair records.
//!
//! # Example
//!
//! ```no_run
//! use manuscript_collation::prelude::*;
//! use std::path::Path;
//!
//! let corpus = SqliteCorpus::open(Path::new("corpus.db")).unwrap();
//! let reference = ReferenceUnit::new("1QIsaa", "1", "1");
//! let params = CollationParams::default();
//!
//! let result = collate_reference(&corpus, &reference, &params).unwrap();
//!
//! println!("Found {} variant records", result.variants.len());
//! ```
//!
//! # In-memory witnesses
//!
//! ```
//! use manuscript_collation::prelude::*;
//!
//! let witness = |name: &str, text: &str| WitnessReadings {
//!     name: name.to_string(),
//!     readings: text
//!         .split_whitespace()
//!         .enumerate()
//!         .map(|(i, w)| Reading::new(w, Separator::Space, i as u32 + 1))
//!         .collect(),
//! };
//!
//! let witnesses = vec![
//!     witness("A", "בראשית ברא אלהים"),
//!     witness("B", "בראשית אלהים"),
//! ];
//! let result = collate_witnesses(&witnesses, None, &CollationParams::default()).unwrap();
//!
//! assert_eq!(result.table.variant_count(), 1);
//! assert_eq!(result.variants["1:A-B"].guessed_type, GuessedType::Omission);
//! ```

pub mod align;
pub mod collate;
pub mod config;
pub mod db;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod output;
pub mod source;
pub mod variants;
pub mod witness;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::align::{align_witnesses, segment_columns, tokens_near_match};
    pub use crate::collate::{
        collate_reference, collate_references, collate_rows, collate_witnesses, CollationError,
    };
    pub use crate::config::{CollationParams, ConfigError};
    pub use crate::db::{CorpusStats, DbError, SqliteCorpus};
    pub use crate::metrics::{compute_letter_difference, compute_levenshtein, normalized_distance};
    pub use crate::models::{
        AlignmentTable, CollationResult, Column, EnrichedVariant, GuessedType,
        MorphologicalAnalysis, ParallelReading, Reading, ReferenceUnit, Separator, Token,
        VariantMap, VariantRecord, WitnessReadings, WitnessText, FRAGMENTATION_PLACEHOLDER,
    };
    pub use crate::normalize::{normalize, normalize_reading, strip_vowels};
    pub use crate::output::{
        format_summary, format_table, format_variants, print_summary, print_table, print_variants,
        render, render_html, render_html_page,
        render_structured, write_enriched_json, write_enriched_json_file, write_html_file,
        write_json, write_json_file, write_variants_csv, write_variants_csv_file, OutputError,
        RenderMode, Rendered,
    };
    pub use crate::source::{MemorySource, MorphologyScope, MorphologySource, ReadingSource};
    pub use crate::variants::{analyze_table, distinct_analyses, enrich_variants};
    pub use crate::witness::{build_witness_text, build_witnesses, group_by_witness, MalformedInputError};
}

// Re-export commonly used types at the crate root
pub use config::CollationParams;
pub use models::{AlignmentTable, CollationResult, ReferenceUnit, VariantRecord};
