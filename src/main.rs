//! Manuscript Collation Pipeline
//!
//! Collates parallel manuscript witnesses of a reference unit and reports
//! classified pairwise variants.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use manuscript_collation::prelude::*;

#[derive(Parser)]
#[command(name = "manuscript-collation")]
#[command(about = "Token-level collation and variant analysis for manuscript witnesses")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Output format for a collation
#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// Standalone HTML page with the right-to-left collation table
    Html,
    /// Full collation result as JSON
    Json,
    /// Plain-text alignment table
    Table,
    /// Variant records as CSV
    Variants,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Json => "json",
            OutputFormat::Table => "txt",
            OutputFormat::Variants => "csv",
        }
    }
}

/// Collation options. Every value starts from the TOML config (if given) or
/// `CollationParams::default()` and is overridden only when set explicitly.
#[derive(Args, Debug)]
struct ParamArgs {
    /// TOML file with collation parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show reconstructed readings instead of the fragmentation placeholder
    #[arg(long)]
    keep_reconstructed: bool,

    /// Strip Hebrew vowel and cantillation marks before comparing
    #[arg(long)]
    strip_vowels: bool,

    /// Keep one column per token instead of merging runs
    #[arg(long)]
    no_segmentation: bool,

    /// Treat orthographically close tokens as equal when aligning
    #[arg(long)]
    near_match: bool,

    /// Normalized edit distance below which tokens near-match [default: 0.3]
    #[arg(long)]
    near_match_threshold: Option<f32>,

    /// Alignment cost of a near match [default: 1]
    #[arg(long)]
    near_match_cost: Option<u32>,

    /// Alignment cost of a mismatch or gap [default: 2]
    #[arg(long)]
    edit_cost: Option<u32>,
}

impl ParamArgs {
    fn resolve(&self) -> Result<CollationParams, ConfigError> {
        let base = match &self.config {
            Some(path) => CollationParams::load(path)?,
            None => CollationParams::default(),
        };

        let params = CollationParams {
            keep_reconstructed: self.keep_reconstructed || base.keep_reconstructed,
            strip_vowels: self.strip_vowels || base.strip_vowels,
            segmentation: !self.no_segmentation && base.segmentation,
            near_match: self.near_match || base.near_match,
            near_match_threshold: self.near_match_threshold.unwrap_or(base.near_match_threshold),
            near_match_cost: self.near_match_cost.unwrap_or(base.near_match_cost),
            edit_cost: self.edit_cost.unwrap_or(base.edit_cost),
        };
        params.validate()?;
        Ok(params)
    }
}

/// Witness fixture file for `collate-file`.
#[derive(Deserialize)]
struct WitnessFile {
    #[serde(default)]
    reference: Option<ReferenceUnit>,
    witnesses: Vec<WitnessReadings>,
}

#[derive(Subcommand)]
enum Commands {
    /// Collate every witness parallel to a verse of a tradition
    Collate {
        /// Path to corpus.db
        #[arg(long)]
        corpus_db: PathBuf,

        /// Anchor manuscript / tradition
        #[arg(long)]
        tradition: String,

        #[arg(long)]
        chapter: String,

        #[arg(long)]
        verse: String,

        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Output file path (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Attach morphological analyses to every variant reading
        #[arg(long)]
        morphology: bool,

        #[command(flatten)]
        params: ParamArgs,

        /// Suppress the summary
        #[arg(long)]
        quiet: bool,

        /// Print first N variant records to console
        #[arg(long)]
        show_variants: Option<usize>,
    },

    /// Collate witnesses read from a JSON file
    CollateFile {
        /// JSON file: {"reference": {...}?, "witnesses": [{"name", "readings"}]}
        #[arg(long)]
        input: PathBuf,

        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,

        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        params: ParamArgs,

        #[arg(long)]
        quiet: bool,

        #[arg(long)]
        show_variants: Option<usize>,
    },

    /// Collate many verses of one chapter into an output directory
    Batch {
        #[arg(long)]
        corpus_db: PathBuf,

        #[arg(long)]
        tradition: String,

        #[arg(long)]
        chapter: String,

        /// Comma-separated verse list
        #[arg(long, value_delimiter = ',', required = true)]
        verses: Vec<String>,

        #[arg(long)]
        output_dir: PathBuf,

        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,

        #[command(flatten)]
        params: ParamArgs,

        /// Suppress progress output
        #[arg(long)]
        quiet: bool,
    },

    /// List the witnesses parallel to a verse, in collation order
    Parallels {
        #[arg(long)]
        corpus_db: PathBuf,

        #[arg(long)]
        tradition: String,

        #[arg(long)]
        chapter: String,

        #[arg(long)]
        verse: String,
    },

    /// Print the folded text of one manuscript at a chapter and verse
    Text {
        #[arg(long)]
        corpus_db: PathBuf,

        #[arg(long)]
        manuscript: String,

        #[arg(long)]
        chapter: String,

        #[arg(long)]
        verse: String,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Look up distinct morphological analyses of a word
    Lexicon {
        #[arg(long)]
        corpus_db: PathBuf,

        #[arg(long)]
        word: String,

        /// Restrict to one manuscript
        #[arg(long)]
        manuscript: Option<String>,

        /// Column (chapter); ignored without --manuscript
        #[arg(long)]
        column: Option<String>,

        /// Line (verse); ignored without --column
        #[arg(long)]
        line: Option<String>,
    },

    /// Show corpus statistics
    Stats {
        #[arg(long)]
        corpus_db: PathBuf,
    },

    /// Benchmark alignment performance
    Benchmark {
        /// Number of alignment iterations
        #[arg(long, default_value = "200")]
        iterations: usize,

        /// Tokens per witness
        #[arg(long, default_value = "60")]
        size: usize,

        /// Number of witnesses
        #[arg(long, default_value = "4")]
        witnesses: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("manuscript_collation=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Collate {
            corpus_db,
            tradition,
            chapter,
            verse,
            format,
            output,
            morphology,
            params,
            quiet,
            show_variants,
        } => {
            let params = params.resolve()?;
            let corpus = SqliteCorpus::open(&corpus_db)?;
            let reference = ReferenceUnit::new(&tradition, &chapter, &verse);

            let result = collate_reference(&corpus, &reference, &params)?;
            emit(&result, format, output.as_deref())?;

            if morphology {
                let enriched = enrich_variants(&result.variants, Some(&reference), &corpus)?;
                match &output {
                    Some(path) => {
                        let path = path.with_extension("morphology.json");
                        write_enriched_json_file(&enriched, &path)?;
                        if !quiet {
                            eprintln!("Morphology output: {}", path.display());
                        }
                    }
                    None => {
                        let mut stdout = std::io::stdout().lock();
                        write_enriched_json(&enriched, &mut stdout)?;
                        writeln!(stdout)?;
                    }
                }
            }

            report(&result, output.as_deref(), quiet, show_variants);
        }

        Commands::CollateFile {
            input,
            format,
            output,
            params,
            quiet,
            show_variants,
        } => {
            let params = params.resolve()?;
            let content = std::fs::read_to_string(&input)?;
            let file: WitnessFile = serde_json::from_str(&content)?;

            let result = collate_witnesses(&file.witnesses, file.reference.as_ref(), &params)?;
            emit(&result, format, output.as_deref())?;
            report(&result, output.as_deref(), quiet, show_variants);
        }

        Commands::Batch {
            corpus_db,
            tradition,
            chapter,
            verses,
            output_dir,
            format,
            params,
            quiet,
        } => {
            let params = params.resolve()?;
            let corpus = SqliteCorpus::open(&corpus_db)?;
            std::fs::create_dir_all(&output_dir)?;

            let references: Vec<ReferenceUnit> = verses
                .iter()
                .map(|verse| ReferenceUnit::new(&tradition, &chapter, verse.trim()))
                .collect();

            let results = collate_references(&corpus, &references, &params, !quiet);

            let mut written = 0usize;
            let mut failed = 0usize;
            for (reference, result) in results {
                match result {
                    Ok(result) => {
                        let file_name = format!(
                            "{}_{}_{}.{}",
                            reference.tradition,
                            reference.chapter,
                            reference.verse,
                            format.extension()
                        );
                        emit(&result, format, Some(&output_dir.join(file_name)))?;
                        written += 1;
                    }
                    Err(e) => {
                        warn!(reference = %reference, error = %e, "collation failed");
                        failed += 1;
                    }
                }
            }

            info!(written, failed, "batch complete");
            if !quiet {
                eprintln!(
                    "\n{} collations written to {} ({} failed)",
                    written,
                    output_dir.display(),
                    failed
                );
            }
        }

        Commands::Parallels {
            corpus_db,
            tradition,
            chapter,
            verse,
        } => {
            let corpus = SqliteCorpus::open(&corpus_db)?;
            let reference = ReferenceUnit::new(&tradition, &chapter, &verse);
            for name in corpus.parallel_witnesses(&reference)? {
                println!("{}", name);
            }
        }

        Commands::Text {
            corpus_db,
            manuscript,
            chapter,
            verse,
            params,
        } => {
            let params = params.resolve()?;
            let corpus = SqliteCorpus::open(&corpus_db)?;
            let readings = corpus.manuscript_readings(&manuscript, &chapter, &verse)?;
            let text = build_witness_text(&manuscript, &readings, &params)?;
            println!("{}", text.text);
        }

        Commands::Lexicon {
            corpus_db,
            word,
            manuscript,
            column,
            line,
        } => {
            let corpus = SqliteCorpus::open(&corpus_db)?;
            let scope = MorphologyScope {
                manuscript,
                column,
                line,
            };
            let analyses = distinct_analyses(corpus.word_analyses(&word, &scope)?);

            println!("{}", serde_json::to_string_pretty(&analyses)?);
        }

        Commands::Stats { corpus_db } => {
            let stats = SqliteCorpus::open(&corpus_db)?.corpus_stats()?;

            println!("=== Corpus Statistics ===");
            println!("Manuscripts: {}", stats.manuscripts);
            println!("Readings: {}", stats.readings);
            println!("Parallel links: {}", stats.parallel_links);
            println!("Morphological analyses: {}", stats.morphological_analyses);
        }

        Commands::Benchmark {
            iterations,
            size,
            witnesses,
        } => {
            run_benchmark(iterations, size, witnesses);
        }
    }

    Ok(())
}

/// Write a collation in the requested format to a file, or to stdout.
fn emit(
    result: &CollationResult,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<(), OutputError> {
    match (format, output) {
        (OutputFormat::Html, Some(path)) => write_html_file(result, path)?,
        (OutputFormat::Json, Some(path)) => write_json_file(result, path)?,
        (OutputFormat::Variants, Some(path)) => write_variants_csv_file(&result.variants, path)?,
        (OutputFormat::Table, Some(path)) => {
            std::fs::write(path, format_table(&result.table))?
        }
        (OutputFormat::Html, None) => {
            print!("{}", render_html_page(&result.table, result.reference.as_ref()))
        }
        (OutputFormat::Json, None) => {
            let mut stdout = std::io::stdout().lock();
            write_json(result, &mut stdout)?;
            writeln!(stdout)?;
        }
        (OutputFormat::Variants, None) => {
            write_variants_csv(&result.variants, &mut std::io::stdout().lock())?
        }
        (OutputFormat::Table, None) => print_table(&result.table),
    }
    Ok(())
}

/// Summary and variant listing go to stderr when the collation itself went
/// to stdout, so piped JSON, HTML and CSV stay clean.
fn report(result: &CollationResult, output: Option<&Path>, quiet: bool, show_variants: Option<usize>) {
    let mut text = String::new();
    if !quiet {
        text.push_str(&format_summary(result));
    }
    if let Some(limit) = show_variants {
        text.push_str("\n=== Sample Variants ===\n");
        text.push_str(&format_variants(&result.variants, Some(limit)));
    }

    match output {
        Some(path) => {
            print!("{}", text);
            if !quiet {
                eprintln!("\nOutput: {}", path.display());
            }
        }
        None => eprint!("{}", text),
    }
}

/// Run alignment benchmark to measure performance.
fn run_benchmark(iterations: usize, size: usize, witness_count: usize) {
    use std::time::Instant;

    println!("=== Alignment Benchmark ===");
    println!("Iterations: {}", iterations);
    println!("Tokens per witness: {}", size);
    println!("Witnesses: {}", witness_count);

    let make = |name: String, variant_every: usize| {
        let text = (0..size)
            .map(|i| {
                if variant_every > 0 && i % variant_every == variant_every - 1 {
                    format!("var{}", i)
                } else {
                    format!("tok{}", i)
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        WitnessText {
            name,
            tokens: manuscript_collation::witness::tokenize(&text),
            text,
        }
    };

    let identical: Vec<WitnessText> = (0..witness_count)
        .map(|k| make(format!("W{}", k), 0))
        .collect();
    let partial: Vec<WitnessText> = (0..witness_count)
        .map(|k| make(format!("W{}", k), if k == 0 { 0 } else { 3 + k }))
        .collect();

    let cases = [
        ("Identical witnesses", &identical, CollationParams::default()),
        ("Scattered variants", &partial, CollationParams::default()),
        (
            "Scattered variants, near-match",
            &partial,
            CollationParams {
                near_match: true,
                ..Default::default()
            },
        ),
    ];

    for (label, witnesses, params) in cases {
        println!("\n{}:", label);
        let start = Instant::now();
        let mut variant_columns = 0;
        for _ in 0..iterations {
            variant_columns = align_witnesses(witnesses, &params).variant_count();
        }
        let elapsed = start.elapsed();
        let per_alignment = elapsed.as_secs_f64() / iterations.max(1) as f64;
        println!("  Total time: {:.3}s", elapsed.as_secs_f64());
        println!("  Per alignment: {:.3}ms", per_alignment * 1000.0);
        println!("  Alignments/sec: {:.0}", 1.0 / per_alignment.max(f64::EPSILON));
        println!("  Variant columns: {}", variant_columns);
    }
}
