//! Criterion benchmarks for progressive witness alignment and variant analysis.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use manuscript_collation::align::align_witnesses;
use manuscript_collation::metrics::compute_levenshtein;
use manuscript_collation::models::WitnessText;
use manuscript_collation::variants::analyze_table;
use manuscript_collation::witness::tokenize;
use manuscript_collation::CollationParams;

/// Witness of `size` tokens where every `variant_every`-th token differs.
fn witness(name: &str, size: usize, variant_every: usize) -> WitnessText {
    let text = (0..size)
        .map(|i| {
            if variant_every > 0 && i % variant_every == 0 {
                format!("וריאנט{}", i)
            } else {
                format!("מלה{}", i)
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    WitnessText {
        name: name.to_string(),
        tokens: tokenize(&text),
        text,
    }
}

fn bench_alignment(c: &mut Criterion) {
    let params = CollationParams::default();
    let near = CollationParams {
        near_match: true,
        ..Default::default()
    };

    let sizes = [20, 60, 150];

    let mut group = c.benchmark_group("progressive_alignment");

    for size in sizes {
        let identical = vec![witness("A", size, 0), witness("B", size, 0)];
        group.bench_with_input(BenchmarkId::new("identical_pair", size), &size, |b, _| {
            b.iter(|| align_witnesses(black_box(&identical), &params))
        });

        // 1 in 5 tokens differs in each later witness
        let scattered: Vec<WitnessText> = (0..4)
            .map(|k| witness(&format!("W{}", k), size, if k == 0 { 0 } else { 5 }))
            .collect();
        group.bench_with_input(BenchmarkId::new("four_witnesses", size), &size, |b, _| {
            b.iter(|| align_witnesses(black_box(&scattered), &params))
        });

        group.bench_with_input(
            BenchmarkId::new("four_witnesses_near_match", size),
            &size,
            |b, _| b.iter(|| align_witnesses(black_box(&scattered), &near)),
        );

        // Shorter witness forces gap placement
        let omissions = vec![witness("A", size, 0), witness("B", size / 2, 0)];
        group.bench_with_input(BenchmarkId::new("omission", size), &size, |b, _| {
            b.iter(|| align_witnesses(black_box(&omissions), &params))
        });
    }

    group.finish();
}

fn bench_analysis(c: &mut Criterion) {
    let params = CollationParams {
        segmentation: false,
        ..Default::default()
    };

    let mut group = c.benchmark_group("variant_analysis");

    for witness_count in [2, 4, 8] {
        let witnesses: Vec<WitnessText> = (0..witness_count)
            .map(|k| witness(&format!("W{}", k), 100, k + 2))
            .collect();
        let table = align_witnesses(&witnesses, &params);

        group.bench_with_input(
            BenchmarkId::new("analyze_table", witness_count),
            &witness_count,
            |b, _| b.iter(|| analyze_table(black_box(&table))),
        );
    }

    group.finish();
}

fn bench_levenshtein(c: &mut Criterion) {
    let mut group = c.benchmark_group("levenshtein");

    let short = ("בראשית", "בראשת");
    let long = (
        "בראשית ברא אלהים את השמים ואת הארץ",
        "בראשית ברא אלוהים את השמים ואת הארצ",
    );

    group.bench_function("short_tokens", |b| {
        b.iter(|| compute_levenshtein(black_box(short.0), black_box(short.1)))
    });
    group.bench_function("verse_segment", |b| {
        b.iter(|| compute_levenshtein(black_box(long.0), black_box(long.1)))
    });

    group.finish();
}

criterion_group!(benches, bench_alignment, bench_analysis, bench_levenshtein);
criterion_main!(benches);
