//! Progressive global alignment of witness token streams.
//!
//! This is the HOT PATH of a collation request. The first witness seeds a
//! column profile; every later witness is aligned against the profile built
//! from the witnesses before it with a cost-minimizing Needleman-Wunsch pass,
//! and the resulting steps insert gaps (never reorder or drop tokens).

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::CollationParams;
use crate::metrics::normalized_distance;
use crate::models::{AlignmentTable, Column, Token, WitnessText};

/// Cells of one profile column, one per witness aligned so far.
type Cells = Vec<Vec<Token>>;

/// One traceback move when aligning a witness against the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Token joins an existing column
    Pair { column: usize, token: usize },
    /// Existing column gets a gap for the new witness
    ColumnOnly { column: usize },
    /// Token opens a new column, gapped for every earlier witness
    TokenOnly { token: usize },
}

/// Align all witnesses into a column table.
///
/// Witness order is significant: witness *k* is aligned against the profile
/// of witnesses *0..k*. With fewer than two witnesses carrying tokens nothing
/// is compared and every column is invariant.
pub fn align_witnesses(witnesses: &[WitnessText], params: &CollationParams) -> AlignmentTable {
    let names: Vec<String> = witnesses.iter().map(|w| w.name.clone()).collect();
    let mut profile: Vec<Cells> = Vec::new();

    for (k, witness) in witnesses.iter().enumerate() {
        if witness.is_empty() && witnesses.len() > 1 {
            warn!(witness = %witness.name, "witness has no text after normalization; aligned as all gaps");
        }

        if k == 0 {
            profile = witness
                .tokens
                .iter()
                .map(|t| vec![vec![t.clone()]])
                .collect();
            continue;
        }

        let steps = align_to_profile(&profile, &witness.tokens, params);
        profile = apply_steps(profile, &steps, &witness.tokens, k);
        debug!(
            witness = %witness.name,
            tokens = witness.tokens.len(),
            columns = profile.len(),
            "aligned witness against profile"
        );
    }

    let comparable = witnesses.iter().filter(|w| !w.is_empty()).count() >= 2;

    let mut columns: Vec<Column> = profile
        .into_iter()
        .enumerate()
        .map(|(index, cells)| {
            let is_variant = comparable && cells_differ(&cells);
            Column {
                index,
                cells,
                is_variant,
            }
        })
        .collect();

    if params.segmentation && comparable {
        columns = segment_columns(columns);
    }

    AlignmentTable {
        witnesses: names,
        columns,
    }
}

/// Needleman-Wunsch alignment of one token stream against the profile.
///
/// Identical tokens cost 0, near matches `near_match_cost`, mismatches and
/// gaps `edit_cost`. Among equal-cost alignments the traceback takes gap
/// moves first, which pushes gaps as far right as possible within a run.
pub fn align_to_profile(profile: &[Cells], tokens: &[Token], params: &CollationParams) -> Vec<Step> {
    let n = tokens.len();
    let m = profile.len();
    let gap = u64::from(params.edit_cost);

    // Substitution costs, one row per token; rows are independent.
    let mut sub = vec![0u32; n * m];
    if m > 0 {
        sub.par_chunks_mut(m).enumerate().for_each(|(i, row)| {
            for (j, cost) in row.iter_mut().enumerate() {
                *cost = column_cost(&tokens[i], &profile[j], params);
            }
        });
    }

    // DP matrix - flat Vec, D[i][j] = d[i * width + j]
    // u64 with saturating sums: any u32 cost stays total
    let width = m + 1;
    let mut d = vec![0u64; (n + 1) * width];
    for j in 1..=m {
        d[j] = (j as u64).saturating_mul(gap);
    }

    for i in 1..=n {
        let row_offset = i * width;
        let prev_row_offset = (i - 1) * width;
        let sub_offset = (i - 1) * m;
        d[row_offset] = (i as u64).saturating_mul(gap);

        for j in 1..=m {
            let diagonal =
                d[prev_row_offset + (j - 1)].saturating_add(u64::from(sub[sub_offset + (j - 1)]));
            let up = d[prev_row_offset + j].saturating_add(gap);
            let left = d[row_offset + (j - 1)].saturating_add(gap);
            d[row_offset + j] = diagonal.min(up).min(left);
        }
    }

    // Traceback from the bottom-right corner
    let mut steps = Vec::with_capacity(n + m);
    let mut i = n;
    let mut j = m;

    while i > 0 || j > 0 {
        let current = d[i * width + j];

        if j > 0 && current == d[i * width + (j - 1)].saturating_add(gap) {
            steps.push(Step::ColumnOnly { column: j - 1 });
            j -= 1;
        } else if i > 0 && current == d[(i - 1) * width + j].saturating_add(gap) {
            steps.push(Step::TokenOnly { token: i - 1 });
            i -= 1;
        } else {
            steps.push(Step::Pair {
                column: j - 1,
                token: i - 1,
            });
            i -= 1;
            j -= 1;
        }
    }

    // Traceback runs backwards
    steps.reverse();
    steps
}

/// Cost of placing `token` in a profile column: the cheapest pairing with
/// any token already in it.
#[inline]
fn column_cost(token: &Token, cells: &Cells, params: &CollationParams) -> u32 {
    let mut best = params.edit_cost;
    for other in cells.iter().flatten() {
        if other == token {
            return 0;
        }
        if params.near_match
            && best > params.near_match_cost
            && tokens_near_match(token, other, params.near_match_threshold)
        {
            best = params.near_match_cost;
        }
    }
    best
}

/// Whether two tokens count as equal under near-match rules.
///
/// A token carrying the fragmentation placeholder only matches itself.
pub fn tokens_near_match(a: &Token, b: &Token, threshold: f32) -> bool {
    if a == b {
        return true;
    }
    if a.has_placeholder() || b.has_placeholder() {
        return false;
    }
    normalized_distance(a.as_str(), b.as_str()) < threshold
}

/// Rebuild the profile with the new witness (index `k`) added as a row.
fn apply_steps(profile: Vec<Cells>, steps: &[Step], tokens: &[Token], k: usize) -> Vec<Cells> {
    let mut old = profile;
    let mut columns = Vec::with_capacity(steps.len());

    for &step in steps {
        let cells = match step {
            Step::Pair { column, token } => {
                let mut cells = std::mem::take(&mut old[column]);
                cells.push(vec![tokens[token].clone()]);
                cells
            }
            Step::ColumnOnly { column } => {
                let mut cells = std::mem::take(&mut old[column]);
                cells.push(Vec::new());
                cells
            }
            Step::TokenOnly { token } => {
                let mut cells = vec![Vec::new(); k];
                cells.push(vec![tokens[token].clone()]);
                cells
            }
        };
        columns.push(cells);
    }

    columns
}

/// A column is variant when its cells (a gap reads as empty) are not all the same.
fn cells_differ(cells: &Cells) -> bool {
    cells.windows(2).any(|pair| pair[0] != pair[1])
}

/// Merge consecutive columns that share the same variant flag.
///
/// Invariant runs collapse into one column and adjacent variant columns into
/// one variant segment; each witness's cell is the concatenation of its cells.
/// A variant segment whose concatenated cells agree (e.g. `x|-` then `-|x`)
/// is re-flagged invariant and folded into its invariant neighbours.
pub fn segment_columns(columns: Vec<Column>) -> Vec<Column> {
    let mut merged = merge_runs(columns);

    let mut reflagged = false;
    for column in merged.iter_mut().filter(|c| c.is_variant) {
        if !cells_differ(&column.cells) {
            column.is_variant = false;
            reflagged = true;
        }
    }
    // Only invariant runs can appear; concatenating equal cells keeps them equal.
    if reflagged {
        merged = merge_runs(merged);
    }

    for (index, column) in merged.iter_mut().enumerate() {
        column.index = index;
    }

    merged
}

fn merge_runs(columns: Vec<Column>) -> Vec<Column> {
    let mut merged: Vec<Column> = Vec::with_capacity(columns.len());

    for column in columns {
        match merged.last_mut() {
            Some(last) if last.is_variant == column.is_variant => {
                for (cell, extra) in last.cells.iter_mut().zip(column.cells) {
                    cell.extend(extra);
                }
            }
            _ => merged.push(column),
        }
    }

    merged
}
