//! Deduction aggregation and grouping.
//!
//! This module tallies deduction lines by category key, sequentially or
//! in parallel shards, and groups lines per key for reporting.

use crate::analysis::keys::KeyRule;
use crate::models::{DeductionLine, DeductionTally};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Tally every line of every student by its category key.
pub fn aggregate<I, L, S>(all_lines: I, rule: &KeyRule) -> DeductionTally
where
    I: IntoIterator<Item = L>,
    L: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    all_lines
        .into_iter()
        .fold(DeductionTally::new(), |tally, lines| {
            tally_lines(tally, lines, rule)
        })
}

/// Tally in parallel, one shard per rayon split, merging partial tallies.
///
/// Produces exactly what [`aggregate`] produces for the same input.
pub fn aggregate_parallel<P, L, S>(all_lines: P, rule: &KeyRule) -> DeductionTally
where
    P: IntoParallelIterator<Item = L>,
    L: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    all_lines
        .into_par_iter()
        .fold(DeductionTally::new, |tally, lines| {
            tally_lines(tally, lines, rule)
        })
        .reduce(DeductionTally::new, DeductionTally::merge)
}

fn tally_lines<L, S>(mut tally: DeductionTally, lines: L, rule: &KeyRule) -> DeductionTally
where
    L: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for line in lines {
        tally.record(rule.key_for(line.as_ref()));
    }
    tally
}

/// Group deduction lines by category key, keeping input order per key.
pub fn group_lines(lines: &[DeductionLine], rule: &KeyRule) -> BTreeMap<String, Vec<DeductionLine>> {
    let mut grouped: BTreeMap<String, Vec<DeductionLine>> = BTreeMap::new();

    for line in lines {
        grouped
            .entry(rule.key_for(&line.text))
            .or_default()
            .push(line.clone());
    }

    grouped
}

/// Students contributing at least one line to each key.
pub fn students_per_key(lines: &[DeductionLine], rule: &KeyRule) -> BTreeMap<String, usize> {
    group_lines(lines, rule)
        .into_iter()
        .map(|(key, lines)| {
            let mut students: Vec<&str> = lines.iter().map(|l| l.student.as_str()).collect();
            students.sort_unstable();
            students.dedup();
            (key, students.len())
        })
        .collect()
}
