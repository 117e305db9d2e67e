// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use strsim::{normalized_levenshtein, sorensen_dice};

pub const DEFAULT_CUTOFF: f64 = 0.6;

/// Closest column name for `candidate`, or `None` when nothing reaches `cutoff`.
///
/// Exact matches win, then case-insensitive ones, then the highest similarity
/// ratio. Equal ratios keep the earliest name.
pub fn closest_match<'a, I>(candidate: &str, names: I, cutoff: f64) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<&'a str> = names.into_iter().collect();
    if let Some(exact) = names.iter().find(|n| **n == candidate) {
        return Some(exact);
    }
    let lowered = candidate.to_lowercase();
    if let Some(folded) = names.iter().find(|n| n.to_lowercase() == lowered) {
        return Some(folded);
    }

    let mut best: Option<(&'a str, f64)> = None;
    for name in names {
        let score = similarity(&lowered, &name.to_lowercase());
        if score < cutoff {
            continue;
        }
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((name, score));
        }
    }
    best.map(|(name, _)| name)
}

/// Edit-distance ratio or shared-bigram ratio, whichever is higher. The
/// bigram ratio keeps names embedded in longer ones (`total_income`) in range.
pub fn similarity(a: &str, b: &str) -> f64 {
    normalized_levenshtein(a, b).max(sorensen_dice(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: &[&str] = &["Income", "Education", "Marital_Status", "MntWines"];

    #[test]
    fn exact_and_case_insensitive_matches_win() {
        assert_eq!(closest_match("Income", NAMES.iter().copied(), 0.6), Some("Income"));
        assert_eq!(closest_match("income", NAMES.iter().copied(), 0.6), Some("Income"));
    }

    #[test]
    fn near_misses_are_repaired() {
        assert_eq!(closest_match("Incom", NAMES.iter().copied(), 0.6), Some("Income"));
        assert_eq!(
            closest_match("marital_status_", NAMES.iter().copied(), 0.6),
            Some("Marital_Status")
        );
    }

    #[test]
    fn embedded_names_are_repaired() {
        assert_eq!(
            closest_match("total_income", NAMES.iter().copied(), 0.6),
            Some("Income")
        );
        assert!(similarity("total_income", "income") > 0.6);
    }

    #[test]
    fn unrelated_names_are_rejected() {
        assert_eq!(closest_match("bogus_col", NAMES.iter().copied(), 0.6), None);
        assert_eq!(closest_match("Incom", std::iter::empty(), 0.6), None);
    }
}
