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

//! Keyword-driven interpretation of a free-text visualization request.

use crate::chart::{Aggregation, ChartKind, ColorCondition, ComparisonOp, SortOrder};
use crate::schema::DatasetSchema;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Checked top to bottom; the first kind with a matching keyword wins.
const CHART_KEYWORDS: &[(ChartKind, &[&str])] = &[
    (
        ChartKind::Kpi,
        &["kpi", "metric", "card", "indicator", "conversion rate"],
    ),
    (ChartKind::Heatmap, &["heatmap", "heat map", "correlation"]),
    (
        ChartKind::Treemap,
        &["treemap", "tree map", "hierarchical", "hierarchy"],
    ),
    (ChartKind::Histogram, &["histogram", "frequency"]),
    (
        ChartKind::Box,
        &["box", "boxplot", "quartile", "distribution", "spread"],
    ),
    (ChartKind::Pie, &["pie", "donut", "share", "proportion"]),
    (ChartKind::Area, &["area", "cumulative"]),
    (
        ChartKind::Line,
        &["line", "trend", "over time", "time series"],
    ),
    (ChartKind::Scatter, &["scatter", "relationship", "vs", "versus"]),
    (
        ChartKind::Bar,
        &["bar", "compare", "comparison", "across", "column"],
    ),
];

const AGGREGATION_KEYWORDS: &[(Aggregation, &[&str])] = &[
    (Aggregation::Mean, &["average", "mean", "avg"]),
    (Aggregation::Sum, &["sum", "total"]),
    (Aggregation::Count, &["count"]),
    (Aggregation::Median, &["median"]),
];

const SORT_KEYWORDS: &[(SortOrder, &[&str])] = &[
    (SortOrder::Descending, &["descending", "highest", "most"]),
    (SortOrder::Ascending, &["ascending", "lowest", "least"]),
];

const DEFAULT_CONDITION_COLOR: &str = "red";

static THRESHOLD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(below|above|less than|greater than|<|>)\s*(\d+\.?\d*)")
        .expect("threshold pattern is valid")
});
static COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"color\s+(\w+)").expect("color pattern is valid"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub chart_kind: ChartKind,
    /// Schema columns mentioned in the request, in schema order.
    pub candidate_columns: Vec<String>,
    pub aggregation: Aggregation,
    pub sort: SortOrder,
    pub color_condition: Option<ColorCondition>,
}

impl Default for Intent {
    fn default() -> Self {
        Self {
            chart_kind: ChartKind::Bar,
            candidate_columns: Vec::new(),
            aggregation: Aggregation::Mean,
            sort: SortOrder::None,
            color_condition: None,
        }
    }
}

/// Never fails: anything not recognised falls back to the defaults.
pub fn parse(request: &str, schema: &DatasetSchema) -> Intent {
    let text = request.to_lowercase();
    let intent = Intent {
        chart_kind: detect_chart_kind(&text),
        candidate_columns: extract_columns(&text, schema),
        aggregation: first_match(&text, AGGREGATION_KEYWORDS).unwrap_or_default(),
        sort: first_match(&text, SORT_KEYWORDS).unwrap_or_default(),
        color_condition: detect_color_condition(&text),
    };
    debug!(
        chart = %intent.chart_kind,
        columns = ?intent.candidate_columns,
        aggregation = ?intent.aggregation,
        sort = ?intent.sort,
        "parsed visualization intent"
    );
    intent
}

pub fn detect_chart_kind(text: &str) -> ChartKind {
    first_match(&text.to_lowercase(), CHART_KEYWORDS).unwrap_or_default()
}

fn extract_columns(text: &str, schema: &DatasetSchema) -> Vec<String> {
    schema
        .names()
        .filter(|name| !name.is_empty() && text.contains(&name.to_lowercase()))
        .map(str::to_string)
        .collect()
}

fn detect_color_condition(text: &str) -> Option<ColorCondition> {
    let captures = THRESHOLD_RE.captures(text)?;
    let operator = match &captures[1] {
        "below" | "less than" | "<" => ComparisonOp::Lt,
        _ => ComparisonOp::Gt,
    };
    let threshold = captures[2].parse::<f64>().ok()?;
    let color = COLOR_RE
        .captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| DEFAULT_CONDITION_COLOR.to_string());
    Some(ColorCondition {
        operator,
        threshold,
        color,
    })
}

fn first_match<T: Copy>(text: &str, table: &[(T, &[&str])]) -> Option<T> {
    table
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_word(text, k)))
        .map(|(value, _)| *value)
}

/// Whole-word (or plural) occurrence of `keyword` in already-lowercased `text`.
fn contains_word(text: &str, keyword: &str) -> bool {
    let bytes = text.as_bytes();
    let is_word = |i: usize| bytes.get(i).is_some_and(|b| b.is_ascii_alphanumeric());
    text.match_indices(keyword).any(|(start, matched)| {
        let end = start + matched.len();
        let starts_clean = start == 0 || !is_word(start - 1);
        let ends_clean = !is_word(end) || (bytes[end] == b's' && !is_word(end + 1));
        starts_clean && ends_clean
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_matching_ignores_embedded_keywords() {
        assert!(contains_word("show a bar chart", "bar"));
        assert!(contains_word("income trends", "trend"));
        assert!(!contains_word("barely anything", "bar"));
        assert!(!contains_word("a timeline", "line"));
        assert!(!contains_word("by country", "count"));
    }

    #[test]
    fn threshold_and_color_combine_into_one_condition() {
        let condition = detect_color_condition("kpi for response, below 15% color orange").unwrap();
        assert_eq!(condition.operator, ComparisonOp::Lt);
        assert_eq!(condition.threshold, 15.0);
        assert_eq!(condition.color, "orange");

        let condition = detect_color_condition("show metric greater than 2.5").unwrap();
        assert_eq!(condition.operator, ComparisonOp::Gt);
        assert_eq!(condition.threshold, 2.5);
        assert_eq!(condition.color, "red");

        assert!(detect_color_condition("color blue please").is_none());
    }
}
