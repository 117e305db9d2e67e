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

use easel::chart::{Aggregation, ChartKind, ComparisonOp, SortOrder};
use easel::intent::{detect_chart_kind, parse};
use easel::schema::{ColumnKind, DatasetSchema};

fn schema() -> DatasetSchema {
    DatasetSchema::new([
        ("education", ColumnKind::Categorical),
        ("Income", ColumnKind::Numeric),
        ("MntWines", ColumnKind::Numeric),
        ("Response", ColumnKind::BinaryFlag),
    ])
}

#[test]
fn test_chart_kind_detection_examples() {
    assert_eq!(detect_chart_kind("Show me a KPI"), ChartKind::Kpi);
    assert_eq!(detect_chart_kind("Compare with bar chart"), ChartKind::Bar);
    assert_eq!(detect_chart_kind("Scatter plot of X vs Y"), ChartKind::Scatter);
    assert_eq!(detect_chart_kind("Correlation heatmap"), ChartKind::Heatmap);
    assert_eq!(detect_chart_kind("Create a treemap"), ChartKind::Treemap);
}

#[test]
fn test_unmatched_request_defaults_to_bar_and_mean() {
    let intent = parse("something nice please", &schema());
    assert_eq!(intent.chart_kind, ChartKind::Bar);
    assert_eq!(intent.aggregation, Aggregation::Mean);
    assert_eq!(intent.sort, SortOrder::None);
    assert!(intent.candidate_columns.is_empty());
    assert!(intent.color_condition.is_none());
}

#[test]
fn test_correlation_prefers_heatmap_over_scatter() {
    assert_eq!(
        detect_chart_kind("correlation between Income vs MntWines"),
        ChartKind::Heatmap
    );
}

#[test]
fn test_columns_follow_schema_order_case_insensitively() {
    let intent = parse("plot mntwines against INCOME by Education", &schema());
    assert_eq!(intent.candidate_columns, vec!["education", "Income", "MntWines"]);
}

#[test]
fn test_aggregation_and_sort_keywords() {
    let intent = parse("total MntWines by education, highest first", &schema());
    assert_eq!(intent.aggregation, Aggregation::Sum);
    assert_eq!(intent.sort, SortOrder::Descending);

    let intent = parse("median Income per education ascending", &schema());
    assert_eq!(intent.aggregation, Aggregation::Median);
    assert_eq!(intent.sort, SortOrder::Ascending);
}

#[test]
fn test_keywords_match_whole_words_only() {
    let intent = parse("Income by country", &schema());
    assert_eq!(intent.aggregation, Aggregation::Mean);
    assert_eq!(parse("count of customers", &schema()).aggregation, Aggregation::Count);
    assert_eq!(detect_chart_kind("plot Income"), ChartKind::Bar);
    assert_eq!(detect_chart_kind("boxplots of Income"), ChartKind::Box);
}

#[test]
fn test_kpi_condition_with_default_color() {
    let intent = parse("Conversion rate KPI for Response, below 15%", &schema());
    assert_eq!(intent.chart_kind, ChartKind::Kpi);
    let condition = intent.color_condition.expect("condition detected");
    assert_eq!(condition.operator, ComparisonOp::Lt);
    assert_eq!(condition.threshold, 15.0);
    assert_eq!(condition.color, "red");
}
