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

use easel::chart::{Aggregation, ChartSpec};
use easel::schema::{ColumnKind, DatasetProfile, DatasetSchema};
use easel::synthesizer::Synthesizer;
use easel::validator::{draft_to_plan, validate_and_repair, LlmDraft, Validator};
use serde_json::{json, Value};

fn schema() -> DatasetSchema {
    DatasetSchema::new([
        ("education", ColumnKind::Categorical),
        ("Income", ColumnKind::Numeric),
        ("MntWines", ColumnKind::Numeric),
        ("Marital_Status", ColumnKind::Categorical),
    ])
}

fn parsed(json: &str) -> Value {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_rejects_column_without_fuzzy_match() {
    let draft = r#"{"chart": "bar", "x": "bogus_col", "y": "Income"}"#;
    assert_eq!(validate_and_repair(draft, &schema()), None);
}

#[test]
fn test_repairs_near_miss_everywhere_it_occurs() {
    let draft = r#"{"chart": "heatmap", "x": "Incom", "columns": ["Incom", "MntWines"]}"#;
    let repaired = validate_and_repair(draft, &schema()).unwrap();
    let value = parsed(&repaired);
    assert_eq!(value["x"], "Income");
    assert_eq!(value["columns"], json!(["Income", "MntWines"]));
}

#[test]
fn test_repair_is_idempotent() {
    let draft = r#"{"chart": "Bar Chart", "x": " educaton ", "y": "income", "aggregation": "Average", "sort": "desc", "title": "Spend"}"#;
    let once = validate_and_repair(draft, &schema()).unwrap();
    let twice = validate_and_repair(&once, &schema()).unwrap();
    assert_eq!(once, twice);
    let value = parsed(&once);
    assert_eq!(value["chart"], "bar");
    assert_eq!(value["x"], "education");
    assert_eq!(value["y"], "Income");
    assert_eq!(value["aggregation"], "mean");
    assert_eq!(value["sort"], "descending");
}

#[test]
fn test_expression_values_are_denylisted() {
    let schema = schema();
    assert_eq!(
        validate_and_repair(r#"{"chart": "bar", "x": "df['education']"}"#, &schema),
        None
    );
    assert_eq!(
        validate_and_repair(r#"{"chart": "scatter", "y": "px.Constant(1)"}"#, &schema),
        None
    );
    assert_eq!(
        validate_and_repair(r#"{"chart": "bar", "group_by": "lambda r: r"}"#, &schema),
        None
    );
}

#[test]
fn test_parenthesised_column_names_are_repaired() {
    let schema = DatasetSchema::new([
        ("region", ColumnKind::Categorical),
        ("Income (USD)", ColumnKind::Numeric),
    ]);
    for reference in ["Income (USD)", "income (usd)", "Income (USDs)"] {
        let draft = json!({"chart": "bar", "x": "region", "y": reference}).to_string();
        let repaired = validate_and_repair(&draft, &schema)
            .unwrap_or_else(|| panic!("{reference} was rejected"));
        assert_eq!(parsed(&repaired)["y"], "Income (USD)");
    }
    assert_eq!(
        validate_and_repair(r#"{"chart": "bar", "y": "df['Income (USD)']"}"#, &schema),
        None
    );
    assert_eq!(
        validate_and_repair(r#"{"chart": "bar", "y": "df['Income']"}"#, &schema),
        None
    );
}

#[test]
fn test_expression_resembling_a_column_is_still_rejected() {
    assert_eq!(
        validate_and_repair(r#"{"chart": "bar", "x": "df[education]"}"#, &schema()),
        None
    );
}

#[test]
fn test_unparseable_candidate_is_rejected() {
    assert_eq!(validate_and_repair("fig = px.bar(df)", &schema()), None);
    assert_eq!(validate_and_repair("{\"chart\": ", &schema()), None);
}

#[test]
fn test_unknown_chart_kind_becomes_bar() {
    let repaired = validate_and_repair(r#"{"chart": "sankey"}"#, &schema()).unwrap();
    assert_eq!(parsed(&repaired)["chart"], "bar");
}

#[test]
fn test_group_by_is_repaired_independently() {
    let validator = Validator::default();
    let draft = validator
        .validate_draft(r#"{"chart": "treemap", "group_by": "marital_status", "values": "Income"}"#, &schema())
        .unwrap();
    assert_eq!(draft.group_by.as_deref(), Some("Marital_Status"));

    assert!(validator
        .validate_draft(r#"{"chart": "treemap", "group_by": "zzzz", "values": "Income"}"#, &schema())
        .is_none());
}

#[test]
fn test_stricter_cutoff_rejects_loose_matches() {
    let strict = Validator::new(0.95);
    assert!(strict
        .validate_and_repair(r#"{"chart": "bar", "x": "Incom"}"#, &schema())
        .is_none());
}

#[test]
fn test_prose_around_object_still_parses() {
    let draft = LlmDraft::parse("{\"chart\": \"pie\", \"values\": \"Income\"}\nHope this helps!").unwrap();
    assert_eq!(draft.chart, "pie");
}

#[test]
fn test_draft_to_plan_fills_missing_roles() {
    let profile = DatasetProfile::from_schema(schema());
    let draft = Validator::default()
        .validate_draft(r#"{"chart": "bar", "x": "education", "y": "MntWines", "aggregation": "sum", "title": "Wine spend"}"#, &profile.schema)
        .unwrap();
    let plan = draft_to_plan(&draft, &profile, &Synthesizer::default());
    assert_eq!(plan.config.title, "Wine spend");
    assert_eq!(
        plan.spec,
        ChartSpec::Bar {
            x: "education".into(),
            y: "MntWines".into(),
            aggregation: Aggregation::Sum,
            sort: Default::default(),
        }
    );

    let draft = Validator::default()
        .validate_draft(r#"{"chart": "scatter"}"#, &profile.schema)
        .unwrap();
    let plan = draft_to_plan(&draft, &profile, &Synthesizer::default());
    assert_eq!(
        plan.spec,
        ChartSpec::Scatter {
            x: "Income".into(),
            y: "MntWines".into(),
            color: None,
        }
    );
}
